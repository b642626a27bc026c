//! Integration tests for manifest to archive conversion.
//!
//! Each test generates a sequence directory, converts it and reads the
//! written `.abc` archive back.

mod common;

use common::{cube_obj, cube_obj_without_texcoords, manifest_json, two_shapes_obj, Fixture, CUBE_TRIANGLES};

use objseq::convert::{convert_manifest, ConvertOptions, UnassignedFacePolicy, UnwrapMode};
use objseq::core::{SampleData, TimeSamplingType};
use objseq::writer::{ArchiveDocument, OObject, OProperty};
use objseq::Error;

fn geom(obj: &OObject) -> &OProperty {
    obj.property(".geom").expect("Missing .geom compound")
}

fn samples(prop: &OProperty) -> Vec<&SampleData> {
    (0..prop.num_samples()).map(|i| prop.sample(i).unwrap()).collect()
}

fn face_set_faces(mesh: &OObject, name: &str) -> Vec<Vec<i32>> {
    let faces = mesh
        .child(name)
        .and_then(|fs| fs.property(".faceset"))
        .and_then(|p| p.child(".faces"))
        .unwrap_or_else(|| panic!("Missing face set {}", name));
    samples(faces).iter().map(|s| s.as_i32().unwrap().to_vec()).collect()
}

fn convert_fixture(fixture: &Fixture, output: &str, options: &ConvertOptions) -> ArchiveDocument {
    let out = fixture.output_path(output);
    convert_manifest(&fixture.manifest_path(), &out, options).expect("Conversion failed");
    ArchiveDocument::open(&out).expect("Failed to open written archive")
}

#[test]
fn test_red_blue_cube() {
    let fixture = Fixture::red_blue_cube();
    let doc = convert_fixture(&fixture, "cube.abc", &ConvertOptions::default());

    // Identity plus the object's keyframe times.
    assert_eq!(doc.time_samplings.len(), 2);
    let ts = doc.time_sampling(1).unwrap();
    assert!(matches!(
        &ts.sampling_type,
        TimeSamplingType::Acyclic { times } if times == &vec![0.0, 0.5]
    ));
    assert_eq!(doc.time_samplings[1].max_samples, 2);

    assert_eq!(doc.archive_metadata.get("_ai_DCC_FPS"), Some("24"));
    assert_eq!(doc.archive_metadata.get("frameEnd"), Some("12"));
    assert_eq!(doc.archive_metadata.get("loop"), Some("true"));

    let mesh = doc.find("/cube").expect("Missing cube object");
    assert_eq!(mesh.meta_data.schema(), Some("AbcGeom_PolyMesh_v1"));
    let geom = geom(mesh);

    let positions = geom.child("P").unwrap();
    assert_eq!(positions.num_samples(), 2);
    assert_eq!(positions.time_sampling_index, 1);

    let counts = geom.child(".faceCounts").unwrap();
    for sample in samples(counts) {
        let counts = sample.as_i32().unwrap();
        assert_eq!(counts.len(), CUBE_TRIANGLES);
        assert!(counts.iter().all(|&c| c == 3));
    }

    // Bounds enclose the source vertices of each frame.
    let bounds = samples(geom.child(".selfBnds").unwrap());
    for (sample, scale) in bounds.iter().zip([1.0, 2.0]) {
        let b = sample.as_f64().unwrap();
        for p in common::CUBE_POSITIONS {
            for axis in 0..3 {
                let v = (p[axis] * scale) as f64;
                assert!(b[axis] <= v && v <= b[axis + 3], "bounds {:?} miss {}", b, v);
            }
        }
    }

    // Every face lands in exactly one set, in triangle order.
    let red = face_set_faces(mesh, "red");
    let blue = face_set_faces(mesh, "blue");
    assert_eq!(red.len(), 2);
    assert_eq!(blue.len(), 2);
    for slot in 0..2 {
        assert_eq!(red[slot], (0..6).collect::<Vec<i32>>());
        assert_eq!(blue[slot], (6..12).collect::<Vec<i32>>());
    }

    let assign = mesh
        .child("red")
        .and_then(|fs| fs.property(".faceset"))
        .and_then(|p| p.child(".material.assign"))
        .and_then(|p| p.sample(0))
        .and_then(|s| s.as_strings())
        .map(|s| s.to_vec());
    assert_eq!(assign, Some(vec!["/materials/red".to_string()]));

    let red_material = doc.find("/materials/red").expect("Missing red material");
    assert_eq!(red_material.meta_data.schema(), Some("AbcMaterial_Material_v1"));
    let shader = red_material
        .property(".material")
        .and_then(|p| p.child(".unity.surface.shaderName"))
        .and_then(|p| p.sample(0))
        .and_then(|s| s.as_strings())
        .map(|s| s.to_vec());
    assert_eq!(shader, Some(vec!["standard".to_string()]));
    assert!(doc.find("/materials/blue").is_some());
}

#[test]
fn test_generated_attributes_are_per_point() {
    let fixture = Fixture::red_blue_cube();
    let doc = convert_fixture(&fixture, "cube.abc", &ConvertOptions::default());
    let geom = geom(doc.find("/cube").unwrap());

    let positions = samples(geom.child("P").unwrap());
    let normals = geom.child("N").unwrap();
    let uvs = geom.child("uv").unwrap();
    assert_eq!(normals.meta_data.get("geoScope"), Some("var"));
    assert_eq!(uvs.meta_data.get("geoScope"), Some("var"));
    assert_eq!(uvs.meta_data.get("uvSourceName"), Some("uv0"));

    for (slot, p) in positions.iter().enumerate() {
        assert_eq!(normals.sample(slot).unwrap().len(), p.len());
        let uv = uvs.sample(slot).unwrap().as_vec2f().unwrap();
        assert_eq!(uv.len(), p.len());
        let inside = |x: f32| (-1e-6..=1.0 + 1e-6).contains(&x);
        assert!(uv.iter().all(|t| inside(t[0]) && inside(t[1])));
    }
}

#[test]
fn test_pass_through_keeps_source_topology() {
    let fixture = Fixture::red_blue_cube();
    let options = ConvertOptions {
        unwrap_mode: UnwrapMode::PassThrough,
        ..Default::default()
    };
    let doc = convert_fixture(&fixture, "cube.abc", &options);
    let geom = geom(doc.find("/cube").unwrap());

    // The parser keeps one position list per material piece, so corners
    // shared by a red and a blue side appear twice.
    let positions = geom.child("P").unwrap().sample(0).unwrap();
    assert!(positions.len() >= common::CUBE_POSITIONS.len());

    let indices = geom.child(".faceIndices").unwrap().sample(0).unwrap();
    assert_eq!(indices.len(), CUBE_TRIANGLES * 3);
    assert!(indices.as_i32().unwrap().iter().all(|&i| (i as usize) < positions.len()));
    let uvs = geom.child("uv").unwrap();
    assert_eq!(uvs.meta_data.get("geoScope"), Some("fvr"));
    assert_eq!(uvs.sample(0).unwrap().len(), indices.len());
    assert_eq!(geom.child("N").unwrap().sample(0).unwrap().len(), indices.len());
}

#[test]
fn test_pass_through_needs_texcoords() {
    let fixture = Fixture::new();
    fixture.write_manifest(&manifest_json("cube", &[(0, &["red", "blue"])]));
    fixture.write_frame("cube", 0, &cube_obj_without_texcoords(1.0, "cube"));
    let out = fixture.output_path("cube.abc");

    let options = ConvertOptions {
        unwrap_mode: UnwrapMode::PassThrough,
        ..Default::default()
    };
    let err = convert_manifest(&fixture.manifest_path(), &out, &options).unwrap_err();
    assert!(matches!(err, Error::MissingAttribute { attribute: "texcoord", .. }), "{}", err);
    assert!(!out.exists());

    // Generating the atlas does not need them.
    convert_manifest(&fixture.manifest_path(), &out, &ConvertOptions::default()).unwrap();
    assert!(out.exists());
}

#[test]
fn test_conversion_is_idempotent() {
    let fixture = Fixture::red_blue_cube();
    let a = fixture.output_path("a.abc");
    let b = fixture.output_path("b.abc");
    convert_manifest(&fixture.manifest_path(), &a, &ConvertOptions::default()).unwrap();
    let single_thread = ConvertOptions {
        jobs: 1,
        ..Default::default()
    };
    convert_manifest(&fixture.manifest_path(), &b, &single_thread).unwrap();

    let a = std::fs::read(a).unwrap();
    let b = std::fs::read(b).unwrap();
    assert!(a == b, "Outputs differ between runs");
}

#[test]
fn test_multiple_shapes_rejected() {
    let fixture = Fixture::new();
    fixture.write_manifest(&manifest_json("cube", &[(0, &["red", "blue"])]));
    fixture.write_frame("cube", 0, &two_shapes_obj());
    let out = fixture.output_path("cube.abc");

    let err = convert_manifest(&fixture.manifest_path(), &out, &ConvertOptions::default()).unwrap_err();
    assert!(matches!(err, Error::MultipleMeshes { count: 2, .. }), "{}", err);
    assert!(!out.exists());
}

#[test]
fn test_missing_frame_file() {
    let fixture = Fixture::new();
    fixture.write_manifest(&manifest_json("cube", &[(0, &["red", "blue"]), (12, &["red", "blue"])]));
    fixture.write_frame("cube", 0, &cube_obj(1.0, "cube"));
    let out = fixture.output_path("cube.abc");

    let err = convert_manifest(&fixture.manifest_path(), &out, &ConvertOptions::default()).unwrap_err();
    assert!(matches!(err, Error::MeshLoad { .. }), "{}", err);
    assert!(!out.exists());
}

#[test]
fn test_unassigned_faces() {
    let fixture = Fixture::new();
    // Only red is active, so the blue sides match nothing.
    fixture.write_manifest(&manifest_json("cube", &[(0, &["red"])]));
    fixture.write_frame("cube", 0, &cube_obj(1.0, "cube"));

    let doc = convert_fixture(&fixture, "lenient.abc", &ConvertOptions::default());
    let mesh = doc.find("/cube").unwrap();
    assert_eq!(face_set_faces(mesh, "red"), vec![(0..6).collect::<Vec<i32>>()]);
    assert_eq!(face_set_faces(mesh, "blue"), vec![Vec::<i32>::new()]);

    let strict = ConvertOptions {
        unassigned_faces: UnassignedFacePolicy::Strict,
        ..Default::default()
    };
    let out = fixture.output_path("strict.abc");
    let err = convert_manifest(&fixture.manifest_path(), &out, &strict).unwrap_err();
    assert!(matches!(err, Error::UnassignedFaces { count: 6, .. }), "{}", err);
    assert!(!out.exists());
}

#[test]
fn test_malformed_manifest() {
    let fixture = Fixture::new();
    fixture.write_manifest(r#"{"materials": "red", "objects": []}"#);
    let out = fixture.output_path("bad.abc");

    let err = convert_manifest(&fixture.manifest_path(), &out, &ConvertOptions::default()).unwrap_err();
    assert_eq!(err.to_string(), "File contains malformed materials field");
    assert!(!out.exists());

    let missing = fixture.path().join("missing.json");
    let err = convert_manifest(&missing, &out, &ConvertOptions::default()).unwrap_err();
    assert!(matches!(err, Error::ManifestRead { .. }));
}

#[test]
fn test_bounds_include_unreferenced_positions() {
    let fixture = Fixture::new();
    fixture.write_manifest(&manifest_json("tri", &[(0, &["red"])]));
    fixture.write_frame(
        "tri",
        0,
        "o tri\nv 0 0 0\nv 1 0 0\nv 0 1 0\nv 10 10 10\nvn 0 0 1\nf 1//1 2//1 3//1\n",
    );

    let doc = convert_fixture(&fixture, "tri.abc", &ConvertOptions::default());
    let geom = geom(doc.find("/tri").unwrap());
    let bounds = geom.child(".selfBnds").unwrap().sample(0).unwrap().as_f64().unwrap().to_vec();
    assert_eq!(&bounds[..3], &[0.0, 0.0, 0.0]);
    assert_eq!(&bounds[3..], &[10.0, 10.0, 10.0]);

    // Only the triangle's corners are written as points.
    assert_eq!(geom.child("P").unwrap().sample(0).unwrap().len(), 3);
    let child_bounds = geom.child(".childBnds").unwrap().sample(0).unwrap().as_f64().unwrap().to_vec();
    assert_eq!(child_bounds, bounds);
}

#[test]
fn test_object_without_keyframes() {
    let fixture = Fixture::new();
    fixture.write_manifest(&manifest_json("cube", &[]));

    let doc = convert_fixture(&fixture, "empty.abc", &ConvertOptions::default());
    // Nothing beyond the identity sampling is registered.
    assert_eq!(doc.time_samplings.len(), 1);
    assert!(doc.time_sampling(0).unwrap().is_identity());

    let mesh = doc.find("/cube").expect("Missing cube object");
    assert_eq!(mesh.meta_data.schema(), Some("AbcGeom_PolyMesh_v1"));
    let positions = geom(mesh).child("P").unwrap();
    assert_eq!(positions.num_samples(), 0);
    assert_eq!(positions.time_sampling_index, 0);
    assert!(face_set_faces(mesh, "red").is_empty());
}

#[test]
fn test_failing_later_frame_leaves_no_archive() {
    let without_normals: String = cube_obj(2.0, "cube")
        .lines()
        .filter(|l| !l.starts_with("vn "))
        .map(|l| match l.strip_prefix("f ") {
            Some(face) => {
                let corners: Vec<&str> = face.split_whitespace().map(|c| &c[..c.rfind('/').unwrap()]).collect();
                format!("f {}\n", corners.join(" "))
            }
            None => format!("{}\n", l),
        })
        .collect();

    for (second, name) in [(two_shapes_obj(), "shapes.abc"), (without_normals, "normals.abc")] {
        let fixture = Fixture::new();
        fixture.write_manifest(&manifest_json("cube", &[(0, &["red", "blue"]), (12, &["red", "blue"])]));
        fixture.write_frame("cube", 0, &cube_obj(1.0, "cube"));
        fixture.write_frame("cube", 12, &second);
        let out = fixture.output_path(name);

        let err = convert_manifest(&fixture.manifest_path(), &out, &ConvertOptions::default()).unwrap_err();
        assert!(
            matches!(err, Error::MultipleMeshes { .. } | Error::MissingAttribute { attribute: "normal", .. }),
            "{}",
            err
        );
        assert!(!out.exists());
        assert!(!fixture.output_path(&format!("{}.partial", name)).exists());
    }
}

#[test]
fn test_archive_is_ogawa() {
    let fixture = Fixture::red_blue_cube();
    let out = fixture.output_path("cube.abc");
    convert_manifest(&fixture.manifest_path(), &out, &ConvertOptions::default()).unwrap();

    let bytes = std::fs::read(&out).unwrap();
    assert_eq!(&bytes[..5], b"Ogawa");
    let doc = ArchiveDocument::open(&out).unwrap();
    assert_eq!(doc.library_version, 10810);
    assert!(doc
        .archive_metadata
        .get("_ai_AlembicVersion")
        .is_some_and(|v| v.starts_with("Alembic 1.8.10")));
    assert_eq!(doc.root.name, "ABC");
}
