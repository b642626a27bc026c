//! Fixture generator for conversion tests.
//!
//! Writes a manifest, a two-material library and cube frame files into
//! a temporary directory, laid out the way the converter expects them.

#![allow(dead_code)]

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Manifest file name used by every fixture.
pub const MANIFEST_NAME: &str = "seq.json";

/// Corners of a unit cube centered on the origin.
pub const CUBE_POSITIONS: [[f32; 3]; 8] = [
    [-0.5, -0.5, -0.5],
    [0.5, -0.5, -0.5],
    [0.5, 0.5, -0.5],
    [-0.5, 0.5, -0.5],
    [-0.5, -0.5, 0.5],
    [0.5, -0.5, 0.5],
    [0.5, 0.5, 0.5],
    [-0.5, 0.5, 0.5],
];

/// Quads as (corners, normal index), wound counter-clockwise from outside.
const CUBE_QUADS: [([usize; 4], usize); 6] = [
    ([0, 3, 2, 1], 0), // -Z
    ([4, 5, 6, 7], 1), // +Z
    ([0, 1, 5, 4], 2), // -Y
    ([3, 7, 6, 2], 3), // +Y
    ([0, 4, 7, 3], 4), // -X
    ([1, 2, 6, 5], 5), // +X
];

const CUBE_NORMALS: [[f32; 3]; 6] = [
    [0.0, 0.0, -1.0],
    [0.0, 0.0, 1.0],
    [0.0, -1.0, 0.0],
    [0.0, 1.0, 0.0],
    [-1.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
];

/// Number of triangles in a cube frame.
pub const CUBE_TRIANGLES: usize = 12;

/// Cube OBJ scaled by `scale`. The first three sides use `red`, the
/// rest `blue`.
pub fn cube_obj(scale: f32, name: &str) -> String {
    let mut obj = String::new();
    writeln!(obj, "mtllib materials.mtl").unwrap();
    writeln!(obj, "o {}", name).unwrap();
    for p in CUBE_POSITIONS {
        writeln!(obj, "v {} {} {}", p[0] * scale, p[1] * scale, p[2] * scale).unwrap();
    }
    for uv in [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]] {
        writeln!(obj, "vt {} {}", uv[0], uv[1]).unwrap();
    }
    for n in CUBE_NORMALS {
        writeln!(obj, "vn {} {} {}", n[0], n[1], n[2]).unwrap();
    }
    for (side, (quad, normal)) in CUBE_QUADS.iter().enumerate() {
        if side == 0 {
            writeln!(obj, "usemtl red").unwrap();
        } else if side == 3 {
            writeln!(obj, "usemtl blue").unwrap();
        }
        for tri in [[0, 1, 2], [0, 2, 3]] {
            let corners: Vec<String> = tri
                .iter()
                .map(|&c| format!("{}/{}/{}", quad[c] + 1, c + 1, normal + 1))
                .collect();
            writeln!(obj, "f {}", corners.join(" ")).unwrap();
        }
    }
    obj
}

/// Same cube without texcoords.
pub fn cube_obj_without_texcoords(scale: f32, name: &str) -> String {
    cube_obj(scale, name)
        .lines()
        .filter(|l| !l.starts_with("vt "))
        .map(|l| {
            if let Some(face) = l.strip_prefix("f ") {
                let corners: Vec<String> = face
                    .split_whitespace()
                    .map(|c| {
                        let parts: Vec<&str> = c.split('/').collect();
                        format!("{}//{}", parts[0], parts[2])
                    })
                    .collect();
                format!("f {}", corners.join(" "))
            } else {
                l.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Two separate shapes in one file.
pub fn two_shapes_obj() -> String {
    let mut obj = cube_obj(1.0, "first");
    let offset = CUBE_POSITIONS.len();
    writeln!(obj, "o second").unwrap();
    for p in CUBE_POSITIONS {
        writeln!(obj, "v {} {} {}", p[0] + 3.0, p[1], p[2]).unwrap();
    }
    writeln!(obj, "f {}//1 {}//1 {}//1", offset + 1, offset + 2, offset + 3).unwrap();
    obj
}

/// A sequence directory: manifest, material library and frame files.
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    /// Empty directory holding only the material library.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        fs::write(
            dir.path().join("materials.mtl"),
            "newmtl red\nKd 1 0 0\n\nnewmtl blue\nKd 0 0 1\n",
        )
        .expect("Failed to write mtl");
        Self { dir }
    }

    /// Red/blue cube with keyframes 0 and 12, the second scaled by 2.
    pub fn red_blue_cube() -> Self {
        let fixture = Self::new();
        fixture.write_manifest(&manifest_json(
            "cube",
            &[(0, &["red", "blue"]), (12, &["red", "blue"])],
        ));
        fixture.write_frame("cube", 0, &cube_obj(1.0, "cube"));
        fixture.write_frame("cube", 12, &cube_obj(2.0, "cube"));
        fixture
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.path().join(MANIFEST_NAME)
    }

    pub fn output_path(&self, name: &str) -> PathBuf {
        self.path().join(name)
    }

    pub fn write_manifest(&self, text: &str) {
        fs::write(self.manifest_path(), text).expect("Failed to write manifest");
    }

    /// Write `seq_{object}_{frame}.obj`.
    pub fn write_frame(&self, object: &str, frame: i64, obj: &str) {
        fs::write(self.path().join(format!("seq_{}_{}.obj", object, frame)), obj)
            .expect("Failed to write frame");
    }
}

/// Manifest with both materials declared and a single object.
pub fn manifest_json(object: &str, keyframes: &[(i64, &[&str])]) -> String {
    let keyframes: Vec<String> = keyframes
        .iter()
        .map(|(frame, materials)| {
            let materials: Vec<String> = materials.iter().map(|m| format!("\"{}\"", m)).collect();
            format!("{{\"frame\": {}, \"materials\": [{}]}}", frame, materials.join(", "))
        })
        .collect();
    let end = keyframes.len().saturating_sub(1) * 12;
    format!(
        r#"{{
    "frame_start": 0,
    "frame_end": {},
    "frame_rate": 24,
    "loop": true,
    "materials": ["red", "blue"],
    "objects": [{{"name": "{}", "keyframes": [{}]}}]
}}"#,
        end,
        object,
        keyframes.join(", ")
    )
}
