//! Manifest to archive conversion.
//!
//! For every object the keyframes are built independently (load, unwrap,
//! expand, partition) on the rayon pool, then written in keyframe order.
//! The archive is persisted only after every object converted.

mod expand;
mod partition;
mod sequence;
mod unwrap;

pub use expand::{expand_generated, expand_pass_through, ExpandedFrame};
pub use partition::{partition_faces, Partition};
pub use sequence::{keyframe_times, material_path, BuiltFrame, ObjectWriter, UV_SOURCE_NAME};
pub use unwrap::{unwrap_frame, UnwrapResult, UnwrappedVertex};

use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, info, info_span, warn};

use crate::atlas::{ChartOptions, PackOptions};
use crate::core::TimeSampling;
use crate::manifest::{Keyframe, Manifest, ObjectSpec};
use crate::mesh::load_frame;
use crate::util::{Error, Result};
use crate::writer::{OArchive, OMaterial, OObject, ShaderBinding};

/// Where the UVs of the written meshes come from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnwrapMode {
    /// Generate an atlas per frame.
    #[default]
    Generate,
    /// Keep the texcoords of the frame files.
    PassThrough,
}

/// What to do with faces whose material is not active in their frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnassignedFacePolicy {
    /// Warn and leave them out of every face set.
    #[default]
    Lenient,
    /// Warn and fail the conversion.
    Strict,
}

/// Conversion options.
#[derive(Clone, Debug, Default)]
pub struct ConvertOptions {
    pub unwrap_mode: UnwrapMode,
    pub unassigned_faces: UnassignedFacePolicy,
    pub chart: ChartOptions,
    pub pack: PackOptions,
    /// Shader bound to every material record.
    pub shader: ShaderBinding,
    /// Worker threads for frame building; 0 uses rayon's default.
    pub jobs: usize,
}

/// What a conversion wrote.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConvertSummary {
    pub materials: usize,
    pub objects: usize,
    pub frames: usize,
}

/// Load a manifest and convert it.
pub fn convert_manifest(manifest_path: &Path, output: &Path, options: &ConvertOptions) -> Result<ConvertSummary> {
    let manifest = Manifest::load(manifest_path)?;
    convert(&manifest, output, options)
}

/// Convert a loaded manifest into an archive at `output`.
pub fn convert(manifest: &Manifest, output: &Path, options: &ConvertOptions) -> Result<ConvertSummary> {
    let pool = if options.jobs > 0 {
        Some(
            rayon::ThreadPoolBuilder::new()
                .num_threads(options.jobs)
                .build()
                .map_err(|e| Error::other(format!("Failed to start worker pool: {}", e)))?,
        )
    } else {
        None
    };

    let mut archive = OArchive::create(output)?;
    archive.set_app_name(&format!("objseq {}", env!("CARGO_PKG_VERSION")));
    archive.set_dcc_fps(manifest.frame_rate as f64);
    archive.set_metadata("frameStart", &manifest.frame_start.to_string());
    archive.set_metadata("frameEnd", &manifest.frame_end.to_string());
    archive.set_metadata("loop", if manifest.looping { "true" } else { "false" });

    let mut root = OObject::new("ABC");
    root.add_child(build_materials(&manifest.materials, &options.shader));

    let mut summary = ConvertSummary {
        materials: manifest.materials.len(),
        ..Default::default()
    };
    for object in &manifest.objects {
        let _span = info_span!("object", name = %object.name).entered();
        // an object without keyframes keeps the identity sampling
        let time_sampling = if object.keyframes.is_empty() {
            0
        } else {
            archive.add_time_sampling(TimeSampling::acyclic(keyframe_times(manifest, object)))
        };

        let frames: Vec<Result<BuiltFrame>> = match &pool {
            Some(pool) => pool.install(|| build_frames(manifest, object, options)),
            None => build_frames(manifest, object, options),
        };

        let mut writer = ObjectWriter::new(&object.name, &manifest.materials, time_sampling)?;
        for frame in frames {
            let frame = frame?;
            writer.write_frame(&frame)?;
            debug!(frame = frame.frame, slot = frame.slot, faces = frame.sample.num_faces(), "frame written");
        }
        root.add_child(writer.finish()?);

        summary.objects += 1;
        summary.frames += object.keyframes.len();
        info!(keyframes = object.keyframes.len(), "object converted");
    }

    archive.write_archive(&root)?;
    info!(
        path = %output.display(),
        objects = summary.objects,
        frames = summary.frames,
        "archive written"
    );
    Ok(summary)
}

/// Top level `materials` object with one record per manifest material.
fn build_materials(materials: &[String], shader: &ShaderBinding) -> OObject {
    let mut parent = OObject::new("materials");
    for name in materials {
        let mut material = OMaterial::new(name);
        material.add_shader(&shader.target, &shader.shader_type, &shader.shader_name);
        parent.add_child(material.build());
    }
    parent
}

/// Build every keyframe of an object in parallel; results keep keyframe order.
fn build_frames(manifest: &Manifest, object: &ObjectSpec, options: &ConvertOptions) -> Vec<Result<BuiltFrame>> {
    object
        .keyframes
        .par_iter()
        .enumerate()
        .map(|(slot, keyframe)| build_frame(manifest, object, slot as u32, keyframe, options))
        .collect()
}

/// Load, unwrap, expand and partition one keyframe.
pub fn build_frame(
    manifest: &Manifest,
    object: &ObjectSpec,
    slot: u32,
    keyframe: &Keyframe,
    options: &ConvertOptions,
) -> Result<BuiltFrame> {
    let path = manifest.frame_path(&object.name, keyframe.frame);
    let _span = info_span!("frame", object = %object.name, frame = keyframe.frame).entered();
    debug!(path = %path.display(), "loading frame");

    let raw = load_frame(&path)?;
    let expanded = match options.unwrap_mode {
        UnwrapMode::Generate => {
            let unwrap = unwrap_frame(&raw, &options.chart, &options.pack)?;
            debug!(
                charts = unwrap.chart_count,
                width = unwrap.width,
                height = unwrap.height,
                "atlas generated"
            );
            expand_generated(&raw, &unwrap)?
        }
        UnwrapMode::PassThrough => expand_pass_through(&path, &raw)?,
    };

    let partition = partition_faces(&expanded.face_materials, keyframe.materials.len());
    if partition.unassigned > 0 {
        warn!(
            unassigned = partition.unassigned,
            faces = expanded.sample.num_faces(),
            "faces match no active material"
        );
        if options.unassigned_faces == UnassignedFacePolicy::Strict {
            return Err(Error::UnassignedFaces {
                object: object.name.clone(),
                frame: keyframe.frame,
                count: partition.unassigned,
            });
        }
    }

    Ok(BuiltFrame {
        slot,
        frame: keyframe.frame,
        sample: expanded.sample,
        face_sets: keyframe.materials.iter().cloned().zip(partition.sets).collect(),
    })
}
