//! objseq CLI - convert keyframed OBJ sequences into a scene archive.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use objseq::atlas::{ChartOptions, PackOptions};
use objseq::convert::{convert_manifest, ConvertOptions, UnassignedFacePolicy, UnwrapMode};
use objseq::core::TimeSamplingType;
use objseq::writer::{ArchiveDocument, OObject};

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("OBJSEQ_BUILD_DATE"), ")");

#[derive(Parser)]
#[command(name = "objseq")]
#[command(about = "Converts a sequence of meshes to a scene archive, unwrapping UVs along the way")]
#[command(version = VERSION)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// The objseq manifest file
    #[arg(value_name = "FILE")]
    manifest: Option<PathBuf>,

    /// The path to the archive file
    #[arg(value_name = "OUTFILE")]
    output: Option<PathBuf>,

    /// The objseq manifest file
    #[arg(short = 'f', long = "file", conflicts_with = "manifest")]
    file: Option<PathBuf>,

    /// The path to the archive file
    #[arg(short = 'o', long = "outfile", conflicts_with = "output")]
    outfile: Option<PathBuf>,

    /// Keep the OBJ texcoords instead of generating an atlas
    #[arg(long)]
    no_unwrap: bool,

    /// Fail when a face matches none of its frame's materials
    #[arg(long)]
    strict_materials: bool,

    /// Worker threads for frame building (0 = one per core)
    #[arg(short, long, default_value_t = 0)]
    jobs: usize,

    /// Atlas width in pixels (0 = automatic)
    #[arg(long, default_value_t = 0)]
    resolution: u32,

    /// Pixels between charts
    #[arg(long, default_value_t = 1)]
    padding: u32,

    /// Atlas pixels per world unit (0 = automatic)
    #[arg(long, default_value_t = 0.0)]
    texels_per_unit: f32,

    #[command(flatten)]
    verbosity: Verbosity,
}

#[derive(clap::Args)]
struct Verbosity {
    /// Show debug output (-vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only show errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

impl Verbosity {
    fn level(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "error",
            (false, 0) => "info",
            (false, 1) => "debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show time samplings and the object hierarchy of a written archive
    Info {
        /// Archive file
        archive: PathBuf,

        /// Dump the decoded archive as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.verbosity.level())),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(Commands::Info { archive, json }) = &cli.command {
        return cmd_info(archive, *json);
    }

    let (Some(manifest), Some(output)) = (cli.file.clone().or(cli.manifest.clone()), cli.outfile.clone().or(cli.output.clone())) else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let options = ConvertOptions {
        unwrap_mode: if cli.no_unwrap { UnwrapMode::PassThrough } else { UnwrapMode::Generate },
        unassigned_faces: if cli.strict_materials {
            UnassignedFacePolicy::Strict
        } else {
            UnassignedFacePolicy::Lenient
        },
        chart: ChartOptions::default(),
        pack: PackOptions {
            resolution: cli.resolution,
            padding: cli.padding,
            texels_per_unit: cli.texels_per_unit,
        },
        jobs: cli.jobs,
        ..Default::default()
    };

    tracing::info!("Converting {:?} -> {:?}", manifest, output);
    let summary = convert_manifest(&manifest, &output, &options)
        .with_context(|| format!("Failed to convert {}", manifest.display()))?;
    tracing::info!(
        "Done! {} material(s), {} object(s), {} frame(s)",
        summary.materials,
        summary.objects,
        summary.frames
    );
    Ok(())
}

fn cmd_info(path: &Path, json: bool) -> Result<()> {
    let doc = ArchiveDocument::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    if json {
        println!("{}", doc.to_json()?);
        return Ok(());
    }

    println!("Archive: {}", path.display());
    for (key, value) in doc.archive_metadata.iter() {
        println!("  {} = {}", key, value);
    }
    println!();

    println!("Time Samplings ({}):", doc.time_samplings.len());
    for (i, entry) in doc.time_samplings.iter().enumerate() {
        let type_str = match &entry.sampling.sampling_type {
            TimeSamplingType::Identity => "Identity".to_string(),
            TimeSamplingType::Acyclic { times } => format!("Acyclic ({} times)", times.len()),
        };
        println!("  [{}] {} - {} samples", i, type_str, entry.max_samples);
    }
    println!();

    println!("Object Hierarchy:");
    print_tree(&doc.root, 0);
    Ok(())
}

fn print_tree(obj: &OObject, depth: usize) {
    let indent = "  ".repeat(depth);
    let schema = obj.meta_data.schema().unwrap_or_default();

    if depth == 0 {
        println!("{}/", obj.name);
    } else if schema.is_empty() {
        println!("{}{}", indent, obj.name);
    } else {
        println!("{}{} [{}]", indent, obj.name, schema_to_type(schema));
    }

    for child in &obj.children {
        print_tree(child, depth + 1);
    }
}

fn schema_to_type(schema: &str) -> &str {
    match schema {
        "AbcGeom_PolyMesh_v1" => "PolyMesh",
        "AbcGeom_FaceSet_v1" => "FaceSet",
        "AbcMaterial_Material_v1" => "Material",
        other => other,
    }
}
