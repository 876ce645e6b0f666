//! Generate protocol buffer descriptors from FHIR StructureDefinitions
//!
//! Usage:
//!   ferrum-protogen --core core.json --known-types r4-core.json --known-package google.fhir.r4.core \
//!     --input my-profile.json --package my.profiles --output my_profiles.json

use anyhow::{Context, Result};
use clap::Parser;
use ferrum_models::StructureDefinition;
use ferrum_protogen::{CoreVersion, PackageInfo, ProtoGenerator, Registry};
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "ferrum-protogen")]
#[command(about = "Generate protocol buffer descriptors from FHIR StructureDefinitions")]
struct Args {
    /// StructureDefinitions (or Bundles of them) that generated types may reference
    #[arg(long, num_args = 1..)]
    known_types: Vec<PathBuf>,

    /// Package the known types are generated in (defaults to --package)
    #[arg(long)]
    known_package: Option<String>,

    /// StructureDefinitions (or Bundles of them) to generate
    #[arg(short, long, num_args = 1.., required = true)]
    input: Vec<PathBuf>,

    /// Proto package of the generated messages
    #[arg(short, long)]
    package: String,

    #[arg(long)]
    java_package: Option<String>,

    #[arg(long)]
    go_package: Option<String>,

    /// Core version manifest (JSON); defaults to R4
    #[arg(long)]
    core: Option<PathBuf>,

    /// Add a ContainedResource union over the generated resources
    #[arg(long)]
    contained_resource: bool,

    /// Emit typed references such as `PatientOrGroupReference`
    #[arg(long)]
    typed_references: bool,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let core = match &args.core {
        Some(path) => serde_json::from_value::<CoreVersion>(read_json(path)?)
            .with_context(|| format!("Invalid core version manifest {}", path.display()))?,
        None => CoreVersion::default(),
    };
    let known_package = args.known_package.clone().unwrap_or_else(|| args.package.clone());

    let mut known = Vec::new();
    for path in &args.known_types {
        known.extend(
            load_definitions(path)?
                .into_iter()
                .map(|sd| (sd, known_package.clone())),
        );
    }

    let mut inputs = Vec::new();
    for path in &args.input {
        inputs.extend(load_definitions(path)?);
    }
    let known_urls: HashSet<String> = known.iter().filter_map(|(sd, _)| sd.url.clone()).collect();
    for sd in &inputs {
        if !sd.url.as_ref().is_some_and(|url| known_urls.contains(url)) {
            known.push((sd.clone(), args.package.clone()));
        }
    }

    info!(
        known = known.len(),
        inputs = inputs.len(),
        package = %args.package,
        "Building registry"
    );
    let registry = Registry::new(known, core).context("Failed to build known-type registry")?;

    let package_info = PackageInfo {
        java_proto_package: args.java_package.clone().unwrap_or_default(),
        go_proto_package: args.go_package.clone().unwrap_or_default(),
        use_typed_references: args.typed_references,
        ..PackageInfo::new(&args.package)
    };
    let mut generator = ProtoGenerator::new(&registry, package_info);
    let mut file = generator
        .generate_file_descriptor(&inputs)
        .context("Failed to generate descriptors")?;
    if args.contained_resource {
        file = generator
            .add_contained_resource(file)
            .context("Failed to add ContainedResource")?;
    }

    let rendered = serde_json::to_string_pretty(&file)?;
    match &args.output {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(
                messages = file.message_types.len(),
                output = %path.display(),
                "Wrote file descriptor"
            );
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

fn read_json(path: &Path) -> Result<JsonValue> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

/// A StructureDefinition, or every StructureDefinition entry of a Bundle
fn load_definitions(path: &Path) -> Result<Vec<StructureDefinition>> {
    let json = read_json(path)?;
    let resources: Vec<&JsonValue> = match json.get("resourceType").and_then(JsonValue::as_str) {
        Some("Bundle") => json
            .get("entry")
            .and_then(JsonValue::as_array)
            .into_iter()
            .flatten()
            .filter_map(|entry| entry.get("resource"))
            .filter(|resource| {
                resource.get("resourceType").and_then(JsonValue::as_str)
                    == Some("StructureDefinition")
            })
            .collect(),
        _ => vec![&json],
    };

    resources
        .into_iter()
        .map(|resource| {
            StructureDefinition::from_value(resource)
                .with_context(|| format!("Invalid StructureDefinition in {}", path.display()))
        })
        .collect()
}
