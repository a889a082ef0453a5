use crate::common::{decode_mode, open_store};
use crate::errors::CliError;
use crate::GlobalOpts;
use clap::ValueEnum;
use colored::Colorize;
use dvm_config::Config;
use dvm_manifest::{render_yaml, to_manifest_with, write_to_path, Manifest, ResourceKind, ResourceRecord};
use dvm_store::ResourceStore;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Debug, Clone)]
pub struct GetCommand {
    pub kind: ResourceKind,
    pub name: Option<String>,
    pub output: Option<OutputFormat>,
    pub file: Option<PathBuf>,
    pub strict: bool,
}

/// Print or export manifests.
///
/// With a name, prints that resource's manifest. Without one, lists names,
/// or prints every manifest of the kind when an output format or file is given.
pub fn handle_get(cmd: GetCommand, opts: &GlobalOpts) -> Result<(), CliError> {
    let config = Config::load()?;
    let mode = decode_mode(&config, cmd.strict)?;
    let store = open_store(opts, &config)?;

    let records = match cmd.name {
        Some(ref name) => vec![store.get(cmd.kind, name)?],
        None => store.list(cmd.kind)?,
    };

    if cmd.name.is_none() && cmd.output.is_none() && cmd.file.is_none() {
        print_names(cmd.kind, &records);
        return Ok(());
    }

    let manifests = records
        .iter()
        .map(|record| to_manifest_with(record, mode))
        .collect::<Result<Vec<Manifest>, _>>()?;

    if let Some(ref path) = cmd.file {
        write_to_path(&manifests, path)?;
        dvm_logger::success(&format!(
            "Exported {} manifest(s) to {}",
            manifests.len(),
            path.display()
        ));
        return Ok(());
    }

    let rendered = match cmd.output.unwrap_or(OutputFormat::Yaml) {
        OutputFormat::Yaml => render_yaml(&manifests)?,
        OutputFormat::Json => match (cmd.name.is_some(), manifests.as_slice()) {
            (true, [single]) => single.to_json_pretty()?,
            _ => serde_json::to_string_pretty(&manifests)?,
        },
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

fn print_names(kind: ResourceKind, records: &[ResourceRecord]) {
    if records.is_empty() {
        dvm_logger::warn(&format!("No {} resources found", kind.cli_name()));
        return;
    }
    println!("{}", "NAME".bold());
    for record in records {
        if record.enabled {
            println!("{}", record.name);
        } else {
            println!("{} {}", record.name, "(disabled)".dimmed());
        }
    }
}
