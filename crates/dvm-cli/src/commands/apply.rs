use crate::common::open_store;
use crate::errors::CliError;
use crate::GlobalOpts;
use dvm_config::Config;
use dvm_manifest::parse_records;
use dvm_store::ResourceStore;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

/// Read manifest text from a file, or stdin for `-`
fn read_source(file: &Path) -> Result<String, CliError> {
    if file == Path::new("-") {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    fs::read_to_string(file).map_err(|source| CliError::Read {
        path: file.to_path_buf(),
        source,
    })
}

/// Parse every document in a manifest file, then upsert each resource.
///
/// Nothing is written unless the whole file parses.
pub fn handle_apply(file: &Path, opts: &GlobalOpts) -> Result<(), CliError> {
    let text = read_source(file)?;
    let records = parse_records(&text)?;
    if records.is_empty() {
        dvm_logger::warn(&format!("No manifests found in {}", file.display()));
        return Ok(());
    }
    dvm_logger::debug(&format!("Parsed {} manifest(s) from {}", records.len(), file.display()));

    let config = Config::load()?;
    let store = open_store(opts, &config)?;
    for record in records {
        let existed = store.exists(record.kind, &record.name)?;
        let stored = store.upsert(record)?;
        let verb = if existed { "configured" } else { "created" };
        dvm_logger::success(&format!("{}/{} {}", stored.kind.cli_name(), stored.name, verb));
    }
    Ok(())
}
