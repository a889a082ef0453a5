use crate::common::open_store;
use crate::errors::CliError;
use crate::GlobalOpts;
use dvm_config::Config;
use dvm_manifest::ResourceKind;
use dvm_store::ResourceStore;

/// Delete one resource. References to it from packages or profiles are left
/// in place and fail at their next generation.
pub fn handle_delete(kind: ResourceKind, name: &str, opts: &GlobalOpts) -> Result<(), CliError> {
    let config = Config::load()?;
    let store = open_store(opts, &config)?;
    store.delete(kind, name)?;
    dvm_logger::success(&format!("{}/{} deleted", kind.cli_name(), name));
    Ok(())
}
