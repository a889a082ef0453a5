use crate::common::{decode_mode, open_store};
use crate::errors::CliError;
use crate::GlobalOpts;
use dvm_codegen::{generate, resolve_each, CompileOptions, ConfigCompiler, FailurePolicy};
use dvm_config::Config;
use dvm_manifest::ResourceKind;
use dvm_store::ResourceStore;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct GenerateCommand {
    pub kind: ResourceKind,
    pub names: Vec<String>,
    pub all: bool,
    pub out: Option<PathBuf>,
    pub keep_going: bool,
    pub strict: bool,
}

/// Compile resources and write one file per resource under the output root
pub fn handle_generate(cmd: GenerateCommand, opts: &GlobalOpts) -> Result<(), CliError> {
    let config = Config::load()?;
    let mode = decode_mode(&config, cmd.strict)?;
    let store = open_store(opts, &config)?;
    let out_dir = match cmd.out {
        Some(dir) => dir,
        None => config.get_output_dir()?,
    };

    let names = if cmd.all {
        store
            .list(cmd.kind)?
            .into_iter()
            .map(|record| record.name)
            .collect()
    } else {
        cmd.names
    };
    if names.is_empty() {
        dvm_logger::warn(&format!("No {} resources to generate", cmd.kind.cli_name()));
        return Ok(());
    }

    let compiler = ConfigCompiler::new(CompileOptions {
        indent_width: config.get_indent_width(),
        decode_mode: mode,
        plugin_dir: config.get_plugin_dir(),
    });
    let policy = if cmd.keep_going {
        FailurePolicy::KeepGoing
    } else {
        FailurePolicy::FailFast
    };

    dvm_logger::spinner_start(&format!("Generating {} file(s)...", names.len()));
    let mut units = Vec::with_capacity(names.len());
    let mut unresolved = Vec::new();
    for outcome in resolve_each(&store, cmd.kind, &names, mode) {
        match outcome {
            Ok(unit) => units.push(unit),
            Err(e) if cmd.keep_going => unresolved.push(e),
            Err(e) => {
                dvm_logger::spinner_error("Generation failed");
                return Err(e.into());
            }
        }
    }
    let mut report = match generate(&compiler, &units, &out_dir, policy) {
        Ok(report) => report,
        Err(e) => {
            dvm_logger::spinner_error("Generation failed");
            return Err(e.into());
        }
    };
    report.failures.splice(0..0, unresolved);
    dvm_logger::spinner_stop();

    for path in &report.written {
        println!("{}", path.display());
    }
    if !report.is_success() {
        for failure in &report.failures {
            dvm_logger::error(&failure.to_string());
        }
        return Err(CliError::GenerationFailed {
            failed: report.failures.len(),
            total: names.len(),
        });
    }

    dvm_logger::success(&format!(
        "Generated {} file(s) in {}",
        report.written.len(),
        out_dir.display()
    ));
    Ok(())
}
