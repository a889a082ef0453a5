//! Batch file generation
//!
//! A run compiles every unit, reserves every output path, and only then
//! starts writing. Under `KeepGoing` a unit that fails to compile is
//! reported and the rest are still written. Each file is written whole to a temporary sibling and
//! renamed over the target, so an interrupted run leaves complete files or
//! none.

use crate::compiler::{CompileUnit, ConfigCompiler};
use crate::errors::{CompileError, GenerateError};
use crate::slug::slugify;
use dvm_manifest::ResourceKind;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What to do when a unit cannot be compiled or written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop at the first failure
    #[default]
    FailFast,
    /// Record the failure and write the remaining files
    KeepGoing,
}

/// Outcome of a batch run
#[derive(Debug, Default)]
pub struct GenerateReport {
    pub written: Vec<PathBuf>,
    pub failures: Vec<GenerateError>,
}

impl GenerateReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Directory and extension of a kind's artifacts, relative to the output root
pub fn artifact_location(kind: ResourceKind) -> (&'static str, &'static str) {
    match kind {
        ResourceKind::NvimPlugin => ("nvim/plugins", "lua"),
        ResourceKind::NvimTheme => ("nvim/themes", "lua"),
        ResourceKind::NvimPackage => ("nvim/packages", "lua"),
        ResourceKind::TerminalPlugin => ("shell/plugins", "zsh"),
        ResourceKind::TerminalProfile => ("shell/profiles", "zsh"),
    }
}

/// Output path for one resource
pub fn artifact_path(out_dir: &Path, kind: ResourceKind, name: &str) -> Result<PathBuf, CompileError> {
    let (dir, ext) = artifact_location(kind);
    Ok(out_dir.join(dir).join(format!("{}.{ext}", slugify(name)?)))
}

struct Planned<'a> {
    name: &'a str,
    path: PathBuf,
    content: String,
}

/// Compile and write a batch of units under `out_dir`
pub fn generate(
    compiler: &ConfigCompiler,
    units: &[CompileUnit],
    out_dir: &Path,
    policy: FailurePolicy,
) -> Result<GenerateReport, GenerateError> {
    let outcomes: Vec<Result<Planned<'_>, GenerateError>> = units
        .par_iter()
        .map(|unit| {
            let wrap = |source| GenerateError::Compile {
                name: unit.name().to_string(),
                source,
            };
            let path = artifact_path(out_dir, unit.kind(), unit.name()).map_err(wrap)?;
            let content = compiler.compile(unit).map_err(wrap)?;
            Ok(Planned {
                name: unit.name(),
                path,
                content,
            })
        })
        .collect();

    let mut report = GenerateReport::default();
    let mut compiled = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome {
            Ok(planned) => compiled.push(planned),
            Err(err) => match policy {
                FailurePolicy::FailFast => return Err(err),
                FailurePolicy::KeepGoing => {
                    warn!("Skipping: {}", err);
                    report.failures.push(err);
                }
            },
        }
    }

    reserve_paths(&compiled)?;

    for planned in compiled {
        match write_atomic(&planned.path, &planned.content) {
            Ok(()) => {
                debug!("Generated '{}' at {:?}", planned.name, planned.path);
                report.written.push(planned.path);
            }
            Err(err) => match policy {
                FailurePolicy::FailFast => return Err(err),
                FailurePolicy::KeepGoing => {
                    warn!("Skipping '{}': {}", planned.name, err);
                    report.failures.push(err);
                }
            },
        }
    }

    info!(
        "Generated {} file(s) under {:?} ({} failed)",
        report.written.len(),
        out_dir,
        report.failures.len()
    );
    Ok(report)
}

/// Reject two distinct resources mapping to one output path
fn reserve_paths(planned: &[Planned<'_>]) -> Result<(), GenerateError> {
    let mut reserved: HashMap<&Path, &str> = HashMap::with_capacity(planned.len());
    for item in planned {
        if let Some(first) = reserved.insert(&item.path, item.name) {
            if first != item.name {
                return Err(GenerateError::DuplicateFilename {
                    path: item.path.clone(),
                    first: first.to_string(),
                    second: item.name.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Write a whole file via a temporary sibling and a rename
pub fn write_atomic(path: &Path, content: &str) -> Result<(), GenerateError> {
    let filesystem = |source| GenerateError::Filesystem {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(filesystem)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    if let Err(err) = fs::write(&tmp, content) {
        let _ = fs::remove_file(&tmp);
        return Err(filesystem(err));
    }
    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(filesystem(err));
    }
    Ok(())
}
