//! Manifest file helpers
//!
//! Reading and writing manifest documents on disk. Multiple manifests in one
//! file are separated by `---`.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::codec::parse_manifests;
use crate::types::Manifest;

/// Render manifests as one multi-document YAML string
pub fn render_yaml(manifests: &[Manifest]) -> Result<String> {
    let mut out = String::new();
    for (index, manifest) in manifests.iter().enumerate() {
        if index > 0 {
            out.push_str("---\n");
        }
        out.push_str(&manifest.to_yaml()?);
    }
    Ok(out)
}

/// Write manifests to a path as multi-document YAML
pub fn write_to_path(manifests: &[Manifest], output_path: &Path) -> Result<()> {
    debug!("Writing {} manifest(s) to {:?}", manifests.len(), output_path);

    let yaml = render_yaml(manifests)?;
    fs::write(output_path, yaml)
        .with_context(|| format!("Failed to write manifests to {}", output_path.display()))?;

    info!("Manifests written to: {:?}", output_path);
    Ok(())
}

/// Read every manifest document in a file
pub fn read_from_path(manifest_path: &Path) -> Result<Vec<Manifest>> {
    debug!("Reading manifests from {:?}", manifest_path);

    let content = fs::read_to_string(manifest_path)
        .with_context(|| format!("Failed to read {}", manifest_path.display()))?;
    let manifests = parse_manifests(&content)
        .with_context(|| format!("Invalid manifest file {}", manifest_path.display()))?;

    debug!("Loaded {} manifest(s)", manifests.len());
    Ok(manifests)
}

#[cfg(test)]
mod tests {
    use crate::codec::{from_manifest, to_manifest};
    use crate::manifest_writer::*;
    use crate::types::{ResourceKind, ResourceRecord};
    use tempfile::TempDir;

    #[test]
    fn test_write_and_read_custom_path() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let manifest_path = temp_dir.path().join("plugins.yaml");

        let records = vec![
            ResourceRecord::new(ResourceKind::NvimPlugin, "plenary").with_source("nvim-lua/plenary.nvim"),
            ResourceRecord::new(ResourceKind::TerminalPlugin, "git").with_builtin("git"),
        ];
        let manifests: Vec<_> = records.iter().map(to_manifest).collect();

        assert!(write_to_path(&manifests, &manifest_path).is_ok());

        let loaded = read_from_path(&manifest_path);
        assert!(loaded.as_ref().is_ok_and(|m| m.len() == 2), "{loaded:?}");
        let loaded = loaded.unwrap_or_default();
        assert_eq!(loaded, manifests);
        assert!(from_manifest(&loaded[0]).is_ok_and(|r| r == records[0]));
    }

    #[test]
    fn test_read_missing_file_reports_path() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let missing = temp_dir.path().join("missing.yaml");
        let Err(err) = read_from_path(&missing) else {
            panic!("reading a missing file should fail");
        };
        assert!(format!("{err:#}").contains("missing.yaml"));
    }

    #[test]
    fn test_render_yaml_separates_documents() {
        let manifests = vec![
            to_manifest(&ResourceRecord::new(ResourceKind::NvimPlugin, "a").with_source("x/a")),
            to_manifest(&ResourceRecord::new(ResourceKind::NvimPlugin, "b").with_source("x/b")),
        ];
        let rendered = render_yaml(&manifests).unwrap_or_default();
        assert_eq!(rendered.matches("---\n").count(), 1);
        assert!(rendered.contains("apiVersion: devopsmaestro.io/v1"));
    }
}
