//! Weak-reference resolution
//!
//! Packages and profiles name their members; the names are looked up in the
//! store only when generating. A name that no longer resolves is an error for
//! that unit, never a silent skip.

use crate::compiler::CompileUnit;
use crate::errors::{CompileError, GenerateError};
use dvm_manifest::{decode_record, AttributeValue, DecodeMode, ResourceKind, ResourceRecord};
use dvm_store::{ResourceStore, StoreError};
use std::collections::HashSet;
use tracing::debug;

/// Attach resolved members to a record
pub fn resolve_unit(
    store: &dyn ResourceStore,
    record: ResourceRecord,
    mode: DecodeMode,
) -> Result<CompileUnit, CompileError> {
    let members = match record.kind {
        ResourceKind::NvimPackage => {
            let names = package_plugin_names(store, &record, mode)?;
            fetch(store, ResourceKind::NvimPlugin, &names, &record.name)?
        }
        ResourceKind::TerminalProfile => {
            let names = string_list(&record, "plugins", mode)?;
            fetch(store, ResourceKind::TerminalPlugin, &names, &record.name)?
        }
        ResourceKind::NvimPlugin | ResourceKind::NvimTheme | ResourceKind::TerminalPlugin => Vec::new(),
    };
    Ok(CompileUnit { record, members })
}

/// Load named records of one kind and resolve each into a unit.
///
/// Every name gets its own outcome, in input order, so a caller may keep
/// going past a missing or dangling one.
pub fn resolve_each(
    store: &dyn ResourceStore,
    kind: ResourceKind,
    names: &[String],
    mode: DecodeMode,
) -> Vec<Result<CompileUnit, GenerateError>> {
    names
        .iter()
        .map(|name| {
            store
                .get(kind, name)
                .map_err(CompileError::from)
                .and_then(|record| resolve_unit(store, record, mode))
                .map_err(|source| GenerateError::Compile {
                    name: name.clone(),
                    source,
                })
        })
        .collect()
}

/// Plugin names of a package, `extends` ancestors first, duplicates removed
/// keeping the first occurrence
pub fn package_plugin_names(
    store: &dyn ResourceStore,
    package: &ResourceRecord,
    mode: DecodeMode,
) -> Result<Vec<String>, CompileError> {
    let mut chain = vec![package.clone()];
    let mut visited: HashSet<String> = HashSet::from([package.name.clone()]);
    loop {
        let current = chain.last().unwrap_or(package);
        let Some(parent_name) = text(current, "extends", mode)? else {
            break;
        };
        if !visited.insert(parent_name.clone()) {
            let mut cycle: Vec<String> = chain.iter().map(|p| p.name.clone()).collect();
            cycle.push(parent_name);
            return Err(CompileError::ReferenceCycle { chain: cycle });
        }
        debug!("Package '{}' extends '{}'", current.name, parent_name);
        let parent = lookup(store, ResourceKind::NvimPackage, &parent_name, &current.name)?;
        chain.push(parent);
    }

    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for ancestor in chain.iter().rev() {
        for name in string_list(ancestor, "plugins", mode)? {
            if seen.insert(name.clone()) {
                names.push(name);
            }
        }
    }
    Ok(names)
}

fn text(record: &ResourceRecord, field: &str, mode: DecodeMode) -> Result<Option<String>, CompileError> {
    let decoded = decode_record(record).resolve(mode)?;
    Ok(match decoded.get(field) {
        Some(AttributeValue::Text(value)) if !value.is_empty() => Some(value.clone()),
        _ => None,
    })
}

fn string_list(record: &ResourceRecord, field: &str, mode: DecodeMode) -> Result<Vec<String>, CompileError> {
    let decoded = decode_record(record).resolve(mode)?;
    Ok(match decoded.get(field) {
        Some(AttributeValue::Strings(items)) => items.clone(),
        _ => Vec::new(),
    })
}

fn lookup(
    store: &dyn ResourceStore,
    kind: ResourceKind,
    name: &str,
    referrer: &str,
) -> Result<ResourceRecord, CompileError> {
    store.get(kind, name).map_err(|err| match err {
        StoreError::NotFound { kind, name } => CompileError::Unresolved {
            kind,
            name,
            referrer: referrer.to_string(),
        },
        other => CompileError::Store(other),
    })
}

fn fetch(
    store: &dyn ResourceStore,
    kind: ResourceKind,
    names: &[String],
    referrer: &str,
) -> Result<Vec<ResourceRecord>, CompileError> {
    names
        .iter()
        .map(|name| lookup(store, kind, name, referrer))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dvm_store::MemoryStore;

    fn plugin(name: &str) -> ResourceRecord {
        ResourceRecord::new(ResourceKind::NvimPlugin, name).with_source(format!("owner/{name}"))
    }

    fn package(name: &str, plugins: &[&str], extends: Option<&str>) -> ResourceRecord {
        let list = serde_json::to_string(plugins).unwrap_or_default();
        let mut record = ResourceRecord::new(ResourceKind::NvimPackage, name).with_attribute("plugins", list);
        if let Some(parent) = extends {
            record = record.with_attribute("extends", format!("\"{parent}\""));
        }
        record
    }

    #[test]
    fn test_extends_puts_ancestors_first_and_dedups() {
        let store = MemoryStore::with_records([
            plugin("a"),
            plugin("b"),
            plugin("c"),
            package("base", &["a", "b"], None),
            package("mid", &["b", "c"], Some("base")),
        ]);
        let full = package("full", &["c", "a"], Some("mid"));
        let names = package_plugin_names(&store, &full, DecodeMode::Lenient);
        assert!(names.is_ok_and(|n| n == vec!["a", "b", "c"]));
    }

    #[test]
    fn test_extends_cycle_is_an_error() {
        let store = MemoryStore::with_records([
            package("one", &[], Some("two")),
            package("two", &[], Some("one")),
        ]);
        let one = package("one", &[], Some("two"));
        let result = package_plugin_names(&store, &one, DecodeMode::Lenient);
        assert!(matches!(
            result,
            Err(CompileError::ReferenceCycle { ref chain }) if chain == &["one", "two", "one"]
        ));
    }

    #[test]
    fn test_self_extension_is_a_cycle() {
        let store = MemoryStore::new();
        let selfish = package("me", &[], Some("me"));
        assert!(matches!(
            package_plugin_names(&store, &selfish, DecodeMode::Lenient),
            Err(CompileError::ReferenceCycle { .. })
        ));
    }

    #[test]
    fn test_dangling_member_is_unresolved() {
        let store = MemoryStore::with_records([plugin("a")]);
        let core = package("core", &["a", "gone"], None);
        let result = resolve_unit(&store, core, DecodeMode::Lenient);
        assert!(matches!(
            result,
            Err(CompileError::Unresolved { ref name, ref referrer, .. }) if name == "gone" && referrer == "core"
        ));
    }

    #[test]
    fn test_profile_members_in_listed_order() {
        let store = MemoryStore::with_records([
            ResourceRecord::new(ResourceKind::TerminalPlugin, "z").with_builtin("z"),
            ResourceRecord::new(ResourceKind::TerminalPlugin, "git").with_builtin("git"),
        ]);
        let profile = ResourceRecord::new(ResourceKind::TerminalProfile, "dev")
            .with_attribute("plugins", r#"["z","git"]"#);
        let unit = resolve_unit(&store, profile, DecodeMode::Lenient);
        assert!(unit.is_ok_and(|u| u.members.iter().map(|m| m.name.as_str()).eq(["z", "git"])));
    }

    #[test]
    fn test_resolve_each_reports_per_name() {
        let store = MemoryStore::with_records([plugin("a"), package("core", &["a", "gone"], None)]);
        let outcomes = resolve_each(
            &store,
            ResourceKind::NvimPackage,
            &["core".to_string(), "ghost".to_string()],
            DecodeMode::Lenient,
        );
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(
            &outcomes[0],
            Err(GenerateError::Compile { name, source: CompileError::Unresolved { .. } }) if name == "core"
        ));
        assert!(matches!(
            &outcomes[1],
            Err(GenerateError::Compile { name, source: CompileError::Store(StoreError::NotFound { .. }) })
                if name == "ghost"
        ));

        let outcomes = resolve_each(&store, ResourceKind::NvimPlugin, &["a".to_string()], DecodeMode::Lenient);
        assert!(matches!(outcomes.as_slice(), [Ok(unit)] if unit.name() == "a"));
    }
}
