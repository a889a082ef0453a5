//! zsh fragment emission for terminal plugins and profiles

use crate::errors::CompileError;
use dvm_manifest::{AttributeValue, DecodedRecord, ResourceRecord};
use serde_json::{Map, Value};
use std::borrow::Cow;
use tracing::warn;

/// How a terminal plugin gets loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Manager {
    Manual,
    Antidote,
    Zinit,
    OhMyZsh,
}

impl Manager {
    pub fn from_name(name: &str) -> Option<Manager> {
        match name {
            "manual" => Some(Manager::Manual),
            "antidote" => Some(Manager::Antidote),
            "zinit" => Some(Manager::Zinit),
            "oh-my-zsh" => Some(Manager::OhMyZsh),
            _ => None,
        }
    }
}

/// Quote a value for a POSIX shell
pub fn quote(value: &str) -> Cow<'_, str> {
    shell_words::quote(value)
}

/// Double-quote a path, leaving `$VAR` expansion intact in `expandable` only.
///
/// `literal` comes from manifest data, so `$` is escaped there too.
fn quote_path(expandable: &str, literal: &str) -> String {
    let mut out = String::with_capacity(expandable.len() + literal.len() + 2);
    out.push('"');
    for ch in expandable.chars() {
        if matches!(ch, '"' | '\\' | '`') {
            out.push('\\');
        }
        out.push(ch);
    }
    for ch in literal.chars() {
        if matches!(ch, '"' | '\\' | '`' | '$') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

/// Comment line carrying a resource name
pub fn comment(text: &str) -> String {
    let printable: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    format!("# {printable}")
}

/// Last path segment of a repository reference, without a `.git` suffix
pub fn repo_basename(repo: &str) -> &str {
    let trimmed = repo.trim_end_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    last.strip_suffix(".git").unwrap_or(last)
}

fn text<'a>(decoded: &'a DecodedRecord, field: &str) -> Option<&'a str> {
    match decoded.get(field) {
        Some(AttributeValue::Text(value)) => Some(value),
        _ => None,
    }
}

/// Non-blank code lines with trailing whitespace removed
fn code_lines(decoded: &DecodedRecord, field: &str) -> Vec<String> {
    match decoded.get(field) {
        Some(AttributeValue::Code(code)) => code
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.trim_end().to_string())
            .collect(),
        _ => Vec::new(),
    }
}

fn is_env_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_alias_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_.:+@%^!~,".contains(c))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

fn options<'a>(decoded: &'a DecodedRecord, field: &str) -> Option<&'a Map<String, Value>> {
    match decoded.get(field) {
        Some(AttributeValue::Options(map)) => Some(map),
        _ => None,
    }
}

/// Sorted `export` lines; invalid variable names are skipped
fn export_lines(decoded: &DecodedRecord, owner: &str) -> Vec<String> {
    let Some(env) = options(decoded, "env") else {
        return Vec::new();
    };
    let mut names: Vec<&String> = env.keys().collect();
    names.sort();
    names
        .into_iter()
        .filter_map(|name| {
            if !is_env_name(name) {
                warn!("Skipping invalid environment variable '{}' in '{}'", name, owner);
                return None;
            }
            let value = env.get(name).and_then(scalar_text)?;
            Some(format!("export {}={}", name, quote(&value)))
        })
        .collect()
}

/// Sorted `alias` lines; invalid alias names are skipped
fn alias_lines(decoded: &DecodedRecord, owner: &str) -> Vec<String> {
    let Some(aliases) = options(decoded, "aliases") else {
        return Vec::new();
    };
    let mut names: Vec<&String> = aliases.keys().collect();
    names.sort();
    names
        .into_iter()
        .filter_map(|name| {
            if !is_alias_name(name) {
                warn!("Skipping invalid alias '{}' in '{}'", name, owner);
                return None;
            }
            let value = aliases.get(name).and_then(scalar_text)?;
            Some(format!("alias {}={}", name, quote(&value)))
        })
        .collect()
}

/// Load line(s) for a terminal plugin
fn load_lines(record: &ResourceRecord, decoded: &DecodedRecord, plugin_dir: &str) -> Result<Vec<String>, CompileError> {
    if let Some(builtin) = record.builtin_ref.as_deref().filter(|b| !b.is_empty()) {
        return Ok(vec![format!("plugins+=({})", quote(builtin))]);
    }
    let repo = record
        .source_ref
        .as_deref()
        .filter(|r| !r.is_empty())
        .ok_or_else(|| CompileError::MissingSource {
            kind: record.kind,
            name: record.name.clone(),
        })?;

    let manager_name = text(decoded, "manager").unwrap_or("manual");
    let manager = Manager::from_name(manager_name).unwrap_or_else(|| {
        warn!("Unknown manager '{}' for '{}', loading manually", manager_name, record.name);
        Manager::Manual
    });
    let deferred = text(decoded, "loadMode") == Some("deferred");
    let source = text(decoded, "source").filter(|s| !s.is_empty());
    let basename = repo_basename(repo);

    let lines = match manager {
        Manager::Manual => {
            let file = source.map_or_else(|| format!("{basename}.plugin.zsh"), str::to_string);
            let path = quote_path(
                &format!("{}/", plugin_dir.trim_end_matches('/')),
                &format!("{basename}/{file}"),
            );
            let prefix = if deferred { "zsh-defer " } else { "" };
            vec![format!("{prefix}source {path}")]
        }
        Manager::Antidote => {
            let mut line = format!("antidote bundle {}", quote(repo));
            if let Some(source) = source {
                line.push_str(&format!(" {}", quote(&format!("path:{source}"))));
            }
            if deferred {
                line.push_str(" kind:defer");
            }
            vec![line]
        }
        Manager::Zinit => {
            let mut lines = Vec::new();
            if deferred || source.is_some() {
                let mut ice = "zinit ice".to_string();
                if deferred {
                    ice.push_str(" wait lucid");
                }
                if let Some(source) = source {
                    ice.push_str(&format!(" pick{}", quote_path("", source)));
                }
                lines.push(ice);
            }
            lines.push(format!("zinit light {}", quote(repo)));
            lines
        }
        Manager::OhMyZsh => vec![format!("plugins+=({})", quote(basename))],
    };
    Ok(lines)
}

/// Fragment for one terminal plugin, starting with its name comment
pub fn plugin_fragment(
    record: &ResourceRecord,
    decoded: &DecodedRecord,
    plugin_dir: &str,
) -> Result<Vec<String>, CompileError> {
    if !record.enabled {
        return Ok(vec![comment(&format!("{} (disabled)", record.name))]);
    }
    let mut lines = vec![comment(&record.name)];
    lines.extend(load_lines(record, decoded, plugin_dir)?);
    lines.extend(export_lines(decoded, &record.name));
    lines.extend(code_lines(decoded, "config"));
    Ok(lines)
}

/// Profile body: exports, aliases, member plugin fragments, then init code.
///
/// `members` pairs each resolved plugin with its decoded attributes, in
/// listed order.
pub fn profile_fragment(
    record: &ResourceRecord,
    decoded: &DecodedRecord,
    members: &[(&ResourceRecord, DecodedRecord)],
    plugin_dir: &str,
) -> Result<Vec<String>, CompileError> {
    if !record.enabled {
        return Ok(vec![comment(&format!("{} (disabled)", record.name))]);
    }
    let mut lines = vec![comment(&record.name)];

    lines.extend(export_lines(decoded, &record.name));
    lines.extend(alias_lines(decoded, &record.name));

    for (member, member_decoded) in members {
        lines.push(String::new());
        lines.extend(plugin_fragment(member, member_decoded, plugin_dir)?);
    }

    let init = code_lines(decoded, "init");
    if !init.is_empty() {
        lines.push(String::new());
        lines.extend(init);
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dvm_manifest::{decode_record, ResourceKind};

    #[test]
    fn test_repo_basename() {
        assert_eq!(repo_basename("zsh-users/zsh-autosuggestions"), "zsh-autosuggestions");
        assert_eq!(repo_basename("https://github.com/agkozak/zsh-z.git"), "zsh-z");
        assert_eq!(repo_basename("romkatv/powerlevel10k/"), "powerlevel10k");
        assert_eq!(repo_basename("plain"), "plain");
    }

    #[test]
    fn test_quote_path_keeps_variables() {
        assert_eq!(quote_path("$HOME/a \"b\"", ""), "\"$HOME/a \\\"b\\\"\"");
        assert_eq!(quote_path("$HOME/", "${x}`y`"), "\"$HOME/\\${x}\\`y\\`\"");
    }

    fn terminal_plugin(repo: &str, attributes: &[(&str, &str)]) -> (ResourceRecord, DecodedRecord) {
        let mut record = ResourceRecord::new(ResourceKind::TerminalPlugin, "p").with_source(repo);
        for (field, blob) in attributes {
            record = record.with_attribute(field, *blob);
        }
        let decoded = decode_record(&record);
        (record, decoded)
    }

    #[test]
    fn test_repo_substitution_stays_literal() {
        let (record, decoded) = terminal_plugin("x/$(echo INJECTED)", &[]);
        let lines = load_lines(&record, &decoded, "$HOME/plugins");
        assert!(matches!(
            lines.as_deref(),
            Ok([line]) if line == "source \"$HOME/plugins/\\$(echo INJECTED)/\\$(echo INJECTED).plugin.zsh\""
        ));
    }

    #[test]
    fn test_source_substitution_stays_literal() {
        let (record, decoded) = terminal_plugin(
            "owner/plugin",
            &[("manager", "\"zinit\""), ("source", "\"${HOME}.zsh\"")],
        );
        let lines = load_lines(&record, &decoded, "$HOME/plugins");
        assert!(matches!(
            lines.as_deref(),
            Ok([ice, light]) if ice == "zinit ice pick\"\\${HOME}.zsh\"" && light == "zinit light owner/plugin"
        ));
    }

    #[test]
    fn test_names() {
        assert!(is_env_name("EDITOR"));
        assert!(is_env_name("_x1"));
        assert!(!is_env_name("1X"));
        assert!(!is_env_name("A-B"));
        assert!(is_alias_name("ll"));
        assert!(is_alias_name("g.st"));
        assert!(!is_alias_name("rm -rf"));
        assert!(!is_alias_name("a;b"));
    }

    #[test]
    fn test_manager_names() {
        assert_eq!(Manager::from_name("zinit"), Some(Manager::Zinit));
        assert_eq!(Manager::from_name("oh-my-zsh"), Some(Manager::OhMyZsh));
        assert_eq!(Manager::from_name("homebrew"), None);
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(scalar_text(&Value::Null), None);
        assert_eq!(scalar_text(&Value::from(3)), Some("3".to_string()));
        assert_eq!(scalar_text(&Value::from("x")), Some("x".to_string()));
    }
}
