//! Lua table-literal writer
//!
//! Generated specs are built as a small expression tree and rendered in one
//! pass. Inline tables stay on one line (`{ "a", "b" }`); block tables put one
//! entry per line with a trailing comma.

use serde_json::{Map, Value};
use std::fmt::Write as _;

const KEYWORDS: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

/// Quote a string as a Lua double-quoted literal
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_ascii_control() => {
                let _ = write!(out, "\\{:03}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Whether a key can be written bare (`key = ...`)
pub fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !KEYWORDS.contains(&key)
}

/// Table key in assignment position
pub fn key(name: &str) -> String {
    if is_identifier(name) {
        name.to_string()
    } else {
        format!("[{}]", quote(name))
    }
}

/// A Lua expression awaiting rendering
#[derive(Debug, Clone, PartialEq)]
pub enum LuaExpr {
    /// Already-rendered single-line expression
    Atom(String),
    /// Table rendered on one line
    Inline(Vec<Entry>),
    /// Table rendered one entry per line
    Block(Vec<Entry>),
    /// Anonymous function with a verbatim body
    Function { params: &'static str, body: Vec<String> },
}

/// One table entry, positional or keyed
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: Option<String>,
    pub value: LuaExpr,
}

impl Entry {
    pub fn positional(value: LuaExpr) -> Self {
        Entry { key: None, value }
    }

    pub fn keyed(name: &str, value: LuaExpr) -> Self {
        Entry {
            key: Some(key(name)),
            value,
        }
    }
}

impl LuaExpr {
    pub fn string(s: &str) -> Self {
        LuaExpr::Atom(quote(s))
    }

    pub fn boolean(b: bool) -> Self {
        LuaExpr::Atom(b.to_string())
    }

    pub fn integer(n: i64) -> Self {
        LuaExpr::Atom(n.to_string())
    }

    /// Inline list of string literals
    pub fn strings<'a>(items: impl IntoIterator<Item = &'a String>) -> Self {
        LuaExpr::Inline(
            items
                .into_iter()
                .map(|item| Entry::positional(LuaExpr::string(item)))
                .collect(),
        )
    }

    /// Convert free-form JSON. Object keys are sorted at every level and
    /// `null` members are skipped; array order is kept.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => LuaExpr::Atom("nil".to_string()),
            Value::Bool(b) => LuaExpr::boolean(*b),
            Value::Number(n) => LuaExpr::Atom(n.to_string()),
            Value::String(s) => LuaExpr::string(s),
            Value::Array(items) => {
                let entries: Vec<Entry> = items
                    .iter()
                    .map(|item| Entry::positional(LuaExpr::from_json(item)))
                    .collect();
                if items.iter().all(is_atomic) {
                    LuaExpr::Inline(entries)
                } else {
                    LuaExpr::Block(entries)
                }
            }
            Value::Object(map) => LuaExpr::from_map(map),
        }
    }

    /// Block table from a JSON object, keys sorted
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let mut keys: Vec<&String> = map.keys().collect();
        keys.sort();
        LuaExpr::Block(
            keys.into_iter()
                .filter_map(|k| match map.get(k) {
                    Some(Value::Null) | None => None,
                    Some(member) => Some(Entry::keyed(k, LuaExpr::from_json(member))),
                })
                .collect(),
        )
    }

    /// Function literal whose body is the given code re-indented.
    ///
    /// Lines that are blank after trimming are dropped; every other line keeps
    /// its own relative indentation.
    pub fn function(params: &'static str, code: &str) -> Self {
        LuaExpr::Function {
            params,
            body: code
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| line.trim_end().to_string())
                .collect(),
        }
    }

    /// Render at the given nesting depth
    pub fn render(&self, indent: &str, depth: usize) -> String {
        let mut out = String::new();
        self.render_into(&mut out, indent, depth);
        out
    }

    fn render_into(&self, out: &mut String, indent: &str, depth: usize) {
        match self {
            LuaExpr::Atom(text) => out.push_str(text),
            LuaExpr::Inline(entries) => {
                if entries.is_empty() {
                    out.push_str("{}");
                    return;
                }
                out.push_str("{ ");
                for (index, entry) in entries.iter().enumerate() {
                    if index > 0 {
                        out.push_str(", ");
                    }
                    if let Some(ref k) = entry.key {
                        out.push_str(k);
                        out.push_str(" = ");
                    }
                    entry.value.render_into(out, indent, depth);
                }
                out.push_str(" }");
            }
            LuaExpr::Block(entries) => {
                if entries.is_empty() {
                    out.push_str("{}");
                    return;
                }
                out.push_str("{\n");
                let inner = indent.repeat(depth + 1);
                for entry in entries {
                    out.push_str(&inner);
                    if let Some(ref k) = entry.key {
                        out.push_str(k);
                        out.push_str(" = ");
                    }
                    entry.value.render_into(out, indent, depth + 1);
                    out.push_str(",\n");
                }
                out.push_str(&indent.repeat(depth));
                out.push('}');
            }
            LuaExpr::Function { params, body } => {
                out.push_str("function(");
                out.push_str(params);
                out.push_str(")\n");
                let inner = indent.repeat(depth + 1);
                for line in body {
                    out.push_str(&inner);
                    out.push_str(line);
                    out.push('\n');
                }
                out.push_str(&indent.repeat(depth));
                out.push_str("end");
            }
        }
    }
}

fn is_atomic(value: &Value) -> bool {
    matches!(value, Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_))
}

/// Header comment line for a generated file
pub fn header(kind: &str, name: &str) -> String {
    let printable: String = name
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    format!("-- Generated by dvm from {kind} \"{printable}\". Edits will be overwritten.\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("plain"), "\"plain\"");
        assert_eq!(quote("a\"b\\c"), "\"a\\\"b\\\\c\"");
        assert_eq!(quote("line\nbreak\ttab"), "\"line\\nbreak\\ttab\"");
        assert_eq!(quote("\u{1}"), "\"\\001\"");
        assert_eq!(quote("<leader>ff"), "\"<leader>ff\"");
    }

    #[test]
    fn test_keys() {
        assert_eq!(key("layout_strategy"), "layout_strategy");
        assert_eq!(key("end"), "[\"end\"]");
        assert_eq!(key("with-dash"), "[\"with-dash\"]");
        assert_eq!(key("1st"), "[\"1st\"]");
        assert_eq!(key(""), "[\"\"]");
    }

    #[test]
    fn test_json_objects_sorted_and_nulls_skipped() {
        let value = json!({"zeta": 1, "alpha": {"b": true, "a": null}, "mid": ["x", 2]});
        let rendered = LuaExpr::from_json(&value).render("  ", 0);
        assert_eq!(
            rendered,
            "{\n  alpha = {\n    b = true,\n  },\n  mid = { \"x\", 2 },\n  zeta = 1,\n}"
        );
    }

    #[test]
    fn test_nested_arrays_render_as_blocks() {
        let value = json!([{"a": 1}, "b"]);
        let rendered = LuaExpr::from_json(&value).render("  ", 0);
        assert_eq!(rendered, "{\n  {\n    a = 1,\n  },\n  \"b\",\n}");
    }

    #[test]
    fn test_function_reindents_and_drops_blank_lines() {
        let expr = LuaExpr::function("_, opts", "\nrequire(\"x\").setup(opts)\n  vim.g.x = 1\n   \n");
        assert_eq!(
            expr.render("  ", 1),
            "function(_, opts)\n    require(\"x\").setup(opts)\n      vim.g.x = 1\n  end"
        );
    }

    #[test]
    fn test_empty_tables() {
        assert_eq!(LuaExpr::Inline(Vec::new()).render("  ", 0), "{}");
        assert_eq!(LuaExpr::Block(Vec::new()).render("  ", 3), "{}");
    }

    #[test]
    fn test_header_strips_control_characters() {
        assert_eq!(
            header("NvimPlugin", "bad\nname"),
            "-- Generated by dvm from NvimPlugin \"bad name\". Edits will be overwritten.\n"
        );
    }
}
