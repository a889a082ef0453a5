//! File names derived from resource names

use crate::errors::CompileError;

/// Lowercase, hyphenated, filesystem-safe form of a resource name.
///
/// Whitespace runs become one `-`; path separators and other characters that
/// are unsafe in file names are replaced by `-` as well. Leading and trailing
/// hyphens and dots are stripped, so a name made only of such characters is
/// rejected.
pub fn slugify(name: &str) -> Result<String, CompileError> {
    let mut slug = String::with_capacity(name.len());
    let mut pending_space = false;
    for ch in name.trim().chars() {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            slug.push('-');
            pending_space = false;
        }
        if is_hostile(ch) {
            slug.push('-');
        } else {
            slug.extend(ch.to_lowercase());
        }
    }

    let trimmed = slug.trim_matches(|c| c == '-' || c == '.');
    if trimmed.is_empty() {
        return Err(CompileError::InvalidSlug(name.to_string()));
    }
    Ok(trimmed.to_string())
}

fn is_hostile(ch: char) -> bool {
    matches!(ch, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0') || ch.is_control()
}
