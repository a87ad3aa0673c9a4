// src/content/frontmatter.rs
//! Front-matter split + validation for submodule articles.

use serde_yaml::{Mapping, Value};
use std::fmt;

const FRONTMATTER_DELIM: &str = "---";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontMatter {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub date: String,
    pub header_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontMatterError {
    /// The YAML block exists but does not parse as a mapping.
    Malformed(String),
    MissingFields(Vec<&'static str>),
}

impl fmt::Display for FrontMatterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrontMatterError::Malformed(e) => write!(f, "malformed front-matter: {e}"),
            FrontMatterError::MissingFields(fields) => {
                write!(f, "missing required front-matter fields: {}", fields.join(", "))
            }
        }
    }
}

impl std::error::Error for FrontMatterError {}

/// Split `text` into (raw front-matter, body). A document without a leading
/// `---` block has empty front-matter and is returned whole as body.
pub fn split(text: &str) -> (&str, &str) {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let Some(first_nl) = text.find('\n') else {
        return ("", text);
    };
    if text[..first_nl].trim_end() != FRONTMATTER_DELIM {
        return ("", text);
    }

    let rest = &text[first_nl + 1..];
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FRONTMATTER_DELIM {
            let raw = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (raw, body);
        }
        offset += line.len();
    }
    // Unterminated block: treat as plain markdown.
    ("", text)
}

/// Parse and validate a full markdown document. Returns the record and body.
pub fn parse(text: &str) -> Result<(FrontMatter, &str), FrontMatterError> {
    let (raw, body) = split(text);
    let map = if raw.trim().is_empty() {
        Mapping::new()
    } else {
        match serde_yaml::from_str::<Value>(raw) {
            Ok(Value::Mapping(m)) => m,
            Ok(Value::Null) => Mapping::new(),
            Ok(other) => {
                return Err(FrontMatterError::Malformed(format!(
                    "expected a mapping, got {}",
                    value_kind(&other)
                )))
            }
            Err(e) => return Err(FrontMatterError::Malformed(e.to_string())),
        }
    };

    let title = field(&map, "title");
    let slug = field(&map, "slug");
    let description = field(&map, "description");
    let date = field(&map, "date");

    let mut missing = Vec::new();
    for (name, v) in [
        ("title", &title),
        ("slug", &slug),
        ("description", &description),
        ("date", &date),
    ] {
        if v.is_none() {
            missing.push(name);
        }
    }
    if !missing.is_empty() {
        return Err(FrontMatterError::MissingFields(missing));
    }

    Ok((
        FrontMatter {
            title: title.unwrap_or_default(),
            slug: slug.unwrap_or_default(),
            description: description.unwrap_or_default(),
            date: date.unwrap_or_default(),
            header_image: field(&map, "headerImage"),
        },
        body,
    ))
}

/// Scalar field as a non-empty string; empty strings count as missing.
fn field(map: &Mapping, key: &str) -> Option<String> {
    let s = match map.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn value_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}
