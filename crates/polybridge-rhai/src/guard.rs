//! Annotation-guard pass.
//!
//! A static, source-text transformation that runs before compilation. It
//! recovers declared parameter/return types from `//#` annotation comments
//! and neutralizes the markers so the guest compiler sees only plain
//! comments. The pass never executes guest code, is idempotent under
//! re-application, and tolerates sources with no annotations at all.
//!
//! Recognized syntax, one annotation per line:
//!
//! ```text
//! //# name(param: type, param: type) -> type
//! ```
//!
//! The return clause is optional. The annotation is keyed by function name,
//! so it may appear anywhere in the file; the last annotation for a name
//! wins.

use std::collections::HashMap;
use tracing::warn;

/// Declared types for one function, recovered from its annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionAnnotation {
    /// Function name the annotation refers to.
    pub name: String,

    /// Ordered `(parameter name, type name)` pairs.
    pub params: Vec<(String, String)>,

    /// Declared return type name, if any.
    pub ret: Option<String>,
}

/// Result of the guard pass: cleaned source plus the annotation map.
#[derive(Debug, Clone)]
pub struct GuardedSource {
    /// Source with annotation markers neutralized into plain comments.
    pub source: String,

    /// Annotations keyed by function name.
    pub annotations: HashMap<String, FunctionAnnotation>,
}

/// Neutralize an interpreter directive line.
///
/// The `#!` is overwritten with `//` in place rather than deleted, so line
/// and column numbers in downstream diagnostics stay stable.
pub fn neutralize_shebang(source: &str) -> String {
    match source.strip_prefix("#!") {
        Some(rest) => format!("//{rest}"),
        None => source.to_string(),
    }
}

/// Run the guard pass over a source text.
pub fn parse(source: &str) -> GuardedSource {
    let mut annotations = HashMap::new();
    let mut cleaned = String::with_capacity(source.len());

    for line in source.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if let Some(body) = trimmed.strip_prefix("//#") {
            match parse_annotation(body) {
                Some(annotation) => {
                    annotations.insert(annotation.name.clone(), annotation);
                }
                None => warn!("Ignoring malformed annotation: {}", trimmed.trim_end()),
            }
            // Neutralize the marker in place: '#' becomes a space, keeping
            // the line length unchanged.
            cleaned.push_str(&line.replacen("//#", "// ", 1));
        } else {
            cleaned.push_str(line);
        }
    }

    GuardedSource {
        source: cleaned,
        annotations,
    }
}

/// Parse the body of one annotation (everything after the `//#` marker).
fn parse_annotation(body: &str) -> Option<FunctionAnnotation> {
    let body = body.trim();

    let open = body.find('(')?;
    let close = body.find(')')?;
    if close < open {
        return None;
    }

    let name = body[..open].trim();
    if !is_identifier(name) {
        return None;
    }

    let mut params = Vec::new();
    for piece in body[open + 1..close].split(',') {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        let (param_name, type_name) = piece.split_once(':')?;
        let (param_name, type_name) = (param_name.trim(), type_name.trim());
        if !is_identifier(param_name) || !is_identifier(type_name) {
            return None;
        }
        params.push((param_name.to_string(), type_name.to_string()));
    }

    let rest = body[close + 1..].trim();
    let ret = if rest.is_empty() {
        None
    } else {
        let ret_name = rest.strip_prefix("->")?.trim();
        if !is_identifier(ret_name) {
            return None;
        }
        Some(ret_name.to_string())
    };

    Some(FunctionAnnotation {
        name: name.to_string(),
        params,
        ret,
    })
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with(|c: char| c.is_ascii_digit())
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
