//! Minimal URI templates for resources (`scheme://kind/{var}`).
//!
//! Only simple `{name}` expansions are supported. A variable matches one
//! non-empty path segment.

use crate::error::RegistryError;
use std::collections::BTreeMap;

/// Variables captured from a matched URI.
pub type UriVars = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Var(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl UriTemplate {
    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        let invalid = |reason: &str| RegistryError::InvalidTemplate {
            template: raw.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut rest = raw;
        while !rest.is_empty() {
            match rest.find('{') {
                Some(0) => {
                    let close = rest.find('}').ok_or_else(|| invalid("unclosed '{'"))?;
                    let name = &rest[1..close];
                    if name.is_empty() || name.contains('{') {
                        return Err(invalid("empty or nested variable"));
                    }
                    if matches!(segments.last(), Some(Segment::Var(_))) {
                        return Err(invalid("adjacent variables"));
                    }
                    segments.push(Segment::Var(name.to_string()));
                    rest = &rest[close + 1..];
                }
                Some(open) => {
                    segments.push(Segment::Literal(rest[..open].to_string()));
                    rest = &rest[open..];
                }
                None => {
                    if rest.contains('}') {
                        return Err(invalid("unmatched '}'"));
                    }
                    segments.push(Segment::Literal(rest.to_string()));
                    rest = "";
                }
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match `uri` against the template, returning the captured variables.
    pub fn matches(&self, uri: &str) -> Option<UriVars> {
        let mut vars = UriVars::new();
        let mut rest = uri;
        let mut segments = self.segments.iter().peekable();
        while let Some(segment) = segments.next() {
            match segment {
                Segment::Literal(literal) => rest = rest.strip_prefix(literal.as_str())?,
                Segment::Var(name) => {
                    let end = match segments.peek() {
                        Some(Segment::Literal(next)) => rest.find(next.as_str())?,
                        _ => rest.len(),
                    };
                    let value = &rest[..end];
                    if value.is_empty() || value.contains('/') {
                        return None;
                    }
                    vars.insert(name.clone(), value.to_string());
                    rest = &rest[end..];
                }
            }
        }
        rest.is_empty().then_some(vars)
    }
}
