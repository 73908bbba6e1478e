//! Structured text extraction
//!
//! Status lines such as `Available Tokens: 300 | Selected: 2 (10 tokens) |
//! Remaining: 290` are free-form and only partially rendered in some UI states.
//! Each field is extracted independently: a field whose pattern does not match
//! is reported as unknown (`None`), which is distinct from zero.

use std::collections::BTreeMap;

use regex::Regex;
use serde::Serialize;

use crate::error::{Error, Result};

/// A named field and the pattern that captures its value.
#[derive(Debug, Clone)]
pub struct ExtractionPattern {
    field: String,
    regex: Regex,
}

impl ExtractionPattern {
    /// Compile `pattern`, which must have exactly one capture group.
    pub fn new(field: impl Into<String>, pattern: &str) -> Result<Self> {
        let field = field.into();
        let regex = Regex::new(pattern).map_err(|e| Error::InvalidPattern {
            field: field.clone(),
            reason: e.to_string(),
        })?;

        // captures_len counts the implicit whole-match group
        let groups = regex.captures_len() - 1;
        if groups != 1 {
            return Err(Error::InvalidPattern {
                field,
                reason: format!("expected exactly one capture group, found {}", groups),
            });
        }

        Ok(Self { field, regex })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// The captured integer, if the pattern matches and the capture parses.
    pub fn apply(&self, text: &str) -> Option<i64> {
        self.regex
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().trim().parse::<i64>().ok())
    }
}

/// Ordered set of extraction patterns keyed by field name.
#[derive(Debug, Clone, Default)]
pub struct PatternTable {
    patterns: Vec<ExtractionPattern>,
}

impl PatternTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field. A repeated field name replaces the earlier pattern.
    pub fn field(mut self, name: impl Into<String>, pattern: &str) -> Result<Self> {
        self.insert(ExtractionPattern::new(name, pattern)?);
        Ok(self)
    }

    pub fn insert(&mut self, pattern: ExtractionPattern) {
        match self.patterns.iter_mut().find(|p| p.field == pattern.field) {
            Some(existing) => *existing = pattern,
            None => self.patterns.push(pattern),
        }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtractionPattern> {
        self.patterns.iter()
    }
}

/// Field name to extracted value. Holds exactly the requested field names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    values: BTreeMap<String, Option<i64>>,
}

impl ExtractionResult {
    /// Value for `field`; `None` when unknown or not requested.
    pub fn get(&self, field: &str) -> Option<i64> {
        self.values.get(field).copied().flatten()
    }

    /// Whether `field` was requested.
    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn is_known(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Requested fields whose value is unknown.
    pub fn missing(&self) -> Vec<&str> {
        self.values
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| k.as_str())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<i64>)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Extract every field in `table` from `text`.
pub fn extract_fields(text: &str, table: &PatternTable) -> ExtractionResult {
    let values = table
        .iter()
        .map(|pattern| (pattern.field.clone(), pattern.apply(text)))
        .collect();
    ExtractionResult { values }
}
