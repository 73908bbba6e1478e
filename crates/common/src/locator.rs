//! Element descriptors
//!
//! A [`Descriptor`] names an element the way a page object thinks about it (by
//! ARIA role, visible text, label, test id or CSS) without binding to any
//! particular automation engine. Unions built with [`Descriptor::or`] are
//! ordered: drivers try candidates in priority order.

use std::fmt;

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

/// How a piece of text (accessible name, label, URL) is matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TextMatch {
    /// Whole-string equality
    Exact { value: String },
    /// Substring match
    Contains { value: String },
    /// Regular expression search
    Regex {
        pattern: String,
        #[serde(default)]
        ignore_case: bool,
    },
}

impl TextMatch {
    pub fn exact(value: impl Into<String>) -> Self {
        Self::Exact { value: value.into() }
    }

    pub fn contains(value: impl Into<String>) -> Self {
        Self::Contains { value: value.into() }
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Self::Regex {
            pattern: pattern.into(),
            ignore_case: false,
        }
    }

    /// Case-insensitive regular expression, the form most page objects use.
    pub fn iregex(pattern: impl Into<String>) -> Self {
        Self::Regex {
            pattern: pattern.into(),
            ignore_case: true,
        }
    }

    /// Evaluate the match locally. An uncompilable pattern matches nothing.
    pub fn is_match(&self, haystack: &str) -> bool {
        match self {
            TextMatch::Exact { value } => haystack == value,
            TextMatch::Contains { value } => haystack.contains(value.as_str()),
            TextMatch::Regex {
                pattern,
                ignore_case,
            } => RegexBuilder::new(pattern)
                .case_insensitive(*ignore_case)
                .build()
                .map(|re| re.is_match(haystack))
                .unwrap_or(false),
        }
    }
}

impl fmt::Display for TextMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextMatch::Exact { value } => write!(f, "\"{}\"", value),
            TextMatch::Contains { value } => write!(f, "~\"{}\"", value),
            TextMatch::Regex {
                pattern,
                ignore_case,
            } => write!(f, "/{}/{}", pattern, if *ignore_case { "i" } else { "" }),
        }
    }
}

/// A tagged element descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Descriptor {
    /// ARIA role with optional accessible name and heading level
    Role {
        role: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<TextMatch>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        level: Option<u8>,
    },

    /// Visible text content
    Text { text: TextMatch },

    /// Form control by associated label
    Label { text: TextMatch },

    /// Input by placeholder attribute
    Placeholder { text: TextMatch },

    /// `data-testid` attribute
    TestId { id: String },

    /// Raw CSS selector
    Css { selector: String },

    /// Ordered union; the first candidate that resolves wins
    AnyOf { candidates: Vec<Descriptor> },

    /// `inner` resolved relative to `scope`
    Within {
        scope: Box<Descriptor>,
        inner: Box<Descriptor>,
    },

    /// The `index`-th match of `inner` (zero based)
    Nth { inner: Box<Descriptor>, index: usize },
}

impl Descriptor {
    pub fn role(role: impl Into<String>) -> Self {
        Self::Role {
            role: role.into(),
            name: None,
            level: None,
        }
    }

    pub fn role_named(role: impl Into<String>, name: TextMatch) -> Self {
        Self::Role {
            role: role.into(),
            name: Some(name),
            level: None,
        }
    }

    /// Heading at a given level, e.g. the `h3` title of a story card.
    pub fn heading(level: u8) -> Self {
        Self::Role {
            role: "heading".to_string(),
            name: None,
            level: Some(level),
        }
    }

    pub fn text(text: TextMatch) -> Self {
        Self::Text { text }
    }

    pub fn label(text: TextMatch) -> Self {
        Self::Label { text }
    }

    pub fn placeholder(text: TextMatch) -> Self {
        Self::Placeholder { text }
    }

    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId { id: id.into() }
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css {
            selector: selector.into(),
        }
    }

    /// Append `other` as a lower-priority alternative.
    ///
    /// Nested unions are flattened so priority order stays a flat list.
    pub fn or(self, other: Descriptor) -> Self {
        let mut candidates = match self {
            Descriptor::AnyOf { candidates } => candidates,
            single => vec![single],
        };
        match other {
            Descriptor::AnyOf { candidates: more } => candidates.extend(more),
            single => candidates.push(single),
        }
        Descriptor::AnyOf { candidates }
    }

    pub fn nth(self, index: usize) -> Self {
        Descriptor::Nth {
            inner: Box::new(self),
            index,
        }
    }

    pub fn first(self) -> Self {
        self.nth(0)
    }

    /// Scope this descriptor to matches inside `scope`.
    pub fn within(self, scope: Descriptor) -> Self {
        Descriptor::Within {
            scope: Box::new(scope),
            inner: Box::new(self),
        }
    }

    /// Union candidates in priority order; a plain descriptor is its own single candidate.
    pub fn candidates(&self) -> Vec<&Descriptor> {
        match self {
            Descriptor::AnyOf { candidates } => candidates.iter().collect(),
            single => vec![single],
        }
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Descriptor::Role { role, name, level } => {
                write!(f, "role={}", role)?;
                if let Some(level) = level {
                    write!(f, "[level={}]", level)?;
                }
                if let Some(name) = name {
                    write!(f, "[name={}]", name)?;
                }
                Ok(())
            }
            Descriptor::Text { text } => write!(f, "text={}", text),
            Descriptor::Label { text } => write!(f, "label={}", text),
            Descriptor::Placeholder { text } => write!(f, "placeholder={}", text),
            Descriptor::TestId { id } => write!(f, "testid={}", id),
            Descriptor::Css { selector } => write!(f, "css={}", selector),
            Descriptor::AnyOf { candidates } => {
                write!(f, "(")?;
                for (i, candidate) in candidates.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", candidate)?;
                }
                write!(f, ")")
            }
            Descriptor::Within { scope, inner } => write!(f, "{} >> {}", scope, inner),
            Descriptor::Nth { inner, index } => write!(f, "{}.nth({})", inner, index),
        }
    }
}
