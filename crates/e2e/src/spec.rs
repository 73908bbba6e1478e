//! Declarative YAML test specification

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use pagesync_common::{Descriptor, ExtractionPattern, TextMatch, UiAction};

use crate::error::{E2eError, E2eResult};

/// A complete test specification parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSpec {
    /// Unique name for this test
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering tests
    #[serde(default)]
    pub tags: Vec<String>,

    /// Application under test; selects the base URL
    #[serde(default)]
    pub app: App,

    /// Skip unless tracker credentials are configured
    #[serde(default)]
    pub requires_credentials: bool,

    /// Steps to execute in order
    pub steps: Vec<TestStep>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum App {
    #[default]
    Storefront,
    Tracker,
}

/// A single step in a test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// Navigate to a URL (relative to the app's base URL)
    Navigate { url: String },

    Click {
        target: Descriptor,
        #[serde(default)]
        force: bool,
    },

    /// Fill an input; `${var}` placeholders are expanded
    Fill { target: Descriptor, value: String },

    Check {
        target: Descriptor,
        #[serde(default)]
        force: bool,
    },

    Uncheck {
        target: Descriptor,
        #[serde(default)]
        force: bool,
    },

    /// Select an option from a dropdown
    Select { target: Descriptor, value: String },

    /// Try strategies in order until one succeeds
    Attempt { strategies: Vec<Strategy> },

    /// Wait until any of the listed states holds
    WaitAny {
        states: Vec<StateSpec>,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    WaitUrl {
        pattern: TextMatch,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Read an element's text and extract integer fields from it
    Extract {
        target: Descriptor,
        fields: BTreeMap<String, String>,
        /// Expected values; `null` asserts the field is unknown
        #[serde(default)]
        expect: BTreeMap<String, Option<i64>>,
    },

    AssertVisible {
        target: Descriptor,
        #[serde(default = "default_true")]
        visible: bool,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    AssertText {
        target: Descriptor,
        expected: TextMatch,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Wait for a fixed amount of time (use sparingly)
    Sleep { ms: u64 },

    /// Log a message (for debugging)
    Log { message: String },
}

fn default_true() -> bool {
    true
}

/// One alternative of an `attempt` step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strategy {
    pub target: Descriptor,
    pub action: UiAction,
}

/// One candidate state of a `wait_any` step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StateSpec {
    Visible { target: Descriptor },
    Hidden { target: Descriptor },
    Url { pattern: TextMatch },
    Text { target: Descriptor, expected: TextMatch },
}

impl fmt::Display for TestStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestStep::Navigate { url } => write!(f, "navigate {}", url),
            TestStep::Click { target, force } => {
                write!(f, "click {}{}", target, if *force { " (force)" } else { "" })
            }
            TestStep::Fill { target, .. } => write!(f, "fill {}", target),
            TestStep::Check { target, .. } => write!(f, "check {}", target),
            TestStep::Uncheck { target, .. } => write!(f, "uncheck {}", target),
            TestStep::Select { target, value } => write!(f, "select '{}' in {}", value, target),
            TestStep::Attempt { strategies } => write!(f, "attempt {} strategies", strategies.len()),
            TestStep::WaitAny { states, .. } => write!(f, "wait for any of {} states", states.len()),
            TestStep::WaitUrl { pattern, .. } => write!(f, "wait for url {}", pattern),
            TestStep::Extract { target, fields, .. } => {
                write!(f, "extract {} fields from {}", fields.len(), target)
            }
            TestStep::AssertVisible { target, visible, .. } => {
                write!(f, "assert {} {}", target, if *visible { "visible" } else { "hidden" })
            }
            TestStep::AssertText { target, expected, .. } => {
                write!(f, "assert text of {} {}", target, expected)
            }
            TestStep::Sleep { ms } => write!(f, "sleep {}ms", ms),
            TestStep::Log { .. } => write!(f, "log"),
        }
    }
}

impl TestStep {
    /// Reject steps that can never succeed, before a browser is launched.
    pub fn validate(&self) -> E2eResult<()> {
        match self {
            TestStep::Attempt { strategies } if strategies.is_empty() => {
                Err(E2eError::SpecParse("attempt step needs at least one strategy".into()))
            }
            TestStep::WaitAny { states, .. } if states.is_empty() => {
                Err(E2eError::SpecParse("wait_any step needs at least one state".into()))
            }
            TestStep::Extract { fields, expect, .. } => {
                for (name, pattern) in fields {
                    ExtractionPattern::new(name.as_str(), pattern)?;
                }
                if let Some(unknown) = expect.keys().find(|k| !fields.contains_key(*k)) {
                    return Err(E2eError::SpecParse(format!(
                        "expected value for undeclared field '{}'",
                        unknown
                    )));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl TestSpec {
    /// Parse a test spec from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let spec: Self = serde_yaml::from_str(yaml)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Parse a test spec from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::SpecParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all test specs from a directory, in path order
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut specs = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            let spec = Self::from_file(entry.path())?;
            specs.push(spec);
        }

        Ok(specs)
    }

    /// Filter specs by tag
    pub fn filter_by_tag<'a>(specs: &'a [Self], tag: &str) -> Vec<&'a Self> {
        specs.iter().filter(|s| s.tags.iter().any(|t| t == tag)).collect()
    }

    pub fn validate(&self) -> E2eResult<()> {
        if self.steps.is_empty() {
            return Err(E2eError::SpecParse(format!("{}: no steps", self.name)));
        }
        for (i, step) in self.steps.iter().enumerate() {
            step.validate().map_err(|e| {
                E2eError::SpecParse(format!("{}: step {} ({}): {}", self.name, i + 1, step, e))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_storefront_spec() {
        let yaml = r##"
name: storefront-login
description: Standard user reaches the inventory
tags: [smoke, storefront]
steps:
  - action: navigate
    url: /
  - action: fill
    target: { by: css, selector: "#user-name" }
    value: "${username}"
  - action: click
    target: { by: css, selector: "#login-button" }
  - action: wait_url
    pattern: { kind: regex, pattern: "/inventory" }
"##;
        let spec = TestSpec::from_yaml(yaml).unwrap();
        assert_eq!(spec.name, "storefront-login");
        assert_eq!(spec.app, App::Storefront);
        assert_eq!(spec.steps.len(), 4);
        assert!(matches!(
            &spec.steps[1],
            TestStep::Fill { target: Descriptor::Css { selector }, .. } if selector == "#user-name"
        ));
    }

    #[test]
    fn test_parse_multi_state_steps() {
        let yaml = r#"
name: ai-preview
app: tracker
requires_credentials: true
steps:
  - action: attempt
    strategies:
      - target: { by: css, selector: "main input[type=checkbox]" }
        action: { kind: check, force: true }
      - target: { by: css, selector: "main input[type=checkbox]" }
        action: { kind: click, force: true }
  - action: wait_any
    timeout_ms: 30000
    states:
      - state: url
        pattern: { kind: regex, pattern: "/user-stories/ai/preview", ignore_case: true }
      - state: visible
        target:
          by: role
          role: heading
          name: { kind: regex, pattern: "ai generated user stories", ignore_case: true }
  - action: extract
    target: { by: text, text: { kind: contains, value: "Available Tokens" } }
    fields:
      available: '(?i)available tokens:\s*(\d+)'
      selected_tokens: '\((\d+)\s*tokens?\)'
    expect:
      available: 300
      selected_tokens: null
"#;
        let spec = TestSpec::from_yaml(yaml).unwrap();
        assert_eq!(spec.app, App::Tracker);
        assert!(spec.requires_credentials);

        match &spec.steps[0] {
            TestStep::Attempt { strategies } => {
                assert_eq!(strategies.len(), 2);
                assert_eq!(strategies[1].action, UiAction::force_click());
            }
            other => panic!("unexpected step {}", other),
        }
        match &spec.steps[2] {
            TestStep::Extract { expect, .. } => {
                assert_eq!(expect.get("available"), Some(&Some(300)));
                assert_eq!(expect.get("selected_tokens"), Some(&None));
            }
            other => panic!("unexpected step {}", other),
        }
        assert_eq!(spec.steps[1].to_string(), "wait for any of 2 states");
    }

    #[test]
    fn test_rejects_unusable_steps() {
        let empty_wait = r#"
name: broken
steps:
  - action: wait_any
    states: []
"#;
        assert!(matches!(TestSpec::from_yaml(empty_wait), Err(E2eError::SpecParse(_))));

        let two_groups = r#"
name: broken
steps:
  - action: extract
    target: { by: test_id, id: summary }
    fields:
      available: '(\d+) of (\d+)'
"#;
        assert!(TestSpec::from_yaml(two_groups).is_err());

        let undeclared = r#"
name: broken
steps:
  - action: extract
    target: { by: test_id, id: summary }
    fields:
      available: '(\d+)'
    expect:
      remaining: 1
"#;
        assert!(TestSpec::from_yaml(undeclared).is_err());
    }

    #[test]
    fn test_load_all_filters_by_tag() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b.yaml"),
            "name: b\ntags: [smoke]\nsteps:\n  - action: log\n    message: hi\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a.yml"),
            "name: a\nsteps:\n  - action: sleep\n    ms: 10\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let specs = TestSpec::load_all(dir.path()).unwrap();
        let names: Vec<_> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);

        let smoke = TestSpec::filter_by_tag(&specs, "smoke");
        assert_eq!(smoke.len(), 1);
        assert_eq!(smoke[0].name, "b");
    }
}
