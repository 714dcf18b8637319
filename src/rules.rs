// src/rules.rs
// Rule files: the JSON form of a `RuleSet`, read by the binaries.
//
// {
//   "keywords":   ["begin", "end"],
//   "operators":  ["<", "<=", ":="],
//   "comments":   [{"open": "/*", "close": "*/"}, {"open": "//"}],
//   "literals":   [{"border": "\"", "escape": "\\"}],
//   "separators": " \t\r\n",
//   "ignore_case": false,
//   "skip_separators": true
// }

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::lexer::tables::RuleSet;

fn default_close() -> String {
    "\n".to_owned()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRule {
    pub open: String,
    /// Missing means a line comment.
    #[serde(default = "default_close")]
    pub close: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiteralRule {
    pub border: String,
    #[serde(default)]
    pub escape: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RulesFile {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub operators: Vec<String>,
    #[serde(default)]
    pub comments: Vec<CommentRule>,
    #[serde(default)]
    pub literals: Vec<LiteralRule>,
    #[serde(default)]
    pub separators: String,
    #[serde(default)]
    pub ignore_case: bool,
    #[serde(default = "default_true")]
    pub skip_separators: bool,
}

impl RulesFile {
    pub fn from_json(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).context("failed to parse rules JSON")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
        Self::from_json(&data).with_context(|| format!("rules file {}", path.display()))
    }

    pub fn to_rule_set(&self) -> RuleSet {
        let mut rules = RuleSet::new()
            .add_keywords(&self.keywords)
            .add_operators(&self.operators)
            .add_separators(&self.separators)
            .set_ignore_case(self.ignore_case)
            .set_skip_separators(self.skip_separators);
        for c in &self.comments {
            rules = rules.add_comment(&c.open, &c.close);
        }
        for l in &self.literals {
            rules = rules.add_literal(&l.border, &l.escape);
        }
        rules
    }
}
