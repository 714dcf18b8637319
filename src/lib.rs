// src/lib.rs
//! Rule-driven tokenizer: declarative lexical rules are compiled into a transition table over a
//! compact alphabet, and a streaming scanner drives that table to split text into tokens.
//!
//! ```
//! use rulelex::lexer::tables::{RuleSet, TokenKind};
//! use std::sync::Arc;
//!
//! let tables = Arc::new(
//!     RuleSet::new()
//!         .add_keywords(["begin"])
//!         .add_operators([":="])
//!         .add_separators(" ")
//!         .build(),
//! );
//! let kinds: Vec<TokenKind> = tables
//!     .tokenize("begin x := y", true)
//!     .into_iter()
//!     .map(|t| t.kind)
//!     .collect();
//! assert_eq!(
//!     kinds,
//!     [TokenKind::Keyword, TokenKind::Word, TokenKind::Operator, TokenKind::Word]
//! );
//! ```

pub mod lexer;
pub mod rules;
