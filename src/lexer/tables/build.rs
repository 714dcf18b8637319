// src/lexer/tables/build.rs
use std::{sync::Arc, time::Instant};

use super::{
    Tables,
    alphabet::{Alphabet, fold_str},
    dfa::StreamingDfa,
    tokens::TokenKind,
    trie::{Accept, RuleTrie, RuleTries},
};
use crate::lexer::{scan::Tokenizer, source::CharSource};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Rule {
    Exact(TokenKind, String),
    Comment { open: String, close: String },
    Literal { border: String, escape: String },
}

/// Declarative lexical rules, compiled by [`build`](RuleSet::build).
///
/// ```
/// use rulelex::lexer::tables::{RuleSet, TokenKind};
///
/// let tables = RuleSet::new()
///     .add_keywords(["begin", "end"])
///     .add_operators(["<", "<=", ":="])
///     .add_comment("/*", "*/")
///     .add_literal("\"", "\\")
///     .add_separators(" \t\n")
///     .build();
/// let state = tables.lexeme_state("begin").unwrap();
/// assert_eq!(tables.kind_of(state), TokenKind::Keyword);
/// ```
///
/// Registration order only matters when the same text is registered twice; the later rule wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
    separators: String,
    ignore_case: bool,
    skip_separators: bool,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleSet {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            separators: String::new(),
            ignore_case: false,
            skip_separators: true,
        }
    }

    /// Keywords match as exact substrings, wherever they start.
    pub fn add_keywords<I>(self, words: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.add_exact(TokenKind::Keyword, words)
    }

    pub fn add_operators<I>(self, ops: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.add_exact(TokenKind::Operator, ops)
    }

    /// Everything from `open` through `close` is one comment token. An empty `close` runs the
    /// comment to end of stream.
    pub fn add_comment(mut self, open: &str, close: &str) -> Self {
        if open.is_empty() {
            log::warn!("[rules] ignoring comment rule with an empty opening sequence");
            return self;
        }
        self.rules.push(Rule::Comment {
            open: open.to_owned(),
            close: close.to_owned(),
        });
        self
    }

    /// A comment that ends with (and includes) the next line feed.
    pub fn add_line_comment(self, open: &str) -> Self {
        self.add_comment(open, "\n")
    }

    /// A literal starts and ends with `border`; `escape` followed by `border` inside the literal
    /// does not end it. An empty `escape` disables escaping.
    pub fn add_literal(mut self, border: &str, escape: &str) -> Self {
        if border.is_empty() {
            log::warn!("[rules] ignoring literal rule with an empty border");
            return self;
        }
        self.rules.push(Rule::Literal {
            border: border.to_owned(),
            escape: escape.to_owned(),
        });
        self
    }

    /// Each character of `chars` separates words; runs of them form one separator token.
    pub fn add_separators(mut self, chars: &str) -> Self {
        for ch in chars.chars() {
            if !self.separators.contains(ch) {
                self.separators.push(ch);
            }
        }
        self
    }

    pub fn set_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    /// Whether scanners created by [`new_tokenizer`](Self::new_tokenizer) drop separator tokens.
    pub fn set_skip_separators(mut self, skip: bool) -> Self {
        self.skip_separators = skip;
        self
    }

    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    pub fn skip_separators(&self) -> bool {
        self.skip_separators
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.separators.is_empty()
    }

    fn add_exact<I>(mut self, kind: TokenKind, texts: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for text in texts {
            let text = text.as_ref();
            if text.is_empty() {
                log::warn!("[rules] ignoring empty {kind}");
                continue;
            }
            self.rules.push(Rule::Exact(kind, text.to_owned()));
        }
        self
    }

    /// Rule strings as the tries see them.
    fn norm(&self, s: &str) -> String {
        if self.ignore_case {
            fold_str(s)
        } else {
            s.to_owned()
        }
    }

    fn tries(&self) -> RuleTries {
        let mut tries = RuleTries::default();
        for rule in &self.rules {
            match rule {
                Rule::Exact(kind, text) => {
                    tries.open.insert(&self.norm(text), Accept::Exact(*kind));
                }
                Rule::Comment { open, close } => {
                    let i = tries.comments.len();
                    tries.open.insert(&self.norm(open), Accept::OpenComment(i));
                    let mut closes = RuleTrie::new();
                    closes.insert(&self.norm(close), Accept::Close(TokenKind::Comment));
                    tries.comments.push(closes);
                }
                Rule::Literal { border, escape } => {
                    let i = tries.literals.len();
                    let border = self.norm(border);
                    tries.open.insert(&border, Accept::OpenLiteral(i));
                    let mut closes = RuleTrie::new();
                    closes.insert(&border, Accept::Close(TokenKind::Literal));
                    if !escape.is_empty() {
                        let seq = self.norm(escape) + &border;
                        closes.insert_escaped(&seq, Accept::Close(TokenKind::Literal));
                    }
                    tries.literals.push(closes);
                }
            }
        }
        tries
    }

    /// Compiles the rules. Never fails: malformed rules were already dropped on registration.
    pub fn build(&self) -> Tables {
        let t0 = Instant::now();
        let tries = self.tries();

        // Separators first: a declared separator keeps that role even when it is the other case
        // of a rule character.
        let mut alphabet = Alphabet::new();
        for ch in self.separators.chars() {
            alphabet.register_separator(ch);
        }
        for ch in tries.chars() {
            alphabet.register(ch, self.ignore_case);
        }

        let dfa = StreamingDfa::build(&alphabet, &tries);
        let tables = Tables::from_dfa(alphabet, dfa);
        log::debug!(
            "[tables] {} rules -> {} states x {} symbols in {:?}",
            self.rules.len(),
            tables.n_states(),
            tables.n_symbols(),
            t0.elapsed()
        );
        tables
    }

    /// Compiles the rules into a scanner that still needs a source.
    pub fn new_tokenizer<S: CharSource>(&self) -> Tokenizer<S> {
        Tokenizer::new(Arc::new(self.build())).with_skip_separators(self.skip_separators)
    }
}
