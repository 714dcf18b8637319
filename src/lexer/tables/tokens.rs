// src/lexer/tables/tokens.rs

use std::{fmt, str::FromStr};

/// Classification attached to every automaton state.
///
/// Control states carry `Empty`; the other kinds label the text a state accumulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum TokenKind {
    Operator = 0,
    Literal = 1,
    Comment = 2,
    Separator = 3,
    Word = 4,
    Empty = 5,
    Keyword = 6,
}

impl TokenKind {
    pub const ALL: [TokenKind; 7] = [
        TokenKind::Operator,
        TokenKind::Literal,
        TokenKind::Comment,
        TokenKind::Separator,
        TokenKind::Word,
        TokenKind::Empty,
        TokenKind::Keyword,
    ];

    /// Stable lowercase name, used by the persisted formats.
    pub const fn name(self) -> &'static str {
        match self {
            TokenKind::Operator => "operator",
            TokenKind::Literal => "literal",
            TokenKind::Comment => "comment",
            TokenKind::Separator => "separator",
            TokenKind::Word => "word",
            TokenKind::Empty => "empty",
            TokenKind::Keyword => "keyword",
        }
    }

    pub fn from_name(s: &str) -> Option<TokenKind> {
        Self::ALL.into_iter().find(|k| k.name() == s)
    }

    /// Kinds produced by exact-match rules (keywords and operators).
    pub const fn is_exact(self) -> bool {
        matches!(self, TokenKind::Keyword | TokenKind::Operator)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TokenKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, String> {
        Self::from_name(s).ok_or_else(|| format!("unknown token kind {s:?}"))
    }
}

impl core::convert::TryFrom<u32> for TokenKind {
    type Error = u32;
    fn try_from(v: u32) -> Result<Self, u32> {
        Self::ALL
            .into_iter()
            .find(|k| *k as u32 == v)
            .ok_or(v)
    }
}
