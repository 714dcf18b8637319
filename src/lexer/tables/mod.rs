// src/lexer/tables/mod.rs
pub mod alphabet;
pub mod build;
pub mod dfa;
pub mod io;
pub mod tokens;
pub mod trie;

use hashbrown::HashMap;

pub use alphabet::{Alphabet, Symbol};
pub use build::RuleSet;
pub use dfa::{Control, StateId};
pub use io::{
    load_tables, load_tables_bin_bytes, load_tables_json_bytes, save_tables_bin,
    save_tables_json, tables_to_json_string,
};
pub use tokens::TokenKind;

/// Compiled settings: everything a scanner needs, frozen.
///
/// Produced once by [`RuleSet::build`] (or loaded from disk) and shared read-only, typically
/// behind an `Arc`, by any number of scanners.
#[derive(Debug, Clone)]
pub struct Tables {
    alphabet: Alphabet,
    next: Vec<StateId>, // n_states * width, row-major
    width: usize,
    token_of: Vec<TokenKind>,
    lexemes: HashMap<String, StateId>,
}

impl Tables {
    /// Assembles tables from their four exported parts, rejecting anything a scanner could
    /// not run on.
    pub fn from_parts(
        alphabet: Alphabet,
        rows: Vec<Vec<StateId>>,
        token_of: Vec<TokenKind>,
        lexemes: HashMap<String, StateId>,
    ) -> Result<Self, String> {
        let width = dfa::check_shape(&rows, &token_of)?;
        if alphabet.size() > width {
            return Err(format!(
                "alphabet uses {} symbols but the table has {width} columns",
                alphabet.size()
            ));
        }
        if let Some((c, s)) = alphabet.pairs().into_iter().find(|&(_, s)| s as usize >= width) {
            return Err(format!("character {c:?} maps to missing symbol {s}"));
        }
        if let Some((c, _)) = alphabet.pairs().into_iter().find(|&(_, s)| s == alphabet::EOS) {
            return Err(format!("character {c:?} maps to the end-of-stream symbol"));
        }
        if let Some((text, s)) = lexemes
            .iter()
            .find(|&(_, &s)| s as usize >= rows.len() || !token_of[s as usize].is_exact())
        {
            return Err(format!("lexeme {text:?} points at non-exact state {s}"));
        }

        let alphabet = Alphabet::from_pairs(alphabet.pairs(), width as Symbol);
        Ok(Self {
            alphabet,
            next: rows.concat(),
            width,
            token_of,
            lexemes,
        })
    }

    /// Freezes a freshly built automaton.
    pub(crate) fn from_dfa(alphabet: Alphabet, dfa: dfa::StreamingDfa) -> Self {
        debug_assert_eq!(dfa::check_shape(&dfa.next, &dfa.token_map), Ok(alphabet.size()));
        Self {
            width: alphabet.size(),
            alphabet: alphabet.freeze(),
            next: dfa.next.concat(),
            token_of: dfa.token_map,
            lexemes: dfa.lexemes,
        }
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    #[inline]
    pub fn n_states(&self) -> usize {
        self.token_of.len()
    }

    /// Column count (alphabet size).
    #[inline]
    pub fn n_symbols(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn next_state(&self, state: StateId, sym: Symbol) -> StateId {
        self.next[state as usize * self.width + sym as usize]
    }

    pub fn row(&self, state: StateId) -> &[StateId] {
        let at = state as usize * self.width;
        &self.next[at..at + self.width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[StateId]> {
        self.next.chunks(self.width)
    }

    #[inline]
    pub fn kind_of(&self, state: StateId) -> TokenKind {
        self.token_of[state as usize]
    }

    pub fn token_kinds(&self) -> &[TokenKind] {
        &self.token_of
    }

    #[inline]
    pub fn control(&self, state: StateId) -> Control {
        Control::of(state)
    }

    /// Final state of an exact rule (keyword or operator). Under case folding the key is the
    /// lowercase rule text.
    pub fn lexeme_state(&self, text: &str) -> Option<StateId> {
        self.lexemes.get(text).copied()
    }

    /// Exact rules sorted by text.
    pub fn lexemes(&self) -> Vec<(&str, StateId)> {
        let mut out: Vec<(&str, StateId)> = self.lexemes.iter().map(|(t, &s)| (t.as_str(), s)).collect();
        out.sort_unstable();
        out
    }

    /// Reverse lookup of [`lexeme_state`](Self::lexeme_state).
    pub fn lexeme_of(&self, state: StateId) -> Option<&str> {
        self.lexemes
            .iter()
            .find(|&(_, &s)| s == state)
            .map(|(t, _)| t.as_str())
    }
}

impl PartialEq for Tables {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width
            && self.next == other.next
            && self.token_of == other.token_of
            && self.lexemes == other.lexemes
            && self.alphabet.pairs() == other.alphabet.pairs()
    }
}

impl Eq for Tables {}
