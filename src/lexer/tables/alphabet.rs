// src/lexer/tables/alphabet.rs
// Input characters -> dense internal symbols. Only characters that occur in some rule get a
// symbol of their own; everything else collapses to WILDCARD.

use hashbrown::HashMap;

/// Column index into the transition table.
pub type Symbol = u32;

/// End of stream. Never produced by a character.
pub const EOS: Symbol = 0;
/// Any character without an explicit registration.
pub const WILDCARD: Symbol = 1;
/// Shared symbol of characters registered only as word separators.
pub const SEPARATOR: Symbol = 2;

const RESERVED: Symbol = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    items: HashMap<char, Symbol>,
    next: Symbol,
    separators: Vec<Symbol>,
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::new()
    }
}

impl Alphabet {
    pub fn new() -> Self {
        Self {
            items: HashMap::new(),
            next: RESERVED,
            separators: Vec::new(),
        }
    }

    /// Rebuilds a frozen alphabet from persisted `(char, symbol)` pairs.
    pub(crate) fn from_pairs(pairs: impl IntoIterator<Item = (char, Symbol)>, size: Symbol) -> Self {
        Self {
            items: pairs.into_iter().collect(),
            next: size.max(RESERVED),
            separators: Vec::new(),
        }
    }

    /// Drops build-only bookkeeping; separators are already wired into the table.
    pub(crate) fn freeze(mut self) -> Self {
        self.separators.clear();
        self
    }

    /// Symbol of the lookahead; `None` is end of stream.
    #[inline]
    pub fn map(&self, ch: Option<char>) -> Symbol {
        match ch {
            None => EOS,
            Some(c) => self.items.get(&c).copied().unwrap_or(WILDCARD),
        }
    }

    /// Gives `ch` a fresh symbol unless it already has one. With `fold_case` the simple upper and
    /// lower case variants of `ch` share that symbol, except variants already registered (for
    /// instance as separators), which keep their own.
    pub fn register(&mut self, ch: char, fold_case: bool) {
        match self.items.get(&ch).copied() {
            Some(SEPARATOR) => {
                // A separator that turns out to be part of a rule needs its own column.
                let sym = self.fresh();
                self.items.insert(ch, sym);
                self.mark_separator(sym);
                self.mark_separator(SEPARATOR);
                if fold_case {
                    self.alias_case(ch, sym);
                }
            }
            Some(_) => {}
            None => {
                let sym = self.fresh();
                self.items.insert(ch, sym);
                if fold_case {
                    self.alias_case(ch, sym);
                }
            }
        }
    }

    pub fn register_all<'a>(&mut self, strings: impl IntoIterator<Item = &'a str>, fold_case: bool) {
        for s in strings {
            for ch in s.chars() {
                self.register(ch, fold_case);
            }
        }
    }

    /// Marks `ch` as a word separator. Characters already used by rules keep their symbol and
    /// that symbol additionally behaves as a separator.
    pub fn register_separator(&mut self, ch: char) {
        match self.items.get(&ch).copied() {
            Some(sym) => self.mark_separator(sym),
            None => {
                self.items.insert(ch, SEPARATOR);
                self.mark_separator(SEPARATOR);
            }
        }
    }

    /// Number of symbols, i.e. the column count of the transition table.
    #[inline]
    pub fn size(&self) -> usize {
        self.next as usize
    }

    /// Every symbol that separates words. Empty when no separators were registered, and on a
    /// frozen alphabet.
    pub fn separator_symbols(&self) -> &[Symbol] {
        &self.separators
    }

    pub fn is_separator(&self, sym: Symbol) -> bool {
        self.separators.contains(&sym)
    }

    /// Registered characters sorted by character, for stable export.
    pub fn pairs(&self) -> Vec<(char, Symbol)> {
        let mut out: Vec<(char, Symbol)> = self.items.iter().map(|(&c, &s)| (c, s)).collect();
        out.sort_unstable();
        out
    }

    pub fn len_chars(&self) -> usize {
        self.items.len()
    }

    fn fresh(&mut self) -> Symbol {
        let sym = self.next;
        self.next += 1;
        sym
    }

    fn mark_separator(&mut self, sym: Symbol) {
        if !self.separators.contains(&sym) {
            self.separators.push(sym);
            self.separators.sort_unstable();
        }
    }

    fn alias_case(&mut self, ch: char, sym: Symbol) {
        let [lower, upper] = case_variants(ch);
        for c in [lower, upper] {
            self.items.entry(c).or_insert(sym);
        }
    }
}

/// Simple (single character) lower and upper case of `ch`; multi-character mappings fall back
/// to `ch` itself.
pub fn case_variants(ch: char) -> [char; 2] {
    fn single(mut it: impl Iterator<Item = char>) -> Option<char> {
        let c = it.next()?;
        it.next().is_none().then_some(c)
    }
    [
        single(ch.to_lowercase()).unwrap_or(ch),
        single(ch.to_uppercase()).unwrap_or(ch),
    ]
}

/// Simple lowercase fold of a whole rule string.
pub fn fold_str(s: &str) -> String {
    s.chars().map(|c| case_variants(c)[0]).collect()
}
