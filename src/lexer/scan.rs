// src/lexer/scan.rs
// Streaming scanner driving the compiled tables with one token of lookahead.
//
// Two buffers: `pending` accumulates the token the automaton is inside of, `ready` holds word
// text whose end was only discovered when a rule started. A rule prefix that fails falls back
// to word text in `pending` and joins `ready` again, so failed prefixes are never replayed.

use std::{io, mem, sync::Arc};

use rayon::prelude::*;

use super::{
    source::{CharSource, StrSource},
    tables::{
        Tables,
        alphabet::Symbol,
        dfa::{Control, INITIAL, StateId, WORD},
        tokens::TokenKind,
    },
};

/// 1-based line and column of a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const START: Position = Position { line: 1, column: 1 };
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    pub text: String,
    pub kind: TokenKind,
    pub start: Position,
    /// Automaton state that produced the token. For exact rules this is the id the lexeme
    /// index reports; word tokens always report [`WORD`].
    pub state: StateId,
}

impl Token {
    #[inline]
    pub fn line(&self) -> usize {
        self.start.line
    }

    #[inline]
    pub fn column(&self) -> usize {
        self.start.column
    }
}

#[derive(Debug, Clone)]
struct Pending {
    text: String,
    start: Position,
    state: StateId,
}

impl Pending {
    fn at(start: Position) -> Self {
        Self {
            text: String::new(),
            start,
            state: WORD,
        }
    }

    fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// The mutable half of a scan: one per bound source.
#[derive(Debug)]
struct Cursor<S> {
    source: S,
    state: StateId,
    lookahead: Option<char>,
    symbol: Symbol,
    pos: Position,
    pending: Pending,
    ready: Option<Pending>,
    done: bool,
}

/// Scanner over one character source at a time.
///
/// ```
/// use rulelex::lexer::{source::StrSource, tables::{RuleSet, TokenKind}};
///
/// let mut tok = RuleSet::new()
///     .add_operators(["<", "<="])
///     .add_separators(" ")
///     .new_tokenizer();
/// tok.bind(StrSource::new("a <= b")).unwrap();
/// let texts: Vec<String> = tok.map(|t| t.unwrap().text).collect();
/// assert_eq!(texts, ["a", "<=", "b"]);
/// ```
#[derive(Debug)]
pub struct Tokenizer<S> {
    tables: Arc<Tables>,
    skip_separators: bool,
    cursor: Option<Cursor<S>>,
    current: Option<Token>,
}

impl<S: CharSource> Tokenizer<S> {
    /// Separator tokens are skipped by default.
    pub fn new(tables: Arc<Tables>) -> Self {
        Self {
            tables,
            skip_separators: true,
            cursor: None,
            current: None,
        }
    }

    pub fn with_skip_separators(mut self, skip: bool) -> Self {
        self.skip_separators = skip;
        self
    }

    pub fn set_skip_separators(&mut self, skip: bool) {
        self.skip_separators = skip;
    }

    pub fn tables(&self) -> &Arc<Tables> {
        &self.tables
    }

    /// Attaches `source` and reads its first character. A previously bound source is closed.
    pub fn bind(&mut self, mut source: S) -> io::Result<()> {
        self.unbind()?;
        let lookahead = source.read_char()?;
        self.cursor = Some(Cursor {
            source,
            state: INITIAL,
            lookahead,
            symbol: self.tables.alphabet().map(lookahead),
            pos: Position::START,
            pending: Pending::at(Position::START),
            ready: None,
            done: false,
        });
        self.current = None;
        Ok(())
    }

    /// Closes and returns the bound source, if any.
    pub fn unbind(&mut self) -> io::Result<Option<S>> {
        match self.cursor.take() {
            Some(mut c) => {
                c.source.close()?;
                Ok(Some(c.source))
            }
            None => Ok(None),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.cursor.is_some()
    }

    /// Next token, or `None` once the stream is fully consumed (and on every call after that).
    pub fn next_token(&mut self) -> io::Result<Option<Token>> {
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(None);
        };
        loop {
            let token = cursor.step(&self.tables)?;
            match token {
                Some(t) if self.skip_separators && t.kind == TokenKind::Separator => continue,
                _ => {
                    self.current = token.clone();
                    return Ok(token);
                }
            }
        }
    }

    /// Last token returned by [`next_token`](Self::next_token).
    pub fn current(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    pub fn current_text(&self) -> Option<&str> {
        self.current.as_ref().map(|t| t.text.as_str())
    }

    /// `Empty` before the first token and after the end of stream.
    pub fn current_kind(&self) -> TokenKind {
        self.current.as_ref().map_or(TokenKind::Empty, |t| t.kind)
    }

    pub fn current_line(&self) -> Option<usize> {
        self.current.as_ref().map(Token::line)
    }

    pub fn current_column(&self) -> Option<usize> {
        self.current.as_ref().map(Token::column)
    }

    pub fn current_state_id(&self) -> Option<StateId> {
        self.current.as_ref().map(|t| t.state)
    }
}

impl<S: CharSource> Iterator for Tokenizer<S> {
    type Item = io::Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}

impl<S: CharSource> Cursor<S> {
    fn advance(&mut self, tables: &Tables) -> io::Result<()> {
        if self.lookahead == Some('\n') {
            self.pos.line += 1;
            self.pos.column = 1;
        } else {
            self.pos.column += 1;
        }
        self.lookahead = self.source.read_char()?;
        self.symbol = tables.alphabet().map(self.lookahead);
        Ok(())
    }

    fn finish(&self, tables: &Tables, p: Pending) -> Option<Token> {
        if p.is_empty() {
            return None;
        }
        let kind = tables.kind_of(p.state);
        Some(Token {
            text: p.text,
            kind,
            start: p.start,
            state: if kind == TokenKind::Word { WORD } else { p.state },
        })
    }

    /// Word text joins the ready slot; adjacent word runs form one token.
    fn absorb(&mut self, tables: &Tables, p: Pending) {
        if p.is_empty() {
            return;
        }
        debug_assert_eq!(tables.kind_of(p.state), TokenKind::Word);
        match self.ready.as_mut() {
            Some(r) => r.text.push_str(&p.text),
            None => self.ready = Some(p),
        }
    }

    /// Runs the automaton until it yields a token or reaches the end of stream.
    fn step(&mut self, tables: &Tables) -> io::Result<Option<Token>> {
        loop {
            let state = self.state;
            match tables.control(state) {
                Control::Continue => {
                    if let Some(ch) = self.lookahead {
                        self.pending.text.push(ch);
                        self.pending.state = state;
                        self.advance(tables)?;
                    }
                    self.state = tables.next_state(state, self.symbol);
                }
                Control::StartToken => {
                    let p = mem::replace(&mut self.pending, Pending::at(self.pos));
                    self.absorb(tables, p);
                    self.state = tables.next_state(state, self.symbol);
                }
                Control::EndToken => {
                    self.state = tables.next_state(state, self.symbol);
                    if tables.kind_of(self.pending.state) == TokenKind::Word {
                        let p = mem::replace(&mut self.pending, Pending::at(self.pos));
                        self.absorb(tables, p);
                    }
                    if let Some(r) = self.ready.take() {
                        return Ok(self.finish(tables, r));
                    }
                }
                Control::FlushBufferAsToken => {
                    let p = mem::replace(&mut self.pending, Pending::at(self.pos));
                    self.state = tables.next_state(state, self.symbol);
                    if let Some(t) = self.finish(tables, p) {
                        log::trace!("[scan] {} {:?} at {:?}", t.kind, t.text, t.start);
                        return Ok(Some(t));
                    }
                }
                Control::Finish => {
                    if let Some(r) = self.ready.take() {
                        return Ok(self.finish(tables, r));
                    }
                    let p = mem::replace(&mut self.pending, Pending::at(self.pos));
                    if let Some(t) = self.finish(tables, p) {
                        return Ok(Some(t));
                    }
                    if !self.done {
                        self.done = true;
                        log::trace!("[scan] end of stream at {:?}", self.pos);
                    }
                    return Ok(None);
                }
            }
        }
    }
}

impl Tables {
    /// Scans `text` in one go.
    pub fn tokenize(self: &Arc<Self>, text: &str, skip_separators: bool) -> Vec<Token> {
        let mut tok = Tokenizer::new(Arc::clone(self)).with_skip_separators(skip_separators);
        // In-memory sources cannot fail.
        match tok.bind(StrSource::new(text)) {
            Ok(()) => tok.map_while(Result::ok).collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Scans every input in parallel, one scanner per input, all sharing `tables`.
pub fn scan_all(tables: &Arc<Tables>, inputs: &[&str], skip_separators: bool) -> Vec<Vec<Token>> {
    inputs
        .par_iter()
        .map(|text| tables.tokenize(text, skip_separators))
        .collect()
}
