// src/lexer/tables/dfa.rs
// Rule tries + alphabet -> streaming DFA. States live in a dense arena: every id is allocated
// first, then every row is wired, so forward references and self loops need no placeholders.

use hashbrown::HashMap;

use super::{
    alphabet::{Alphabet, EOS, Symbol},
    tokens::TokenKind,
    trie::{Accept, NodeId, ROOT, RuleTrie, RuleTries},
};

pub type StateId = u32;

/// What the scan loop does while sitting in a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    /// Append the lookahead to the pending token, read the next character, transition.
    Continue,
    /// Hand the pending word text over to the ready slot and begin a new token at the lookahead.
    StartToken,
    /// The pending token is complete.
    EndToken,
    /// Return the pending token and begin a new one at the lookahead, which is not reprocessed.
    FlushBufferAsToken,
    /// End of stream with nothing left to emit.
    Finish,
}

// Reserved states; identical in every table so controls can be derived from ids.
pub const FINISH: StateId = 0;
pub const START_TOKEN: StateId = 1;
pub const END_TOKEN: StateId = 2;
pub const FLUSH: StateId = 3;
pub const WORD: StateId = 4;
pub const SEPARATOR_RUN: StateId = 5;
pub const N_RESERVED: usize = 6;

/// State a freshly bound scanner starts in.
pub const INITIAL: StateId = START_TOKEN;

const RESERVED_KINDS: [TokenKind; N_RESERVED] = [
    TokenKind::Empty,
    TokenKind::Empty,
    TokenKind::Empty,
    TokenKind::Empty,
    TokenKind::Word,
    TokenKind::Separator,
];

impl Control {
    #[inline]
    pub const fn of(state: StateId) -> Control {
        match state {
            FINISH => Control::Finish,
            START_TOKEN => Control::StartToken,
            END_TOKEN => Control::EndToken,
            FLUSH => Control::FlushBufferAsToken,
            _ => Control::Continue,
        }
    }
}

/// Kind every reserved state must carry; checked when loading persisted tables.
pub(crate) fn reserved_kind(state: StateId) -> Option<TokenKind> {
    RESERVED_KINDS.get(state as usize).copied()
}

/// Fully materialized streaming DFA.
#[derive(Debug, Clone)]
pub struct StreamingDfa {
    pub next: Vec<Vec<StateId>>, // [state][symbol] -> state
    pub token_map: Vec<TokenKind>,
    /// Exact rule text -> its final state.
    pub lexemes: HashMap<String, StateId>,
}

/// State ids of one comment or literal rule: its body and its close-trie nodes.
struct Body {
    body: StateId,
    close: Vec<StateId>, // indexed by NodeId of the close trie
}

struct Arena {
    token_map: Vec<TokenKind>,
}

impl Arena {
    fn alloc(&mut self, kind: TokenKind) -> StateId {
        let id = self.token_map.len() as StateId;
        self.token_map.push(kind);
        id
    }

    fn alloc_body(&mut self, trie: &RuleTrie, kind: TokenKind) -> Body {
        let body = self.alloc(kind);
        let mut close = vec![FINISH; trie.len() + 1];
        for id in trie.preorder() {
            close[id] = self.alloc(kind);
        }
        Body { body, close }
    }
}

fn set_children(
    row: &mut [StateId],
    alphabet: &Alphabet,
    trie: &RuleTrie,
    node: NodeId,
    ids: &[StateId],
) {
    for &(ch, child) in &trie.node(node).children {
        row[alphabet.map(Some(ch)) as usize] = ids[child];
    }
}

fn set_all(row: &mut [StateId], syms: &[Symbol], to: StateId) {
    for &s in syms {
        row[s as usize] = to;
    }
}

impl StreamingDfa {
    pub fn build(alphabet: &Alphabet, rules: &RuleTries) -> Self {
        let width = alphabet.size();
        let seps = alphabet.separator_symbols();

        // ---------- pass 1: allocate ----------
        let mut arena = Arena {
            token_map: RESERVED_KINDS.to_vec(),
        };

        let mut open = vec![FINISH; rules.open.len() + 1];
        for id in rules.open.preorder() {
            // A prefix that is not a complete rule is word text until proven otherwise.
            let kind = rules.open.node(id).accept.map_or(TokenKind::Word, Accept::kind);
            open[id] = arena.alloc(kind);
        }
        let comments: Vec<Body> = rules
            .comments
            .iter()
            .map(|t| arena.alloc_body(t, TokenKind::Comment))
            .collect();
        let literals: Vec<Body> = rules
            .literals
            .iter()
            .map(|t| arena.alloc_body(t, TokenKind::Literal))
            .collect();

        // ---------- pass 2: wire ----------
        let n_states = arena.token_map.len();
        let mut next = vec![vec![FINISH; width]; n_states];

        let first_syms: Vec<Symbol> = rules
            .open
            .root_children()
            .iter()
            .map(|&(ch, _)| alphabet.map(Some(ch)))
            .collect();

        // Dispatch on the first character of a new token.
        let mut dispatch = vec![WORD; width];
        set_all(&mut dispatch, seps, SEPARATOR_RUN);
        set_children(&mut dispatch, alphabet, &rules.open, ROOT, &open);
        dispatch[EOS as usize] = FINISH;

        // Word text runs until a separator, the first character of a rule, or end of stream.
        let mut word = vec![WORD; width];
        set_all(&mut word, seps, START_TOKEN);
        set_all(&mut word, &first_syms, START_TOKEN);
        word[EOS as usize] = END_TOKEN;

        let mut separator_run = vec![END_TOKEN; width];
        set_all(&mut separator_run, seps, SEPARATOR_RUN);
        separator_run[EOS as usize] = END_TOKEN;

        next[START_TOKEN as usize].clone_from(&dispatch);
        next[END_TOKEN as usize].fill(FLUSH);
        next[FLUSH as usize] = dispatch;
        next[WORD as usize].clone_from(&word);
        next[SEPARATOR_RUN as usize] = separator_run;

        // Rule bodies: accumulate everything, watch for the close trie, end at end of stream.
        let body_row = |trie: &RuleTrie, b: &Body| {
            let mut row = vec![b.body; width];
            set_children(&mut row, alphabet, trie, ROOT, &b.close);
            row[EOS as usize] = END_TOKEN;
            row
        };
        let comment_rows: Vec<Vec<StateId>> = rules
            .comments
            .iter()
            .zip(&comments)
            .map(|(t, b)| body_row(t, b))
            .collect();
        let literal_rows: Vec<Vec<StateId>> = rules
            .literals
            .iter()
            .zip(&literals)
            .map(|(t, b)| body_row(t, b))
            .collect();

        for ((trie, b), row) in rules
            .comments
            .iter()
            .zip(&comments)
            .chain(rules.literals.iter().zip(&literals))
            .zip(comment_rows.iter().chain(&literal_rows))
        {
            next[b.body as usize].clone_from(row);
            for id in trie.preorder() {
                let node = trie.node(id);
                let out = &mut next[b.close[id] as usize];
                if node.is_final() && !node.escape {
                    out.fill(END_TOKEN);
                } else {
                    // Escape steps and partial closes go back to the body, re-dispatching the
                    // current character so overlapping closes like `**/` still match.
                    out.clone_from(row);
                }
                set_children(out, alphabet, trie, id, &b.close);
            }
        }

        // Open trie: exact rules end the token, delimiters enter their body, prefixes fall back
        // to word text.
        let mut lexemes: HashMap<String, StateId> = HashMap::new();
        for id in rules.open.preorder() {
            let node = rules.open.node(id);
            let out = &mut next[open[id] as usize];
            match node.accept {
                None => out.clone_from(&word),
                Some(Accept::OpenComment(i)) => out.clone_from(&comment_rows[i]),
                Some(Accept::OpenLiteral(i)) => out.clone_from(&literal_rows[i]),
                Some(Accept::Exact(_) | Accept::Close(_)) => {
                    out.fill(END_TOKEN);
                    if let Some(text) = &node.lexeme {
                        lexemes.insert(text.clone(), open[id]);
                    }
                }
            }
            set_children(out, alphabet, &rules.open, id, &open);
        }

        log::debug!(
            "[dfa] {} states x {} symbols ({} exact rules, {} comment, {} literal)",
            n_states,
            width,
            lexemes.len(),
            comments.len(),
            literals.len()
        );

        Self {
            next,
            token_map: arena.token_map,
            lexemes,
        }
    }
}

/// Structural checks shared by freshly built and imported tables.
pub(crate) fn check_shape(next: &[Vec<StateId>], token_map: &[TokenKind]) -> Result<usize, String> {
    if next.len() < N_RESERVED {
        return Err(format!(
            "{} states; at least {N_RESERVED} reserved states are required",
            next.len()
        ));
    }
    if token_map.len() != next.len() {
        return Err(format!(
            "token kinds for {} states but {} transition rows",
            token_map.len(),
            next.len()
        ));
    }
    let width = next[0].len();
    if width < 3 {
        return Err(format!("{width} symbols; the three reserved symbols are missing"));
    }
    for (s, row) in next.iter().enumerate() {
        if row.len() != width {
            return Err(format!("row {s} has {} columns, expected {width}", row.len()));
        }
        if let Some(&bad) = row.iter().find(|&&t| t as usize >= next.len()) {
            return Err(format!("row {s} targets missing state {bad}"));
        }
        if Control::of(row[EOS as usize]) == Control::Continue {
            return Err(format!("state {s} consumes past end of stream"));
        }
        // Only word text may be handed over to the ready slot.
        if token_map[s] != TokenKind::Word && row.contains(&START_TOKEN) {
            return Err(format!("{} state {s} cannot start a new token", token_map[s]));
        }
    }
    for (s, kind) in RESERVED_KINDS.iter().enumerate() {
        if token_map[s] != *kind {
            return Err(format!(
                "reserved state {s} has kind {}, expected {kind}",
                token_map[s]
            ));
        }
    }
    if next[FINISH as usize].iter().any(|&t| t != FINISH) {
        return Err("finish state is not absorbing".into());
    }
    // Control states move without consuming; on any symbol they must reach a consuming state
    // or FINISH before revisiting one of themselves.
    for sym in 0..width {
        for from in [START_TOKEN, END_TOKEN, FLUSH] {
            let mut s = from;
            let mut seen = 0u8;
            while s != FINISH && Control::of(s) != Control::Continue {
                if seen & (1 << s) != 0 {
                    return Err(format!("control states loop on symbol {sym} from state {from}"));
                }
                seen |= 1 << s;
                s = next[s as usize][sym];
            }
        }
    }
    Ok(width)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(ops: &[&str]) -> (Alphabet, RuleTries) {
        let mut tries = RuleTries::default();
        for op in ops {
            tries.open.insert(op, Accept::Exact(TokenKind::Operator));
        }
        let mut ab = Alphabet::new();
        let chars: Vec<char> = tries.chars().collect();
        for ch in chars {
            ab.register(ch, false);
        }
        ab.register_separator(' ');
        (ab, tries)
    }

    #[test]
    fn transition_function_is_total() {
        let (ab, tries) = rules(&["<", "<=", "<<="]);
        let dfa = StreamingDfa::build(&ab, &tries);
        assert_eq!(dfa.next.len(), N_RESERVED + 4);
        assert_eq!(check_shape(&dfa.next, &dfa.token_map), Ok(ab.size()));
    }

    #[test]
    fn controls_follow_reserved_ids() {
        assert_eq!(Control::of(FINISH), Control::Finish);
        assert_eq!(Control::of(START_TOKEN), Control::StartToken);
        assert_eq!(Control::of(END_TOKEN), Control::EndToken);
        assert_eq!(Control::of(FLUSH), Control::FlushBufferAsToken);
        assert_eq!(Control::of(WORD), Control::Continue);
        assert_eq!(Control::of(99), Control::Continue);
    }

    #[test]
    fn exact_rules_index_their_final_state() {
        let (ab, tries) = rules(&["<", "<<="]);
        let dfa = StreamingDfa::build(&ab, &tries);
        let lt = dfa.lexemes["<"];
        let shl_eq = dfa.lexemes["<<="];
        assert_eq!(dfa.token_map[lt as usize], TokenKind::Operator);
        assert_eq!(dfa.token_map[shl_eq as usize], TokenKind::Operator);
        // "<<" is only a prefix.
        let shl = dfa.next[lt as usize][ab.map(Some('<')) as usize];
        assert_eq!(dfa.token_map[shl as usize], TokenKind::Word);
        assert_eq!(dfa.next[shl as usize][ab.map(Some('=')) as usize], shl_eq);
    }

    #[test]
    fn word_state_diverts_on_separators_and_rule_starts() {
        let (ab, tries) = rules(&["+"]);
        let dfa = StreamingDfa::build(&ab, &tries);
        let word = &dfa.next[WORD as usize];
        assert_eq!(word[ab.map(Some(' ')) as usize], START_TOKEN);
        assert_eq!(word[ab.map(Some('+')) as usize], START_TOKEN);
        assert_eq!(word[ab.map(Some('x')) as usize], WORD);
        assert_eq!(word[EOS as usize], END_TOKEN);
        assert_eq!(dfa.next[START_TOKEN as usize][ab.map(Some(' ')) as usize], SEPARATOR_RUN);
    }

    #[test]
    fn control_cycles_are_rejected() {
        let (ab, tries) = rules(&["+"]);
        let mut dfa = StreamingDfa::build(&ab, &tries);
        let plus = ab.map(Some('+')) as usize;
        dfa.next[FLUSH as usize][plus] = END_TOKEN;
        let err = check_shape(&dfa.next, &dfa.token_map).unwrap_err();
        assert!(err.contains("loop"), "{err}");
    }

    #[test]
    fn only_word_states_hand_over_to_start() {
        let (ab, tries) = rules(&["+"]);
        let mut dfa = StreamingDfa::build(&ab, &tries);
        let plus = dfa.lexemes["+"] as usize;
        dfa.next[plus][crate::lexer::tables::alphabet::WILDCARD as usize] = START_TOKEN;
        let err = check_shape(&dfa.next, &dfa.token_map).unwrap_err();
        assert!(err.contains("operator state"), "{err}");
    }
}
