// src/lexer/tables/trie.rs
// Prefix tree over rule strings. Nodes live in a flat arena; node 0 is the root and carries no
// character.

use super::tokens::TokenKind;

pub type NodeId = usize;
pub const ROOT: NodeId = 0;

/// What a final node completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    /// Keyword or operator: the token ends here.
    Exact(TokenKind),
    /// Opening delimiter of comment rule `n`.
    OpenComment(usize),
    /// Opening delimiter of literal rule `n`.
    OpenLiteral(usize),
    /// Closing sequence (or escape sequence) inside a rule body of the given kind.
    Close(TokenKind),
}

impl Accept {
    pub fn kind(self) -> TokenKind {
        match self {
            Accept::Exact(k) | Accept::Close(k) => k,
            Accept::OpenComment(_) => TokenKind::Comment,
            Accept::OpenLiteral(_) => TokenKind::Literal,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrieNode {
    pub ch: char,
    /// Insertion ordered; characters are distinct.
    pub children: Vec<(char, NodeId)>,
    pub accept: Option<Accept>,
    /// Set on nodes created by [`RuleTrie::insert_escaped`]: a final escape node continues the
    /// rule body instead of ending the token.
    pub escape: bool,
    /// Full rule text for final nodes.
    pub lexeme: Option<String>,
}

impl TrieNode {
    fn new(ch: char) -> Self {
        Self {
            ch,
            children: Vec::new(),
            accept: None,
            escape: false,
            lexeme: None,
        }
    }

    #[inline]
    pub fn is_final(&self) -> bool {
        self.accept.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct RuleTrie {
    nodes: Vec<TrieNode>,
}

impl Default for RuleTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleTrie {
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode::new('\0')],
        }
    }

    /// Registers `text`; the last registration of identical text wins. Empty text is ignored.
    pub fn insert(&mut self, text: &str, accept: Accept) -> Option<NodeId> {
        let last = self.walk_extend(text, false)?;
        let node = &mut self.nodes[last];
        node.accept = Some(accept);
        node.lexeme = Some(text.to_owned());
        Some(last)
    }

    /// Like [`insert`](Self::insert) but every node this call creates is an escape step, and the
    /// final node always is.
    pub fn insert_escaped(&mut self, text: &str, accept: Accept) -> Option<NodeId> {
        let last = self.walk_extend(text, true)?;
        let node = &mut self.nodes[last];
        node.accept = Some(accept);
        node.escape = true;
        node.lexeme = Some(text.to_owned());
        Some(last)
    }

    pub fn child_for(&self, node: NodeId, ch: char) -> Option<NodeId> {
        self.nodes[node]
            .children
            .iter()
            .find(|(c, _)| *c == ch)
            .map(|&(_, id)| id)
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &TrieNode {
        &self.nodes[id]
    }

    pub fn root_children(&self) -> &[(char, NodeId)] {
        &self.nodes[ROOT].children
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[ROOT].children.is_empty()
    }

    /// Number of nodes, root excluded.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Non-root nodes, parents before children.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.len());
        let mut stack: Vec<NodeId> = self.nodes[ROOT].children.iter().rev().map(|&(_, id)| id).collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id].children.iter().rev().map(|&(_, c)| c));
        }
        out
    }

    /// Every character on some path.
    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.nodes[1..].iter().map(|n| n.ch)
    }

    fn walk_extend(&mut self, text: &str, escape: bool) -> Option<NodeId> {
        if text.is_empty() {
            return None;
        }
        let mut cur = ROOT;
        for ch in text.chars() {
            cur = match self.child_for(cur, ch) {
                Some(next) => next,
                None => {
                    let id = self.nodes.len();
                    let mut node = TrieNode::new(ch);
                    node.escape = escape;
                    self.nodes.push(node);
                    self.nodes[cur].children.push((ch, id));
                    id
                }
            };
        }
        Some(cur)
    }
}

/// Every rule family's trie. The open tree is shared by keywords, operators and opening
/// delimiters; each comment and literal rule owns the tree of its closing sequences.
#[derive(Debug, Clone, Default)]
pub struct RuleTries {
    pub open: RuleTrie,
    pub comments: Vec<RuleTrie>,
    pub literals: Vec<RuleTrie>,
}

impl RuleTries {
    /// Every character any rule mentions.
    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.open
            .chars()
            .chain(self.comments.iter().flat_map(RuleTrie::chars))
            .chain(self.literals.iter().flat_map(RuleTrie::chars))
    }
}
