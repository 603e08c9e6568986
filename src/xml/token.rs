use std::cell::Cell;

use super::parser::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Open,
    Close,
    Key,
    Value,
    Data,
    Error,
}

/// Index of a token in its document's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(u32);

impl TokenId {
    pub(crate) const ROOT: TokenId = TokenId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One lexical unit: a span of the source plus its links in the tree.
///
/// Children of an `Open` token are its `Key` tokens followed by either
/// nested `Open` tokens or a single `Data` token. A `Key` has at most one
/// `Value` child. `Close` tokens are not part of the child lists; each is
/// reachable from the `Open` token it closes.
#[derive(Debug)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub len: usize,
    pub visited: Cell<bool>,
    pub error: Option<String>,
    pub parent: Option<TokenId>,
    pub first_child: Option<TokenId>,
    pub last_child: Option<TokenId>,
    pub next_peer: Option<TokenId>,
    pub close: Option<TokenId>,
}

/// Arena of tokens; `TokenId(0)` is the root once anything was added.
#[derive(Debug, Default)]
pub(crate) struct TokenTree {
    tokens: Vec<Token>,
}

impl TokenTree {
    pub fn get(&self, id: TokenId) -> &Token {
        &self.tokens[id.index()]
    }

    fn get_mut(&mut self, id: TokenId) -> &mut Token {
        &mut self.tokens[id.index()]
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn root(&self) -> Option<TokenId> {
        (!self.tokens.is_empty()).then_some(TokenId::ROOT)
    }

    pub fn ids(&self) -> impl Iterator<Item = TokenId> + '_ {
        (0..self.tokens.len() as u32).map(TokenId)
    }

    fn push(
        &mut self,
        kind: TokenKind,
        start: usize,
        len: usize,
        parent: Option<TokenId>,
    ) -> TokenId {
        let id = TokenId(self.tokens.len() as u32);
        self.tokens.push(Token {
            kind,
            start,
            len,
            visited: Cell::new(false),
            error: None,
            parent,
            first_child: None,
            last_child: None,
            next_peer: None,
            close: None,
        });
        id
    }

    /// Adds a token with no parent, linked after the last top-level token.
    pub fn add_top(
        &mut self,
        kind: TokenKind,
        start: usize,
        len: usize,
    ) -> TokenId {
        let prev = self.root().map(|mut id| {
            while let Some(next) = self.get(id).next_peer {
                id = next;
            }
            id
        });
        let id = self.push(kind, start, len, None);
        if let Some(prev) = prev {
            self.get_mut(prev).next_peer = Some(id);
        }
        id
    }

    pub fn add_child(
        &mut self,
        parent: TokenId,
        kind: TokenKind,
        start: usize,
        len: usize,
    ) -> TokenId {
        let id = self.push(kind, start, len, Some(parent));
        let last_child = self.get(parent).last_child;
        match last_child {
            Some(last) => self.get_mut(last).next_peer = Some(id),
            None => self.get_mut(parent).first_child = Some(id),
        }
        self.get_mut(parent).last_child = Some(id);
        id
    }

    /// Adds a token after `after` among its siblings.
    pub fn add_peer(
        &mut self,
        after: TokenId,
        kind: TokenKind,
        start: usize,
        len: usize,
    ) -> TokenId {
        match self.get(after).parent {
            Some(parent) => self.add_child(parent, kind, start, len),
            None => self.add_top(kind, start, len),
        }
    }

    /// Records the `Close` token matching `open`, outside the child lists.
    pub fn add_close(
        &mut self,
        open: TokenId,
        start: usize,
        len: usize,
    ) -> TokenId {
        let parent = self.get(open).parent;
        let id = self.push(TokenKind::Close, start, len, parent);
        self.get_mut(open).close = Some(id);
        id
    }

    pub fn set_error(&mut self, id: TokenId, message: String) {
        self.get_mut(id).error = Some(message);
    }

    pub fn children(&self, id: TokenId) -> Children<'_> {
        Children {
            tree: self,
            next: self.get(id).first_child,
        }
    }
}

pub(crate) struct Children<'t> {
    tree: &'t TokenTree,
    next: Option<TokenId>,
}

impl Iterator for Children<'_> {
    type Item = TokenId;

    fn next(&mut self) -> Option<TokenId> {
        let id = self.next?;
        self.next = self.tree.get(id).next_peer;
        Some(id)
    }
}

/// Read-only view of one token of a [`Document`].
#[derive(Clone, Copy)]
pub struct TokenRef<'d> {
    pub(crate) doc: &'d Document,
    pub(crate) id: TokenId,
}

impl<'d> TokenRef<'d> {
    fn token(&self) -> &'d Token {
        self.doc.tree().get(self.id)
    }

    pub fn id(&self) -> TokenId {
        self.id
    }

    pub fn kind(&self) -> TokenKind {
        let tok = self.token();
        if tok.error.is_some() { TokenKind::Error } else { tok.kind }
    }

    /// Byte offset of the token's text in the source.
    pub fn offset(&self) -> usize {
        self.token().start
    }

    pub fn len(&self) -> usize {
        self.token().len
    }

    pub fn is_empty(&self) -> bool {
        self.token().len == 0
    }

    pub fn text(&self) -> &'d str {
        self.doc.span(self.token().start, self.token().len)
    }

    pub fn visited(&self) -> bool {
        self.token().visited.get()
    }

    pub fn error(&self) -> Option<&'d str> {
        self.token().error.as_deref()
    }

    pub fn parent(&self) -> Option<TokenRef<'d>> {
        self.token().parent.map(|id| TokenRef { doc: self.doc, id })
    }

    /// The `Close` token paired with this `Open` token, if it was seen.
    pub fn close(&self) -> Option<TokenRef<'d>> {
        self.token().close.map(|id| TokenRef { doc: self.doc, id })
    }

    /// Tag names from the root down to this token, joined by `/`.
    pub fn path(&self) -> String {
        self.doc.path(self.id)
    }
}

impl std::fmt::Debug for TokenRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}({:?})", self.kind(), self.text())
    }
}
