use super::error::{ValueType, WalkError};
use super::parser::Document;
use super::token::{Token, TokenId, TokenKind, TokenRef};

/// Attribute key the extraction helpers are usually called with.
pub const DEFAULT_KEY: &str = "value";

/// Cursor over the tags of a [`Document`].
///
/// A walker always sits on an open tag. Navigation moves it between tags;
/// attribute and data extraction only look ahead and leave it where it was. Tags
/// and keys the walker consults are marked visited, see
/// [`Document::unvisited`].
#[derive(Clone, Copy)]
pub struct Walker<'d> {
    doc: &'d Document,
    tok: TokenId,
}

impl<'d> Walker<'d> {
    pub(crate) fn new(doc: &'d Document) -> Self {
        Self {
            doc,
            tok: TokenId::ROOT,
        }
    }

    fn get(&self, id: TokenId) -> &'d Token {
        self.doc.tree().get(id)
    }

    fn text(&self, id: TokenId) -> &'d str {
        let tok = self.get(id);
        self.doc.span(tok.start, tok.len)
    }

    fn children(&self, id: TokenId) -> impl Iterator<Item = TokenId> + 'd {
        let doc: &'d Document = self.doc;
        doc.tree().children(id)
    }

    fn tags(&self) -> impl Iterator<Item = TokenId> + 'd {
        let doc: &'d Document = self.doc;
        doc.tree()
            .children(self.tok)
            .filter(move |id| doc.tree().get(*id).kind == TokenKind::Open)
    }

    fn enter(&mut self, id: TokenId) {
        self.get(id).visited.set(true);
        self.tok = id;
    }

    pub fn token(&self) -> TokenRef<'d> {
        self.doc.token(self.tok)
    }

    pub fn tag(&self) -> &'d str {
        self.text(self.tok)
    }

    pub fn path(&self) -> String {
        self.doc.path(self.tok)
    }

    /// Fails unless the current tag is named `tag`.
    pub fn check(&mut self, tag: &str) -> Result<&mut Self, WalkError> {
        if self.tag() != tag {
            return Err(WalkError::UnexpectedTag {
                expected: tag.to_owned(),
                path: self.path(),
            });
        }
        self.get(self.tok).visited.set(true);
        Ok(self)
    }

    pub fn has_child(&self, tag: &str) -> bool {
        self.tags().any(|id| self.text(id) == tag)
    }

    /// Moves to the first child tag named `tag`.
    pub fn child(&mut self, tag: &str) -> Result<&mut Self, WalkError> {
        if self.child_at(tag, 0) {
            return Ok(self);
        }
        Err(WalkError::NoChild {
            path: self.path(),
            child: tag.to_owned(),
        })
    }

    /// Moves to the `index`th child tag named `tag`; stays put if there are
    /// not that many.
    pub fn child_at(
        &mut self,
        tag: &str,
        index: usize,
    ) -> bool {
        let found = self.tags().filter(|id| self.text(*id) == tag).nth(index);
        match found {
            Some(id) => {
                self.enter(id);
                true
            }
            None => false,
        }
    }

    pub fn first_child(&mut self) -> bool {
        let found = self.tags().next();
        match found {
            Some(id) => {
                self.enter(id);
                true
            }
            None => false,
        }
    }

    /// Moves to the next sibling tag, skipping attributes and data.
    pub fn next_peer(&mut self) -> bool {
        let mut next = self.get(self.tok).next_peer;
        while let Some(id) = next {
            if self.get(id).kind == TokenKind::Open {
                self.enter(id);
                return true;
            }
            next = self.get(id).next_peer;
        }
        false
    }

    /// Moves to the first tag named `tag` under the current tag's parent.
    pub fn peer(&mut self, tag: &str) -> Result<&mut Self, WalkError> {
        self.up()?.child(tag)
    }

    pub fn up(&mut self) -> Result<&mut Self, WalkError> {
        match self.get(self.tok).parent {
            Some(parent) => {
                self.tok = parent;
                Ok(self)
            }
            None => Err(WalkError::AtRoot { path: self.path() }),
        }
    }

    fn find_key(&self, key: &str) -> Option<TokenId> {
        let key = self
            .children(self.tok)
            .find(|id| self.get(*id).kind == TokenKind::Key && self.text(*id) == key)?;
        self.get(key).visited.set(true);
        Some(key)
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.find_key(key).is_some()
    }

    /// Returns the value of attribute `key` and the key's token, for
    /// error paths.
    fn value(&self, key: &str) -> Result<(&'d str, TokenId), WalkError> {
        let Some(key_id) = self.find_key(key) else {
            return Err(WalkError::KeyNotFound {
                key: key.to_owned(),
                path: self.path(),
            });
        };
        match self.get(key_id).first_child {
            Some(value) if self.get(value).kind == TokenKind::Value => {
                self.get(value).visited.set(true);
                Ok((self.text(value), key_id))
            }
            _ => Err(WalkError::MissingValue {
                path: self.doc.path(key_id),
            }),
        }
    }

    fn typed<T>(
        &self,
        key: &str,
        expected: ValueType,
        parse: impl FnOnce(&str) -> Option<T>,
    ) -> Result<T, WalkError> {
        let (value, key_id) = self.value(key)?;
        parse(value).ok_or_else(|| WalkError::BadValue {
            path: self.doc.path(key_id),
            value: value.to_owned(),
            expected,
        })
    }

    pub fn value_string(&self, key: &str) -> Result<&'d str, WalkError> {
        Ok(self.value(key)?.0)
    }

    pub fn value_string_or(
        &self,
        default: &'d str,
        key: &str,
    ) -> Result<&'d str, WalkError> {
        if self.has_key(key) { self.value_string(key) } else { Ok(default) }
    }

    /// Finite, non-subnormal floats only.
    pub fn value_float(&self, key: &str) -> Result<f32, WalkError> {
        self.typed(key, ValueType::Float, |s| {
            s.parse::<f32>()
                .ok()
                .filter(|f| f.is_normal() || *f == 0.0)
        })
    }

    pub fn value_float_or(
        &self,
        default: f32,
        key: &str,
    ) -> Result<f32, WalkError> {
        if self.has_key(key) { self.value_float(key) } else { Ok(default) }
    }

    pub fn value_int(&self, key: &str) -> Result<i32, WalkError> {
        self.typed(key, ValueType::Int, |s| s.parse().ok())
    }

    pub fn value_int_or(
        &self,
        default: i32,
        key: &str,
    ) -> Result<i32, WalkError> {
        if self.has_key(key) { self.value_int(key) } else { Ok(default) }
    }

    pub fn value_bool(&self, key: &str) -> Result<bool, WalkError> {
        self.typed(key, ValueType::Bool, |s| match s {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        })
    }

    pub fn value_bool_or(
        &self,
        default: bool,
        key: &str,
    ) -> Result<bool, WalkError> {
        if self.has_key(key) { self.value_bool(key) } else { Ok(default) }
    }

    /// Up to 16 hex digits, either case, no prefix.
    pub fn value_hex(&self, key: &str) -> Result<u64, WalkError> {
        self.typed(key, ValueType::Hex, |s| {
            if s.is_empty() || s.len() > 16 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            u64::from_str_radix(s, 16).ok()
        })
    }

    pub fn value_hex_or(
        &self,
        default: u64,
        key: &str,
    ) -> Result<u64, WalkError> {
        if self.has_key(key) { self.value_hex(key) } else { Ok(default) }
    }

    /// Text content of the current tag.
    pub fn data_as_string(&self) -> Result<&'d str, WalkError> {
        let mut children = self.children(self.tok).skip_while(|id| self.get(*id).kind == TokenKind::Key);
        match children.next() {
            Some(id) if self.get(id).kind == TokenKind::Data => {
                self.get(id).visited.set(true);
                Ok(self.text(id))
            }
            Some(_) => Err(WalkError::NestedData { path: self.path() }),
            None => Err(WalkError::NoData { path: self.path() }),
        }
    }
}

impl std::fmt::Debug for Walker<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walker").field("path", &self.path()).finish()
    }
}

/// Depth-first walk over every token below and including the root, in
/// document order: a tag, then its attributes (each key followed by its
/// value), then its data or nested tags.
///
/// Starts before the root; the first [`advance`](Self::advance) moves onto it.
#[derive(Clone)]
pub struct Traversal<'d> {
    doc: &'d Document,
    pos: Option<TokenId>,
    started: bool,
}

impl<'d> Traversal<'d> {
    pub(crate) fn new(doc: &'d Document) -> Self {
        Self {
            doc,
            pos: None,
            started: false,
        }
    }

    /// Steps to the next token. Returns false once the walk is over.
    pub fn advance(&mut self) -> bool {
        let tree = self.doc.tree();
        if !self.started {
            self.started = true;
            self.pos = tree.root();
            return self.pos.is_some();
        }
        let Some(mut id) = self.pos else {
            return false;
        };
        if let Some(child) = tree.get(id).first_child {
            self.pos = Some(child);
            return true;
        }
        loop {
            if let Some(peer) = tree.get(id).next_peer {
                self.pos = Some(peer);
                return true;
            }
            match tree.get(id).parent {
                Some(parent) => id = parent,
                None => {
                    self.pos = None;
                    return false;
                }
            }
        }
    }

    pub fn current(&self) -> Option<TokenRef<'d>> {
        self.pos.map(|id| self.doc.token(id))
    }
}

impl<'d> Iterator for Traversal<'d> {
    type Item = TokenRef<'d>;

    fn next(&mut self) -> Option<TokenRef<'d>> {
        if self.advance() { self.current() } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(xml: &str) -> Document {
        Document::parse("test", xml).unwrap()
    }

    #[test]
    fn traversal_visits_content_in_order() {
        let doc = doc("<a><b>x</b></a>");
        let mut walk = doc.traverse();
        let mut seen = vec![];
        for _ in 0..3 {
            assert!(walk.advance());
            let tok = walk.current().unwrap();
            seen.push((tok.kind(), tok.text()));
        }
        assert_eq!(
            seen,
            vec![
                (TokenKind::Open, "a"),
                (TokenKind::Open, "b"),
                (TokenKind::Data, "x"),
            ]
        );
        assert!(!walk.advance());
        assert!(!walk.advance());
        assert!(walk.current().is_none());
    }

    #[test]
    fn traversal_includes_attributes() {
        let doc = doc(r#"<a k="1"><b/><c v="2"/></a>"#);
        let texts: Vec<_> = doc.traverse().map(|t| t.text()).collect();
        assert_eq!(texts, vec!["a", "k", "1", "b", "c", "v", "2"]);
    }

    #[test]
    fn navigation() {
        let doc = doc("<root><item n=\"1\"/><other/><item n=\"2\"/></root>");
        let mut w = doc.walker();
        w.check("root").unwrap();
        assert!(w.check("roo").is_err());
        assert!(w.has_child("item"));
        assert!(!w.has_child("n"));

        assert!(w.child_at("item", 1));
        assert_eq!(w.value_int("n").unwrap(), 2);
        assert!(!w.next_peer());
        w.up().unwrap();
        assert!(!w.child_at("item", 2));
        assert_eq!(w.tag(), "root");

        assert!(w.first_child());
        assert_eq!(w.value_int("n").unwrap(), 1);
        assert!(w.next_peer());
        assert_eq!(w.tag(), "other");
        w.peer("item").unwrap();
        assert_eq!(w.path(), "root/item");
        assert_eq!(w.value_int("n").unwrap(), 1);

        w.up().unwrap();
        assert!(matches!(w.up(), Err(WalkError::AtRoot { .. })));
        let err = w.child("missing").unwrap_err();
        assert_eq!(err.to_string(), "root tag has no child tag called missing");
    }

    #[test]
    fn typed_values() {
        let doc = doc(
            r#"<t f="1.5" z="0" big="1e39" i="-7" b="true" h="DeadBeef" e="" s="hi there"/>"#,
        );
        let w = doc.walker();
        assert_eq!(w.value_float("f").unwrap(), 1.5);
        assert_eq!(w.value_float("z").unwrap(), 0.0);
        assert!(w.value_float("big").is_err());
        assert!(w.value_float("s").is_err());
        assert_eq!(w.value_int("i").unwrap(), -7);
        assert!(w.value_int("f").is_err());
        assert!(w.value_int("e").is_err());
        assert!(w.value_bool("b").unwrap());
        assert!(w.value_bool("i").is_err());
        assert_eq!(w.value_hex("h").unwrap(), 0xdead_beef);
        assert!(w.value_hex("s").is_err());
        assert!(w.value_hex("e").is_err());
        assert_eq!(w.value_string("s").unwrap(), "hi there");
        assert_eq!(w.value_string("e").unwrap(), "");

        assert_eq!(w.value_int_or(3, "nope").unwrap(), 3);
        assert_eq!(w.value_int_or(3, "i").unwrap(), -7);
        assert!(w.value_bool_or(true, "nope").unwrap());
        assert_eq!(w.value_float_or(0.5, "nope").unwrap(), 0.5);
        assert!(w.value_int_or(3, "s").is_err());
    }

    #[test]
    fn hex_limits() {
        let doc = doc(r#"<t a="ffffffffffffffff" b="10000000000000000" c="+1"/>"#);
        let w = doc.walker();
        assert_eq!(w.value_hex("a").unwrap(), u64::MAX);
        assert!(w.value_hex("b").is_err());
        assert!(w.value_hex("c").is_err());
    }

    #[test]
    fn string_and_hex_defaults() {
        let doc = doc(r#"<t name="deck" colour="ff8800" bad="zz" flag/>"#);
        let w = doc.walker();
        assert_eq!(w.value_string_or("none", "name").unwrap(), "deck");
        assert_eq!(w.value_string_or("none", "missing").unwrap(), "none");
        assert_eq!(
            w.value_string_or("none", "flag").unwrap_err(),
            WalkError::MissingValue { path: "t/flag".into() }
        );
        assert_eq!(w.value_hex_or(7, "colour").unwrap(), 0xff8800);
        assert_eq!(w.value_hex_or(7, "missing").unwrap(), 7);
        assert!(matches!(
            w.value_hex_or(7, "bad"),
            Err(WalkError::BadValue { expected: ValueType::Hex, .. })
        ));
    }

    #[test]
    fn key_errors_name_paths() {
        let doc = doc(r#"<a><b flag/></a>"#);
        let mut w = doc.walker();
        w.child("b").unwrap();
        assert_eq!(
            w.value_string("flag").unwrap_err(),
            WalkError::MissingValue { path: "a/b/flag".into() }
        );
        assert_eq!(
            w.value_string("other").unwrap_err(),
            WalkError::KeyNotFound { key: "other".into(), path: "a/b".into() }
        );
        assert!(w.has_key("flag"));
    }

    #[test]
    fn data_extraction() {
        let doc = doc(r#"<a><b k="v"> some text </b><c/><d><e/></d></a>"#);
        let mut w = doc.walker();
        assert!(matches!(w.data_as_string(), Err(WalkError::NestedData { .. })));
        w.child("b").unwrap();
        assert_eq!(w.data_as_string().unwrap(), " some text ");
        w.peer("c").unwrap();
        assert!(matches!(w.data_as_string(), Err(WalkError::NoData { .. })));
    }

    #[test]
    fn visited_marks() {
        let doc = doc(r#"<a x="1" y="2"><b/><c/></a>"#);
        let mut w = doc.walker();
        w.value_int("x").unwrap();
        w.child("b").unwrap();
        assert!(w.token().visited());
        assert_eq!(doc.unvisited(), vec!["a/y".to_owned(), "a/c".to_owned()]);
    }
}
