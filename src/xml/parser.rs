use super::error::{ParseError, ParseErrorKind};
use super::token::{TokenId, TokenKind, TokenRef, TokenTree};
use super::walker::{Traversal, Walker};

/// A parsed XML document: the source text and its token tree.
///
/// Tokens only reference spans of the source; nothing is copied until a
/// caller asks for text. The tree never changes after parsing, except for the
/// per-token "visited" marks a [`Walker`] leaves behind.
#[derive(Debug)]
pub struct Document {
    title: String,
    buf: String,
    tree: TokenTree,
}

impl Document {
    /// Parses `xml`; `title` names the document in error messages.
    pub fn parse(
        title: impl Into<String>,
        xml: impl Into<String>,
    ) -> Result<Self, ParseError> {
        let title = title.into();
        let buf = xml.into();
        match tokenize(buf.as_bytes()) {
            Ok(tree) => Ok(Self { title, buf, tree }),
            Err(failed) => {
                let err = ParseError {
                    title,
                    offset: failed.offset,
                    kind: failed.kind,
                };
                log::error!("{err}");
                Err(err)
            }
        }
    }

    /// Parses raw bytes. Only the text before the first NUL byte has to be
    /// valid UTF-8, since the input ends there.
    pub fn from_bytes(
        title: impl Into<String>,
        bytes: &[u8],
    ) -> Result<Self, ParseError> {
        let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
        match std::str::from_utf8(&bytes[..end]) {
            Ok(xml) => Self::parse(title, xml),
            Err(e) => {
                let err = ParseError {
                    title: title.into(),
                    offset: e.valid_up_to(),
                    kind: ParseErrorKind::NotUtf8,
                };
                log::error!("{err}");
                Err(err)
            }
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn source(&self) -> &str {
        &self.buf
    }

    pub fn token_count(&self) -> usize {
        self.tree.len()
    }

    pub fn root(&self) -> TokenRef<'_> {
        self.token(TokenId::ROOT)
    }

    /// Cursor on the root tag, for structured navigation.
    pub fn walker(&self) -> Walker<'_> {
        Walker::new(self)
    }

    /// Depth-first traversal, starting before the root.
    pub fn traverse(&self) -> Traversal<'_> {
        Traversal::new(self)
    }

    /// Paths of every tag and attribute key below the root that no walker has
    /// looked at, in document order.
    pub fn unvisited(&self) -> Vec<String> {
        self.tree
            .ids()
            .skip(1)
            .filter(|id| {
                let tok = self.tree.get(*id);
                matches!(tok.kind, TokenKind::Open | TokenKind::Key) && !tok.visited.get()
            })
            .map(|id| self.path(id))
            .collect()
    }

    pub(crate) fn tree(&self) -> &TokenTree {
        &self.tree
    }

    pub(crate) fn token(&self, id: TokenId) -> TokenRef<'_> {
        TokenRef { doc: self, id }
    }

    pub(crate) fn span(&self, start: usize, len: usize) -> &str {
        self.buf.get(start..start + len).unwrap_or_default()
    }

    pub(crate) fn path(&self, id: TokenId) -> String {
        let mut names = vec![];
        let mut next = Some(id);
        while let Some(id) = next {
            let tok = self.tree.get(id);
            names.push(self.span(tok.start, tok.len));
            next = tok.parent;
        }
        names.reverse();
        names.join("/")
    }
}

/// Copies re-parse the source, so the copy starts with no visited marks.
impl Clone for Document {
    fn clone(&self) -> Self {
        let buf = self.buf.clone();
        let tree = tokenize(buf.as_bytes()).unwrap_or_default();
        Self {
            title: self.title.clone(),
            buf,
            tree,
        }
    }
}

struct Failed {
    offset: usize,
    kind: ParseErrorKind,
}

fn tokenize(buf: &[u8]) -> Result<TokenTree, Failed> {
    let mut t = Tokenizer::new(buf);
    match t.run() {
        Ok(()) => Ok(t.tree),
        Err(failed) => {
            t.attach_error(&failed);
            Err(failed)
        }
    }
}

enum Flow {
    Next(usize),
    Done,
}

/// Single pass over the source. `cur` is the innermost open tag, `in_tag`
/// is set between a tag's name and its closing `>`.
struct Tokenizer<'b> {
    buf: &'b [u8],
    end: usize,
    tree: TokenTree,
    cur: Option<TokenId>,
    last: Option<TokenId>,
    in_tag: bool,
}

impl<'b> Tokenizer<'b> {
    fn new(buf: &'b [u8]) -> Self {
        // the source ends at the first NUL, if any
        let end = buf.iter().position(|b| *b == 0).unwrap_or(buf.len());
        Self {
            buf,
            end,
            tree: TokenTree::default(),
            cur: None,
            last: None,
            in_tag: false,
        }
    }

    fn at(&self, i: usize) -> u8 {
        if i < self.end { self.buf[i] } else { 0 }
    }

    fn starts_with(&self, i: usize, pre: &[u8]) -> bool {
        self.buf[..self.end].get(i..).is_some_and(|s| s.starts_with(pre))
    }

    fn find(&self, from: usize, pat: &[u8]) -> Option<usize> {
        self.buf[..self.end]
            .get(from..)?
            .windows(pat.len())
            .position(|w| w == pat)
            .map(|p| from + p)
    }

    fn eat_whitespace(&self, mut i: usize) -> usize {
        while i < self.end && self.buf[i] <= b' ' {
            i += 1;
        }
        i
    }

    fn eat_name(&self, mut i: usize) -> usize {
        while i < self.end && self.buf[i] > b' ' && !b"/>=".contains(&self.buf[i]) {
            i += 1;
        }
        i
    }

    fn text(&self, id: TokenId) -> String {
        let tok = self.tree.get(id);
        String::from_utf8_lossy(&self.buf[tok.start..tok.start + tok.len]).into_owned()
    }

    fn snippet(&self, i: usize) -> String {
        let stop = (i + 16).min(self.end);
        String::from_utf8_lossy(&self.buf[i.min(stop)..stop]).into_owned()
    }

    fn found(&self, i: usize) -> String {
        match self.at(i) {
            0 => "end of input".to_owned(),
            c => (c as char).to_string(),
        }
    }

    fn fail<T>(&self, offset: usize, kind: ParseErrorKind) -> Result<T, Failed> {
        Err(Failed { offset, kind })
    }

    fn run(&mut self) -> Result<(), Failed> {
        if self.end == 0 {
            return self.fail(0, ParseErrorKind::Empty);
        }
        let mut pos = self.eat_whitespace(0);
        if self.at(pos) != b'<' {
            return self.fail(pos, ParseErrorKind::ExpectedOpen);
        }
        let mut prev = None;
        while pos < self.end {
            if prev == Some(pos) {
                return self.fail(pos, ParseErrorKind::NoProgress(self.snippet(pos)));
            }
            prev = Some(pos);
            let flow = if self.in_tag {
                self.in_tag_step(pos)?
            } else if self.at(pos) == b'<' {
                self.markup_step(pos)?
            } else {
                self.text_step(pos)?
            };
            match flow {
                Flow::Next(next) => pos = next,
                Flow::Done => break,
            }
        }
        // open tags left at end of input are not reported
        if self.tree.root().is_none() {
            return self.fail(pos, ParseErrorKind::NoRoot);
        }
        Ok(())
    }

    /// At a `<` outside any tag.
    fn markup_step(&mut self, pos: usize) -> Result<Flow, Failed> {
        if self.starts_with(pos, b"<!--") {
            return match self.find(pos + 4, b"-->") {
                Some(end) => Ok(Flow::Next(self.eat_whitespace(end + 3))),
                None => self.fail(pos, ParseErrorKind::UnclosedComment),
            };
        }
        if self.starts_with(pos, b"<?") {
            return match self.find(pos + 2, b"?>") {
                Some(end) => Ok(Flow::Next(self.eat_whitespace(end + 2))),
                None => self.fail(pos, ParseErrorKind::UnclosedProcessing),
            };
        }
        let pos = self.eat_whitespace(pos + 1);
        if self.at(pos) == b'/' {
            self.close_tag(pos)
        } else {
            self.open_tag(pos)
        }
    }

    fn open_tag(&mut self, pos: usize) -> Result<Flow, Failed> {
        let name_end = self.eat_name(pos);
        if name_end == pos {
            return self.fail(pos, ParseErrorKind::MissingName);
        }
        let tok = match self.cur {
            Some(parent) => {
                if self.has_child(parent, TokenKind::Data) {
                    return self.fail(pos, ParseErrorKind::MixedContent(self.text(parent)));
                }
                self.tree.add_child(parent, TokenKind::Open, pos, name_end - pos)
            }
            None if self.tree.root().is_none() => {
                self.tree.add_top(TokenKind::Open, pos, name_end - pos)
            }
            None => return self.fail(pos, ParseErrorKind::TopLevelContent(self.snippet(pos))),
        };
        self.cur = Some(tok);
        self.last = Some(tok);
        self.in_tag = true;
        Ok(Flow::Next(self.eat_whitespace(name_end)))
    }

    /// At the `/` of a `</name>`.
    fn close_tag(&mut self, pos: usize) -> Result<Flow, Failed> {
        let Some(open) = self.cur else {
            return self.fail(pos, ParseErrorKind::UnexpectedClose);
        };
        let start = self.eat_whitespace(pos + 1);
        let name_end = self.eat_name(start);
        let close = self.tree.add_close(open, start, name_end - start);
        self.last = Some(close);
        let (close_text, open_text) = (self.text(close), self.text(open));
        if close_text != open_text {
            return self.fail(
                start,
                ParseErrorKind::TagMismatch {
                    close: close_text,
                    open: open_text,
                },
            );
        }
        let gt = self.eat_whitespace(name_end);
        if self.at(gt) != b'>' {
            return self.fail(gt, ParseErrorKind::UnclosedCloseTag(self.found(gt)));
        }
        self.cur = self.tree.get(open).parent;
        self.after_close(gt)
    }

    /// After the `>` ending a close tag or a self-closing tag.
    fn after_close(&mut self, gt: usize) -> Result<Flow, Failed> {
        let peek = self.eat_whitespace(gt + 1);
        match self.cur {
            None if self.starts_with(peek, b"<!--") || self.starts_with(peek, b"<?") => {
                Ok(Flow::Next(peek))
            }
            None if peek < self.end => {
                self.fail(peek, ParseErrorKind::TopLevelContent(self.snippet(peek)))
            }
            None => Ok(Flow::Done),
            Some(_) if peek >= self.end || self.at(peek) == b'<' => Ok(Flow::Next(peek)),
            Some(parent) => self.fail(peek, ParseErrorKind::MixedContent(self.text(parent))),
        }
    }

    fn in_tag_step(&mut self, pos: usize) -> Result<Flow, Failed> {
        let Some(tag) = self.cur else {
            return self.fail(pos, ParseErrorKind::ExpectedTag);
        };
        match self.at(pos) {
            b'>' => {
                self.in_tag = false;
                let peek = self.eat_whitespace(pos + 1);
                if peek >= self.end {
                    Ok(Flow::Done)
                } else if self.at(peek) == b'<' {
                    Ok(Flow::Next(peek))
                } else {
                    self.data(tag, pos + 1)
                }
            }
            b'/' => {
                let gt = self.eat_whitespace(pos + 1);
                if self.at(gt) != b'>' {
                    return self.fail(
                        gt,
                        ParseErrorKind::BadSelfClose {
                            found: self.found(gt),
                            tag: self.text(tag),
                        },
                    );
                }
                let (start, len) = {
                    let tok = self.tree.get(tag);
                    (tok.start, tok.len)
                };
                self.last = Some(self.tree.add_close(tag, start, len));
                self.in_tag = false;
                self.cur = self.tree.get(tag).parent;
                self.after_close(gt)
            }
            b'=' => self.attribute_value(tag, pos),
            b'<' => self.fail(pos, ParseErrorKind::UnexpectedLt),
            _ => {
                let key_end = self.eat_name(pos);
                let key = self.tree.add_child(tag, TokenKind::Key, pos, key_end - pos);
                self.last = Some(key);
                Ok(Flow::Next(self.eat_whitespace(key_end)))
            }
        }
    }

    /// At the `=` following an attribute key.
    fn attribute_value(
        &mut self,
        tag: TokenId,
        pos: usize,
    ) -> Result<Flow, Failed> {
        let key = match self.tree.get(tag).last_child {
            Some(key)
                if self.tree.get(key).kind == TokenKind::Key
                    && self.tree.get(key).first_child.is_none() =>
            {
                key
            }
            Some(other) => {
                return self.fail(pos, ParseErrorKind::UnexpectedEquals(self.text(other)));
            }
            None => return self.fail(pos, ParseErrorKind::UnexpectedEquals(self.text(tag))),
        };
        let quote = self.eat_whitespace(pos + 1);
        if self.at(quote) != b'"' {
            return self.fail(quote, ParseErrorKind::ExpectedQuote(self.text(key)));
        }
        let Some(end) = self.find(quote + 1, b"\"") else {
            return self.fail(quote, ParseErrorKind::UnclosedAttribute(self.text(key)));
        };
        let value = self.tree.add_child(key, TokenKind::Value, quote + 1, end - quote - 1);
        self.last = Some(value);
        Ok(Flow::Next(self.eat_whitespace(end + 1)))
    }

    /// Text outside tags, e.g. after a comment.
    fn text_step(&mut self, pos: usize) -> Result<Flow, Failed> {
        match self.cur {
            Some(tag) => self.data(tag, pos),
            None => self.fail(pos, ParseErrorKind::ExpectedTag),
        }
    }

    /// Captures everything from `start` up to the next `<` as the text
    /// content of `tag`.
    fn data(&mut self, tag: TokenId, start: usize) -> Result<Flow, Failed> {
        if self.has_child(tag, TokenKind::Open) || self.has_child(tag, TokenKind::Data) {
            return self.fail(start, ParseErrorKind::MixedContent(self.text(tag)));
        }
        let stop = self.find(start, b"<").unwrap_or(self.end);
        if let Some(gt) = self.buf[start..stop].iter().position(|b| *b == b'>') {
            return self.fail(start + gt, ParseErrorKind::StrayGt);
        }
        let data = self.tree.add_child(tag, TokenKind::Data, start, stop - start);
        self.last = Some(data);
        Ok(Flow::Next(stop))
    }

    fn has_child(&self, tag: TokenId, kind: TokenKind) -> bool {
        self.tree.children(tag).any(|c| self.tree.get(c).kind == kind)
    }

    /// Marks where parsing stopped with an `Error` token carrying the message.
    fn attach_error(&mut self, failed: &Failed) {
        let offset = failed.offset.min(self.buf.len());
        let len = self.buf.len() - offset;
        let tok = match self.last {
            Some(last) => self.tree.add_peer(last, TokenKind::Error, offset, len),
            None => self.tree.add_top(TokenKind::Error, offset, len),
        };
        self.tree.set_error(tok, failed.kind.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tree: &TokenTree) -> Vec<TokenKind> {
        tree.ids().map(|id| tree.get(id).kind).collect()
    }

    fn fails(xml: &str) -> ParseErrorKind {
        match tokenize(xml.as_bytes()) {
            Ok(_) => panic!("{xml:?} parsed"),
            Err(f) => f.kind,
        }
    }

    #[test]
    fn nested_tags_with_data() {
        let tree = tokenize(b"<a><b>x</b></a>").ok().unwrap();
        use TokenKind::*;
        assert_eq!(kinds(&tree), vec![Open, Open, Data, Close, Close]);
        let root = tree.root().unwrap();
        let b = tree.children(root).next().unwrap();
        let data = tree.children(b).next().unwrap();
        assert_eq!(tree.get(data).start, 6);
        assert_eq!(tree.get(data).len, 1);
        assert!(tree.get(b).close.is_some());
        assert!(tree.get(root).close.is_some());
    }

    #[test]
    fn attributes_and_self_closing() {
        let src = r#"<tag a="1" b = "" c/>"#;
        let tree = tokenize(src.as_bytes()).ok().unwrap();
        use TokenKind::*;
        assert_eq!(kinds(&tree), vec![Open, Key, Value, Key, Value, Key, Close]);
        let root = tree.root().unwrap();
        let keys: Vec<_> = tree.children(root).collect();
        assert_eq!(keys.len(), 3);
        let empty_value = tree.children(keys[1]).next().unwrap();
        assert_eq!(tree.get(empty_value).len, 0);
        assert!(tree.children(keys[2]).next().is_none());
    }

    #[test]
    fn skips_comments_and_processing() {
        let src = "<?xml version=\"1.0\"?>\n<!-- hi <not> -->\n<a>\n  <!-- c -->\n  <b/>\n</a>";
        let tree = tokenize(src.as_bytes()).ok().unwrap();
        use TokenKind::*;
        assert_eq!(kinds(&tree), vec![Open, Open, Close, Close]);
    }

    #[test]
    fn whitespace_only_content_is_not_data() {
        let tree = tokenize(b"<a>\n  <b> </b>\n</a>\n").ok().unwrap();
        assert!(!kinds(&tree).contains(&TokenKind::Data));
    }

    #[test]
    fn mismatched_close_tag() {
        let kind = fails("<a><b></a>");
        assert_eq!(
            kind,
            ParseErrorKind::TagMismatch { close: "a".into(), open: "b".into() }
        );
        let msg = kind.to_string();
        assert!(msg.contains('a') && msg.contains('b'));
    }

    #[test]
    fn error_token_is_attached() {
        let mut t = Tokenizer::new(b"<a><b></a>");
        let failed = t.run().err().unwrap();
        t.attach_error(&failed);
        let err = t.tree.ids().last().unwrap();
        let tok = t.tree.get(err);
        assert_eq!(tok.kind, TokenKind::Error);
        assert_eq!(tok.start, 8);
        assert_eq!(tok.len, 2);
        assert_eq!(tok.error.as_deref(), Some("</a> mismatches <b>"));
    }

    #[test]
    fn malformed_inputs() {
        assert_eq!(fails(""), ParseErrorKind::Empty);
        assert_eq!(fails("   hello"), ParseErrorKind::ExpectedOpen);
        assert_eq!(fails("<a><!-- x</a>"), ParseErrorKind::UnclosedComment);
        assert_eq!(fails("<?xml <a/>"), ParseErrorKind::UnclosedProcessing);
        assert_eq!(fails("<a b=1/>"), ParseErrorKind::ExpectedQuote("b".into()));
        assert_eq!(fails("<a b=\"1/>"), ParseErrorKind::UnclosedAttribute("b".into()));
        assert_eq!(fails("<a =\"1\"/>"), ParseErrorKind::UnexpectedEquals("a".into()));
        assert_eq!(fails("<a b=\"1\"=\"2\"/>"), ParseErrorKind::UnexpectedEquals("b".into()));
        assert_eq!(fails("<a <b/>"), ParseErrorKind::UnexpectedLt);
        assert!(matches!(fails("<a/ x>"), ParseErrorKind::BadSelfClose { .. }));
        assert!(matches!(fails("<a></a x>"), ParseErrorKind::UnclosedCloseTag(_)));
        assert_eq!(fails("<a>x > y</a>"), ParseErrorKind::StrayGt);
        assert!(matches!(fails("<a/><b/>"), ParseErrorKind::TopLevelContent(_)));
        assert!(matches!(fails("<a/> junk"), ParseErrorKind::TopLevelContent(_)));
        assert!(matches!(fails("<a/><!-- ok --><b/>"), ParseErrorKind::TopLevelContent(_)));
        assert_eq!(fails("<!-- only a comment -->"), ParseErrorKind::NoRoot);
        assert_eq!(fails("<>"), ParseErrorKind::MissingName);
    }

    #[test]
    fn mixed_content_is_rejected() {
        assert_eq!(fails("<a>x<b/></a>"), ParseErrorKind::MixedContent("a".into()));
        assert_eq!(fails("<a><b/>x</a>"), ParseErrorKind::MixedContent("a".into()));
        assert_eq!(fails("<a>x<!-- c -->y</a>"), ParseErrorKind::MixedContent("a".into()));
    }

    #[test]
    fn unclosed_root_at_end_of_input_is_accepted() {
        assert!(tokenize(b"<a><b/>").is_ok());
        assert!(tokenize(b"<a>").is_ok());
        assert!(tokenize(b"<a>text").is_ok());
    }

    #[test]
    fn comments_after_root() {
        assert!(tokenize(b"<a/>\n<!-- trailer -->\n").is_ok());
        assert!(matches!(fails("<a/><!-- c --> x"), ParseErrorKind::ExpectedTag));
    }

    #[test]
    fn stops_at_nul() {
        assert!(tokenize(b"<a/>\0garbage").is_ok());
        assert!(matches!(fails("\0<a/>"), ParseErrorKind::Empty));
    }
}
