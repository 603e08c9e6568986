use anyhow::Result;

use g3dkit::xml::{DEFAULT_KEY, Document, ParseErrorKind, TokenKind, ValueType, WalkError};

const SCENE: &str = r#"<?xml version="1.0"?>
<!-- a small scene -->
<scene name="harbour" version="3">
    <model file="ship.g3d" scale="1.5" visible="true" id="0A1b"/>
    <model file="crane.g3d" visible="false"/>
    <light>
        <colour value="ff8800"/>
    </light>
    <title>Harbour at dawn</title>
</scene>
"#;

#[test]
fn depth_first_order_and_end() -> Result<()> {
    let doc = Document::parse("balance", "<a><b>x</b></a>")?;
    let mut walk = doc.traverse();
    let mut kinds = vec![];
    while walk.advance() {
        let tok = walk.current().unwrap();
        kinds.push((tok.kind(), tok.text().to_owned()));
    }
    assert_eq!(
        kinds,
        [
            (TokenKind::Open, "a".to_owned()),
            (TokenKind::Open, "b".to_owned()),
            (TokenKind::Data, "x".to_owned()),
        ]
    );
    assert!(!walk.advance());

    let b = doc.traverse().nth(1).unwrap();
    assert_eq!(b.path(), "a/b");
    assert_eq!(b.offset(), 4);
    assert_eq!(b.close().map(|c| c.text()), Some("b"));
    Ok(())
}

#[test]
fn mismatched_close_names_both_tags() {
    let err = Document::parse("mismatch.xml", "<a><b></a>").unwrap_err();
    assert_eq!(err.title, "mismatch.xml");
    assert_eq!(err.offset, 8);
    assert!(matches!(err.kind, ParseErrorKind::TagMismatch { .. }));
    let msg = err.to_string();
    assert!(msg.contains("</a>") && msg.contains("<b>"), "{msg}");
}

#[test]
fn typed_attribute_extraction() -> Result<()> {
    let doc = Document::parse("ok", r#"<tag value="42"/>"#)?;
    assert_eq!(doc.walker().value_int(DEFAULT_KEY)?, 42);

    let doc = Document::parse("bad", r#"<tag value="abc"/>"#)?;
    let err = doc.walker().value_int(DEFAULT_KEY).unwrap_err();
    assert_eq!(
        err,
        WalkError::BadValue {
            path: "tag/value".into(),
            value: "abc".into(),
            expected: ValueType::Int,
        }
    );
    assert_eq!(err.path(), "tag/value");
    assert_eq!(err.to_string(), r#"tag/value is not an int: "abc""#);
    Ok(())
}

#[test]
fn walks_a_scene() -> Result<()> {
    let doc = Document::parse("scene.xml", SCENE)?;
    let mut w = doc.walker();
    w.check("scene")?;
    assert_eq!(w.value_string("name")?, "harbour");
    assert_eq!(w.value_int("version")?, 3);

    let mut models = vec![];
    let mut i = 0;
    while w.child_at("model", i) {
        models.push((
            w.value_string("file")?.to_owned(),
            w.value_float_or(1.0, "scale")?,
            w.value_bool("visible")?,
        ));
        if w.has_key("id") {
            assert_eq!(w.value_hex("id")?, 0x0a1b);
        }
        w.up()?;
        i += 1;
    }
    assert_eq!(
        models,
        [
            ("ship.g3d".to_owned(), 1.5, true),
            ("crane.g3d".to_owned(), 1.0, false),
        ]
    );

    let colour = w.child("light")?.child("colour")?.value_hex(DEFAULT_KEY)?;
    assert_eq!(colour, 0xff8800);
    assert_eq!(w.path(), "scene/light/colour");
    assert_eq!(w.peer("colour")?.path(), "scene/light/colour");

    w.up()?.peer("title")?;
    assert_eq!(w.data_as_string()?, "Harbour at dawn");
    assert!(w.up()?.up().is_err());
    Ok(())
}

#[test]
fn navigation_errors_carry_paths() -> Result<()> {
    let doc = Document::parse("scene.xml", SCENE)?;
    let mut w = doc.walker();
    assert_eq!(
        w.check("world").unwrap_err().to_string(),
        "expecting world tag, got scene"
    );
    w.child("light")?;
    let err = w.child("sun").unwrap_err();
    assert_eq!(err.path(), "scene/light");
    // a failed move leaves the walker in place
    assert_eq!(w.tag(), "light");
    let err = w.value_int("power").unwrap_err();
    assert_eq!(err.to_string(), "power not found in scene/light tag");
    Ok(())
}

#[test]
fn audit_lists_what_was_never_read() -> Result<()> {
    let doc = Document::parse("scene.xml", SCENE)?;
    let mut w = doc.walker();
    w.child("model")?;
    w.value_string("file")?;
    w.value_float("scale")?;
    let left = doc.unvisited();
    assert_eq!(
        left,
        [
            "scene/name",
            "scene/version",
            "scene/model/visible",
            "scene/model/id",
            "scene/model",
            "scene/model/file",
            "scene/model/visible",
            "scene/light",
            "scene/light/colour",
            "scene/light/colour/value",
            "scene/title",
        ]
    );
    Ok(())
}

#[test]
fn clone_starts_unvisited() -> Result<()> {
    let doc = Document::parse("a", r#"<a k="v"><b/></a>"#)?;
    doc.walker().child("b")?;
    let copy = doc.clone();
    assert_eq!(doc.unvisited(), ["a/k"]);
    assert_eq!(copy.unvisited(), ["a/k", "a/b"]);
    assert_eq!(copy.source(), doc.source());
    assert_eq!(copy.token_count(), doc.token_count());
    Ok(())
}

#[test]
fn entities_and_odd_spacing_pass_through() -> Result<()> {
    let doc = Document::parse("odd", "< a  k = \"x &amp; y\" >&lt;hi&gt;</ a >")?;
    let w = doc.walker();
    assert_eq!(w.tag(), "a");
    assert_eq!(w.value_string("k")?, "x &amp; y");
    assert_eq!(w.data_as_string()?, "&lt;hi&gt;");
    Ok(())
}

#[test]
fn invalid_utf8_is_rejected() {
    let err = Document::from_bytes("bin", b"<a>\xff</a>").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::NotUtf8);
    assert_eq!(err.offset, 3);
    assert!(Document::from_bytes("ok", b"<a/>").is_ok());
}

#[test]
fn bytes_after_nul_are_ignored() -> Result<()> {
    let doc = Document::from_bytes("padded", b"<a k=\"v\"/>\0\xff\xfe garbage")?;
    assert_eq!(doc.source(), "<a k=\"v\"/>");
    assert_eq!(doc.walker().value_string("k")?, "v");

    let err = Document::from_bytes("bin", b"<a>\xff</a>\0").unwrap_err();
    assert_eq!(err.offset, 3);
    Ok(())
}
