use g3dkit::xml::{Document, TokenKind, Walker};

use crate::CommonArgs;
use crate::prelude::*;
use crate::util::read_file;

#[derive(clap::Args, Debug)]
pub struct XmlArgs {
    /// Print a value instead of the token stream: `root/child/tag` for text
    /// content, `root/child/tag@key` for an attribute
    #[arg(short, long)]
    get: Vec<String>,
    /// List the tags and attributes that were never looked at
    #[arg(long)]
    audit: bool,
    #[command(flatten)]
    inpath: crate::InputPath,
}

pub fn run(
    args_common: &CommonArgs,
    args_cmd: &XmlArgs,
) -> AnyResult<()> {
    let path = &args_cmd.inpath.in_file;
    let data = read_file(path)?;
    let doc = Document::from_bytes(path.to_string_lossy(), &data)
        .context("Cannot parse XML")?;
    if args_common.verbose {
        eprintln!("Parsed {} tokens.", doc.token_count());
    }

    if args_cmd.get.is_empty() {
        print_tokens(&doc);
    }
    for query in args_cmd.get.iter() {
        let value = get(doc.walker(), query)
            .with_context(|| format!("Cannot get {query}"))?;
        println!("{value}");
    }

    if args_cmd.audit {
        let unvisited = doc.unvisited();
        if unvisited.is_empty() {
            eprintln!("Everything was visited.");
        }
        for path in unvisited {
            println!("unvisited: {path}");
        }
    }
    Ok(())
}

fn get<'d>(mut walker: Walker<'d>, query: &str) -> AnyResult<&'d str> {
    let (tags, key) = match query.split_once('@') {
        Some((tags, key)) => (tags, Some(key)),
        None => (query, None),
    };
    let mut tags = tags.split('/');
    if let Some(root) = tags.next() {
        walker.check(root)?;
    }
    for tag in tags {
        walker.child(tag)?;
    }
    let value = match key {
        Some(key) => walker.value_string(key)?,
        None => walker.data_as_string()?,
    };
    Ok(value)
}

fn print_tokens(doc: &Document) {
    for tok in doc.traverse() {
        let depth = tok.path().matches('/').count();
        let indent = "  ".repeat(depth);
        match tok.kind() {
            TokenKind::Open => println!("{indent}<{}> @{}", tok.text(), tok.offset()),
            TokenKind::Key => println!("{indent}{}=", tok.text()),
            TokenKind::Value => println!("{indent}{:?}", tok.text()),
            TokenKind::Data => println!("{indent}{:?}", tok.text().trim()),
            TokenKind::Close | TokenKind::Error => {}
        }
    }
}
