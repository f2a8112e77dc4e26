//! Splits a template into literal text and `{{ ... }}` tags.
//!
//! `\{{` is a literal `{{` in both syntaxes, as is a `{{` that is never closed.
use super::TemplateSyntax;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Piece<'a> {
    Text(&'a str),
    /// A `{{` that does not open a tag.
    LiteralOpen,
    /// A whole tag. `inner` excludes the delimiters.
    Tag { text: &'a str, inner: &'a str },
}

pub(super) fn pieces(template: &str, syntax: TemplateSyntax) -> Vec<Piece<'_>> {
    let mut out = Vec::new();
    let mut pos = 0;

    while let Some(i) = template[pos..].find("{{") {
        let open = pos + i;
        let before = &template[pos..open];

        if before.ends_with('\\') && !before.ends_with("\\\\") {
            push_text(&mut out, &before[..before.len() - 1]);
            out.push(Piece::LiteralOpen);
            pos = open + 2;
            continue;
        }
        push_text(&mut out, before);

        let rest = &template[open..];
        let (skip, close) = match syntax {
            TemplateSyntax::Block if rest.starts_with("{{!--") => (5, "--}}"),
            TemplateSyntax::Block if rest.starts_with("{{{") => (3, "}}}"),
            _ => (2, "}}"),
        };

        match rest[skip..].find(close) {
            Some(j) => {
                let end = open + skip + j + close.len();
                out.push(Piece::Tag {
                    text: &template[open..end],
                    inner: &template[open + skip..open + skip + j],
                });
                pos = end;
            }
            None => {
                out.push(Piece::LiteralOpen);
                pos = open + 2;
            }
        }
    }

    push_text(&mut out, &template[pos..]);
    out
}

fn push_text<'a>(out: &mut Vec<Piece<'a>>, text: &'a str) {
    if !text.is_empty() {
        out.push(Piece::Text(text));
    }
}

/// Binding names a tag reads. Dotted paths report their root.
pub(super) fn references<'a>(text: &'a str, inner: &'a str, syntax: TemplateSyntax) -> Vec<&'a str> {
    match syntax {
        TemplateSyntax::Plain => {
            // `{{ name | filter }}` reads `name`
            let expr = inner.trim_matches(|c: char| c == '-' || c.is_whitespace());
            let head = expr.split('|').next().unwrap_or(expr).trim();
            root(head).into_iter().collect()
        }
        TemplateSyntax::Block => {
            if text.starts_with("{{!") {
                return Vec::new();
            }

            let expr = inner.trim_matches(|c: char| c == '~' || c.is_whitespace());
            if expr.starts_with('/') || expr.starts_with('>') {
                return Vec::new();
            }

            let mut tokens = expr.split_whitespace();
            let Some(first) = tokens.next() else {
                return Vec::new();
            };

            let mut args: Vec<&str> = tokens.collect();
            if args.is_empty() {
                return root(first).into_iter().collect();
            }

            // helper call: `{{#if x}}`, `{{else if x}}`, `{{lookup x key}}`
            if first == "else" {
                args.remove(0);
            }

            args.into_iter()
                .filter(|t| !(t.starts_with('(') || t.contains('=') || t.contains('|') || *t == "as"))
                .filter_map(|t| root(t.trim_end_matches(')')))
                .collect()
        }
    }
}

fn root(s: &str) -> Option<&str> {
    if !is_simple_name(s) {
        return None;
    }

    let root = s.split('.').next().unwrap_or(s);
    (!matches!(root, "else" | "this" | "true" | "false" | "null" | "none")).then_some(root)
}

fn is_simple_name(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };

    (first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}

/// Make a plain template safe for tera: only `{{ }}` tags stay syntax,
/// every `{%`, `{#` and literal `{{` is emitted as a string expression.
pub(super) fn escape_plain(template: &str) -> String {
    let mut out = String::with_capacity(template.len());

    for piece in pieces(template, TemplateSyntax::Plain) {
        match piece {
            Piece::Text(text) => {
                let mut chars = text.chars().peekable();
                while let Some(c) = chars.next() {
                    match (c, chars.peek().copied()) {
                        ('{', Some(next @ ('%' | '#'))) => {
                            chars.next();
                            out.push_str("{{ \"{");
                            out.push(next);
                            out.push_str("\" }}");
                        }
                        _ => out.push(c),
                    }
                }
            }
            Piece::LiteralOpen => out.push_str("{{ \"{{\" }}"),
            Piece::Tag { text, .. } => out.push_str(text),
        }
    }

    out
}

/// Make block content safe for handlebars: unclosed `{{` become `\{{`.
pub(super) fn escape_block(template: &str) -> String {
    let mut out = String::with_capacity(template.len());

    for piece in pieces(template, TemplateSyntax::Block) {
        match piece {
            Piece::Text(text) => out.push_str(text),
            Piece::LiteralOpen => out.push_str("\\{{"),
            Piece::Tag { text, .. } => out.push_str(text),
        }
    }

    out
}
