//! `<message role="...">...</message>` blocks rendered with Handlebars.
use handlebars::Handlebars;

use super::Bindings;
use super::scan::escape_block;
use crate::error::TemplateError;
use crate::transcript::{Role, Turn};

const OPEN: &str = "<message";
const CLOSE: &str = "</message>";

/// One parsed block. Offsets are byte positions in the template.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Block {
    role: Role,
    start: usize,
    content_start: usize,
    content_end: usize,
    end: usize,
}

fn registry() -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    // prompts are not html
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars
}

pub(super) fn render(template: &str, bindings: &Bindings) -> Result<String, TemplateError> {
    let blocks = parse(template)?;
    let handlebars = registry();

    if blocks.is_empty() {
        return Ok(handlebars.render_template(&escape_block(template), bindings)?);
    }

    let mut out = String::with_capacity(template.len());
    let mut cursor = 0;
    for block in &blocks {
        out.push_str(&template[cursor..block.content_start]);
        out.push_str(
            &handlebars.render_template(
                &escape_block(&template[block.content_start..block.content_end]),
                bindings,
            )?,
        );
        cursor = block.content_end;
    }
    out.push_str(&template[cursor..]);

    Ok(out)
}

pub(super) fn render_messages(
    template: &str,
    bindings: &Bindings,
) -> Result<Vec<Turn>, TemplateError> {
    let blocks = parse(template)?;
    let handlebars = registry();

    if blocks.is_empty() {
        let content = handlebars.render_template(&escape_block(template), bindings)?;
        return Ok(vec![Turn::user(content.trim())]);
    }

    blocks
        .iter()
        .map(|block| -> Result<Turn, TemplateError> {
            let content = handlebars.render_template(
                &escape_block(&template[block.content_start..block.content_end]),
                bindings,
            )?;
            Ok(Turn::new(block.role, content.trim()))
        })
        .collect()
}

fn parse(template: &str) -> Result<Vec<Block>, TemplateError> {
    let mut blocks = Vec::new();
    let mut cursor = 0;

    loop {
        let rest = &template[cursor..];
        let next_open = find_open(rest).map(|i| cursor + i);
        let next_close = rest.find(CLOSE).map(|i| cursor + i);

        let start = match (next_open, next_close) {
            (None, None) => break,
            (Some(open), Some(close)) if close < open => {
                return Err(TemplateError::UnbalancedBlock(close));
            }
            (None, Some(close)) => return Err(TemplateError::UnbalancedBlock(close)),
            (Some(open), _) => open,
        };

        let tag_end = template[start..]
            .find('>')
            .map(|i| start + i)
            .ok_or(TemplateError::UnbalancedBlock(start))?;
        let attrs = &template[start + OPEN.len()..tag_end];
        let role = parse_role(attrs, start)?;

        if attrs.trim_end().ends_with('/') {
            blocks.push(Block {
                role,
                start,
                content_start: tag_end + 1,
                content_end: tag_end + 1,
                end: tag_end + 1,
            });
            cursor = tag_end + 1;
            continue;
        }

        let content_start = tag_end + 1;
        let content_end = template[content_start..]
            .find(CLOSE)
            .map(|i| content_start + i)
            .ok_or(TemplateError::UnbalancedBlock(start))?;

        if let Some(nested) = find_open(&template[content_start..content_end]) {
            return Err(TemplateError::UnbalancedBlock(content_start + nested));
        }

        blocks.push(Block {
            role,
            start,
            content_start,
            content_end,
            end: content_end + CLOSE.len(),
        });
        cursor = content_end + CLOSE.len();
    }

    check_gaps(template, &blocks)?;
    Ok(blocks)
}

// `<message` only opens a block when followed by whitespace, `>` or `/`.
fn find_open(s: &str) -> Option<usize> {
    s.match_indices(OPEN).map(|(i, _)| i).find(|&i| {
        matches!(
            s[i + OPEN.len()..].chars().next(),
            Some(c) if c.is_whitespace() || c == '>' || c == '/'
        )
    })
}

fn parse_role(attrs: &str, offset: usize) -> Result<Role, TemplateError> {
    let Some(idx) = attrs
        .match_indices("role=")
        .map(|(i, _)| i)
        .find(|&i| attrs[..i].ends_with(char::is_whitespace))
    else {
        return Err(TemplateError::MissingRole(offset));
    };

    let value = &attrs[idx + "role=".len()..];
    let quote = match value.chars().next() {
        Some(q @ ('"' | '\'')) => q,
        _ => return Err(TemplateError::MissingRole(offset)),
    };

    let inner = &value[1..];
    let end = inner
        .find(quote)
        .ok_or(TemplateError::MissingRole(offset))?;

    inner[..end].trim().parse()
}

// Only whitespace may sit between blocks.
fn check_gaps(template: &str, blocks: &[Block]) -> Result<(), TemplateError> {
    if blocks.is_empty() {
        return Ok(());
    }

    let mut cursor = 0;
    for block in blocks {
        stray_text(template, cursor, block.start)?;
        cursor = block.end;
    }
    stray_text(template, cursor, template.len())
}

fn stray_text(template: &str, from: usize, to: usize) -> Result<(), TemplateError> {
    match template[from..to].find(|c: char| !c.is_whitespace()) {
        Some(i) => Err(TemplateError::StrayText(from + i)),
        None => Ok(()),
    }
}
