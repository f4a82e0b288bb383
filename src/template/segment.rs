//! Splits template source into literal text and `{{ ... }}` actions
//!
//! Trim markers are applied here: `{{- ` strips trailing whitespace from the
//! text before the action and ` -}}` strips leading whitespace from the text
//! after it. Comments are recognised and dropped.

use crate::error::{Span, TemplateSyntaxError};

const LEFT_DELIM: &str = "{{";
const RIGHT_DELIM: &str = "}}";
const COMMENT_OPEN: &str = "/*";
const COMMENT_CLOSE: &str = "*/";

/// A piece of template source
#[derive(Debug, Clone, PartialEq)]
pub enum Segment<'s> {
    /// Literal text, already trimmed by neighbouring markers
    Text(&'s str),
    /// Action body without delimiters or trim markers
    Action {
        body: &'s str,
        /// Offset of `body` in the source
        body_start: usize,
        /// The whole `{{ ... }}` including delimiters
        span: Span,
    },
}

/// Split `source` into segments
pub fn split(source: &str) -> Result<Vec<Segment<'_>>, TemplateSyntaxError> {
    let mut segments = Vec::new();
    let mut pos = 0;
    let mut trim_next_text = false;

    while let Some(found) = source[pos..].find(LEFT_DELIM) {
        let open = pos + found;
        push_text(&mut segments, &source[pos..open], trim_next_text);

        let mut inner = open + LEFT_DELIM.len();
        if has_left_trim_marker(&source[inner..]) {
            trim_last_text(&mut segments);
            inner += 1;
        }

        let comment_start = inner + leading_space(&source[inner..]);
        if source[comment_start..].starts_with(COMMENT_OPEN) {
            let (end, trim_right) = close_comment(source, open, comment_start)?;
            trim_next_text = trim_right;
            pos = end;
            continue;
        }

        let Some(close) = find_close(source, inner) else {
            return Err(TemplateSyntaxError::UnclosedAction {
                span: open..source.len(),
            });
        };

        let mut body_end = close;
        trim_next_text = has_right_trim_marker(&source[inner..close]);
        if trim_next_text {
            body_end -= 1;
        }

        let end = close + RIGHT_DELIM.len();
        segments.push(Segment::Action {
            body: &source[inner..body_end],
            body_start: inner,
            span: open..end,
        });
        pos = end;
    }

    push_text(&mut segments, &source[pos..], trim_next_text);
    Ok(segments)
}

fn push_text<'s>(segments: &mut Vec<Segment<'s>>, text: &'s str, trim_start: bool) {
    let text = if trim_start { text.trim_start() } else { text };
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
}

fn trim_last_text(segments: &mut Vec<Segment<'_>>) {
    if let Some(Segment::Text(text)) = segments.last_mut() {
        let trimmed = (*text).trim_end();
        *text = trimmed;
        if text.is_empty() {
            segments.pop();
        }
    }
}

/// `{{- ` needs whitespace after the dash, otherwise `{{-3}}` would be a trim
fn has_left_trim_marker(rest: &str) -> bool {
    let mut chars = rest.chars();
    chars.next() == Some('-') && chars.next().is_some_and(char::is_whitespace)
}

fn has_right_trim_marker(body: &str) -> bool {
    let mut chars = body.chars().rev();
    chars.next() == Some('-') && chars.next().is_some_and(char::is_whitespace)
}

fn leading_space(s: &str) -> usize {
    s.len() - s.trim_start().len()
}

/// Find the `}}` closing an action, skipping over quoted literals
fn find_close(source: &str, from: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'`' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b'`' {
                    i += 1;
                }
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Returns the offset just past the comment action and whether it right-trims
fn close_comment(
    source: &str,
    open: usize,
    comment_start: usize,
) -> Result<(usize, bool), TemplateSyntaxError> {
    let body_start = comment_start + COMMENT_OPEN.len();
    let Some(found) = source[body_start..].find(COMMENT_CLOSE) else {
        return Err(TemplateSyntaxError::UnclosedComment {
            span: open..source.len(),
        });
    };

    let after = body_start + found + COMMENT_CLOSE.len();
    let rest = &source[after..];
    if rest.starts_with(RIGHT_DELIM) {
        return Ok((after + RIGHT_DELIM.len(), false));
    }

    let trimmed = rest.trim_start();
    let space = rest.len() - trimmed.len();
    if space > 0 && trimmed.starts_with("-}}") {
        return Ok((after + space + 1 + RIGHT_DELIM.len(), true));
    }

    Err(TemplateSyntaxError::CommentNotClosed { span: open..after })
}
