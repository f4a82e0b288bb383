//! Template parser using chumsky
//!
//! Each action body is parsed on its own into an [`Action`]; the flat list of
//! text and actions is then folded into a tree of [`Node`]s.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::{Span, TemplateSyntaxError};
use crate::template::ast::*;
use crate::template::lexer::{self, Token};
use crate::template::segment::{self, Segment};

/// Parse template source into a node tree
pub fn parse(source: &str) -> Result<Vec<Node>, TemplateSyntaxError> {
    let mut builder = TreeBuilder::default();

    for segment in segment::split(source)? {
        match segment {
            Segment::Text(text) => builder.push(Node::Text(text.to_string())),
            Segment::Action {
                body,
                body_start,
                span,
            } => {
                let action = parse_action(body, body_start)?;
                builder.apply(action, span)?;
            }
        }
    }

    builder.finish()
}

/// Parse a single action body
fn parse_action(body: &str, body_start: usize) -> Result<Action, TemplateSyntaxError> {
    let tokens = lexer::lex(body, body_start).map_err(|span| TemplateSyntaxError::Syntax {
        span,
        message: "unexpected character in action".to_string(),
        expected: Vec::new(),
    })?;

    let end = body_start + body.len();
    let token_iter = tokens.into_iter().map(|(tok, span)| (tok, span.into()));

    // Turn the token iterator into a stream that chumsky can use
    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((end..end).into(), |(t, s): (_, _)| (t, s));

    action_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| match errs.into_iter().next() {
            Some(err) => err.into(),
            None => TemplateSyntaxError::Syntax {
                span: body_start..end,
                message: "invalid action".to_string(),
                expected: Vec::new(),
            },
        })
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn action_parser<'a, I>() -> impl Parser<'a, I, Action, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let pipeline = select! {
        Token::Dot => Pipeline::Dot,
        Token::Field(path) => Pipeline::Field(path),
        Token::String(s) => Pipeline::Literal(s),
        Token::RawString(s) => Pipeline::Literal(s),
    }
    .map_with(|p, e| Spanned::new(p, span_range(&e.span())));

    let block_kind = choice((
        just(Token::If).to(BlockKind::If),
        just(Token::With).to(BlockKind::With),
        just(Token::Range).to(BlockKind::Range),
    ));

    choice((
        block_kind
            .then(pipeline.clone())
            .map(|(kind, p)| Action::Open(kind, p)),
        just(Token::Else).to(Action::Else),
        just(Token::End).to(Action::End),
        pipeline.map(Action::Output),
    ))
    .then_ignore(end())
}

/// A block whose `{{end}}` has not been seen yet
struct OpenBlock {
    kind: BlockKind,
    pipeline: Spanned<Pipeline>,
    span: Span,
    body: Vec<Node>,
    else_body: Option<Vec<Node>>,
}

#[derive(Default)]
struct TreeBuilder {
    root: Vec<Node>,
    open: Vec<OpenBlock>,
}

impl TreeBuilder {
    fn current(&mut self) -> &mut Vec<Node> {
        match self.open.last_mut() {
            Some(block) => match block.else_body {
                Some(ref mut else_body) => else_body,
                None => &mut block.body,
            },
            None => &mut self.root,
        }
    }

    fn push(&mut self, node: Node) {
        self.current().push(node);
    }

    fn apply(&mut self, action: Action, span: Span) -> Result<(), TemplateSyntaxError> {
        match action {
            Action::Output(pipeline) => self.push(Node::Output(pipeline)),
            Action::Open(kind, pipeline) => self.open.push(OpenBlock {
                kind,
                pipeline,
                span,
                body: Vec::new(),
                else_body: None,
            }),
            Action::Else => match self.open.last_mut() {
                Some(block) if block.else_body.is_none() => block.else_body = Some(Vec::new()),
                _ => {
                    return Err(TemplateSyntaxError::UnexpectedKeyword {
                        keyword: "else",
                        span,
                    })
                }
            },
            Action::End => {
                let Some(block) = self.open.pop() else {
                    return Err(TemplateSyntaxError::UnexpectedKeyword {
                        keyword: "end",
                        span,
                    });
                };
                self.push(Node::Block(Block {
                    kind: block.kind,
                    pipeline: block.pipeline,
                    body: block.body,
                    else_body: block.else_body.unwrap_or_default(),
                }));
            }
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<Node>, TemplateSyntaxError> {
        match self.open.pop() {
            Some(block) => Err(TemplateSyntaxError::UnclosedBlock {
                keyword: block.kind.keyword(),
                span: block.span,
            }),
            None => Ok(self.root),
        }
    }
}
