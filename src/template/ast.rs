//! Syntax tree for compiled templates

use crate::error::Span;

/// Node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Something that evaluates to a value
#[derive(Debug, Clone, PartialEq)]
pub enum Pipeline {
    /// `.`
    Dot,
    /// `.a.b`
    Field(Vec<String>),
    /// `"text"` or `` `text` ``
    Literal(String),
}

/// Control structures that open a block ended by `{{end}}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    If,
    With,
    Range,
}

impl BlockKind {
    pub fn keyword(self) -> &'static str {
        match self {
            BlockKind::If => "if",
            BlockKind::With => "with",
            BlockKind::Range => "range",
        }
    }
}

/// A single parsed `{{ ... }}` action, before blocks are nested
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Output(Spanned<Pipeline>),
    Open(BlockKind, Spanned<Pipeline>),
    Else,
    End,
}

/// `{{if}}`, `{{with}}` or `{{range}}` with its bodies
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub pipeline: Spanned<Pipeline>,
    pub body: Vec<Node>,
    /// Runs when the pipeline is empty; empty if there was no `{{else}}`
    pub else_body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Output(Spanned<Pipeline>),
    Block(Block),
}
