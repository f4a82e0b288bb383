//! Error types for template compilation and source-context reporting

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::template::lexer::Token;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// A template that cannot be compiled
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateSyntaxError {
    #[error("unclosed action at {span:?}")]
    UnclosedAction { span: Span },

    #[error("unclosed comment at {span:?}")]
    UnclosedComment { span: Span },

    #[error("comment ends before closing delimiter at {span:?}")]
    CommentNotClosed { span: Span },

    #[error("unexpected {{{{{keyword}}}}} at {span:?}")]
    UnexpectedKeyword { keyword: &'static str, span: Span },

    #[error("unexpected EOF: {{{{{keyword}}}}} opened at {span:?} is never closed")]
    UnclosedBlock { keyword: &'static str, span: Span },

    #[error("syntax error at {span:?}: {message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },
}

impl TemplateSyntaxError {
    /// Source range the error points at
    pub fn span(&self) -> &Span {
        match self {
            Self::UnclosedAction { span }
            | Self::UnclosedComment { span }
            | Self::CommentNotClosed { span }
            | Self::UnexpectedKeyword { span, .. }
            | Self::UnclosedBlock { span, .. }
            | Self::Syntax { span, .. } => span,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let detail = match self {
            Self::Syntax {
                message, expected, ..
            } if !expected.is_empty() => {
                format!("{}\nExpected: {}", message, expected.join(", "))
            }
            Self::Syntax { message, .. } => message.clone(),
            other => other.to_string(),
        };
        format_report(source, filename, self.span(), "template syntax error", &detail)
    }
}

/// Render a single-label ariadne report into a string
pub(crate) fn format_report(
    source: &str,
    filename: &str,
    span: &Span,
    message: &str,
    label: &str,
) -> String {
    let mut buf = Vec::new();
    let written = Report::build(ReportKind::Error, filename, span.start)
        .with_message(message)
        .with_label(
            Label::new((filename, span.clone()))
                .with_message(label)
                .with_color(Color::Red),
        )
        .finish()
        .write((filename, Source::from(source)), &mut buf);

    match written {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        Err(_) => format!("{message}: {label}"),
    }
}

impl<'a> From<chumsky::error::Rich<'a, Token>> for TemplateSyntaxError {
    fn from(err: chumsky::error::Rich<'a, Token>) -> Self {
        use chumsky::error::{RichPattern, RichReason};

        let message = match err.reason() {
            RichReason::Custom(msg) => msg.to_string(),
            _ => match err.found() {
                Some(tok) => format!("unexpected {}", format_token(tok)),
                None => "missing value for command".to_string(),
            },
        };

        let expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                RichPattern::Token(tok) => Some(format_token(tok)),
                RichPattern::Label(label) => Some(label.to_string()),
                RichPattern::EndOfInput => Some("end of action".to_string()),
                _ => None,
            })
            .collect();

        TemplateSyntaxError::Syntax {
            span: err.span().into_range(),
            message,
            expected,
        }
    }
}

/// Format a token for human-readable error messages
fn format_token(tok: &Token) -> String {
    match tok {
        Token::If => "keyword 'if'".to_string(),
        Token::Else => "keyword 'else'".to_string(),
        Token::End => "keyword 'end'".to_string(),
        Token::Range => "keyword 'range'".to_string(),
        Token::With => "keyword 'with'".to_string(),
        Token::Field(path) => format!("field '.{}'", path.join(".")),
        Token::Dot => "'.'".to_string(),
        Token::String(s) => format!("string \"{}\"", s),
        Token::RawString(s) => format!("raw string `{}`", s),
        Token::Ident(s) => format!("identifier '{}'", s),
    }
}
