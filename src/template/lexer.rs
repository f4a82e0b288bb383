//! Lexer for template action bodies using logos
//!
//! Only the text between `{{` and `}}` is tokenized here. Splitting the
//! source into text and actions is done by [`super::segment`].

use logos::Logos;

use crate::error::Span;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // Block keywords
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("end")]
    End,
    #[token("range")]
    Range,
    #[token("with")]
    With,

    // Field chain like `.Request.Path`, split on dots
    #[regex(r"(\.[a-zA-Z_][a-zA-Z0-9_]*)+", |lex| {
        lex.slice()[1..].split('.').map(str::to_string).collect::<Vec<_>>()
    })]
    Field(Vec<String>),

    // The current value on its own
    #[token(".")]
    Dot,

    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        unescape(&s[1..s.len()-1])
    })]
    String(String),

    #[regex(r"`[^`]*`", |lex| {
        let s = lex.slice();
        s[1..s.len()-1].to_string()
    })]
    RawString(String),

    // Function names and other bare words; never valid on their own, but
    // lexing them gives a readable "unexpected identifier" error.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),
}

/// Resolve backslash escapes inside a double-quoted literal
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Lex an action body into tokens with spans shifted by `offset`
///
/// Returns the span of the first character that is not part of any token.
pub fn lex(input: &str, offset: usize) -> Result<Vec<(Token, Span)>, Span> {
    Token::lexer(input)
        .spanned()
        .map(|(tok, span)| {
            let span = span.start + offset..span.end + offset;
            match tok {
                Ok(tok) => Ok((tok, span)),
                Err(()) => Err(span),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        lex(input, 0)
            .expect("should lex")
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            tokens("if else end range with"),
            vec![Token::If, Token::Else, Token::End, Token::Range, Token::With]
        );
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        assert_eq!(tokens("iffy"), vec![Token::Ident("iffy".to_string())]);
    }

    #[test]
    fn test_field_chain() {
        assert_eq!(
            tokens(".Request.Path"),
            vec![Token::Field(vec!["Request".to_string(), "Path".to_string()])]
        );
    }

    #[test]
    fn test_dot_alone() {
        assert_eq!(tokens(" . "), vec![Token::Dot]);
    }

    #[test]
    fn test_if_with_field() {
        assert_eq!(
            tokens("if .Cookie"),
            vec![Token::If, Token::Field(vec!["Cookie".to_string()])]
        );
    }

    #[test]
    fn test_string_literals() {
        assert_eq!(
            tokens(r#""a\"b\tc" `raw\n`"#),
            vec![
                Token::String("a\"b\tc".to_string()),
                Token::RawString("raw\\n".to_string())
            ]
        );
    }

    #[test]
    fn test_spans_are_offset() {
        let lexed = lex(" .Host", 10).expect("should lex");
        assert_eq!(lexed[0].1, 11..16);
    }

    #[test]
    fn test_invalid_character() {
        assert_eq!(lex(".Host | 3", 2), Err(8..9));
    }
}
