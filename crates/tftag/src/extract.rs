//! interior of a map-valued attribute
//!
//! For `tags = { a = "b" }` the span is everything from the opening `{` up to, but excluding,
//! the closing `}`. The merge engine appends to the span and closes it again.
use crate::delimiter::{self, Depth};
use crate::token::{Token, TokenKind};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ExtractError {
    #[error("expected `<identifier> =` at the start of the attribute")]
    NotAnAttribute,
    #[error("attribute value is not an object literal")]
    NotAMap,
    #[error("unbalanced delimiters in attribute value")]
    Unbalanced,
}

/// Span standing in for an attribute that does not exist yet: an empty map literal
pub fn empty_span(newline: &str) -> Vec<Token> {
    vec![
        Token::new(TokenKind::OBrace, "{").spaced(1),
        Token::new(TokenKind::Newline, newline),
    ]
}

/// Extract the span of an attribute's map value
///
/// `attribute` is the full token list: identifier, `=`, value (and possibly trailing comments).
pub fn extract(attribute: &[Token]) -> Result<Vec<Token>, ExtractError> {
    let [key, assign, value @ ..] = attribute else {
        return Err(ExtractError::NotAnAttribute);
    };
    if !key.is(TokenKind::Ident) || !assign.is(TokenKind::Equal) {
        return Err(ExtractError::NotAnAttribute);
    }

    let mut depth = Depth::default();
    let mut expected_closers = vec![];
    let mut span = vec![];

    for (idx, token) in value.iter().enumerate() {
        if depth.get() == 0 {
            match token.kind {
                TokenKind::OBrace => {}
                TokenKind::Comment => {
                    span.push(token.clone());
                    continue;
                }
                _ => return Err(ExtractError::NotAMap),
            }
        }

        if let Some(closer) = delimiter::closing_for(token.kind) {
            expected_closers.push(closer);
        } else if delimiter::is_closing(token.kind)
            && expected_closers.pop() != Some(token.kind)
        {
            return Err(ExtractError::Unbalanced);
        }

        if depth.advance(token) == 0 {
            let trailing_is_trivia = value[idx + 1..].iter().all(|trailing| {
                matches!(
                    trailing.kind,
                    TokenKind::Comment | TokenKind::Newline | TokenKind::Whitespace
                )
            });

            return if trailing_is_trivia && !is_for_expression(&span) {
                Ok(span)
            } else {
                Err(ExtractError::NotAMap)
            };
        }

        span.push(token.clone());
    }

    Err(if span.iter().any(|token| token.is(TokenKind::OBrace)) {
        ExtractError::Unbalanced
    } else {
        ExtractError::NotAMap
    })
}

/// `{ for k, v in var.m : k => v }` is an expression producing an object, not a literal
fn is_for_expression(span: &[Token]) -> bool {
    let mut significant = span
        .iter()
        .skip_while(|token| !token.is(TokenKind::OBrace))
        .skip(1)
        .filter(|token| {
            !matches!(
                token.kind,
                TokenKind::Comment | TokenKind::Newline | TokenKind::Whitespace
            )
        });

    match (significant.next(), significant.next()) {
        (Some(keyword), Some(next)) => {
            keyword.is(TokenKind::Ident) && keyword.bytes == "for" && next.is(TokenKind::Ident)
        }
        _ => false,
    }
}
