//! nesting depth over a token sequence
//!
//! All five delimiter classes share one counter: a value expression may nest strings inside
//! braces inside brackets and so on, and we only ever care about "how deep are we".
use crate::token::{Token, TokenKind};

/// Opening kind and its closing counterpart
pub const PAIRS: [(TokenKind, TokenKind); 5] = [
    (TokenKind::OBrace, TokenKind::CBrace),
    (TokenKind::OQuote, TokenKind::CQuote),
    (TokenKind::OParen, TokenKind::CParen),
    (TokenKind::OBrack, TokenKind::CBrack),
    (TokenKind::OHeredoc, TokenKind::CHeredoc),
];

pub fn is_opening(kind: TokenKind) -> bool {
    PAIRS.iter().any(|(open, _)| *open == kind)
}

pub fn is_closing(kind: TokenKind) -> bool {
    PAIRS.iter().any(|(_, close)| *close == kind)
}

pub fn closing_for(kind: TokenKind) -> Option<TokenKind> {
    PAIRS
        .iter()
        .find(|(open, _)| *open == kind)
        .map(|(_, close)| *close)
}

/// Depth after seeing a token of `kind` at `depth`
pub fn step(depth: isize, kind: TokenKind) -> isize {
    if is_opening(kind) {
        depth + 1
    } else if is_closing(kind) {
        depth - 1
    } else {
        depth
    }
}

/// Running depth counter
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Depth(isize);

impl Depth {
    pub fn get(self) -> isize {
        self.0
    }

    /// Account for `token` and return the new depth
    pub fn advance(&mut self, token: &Token) -> isize {
        self.0 = step(self.0, token.kind);
        self.0
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::token::lex;

    #[test]
    fn pairs_are_symmetric() {
        for (open, close) in PAIRS {
            assert!(is_opening(open));
            assert!(is_closing(close));
            assert!(!is_opening(close));
            assert_eq!(closing_for(open), Some(close));
        }
        assert_eq!(closing_for(TokenKind::Ident), None);
    }

    #[test]
    fn non_delimiters_keep_depth() {
        for kind in [TokenKind::Ident, TokenKind::Equal, TokenKind::Newline, TokenKind::Comment] {
            assert_eq!(step(3, kind), 3);
        }
    }

    #[test]
    fn balanced_expression_returns_to_zero() {
        let mut depth = Depth::default();
        let max = lex(r#"{ a = [f("x"), { b = (1) }] }"#)
            .unwrap()
            .iter()
            .map(|token| depth.advance(token))
            .max();

        assert_eq!(max, Some(4));
        assert_eq!(depth.get(), 0);
    }
}
