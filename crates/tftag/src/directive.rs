//! inline filter directive
//!
//! A resource selects a single tag group with a comment inside its block:
//!
//! ```hcl
//! resource "aws_s3_bucket" "logs" {
//!   #tftag:audit
//!   bucket = "logs"
//! }
//! ```
//!
//! Both comment markers are accepted (`#tftag:x`, `// tftag: x`). Only the first directive in a
//! block counts.
use crate::token::{Token, TokenKind};

pub const PREFIX: &str = "tftag:";

/// Filter key of the first directive among `tokens`, if any
pub fn scan(tokens: &[Token]) -> Option<&str> {
    tokens
        .iter()
        .filter(|token| token.is(TokenKind::Comment))
        .find_map(|token| parse(&token.bytes))
}

/// Filter key of a single line comment, trimmed
pub fn parse(comment: &str) -> Option<&str> {
    let text = comment
        .strip_prefix('#')
        .or_else(|| comment.strip_prefix("//"))?;

    text.trim_start().strip_prefix(PREFIX).map(str::trim)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::token::lex;

    #[test]
    fn parse_comment() {
        assert_eq!(parse("#tftag:prod-only"), Some("prod-only"));
        assert_eq!(parse("# tftag:  prod-only  "), Some("prod-only"));
        assert_eq!(parse("// tftag:audit"), Some("audit"));
        assert_eq!(parse("#tftag:"), Some(""));
        assert_eq!(parse("# just a comment"), None);
        assert_eq!(parse("/* tftag:block */"), None);
    }

    #[test]
    fn first_directive_wins() {
        let tokens = lex(
            r#"resource "aws_instance" "web" {
  # unrelated
  #tftag:first
  ami = "ami-123" #tftag:second
}"#,
        )
        .unwrap();

        assert_eq!(scan(&tokens), Some("first"));
    }

    #[test]
    fn directive_text_inside_strings_is_ignored() {
        let tokens = lex(r##"resource "a" "b" { description = "#tftag:nope" }"##).unwrap();

        assert_eq!(scan(&tokens), None);
    }
}
