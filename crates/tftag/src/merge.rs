//! token-level merge of tags into an attribute span
//!
//! The span comes from [crate::extract]: the attribute's opening `{` and everything up to its
//! closing `}`. Merging happens in three passes over it:
//!
//! 1. find the direct keys of the object (depth 1, starting an element, followed by `=`/`:`)
//! 2. cut out every pair whose key is about to be written, copy everything else verbatim
//! 3. append one `key = "value"` line per tag and close the object again
//!
//! ```
//! # use tftag::merge::{merge, Layout};
//! # use tftag::token::{lex, render};
//! # use tftag::tags::Tags;
//! let span = lex(" {\n    Owner = \"a\"\n    Keep  = \"me\"\n")?;
//! let tags: Tags = [("Owner", "b"), ("Env", "prod")].into_iter().collect();
//!
//! let merged = merge(&span, &tags, &Layout::detect(&span, "  ", "\n"));
//! assert_eq!(
//!     render(&merged),
//!     " {\n    Keep  = \"me\"\n    Owner = \"b\"\n    Env = \"prod\"\n  }"
//! );
//! # Ok::<(), tftag::token::LexError>(())
//! ```
use crate::delimiter::Depth;
use crate::tags::Tags;
use crate::token::{Token, TokenKind};

/// Whitespace used for the tokens the merge engine creates
#[derive(derive_new::new, Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// in front of each appended key
    pub entry_indent: String,
    /// in front of the closing `}`
    pub closing_indent: String,
    pub newline: String,
}

impl Layout {
    /// Indent appended keys like the first existing key that starts a line
    ///
    /// Without such a key, entries get `closing_indent` plus two spaces.
    pub fn detect(span: &[Token], closing_indent: &str, newline: &str) -> Self {
        let entry_indent = key_positions(span)
            .into_iter()
            .find(|position| {
                position
                    .index
                    .checked_sub(1)
                    .is_some_and(|prev| span[prev].is(TokenKind::Newline))
            })
            .map_or_else(
                || format!("{closing_indent}  "),
                |position| span[position.index].leading.clone(),
            );

        Self::new(entry_indent, closing_indent.to_string(), newline.to_string())
    }
}

/// A direct key of the object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPosition {
    /// index of the key's first token
    pub index: usize,
    /// exclusive end of the pair: after its separator (newline or comma), or where the next
    /// key starts
    pub end: usize,
    pub key: String,
}

/// Locate the direct keys of the object literal opened by the first token of `span`
pub fn key_positions(span: &[Token]) -> Vec<KeyPosition> {
    let mut depth = Depth::default();
    let mut starts = vec![];

    for (index, token) in span.iter().enumerate() {
        let before = depth.get();
        depth.advance(token);

        if before != 1 || !starts_element(span, index) {
            continue;
        }

        if let Some(key) = direct_key(&span[index..]) {
            starts.push((index, key));
        }
    }

    let limits: Vec<usize> = starts
        .iter()
        .skip(1)
        .map(|(index, _)| *index)
        .chain(std::iter::once(span.len()))
        .collect();

    starts
        .into_iter()
        .zip(limits)
        .map(|((index, key), limit)| KeyPosition {
            index,
            end: pair_end(span, index, limit),
            key,
        })
        .collect()
}

fn starts_element(span: &[Token], index: usize) -> bool {
    index
        .checked_sub(1)
        .and_then(|prev| span.get(prev))
        .is_some_and(|prev| {
            matches!(
                prev.kind,
                TokenKind::OBrace | TokenKind::Newline | TokenKind::Comma | TokenKind::Comment
            )
        })
}

/// Key text if `tokens` start with `ident =` or `"key" =` (`:` works as well)
fn direct_key(tokens: &[Token]) -> Option<String> {
    let is_assign = |token: &Token| matches!(token.kind, TokenKind::Equal | TokenKind::Colon);

    match tokens {
        [key, assign, ..] if key.is(TokenKind::Ident) && is_assign(assign) => {
            Some(key.bytes.clone())
        }
        [open, lit, close, assign, ..]
            if open.is(TokenKind::OQuote)
                && lit.is(TokenKind::QuotedLit)
                && close.is(TokenKind::CQuote)
                && is_assign(assign)
                && is_plain_literal(&lit.bytes) =>
        {
            Some(lit.bytes.clone())
        }
        _ => None,
    }
}

/// no escapes, no template sequences: the raw text is the key
fn is_plain_literal(lit: &str) -> bool {
    !lit.contains('\\') && !lit.contains("${") && !lit.contains("%{")
}

/// depth is relative to the object's interior
fn pair_end(span: &[Token], start: usize, limit: usize) -> usize {
    let mut depth = Depth::default();

    for (index, token) in span.iter().enumerate().take(limit).skip(start) {
        let separator = matches!(token.kind, TokenKind::Newline | TokenKind::Comma);
        if depth.advance(token) == 0 && separator {
            return index + 1;
        }
    }

    limit
}

/// Drop every pair whose key is in `tags`, keep all other tokens verbatim
pub fn remove_superseded(span: &[Token], tags: &Tags) -> Vec<Token> {
    let (mut retained, cut) = key_positions(span)
        .into_iter()
        .filter(|position| tags.contains_key(&position.key))
        .fold((vec![], 0), |(mut retained, cut), position| {
            tracing::trace!(key = %position.key, "removing superseded pair");
            retained.extend_from_slice(&span[cut..position.index]);
            (retained, position.end)
        });

    retained.extend_from_slice(&span[cut..]);
    retained
}

/// Append one `key = "value"` line per tag
pub fn append_tags(mut tokens: Vec<Token>, tags: &Tags, layout: &Layout) -> Vec<Token> {
    if tags.is_empty() {
        return tokens;
    }

    if !tokens.last().is_some_and(|last| last.is(TokenKind::Newline)) {
        tokens.push(Token::new(TokenKind::Newline, layout.newline.as_str()));
    }

    for (key, value) in tags.iter() {
        tokens.extend([
            key_token(key).indented(layout.entry_indent.as_str()),
            Token::new(TokenKind::Equal, "=").spaced(1),
            Token::new(TokenKind::QuotedLit, quote(value)).spaced(1),
            Token::new(TokenKind::Newline, layout.newline.as_str()),
        ]);
    }

    tokens
}

/// Merge `tags` into `span`, the result includes the closing `}`
pub fn merge(span: &[Token], tags: &Tags, layout: &Layout) -> Vec<Token> {
    let mut merged = append_tags(remove_superseded(span, tags), tags, layout);

    let closing = Token::new(TokenKind::CBrace, "}");
    let closing = if merged.last().is_some_and(|last| last.is(TokenKind::Newline)) {
        closing.indented(layout.closing_indent.as_str())
    } else {
        closing.spaced(1)
    };
    merged.push(closing);

    merged
}

/// Key as written: bare when it is a valid identifier, quoted otherwise
pub fn key_token(key: &str) -> Token {
    let is_bare =
        !matches!(key, "true" | "false" | "null") && hcl_edit::Ident::try_new(key).is_ok();

    if is_bare {
        Token::new(TokenKind::Ident, key)
    } else {
        Token::new(TokenKind::QuotedLit, quote(key))
    }
}

/// HCL string literal that evaluates to exactly `value`
pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');

    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            '$' | '%' if chars.peek() == Some(&'{') => {
                quoted.push(c);
                quoted.push(c);
            }
            c if c.is_control() => quoted.push_str(&format!("\\u{:04X}", c as u32)),
            c => quoted.push(c),
        }
    }

    quoted.push('"');
    quoted
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::token::{lex, render};
    use pretty_assertions::assert_eq;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs.iter().copied().collect()
    }

    /// merge the value of `tags = ...` at attribute indent `"  "`
    fn merge_attribute(src: &str, pairs: &[(&str, &str)]) -> String {
        let span = crate::extract::extract(&lex(src).unwrap()).unwrap();
        let layout = Layout::detect(&span, "  ", "\n");
        format!("tags ={}", render(&merge(&span, &tags(pairs), &layout)))
    }

    fn key_set(src: &str) -> Vec<String> {
        let span = crate::extract::extract(&lex(src).unwrap()).unwrap();
        key_positions(&span).into_iter().map(|p| p.key).collect()
    }

    #[test]
    fn empty_attribute_gains_tags() {
        let span = crate::extract::empty_span("\n");
        let layout = Layout::detect(&span, "  ", "\n");

        assert_eq!(
            render(&merge(&span, &tags(&[("Env", "prod")]), &layout)),
            " {\n    Env = \"prod\"\n  }"
        );
    }

    #[test]
    fn existing_key_is_replaced_once() {
        let merged = merge_attribute(
            "tags = {\n    Owner = \"teamA\"\n  }",
            &[("Owner", "teamB"), ("Env", "prod")],
        );

        assert_eq!(
            merged,
            "tags = {\n    Owner = \"teamB\"\n    Env = \"prod\"\n  }"
        );
    }

    #[test]
    fn nested_keys_are_not_direct_keys() {
        let src = "tags = {\n    Meta = {\n      Env = \"inner\"\n    }\n    Name = \"x\"\n  }";

        assert_eq!(key_set(src), vec!["Meta", "Name"]);
        assert_eq!(
            merge_attribute(src, &[("Env", "prod")]),
            "tags = {\n    Meta = {\n      Env = \"inner\"\n    }\n    Name = \"x\"\n    Env = \"prod\"\n  }"
        );
    }

    #[test]
    fn untouched_keys_keep_formatting_and_order() {
        let src = "tags = {\n    # keep me\n    Zeta    = \"z\" # trailing\n    Owner   = \"a\"\n    Alpha   = upper(\"a\")\n  }";

        assert_eq!(
            merge_attribute(src, &[("Owner", "b")]),
            "tags = {\n    # keep me\n    Zeta    = \"z\" # trailing\n    Alpha   = upper(\"a\")\n    Owner = \"b\"\n  }"
        );
    }

    #[test]
    fn quoted_and_colon_keys() {
        let src = "tags = {\n    \"kubernetes.io/role\" = \"old\"\n    Team: \"a\"\n  }";

        assert_eq!(key_set(src), vec!["kubernetes.io/role", "Team"]);
        assert_eq!(
            merge_attribute(src, &[("kubernetes.io/role", "new"), ("Team", "b")]),
            "tags = {\n    \"kubernetes.io/role\" = \"new\"\n    Team = \"b\"\n  }"
        );
    }

    #[test]
    fn every_duplicate_is_removed() {
        let merged = merge_attribute(
            "tags = {\n    Env = \"a\"\n    Env = \"b\"\n  }",
            &[("Env", "c")],
        );

        assert_eq!(merged, "tags = {\n    Env = \"c\"\n  }");
    }

    #[test]
    fn one_line_object() {
        assert_eq!(
            merge_attribute("tags = { Owner = \"a\", Keep = \"k\" }", &[("Owner", "b")]),
            "tags = { Keep = \"k\"\n    Owner = \"b\"\n  }"
        );
        assert_eq!(
            merge_attribute("tags = {}", &[("Env", "prod")]),
            "tags = {\n    Env = \"prod\"\n  }"
        );
    }

    #[test]
    fn values_are_not_keys() {
        // `Env` as a value or inside a function call never starts an element
        let src = "tags = {\n    Name = Env\n    Other = lookup(m, Env = 1)\n  }";

        assert_eq!(key_set(src), vec!["Name", "Other"]);
    }

    #[test]
    fn merging_twice_keeps_the_key_set() {
        let pairs = [("Owner", "b"), ("Env", "prod")];
        let once = merge_attribute("tags = {\n    Owner = \"a\"\n    Keep = \"k\"\n  }", &pairs);
        let twice = merge_attribute(&once, &pairs);

        assert_eq!(once, twice);
        assert_eq!(key_set(&twice), vec!["Keep", "Owner", "Env"]);
    }

    #[test]
    fn empty_tags_only_close_the_object() {
        let span = lex(" { a = 1").unwrap();
        let layout = Layout::new("    ".into(), "  ".into(), "\n".into());

        assert_eq!(render(&merge(&span, &Tags::new(), &layout)), " { a = 1 }");
    }

    #[test]
    fn layout_detection() {
        let span = lex(" {\n\t\tA = 1\n").unwrap();
        assert_eq!(Layout::detect(&span, "\t", "\n").entry_indent, "\t\t");

        let span = lex(" { A = 1").unwrap();
        assert_eq!(Layout::detect(&span, "\t", "\r\n").entry_indent, "\t  ");
    }

    #[test]
    fn keys_and_values_are_escaped() {
        assert_eq!(quote(r#"say "hi"\"#), r#""say \"hi\"\\""#);
        assert_eq!(quote("a\nb\tc"), r#""a\nb\tc""#);
        assert_eq!(quote("${var.x} %{if} $5"), r#""$${var.x} %%{if} $5""#);
        assert_eq!(quote("\u{1}"), r#""\u0001""#);

        assert_eq!(key_token("Owner").kind, TokenKind::Ident);
        assert_eq!(key_token("cost-center").kind, TokenKind::Ident);
        assert_eq!(key_token("kubernetes.io/x").bytes, r#""kubernetes.io/x""#);
        assert_eq!(key_token("null").bytes, r#""null""#);
        assert_eq!(key_token("1st").kind, TokenKind::QuotedLit);
    }
}
