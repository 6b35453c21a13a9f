//! lossless tokens for HCL source ranges
//!
//! [hcl_edit] tells us *where* blocks and attributes live (spans) but does not expose a token
//! stream. [lex] turns such a source range into a flat list of [Token]s and [render] turns them
//! back into text. For any input that lexes, `render(&lex(src)?) == src`.
//!
//! The lexer is deliberately shallow:
//! - a quoted string is `OQuote`, an optional `QuotedLit` and `CQuote`. Template
//!   interpolations (`${ .. }`, `%{ .. }`) stay inside the literal, including nested strings.
//! - a heredoc is `OHeredoc` (marker and line ending), an optional `StringLit` body and
//!   `CHeredoc` (the closing marker, its indentation kept as leading whitespace).
//! - everything that is not interesting to the merge engine ends up as `Punct` or `NumberLit`.

/// Kind of a lexical unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Ident,
    Equal,
    Colon,
    Comma,
    OBrace,
    CBrace,
    OQuote,
    CQuote,
    OParen,
    CParen,
    OBrack,
    CBrack,
    OHeredoc,
    CHeredoc,
    /// content of a quoted string (without the quotes), or a complete `"..."` literal when
    /// built by the merge engine
    QuotedLit,
    /// heredoc body
    StringLit,
    NumberLit,
    Newline,
    Comment,
    /// operators, dots and anything else
    Punct,
    /// horizontal whitespace at the very end of the input
    Whitespace,
}

/// A single token: kind, raw text and the whitespace in front of it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub bytes: String,
    /// horizontal whitespace (spaces, tabs) preceding the token
    pub leading: String,
}

impl Token {
    pub fn new(kind: TokenKind, bytes: impl Into<String>) -> Self {
        Self {
            kind,
            bytes: bytes.into(),
            leading: String::new(),
        }
    }

    /// Same token preceded by `spaces` spaces
    pub fn spaced(self, spaces: usize) -> Self {
        self.indented(" ".repeat(spaces))
    }

    /// Same token preceded by `leading`
    pub fn indented(mut self, leading: impl Into<String>) -> Self {
        self.leading = leading.into();
        self
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.leading)?;
        f.write_str(&self.bytes)
    }
}

/// Concatenate tokens back into source text
pub fn render(tokens: &[Token]) -> String {
    tokens.iter().map(ToString::to_string).collect()
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum LexError {
    #[error("unterminated {construct} starting at byte {offset}")]
    Unterminated {
        construct: &'static str,
        offset: usize,
    },
}

/// Split `src` into tokens
pub fn lex(src: &str) -> Result<Vec<Token>, LexError> {
    Lexer {
        src,
        pos: 0,
        tokens: Vec::new(),
    }
    .run()
}

struct Lexer<'s> {
    src: &'s str,
    pos: usize,
    tokens: Vec<Token>,
}

impl<'s> Lexer<'s> {
    fn run(mut self) -> Result<Vec<Token>, LexError> {
        while self.pos < self.src.len() {
            let leading = self.horizontal_whitespace();
            if self.pos == self.src.len() {
                self.tokens
                    .push(Token::new(TokenKind::Whitespace, leading.to_string()));
                break;
            }
            self.next_token(leading)?;
        }

        Ok(self.tokens)
    }

    fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    fn horizontal_whitespace(&mut self) -> &'s str {
        let rest = self.rest();
        let len = rest.len() - rest.trim_start_matches([' ', '\t']).len();
        self.pos += len;
        &rest[..len]
    }

    fn push(&mut self, kind: TokenKind, len: usize, leading: &str) {
        let bytes = &self.src[self.pos..self.pos + len];
        self.tokens.push(Token::new(kind, bytes).indented(leading));
        self.pos += len;
    }

    fn next_token(&mut self, leading: &str) -> Result<(), LexError> {
        use TokenKind::*;

        let rest = self.rest();
        let Some(c) = rest.chars().next() else {
            return Ok(());
        };

        match c {
            '\n' => self.push(Newline, 1, leading),
            '\r' if rest.starts_with("\r\n") => self.push(Newline, 2, leading),
            '#' => self.line_comment(leading),
            '/' if rest.starts_with("//") => self.line_comment(leading),
            '/' if rest.starts_with("/*") => {
                let Some(end) = rest[2..].find("*/") else {
                    return Err(LexError::Unterminated {
                        construct: "block comment",
                        offset: self.pos,
                    });
                };
                self.push(Comment, end + 4, leading);
            }
            '{' => self.push(OBrace, 1, leading),
            '}' => self.push(CBrace, 1, leading),
            '(' => self.push(OParen, 1, leading),
            ')' => self.push(CParen, 1, leading),
            '[' => self.push(OBrack, 1, leading),
            ']' => self.push(CBrack, 1, leading),
            ',' => self.push(Comma, 1, leading),
            ':' => self.push(Colon, 1, leading),
            '=' if rest.starts_with("==") || rest.starts_with("=>") => {
                self.push(Punct, 2, leading)
            }
            '=' => self.push(Equal, 1, leading),
            '"' => self.quoted(leading)?,
            '<' if heredoc_header(rest).is_some() => self.heredoc(leading)?,
            c if c.is_ascii_digit() => self.push(NumberLit, number_len(rest), leading),
            c if c.is_alphabetic() || c == '_' => {
                let len = rest
                    .char_indices()
                    .find(|(_, c)| !(c.is_alphanumeric() || *c == '_' || *c == '-'))
                    .map_or(rest.len(), |(idx, _)| idx);
                self.push(Ident, len, leading)
            }
            c => {
                let len = ["...", "&&", "||", "!=", "<=", ">="]
                    .iter()
                    .find(|op| rest.starts_with(**op))
                    .map_or(c.len_utf8(), |op| op.len());
                self.push(Punct, len, leading)
            }
        }

        Ok(())
    }

    fn line_comment(&mut self, leading: &str) {
        let rest = self.rest();
        let len = rest.find(['\r', '\n']).unwrap_or(rest.len());
        self.push(TokenKind::Comment, len, leading);
    }

    fn quoted(&mut self, leading: &str) -> Result<(), LexError> {
        self.push(TokenKind::OQuote, 1, leading);

        let end = scan_string(self.src, self.pos)?;
        if end > self.pos {
            self.push(TokenKind::QuotedLit, end - self.pos, "");
        }

        self.push(TokenKind::CQuote, 1, "");
        Ok(())
    }

    fn heredoc(&mut self, leading: &str) -> Result<(), LexError> {
        let src = self.src;
        let start = self.pos;
        let Some((header_len, marker)) = heredoc_header(self.rest()) else {
            return Ok(());
        };
        self.push(TokenKind::OHeredoc, header_len, leading);

        let body_start = self.pos;
        let mut line_start = body_start;
        while line_start < src.len() {
            let line_end = src[line_start..]
                .find('\n')
                .map_or(src.len(), |idx| line_start + idx);
            let line = src[line_start..line_end].trim_end_matches('\r');

            if line.trim() == marker {
                if line_start > body_start {
                    self.push(TokenKind::StringLit, line_start - body_start, "");
                }

                let indent = line.len() - line.trim_start().len();
                let indent = &src[line_start..line_start + indent];
                self.pos = line_start + indent.len();
                self.push(TokenKind::CHeredoc, marker.len(), indent);
                return Ok(());
            }

            line_start = line_end + 1;
        }

        Err(LexError::Unterminated {
            construct: "heredoc",
            offset: start,
        })
    }
}

/// Byte index of the closing quote of a string whose content starts at `start`
fn scan_string(src: &str, start: usize) -> Result<usize, LexError> {
    let bytes = src.as_bytes();
    let mut idx = start;

    while idx < bytes.len() {
        match bytes[idx] {
            b'\\' => idx += 2,
            b'"' => return Ok(idx),
            // `$${` and `%%{` are escaped template sequences
            b @ (b'$' | b'%')
                if bytes.get(idx + 1) == Some(&b) && bytes.get(idx + 2) == Some(&b'{') =>
            {
                idx += 3
            }
            b'$' | b'%' if bytes.get(idx + 1) == Some(&b'{') => {
                idx = scan_interpolation(src, idx + 2)?
            }
            _ => idx += 1,
        }
    }

    Err(LexError::Unterminated {
        construct: "string",
        offset: start.saturating_sub(1),
    })
}

/// Byte index right after the `}` that closes an interpolation whose content starts at `start`
fn scan_interpolation(src: &str, start: usize) -> Result<usize, LexError> {
    let bytes = src.as_bytes();
    let mut depth = 0usize;
    let mut idx = start;

    while idx < bytes.len() {
        match bytes[idx] {
            b'{' => depth += 1,
            b'}' if depth == 0 => return Ok(idx + 1),
            b'}' => depth -= 1,
            b'"' => idx = scan_string(src, idx + 1)?,
            _ => {}
        }
        idx += 1;
    }

    Err(LexError::Unterminated {
        construct: "template interpolation",
        offset: start.saturating_sub(2),
    })
}

/// `<<MARKER` or `<<-MARKER` followed by a line ending
///
/// Returns the header length (including the line ending) and the marker
fn heredoc_header(rest: &str) -> Option<(usize, &str)> {
    let after = rest.strip_prefix("<<")?;
    let after_dash = after.strip_prefix('-').unwrap_or(after);
    let marker_len = after_dash
        .char_indices()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_' || *c == '-'))
        .map_or(after_dash.len(), |(idx, _)| idx);

    if marker_len == 0 {
        return None;
    }

    let marker = &after_dash[..marker_len];
    let tail = &after_dash[marker_len..];
    let newline_len = if tail.starts_with("\r\n") {
        2
    } else if tail.starts_with('\n') {
        1
    } else {
        return None;
    };

    Some((rest.len() - tail.len() + newline_len, marker))
}

fn number_len(rest: &str) -> usize {
    let digits = |s: &str| s.len() - s.trim_start_matches(|c: char| c.is_ascii_digit()).len();

    let mut len = digits(rest);
    if let Some(fraction) = rest[len..].strip_prefix('.') {
        let fraction_digits = digits(fraction);
        if fraction_digits > 0 {
            len += 1 + fraction_digits;
        }
    }

    if let Some(exponent) = rest[len..].strip_prefix(['e', 'E']) {
        let signed = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
        let exponent_digits = digits(signed);
        if exponent_digits > 0 {
            len += 1 + (exponent.len() - signed.len()) + exponent_digits;
        }
    }

    len
}
