//! Fragment tokenizer with a constrained, practical name character set.
//!
//! Supported tag/attribute name characters (ASCII only): `[A-Za-z0-9:_-]`, which covers
//! custom elements (`my-widget`) and prefixed names (`svg:rect`).
//!
//! Known limitations:
//! - Not an HTML5 state machine; malformed markup is recovered from greedily.
//! - Rawtext (`script`, `style`) close-tag scanning accepts only ASCII whitespace before `>`.
use crate::entities::decode_entities;
use crate::types::{Attributes, Token};
use memchr::memchr;

const COMMENT_START: &str = "<!--";
const COMMENT_END: &str = "-->";
const DOCTYPE_START: &[u8] = b"<!doctype";

pub fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

pub fn is_raw_text_element(name: &str) -> bool {
    matches!(name, "script" | "style")
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

fn starts_with_ignore_ascii_case_at(haystack: &[u8], start: usize, needle: &[u8]) -> bool {
    haystack
        .get(start..start + needle.len())
        .is_some_and(|s| s.eq_ignore_ascii_case(needle))
}

/// Find `</name` followed by optional ASCII whitespace and `>`.
/// Returns (start of close tag, end after `>`), relative to `haystack`.
fn find_rawtext_close_tag(haystack: &str, name: &str) -> Option<(usize, usize)> {
    let bytes = haystack.as_bytes();
    let name = name.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        // '<' never appears inside a UTF-8 continuation byte, so every hit is a char boundary.
        i += memchr(b'<', &bytes[i..])?;
        if bytes.get(i + 1) == Some(&b'/')
            && starts_with_ignore_ascii_case_at(bytes, i + 2, name)
        {
            let mut k = i + 2 + name.len();
            while k < bytes.len() && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if bytes.get(k) == Some(&b'>') {
                return Some((i, k + 1));
            }
        }
        i += 1;
    }
    None
}

/// Cursor over the input. All slice endpoints are taken at ASCII structural bytes or after
/// ASCII-only runs, so they stay on UTF-8 boundaries.
struct Scanner<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn take_name(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(is_name_byte) {
            self.pos += 1;
        }
        debug_assert!(self.input.is_char_boundary(start));
        debug_assert!(self.input.is_char_boundary(self.pos));
        &self.input[start..self.pos]
    }

    fn take_until(&mut self, stop: u8) -> &'a str {
        let start = self.pos;
        self.pos = memchr(stop, &self.bytes[start..])
            .map(|rel| start + rel)
            .unwrap_or(self.bytes.len());
        &self.input[start..self.pos]
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos.min(self.bytes.len())..]
    }
}

/// Tokenizes markup. Tag and attribute names are ASCII-lowercased.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut out = Vec::new();
    let mut sc = Scanner::new(input);

    while !sc.at_end() {
        if sc.peek() != Some(b'<') {
            let text = sc.take_until(b'<');
            let decoded = decode_entities(text);
            if !decoded.is_empty() {
                out.push(Token::Text(decoded));
            }
            continue;
        }

        if sc.rest().starts_with(COMMENT_START) {
            sc.pos += COMMENT_START.len();
            let rest = sc.rest();
            match rest.find(COMMENT_END) {
                Some(end) => {
                    out.push(Token::Comment(rest[..end].to_string()));
                    sc.pos += end + COMMENT_END.len();
                }
                None => {
                    out.push(Token::Comment(rest.to_string()));
                    sc.pos = sc.bytes.len();
                }
            }
            continue;
        }

        if starts_with_ignore_ascii_case_at(sc.bytes, sc.pos, DOCTYPE_START) {
            sc.pos += 2;
            let body = sc.take_until(b'>');
            out.push(Token::Doctype(body.trim().to_string()));
            sc.pos += 1;
            continue;
        }

        if sc.bytes.get(sc.pos + 1) == Some(&b'/') {
            sc.pos += 2;
            let name = sc.take_name().to_ascii_lowercase();
            sc.take_until(b'>');
            sc.pos += 1;
            if !name.is_empty() {
                out.push(Token::EndTag(name));
            }
            continue;
        }

        if !sc.bytes.get(sc.pos + 1).is_some_and(|b| b.is_ascii_alphabetic()) {
            // A lone '<' is text.
            out.push(Token::Text("<".to_string()));
            sc.pos += 1;
            continue;
        }

        sc.pos += 1;
        let name = sc.take_name().to_ascii_lowercase();
        let (attributes, mut self_closing) = read_attributes(&mut sc);
        if is_void_element(&name) {
            self_closing = true;
        }

        let raw = is_raw_text_element(&name) && !self_closing;
        out.push(Token::StartTag {
            name: name.clone(),
            attributes,
            self_closing,
        });

        if raw {
            let rest = sc.rest();
            match find_rawtext_close_tag(rest, &name) {
                Some((body_end, close_end)) => {
                    if body_end > 0 {
                        out.push(Token::Text(rest[..body_end].to_string()));
                    }
                    sc.pos += close_end;
                }
                None => {
                    // Unterminated rawtext swallows the remainder.
                    if !rest.is_empty() {
                        out.push(Token::Text(rest.to_string()));
                    }
                    sc.pos = sc.bytes.len();
                }
            }
            out.push(Token::EndTag(name));
        }
    }

    out
}

fn read_attributes(sc: &mut Scanner<'_>) -> (Attributes, bool) {
    let mut attributes = Attributes::new();
    loop {
        sc.skip_whitespace();
        match sc.peek() {
            None => return (attributes, false),
            Some(b'>') => {
                sc.pos += 1;
                return (attributes, false);
            }
            Some(b'/') => {
                sc.pos += 1;
                if sc.peek() == Some(b'>') {
                    sc.pos += 1;
                    return (attributes, true);
                }
                continue;
            }
            Some(_) => {}
        }

        let key = sc.take_name();
        if key.is_empty() {
            // Skip one unexpected byte, keeping UTF-8 alignment.
            let step = sc.rest().chars().next().map_or(1, char::len_utf8);
            sc.pos += step;
            continue;
        }
        let key = key.to_ascii_lowercase();

        sc.skip_whitespace();
        if sc.peek() != Some(b'=') {
            attributes.push((key, None));
            continue;
        }
        sc.pos += 1;
        sc.skip_whitespace();

        let value = match sc.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                sc.pos += 1;
                let raw = sc.take_until(quote);
                sc.pos += 1;
                decode_entities(raw)
            }
            _ => {
                let start = sc.pos;
                while let Some(b) = sc.peek() {
                    if b.is_ascii_whitespace() || b == b'>' {
                        break;
                    }
                    if b == b'/' && sc.bytes.get(sc.pos + 1) == Some(&b'>') {
                        break;
                    }
                    sc.pos += 1;
                }
                decode_entities(&sc.input[start..sc.pos])
            }
        };
        attributes.push((key, Some(value)));
    }
}
