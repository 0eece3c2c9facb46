//! Streaming HTML tokenizer.
//!
//! Turns template markup into a sequence of start tag, end tag and text
//! events delivered to a [`Handler`]. It is deliberately small: there is no
//! tree building, no entity decoding and no knowledge of void elements.
//! Comments are removed before tokenizing.
//!
//! ```
//! use livemodel::html::{self, Token};
//! # fn main() -> livemodel::Result<()> {
//! let tokens = html::tokenize(r#"<p class="note">hi<br/></p>"#)?;
//! assert_eq!(tokens.len(), 4);
//! assert!(matches!(&tokens[0], Token::Start { name, .. } if name == "p"));
//! assert_eq!(tokens[1], Token::Text("hi".to_string()));
//! # Ok(())
//! # }
//! ```

use std::{borrow::Cow, collections::BTreeMap};

use memchr::{memchr, memmem};
use tracing::trace;

pub mod errors;

pub use errors::HtmlError;

/// Attributes of a start tag. Valueless attributes map to `None`.
pub type Attributes = BTreeMap<String, Option<String>>;

/// Receives tokenizer events. Every method defaults to doing nothing.
pub trait Handler {
    fn chars(&mut self, _text: &str) {}

    fn start(&mut self, _tag: &str, _attrs: &Attributes) {}

    fn end(&mut self, _tag: &str) {}
}

/// One tokenizer event, owned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Start { name: String, attrs: Attributes },
    End(String),
    Text(String),
}

impl Handler for Vec<Token> {
    fn chars(&mut self, text: &str) {
        self.push(Token::Text(text.to_string()));
    }

    fn start(&mut self, tag: &str, attrs: &Attributes) {
        self.push(Token::Start {
            name: tag.to_string(),
            attrs: attrs.clone(),
        });
    }

    fn end(&mut self, tag: &str) {
        self.push(Token::End(tag.to_string()));
    }
}

/// Tokenizes `html`, delivering events to `handler` in document order.
///
/// Fails with [`HtmlError::Malformed`] at the first `<` that opens neither a
/// start tag nor an end tag. Events before that point have already been
/// delivered.
pub fn parse<H: Handler + ?Sized>(html: &str, handler: &mut H) -> Result<(), HtmlError> {
    let html = strip_comments(html);
    let mut rest: &str = &html;

    while !rest.is_empty() {
        if rest.starts_with("</") {
            if let Some((len, name)) = end_tag(rest) {
                trace!(tag = name, "end tag");
                handler.end(name);
                rest = &rest[len..];
                continue;
            }
        } else if rest.starts_with('<')
            && let Some((len, name, attrs)) = start_tag(rest)
        {
            trace!(tag = name, attrs = attrs.len(), "start tag");
            handler.start(name, &attrs);
            rest = &rest[len..];
            continue;
        }

        let text_len = memchr(b'<', rest.as_bytes()).unwrap_or(rest.len());
        if text_len == 0 {
            return Err(HtmlError::Malformed {
                offset: html.len() - rest.len(),
                remaining: rest.to_string(),
            });
        }
        handler.chars(&rest[..text_len]);
        rest = &rest[text_len..];
    }

    Ok(())
}

/// Tokenizes `html` into a vector of owned tokens.
pub fn tokenize(html: &str) -> Result<Vec<Token>, HtmlError> {
    let mut tokens = Vec::new();
    parse(html, &mut tokens)?;
    Ok(tokens)
}

/// Removes `<!-- ... -->` comments, together with a newline directly after
/// one and the spaces that indent the following line.
///
/// An unterminated comment is left in place.
pub fn strip_comments(html: &str) -> Cow<'_, str> {
    let Some(first) = memmem::find(html.as_bytes(), b"<!--") else {
        return Cow::Borrowed(html);
    };

    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    let mut next = Some(first);
    while let Some(open) = next {
        let body = &rest[open + 4..];
        let Some(close) = memmem::find(body.as_bytes(), b"-->") else {
            break;
        };
        out.push_str(&rest[..open]);

        let mut after = &body[close + 3..];
        if let Some(line) = after.strip_prefix('\n') {
            after = line.trim_start_matches(' ');
        }
        rest = after;
        next = memmem::find(rest.as_bytes(), b"<!--");
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b':')
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0c')
}

/// Byte scanner over one tag.
struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str, pos: usize) -> Self {
        Self { src, pos }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    fn skip_space(&mut self) -> usize {
        self.take_while(is_space).len()
    }

    fn name(&mut self) -> Option<&'a str> {
        Some(self.take_while(is_name_byte)).filter(|name| !name.is_empty())
    }

    /// `"..."`, `'...'` or a bare run up to whitespace or `>`.
    fn value(&mut self) -> Option<&'a str> {
        if let Some(quote @ (b'"' | b'\'')) = self.peek() {
            let body = &self.src.as_bytes()[self.pos + 1..];
            if let Some(len) = memchr(quote, body) {
                let start = self.pos + 1;
                self.pos = start + len + 1;
                return Some(&self.src[start..start + len]);
            }
        }
        let bare = self.take_while(|b| b != b'>' && !is_space(b));
        (!bare.is_empty()).then_some(bare)
    }

    /// An optional `= value` after an attribute name.
    fn assignment(&mut self) -> Option<Option<&'a str>> {
        let mark = self.pos;
        self.skip_space();
        if !self.eat(b'=') {
            self.pos = mark;
            return Some(None);
        }
        self.skip_space();
        self.value().map(Some)
    }
}

/// Matches `<name attr* /?>` at the start of `input`.
fn start_tag(input: &str) -> Option<(usize, &str, Attributes)> {
    let mut scan = Scanner::new(input, 1);
    let name = scan.name()?;
    let mut attrs = Attributes::new();

    loop {
        let mark = scan.pos;
        if scan.skip_space() == 0 {
            break;
        }
        let Some(attr) = scan.name() else {
            scan.pos = mark;
            break;
        };
        let value = scan.assignment()?;
        attrs.insert(attr.to_string(), value.map(str::to_string));
    }

    scan.skip_space();
    scan.eat(b'/');
    scan.eat(b'>').then_some((scan.pos, name, attrs))
}

/// Matches `</name ...>` at the start of `input`.
fn end_tag(input: &str) -> Option<(usize, &str)> {
    let mut scan = Scanner::new(input, 2);
    let name = scan.name()?;
    let close = memchr(b'>', &input.as_bytes()[scan.pos..])?;
    Some((scan.pos + close + 1, name))
}
