//! Lexing of command text (the part between two `%`).
//!
//! Grammar, whitespace allowed around every token:
//!
//! ```text
//! command  = name [ "(" [ argument { "," argument } ] ")" ]
//! name     = 1*( ALPHA / DIGIT / "_" / "-" )
//! argument = bare / quoted
//! bare     = 1*( ALPHA / DIGIT / "_" / "." / "+" / "-" )
//! quoted   = DQUOTE *( escaped / any-but-DQUOTE-or-backslash ) DQUOTE
//! escaped  = "\" ( DQUOTE / "\" )
//! ```
//!
//! Lexing is purely syntactic: whether a name exists or an argument fits its
//! slot is decided by the caller.

use crate::consts::{ARGUMENT_SEPARATOR, ARGUMENTS_CLOSE, ARGUMENTS_OPEN, ESCAPE, QUOTE};
use crate::error::{ErrorKind, Result};
use std::iter::Peekable;
use std::str::CharIndices;

/// A command as written, before any schema checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawCommand<'a> {
    pub name: &'a str,
    pub name_offset: usize,
    pub args: Vec<RawArg>,
    /// Offset of the opening parenthesis, if there was an argument list.
    pub args_offset: Option<usize>,
}

/// One argument token, unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawArg {
    pub value: String,
    pub quoted: bool,
    pub offset: usize,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn is_bare_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '+' | '-')
}

struct Cursor<'a> {
    text: &'a str,
    chars: Peekable<CharIndices<'a>>,
}
impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, chars: text.char_indices().peekable() }
    }

    fn pos(&mut self) -> usize {
        self.chars.peek().map_or(self.text.len(), |(i, _)| *i)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn bump(&mut self) -> Option<char> {
        self.chars.next().map(|(_, c)| c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos();
        while self.peek().is_some_and(&accept) {
            self.bump();
        }
        let end = self.pos();
        let text = self.text;
        &text[start..end]
    }
}

/// Splits command text into a name and raw argument tokens.
///
/// Offsets are relative to `text`.
pub(crate) fn lex(text: &str) -> Result<RawCommand<'_>> {
    let mut cursor = Cursor::new(text);
    cursor.skip_whitespace();
    let name_offset = cursor.pos();
    let name = cursor.take_while(is_name_char);
    if name.is_empty() {
        match cursor.peek() {
            None | Some(ARGUMENTS_OPEN) => exn::bail!(ErrorKind::EmptyCommand(name_offset)),
            Some(_) => exn::bail!(ErrorKind::TrailingContent(name_offset)),
        }
    }
    cursor.skip_whitespace();
    let (args, args_offset) = match cursor.peek() {
        Some(ARGUMENTS_OPEN) => {
            let offset = cursor.pos();
            cursor.bump();
            (lex_arguments(&mut cursor, offset)?, Some(offset))
        },
        _ => (Vec::new(), None),
    };
    cursor.skip_whitespace();
    if cursor.peek().is_some() {
        exn::bail!(ErrorKind::TrailingContent(cursor.pos()));
    }
    Ok(RawCommand { name, name_offset, args, args_offset })
}

fn lex_arguments(cursor: &mut Cursor<'_>, open: usize) -> Result<Vec<RawArg>> {
    let mut args = Vec::new();
    cursor.skip_whitespace();
    if cursor.peek() == Some(ARGUMENTS_CLOSE) {
        cursor.bump();
        return Ok(args);
    }
    loop {
        cursor.skip_whitespace();
        let offset = cursor.pos();
        let arg = match cursor.peek() {
            Some(QUOTE) => RawArg { value: lex_quoted(cursor)?, quoted: true, offset },
            _ => {
                let value = cursor.take_while(is_bare_char);
                if value.is_empty() {
                    exn::bail!(malformed(offset, "expected an argument"));
                }
                RawArg { value: value.to_string(), quoted: false, offset }
            },
        };
        args.push(arg);
        cursor.skip_whitespace();
        let at = cursor.pos();
        match cursor.bump() {
            Some(ARGUMENT_SEPARATOR) => continue,
            Some(ARGUMENTS_CLOSE) => return Ok(args),
            None => exn::bail!(malformed(open, "argument list is never closed")),
            Some(c) => exn::bail!(malformed(at, &format!("unexpected character '{c}'"))),
        }
    }
}

fn lex_quoted(cursor: &mut Cursor<'_>) -> Result<String> {
    let open = cursor.pos();
    cursor.bump();
    let mut value = String::new();
    loop {
        let at = cursor.pos();
        match cursor.bump() {
            None => exn::bail!(malformed(open, "unterminated string")),
            Some(QUOTE) => return Ok(value),
            Some(ESCAPE) => match cursor.bump() {
                Some(c @ (QUOTE | ESCAPE)) => value.push(c),
                _ => exn::bail!(malformed(at, "only '\\\"' and '\\\\' may be escaped")),
            },
            Some(c) => value.push(c),
        }
    }
}

fn malformed(offset: usize, reason: &str) -> ErrorKind {
    ErrorKind::MalformedArguments { offset, reason: reason.to_string() }
}
