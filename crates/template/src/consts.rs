//! Structural characters of the template mini-language, and the patterns
//! used to read free-form host data.
//!
//! None of these can be escaped: a literal `%` or `/` cannot appear inside a
//! path component produced from template text. A `/` in wildcard output is
//! data and gets sanitized away, except for wildcards that produce
//! directories on purpose (a collection path).

use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

/// Opens and closes a command region: `%creator%`.
pub const COMMAND_DELIMITER: char = '%';
/// Subdirectory boundary inside template text, independent of the host OS.
pub const DIRECTORY_SEPARATOR: char = '/';
/// Opens an argument list: `%creator(editor, 2)%`.
pub const ARGUMENTS_OPEN: char = '(';
/// Closes an argument list.
pub const ARGUMENTS_CLOSE: char = ')';
/// Separates arguments.
pub const ARGUMENT_SEPARATOR: char = ',';
/// Delimits quoted text arguments.
pub const QUOTE: char = '"';
/// Escapes a quote or backslash inside a quoted argument.
pub const ESCAPE: char = '\\';

/// Placeholder used when a wildcard has no data and the caller didn't pick one.
pub const DEFAULT_UNDEFINED_PLACEHOLDER: &str = "undefined";
/// Replacement for characters that are illegal in a path component.
pub const DEFAULT_REPLACEMENT: &str = "_";

regex!(ISO_DATE_REGEX, r"\b(\d{4})-(\d{1,2})(?:-(\d{1,2}))?\b");
regex!(NUMERIC_DATE_REGEX, r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b");
regex!(
    MONTH_NAME_REGEX,
    r"(?i)\b(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\b"
);
regex!(YEAR_REGEX, r"\b(\d{4})\b");
regex!(DAY_REGEX, r"\b(\d{1,2})(?:st|nd|rd|th)?\b");
