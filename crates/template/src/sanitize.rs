//! Filesystem-safe path components.
//!
//! [`sanitize`] turns one path *segment* (never a whole path) into something
//! every supported filesystem accepts. Illegal characters are replaced rather
//! than dropped, so that two distinct inputs are less likely to collapse into
//! the same directory name.

use crate::consts::DEFAULT_REPLACEMENT;

/// Longest component most filesystems accept, in bytes.
pub const MAX_COMPONENT_BYTES: usize = 255;

/// Device names Windows reserves regardless of extension (`CON.txt` too).
const WINDOWS_RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9", "LPT1",
    "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];
/// Characters Windows refuses in a file name, on top of the separators.
const WINDOWS_RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];
/// Both separators are rejected on every platform: a segment that is safe on
/// Unix must not turn into two directories once synced to Windows.
const SEPARATORS: &[char] = &['/', '\\'];

/// Naming rules to sanitize against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Windows-like targets: reserved characters and device names.
    Windows,
    /// Everything else: separators and control characters only.
    Unix,
}
impl Platform {
    /// The platform this binary was compiled for.
    pub const fn current() -> Self {
        if cfg!(windows) { Self::Windows } else { Self::Unix }
    }

    /// Returns `true` if `c` may not appear anywhere in a path component.
    pub fn is_illegal(self, c: char) -> bool {
        if c.is_control() || SEPARATORS.contains(&c) {
            return true;
        }
        match self {
            Self::Windows => WINDOWS_RESERVED_CHARS.contains(&c),
            Self::Unix => false,
        }
    }

    fn is_reserved_name(self, name: &str) -> bool {
        match self {
            Self::Windows => {
                let base = name.split('.').next().unwrap_or(name).trim_end();
                WINDOWS_RESERVED_NAMES.iter().any(|reserved| reserved.eq_ignore_ascii_case(base))
            },
            Self::Unix => false,
        }
    }
}

/// Sanitizes a single path segment for the current [`Platform`].
///
/// - every illegal character is replaced by `replacement`,
/// - leading whitespace and trailing dots/spaces are removed,
/// - the result is capped at [`MAX_COMPONENT_BYTES`] on a character boundary,
/// - reserved device names get `replacement` appended,
/// - an empty result becomes `replacement` itself.
///
/// The replacement is sanitized too, so the output never contains a path
/// separator or reserved character. The output is only empty when
/// `replacement` is.
///
/// ```
/// use reshelf_template::sanitize;
///
/// assert_eq!(sanitize("AC/DC", "_"), "AC_DC");
/// assert_eq!(sanitize("Doe et al.", "_"), "Doe et al");
/// assert_eq!(sanitize("..", "_"), "_");
/// ```
pub fn sanitize(segment: &str, replacement: &str) -> String {
    sanitize_for(Platform::current(), segment, replacement)
}

/// Sanitizes a single path segment against an explicit [`Platform`].
pub fn sanitize_for(platform: Platform, segment: &str, replacement: &str) -> String {
    let replacement = clean_replacement(platform, replacement);
    let mut out = String::with_capacity(segment.len());
    for c in segment.chars() {
        match platform.is_illegal(c) {
            true => out.push_str(&replacement),
            false => out.push(c),
        }
    }
    let mut out = trim(&out).to_string();
    if out.len() > MAX_COMPONENT_BYTES {
        out.truncate(out.floor_char_boundary(MAX_COMPONENT_BYTES));
        out = trim(&out).to_string();
    }
    if out.is_empty() {
        return replacement;
    }
    if platform.is_reserved_name(&out) {
        let suffix = match replacement.is_empty() {
            true => DEFAULT_REPLACEMENT,
            false => replacement.as_str(),
        };
        if out.len() + suffix.len() > MAX_COMPONENT_BYTES {
            out.truncate(out.floor_char_boundary(MAX_COMPONENT_BYTES.saturating_sub(suffix.len())));
            out = trim(&out).to_string();
        }
        // Append to the base name so that an extension stays an extension.
        out = match out.split_once('.') {
            Some((base, ext)) => format!("{base}{suffix}.{ext}"),
            None => format!("{out}{suffix}"),
        };
    }
    out
}

fn trim(s: &str) -> &str {
    s.trim_start().trim_end_matches(['.', ' '])
}

/// Strips the replacement down to characters that are legal on their own.
///
/// A non-empty replacement that cleans down to nothing (e.g. `"."`, `"/"`)
/// falls back to [`DEFAULT_REPLACEMENT`], so a caller asking for *some*
/// replacement always gets a non-empty segment back.
fn clean_replacement(platform: Platform, replacement: &str) -> String {
    let cleaned: String = replacement.chars().filter(|c| !platform.is_illegal(*c)).collect();
    let cleaned = trim(&cleaned);
    match (cleaned.is_empty(), replacement.is_empty()) {
        (true, false) => DEFAULT_REPLACEMENT.to_string(),
        _ => cleaned.to_string(),
    }
}
