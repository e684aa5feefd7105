//! Compiled path templates.
//!
//! Template text is literal except for command regions delimited by `%`:
//!
//! ```text
//! %creator% - %year%/%title(title, 60)%.pdf
//! ```
//!
//! A `/` in the literal text (or in a command's output) starts a new
//! directory. Neither `%` nor `/` can be escaped.
//!
//! # Example
//!
//! ```
//! use reshelf_template::{CompiledTemplate, EvalContext, ItemRecord, NormalizedItem};
//!
//! let template: CompiledTemplate = "%creator% - %year%".parse().unwrap();
//! let item = NormalizedItem::from_record(&ItemRecord {
//!     date: Some("2020".into()),
//!     ..Default::default()
//! });
//! assert_eq!(template.render(&item, &EvalContext::new("unknown")), "unknown - 2020");
//! ```

use crate::command::{CustomWildcards, EvalContext, WildcardCommand, WildcardKind, lex};
use crate::consts::{COMMAND_DELIMITER, DIRECTORY_SEPARATOR, ESCAPE, QUOTE};
use crate::error::{Error, ErrorKind, Result};
use crate::item::NormalizedItem;
use memchr::{memchr, memchr3};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use tracing::instrument;

/// One piece of a compiled template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Command(WildcardCommand),
    /// Reference to a custom wildcard group, by key.
    Custom(String),
}

/// A parsed template, reusable across any number of items.
///
/// Constructed via [`FromStr`] (built-in wildcards only) or
/// [`parse_with`](Self::parse_with), both of which compile eagerly so that
/// syntax errors surface before any item is touched. A compiled template
/// holds no item state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
    segments: Vec<Segment>,
}
impl FromStr for CompiledTemplate {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse_with(s, &CustomWildcards::new())
    }
}
impl CompiledTemplate {
    /// Compiles template text, resolving `%name%` against `custom` before
    /// the built-in wildcards.
    ///
    /// Parsing is a single left-to-right pass. Offsets in errors are byte
    /// offsets into `template`.
    #[instrument(level = "debug", skip(custom), err(Debug))]
    pub fn parse_with(template: &str, custom: &CustomWildcards) -> Result<Self> {
        let bytes = template.as_bytes();
        let mut segments = Vec::new();
        let mut pos = 0;
        while pos < bytes.len() {
            let Some(open) = memchr(COMMAND_DELIMITER as u8, &bytes[pos..]).map(|i| pos + i) else {
                segments.push(Segment::Literal(template[pos..].to_string()));
                break;
            };
            if open > pos {
                segments.push(Segment::Literal(template[pos..open].to_string()));
            }
            let start = open + 1;
            let Some(close) = find_closing_delimiter(bytes, start) else {
                exn::bail!(ErrorKind::UnterminatedCommand(open));
            };
            let segment = command_segment(&template[start..close], custom)
                .map_err(|err| exn::Exn::from((*err).clone().shifted(start)))?;
            segments.push(segment);
            pos = close + 1;
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Evaluates every segment and concatenates the results.
    ///
    /// The output is raw: it still contains `/` separators and has not been
    /// sanitized. See [`resolve`](crate::resolve) for the path form.
    pub fn render(&self, item: &NormalizedItem, ctx: &EvalContext<'_>) -> String {
        let mut out = String::new();
        self.walk(item, ctx, |text, _| out.push_str(&text));
        out
    }

    /// Evaluates every segment into raw (unsanitized) path components.
    ///
    /// Only structural text splits components: a `/` in the template's
    /// literal text, or in the output of a wildcard that produces
    /// directories. A `/` inside, say, a title stays part of its component.
    pub fn render_components(&self, item: &NormalizedItem, ctx: &EvalContext<'_>) -> Vec<String> {
        let mut components = vec![String::new()];
        self.walk(item, ctx, |text, structural| {
            let mut parts = match structural {
                true => text.split(DIRECTORY_SEPARATOR).collect::<Vec<_>>(),
                false => vec![text.as_str()],
            }
            .into_iter();
            if let (Some(first), Some(current)) = (parts.next(), components.last_mut()) {
                current.push_str(first);
            }
            components.extend(parts.map(str::to_string));
        });
        components
    }

    /// Feeds each evaluated piece to `emit`, flagged `true` when its `/`
    /// characters are directory separators.
    fn walk(&self, item: &NormalizedItem, ctx: &EvalContext<'_>, mut emit: impl FnMut(String, bool)) {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => emit(text.clone(), true),
                Segment::Command(command) => emit(command.evaluate(item, ctx), command.splits_directories()),
                Segment::Custom(key) => match ctx.custom_wildcards.and_then(|groups| groups.get(key)) {
                    Some(commands) => {
                        for (index, command) in commands.iter().enumerate() {
                            emit(command.evaluate(item, &ctx.at(index)), command.splits_directories());
                        }
                    },
                    None => emit(ctx.placeholder.to_string(), false),
                },
            }
        }
    }
}

/// Canonical template text: commands are re-serialized, literals kept.
impl Display for CompiledTemplate {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => write!(f, "{text}")?,
                Segment::Command(command) => write!(f, "{COMMAND_DELIMITER}{command}{COMMAND_DELIMITER}")?,
                Segment::Custom(key) => write!(f, "{COMMAND_DELIMITER}{key}{COMMAND_DELIMITER}")?,
            }
        }
        Ok(())
    }
}

fn command_segment(text: &str, custom: &CustomWildcards) -> Result<Segment> {
    let raw = lex(text)?;
    if custom.contains_key(raw.name) {
        if let Some(offset) = raw.args_offset {
            exn::bail!(ErrorKind::MalformedArguments {
                offset,
                reason: format!("custom wildcard '{}' takes no arguments", raw.name),
            });
        }
        return Ok(Segment::Custom(raw.name.to_string()));
    }
    let Some(kind) = WildcardKind::from_name(raw.name) else {
        exn::bail!(ErrorKind::UnknownWildcard { name: raw.name.to_string(), offset: raw.name_offset });
    };
    Ok(Segment::Command(WildcardCommand::from_raw(kind, raw.args)?))
}

/// Finds the `%` closing a command region, skipping over quoted arguments.
fn find_closing_delimiter(bytes: &[u8], from: usize) -> Option<usize> {
    let mut pos = from;
    let mut quoted = false;
    while pos < bytes.len() {
        let at = pos + memchr3(COMMAND_DELIMITER as u8, QUOTE as u8, ESCAPE as u8, &bytes[pos..])?;
        match bytes[at] {
            b'\\' if quoted => {
                pos = at + 2;
                continue;
            },
            b'"' => quoted = !quoted,
            b'%' if !quoted => return Some(at),
            _ => {},
        }
        pos = at + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{CreatorRecord, ItemRecord};
    use rstest::rstest;

    fn item() -> NormalizedItem {
        NormalizedItem::from_record(&ItemRecord {
            creators: vec![CreatorRecord { last_name: "Doe".into(), creator_type: "author".into(), ..Default::default() }],
            date: Some("2020".into()),
            title: Some("Notes".into()),
            ..Default::default()
        })
    }

    #[test]
    fn test_segments() {
        let template: CompiledTemplate = "%creator% - %year%/%title%.pdf".parse().unwrap();
        assert_eq!(template.segments().len(), 6);
        assert_eq!(template.segments()[1], Segment::Literal(" - ".into()));
        assert!(matches!(&template.segments()[4], Segment::Command(c) if c.kind() == WildcardKind::Title));
        assert_eq!(template.render(&item(), &EvalContext::default()), "Doe - 2020/Notes.pdf");
    }

    #[test]
    fn test_components_split_on_structure_only() {
        let item = NormalizedItem::from_record(&ItemRecord { title: Some("AC/DC".into()), ..Default::default() });
        let template: CompiledTemplate = "a/%title%/b".parse().unwrap();
        assert_eq!(template.render_components(&item, &EvalContext::default()), ["a", "AC/DC", "b"]);
        assert_eq!(template.render(&item, &EvalContext::default()), "a/AC/DC/b");
    }

    #[test]
    fn test_literal_only_and_empty() {
        let template: CompiledTemplate = "plain/text".parse().unwrap();
        assert_eq!(template.segments(), &[Segment::Literal("plain/text".into())]);
        let empty: CompiledTemplate = "".parse().unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.render(&item(), &EvalContext::default()), "");
    }

    #[test]
    fn test_quoted_delimiter() {
        let template: CompiledTemplate = r#"%text("100% \"sure\"")%"#.parse().unwrap();
        assert_eq!(template.render(&item(), &EvalContext::default()), r#"100% "sure""#);
    }

    #[test]
    fn test_canonical_display() {
        let template: CompiledTemplate = "%CREATOR(author, 3)%_%year( 2 )%".parse().unwrap();
        assert_eq!(template.to_string(), "%creator%_%year(2)%");
    }

    #[rstest]
    #[case("%creator", ErrorKind::UnterminatedCommand(0))]
    #[case("a/%year%/%title", ErrorKind::UnterminatedCommand(9))]
    #[case(r#"%text("50%)"#, ErrorKind::UnterminatedCommand(0))]
    #[case("x%%", ErrorKind::EmptyCommand(2))]
    #[case("ab%author%", ErrorKind::UnknownWildcard { name: "author".into(), offset: 3 })]
    #[case("%year x%", ErrorKind::TrailingContent(6))]
    fn test_syntax_errors(#[case] input: &str, #[case] expected: ErrorKind) {
        let err = input.parse::<CompiledTemplate>().unwrap_err();
        assert_eq!(*err, expected);
    }

    #[test]
    fn test_malformed_arguments_offset() {
        let err = "dir/%year(3)%".parse::<CompiledTemplate>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::MalformedArguments { offset: 10, .. }), "{err:?}");
    }

    #[test]
    fn test_custom_groups() {
        let mut groups = CustomWildcards::new();
        groups.insert(
            "short".into(),
            vec!["creator(author, 1, \", \", \"\")".parse().unwrap(), r#"text("_")"#.parse().unwrap(), "year(2)".parse().unwrap()],
        );
        // Custom groups shadow built-in names.
        groups.insert("year".into(), vec![r#"text("shadowed")"#.parse().unwrap()]);
        let template = CompiledTemplate::parse_with("%short%/%year%", &groups).unwrap();
        let ctx = EvalContext::default().with_custom_wildcards(&groups);
        assert_eq!(template.render(&item(), &ctx), "Doe_20/shadowed");

        // Rendering without the groups degrades to the placeholder.
        assert_eq!(template.render(&item(), &EvalContext::new("?")), "?/?");

        let err = CompiledTemplate::parse_with("%short(1)%", &groups).unwrap_err();
        assert!(matches!(&*err, ErrorKind::MalformedArguments { offset: 6, .. }), "{err:?}");
    }

    #[test]
    fn test_counter_in_group() {
        let mut groups = CustomWildcards::new();
        groups.insert("list".into(), vec!["counter".parse().unwrap(), "counter(10)".parse().unwrap()]);
        let template = CompiledTemplate::parse_with("%list%", &groups).unwrap();
        let ctx = EvalContext::default().with_custom_wildcards(&groups);
        assert_eq!(template.render(&item(), &ctx), "111");
    }
}
