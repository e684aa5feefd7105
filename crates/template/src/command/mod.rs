//! Wildcard commands.
//!
//! A [`WildcardCommand`] is one of a fixed set of [`WildcardKind`]s plus an
//! ordered list of typed [`Arg`]uments. Commands are immutable once built and
//! always carry a full argument list: anything the author left out is filled
//! in from the kind's schema, so two commands that render the same are equal.
//!
//! The textual form is `name` or `name(arg, arg, ...)`:
//!
//! ```
//! use reshelf_template::{Arg, WildcardCommand, WildcardKind};
//!
//! let parsed: WildcardCommand = r#"creator(editor, 2)"#.parse().unwrap();
//! let created = WildcardCommand::create(WildcardKind::Creator, [Arg::Choice("editor"), Arg::Integer(2)]).unwrap();
//! assert_eq!(parsed, created);
//! assert_eq!(created.to_string(), "creator(editor, 2)");
//! ```

mod eval;
mod parse;

pub use self::eval::EvalContext;
pub(crate) use self::parse::{RawArg, lex};
use crate::error::{Error, ErrorKind, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Custom wildcard groups: a template may reference a group by its key
/// (`%short%`), which renders as the concatenation of the group's commands.
pub type CustomWildcards = BTreeMap<String, Vec<WildcardCommand>>;

/// Built-in wildcards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WildcardKind {
    Creator,
    Year,
    Month,
    Day,
    Title,
    Type,
    Collection,
    Publication,
    /// Fixed text, mostly useful inside custom wildcard groups.
    Text,
    /// Position of the command inside its custom wildcard group.
    Counter,
}
impl WildcardKind {
    pub const ALL: [WildcardKind; 10] = [
        Self::Creator,
        Self::Year,
        Self::Month,
        Self::Day,
        Self::Title,
        Self::Type,
        Self::Collection,
        Self::Publication,
        Self::Text,
        Self::Counter,
    ];

    /// Name as written in templates.
    pub fn name(self) -> &'static str {
        match self {
            Self::Creator => "creator",
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
            Self::Title => "title",
            Self::Type => "type",
            Self::Collection => "collection",
            Self::Publication => "publication",
            Self::Text => "text",
            Self::Counter => "counter",
        }
    }

    /// Case-insensitive lookup by template name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name().eq_ignore_ascii_case(name))
    }

    /// Short human label, for list editors.
    pub fn label(self) -> &'static str {
        match self {
            Self::Creator => "Creator",
            Self::Year => "Year",
            Self::Month => "Month",
            Self::Day => "Day",
            Self::Title => "Title",
            Self::Type => "Item Type",
            Self::Collection => "Collection",
            Self::Publication => "Publication",
            Self::Text => "Text",
            Self::Counter => "Counter",
        }
    }

    /// One-sentence human description, for list editors.
    pub fn description(self) -> &'static str {
        match self {
            Self::Creator => "Creator names of the chosen role, truncated with a marker past a threshold",
            Self::Year => "Year of the item's date",
            Self::Month => "Month of the item's date",
            Self::Day => "Day of the item's date",
            Self::Title => "Title of the item, optionally re-cased and shortened",
            Self::Type => "Human label of the item type",
            Self::Collection => "Name (or full path) of the item's collection",
            Self::Publication => "Journal, book or proceedings title",
            Self::Text => "Fixed text",
            Self::Counter => "Position of this command in its wildcard group",
        }
    }

    /// Ordered argument schema.
    pub fn schema(self) -> &'static [ArgSpec] {
        match self {
            Self::Creator => CREATOR_ARGS,
            Self::Year => YEAR_ARGS,
            Self::Month => MONTH_ARGS,
            Self::Day => DAY_ARGS,
            Self::Title => TITLE_ARGS,
            Self::Type => &[],
            Self::Collection => COLLECTION_ARGS,
            Self::Publication => PUBLICATION_ARGS,
            Self::Text => TEXT_ARGS,
            Self::Counter => COUNTER_ARGS,
        }
    }
}

const CREATOR_ARGS: &[ArgSpec] = &[
    ArgSpec::new("role", ArgType::Choice(&["author", "editor", "any"]), ArgDefault::Choice("author")),
    ArgSpec::new("max", ArgType::Integer, ArgDefault::Integer(3)),
    ArgSpec::new("separator", ArgType::Text, ArgDefault::Text(", ")),
    ArgSpec::new("others", ArgType::Text, ArgDefault::Text(" et al.")),
    ArgSpec::new("style", ArgType::Choice(&["last", "full", "initials"]), ArgDefault::Choice("last")),
];
const YEAR_ARGS: &[ArgSpec] = &[ArgSpec::new("digits", ArgType::Choice(&["4", "2"]), ArgDefault::Choice("4"))];
const MONTH_ARGS: &[ArgSpec] = &[
    ArgSpec::new("style", ArgType::Choice(&["number", "name", "short"]), ArgDefault::Choice("number")),
    ArgSpec::new("pad", ArgType::Boolean, ArgDefault::Boolean(true)),
];
const DAY_ARGS: &[ArgSpec] = &[ArgSpec::new("pad", ArgType::Boolean, ArgDefault::Boolean(true))];
const TITLE_ARGS: &[ArgSpec] = &[
    ArgSpec::new(
        "case",
        ArgType::Choice(&["none", "title", "lower", "upper", "sentence", "slug"]),
        ArgDefault::Choice("none"),
    ),
    ArgSpec::new("length", ArgType::Integer, ArgDefault::Integer(0)),
];
const COLLECTION_ARGS: &[ArgSpec] = &[ArgSpec::new("path", ArgType::Boolean, ArgDefault::Boolean(false))];
const PUBLICATION_ARGS: &[ArgSpec] = &[ArgSpec::new("length", ArgType::Integer, ArgDefault::Integer(0))];
const TEXT_ARGS: &[ArgSpec] = &[ArgSpec::new("value", ArgType::Text, ArgDefault::Text(""))];
const COUNTER_ARGS: &[ArgSpec] = &[
    ArgSpec::new("start", ArgType::Integer, ArgDefault::Integer(1)),
    ArgSpec::new("width", ArgType::Integer, ArgDefault::Integer(0)),
];

impl Display for WildcardKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.name())
    }
}

/// Type of a positional argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    /// Non-negative whole number, written bare.
    Integer,
    /// `true` or `false`, written bare.
    Boolean,
    /// Free text, bare or quoted. Always serialized quoted.
    Text,
    /// One of a fixed set of bare words, matched case-insensitively.
    Choice(&'static [&'static str]),
}
impl ArgType {
    /// Reads a token as written in command text.
    fn coerce(self, token: &str, quoted: bool) -> Option<Arg> {
        match self {
            Self::Integer if !quoted => token.parse().ok().map(Arg::Integer),
            Self::Boolean if !quoted => match token.to_ascii_lowercase().as_str() {
                "true" => Some(Arg::Boolean(true)),
                "false" => Some(Arg::Boolean(false)),
                _ => None,
            },
            Self::Text => Some(Arg::Text(token.to_string())),
            Self::Choice(choices) => choices.iter().find(|c| c.eq_ignore_ascii_case(token)).map(|c| Arg::Choice(*c)),
            Self::Integer | Self::Boolean => None,
        }
    }

    fn describe(self) -> String {
        match self {
            Self::Integer => "a whole number".to_string(),
            Self::Boolean => "true or false".to_string(),
            Self::Text => "text".to_string(),
            Self::Choice(choices) => format!("one of {}", choices.join(", ")),
        }
    }
}

/// Compile-time default of an argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgDefault {
    Integer(u32),
    Boolean(bool),
    Text(&'static str),
    Choice(&'static str),
}
impl ArgDefault {
    fn to_arg(self) -> Arg {
        match self {
            Self::Integer(i) => Arg::Integer(i),
            Self::Boolean(b) => Arg::Boolean(b),
            Self::Text(t) => Arg::Text(t.to_string()),
            Self::Choice(c) => Arg::Choice(c),
        }
    }
}

/// One entry of a wildcard's argument schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgSpec {
    pub name: &'static str,
    pub ty: ArgType,
    pub default: ArgDefault,
}
impl ArgSpec {
    const fn new(name: &'static str, ty: ArgType, default: ArgDefault) -> Self {
        Self { name, ty, default }
    }
}

/// A typed argument value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Arg {
    Integer(u32),
    Boolean(bool),
    Text(String),
    /// Canonical spelling of one of the schema's choices.
    Choice(&'static str),
}
impl Arg {
    /// The token this argument is written as, and whether it must be quoted.
    fn token(&self) -> (String, bool) {
        match self {
            Self::Integer(i) => (i.to_string(), false),
            Self::Boolean(b) => (b.to_string(), false),
            Self::Text(t) => (t.clone(), true),
            Self::Choice(c) => (c.to_string(), false),
        }
    }
}
impl Display for Arg {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Text(t) => {
                write!(f, "\"")?;
                for c in t.chars() {
                    if c == crate::consts::QUOTE || c == crate::consts::ESCAPE {
                        write!(f, "{}", crate::consts::ESCAPE)?;
                    }
                    write!(f, "{c}")?;
                }
                write!(f, "\"")
            },
            other => write!(f, "{}", other.token().0),
        }
    }
}

/// Column values shown by a command list editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnData {
    /// Canonical command text.
    pub command_name: String,
    pub desc: String,
}

/// A wildcard with its full, schema-checked argument list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WildcardCommand {
    kind: WildcardKind,
    args: Vec<Arg>,
}
impl WildcardCommand {
    /// Builds a command programmatically, as a structured editor would.
    ///
    /// Arguments are checked exactly as if they had been written in command
    /// text, so `create` and [`parse`](str::parse) accept the same commands.
    /// Omitted trailing arguments take their defaults.
    pub fn create(kind: WildcardKind, args: impl IntoIterator<Item = Arg>) -> Result<Self> {
        let raw = args
            .into_iter()
            .map(|arg| {
                let (value, quoted) = arg.token();
                RawArg { value, quoted, offset: 0 }
            })
            .collect::<Vec<_>>();
        Self::from_raw(kind, raw)
    }

    /// Command with every argument at its default.
    pub fn with_defaults(kind: WildcardKind) -> Self {
        Self {
            kind,
            args: kind.schema().iter().map(|spec| spec.default.to_arg()).collect(),
        }
    }

    pub(crate) fn from_raw(kind: WildcardKind, raw: Vec<RawArg>) -> Result<Self> {
        let schema = kind.schema();
        if let Some(extra) = raw.get(schema.len()) {
            exn::bail!(ErrorKind::MalformedArguments {
                offset: extra.offset,
                reason: format!("'{}' takes at most {} argument(s)", kind.name(), schema.len()),
            });
        }
        let mut args = Vec::with_capacity(schema.len());
        for (i, spec) in schema.iter().enumerate() {
            let arg = match raw.get(i) {
                None => spec.default.to_arg(),
                Some(token) => match spec.ty.coerce(&token.value, token.quoted) {
                    Some(arg) => arg,
                    None => exn::bail!(ErrorKind::MalformedArguments {
                        offset: token.offset,
                        reason: format!("'{}' expects {} for '{}'", kind.name(), spec.ty.describe(), spec.name),
                    }),
                },
            };
            args.push(arg);
        }
        Ok(Self { kind, args })
    }

    pub fn kind(&self) -> WildcardKind {
        self.kind
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    /// Looks up an argument by schema name.
    pub fn arg(&self, name: &str) -> Option<&Arg> {
        let index = self.kind.schema().iter().position(|spec| spec.name == name)?;
        self.args.get(index)
    }

    pub(crate) fn integer(&self, name: &str) -> u32 {
        match self.arg(name) {
            Some(Arg::Integer(i)) => *i,
            _ => 0,
        }
    }

    pub(crate) fn boolean(&self, name: &str) -> bool {
        matches!(self.arg(name), Some(Arg::Boolean(true)))
    }

    pub(crate) fn text(&self, name: &str) -> &str {
        match self.arg(name) {
            Some(Arg::Text(t)) => t,
            _ => "",
        }
    }

    pub(crate) fn choice(&self, name: &str) -> &'static str {
        match self.arg(name) {
            Some(Arg::Choice(c)) => c,
            _ => "",
        }
    }

    /// Describes the configured command, e.g. for a list editor row.
    pub fn describe(&self) -> String {
        let configured = self
            .kind
            .schema()
            .iter()
            .zip(&self.args)
            .filter(|(spec, arg)| spec.default.to_arg() != **arg)
            .map(|(spec, arg)| format!("{}: {}", spec.name, arg))
            .collect::<Vec<_>>();
        match configured.is_empty() {
            true => self.kind.description().to_string(),
            false => format!("{} ({})", self.kind.description(), configured.join(", ")),
        }
    }

    pub fn column_data(&self) -> ColumnData {
        ColumnData { command_name: self.to_string(), desc: self.describe() }
    }
}

/// Canonical text form: the name, then the arguments up to the last one that
/// differs from its default.
impl Display for WildcardCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.kind.name())?;
        let significant = self
            .kind
            .schema()
            .iter()
            .zip(&self.args)
            .rposition(|(spec, arg)| spec.default.to_arg() != *arg)
            .map_or(0, |i| i + 1);
        if significant == 0 {
            return Ok(());
        }
        write!(f, "(")?;
        for (i, arg) in self.args[..significant].iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")
    }
}

impl FromStr for WildcardCommand {
    type Err = Error;

    /// Parses bare command text (no `%` delimiters) naming a built-in wildcard.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let raw = lex(s)?;
        let Some(kind) = WildcardKind::from_name(raw.name) else {
            exn::bail!(ErrorKind::UnknownWildcard { name: raw.name.to_string(), offset: raw.name_offset });
        };
        Self::from_raw(kind, raw.args)
    }
}

impl Serialize for WildcardCommand {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
impl<'de> Deserialize<'de> for WildcardCommand {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(|e: Error| serde::de::Error::custom(&*e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(WildcardKind::Creator, vec![], "creator")]
    #[case(WildcardKind::Creator, vec![Arg::Choice("editor")], "creator(editor)")]
    #[case(WildcardKind::Creator, vec![Arg::Choice("author"), Arg::Integer(1)], "creator(author, 1)")]
    #[case(
        WildcardKind::Creator,
        vec![Arg::Choice("any"), Arg::Integer(2), Arg::Text(" & ".into()), Arg::Text(" and others".into())],
        r#"creator(any, 2, " & ", " and others")"#
    )]
    #[case(WildcardKind::Year, vec![Arg::Choice("2")], "year(2)")]
    #[case(WildcardKind::Month, vec![Arg::Choice("number"), Arg::Boolean(false)], "month(number, false)")]
    #[case(WildcardKind::Title, vec![Arg::Choice("slug"), Arg::Integer(40)], "title(slug, 40)")]
    #[case(WildcardKind::Text, vec![Arg::Text(r#"say "hi" \o/"#.into())], r#"text("say \"hi\" \\o/")"#)]
    #[case(WildcardKind::Type, vec![], "type")]
    #[case(WildcardKind::Counter, vec![Arg::Integer(0), Arg::Integer(3)], "counter(0, 3)")]
    fn test_create_serialize_parse(#[case] kind: WildcardKind, #[case] args: Vec<Arg>, #[case] canonical: &str) {
        let created = WildcardCommand::create(kind, args).unwrap();
        assert_eq!(created.to_string(), canonical);
        assert_eq!(canonical.parse::<WildcardCommand>().unwrap(), created);
    }

    #[rstest]
    #[case("CREATOR( Editor ,2 )", "creator(editor, 2)")]
    #[case("creator(author, 3)", "creator")]
    #[case("title(none, 0)", "title")]
    #[case("text(bare)", r#"text("bare")"#)]
    #[case("month(NAME)", "month(name)")]
    fn test_canonical_form(#[case] input: &str, #[case] canonical: &str) {
        assert_eq!(input.parse::<WildcardCommand>().unwrap().to_string(), canonical);
    }

    #[rstest]
    #[case("creator(painter)")]
    #[case("creator(author, many)")]
    #[case("creator(author, \"3\")")]
    #[case("day(yes)")]
    #[case("type(1)")]
    #[case("year(3)")]
    #[case("counter(-1)")]
    fn test_schema_violations(#[case] input: &str) {
        let err = input.parse::<WildcardCommand>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::MalformedArguments { .. }), "{input}: {err:?}");
    }

    #[rstest]
    #[case(WildcardKind::Creator, &["role", "max", "separator", "others", "style"])]
    #[case(WildcardKind::Year, &["digits"])]
    #[case(WildcardKind::Month, &["style", "pad"])]
    #[case(WildcardKind::Day, &["pad"])]
    #[case(WildcardKind::Title, &["case", "length"])]
    #[case(WildcardKind::Type, &[])]
    #[case(WildcardKind::Collection, &["path"])]
    #[case(WildcardKind::Publication, &["length"])]
    #[case(WildcardKind::Text, &["value"])]
    #[case(WildcardKind::Counter, &["start", "width"])]
    fn test_schema_is_static(#[case] kind: WildcardKind, #[case] names: &[&str]) {
        let schema: &'static [ArgSpec] = kind.schema();
        assert_eq!(schema.iter().map(|spec| spec.name).collect::<Vec<_>>(), names);
    }

    #[test]
    fn test_unknown_name() {
        let err = "author".parse::<WildcardCommand>().unwrap_err();
        assert_eq!(*err, ErrorKind::UnknownWildcard { name: "author".into(), offset: 0 });
    }

    #[test]
    fn test_create_rejects_what_parse_rejects() {
        assert!(WildcardCommand::create(WildcardKind::Year, [Arg::Choice("3")]).is_err());
        assert!(WildcardCommand::create(WildcardKind::Day, [Arg::Text("true".into())]).is_err());
        assert!(WildcardCommand::create(WildcardKind::Type, [Arg::Integer(1)]).is_err());
    }

    #[test]
    fn test_column_data() {
        let command: WildcardCommand = "creator(editor)".parse().unwrap();
        let data = command.column_data();
        assert_eq!(data.command_name, "creator(editor)");
        assert!(data.desc.contains("role: editor"));
        let plain = WildcardCommand::with_defaults(WildcardKind::Year).column_data();
        assert_eq!(plain.desc, WildcardKind::Year.description());
    }

    #[test]
    fn test_serde_as_string() {
        let commands: Vec<WildcardCommand> = serde_json::from_str(r#"["creator(editor, 1)", "year"]"#).unwrap();
        assert_eq!(commands[0].kind(), WildcardKind::Creator);
        assert_eq!(serde_json::to_string(&commands).unwrap(), r#"["creator(editor, 1)","year"]"#);
        assert!(serde_json::from_str::<Vec<WildcardCommand>>(r#"["nope"]"#).is_err());
    }

    fn arb_arg(spec: &'static ArgSpec) -> BoxedStrategy<Arg> {
        match spec.ty {
            ArgType::Integer => (0u32..500).prop_map(Arg::Integer).boxed(),
            ArgType::Boolean => any::<bool>().prop_map(Arg::Boolean).boxed(),
            ArgType::Text => any::<String>().prop_map(Arg::Text).boxed(),
            ArgType::Choice(choices) => proptest::sample::select(choices).prop_map(Arg::Choice).boxed(),
        }
    }

    fn arb_command() -> impl Strategy<Value = WildcardCommand> {
        proptest::sample::select(WildcardKind::ALL.to_vec()).prop_flat_map(|kind| {
            kind.schema()
                .iter()
                .map(arb_arg)
                .collect::<Vec<_>>()
                .prop_map(move |args| WildcardCommand::create(kind, args).unwrap())
        })
    }

    proptest! {
        #[test]
        fn prop_round_trip(command in arb_command()) {
            let text = command.to_string();
            prop_assert_eq!(text.parse::<WildcardCommand>().unwrap(), command);
        }
    }
}
