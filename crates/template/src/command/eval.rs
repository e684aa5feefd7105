//! Per-kind evaluation of a [`WildcardCommand`] against a [`NormalizedItem`].
//!
//! Evaluation never fails. Missing data becomes the context's placeholder; a
//! field that is present but empty evaluates to the empty string.

use super::{CustomWildcards, WildcardCommand, WildcardKind};
use crate::consts::{DEFAULT_REPLACEMENT, DEFAULT_UNDEFINED_PLACEHOLDER, DIRECTORY_SEPARATOR};
use crate::item::{CollectionId, Creator, CreatorRole, NormalizedItem, item_type_label};
use rslug::slugify;
use time::Month;

/// Per-evaluation inputs that don't come from the item itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalContext<'a> {
    /// Output for any wildcard whose data is absent.
    pub placeholder: &'a str,
    /// Collection used by `%collection%` when the item is a member of it.
    pub preferred_collection: Option<CollectionId>,
    /// Groups that `%group%` template segments expand to.
    pub custom_wildcards: Option<&'a CustomWildcards>,
    /// Position of the command inside its custom wildcard group.
    pub index: usize,
}
impl<'a> EvalContext<'a> {
    pub fn new(placeholder: &'a str) -> Self {
        Self { placeholder, preferred_collection: None, custom_wildcards: None, index: 0 }
    }

    pub fn with_custom_wildcards(self, custom_wildcards: &'a CustomWildcards) -> Self {
        Self { custom_wildcards: Some(custom_wildcards), ..self }
    }

    pub fn with_preferred_collection(self, preferred_collection: Option<CollectionId>) -> Self {
        Self { preferred_collection, ..self }
    }

    pub(crate) fn at(self, index: usize) -> Self {
        Self { index, ..self }
    }
}
impl Default for EvalContext<'_> {
    fn default() -> Self {
        Self::new(DEFAULT_UNDEFINED_PLACEHOLDER)
    }
}

impl WildcardCommand {
    /// Renders this command for one item.
    pub fn evaluate(&self, item: &NormalizedItem, ctx: &EvalContext<'_>) -> String {
        let value = match self.kind {
            WildcardKind::Creator => self.creators(item),
            WildcardKind::Year => item.date().year.map(|year| match self.choice("digits") {
                "2" => format!("{:02}", year.rem_euclid(100)),
                _ => format!("{year:04}"),
            }),
            WildcardKind::Month => item.date().month.map(|month| match self.choice("style") {
                "name" => month_name(month),
                "short" => month_name(month).chars().take(3).collect(),
                _ => pad(u32::from(month), self.boolean("pad")),
            }),
            WildcardKind::Day => item.date().day.map(|day| pad(u32::from(day), self.boolean("pad"))),
            WildcardKind::Title => item.title().map(|title| {
                let cased = recase(title, self.choice("case"));
                truncate_chars(&cased, self.integer("length"))
            }),
            WildcardKind::Type => item.item_type().and_then(item_type_label).map(str::to_string),
            WildcardKind::Collection => item.primary_collection(ctx.preferred_collection).and_then(|id| {
                match self.boolean("path") {
                    true => item.collection_path(id).map(|names| {
                        names
                            .iter()
                            .map(|name| name.replace(DIRECTORY_SEPARATOR, DEFAULT_REPLACEMENT))
                            .collect::<Vec<_>>()
                            .join(&DIRECTORY_SEPARATOR.to_string())
                    }),
                    false => item.collection_label(id).map(str::to_string),
                }
            }),
            WildcardKind::Publication => item.publication().map(|p| truncate_chars(p, self.integer("length"))),
            WildcardKind::Text => Some(self.text("value").to_string()),
            WildcardKind::Counter => {
                let position = u64::from(self.integer("start")) + ctx.index as u64;
                Some(format!("{:0width$}", position, width = self.integer("width") as usize))
            },
        };
        value.unwrap_or_else(|| ctx.placeholder.to_string())
    }

    /// Whether a `/` in this command's output separates directories.
    pub fn splits_directories(&self) -> bool {
        self.kind == WildcardKind::Collection && self.boolean("path")
    }

    fn creators(&self, item: &NormalizedItem) -> Option<String> {
        let selected: Vec<&Creator> = item
            .creators()
            .iter()
            .filter(|creator| match self.choice("role") {
                "author" => creator.role == CreatorRole::Author,
                "editor" => creator.role == CreatorRole::Editor,
                _ => true,
            })
            .collect();
        if selected.is_empty() {
            return None;
        }
        let max = self.integer("max") as usize;
        let overflow = max > 0 && selected.len() > max;
        let shown = if overflow { &selected[..max] } else { &selected[..] };
        let style = self.choice("style");
        let mut joined = shown
            .iter()
            .map(|creator| match style {
                "full" => creator.full_name(),
                "initials" => creator.with_initials(),
                _ => creator.last_name().to_string(),
            })
            .collect::<Vec<_>>()
            .join(self.text("separator"));
        if overflow {
            joined.push_str(self.text("others"));
        }
        Some(joined)
    }
}

fn pad(n: u32, pad: bool) -> String {
    match pad {
        true => format!("{n:02}"),
        false => n.to_string(),
    }
}

fn month_name(month: u8) -> String {
    Month::try_from(month).map(|m| m.to_string()).unwrap_or_default()
}

fn truncate_chars(s: &str, length: u32) -> String {
    match length {
        0 => s.to_string(),
        n => s.chars().take(n as usize).collect::<String>().trim_end().to_string(),
    }
}

fn recase(title: &str, case: &str) -> String {
    match case {
        "lower" => title.to_lowercase(),
        "upper" => title.to_uppercase(),
        "title" => title.split(' ').map(capitalize).collect::<Vec<_>>().join(" "),
        "sentence" => capitalize(&title.to_lowercase()),
        "slug" => {
            // Quotation marks otherwise turn into stray dashes.
            let marks = [
                '\u{0027}', '\u{0022}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{201E}', '\u{201B}',
                '\u{0060}', '\u{00AB}', '\u{00BB}', '\u{2039}', '\u{203A}',
            ];
            let stripped: String = title.chars().filter(|c| !marks.contains(c)).collect();
            slugify!(&stripped)
        },
        _ => title.to_string(),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
