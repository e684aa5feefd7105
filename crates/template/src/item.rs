//! Item field model.
//!
//! The host hands over an [`ItemRecord`], a raw projection of a bibliographic
//! item. [`NormalizedItem`] is the read-only, cleaned-up view wildcards are
//! evaluated against. Absence is always `None`; a field that is present but
//! empty stays `Some("")` so that evaluation can tell the two apart.

use crate::consts::{DAY_REGEX, ISO_DATE_REGEX, MONTH_NAME_REGEX, NUMERIC_DATE_REGEX, YEAR_REGEX};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Host identifier of a collection.
pub type CollectionId = u64;
/// Host identifier of a library (the user's own library or a group library).
pub type LibraryId = u64;

/// Deepest collection nesting followed when building a collection path.
/// Guards against parent cycles in host data.
const MAX_COLLECTION_DEPTH: usize = 32;

/// The part a creator played in producing an item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CreatorRole {
    Author,
    Editor,
    Contributor,
    Translator,
    SeriesEditor,
    /// Any role the model doesn't single out, kept verbatim.
    Other(String),
}
impl FromStr for CreatorRole {
    type Err = Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "" | "author" | "bookauthor" => Self::Author,
            "editor" => Self::Editor,
            "contributor" => Self::Contributor,
            "translator" => Self::Translator,
            "serieseditor" => Self::SeriesEditor,
            _ => Self::Other(s.trim().to_string()),
        })
    }
}

/// A person or organisation credited on an item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Creator {
    /// Given name(s); `None` for single-field (institutional) names.
    pub given: Option<String>,
    /// Family name, or the whole name for single-field creators.
    pub family: String,
    pub role: CreatorRole,
}
impl Creator {
    pub fn new(given: impl Into<String>, family: impl Into<String>, role: CreatorRole) -> Self {
        let given = given.into();
        Self {
            given: Some(given).filter(|g| !g.trim().is_empty()),
            family: family.into(),
            role,
        }
    }

    /// A single-field name such as `"World Health Organization"`.
    pub fn single(name: impl Into<String>, role: CreatorRole) -> Self {
        Self { given: None, family: name.into(), role }
    }

    /// Family name only.
    pub fn last_name(&self) -> &str {
        &self.family
    }

    /// Given and family name in the order the name's script expects.
    ///
    /// Names written in a CJK script are rendered family-first without a
    /// space (`"山田太郎"`); everything else is given-first (`"Jane Doe"`).
    pub fn full_name(&self) -> String {
        match &self.given {
            None => self.family.clone(),
            Some(given) if is_cjk(&self.family) => format!("{}{}", self.family, given),
            Some(given) => format!("{} {}", given, self.family),
        }
    }

    /// Family name followed by the initials of every given name
    /// (`"Doe JR"` for Jane Rose Doe).
    pub fn with_initials(&self) -> String {
        let Some(given) = &self.given else {
            return self.family.clone();
        };
        let initials: String = given
            .split(|c: char| c.is_whitespace() || c == '-' || c == '.')
            .filter_map(|part| part.chars().next())
            .flat_map(char::to_uppercase)
            .collect();
        match initials.is_empty() {
            true => self.family.clone(),
            false => format!("{} {}", self.family, initials),
        }
    }
}
impl Display for Creator {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.full_name())
    }
}

fn is_cjk(s: &str) -> bool {
    s.chars().any(|c| {
        matches!(c as u32,
            0x3040..=0x30FF // Hiragana, Katakana
            | 0x3400..=0x4DBF // CJK Extension A
            | 0x4E00..=0x9FFF // CJK Unified Ideographs
            | 0xAC00..=0xD7AF // Hangul Syllables
        )
    })
}

/// A calendar date where any part may be unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PartialDate {
    pub year: Option<i32>,
    pub month: Option<u8>,
    pub day: Option<u8>,
}
impl PartialDate {
    pub fn new(year: Option<i32>, month: Option<u8>, day: Option<u8>) -> Self {
        Self {
            year,
            month: month.filter(|m| (1..=12).contains(m)),
            day: day.filter(|d| (1..=31).contains(d)),
        }
    }

    /// Reads the date formats reference managers commonly store.
    ///
    /// Recognised, in order of precedence: `YYYY-MM[-DD]`, `MM/DD/YYYY`,
    /// free text with an English month name (`"May 3, 2020"`,
    /// `"3 May 2020"`, `"May 2020"`), and finally a bare four-digit year.
    /// Anything unreadable yields an empty date.
    pub fn parse(s: &str) -> Self {
        if let Some(caps) = ISO_DATE_REGEX.captures(s) {
            return Self::new(
                caps.get(1).and_then(|m| m.as_str().parse().ok()),
                caps.get(2).and_then(|m| m.as_str().parse().ok()),
                caps.get(3).and_then(|m| m.as_str().parse().ok()),
            );
        }
        if let Some(caps) = NUMERIC_DATE_REGEX.captures(s) {
            return Self::new(
                caps.get(3).and_then(|m| m.as_str().parse().ok()),
                caps.get(1).and_then(|m| m.as_str().parse().ok()),
                caps.get(2).and_then(|m| m.as_str().parse().ok()),
            );
        }
        let year = YEAR_REGEX.captures(s).and_then(|caps| caps.get(1)).and_then(|m| m.as_str().parse().ok());
        let Some(month) = MONTH_NAME_REGEX.captures(s).and_then(|caps| caps.get(1)) else {
            return Self::new(year, None, None);
        };
        let day = DAY_REGEX
            .captures_iter(s)
            .filter_map(|caps| caps.get(1))
            .filter_map(|m| m.as_str().parse::<u8>().ok())
            .find(|d| (1..=31).contains(d));
        Self::new(year, month_from_name(month.as_str()), day)
    }

    pub fn is_empty(&self) -> bool {
        self.year.is_none() && self.month.is_none() && self.day.is_none()
    }
}

/// Month number of a full English month name or its standard abbreviation.
fn month_from_name(s: &str) -> Option<u8> {
    const MONTHS: [&str; 12] = ["jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec"];
    let lower = s.get(..3)?.to_ascii_lowercase();
    MONTHS.iter().position(|m| *m == lower).and_then(|i| u8::try_from(i + 1).ok())
}

/// A collection (folder) in the host's library tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    pub parent: Option<CollectionId>,
}

/// A creator exactly as the host stores it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatorRecord {
    pub first_name: String,
    pub last_name: String,
    /// Host role identifier (`"author"`, `"editor"`, ...).
    pub creator_type: String,
    /// The whole name lives in `last_name`.
    pub single_field: bool,
}

/// Raw projection of a bibliographic item handed over by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemRecord {
    pub creators: Vec<CreatorRecord>,
    /// Free-form date text.
    pub date: Option<String>,
    pub title: Option<String>,
    /// Host item type identifier (`"journalArticle"`).
    pub item_type: Option<String>,
    /// Journal, book or proceedings title.
    pub publication: Option<String>,
    /// Collections the item is a member of, in host order.
    pub collections: Vec<CollectionId>,
    /// Every collection needed to resolve names and parent chains.
    pub collection_table: Vec<Collection>,
    pub library_id: LibraryId,
    pub file_path: Option<PathBuf>,
}

/// Read-only view of a bibliographic item that templates are evaluated against.
///
/// Recomputed per item for every templating pass and never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedItem {
    creators: Vec<Creator>,
    date: PartialDate,
    title: Option<String>,
    item_type: Option<String>,
    publication: Option<String>,
    collections: Vec<CollectionId>,
    collection_table: BTreeMap<CollectionId, Collection>,
    library_id: LibraryId,
    file_path: Option<PathBuf>,
}
impl NormalizedItem {
    pub fn from_record(record: &ItemRecord) -> Self {
        let creators = record
            .creators
            .iter()
            .filter_map(|c| {
                let role = c.creator_type.parse().unwrap_or(CreatorRole::Author);
                let last = c.last_name.trim();
                let first = c.first_name.trim();
                match (c.single_field, last.is_empty(), first.is_empty()) {
                    // Nothing to credit.
                    (_, true, true) => None,
                    (true, _, _) | (false, false, true) => Some(Creator::single(last, role)),
                    // Only a given name: treat it as the whole name.
                    (false, true, false) => Some(Creator::single(first, role)),
                    (false, false, false) => Some(Creator::new(first, last, role)),
                }
            })
            .collect();
        Self {
            creators,
            date: record.date.as_deref().map(PartialDate::parse).unwrap_or_default(),
            title: record.title.as_deref().map(|t| t.trim().to_string()),
            item_type: record.item_type.as_deref().map(|t| t.trim().to_string()),
            publication: record.publication.as_deref().map(|p| p.trim().to_string()),
            collections: record.collections.clone(),
            collection_table: record.collection_table.iter().map(|c| (c.id, c.clone())).collect(),
            library_id: record.library_id,
            file_path: record.file_path.clone(),
        }
    }

    pub fn creators(&self) -> &[Creator] {
        &self.creators
    }

    pub fn date(&self) -> PartialDate {
        self.date
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn item_type(&self) -> Option<&str> {
        self.item_type.as_deref()
    }

    pub fn publication(&self) -> Option<&str> {
        self.publication.as_deref()
    }

    pub fn collections(&self) -> &[CollectionId] {
        &self.collections
    }

    pub fn library_id(&self) -> LibraryId {
        self.library_id
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// The collection a template should use: `preferred` when the item is a
    /// member of it, otherwise the first membership.
    pub fn primary_collection(&self, preferred: Option<CollectionId>) -> Option<CollectionId> {
        preferred.filter(|id| self.collections.contains(id)).or_else(|| self.collections.first().copied())
    }

    /// Name of a collection, if the host told us about it.
    pub fn collection_label(&self, id: CollectionId) -> Option<&str> {
        self.collection_table.get(&id).map(|c| c.name.as_str())
    }

    /// Names from the root collection down to `id`, e.g. `["Thesis", "Chapter 2"]`.
    ///
    /// Returns `None` if `id` (or any ancestor) is unknown.
    pub fn collection_path(&self, id: CollectionId) -> Option<Vec<&str>> {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(id) = current {
            if names.len() >= MAX_COLLECTION_DEPTH {
                break;
            }
            let collection = self.collection_table.get(&id)?;
            names.push(collection.name.as_str());
            current = collection.parent;
        }
        names.reverse();
        Some(names)
    }
}
impl From<&ItemRecord> for NormalizedItem {
    fn from(record: &ItemRecord) -> Self {
        Self::from_record(record)
    }
}

/// Human label of a host item type identifier.
pub fn item_type_label(id: &str) -> Option<&'static str> {
    Some(match id {
        "artwork" => "Artwork",
        "audioRecording" => "Audio Recording",
        "blogPost" => "Blog Post",
        "book" => "Book",
        "bookSection" => "Book Section",
        "case" => "Case",
        "conferencePaper" => "Conference Paper",
        "dataset" => "Dataset",
        "document" => "Document",
        "email" => "E-mail",
        "encyclopediaArticle" => "Encyclopedia Article",
        "film" => "Film",
        "forumPost" => "Forum Post",
        "journalArticle" => "Journal Article",
        "letter" => "Letter",
        "magazineArticle" => "Magazine Article",
        "manuscript" => "Manuscript",
        "map" => "Map",
        "newspaperArticle" => "Newspaper Article",
        "patent" => "Patent",
        "podcast" => "Podcast",
        "preprint" => "Preprint",
        "presentation" => "Presentation",
        "report" => "Report",
        "software" => "Software",
        "standard" => "Standard",
        "statute" => "Statute",
        "thesis" => "Thesis",
        "videoRecording" => "Video Recording",
        "webpage" => "Web Page",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2020-05-03", PartialDate::new(Some(2020), Some(5), Some(3)))]
    #[case("2020-05", PartialDate::new(Some(2020), Some(5), None))]
    #[case("2020-05-03 2020-05-03", PartialDate::new(Some(2020), Some(5), Some(3)))]
    #[case("05/03/2020", PartialDate::new(Some(2020), Some(5), Some(3)))]
    #[case("May 3, 2020", PartialDate::new(Some(2020), Some(5), Some(3)))]
    #[case("3rd December 1999", PartialDate::new(Some(1999), Some(12), Some(3)))]
    #[case("Sept. 2021", PartialDate::new(Some(2021), Some(9), None))]
    #[case("2019", PartialDate::new(Some(2019), None, None))]
    #[case("Spring 2019", PartialDate::new(Some(2019), None, None))]
    #[case("January 2019", PartialDate::new(Some(2019), Some(1), None))]
    #[case("Decision 2019", PartialDate::new(Some(2019), None, None))]
    #[case("Mayhem, 2019", PartialDate::new(Some(2019), None, None))]
    #[case("Marchioness 4 2019", PartialDate::new(Some(2019), None, None))]
    #[case("n.d.", PartialDate::default())]
    #[case("2020-13-40", PartialDate::new(Some(2020), None, None))]
    fn test_parse_date(#[case] input: &str, #[case] expected: PartialDate) {
        assert_eq!(PartialDate::parse(input), expected);
    }

    #[test]
    fn test_creator_names() {
        let jane = Creator::new("Jane Rose", "Doe", CreatorRole::Author);
        assert_eq!(jane.last_name(), "Doe");
        assert_eq!(jane.full_name(), "Jane Rose Doe");
        assert_eq!(jane.with_initials(), "Doe JR");

        let yamada = Creator::new("太郎", "山田", CreatorRole::Author);
        assert_eq!(yamada.full_name(), "山田太郎");

        let who = Creator::single("World Health Organization", CreatorRole::Author);
        assert_eq!(who.full_name(), "World Health Organization");
        assert_eq!(who.with_initials(), "World Health Organization");
    }

    #[test]
    fn test_from_record_normalizes_creators() {
        let record = ItemRecord {
            creators: vec![
                CreatorRecord {
                    first_name: " Jane ".into(),
                    last_name: "Doe".into(),
                    creator_type: "author".into(),
                    single_field: false,
                },
                CreatorRecord::default(),
                CreatorRecord {
                    first_name: String::new(),
                    last_name: "ACME Corp".into(),
                    creator_type: "editor".into(),
                    single_field: true,
                },
            ],
            ..Default::default()
        };
        let item = NormalizedItem::from_record(&record);
        assert_eq!(item.creators().len(), 2);
        assert_eq!(item.creators()[0], Creator::new("Jane", "Doe", CreatorRole::Author));
        assert_eq!(item.creators()[1], Creator::single("ACME Corp", CreatorRole::Editor));
    }

    #[test]
    fn test_empty_title_is_not_absent() {
        let empty = NormalizedItem::from_record(&ItemRecord { title: Some("   ".into()), ..Default::default() });
        assert_eq!(empty.title(), Some(""));
        let absent = NormalizedItem::from_record(&ItemRecord::default());
        assert_eq!(absent.title(), None);
    }

    #[test]
    fn test_collections() {
        let record = ItemRecord {
            collections: vec![3, 2],
            collection_table: vec![
                Collection { id: 1, name: "Thesis".into(), parent: None },
                Collection { id: 2, name: "Chapter 2".into(), parent: Some(1) },
                Collection { id: 4, name: "Loop".into(), parent: Some(4) },
            ],
            ..Default::default()
        };
        let item = NormalizedItem::from_record(&record);
        assert_eq!(item.primary_collection(Some(2)), Some(2));
        assert_eq!(item.primary_collection(Some(9)), Some(3));
        assert_eq!(item.primary_collection(None), Some(3));
        assert_eq!(item.collection_label(3), None);
        assert_eq!(item.collection_path(2), Some(vec!["Thesis", "Chapter 2"]));
        assert_eq!(item.collection_path(3), None);
        // Cycles are cut off instead of looping forever.
        assert_eq!(item.collection_path(4).map(|p| p.len()), Some(MAX_COLLECTION_DEPTH));
    }

    #[test]
    fn test_item_type_label() {
        assert_eq!(item_type_label("journalArticle"), Some("Journal Article"));
        assert_eq!(item_type_label("spaceship"), None);
    }
}
