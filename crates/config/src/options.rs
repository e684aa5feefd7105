//! Per-invocation options for the file operation orchestrator.

use reshelf_template::{CollectionId, CustomWildcards};
use reshelf_template::consts::DEFAULT_UNDEFINED_PLACEHOLDER;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Tag added to attachments moved by reshelf.
pub const DEFAULT_TAG: &str = "reshelf";

/// Options for one move/copy/delete batch.
///
/// Built fresh for every invocation, either from [`Default`] or by
/// [`merge`](Self::merge)-ing caller overrides onto the defaults. Never
/// shared between calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOperationOptions {
    /// Place files into a subdirectory computed from `subdir_template`.
    pub into_subfolder: bool,
    pub subdir_template: String,
    /// Lowercase extensions without the dot; `None` allows everything.
    pub allowed_extensions: Option<BTreeSet<String>>,
    /// Collection used by `%collection%` when the item belongs to it.
    pub preferred_collection: Option<CollectionId>,
    /// Output of wildcards whose data is missing.
    pub undefined_placeholder: String,
    pub custom_wildcards: CustomWildcards,
    /// Tag moved attachments with `tag_text`.
    pub add_tag: bool,
    pub tag_text: String,
    /// Use the host's renamed base name for attachments that have a parent item.
    pub rename_file: bool,
    /// Set a moved attachment's title to its new file name.
    pub rename_title: bool,
    /// After deleting, remove directories left holding only OS noise files.
    pub prune_empty_dirs: bool,
    /// Also process attachments outside the user's own library (copy only).
    pub allow_group_libraries: bool,
    /// Only move host-managed (imported) attachments, never linked files.
    pub ignore_linked_only: bool,
}
impl Default for FileOperationOptions {
    fn default() -> Self {
        Self {
            into_subfolder: false,
            subdir_template: String::new(),
            allowed_extensions: None,
            preferred_collection: None,
            undefined_placeholder: DEFAULT_UNDEFINED_PLACEHOLDER.to_string(),
            custom_wildcards: CustomWildcards::new(),
            add_tag: true,
            tag_text: DEFAULT_TAG.to_string(),
            rename_file: true,
            rename_title: true,
            prune_empty_dirs: true,
            allow_group_libraries: false,
            ignore_linked_only: false,
        }
    }
}
impl FileOperationOptions {
    /// Defaults with `overrides` applied on top.
    pub fn merge(overrides: OptionOverrides) -> Self {
        let defaults = Self::default();
        Self {
            into_subfolder: overrides.into_subfolder.unwrap_or(defaults.into_subfolder),
            subdir_template: overrides.subdir_template.unwrap_or(defaults.subdir_template),
            allowed_extensions: overrides
                .allowed_extensions
                .map(|exts| exts.iter().map(|ext| normalize_extension(ext)).collect())
                .or(defaults.allowed_extensions),
            preferred_collection: overrides.preferred_collection.or(defaults.preferred_collection),
            undefined_placeholder: overrides.undefined_placeholder.unwrap_or(defaults.undefined_placeholder),
            custom_wildcards: overrides.custom_wildcards.unwrap_or(defaults.custom_wildcards),
            add_tag: overrides.add_tag.unwrap_or(defaults.add_tag),
            tag_text: overrides.tag_text.unwrap_or(defaults.tag_text),
            rename_file: overrides.rename_file.unwrap_or(defaults.rename_file),
            rename_title: overrides.rename_title.unwrap_or(defaults.rename_title),
            prune_empty_dirs: overrides.prune_empty_dirs.unwrap_or(defaults.prune_empty_dirs),
            allow_group_libraries: overrides.allow_group_libraries.unwrap_or(defaults.allow_group_libraries),
            ignore_linked_only: overrides.ignore_linked_only.unwrap_or(defaults.ignore_linked_only),
        }
    }

    /// Whether a file with this extension may be processed.
    ///
    /// Comparison is case-insensitive. A file without an extension only
    /// passes when every extension is allowed.
    pub fn allows_extension(&self, extension: Option<&str>) -> bool {
        match (&self.allowed_extensions, extension) {
            (None, _) => true,
            (Some(allowed), Some(ext)) => allowed.contains(&normalize_extension(ext)),
            (Some(_), None) => false,
        }
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

/// Caller-supplied option overrides; `None` keeps the default.
///
/// Deserializable, so a host can hand over a JSON object with any subset of
/// the fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionOverrides {
    pub into_subfolder: Option<bool>,
    pub subdir_template: Option<String>,
    pub allowed_extensions: Option<Vec<String>>,
    pub preferred_collection: Option<CollectionId>,
    pub undefined_placeholder: Option<String>,
    pub custom_wildcards: Option<CustomWildcards>,
    pub add_tag: Option<bool>,
    pub tag_text: Option<String>,
    pub rename_file: Option<bool>,
    pub rename_title: Option<bool>,
    pub prune_empty_dirs: Option<bool>,
    pub allow_group_libraries: Option<bool>,
    pub ignore_linked_only: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let options = FileOperationOptions::default();
        assert!(!options.into_subfolder);
        assert_eq!(options.undefined_placeholder, "undefined");
        assert_eq!(options.allowed_extensions, None);
        assert!(options.add_tag);
        assert_eq!(options.tag_text, DEFAULT_TAG);
        assert!(options.prune_empty_dirs);
        assert!(!options.allow_group_libraries);
    }

    #[test]
    fn test_merge_keeps_unset_defaults() {
        let options = FileOperationOptions::merge(OptionOverrides {
            into_subfolder: Some(true),
            subdir_template: Some("%year%".into()),
            ..Default::default()
        });
        assert!(options.into_subfolder);
        assert_eq!(options.subdir_template, "%year%");
        assert_eq!(options.tag_text, DEFAULT_TAG);
        assert!(options.rename_title);
    }

    #[test]
    fn test_merge_from_json() {
        let overrides: OptionOverrides =
            serde_json::from_str(r#"{"allowed_extensions": ["PDF", ".Epub"], "custom_wildcards": {"a": ["year(2)"]}}"#)
                .unwrap();
        let options = FileOperationOptions::merge(overrides);
        assert_eq!(options.allowed_extensions, Some(BTreeSet::from(["pdf".to_string(), "epub".to_string()])));
        assert_eq!(options.custom_wildcards["a"][0].to_string(), "year(2)");
    }

    #[rstest]
    #[case(None, Some("pdf"), true)]
    #[case(None, None, true)]
    #[case(Some(vec!["pdf"]), Some("PDF"), true)]
    #[case(Some(vec!["PDF"]), Some("pdf"), true)]
    #[case(Some(vec!["pdf"]), Some("epub"), false)]
    #[case(Some(vec!["pdf"]), None, false)]
    #[case(Some(vec![]), Some("pdf"), false)]
    fn test_allows_extension(#[case] allowed: Option<Vec<&str>>, #[case] ext: Option<&str>, #[case] expected: bool) {
        let options = FileOperationOptions::merge(OptionOverrides {
            allowed_extensions: allowed.map(|exts| exts.into_iter().map(String::from).collect()),
            ..Default::default()
        });
        assert_eq!(options.allows_extension(ext), expected);
    }
}
