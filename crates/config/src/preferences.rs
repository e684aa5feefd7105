//! User preferences.
//!
//! Preferences come from two places: a config file merged with the
//! environment (standalone use, via [`Preferences::load`]), or the host's
//! [`PreferenceStore`] (plugin use, via [`Preferences::read_from`]). Both
//! start from [`Preferences::default`], so a missing key always has a value.

use crate::error::{ErrorKind, Result};
use crate::options::{DEFAULT_TAG, FileOperationOptions};
use crate::store::{PreferenceStore, PreferenceStoreExt};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use reshelf_template::consts::DEFAULT_UNDEFINED_PLACEHOLDER;
use reshelf_template::{CollectionId, CustomWildcards};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix of environment variables overriding preferences.
pub const ENV_PREFIX: &str = "RESHELF_";

/// Preferences stored as JSON text rather than plain values.
const JSON_TEXT_KEYS: &[&str] = &["allowed_fileext", "cwc_commands"];

/// What the default action does with attachment files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileBehavior {
    #[default]
    Move,
    Copy,
}

/// Persisted user preferences.
///
/// Field names double as preference-store keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Destination root for moved/copied files.
    pub dst_dir: Option<PathBuf>,
    pub file_behavior: FileBehavior,
    pub enable_subdir_move: bool,
    pub subdirectory_string: String,
    pub rename_title: bool,
    pub auto_rename_file: bool,
    /// An empty list allows every extension.
    pub allowed_fileext: Vec<String>,
    pub undefined_str: String,
    pub copy_group_libraries: bool,
    pub cwc_commands: CustomWildcards,
    pub add_tag: bool,
    pub tag_str: String,
    /// Directory scanned by "attach last modified file".
    pub attach_search_dir: Option<PathBuf>,
    pub prune_empty_dirs: bool,
}
impl Default for Preferences {
    fn default() -> Self {
        Self {
            dst_dir: None,
            file_behavior: FileBehavior::default(),
            enable_subdir_move: false,
            subdirectory_string: String::new(),
            rename_title: true,
            auto_rename_file: true,
            allowed_fileext: Vec::new(),
            undefined_str: DEFAULT_UNDEFINED_PLACEHOLDER.to_string(),
            copy_group_libraries: false,
            cwc_commands: CustomWildcards::new(),
            add_tag: true,
            tag_str: DEFAULT_TAG.to_string(),
            attach_search_dir: None,
            prune_empty_dirs: true,
        }
    }
}

impl Preferences {
    /// Default config file location (`<config dir>/reshelf/config.toml`).
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "reshelf").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Loads defaults, the default config file if it exists, then `RESHELF_*`
    /// environment variables.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.is_file() => Self::load_from(&path),
            _ => Self::extract(Self::figment()),
        }
    }

    /// Like [`load`](Self::load), but with an explicit config file.
    ///
    /// The format follows the extension (`.json`, `.yaml`/`.yml`, anything
    /// else is TOML).
    pub fn load_from(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading preferences");
        let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
        let figment = Figment::from(Serialized::defaults(Self::default()));
        let figment = match extension.as_deref() {
            Some("json") => figment.merge(Json::file(path)),
            Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
            _ => figment.merge(Toml::file(path)),
        };
        Self::extract(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default())).merge(Env::prefixed(ENV_PREFIX))
    }

    fn extract(figment: Figment) -> Result<Self> {
        let preferences = figment.extract().or_raise(|| ErrorKind::Load)?;
        Ok(preferences)
    }

    /// Reads every preference from the host store.
    ///
    /// Keys the store doesn't have (or holds as `null`) keep their default.
    pub fn read_from(store: &dyn PreferenceStore) -> Result<Self> {
        let mut values = Map::new();
        for key in Self::keys() {
            let value = match JSON_TEXT_KEYS.contains(&key.as_str()) {
                true => store.get_json::<Value>(&key)?,
                false => store.get(&key)?,
            };
            if let Some(value) = value.filter(|value| !value.is_null()) {
                values.insert(key, value);
            }
        }
        let figment = Figment::from(Serialized::defaults(Self::default())).merge(Serialized::defaults(values));
        Self::extract(figment)
    }

    /// Writes every preference to the host store.
    pub fn write_to(&self, store: &dyn PreferenceStore) -> Result<()> {
        for (key, value) in self.to_map()? {
            match JSON_TEXT_KEYS.contains(&key.as_str()) {
                true => store.set_json(&key, &value)?,
                false => store.set(&key, value)?,
            }
        }
        Ok(())
    }

    /// Per-invocation options derived from these preferences.
    pub fn base_options(&self, preferred_collection: Option<CollectionId>) -> FileOperationOptions {
        let allowed_extensions = match self.allowed_fileext.is_empty() {
            true => None,
            false => Some(
                self.allowed_fileext
                    .iter()
                    .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
                    .collect(),
            ),
        };
        FileOperationOptions {
            into_subfolder: self.enable_subdir_move,
            subdir_template: self.subdirectory_string.clone(),
            allowed_extensions,
            preferred_collection,
            undefined_placeholder: self.undefined_str.clone(),
            custom_wildcards: self.cwc_commands.clone(),
            add_tag: self.add_tag,
            tag_text: self.tag_str.clone(),
            rename_file: self.auto_rename_file,
            rename_title: self.rename_title,
            prune_empty_dirs: self.prune_empty_dirs,
            allow_group_libraries: self.copy_group_libraries,
            ignore_linked_only: false,
        }
    }

    fn to_map(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self).or_raise(|| ErrorKind::Load)? {
            Value::Object(map) => Ok(map),
            _ => exn::bail!(ErrorKind::Load),
        }
    }

    fn keys() -> Vec<String> {
        Self::default().to_map().map(|map| map.into_iter().map(|(key, _)| key).collect()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryPreferenceStore;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let prefs = Preferences::default();
        assert_eq!(prefs.file_behavior, FileBehavior::Move);
        assert!(prefs.rename_title);
        assert!(prefs.auto_rename_file);
        assert_eq!(prefs.undefined_str, "undefined");
        assert_eq!(prefs.tag_str, "reshelf");
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
dst_dir = "/library"
file_behavior = "copy"
enable_subdir_move = true
subdirectory_string = "%creator%/%year%"
allowed_fileext = ["pdf"]

[cwc_commands]
short = ["creator(author, 1)", "year(2)"]
"#
        )
        .unwrap();
        let prefs = Preferences::load_from(file.path()).unwrap();
        assert_eq!(prefs.dst_dir, Some(PathBuf::from("/library")));
        assert_eq!(prefs.file_behavior, FileBehavior::Copy);
        assert!(prefs.enable_subdir_move);
        assert_eq!(prefs.subdirectory_string, "%creator%/%year%");
        assert_eq!(prefs.cwc_commands["short"].len(), 2);
        // Untouched keys keep their defaults.
        assert!(prefs.add_tag);
    }

    #[test]
    fn test_load_from_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"tag_str": "filed", "add_tag": false}}"#).unwrap();
        let prefs = Preferences::load_from(file.path()).unwrap();
        assert_eq!(prefs.tag_str, "filed");
        assert!(!prefs.add_tag);
    }

    #[test]
    fn test_load_from_rejects_bad_command() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[cwc_commands]\nbad = [\"nonsense(\"]").unwrap();
        let err = Preferences::load_from(file.path()).unwrap_err();
        assert_eq!(*err, ErrorKind::Load);
    }

    #[test]
    fn test_store_round_trip() {
        let store = MemoryPreferenceStore::new();
        let mut prefs = Preferences::default();
        prefs.dst_dir = Some(PathBuf::from("/library"));
        prefs.allowed_fileext = vec!["pdf".into(), "epub".into()];
        prefs.cwc_commands.insert("y".into(), vec!["year(2)".parse().unwrap()]);
        prefs.write_to(&store).unwrap();

        // List and map preferences are stored as JSON text.
        assert_eq!(store.get("allowed_fileext").unwrap(), Some(json!(r#"["pdf","epub"]"#)));
        assert_eq!(store.get("cwc_commands").unwrap(), Some(json!(r#"{"y":["year(2)"]}"#)));

        assert_eq!(Preferences::read_from(&store).unwrap(), prefs);
    }

    #[test]
    fn test_read_from_partial_store() {
        let store = MemoryPreferenceStore::with_values([
            ("file_behavior", json!("copy")),
            ("dst_dir", json!(null)),
            ("allowed_fileext", json!(r#"["PDF"]"#)),
        ]);
        let prefs = Preferences::read_from(&store).unwrap();
        assert_eq!(prefs.file_behavior, FileBehavior::Copy);
        assert_eq!(prefs.dst_dir, None);
        assert_eq!(prefs.allowed_fileext, ["PDF"]);
        assert!(prefs.rename_title);
    }

    #[test]
    fn test_read_from_rejects_raw_list() {
        let store = MemoryPreferenceStore::with_values([("allowed_fileext", json!(["pdf"]))]);
        let err = Preferences::read_from(&store).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPreference { key, .. } if key == "allowed_fileext"));
    }

    #[test]
    fn test_base_options() {
        let prefs = Preferences {
            enable_subdir_move: true,
            subdirectory_string: "%year%".into(),
            allowed_fileext: vec![".PDF".into()],
            copy_group_libraries: true,
            auto_rename_file: false,
            ..Default::default()
        };
        let options = prefs.base_options(Some(7));
        assert!(options.into_subfolder);
        assert_eq!(options.subdir_template, "%year%");
        assert!(options.allows_extension(Some("pdf")));
        assert!(!options.allows_extension(Some("epub")));
        assert_eq!(options.preferred_collection, Some(7));
        assert!(options.allow_group_libraries);
        assert!(!options.rename_file);
        assert!(!options.ignore_linked_only);

        let unrestricted = Preferences::default().base_options(None);
        assert_eq!(unrestricted.allowed_extensions, None);
    }
}
