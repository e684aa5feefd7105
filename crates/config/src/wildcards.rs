//! Editing custom wildcard groups.
//!
//! A custom wildcard is a named group of commands that a template references
//! like a built-in (`%short%`). The groups live in the preference store under
//! [`CUSTOM_WILDCARDS_KEY`] as JSON text: a map from group key to an array of
//! canonical command strings. Every edit reads the current map, changes it,
//! and writes it back.

use crate::error::{ErrorKind, Result};
use crate::store::{PreferenceStore, PreferenceStoreExt};
use reshelf_template::{ColumnData, CustomWildcards, WildcardCommand};
use tracing::debug;

/// Preference key holding every custom wildcard group.
pub const CUSTOM_WILDCARDS_KEY: &str = "cwc_commands";

/// Store-backed editor for custom wildcard groups.
pub struct WildcardListEditor<'a> {
    store: &'a dyn PreferenceStore,
}
impl<'a> WildcardListEditor<'a> {
    pub fn new(store: &'a dyn PreferenceStore) -> Self {
        Self { store }
    }

    /// Every group currently stored.
    pub fn load(&self) -> Result<CustomWildcards> {
        Ok(self.store.get_json(CUSTOM_WILDCARDS_KEY)?.unwrap_or_default())
    }

    fn save(&self, groups: &CustomWildcards) -> Result<()> {
        self.store.set_json(CUSTOM_WILDCARDS_KEY, groups)
    }

    /// Commands of one group, in evaluation order.
    pub fn commands(&self, group: &str) -> Result<Vec<WildcardCommand>> {
        let mut groups = self.load()?;
        let commands = groups.remove(group).ok_or_else(|| ErrorKind::UnknownGroup(group.to_string()))?;
        Ok(commands)
    }

    /// Rows for the list editor: canonical text and a description per command.
    pub fn column_data(&self, group: &str) -> Result<Vec<ColumnData>> {
        Ok(self.commands(group)?.iter().map(WildcardCommand::column_data).collect())
    }

    /// Adds `command` at the end of `group`, creating the group if needed.
    pub fn append(&self, group: &str, command: WildcardCommand) -> Result<()> {
        let mut groups = self.load()?;
        groups.entry(group.to_string()).or_default().push(command);
        self.save(&groups)
    }

    /// Replaces the command at `index`.
    pub fn replace(&self, group: &str, index: usize, command: WildcardCommand) -> Result<()> {
        self.edit(group, |commands| {
            let slot = commands.get_mut(index).ok_or_else(|| out_of_range(group, index))?;
            *slot = command;
            Ok(())
        })
    }

    /// Swaps the command at `index` with the one before it.
    ///
    /// Returns the command's new index. The first command stays put.
    pub fn move_up(&self, group: &str, index: usize) -> Result<usize> {
        self.edit(group, |commands| {
            check_index(commands, group, index)?;
            if index == 0 {
                return Ok(0);
            }
            commands.swap(index - 1, index);
            Ok(index - 1)
        })
    }

    /// Swaps the command at `index` with the one after it.
    ///
    /// Returns the command's new index. The last command stays put.
    pub fn move_down(&self, group: &str, index: usize) -> Result<usize> {
        self.edit(group, |commands| {
            check_index(commands, group, index)?;
            if index + 1 == commands.len() {
                return Ok(index);
            }
            commands.swap(index, index + 1);
            Ok(index + 1)
        })
    }

    /// Removes and returns the command at `index`. The group survives even
    /// when it becomes empty.
    pub fn remove(&self, group: &str, index: usize) -> Result<WildcardCommand> {
        self.edit(group, |commands| {
            check_index(commands, group, index)?;
            Ok(commands.remove(index))
        })
    }

    /// Deletes a whole group.
    pub fn remove_group(&self, group: &str) -> Result<Vec<WildcardCommand>> {
        let mut groups = self.load()?;
        let removed = groups.remove(group).ok_or_else(|| ErrorKind::UnknownGroup(group.to_string()))?;
        self.save(&groups)?;
        Ok(removed)
    }

    fn edit<T>(&self, group: &str, f: impl FnOnce(&mut Vec<WildcardCommand>) -> Result<T>) -> Result<T> {
        let mut groups = self.load()?;
        let commands = groups.get_mut(group).ok_or_else(|| ErrorKind::UnknownGroup(group.to_string()))?;
        let out = f(commands)?;
        debug!(group, len = commands.len(), "custom wildcard group edited");
        self.save(&groups)?;
        Ok(out)
    }
}

fn out_of_range(group: &str, index: usize) -> ErrorKind {
    ErrorKind::IndexOutOfRange { group: group.to_string(), index }
}

fn check_index(commands: &[WildcardCommand], group: &str, index: usize) -> Result<()> {
    if index >= commands.len() {
        exn::bail!(out_of_range(group, index));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryPreferenceStore;
    use rstest::rstest;
    use serde_json::json;

    fn cmd(text: &str) -> WildcardCommand {
        text.parse().unwrap()
    }

    fn names(editor: &WildcardListEditor<'_>, group: &str) -> Vec<String> {
        editor.commands(group).unwrap().iter().map(ToString::to_string).collect()
    }

    fn seeded() -> MemoryPreferenceStore {
        MemoryPreferenceStore::with_values([(CUSTOM_WILDCARDS_KEY, json!(r#"{"g":["year","month","day"]}"#))])
    }

    #[test]
    fn test_append_creates_group_and_persists_text() {
        let store = MemoryPreferenceStore::new();
        let editor = WildcardListEditor::new(&store);
        editor.append("short", cmd("creator(author, 1)")).unwrap();
        editor.append("short", cmd("year(2)")).unwrap();
        assert_eq!(
            store.get(CUSTOM_WILDCARDS_KEY).unwrap(),
            Some(json!(r#"{"short":["creator(author, 1)","year(2)"]}"#))
        );
    }

    #[test]
    fn test_replace() {
        let store = seeded();
        let editor = WildcardListEditor::new(&store);
        editor.replace("g", 1, cmd("month(name)")).unwrap();
        assert_eq!(names(&editor, "g"), ["year", "month(name)", "day"]);
    }

    #[rstest]
    #[case::middle(1, 0, ["month", "year", "day"])]
    #[case::first_is_noop(0, 0, ["year", "month", "day"])]
    fn test_move_up(#[case] index: usize, #[case] new_index: usize, #[case] expected: [&str; 3]) {
        let store = seeded();
        let editor = WildcardListEditor::new(&store);
        assert_eq!(editor.move_up("g", index).unwrap(), new_index);
        assert_eq!(names(&editor, "g"), expected);
    }

    #[rstest]
    #[case::middle(1, 2, ["year", "day", "month"])]
    #[case::last_is_noop(2, 2, ["year", "month", "day"])]
    fn test_move_down(#[case] index: usize, #[case] new_index: usize, #[case] expected: [&str; 3]) {
        let store = seeded();
        let editor = WildcardListEditor::new(&store);
        assert_eq!(editor.move_down("g", index).unwrap(), new_index);
        assert_eq!(names(&editor, "g"), expected);
    }

    #[test]
    fn test_remove_keeps_empty_group() {
        let store = MemoryPreferenceStore::with_values([(CUSTOM_WILDCARDS_KEY, json!(r#"{"g":["year"]}"#))]);
        let editor = WildcardListEditor::new(&store);
        assert_eq!(editor.remove("g", 0).unwrap().to_string(), "year");
        assert!(editor.commands("g").unwrap().is_empty());
        editor.remove_group("g").unwrap();
        assert!(editor.load().unwrap().is_empty());
    }

    #[test]
    fn test_errors() {
        let store = seeded();
        let editor = WildcardListEditor::new(&store);
        let err = editor.move_up("missing", 0).unwrap_err();
        assert_eq!(*err, ErrorKind::UnknownGroup("missing".into()));
        let err = editor.remove("g", 3).unwrap_err();
        assert_eq!(*err, ErrorKind::IndexOutOfRange { group: "g".into(), index: 3 });
        let err = editor.replace("g", 9, cmd("year")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::IndexOutOfRange { index: 9, .. }));
        // Failed edits leave the store alone.
        assert_eq!(names(&editor, "g"), ["year", "month", "day"]);
    }

    #[test]
    fn test_column_data() {
        let store = seeded();
        let editor = WildcardListEditor::new(&store);
        let rows = editor.column_data("g").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].command_name, "year");
        assert!(!rows[0].desc.is_empty());
    }
}
