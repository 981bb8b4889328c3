//! Delimiter-addressed value storage.

use crate::value::{Table, Value};
use crate::Error;

/// Path separator used unless a tree is built with another one.
pub const DEFAULT_DELIMITER: &str = ".";

/// A hierarchical key/value store addressed by delimited paths.
///
/// The empty path `""` addresses the root table. Every other path must
/// consist of non-empty segments, so `".a"`, `"a."` and `"a..b"` are invalid.
/// Lookups through a scalar yield nothing rather than an error.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    root: Value,
    delimiter: String,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Self::with_delimiter(DEFAULT_DELIMITER)
    }

    /// Creates an empty tree with a custom path separator.
    pub fn with_delimiter(delimiter: impl Into<String>) -> Self {
        let delimiter = delimiter.into();
        assert!(!delimiter.is_empty(), "delimiter must not be empty");
        Self {
            root: Value::Table(Table::new()),
            delimiter,
        }
    }

    /// Creates a tree holding `root`.
    pub fn from_table(root: Table, delimiter: impl Into<String>) -> Self {
        let mut tree = Self::with_delimiter(delimiter);
        tree.root = Value::Table(root);
        tree
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Returns the first segment of `path`, or `""` for the root path.
    pub fn first_segment<'a>(&self, path: &'a str) -> &'a str {
        path.split(self.delimiter.as_str()).next().unwrap_or("")
    }

    /// Splits a path into segments. The root path yields no segments.
    pub fn split<'a>(&self, path: &'a str) -> Result<Vec<&'a str>, Error> {
        if path.is_empty() {
            return Ok(Vec::new());
        }
        let segments: Vec<&str> = path.split(self.delimiter.as_str()).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(Error::InvalidKey(path.to_string()));
        }
        Ok(segments)
    }

    /// Returns the node at `path`. Numeric segments index into arrays.
    pub fn get_node(&self, path: &str) -> Option<&Value> {
        let segments = self.split(path).ok()?;
        let mut current = &self.root;
        for segment in segments {
            current = match current {
                Value::Table(table) => table.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Returns `true` if a node exists at `path`, including a `Null` node.
    pub fn has_node(&self, path: &str) -> bool {
        self.get_node(path).is_some()
    }

    /// Creates or replaces the node at `path`.
    ///
    /// Missing intermediate tables are created and scalars on the way are
    /// replaced by tables. At the root only a table is accepted.
    pub fn add_node(&mut self, path: &str, value: impl Into<Value>) -> Result<(), Error> {
        let value = value.into();
        let segments = self.split(path)?;

        if segments.is_empty() {
            if !matches!(value, Value::Table(_)) {
                return Err(Error::InvalidKey(path.to_string()));
            }
            self.root = value;
            return Ok(());
        }

        if let Value::Table(root) = &mut self.root {
            insert_at(root, &segments, value);
        }
        Ok(())
    }

    /// Removes the node at `path`, reporting whether anything was removed.
    ///
    /// Deleting the root path empties the tree.
    pub fn delete_node(&mut self, path: &str) -> bool {
        let Ok(segments) = self.split(path) else {
            return false;
        };
        let Value::Table(root) = &mut self.root else {
            return false;
        };

        if segments.is_empty() {
            let had_nodes = !root.is_empty();
            root.clear();
            return had_nodes;
        }
        remove_at(root, &segments)
    }
}

fn insert_at(table: &mut Table, path: &[&str], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        return;
    };

    if rest.is_empty() {
        table.insert(first.to_string(), value);
        return;
    }

    if !matches!(table.get(*first), Some(Value::Table(_))) {
        table.insert(first.to_string(), Value::Table(Table::new()));
    }

    if let Some(Value::Table(nested)) = table.get_mut(*first) {
        insert_at(nested, rest, value);
    }
}

fn remove_at(table: &mut Table, path: &[&str]) -> bool {
    match path.split_first() {
        None => false,
        Some((first, [])) => table.remove(*first).is_some(),
        Some((first, rest)) => match table.get_mut(*first) {
            Some(Value::Table(nested)) => remove_at(nested, rest),
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tree {
        let mut tree = Tree::new();
        tree.add_node("db.auth.host", "localhost").unwrap();
        tree.add_node("db.auth.port", 3306).unwrap();
        tree
    }

    #[test]
    fn test_add_and_get_nested() {
        let tree = sample();
        assert_eq!(tree.get_node("db.auth.host"), Some(&Value::from("localhost")));
        assert_eq!(tree.get_node("db.auth.port"), Some(&Value::Integer(3306)));
        assert!(tree.get_node("db.auth").unwrap().as_table().is_some());
    }

    #[test]
    fn test_root_path_addresses_whole_tree() {
        let tree = sample();
        let root = tree.get_node("").unwrap().as_table().unwrap();
        assert!(root.contains_key("db"));
    }

    #[test]
    fn test_lookup_through_scalar_is_absent() {
        let tree = sample();
        assert_eq!(tree.get_node("db.auth.host.inner"), None);
        assert!(!tree.has_node("db.auth.host.inner"));
    }

    #[test]
    fn test_paths_are_case_sensitive() {
        let tree = sample();
        assert!(tree.has_node("db.auth.host"));
        assert!(!tree.has_node("DB.auth.host"));
    }

    #[test]
    fn test_empty_segments_are_invalid() {
        let mut tree = sample();
        assert_eq!(tree.get_node(".db"), None);
        assert!(matches!(tree.add_node(".db", 1), Err(Error::InvalidKey(_))));
        assert!(matches!(tree.add_node("db..x", 1), Err(Error::InvalidKey(_))));
        assert!(!tree.delete_node("db."));
    }

    #[test]
    fn test_null_node_counts_as_present() {
        let mut tree = Tree::new();
        tree.add_node("a.b", Value::Null).unwrap();
        assert!(tree.has_node("a.b"));
        assert_eq!(tree.get_node("a.b"), Some(&Value::Null));
    }

    #[test]
    fn test_overwrite_scalar_with_table_and_back() {
        let mut tree = sample();
        tree.add_node("db.auth.host.primary", "p1").unwrap();
        assert_eq!(tree.get_node("db.auth.host.primary"), Some(&Value::from("p1")));

        tree.add_node("db.auth", "flat").unwrap();
        assert_eq!(tree.get_node("db.auth"), Some(&Value::from("flat")));
        assert!(!tree.has_node("db.auth.port"));
    }

    #[test]
    fn test_delete_node() {
        let mut tree = sample();
        assert!(tree.delete_node("db.auth.port"));
        assert!(!tree.delete_node("db.auth.port"));
        assert!(tree.has_node("db.auth.host"));
        assert!(!tree.delete_node("db.auth.host.deeper"));
    }

    #[test]
    fn test_delete_root_empties_tree() {
        let mut tree = sample();
        assert!(tree.delete_node(""));
        assert!(!tree.has_node("db"));
        assert!(!tree.delete_node(""));
    }

    #[test]
    fn test_root_accepts_only_tables() {
        let mut tree = Tree::new();
        assert!(tree.add_node("", "scalar").is_err());

        let mut table = Table::new();
        table.insert("k".into(), Value::from(1));
        tree.add_node("", table).unwrap();
        assert_eq!(tree.get_node("k"), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_custom_delimiter() {
        let mut tree = Tree::with_delimiter("::");
        tree.add_node("a::b", true).unwrap();
        assert_eq!(tree.get_node("a::b"), Some(&Value::Bool(true)));
        assert_eq!(tree.first_segment("a::b"), "a");
        assert!(!tree.has_node("a.b"));
    }

    #[test]
    fn test_numeric_segment_indexes_arrays() {
        let mut tree = Tree::new();
        tree.add_node("hosts", vec!["a", "b"]).unwrap();
        assert_eq!(tree.get_node("hosts.1"), Some(&Value::from("b")));
        assert_eq!(tree.get_node("hosts.2"), None);
    }
}
