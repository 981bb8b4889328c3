//! Directory-based configuration loader.

use std::path::{Path, PathBuf};

use super::reader::{reader_for, Reader};
use super::{deep_merge, Loader, LoaderError};
use crate::value::{Table, Value};

/// Loads groups from `<group>.<ext>` files under a root directory.
///
/// An environment such as `production/host1` adds overlay directories:
/// files are read from the root, then `production/`, then
/// `production/host1/`, and deep-merged in that order so the deepest
/// directory wins.
///
/// ```text
/// config/
///   db.toml                 # base
///   production/
///     db.toml               # overrides base
///     host1/
///       db.toml             # overrides production
/// ```
#[derive(Debug)]
pub struct FileLoader {
    root: PathBuf,
    reader: Box<dyn Reader>,
    search_dirs: Vec<PathBuf>,
}

impl FileLoader {
    /// Creates a loader for files with the given extension (`toml` or `json`).
    ///
    /// Fails if `root` is not a directory, the extension has no reader, or
    /// a directory named by `environment` does not exist.
    pub fn new(
        root: impl AsRef<Path>,
        environment: &str,
        extension: &str,
    ) -> Result<Self, LoaderError> {
        let reader = reader_for(extension)
            .ok_or_else(|| LoaderError::UnsupportedFormat(extension.to_string()))?;
        Self::with_reader(root, environment, reader)
    }

    /// Creates a loader that parses files with a custom reader.
    pub fn with_reader(
        root: impl AsRef<Path>,
        environment: &str,
        reader: Box<dyn Reader>,
    ) -> Result<Self, LoaderError> {
        let root = root.as_ref();
        let root = match std::fs::canonicalize(root) {
            Ok(dir) if dir.is_dir() => dir,
            _ => return Err(LoaderError::RootInvalid(root.to_path_buf())),
        };

        let search_dirs = build_search_dirs(&root, environment)?;
        Ok(Self {
            root,
            reader,
            search_dirs,
        })
    }

    /// Changes the default environment used when `load` gets none.
    pub fn set_environment(&mut self, environment: &str) -> Result<(), LoaderError> {
        self.search_dirs = build_search_dirs(&self.root, environment)?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Files to read for `group`, in merge order.
    fn group_files(&self, group: &str, dirs: &[PathBuf]) -> Result<Vec<PathBuf>, LoaderError> {
        let extension = self.reader.extension();
        let mut files = Vec::new();

        for dir in dirs {
            if group.is_empty() {
                let entries = std::fs::read_dir(dir).map_err(|e| LoaderError::ReadError {
                    path: dir.clone(),
                    source: e,
                })?;
                let mut found: Vec<PathBuf> = entries
                    .filter_map(|entry| entry.ok().map(|e| e.path()))
                    .filter(|path| {
                        path.is_file() && path.extension().is_some_and(|ext| ext == extension)
                    })
                    .collect();
                found.sort();
                files.extend(found);
            } else {
                let file = dir.join(format!("{group}.{extension}"));
                if file.is_file() {
                    files.push(file);
                }
            }
        }

        Ok(files)
    }
}

impl Loader for FileLoader {
    fn load(&self, group: &str, environment: Option<&str>) -> Result<Table, LoaderError> {
        // Group names never address paths outside the search directories.
        if group.contains(['/', '\\']) || group == ".." {
            return Ok(Table::new());
        }

        let dirs = match environment {
            Some(env) => build_search_dirs(&self.root, env)?,
            None => self.search_dirs.clone(),
        };

        let mut data = Table::new();
        for file in self.group_files(group, &dirs)? {
            let Some(name) = file.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let parsed = self.reader.read(&file)?;
            let entry = data
                .entry(name.to_string())
                .or_insert_with(|| Value::Table(Table::new()));
            if let Value::Table(existing) = entry {
                deep_merge(existing, parsed);
            }
        }

        Ok(data)
    }
}

fn build_search_dirs(root: &Path, environment: &str) -> Result<Vec<PathBuf>, LoaderError> {
    let mut dirs = vec![root.to_path_buf()];
    let mut path = root.to_path_buf();

    for segment in environment.split(['/', '\\']).filter(|s| !s.is_empty()) {
        path = path.join(segment);
        if !path.is_dir() {
            return Err(LoaderError::UnknownEnvironment(environment.to_string()));
        }
        dirs.push(path.clone());
    }

    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("production/host1")).unwrap();
        fs::write(
            root.join("db.toml"),
            "[auth]\nuser = \"www\"\nhost = \"localhost\"\nport = 3306\n",
        )
        .unwrap();
        fs::write(
            root.join("production/db.toml"),
            "[auth]\nhost = \"dbhost\"\nport = 3506\n",
        )
        .unwrap();
        fs::write(
            root.join("production/host1/db.toml"),
            "[auth]\nuser = \"bingo\"\npass = \"nopass\"\n",
        )
        .unwrap();
        fs::write(root.join("logger.toml"), "[system]\nlevel = \"critical\"\n").unwrap();
        dir
    }

    fn auth(data: &Table) -> &Table {
        data["db"].as_table().unwrap()["auth"].as_table().unwrap()
    }

    #[test]
    fn test_loads_single_group_from_root() {
        let dir = fixture();
        let loader = FileLoader::new(dir.path(), "", "toml").unwrap();

        let data = loader.load("db", None).unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(auth(&data)["host"], Value::from("localhost"));
    }

    #[test]
    fn test_deepest_environment_wins() {
        let dir = fixture();
        let loader = FileLoader::new(dir.path(), "production/host1", "toml").unwrap();

        let data = loader.load("db", None).unwrap();
        let auth = auth(&data);
        assert_eq!(auth["user"], Value::from("bingo"));
        assert_eq!(auth["pass"], Value::from("nopass"));
        assert_eq!(auth["host"], Value::from("dbhost"));
        assert_eq!(auth["port"], Value::Integer(3506));
    }

    #[test]
    fn test_environment_override_per_call() {
        let dir = fixture();
        let loader = FileLoader::new(dir.path(), "", "toml").unwrap();

        let data = loader.load("db", Some("production")).unwrap();
        assert_eq!(auth(&data)["host"], Value::from("dbhost"));
        assert_eq!(auth(&data)["user"], Value::from("www"));
    }

    #[test]
    fn test_empty_group_loads_everything() {
        let dir = fixture();
        let loader = FileLoader::new(dir.path(), "", "toml").unwrap();

        let data = loader.load("", None).unwrap();
        assert!(data.contains_key("db"));
        assert!(data.contains_key("logger"));
    }

    #[test]
    fn test_missing_group_is_empty() {
        let dir = fixture();
        let loader = FileLoader::new(dir.path(), "", "toml").unwrap();
        assert!(loader.load("cache", None).unwrap().is_empty());
        assert!(loader.load("../db", None).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_root() {
        let result = FileLoader::new("/nonexistent/config/root", "", "toml");
        assert!(matches!(result, Err(LoaderError::RootInvalid(_))));
    }

    #[test]
    fn test_unknown_environment() {
        let dir = fixture();
        let result = FileLoader::new(dir.path(), "staging", "toml");
        assert!(matches!(result, Err(LoaderError::UnknownEnvironment(_))));

        let loader = FileLoader::new(dir.path(), "", "toml").unwrap();
        let result = loader.load("db", Some("production/host9"));
        assert!(matches!(result, Err(LoaderError::UnknownEnvironment(_))));
    }

    #[test]
    fn test_unsupported_format() {
        let dir = fixture();
        let result = FileLoader::new(dir.path(), "", "php");
        assert!(matches!(result, Err(LoaderError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_set_environment() {
        let dir = fixture();
        let mut loader = FileLoader::new(dir.path(), "", "toml").unwrap();
        loader.set_environment("production").unwrap();

        let data = loader.load("db", None).unwrap();
        assert_eq!(auth(&data)["port"], Value::Integer(3506));
    }

    #[test]
    fn test_parse_failure_surfaces() {
        let dir = fixture();
        fs::write(dir.path().join("broken.toml"), "oops = ").unwrap();
        let loader = FileLoader::new(dir.path(), "", "toml").unwrap();

        let result = loader.load("broken", None);
        assert!(matches!(result, Err(LoaderError::TomlParse { .. })));
    }
}
