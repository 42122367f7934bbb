//! SAS-103: Dataset registry and library references.
//!
//! Datasets live in libraries keyed by library reference (libref). The
//! default library (`WORK`) always exists and has no backing path. A
//! library assigned with LIBNAME points at a directory; datasets requested
//! from it that are not yet in memory are loaded from `<path>/<name>.csv`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::InterpreterConfig;
use crate::dataset::{Dataset, Row};
use crate::error::RegistryError;
use crate::value::Value;

// ---------------------------------------------------------------------------
// Library
// ---------------------------------------------------------------------------

/// A library: an optional directory plus the datasets loaded or created in it.
#[derive(Debug, Clone, Default)]
pub struct Library {
    /// Directory assigned by LIBNAME (`None` for WORK).
    pub path: Option<PathBuf>,
    datasets: HashMap<String, Dataset>,
}

impl Library {
    /// Library backed by a directory.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            datasets: HashMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Registry of libraries and their datasets.
#[derive(Debug, Clone)]
pub struct DatasetRegistry {
    libraries: HashMap<String, Library>,
    default_library: String,
    delimiter: char,
    current: Option<(String, String)>,
}

impl Default for DatasetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetRegistry {
    /// Registry with the default configuration.
    pub fn new() -> Self {
        Self::with_config(&InterpreterConfig::default())
    }

    /// Registry using the configured default library and delimiter.
    pub fn with_config(config: &InterpreterConfig) -> Self {
        let default_library = config.default_library.to_uppercase();
        let mut libraries = HashMap::new();
        libraries.insert(default_library.clone(), Library::default());
        Self {
            libraries,
            default_library,
            delimiter: config.delimiter,
            current: None,
        }
    }

    /// Normalized library key; an empty libref means the default library.
    fn lib_key(&self, libref: &str) -> String {
        if libref.trim().is_empty() {
            self.default_library.clone()
        } else {
            libref.trim().to_uppercase()
        }
    }

    fn ds_key(name: &str) -> String {
        name.trim().to_lowercase()
    }

    /// Assign a library reference to a directory. Reassigning keeps the
    /// datasets already held in memory.
    pub fn set_libref(&mut self, libref: &str, path: impl Into<PathBuf>) {
        let key = self.lib_key(libref);
        let path = path.into();
        debug!(libref = %key, path = %path.display(), "libref assigned");
        self.libraries
            .entry(key)
            .and_modify(|lib| lib.path = Some(path.clone()))
            .or_insert_with(|| Library::at(path));
    }

    /// Whether the library reference is declared.
    pub fn has_library(&self, libref: &str) -> bool {
        self.libraries.contains_key(&self.lib_key(libref))
    }

    /// Path assigned to a library reference.
    pub fn library_path(&self, libref: &str) -> Option<&Path> {
        self.libraries
            .get(&self.lib_key(libref))
            .and_then(|lib| lib.path.as_deref())
    }

    /// Whether the dataset is already held in memory.
    pub fn contains(&self, libref: &str, name: &str) -> bool {
        self.libraries
            .get(&self.lib_key(libref))
            .is_some_and(|lib| lib.datasets.contains_key(&Self::ds_key(name)))
    }

    /// Get a dataset, creating an empty one if needed, and make it current.
    pub fn get_or_create(&mut self, libref: &str, name: &str) -> Result<&mut Dataset, RegistryError> {
        let lib_key = self.lib_key(libref);
        if !self.libraries.contains_key(&lib_key) {
            return Err(RegistryError::UnknownLibrary {
                libref: libref.to_string(),
            });
        }
        // Prefer the on-disk copy over an empty dataset when one exists.
        if !self.contains(libref, name) {
            self.try_load_from_library(&lib_key, name)?;
        }
        let ds_key = Self::ds_key(name);
        self.current = Some((lib_key.clone(), ds_key.clone()));
        let library = self
            .libraries
            .get_mut(&lib_key)
            .ok_or_else(|| RegistryError::UnknownLibrary {
                libref: libref.to_string(),
            })?;
        Ok(library
            .datasets
            .entry(ds_key)
            .or_insert_with(|| Dataset::new(name.trim())))
    }

    /// Get an existing dataset, loading it from the library directory if it
    /// is not yet in memory.
    pub fn get(&mut self, libref: &str, name: &str) -> Result<&Dataset, RegistryError> {
        self.get_mut(libref, name).map(|ds| &*ds)
    }

    /// Mutable variant of [`get`](Self::get).
    pub fn get_mut(&mut self, libref: &str, name: &str) -> Result<&mut Dataset, RegistryError> {
        let lib_key = self.lib_key(libref);
        if !self.libraries.contains_key(&lib_key) {
            return Err(RegistryError::UnknownLibrary {
                libref: libref.to_string(),
            });
        }
        if !self.contains(libref, name) && !self.try_load_from_library(&lib_key, name)? {
            return Err(RegistryError::DatasetNotFound {
                libref: lib_key,
                name: name.to_string(),
            });
        }
        self.libraries
            .get_mut(&lib_key)
            .and_then(|lib| lib.datasets.get_mut(&Self::ds_key(name)))
            .ok_or_else(|| RegistryError::DatasetNotFound {
                libref: libref.to_string(),
                name: name.to_string(),
            })
    }

    /// The current working dataset (the one most recently created or selected).
    pub fn current(&self) -> Result<&Dataset, RegistryError> {
        let (lib, ds) = self.current.as_ref().ok_or(RegistryError::NoCurrentDataset)?;
        self.libraries
            .get(lib)
            .and_then(|l| l.datasets.get(ds))
            .ok_or(RegistryError::NoCurrentDataset)
    }

    /// Mutable access to the current working dataset.
    pub fn current_mut(&mut self) -> Result<&mut Dataset, RegistryError> {
        let (lib, ds) = self.current.clone().ok_or(RegistryError::NoCurrentDataset)?;
        self.libraries
            .get_mut(&lib)
            .and_then(|l| l.datasets.get_mut(&ds))
            .ok_or(RegistryError::NoCurrentDataset)
    }

    /// Store a dataset, replacing any dataset of the same name.
    pub fn insert(&mut self, libref: &str, dataset: Dataset) -> Result<(), RegistryError> {
        let lib_key = self.lib_key(libref);
        let library = self
            .libraries
            .get_mut(&lib_key)
            .ok_or_else(|| RegistryError::UnknownLibrary {
                libref: libref.to_string(),
            })?;
        let ds_key = Self::ds_key(&dataset.name);
        library.datasets.insert(ds_key.clone(), dataset);
        self.current = Some((lib_key, ds_key));
        Ok(())
    }

    /// Remove a dataset from memory.
    pub fn remove(&mut self, libref: &str, name: &str) -> Option<Dataset> {
        let lib_key = self.lib_key(libref);
        let ds_key = Self::ds_key(name);
        if self.current.as_ref() == Some(&(lib_key.clone(), ds_key.clone())) {
            self.current = None;
        }
        self.libraries.get_mut(&lib_key)?.datasets.remove(&ds_key)
    }

    /// Names of the in-memory datasets in a library, sorted.
    pub fn dataset_names(&self, libref: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .libraries
            .get(&self.lib_key(libref))
            .map(|lib| lib.datasets.values().map(|d| d.name.clone()).collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Load a delimited text file into `libref.name`, replacing any existing
    /// dataset of that name. Returns the number of observations read.
    pub fn load_delimited(
        &mut self,
        libref: &str,
        name: &str,
        path: impl AsRef<Path>,
    ) -> Result<usize, RegistryError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let dataset = parse_delimited(name, &text, self.delimiter, &path.display().to_string())?;
        let count = dataset.len();
        self.insert(libref, dataset)?;
        debug!(libref, dataset = name, observations = count, "delimited source loaded");
        Ok(count)
    }

    /// Load `<library path>/<name>.csv` if the library has a path and the
    /// file exists. Returns whether a dataset was loaded.
    fn try_load_from_library(&mut self, lib_key: &str, name: &str) -> Result<bool, RegistryError> {
        let Some(dir) = self.libraries.get(lib_key).and_then(|l| l.path.clone()) else {
            return Ok(false);
        };
        let file = dir.join(format!("{}.csv", name.trim()));
        if !file.is_file() {
            return Ok(false);
        }
        self.load_delimited(lib_key, name, &file)?;
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Delimited source parsing
// ---------------------------------------------------------------------------

/// Parse delimited text: a header line of column names followed by records.
/// Numeric-looking fields become numbers, empty fields missing values.
pub fn parse_delimited(
    name: &str,
    text: &str,
    delimiter: char,
    source_name: &str,
) -> Result<Dataset, RegistryError> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty());
    let mut dataset = Dataset::new(name);
    let Some((header_idx, header_line)) = lines.next() else {
        return Ok(dataset);
    };
    let header = split_record(header_line, delimiter).map_err(|reason| {
        RegistryError::MalformedRecord {
            source_name: source_name.to_string(),
            line: header_idx + 1,
            reason,
        }
    })?;
    let header: Vec<String> = header.into_iter().map(|h| h.trim().to_string()).collect();
    for column in &header {
        dataset.declare_column(column);
    }

    for (idx, line) in lines {
        let fields = split_record(line, delimiter).map_err(|reason| {
            RegistryError::MalformedRecord {
                source_name: source_name.to_string(),
                line: idx + 1,
                reason,
            }
        })?;
        let mut row = Row::new();
        for (i, column) in header.iter().enumerate() {
            let raw = fields.get(i).map(String::as_str).unwrap_or("");
            row.set(column.clone(), field_value(raw));
        }
        dataset.rows.push(row);
    }
    Ok(dataset)
}

fn field_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "." {
        return Value::Missing;
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => Value::Number(n),
        _ => Value::Text(raw.to_string()),
    }
}

/// Split one record into fields, honouring double quotes with `""` escapes.
fn split_record(line: &str, delimiter: char) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(ch);
            }
        } else if ch == '"' && field.trim().is_empty() {
            field.clear();
            in_quotes = true;
        } else if ch == delimiter {
            fields.push(std::mem::take(&mut field));
        } else {
            field.push(ch);
        }
    }
    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    fields.push(field);
    Ok(fields)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_library_exists() {
        let mut reg = DatasetRegistry::new();
        assert!(reg.has_library(""));
        assert!(reg.has_library("work"));
        let ds = reg.get_or_create("", "a").unwrap();
        assert_eq!(ds.name, "a");
        assert!(reg.contains("WORK", "A"));
    }

    #[test]
    fn test_unknown_library_fails() {
        let mut reg = DatasetRegistry::new();
        let err = reg.get_or_create("nolib", "a").unwrap_err();
        assert!(matches!(err, RegistryError::UnknownLibrary { .. }));
    }

    #[test]
    fn test_get_missing_dataset_fails() {
        let mut reg = DatasetRegistry::new();
        let err = reg.get("", "ghost").unwrap_err();
        assert!(matches!(err, RegistryError::DatasetNotFound { .. }));
    }

    #[test]
    fn test_current_dataset_tracks_last_created() {
        let mut reg = DatasetRegistry::new();
        assert!(matches!(reg.current(), Err(RegistryError::NoCurrentDataset)));
        reg.get_or_create("", "first").unwrap();
        reg.get_or_create("", "second").unwrap();
        assert_eq!(reg.current().unwrap().name, "second");
    }

    #[test]
    fn test_remove_clears_current() {
        let mut reg = DatasetRegistry::new();
        reg.get_or_create("", "tmp").unwrap();
        assert!(reg.remove("", "tmp").is_some());
        assert!(reg.current().is_err());
    }

    #[test]
    fn test_dataset_names_sorted_per_library() {
        let mut reg = DatasetRegistry::new();
        reg.get_or_create("", "zeta").unwrap();
        reg.get_or_create("", "alpha").unwrap();
        assert_eq!(reg.dataset_names(""), vec!["alpha", "zeta"]);
        assert!(reg.dataset_names("nolib").is_empty());
    }

    #[test]
    fn test_parse_delimited() {
        let text = "name,age,city\njohn,23,\"Paris, FR\"\nmary,,Rome\n";
        let ds = parse_delimited("people", text, ',', "inline").unwrap();
        assert_eq!(ds.column_order, vec!["name", "age", "city"]);
        assert_eq!(ds.rows.len(), 2);
        assert_eq!(ds.rows[0].value("age"), Value::Number(23.0));
        assert_eq!(ds.rows[0].value("city"), Value::text("Paris, FR"));
        assert_eq!(ds.rows[1].value("age"), Value::Missing);
    }

    #[test]
    fn test_parse_delimited_escaped_quote() {
        let text = "q\n\"say \"\"hi\"\"\"\n";
        let ds = parse_delimited("q", text, ',', "inline").unwrap();
        assert_eq!(ds.rows[0].value("q"), Value::text("say \"hi\""));
    }

    #[test]
    fn test_parse_delimited_unterminated_quote() {
        let text = "a,b\n1,\"oops\n";
        let err = parse_delimited("bad", text, ',', "inline").unwrap_err();
        assert!(matches!(err, RegistryError::MalformedRecord { line: 2, .. }));
    }

    #[test]
    fn test_libname_lazy_load() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("dm.csv"), "id,score\n1,90\n2,85\n").unwrap();

        let mut reg = DatasetRegistry::new();
        reg.set_libref("mylib", dir.path());
        let ds = reg.get("mylib", "dm").unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rows[1].value("score"), Value::Number(85.0));
        assert!(reg.get("mylib", "nothere").is_err());
    }

    #[test]
    fn test_load_delimited_io_error() {
        let mut reg = DatasetRegistry::new();
        let err = reg
            .load_delimited("", "x", "/definitely/not/here.csv")
            .unwrap_err();
        assert!(matches!(err, RegistryError::Io { .. }));
    }
}
