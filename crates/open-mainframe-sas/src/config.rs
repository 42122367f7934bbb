//! Interpreter configuration.

use serde::{Deserialize, Serialize};

/// Tunables for an [`Interpreter`](crate::Interpreter) instance.
///
/// Every field has a default, so partial JSON documents deserialize:
///
/// ```
/// use open_mainframe_sas::InterpreterConfig;
///
/// let cfg: InterpreterConfig = serde_json::from_str(r#"{"max_do_iterations": 50}"#).unwrap();
/// assert_eq!(cfg.max_do_iterations, 50);
/// assert_eq!(cfg.default_library, "WORK");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Iteration bound for DO WHILE / DO UNTIL loops.
    pub max_do_iterations: usize,
    /// Text shown for missing values in listings.
    pub missing_display: String,
    /// Library used when a dataset name has no library qualifier.
    pub default_library: String,
    /// Separator between library reference and dataset name.
    pub library_separator: char,
    /// Field delimiter for external delimited sources.
    pub delimiter: char,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_do_iterations: 1000,
            missing_display: ".".to_string(),
            default_library: "WORK".to_string(),
            library_separator: '.',
            delimiter: ',',
        }
    }
}

impl InterpreterConfig {
    /// Split `lib.name` into `(lib, name)`. Unqualified names get an empty
    /// library reference, which denotes the default library.
    pub fn split_name<'a>(&self, qualified: &'a str) -> (&'a str, &'a str) {
        match qualified.split_once(self.library_separator) {
            Some((lib, name)) => (lib, name),
            None => ("", qualified),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = InterpreterConfig::default();
        assert_eq!(cfg.max_do_iterations, 1000);
        assert_eq!(cfg.missing_display, ".");
        assert_eq!(cfg.library_separator, '.');
    }

    #[test]
    fn test_split_name() {
        let cfg = InterpreterConfig::default();
        assert_eq!(cfg.split_name("mylib.sales"), ("mylib", "sales"));
        assert_eq!(cfg.split_name("sales"), ("", "sales"));
    }
}
