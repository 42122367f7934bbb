//! SAS-104: Execution context (program data vector and cross-row state).
//!
//! One context lives for the whole program run. It holds the current row
//! being processed (the PDV), retained values, array declarations, the
//! active BY list, DO loop frames, and global settings (title, options).

use std::collections::{BTreeMap, HashMap};

use crate::dataset::Row;
use crate::error::EvalError;
use crate::value::Value;

/// One active conditional DO loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopFrame {
    /// Completed passes.
    pub iterations: usize,
}

/// Per-iteration DATA step bookkeeping written by body statements and read
/// by the step driver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepState {
    /// OUTPUT executed during this iteration.
    pub output_requested: bool,
    /// Variables named by DROP statements this iteration (`None` if no DROP ran).
    pub drop: Option<Vec<String>>,
    /// Variables named by KEEP statements this iteration (`None` if no KEEP ran).
    pub keep: Option<Vec<String>>,
    /// Variables named by RETAIN statements this iteration.
    pub retain: Vec<String>,
    /// Retain list carried over from the previous iteration.
    pub previous_retain: Vec<String>,
}

impl StepState {
    /// Reset for a new iteration, carrying this iteration's retain list forward.
    pub fn next_iteration(&mut self) {
        self.output_requested = false;
        self.drop = None;
        self.keep = None;
        self.previous_retain = std::mem::take(&mut self.retain);
    }
}

/// Interpreter-wide execution state.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// The PDV for the row currently being processed.
    pub current_row: Row,
    /// Flat variable table for values that survive across rows (RETAIN).
    pub variables: HashMap<String, Value>,
    /// BY variables from the most recent BY statement.
    pub by_variables: Vec<String>,
    /// Active TITLE text.
    pub title: Option<String>,
    /// DATA step iteration state.
    pub step: StepState,
    /// Conditional DO loop frames, innermost last.
    pub loop_stack: Vec<LoopFrame>,
    arrays: HashMap<String, Vec<String>>,
    options: BTreeMap<String, String>,
}

impl ExecutionContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare (or redeclare) an array over backing variables.
    pub fn declare_array(&mut self, name: &str, variables: Vec<String>) {
        self.arrays.insert(name.to_lowercase(), variables);
    }

    /// Backing variables of an array.
    pub fn array(&self, name: &str) -> Option<&[String]> {
        self.arrays.get(&name.to_lowercase()).map(Vec::as_slice)
    }

    /// Resolve `array{index}` to the backing variable name. The index is
    /// truncated toward zero and is 1-based.
    pub fn array_element(&self, name: &str, index: &Value) -> Result<&str, EvalError> {
        let vars = self.array(name).ok_or_else(|| EvalError::UndefinedArray {
            name: name.to_string(),
        })?;
        let out_of_bounds = || EvalError::IndexOutOfBounds {
            name: name.to_string(),
            index: index
                .to_number()
                .map_or_else(|| ".".to_string(), |n| format!("{}", n.trunc())),
            size: vars.len(),
        };
        let n = index.to_number().ok_or_else(out_of_bounds)?.trunc();
        if n < 1.0 || n > vars.len() as f64 {
            return Err(out_of_bounds());
        }
        Ok(vars[n as usize - 1].as_str())
    }

    /// Set a global option. Option names are case-insensitive.
    pub fn set_option(&mut self, name: &str, value: &str) {
        self.options.insert(name.to_lowercase(), value.to_string());
    }

    /// Look up a global option.
    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(&name.to_lowercase()).map(String::as_str)
    }

    /// All options, sorted by name.
    pub fn options(&self) -> impl Iterator<Item = (&str, &str)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_with_array() -> ExecutionContext {
        let mut ctx = ExecutionContext::new();
        ctx.declare_array("Scores", vec!["s1".into(), "s2".into(), "s3".into()]);
        ctx
    }

    #[test]
    fn test_array_lookup_is_case_insensitive() {
        let ctx = ctx_with_array();
        assert_eq!(ctx.array("scores").map(|a| a.len()), Some(3));
        assert_eq!(ctx.array_element("SCORES", &Value::Number(2.0)).unwrap(), "s2");
    }

    #[test]
    fn test_array_index_truncates() {
        let ctx = ctx_with_array();
        assert_eq!(ctx.array_element("scores", &Value::Number(3.9)).unwrap(), "s3");
    }

    #[test]
    fn test_array_index_out_of_bounds() {
        let ctx = ctx_with_array();
        for bad in [Value::Number(0.0), Value::Number(4.0), Value::Missing] {
            let err = ctx.array_element("scores", &bad).unwrap_err();
            assert!(matches!(err, EvalError::IndexOutOfBounds { size: 3, .. }));
        }
    }

    #[test]
    fn test_undefined_array() {
        let ctx = ExecutionContext::new();
        let err = ctx.array_element("nope", &Value::Number(1.0)).unwrap_err();
        assert!(matches!(err, EvalError::UndefinedArray { .. }));
    }

    #[test]
    fn test_options() {
        let mut ctx = ExecutionContext::new();
        ctx.set_option("LineSize", "80");
        assert_eq!(ctx.option("linesize"), Some("80"));
        assert_eq!(ctx.options().count(), 1);
    }

    #[test]
    fn test_step_state_carries_retain_list() {
        let mut step = StepState {
            output_requested: true,
            keep: Some(vec!["a".into()]),
            retain: vec!["total".into()],
            ..Default::default()
        };
        step.next_iteration();
        assert!(!step.output_requested);
        assert!(step.keep.is_none());
        assert!(step.retain.is_empty());
        assert_eq!(step.previous_retain, vec!["total"]);
    }
}
