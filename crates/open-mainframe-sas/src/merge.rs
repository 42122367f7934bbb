//! SAS-108: BY-group MERGE and key ordering.
//!
//! Participants are sorted in place by the BY variables, then walked with
//! one cursor per dataset. Each round takes the smallest BY key, consumes
//! one row from every dataset positioned on that key, and combines them.
//! Once any dataset runs out while others still have rows, the leftover
//! rows are copied through unchanged and the merge stops.

use std::cmp::Ordering;

use tracing::debug;

use crate::dataset::Row;
use crate::error::{ExecError, ExecResult};
use crate::interpreter::Interpreter;

/// Compare two rows on the BY variables (absent values sort as missing).
pub fn compare_by(a: &Row, b: &Row, by: &[String]) -> Ordering {
    by.iter()
        .map(|v| a.value(v).compare(&b.value(v)))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Stable ascending sort on the BY variables.
pub fn sort_rows(rows: &mut [Row], by: &[String]) {
    rows.sort_by(|a, b| compare_by(a, b, by));
}

/// Merge already-sorted row sets on the BY variables.
pub fn merge_rows(inputs: &[Vec<Row>], by: &[String]) -> ExecResult<Vec<Row>> {
    if by.is_empty() {
        return Err(ExecError::MissingByStatement);
    }
    let mut cursors = vec![0usize; inputs.len()];
    let mut merged = Vec::new();

    loop {
        let active: Vec<usize> = (0..inputs.len())
            .filter(|&i| cursors[i] < inputs[i].len())
            .collect();
        if active.is_empty() {
            break;
        }
        if active.len() < inputs.len() {
            for &i in &active {
                merged.extend(inputs[i][cursors[i]..].iter().cloned());
            }
            break;
        }

        check_key_types(inputs, &cursors, by)?;

        let mut min = active[0];
        for &i in &active[1..] {
            if compare_by(&inputs[i][cursors[i]], &inputs[min][cursors[min]], by).is_lt() {
                min = i;
            }
        }
        let key_row = &inputs[min][cursors[min]];

        let mut out = Row::new();
        for var in by {
            out.set(var.clone(), key_row.value(var));
        }
        for &i in &active {
            let row = &inputs[i][cursors[i]];
            if compare_by(row, key_row, by).is_ne() {
                continue;
            }
            for (name, value) in row.iter() {
                if by.iter().any(|b| b == name) {
                    continue;
                }
                let target = if out.contains(name) {
                    format!("{}_{name}", row.first_column().unwrap_or_default())
                } else {
                    name.to_string()
                };
                out.set(target, value.clone());
            }
            cursors[i] += 1;
        }
        merged.push(out);
    }
    Ok(merged)
}

/// A BY variable may not be numeric in one dataset and character in another
/// within the same round. Missing values match either type.
fn check_key_types(inputs: &[Vec<Row>], cursors: &[usize], by: &[String]) -> ExecResult<()> {
    for var in by {
        let mut numeric = false;
        let mut text = false;
        for (rows, &cursor) in inputs.iter().zip(cursors) {
            if let Some(value) = rows[cursor].get(var) {
                numeric |= value.is_number();
                text |= value.is_text();
            }
        }
        if numeric && text {
            return Err(ExecError::ByKeyTypeMismatch {
                variable: var.clone(),
            });
        }
    }
    Ok(())
}

impl Interpreter {
    /// Sort each participant in place, then merge them on `by`.
    pub(crate) fn merge(&mut self, datasets: &[String], by: &[String]) -> ExecResult<Vec<Row>> {
        if by.is_empty() {
            return Err(ExecError::MissingByStatement);
        }
        let mut inputs = Vec::with_capacity(datasets.len());
        for qualified in datasets {
            let (lib, name) = self.config.split_name(qualified);
            let ds = self.registry.get_mut(lib, name)?;
            sort_rows(&mut ds.rows, by);
            inputs.push(ds.rows.clone());
        }
        let rows = merge_rows(&inputs, by)?;
        let consumed: usize = inputs.iter().map(Vec::len).sum();
        debug!(datasets = datasets.len(), input_rows = consumed, output_rows = rows.len(), "MERGE");
        self.log.info(format!(
            "MERGE of {} data sets by {} produced {} observations.",
            datasets.len(),
            by.join(" "),
            rows.len()
        ));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn by(vars: &[&str]) -> Vec<String> {
        vars.iter().map(|s| s.to_string()).collect()
    }

    fn row(id: f64, col: &str, v: f64) -> Row {
        Row::from_pairs([("id", Value::Number(id)), (col, Value::Number(v))])
    }

    #[test]
    fn test_sort_rows_stable() {
        let mut rows = vec![row(2.0, "v", 1.0), row(1.0, "v", 2.0), row(2.0, "v", 3.0)];
        sort_rows(&mut rows, &by(&["id"]));
        let vs: Vec<Value> = rows.iter().map(|r| r.value("v")).collect();
        assert_eq!(vs, vec![Value::Number(2.0), Value::Number(1.0), Value::Number(3.0)]);
    }

    #[test]
    fn test_merge_matching_keys() {
        let left = vec![row(1.0, "a", 10.0), row(2.0, "a", 20.0)];
        let right = vec![row(1.0, "b", 100.0), row(2.0, "b", 200.0)];
        let out = merge_rows(&[left, right], &by(&["id"])).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].value("id"), Value::Number(2.0));
        assert_eq!(out[1].value("a"), Value::Number(20.0));
        assert_eq!(out[1].value("b"), Value::Number(200.0));
    }

    #[test]
    fn test_merge_unmatched_key_takes_one_side() {
        let left = vec![row(1.0, "a", 10.0), row(3.0, "a", 30.0)];
        let right = vec![row(2.0, "b", 200.0), row(3.0, "b", 300.0)];
        let out = merge_rows(&[left, right], &by(&["id"])).unwrap();
        let ids: Vec<Value> = out.iter().map(|r| r.value("id")).collect();
        assert_eq!(ids, vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]);
        assert!(!out[0].contains("b"));
        assert_eq!(out[2].value("b"), Value::Number(300.0));
    }

    #[test]
    fn test_merge_drains_after_exhaustion() {
        let left = vec![row(1.0, "a", 10.0)];
        let right = vec![row(1.0, "b", 100.0), row(5.0, "b", 500.0), row(6.0, "b", 600.0)];
        let out = merge_rows(&[left, right], &by(&["id"])).unwrap();
        // One combined row, then the two leftover right rows as-is.
        assert_eq!(out.len(), 3);
        assert_eq!(out[1], row(5.0, "b", 500.0));
        assert_eq!(out[2], row(6.0, "b", 600.0));
    }

    #[test]
    fn test_merge_collision_renamed() {
        let left = vec![Row::from_pairs([("id", 1.0), ("score", 5.0)])];
        let right = vec![Row::from_pairs([("key", 9.0), ("id", 1.0), ("score", 7.0)])];
        let out = merge_rows(&[left, right], &by(&["id"])).unwrap();
        assert_eq!(out[0].value("score"), Value::Number(5.0));
        assert_eq!(out[0].value("key_score"), Value::Number(7.0));
    }

    #[test]
    fn test_merge_requires_by() {
        assert!(matches!(
            merge_rows(&[vec![], vec![]], &[]),
            Err(ExecError::MissingByStatement)
        ));
    }

    #[test]
    fn test_merge_key_type_mismatch() {
        let left = vec![Row::from_pairs([("id", Value::Number(1.0))])];
        let right = vec![Row::from_pairs([("id", Value::text("1"))])];
        let err = merge_rows(&[left, right], &by(&["id"])).unwrap_err();
        assert!(matches!(err, ExecError::ByKeyTypeMismatch { ref variable } if variable == "id"));
    }

    #[test]
    fn test_merge_missing_key_is_compatible() {
        let left = vec![Row::from_pairs([("id", Value::Missing), ("a", Value::Number(1.0))])];
        let right = vec![Row::from_pairs([("id", Value::text("x")), ("b", Value::Number(2.0))])];
        let out = merge_rows(&[left, right], &by(&["id"])).unwrap();
        assert_eq!(out.len(), 2);
    }
}
