//! SAS-109: PROC SORT, PROC MEANS, and PROC PRINT.

use std::collections::HashSet;

use tracing::info;

use crate::ast::{Proc, ProcMeans, ProcPrint, ProcSort};
use crate::dataset::{Dataset, Row};
use crate::error::{ExecError, ExecResult};
use crate::evaluator::evaluate;
use crate::interpreter::Interpreter;
use crate::listing::{render_table, TableOptions};
use crate::merge::sort_rows;
use crate::value::Value;

/// Composite NODUPKEY key: each BY value followed by `_`, `NA` when absent.
pub fn dedup_key(row: &Row, by: &[String]) -> String {
    let mut key = String::new();
    for var in by {
        match row.get(var) {
            Some(v) => key.push_str(&v.to_text()),
            None => key.push_str("NA"),
        }
        key.push('_');
    }
    key
}

/// Summary line for one PROC MEANS variable.
#[derive(Debug, Clone, PartialEq)]
pub struct MeanSummary {
    pub variable: String,
    pub n: usize,
    /// `None` when the variable has no numeric values.
    pub mean: Option<f64>,
}

/// Count and mean over the numeric cells of each variable.
pub fn summarize(ds: &Dataset, variables: &[String]) -> Vec<MeanSummary> {
    variables
        .iter()
        .map(|var| {
            let (sum, n) = ds
                .rows
                .iter()
                .filter_map(|r| match r.get(var) {
                    Some(Value::Number(x)) => Some(*x),
                    _ => None,
                })
                .fold((0.0, 0usize), |(s, c), x| (s + x, c + 1));
            MeanSummary {
                variable: var.clone(),
                n,
                mean: (n > 0).then(|| sum / n as f64),
            }
        })
        .collect()
}

impl Interpreter {
    pub(crate) fn run_proc(&mut self, proc: &Proc) -> ExecResult<()> {
        match proc {
            Proc::Sort(sort) => self.proc_sort(sort),
            Proc::Means(means) => self.proc_means(means),
            Proc::Print(print) => self.proc_print(print),
            Proc::Other { name } => Err(ExecError::UnsupportedStatement {
                statement: format!("PROC {}", name.to_uppercase()),
                context: "(procedure not available)".to_string(),
            }),
        }
    }

    fn proc_sort(&mut self, sort: &ProcSort) -> ExecResult<()> {
        let (in_lib, in_name) = self.config.split_name(&sort.input);
        let source = self.registry.get(in_lib, in_name)?.clone();
        let mut rows = Vec::with_capacity(source.len());

        if let Some(clause) = &sort.where_clause {
            for row in source.rows {
                self.ctx.current_row = row;
                let keep = match evaluate(clause, &self.ctx, &mut self.log)? {
                    Value::Number(n) => n != 0.0,
                    Value::Text(s) => !s.is_empty(),
                    Value::Missing => false,
                };
                if keep {
                    rows.push(std::mem::take(&mut self.ctx.current_row));
                }
            }
        } else {
            rows = source.rows;
        }

        sort_rows(&mut rows, &sort.by);

        if sort.nodupkey || sort.duplicates {
            let mut seen = HashSet::new();
            let before = rows.len();
            let unique: Vec<Row> = rows
                .iter()
                .filter(|r| seen.insert(dedup_key(r, &sort.by)))
                .cloned()
                .collect();
            let duplicates = before - unique.len();
            if sort.duplicates {
                self.log.info(format!(
                    "{duplicates} observations with duplicate key values were found."
                ));
            }
            if sort.nodupkey {
                rows = unique;
                self.log.info(format!(
                    "{duplicates} observations with duplicate key values were deleted."
                ));
            }
        }

        let target = sort.output.as_deref().unwrap_or(&sort.input);
        let (out_lib, out_name) = self.config.split_name(target);
        let mut output = Dataset::new(out_name);
        output.column_order = source.column_order;
        output.replace_rows(rows);
        let count = output.len();
        self.registry.insert(out_lib, output)?;

        info!(input = %sort.input, output = target, observations = count, "PROC SORT");
        self.log.info(format!(
            "The data set {} has {count} observations.",
            target.to_uppercase()
        ));
        Ok(())
    }

    fn proc_means(&mut self, means: &ProcMeans) -> ExecResult<()> {
        let (lib, name) = self.config.split_name(&means.dataset);
        let ds = self.registry.get(lib, name)?;
        let variables: Vec<String> = if means.variables.is_empty() {
            ds.column_order
                .iter()
                .filter(|c| ds.rows.iter().any(|r| r.get(c).is_some_and(Value::is_number)))
                .cloned()
                .collect()
        } else {
            means.variables.clone()
        };
        let summaries = summarize(ds, &variables);
        let observations = ds.len();

        if let Some(title) = &self.ctx.title {
            self.listing.push(format!("Title: {title}"));
        }
        self.listing.push("Variable\tN\tMean".to_string());
        for s in &summaries {
            let mean = s.mean.map_or_else(|| self.config.missing_display.clone(), |m| format!("{m:.2}"));
            self.listing.push(format!("{}\t{}\t{mean}", s.variable, s.n));
        }

        info!(dataset = %means.dataset, variables = summaries.len(), "PROC MEANS");
        self.log.info(format!(
            "There were {observations} observations read from the data set {}.",
            means.dataset.to_uppercase()
        ));
        Ok(())
    }

    fn proc_print(&mut self, print: &ProcPrint) -> ExecResult<()> {
        let (lib, name) = self.config.split_name(&print.dataset);
        let ds = self.registry.get(lib, name)?;
        let lines = render_table(
            ds,
            &TableOptions {
                title: self.ctx.title.as_deref(),
                columns: &print.variables,
                obs: print.obs,
                noobs: print.noobs,
                missing: &self.config.missing_display,
            },
        );
        let printed = lines.len().saturating_sub(1 + usize::from(self.ctx.title.is_some()));
        self.listing.extend(lines);
        self.log.info(format!(
            "There were {printed} observations read from the data set {}.",
            print.dataset.to_uppercase()
        ));
        Ok(())
    }
}
