//! SAS-107: DATA step driver.
//!
//! Runs the implicit row loop of a DATA step: load the input rows, then for
//! each row copy it into the PDV, restore retained values, execute the
//! body, apply DROP/KEEP, save retained values, and write the row when
//! OUTPUT ran. There is no implicit OUTPUT.

use tracing::{debug, info};

use crate::ast::{DataStep, InputVar, Statement};
use crate::context::StepState;
use crate::dataset::Row;
use crate::error::ExecResult;
use crate::executor::Scope;
use crate::interpreter::Interpreter;
use crate::listing::render_dataset;
use crate::value::Value;

/// Build rows from DATALINES records using the INPUT variable list.
/// Fields are whitespace separated; short records pad with missing values.
pub fn read_datalines(vars: &[InputVar], lines: &[String]) -> Vec<Row> {
    lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let mut row = Row::new();
            for (i, var) in vars.iter().enumerate() {
                let value = match fields.get(i) {
                    None | Some(&".") => Value::Missing,
                    Some(raw) if var.character => Value::text(*raw),
                    Some(raw) => raw.parse().map_or(Value::Missing, Value::Number),
                };
                row.set(var.name.clone(), value);
            }
            row
        })
        .collect()
}

impl Interpreter {
    /// Execute one DATA step.
    pub(crate) fn run_data_step(&mut self, step: &DataStep) -> ExecResult<()> {
        let (out_lib, out_name) = {
            let (lib, name) = self.config.split_name(&step.output);
            (lib.to_string(), name.to_string())
        };
        let has_merge = step
            .statements
            .iter()
            .any(|s| matches!(s, Statement::Merge { .. }));

        // Input rows are copied before the output dataset is cleared so that
        // `data a; set a;` reads the old contents.
        // Name resolution failures end the step here without output.
        let input_rows = if let Some(input) = &step.input {
            let (lib, name) = self.config.split_name(input);
            match self.registry.get(lib, name) {
                Ok(ds) => ds.rows.clone(),
                Err(e) => {
                    self.log.error(format!("{e}; DATA step {} not executed", step.output));
                    return Ok(());
                }
            }
        } else if !step.input_vars.is_empty() {
            read_datalines(&step.input_vars, &step.datalines)
        } else if has_merge {
            Vec::new()
        } else {
            vec![Row::new()]
        };

        match self.registry.get_or_create(&out_lib, &out_name) {
            Ok(ds) => ds.clear(),
            Err(e) => {
                self.log.error(format!("{e}; DATA step {} not executed", step.output));
                return Ok(());
            }
        }
        self.ctx.variables.clear();
        self.ctx.loop_stack.clear();
        self.ctx.step = StepState::default();

        if has_merge {
            for stmt in &step.statements {
                if let Statement::By { variables } = stmt {
                    self.ctx.by_variables = variables.clone();
                }
            }
            for stmt in &step.statements {
                if let Statement::Merge { datasets } = stmt {
                    let by = self.ctx.by_variables.clone();
                    let rows = self.merge(datasets, &by)?;
                    self.registry.get_mut(&out_lib, &out_name)?.replace_rows(rows);
                }
            }
        }

        let iterations = input_rows.len();
        for row in input_rows {
            self.run_iteration(row, &step.statements, &out_lib, &out_name)?;
        }

        let output = self.registry.get(&out_lib, &out_name)?;
        let observations = output.len();
        let variables = output.column_order.len();
        let lines = render_dataset(output, self.ctx.title.as_deref(), &self.config.missing_display);
        self.listing.extend(lines);

        let display_lib = if out_lib.is_empty() {
            self.config.default_library.to_uppercase()
        } else {
            out_lib.to_uppercase()
        };
        info!(dataset = %out_name, iterations, observations, "DATA step complete");
        self.log.info(format!(
            "The data set {display_lib}.{} has {observations} observations and {variables} variables.",
            out_name.to_uppercase()
        ));
        Ok(())
    }

    fn run_iteration(
        &mut self,
        row: Row,
        body: &[Statement],
        out_lib: &str,
        out_name: &str,
    ) -> ExecResult<()> {
        self.ctx.step.next_iteration();
        self.ctx.current_row = row;

        for name in &self.ctx.step.previous_retain {
            if let Some(value) = self.ctx.variables.get(name) {
                self.ctx.current_row.set(name.clone(), value.clone());
            }
        }

        self.exec_block(body, Scope::DataStep)?;

        let step = &self.ctx.step;
        let excluded = |name: &str| match (&step.keep, &step.drop) {
            (Some(keep), _) => !keep.iter().any(|k| k == name),
            (None, Some(drop)) => drop.iter().any(|d| d == name),
            (None, None) => false,
        };
        self.ctx.current_row.retain_columns(|c| !excluded(c));

        for name in &step.retain {
            match self.ctx.current_row.get(name) {
                Some(value) => {
                    self.ctx.variables.insert(name.clone(), value.clone());
                }
                None if !excluded(name) => {
                    if let Some(value) = self.ctx.variables.get(name) {
                        self.ctx.current_row.set(name.clone(), value.clone());
                    }
                }
                None => {}
            }
        }

        if self.ctx.step.output_requested {
            debug!(dataset = out_name, "OUTPUT");
            let row = self.ctx.current_row.clone();
            self.registry.get_mut(out_lib, out_name)?.add_row(row);
        }
        Ok(())
    }
}
