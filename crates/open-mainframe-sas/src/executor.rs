//! SAS-106: Statement execution.
//!
//! Statements run against the interpreter's execution context. Body-only
//! statements (assignment, OUTPUT, DROP, ...) are accepted inside a DATA
//! step; global statements (DATA, PROC, OPTIONS, ...) only at top level.

use crate::ast::{AssignTarget, ArrayDecl, DoCounted, DoLoop, IfElseIf, LoopKind, RetainVar, Statement};
use crate::context::LoopFrame;
use crate::error::{ExecError, ExecResult};
use crate::evaluator::{evaluate, resolve_array_target};
use crate::interpreter::Interpreter;
use crate::value::Value;

/// Where a statement is being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scope {
    /// Top level of the program.
    Global,
    /// Inside a DATA step body, once per row.
    DataStep,
}

/// Control flow result of one statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Proceed to the next statement.
    Continue,
    /// END closed the current pass of the innermost DO loop.
    EndOfPass,
}

fn unsupported(stmt: &Statement, context: &str) -> ExecError {
    ExecError::UnsupportedStatement {
        statement: stmt.keyword().to_string(),
        context: context.to_string(),
    }
}

impl Interpreter {
    /// Execute statements in order, stopping early when a pass ends.
    pub(crate) fn exec_block(&mut self, statements: &[Statement], scope: Scope) -> ExecResult<Flow> {
        for stmt in statements {
            if self.exec_statement(stmt, scope)? == Flow::EndOfPass {
                return Ok(Flow::EndOfPass);
            }
        }
        Ok(Flow::Continue)
    }

    /// Execute one statement.
    pub(crate) fn exec_statement(&mut self, stmt: &Statement, scope: Scope) -> ExecResult<Flow> {
        match stmt {
            Statement::DataStep(_)
            | Statement::Proc(_)
            | Statement::Options(_)
            | Statement::Libname { .. }
            | Statement::Title(_) => {
                if scope == Scope::DataStep {
                    return Err(unsupported(stmt, "in DATA step"));
                }
                self.exec_global(stmt)?;
                Ok(Flow::Continue)
            }

            Statement::Assignment { .. }
            | Statement::Output
            | Statement::Drop(_)
            | Statement::Keep(_)
            | Statement::Retain(_)
            | Statement::IfThen { .. }
            | Statement::Do(_)
            | Statement::Block(_)
                if scope == Scope::Global =>
            {
                Err(unsupported(stmt, "outside a DATA step"))
            }

            Statement::Assignment { target, expr } => {
                let value = evaluate(expr, &self.ctx, &mut self.log)?;
                let name = match target {
                    AssignTarget::Variable(name) => name.clone(),
                    AssignTarget::ArrayElement { array, index } => {
                        resolve_array_target(array, index, &self.ctx, &mut self.log)?
                    }
                };
                self.ctx.current_row.set(name, value);
                Ok(Flow::Continue)
            }
            Statement::Output => {
                self.ctx.step.output_requested = true;
                Ok(Flow::Continue)
            }
            Statement::Drop(vars) => {
                for var in vars {
                    self.ctx.current_row.remove(var);
                }
                self.ctx.step.drop.get_or_insert_with(Vec::new).extend(vars.iter().cloned());
                Ok(Flow::Continue)
            }
            Statement::Keep(vars) => {
                self.ctx.current_row.retain_columns(|c| vars.iter().any(|v| v == c));
                self.ctx.step.keep.get_or_insert_with(Vec::new).extend(vars.iter().cloned());
                Ok(Flow::Continue)
            }
            Statement::Retain(vars) => {
                self.exec_retain(vars);
                Ok(Flow::Continue)
            }
            Statement::IfThen { condition, then } => {
                if evaluate(condition, &self.ctx, &mut self.log)?.is_true() {
                    return self.exec_block(then, scope);
                }
                Ok(Flow::Continue)
            }
            Statement::Do(counted) => self.exec_counted_do(counted, scope),
            Statement::Block(body) => self.exec_block(body, scope),

            Statement::IfElseIf(chain) => self.exec_if_chain(chain, scope),
            Statement::Array(decl) => {
                self.exec_array(decl)?;
                Ok(Flow::Continue)
            }
            Statement::DoLoop(lp) => self.exec_do_loop(lp, scope),
            Statement::End => {
                if self.ctx.loop_stack.is_empty() {
                    return Err(ExecError::UnmatchedEnd);
                }
                Ok(Flow::EndOfPass)
            }
            // Inside a DATA step the driver handles MERGE and BY before the row loop.
            Statement::Merge { datasets } => {
                if scope == Scope::Global {
                    let by = self.ctx.by_variables.clone();
                    let rows = self.merge(datasets, &by)?;
                    self.registry.current_mut()?.replace_rows(rows);
                }
                Ok(Flow::Continue)
            }
            Statement::By { variables } => {
                if scope == Scope::Global {
                    self.ctx.by_variables = variables.clone();
                }
                Ok(Flow::Continue)
            }
        }
    }

    fn exec_retain(&mut self, vars: &[RetainVar]) {
        for var in vars {
            if !self.ctx.step.retain.contains(&var.name) {
                self.ctx.step.retain.push(var.name.clone());
            }
            let Some(initial) = &var.initial else {
                continue;
            };
            if !self.ctx.current_row.contains(&var.name) && !self.ctx.variables.contains_key(&var.name) {
                self.ctx.current_row.set(var.name.clone(), initial.clone());
            }
        }
    }

    fn exec_if_chain(&mut self, chain: &IfElseIf, scope: Scope) -> ExecResult<Flow> {
        if evaluate(&chain.condition, &self.ctx, &mut self.log)?.is_true() {
            return self.exec_block(&chain.then, scope);
        }
        for (condition, body) in &chain.else_ifs {
            if evaluate(condition, &self.ctx, &mut self.log)?.is_true() {
                return self.exec_block(body, scope);
            }
        }
        self.exec_block(&chain.otherwise, scope)
    }

    fn exec_array(&mut self, decl: &ArrayDecl) -> ExecResult<()> {
        if decl.size != decl.variables.len() {
            return Err(ExecError::ArraySizeMismatch {
                name: decl.name.clone(),
                declared: decl.size,
                actual: decl.variables.len(),
            });
        }
        self.ctx.declare_array(&decl.name, decl.variables.clone());
        Ok(())
    }

    fn exec_counted_do(&mut self, lp: &DoCounted, scope: Scope) -> ExecResult<Flow> {
        let start = evaluate(&lp.start, &self.ctx, &mut self.log)?;
        let end = evaluate(&lp.end, &self.ctx, &mut self.log)?.to_number();
        // A missing BY value counts as zero.
        let step = match &lp.increment {
            Some(expr) => evaluate(expr, &self.ctx, &mut self.log)?.to_number().unwrap_or(0.0),
            None => 1.0,
        };
        if step == 0.0 {
            return Err(ExecError::ZeroIncrement {
                variable: lp.variable.clone(),
            });
        }
        self.ctx.current_row.set(lp.variable.clone(), start.to_numeric_value());
        let Some(end) = end else {
            return Ok(Flow::Continue);
        };

        loop {
            let Some(current) = self.ctx.current_row.value(&lp.variable).to_number() else {
                break;
            };
            let in_range = if step > 0.0 { current <= end } else { current >= end };
            if !in_range {
                break;
            }
            if self.exec_block(&lp.body, scope)? == Flow::EndOfPass {
                return Ok(Flow::EndOfPass);
            }
            let next = self.ctx.current_row.value(&lp.variable).to_number().map(|v| v + step);
            self.ctx
                .current_row
                .set(lp.variable.clone(), next.map_or(Value::Missing, Value::Number));
        }
        Ok(Flow::Continue)
    }

    fn exec_do_loop(&mut self, lp: &DoLoop, scope: Scope) -> ExecResult<Flow> {
        self.ctx.loop_stack.push(LoopFrame::default());
        let result = self.run_do_loop(lp, scope);
        self.ctx.loop_stack.pop();
        result.map(|()| Flow::Continue)
    }

    fn run_do_loop(&mut self, lp: &DoLoop, scope: Scope) -> ExecResult<()> {
        let limit = self.config.max_do_iterations;
        loop {
            if let Some(condition) = &lp.condition {
                let holds = evaluate(condition, &self.ctx, &mut self.log)?.is_true();
                let proceed = match lp.kind {
                    LoopKind::While => holds,
                    LoopKind::Until => !holds,
                };
                if !proceed {
                    return Ok(());
                }
            }

            let completed = self.ctx.loop_stack.last().map_or(0, |f| f.iterations);
            if completed >= limit {
                self.log.error(format!(
                    "DO loop exceeded the maximum of {limit} iterations; loop terminated"
                ));
                return Ok(());
            }

            self.exec_statement(&lp.body, scope)?;
            if let Some(frame) = self.ctx.loop_stack.last_mut() {
                frame.iterations += 1;
            }

            if lp.condition.is_none() {
                return Ok(());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
