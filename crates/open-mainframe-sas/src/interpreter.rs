//! SAS-110: Interpreter core and program boundary.
//!
//! The interpreter owns the dataset registry, the execution context, and
//! the two output streams (log and listing). Each top-level statement runs
//! inside a guarded boundary: a failure is written to the log and the
//! program continues with the next statement.

use tracing::{debug, info_span};

use crate::ast::{Program, Statement};
use crate::config::InterpreterConfig;
use crate::context::ExecutionContext;
use crate::error::ExecResult;
use crate::executor::Scope;
use crate::log::SasLog;
use crate::registry::DatasetRegistry;

/// Tree-walking SAS interpreter.
#[derive(Debug, Clone)]
pub struct Interpreter {
    pub(crate) config: InterpreterConfig,
    pub(crate) registry: DatasetRegistry,
    pub(crate) ctx: ExecutionContext,
    pub(crate) log: SasLog,
    pub(crate) listing: Vec<String>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(InterpreterConfig::default())
    }
}

impl Interpreter {
    /// Create an interpreter with an empty registry.
    pub fn new(config: InterpreterConfig) -> Self {
        let registry = DatasetRegistry::with_config(&config);
        Self::with_registry(config, registry)
    }

    /// Create an interpreter over an existing registry.
    pub fn with_registry(config: InterpreterConfig, registry: DatasetRegistry) -> Self {
        Self {
            config,
            registry,
            ctx: ExecutionContext::new(),
            log: SasLog::new(),
            listing: Vec::new(),
        }
    }

    /// Run every top-level statement. Failures are logged and execution
    /// continues with the next statement.
    pub fn execute_program(&mut self, program: &Program) {
        debug!(statements = program.statements.len(), "executing SAS program");
        for (index, stmt) in program.statements.iter().enumerate() {
            let span = info_span!("statement", index, keyword = stmt.keyword());
            let _guard = span.enter();
            if let Err(e) = self.execute(stmt) {
                self.log.error(e.to_string());
            }
        }
    }

    /// Execute a single top-level statement.
    pub fn execute(&mut self, stmt: &Statement) -> ExecResult<()> {
        self.ctx.loop_stack.clear();
        self.exec_statement(stmt, Scope::Global).map(|_| ())
    }

    /// Global statements: DATA, PROC, OPTIONS, LIBNAME, TITLE.
    pub(crate) fn exec_global(&mut self, stmt: &Statement) -> ExecResult<()> {
        match stmt {
            Statement::DataStep(step) => self.run_data_step(step),
            Statement::Proc(proc) => self.run_proc(proc),
            Statement::Options(pairs) => {
                for (name, value) in pairs {
                    self.ctx.set_option(name, value);
                    self.log.info(format!("Option {name} set to {value}"));
                }
                Ok(())
            }
            Statement::Libname { libref, path } => {
                self.registry.set_libref(libref, path);
                if std::path::Path::new(path).is_dir() {
                    self.log.info(format!(
                        "Libref {} was successfully assigned as follows: Physical Name: {path}",
                        libref.to_uppercase()
                    ));
                } else {
                    self.log.warn(format!(
                        "Library {} does not exist: {path}",
                        libref.to_uppercase()
                    ));
                }
                Ok(())
            }
            Statement::Title(text) => {
                self.ctx.title = Some(text.clone());
                self.log.info(format!("Title set to '{text}'"));
                Ok(())
            }
            other => self.exec_statement(other, Scope::Global).map(|_| ()),
        }
    }

    /// Configuration in effect.
    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// The SAS log.
    pub fn log(&self) -> &SasLog {
        &self.log
    }

    /// Listing lines produced so far.
    pub fn listing(&self) -> &[String] {
        &self.listing
    }

    /// The dataset registry.
    pub fn registry(&self) -> &DatasetRegistry {
        &self.registry
    }

    /// Mutable access to the dataset registry (for seeding inputs).
    pub fn registry_mut(&mut self) -> &mut DatasetRegistry {
        &mut self.registry
    }

    /// The execution context.
    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }
}
