#![forbid(unsafe_code)]
//! SAS DATA step and procedure interpreter.
//!
//! This crate provides:
//!
//! - **Values** (SAS-101): numeric and character values, missing values, coercion
//! - **Datasets** (SAS-102): ordered rows and column declarations
//! - **Registry** (SAS-103): libraries with LIBNAME paths and delimited source loading
//! - **Context** (SAS-104): the program data vector and cross-row state
//! - **Evaluator** (SAS-105): expressions and the built-in function library
//! - **Executor** (SAS-106): statement execution with DO loops and IF chains
//! - **DATA step** (SAS-107): the implicit row loop
//! - **Merge** (SAS-108): BY-group MERGE of sorted datasets
//! - **Procedures** (SAS-109): PROC SORT, MEANS and PRINT
//! - **Interpreter** (SAS-110): the program boundary with its log and listing streams
//!
//! Programs arrive as an already-parsed [`Program`], either built in Rust
//! or decoded from JSON with [`Program::from_json`].

pub mod ast;
pub mod config;
pub mod context;
pub mod data_step;
pub mod dataset;
pub mod error;
pub mod evaluator;
mod executor;
pub mod functions;
pub mod interpreter;
pub mod listing;
pub mod log;
pub mod merge;
pub mod procs;
pub mod registry;
pub mod value;

pub use ast::{
    ArrayDecl, AssignTarget, DataStep, DoCounted, DoLoop, Expr, IfElseIf, InputVar, LoopKind, Proc,
    ProcMeans, ProcPrint, ProcSort, Program, RetainVar, Statement,
};
pub use config::InterpreterConfig;
pub use context::ExecutionContext;
pub use dataset::{Dataset, Row};
pub use error::{EvalError, ExecError, ExecResult, RegistryError};
pub use interpreter::Interpreter;
pub use log::{LogEntry, SasLog, Severity};
pub use registry::DatasetRegistry;
pub use value::{BinaryOperator, Value};
