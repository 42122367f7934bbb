//! SAS interpreter error types.
//!
//! Errors are split by tier: [`EvalError`] for expression evaluation,
//! [`RegistryError`] for dataset lookup and delimited loading, and
//! [`ExecError`] for statements and steps (which wraps the other two).

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while evaluating an expression.
#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum EvalError {
    /// Binary operator token is not part of the language.
    #[error("unsupported binary operator '{op}'")]
    #[diagnostic(code(sas::unsupported_operator))]
    UnsupportedOperator {
        /// The operator token.
        op: String,
    },

    /// Function name is not in the built-in table.
    #[error("unsupported function '{name}'")]
    #[diagnostic(code(sas::unsupported_function))]
    UnsupportedFunction {
        /// Function name as written.
        name: String,
    },

    /// Function called with the wrong number of arguments.
    #[error("{function} function expects {expected} argument(s), got {got}")]
    #[diagnostic(code(sas::arity_mismatch))]
    ArityMismatch {
        /// Function name (lowercase).
        function: String,
        /// Human readable arity, e.g. `"2 or 3"`.
        expected: String,
        /// Number of arguments supplied.
        got: usize,
    },

    /// Argument of the wrong type.
    #[error("{function}: expected {expected} argument, got {got}")]
    #[diagnostic(code(sas::type_mismatch))]
    TypeMismatch {
        /// Function name (lowercase).
        function: String,
        /// Expected type description.
        expected: String,
        /// Actual type description.
        got: String,
    },

    /// Array referenced before its ARRAY declaration.
    #[error("undefined array: {name}")]
    #[diagnostic(code(sas::undefined_array))]
    UndefinedArray {
        /// Array name.
        name: String,
    },

    /// Array subscript outside `1..=size`.
    #[error("array index {index} out of bounds for array {name} (size {size})")]
    #[diagnostic(code(sas::index_out_of_bounds))]
    IndexOutOfBounds {
        /// Array name.
        name: String,
        /// Subscript after truncation (missing renders as `.`).
        index: String,
        /// Declared array size.
        size: usize,
    },

    /// Date interval name not recognised by INTCK/INTNX.
    #[error("unsupported interval in {function} function: {interval}")]
    #[diagnostic(code(sas::unsupported_interval))]
    UnsupportedInterval {
        /// Function name.
        function: String,
        /// Interval as written.
        interval: String,
    },

    /// Argument outside the function's domain where the function fails hard.
    #[error("{function} function argument must be {requirement}")]
    #[diagnostic(code(sas::domain_error))]
    DomainError {
        /// Function name.
        function: String,
        /// Domain requirement, e.g. `"positive"`.
        requirement: String,
    },
}

/// Errors raised by the dataset registry.
#[derive(Debug, Error, Diagnostic)]
pub enum RegistryError {
    /// Library reference was never assigned with LIBNAME.
    #[error("libref '{libref}' is not assigned")]
    #[diagnostic(code(sas::unknown_library))]
    UnknownLibrary {
        /// The library reference.
        libref: String,
    },

    /// Dataset is neither in memory nor loadable from the library path.
    #[error("dataset {libref}.{name} does not exist")]
    #[diagnostic(code(sas::dataset_not_found))]
    DatasetNotFound {
        /// The library reference.
        libref: String,
        /// Dataset name.
        name: String,
    },

    /// No dataset has been created or selected yet.
    #[error("no current working dataset")]
    #[diagnostic(code(sas::no_current_dataset))]
    NoCurrentDataset,

    /// A delimited record could not be split into fields.
    #[error("malformed record at line {line} of {source_name}: {reason}")]
    #[diagnostic(code(sas::malformed_record))]
    MalformedRecord {
        /// File name or description of the source.
        source_name: String,
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        reason: String,
    },

    /// Underlying I/O failure while reading an external source.
    #[error("I/O error reading {path}: {source}")]
    #[diagnostic(code(sas::io))]
    Io {
        /// File path.
        path: String,
        /// The I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while executing statements, steps, and procedures.
#[derive(Debug, Error, Diagnostic)]
pub enum ExecError {
    /// Statement kind not allowed in this position.
    #[error("unsupported statement {statement} {context}")]
    #[diagnostic(code(sas::unsupported_statement))]
    UnsupportedStatement {
        /// Statement keyword.
        statement: String,
        /// Where it appeared, e.g. `"in DATA step"`.
        context: String,
    },

    /// ARRAY declared size differs from the number of listed variables.
    #[error("array {name} declared with size {declared} but lists {actual} variable(s)")]
    #[diagnostic(code(sas::array_size_mismatch))]
    ArraySizeMismatch {
        /// Array name.
        name: String,
        /// Declared size.
        declared: usize,
        /// Number of backing variables.
        actual: usize,
    },

    /// Counted DO loop with a zero BY increment.
    #[error("DO loop increment cannot be zero (loop variable {variable})")]
    #[diagnostic(code(sas::zero_increment))]
    ZeroIncrement {
        /// Loop variable.
        variable: String,
    },

    /// MERGE without a preceding BY statement.
    #[error("MERGE statement requires a preceding BY statement")]
    #[diagnostic(code(sas::missing_by))]
    MissingByStatement,

    /// BY variable is numeric in one dataset and character in another.
    #[error("data type mismatch for BY variable '{variable}' across datasets")]
    #[diagnostic(code(sas::by_key_type_mismatch))]
    ByKeyTypeMismatch {
        /// The BY variable.
        variable: String,
    },

    /// END with no active DO loop.
    #[error("END statement encountered without a corresponding DO loop")]
    #[diagnostic(code(sas::unmatched_end))]
    UnmatchedEnd,

    /// Expression evaluation failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Eval(#[from] EvalError),

    /// Dataset registry failure.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),
}

/// Result alias used throughout the executor.
pub type ExecResult<T> = Result<T, ExecError>;
