//! SAS abstract syntax tree.
//!
//! The tree is produced by an external parser. A program is a sequence of
//! top-level statements (DATA steps, PROCs, global statements); DATA step
//! bodies reuse the same [`Statement`] type.

use serde::{Deserialize, Serialize};

/// A SAS program: a sequence of top-level statements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl Program {
    /// Create a program from statements.
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    /// Decode a program handed over as JSON by the parser.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Encode the program as JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A SAS statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// `DATA out; [SET in;] body; RUN;`
    DataStep(DataStep),
    /// `OPTIONS key=value ...;`
    Options(Vec<(String, String)>),
    /// `LIBNAME libref 'path';`
    Libname { libref: String, path: String },
    /// `TITLE 'text';`
    Title(String),
    /// `PROC ...; RUN;`
    Proc(Proc),
    /// `IF cond THEN ...; ELSE IF cond THEN ...; ELSE ...;` with block bodies.
    IfElseIf(IfElseIf),
    /// `IF cond THEN stmt;` (single branch).
    IfThen {
        condition: Expr,
        then: Vec<Statement>,
    },
    /// `ARRAY name{size} var1 ... varN;`
    Array(ArrayDecl),
    /// `MERGE ds1 ds2 ...;`
    Merge { datasets: Vec<String> },
    /// `BY var1 ... varN;`
    By { variables: Vec<String> },
    /// `DO [WHILE(cond) | UNTIL(cond)]; ... END;`
    DoLoop(DoLoop),
    /// `END;` closing a conditional DO loop pass.
    End,
    /// `target = expr;`
    Assignment { target: AssignTarget, expr: Expr },
    /// `OUTPUT;`
    Output,
    /// `DROP var ...;`
    Drop(Vec<String>),
    /// `KEEP var ...;`
    Keep(Vec<String>),
    /// `RETAIN var [initial] ...;`
    Retain(Vec<RetainVar>),
    /// `DO var = start TO end [BY incr]; ... END;`
    Do(DoCounted),
    /// `DO; ... END;` nested statement block.
    Block(Vec<Statement>),
}

impl Statement {
    /// Keyword used in diagnostics.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::DataStep(_) => "DATA",
            Self::Options(_) => "OPTIONS",
            Self::Libname { .. } => "LIBNAME",
            Self::Title(_) => "TITLE",
            Self::Proc(_) => "PROC",
            Self::IfElseIf(_) => "IF/ELSE IF",
            Self::IfThen { .. } => "IF-THEN",
            Self::Array(_) => "ARRAY",
            Self::Merge { .. } => "MERGE",
            Self::By { .. } => "BY",
            Self::DoLoop(_) => "DO WHILE/UNTIL",
            Self::End => "END",
            Self::Assignment { .. } => "assignment",
            Self::Output => "OUTPUT",
            Self::Drop(_) => "DROP",
            Self::Keep(_) => "KEEP",
            Self::Retain(_) => "RETAIN",
            Self::Do(_) => "DO",
            Self::Block(_) => "DO block",
        }
    }

    /// Convenience constructor for `name = expr;`.
    pub fn assign(name: impl Into<String>, expr: Expr) -> Self {
        Self::Assignment {
            target: AssignTarget::Variable(name.into()),
            expr,
        }
    }
}

/// Left-hand side of an assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AssignTarget {
    /// Plain variable.
    Variable(String),
    /// `array{index}`.
    ArrayElement { array: String, index: Expr },
}

/// DATA step definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataStep {
    /// Output dataset, optionally library-qualified.
    pub output: String,
    /// SET dataset, optionally library-qualified.
    pub input: Option<String>,
    /// INPUT statement variables (used with DATALINES).
    pub input_vars: Vec<InputVar>,
    /// Raw DATALINES records.
    pub datalines: Vec<String>,
    /// Body statements in program order.
    pub statements: Vec<Statement>,
}

/// A variable listed on an INPUT statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputVar {
    pub name: String,
    /// `true` when followed by `$` (character variable).
    pub character: bool,
}

impl InputVar {
    /// Numeric input variable.
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            character: false,
        }
    }

    /// Character (`$`) input variable.
    pub fn character(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            character: true,
        }
    }
}

/// A RETAIN variable with an optional initial value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetainVar {
    pub name: String,
    pub initial: Option<crate::value::Value>,
}

impl RetainVar {
    /// Retained variable without an initial value.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            initial: None,
        }
    }
}

/// IF / ELSE IF / ELSE chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfElseIf {
    pub condition: Expr,
    pub then: Vec<Statement>,
    pub else_ifs: Vec<(Expr, Vec<Statement>)>,
    pub otherwise: Vec<Statement>,
}

/// ARRAY declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayDecl {
    pub name: String,
    pub size: usize,
    pub variables: Vec<String>,
}

/// Counted DO loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoCounted {
    pub variable: String,
    pub start: Expr,
    pub end: Expr,
    /// BY increment; defaults to 1.
    pub increment: Option<Expr>,
    pub body: Vec<Statement>,
}

/// Loop condition kind for [`DoLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopKind {
    /// Run while the condition is true.
    While,
    /// Run until the condition becomes true.
    Until,
}

/// Conditional DO loop closed by `END`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoLoop {
    pub kind: LoopKind,
    /// `None` makes a simple `DO; ... END;` group that runs one pass.
    pub condition: Option<Expr>,
    pub body: Box<Statement>,
}

/// PROC step variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Proc {
    Sort(ProcSort),
    Means(ProcMeans),
    Print(ProcPrint),
    /// Any other procedure name; reported as unsupported.
    Other { name: String },
}

/// `PROC SORT DATA=in [OUT=out] [NODUPKEY] [DUPLICATES]; BY ...; [WHERE ...;]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcSort {
    pub input: String,
    pub output: Option<String>,
    pub by: Vec<String>,
    pub where_clause: Option<Expr>,
    pub nodupkey: bool,
    pub duplicates: bool,
}

/// `PROC MEANS DATA=ds; VAR ...;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcMeans {
    pub dataset: String,
    /// Variables to summarize; empty means every numeric column.
    pub variables: Vec<String>,
}

/// `PROC PRINT DATA=ds [OBS=n] [NOOBS]; [VAR ...;]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcPrint {
    pub dataset: String,
    /// Columns to print; empty means all declared columns.
    pub variables: Vec<String>,
    pub obs: Option<usize>,
    pub noobs: bool,
}

/// A SAS expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Numeric literal.
    Number(f64),
    /// Character literal.
    String(String),
    /// Variable reference.
    Variable(String),
    /// `name(args...)`
    FunctionCall { name: String, args: Vec<Expr> },
    /// `array{index}`
    ArrayElement { array: String, index: Box<Expr> },
    /// `left op right`; `op` is the operator token (`+`, `>=`, `and`, ...).
    BinaryOp {
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    /// Numeric literal.
    pub fn num(n: f64) -> Self {
        Self::Number(n)
    }

    /// Character literal.
    pub fn str(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    /// Variable reference.
    pub fn var(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    /// Function call.
    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::FunctionCall {
            name: name.into(),
            args,
        }
    }

    /// Array element reference.
    pub fn elem(array: impl Into<String>, index: Expr) -> Self {
        Self::ArrayElement {
            array: array.into(),
            index: Box::new(index),
        }
    }

    /// Binary operation.
    pub fn binary(op: impl Into<String>, left: Expr, right: Expr) -> Self {
        Self::BinaryOp {
            op: op.into(),
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}
