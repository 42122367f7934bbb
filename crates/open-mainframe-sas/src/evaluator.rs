//! SAS-105: Expression evaluation against the current PDV.

use crate::ast::Expr;
use crate::context::ExecutionContext;
use crate::error::EvalError;
use crate::functions::call_function;
use crate::log::SasLog;
use crate::value::{BinaryOperator, Value};

/// Evaluate an expression. Both operands of a binary operator are always
/// evaluated; there is no short-circuiting.
pub fn evaluate(expr: &Expr, ctx: &ExecutionContext, log: &mut SasLog) -> Result<Value, EvalError> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::String(s) => Ok(Value::Text(s.clone())),
        Expr::Variable(name) => Ok(lookup(name, ctx, log)),
        Expr::ArrayElement { array, index } => {
            let index = evaluate(index, ctx, log)?;
            let variable = ctx.array_element(array, &index)?;
            Ok(lookup(variable, ctx, log))
        }
        Expr::BinaryOp { op, left, right } => {
            let op = BinaryOperator::from_token(op)?;
            let l = evaluate(left, ctx, log)?;
            let r = evaluate(right, ctx, log)?;
            Ok(op.apply(&l, &r))
        }
        Expr::FunctionCall { name, args } => {
            let values = args
                .iter()
                .map(|a| evaluate(a, ctx, log))
                .collect::<Result<Vec<_>, _>>()?;
            call_function(name, &values, log)
        }
    }
}

/// Resolve an array subscript to its backing variable name.
pub fn resolve_array_target(
    array: &str,
    index: &Expr,
    ctx: &ExecutionContext,
    log: &mut SasLog,
) -> Result<String, EvalError> {
    let index = evaluate(index, ctx, log)?;
    ctx.array_element(array, &index).map(str::to_string)
}

fn lookup(name: &str, ctx: &ExecutionContext, log: &mut SasLog) -> Value {
    match ctx.current_row.get(name) {
        Some(v) => v.clone(),
        None => {
            log.warn(format!("Variable {name} is uninitialized"));
            Value::Missing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Row;
    use crate::log::Severity;

    fn ctx() -> ExecutionContext {
        let mut ctx = ExecutionContext::new();
        ctx.current_row = Row::from_pairs([("x", Value::Number(16.0)), ("y", Value::Number(30.0))]);
        ctx.current_row.set("name", Value::text("Ann"));
        ctx
    }

    #[test]
    fn test_arithmetic_over_row() {
        let mut log = SasLog::new();
        let e = Expr::binary("-", Expr::var("y"), Expr::binary("+", Expr::var("x"), Expr::num(9.0)));
        assert_eq!(evaluate(&e, &ctx(), &mut log).unwrap(), Value::Number(5.0));
    }

    #[test]
    fn test_absent_variable_warns() {
        let mut log = SasLog::new();
        let v = evaluate(&Expr::var("ghost"), &ctx(), &mut log).unwrap();
        assert_eq!(v, Value::Missing);
        assert!(log.contains(Severity::Warning, "ghost"));
    }

    #[test]
    fn test_nested_function_calls() {
        let mut log = SasLog::new();
        let e = Expr::call("UPCASE", vec![Expr::call("substr", vec![Expr::var("name"), Expr::num(2.0)])]);
        assert_eq!(evaluate(&e, &ctx(), &mut log).unwrap(), Value::text("NN"));
    }

    #[test]
    fn test_array_element() {
        let mut log = SasLog::new();
        let mut c = ctx();
        c.declare_array("v", vec!["x".into(), "y".into(), "z".into()]);
        let e = Expr::elem("V", Expr::binary("+", Expr::num(1.0), Expr::num(0.5)));
        assert_eq!(evaluate(&e, &c, &mut log).unwrap(), Value::Number(16.0));

        // z is declared but not present in the row.
        let e = Expr::elem("v", Expr::num(3.0));
        assert_eq!(evaluate(&e, &c, &mut log).unwrap(), Value::Missing);
        assert!(log.contains(Severity::Warning, "z"));

        let e = Expr::elem("v", Expr::num(4.0));
        assert!(matches!(
            evaluate(&e, &c, &mut log),
            Err(EvalError::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_unsupported_operator() {
        let mut log = SasLog::new();
        let e = Expr::binary("^", Expr::num(2.0), Expr::num(3.0));
        assert!(matches!(
            evaluate(&e, &ctx(), &mut log),
            Err(EvalError::UnsupportedOperator { .. })
        ));
    }

    #[test]
    fn test_no_short_circuit() {
        // The right operand is still evaluated, so its error surfaces.
        let mut log = SasLog::new();
        let e = Expr::binary("or", Expr::num(1.0), Expr::call("nosuch", vec![]));
        assert!(evaluate(&e, &ctx(), &mut log).is_err());
    }
}
