//! Built-in scalar and aggregate functions

use std::sync::Arc;

use crate::value::{CastTarget, Row, Value};

use super::errors::{FunctionError, FunctionResult};
use super::function::{Accumulator, QueryFunction};

/// Every built-in, by upper-case name
pub fn builtins() -> Vec<(&'static str, QueryFunction)> {
    vec![
        ("LOWER", scalar(lower)),
        ("UPPER", scalar(upper)),
        ("LENGTH", scalar(length)),
        ("CONCAT", scalar(concat)),
        ("CAST", scalar(cast)),
        ("ABS", scalar(|r, a| unary_math("ABS", r, a, f64::abs))),
        ("CEIL", scalar(|r, a| unary_math("CEIL", r, a, f64::ceil))),
        ("FLOOR", scalar(|r, a| unary_math("FLOOR", r, a, f64::floor))),
        ("SQRT", scalar(|r, a| unary_math("SQRT", r, a, f64::sqrt))),
        ("POW", scalar(pow)),
        ("ROUND", scalar(round)),
        ("COUNT", aggregate(Value::Int(0), count)),
        ("SUM", aggregate(Value::Int(0), sum)),
        ("AVG", aggregate(Value::Int(0), avg)),
        ("MIN", aggregate(Value::Null, min)),
        ("MAX", aggregate(Value::Null, max)),
    ]
}

fn scalar<F>(f: F) -> QueryFunction
where
    F: Fn(&Row, &[Value]) -> FunctionResult<Value> + Send + Sync + 'static,
{
    QueryFunction::Scalar(Arc::new(f))
}

fn aggregate<F>(start: Value, f: F) -> QueryFunction
where
    F: Fn(&Row, Accumulator, &[Value]) -> Accumulator + Send + Sync + 'static,
{
    QueryFunction::Aggregate {
        start: Accumulator::starting_at(start),
        step: Arc::new(f),
    }
}

fn first<'a>(name: &str, args: &'a [Value]) -> FunctionResult<&'a Value> {
    args.first()
        .ok_or_else(|| FunctionError::invalid_args(name, "expected at least one argument"))
}

fn lower(_row: &Row, args: &[Value]) -> FunctionResult<Value> {
    Ok(match first("LOWER", args)? {
        Value::String(s) => Value::String(s.to_lowercase()),
        Value::Null => Value::Null,
        other => Value::String(other.to_string().to_lowercase()),
    })
}

fn upper(_row: &Row, args: &[Value]) -> FunctionResult<Value> {
    Ok(match first("UPPER", args)? {
        Value::String(s) => Value::String(s.to_uppercase()),
        Value::Null => Value::Null,
        other => Value::String(other.to_string().to_uppercase()),
    })
}

fn length(_row: &Row, args: &[Value]) -> FunctionResult<Value> {
    Ok(match first("LENGTH", args)? {
        Value::String(s) => Value::Int(s.chars().count() as i64),
        Value::Array(a) => Value::Int(a.len() as i64),
        Value::Blob(b) => Value::Int(b.len() as i64),
        _ => Value::Null,
    })
}

fn concat(_row: &Row, args: &[Value]) -> FunctionResult<Value> {
    let joined: String = args
        .iter()
        .filter(|v| !v.is_null())
        .map(|v| v.to_string())
        .collect();
    Ok(Value::String(joined))
}

fn cast(_row: &Row, args: &[Value]) -> FunctionResult<Value> {
    let value = first("CAST", args)?;
    let target = args
        .get(1)
        .and_then(|t| t.as_str())
        .ok_or_else(|| FunctionError::invalid_args("CAST", "expected a type name"))?;
    let target = CastTarget::parse(target)
        .ok_or_else(|| FunctionError::invalid_args("CAST", format!("unknown type '{}'", target)))?;
    Ok(value.cast(target))
}

fn unary_math(name: &str, _row: &Row, args: &[Value], f: fn(f64) -> f64) -> FunctionResult<Value> {
    let value = first(name, args)?;
    Ok(match (name, value) {
        ("ABS", Value::Int(i)) => Value::Int(i.saturating_abs()),
        ("CEIL" | "FLOOR", Value::Int(i)) => Value::Int(*i),
        (_, v) => match v.as_f64() {
            Some(x) => float_or_int(f(x)),
            None => Value::Null,
        },
    })
}

fn pow(_row: &Row, args: &[Value]) -> FunctionResult<Value> {
    let base = first("POW", args)?;
    let exp = args
        .get(1)
        .ok_or_else(|| FunctionError::invalid_args("POW", "expected an exponent"))?;
    Ok(match (base.as_f64(), exp.as_f64()) {
        (Some(b), Some(e)) => float_or_int(b.powf(e)),
        _ => Value::Null,
    })
}

fn round(_row: &Row, args: &[Value]) -> FunctionResult<Value> {
    let value = first("ROUND", args)?;
    let digits = args.get(1).and_then(|d| d.as_i64()).unwrap_or(0);
    Ok(match value.as_f64() {
        Some(x) => {
            let factor = 10f64.powi(digits.clamp(-15, 15) as i32);
            float_or_int((x * factor).round() / factor)
        }
        None => Value::Null,
    })
}

/// Integral results of int-valued math come back as `Int`
fn float_or_int(x: f64) -> Value {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < 9.0e15 {
        Value::Int(x as i64)
    } else {
        Value::Float(x)
    }
}

fn count(_row: &Row, mut acc: Accumulator, args: &[Value]) -> Accumulator {
    let present = args.first().map(|v| !v.is_null()).unwrap_or(true);
    if present {
        acc.count += 1;
        acc.result = Value::Int(acc.count as i64);
    }
    acc
}

fn sum(_row: &Row, mut acc: Accumulator, args: &[Value]) -> Accumulator {
    let value = match args.first() {
        Some(v) if v.is_number() => v,
        _ => return acc,
    };
    acc.count += 1;
    acc.total += value.as_f64().unwrap_or(0.0);
    acc.result = match (&acc.result, value) {
        (Value::Int(a), Value::Int(b)) => match a.checked_add(*b) {
            Some(s) => Value::Int(s),
            None => Value::Float(acc.total),
        },
        _ => Value::Float(acc.total),
    };
    acc
}

fn avg(_row: &Row, mut acc: Accumulator, args: &[Value]) -> Accumulator {
    let value = match args.first().and_then(|v| v.as_f64()) {
        Some(x) => x,
        None => return acc,
    };
    acc.count += 1;
    acc.total += value;
    acc.result = Value::Float(acc.total / acc.count as f64);
    acc
}

fn min(row: &Row, acc: Accumulator, args: &[Value]) -> Accumulator {
    extremum(row, acc, args, |candidate, current| candidate < current)
}

fn max(row: &Row, acc: Accumulator, args: &[Value]) -> Accumulator {
    extremum(row, acc, args, |candidate, current| candidate > current)
}

fn extremum(
    row: &Row,
    mut acc: Accumulator,
    args: &[Value],
    better: fn(&Value, &Value) -> bool,
) -> Accumulator {
    let value = match args.first() {
        Some(v) if !v.is_null() => v,
        _ => return acc,
    };
    acc.count += 1;
    if acc.result.is_null() || better(value, &acc.result) {
        acc.result = value.clone();
        acc.row = Some(row.clone());
    }
    acc
}
