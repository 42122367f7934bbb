//! SAS-105: Built-in functions.
//!
//! - String: SUBSTR, TRIM, LEFT, RIGHT, UPCASE, LOWCASE
//! - Numeric: SQRT, ABS, LOG, LOG10, CEIL, FLOOR, ROUND, EXP
//! - Date: TODAY, DATEPART, TIMEPART, INTCK, INTNX
//!
//! SAS dates are day counts from 1960-01-01; datetimes are second counts
//! from the same epoch.

use chrono::{Datelike, Days, Local, NaiveDate};

use crate::error::EvalError;
use crate::log::SasLog;
use crate::value::{format_number, Value};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Dispatch a built-in function call. Names are matched case-insensitively.
pub fn call_function(name: &str, args: &[Value], log: &mut SasLog) -> Result<Value, EvalError> {
    let lower = name.to_lowercase();
    match lower.as_str() {
        // -- String functions --
        "substr" => fn_substr(args),
        "trim" | "right" => string_fn(&lower, args, |s| s.trim_end().to_string()),
        "left" => string_fn(&lower, args, |s| s.trim_start().to_string()),
        "upcase" => string_fn(&lower, args, str::to_uppercase),
        "lowcase" => string_fn(&lower, args, str::to_lowercase),

        // -- Numeric functions --
        "sqrt" => fn_sqrt(args, log),
        "abs" => numeric_fn(&lower, args, f64::abs),
        "log" => fn_log(args, log),
        "log10" => fn_log10(args),
        "ceil" => numeric_fn(&lower, args, f64::ceil),
        "floor" => numeric_fn(&lower, args, f64::floor),
        "round" => fn_round(args),
        "exp" => numeric_fn(&lower, args, f64::exp),

        // -- Date functions --
        "today" => fn_today(args),
        "datepart" => numeric_fn(&lower, args, |dt| (dt / SECONDS_PER_DAY).floor()),
        "timepart" => numeric_fn(&lower, args, |dt| dt.rem_euclid(SECONDS_PER_DAY)),
        "intck" => fn_intck(args),
        "intnx" => fn_intnx(args),

        _ => Err(EvalError::UnsupportedFunction {
            name: name.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
//  Helpers
// ---------------------------------------------------------------------------

fn check_arity(function: &str, args: &[Value], min: usize, max: usize) -> Result<(), EvalError> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = match max - min {
        0 => min.to_string(),
        1 => format!("{min} or {max}"),
        _ => format!("{min} to {max}"),
    };
    Err(EvalError::ArityMismatch {
        function: function.to_string(),
        expected,
        got: args.len(),
    })
}

/// Text argument. Missing reads as empty text; numbers are rejected.
fn text_arg<'a>(function: &str, value: &'a Value) -> Result<&'a str, EvalError> {
    match value {
        Value::Text(s) => Ok(s),
        Value::Missing => Ok(""),
        Value::Number(_) => Err(EvalError::TypeMismatch {
            function: function.to_string(),
            expected: "character".to_string(),
            got: value.type_name().to_string(),
        }),
    }
}

fn string_fn(function: &str, args: &[Value], f: impl Fn(&str) -> String) -> Result<Value, EvalError> {
    check_arity(function, args, 1, 1)?;
    Ok(Value::Text(f(text_arg(function, &args[0])?)))
}

fn numeric_fn(function: &str, args: &[Value], f: impl Fn(f64) -> f64) -> Result<Value, EvalError> {
    check_arity(function, args, 1, 1)?;
    Ok(args[0].to_number().map_or(Value::Missing, |n| Value::Number(f(n))))
}

// ---------------------------------------------------------------------------
//  String functions
// ---------------------------------------------------------------------------

fn fn_substr(args: &[Value]) -> Result<Value, EvalError> {
    check_arity("substr", args, 2, 3)?;
    let chars: Vec<char> = text_arg("substr", &args[0])?.chars().collect();
    let Some(pos) = args[1].to_number() else {
        return Ok(Value::text(""));
    };
    let start = pos.trunc();
    if start < 1.0 || start > chars.len() as f64 {
        return Ok(Value::text(""));
    }
    let start = start as usize - 1;
    let tail = chars.len() - start;
    let len = match args.get(2) {
        None => tail,
        Some(v) => match v.to_number() {
            Some(n) if n >= 1.0 => (n.trunc() as usize).min(tail),
            Some(_) => 0,
            None => tail,
        },
    };
    Ok(Value::Text(chars[start..start + len].iter().collect()))
}

// ---------------------------------------------------------------------------
//  Numeric functions
// ---------------------------------------------------------------------------

fn fn_sqrt(args: &[Value], log: &mut SasLog) -> Result<Value, EvalError> {
    check_arity("sqrt", args, 1, 1)?;
    match args[0].to_number() {
        None => Ok(Value::Missing),
        Some(n) if n < 0.0 => {
            log.warn(format!(
                "Invalid argument to function SQRT({}); result set to missing",
                format_number(n)
            ));
            Ok(Value::Missing)
        }
        Some(n) => Ok(Value::Number(n.sqrt())),
    }
}

fn fn_log(args: &[Value], log: &mut SasLog) -> Result<Value, EvalError> {
    check_arity("log", args, 1, 1)?;
    match args[0].to_number() {
        None => Ok(Value::Missing),
        Some(n) if n <= 0.0 => {
            log.warn(format!(
                "Invalid argument to function LOG({}); result set to missing",
                format_number(n)
            ));
            Ok(Value::Missing)
        }
        Some(n) => Ok(Value::Number(n.ln())),
    }
}

fn fn_log10(args: &[Value]) -> Result<Value, EvalError> {
    check_arity("log10", args, 1, 1)?;
    match args[0].to_number() {
        None => Ok(Value::Missing),
        Some(n) if n <= 0.0 => Err(EvalError::DomainError {
            function: "log10".to_string(),
            requirement: "positive".to_string(),
        }),
        Some(n) => Ok(Value::Number(n.log10())),
    }
}

/// Past this many decimal places the scale factor leaves the `f64` range.
const MAX_ROUND_DIGITS: f64 = 308.0;

fn fn_round(args: &[Value]) -> Result<Value, EvalError> {
    check_arity("round", args, 1, 2)?;
    let Some(x) = args[0].to_number() else {
        return Ok(Value::Missing);
    };
    let digits = match args.get(1) {
        None => 0,
        Some(v) => match v.to_number() {
            Some(d) => d.trunc().clamp(-MAX_ROUND_DIGITS, MAX_ROUND_DIGITS) as i32,
            None => return Ok(Value::Missing),
        },
    };
    Ok(Value::Number(round_half_away(x, digits)))
}

/// Round half away from zero at `10^-digits`. The scaled value is snapped
/// through a nine-decimal rendering first so binary noise such as
/// `2.345 * 100 = 234.49999999999997` rounds as the decimal literal does.
pub fn round_half_away(x: f64, digits: i32) -> f64 {
    let digits = digits.clamp(-(MAX_ROUND_DIGITS as i32), MAX_ROUND_DIGITS as i32);
    let factor = 10f64.powi(digits);
    let scaled = x * factor;
    if !scaled.is_finite() {
        return x;
    }
    let snapped: f64 = format!("{scaled:.9}").parse().unwrap_or(scaled);
    if digits >= 0 {
        snapped.round() / factor
    } else {
        snapped.round() * 10f64.powi(-digits)
    }
}

// ---------------------------------------------------------------------------
//  Date functions
// ---------------------------------------------------------------------------

/// Supported INTCK/INTNX intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interval {
    Day,
    Week,
    Month,
    Year,
}

impl Interval {
    fn parse(function: &str, value: &Value) -> Result<Self, EvalError> {
        let Value::Text(s) = value else {
            return Err(EvalError::TypeMismatch {
                function: function.to_string(),
                expected: "character interval".to_string(),
                got: value.type_name().to_string(),
            });
        };
        match s.trim().to_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            _ => Err(EvalError::UnsupportedInterval {
                function: function.to_string(),
                interval: s.clone(),
            }),
        }
    }
}

/// INTNX alignment within the target interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Alignment {
    Beginning,
    Middle,
    End,
    Same,
}

impl Alignment {
    fn parse(value: &Value) -> Result<Self, EvalError> {
        match value.to_text().trim().to_lowercase().as_str() {
            "b" | "beginning" => Ok(Self::Beginning),
            "m" | "middle" => Ok(Self::Middle),
            "e" | "end" => Ok(Self::End),
            "s" | "same" | "sameday" => Ok(Self::Same),
            _ => Err(EvalError::DomainError {
                function: "intnx".to_string(),
                requirement: "one of BEGINNING, MIDDLE, END, SAME".to_string(),
            }),
        }
    }
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1960, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Largest day offset or interval count the date functions accept.
const MAX_DATE_SPAN: f64 = 3_000_000.0;

/// Whole days from a SAS date, `None` when outside the supported span.
fn to_day(days: f64) -> Option<i64> {
    let days = days.floor();
    (days.is_finite() && days.abs() <= MAX_DATE_SPAN).then_some(days as i64)
}

fn to_date(days: f64) -> Option<NaiveDate> {
    let days = to_day(days)?;
    if days >= 0 {
        epoch().checked_add_days(Days::new(days as u64))
    } else {
        epoch().checked_sub_days(Days::new(days.unsigned_abs()))
    }
}

fn from_date(date: NaiveDate) -> f64 {
    (date - epoch()).num_days() as f64
}

/// Week number counted from the Sunday that starts each SAS week
/// (1960-01-03 is day 2 and a Sunday).
fn week_index(days: i64) -> i64 {
    (days - 2).div_euclid(7)
}

fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

fn first_of_month(index: i64) -> Option<NaiveDate> {
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    NaiveDate::from_ymd_opt(year, index.rem_euclid(12) as u32 + 1, 1)
}

fn last_of_month(index: i64) -> Option<NaiveDate> {
    first_of_month(index + 1)?.pred_opt()
}

fn fn_today(args: &[Value]) -> Result<Value, EvalError> {
    check_arity("today", args, 0, 0)?;
    Ok(Value::Number(from_date(Local::now().date_naive())))
}

fn fn_intck(args: &[Value]) -> Result<Value, EvalError> {
    check_arity("intck", args, 3, 3)?;
    let interval = Interval::parse("intck", &args[0])?;
    let (Some(start), Some(end)) = (args[1].to_number(), args[2].to_number()) else {
        return Ok(Value::Missing);
    };
    let (Some(start_day), Some(end_day)) = (to_day(start), to_day(end)) else {
        return Ok(Value::Missing);
    };
    let count = match interval {
        Interval::Day => end_day - start_day,
        Interval::Week => week_index(end_day) - week_index(start_day),
        Interval::Month | Interval::Year => {
            let (Some(s), Some(e)) = (to_date(start), to_date(end)) else {
                return Ok(Value::Missing);
            };
            if interval == Interval::Month {
                month_index(e) - month_index(s)
            } else {
                i64::from(e.year()) - i64::from(s.year())
            }
        }
    };
    Ok(Value::Number(count as f64))
}

fn fn_intnx(args: &[Value]) -> Result<Value, EvalError> {
    check_arity("intnx", args, 3, 4)?;
    let interval = Interval::parse("intnx", &args[0])?;
    let alignment = match args.get(3) {
        Some(v) => Alignment::parse(v)?,
        None => Alignment::Beginning,
    };
    let (Some(start), Some(n)) = (args[1].to_number(), args[2].to_number()) else {
        return Ok(Value::Missing);
    };
    let n = n.trunc();
    if !n.is_finite() || n.abs() > MAX_DATE_SPAN {
        return Ok(Value::Missing);
    }
    let n = n as i64;
    let (Some(day), Some(date)) = (to_day(start), to_date(start)) else {
        return Ok(Value::Missing);
    };

    // (first day, last day, same-day candidate) of the target interval.
    let bounds = match interval {
        Interval::Day => {
            let d = day + n;
            Some((d, d, d))
        }
        Interval::Week => {
            let begin = (week_index(day) + n) * 7 + 2;
            Some((begin, begin + 6, day + n * 7))
        }
        Interval::Month => {
            let index = month_index(date) + n;
            first_of_month(index)
                .zip(last_of_month(index))
                .map(|(first, last)| {
                    let same = first
                        .with_day(date.day().min(last.day()))
                        .unwrap_or(first);
                    (from_date(first) as i64, from_date(last) as i64, from_date(same) as i64)
                })
        }
        Interval::Year => {
            let year = i64::from(date.year()) + n;
            let index = year * 12;
            first_of_month(index)
                .zip(last_of_month(index + 11))
                .map(|(first, last)| {
                    let month_end = last_of_month(index + i64::from(date.month0()))
                        .map_or(28, |d| d.day());
                    let same = NaiveDate::from_ymd_opt(
                        first.year(),
                        date.month(),
                        date.day().min(month_end),
                    )
                    .unwrap_or(first);
                    (from_date(first) as i64, from_date(last) as i64, from_date(same) as i64)
                })
        }
    };
    let Some((begin, end, same)) = bounds else {
        return Ok(Value::Missing);
    };
    let result = match alignment {
        Alignment::Beginning => begin,
        Alignment::Middle => begin + (end - begin) / 2,
        Alignment::End => end,
        Alignment::Same => same,
    };
    Ok(Value::Number(result as f64))
}

// ---------------------------------------------------------------------------
//  Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::Severity;

    fn call(name: &str, args: &[Value]) -> Result<Value, EvalError> {
        call_function(name, args, &mut SasLog::new())
    }

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    fn sas_date(y: i32, m: u32, d: u32) -> f64 {
        from_date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_substr() {
        let s = Value::text("Hello World");
        assert_eq!(call("substr", &[s.clone(), num(7.0)]).unwrap(), Value::text("World"));
        assert_eq!(call("SUBSTR", &[s.clone(), num(1.0), num(5.0)]).unwrap(), Value::text("Hello"));
        assert_eq!(call("substr", &[s.clone(), num(9.0), num(50.0)]).unwrap(), Value::text("rld"));
        assert_eq!(call("substr", &[s.clone(), num(0.0)]).unwrap(), Value::text(""));
        assert_eq!(call("substr", &[s, num(40.0)]).unwrap(), Value::text(""));
    }

    #[test]
    fn test_substr_rejects_numeric_source() {
        let err = call("substr", &[num(12345.0), num(1.0)]).unwrap_err();
        assert!(matches!(err, EvalError::TypeMismatch { .. }));
    }

    #[test]
    fn test_trim_family() {
        let s = Value::text("  pad  ");
        assert_eq!(call("trim", &[s.clone()]).unwrap(), Value::text("  pad"));
        assert_eq!(call("left", &[s.clone()]).unwrap(), Value::text("pad  "));
        assert_eq!(call("right", &[s]).unwrap(), Value::text("  pad"));
        assert_eq!(call("trim", &[Value::Missing]).unwrap(), Value::text(""));
    }

    #[test]
    fn test_case_functions() {
        assert_eq!(call("upcase", &[Value::text("abC")]).unwrap(), Value::text("ABC"));
        assert_eq!(call("lowcase", &[Value::text("AbC")]).unwrap(), Value::text("abc"));
    }

    #[test]
    fn test_sqrt_and_log() {
        assert_eq!(call("sqrt", &[num(16.0)]).unwrap(), num(4.0));
        let Value::Number(l) = call("log", &[num(30.0)]).unwrap() else {
            panic!("expected number");
        };
        assert!((l - 3.4011973817).abs() < 1e-7);
    }

    #[test]
    fn test_negative_sqrt_warns_and_is_missing() {
        let mut log = SasLog::new();
        let v = call_function("sqrt", &[num(-4.0)], &mut log).unwrap();
        assert_eq!(v, Value::Missing);
        assert!(log.contains(Severity::Warning, "SQRT"));

        let v = call_function("log", &[num(0.0)], &mut log).unwrap();
        assert_eq!(v, Value::Missing);
        assert!(log.contains(Severity::Warning, "LOG"));
    }

    #[test]
    fn test_log10_domain_error() {
        assert_eq!(call("log10", &[num(1000.0)]).unwrap(), num(3.0));
        let err = call("log10", &[num(-1.0)]).unwrap_err();
        assert!(matches!(err, EvalError::DomainError { .. }));
    }

    #[test]
    fn test_numeric_missing_propagates() {
        for f in ["abs", "ceil", "floor", "exp", "sqrt", "round"] {
            assert_eq!(call(f, &[Value::Missing]).unwrap(), Value::Missing, "{f}");
        }
    }

    #[test]
    fn test_round() {
        assert_eq!(call("round", &[num(2.345), num(2.0)]).unwrap(), num(2.35));
        assert_eq!(call("round", &[num(-2.5)]).unwrap(), num(-3.0));
        assert_eq!(call("round", &[num(2.5)]).unwrap(), num(3.0));
        assert_eq!(call("round", &[num(1234.0), num(-2.0)]).unwrap(), num(1200.0));
    }

    #[test]
    fn test_round_extreme_digits() {
        assert_eq!(call("round", &[num(5.0), num(-3e9)]).unwrap(), num(0.0));
        assert_eq!(call("round", &[num(5.25), num(3e9)]).unwrap(), num(5.25));
        assert_eq!(round_half_away(7.5, i32::MIN), 0.0);
        assert_eq!(round_half_away(7.5, i32::MAX), 7.5);
    }

    #[test]
    fn test_date_functions_out_of_range_are_missing() {
        let day = Value::text("day");
        assert_eq!(call("intck", &[day.clone(), num(-1e300), num(1e300)]).unwrap(), Value::Missing);
        assert_eq!(call("intck", &[Value::text("week"), num(0.0), num(f64::MAX)]).unwrap(), Value::Missing);
        assert_eq!(call("intnx", &[day.clone(), num(10.0), num(1e300)]).unwrap(), Value::Missing);
        assert_eq!(call("intnx", &[Value::text("week"), num(-1e300), num(1.0)]).unwrap(), Value::Missing);
        assert_eq!(call("intnx", &[Value::text("month"), num(0.0), num(-9e18)]).unwrap(), Value::Missing);
        assert_eq!(call("intnx", &[day, num(10.0), num(5.0)]).unwrap(), num(15.0));
    }

    #[test]
    fn test_ceil_floor_abs() {
        assert_eq!(call("ceil", &[num(1.2)]).unwrap(), num(2.0));
        assert_eq!(call("floor", &[num(-1.2)]).unwrap(), num(-2.0));
        assert_eq!(call("abs", &[num(-5.0)]).unwrap(), num(5.0));
    }

    #[test]
    fn test_arity_mismatch() {
        let err = call("abs", &[]).unwrap_err();
        assert_eq!(
            err,
            EvalError::ArityMismatch {
                function: "abs".into(),
                expected: "1".into(),
                got: 0
            }
        );
        let err = call("substr", &[Value::text("a")]).unwrap_err();
        assert!(matches!(err, EvalError::ArityMismatch { ref expected, .. } if expected == "2 or 3"));
    }

    #[test]
    fn test_unknown_function() {
        let err = call("mean", &[num(1.0)]).unwrap_err();
        assert!(matches!(err, EvalError::UnsupportedFunction { .. }));
    }

    #[test]
    fn test_datepart_timepart() {
        let dt = 3.0 * SECONDS_PER_DAY + 3_661.0;
        assert_eq!(call("datepart", &[num(dt)]).unwrap(), num(3.0));
        assert_eq!(call("timepart", &[num(dt)]).unwrap(), num(3_661.0));
    }

    #[test]
    fn test_today_is_after_epoch() {
        let Value::Number(d) = call("today", &[]).unwrap() else {
            panic!("expected number");
        };
        assert!(d > sas_date(2020, 1, 1));
    }

    #[test]
    fn test_epoch_is_day_zero() {
        assert_eq!(sas_date(1960, 1, 1), 0.0);
        assert_eq!(sas_date(1960, 1, 3), 2.0);
    }

    #[test]
    fn test_intck() {
        let jan31 = num(sas_date(2024, 1, 31));
        let feb1 = num(sas_date(2024, 2, 1));
        let day = Value::text("DAY");
        assert_eq!(call("intck", &[day, jan31.clone(), feb1.clone()]).unwrap(), num(1.0));
        assert_eq!(
            call("intck", &[Value::text("month"), jan31.clone(), feb1.clone()]).unwrap(),
            num(1.0)
        );
        assert_eq!(
            call("intck", &[Value::text("year"), jan31, num(sas_date(2026, 1, 1))]).unwrap(),
            num(2.0)
        );
        // 2024-02-03 is a Saturday, 2024-02-04 a Sunday.
        assert_eq!(
            call(
                "intck",
                &[Value::text("week"), num(sas_date(2024, 2, 3)), num(sas_date(2024, 2, 4))]
            )
            .unwrap(),
            num(1.0)
        );
    }

    #[test]
    fn test_intnx_month_alignments() {
        let start = num(sas_date(2024, 1, 31));
        let month = Value::text("month");
        let b = call("intnx", &[month.clone(), start.clone(), num(1.0)]).unwrap();
        assert_eq!(b, num(sas_date(2024, 2, 1)));
        let e = call("intnx", &[month.clone(), start.clone(), num(1.0), Value::text("end")]).unwrap();
        assert_eq!(e, num(sas_date(2024, 2, 29)));
        let s = call("intnx", &[month.clone(), start.clone(), num(1.0), Value::text("same")]).unwrap();
        assert_eq!(s, num(sas_date(2024, 2, 29)));
        let m = call("intnx", &[month, start, num(-1.0), Value::text("middle")]).unwrap();
        assert_eq!(m, num(sas_date(2023, 12, 16)));
    }

    #[test]
    fn test_intnx_day_week_year() {
        let start = num(sas_date(2024, 2, 29));
        assert_eq!(
            call("intnx", &[Value::text("day"), start.clone(), num(1.0)]).unwrap(),
            num(sas_date(2024, 3, 1))
        );
        // Thursday 2024-02-29 -> Sunday 2024-03-03 begins the next week.
        assert_eq!(
            call("intnx", &[Value::text("week"), start.clone(), num(1.0)]).unwrap(),
            num(sas_date(2024, 3, 3))
        );
        assert_eq!(
            call("intnx", &[Value::text("year"), start.clone(), num(1.0), Value::text("s")]).unwrap(),
            num(sas_date(2025, 2, 28))
        );
        assert_eq!(
            call("intnx", &[Value::text("year"), start, num(0.0), Value::text("e")]).unwrap(),
            num(sas_date(2024, 12, 31))
        );
    }

    #[test]
    fn test_interval_errors() {
        let err = call("intck", &[Value::text("qtr"), num(0.0), num(1.0)]).unwrap_err();
        assert!(matches!(err, EvalError::UnsupportedInterval { .. }));
        let err = call("intnx", &[num(1.0), num(0.0), num(1.0)]).unwrap_err();
        assert!(matches!(err, EvalError::TypeMismatch { .. }));
    }
}
