//! Process-wide registry of the functions callable from formulas.
//!
//! Functions register under mangled names: the base name, an underscore,
//! then one character per argument type in declaration order (`i` Int32,
//! `I` Int64, `f` Float32, `F` Float64, `s` Str, `b` Bool, `d` Date, `D`
//! DateTime). A zero-argument function ends in a bare underscore. The
//! resolver builds the same string from an expression's argument types, so
//! overload selection is a single map lookup.
//!
//! Clients add their own functions with [`register_function`]:
//!
//! ```
//! use livegrid::{register_function, FunctionInfo, DataType, Value};
//!
//! fn is_odd(args: &[Value]) -> Result<Value, livegrid::Error> {
//!     Ok(Value::Bool(args[0].as_int32()? % 2 != 0))
//! }
//!
//! register_function("isOdd_i", FunctionInfo {
//!     function: is_odd,
//!     return_type: DataType::Bool,
//!     argc: 1,
//! });
//! ```

use crate::error::Error;
use crate::value::{DataType, Date, DateTime, Value};
use std::collections::HashMap;
use std::sync::{LazyLock, RwLock};

/// A callable registered in the store. Receives exactly `argc` values whose
/// tags match the mangled name.
pub type NativeFn = fn(&[Value]) -> Result<Value, Error>;

/// Everything the resolver needs to know about one overload.
#[derive(Debug, Clone, Copy)]
pub struct FunctionInfo {
    pub function: NativeFn,
    pub return_type: DataType,
    pub argc: usize,
}

static REGISTRY: LazyLock<RwLock<HashMap<String, FunctionInfo>>> =
    LazyLock::new(|| RwLock::new(builtin_entries()));

/// Registers `info` under `function_name`. Returns false (and changes
/// nothing) when the name is already taken.
pub fn register_function(function_name: &str, info: FunctionInfo) -> bool {
    let mut map = REGISTRY.write().unwrap_or_else(|e| e.into_inner());
    if map.contains_key(function_name) {
        return false;
    }
    map.insert(function_name.to_string(), info);
    true
}

/// Looks up a mangled name.
pub fn find_function(function_name: &str) -> Option<FunctionInfo> {
    REGISTRY
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .get(function_name)
        .copied()
}

/// Number of registered functions, built-ins included.
pub fn function_count() -> usize {
    REGISTRY.read().unwrap_or_else(|e| e.into_inner()).len()
}

// ---------------------------------------------------------------------------
// built-ins
// ---------------------------------------------------------------------------

macro_rules! int_binary {
    ($name:ident, $acc:ident, $variant:ident, $op:ident) => {
        fn $name(args: &[Value]) -> Result<Value, Error> {
            Ok(Value::$variant(args[0].$acc()?.$op(args[1].$acc()?)))
        }
    };
}

macro_rules! float_binary {
    ($name:ident, $acc:ident, $variant:ident, $op:tt) => {
        fn $name(args: &[Value]) -> Result<Value, Error> {
            Ok(Value::$variant(args[0].$acc()? $op args[1].$acc()?))
        }
    };
}

int_binary!(add_ii, as_int32, Int32, wrapping_add);
int_binary!(add_kk, as_int64, Int64, wrapping_add);
float_binary!(add_ff, as_float32, Float32, +);
float_binary!(add_gg, as_float64, Float64, +);
int_binary!(sub_ii, as_int32, Int32, wrapping_sub);
int_binary!(sub_kk, as_int64, Int64, wrapping_sub);
float_binary!(sub_ff, as_float32, Float32, -);
float_binary!(sub_gg, as_float64, Float64, -);
int_binary!(mul_ii, as_int32, Int32, wrapping_mul);
int_binary!(mul_kk, as_int64, Int64, wrapping_mul);
float_binary!(mul_ff, as_float32, Float32, *);
float_binary!(mul_gg, as_float64, Float64, *);

fn add_ss(args: &[Value]) -> Result<Value, Error> {
    let mut s = args[0].as_str()?.to_string();
    s.push_str(args[1].as_str()?);
    Ok(Value::Str(s))
}

// integer/integer promotes to the float of the same width
fn div_ii(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Float32(args[0].as_int32()? as f32 / args[1].as_int32()? as f32))
}

fn div_kk(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Float64(args[0].as_int64()? as f64 / args[1].as_int64()? as f64))
}

float_binary!(div_ff, as_float32, Float32, /);
float_binary!(div_gg, as_float64, Float64, /);

// integer quotient; zero divisor yields zero
fn int_div_ii(args: &[Value]) -> Result<Value, Error> {
    let d = args[1].as_int32()?;
    Ok(Value::Int32(if d == 0 { 0 } else { args[0].as_int32()?.wrapping_div(d) }))
}

fn int_div_kk(args: &[Value]) -> Result<Value, Error> {
    let d = args[1].as_int64()?;
    Ok(Value::Int64(if d == 0 { 0 } else { args[0].as_int64()?.wrapping_div(d) }))
}

fn mod_ii(args: &[Value]) -> Result<Value, Error> {
    let d = args[1].as_int32()?;
    Ok(Value::Int32(if d == 0 { 0 } else { args[0].as_int32()?.wrapping_rem(d) }))
}

fn mod_kk(args: &[Value]) -> Result<Value, Error> {
    let d = args[1].as_int64()?;
    Ok(Value::Int64(if d == 0 { 0 } else { args[0].as_int64()?.wrapping_rem(d) }))
}

fn mod_ff(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Float32(args[0].as_float32()? % args[1].as_float32()?))
}

fn mod_gg(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Float64(args[0].as_float64()? % args[1].as_float64()?))
}

fn sqrt_i(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Float32((args[0].as_int32()? as f32).sqrt()))
}

fn sqrt_k(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Float64((args[0].as_int64()? as f64).sqrt()))
}

fn sqrt_f(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Float32(args[0].as_float32()?.sqrt()))
}

fn sqrt_g(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Float64(args[0].as_float64()?.sqrt()))
}

fn pow_ii(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Int32((args[0].as_int32()? as f64).powf(args[1].as_int32()? as f64) as i32))
}

fn pow_kk(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Int64((args[0].as_int64()? as f64).powf(args[1].as_int64()? as f64) as i64))
}

fn pow_ff(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Float32(args[0].as_float32()?.powf(args[1].as_float32()?)))
}

fn pow_gg(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Float64(args[0].as_float64()?.powf(args[1].as_float64()?)))
}

fn abs_i(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Int32(args[0].as_int32()?.wrapping_abs()))
}

fn abs_k(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Int64(args[0].as_int64()?.wrapping_abs()))
}

fn abs_f(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Float32(args[0].as_float32()?.abs()))
}

fn abs_g(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Float64(args[0].as_float64()?.abs()))
}

fn floor_f(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Float32(args[0].as_float32()?.floor()))
}

fn floor_g(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Float64(args[0].as_float64()?.floor()))
}

fn ceil_f(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Float32(args[0].as_float32()?.ceil()))
}

fn ceil_g(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Float64(args[0].as_float64()?.ceil()))
}

macro_rules! in_range {
    ($name:ident, $acc:ident) => {
        fn $name(args: &[Value]) -> Result<Value, Error> {
            let value = args[0].$acc()?;
            Ok(Value::Bool(value >= args[1].$acc()? && value <= args[2].$acc()?))
        }
    };
}

in_range!(in_range_i, as_int32);
in_range!(in_range_k, as_int64);
in_range!(in_range_f, as_float32);
in_range!(in_range_g, as_float64);
in_range!(in_range_d, as_date);
in_range!(in_range_t, as_date_time);

fn in_range_s(args: &[Value]) -> Result<Value, Error> {
    let value = args[0].as_str()?;
    Ok(Value::Bool(value >= args[1].as_str()? && value <= args[2].as_str()?))
}

macro_rules! comparisons {
    ($less:ident, $eq:ident, $greater:ident, $le:ident, $ge:ident, $acc:ident) => {
        fn $less(args: &[Value]) -> Result<Value, Error> {
            Ok(Value::Bool(args[0].$acc()? < args[1].$acc()?))
        }
        #[allow(clippy::float_cmp)]
        fn $eq(args: &[Value]) -> Result<Value, Error> {
            Ok(Value::Bool(args[0].$acc()? == args[1].$acc()?))
        }
        fn $greater(args: &[Value]) -> Result<Value, Error> {
            Ok(Value::Bool(args[0].$acc()? > args[1].$acc()?))
        }
        fn $le(args: &[Value]) -> Result<Value, Error> {
            Ok(Value::Bool(args[0].$acc()? <= args[1].$acc()?))
        }
        fn $ge(args: &[Value]) -> Result<Value, Error> {
            Ok(Value::Bool(args[0].$acc()? >= args[1].$acc()?))
        }
    };
}

comparisons!(less_i, eq_i, greater_i, le_i, ge_i, as_int32);
comparisons!(less_k, eq_k, greater_k, le_k, ge_k, as_int64);
comparisons!(less_f, eq_f, greater_f, le_f, ge_f, as_float32);
comparisons!(less_g, eq_g, greater_g, le_g, ge_g, as_float64);
comparisons!(less_d, eq_d, greater_d, le_d, ge_d, as_date);
comparisons!(less_t, eq_t, greater_t, le_t, ge_t, as_date_time);

fn less_s(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(args[0].as_str()? < args[1].as_str()?))
}
fn eq_s(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(args[0].as_str()? == args[1].as_str()?))
}
fn greater_s(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(args[0].as_str()? > args[1].as_str()?))
}
fn le_s(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(args[0].as_str()? <= args[1].as_str()?))
}
fn ge_s(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(args[0].as_str()? >= args[1].as_str()?))
}

fn and_bb(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(args[0].as_bool()? && args[1].as_bool()?))
}

fn or_bb(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(args[0].as_bool()? || args[1].as_bool()?))
}

fn not_b(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(!args[0].as_bool()?))
}

fn xor_bb(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(args[0].as_bool()? != args[1].as_bool()?))
}

// one body serves every IF overload; the mangled name pins the payload types
fn if_then_else(args: &[Value]) -> Result<Value, Error> {
    Ok(if args[0].as_bool()? { args[1].clone() } else { args[2].clone() })
}

fn upper_s(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Str(args[0].as_str()?.to_ascii_uppercase()))
}

fn lower_s(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Str(args[0].as_str()?.to_ascii_lowercase()))
}

fn length_s(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Int32(args[0].as_str()?.len() as i32))
}

// counts occurrences of the needle's first character; empty needle counts 0
fn count_char_ss(args: &[Value]) -> Result<Value, Error> {
    let haystack = args[0].as_str()?;
    let needle = args[1].as_str()?;
    Ok(Value::Int32(match needle.chars().next() {
        Some(c) => haystack.chars().filter(|&h| h == c).count() as i32,
        None => 0,
    }))
}

fn contains_ss(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(args[0].as_str()?.contains(args[1].as_str()?)))
}

fn contains_any_of_ss(args: &[Value]) -> Result<Value, Error> {
    let set = args[1].as_str()?;
    Ok(Value::Bool(args[0].as_str()?.chars().any(|c| set.contains(c))))
}

fn day_d(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Int32(args[0].as_date()?.day as i32))
}
fn day_t(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Int32(args[0].as_date_time()?.date.day as i32))
}
fn month_d(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Int32(args[0].as_date()?.month as i32))
}
fn month_t(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Int32(args[0].as_date_time()?.date.month as i32))
}
fn year_d(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Int32(args[0].as_date()?.year as i32))
}
fn year_t(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Int32(args[0].as_date_time()?.date.year as i32))
}
fn hour_t(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Int32(args[0].as_date_time()?.hour as i32))
}
fn minute_t(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Int32(args[0].as_date_time()?.minute as i32))
}
fn second_t(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Int32(args[0].as_date_time()?.second as i32))
}

fn is_leap_year_i(args: &[Value]) -> Result<Value, Error> {
    let year = args[0].as_int32()?;
    Ok(Value::Bool((year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)))
}

// number parsing: the whole string after optional leading whitespace must be
// consumed (an `l`/`f` width suffix is allowed); anything else falls back to
// zero, or to the caller-supplied fallback in the optional overloads
fn parse_i32(text: &str) -> Option<i32> {
    text.trim_start().parse().ok()
}

fn parse_i64(text: &str) -> Option<i64> {
    let t = text.trim_start();
    t.strip_suffix(['l', 'L']).unwrap_or(t).parse().ok()
}

fn parse_f32(text: &str) -> Option<f32> {
    let t = text.trim_start();
    t.strip_suffix(['f', 'F']).unwrap_or(t).parse().ok()
}

fn parse_f64(text: &str) -> Option<f64> {
    text.trim_start().parse().ok()
}

macro_rules! converters {
    ($name:ident, $from_acc:ident, $variant:ident, $to:ty) => {
        fn $name(args: &[Value]) -> Result<Value, Error> {
            Ok(Value::$variant(args[0].$from_acc()? as $to))
        }
    };
}

converters!(i32_from_i64, as_int64, Int32, i32);
converters!(i32_from_f32, as_float32, Int32, i32);
converters!(i32_from_f64, as_float64, Int32, i32);
converters!(i64_from_i32, as_int32, Int64, i64);
converters!(i64_from_f32, as_float32, Int64, i64);
converters!(i64_from_f64, as_float64, Int64, i64);
converters!(f32_from_i32, as_int32, Float32, f32);
converters!(f32_from_i64, as_int64, Float32, f32);
converters!(f32_from_f64, as_float64, Float32, f32);
converters!(f64_from_i32, as_int32, Float64, f64);
converters!(f64_from_i64, as_int64, Float64, f64);
converters!(f64_from_f32, as_float32, Float64, f64);

fn i32_from_bool(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Int32(args[0].as_bool()? as i32))
}

fn i64_from_bool(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Int64(args[0].as_bool()? as i64))
}

fn bool_from_i32(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(args[0].as_int32()? != 0))
}

fn bool_from_i64(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(args[0].as_int64()? != 0))
}

fn i32_from_str(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Int32(parse_i32(args[0].as_str()?).unwrap_or(0)))
}

fn i32_from_str_or(args: &[Value]) -> Result<Value, Error> {
    match parse_i32(args[0].as_str()?) {
        Some(v) => Ok(Value::Int32(v)),
        None => Ok(args[1].clone()),
    }
}

fn i64_from_str(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Int64(parse_i64(args[0].as_str()?).unwrap_or(0)))
}

fn i64_from_str_or(args: &[Value]) -> Result<Value, Error> {
    match parse_i64(args[0].as_str()?) {
        Some(v) => Ok(Value::Int64(v)),
        None => Ok(args[1].clone()),
    }
}

fn f32_from_str(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Float32(parse_f32(args[0].as_str()?).unwrap_or(0.0)))
}

fn f32_from_str_or(args: &[Value]) -> Result<Value, Error> {
    match parse_f32(args[0].as_str()?) {
        Some(v) => Ok(Value::Float32(v)),
        None => Ok(args[1].clone()),
    }
}

fn f64_from_str(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Float64(parse_f64(args[0].as_str()?).unwrap_or(0.0)))
}

fn f64_from_str_or(args: &[Value]) -> Result<Value, Error> {
    match parse_f64(args[0].as_str()?) {
        Some(v) => Ok(Value::Float64(v)),
        None => Ok(args[1].clone()),
    }
}

fn radix_parse_i64(text: &str, base: i32) -> Option<i64> {
    if !(2..=36).contains(&base) {
        return None;
    }
    let t = text.trim_start();
    let t = t.strip_suffix(['l', 'L']).unwrap_or(t);
    i64::from_str_radix(t, base as u32).ok()
}

fn i32_from_str_radix(args: &[Value]) -> Result<Value, Error> {
    let parsed = radix_parse_i64(args[0].as_str()?, args[1].as_int32()?);
    Ok(Value::Int32(parsed.map(|v| v as i32).unwrap_or(0)))
}

fn i32_from_str_radix_or(args: &[Value]) -> Result<Value, Error> {
    match radix_parse_i64(args[0].as_str()?, args[1].as_int32()?) {
        Some(v) => Ok(Value::Int32(v as i32)),
        None => Ok(args[2].clone()),
    }
}

fn i64_from_str_radix(args: &[Value]) -> Result<Value, Error> {
    let parsed = radix_parse_i64(args[0].as_str()?, args[1].as_int32()?);
    Ok(Value::Int64(parsed.unwrap_or(0)))
}

fn i64_from_str_radix_or(args: &[Value]) -> Result<Value, Error> {
    match radix_parse_i64(args[0].as_str()?, args[1].as_int32()?) {
        Some(v) => Ok(Value::Int64(v)),
        None => Ok(args[2].clone()),
    }
}

macro_rules! to_string_fn {
    ($name:ident, $acc:ident) => {
        fn $name(args: &[Value]) -> Result<Value, Error> {
            Ok(Value::Str(args[0].$acc()?.to_string()))
        }
    };
}

to_string_fn!(str_from_i32, as_int32);
to_string_fn!(str_from_i64, as_int64);
to_string_fn!(str_from_f32, as_float32);
to_string_fn!(str_from_f64, as_float64);

fn str_from_bool(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Str(if args[0].as_bool()? { "True" } else { "False" }.to_string()))
}

// toDate(day, month, year)
fn date_from_ints(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Date(Date::new(
        args[2].as_int32()? as u16,
        args[1].as_int32()? as u8,
        args[0].as_int32()? as u8,
    )))
}

// toDateTime(day, month, year, hour, minute, second)
fn date_time_from_ints(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::DateTime(DateTime::new(
        Date::new(
            args[2].as_int32()? as u16,
            args[1].as_int32()? as u8,
            args[0].as_int32()? as u8,
        ),
        args[3].as_int32()? as u8,
        args[4].as_int32()? as u8,
        args[5].as_int32()? as u8,
    )))
}

// toDateTime(date, hour, minute, second)
fn date_time_from_date(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::DateTime(DateTime::new(
        args[0].as_date()?,
        args[1].as_int32()? as u8,
        args[2].as_int32()? as u8,
        args[3].as_int32()? as u8,
    )))
}

fn builtin_entries() -> HashMap<String, FunctionInfo> {
    use DataType as dt;

    fn info(function: NativeFn, return_type: DataType, argc: usize) -> FunctionInfo {
        FunctionInfo { function, return_type, argc }
    }

    let entries: Vec<(&str, FunctionInfo)> = vec![
        // add
        ("add_ii", info(add_ii, dt::Int32, 2)),
        ("add_II", info(add_kk, dt::Int64, 2)),
        ("add_ff", info(add_ff, dt::Float32, 2)),
        ("add_FF", info(add_gg, dt::Float64, 2)),
        ("add_ss", info(add_ss, dt::Str, 2)), // the only arithmetic on strings
        // subtract
        ("subtract_ii", info(sub_ii, dt::Int32, 2)),
        ("subtract_II", info(sub_kk, dt::Int64, 2)),
        ("subtract_ff", info(sub_ff, dt::Float32, 2)),
        ("subtract_FF", info(sub_gg, dt::Float64, 2)),
        ("sub_ii", info(sub_ii, dt::Int32, 2)),
        ("sub_II", info(sub_kk, dt::Int64, 2)),
        ("sub_ff", info(sub_ff, dt::Float32, 2)),
        ("sub_FF", info(sub_gg, dt::Float64, 2)),
        // multiply
        ("multiply_ii", info(mul_ii, dt::Int32, 2)),
        ("multiply_II", info(mul_kk, dt::Int64, 2)),
        ("multiply_ff", info(mul_ff, dt::Float32, 2)),
        ("multiply_FF", info(mul_gg, dt::Float64, 2)),
        ("mul_ii", info(mul_ii, dt::Int32, 2)),
        ("mul_II", info(mul_kk, dt::Int64, 2)),
        ("mul_ff", info(mul_ff, dt::Float32, 2)),
        ("mul_FF", info(mul_gg, dt::Float64, 2)),
        // divide (integer arguments promote to floats)
        ("divide_ii", info(div_ii, dt::Float32, 2)),
        ("divide_II", info(div_kk, dt::Float64, 2)),
        ("divide_ff", info(div_ff, dt::Float32, 2)),
        ("divide_FF", info(div_gg, dt::Float64, 2)),
        ("div_ii", info(div_ii, dt::Float32, 2)),
        ("div_II", info(div_kk, dt::Float64, 2)),
        ("div_ff", info(div_ff, dt::Float32, 2)),
        ("div_FF", info(div_gg, dt::Float64, 2)),
        ("intDiv_ii", info(int_div_ii, dt::Int32, 2)),
        ("intDiv_II", info(int_div_kk, dt::Int64, 2)),
        // modulo
        ("mod_ii", info(mod_ii, dt::Int32, 2)),
        ("mod_II", info(mod_kk, dt::Int64, 2)),
        ("mod_ff", info(mod_ff, dt::Float32, 2)),
        ("mod_FF", info(mod_gg, dt::Float64, 2)),
        // sqrt
        ("sqrt_i", info(sqrt_i, dt::Float32, 1)),
        ("sqrt_I", info(sqrt_k, dt::Float64, 1)),
        ("sqrt_f", info(sqrt_f, dt::Float32, 1)),
        ("sqrt_F", info(sqrt_g, dt::Float64, 1)),
        // pow
        ("pow_ii", info(pow_ii, dt::Int32, 2)),
        ("pow_II", info(pow_kk, dt::Int64, 2)),
        ("pow_ff", info(pow_ff, dt::Float32, 2)),
        ("pow_FF", info(pow_gg, dt::Float64, 2)),
        // abs
        ("abs_i", info(abs_i, dt::Int32, 1)),
        ("abs_I", info(abs_k, dt::Int64, 1)),
        ("abs_f", info(abs_f, dt::Float32, 1)),
        ("abs_F", info(abs_g, dt::Float64, 1)),
        // floor / ceil
        ("floor_f", info(floor_f, dt::Float32, 1)),
        ("floor_F", info(floor_g, dt::Float64, 1)),
        ("ceil_f", info(ceil_f, dt::Float32, 1)),
        ("ceil_F", info(ceil_g, dt::Float64, 1)),
        // in range
        ("isInRange_iii", info(in_range_i, dt::Bool, 3)),
        ("isInRange_III", info(in_range_k, dt::Bool, 3)),
        ("isInRange_fff", info(in_range_f, dt::Bool, 3)),
        ("isInRange_FFF", info(in_range_g, dt::Bool, 3)),
        ("isInRange_sss", info(in_range_s, dt::Bool, 3)),
        ("isInRange_ddd", info(in_range_d, dt::Bool, 3)),
        ("isInRange_DDD", info(in_range_t, dt::Bool, 3)),
        // comparisons
        ("isLess_ii", info(less_i, dt::Bool, 2)),
        ("isEqual_ii", info(eq_i, dt::Bool, 2)),
        ("isGreater_ii", info(greater_i, dt::Bool, 2)),
        ("isLessOrEqual_ii", info(le_i, dt::Bool, 2)),
        ("isGreaterOrEqual_ii", info(ge_i, dt::Bool, 2)),
        ("isLess_II", info(less_k, dt::Bool, 2)),
        ("isEqual_II", info(eq_k, dt::Bool, 2)),
        ("isGreater_II", info(greater_k, dt::Bool, 2)),
        ("isLessOrEqual_II", info(le_k, dt::Bool, 2)),
        ("isGreaterOrEqual_II", info(ge_k, dt::Bool, 2)),
        ("isLess_ff", info(less_f, dt::Bool, 2)),
        ("isEqual_ff", info(eq_f, dt::Bool, 2)),
        ("isGreater_ff", info(greater_f, dt::Bool, 2)),
        ("isLessOrEqual_ff", info(le_f, dt::Bool, 2)),
        ("isGreaterOrEqual_ff", info(ge_f, dt::Bool, 2)),
        ("isLess_FF", info(less_g, dt::Bool, 2)),
        ("isEqual_FF", info(eq_g, dt::Bool, 2)),
        ("isGreater_FF", info(greater_g, dt::Bool, 2)),
        ("isLessOrEqual_FF", info(le_g, dt::Bool, 2)),
        ("isGreaterOrEqual_FF", info(ge_g, dt::Bool, 2)),
        ("isLess_ss", info(less_s, dt::Bool, 2)),
        ("isEqual_ss", info(eq_s, dt::Bool, 2)),
        ("isGreater_ss", info(greater_s, dt::Bool, 2)),
        ("isLessOrEqual_ss", info(le_s, dt::Bool, 2)),
        ("isGreaterOrEqual_ss", info(ge_s, dt::Bool, 2)),
        ("isLess_dd", info(less_d, dt::Bool, 2)),
        ("isEqual_dd", info(eq_d, dt::Bool, 2)),
        ("isGreater_dd", info(greater_d, dt::Bool, 2)),
        ("isLessOrEqual_dd", info(le_d, dt::Bool, 2)),
        ("isGreaterOrEqual_dd", info(ge_d, dt::Bool, 2)),
        ("isLess_DD", info(less_t, dt::Bool, 2)),
        ("isEqual_DD", info(eq_t, dt::Bool, 2)),
        ("isGreater_DD", info(greater_t, dt::Bool, 2)),
        ("isLessOrEqual_DD", info(le_t, dt::Bool, 2)),
        ("isGreaterOrEqual_DD", info(ge_t, dt::Bool, 2)),
        // logical
        ("AND_bb", info(and_bb, dt::Bool, 2)),
        ("OR_bb", info(or_bb, dt::Bool, 2)),
        ("NOT_b", info(not_b, dt::Bool, 1)),
        ("XOR_bb", info(xor_bb, dt::Bool, 2)),
        ("IF_bii", info(if_then_else, dt::Int32, 3)),
        ("IF_bII", info(if_then_else, dt::Int64, 3)),
        ("IF_bff", info(if_then_else, dt::Float32, 3)),
        ("IF_bFF", info(if_then_else, dt::Float64, 3)),
        ("IF_bss", info(if_then_else, dt::Str, 3)),
        ("IF_bbb", info(if_then_else, dt::Bool, 3)),
        ("IF_bdd", info(if_then_else, dt::Date, 3)),
        ("IF_bDD", info(if_then_else, dt::DateTime, 3)),
        // strings
        ("concatenate_ss", info(add_ss, dt::Str, 2)),
        ("contains_ss", info(contains_ss, dt::Bool, 2)),
        ("containsAnyOf_ss", info(contains_any_of_ss, dt::Bool, 2)),
        ("countChar_ss", info(count_char_ss, dt::Int32, 2)),
        ("length_s", info(length_s, dt::Int32, 1)),
        ("lowerCase_s", info(lower_s, dt::Str, 1)),
        ("toLower_s", info(lower_s, dt::Str, 1)),
        ("toUpper_s", info(upper_s, dt::Str, 1)),
        ("upperCase_s", info(upper_s, dt::Str, 1)),
        // date & time accessors
        ("day_d", info(day_d, dt::Int32, 1)),
        ("month_d", info(month_d, dt::Int32, 1)),
        ("year_d", info(year_d, dt::Int32, 1)),
        ("day_D", info(day_t, dt::Int32, 1)),
        ("month_D", info(month_t, dt::Int32, 1)),
        ("year_D", info(year_t, dt::Int32, 1)),
        ("hour_D", info(hour_t, dt::Int32, 1)),
        ("minute_D", info(minute_t, dt::Int32, 1)),
        ("second_D", info(second_t, dt::Int32, 1)),
        ("isLeapYear_i", info(is_leap_year_i, dt::Bool, 1)),
        // conversions to int32
        ("toInt32_I", info(i32_from_i64, dt::Int32, 1)),
        ("toInt32_f", info(i32_from_f32, dt::Int32, 1)),
        ("toInt32_F", info(i32_from_f64, dt::Int32, 1)),
        ("toInt32_b", info(i32_from_bool, dt::Int32, 1)),
        ("toInt32_s", info(i32_from_str, dt::Int32, 1)),
        ("toInt32_si", info(i32_from_str_or, dt::Int32, 2)),
        ("toInt32B_si", info(i32_from_str_radix, dt::Int32, 2)),
        ("toInt32B_sii", info(i32_from_str_radix_or, dt::Int32, 3)),
        // conversions to int64
        ("toInt64_i", info(i64_from_i32, dt::Int64, 1)),
        ("toInt64_f", info(i64_from_f32, dt::Int64, 1)),
        ("toInt64_F", info(i64_from_f64, dt::Int64, 1)),
        ("toInt64_b", info(i64_from_bool, dt::Int64, 1)),
        ("toInt64_s", info(i64_from_str, dt::Int64, 1)),
        ("toInt64_sI", info(i64_from_str_or, dt::Int64, 2)),
        ("toInt64B_si", info(i64_from_str_radix, dt::Int64, 2)),
        ("toInt64B_siI", info(i64_from_str_radix_or, dt::Int64, 3)),
        // conversions to floats
        ("toFloat32_i", info(f32_from_i32, dt::Float32, 1)),
        ("toFloat32_I", info(f32_from_i64, dt::Float32, 1)),
        ("toFloat32_F", info(f32_from_f64, dt::Float32, 1)),
        ("toFloat32_s", info(f32_from_str, dt::Float32, 1)),
        ("toFloat32_sf", info(f32_from_str_or, dt::Float32, 2)),
        ("toFloat64_i", info(f64_from_i32, dt::Float64, 1)),
        ("toFloat64_I", info(f64_from_i64, dt::Float64, 1)),
        ("toFloat64_f", info(f64_from_f32, dt::Float64, 1)),
        ("toFloat64_s", info(f64_from_str, dt::Float64, 1)),
        ("toFloat64_sF", info(f64_from_str_or, dt::Float64, 2)),
        // conversions to strings and booleans
        ("toString_i", info(str_from_i32, dt::Str, 1)),
        ("toString_I", info(str_from_i64, dt::Str, 1)),
        ("toString_f", info(str_from_f32, dt::Str, 1)),
        ("toString_F", info(str_from_f64, dt::Str, 1)),
        ("toString_b", info(str_from_bool, dt::Str, 1)),
        ("toBoolean_i", info(bool_from_i32, dt::Bool, 1)),
        ("toBoolean_I", info(bool_from_i64, dt::Bool, 1)),
        // date construction
        ("toDate_iii", info(date_from_ints, dt::Date, 3)),
        ("toDateTime_iiiiii", info(date_time_from_ints, dt::DateTime, 6)),
        ("toDateTime_diii", info(date_time_from_date, dt::DateTime, 4)),
    ];

    entries.into_iter().map(|(name, info)| (name.to_string(), info)).collect()
}
