//! Runtime value of the expression language.
//!
//! Only integers and strings exist.  Strings are coerced to integers by
//! reading a leading (optionally signed) decimal number, so `"12abc"` is 12
//! and `"abc"` is 0.

use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Str(String),
}

impl Default for Value {
    fn default() -> Self {
        Value::Str(String::new())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl Value {
    /// `0`, `""` and `"0"` are false.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Int(n) => *n != 0,
            Value::Str(s) => !s.is_empty() && s != "0",
        }
    }

    pub fn as_int(&self) -> i64 {
        match self {
            Value::Int(n) => *n,
            Value::Str(s) => leading_int(s),
        }
    }

    pub fn as_str(&self) -> String {
        self.to_string()
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Str(_) => "string",
        }
    }

    // ── Operators ─────────────────────────────────────────────────────────────

    pub fn arith_add(&self, rhs: &Value) -> Value {
        Value::Int(self.as_int().wrapping_add(rhs.as_int()))
    }

    pub fn arith_sub(&self, rhs: &Value) -> Value {
        Value::Int(self.as_int().wrapping_sub(rhs.as_int()))
    }

    pub fn arith_mul(&self, rhs: &Value) -> Value {
        Value::Int(self.as_int().wrapping_mul(rhs.as_int()))
    }

    pub fn arith_div(&self, rhs: &Value) -> Result<Value, String> {
        match rhs.as_int() {
            0 => Err("Division by zero".into()),
            d => Ok(Value::Int(self.as_int().wrapping_div(d))),
        }
    }

    pub fn arith_rem(&self, rhs: &Value) -> Result<Value, String> {
        match rhs.as_int() {
            0 => Err("Division by zero".into()),
            d => Ok(Value::Int(self.as_int().wrapping_rem(d))),
        }
    }

    pub fn arith_neg(&self) -> Value {
        Value::Int(self.as_int().wrapping_neg())
    }

    pub fn concat(&self, rhs: &Value) -> Value {
        Value::Str(format!("{self}{rhs}"))
    }

    /// Two strings compare as text; anything involving an integer compares
    /// numerically.
    pub fn cmp_value(&self, rhs: &Value) -> Ordering {
        match (self, rhs) {
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            _ => self.as_int().cmp(&rhs.as_int()),
        }
    }
}

fn leading_int(s: &str) -> i64 {
    let t = s.trim_start();
    let (neg, digits) = match t.as_bytes().first() {
        Some(b'-') => (true, &t[1..]),
        Some(b'+') => (false, &t[1..]),
        _ => (false, t),
    };
    let len = digits.bytes().take_while(u8::is_ascii_digit).count();
    let n = digits[..len]
        .bytes()
        .fold(0i64, |acc, d| acc.wrapping_mul(10).wrapping_add(i64::from(d - b'0')));
    if neg {
        n.wrapping_neg()
    } else {
        n
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Int(i64::from(b))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
