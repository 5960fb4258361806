//! Typed runtime options changed with `:set`.
//!
//! | Option       | Short | Type    | Default |
//! |--------------|-------|---------|---------|
//! | `autocd`     |       | boolean | off     |
//! | `hlsearch`   | `hls` | boolean | on      |
//! | `history`    | `hi`  | number  | 15      |
//! | `ignorecase` | `ic`  | boolean | off     |
//! | `shell`      | `sh`  | string  | `sh`    |
//! | `wrapscan`   | `ws`  | boolean | on      |

use std::fmt;

use thiserror::Error;

use crate::script::value::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl OptValue {
    pub fn to_value(&self) -> Value {
        match self {
            OptValue::Bool(b) => Value::from(*b),
            OptValue::Int(n) => Value::Int(*n),
            OptValue::Str(s) => Value::Str(s.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    #[error("Unknown option: {0}")]
    Unknown(String),
    #[error("Not a boolean option: {0}")]
    NotBoolean(String),
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
    #[error("Operation not supported for {0}")]
    Unsupported(&'static str),
}

enum Initial {
    Bool(bool),
    Int(i64),
    Str(&'static str),
}

struct OptDef {
    name: &'static str,
    short: Option<&'static str>,
    initial: Initial,
}

impl OptDef {
    fn default_value(&self) -> OptValue {
        match self.initial {
            Initial::Bool(b) => OptValue::Bool(b),
            Initial::Int(n) => OptValue::Int(n),
            Initial::Str(s) => OptValue::Str(s.to_owned()),
        }
    }
}

const DEFS: &[OptDef] = &[
    OptDef { name: "autocd", short: None, initial: Initial::Bool(false) },
    OptDef { name: "hlsearch", short: Some("hls"), initial: Initial::Bool(true) },
    OptDef { name: "history", short: Some("hi"), initial: Initial::Int(15) },
    OptDef { name: "ignorecase", short: Some("ic"), initial: Initial::Bool(false) },
    OptDef { name: "shell", short: Some("sh"), initial: Initial::Str("sh") },
    OptDef { name: "wrapscan", short: Some("ws"), initial: Initial::Bool(true) },
];

fn find(name: &str) -> Option<(usize, &'static OptDef)> {
    DEFS.iter()
        .enumerate()
        .find(|(_, d)| d.name == name || d.short == Some(name))
}

// ── Options ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Options {
    values: Vec<OptValue>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            values: DEFS.iter().map(OptDef::default_value).collect(),
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up by full or short name.
    pub fn get(&self, name: &str) -> Option<&OptValue> {
        find(name).map(|(i, _)| &self.values[i])
    }

    /// `false` for unknown and non-boolean options.
    pub fn get_bool(&self, name: &str) -> bool {
        matches!(self.get(name), Some(OptValue::Bool(true)))
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            OptValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            OptValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &OptValue)> {
        DEFS.iter().map(|d| d.name).zip(self.values.iter())
    }

    /// Apply one `:set` argument.  Returns text to show for queries.
    ///
    /// Accepted forms: `opt`, `noopt`, `invopt`, `opt!`, `opt=val`,
    /// `opt:val`, `opt+=n`, `opt-=n`, `opt?`, `opt&`.
    pub fn apply(&mut self, arg: &str) -> Result<Option<String>, OptionError> {
        if let Some(pos) = arg.find(['=', ':']) {
            let (lhs, value) = (&arg[..pos], &arg[pos + 1..]);
            return match lhs.strip_suffix('+') {
                Some(name) => self.adjust(name, value, 1),
                None => match lhs.strip_suffix('-') {
                    Some(name) => self.adjust(name, value, -1),
                    None => self.assign(lhs, value),
                },
            }
            .map(|()| None);
        }

        if let Some(name) = arg.strip_suffix('?') {
            let (i, def) = find(name).ok_or_else(|| OptionError::Unknown(name.to_owned()))?;
            return Ok(Some(show(def.name, &self.values[i])));
        }
        if let Some(name) = arg.strip_suffix('&') {
            let (i, def) = find(name).ok_or_else(|| OptionError::Unknown(name.to_owned()))?;
            self.values[i] = def.default_value();
            return Ok(None);
        }
        if let Some(name) = arg.strip_suffix('!').or_else(|| arg.strip_prefix("inv")) {
            let flag = self.bool_mut(name)?;
            *flag = !*flag;
            return Ok(None);
        }

        match find(arg) {
            Some((i, def)) => match &self.values[i] {
                OptValue::Bool(_) => {
                    self.values[i] = OptValue::Bool(true);
                    Ok(None)
                }
                other => Ok(Some(show(def.name, other))),
            },
            None => match arg.strip_prefix("no") {
                Some(name) if find(name).is_some() => {
                    *self.bool_mut(name)? = false;
                    Ok(None)
                }
                _ => Err(OptionError::Unknown(arg.to_owned())),
            },
        }
    }

    /// Assign an expression value, converting it to the option's type.
    pub fn set_value(&mut self, name: &str, value: &Value) -> Result<(), OptionError> {
        let (i, _) = find(name).ok_or_else(|| OptionError::Unknown(name.to_owned()))?;
        self.values[i] = match &self.values[i] {
            OptValue::Bool(_) => OptValue::Bool(value.as_bool()),
            OptValue::Int(_) => OptValue::Int(value.as_int()),
            OptValue::Str(_) => OptValue::Str(value.as_str()),
        };
        Ok(())
    }

    fn bool_mut(&mut self, name: &str) -> Result<&mut bool, OptionError> {
        let (i, def) = find(name).ok_or_else(|| OptionError::Unknown(name.to_owned()))?;
        match &mut self.values[i] {
            OptValue::Bool(b) => Ok(b),
            _ => Err(OptionError::NotBoolean(def.name.to_owned())),
        }
    }

    fn assign(&mut self, name: &str, value: &str) -> Result<(), OptionError> {
        let (i, def) = find(name).ok_or_else(|| OptionError::Unknown(name.to_owned()))?;
        let invalid = || OptionError::InvalidValue {
            name: def.name,
            value: value.to_owned(),
        };
        self.values[i] = match &self.values[i] {
            OptValue::Bool(_) => return Err(invalid()),
            OptValue::Int(_) => OptValue::Int(value.parse().map_err(|_| invalid())?),
            OptValue::Str(_) => OptValue::Str(value.to_owned()),
        };
        Ok(())
    }

    fn adjust(&mut self, name: &str, value: &str, sign: i64) -> Result<(), OptionError> {
        let (i, def) = find(name).ok_or_else(|| OptionError::Unknown(name.to_owned()))?;
        match &mut self.values[i] {
            OptValue::Int(n) => {
                let delta: i64 = value.parse().map_err(|_| OptionError::InvalidValue {
                    name: def.name,
                    value: value.to_owned(),
                })?;
                *n = n.saturating_add(sign * delta);
                Ok(())
            }
            OptValue::Str(s) if sign > 0 => {
                s.push_str(value);
                Ok(())
            }
            _ => Err(OptionError::Unsupported(def.name)),
        }
    }
}

fn show(name: &str, value: &OptValue) -> String {
    match value {
        OptValue::Bool(true) => format!("  {name}"),
        OptValue::Bool(false) => format!("no{name}"),
        other => format!("  {name}={other}"),
    }
}

impl fmt::Display for OptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptValue::Bool(b) => write!(f, "{}", i64::from(*b)),
            OptValue::Int(n) => write!(f, "{n}"),
            OptValue::Str(s) => f.write_str(s),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = Options::new();
        assert!(!opts.get_bool("autocd"));
        assert!(opts.get_bool("wrapscan"));
        assert!(opts.get_bool("ws"));
        assert_eq!(opts.get_int("history"), Some(15));
        assert_eq!(opts.get_str("shell"), Some("sh"));
        assert!(opts.get("nosuch").is_none());
    }

    #[test]
    fn boolean_forms() {
        let mut opts = Options::new();
        opts.apply("autocd").unwrap();
        assert!(opts.get_bool("autocd"));
        opts.apply("noautocd").unwrap();
        assert!(!opts.get_bool("autocd"));
        opts.apply("invautocd").unwrap();
        assert!(opts.get_bool("autocd"));
        opts.apply("autocd!").unwrap();
        assert!(!opts.get_bool("autocd"));
        opts.apply("noic").unwrap();
        assert!(!opts.get_bool("ignorecase"));
    }

    #[test]
    fn values_and_adjustments() {
        let mut opts = Options::new();
        opts.apply("history=40").unwrap();
        opts.apply("hi+=2").unwrap();
        opts.apply("history-=12").unwrap();
        assert_eq!(opts.get_int("history"), Some(30));
        opts.apply("shell:bash").unwrap();
        opts.apply("sh+=5").unwrap();
        assert_eq!(opts.get_str("shell"), Some("bash5"));
        opts.apply("history&").unwrap();
        assert_eq!(opts.get_int("history"), Some(15));
    }

    #[test]
    fn queries() {
        let mut opts = Options::new();
        assert_eq!(opts.apply("autocd?"), Ok(Some("noautocd".into())));
        assert_eq!(opts.apply("ws?"), Ok(Some("  wrapscan".into())));
        assert_eq!(opts.apply("history"), Ok(Some("  history=15".into())));
    }

    #[test]
    fn errors() {
        let mut opts = Options::new();
        assert_eq!(opts.apply("bogus"), Err(OptionError::Unknown("bogus".into())));
        assert_eq!(opts.apply("noshell"), Err(OptionError::NotBoolean("shell".into())));
        assert!(matches!(opts.apply("history=x"), Err(OptionError::InvalidValue { .. })));
        assert!(matches!(opts.apply("autocd=1"), Err(OptionError::InvalidValue { .. })));
        assert_eq!(opts.apply("sh-=x"), Err(OptionError::Unsupported("shell")));
        assert_eq!(
            opts.apply("history=x").unwrap_err().to_string(),
            "Invalid value for history: x"
        );
    }

    #[test]
    fn set_from_expression_value() {
        let mut opts = Options::new();
        opts.set_value("autocd", &Value::Str("1".into())).unwrap();
        assert!(opts.get_bool("autocd"));
        opts.set_value("hi", &Value::Str("42".into())).unwrap();
        assert_eq!(opts.get_int("history"), Some(42));
        opts.set_value("shell", &Value::Int(7)).unwrap();
        assert_eq!(opts.get_str("shell"), Some("7"));
        assert!(opts.set_value("nope", &Value::Int(1)).is_err());
    }

    #[test]
    fn expression_values() {
        let opts = Options::new();
        assert_eq!(opts.get("autocd").map(OptValue::to_value), Some(Value::Int(0)));
        assert_eq!(opts.get("sh").map(OptValue::to_value), Some(Value::Str("sh".into())));
    }
}
