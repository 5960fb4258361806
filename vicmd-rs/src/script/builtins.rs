//! Built-in expression functions.
//!
//! Each function receives already-evaluated arguments.  Functions that need
//! the session (`expand()`) are provided by the session itself.

use std::env;
use std::path::Path;

use super::value::Value;

/// Dispatch a built-in function call.
///
/// Returns `None` if `name` is not a built-in.
pub fn call_builtin(name: &str, args: &[Value]) -> Option<Result<Value, String>> {
    fn inner(name: &str, args: &[Value]) -> Result<Option<Value>, String> {
        Ok(Some(match name {
            "has" => {
                let feature = get_str(args, 0, name)?;
                Value::from(has_feature(&feature))
            }
            "executable" => {
                let program = get_str(args, 0, name)?;
                Value::from(is_executable(&program))
            }
            "fnameescape" => {
                let s = get_str(args, 0, name)?;
                Value::Str(fname_escape(&s))
            }
            "strlen" => {
                let s = get_str(args, 0, name)?;
                Value::Int(s.chars().count() as i64)
            }
            "toupper" => Value::Str(get_str(args, 0, name)?.to_uppercase()),
            "tolower" => Value::Str(get_str(args, 0, name)?.to_lowercase()),
            _ => return Ok(None),
        }))
    }
    inner(name, args).transpose()
}

fn has_feature(feature: &str) -> bool {
    match feature {
        "unix" => cfg!(unix),
        "win" => cfg!(windows),
        _ => false,
    }
}

/// Like a shell lookup: names with a `/` are checked directly, others are
/// searched in `$PATH`.
fn is_executable(program: &str) -> bool {
    if program.is_empty() {
        return false;
    }
    if program.contains('/') {
        return is_exec_file(Path::new(program));
    }
    env::var_os("PATH").is_some_and(|paths| {
        env::split_paths(&paths).any(|dir| is_exec_file(&dir.join(program)))
    })
}

#[cfg(unix)]
fn is_exec_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_exec_file(path: &Path) -> bool {
    path.is_file()
}

/// Escape a file name for use as a command argument.
pub fn fname_escape(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, c) in name.chars().enumerate() {
        let special = matches!(
            c,
            ' ' | '\t' | '\\' | '\'' | '"' | '|' | '&' | '$' | '%' | '*' | '?' | '[' | ']' | '(' | ')' | '#' | ';' | '<' | '>'
        ) || (i == 0 && matches!(c, '-' | '+' | '~'));
        if special {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// ── Argument accessors ────────────────────────────────────────────────────────

fn get_str(args: &[Value], idx: usize, name: &str) -> Result<String, String> {
    args.get(idx)
        .map(Value::as_str)
        .ok_or_else(|| format!("{name}: argument {idx} missing"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
