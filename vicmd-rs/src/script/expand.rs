//! Text substitution applied to command arguments before they are split.
//!
//! | Sequence   | Meaning                                              |
//! |------------|------------------------------------------------------|
//! | `%c`       | File under the cursor                                |
//! | `%f`       | Selected files (or the file under the cursor)        |
//! | `%d`       | Current directory                                    |
//! | `%%`       | Literal `%`                                          |
//! | `$NAME`    | Environment variable, empty when unset               |
//! | `${NAME}`  | Same, brace form                                     |
//! | `\$`       | Left alone; argument splitting turns it into `$`     |
//!
//! File names produced by macros are escaped so that quote-aware argument
//! splitting yields them unchanged.  Unknown `%x` sequences are kept.

use crate::cmdline::parse::escape_arg;

/// Where macro values come from.
pub trait MacroSource {
    fn current_file(&self) -> Option<String>;
    /// Selection in view order; empty when nothing is selected.
    fn selected_files(&self) -> Vec<String>;
    fn current_dir(&self) -> String;
}

/// Expand `%c`, `%f`, `%d` and `%%` in `src`.
pub fn expand_macros(src: &str, source: &dyn MacroSource) -> String {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        match chars.peek().copied() {
            Some('%') => {
                chars.next();
                out.push('%');
            }
            Some('c') => {
                chars.next();
                if let Some(file) = source.current_file() {
                    out.push_str(&escape_arg(&file));
                }
            }
            Some('f') => {
                chars.next();
                let mut files = source.selected_files();
                if files.is_empty() {
                    files.extend(source.current_file());
                }
                let escaped: Vec<String> = files.iter().map(|f| escape_arg(f)).collect();
                out.push_str(&escaped.join(" "));
            }
            Some('d') => {
                chars.next();
                out.push_str(&escape_arg(&source.current_dir()));
            }
            _ => out.push('%'),
        }
    }
    out
}

/// Expand `$NAME` and `${NAME}` through `lookup`.
pub fn expand_envvars(src: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                out.push('\\');
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '$' if chars.peek() == Some(&'{') => {
                chars.next();
                let mut name = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if closed {
                    out.push_str(&lookup(&name).unwrap_or_default());
                } else {
                    out.push_str("${");
                    out.push_str(&name);
                }
            }
            '$' if chars.peek().is_some_and(|&c| is_ident_start(c)) => {
                let mut name = String::new();
                while let Some(c) = chars.next_if(|&c| is_ident_continue(c)) {
                    name.push(c);
                }
                out.push_str(&lookup(&name).unwrap_or_default());
            }
            other => out.push(other),
        }
    }
    out
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    struct Files {
        cursor: Option<&'static str>,
        selected: Vec<&'static str>,
    }

    impl MacroSource for Files {
        fn current_file(&self) -> Option<String> {
            self.cursor.map(str::to_owned)
        }

        fn selected_files(&self) -> Vec<String> {
            self.selected.iter().map(|s| s.to_string()).collect()
        }

        fn current_dir(&self) -> String {
            "/tmp/my dir".into()
        }
    }

    fn env(name: &str) -> Option<String> {
        match name {
            "HOME" => Some("/home/u".into()),
            "X" => Some("1".into()),
            _ => None,
        }
    }

    #[test]
    fn file_macros() {
        let files = Files {
            cursor: Some("a b.txt"),
            selected: vec!["x", "y&z"],
        };
        assert_eq!(expand_macros("cp %c %d", &files), r"cp a\ b.txt /tmp/my\ dir");
        assert_eq!(expand_macros("rm %f", &files), r"rm x y\&z");
        assert_eq!(expand_macros("100%% %q", &files), "100% %q");
        assert_eq!(expand_macros("tail%", &files), "tail%");
    }

    #[test]
    fn selection_falls_back_to_cursor() {
        let files = Files {
            cursor: Some("only"),
            selected: Vec::new(),
        };
        assert_eq!(expand_macros("%f", &files), "only");
        let empty = Files {
            cursor: None,
            selected: Vec::new(),
        };
        assert_eq!(expand_macros("[%c]", &empty), "[]");
    }

    #[test]
    fn environment_variables() {
        assert_eq!(expand_envvars("$HOME/bin", env), "/home/u/bin");
        assert_eq!(expand_envvars("${X}2 $X2", env), "12 ");
        assert_eq!(expand_envvars("$NOPE.", env), ".");
        assert_eq!(expand_envvars("cost: $5", env), "cost: $5");
        assert_eq!(expand_envvars("${HOME", env), "${HOME");
    }

    #[test]
    fn escaped_dollar_is_left_alone() {
        assert_eq!(expand_envvars(r"\$HOME $X", env), r"\$HOME 1");
    }
}
