//! File-name patterns for `:select`, `:unselect` and `:substitute`.
//!
//! | Form          | Meaning                                            |
//! |---------------|----------------------------------------------------|
//! | `/re/`        | Regular expression ([`regex`] syntax)              |
//! | `/re/i`       | Same, ignoring case                                |
//! | `/re/I`       | Same, respecting case                              |
//! | `*.c,*.h`     | Comma-separated globs (`*`, `?`, `[...]`, `[!...]`)|
//!
//! Globs match the whole name; regular expressions match anywhere in it.
//! Without an explicit flag, case follows the `ignorecase` option.

use regex::{Regex, RegexBuilder};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("Regexp error: {0}")]
    InvalidRegex(#[from] regex::Error),
    #[error("Unknown pattern flag: {0}")]
    UnknownFlag(char),
}

/// A compiled file-name pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    src: String,
    re: Regex,
}

impl Pattern {
    /// Compile a `/re/flags` or glob pattern.
    pub fn new(src: &str, ignorecase: bool) -> Result<Self, PatternError> {
        let (body, ignorecase) = match src.strip_prefix('/') {
            Some(rest) => {
                let (re, flags) = split_regex(rest);
                let mut ic = ignorecase;
                for flag in flags.chars() {
                    match flag {
                        'i' => ic = true,
                        'I' => ic = false,
                        c => return Err(PatternError::UnknownFlag(c)),
                    }
                }
                (re, ic)
            }
            None => (globs_to_regex(src), ignorecase),
        };
        Ok(Pattern {
            src: src.to_owned(),
            re: compile_regex(&body, ignorecase)?,
        })
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn matches(&self, name: &str) -> bool {
        self.re.is_match(name)
    }
}

/// Compile a regular expression for name matching.
pub fn compile_regex(pattern: &str, ignorecase: bool) -> Result<Regex, PatternError> {
    Ok(RegexBuilder::new(pattern).case_insensitive(ignorecase).build()?)
}

/// Split `re/flags` at the first unescaped `/`; an unclosed expression has
/// no flags.  `\/` becomes `/`.
fn split_regex(rest: &str) -> (String, &str) {
    let mut re = String::with_capacity(rest.len());
    let mut chars = rest.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, '/')) => re.push('/'),
                Some((_, e)) => {
                    re.push('\\');
                    re.push(e);
                }
                None => re.push('\\'),
            },
            '/' => return (re, &rest[i + 1..]),
            c => re.push(c),
        }
    }
    (re, "")
}

/// Translate comma-separated globs into one anchored regular expression.
fn globs_to_regex(globs: &str) -> String {
    let alternatives: Vec<String> = split_globs(globs).iter().map(|g| glob_to_regex(g)).collect();
    format!("^(?:{})$", alternatives.join("|"))
}

/// Split at commas not escaped with `\` and not inside `[...]`.
fn split_globs(globs: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut cur = String::new();
    let mut in_class = false;
    let mut chars = globs.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                cur.push(c);
                cur.extend(chars.next());
            }
            '[' => {
                in_class = true;
                cur.push(c);
            }
            ']' => {
                in_class = false;
                cur.push(c);
            }
            ',' if !in_class => parts.push(std::mem::take(&mut cur)),
            c => cur.push(c),
        }
    }
    parts.push(cur);
    parts
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2);
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '\\' => match chars.next() {
                Some(e) => out.push_str(&regex::escape(&e.to_string())),
                None => out.push_str(r"\\"),
            },
            '[' => {
                let mut class = String::from("[");
                if chars.next_if(|&c| c == '!' || c == '^').is_some() {
                    class.push('^');
                }
                let mut closed = false;
                let mut first = true;
                while let Some(c) = chars.next() {
                    match c {
                        ']' if !first => {
                            closed = true;
                            break;
                        }
                        '\\' | '[' | ']' | '&' | '~' | '-' if c != '-' || first => {
                            class.push('\\');
                            class.push(c);
                        }
                        c => class.push(c),
                    }
                    first = false;
                }
                if closed {
                    class.push(']');
                    out.push_str(&class);
                } else {
                    out.push_str(r"\[");
                    out.push_str(&regex::escape(&class[1..]));
                }
            }
            c => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out
}

/// Convert a Vim replacement string: `&` and `\0` are the whole match,
/// `\1`-`\9` are groups, `\&` is a literal `&`.
pub fn vim_replacement(sub: &str) -> String {
    let mut out = String::with_capacity(sub.len());
    let mut chars = sub.chars();
    while let Some(c) = chars.next() {
        match c {
            '&' => out.push_str("${0}"),
            '$' => out.push_str("$$"),
            '\\' => match chars.next() {
                Some(d @ '0'..='9') => {
                    out.push_str("${");
                    out.push(d);
                    out.push('}');
                }
                Some('$') => out.push_str("$$"),
                Some(e) => out.push(e),
                None => out.push('\\'),
            },
            c => out.push(c),
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pat: &str, name: &str) -> bool {
        Pattern::new(pat, false).unwrap().matches(name)
    }

    #[test]
    fn glob_star_and_question_mark() {
        assert!(matches("*.rs", "main.rs"));
        assert!(!matches("*.rs", "main.rs.bak"));
        assert!(matches("?.c", "a.c"));
        assert!(!matches("?.c", "ab.c"));
        assert!(matches("*", ""));
    }

    #[test]
    fn glob_lists_and_classes() {
        assert!(matches("*.c,*.h", "x.h"));
        assert!(matches("[abc]*", "beta"));
        assert!(!matches("[!abc]*", "beta"));
        assert!(matches("[a-c]x", "bx"));
        assert!(matches("f[,]g", "f,g"));
        assert!(matches("a\\,b", "a,b"));
        assert!(matches("[x", "[x"));
    }

    #[test]
    fn glob_metacharacters_are_literal() {
        assert!(matches("a+b(1).txt", "a+b(1).txt"));
        assert!(!matches("a.b", "axb"));
    }

    #[test]
    fn regex_forms() {
        assert!(matches("/^ma/", "main.rs"));
        assert!(matches("/in/", "main.rs"));
        assert!(!matches("/MAIN/", "main.rs"));
        assert!(matches("/MAIN/i", "main.rs"));
        assert!(matches("/a\\/b/", "a/b"));
        assert!(matches("/open", "opened"));
        assert!(matches!(Pattern::new("/x/z", false), Err(PatternError::UnknownFlag('z'))));
        assert!(matches!(Pattern::new("/(/", false), Err(PatternError::InvalidRegex(_))));
    }

    #[test]
    fn ignorecase_option_and_override() {
        assert!(Pattern::new("*.RS", true).unwrap().matches("a.rs"));
        assert!(!Pattern::new("/RS/I", true).unwrap().matches("a.rs"));
    }

    #[test]
    fn replacement_conversion() {
        assert_eq!(vim_replacement("x&y"), "x${0}y");
        assert_eq!(vim_replacement("\\1-\\2"), "${1}-${2}");
        assert_eq!(vim_replacement("\\&$"), "&$$");
    }
}
