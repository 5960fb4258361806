//! Argument-position classifier.
//!
//! Walks the argument text of one command and reports what kind of argument
//! (if any) a cursor position falls into.  The splitter uses this to decide
//! whether a `|` terminates the command; completion uses it to decide how to
//! escape inserted text.
//!
//! | State          | Entered by                                   | Left by                 |
//! |----------------|----------------------------------------------|-------------------------|
//! | `Begin`        | start, separator, closing quote              | any non-separator       |
//! | `NoQuoting`    | plain character                              | separator               |
//! | `SingleQuoting`| `'` (space separator only)                   | `'`                     |
//! | `DoubleQuoting`| `"` (space separator only)                   | `"`                     |
//! | `RegexQuoting` | regex opener while regex fields remain       | last expected closer    |

// ── Results ───────────────────────────────────────────────────────────────────

/// Raw answer of [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifyCode {
    NotInArgument,
    /// The scanned text ends with a lone backslash.
    SkipNextChar,
    Escaped,
    SingleQuoted,
    DoubleQuoted,
    RegexQuoted,
}

/// Where a cursor sits relative to the arguments of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdLineLocation {
    OutOfArgument,
    NoQuoting,
    SingleQuoting,
    DoubleQuoting,
    RegexQuoting,
}

impl From<ClassifyCode> for CmdLineLocation {
    fn from(code: ClassifyCode) -> Self {
        match code {
            ClassifyCode::NotInArgument => CmdLineLocation::OutOfArgument,
            // An incomplete escape behaves exactly like unquoted text.
            ClassifyCode::SkipNextChar | ClassifyCode::Escaped => CmdLineLocation::NoQuoting,
            ClassifyCode::SingleQuoted => CmdLineLocation::SingleQuoting,
            ClassifyCode::DoubleQuoted => CmdLineLocation::DoubleQuoting,
            ClassifyCode::RegexQuoted => CmdLineLocation::RegexQuoting,
        }
    }
}

impl CmdLineLocation {
    /// True when a `|` at this position ends the command.
    pub fn is_outside_quotes(self) -> bool {
        matches!(self, CmdLineLocation::OutOfArgument | CmdLineLocation::NoQuoting)
    }
}

// ── Scanner ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Begin,
    NoQuoting,
    SingleQuoting,
    DoubleQuoting,
    RegexQuoting,
}

/// Classify `cursor` within `command`, the argument text of one command.
///
/// `separator` is `' '` for ordinary commands or the custom field separator
/// (`/` in `s/a/b/`).  `regex_quotes` is the number of regex-delimited
/// fields the command takes; only its magnitude matters here.  `max_args`
/// is the number of fields the command accepts (negative: unlimited); once
/// that many have started, the last one runs to the end of the text.
pub fn classify(
    command: &str,
    cursor: usize,
    separator: char,
    regex_quotes: i32,
    max_args: i32,
) -> ClassifyCode {
    debug_assert!(
        cursor <= command.len(),
        "cursor {cursor} is past the end of {command:?}"
    );
    let bytes = command.as_bytes();
    let end = cursor.min(bytes.len());
    let sep = u8::try_from(separator).unwrap_or(b' ');
    let spaced = sep == b' ';
    let opener = if spaced { b'/' } else { sep };

    let mut state = State::Begin;
    let mut args: i32 = 0;
    let mut regex_left = regex_quotes.unsigned_abs();
    let mut closer = opener;
    let last_arg = |args: i32| max_args >= 0 && args >= max_args;

    let mut i = 0;
    while i < end {
        let c = bytes[i];
        match state {
            State::Begin => {
                if spaced && c == b'\'' {
                    state = State::SingleQuoting;
                    args += 1;
                } else if spaced && c == b'"' {
                    state = State::DoubleQuoting;
                    args += 1;
                } else if regex_left > 0 && c == opener && !last_arg(args) {
                    closer = c;
                    state = State::RegexQuoting;
                    args += 1;
                } else if spaced && c == b'&' && i + 1 == bytes.len() {
                    // Background marker, not an argument.
                } else if c != sep {
                    state = State::NoQuoting;
                    args += 1;
                    if c == b'\\' {
                        if i + 1 >= end {
                            return ClassifyCode::SkipNextChar;
                        }
                        i += 1;
                    }
                }
            }
            State::NoQuoting => {
                if c == sep && !last_arg(args) {
                    state = State::Begin;
                } else if spaced && c == b'\'' {
                    state = State::SingleQuoting;
                } else if spaced && c == b'"' {
                    state = State::DoubleQuoting;
                } else if c == b'\\' {
                    if i + 1 >= end {
                        return ClassifyCode::SkipNextChar;
                    }
                    i += 1;
                }
            }
            State::SingleQuoting => {
                if c == b'\'' {
                    state = State::Begin;
                }
            }
            State::DoubleQuoting => {
                if c == b'\\' {
                    if i + 1 >= end {
                        return ClassifyCode::SkipNextChar;
                    }
                    i += 1;
                } else if c == b'"' {
                    state = State::Begin;
                }
            }
            State::RegexQuoting => {
                if c == b'\\' {
                    if i + 1 >= end {
                        return ClassifyCode::SkipNextChar;
                    }
                    i += 1;
                } else if c == closer {
                    regex_left -= 1;
                    if regex_left == 0 || last_arg(args) {
                        state = State::Begin;
                    } else {
                        args += 1;
                    }
                }
            }
        }
        i += 1;
    }

    match state {
        State::Begin => ClassifyCode::NotInArgument,
        State::NoQuoting if spaced || (1..3).contains(&args) => ClassifyCode::Escaped,
        State::NoQuoting => ClassifyCode::NotInArgument,
        State::SingleQuoting => ClassifyCode::SingleQuoted,
        State::DoubleQuoting => ClassifyCode::DoubleQuoted,
        State::RegexQuoting => ClassifyCode::RegexQuoted,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn at_end(text: &str) -> ClassifyCode {
        classify(text, text.len(), ' ', 0, -1)
    }

    #[test]
    fn empty_and_blank_are_outside() {
        assert_eq!(at_end(""), ClassifyCode::NotInArgument);
        assert_eq!(at_end("   "), ClassifyCode::NotInArgument);
        assert_eq!(at_end(" a "), ClassifyCode::NotInArgument);
    }

    #[test]
    fn plain_word_is_escaped() {
        assert_eq!(at_end(" abc"), ClassifyCode::Escaped);
        assert_eq!(at_end(" a b"), ClassifyCode::Escaped);
    }

    #[test]
    fn open_quotes_are_reported() {
        assert_eq!(at_end(" 'abc"), ClassifyCode::SingleQuoted);
        assert_eq!(at_end(" \"abc"), ClassifyCode::DoubleQuoted);
        assert_eq!(at_end(" 'abc'"), ClassifyCode::NotInArgument);
        assert_eq!(at_end(" \"a\\\"b"), ClassifyCode::DoubleQuoted);
    }

    #[test]
    fn single_quotes_do_not_escape() {
        assert_eq!(at_end(" 'a\\'"), ClassifyCode::NotInArgument);
    }

    #[test]
    fn mixed_quoting_inside_one_word() {
        assert_eq!(at_end(" a'b"), ClassifyCode::SingleQuoted);
        assert_eq!(at_end(" a'b'c"), ClassifyCode::Escaped);
        assert_eq!(at_end(" a'b' "), ClassifyCode::NotInArgument);
    }

    #[test]
    fn trailing_backslash_is_incomplete() {
        assert_eq!(at_end(" a\\"), ClassifyCode::SkipNextChar);
        assert_eq!(at_end(" \\"), ClassifyCode::SkipNextChar);
        assert_eq!(at_end(" \"a\\"), ClassifyCode::SkipNextChar);
        assert_eq!(at_end(" a\\ b"), ClassifyCode::Escaped);
    }

    #[test]
    fn background_marker_is_not_an_argument() {
        assert_eq!(at_end(" &"), ClassifyCode::NotInArgument);
        assert_eq!(at_end(" a &"), ClassifyCode::NotInArgument);
        // Only at the very end of the text.
        assert_eq!(classify(" &x", 2, ' ', 0, -1), ClassifyCode::Escaped);
    }

    #[test]
    fn regex_fields_with_custom_separator() {
        let text = "/a/b/";
        assert_eq!(classify(text, 0, '/', 2, -1), ClassifyCode::NotInArgument);
        for cursor in 1..=4 {
            assert_eq!(classify(text, cursor, '/', 2, -1), ClassifyCode::RegexQuoted);
        }
        assert_eq!(classify(text, 5, '/', 2, -1), ClassifyCode::NotInArgument);
    }

    #[test]
    fn regex_closer_is_the_opener() {
        assert_eq!(classify("#a/b#c", 4, '#', 2, -1), ClassifyCode::RegexQuoted);
        assert_eq!(classify("#a\\#b", 5, '#', 2, -1), ClassifyCode::RegexQuoted);
    }

    #[test]
    fn flags_after_regex_fields_are_outside() {
        assert_eq!(classify("/a/b/g", 6, '/', 2, -1), ClassifyCode::NotInArgument);
    }

    #[test]
    fn custom_separator_fields_without_regex() {
        assert_eq!(classify("/a", 2, '/', 0, -1), ClassifyCode::Escaped);
        assert_eq!(classify("/a/b/c", 6, '/', 0, -1), ClassifyCode::NotInArgument);
    }

    #[test]
    fn space_separator_regex() {
        assert_eq!(at_end(" /a b"), ClassifyCode::Escaped);
        assert_eq!(classify(" /a b", 5, ' ', 1, -1), ClassifyCode::RegexQuoted);
        assert_eq!(classify(" /a|b/ x", 8, ' ', 1, -1), ClassifyCode::Escaped);
    }

    #[test]
    fn last_argument_absorbs_separators() {
        assert_eq!(classify(" a b", 3, ' ', 0, 1), ClassifyCode::Escaped);
        assert_eq!(classify(" a b", 3, ' ', 0, 2), ClassifyCode::NotInArgument);
    }

    #[test]
    fn cursor_limits_the_scan() {
        assert_eq!(classify(" 'abc' x", 3, ' ', 0, -1), ClassifyCode::SingleQuoted);
        assert_eq!(classify(" 'abc' x", 0, ' ', 0, -1), ClassifyCode::NotInArgument);
    }

    #[test]
    fn location_mapping() {
        assert_eq!(
            CmdLineLocation::from(ClassifyCode::SkipNextChar),
            CmdLineLocation::NoQuoting
        );
        assert_eq!(
            CmdLineLocation::from(ClassifyCode::Escaped),
            CmdLineLocation::NoQuoting
        );
        assert!(CmdLineLocation::NoQuoting.is_outside_quotes());
        assert!(!CmdLineLocation::RegexQuoting.is_outside_quotes());
    }
}
