//! Lexing of one command: range, name, bang and arguments.
//!
//! [`split_header`] is purely lexical and shared by the splitter and the
//! dispatcher.  [`prepare`] turns a header into the [`CmdInfo`] a handler
//! receives, checking it against the command's declaration.

use super::context::CmdContext;
use super::error::DispatchError;
use super::registry::{CmdFlags, CommandDef, CommandRegistry};

// ── Header ────────────────────────────────────────────────────────────────────

/// Lexical pieces of a command, borrowed from the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header<'a> {
    pub range: &'a str,
    pub name: &'a str,
    /// Byte offset just past the name.
    pub name_end: usize,
    pub bang: bool,
    /// Byte offset where the argument text starts.
    pub args_start: usize,
    pub rest: &'a str,
}

/// Split `line` into range, name, bang and argument text.
///
/// Leading blanks and colons are skipped.  Built-in names are runs of ASCII
/// letters; user-defined names start with an uppercase letter and may
/// contain digits; `!` is a name on its own.
pub fn split_header(line: &str) -> Header<'_> {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b':') {
        i += 1;
    }

    let range_start = i;
    i = skip_range(line, i);
    let range = line[range_start..i].trim();
    while i < bytes.len() && matches!(bytes[i], b' ' | b'\t') {
        i += 1;
    }

    let name_start = i;
    match bytes.get(i) {
        Some(c) if c.is_ascii_uppercase() => {
            while i < bytes.len() && bytes[i].is_ascii_alphanumeric() {
                i += 1;
            }
        }
        Some(c) if c.is_ascii_alphabetic() => {
            while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
                i += 1;
            }
        }
        Some(b'!') => i += 1,
        _ => {}
    }
    let name_end = i;

    let bang = bytes.get(i) == Some(&b'!') && name_end > name_start;
    if bang {
        i += 1;
    }

    Header {
        range,
        name: &line[name_start..name_end],
        name_end,
        bang,
        args_start: i,
        rest: &line[i..],
    }
}

fn skip_range(line: &str, mut i: usize) -> usize {
    let bytes = line.as_bytes();
    loop {
        match bytes.get(i) {
            Some(b'%' | b'.' | b'$' | b',' | b';' | b'+' | b'-' | b' ' | b'\t') => i += 1,
            Some(c) if c.is_ascii_digit() => i += 1,
            Some(b'\'') => match line[i + 1..].chars().next() {
                Some(mark) => i += 1 + mark.len_utf8(),
                None => return i,
            },
            _ => return i,
        }
    }
}

// ── Argument layout ───────────────────────────────────────────────────────────

/// How the argument text of a command is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgLayout {
    /// Byte offset of the argument text within the line.
    pub start: usize,
    pub sep: char,
    pub regex_quotes: i32,
    /// Negative: unlimited.
    pub max_args: i32,
}

/// Characters that may open custom-separator arguments.
pub fn is_custom_separator(c: char) -> bool {
    c.is_ascii_punctuation() && !matches!(c, '\\' | '"' | '|')
}

pub fn arg_layout<C>(registry: &CommandRegistry<C>, header: &Header<'_>) -> ArgLayout {
    let Some(def) = registry.lookup(header.name) else {
        return ArgLayout {
            start: header.args_start,
            sep: ' ',
            regex_quotes: 0,
            max_args: -1,
        };
    };
    let mut start = header.args_start;
    let mut sep = ' ';
    if def.flags.contains(CmdFlags::CUSTOM_SEP) {
        let blank = header.rest.len() - header.rest.trim_start().len();
        if let Some(c) = header.rest[blank..].chars().next().filter(|&c| is_custom_separator(c)) {
            start += blank;
            sep = c;
        }
    }
    ArgLayout {
        start,
        sep,
        regex_quotes: if def.flags.contains(CmdFlags::REGEX) { def.regex_quotes } else { 0 },
        max_args: def.max_args.map_or(-1, |m| i32::try_from(m).unwrap_or(i32::MAX)),
    }
}

// ── CmdInfo ───────────────────────────────────────────────────────────────────

/// Zero-based, inclusive line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub begin: usize,
    pub end: usize,
}

/// Everything a handler learns about its invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CmdInfo {
    /// Full name of the command (not the abbreviation typed).
    pub name: String,
    pub range: Option<LineRange>,
    pub bang: bool,
    pub qmark: bool,
    /// A trailing ` &` was given.
    pub bg: bool,
    pub sep: char,
    /// Argument text as typed.
    pub raw_args: String,
    /// Argument text after expansion, with `?` and ` &` removed.
    pub args: String,
    pub argv: Vec<String>,
}

impl CmdInfo {
    pub fn arg(&self, n: usize) -> Option<&str> {
        self.argv.get(n).map(String::as_str)
    }
}

/// Build the [`CmdInfo`] for a resolved built-in command.
pub fn prepare<C: CmdContext>(
    ctx: &mut C,
    header: &Header<'_>,
    layout: &ArgLayout,
    def: &CommandDef<C>,
) -> Result<CmdInfo, DispatchError> {
    let flags = def.flags;

    let range = if header.range.is_empty() {
        None
    } else if !flags.contains(CmdFlags::RANGE) {
        return Err(DispatchError::NoRangeAllowed);
    } else {
        Some(parse_range(header.range, ctx)?)
    };

    if header.bang && !flags.contains(CmdFlags::BANG) {
        return Err(DispatchError::NoBangAllowed);
    }

    let offset = layout.start - header.args_start;
    let raw_args = &header.rest[offset..];
    let mut text = if layout.sep == ' ' {
        raw_args.trim().to_owned()
    } else {
        raw_args.trim_end().to_owned()
    };

    let mut qmark = false;
    if text == "?" {
        if !flags.contains(CmdFlags::QMARK) {
            return Err(DispatchError::NoQmarkAllowed);
        }
        qmark = true;
        text.clear();
    }

    let mut bg = false;
    if flags.contains(CmdFlags::BG) {
        if text == "&" {
            bg = true;
            text.clear();
        } else if let Some(stripped) = text.strip_suffix(" &").or_else(|| text.strip_suffix("\t&")) {
            bg = true;
            text = stripped.trim_end().to_owned();
        }
    }

    if flags.contains(CmdFlags::EXPAND_MACROS) {
        text = ctx.expand_macros(&text);
    }
    if flags.contains(CmdFlags::EXPAND_ENVVARS) {
        text = ctx.expand_envvars(&text);
    }

    let argv = split_args(&text, flags, layout)?;

    if argv.len() < def.min_args {
        return Err(DispatchError::TooFewArgs);
    }
    match def.max_args {
        Some(0) if !argv.is_empty() => return Err(DispatchError::TrailingChars),
        Some(max) if argv.len() > max => return Err(DispatchError::TooManyArgs),
        _ => {}
    }

    Ok(CmdInfo {
        name: def.name.clone(),
        range,
        bang: header.bang,
        qmark,
        bg,
        sep: layout.sep,
        raw_args: raw_args.to_owned(),
        args: text,
        argv,
    })
}

// ── Ranges ────────────────────────────────────────────────────────────────────

/// Resolve a range such as `%`, `.,$`, `'a,'b`, `3;+2` against the view.
pub fn parse_range<C: CmdContext>(text: &str, ctx: &C) -> Result<LineRange, DispatchError> {
    let last = ctx.last_line().ok_or(DispatchError::InvalidRange)?;
    if text == "%" {
        return Ok(LineRange { begin: 0, end: last });
    }

    let mut current = ctx.current_line();
    let mut lines = Vec::new();
    let mut rest = text;
    loop {
        let (addr, tail) = match rest.find([',', ';']) {
            Some(pos) => (&rest[..pos], Some((&rest[pos..pos + 1], &rest[pos + 1..]))),
            None => (rest, None),
        };
        let line = parse_address(addr.trim(), current, last, ctx)?;
        lines.push(line);
        match tail {
            Some((";", next)) => {
                current = line;
                rest = next;
            }
            Some((_, next)) => rest = next,
            None => break,
        }
    }

    let end = lines[lines.len() - 1];
    let begin = if lines.len() > 1 { lines[lines.len() - 2] } else { end };
    Ok(LineRange {
        begin: begin.min(end),
        end: begin.max(end),
    })
}

fn parse_address<C: CmdContext>(
    addr: &str,
    current: usize,
    last: usize,
    ctx: &C,
) -> Result<usize, DispatchError> {
    let bytes = addr.as_bytes();
    let mut i = 0;
    let mut line: i64 = match bytes.first() {
        None => current as i64,
        Some(b'.') => {
            i = 1;
            current as i64
        }
        Some(b'$') => {
            i = 1;
            last as i64
        }
        Some(b'\'') => {
            let mark = addr[1..].chars().next().ok_or(DispatchError::InvalidRange)?;
            i = 1 + mark.len_utf8();
            ctx.resolve_mark(mark).ok_or(DispatchError::InvalidRange)? as i64
        }
        Some(c) if c.is_ascii_digit() => {
            let digits = addr.bytes().take_while(u8::is_ascii_digit).count();
            i = digits;
            let n: i64 = addr[..digits].parse().map_err(|_| DispatchError::InvalidRange)?;
            (n - 1).max(0)
        }
        Some(b'+' | b'-') => current as i64,
        Some(_) => return Err(DispatchError::InvalidRange),
    };

    while i < bytes.len() {
        let sign = match bytes[i] {
            b'+' => 1,
            b'-' => -1,
            b' ' | b'\t' => {
                i += 1;
                continue;
            }
            _ => return Err(DispatchError::InvalidRange),
        };
        i += 1;
        let digits = addr[i..].bytes().take_while(u8::is_ascii_digit).count();
        let n: i64 = if digits == 0 {
            1
        } else {
            addr[i..i + digits].parse().map_err(|_| DispatchError::InvalidRange)?
        };
        i += digits;
        line = line.checked_add(sign * n).ok_or(DispatchError::InvalidRange)?;
    }

    if line < 0 || line > last as i64 {
        return Err(DispatchError::InvalidRange);
    }
    Ok(line as usize)
}

// ── Argument splitting ────────────────────────────────────────────────────────

fn split_args(text: &str, flags: CmdFlags, layout: &ArgLayout) -> Result<Vec<String>, DispatchError> {
    if flags.contains(CmdFlags::UNTIL_THE_END) || flags.contains(CmdFlags::EXPR) {
        return Ok(text.split_whitespace().map(str::to_owned).collect());
    }
    if layout.sep != ' ' {
        return split_fields(text, layout.sep, flags.contains(CmdFlags::REGEX).then_some(layout.regex_quotes));
    }
    if flags.contains(CmdFlags::QUOTE) || flags.contains(CmdFlags::REGEX) {
        return split_quoted(text, flags.contains(CmdFlags::REGEX), layout.regex_quotes < 0);
    }
    Ok(text.split_whitespace().map(str::to_owned).collect())
}

/// Split `/a/b/flags` style arguments.  `regex` carries the number of
/// delimited fields; anything after them is one more argument.
fn split_fields(text: &str, sep: char, regex: Option<i32>) -> Result<Vec<String>, DispatchError> {
    let Some(body) = text.strip_prefix(sep) else {
        return Ok(text.split_whitespace().map(str::to_owned).collect());
    };
    let expected = regex.map(i32::unsigned_abs);
    let optional_tail = regex.is_some_and(|n| n < 0);

    let mut argv = Vec::new();
    let mut field = String::new();
    let mut chars = body.chars().peekable();
    let mut closed = false;
    while let Some(c) = chars.next() {
        if expected.is_some_and(|n| argv.len() as u32 >= n) {
            // Trailing flags.
            field.push(c);
            field.extend(chars.by_ref());
            break;
        }
        match c {
            '\\' => match chars.next() {
                Some(next) if next == sep => field.push(next),
                Some(next) => {
                    field.push('\\');
                    field.push(next);
                }
                None => field.push('\\'),
            },
            c if c == sep => {
                argv.push(std::mem::take(&mut field));
                closed = true;
                continue;
            }
            c => field.push(c),
        }
        closed = false;
    }

    match expected {
        Some(n) if (argv.len() as u32) < n => {
            if !optional_tail {
                return Err(DispatchError::InvalidArg);
            }
            if !field.is_empty() || !closed {
                argv.push(field);
            }
        }
        Some(_) => {
            let tail = field.trim();
            if !tail.is_empty() {
                argv.push(tail.to_owned());
            }
        }
        None => {
            if !field.is_empty() {
                argv.push(field);
            }
        }
    }
    Ok(argv)
}

/// Whitespace-separated words with `'…'`, `"…"` and backslash escapes.
/// With `regex` a word starting with `/` runs to the matching `/`,
/// including any flags glued to it, and is kept verbatim.
fn split_quoted(text: &str, regex: bool, open_regex_ok: bool) -> Result<Vec<String>, DispatchError> {
    let mut argv = Vec::new();
    let mut chars = text.chars().peekable();
    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(&first) = chars.peek() else { break };

        let mut word = String::new();
        if regex && first == '/' {
            word.push(chars.next().unwrap_or('/'));
            let mut closed = false;
            while let Some(c) = chars.next() {
                word.push(c);
                if c == '\\' {
                    if let Some(next) = chars.next() {
                        word.push(next);
                    }
                } else if c == '/' {
                    closed = true;
                    break;
                }
            }
            if !closed && !open_regex_ok {
                return Err(DispatchError::InvalidArg);
            }
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                word.push(c);
            }
            argv.push(word);
            continue;
        }

        while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
            match c {
                '\'' => loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(q) => word.push(q),
                        None => return Err(DispatchError::InvalidArg),
                    }
                },
                '"' => loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(e) => word.push(e),
                            None => return Err(DispatchError::InvalidArg),
                        },
                        Some(q) => word.push(q),
                        None => return Err(DispatchError::InvalidArg),
                    }
                },
                '\\' => match chars.next() {
                    Some(e) => word.push(e),
                    None => word.push('\\'),
                },
                c => word.push(c),
            }
        }
        argv.push(word);
    }
    Ok(argv)
}

/// Escape `path` so that quoted-argument splitting yields it unchanged and
/// no expansion touches it.
pub fn escape_arg(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        if c.is_whitespace() || matches!(c, '\\' | '\'' | '"' | '|' | '&' | '$' | '%') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmdline::testing::MockCtx;

    #[test]
    fn header_pieces() {
        let h = split_header("  :%s!/a/b/");
        assert_eq!(h.range, "%");
        assert_eq!(h.name, "s");
        assert!(h.bang);
        assert_eq!(h.rest, "/a/b/");
        assert_eq!(&"  :%s!/a/b/"[h.args_start..], "/a/b/");
    }

    #[test]
    fn header_with_marks_and_offsets() {
        let h = split_header("'a,'b+1 mark x");
        assert_eq!(h.range, "'a,'b+1");
        assert_eq!(h.name, "mark");
        assert_eq!(h.rest, " x");
    }

    #[test]
    fn header_with_multibyte_mark() {
        let h = split_header("'é rng");
        assert_eq!(h.range, "'é");
        assert_eq!(h.name, "rng");
        let h = split_header("'");
        assert_eq!(h.range, "");
        assert_eq!(h.rest, "'");
    }

    #[test]
    fn unresolvable_ranges() {
        let ctx = MockCtx::new();
        assert_eq!(parse_range("'é", &ctx), Err(DispatchError::InvalidRange));
        assert_eq!(
            parse_range("$+9223372036854775807", &ctx),
            Err(DispatchError::InvalidRange)
        );
        assert_eq!(
            parse_range("1-9223372036854775807-9", &ctx),
            Err(DispatchError::InvalidRange)
        );
        assert_eq!(parse_range("'a+1", &ctx), Ok(LineRange { begin: 3, end: 3 }));
    }

    #[test]
    fn header_user_command_and_shell() {
        let h = split_header("Foo2 x");
        assert_eq!(h.name, "Foo2");
        let h = split_header("!ls -l");
        assert_eq!(h.name, "!");
        assert!(!h.bang);
        assert_eq!(h.rest, "ls -l");
        let h = split_header("!!make");
        assert!(h.bang);
        assert_eq!(h.rest, "make");
    }

    #[test]
    fn header_without_name() {
        let h = split_header("/tmp/dir");
        assert_eq!(h.name, "");
        assert_eq!(h.rest, "/tmp/dir");
        let h = split_header("5");
        assert_eq!(h.range, "5");
        assert_eq!(h.name, "");
    }

    #[test]
    fn quoted_words() {
        let argv = split_quoted(r#"a 'b c' "d\"e" f\ g"#, false, false).unwrap();
        assert_eq!(argv, ["a", "b c", "d\"e", "f g"]);
        assert_eq!(split_quoted("'open", false, false), Err(DispatchError::InvalidArg));
        assert_eq!(split_quoted("", false, false).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn regex_words_are_verbatim() {
        let argv = split_quoted(r"/a\/b c/i  *.txt", true, false).unwrap();
        assert_eq!(argv, [r"/a\/b c/i", "*.txt"]);
        assert_eq!(split_quoted("/abc", true, false), Err(DispatchError::InvalidArg));
        assert_eq!(split_quoted("/abc", true, true).unwrap(), ["/abc"]);
    }

    #[test]
    fn custom_separator_fields() {
        assert_eq!(split_fields("/a/b/g", '/', Some(-2)).unwrap(), ["a", "b", "g"]);
        assert_eq!(split_fields("/a/b/", '/', Some(-2)).unwrap(), ["a", "b"]);
        assert_eq!(split_fields("/a/b", '/', Some(-2)).unwrap(), ["a", "b"]);
        assert_eq!(split_fields("/a", '/', Some(-2)).unwrap(), ["a"]);
        assert_eq!(split_fields("#a\\#b#c#", '#', Some(2)).unwrap(), ["a#b", "c"]);
        assert_eq!(split_fields("/a\\.b/c/", '/', Some(2)).unwrap(), ["a\\.b", "c"]);
        assert_eq!(split_fields("/abc/x", '/', Some(2)), Err(DispatchError::InvalidArg));
        assert_eq!(split_fields("/a/b/c", '/', None).unwrap(), ["a", "b", "c"]);
    }

    #[test]
    fn escape_round_trips_through_quoted_split() {
        let path = "/tmp/it's a $dir|x";
        let argv = split_quoted(&escape_arg(path), false, false).unwrap();
        assert_eq!(argv, [path]);
    }
}
