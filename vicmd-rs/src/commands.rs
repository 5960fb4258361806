//! Built-in commands of the file manager.
//!
//! | Command                  | Effect                                          |
//! |--------------------------|-------------------------------------------------|
//! | `:[!]!cmd [&]`           | queue a shell command (`%c %f %d`, `$VAR`)      |
//! | `:cd [dir]`, `:pwd`      | change or show the directory                    |
//! | `:echo expr...`          | show values                                     |
//! | `:execute expr...`       | run the values as a command line                |
//! | `:let`, `:unlet`         | `$ENV`, `g:var` and `&option` assignment        |
//! | `:source file`, `:finish`| run a script / leave it early                   |
//! | `:set args...`           | change options                                  |
//! | `:[range]select[!] pat`  | add matching files to the selection             |
//! | `:[range]unselect pat`   | remove them                                     |
//! | `:[range]s/pat/sub/[gi]` | rename files by regular expression              |
//! | `:[range]tr/abc/xyz/`    | rename files by character translation           |
//! | `:[range]mark x`         | set a mark                                      |
//! | `:messages`              | show the message history                        |
//! | `:quit[!]`               | queue quitting                                  |
//! | `:normal[!] keys`        | run normal-mode keys                            |
//! | `:map`, `:noremap`, ...  | normal-mode mappings                            |
//!
//! Handlers that fail post their own message and return
//! [`DispatchError::Custom`].

use crate::cmdline::context::{CmdContext, CmdInputType};
use crate::cmdline::dispatch::dispatch_line;
use crate::cmdline::error::{CmdResult, DispatchError, LineStatus, Status};
use crate::cmdline::eval::eval_arg_list;
use crate::cmdline::parse::CmdInfo;
use crate::cmdline::registry::{CmdFlags, CommandDef, CommandRegistry};
use crate::config::ConfigError;
use crate::keymap::key_sequence;
use crate::pattern::{compile_regex, vim_replacement, Pattern};
use crate::script::expr::{evaluate, EvalContext, ParseError};
use crate::script::value::Value;
use crate::session::{Action, Session};

/// The main command table.
pub fn registry() -> CommandRegistry<Session> {
    let mut reg = CommandRegistry::core();
    reg.add(
        CommandDef::new("!", cmd_shell).args(1, None).flags(
            CmdFlags::BANG
                | CmdFlags::BG
                | CmdFlags::EXPAND_MACROS
                | CmdFlags::EXPAND_ENVVARS
                | CmdFlags::UNTIL_THE_END,
        ),
    );
    reg.add(
        CommandDef::new("cd", cmd_cd)
            .args(0, Some(1))
            .flags(CmdFlags::QUOTE | CmdFlags::EXPAND_ENVVARS),
    );
    reg.add(CommandDef::new("pw[d]", cmd_pwd).args(0, Some(0)));
    reg.add(CommandDef::new("ec[ho]", cmd_echo).flags(CmdFlags::EXPR));
    reg.add(CommandDef::new("exe[cute]", cmd_execute).flags(CmdFlags::EXPR));
    reg.add(CommandDef::new("let", cmd_let).args(1, None).flags(CmdFlags::EXPR));
    reg.add(CommandDef::new("unl[et]", cmd_unlet).args(1, None).flags(CmdFlags::BANG));
    reg.add(
        CommandDef::new("so[urce]", cmd_source)
            .args(1, Some(1))
            .flags(CmdFlags::QUOTE | CmdFlags::EXPAND_ENVVARS),
    );
    reg.add(CommandDef::new("fini[sh]", cmd_finish).args(0, Some(0)));
    reg.add(CommandDef::new("se[t]", cmd_set).flags(CmdFlags::QUOTE));
    reg.add(
        CommandDef::new("sel[ect]", cmd_select)
            .args(0, Some(1))
            .flags(CmdFlags::BANG | CmdFlags::RANGE | CmdFlags::QUOTE)
            .regex_quotes(-1),
    );
    reg.add(
        CommandDef::new("unsel[ect]", cmd_unselect)
            .args(0, Some(1))
            .flags(CmdFlags::RANGE | CmdFlags::QUOTE)
            .regex_quotes(-1),
    );
    reg.add(
        CommandDef::new("s[ubstitute]", cmd_substitute)
            .args(0, Some(3))
            .flags(CmdFlags::RANGE | CmdFlags::CUSTOM_SEP)
            .regex_quotes(-2),
    );
    reg.add(
        CommandDef::new("tr", cmd_tr)
            .args(2, Some(2))
            .flags(CmdFlags::RANGE | CmdFlags::CUSTOM_SEP)
            .regex_quotes(2),
    );
    reg.add(CommandDef::new("ma[rk]", cmd_mark).args(1, Some(1)).flags(CmdFlags::RANGE));
    reg.add(CommandDef::new("mes[sages]", cmd_messages).args(0, Some(0)));
    reg.add(CommandDef::new("q[uit]", cmd_quit).args(0, Some(0)).flags(CmdFlags::BANG));
    reg.add(
        CommandDef::new("norm[al]", cmd_normal)
            .args(1, None)
            .flags(CmdFlags::BANG | CmdFlags::UNTIL_THE_END),
    );
    for name in ["map", "nm[ap]"] {
        reg.add(CommandDef::new(name, cmd_map).flags(CmdFlags::UNTIL_THE_END));
    }
    for name in ["no[remap]", "nn[oremap]"] {
        reg.add(CommandDef::new(name, cmd_noremap).flags(CmdFlags::UNTIL_THE_END));
    }
    for name in ["unm[ap]", "nun[map]"] {
        reg.add(CommandDef::new(name, cmd_unmap).args(1, None).flags(CmdFlags::UNTIL_THE_END));
    }
    reg
}

/// The command table of menus.
pub fn menu_registry() -> CommandRegistry<Session> {
    let mut reg = CommandRegistry::core();
    reg.add(CommandDef::new("q[uit]", cmd_close_menu).args(0, Some(0)).flags(CmdFlags::BANG));
    reg.add(CommandDef::new("ec[ho]", cmd_echo).flags(CmdFlags::EXPR));
    reg
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn error(s: &mut Session, msg: &str) -> DispatchError {
    s.post_error(msg);
    DispatchError::Custom
}

fn fail(s: &mut Session, msg: &str) -> CmdResult {
    Err(error(s, msg))
}

fn eval_list(s: &mut Session, text: &str) -> Result<String, DispatchError> {
    eval_arg_list(text, |expr| s.eval(expr, true)).map_err(|e| error(s, &e.describe(text)))
}

fn eval_single(s: &mut Session, text: &str) -> Result<Value, DispatchError> {
    let outcome = evaluate(text, false, s);
    match (outcome.value, outcome.error) {
        (Some(value), None) => Ok(value),
        (_, Some(ParseError::Eval(msg))) => Err(error(s, &msg)),
        _ => Err(error(s, &format!("Invalid expression: {text}"))),
    }
}

fn is_var_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ── Shell and directories ─────────────────────────────────────────────────────

fn cmd_shell(info: &CmdInfo, s: &mut Session) -> CmdResult {
    s.push_action(Action::Shell {
        command: info.args.clone(),
        background: info.bg,
        pause: info.bang,
    });
    Ok(Status::Silent)
}

fn cmd_cd(info: &CmdInfo, s: &mut Session) -> CmdResult {
    let target = match info.arg(0) {
        None => s.expand_path("~"),
        Some("-") => match s.prev_dir.clone() {
            Some(dir) => dir,
            None => return fail(s, "No previous directory"),
        },
        Some(path) => s.expand_path(path),
    };
    match s.change_dir(&target) {
        Ok(()) => Ok(Status::Silent),
        Err(e) => fail(s, &format!("Can't change directory to {}: {e}", target.display())),
    }
}

fn cmd_pwd(_info: &CmdInfo, s: &mut Session) -> CmdResult {
    let cwd = s.view.cwd().display().to_string();
    s.post_message(&cwd);
    Ok(Status::KeepMessage)
}

// ── Expressions and variables ─────────────────────────────────────────────────

fn cmd_echo(info: &CmdInfo, s: &mut Session) -> CmdResult {
    let text = if info.args.is_empty() {
        String::new()
    } else {
        eval_list(s, &info.args)?
    };
    s.post_message(&text);
    Ok(Status::KeepMessage)
}

fn cmd_execute(info: &CmdInfo, s: &mut Session) -> CmdResult {
    if info.args.is_empty() {
        return Ok(Status::Silent);
    }
    let line = eval_list(s, &info.args)?;
    let engine = s.engine();
    if engine.depth >= engine.max_depth {
        return Err(DispatchError::Loop);
    }
    engine.depth += 1;
    let status = dispatch_line(s, &line, CmdInputType::Command);
    s.engine().depth -= 1;
    match status {
        LineStatus::Silent => Ok(Status::Silent),
        LineStatus::KeepMessage => Ok(Status::KeepMessage),
        LineStatus::Failed => Err(DispatchError::Custom),
    }
}

#[derive(Clone, Copy)]
enum Target<'a> {
    Env(&'a str),
    Global(&'a str),
    Opt(&'a str),
}

fn parse_target(lhs: &str) -> Option<Target<'_>> {
    let (target, name) = if let Some(name) = lhs.strip_prefix('$') {
        (Target::Env(name), name)
    } else if let Some(name) = lhs.strip_prefix("g:") {
        (Target::Global(name), name)
    } else if let Some(name) = lhs.strip_prefix('&') {
        (Target::Opt(name), name)
    } else {
        return None;
    };
    is_var_name(name).then_some(target)
}

/// `:let {var} = expr`, also `.=`, `+=` and `-=`.
fn cmd_let(info: &CmdInfo, s: &mut Session) -> CmdResult {
    let args = info.args.as_str();
    let Some(eq) = args.find('=') else {
        return fail(s, &format!("Incorrect :let statement: {args}"));
    };
    let mut lhs = args[..eq].trim_end();
    let rhs = args[eq + 1..].trim();
    let op = match lhs.chars().last() {
        Some(c @ ('.' | '+' | '-')) => {
            lhs = lhs[..lhs.len() - 1].trim_end();
            Some(c)
        }
        _ => None,
    };
    let Some(target) = parse_target(lhs) else {
        return fail(s, &format!("Incorrect variable name: {lhs}"));
    };

    let value = eval_single(s, rhs)?;
    let value = match op {
        None => value,
        Some(op) => {
            let current = match target {
                Target::Env(name) => Value::Str(s.get_env(name).unwrap_or_default()),
                Target::Global(name) => match s.get_var(&format!("g:{name}")) {
                    Some(v) => v,
                    None => return fail(s, &format!("Undefined variable: g:{name}")),
                },
                Target::Opt(name) => match s.get_option(name) {
                    Some(v) => v,
                    None => return fail(s, &format!("Unknown option: {name}")),
                },
            };
            match op {
                '.' => current.concat(&value),
                '+' => current.arith_add(&value),
                _ => current.arith_sub(&value),
            }
        }
    };

    match target {
        Target::Env(name) => s.set_env(name, &value.as_str()),
        Target::Global(name) => s.set_global(name, value),
        Target::Opt(name) => {
            if let Err(e) = s.options.set_value(name, &value) {
                return fail(s, &e.to_string());
            }
        }
    }
    Ok(Status::Silent)
}

fn cmd_unlet(info: &CmdInfo, s: &mut Session) -> CmdResult {
    for arg in &info.argv {
        let removed = match parse_target(arg) {
            Some(Target::Env(name)) => s.unset_env(name),
            Some(Target::Global(name)) => s.unset_global(name),
            _ => return fail(s, &format!("Incorrect variable name: {arg}")),
        };
        if !removed && !info.bang {
            return fail(s, &format!("No such variable: {arg}"));
        }
    }
    Ok(Status::Silent)
}

// ── Scripts and options ───────────────────────────────────────────────────────

fn cmd_source(info: &CmdInfo, s: &mut Session) -> CmdResult {
    let path = s.expand_path(info.arg(0).unwrap_or_default());
    let engine = s.engine_state();
    if engine.depth() >= engine.max_depth {
        return Err(DispatchError::Loop);
    }
    match s.source_file(&path) {
        Ok(()) => Ok(Status::Silent),
        Err(e @ ConfigError::Io { .. }) => fail(s, &e.to_string()),
        // Failing lines were already reported.
        Err(ConfigError::Script { .. }) => Err(DispatchError::Custom),
    }
}

/// Stops the rest of the line and the script it belongs to.
fn cmd_finish(_info: &CmdInfo, s: &mut Session) -> CmdResult {
    if s.sourcing == 0 {
        return fail(s, ":finish used outside of a sourced file");
    }
    s.finished = true;
    Err(DispatchError::Custom)
}

fn cmd_set(info: &CmdInfo, s: &mut Session) -> CmdResult {
    let queries: Vec<String> = if info.argv.is_empty() {
        s.options.iter().map(|(name, _)| format!("{name}?")).collect()
    } else {
        info.argv.clone()
    };

    let mut shown = Vec::new();
    for arg in &queries {
        match s.options.apply(arg) {
            Ok(Some(text)) => shown.push(text),
            Ok(None) => {}
            Err(e) => return fail(s, &e.to_string()),
        }
    }
    if shown.is_empty() {
        return Ok(Status::Silent);
    }
    s.post_message(&shown.join("\n"));
    Ok(Status::KeepMessage)
}

// ── Selection ─────────────────────────────────────────────────────────────────

/// The pattern argument, or the last one used.
fn select_pattern(info: &CmdInfo, s: &mut Session) -> Result<Pattern, DispatchError> {
    let src = match info.arg(0) {
        Some(arg) => arg.to_owned(),
        None => match s.last.select.clone() {
            Some(prev) => prev,
            None => return Err(error(s, "No previous pattern")),
        },
    };
    let pattern = Pattern::new(&src, s.options.get_bool("ignorecase"))
        .map_err(|e| error(s, &e.to_string()))?;
    s.last.select = Some(src);
    Ok(pattern)
}

fn matching_lines(s: &Session, pattern: &Pattern) -> Vec<usize> {
    s.view
        .entries()
        .iter()
        .enumerate()
        .filter(|(_, name)| pattern.matches(name))
        .map(|(i, _)| i)
        .collect()
}

fn cmd_select(info: &CmdInfo, s: &mut Session) -> CmdResult {
    let lines: Vec<usize> = match (info.range, info.argv.is_empty()) {
        (Some(_), false) => return fail(s, "Either range or argument should be supplied"),
        (Some(range), true) => (range.begin..=range.end).collect(),
        (None, _) => {
            let pattern = select_pattern(info, s)?;
            matching_lines(s, &pattern)
        }
    };
    if info.bang {
        s.view.clear_selection();
    }
    for line in lines {
        s.view.select(line);
    }
    Ok(Status::Silent)
}

fn cmd_unselect(info: &CmdInfo, s: &mut Session) -> CmdResult {
    let lines: Vec<usize> = match (info.range, info.argv.is_empty()) {
        (Some(_), false) => return fail(s, "Either range or argument should be supplied"),
        (Some(range), true) => (range.begin..=range.end).collect(),
        (None, _) => {
            let pattern = select_pattern(info, s)?;
            matching_lines(s, &pattern)
        }
    };
    for line in lines {
        s.view.deselect(line);
    }
    Ok(Status::Silent)
}

// ── Renaming ──────────────────────────────────────────────────────────────────

/// Rename every target line through `rename`; names it leaves alone are
/// skipped.
fn rename_targets(s: &mut Session, mut rename: impl FnMut(&str) -> String) -> CmdResult {
    let mut renamed = 0;
    for line in s.target_lines() {
        let Some(old) = s.view.entries().get(line).cloned() else {
            continue;
        };
        let new = rename(&old);
        if new == old {
            continue;
        }
        if new.is_empty() || new.contains('/') {
            return fail(s, &format!("Invalid new name for {old}: {new}"));
        }
        if let Err(e) = s.view.rename(line, &new) {
            return fail(s, &format!("Can't rename {old} to {new}: {e}"));
        }
        renamed += 1;
    }
    let plural = if renamed == 1 { "" } else { "s" };
    s.post_message(&format!("{renamed} file{plural} renamed"));
    Ok(Status::KeepMessage)
}

fn cmd_substitute(info: &CmdInfo, s: &mut Session) -> CmdResult {
    let (pattern, replacement, flags) = match info.argv.as_slice() {
        [] => (String::new(), s.last.sub_replacement.clone(), s.last.sub_flags.clone()),
        [pat] => (pat.clone(), String::new(), String::new()),
        [pat, sub] => (pat.clone(), sub.clone(), String::new()),
        [pat, sub, flags, ..] => (pat.clone(), sub.clone(), flags.clone()),
    };
    let pattern = if pattern.is_empty() {
        match s.last.sub_pattern.clone() {
            Some(prev) => prev,
            None => return fail(s, "No previous regular expression"),
        }
    } else {
        pattern
    };

    let mut global = false;
    let mut ignorecase = s.options.get_bool("ignorecase");
    for flag in flags.chars() {
        match flag {
            'g' => global = true,
            'i' => ignorecase = true,
            'I' => ignorecase = false,
            c => return fail(s, &format!("Unknown flag: {c}")),
        }
    }
    let re = compile_regex(&pattern, ignorecase).map_err(|e| error(s, &e.to_string()))?;
    s.last.sub_pattern = Some(pattern);
    s.last.sub_replacement = replacement.clone();
    s.last.sub_flags = flags;

    let replacement = vim_replacement(&replacement);
    rename_targets(s, |name| {
        let new = if global {
            re.replace_all(name, replacement.as_str())
        } else {
            re.replace(name, replacement.as_str())
        };
        new.into_owned()
    })
}

fn cmd_tr(info: &CmdInfo, s: &mut Session) -> CmdResult {
    let from: Vec<char> = info.arg(0).unwrap_or_default().chars().collect();
    let to: Vec<char> = info.arg(1).unwrap_or_default().chars().collect();
    if from.len() != to.len() {
        return fail(s, "Strings have different lengths");
    }
    rename_targets(s, |name| {
        name.chars()
            .map(|c| from.iter().position(|&f| f == c).map_or(c, |i| to[i]))
            .collect()
    })
}

// ── Marks, messages, quitting ─────────────────────────────────────────────────

fn cmd_mark(info: &CmdInfo, s: &mut Session) -> CmdResult {
    let mut chars = info.arg(0).unwrap_or_default().chars();
    let mark = match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphanumeric() => c,
        _ => return Err(DispatchError::InvalidArg),
    };
    let line = info.range.map_or(s.view.cursor(), |r| r.end);
    s.view.set_mark(mark, line);
    Ok(Status::Silent)
}

fn cmd_messages(_info: &CmdInfo, s: &mut Session) -> CmdResult {
    let text: Vec<String> = s.status.history().map(|m| m.text.clone()).collect();
    s.post_message(&text.join("\n"));
    Ok(Status::KeepMessage)
}

fn cmd_quit(info: &CmdInfo, s: &mut Session) -> CmdResult {
    s.push_action(Action::Quit { force: info.bang });
    Ok(Status::Silent)
}

fn cmd_close_menu(_info: &CmdInfo, s: &mut Session) -> CmdResult {
    s.push_action(Action::CloseMenu);
    Ok(Status::Silent)
}

// ── Keys ──────────────────────────────────────────────────────────────────────

fn cmd_normal(info: &CmdInfo, s: &mut Session) -> CmdResult {
    s.normal(&key_sequence(&info.args), !info.bang)?;
    Ok(Status::Silent)
}

fn cmd_map(info: &CmdInfo, s: &mut Session) -> CmdResult {
    define_mapping(info, s, false)
}

fn cmd_noremap(info: &CmdInfo, s: &mut Session) -> CmdResult {
    define_mapping(info, s, true)
}

fn define_mapping(info: &CmdInfo, s: &mut Session, noremap: bool) -> CmdResult {
    let text = info.args.as_str();
    let (lhs, rhs) = match text.split_once([' ', '\t']) {
        Some((lhs, rhs)) => (lhs, rhs.trim_start()),
        None => (text, ""),
    };
    if rhs.is_empty() {
        let listing: Vec<String> = s
            .keymap
            .listing()
            .into_iter()
            .filter(|line| line.starts_with(lhs))
            .collect();
        let text = if listing.is_empty() {
            "No mappings found".to_owned()
        } else {
            listing.join("\n")
        };
        s.post_message(&text);
        return Ok(Status::KeepMessage);
    }
    s.keymap.map(lhs, rhs, noremap);
    Ok(Status::Silent)
}

fn cmd_unmap(info: &CmdInfo, s: &mut Session) -> CmdResult {
    let lhs = info.args.as_str();
    if !s.keymap.unmap(lhs) {
        return fail(s, &format!("No such mapping: {lhs}"));
    }
    Ok(Status::Silent)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;
    use crate::view::View;

    fn session() -> Session {
        Session::new(View::with_entries(
            "/",
            ["a.c", "b.h", "c.rs", "d.rs"].map(String::from).to_vec(),
        ))
    }

    fn disk_session(dir: &Path, files: &[&str]) -> Session {
        for f in files {
            fs::write(dir.join(f), "").unwrap();
        }
        Session::new(View::open(dir).unwrap())
    }

    fn status(s: &Session) -> Option<&str> {
        s.status.current().map(|m| m.text.as_str())
    }

    fn selected(s: &Session) -> Vec<usize> {
        s.view.effective_selection()
    }

    #[test]
    fn let_and_echo() {
        let mut s = session();
        assert_eq!(s.execute("let $A = 1 + 2 | echo $A 'x'"), LineStatus::KeepMessage);
        assert_eq!(status(&s), Some("3 x"));
        s.execute("let g:x = 'a' | let g:x .= 'b' | echo g:x");
        assert_eq!(status(&s), Some("ab"));
        s.execute("let &history = 20 | let &hi += 2");
        assert_eq!(s.options.get_int("history"), Some(22));
        s.execute("let $A -= 1");
        assert_eq!(s.get_env("A").as_deref(), Some("2"));
    }

    #[test]
    fn let_errors() {
        let mut s = session();
        assert_eq!(s.execute("let x = 1"), LineStatus::Failed);
        assert_eq!(status(&s), Some("Incorrect variable name: x"));
        s.execute("let $A");
        assert_eq!(status(&s), Some("Incorrect :let statement: $A"));
        s.execute("let $A = 1 2");
        assert_eq!(status(&s), Some("Invalid expression: 1 2"));
        s.execute("let g:n += 1");
        assert_eq!(status(&s), Some("Undefined variable: g:n"));
        s.execute("let &bogus = 1");
        assert_eq!(status(&s), Some("Unknown option: bogus"));
    }

    #[test]
    fn unlet() {
        let mut s = session();
        s.execute("let g:v = 1 | unlet g:v");
        assert_eq!(s.get_var("g:v"), None);
        assert_eq!(s.execute("unlet g:v"), LineStatus::Failed);
        assert_eq!(status(&s), Some("No such variable: g:v"));
        assert_eq!(s.execute("unlet! g:v"), LineStatus::Silent);
        assert_eq!(s.execute("unlet v"), LineStatus::Failed);
    }

    #[test]
    fn execute_runs_built_line() {
        let mut s = session();
        assert_eq!(s.execute("execute 'let $E =' 2 * 3"), LineStatus::Silent);
        assert_eq!(s.get_env("E").as_deref(), Some("6"));
        assert_eq!(s.execute("execute 'nosuch'"), LineStatus::Failed);
        assert_eq!(status(&s), Some("Invalid command name"));
    }

    #[test]
    fn set_and_query_options() {
        let mut s = session();
        assert_eq!(s.execute("set autocd history=3"), LineStatus::Silent);
        assert!(s.options.get_bool("autocd"));
        assert_eq!(s.execute("set history?"), LineStatus::KeepMessage);
        assert_eq!(status(&s), Some("  history=3"));
        assert_eq!(s.execute("se bogus"), LineStatus::Failed);
        assert_eq!(status(&s), Some("Unknown option: bogus"));
        s.execute("set");
        assert!(status(&s).is_some_and(|t| t.contains("  autocd\n")));
    }

    #[test]
    fn select_by_glob_regex_and_range() {
        let mut s = session();
        s.execute("select *.rs");
        assert_eq!(selected(&s), [2, 3]);
        s.execute("select! *.c");
        assert_eq!(selected(&s), [0]);
        s.execute("unselect");
        assert!(selected(&s).is_empty());
        s.execute("sel /^[ab]/");
        assert_eq!(selected(&s), [0, 1]);
        s.execute("%unselect | 3,4select");
        assert_eq!(selected(&s), [2, 3]);
        assert_eq!(s.execute("1select *.c"), LineStatus::Failed);
        assert_eq!(status(&s), Some("Either range or argument should be supplied"));
    }

    #[test]
    fn select_without_previous_pattern() {
        let mut s = session();
        assert_eq!(s.execute("select"), LineStatus::Failed);
        assert_eq!(status(&s), Some("No previous pattern"));
        assert_eq!(s.execute("select /(/"), LineStatus::Failed);
        assert!(status(&s).is_some_and(|t| t.starts_with("Regexp error")));
    }

    #[test]
    fn substitute_renames_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = disk_session(dir.path(), &["one.rs", "two.rs", "three.c"]);
        assert_eq!(s.execute(r"%s/\.rs$/.txt/"), LineStatus::KeepMessage);
        assert_eq!(status(&s), Some("2 files renamed"));
        assert!(dir.path().join("one.txt").exists());
        assert!(dir.path().join("two.txt").exists());
        assert!(dir.path().join("three.c").exists());
    }

    #[test]
    fn substitute_flags_and_repeat() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = disk_session(dir.path(), &["banana"]);
        s.execute("s/a/o/");
        assert_eq!(s.view.entries(), ["bonana"]);
        s.execute("s/A/u/gi");
        assert_eq!(s.view.entries(), ["bonunu"]);
        s.execute("s/u/&&/");
        assert_eq!(s.view.entries(), ["bonuunu"]);
        s.execute("s");
        assert_eq!(s.view.entries(), ["bonuuunu"]);
        assert_eq!(s.execute("s/x/y/q"), LineStatus::Failed);
        assert_eq!(status(&s), Some("Unknown flag: q"));
        assert_eq!(s.execute("s/n/a\\/b/"), LineStatus::Failed);
        assert!(status(&s).is_some_and(|t| t.starts_with("Invalid new name")));
    }

    #[test]
    fn substitute_needs_previous_pattern() {
        let mut s = session();
        assert_eq!(s.execute("s"), LineStatus::Failed);
        assert_eq!(status(&s), Some("No previous regular expression"));
    }

    #[test]
    fn tr_translates_characters() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = disk_session(dir.path(), &["a b c"]);
        assert_eq!(s.execute("tr/ /_/"), LineStatus::KeepMessage);
        assert_eq!(s.view.entries(), ["a_b_c"]);
        assert_eq!(s.execute("tr/ab/c/"), LineStatus::Failed);
        assert_eq!(status(&s), Some("Strings have different lengths"));
    }

    #[test]
    fn marks_and_bare_ranges() {
        let mut s = session();
        s.execute("3mark z");
        s.execute("'z");
        assert_eq!(s.view.cursor(), 2);
        assert_eq!(s.execute("mark zz"), LineStatus::Failed);
        assert_eq!(status(&s), Some("Invalid argument"));
    }

    #[test]
    fn cd_pwd_and_back() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub dir")).unwrap();
        let mut s = disk_session(dir.path(), &[]);
        assert_eq!(s.execute("cd 'sub dir'"), LineStatus::Silent);
        assert_eq!(s.view.cwd(), dir.path().join("sub dir"));
        s.execute("pwd");
        assert_eq!(status(&s), Some(dir.path().join("sub dir").to_str().unwrap()));
        s.execute("cd -");
        assert_eq!(s.view.cwd(), dir.path());
        assert_eq!(s.execute("cd missing"), LineStatus::Failed);
        assert!(status(&s).is_some_and(|t| t.starts_with("Can't change directory to")));
    }

    #[test]
    fn shell_commands_are_queued() {
        let mut s = session();
        s.view.set_cursor(2);
        s.execute("!ls %c &");
        s.execute("!!make | tee log");
        assert_eq!(
            s.take_actions(),
            [
                Action::Shell {
                    command: "ls c.rs".into(),
                    background: true,
                    pause: false
                },
                Action::Shell {
                    command: "make | tee log".into(),
                    background: false,
                    pause: true
                },
            ]
        );
        assert!(s.take_actions().is_empty());
    }

    #[test]
    fn quit_and_menu_table() {
        let mut s = session();
        s.execute("q!");
        assert_eq!(s.execute_menu("quit"), LineStatus::Silent);
        assert_eq!(s.take_actions(), [Action::Quit { force: true }, Action::CloseMenu]);
        assert_eq!(s.execute_menu("echo 1 | if 1 | echo 2 | endif"), LineStatus::KeepMessage);
        assert_eq!(status(&s), Some("2"));
        assert_eq!(s.execute_menu("set autocd"), LineStatus::Failed);
        assert_eq!(status(&s), Some("Invalid command name"));
    }

    #[test]
    fn messages_lists_history() {
        let mut s = session();
        s.execute("echo 'one'");
        s.execute("nosuch");
        s.execute("messages");
        assert_eq!(status(&s), Some("one\nInvalid command name"));
    }

    #[test]
    fn mappings_and_normal() {
        let mut s = session();
        assert_eq!(s.execute("nnoremap x :echo 'a|b'<cr>"), LineStatus::Silent);
        assert_eq!(s.execute("normal x"), LineStatus::Silent);
        assert_eq!(status(&s), Some("a|b"));
        s.execute("map");
        assert_eq!(status(&s), Some("x          *:echo 'a|b'<cr>"));
        s.execute("map y jj");
        s.execute("normal y");
        assert_eq!(s.view.cursor(), 2);
        s.execute("normal! y");
        assert_eq!(s.view.cursor(), 2);
        assert_eq!(s.execute("unmap x"), LineStatus::Silent);
        assert_eq!(s.execute("nunmap x"), LineStatus::Failed);
        assert_eq!(status(&s), Some("No such mapping: x"));
    }

    #[test]
    fn source_finish_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("script.vim");
        fs::write(
            &script,
            "\" comment\nlet $S = 1\nif $S == 1\n  finish\nendif\nlet $S = 2\n",
        )
        .unwrap();
        let mut s = session();
        let line = format!("source {}", script.display());
        assert_eq!(s.execute(&line), LineStatus::Silent);
        assert_eq!(s.get_env("S").as_deref(), Some("1"));
        assert!(s.engine_state().scope.is_empty());
        assert!(s.status.current().is_none());

        assert_eq!(s.execute("finish"), LineStatus::Failed);
        assert_eq!(status(&s), Some(":finish used outside of a sourced file"));

        assert_eq!(s.execute("source nosuch.vim"), LineStatus::Failed);
        assert!(status(&s).is_some_and(|t| t.starts_with("Can't read /nosuch.vim")));
    }

    #[test]
    fn source_keeps_going_and_reports_open_blocks() {
        let mut s = session();
        let err = s
            .source_str(Path::new("inline"), "nosuch\nlet $R = 1\nif 1\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Script { ref lines, .. } if *lines == [1, 3]));
        assert_eq!(s.get_env("R").as_deref(), Some("1"));
        assert_eq!(status(&s), Some("Missing :endif"));
        assert!(s.engine_state().scope.is_empty());
    }

    #[test]
    fn recursive_source_is_a_loop() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("self.vim");
        fs::write(&script, format!("source {}\n", script.display())).unwrap();
        let mut s = session();
        s.engine().max_depth = 10;
        assert_eq!(s.execute(&format!("source {}", script.display())), LineStatus::Failed);
        let errors: Vec<&str> = s
            .status
            .history()
            .filter(|m| m.is_error)
            .map(|m| m.text.as_str())
            .collect();
        assert_eq!(errors, ["Loop in commands"]);
        assert_eq!(s.engine_state().depth(), 0);
    }

    #[test]
    fn recursive_execute_is_a_loop() {
        let mut s = session();
        s.engine().max_depth = 10;
        s.execute("let g:c = 'execute g:c'");
        assert_eq!(s.execute("execute g:c"), LineStatus::Failed);
        let errors: Vec<&str> = s
            .status
            .history()
            .filter(|m| m.is_error)
            .map(|m| m.text.as_str())
            .collect();
        assert_eq!(errors, ["Loop in commands"]);
        assert_eq!(s.engine_state().depth(), 0);

        s.execute("let g:c = 'echo 7'");
        assert_eq!(s.execute("execute g:c"), LineStatus::KeepMessage);
        assert_eq!(status(&s), Some("7"));
    }
}
