//! User-defined commands (`:command Name action`).
//!
//! A user command is a line of commands run with `%a` replaced by the
//! arguments it was invoked with.  Names start with an uppercase letter and
//! may be abbreviated to any unique prefix.

use std::collections::BTreeMap;

use tracing::debug;

use super::context::{CmdContext, CmdInputType};
use super::dispatch::dispatch_line;
use super::error::{CmdResult, DispatchError, Status};
use super::parse::{CmdInfo, Header};
use super::registry::{CmdFlags, CommandDef, CommandRegistry};

// ── UserCommands ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct UserCommands {
    cmds: BTreeMap<String, String>,
}

impl UserCommands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define `name`; redefining requires `overwrite`.
    pub fn define(&mut self, name: &str, action: &str, overwrite: bool) -> Result<(), DispatchError> {
        if !is_valid_name(name) {
            return Err(DispatchError::IncorrectName);
        }
        if self.cmds.contains_key(name) && !overwrite {
            return Err(DispatchError::NeedBang);
        }
        self.cmds.insert(name.to_owned(), action.to_owned());
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.cmds.remove(name).is_some()
    }

    /// Exact name, else the only command `token` is a prefix of.
    pub fn resolve(&self, token: &str) -> Result<(&str, &str), DispatchError> {
        if let Some((name, action)) = self.cmds.get_key_value(token) {
            return Ok((name, action));
        }
        let mut candidates = self
            .cmds
            .range(token.to_owned()..)
            .take_while(|(name, _)| name.starts_with(token));
        match (candidates.next(), candidates.next()) {
            (Some((name, action)), None) => Ok((name, action)),
            (Some(_), Some(_)) => Err(DispatchError::UdfIsAmbiguous),
            (None, _) => Err(DispatchError::NoSuchUdf),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cmds.iter().map(|(n, a)| (n.as_str(), a.as_str()))
    }

    pub fn len(&self) -> usize {
        self.cmds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_uppercase()) && chars.all(|c| c.is_ascii_alphanumeric())
}

/// Replace `%a` with `args` and `%%` with `%`.
pub fn substitute_args(action: &str, args: &str) -> String {
    let mut out = String::with_capacity(action.len() + args.len());
    let mut chars = action.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '%' {
            match chars.peek() {
                Some('a') => {
                    chars.next();
                    out.push_str(args);
                    continue;
                }
                Some('%') => {
                    chars.next();
                    out.push('%');
                    continue;
                }
                _ => {}
            }
        }
        out.push(c);
    }
    out
}

// ── Execution ─────────────────────────────────────────────────────────────────

/// Run the user command named in `header` in a scope of its own.
pub fn run_user_command<C: CmdContext>(ctx: &mut C, header: &Header<'_>, input: CmdInputType) -> CmdResult {
    if !header.range.is_empty() {
        return Err(DispatchError::NoRangeAllowed);
    }
    if header.bang {
        return Err(DispatchError::NoBangAllowed);
    }

    let engine = ctx.engine();
    let (name, action) = engine.user_commands.resolve(header.name)?;
    let line = substitute_args(action, header.rest.trim());
    if engine.depth >= engine.max_depth {
        return Err(DispatchError::Loop);
    }
    debug!(name, line = %line, depth = engine.depth, "user command");

    engine.depth += 1;
    engine.scope.scope_start();
    let status = dispatch_line(ctx, &line, input);
    let finished = ctx.engine().scope.scope_finish();
    ctx.engine().depth -= 1;

    if status.is_failure() {
        return Err(DispatchError::Custom);
    }
    if let Err(e) = finished {
        ctx.post_error(&e.to_string());
        return Err(DispatchError::Custom);
    }
    Ok(if status.code() > 0 { Status::KeepMessage } else { Status::Silent })
}

// ── Commands ──────────────────────────────────────────────────────────────────

pub(crate) fn register<C: CmdContext>(reg: &mut CommandRegistry<C>) {
    reg.add(
        CommandDef::new("com[mand]", cmd_command)
            .flags(CmdFlags::BANG | CmdFlags::UNTIL_THE_END),
    );
    reg.add(
        CommandDef::new("delc[ommand]", cmd_delcommand)
            .args(1, Some(1))
            .flags(CmdFlags::BANG),
    );
}

fn cmd_command<C: CmdContext>(info: &CmdInfo, ctx: &mut C) -> CmdResult {
    let text = info.args.trim();
    let (name, action) = match text.split_once(char::is_whitespace) {
        Some((name, action)) => (name, action.trim_start()),
        None => (text, ""),
    };

    if action.is_empty() {
        return list_commands(ctx, name);
    }
    ctx.engine().user_commands.define(name, action, info.bang)?;
    Ok(Status::Silent)
}

fn list_commands<C: CmdContext>(ctx: &mut C, prefix: &str) -> CmdResult {
    let listing: Vec<String> = ctx
        .engine()
        .user_commands
        .iter()
        .filter(|(name, _)| name.starts_with(prefix))
        .map(|(name, action)| format!("{name:<10} {action}"))
        .collect();
    if listing.is_empty() {
        ctx.post_message("No user-defined commands found");
    } else {
        ctx.post_message(&listing.join("\n"));
    }
    Ok(Status::KeepMessage)
}

fn cmd_delcommand<C: CmdContext>(info: &CmdInfo, ctx: &mut C) -> CmdResult {
    let name = info.arg(0).unwrap_or_default();
    if !ctx.engine().user_commands.remove(name) && !info.bang {
        return Err(DispatchError::NoSuchUdf);
    }
    Ok(Status::Silent)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmdline::dispatch::exec_commands;
    use crate::cmdline::error::LineStatus;
    use crate::cmdline::testing::MockCtx;

    fn run(ctx: &mut MockCtx, line: &str) -> LineStatus {
        exec_commands(ctx, line, CmdInputType::Command)
    }

    #[test]
    fn resolve_by_unique_prefix() {
        let mut cmds = UserCommands::new();
        cmds.define("Build", "!make", false).unwrap();
        cmds.define("Bump", "!bump", false).unwrap();
        cmds.define("Clean", "!make clean", false).unwrap();
        assert_eq!(cmds.resolve("Bui"), Ok(("Build", "!make")));
        assert_eq!(cmds.resolve("C"), Ok(("Clean", "!make clean")));
        assert_eq!(cmds.resolve("B"), Err(DispatchError::UdfIsAmbiguous));
        assert_eq!(cmds.resolve("X"), Err(DispatchError::NoSuchUdf));
    }

    #[test]
    fn exact_name_beats_longer_candidates() {
        let mut cmds = UserCommands::new();
        cmds.define("Go", "a", false).unwrap();
        cmds.define("Gone", "b", false).unwrap();
        assert_eq!(cmds.resolve("Go"), Ok(("Go", "a")));
    }

    #[test]
    fn define_rules() {
        let mut cmds = UserCommands::new();
        assert_eq!(cmds.define("lower", "x", false), Err(DispatchError::IncorrectName));
        assert_eq!(cmds.define("A-b", "x", false), Err(DispatchError::IncorrectName));
        cmds.define("A1", "x", false).unwrap();
        assert_eq!(cmds.define("A1", "y", false), Err(DispatchError::NeedBang));
        cmds.define("A1", "y", true).unwrap();
        assert_eq!(cmds.resolve("A1"), Ok(("A1", "y")));
    }

    #[test]
    fn args_are_substituted() {
        assert_eq!(substitute_args("echo %a", "1 2"), "echo 1 2");
        assert_eq!(substitute_args("echo '100%%' %a%x", "z"), "echo '100%' z%x");
    }

    #[test]
    fn user_command_runs_its_line() {
        let mut ctx = MockCtx::new();
        assert_eq!(run(&mut ctx, "command Set let $%a = 7"), LineStatus::Silent);
        assert_eq!(run(&mut ctx, "Set v"), LineStatus::Silent);
        assert_eq!(ctx.env.get("v").map(String::as_str), Some("7"));
    }

    #[test]
    fn redefinition_needs_bang() {
        let mut ctx = MockCtx::new();
        run(&mut ctx, "command Hi echo 1");
        assert_eq!(run(&mut ctx, "command Hi echo 2"), LineStatus::Failed);
        assert_eq!(ctx.errors, ["Add bang to force"]);
        assert_eq!(run(&mut ctx, "command! Hi echo 2"), LineStatus::Silent);
    }

    #[test]
    fn range_and_bang_are_rejected() {
        let mut ctx = MockCtx::new();
        run(&mut ctx, "command Hi echo 1");
        run(&mut ctx, "2Hi");
        run(&mut ctx, "Hi!");
        run(&mut ctx, "Nope");
        assert_eq!(
            ctx.errors,
            ["No range is allowed", "No ! is allowed", "No such user defined command"]
        );
    }

    #[test]
    fn recursion_is_a_loop() {
        let mut ctx = MockCtx::new();
        run(&mut ctx, "command Again Again");
        assert_eq!(run(&mut ctx, "Again"), LineStatus::Failed);
        assert_eq!(ctx.errors, ["Loop in commands"]);
        assert_eq!(ctx.engine.depth(), 0);
        assert!(ctx.engine.scope.is_empty());
    }

    #[test]
    fn unbalanced_body_is_reported() {
        let mut ctx = MockCtx::new();
        run(&mut ctx, "command Open if 1");
        assert_eq!(run(&mut ctx, "Open | let $a = 1"), LineStatus::Failed);
        assert_eq!(ctx.errors, ["Missing :endif"]);
        assert!(ctx.env.get("a").is_none());
    }

    #[test]
    fn listing_and_deleting() {
        let mut ctx = MockCtx::new();
        run(&mut ctx, "command Hi echo 1");
        assert_eq!(run(&mut ctx, "command"), LineStatus::KeepMessage);
        assert_eq!(ctx.messages.last().map(String::as_str), Some("Hi         echo 1"));
        run(&mut ctx, "delcommand Hi");
        assert!(ctx.engine.user_commands.is_empty());
        assert_eq!(run(&mut ctx, "delcommand Hi"), LineStatus::Failed);
        assert_eq!(run(&mut ctx, "delcommand! Hi"), LineStatus::Silent);
    }
}
