//! Running command lines.
//!
//! [`dispatch_line`] splits a line and runs each command through
//! [`dispatch_one`], which gates it on the conditional scope, checks it
//! against its declaration and calls the handler.  Failures are turned into
//! one status line here; handlers that report their own errors return
//! [`DispatchError::Custom`].

use tracing::{debug, trace};

use super::context::{CmdContext, CmdInputType};
use super::error::{CmdResult, DispatchError, LineStatus, Status};
use super::parse::{arg_layout, escape_arg, parse_range, prepare, split_header, Header};
use super::registry::{CommandDef, CommandRegistry};
use super::split::split;
use super::usercmd::run_user_command;

/// Run every command of `line`, stopping at the first failure.
pub fn dispatch_line<C: CmdContext>(ctx: &mut C, line: &str, input: CmdInputType) -> LineStatus {
    let registry = ctx.registry(input);
    let cmds = split(line, &registry);
    debug!(?cmds, "split command line");

    let mut status = LineStatus::Silent;
    for cmd in &cmds {
        match dispatch_one(ctx, cmd, input) {
            Ok(Status::Silent) => {}
            Ok(Status::KeepMessage) => status = LineStatus::KeepMessage,
            Err(_) => return LineStatus::Failed,
        }
    }
    status
}

/// Run `line` in a scope of its own.  Blocks left open are an error.
pub fn exec_commands<C: CmdContext>(ctx: &mut C, line: &str, input: CmdInputType) -> LineStatus {
    ctx.engine().scope.scope_start();
    let status = dispatch_line(ctx, line, input);
    match ctx.engine().scope.scope_finish() {
        Ok(()) => status,
        Err(e) => {
            if !status.is_failure() {
                ctx.post_error(&e.to_string());
            }
            LineStatus::Failed
        }
    }
}

/// Run one already split command.
pub fn dispatch_one<C: CmdContext>(ctx: &mut C, cmd: &str, input: CmdInputType) -> CmdResult {
    let line = cmd.trim_start_matches([' ', '\t', ':']);
    if line.starts_with('"') {
        return Ok(Status::Silent);
    }
    if line.trim().is_empty() {
        ctx.stash_selection();
        return Ok(Status::Silent);
    }

    let registry = ctx.registry(input);
    let header = split_header(line);
    let def = registry.lookup(header.name);
    if !ctx.engine().scope.gate(def.and_then(|d| d.control)) {
        trace!(cmd = line, "skipped");
        return Ok(Status::Silent);
    }

    ctx.engine().keep_selection = false;
    let result = match def {
        Some(def) => run_builtin(ctx, &registry, &header, def),
        None => run_other(ctx, &header, input),
    };
    if !ctx.engine().keep_selection {
        ctx.unmark_range();
    }

    match result {
        Err(e) if e.allows_implicit_cd() && ctx.implicit_cd_enabled() => {
            match ctx.resolve_dir(line.trim()) {
                Some(dir) => {
                    debug!(dir = %dir.display(), "implicit cd");
                    let cd = format!("cd {}", escape_arg(&dir.to_string_lossy()));
                    dispatch_one(ctx, &cd, CmdInputType::Command)
                }
                None => report(ctx, e),
            }
        }
        Err(e) => report(ctx, e),
        ok => ok,
    }
}

/// Keep the current selection after the running command finishes.
///
/// Only meaningful from inside a handler.
pub fn preserve_selection<C: CmdContext>(ctx: &mut C) {
    let engine = ctx.engine();
    debug_assert!(engine.running > 0, "preserve_selection outside of a command");
    engine.keep_selection = true;
}

fn run_builtin<C: CmdContext>(
    ctx: &mut C,
    registry: &CommandRegistry<C>,
    header: &Header<'_>,
    def: &CommandDef<C>,
) -> CmdResult {
    let layout = arg_layout(registry, header);
    let info = prepare(ctx, header, &layout, def)?;

    ctx.set_count(info.range.map(|r| r.end + 1));
    if let Some(range) = info.range {
        ctx.mark_range(range.begin, range.end);
    }

    ctx.engine().running += 1;
    let result = (def.handler)(&info, ctx);
    ctx.engine().running -= 1;
    result
}

/// Commands that are not built in: bare ranges and user commands.
fn run_other<C: CmdContext>(ctx: &mut C, header: &Header<'_>, input: CmdInputType) -> CmdResult {
    if header.name.is_empty() {
        if header.range.is_empty() || !header.rest.trim().is_empty() {
            return Err(DispatchError::IncorrectName);
        }
        let range = parse_range(header.range, ctx)?;
        ctx.goto_line(range.end);
        return Ok(Status::Silent);
    }
    if header.name.starts_with(|c: char| c.is_ascii_uppercase()) {
        return run_user_command(ctx, header, input);
    }
    Err(DispatchError::InvalidCmd)
}

fn report<C: CmdContext>(ctx: &mut C, err: DispatchError) -> CmdResult {
    if let Some(msg) = err.message() {
        ctx.post_error(&msg);
    }
    Err(err)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
