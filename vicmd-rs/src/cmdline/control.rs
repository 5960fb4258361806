//! `:if`, `:elseif`, `:else` and `:endif`.

use super::context::CmdContext;
use super::error::{CmdResult, DispatchError, Status};
use super::eval::eval_arg_list;
use super::parse::CmdInfo;
use super::registry::{CmdFlags, CommandDef, CommandRegistry};
use super::scope::{Control, ScopeError};
use crate::script::value::Value;

pub(crate) fn register<C: CmdContext>(reg: &mut CommandRegistry<C>) {
    reg.add(
        CommandDef::new("if", cmd_if)
            .args(1, None)
            .flags(CmdFlags::EXPR)
            .control(Control::If),
    );
    reg.add(
        CommandDef::new("elsei[f]", cmd_elseif)
            .args(1, None)
            .flags(CmdFlags::EXPR)
            .control(Control::ElseIf),
    );
    reg.add(
        CommandDef::new("el[se]", cmd_else)
            .args(0, Some(0))
            .control(Control::Else),
    );
    reg.add(
        CommandDef::new("en[dif]", cmd_endif)
            .args(0, Some(0))
            .control(Control::EndIf),
    );
}

/// Evaluate a condition.  Failures are posted and reported as `Custom`.
pub fn eval_condition<C: CmdContext>(ctx: &mut C, text: &str) -> Result<bool, DispatchError> {
    match eval_arg_list(text, |expr| ctx.eval(expr, true)) {
        Ok(result) => Ok(Value::Str(result).as_bool()),
        Err(err) => {
            ctx.post_error(&err.describe(text));
            Err(DispatchError::Custom)
        }
    }
}

fn scope_result<C: CmdContext>(ctx: &mut C, result: Result<(), ScopeError>) -> CmdResult {
    match result {
        Ok(()) => Ok(Status::Silent),
        Err(e) => {
            ctx.post_error(&e.to_string());
            Err(DispatchError::Custom)
        }
    }
}

fn cmd_if<C: CmdContext>(info: &CmdInfo, ctx: &mut C) -> CmdResult {
    let cond = eval_condition(ctx, &info.args);
    // A failed condition still opens a block so that its `endif` matches.
    ctx.engine().scope.enter_if(cond.unwrap_or(false));
    cond.map(|_| Status::Silent)
}

fn cmd_elseif<C: CmdContext>(info: &CmdInfo, ctx: &mut C) -> CmdResult {
    if !ctx.engine().scope.wants_condition() {
        let result = ctx.engine().scope.enter_elseif(false);
        return scope_result(ctx, result);
    }
    let cond = eval_condition(ctx, &info.args);
    let result = ctx.engine().scope.enter_elseif(cond.unwrap_or(false));
    cond?;
    scope_result(ctx, result)
}

fn cmd_else<C: CmdContext>(_info: &CmdInfo, ctx: &mut C) -> CmdResult {
    let result = ctx.engine().scope.enter_else();
    scope_result(ctx, result)
}

fn cmd_endif<C: CmdContext>(_info: &CmdInfo, ctx: &mut C) -> CmdResult {
    let result = ctx.engine().scope.leave_endif();
    scope_result(ctx, result)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
