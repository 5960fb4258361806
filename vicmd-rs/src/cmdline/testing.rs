//! A small [`CmdContext`] for unit tests of the engine.

use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use super::context::{CmdContext, CmdInputType, EngineState};
use super::dispatch::preserve_selection;
use super::error::{CmdResult, DispatchError, Status};
use super::eval::eval_arg_list;
use super::parse::CmdInfo;
use super::registry::{CmdFlags, CommandDef, CommandRegistry};
use crate::script::builtins::call_builtin;
use crate::script::expand;
use crate::script::expr::{evaluate, EvalContext, EvalOutcome};
use crate::script::value::Value;

pub(crate) struct MockCtx {
    pub engine: EngineState,
    pub registry: Rc<CommandRegistry<MockCtx>>,
    pub env: HashMap<String, String>,
    pub messages: Vec<String>,
    pub errors: Vec<String>,
    /// Handler invocations, as text.
    pub calls: Vec<String>,
    /// Invocations of the `side()` expression function.
    pub fn_calls: usize,
    pub lines: usize,
    pub cursor: usize,
    pub marked: Option<(usize, usize)>,
    pub stashed: usize,
    pub count: Option<usize>,
    pub autocd: bool,
    pub cwd: PathBuf,
}

impl MockCtx {
    pub fn new() -> Self {
        let mut reg = CommandRegistry::core();
        reg.add(CommandDef::new("builtin", cmd_builtin).flags(CmdFlags::BG));
        reg.add(CommandDef::new("let", cmd_let).args(1, None).flags(CmdFlags::EXPR));
        reg.add(CommandDef::new("ec[ho]", cmd_echo).flags(CmdFlags::EXPR));
        reg.add(CommandDef::new("cd", cmd_cd).args(0, Some(1)).flags(CmdFlags::QUOTE));
        reg.add(CommandDef::new("keep", cmd_keep).args(0, Some(0)).flags(CmdFlags::RANGE));
        reg.add(CommandDef::new("rng", cmd_rng).flags(CmdFlags::RANGE));
        reg.add(CommandDef::new("fail", cmd_fail));
        reg.add(CommandDef::new("msg", cmd_msg));
        MockCtx {
            engine: EngineState::default(),
            registry: Rc::new(reg),
            env: HashMap::new(),
            messages: Vec::new(),
            errors: Vec::new(),
            calls: Vec::new(),
            fn_calls: 0,
            lines: 10,
            cursor: 0,
            marked: None,
            stashed: 0,
            count: None,
            autocd: false,
            cwd: PathBuf::from("/"),
        }
    }
}

fn cmd_builtin(info: &CmdInfo, ctx: &mut MockCtx) -> CmdResult {
    ctx.calls.push(format!("builtin bg={}", info.bg));
    Ok(Status::Silent)
}

/// `let $name = expr`
fn cmd_let(info: &CmdInfo, ctx: &mut MockCtx) -> CmdResult {
    let Some((lhs, rhs)) = info.args.split_once('=') else {
        return Err(DispatchError::InvalidArg);
    };
    let name = lhs.trim().trim_start_matches('$').to_owned();
    let value = evaluate(rhs.trim(), false, ctx).value.ok_or(DispatchError::InvalidArg)?;
    ctx.env.insert(name, value.to_string());
    Ok(Status::Silent)
}

fn cmd_echo(info: &CmdInfo, ctx: &mut MockCtx) -> CmdResult {
    if info.args.is_empty() {
        ctx.post_message("");
        return Ok(Status::KeepMessage);
    }
    match eval_arg_list(&info.args, |text| ctx.eval(text, true)) {
        Ok(text) => {
            ctx.post_message(&text);
            Ok(Status::KeepMessage)
        }
        Err(err) => {
            ctx.post_error(&err.describe(&info.args));
            Err(DispatchError::Custom)
        }
    }
}

fn cmd_cd(info: &CmdInfo, ctx: &mut MockCtx) -> CmdResult {
    ctx.calls.push(format!("cd {}", info.arg(0).unwrap_or("~")));
    Ok(Status::Silent)
}

fn cmd_keep(_info: &CmdInfo, ctx: &mut MockCtx) -> CmdResult {
    preserve_selection(ctx);
    Ok(Status::Silent)
}

fn cmd_rng(info: &CmdInfo, ctx: &mut MockCtx) -> CmdResult {
    let range = info.range.map_or((0, 0), |r| (r.begin, r.end));
    ctx.calls.push(format!("rng {}-{} marked={:?}", range.0, range.1, ctx.marked));
    Ok(Status::Silent)
}

fn cmd_fail(_info: &CmdInfo, ctx: &mut MockCtx) -> CmdResult {
    ctx.post_error("boom");
    Err(DispatchError::Custom)
}

fn cmd_msg(_info: &CmdInfo, ctx: &mut MockCtx) -> CmdResult {
    ctx.post_message("hello");
    Ok(Status::KeepMessage)
}

impl EvalContext for MockCtx {
    fn get_env(&self, name: &str) -> Option<String> {
        self.env.get(name).cloned()
    }

    fn get_option(&self, name: &str) -> Option<Value> {
        (name == "autocd").then(|| Value::from(self.autocd))
    }

    fn get_var(&self, name: &str) -> Option<Value> {
        match name {
            "v:count" => Some(Value::Int(self.count.unwrap_or(0) as i64)),
            _ => None,
        }
    }

    fn call_fn(&mut self, name: &str, args: Vec<Value>) -> Result<Value, String> {
        if name == "side" {
            self.fn_calls += 1;
            return Ok(Value::Int(1));
        }
        call_builtin(name, &args).unwrap_or_else(|| Err(format!("Unknown function: {name}")))
    }
}

impl CmdContext for MockCtx {
    fn registry(&self, _input: CmdInputType) -> Rc<CommandRegistry<Self>> {
        Rc::clone(&self.registry)
    }

    fn engine(&mut self) -> &mut EngineState {
        &mut self.engine
    }

    fn post_message(&mut self, msg: &str) {
        self.messages.push(msg.to_owned());
    }

    fn post_error(&mut self, msg: &str) {
        self.errors.push(msg.to_owned());
    }

    fn eval(&mut self, text: &str, interactive: bool) -> EvalOutcome {
        evaluate(text, interactive, self)
    }

    fn expand_envvars(&mut self, args: &str) -> String {
        expand::expand_envvars(args, |name| self.env.get(name).cloned())
    }

    fn current_line(&self) -> usize {
        self.cursor
    }

    fn last_line(&self) -> Option<usize> {
        self.lines.checked_sub(1)
    }

    fn resolve_mark(&self, mark: char) -> Option<usize> {
        (mark == 'a').then_some(2)
    }

    fn goto_line(&mut self, line: usize) {
        self.cursor = line;
    }

    fn mark_range(&mut self, begin: usize, end: usize) {
        self.marked = Some((begin, end));
    }

    fn unmark_range(&mut self) {
        self.marked = None;
    }

    fn stash_selection(&mut self) {
        self.stashed += 1;
    }

    fn set_count(&mut self, count: Option<usize>) {
        self.count = count;
    }

    fn implicit_cd_enabled(&self) -> bool {
        self.autocd
    }

    fn resolve_dir(&self, path: &str) -> Option<PathBuf> {
        let dir = self.cwd.join(path);
        dir.is_dir().then_some(dir)
    }
}
