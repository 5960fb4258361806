//! One running instance of the command line: the engine state plus the
//! application objects commands act on.
//!
//! [`Session`] is the [`CmdContext`] handed to every handler.  Side effects
//! the embedding program has to carry out (running shell commands,
//! quitting) are queued as [`Action`]s and collected with
//! [`Session::take_actions`].

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use directories::BaseDirs;
use tracing::debug;

use crate::cmdline::context::{CmdContext, CmdInputType, EngineState};
use crate::cmdline::dispatch::{dispatch_line, exec_commands};
use crate::cmdline::error::{DispatchError, LineStatus};
use crate::cmdline::registry::CommandRegistry;
use crate::commands;
use crate::config::{self, ConfigError, ScriptLine};
use crate::keymap::{Keymap, NormalOp};
use crate::options::Options;
use crate::script::builtins::call_builtin;
use crate::script::expand::{self, MacroSource};
use crate::script::expr::{evaluate, EvalContext, EvalOutcome};
use crate::script::value::Value;
use crate::status::StatusBar;
use crate::view::View;

/// A function made available to expressions by the embedding program.
pub type ScriptFn = Box<dyn FnMut(&[Value]) -> Result<Value, String>>;

/// Work queued for the embedding program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Shell {
        command: String,
        background: bool,
        /// Wait for a key press after the command (`:!!cmd`).
        pause: bool,
    },
    Quit {
        force: bool,
    },
    CloseMenu,
}

/// Arguments remembered for commands that repeat their last invocation.
#[derive(Debug, Default, Clone)]
pub(crate) struct LastArgs {
    pub select: Option<String>,
    pub sub_pattern: Option<String>,
    pub sub_replacement: String,
    pub sub_flags: String,
}

pub struct Session {
    engine: EngineState,
    registry: Rc<CommandRegistry<Session>>,
    menu_registry: Rc<CommandRegistry<Session>>,
    pub options: Options,
    pub view: View,
    pub status: StatusBar,
    pub keymap: Keymap,
    /// Environment changes made by `:let`/`:unlet`; `None` hides a variable.
    env: HashMap<String, Option<String>>,
    globals: HashMap<String, Value>,
    count: Option<usize>,
    functions: HashMap<String, ScriptFn>,
    pub(crate) last: LastArgs,
    pub(crate) prev_dir: Option<PathBuf>,
    actions: Vec<Action>,
    /// Number of scripts being sourced.
    pub(crate) sourcing: usize,
    /// `:finish` was run in the innermost script.
    pub(crate) finished: bool,
}

impl Session {
    pub fn new(view: View) -> Self {
        Session {
            engine: EngineState::default(),
            registry: Rc::new(commands::registry()),
            menu_registry: Rc::new(commands::menu_registry()),
            options: Options::new(),
            view,
            status: StatusBar::new(),
            keymap: Keymap::new(),
            env: HashMap::new(),
            globals: HashMap::new(),
            count: None,
            functions: HashMap::new(),
            last: LastArgs::default(),
            prev_dir: None,
            actions: Vec::new(),
            sourcing: 0,
            finished: false,
        }
    }

    /// Run a command line typed by the user.
    pub fn execute(&mut self, line: &str) -> LineStatus {
        exec_commands(self, line, CmdInputType::Command)
    }

    /// Run a command line typed in a menu.
    pub fn execute_menu(&mut self, line: &str) -> LineStatus {
        exec_commands(self, line, CmdInputType::Menu)
    }

    pub fn engine_state(&self) -> &EngineState {
        &self.engine
    }

    /// Drain the queued [`Action`]s.
    pub fn take_actions(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.actions)
    }

    pub(crate) fn push_action(&mut self, action: Action) {
        self.actions.push(action);
    }

    /// Make `name(...)` callable from expressions.
    pub fn register_function(
        &mut self,
        name: impl Into<String>,
        f: impl FnMut(&[Value]) -> Result<Value, String> + 'static,
    ) {
        self.functions.insert(name.into(), Box::new(f));
    }

    // ── Variables ─────────────────────────────────────────────────────────────

    pub fn set_env(&mut self, name: &str, value: &str) {
        self.env.insert(name.to_owned(), Some(value.to_owned()));
    }

    /// Returns `false` when the variable was not set.
    pub fn unset_env(&mut self, name: &str) -> bool {
        let was_set = self.get_env(name).is_some();
        self.env.insert(name.to_owned(), None);
        was_set
    }

    /// Variables changed by commands: `Some` to set, `None` to remove.
    pub fn env_overrides(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.env.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn set_global(&mut self, name: &str, value: Value) {
        self.globals.insert(name.to_owned(), value);
    }

    pub fn unset_global(&mut self, name: &str) -> bool {
        self.globals.remove(name).is_some()
    }

    // ── Paths ─────────────────────────────────────────────────────────────────

    fn home_dir(&self) -> Option<PathBuf> {
        self.get_env("HOME")
            .filter(|h| !h.is_empty())
            .map(PathBuf::from)
            .or_else(|| BaseDirs::new().map(|d| d.home_dir().to_path_buf()))
    }

    /// Resolve a path typed by the user: `~` is the home directory and
    /// relative paths are taken from the view's directory.
    pub fn expand_path(&self, path: &str) -> PathBuf {
        let path = match path.strip_prefix('~') {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => match self.home_dir() {
                Some(home) => home.join(rest.trim_start_matches('/')),
                None => PathBuf::from(path),
            },
            _ => PathBuf::from(path),
        };
        if path.is_absolute() {
            path
        } else {
            self.view.cwd().join(path)
        }
    }

    /// Change the view's directory and remember the previous one.
    pub fn change_dir(&mut self, dir: &Path) -> std::io::Result<()> {
        let old = self.view.cwd().to_path_buf();
        self.view.chdir(dir)?;
        debug!(from = %old.display(), to = %dir.display(), "chdir");
        self.prev_dir = Some(old);
        Ok(())
    }

    /// Lines the current command acts on: the marked range or the
    /// selection, else the cursor line.
    pub fn target_lines(&self) -> Vec<usize> {
        let lines = self.view.effective_selection();
        if lines.is_empty() && !self.view.is_empty() {
            vec![self.view.cursor()]
        } else {
            lines
        }
    }

    // ── Scripts ───────────────────────────────────────────────────────────────

    /// Run every line of the script at `path`.
    pub fn source_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let lines = config::read_script(path)?;
        self.run_script(path, &lines)
    }

    /// Run `text` as if it were the contents of a script named `name`.
    pub fn source_str(&mut self, name: &Path, text: &str) -> Result<(), ConfigError> {
        self.run_script(name, &config::join_continuations(text))
    }

    /// All lines share one scope.  Failing lines are reported and skipped;
    /// `:finish` ends the script.
    fn run_script(&mut self, path: &Path, lines: &[ScriptLine]) -> Result<(), ConfigError> {
        debug!(path = %path.display(), lines = lines.len(), "sourcing");
        let outer_finished = std::mem::replace(&mut self.finished, false);
        self.sourcing += 1;
        self.engine.depth += 1;
        self.engine.scope.scope_start();

        let mut failed = Vec::new();
        for line in lines {
            let status = dispatch_line(self, &line.text, CmdInputType::Command);
            if self.finished {
                self.engine.scope.scope_escape();
                break;
            }
            if status.is_failure() {
                failed.push(line.lineno);
            }
        }

        let scope = self.engine.scope.scope_finish();
        self.engine.depth -= 1;
        self.sourcing -= 1;
        self.finished = outer_finished;

        if let Err(e) = scope {
            self.post_error(&e.to_string());
            failed.extend(lines.last().map(|l| l.lineno));
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Script {
                path: path.to_path_buf(),
                lines: failed,
            })
        }
    }

    // ── Normal mode ───────────────────────────────────────────────────────────

    /// Run `keys` as normal-mode input in a scope of its own.  With `remap`
    /// unset user mappings are ignored.
    pub fn normal(&mut self, keys: &str, remap: bool) -> Result<(), DispatchError> {
        self.engine.scope.scope_start();
        let result = self.feed_keys(keys, remap);
        let scope = self.engine.scope.scope_finish();
        result?;
        scope.map_err(|e| {
            self.post_error(&e.to_string());
            DispatchError::Custom
        })
    }

    fn feed_keys(&mut self, keys: &str, remap: bool) -> Result<(), DispatchError> {
        let mut rest = keys;
        while !rest.is_empty() {
            if remap {
                let mapped = self
                    .keymap
                    .longest_prefix(rest)
                    .map(|(lhs, m)| (lhs.len(), m.rhs.clone(), m.noremap));
                if let Some((len, rhs, noremap)) = mapped {
                    if self.engine.depth >= self.engine.max_depth {
                        return Err(DispatchError::Loop);
                    }
                    self.engine.depth += 1;
                    let result = self.feed_keys(&rhs, !noremap);
                    self.engine.depth -= 1;
                    result?;
                    rest = &rest[len..];
                    continue;
                }
            }

            if let Some(cmd) = rest.strip_prefix(':') {
                // A command line without <cr> is abandoned.
                let Some(end) = cmd.find(['\r', '\n']) else {
                    break;
                };
                if dispatch_line(self, &cmd[..end], CmdInputType::Command).is_failure() {
                    return Err(DispatchError::Custom);
                }
                rest = &cmd[end + 1..];
                continue;
            }

            match NormalOp::match_prefix(rest) {
                Some(op) => {
                    self.apply_op(op);
                    rest = &rest[op.keys().len()..];
                }
                None => {
                    let skip = rest.chars().next().map_or(1, char::len_utf8);
                    rest = &rest[skip..];
                }
            }
        }
        Ok(())
    }

    fn apply_op(&mut self, op: NormalOp) {
        let cursor = self.view.cursor();
        match op {
            NormalOp::Down => self.view.set_cursor(cursor + 1),
            NormalOp::Up => self.view.set_cursor(cursor.saturating_sub(1)),
            NormalOp::Top => self.view.set_cursor(0),
            NormalOp::Bottom => self.view.set_cursor(self.view.last_line().unwrap_or(0)),
            NormalOp::ToggleSelection => {
                self.view.toggle(cursor);
                self.view.set_cursor(cursor + 1);
            }
            NormalOp::RestoreSelection => self.view.restore_selection(),
            NormalOp::ClearSelection => self.view.clear_selection(),
        }
    }
}

// ── Expression context ────────────────────────────────────────────────────────

impl EvalContext for Session {
    fn get_env(&self, name: &str) -> Option<String> {
        match self.env.get(name) {
            Some(value) => value.clone(),
            None => env::var(name).ok(),
        }
    }

    fn get_option(&self, name: &str) -> Option<Value> {
        self.options.get(name).map(|v| v.to_value())
    }

    fn get_var(&self, name: &str) -> Option<Value> {
        match name {
            "v:count" => Some(Value::Int(self.count.unwrap_or(0) as i64)),
            "v:count1" => Some(Value::Int(self.count.unwrap_or(1).max(1) as i64)),
            _ => self.globals.get(name.strip_prefix("g:")?).cloned(),
        }
    }

    fn call_fn(&mut self, name: &str, args: Vec<Value>) -> Result<Value, String> {
        if name == "expand" {
            let text = args
                .first()
                .map(Value::as_str)
                .ok_or_else(|| "expand: argument 1 missing".to_owned())?;
            let text = expand::expand_macros(&text, &*self);
            return Ok(Value::Str(CmdContext::expand_envvars(self, &text)));
        }
        if let Some(f) = self.functions.get_mut(name) {
            return f(args.as_slice());
        }
        call_builtin(name, &args).unwrap_or_else(|| Err(format!("Unknown function: {name}")))
    }
}

impl MacroSource for Session {
    fn current_file(&self) -> Option<String> {
        self.view.current().map(str::to_owned)
    }

    fn selected_files(&self) -> Vec<String> {
        self.view.selected_names()
    }

    fn current_dir(&self) -> String {
        self.view.cwd().to_string_lossy().into_owned()
    }
}

// ── Command context ───────────────────────────────────────────────────────────

impl CmdContext for Session {
    fn registry(&self, input: CmdInputType) -> Rc<CommandRegistry<Self>> {
        match input {
            CmdInputType::Command => Rc::clone(&self.registry),
            CmdInputType::Menu => Rc::clone(&self.menu_registry),
        }
    }

    fn engine(&mut self) -> &mut EngineState {
        &mut self.engine
    }

    fn post_message(&mut self, msg: &str) {
        self.status.post(msg, false);
    }

    fn post_error(&mut self, msg: &str) {
        self.status.post(msg, true);
    }

    fn eval(&mut self, text: &str, interactive: bool) -> EvalOutcome {
        evaluate(text, interactive, self)
    }

    fn expand_macros(&mut self, args: &str) -> String {
        expand::expand_macros(args, &*self)
    }

    fn expand_envvars(&mut self, args: &str) -> String {
        expand::expand_envvars(args, |name| self.get_env(name))
    }

    fn current_line(&self) -> usize {
        self.view.cursor()
    }

    fn last_line(&self) -> Option<usize> {
        self.view.last_line()
    }

    fn resolve_mark(&self, mark: char) -> Option<usize> {
        self.view.mark(mark)
    }

    fn goto_line(&mut self, line: usize) {
        self.view.set_cursor(line);
    }

    fn mark_range(&mut self, begin: usize, end: usize) {
        self.view.mark_range(begin, end);
    }

    fn unmark_range(&mut self) {
        self.view.unmark_range();
    }

    fn stash_selection(&mut self) {
        self.view.stash_selection();
    }

    fn set_count(&mut self, count: Option<usize>) {
        self.count = count;
    }

    fn implicit_cd_enabled(&self) -> bool {
        self.options.get_bool("autocd")
    }

    fn resolve_dir(&self, path: &str) -> Option<PathBuf> {
        let dir = self.expand_path(path);
        dir.is_dir().then_some(dir)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
