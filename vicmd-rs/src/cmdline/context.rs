//! What the engine needs from the application embedding it.

use std::path::PathBuf;
use std::rc::Rc;

use super::registry::CommandRegistry;
use super::scope::ScopeStack;
use super::usercmd::UserCommands;
use crate::script::expr::EvalOutcome;

/// Which command table a line is dispatched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdInputType {
    /// The main `:` command line and scripts.
    Command,
    /// The command line of a menu.
    Menu,
}

/// Default limit for nested user commands and sourced files.
pub const MAX_DEPTH: usize = 100;

/// Engine-owned state threaded through every dispatch.
#[derive(Debug)]
pub struct EngineState {
    pub scope: ScopeStack,
    pub user_commands: UserCommands,
    pub max_depth: usize,
    pub(crate) depth: usize,
    pub(crate) keep_selection: bool,
    pub(crate) running: usize,
}

impl Default for EngineState {
    fn default() -> Self {
        EngineState {
            scope: ScopeStack::new(),
            user_commands: UserCommands::default(),
            max_depth: MAX_DEPTH,
            depth: 0,
            keep_selection: false,
            running: 0,
        }
    }
}

impl EngineState {
    /// Current nesting of user commands and sourced files.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Hooks the dispatcher calls into.  Methods with defaults are optional.
pub trait CmdContext: Sized {
    fn registry(&self, input: CmdInputType) -> Rc<CommandRegistry<Self>>;
    fn engine(&mut self) -> &mut EngineState;

    fn post_message(&mut self, msg: &str);
    fn post_error(&mut self, msg: &str);

    /// Evaluate the longest expression prefix of `text`.
    fn eval(&mut self, text: &str, interactive: bool) -> EvalOutcome;

    fn expand_macros(&mut self, args: &str) -> String {
        args.to_owned()
    }

    fn expand_envvars(&mut self, args: &str) -> String {
        args.to_owned()
    }

    /// Zero-based cursor line.
    fn current_line(&self) -> usize;
    /// Zero-based index of the last line, `None` when the view is empty.
    fn last_line(&self) -> Option<usize>;
    fn resolve_mark(&self, mark: char) -> Option<usize>;
    fn goto_line(&mut self, line: usize);

    /// Temporarily select `begin..=end` for a range command.
    fn mark_range(&mut self, begin: usize, end: usize);
    fn unmark_range(&mut self);
    /// Save and drop the selection (an empty command line was run).
    fn stash_selection(&mut self);

    /// `v:count`: `Some(n)` when the command had a range ending on line `n`
    /// (1-based).
    fn set_count(&mut self, count: Option<usize>);

    fn implicit_cd_enabled(&self) -> bool {
        false
    }

    /// Directory named by `path` relative to the current one, if it exists.
    fn resolve_dir(&self, _path: &str) -> Option<PathBuf> {
        None
    }
}
