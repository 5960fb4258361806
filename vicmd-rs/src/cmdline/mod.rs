//! Command-line engine: splitting, classification, conditional scopes and
//! dispatch of `:` commands.
//!
//! | Module     | Role                                                    |
//! |------------|---------------------------------------------------------|
//! | `quoting`  | Quote/argument state at a cursor position               |
//! | `split`    | `|`-splitting of a line and command-kind classification |
//! | `parse`    | Range, name, bang and argument lexing                   |
//! | `registry` | Built-in command table                                  |
//! | `scope`    | `:if` / `:else` / `:endif` bookkeeping                  |
//! | `dispatch` | Running lines and single commands                       |
//! | `eval`     | Expression lists (`:echo 1 'a'`)                        |
//! | `control`  | The conditional commands themselves                     |
//! | `usercmd`  | `:command` / `:delcommand` and user command execution   |
//!
//! The engine is generic over a [`CmdContext`] supplied by the application.

pub mod context;
pub mod control;
pub mod dispatch;
pub mod error;
pub mod eval;
pub mod parse;
pub mod quoting;
pub mod registry;
pub mod scope;
pub mod split;
pub mod usercmd;

#[cfg(test)]
pub(crate) mod testing;

pub use context::{CmdContext, CmdInputType, EngineState};
pub use dispatch::{dispatch_line, dispatch_one, exec_commands, preserve_selection};
pub use error::{CmdResult, DispatchError, LineStatus, Status};
pub use parse::CmdInfo;
pub use quoting::{ClassifyCode, CmdLineLocation};
pub use registry::{CmdFlags, CommandDef, CommandRegistry};
pub use scope::{ScopeError, ScopeStack};
pub use split::{classify_args_kind, classify_position, split, CmdArgsType};
