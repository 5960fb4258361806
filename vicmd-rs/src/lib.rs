//! Vim-like `:` command line for a terminal file manager.
//!
//! The [`cmdline`] engine splits, classifies and dispatches command lines
//! against a registry of commands and is generic over its host.  [`Session`]
//! is the host used by the `vicmd` binary: a directory [`view::View`],
//! options, mappings and the built-in [`commands`].
//!
//! ```rust
//! use vicmd::cmdline::LineStatus;
//! use vicmd::view::View;
//! use vicmd::Session;
//!
//! let view = View::with_entries("/", vec!["a.c".into(), "b.rs".into()]);
//! let mut session = Session::new(view);
//! assert_eq!(session.execute("select *.rs | echo 'ok'"), LineStatus::KeepMessage);
//! assert_eq!(session.view.selected_names(), ["b.rs"]);
//! ```

pub mod cli;
pub mod cmdline;
pub mod commands;
pub mod config;
pub mod keymap;
pub mod options;
pub mod pattern;
pub mod script;
pub mod session;
pub mod status;
pub mod view;

pub use session::{Action, Session};
