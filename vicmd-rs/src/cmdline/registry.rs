//! Table of built-in commands.
//!
//! Commands are declared with Vim's abbreviation notation: `"ec[ho]"`
//! accepts `ec`, `ech` and `echo`.  The table is generic over the context
//! type handed to handlers so the engine never depends on the application.

use std::fmt;
use std::ops::BitOr;

use super::context::CmdContext;
use super::error::CmdResult;
use super::parse::CmdInfo;
use super::scope::Control;
use super::{control, usercmd};

// ── CmdFlags ──────────────────────────────────────────────────────────────────

/// Properties of a command, stored as a bitmask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CmdFlags(u32);

impl CmdFlags {
    pub const NONE: Self = Self(0);
    /// Accepts a `!` after the name.
    pub const BANG: Self = Self(1 << 0);
    /// Accepts a lone `?` as its argument.
    pub const QMARK: Self = Self(1 << 1);
    /// Accepts a line range before the name.
    pub const RANGE: Self = Self(1 << 2);
    /// Some arguments are delimited like regular expressions.
    pub const REGEX: Self = Self(1 << 3);
    /// The first character after the name separates the fields.
    pub const CUSTOM_SEP: Self = Self(1 << 4);
    /// Arguments are split honoring quotes and backslashes.
    pub const QUOTE: Self = Self(1 << 5);
    /// `%c`, `%f`, `%d` macros are expanded in the arguments.
    pub const EXPAND_MACROS: Self = Self(1 << 6);
    /// `$VAR` references are expanded in the arguments.
    pub const EXPAND_ENVVARS: Self = Self(1 << 7);
    /// A trailing ` &` requests background execution.
    pub const BG: Self = Self(1 << 8);
    /// Arguments extend to the end of the line, `|` included.
    pub const UNTIL_THE_END: Self = Self(1 << 9);
    /// Arguments are expressions; `||` is an operator.
    pub const EXPR: Self = Self(1 << 10);

    #[inline]
    pub fn contains(self, other: CmdFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn insert(&mut self, other: CmdFlags) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for CmdFlags {
    type Output = CmdFlags;

    fn bitor(self, rhs: CmdFlags) -> CmdFlags {
        CmdFlags(self.0 | rhs.0)
    }
}

// ── CommandDef ────────────────────────────────────────────────────────────────

pub type Handler<C> = fn(&CmdInfo, &mut C) -> CmdResult;

/// Index of a command in its [`CommandRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId(usize);

pub struct CommandDef<C> {
    pub name: String,
    /// Shortest accepted prefix of `name`.
    pub abbr: &'static str,
    pub min_args: usize,
    /// `None`: unlimited.
    pub max_args: Option<usize>,
    pub flags: CmdFlags,
    /// Number of regex-delimited fields; negative when the last may be left
    /// open.
    pub regex_quotes: i32,
    pub control: Option<Control>,
    pub handler: Handler<C>,
}

impl<C> CommandDef<C> {
    /// Declare a command from `"abbr[rest]"` notation.
    pub fn new(notation: &'static str, handler: Handler<C>) -> Self {
        let (abbr, name) = match notation.split_once('[') {
            Some((head, tail)) => (head, format!("{head}{}", tail.trim_end_matches(']'))),
            None => (notation, notation.to_owned()),
        };
        CommandDef {
            name,
            abbr,
            min_args: 0,
            max_args: None,
            flags: CmdFlags::NONE,
            regex_quotes: 0,
            control: None,
            handler,
        }
    }

    pub fn args(mut self, min: usize, max: Option<usize>) -> Self {
        self.min_args = min;
        self.max_args = max;
        self
    }

    /// Adds to the flags already set.
    pub fn flags(mut self, flags: CmdFlags) -> Self {
        self.flags.insert(flags);
        self
    }

    pub fn regex_quotes(mut self, count: i32) -> Self {
        self.regex_quotes = count;
        self.flags.insert(CmdFlags::REGEX);
        self
    }

    pub fn control(mut self, role: Control) -> Self {
        self.control = Some(role);
        self
    }

    fn matches(&self, token: &str) -> bool {
        token.len() >= self.abbr.len() && self.name.starts_with(token)
    }
}

impl<C> Clone for CommandDef<C> {
    fn clone(&self) -> Self {
        CommandDef {
            name: self.name.clone(),
            abbr: self.abbr,
            min_args: self.min_args,
            max_args: self.max_args,
            flags: self.flags,
            regex_quotes: self.regex_quotes,
            control: self.control,
            handler: self.handler,
        }
    }
}

impl<C> fmt::Debug for CommandDef<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDef")
            .field("name", &self.name)
            .field("abbr", &self.abbr)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

// ── CommandRegistry ───────────────────────────────────────────────────────────

pub struct CommandRegistry<C> {
    defs: Vec<CommandDef<C>>,
}

impl<C> CommandRegistry<C> {
    /// An empty table.
    pub fn new() -> Self {
        CommandRegistry { defs: Vec::new() }
    }

    /// Add a command, replacing any previous one with the same name.
    pub fn add(&mut self, def: CommandDef<C>) {
        match self.defs.iter_mut().find(|d| d.name == def.name) {
            Some(slot) => *slot = def,
            None => self.defs.push(def),
        }
    }

    /// Resolve a typed name: exact names win over abbreviations.
    pub fn identify(&self, token: &str) -> Option<CommandId> {
        if token.is_empty() {
            return None;
        }
        self.defs
            .iter()
            .position(|d| d.name == token)
            .or_else(|| self.defs.iter().position(|d| d.matches(token)))
            .map(CommandId)
    }

    pub fn get(&self, id: CommandId) -> &CommandDef<C> {
        &self.defs[id.0]
    }

    pub fn lookup(&self, token: &str) -> Option<&CommandDef<C>> {
        self.identify(token).map(|id| self.get(id))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.defs.iter().map(|d| d.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

impl<C: CmdContext> CommandRegistry<C> {
    /// A table holding the commands every context gets: conditionals and
    /// user-defined command management.
    pub fn core() -> Self {
        let mut reg = Self::new();
        control::register(&mut reg);
        usercmd::register(&mut reg);
        reg
    }
}

impl<C> Default for CommandRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for CommandRegistry<C> {
    fn clone(&self) -> Self {
        CommandRegistry {
            defs: self.defs.clone(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
