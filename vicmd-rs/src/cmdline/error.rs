//! Dispatch outcomes and the user-facing error table.

use thiserror::Error;

/// Why a command did not run (or ran and failed).
///
/// Every variant except [`DispatchError::Custom`] maps to the single status
/// line shown to the user.  `Custom` means the handler already posted its
/// own message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Loop in commands")]
    Loop,
    #[error("Too few arguments")]
    TooFewArgs,
    #[error("Too many arguments")]
    TooManyArgs,
    #[error("Trailing characters")]
    TrailingChars,
    #[error("Incorrect command name")]
    IncorrectName,
    #[error("Invalid command name")]
    InvalidCmd,
    #[error("Add bang to force")]
    NeedBang,
    #[error("No ! is allowed")]
    NoBangAllowed,
    #[error("No range is allowed")]
    NoRangeAllowed,
    #[error("No ? is allowed")]
    NoQmarkAllowed,
    #[error("Invalid range")]
    InvalidRange,
    #[error("No such user defined command")]
    NoSuchUdf,
    #[error("Ambiguous use of user-defined command")]
    UdfIsAmbiguous,
    #[error("Invalid argument")]
    InvalidArg,
    #[error("Command failed")]
    Custom,
}

impl DispatchError {
    /// Negative result code, stable across releases.
    pub fn code(self) -> i32 {
        match self {
            DispatchError::Loop => -1,
            DispatchError::TooFewArgs => -2,
            DispatchError::TooManyArgs => -3,
            DispatchError::TrailingChars => -4,
            DispatchError::IncorrectName => -5,
            DispatchError::InvalidCmd => -6,
            DispatchError::NeedBang => -7,
            DispatchError::NoBangAllowed => -8,
            DispatchError::NoRangeAllowed => -9,
            DispatchError::NoQmarkAllowed => -10,
            DispatchError::InvalidRange => -11,
            DispatchError::NoSuchUdf => -12,
            DispatchError::UdfIsAmbiguous => -13,
            DispatchError::InvalidArg => -14,
            DispatchError::Custom => -15,
        }
    }

    /// Text for the status line, or `None` when the handler posted it.
    pub fn message(self) -> Option<String> {
        match self {
            DispatchError::Custom => None,
            other => Some(other.to_string()),
        }
    }

    /// Errors after which the line may be retried as a directory name.
    pub fn allows_implicit_cd(self) -> bool {
        matches!(
            self,
            DispatchError::InvalidCmd
                | DispatchError::IncorrectName
                | DispatchError::TrailingChars
                | DispatchError::NoSuchUdf
        )
    }
}

// ── Success ───────────────────────────────────────────────────────────────────

/// Successful outcome of one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Ran, nothing to report.
    Silent,
    /// Ran and posted a message that should stay on the status line.
    KeepMessage,
}

pub type CmdResult = Result<Status, DispatchError>;

/// Aggregate outcome of a whole command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStatus {
    Silent,
    KeepMessage,
    Failed,
}

impl LineStatus {
    /// `0`, `1` or `-1`, following the sign convention of single commands.
    pub fn code(self) -> i32 {
        match self {
            LineStatus::Silent => 0,
            LineStatus::KeepMessage => 1,
            LineStatus::Failed => -1,
        }
    }

    pub fn is_failure(self) -> bool {
        self == LineStatus::Failed
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
