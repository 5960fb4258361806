//! Script files: locating the rc file and reading scripts into lines.
//!
//! | Syntax                          | Meaning                              |
//! |---------------------------------|--------------------------------------|
//! | `"` as first non-blank          | comment, ignored                     |
//! | `\` as first non-blank          | continues the previous line          |
//! | anything else                   | one command line                     |
//!
//! The rc file is the first of `$VICMD_RC`, `<config dir>/vicmd/vicmdrc`
//! and `~/.vicmdrc`.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Can't read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Error in {} on line(s) {}", path.display(), join_numbers(lines))]
    Script { path: PathBuf, lines: Vec<usize> },
}

fn join_numbers(lines: &[usize]) -> String {
    lines
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// One logical line of a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLine {
    /// 1-based number of the physical line it starts on.
    pub lineno: usize,
    pub text: String,
}

/// Read `path` and join it into logical lines.
pub fn read_script(path: &Path) -> Result<Vec<ScriptLine>, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(join_continuations(&text))
}

/// Join `\`-continued lines and drop comments and blank lines.
pub fn join_continuations(src: &str) -> Vec<ScriptLine> {
    let mut lines: Vec<ScriptLine> = Vec::new();
    for (i, raw) in src.lines().enumerate() {
        let line = raw.trim_start();
        if line.starts_with('"') {
            continue;
        }
        if let Some(rest) = line.strip_prefix('\\') {
            if let Some(prev) = lines.last_mut() {
                prev.text.push_str(rest);
                continue;
            }
        }
        if line.trim_end().is_empty() {
            continue;
        }
        lines.push(ScriptLine {
            lineno: i + 1,
            text: line.to_owned(),
        });
    }
    lines
}

/// The rc file to run at startup, if any.
pub fn find_rc() -> Option<PathBuf> {
    if let Some(path) = env::var_os("VICMD_RC").filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    let dirs = BaseDirs::new()?;
    [
        dirs.config_dir().join("vicmd").join("vicmdrc"),
        dirs.home_dir().join(".vicmdrc"),
    ]
    .into_iter()
    .find(|p| p.is_file())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
