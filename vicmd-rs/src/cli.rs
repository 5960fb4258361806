//! Command-line argument parsing.
//!
//! Usage:
//!   vicmd [-f[<file>]] [-c<cmd>]... [-nd] [<dir>] [<script>...]

use std::path::PathBuf;

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Default)]
pub struct CliArgs {
    /// Which rc file to run.
    pub config: ConfigFile,
    /// Commands to execute after the rc file, in order (`-c<cmd>`).
    pub commands: Vec<String>,
    /// Do not read commands from a non-terminal stdin (`-n`).
    pub no_stdin: bool,
    /// Debug logging (`-d`).
    pub debug: bool,
    /// Starting directory; the first positional argument naming a directory.
    pub dir: Option<PathBuf>,
    /// Script files sourced after `-c` commands.
    pub scripts: Vec<PathBuf>,
}

/// How to choose the rc file.
#[derive(Debug, Default)]
pub enum ConfigFile {
    /// `$VICMD_RC`, then the standard locations (default).
    #[default]
    Search,
    /// `-f` with no file argument: skip the rc file.
    Skip,
    /// `-f<file>`: load this specific file.
    Explicit(PathBuf),
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(raw.get(1..).unwrap_or_default())
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    let mut positional: Vec<String> = Vec::new();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();

        if arg == "--" {
            i += 1;
            positional.extend(argv[i..].iter().cloned());
            break;
        }

        if !arg.starts_with('-') || arg == "-" {
            positional.push(arg.to_owned());
            i += 1;
            continue;
        }

        let chars: Vec<char> = arg[1..].chars().collect();
        let mut j = 0;
        while j < chars.len() {
            match chars[j] {
                'd' => args.debug = true,
                'n' => args.no_stdin = true,

                // -f[<file>]
                'f' => {
                    if j + 1 < chars.len() {
                        let file: String = chars[j + 1..].iter().collect();
                        args.config = ConfigFile::Explicit(PathBuf::from(file));
                        j = chars.len();
                    } else if i + 1 < argv.len() && !argv[i + 1].starts_with('-') {
                        i += 1;
                        args.config = ConfigFile::Explicit(PathBuf::from(&argv[i]));
                    } else {
                        args.config = ConfigFile::Skip;
                    }
                }

                // -c<cmd>, repeatable
                'c' => {
                    let cmd = if j + 1 < chars.len() {
                        let s: String = chars[j + 1..].iter().collect();
                        j = chars.len();
                        s
                    } else if i + 1 < argv.len() {
                        i += 1;
                        argv[i].clone()
                    } else {
                        return Err("-c requires a command argument".to_owned());
                    };
                    args.commands.push(cmd);
                }

                c => return Err(format!("unknown option: -{c}")),
            }
            j += 1;
        }
        i += 1;
    }

    let mut positional = positional.into_iter().map(PathBuf::from).peekable();
    if let Some(first) = positional.next_if(|p| p.is_dir()) {
        args.dir = Some(first);
    }
    args.scripts = positional.collect();

    Ok(args)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
