use std::io::{self, BufRead};
use std::path::Path;
use std::process::{Command, ExitCode};

use crossterm::style::{style, Stylize};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use vicmd::cli::{self, ConfigFile};
use vicmd::config;
use vicmd::view::View;
use vicmd::{Action, Session};

fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("vicmd: {e}");
            eprintln!("Usage: vicmd [-f[<file>]] [-c<cmd>]... [-nd] [<dir>] [<script>...]");
            return ExitCode::FAILURE;
        }
    };

    setup_logging(args.debug);

    let dir = match args.dir.clone().map_or_else(std::env::current_dir, Ok) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("vicmd: can't determine the current directory: {e}");
            return ExitCode::FAILURE;
        }
    };
    let view = match View::open(&dir) {
        Ok(view) => view,
        Err(e) => {
            eprintln!("vicmd: can't read {}: {e}", dir.display());
            return ExitCode::FAILURE;
        }
    };

    let stdin_tty = unsafe { libc::isatty(libc::STDIN_FILENO) != 0 };
    let mut runner = Runner {
        session: Session::new(view),
        color: unsafe { libc::isatty(libc::STDERR_FILENO) != 0 },
        interactive: stdin_tty,
        failed: false,
        quit: false,
    };

    // ── Startup files ─────────────────────────────────────────────────────────
    match &args.config {
        ConfigFile::Skip => {}
        ConfigFile::Explicit(path) => runner.source(path),
        ConfigFile::Search => {
            if let Some(path) = config::find_rc() {
                runner.source(&path);
            }
        }
    }

    for cmd in &args.commands {
        if runner.quit {
            break;
        }
        runner.run_line(cmd);
    }
    for script in &args.scripts {
        if runner.quit {
            break;
        }
        runner.source(script);
    }

    // ── Commands from a pipe ──────────────────────────────────────────────────
    if !args.no_stdin && !stdin_tty {
        for line in io::stdin().lock().lines() {
            if runner.quit {
                break;
            }
            match line {
                Ok(line) => runner.run_line(&line),
                Err(e) => {
                    runner.error(&format!("can't read stdin: {e}"));
                    break;
                }
            }
        }
    }

    if runner.failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn setup_logging(debug: bool) {
    let level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

struct Runner {
    session: Session,
    color: bool,
    interactive: bool,
    failed: bool,
    quit: bool,
}

impl Runner {
    fn run_line(&mut self, line: &str) {
        debug!(line, "executing");
        if self.session.execute(line).is_failure() {
            self.failed = true;
        }
        self.flush();
    }

    fn source(&mut self, path: &Path) {
        let path = self.session.expand_path(&path.to_string_lossy());
        let result = self.session.source_file(&path);
        self.flush();
        if let Err(e) = result {
            self.error(&e.to_string());
        }
    }

    /// Print posted messages and carry out queued actions.
    fn flush(&mut self) {
        let messages: Vec<_> = self.session.status.drain_pending().collect();
        for msg in messages {
            if msg.is_error {
                self.error(&msg.text);
            } else {
                println!("{}", msg.text);
            }
        }
        self.session.status.clear();

        for action in self.session.take_actions() {
            match action {
                Action::Shell {
                    command,
                    background,
                    pause,
                } => self.shell(&command, background, pause),
                Action::Quit { force } => {
                    debug!(force, "quit requested");
                    self.quit = true;
                }
                Action::CloseMenu => debug!("no menu to close"),
            }
        }
    }

    fn shell(&mut self, command: &str, background: bool, pause: bool) {
        let shell = self.session.options.get_str("shell").unwrap_or("sh").to_owned();
        let mut cmd = Command::new(&shell);
        cmd.arg("-c").arg(command).current_dir(self.session.view.cwd());
        for (name, value) in self.session.env_overrides() {
            match value {
                Some(value) => cmd.env(name, value),
                None => cmd.env_remove(name),
            };
        }
        debug!(%shell, command, background, "running shell command");

        let result = if background {
            cmd.spawn().map(|_| ())
        } else {
            cmd.status().map(|status| {
                if !status.success() {
                    warn!(%status, command, "shell command failed");
                }
            })
        };
        if let Err(e) = result {
            self.error(&format!("can't run {shell}: {e}"));
            return;
        }

        if pause && !background && self.interactive {
            println!("Press ENTER to continue");
            let mut buf = String::new();
            if let Err(e) = io::stdin().read_line(&mut buf) {
                warn!(error = %e, "reading after shell command");
            }
        }
        if let Err(e) = self.session.view.reload() {
            warn!(error = %e, "reloading view");
        }
    }

    fn error(&mut self, msg: &str) {
        self.failed = true;
        if self.color {
            eprintln!("{}", style(msg).red());
        } else {
            eprintln!("{msg}");
        }
    }
}
