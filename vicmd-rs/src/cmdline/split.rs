//! Splitting one input line into `|`-separated commands.

use super::parse::{arg_layout, split_header};
use super::quoting::{classify, CmdLineLocation};
use super::registry::{CmdFlags, CommandRegistry};

/// How `|` is treated in a command's arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdArgsType {
    /// `|` ends the command unless quoted; `\|` is a literal bar.
    Regular,
    /// Like `Regular`, but `||` is an operator.
    Expr,
    /// The command takes the rest of the line.
    UntilTheEnd,
}

/// Kind of the command `command_text` starts with.
pub fn classify_args_kind<C>(registry: &CommandRegistry<C>, command_text: &str) -> CmdArgsType {
    let header = split_header(command_text);
    match registry.lookup(header.name).map(|def| def.flags) {
        Some(flags) if flags.contains(CmdFlags::UNTIL_THE_END) => CmdArgsType::UntilTheEnd,
        Some(flags) if flags.contains(CmdFlags::EXPR) => CmdArgsType::Expr,
        _ => CmdArgsType::Regular,
    }
}

/// Where byte offset `cursor` of `line` falls, for escaping inserted text.
pub fn classify_position<C>(registry: &CommandRegistry<C>, line: &str, cursor: usize) -> CmdLineLocation {
    let header = split_header(line);
    if cursor <= header.name_end {
        return CmdLineLocation::OutOfArgument;
    }
    let layout = arg_layout(registry, &header);
    if cursor < layout.start {
        return CmdLineLocation::OutOfArgument;
    }
    classify(
        &line[layout.start..],
        cursor - layout.start,
        layout.sep,
        layout.regex_quotes,
        layout.max_args,
    )
    .into()
}

/// Split `cmdline` into commands.
///
/// The result is never empty: an empty line yields one empty command.
/// Blanks before a separating `|` are dropped.
pub fn split<C>(cmdline: &str, registry: &CommandRegistry<C>) -> Vec<String> {
    let mut cmds = Vec::new();
    let mut processed = String::new();
    let mut kind = classify_args_kind(registry, cmdline);
    let mut chars = cmdline.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        if kind == CmdArgsType::UntilTheEnd {
            processed.push_str(&cmdline[pos..]);
            break;
        }

        if c == '\\' && kind == CmdArgsType::Regular {
            match chars.next() {
                Some((_, '|')) => processed.push('|'),
                Some((_, next)) => {
                    processed.push('\\');
                    processed.push(next);
                }
                None => processed.push('\\'),
            }
            continue;
        }

        if c == '|' && classify_position(registry, &processed, processed.len()).is_outside_quotes() {
            if kind == CmdArgsType::Expr && chars.next_if(|&(_, n)| n == '|').is_some() {
                processed.push_str("||");
                continue;
            }
            trim_unescaped_end(&mut processed);
            cmds.push(std::mem::take(&mut processed));
            let next = chars.peek().map_or(cmdline.len(), |&(p, _)| p);
            kind = classify_args_kind(registry, &cmdline[next..]);
            continue;
        }

        processed.push(c);
    }

    cmds.push(processed);
    cmds
}

fn trim_unescaped_end(cmd: &mut String) {
    while cmd.ends_with([' ', '\t']) {
        let body = &cmd[..cmd.len() - 1];
        if body.ends_with('\\') {
            break;
        }
        cmd.pop();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
