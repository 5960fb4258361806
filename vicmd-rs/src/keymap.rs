//! Normal-mode keys: built-in operations and user mappings.
//!
//! ## Key notation
//!
//! Mappings are written with Vim's angle-bracket notation and stored as
//! plain strings of characters.  [`key_sequence`] decodes the notation:
//!
//! | Notation        | Key           |
//! |-----------------|---------------|
//! | `<cr>`          | Enter (`\r`)  |
//! | `<space>`       | Space         |
//! | `<tab>`         | Tab           |
//! | `<esc>`         | Escape        |
//! | `<bs>`          | Backspace     |
//! | `<lt>`          | `<`           |
//! | `<bar>`         | `|`           |
//! | `<c-x>`         | Control-X     |
//!
//! Unknown `<...>` groups are kept literally.

use std::collections::BTreeMap;

// ── NormalOp ──────────────────────────────────────────────────────────────────

/// Built-in normal-mode operations reachable from `:normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NormalOp {
    Down,
    Up,
    Top,
    Bottom,
    ToggleSelection,
    /// Restore the selection stashed by an empty command line.
    RestoreSelection,
    /// Clear the selection.
    ClearSelection,
}

impl NormalOp {
    /// Keys the operation is bound to.
    pub fn keys(self) -> &'static str {
        match self {
            NormalOp::Down => "j",
            NormalOp::Up => "k",
            NormalOp::Top => "gg",
            NormalOp::Bottom => "G",
            NormalOp::ToggleSelection => "t",
            NormalOp::RestoreSelection => "gs",
            NormalOp::ClearSelection => "\x1b",
        }
    }

    pub const ALL: &'static [NormalOp] = &[
        NormalOp::Down,
        NormalOp::Up,
        NormalOp::Top,
        NormalOp::Bottom,
        NormalOp::ToggleSelection,
        NormalOp::RestoreSelection,
        NormalOp::ClearSelection,
    ];

    /// The operation whose keys start `input`.
    pub fn match_prefix(input: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| input.starts_with(op.keys()))
    }
}

// ── Keymap ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub rhs: String,
    /// The right-hand side is not itself subject to mappings.
    pub noremap: bool,
}

/// User mappings, keyed by decoded left-hand side.
#[derive(Debug, Default, Clone)]
pub struct Keymap {
    mappings: BTreeMap<String, Mapping>,
}

impl Keymap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `lhs` to `rhs`, both in key notation.  Replaces any previous
    /// mapping of `lhs`.
    pub fn map(&mut self, lhs: &str, rhs: &str, noremap: bool) {
        self.mappings.insert(
            key_sequence(lhs),
            Mapping {
                rhs: key_sequence(rhs),
                noremap,
            },
        );
    }

    /// Returns `false` when `lhs` was not mapped.
    pub fn unmap(&mut self, lhs: &str) -> bool {
        self.mappings.remove(&key_sequence(lhs)).is_some()
    }

    pub fn lookup(&self, keys: &str) -> Option<&Mapping> {
        self.mappings.get(keys)
    }

    /// The longest mapped left-hand side that `input` starts with.
    pub fn longest_prefix(&self, input: &str) -> Option<(&str, &Mapping)> {
        self.mappings
            .iter()
            .filter(|(lhs, _)| input.starts_with(lhs.as_str()))
            .max_by_key(|(lhs, _)| lhs.len())
            .map(|(lhs, m)| (lhs.as_str(), m))
    }

    /// Mappings in key notation, sorted by left-hand side.
    pub fn listing(&self) -> Vec<String> {
        self.mappings
            .iter()
            .map(|(lhs, m)| {
                let star = if m.noremap { "*" } else { " " };
                format!("{:<10} {star}{}", key_notation(lhs), key_notation(&m.rhs))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Decode key notation.
pub fn key_sequence(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(lt) = rest.find('<') {
        out.push_str(&rest[..lt]);
        let group = &rest[lt..];
        match group.find('>').and_then(|gt| decode_key(&group[1..gt]).map(|k| (gt, k))) {
            Some((gt, key)) => {
                out.push(key);
                rest = &group[gt + 1..];
            }
            None => {
                out.push('<');
                rest = &group[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_key(name: &str) -> Option<char> {
    let lower = name.to_ascii_lowercase();
    Some(match lower.as_str() {
        "cr" | "enter" | "return" => '\r',
        "space" => ' ',
        "tab" => '\t',
        "esc" => '\x1b',
        "bs" => '\x08',
        "lt" => '<',
        "bar" => '|',
        _ => {
            let c = lower.strip_prefix("c-")?;
            let mut chars = c.chars();
            match (chars.next(), chars.next()) {
                (Some(ch @ 'a'..='z'), None) => char::from(ch as u8 - b'a' + 1),
                _ => return None,
            }
        }
    })
}

/// Encode a decoded key string back into notation.
pub fn key_notation(keys: &str) -> String {
    let mut out = String::with_capacity(keys.len());
    for c in keys.chars() {
        match c {
            '\r' => out.push_str("<cr>"),
            ' ' => out.push_str("<space>"),
            '\t' => out.push_str("<tab>"),
            '\x1b' => out.push_str("<esc>"),
            '\x08' => out.push_str("<bs>"),
            '<' => out.push_str("<lt>"),
            c @ '\x01'..='\x1a' => {
                out.push_str("<c-");
                out.push(char::from(c as u8 - 1 + b'a'));
                out.push('>');
            }
            c => out.push(c),
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
