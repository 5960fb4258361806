//! The file list a session operates on.
//!
//! Lines are zero-based indexes into `entries`.  The effective selection is
//! the temporarily marked range of a range command when there is one, the
//! explicit selection otherwise.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct View {
    cwd: PathBuf,
    entries: Vec<String>,
    cursor: usize,
    selected: BTreeSet<usize>,
    marked: Option<(usize, usize)>,
    stash: BTreeSet<usize>,
    marks: HashMap<char, usize>,
}

impl View {
    /// A view of `cwd` with the given entries; nothing is read from disk.
    pub fn with_entries(cwd: impl Into<PathBuf>, entries: Vec<String>) -> Self {
        View {
            cwd: cwd.into(),
            entries,
            ..Self::default()
        }
    }

    /// A view listing the contents of `cwd`.
    pub fn open(cwd: impl Into<PathBuf>) -> io::Result<Self> {
        let mut view = View::with_entries(cwd, Vec::new());
        view.reload()?;
        Ok(view)
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Change directory and list it.  The view is unchanged on error.
    pub fn chdir(&mut self, dir: &Path) -> io::Result<()> {
        let entries = list_dir(dir)?;
        self.cwd = dir.to_path_buf();
        self.entries = entries;
        self.cursor = 0;
        self.selected.clear();
        self.marked = None;
        self.stash.clear();
        self.marks.clear();
        Ok(())
    }

    pub fn reload(&mut self) -> io::Result<()> {
        self.entries = list_dir(&self.cwd)?;
        self.cursor = self.cursor.min(self.entries.len().saturating_sub(1));
        let len = self.entries.len();
        self.selected.retain(|&i| i < len);
        Ok(())
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_line(&self) -> Option<usize> {
        self.entries.len().checked_sub(1)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_cursor(&mut self, line: usize) {
        self.cursor = line.min(self.entries.len().saturating_sub(1));
    }

    pub fn current(&self) -> Option<&str> {
        self.entries.get(self.cursor).map(String::as_str)
    }

    /// Rename the file on `line`.  An existing target is not overwritten.
    pub fn rename(&mut self, line: usize, new_name: &str) -> io::Result<()> {
        let Some(old) = self.entries.get(line) else {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such line"));
        };
        let target = self.cwd.join(new_name);
        if target.symlink_metadata().is_ok() {
            return Err(io::Error::new(io::ErrorKind::AlreadyExists, "file exists"));
        }
        fs::rename(self.cwd.join(old), target)?;
        self.entries[line] = new_name.to_owned();
        Ok(())
    }

    // ── Selection ─────────────────────────────────────────────────────────────

    pub fn select(&mut self, line: usize) {
        if line < self.entries.len() {
            self.selected.insert(line);
        }
    }

    pub fn deselect(&mut self, line: usize) {
        self.selected.remove(&line);
    }

    pub fn toggle(&mut self, line: usize) {
        if !self.selected.remove(&line) {
            self.select(line);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, line: usize) -> bool {
        self.selected.contains(&line)
    }

    pub fn mark_range(&mut self, begin: usize, end: usize) {
        self.marked = Some((begin, end));
    }

    pub fn unmark_range(&mut self) {
        self.marked = None;
    }

    pub fn marked_range(&self) -> Option<(usize, usize)> {
        self.marked
    }

    /// Lines a command acts on, in view order.
    pub fn effective_selection(&self) -> Vec<usize> {
        match self.marked {
            Some((begin, end)) => (begin..=end).collect(),
            None => self.selected.iter().copied().collect(),
        }
    }

    pub fn selected_names(&self) -> Vec<String> {
        self.effective_selection()
            .into_iter()
            .filter_map(|i| self.entries.get(i).cloned())
            .collect()
    }

    /// Save the selection and drop it.  An empty selection leaves the
    /// previous stash alone.
    pub fn stash_selection(&mut self) {
        if !self.selected.is_empty() {
            self.stash = std::mem::take(&mut self.selected);
        }
    }

    pub fn restore_selection(&mut self) {
        self.selected = self.stash.clone();
    }

    // ── Marks ─────────────────────────────────────────────────────────────────

    pub fn set_mark(&mut self, mark: char, line: usize) {
        self.marks.insert(mark, line);
    }

    pub fn mark(&self, mark: char) -> Option<usize> {
        self.marks.get(&mark).copied().filter(|&l| l < self.entries.len())
    }
}

fn list_dir(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<io::Result<Vec<_>>>()?;
    names.sort();
    Ok(names)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
