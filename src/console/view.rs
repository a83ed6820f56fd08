use crate::debugger::Place;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Source-file viewer. Files are read once and kept as shared line
/// buffers; both the interactive context renderer and the localization
/// per-line printer draw from the same cache.
pub struct FileView {
    cache: RefCell<HashMap<PathBuf, Rc<Vec<String>>>>,
}

impl FileView {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            cache: RefCell::default(),
        }
    }

    fn lines_of(&self, file: &str) -> anyhow::Result<Rc<Vec<String>>> {
        if let Some(lines) = self.cache.borrow().get(Path::new(file)) {
            return Ok(lines.clone());
        }

        let text = fs::read_to_string(file)?;
        let lines = Rc::new(text.lines().map(str::to_string).collect::<Vec<_>>());
        self.cache
            .borrow_mut()
            .insert(PathBuf::from(file), lines.clone());
        Ok(lines)
    }

    /// The text of a single source line, 1-based ("" when out of bounds).
    pub fn line(&self, file: &str, line_number: u64) -> anyhow::Result<String> {
        let lines = self.lines_of(file)?;
        let pos = line_number.saturating_sub(1) as usize;
        Ok(lines.get(pos).cloned().unwrap_or_default())
    }

    /// Render the stop line with `context` numbered lines on both sides,
    /// the stop line marked with `>`.
    pub fn render_source(&self, place: &Place, context: u64) -> anyhow::Result<String> {
        let lines = self.lines_of(place.file)?;
        let current = place.line_number.max(1);
        let first = current.saturating_sub(context).max(1);

        let mut rendered = Vec::with_capacity(context as usize * 2 + 1);
        for number in first..=current + context {
            let Some(text) = lines.get(number as usize - 1) else {
                break;
            };
            let marker = if number == current { '>' } else { ' ' };
            rendered.push(format!("{marker}{number:4} {text}"));
        }
        Ok(rendered.join("\n"))
    }
}
