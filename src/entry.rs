//! The format independent subtitle model every adapter reads into and
//! writes from.

use crate::error::Error;

/// Screen position carried by some legacy SRT files (`X1:.. X2:.. Y1:.. Y2:..`).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coordinates {
    pub x1: i32,
    pub x2: i32,
    pub y1: i32,
    pub y2: i32,
}

/// A single timed piece of text.
///
/// Times are signed milliseconds so that shifting never has to clamp.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    pub start_ms: i64,
    pub end_ms: i64,
    pub text: String,
    /// Format specific formatting hint, e.g. the ASS style name.
    pub formatting: Option<String>,
    pub coordinates: Option<Coordinates>,
}

impl SubtitleEntry {
    pub fn new(start_ms: i64, end_ms: i64, text: impl Into<String>) -> Self {
        Self {
            start_ms,
            end_ms,
            text: text.into(),
            ..Default::default()
        }
    }

    /// Moves the entry by `delta_ms`, saturating at the limits of `i64`.
    pub fn shift_by(&mut self, delta_ms: i64, mode: ShiftMode) {
        if mode.shifts_start() {
            self.start_ms = self.start_ms.saturating_add(delta_ms);
        }
        if mode.shifts_end() {
            self.end_ms = self.end_ms.saturating_add(delta_ms);
        }
    }
}

/// Which end of an entry a time shift applies to.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ShiftMode {
    /// Shift both the start and the end
    #[default]
    #[value(name = "start-end")]
    StartEnd,
    /// Only shift the start
    #[value(name = "start")]
    StartOnly,
    /// Only shift the end
    #[value(name = "end")]
    EndOnly,
}

impl ShiftMode {
    pub const fn shifts_start(&self) -> bool {
        matches!(self, Self::StartEnd | Self::StartOnly)
    }

    pub const fn shifts_end(&self) -> bool {
        matches!(self, Self::StartEnd | Self::EndOnly)
    }
}

/// An insertion ordered list of entries.
///
/// Nothing about timing is enforced here, entries may overlap or be out of order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EntryStore {
    entries: Vec<SubtitleEntry>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: SubtitleEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&SubtitleEntry, Error> {
        let len = self.entries.len();
        self.entries
            .get(index)
            .ok_or(Error::IndexOutOfRange { index, len })
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut SubtitleEntry, Error> {
        let len = self.entries.len();
        self.entries
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange { index, len })
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SubtitleEntry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, SubtitleEntry> {
        self.entries.iter_mut()
    }
}

impl From<Vec<SubtitleEntry>> for EntryStore {
    fn from(entries: Vec<SubtitleEntry>) -> Self {
        Self { entries }
    }
}

impl FromIterator<SubtitleEntry> for EntryStore {
    fn from_iter<T: IntoIterator<Item = SubtitleEntry>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Extend<SubtitleEntry> for EntryStore {
    fn extend<T: IntoIterator<Item = SubtitleEntry>>(&mut self, iter: T) {
        self.entries.extend(iter)
    }
}

impl IntoIterator for EntryStore {
    type Item = SubtitleEntry;
    type IntoIter = std::vec::IntoIter<SubtitleEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a EntryStore {
    type Item = &'a SubtitleEntry;
    type IntoIter = std::slice::Iter<'a, SubtitleEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a mut EntryStore {
    type Item = &'a mut SubtitleEntry;
    type IntoIter = std::slice::IterMut<'a, SubtitleEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> EntryStore {
        [
            SubtitleEntry::new(1000, 3000, "one"),
            SubtitleEntry::new(4000, 6000, "two"),
            SubtitleEntry::new(500, 700, "out of order"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_indexing() {
        let mut entries = store();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries.get(2).unwrap().text, "out of order");
        entries.get_mut(0).unwrap().text.push('!');
        assert_eq!(entries.get(0).unwrap().text, "one!");

        match entries.get(3) {
            Err(Error::IndexOutOfRange { index, len }) => {
                assert_eq!(index, 3);
                assert_eq!(len, 3);
            }
            other => panic!("expected out of range, got {other:?}"),
        }

        entries.clear();
        assert!(entries.is_empty());
        assert!(entries.get_mut(0).is_err());
    }

    #[test]
    fn test_shift_is_additive() {
        let mut once = store();
        let mut twice = store();
        for entry in &mut once {
            entry.shift_by(-250, ShiftMode::StartEnd);
        }
        for entry in &mut twice {
            entry.shift_by(750, ShiftMode::StartEnd);
            entry.shift_by(-1000, ShiftMode::StartEnd);
        }
        assert_eq!(once, twice);
        // no clamping
        assert_eq!(once.get(2).unwrap().start_ms, 250);
        assert_eq!(twice.get(2).unwrap().end_ms, 450);
    }

    #[test]
    fn test_shift_modes_are_isolated() {
        let original = store();
        let mut starts = original.clone();
        let mut ends = original.clone();
        for entry in &mut starts {
            entry.shift_by(100, ShiftMode::StartOnly);
        }
        for entry in &mut ends {
            entry.shift_by(-100, ShiftMode::EndOnly);
        }

        for ((before, start), end) in original.iter().zip(&starts).zip(&ends) {
            assert_eq!(start.start_ms, before.start_ms + 100);
            assert_eq!(start.end_ms, before.end_ms);
            assert_eq!(end.start_ms, before.start_ms);
            assert_eq!(end.end_ms, before.end_ms - 100);
        }
    }

    #[test]
    fn test_shift_saturates() {
        let mut entry = SubtitleEntry::new(i64::MAX - 10, i64::MIN + 10, "edge");
        entry.shift_by(100, ShiftMode::StartOnly);
        assert_eq!(entry.start_ms, i64::MAX);
        entry.shift_by(-100, ShiftMode::EndOnly);
        assert_eq!(entry.end_ms, i64::MIN);
    }
}
