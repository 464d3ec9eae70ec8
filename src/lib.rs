use std::{
    borrow::Cow,
    io::{BufWriter, Write},
    path::Path,
};

pub mod ass;
pub mod cli;
pub mod convert;
pub mod entry;
pub mod error;
pub mod sami;
pub mod srt;
pub(crate) mod utils;
pub mod vtt;

pub use convert::{convert, ConversionReport, ConvertOptions};
pub use entry::{Coordinates, EntryStore, ShiftMode, SubtitleEntry};
pub use error::{Error, ParseWarning, Record};

/// Loads a file into a string.
///
/// Invalid UTF-8 is replaced rather than rejected since older SAMI and SRT
/// files are frequently saved in a legacy code page.
pub(crate) fn load_file(path: &Path) -> Result<String, Error> {
    let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Strips the UTF-8 BOM and converts CRLF line endings to LF.
pub(crate) fn normalize(s: &str) -> Cow<'_, str> {
    let s = s.strip_prefix('\u{feff}').unwrap_or(s);
    if s.contains('\r') {
        Cow::Owned(s.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(s)
    }
}

/// The subtitle formats that can be read and written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubtitleFormat {
    Srt,
    Vtt,
    Sami,
    Ass,
}

impl SubtitleFormat {
    /// Picks the format from a file extension, ignoring case.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "srt" => Some(Self::Srt),
            "vtt" => Some(Self::Vtt),
            "smi" | "sami" => Some(Self::Sami),
            "ass" | "ssa" => Some(Self::Ass),
            _ => None,
        }
    }

    /// Picks the format from the extension of the given path.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        path.extension()
            .and_then(|s| s.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| Error::UnsupportedFormat(path.display().to_string()))
    }

    pub const fn name(&self) -> &'static str {
        match self {
            SubtitleFormat::Srt => "SRT",
            SubtitleFormat::Vtt => "WebVTT",
            SubtitleFormat::Sami => "SAMI",
            SubtitleFormat::Ass => "ASS",
        }
    }
}

impl std::fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The operations shared by every subtitle format.
///
/// Each format holds its own [`EntryStore`] alongside whatever
/// format specific data it needs to write the file back out.
pub trait Subtitle {
    fn format(&self) -> SubtitleFormat;

    fn entries(&self) -> &EntryStore;

    fn entries_mut(&mut self) -> &mut EntryStore;

    /// Records that were skipped while parsing.
    fn warnings(&self) -> &[ParseWarning] {
        &[]
    }

    /// Writes the subtitle in its own format.
    fn write_to(&self, writer: &mut dyn Write) -> std::io::Result<()>;

    /// Renders the subtitle into a string.
    fn render(&self) -> String {
        let mut buffer = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.write_to(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Creates (or truncates) the file at `path` and writes the subtitle into it.
    fn save(&self, path: &Path) -> Result<(), Error> {
        let file = std::fs::File::create(path).map_err(|e| Error::io(path, e))?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)
            .and_then(|_| writer.flush())
            .map_err(|e| Error::io(path, e))
    }

    /// Removes `<tag>` style markup from every entry.
    fn remove_formatting(&mut self) {
        for entry in self.entries_mut() {
            if let Cow::Owned(text) = utils::strip_html_tags(&entry.text) {
                entry.text = text;
            }
        }
    }

    /// Wraps every entry's text in `<tag>...</tag>`.
    fn add_default_style(&mut self, tag: &str) -> Result<(), Error> {
        for entry in self.entries_mut() {
            entry.text = utils::wrap_in_tag(&entry.text, tag);
        }
        Ok(())
    }

    fn shift_time(&mut self, delta_ms: i64, mode: ShiftMode) {
        for entry in self.entries_mut() {
            entry.shift_by(delta_ms, mode);
        }
    }
}
