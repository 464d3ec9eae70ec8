use regex::Regex;

use crate::{
    entry::{EntryStore, SubtitleEntry},
    error::Error,
    utils::{cue_lines, parse_timestamp, Clock, LineCursor},
    Subtitle, SubtitleFormat,
};
use std::{fmt::Display, io::Write, path::Path, sync::OnceLock};

/// The inline tags WebVTT allows without a class or annotation.
pub const ALLOWED_STYLE_TAGS: [&str; 4] = ["b", "i", "u", "c"];

fn cue_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r#"(?x)
        ^\s*
        (?P<start>(?:\d+:)?\d{1,2}:\d{2}[\.,]\d{1,3})
        \s*-->\s*
        (?P<end>(?:\d+:)?\d{1,2}:\d{2}[\.,]\d{1,3})
        (?:\s.*)?$"#,
        )
        .unwrap()
    })
}

/// A `NOTE` comment block.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VttNote {
    pub content: String,
}

/// Displays milliseconds as `H:MM:SS.mmm`
struct VttTime(i64);

impl Display for VttTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let clock = Clock::from_ms(self.0);
        write!(
            f,
            "{}:{:02}:{:02}.{:03}",
            clock.hours, clock.minutes, clock.seconds, clock.millis
        )
    }
}

/// A WebVTT (.vtt) subtitle file.
#[derive(Debug, Default, Clone)]
pub struct Vtt {
    entries: EntryStore,
    pub notes: Vec<VttNote>,
}

/// Collects the lines up until the next blank line or the end of the file.
fn take_block(cursor: &mut LineCursor<'_>, output: &mut String) {
    while let Some(line) = cursor.peek() {
        if line.trim().is_empty() {
            break;
        }
        cursor.next();
        if !output.is_empty() {
            output.push('\n');
        }
        output.push_str(line);
    }
}

impl Vtt {
    pub fn new(entries: EntryStore) -> Self {
        Self {
            entries,
            notes: Vec::new(),
        }
    }

    /// Reads a WebVTT file.
    ///
    /// `NOTE` blocks are only kept if `keep_notes` is set.
    pub fn open(path: &Path, keep_notes: bool) -> Result<Self, Error> {
        let buffer = crate::load_file(path)?;
        Self::parse(&buffer, keep_notes)
    }

    pub fn parse(s: &str, keep_notes: bool) -> Result<Self, Error> {
        let buffer = crate::normalize(s);
        let mut cursor = LineCursor::new(&buffer);
        match cursor.next() {
            Some(header) if header.trim_end() == "WEBVTT" => {}
            _ => return Err(Error::invalid(1, "invalid vtt file (missing WEBVTT header)")),
        }

        let mut vtt = Vtt::default();
        while let Some(line) = cursor.next() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(rest) = line.strip_prefix("NOTE") {
                let mut note = VttNote {
                    content: rest.trim_start().to_owned(),
                };
                take_block(&mut cursor, &mut note.content);
                if keep_notes {
                    vtt.notes.push(note);
                }
                continue;
            }

            if line.starts_with("STYLE") || line.starts_with("REGION") {
                let mut ignored = String::new();
                take_block(&mut cursor, &mut ignored);
                continue;
            }

            // Anything else without a timing line is a cue identifier
            if !line.contains("-->") {
                continue;
            }

            let number = cursor.line_number();
            let cue = cue_regex()
                .captures(line)
                .ok_or_else(|| Error::invalid(number, format!("invalid cue timing `{line}`")))?;
            let (Some(start_ms), Some(end_ms)) =
                (parse_timestamp(&cue["start"]), parse_timestamp(&cue["end"]))
            else {
                return Err(Error::invalid(number, format!("invalid cue timing `{line}`")));
            };

            let mut entry = SubtitleEntry::new(start_ms, end_ms, String::new());
            take_block(&mut cursor, &mut entry.text);
            vtt.entries.push(entry);
        }

        Ok(vtt)
    }
}

impl Subtitle for Vtt {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::Vtt
    }

    fn entries(&self) -> &EntryStore {
        &self.entries
    }

    fn entries_mut(&mut self) -> &mut EntryStore {
        &mut self.entries
    }

    fn write_to(&self, writer: &mut dyn Write) -> std::io::Result<()> {
        writer.write_all(b"WEBVTT\n\n")?;
        for note in &self.notes {
            writeln!(writer, "NOTE {}\n", note.content)?;
        }
        for entry in &self.entries {
            writeln!(
                writer,
                "{} --> {}",
                VttTime(entry.start_ms),
                VttTime(entry.end_ms)
            )?;
            for line in cue_lines(&entry.text) {
                writeln!(writer, "{line}")?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }

    /// Only the plain WebVTT tags are accepted, anything else would
    /// produce a file players reject.
    fn add_default_style(&mut self, tag: &str) -> Result<(), Error> {
        if !ALLOWED_STYLE_TAGS.contains(&tag) {
            return Err(Error::UnsupportedStyleTag(tag.to_owned()));
        }
        for entry in &mut self.entries {
            entry.text = crate::utils::wrap_in_tag(&entry.text, tag);
        }
        Ok(())
    }
}
