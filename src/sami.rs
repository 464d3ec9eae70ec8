//! SAMI (.smi) support.
//!
//! SAMI is an HTML-like format where every `<SYNC>` marks the point a caption
//! becomes visible. A caption stays up until the next sync point replaces it,
//! so the end of an entry is inferred from the sync that follows it unless the
//! sync carries an explicit `End=` attribute.
//!
//! Written files always carry an explicit `End=` for every entry, which means
//! a read/write cycle does not reproduce the original open-ended markup.

use std::{io::Write, ops::Range, path::Path, str::FromStr, sync::OnceLock};

use regex::Regex;

use crate::{
    entry::{EntryStore, SubtitleEntry},
    error::{Error, ParseWarning, Record},
    Subtitle, SubtitleFormat,
};

const HEADER: &str = r#"<SAMI>
<HEAD>
<TITLE>file</TITLE>
<SAMIParam>
  Metrics {time:ms;}
  Spec {MSFT:1.0;}
</SAMIParam>
<STYLE TYPE="text/css">
<!--
  P { font-family: Arial; font-weight: normal; color: white; background-color: black; text-align: center; }
  .ENUSCC { name: English; lang: en-US ; SAMIType: CC ; }
-->
</STYLE>
</HEAD>
<BODY>
"#;

const FOOTER: &str = "</BODY>\n</SAMI>\n";

fn sync_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r#"(?i)<SYNC\b([^>]*)>"#).unwrap())
}

fn attribute_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r#"(?i)\b(start|end)\s*=\s*["']?([^\s"'>]*)"#).unwrap())
}

/// Sections whose content is never caption text.
fn skipped_section_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r#"(?isx)
            <HEAD\b[^>]*>.*?</HEAD\s*>
            | <STYLE\b[^>]*>.*?</STYLE\s*>
            | <TITLE\b[^>]*>.*?</TITLE\s*>
            | <SAMIParam\b[^>]*>.*?</SAMIParam\s*>"#,
        )
        .unwrap()
    })
}

fn body_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r#"(?i)<BODY\b[^>]*>"#).unwrap())
}

fn body_end_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r#"(?i)</BODY\s*>"#).unwrap())
}

fn paragraph_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r#"(?i)<P\b[^>]*>"#).unwrap())
}

fn paragraph_end_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r#"(?i)</P\s*>"#).unwrap())
}

fn closing_tag_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r#"(?i)</(?:SYNC|P|BODY|SAMI)\s*>"#).unwrap())
}

fn line_break_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r#"(?i)<br\s*/?>"#).unwrap())
}

/// A parsed `<SYNC>` point.
#[derive(Debug)]
struct SyncPoint {
    start: i64,
    end: Option<i64>,
    /// `None` for blank captions that only clear the screen
    text: Option<String>,
}

/// Turns the raw markup following a `<P>` into entry text.
///
/// Raw line breaks are plain whitespace in SAMI, only `<br>` is a line break.
fn clean_caption(raw: &str) -> Option<String> {
    let raw = closing_tag_regex().replace_all(raw, "");
    let joined = raw
        .lines()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let text = line_break_regex()
        .replace_all(&joined, "\n")
        .split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");
    let text = text.trim();
    if text.replace("&nbsp;", " ").trim().is_empty() {
        None
    } else {
        Some(text.to_owned())
    }
}

/// Finds the caption text between a sync tag and the next one.
fn caption_text(segment: &str) -> Option<String> {
    let raw = match paragraph_regex().find(segment) {
        Some(p) => {
            let rest = &segment[p.end()..];
            match paragraph_end_regex().find(rest) {
                Some(end) => &rest[..end.start()],
                None => rest,
            }
        }
        None => segment,
    };
    clean_caption(raw)
}

/// A SAMI (.smi) subtitle file.
#[derive(Debug, Default, Clone)]
pub struct Sami {
    entries: EntryStore,
    warnings: Vec<ParseWarning>,
}

impl Sami {
    pub fn new(entries: EntryStore) -> Self {
        Self {
            entries,
            warnings: Vec::new(),
        }
    }

    pub fn open(path: &Path) -> Result<Self, Error> {
        let buffer = crate::load_file(path)?;
        buffer.parse()
    }

    /// Parses the `Start=` and `End=` attributes of a sync tag.
    fn parse_attributes(&mut self, attributes: &str, line: usize) -> Option<(i64, Option<i64>)> {
        let mut start = None;
        let mut end = None;
        for (name, value) in attributes_iter(attributes) {
            let parsed = value.parse::<i64>().ok();
            if name.eq_ignore_ascii_case("start") {
                if parsed.is_none() {
                    self.warnings.push(ParseWarning::new(
                        line,
                        Record::Sync,
                        format!("invalid start time `{value}`"),
                    ));
                    return None;
                }
                start = parsed;
            } else {
                if parsed.is_none() {
                    self.warnings.push(ParseWarning::new(
                        line,
                        Record::Sync,
                        format!("invalid end time `{value}`, ignoring it"),
                    ));
                }
                end = parsed;
            }
        }

        match start {
            Some(start) => Some((start, end)),
            None => {
                self.warnings.push(ParseWarning::new(
                    line,
                    Record::Sync,
                    "missing Start attribute",
                ));
                None
            }
        }
    }
}

fn attributes_iter(attributes: &str) -> impl Iterator<Item = (&str, &str)> {
    attribute_regex().captures_iter(attributes).map(|c| {
        let name = c.get(1).map_or("", |m| m.as_str());
        let value = c.get(2).map_or("", |m| m.as_str());
        (name, value)
    })
}

impl FromStr for Sami {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let buffer = crate::normalize(s);
        let buffer: &str = &buffer;

        let body_start = body_regex().find(buffer).map_or(0, |m| m.end());
        let body_end = body_end_regex()
            .find_at(buffer, body_start)
            .map_or(buffer.len(), |m| m.start());
        let skipped: Vec<Range<usize>> = skipped_section_regex()
            .find_iter(buffer)
            .map(|m| m.range())
            .collect();

        let tags: Vec<_> = sync_regex()
            .captures_iter(&buffer[..body_end])
            .filter_map(|c| {
                let whole = c.get(0)?;
                let in_skipped = skipped.iter().any(|r| r.contains(&whole.start()));
                (whole.start() >= body_start && !in_skipped).then_some(c)
            })
            .collect();

        let mut sami = Sami::default();
        let mut syncs = Vec::with_capacity(tags.len());
        // Tags are in order so line numbers only need counting from the previous one
        let (mut line, mut counted) = (1, 0);
        for (index, captures) in tags.iter().enumerate() {
            let (Some(whole), Some(attributes)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            line += buffer[counted..whole.start()].matches('\n').count();
            counted = whole.start();
            let Some((start, end)) = sami.parse_attributes(attributes.as_str(), line) else {
                continue;
            };
            let segment_end = tags
                .get(index + 1)
                .and_then(|c| c.get(0))
                .map_or(body_end, |m| m.start());
            let text = caption_text(&buffer[whole.end()..segment_end]);
            syncs.push(SyncPoint { start, end, text });
        }

        for (index, sync) in syncs.iter().enumerate() {
            let Some(text) = &sync.text else {
                continue;
            };
            let end_ms = sync
                .end
                .or_else(|| syncs.get(index + 1).map(|next| next.start))
                .unwrap_or(sync.start);
            sami.entries
                .push(SubtitleEntry::new(sync.start, end_ms, text.clone()));
        }

        Ok(sami)
    }
}

impl Subtitle for Sami {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::Sami
    }

    fn entries(&self) -> &EntryStore {
        &self.entries
    }

    fn entries_mut(&mut self) -> &mut EntryStore {
        &mut self.entries
    }

    fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    fn write_to(&self, writer: &mut dyn Write) -> std::io::Result<()> {
        writer.write_all(HEADER.as_bytes())?;
        for entry in &self.entries {
            writeln!(
                writer,
                "<SYNC Start={} End={}><P>{}</P></SYNC>",
                entry.start_ms.max(0),
                entry.end_ms.max(0),
                entry.text.replace('\n', "<br>")
            )?;
        }
        writer.write_all(FOOTER.as_bytes())
    }
}
