use std::{fmt::Display, io::Write, path::Path, str::FromStr};

use crate::{
    entry::{Coordinates, EntryStore, SubtitleEntry},
    error::{Error, ParseWarning, Record},
    utils::{cue_lines, parse_timestamp, Clock, LineCursor},
    Subtitle, SubtitleFormat,
};

/// A SubRip (.srt) subtitle file.
#[derive(Debug, Default, Clone)]
pub struct Srt {
    entries: EntryStore,
    warnings: Vec<ParseWarning>,
}

/// Displays milliseconds as `HH:MM:SS,mmm`
pub(crate) struct SrtTime(pub(crate) i64);

impl Display for SrtTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let clock = Clock::from_ms(self.0);
        write!(
            f,
            "{:02}:{:02}:{:02},{:03}",
            clock.hours, clock.minutes, clock.seconds, clock.millis
        )
    }
}

/// Parses the legacy `X1:n X2:n Y1:n Y2:n` positioning suffix.
fn parse_coordinates(s: &str) -> Option<Coordinates> {
    let (mut x1, mut x2, mut y1, mut y2) = (None, None, None, None);
    for token in s.split_whitespace() {
        let (key, value) = token.split_once(':')?;
        let value: i32 = value.parse().ok()?;
        match key {
            "X1" => x1 = Some(value),
            "X2" => x2 = Some(value),
            "Y1" => y1 = Some(value),
            "Y2" => y2 = Some(value),
            _ => return None,
        }
    }
    Some(Coordinates {
        x1: x1?,
        x2: x2?,
        y1: y1?,
        y2: y2?,
    })
}

impl Srt {
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

    fn parse_block(&mut self, cursor: &mut LineCursor<'_>) -> Result<bool, Error> {
        cursor.skip_blank();
        let Some(first) = cursor.next() else {
            return Ok(false);
        };

        // The index line is discarded, some files leave it out entirely
        let times = if first.contains("-->") {
            first
        } else {
            match cursor.next() {
                Some(line) => line,
                None => return Ok(false),
            }
        };

        let line = cursor.line_number();
        let (start, rest) = times
            .split_once("-->")
            .ok_or_else(|| Error::invalid(line, "missing `-->` in time line"))?;
        let rest = rest.trim();
        let (end, suffix) = rest
            .split_once(char::is_whitespace)
            .unwrap_or((rest, ""));
        let start_ms = parse_timestamp(start)
            .ok_or_else(|| Error::invalid(line, format!("bad start time `{}`", start.trim())))?;
        let end_ms = parse_timestamp(end)
            .ok_or_else(|| Error::invalid(line, format!("bad end time `{end}`")))?;

        let mut entry = SubtitleEntry::new(start_ms, end_ms, String::new());
        if let Some(index) = suffix.find("X1:") {
            entry.coordinates = parse_coordinates(&suffix[index..]);
            if entry.coordinates.is_none() {
                self.warnings.push(ParseWarning::new(
                    line,
                    Record::Coordinates,
                    format!("could not parse `{}`", suffix.trim()),
                ));
            }
        }

        while let Some(text) = cursor.peek() {
            if text.trim().is_empty() {
                break;
            }
            cursor.next();
            if !entry.text.is_empty() {
                entry.text.push('\n');
            }
            entry.text.push_str(text);
        }

        self.entries.push(entry);
        Ok(true)
    }
}

impl FromStr for Srt {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let buffer = crate::normalize(s);
        let mut cursor = LineCursor::new(&buffer);
        let mut srt = Srt::default();
        while srt.parse_block(&mut cursor)? {}
        Ok(srt)
    }
}

impl Subtitle for Srt {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::Srt
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
        for (index, entry) in self.entries.iter().enumerate() {
            writeln!(writer, "{}", index + 1)?;
            write!(
                writer,
                "{} --> {}",
                SrtTime(entry.start_ms),
                SrtTime(entry.end_ms)
            )?;
            if let Some(c) = entry.coordinates {
                write!(writer, " X1:{} X2:{} Y1:{} Y2:{}", c.x1, c.x2, c.y1, c.y2)?;
            }
            writeln!(writer)?;
            for line in cue_lines(&entry.text) {
                writeln!(writer, "{line}")?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ShiftMode;

    #[test]
    fn test_dialogue() {
        let fragment =
            "11\n00:00:22,814 --> 00:00:26,609\nもう ４月というのに\n何やら 今日は冷えますね\n\n";
        let srt = fragment.parse::<Srt>().expect("could not parse");
        assert_eq!(srt.entries().len(), 1);
        let entry = srt.entries().get(0).unwrap();
        assert_eq!(entry.start_ms, 22_814);
        assert_eq!(entry.end_ms, 26_609);
        assert_eq!(entry.text, "もう ４月というのに\n何やら 今日は冷えますね");
        assert_eq!(entry.coordinates, None);

        // positions are renumbered on write
        assert_eq!(srt.render(), fragment.replacen("11", "1", 1));
    }

    #[test]
    fn test_read_and_shift() {
        let content = "1\r\n00:00:01,000 --> 00:00:02,000\r\nHello\r\n\r\n2\r\n00:00:03,000 --> 00:00:04,000\r\nWorld\r\n";
        let mut srt = content.parse::<Srt>().unwrap();
        assert_eq!(srt.entries().len(), 2);
        assert_eq!(srt.entries().get(0).unwrap().text, "Hello");
        assert_eq!(srt.entries().get(1).unwrap().text, "World");

        srt.shift_time(1000, ShiftMode::StartEnd);
        assert_eq!(srt.entries().get(0).unwrap().start_ms, 2000);
        assert_eq!(srt.entries().get(1).unwrap().start_ms, 4000);
        assert_eq!(srt.entries().get(1).unwrap().end_ms, 5000);
    }

    #[test]
    fn test_coordinates() {
        let content = "1\n00:00:01,000 --> 00:00:02,500 X1:100 X2:600 Y1:40 Y2:80\nPositioned\n";
        let srt = content.parse::<Srt>().unwrap();
        let entry = srt.entries().get(0).unwrap();
        assert_eq!(entry.end_ms, 2_500);
        assert_eq!(
            entry.coordinates,
            Some(Coordinates {
                x1: 100,
                x2: 600,
                y1: 40,
                y2: 80
            })
        );
        assert!(srt
            .render()
            .contains("00:00:01,000 --> 00:00:02,500 X1:100 X2:600 Y1:40 Y2:80\n"));

        let broken = "1\n00:00:01,000 --> 00:00:02,500 X1:abc\nText\n"
            .parse::<Srt>()
            .unwrap();
        assert_eq!(broken.entries().get(0).unwrap().coordinates, None);
        assert_eq!(broken.warnings().len(), 1);
        assert_eq!(broken.warnings()[0].record, Record::Coordinates);
        assert_eq!(broken.warnings()[0].line, 2);
    }

    #[test]
    fn test_missing_arrow() {
        let err = "1\n00:00:01,000 00:00:02,000\nHello\n"
            .parse::<Srt>()
            .unwrap_err();
        match err {
            Error::InvalidFormat { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {other:?}"),
        }
        assert!("1\n00:00:xx,000 --> 00:00:02,000\nHello\n"
            .parse::<Srt>()
            .is_err());
    }

    #[test]
    fn test_oversized_hours() {
        let err = "1\n9999999999999999:00:00,000 --> 00:00:01,000\nx\n"
            .parse::<Srt>()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFormat { line: 2, .. }));
    }

    #[test]
    fn test_blank_lines_in_text() {
        let srt = Srt::new(
            [
                SubtitleEntry::new(1000, 2000, "\nHello"),
                SubtitleEntry::new(3000, 4000, "Top\n\nBottom"),
            ]
            .into_iter()
            .collect(),
        );
        let rendered = srt.render();
        assert_eq!(
            rendered,
            "1\n00:00:01,000 --> 00:00:02,000\nHello\n\n2\n00:00:03,000 --> 00:00:04,000\nTop\nBottom\n\n"
        );

        let again = rendered.parse::<Srt>().unwrap();
        assert_eq!(again.entries().len(), 2);
        assert_eq!(again.entries().get(0).unwrap().text, "Hello");
        assert_eq!(again.entries().get(1).unwrap().text, "Top\nBottom");
    }

    #[test]
    fn test_round_trip_is_canonical() {
        let messy = "\n\n3\n0:0:1,5 -->   00:00:02,000  \nfirst line\nsecond line\n\n\n\n9\n00:01:00,000-->00:01:01,001\n<i>last</i>";
        let first = messy.parse::<Srt>().unwrap().render();
        assert_eq!(
            first,
            "1\n00:00:01,500 --> 00:00:02,000\nfirst line\nsecond line\n\n2\n00:01:00,000 --> 00:01:01,001\n<i>last</i>\n\n"
        );
        let second = first.parse::<Srt>().unwrap().render();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_index_and_empty() {
        let srt = "00:00:01,000 --> 00:00:02,000\nNo index\n"
            .parse::<Srt>()
            .unwrap();
        assert_eq!(srt.entries().get(0).unwrap().text, "No index");
        assert!("".parse::<Srt>().unwrap().entries().is_empty());
        assert!("\n\n".parse::<Srt>().unwrap().entries().is_empty());
    }

    #[test]
    fn test_formatting_operations() {
        let mut srt = "1\n00:00:01,000 --> 00:00:02,000\n<b>Hello</b> World!\n"
            .parse::<Srt>()
            .unwrap();
        srt.remove_formatting();
        assert_eq!(srt.entries().get(0).unwrap().text, "Hello World!");
        srt.add_default_style("i").unwrap();
        assert_eq!(srt.entries().get(0).unwrap().text, "<i>Hello World!</i>");
    }
}
