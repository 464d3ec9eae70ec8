use std::{borrow::Cow, sync::OnceLock};

use regex::Regex;

/// A line cursor with a single line of lookahead.
///
/// Similar to [`str::lines`] but it can peek at the upcoming line without
/// consuming it, and keeps track of the 1-based number of the last line returned.
pub(crate) struct LineCursor<'a> {
    rest: Option<&'a str>,
    line: usize,
}

impl<'a> LineCursor<'a> {
    pub(crate) fn new(s: &'a str) -> Self {
        Self {
            rest: (!s.is_empty()).then_some(s),
            line: 0,
        }
    }

    fn split(s: &'a str) -> (&'a str, Option<&'a str>) {
        match s.split_once('\n') {
            Some((line, remainder)) => (line, (!remainder.is_empty()).then_some(remainder)),
            None => (s, None),
        }
    }

    /// Returns the next line without consuming it.
    pub(crate) fn peek(&self) -> Option<&'a str> {
        let (line, _) = Self::split(self.rest?);
        Some(line.strip_suffix('\r').unwrap_or(line))
    }

    /// The number of the line most recently returned by `next`.
    pub(crate) const fn line_number(&self) -> usize {
        self.line
    }

    /// Consumes lines until a non-blank one is up next.
    pub(crate) fn skip_blank(&mut self) {
        while self.peek().is_some_and(|s| s.trim().is_empty()) {
            self.next();
        }
    }
}

impl<'a> Iterator for LineCursor<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let (line, remainder) = Self::split(self.rest?);
        self.rest = remainder;
        self.line += 1;
        Some(line.strip_suffix('\r').unwrap_or(line))
    }
}

/// Converts the fractional part of a timestamp into milliseconds.
///
/// The fraction is read as a decimal fraction of a second so that
/// `5` is 500ms, `05` (ASS centiseconds) is 50ms and `005` is 5ms.
fn fraction_to_ms(s: &str) -> Option<i64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits = &s[..s.len().min(3)];
    let value: i64 = digits.parse().ok()?;
    Some(value * 10_i64.pow(3 - digits.len() as u32))
}

/// Parses a clock timestamp into milliseconds.
///
/// The format is `HH:MM:SS.fff` where `HH` is optional and the fractional
/// separator may be either `.` or `,`. This covers SRT, WebVTT and ASS times.
pub(crate) fn parse_timestamp(s: &str) -> Option<i64> {
    let s = s.trim();
    let (clock, fraction) = s.split_once(['.', ','])?;
    let mut components = clock.rsplitn(3, ':');
    let seconds: i64 = components.next()?.parse().ok()?;
    let minutes: i64 = components.next()?.parse().ok()?;
    let hours: i64 = match components.next() {
        Some(hours) => hours.parse().ok()?,
        None => 0,
    };
    if seconds < 0 || minutes < 0 || hours < 0 {
        return None;
    }
    let ms = fraction_to_ms(fraction)?;
    hours
        .checked_mul(60)?
        .checked_add(minutes)?
        .checked_mul(60)?
        .checked_add(seconds)?
        .checked_mul(1000)?
        .checked_add(ms)
}

/// A millisecond value broken into its clock components.
///
/// Negative values cannot be represented in any of the supported formats
/// so they are written as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Clock {
    pub(crate) hours: i64,
    pub(crate) minutes: i64,
    pub(crate) seconds: i64,
    pub(crate) millis: i64,
}

impl Clock {
    pub(crate) fn from_ms(ms: i64) -> Self {
        let ms = ms.max(0);
        Self {
            hours: ms / 3_600_000,
            minutes: (ms / 60_000) % 60,
            seconds: (ms / 1000) % 60,
            millis: ms % 1000,
        }
    }
}

fn html_tag_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r#"<[^>]*?>"#).unwrap())
}

/// Removes every `<tag>` and `</tag>` marker from the text.
pub(crate) fn strip_html_tags(s: &str) -> Cow<'_, str> {
    html_tag_regex().replace_all(s, "")
}

/// The lines of an entry's text that are safe to write into a cue.
///
/// SRT and WebVTT end a cue at the first blank line, so blank lines
/// inside the text are left out.
pub(crate) fn cue_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().filter(|line| !line.trim().is_empty())
}

/// Wraps the text as `<tag>text</tag>`.
pub(crate) fn wrap_in_tag(text: &str, tag: &str) -> String {
    let mut output = String::with_capacity(text.len() + tag.len() * 2 + 5);
    output.push('<');
    output.push_str(tag);
    output.push('>');
    output.push_str(text);
    output.push_str("</");
    output.push_str(tag);
    output.push('>');
    output
}
