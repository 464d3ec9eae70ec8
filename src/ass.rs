//! A reader and writer for SubStation Alpha v4+ (.ass) and legacy v4 (.ssa) subtitles.
//!
//! Only the parts of the script that map onto plain subtitle entries are kept:
//! the recognised `[Script Info]` keys, the styles and the `Dialogue:` events.
//! Everything else (fonts, graphics, comments, other event kinds) is skipped.
//!
//! Dialogue text is reduced to plain text on read. Override blocks (`{...}`)
//! are removed, `\N` becomes a newline and the soft break `\n` and hard space
//! `\h` become spaces. Dialogue lines with an `Effect` are kept like any other.

use std::fmt::Display;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::entry::{EntryStore, SubtitleEntry};
use crate::error::{Error, ParseWarning, Record};
use crate::utils::{parse_timestamp, Clock, LineCursor};
use crate::{Subtitle, SubtitleFormat};

/// Number of fields in a `[V4+ Styles]` `Style:` line (ASS v4.00+).
pub const ASS_STYLE_FIELDS: usize = 23;
/// Number of fields in a `[V4 Styles]` `Style:` line (SSA v4.00).
pub const SSA_STYLE_FIELDS: usize = 18;
/// Number of fields in a `Dialogue:` line, the same in SSA v4.00 and ASS v4.00+.
///
/// The last one (Text) may itself contain commas.
pub const DIALOGUE_FIELDS: usize = 10;

const STYLE_FORMAT: &str = "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding";
const EVENT_FORMAT: &str =
    "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text";

pub trait ToAss {
    fn to_ass(&self, writer: &mut dyn Write) -> std::io::Result<()>;
}

fn ass_tag_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r#"\{[^}]*\}"#).unwrap())
}

fn drawing_events_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r#"\{\\p[1-9]\d*\}(.*?)(?:\{\\p0\}|$)"#).unwrap())
}

fn special_ass_character_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r#"\\(n|N|h)"#).unwrap())
}

fn html_style_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r#"<(/?)(b|i|u|s)>"#).unwrap())
}

/// Reduces dialogue text to plain text.
pub fn clean_ass_text(s: &str) -> String {
    // Drawings are vector shapes, not text
    let result = drawing_events_regex().replace_all(s, "");
    let result = ass_tag_regex().replace_all(&result, "");
    special_ass_character_regex()
        .replace_all(&result, |captures: &regex::Captures| {
            if &captures[1] == "N" {
                "\n"
            } else {
                " "
            }
        })
        .into_owned()
}

/// Turns entry text into dialogue text.
///
/// Basic HTML style tags become the equivalent override tags and
/// newlines become `\N`.
fn to_ass_text(text: &str) -> String {
    html_style_regex()
        .replace_all(text, |captures: &regex::Captures| {
            let state = if captures[1].is_empty() { '1' } else { '0' };
            format!("{{\\{}{}}}", &captures[2], state)
        })
        .replace('\n', r#"\N"#)
}

/// The script info of the .ass file.
///
/// This is the information that belongs in the `[Script Info]` section.
/// Empty fields are written out with a placeholder.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScriptInfo {
    pub title: String,
    pub original_script: String,
    pub original_translation: String,
    pub script_type: String,
    pub wrap_style: String,
    pub scaled_border_and_shadow: String,
    pub ycbcr_matrix: String,
}

impl ScriptInfo {
    /// Sets a recognised key, returns `false` for anything else.
    fn set(&mut self, key: &str, value: &str) -> bool {
        let field = match key {
            "Title" => &mut self.title,
            "Original Script" => &mut self.original_script,
            "Original Translation" => &mut self.original_translation,
            "ScriptType" => &mut self.script_type,
            "WrapStyle" => &mut self.wrap_style,
            "ScaledBorderAndShadow" => &mut self.scaled_border_and_shadow,
            "YCbCr Matrix" => &mut self.ycbcr_matrix,
            _ => return false,
        };
        *field = value.to_owned();
        true
    }

    /// Returns the title of the script
    pub fn title(&self) -> &str {
        or_placeholder(&self.title, "<untitled>")
    }
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.is_empty() {
        placeholder
    } else {
        value
    }
}

impl ToAss for ScriptInfo {
    fn to_ass(&self, writer: &mut dyn Write) -> std::io::Result<()> {
        // Styles are always written in the v4+ layout
        let script_type = if self.script_type.eq_ignore_ascii_case("v4.00+") {
            self.script_type.as_str()
        } else {
            "v4.00+"
        };
        writeln!(writer, "[Script Info]")?;
        writeln!(writer, "Title: {}", self.title())?;
        writeln!(
            writer,
            "Original Script: {}",
            or_placeholder(&self.original_script, "<unknown>")
        )?;
        writeln!(
            writer,
            "Original Translation: {}",
            or_placeholder(&self.original_translation, "<unknown>")
        )?;
        writeln!(writer, "ScriptType: {script_type}")?;
        writeln!(writer, "WrapStyle: {}", or_placeholder(&self.wrap_style, "0"))?;
        writeln!(
            writer,
            "ScaledBorderAndShadow: {}",
            or_placeholder(&self.scaled_border_and_shadow, "yes")
        )?;
        writeln!(
            writer,
            "YCbCr Matrix: {}",
            or_placeholder(&self.ycbcr_matrix, "TV.709")
        )
    }
}

/// Colour that is used in a style or .ass script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Colour {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl Colour {
    pub const WHITE: Colour = Colour::from_rgb(255, 255, 255);
    pub const BLACK: Colour = Colour::from_rgb(0, 0, 0);
    pub const RED: Colour = Colour::from_rgb(255, 0, 0);

    pub const fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha: 0,
        }
    }

    /// Parses `&HAABBGGRR` (also without alpha) or the decimal form used by .ssa files.
    pub fn from_ass(s: &str) -> Option<Self> {
        let s = s.trim();
        let num = match s.strip_prefix("&H").or_else(|| s.strip_prefix("&h")) {
            Some(rest) => u32::from_str_radix(rest.trim_end_matches('&'), 16).ok()?,
            None => s.parse::<i64>().ok()? as u32,
        };
        Some(Self {
            red: (num & 0xFF) as u8,
            green: ((num >> 8) & 0xFF) as u8,
            blue: ((num >> 16) & 0xFF) as u8,
            alpha: ((num >> 24) & 0xFF) as u8,
        })
    }
}

impl Display for Colour {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "&H{a:02X}{b:02X}{g:02X}{r:02X}",
            a = self.alpha,
            b = self.blue,
            g = self.green,
            r = self.red
        )
    }
}

/// Which `Style:` layout a styles section uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StyleVersion {
    /// `[V4 Styles]`
    Ssa,
    /// `[V4+ Styles]`
    Ass,
}

impl StyleVersion {
    const fn field_count(&self) -> usize {
        match self {
            StyleVersion::Ssa => SSA_STYLE_FIELDS,
            StyleVersion::Ass => ASS_STYLE_FIELDS,
        }
    }
}

/// A style for the .ass script
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub name: String,
    pub font_name: String,
    pub font_size: f32,
    pub primary_colour: Colour,
    pub secondary_colour: Colour,
    pub outline_colour: Colour,
    pub background_colour: Colour,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub striked: bool,
    pub scale_x: f32,
    pub scale_y: f32,
    pub spacing: f32,
    pub angle: f32,
    pub border_style: u8,
    pub outline: f32,
    pub shadow: f32,
    pub alignment: u8, // numpad layout
    pub margin_l: i32,
    pub margin_r: i32,
    pub margin_v: i32,
    pub encoding: i32,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            name: String::from("Default"),
            font_name: String::from("Arial"),
            font_size: 20.0,
            primary_colour: Colour::WHITE,
            secondary_colour: Colour::RED,
            outline_colour: Colour::BLACK,
            background_colour: Colour::BLACK,
            bold: false,
            italic: false,
            underline: false,
            striked: false,
            scale_x: 100.0,
            scale_y: 100.0,
            spacing: 0.0,
            angle: 0.0,
            border_style: 1,
            outline: 2.0,
            shadow: 2.0,
            alignment: 2,
            margin_l: 10,
            margin_r: 10,
            margin_v: 10,
            encoding: 1,
        }
    }
}

/// Reads the field at `index`, naming it in the error.
fn field<T: FromStr>(fields: &[&str], index: usize, name: &str) -> Result<T, String> {
    let value = fields.get(index).map(|s| s.trim()).unwrap_or_default();
    value
        .parse()
        .map_err(|_| format!("invalid {name} `{value}`"))
}

fn colour(fields: &[&str], index: usize, name: &str) -> Result<Colour, String> {
    let value = fields.get(index).copied().unwrap_or_default();
    Colour::from_ass(value).ok_or_else(|| format!("invalid {name} `{}`", value.trim()))
}

fn flag(fields: &[&str], index: usize) -> bool {
    fields.get(index).is_some_and(|s| s.trim() != "0")
}

/// SSA alignment is 1-3 for subtitles, +4 for toptitles and +8 for midtitles.
fn ssa_to_ass_alignment(alignment: u8) -> u8 {
    match alignment {
        5..=7 => alignment + 2,
        9..=11 => alignment - 5,
        _ => alignment,
    }
}

impl Style {
    fn parse(fields: &[&str], version: StyleVersion) -> Result<Self, String> {
        if fields.len() != version.field_count() {
            return Err(format!(
                "expected {} fields, found {}",
                version.field_count(),
                fields.len()
            ));
        }

        let mut style = Style {
            name: fields[0].trim().to_owned(),
            font_name: fields[1].trim().to_owned(),
            font_size: field(fields, 2, "font size")?,
            primary_colour: colour(fields, 3, "primary colour")?,
            secondary_colour: colour(fields, 4, "secondary colour")?,
            outline_colour: colour(fields, 5, "outline colour")?,
            background_colour: colour(fields, 6, "back colour")?,
            bold: flag(fields, 7),
            italic: flag(fields, 8),
            ..Default::default()
        };

        match version {
            StyleVersion::Ass => {
                style.underline = flag(fields, 9);
                style.striked = flag(fields, 10);
                style.scale_x = field(fields, 11, "scale x")?;
                style.scale_y = field(fields, 12, "scale y")?;
                style.spacing = field(fields, 13, "spacing")?;
                style.angle = field(fields, 14, "angle")?;
                style.border_style = field(fields, 15, "border style")?;
                style.outline = field(fields, 16, "outline")?;
                style.shadow = field(fields, 17, "shadow")?;
                style.alignment = field(fields, 18, "alignment")?;
                style.margin_l = field(fields, 19, "left margin")?;
                style.margin_r = field(fields, 20, "right margin")?;
                style.margin_v = field(fields, 21, "vertical margin")?;
                style.encoding = field(fields, 22, "encoding")?;
            }
            StyleVersion::Ssa => {
                // TertiaryColour is the outline colour, AlphaLevel (16) is unused
                style.underline = false;
                style.striked = false;
                style.border_style = field(fields, 9, "border style")?;
                style.outline = field(fields, 10, "outline")?;
                style.shadow = field(fields, 11, "shadow")?;
                style.alignment = ssa_to_ass_alignment(field(fields, 12, "alignment")?);
                style.margin_l = field(fields, 13, "left margin")?;
                style.margin_r = field(fields, 14, "right margin")?;
                style.margin_v = field(fields, 15, "vertical margin")?;
                style.encoding = field(fields, 17, "encoding")?;
            }
        }
        Ok(style)
    }
}

impl ToAss for Style {
    fn to_ass(&self, writer: &mut dyn Write) -> std::io::Result<()> {
        let toggle = |b: bool| if b { -1 } else { 0 };
        writeln!(
            writer,
            "Style: {},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            self.name,
            self.font_name,
            self.font_size,
            self.primary_colour,
            self.secondary_colour,
            self.outline_colour,
            self.background_colour,
            toggle(self.bold),
            toggle(self.italic),
            toggle(self.underline),
            toggle(self.striked),
            self.scale_x,
            self.scale_y,
            self.spacing,
            self.angle,
            self.border_style,
            self.outline,
            self.shadow,
            self.alignment,
            self.margin_l,
            self.margin_r,
            self.margin_v,
            self.encoding,
        )
    }
}

/// Displays milliseconds as `H:MM:SS.cc`
struct AssTime(i64);

impl Display for AssTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // .ass files work with centiseconds instead of ms
        let clock = Clock::from_ms(self.0);
        write!(
            f,
            "{}:{:02}:{:02}.{:02}",
            clock.hours,
            clock.minutes,
            clock.seconds,
            clock.millis / 10
        )
    }
}

/// Returns the string inside a `[Title]` block (e.g. "Title").
fn get_section_title(s: &str) -> Option<&str> {
    s.trim().strip_prefix('[')?.strip_suffix(']')
}

/// Yields the lines of the current section along with their line number.
///
/// Stops right before the next section header without consuming it.
fn section_lines<'a, 'c>(
    cursor: &'c mut LineCursor<'a>,
) -> impl Iterator<Item = (usize, &'a str)> + 'c {
    std::iter::from_fn(move || {
        let next = cursor.peek()?;
        if get_section_title(next).is_some() {
            return None;
        }
        cursor.next();
        Some((cursor.line_number(), next))
    })
}

/// A parsed .ass or .ssa subtitle file.
#[derive(Debug, Default, Clone)]
pub struct Ass {
    entries: EntryStore,
    pub script_info: ScriptInfo,
    pub styles: Vec<Style>,
    warnings: Vec<ParseWarning>,
}

impl Ass {
    pub fn new(entries: EntryStore) -> Self {
        Self {
            entries,
            ..Default::default()
        }
    }

    pub fn open(path: &Path) -> Result<Self, Error> {
        let buffer = crate::load_file(path)?;
        buffer.parse()
    }

    fn parse_script_info(&mut self, cursor: &mut LineCursor<'_>) {
        for (_, line) in section_lines(cursor) {
            if line.starts_with(';') {
                continue;
            }
            if let Some((key, value)) = line.split_once(':') {
                self.script_info.set(key.trim(), value.trim());
            }
        }
    }

    fn parse_styles(&mut self, cursor: &mut LineCursor<'_>, version: StyleVersion) {
        for (number, line) in section_lines(cursor) {
            let Some(value) = line.strip_prefix("Style:") else {
                continue;
            };
            let fields = value.trim_start().split(',').collect::<Vec<_>>();
            match Style::parse(&fields, version) {
                Ok(style) => self.styles.push(style),
                Err(reason) => self
                    .warnings
                    .push(ParseWarning::new(number, Record::Style, reason)),
            }
        }
    }

    fn parse_dialogue(value: &str) -> Result<SubtitleEntry, String> {
        let fields = value.trim_start().splitn(DIALOGUE_FIELDS, ',').collect::<Vec<_>>();
        if fields.len() != DIALOGUE_FIELDS {
            return Err(format!(
                "expected {DIALOGUE_FIELDS} fields, found {}",
                fields.len()
            ));
        }
        let start_ms = parse_timestamp(fields[1])
            .ok_or_else(|| format!("invalid start time `{}`", fields[1].trim()))?;
        let end_ms = parse_timestamp(fields[2])
            .ok_or_else(|| format!("invalid end time `{}`", fields[2].trim()))?;
        let style = fields[3].trim().trim_start_matches('*');

        let mut entry = SubtitleEntry::new(start_ms, end_ms, clean_ass_text(fields[9]));
        if !style.is_empty() {
            entry.formatting = Some(style.to_owned());
        }
        Ok(entry)
    }

    fn parse_events(&mut self, cursor: &mut LineCursor<'_>) {
        for (number, line) in section_lines(cursor) {
            // Comment, Picture, Sound, Movie and Command events are not shown
            let Some(value) = line.strip_prefix("Dialogue:") else {
                continue;
            };
            match Self::parse_dialogue(value) {
                Ok(entry) => self.entries.push(entry),
                Err(reason) => self
                    .warnings
                    .push(ParseWarning::new(number, Record::Dialogue, reason)),
            }
        }
    }

    /// The style name written for an entry.
    fn style_for<'a>(&self, entry: &'a SubtitleEntry) -> &'a str {
        match entry.formatting.as_deref() {
            Some(name) if self.styles.iter().any(|s| s.name == name) => name,
            _ => "Default",
        }
    }
}

impl FromStr for Ass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let buffer = crate::normalize(s);
        let mut cursor = LineCursor::new(&buffer);

        // Sections may come in any order but [Script Info] has to be one of them
        let mut has_script_info = false;
        let mut ass = Ass::default();
        while let Some(line) = cursor.next() {
            let Some(title) = get_section_title(line) else {
                continue;
            };
            match title {
                "Script Info" => {
                    has_script_info = true;
                    ass.parse_script_info(&mut cursor);
                }
                "V4+ Styles" => ass.parse_styles(&mut cursor, StyleVersion::Ass),
                "V4 Styles" => ass.parse_styles(&mut cursor, StyleVersion::Ssa),
                "Events" => ass.parse_events(&mut cursor),
                _ => section_lines(&mut cursor).for_each(drop),
            }
        }

        if !has_script_info {
            return Err(Error::invalid(1, "missing [Script Info] section"));
        }
        Ok(ass)
    }
}

impl Subtitle for Ass {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::Ass
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
        self.script_info.to_ass(writer)?;
        writeln!(writer)?;

        writeln!(writer, "[V4+ Styles]")?;
        writeln!(writer, "{STYLE_FORMAT}")?;
        if self.styles.is_empty() {
            Style::default().to_ass(writer)?;
        }
        for style in &self.styles {
            style.to_ass(writer)?;
        }
        writeln!(writer)?;

        writeln!(writer, "[Events]")?;
        writeln!(writer, "{EVENT_FORMAT}")?;
        for entry in &self.entries {
            writeln!(
                writer,
                "Dialogue: 0,{},{},{},,0,0,0,,{}",
                AssTime(entry.start_ms),
                AssTime(entry.end_ms),
                self.style_for(entry),
                to_ass_text(&entry.text)
            )?;
        }
        Ok(())
    }

    /// Also strips override blocks and resolves `\N` for text that
    /// did not come from an .ass file.
    fn remove_formatting(&mut self) {
        for entry in &mut self.entries {
            let text = crate::utils::strip_html_tags(&entry.text);
            entry.text = clean_ass_text(&text);
        }
    }
}
