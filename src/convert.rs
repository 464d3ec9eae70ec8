//! Converting a subtitle file from one format to another.

use std::path::Path;

use log::{debug, info, warn};

use crate::{
    ass::Ass, entry::ShiftMode, error::Error, error::ParseWarning, sami::Sami, srt::Srt,
    vtt::Vtt, EntryStore, Subtitle, SubtitleFormat,
};

/// The transforms applied while converting.
///
/// The default does nothing besides changing the format.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Milliseconds to shift by, `0` leaves the times alone.
    pub shift_ms: i64,
    pub shift_mode: ShiftMode,
    /// Strip `<tag>` markup from the text.
    pub remove_formatting: bool,
    /// Wrap every entry in `<tag>...</tag>`.
    pub style_tag: Option<String>,
    /// Keep WebVTT `NOTE` blocks when converting WebVTT to WebVTT.
    pub keep_notes: bool,
}

/// What happened during a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionReport {
    pub from: SubtitleFormat,
    pub to: SubtitleFormat,
    /// Number of entries written.
    pub entries: usize,
    /// Records the reader skipped.
    pub warnings: Vec<ParseWarning>,
}

/// Reads the subtitle at `path` with the given format.
pub fn open(
    path: &Path,
    format: SubtitleFormat,
    keep_notes: bool,
) -> Result<Box<dyn Subtitle>, Error> {
    Ok(match format {
        SubtitleFormat::Srt => Box::new(Srt::open(path)?),
        SubtitleFormat::Vtt => Box::new(Vtt::open(path, keep_notes)?),
        SubtitleFormat::Sami => Box::new(Sami::open(path)?),
        SubtitleFormat::Ass => Box::new(Ass::open(path)?),
    })
}

/// Creates an empty subtitle of the given format holding `entries`.
pub fn with_entries(format: SubtitleFormat, entries: EntryStore) -> Box<dyn Subtitle> {
    match format {
        SubtitleFormat::Srt => Box::new(Srt::new(entries)),
        SubtitleFormat::Vtt => Box::new(Vtt::new(entries)),
        SubtitleFormat::Sami => Box::new(Sami::new(entries)),
        SubtitleFormat::Ass => Box::new(Ass::new(entries)),
    }
}

/// Applies the transforms in their fixed order: shift, remove formatting, add style.
///
/// A style tag the format cannot express is skipped with a warning,
/// any other error is returned.
pub fn apply(subtitle: &mut dyn Subtitle, options: &ConvertOptions) -> Result<(), Error> {
    if options.shift_ms != 0 {
        debug!("shifting by {}ms ({:?})", options.shift_ms, options.shift_mode);
        subtitle.shift_time(options.shift_ms, options.shift_mode);
    }
    if options.remove_formatting {
        debug!("removing formatting");
        subtitle.remove_formatting();
    }
    if let Some(tag) = &options.style_tag {
        debug!("wrapping text in <{tag}>");
        match subtitle.add_default_style(tag) {
            Err(e) if e.is_recoverable() => warn!("{e}, leaving the text unchanged"),
            result => result?,
        }
    }
    Ok(())
}

/// Converts the subtitle at `input` into `output`, picking both formats from
/// the file extensions.
///
/// When both files share a format the parsed file is written back as is, so
/// format specific data such as ASS styles or WebVTT notes carries over.
/// Otherwise only the entries are moved over.
pub fn convert(
    input: &Path,
    output: &Path,
    options: &ConvertOptions,
) -> Result<ConversionReport, Error> {
    let from = SubtitleFormat::from_path(input)?;
    let to = SubtitleFormat::from_path(output)?;
    info!("converting {} ({from}) to {} ({to})", input.display(), output.display());

    let mut source = open(input, from, options.keep_notes)?;
    let warnings = source.warnings().to_vec();
    for warning in &warnings {
        warn!("{}: {warning}", input.display());
    }

    let mut destination = if from == to {
        source
    } else {
        let entries = std::mem::take(source.entries_mut());
        with_entries(to, entries)
    };

    apply(destination.as_mut(), options)?;
    destination.save(output)?;

    let entries = destination.entries().len();
    info!("wrote {entries} entries to {}", output.display());
    Ok(ConversionReport {
        from,
        to,
        entries,
        warnings,
    })
}
