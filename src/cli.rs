use std::path::PathBuf;

use clap::{ArgAction, Parser};
use log::LevelFilter;

use crate::{convert::ConvertOptions, ShiftMode};

fn valid_style_tag(s: &str) -> Result<String, String> {
    if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '.') {
        Ok(s.to_owned())
    } else {
        Err(format!("`{s}` isn't a valid tag name"))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The subtitle file to convert.
    ///
    /// The format is picked from the extension: .srt, .vtt, .smi, .ass or .ssa
    pub input: PathBuf,
    /// Where to write the converted file.
    ///
    /// The extension decides the output format, same as the input.
    /// An existing file is overwritten.
    pub output: PathBuf,
    /// Shift the timing of the subtitles by the given milliseconds
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub shift: i64,
    /// Which times the shift applies to
    #[arg(long, value_enum, default_value_t = ShiftMode::StartEnd)]
    pub shift_mode: ShiftMode,
    /// Remove HTML-like formatting tags from the text
    #[arg(long)]
    pub remove_formatting: bool,
    /// Wrap every subtitle in the given tag, e.g. `i` for <i>...</i>.
    ///
    /// WebVTT output only accepts b, i, u and c.
    #[arg(long, value_parser = valid_style_tag, verbatim_doc_comment)]
    pub style: Option<String>,
    /// Keep NOTE blocks when converting WebVTT to WebVTT
    #[arg(long)]
    pub keep_notes: bool,
    /// Print more information, can be repeated
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
    /// Only print errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// The log level requested on the command line.
    ///
    /// `RUST_LOG` still takes precedence when set.
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        }
    }

    pub fn options(&self) -> ConvertOptions {
        ConvertOptions {
            shift_ms: self.shift,
            shift_mode: self.shift_mode,
            remove_formatting: self.remove_formatting,
            style_tag: self.style.clone(),
            keep_notes: self.keep_notes,
        }
    }

    /// Runs the conversion.
    pub fn run(self) -> anyhow::Result<()> {
        use anyhow::Context;
        let report = crate::convert(&self.input, &self.output, &self.options())
            .with_context(|| format!("could not convert {}", self.input.display()))?;
        if !report.warnings.is_empty() {
            log::warn!(
                "skipped {} malformed record(s) in {}",
                report.warnings.len(),
                self.input.display()
            );
        }
        log::info!(
            "converted {} entries from {} to {}",
            report.entries,
            report.from,
            report.to
        );
        Ok(())
    }
}
