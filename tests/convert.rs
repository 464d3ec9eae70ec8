use std::{fs, path::PathBuf};

use subconv::{convert, srt::Srt, ConvertOptions, Error, Record, ShiftMode, Subtitle};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("could not write fixture");
    path
}

const SRT: &str = "1\r\n00:00:01,000 --> 00:00:02,000\r\n<i>Hello</i>\r\n\r\n2\r\n00:00:03,000 --> 00:00:04,500\r\nWorld\r\nsecond line\r\n";

#[test]
fn srt_to_vtt() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "movie.srt", SRT);
    let output = dir.path().join("movie.vtt");

    let report = convert(&input, &output, &ConvertOptions::default()).unwrap();
    assert_eq!(report.entries, 2);
    assert!(report.warnings.is_empty());
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "WEBVTT\n\n0:00:01.000 --> 0:00:02.000\n<i>Hello</i>\n\n0:00:03.000 --> 0:00:04.500\nWorld\nsecond line\n\n"
    );
}

#[test]
fn srt_to_ass_with_transforms() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "movie.srt", SRT);
    let output = dir.path().join("movie.ASS");
    let options = ConvertOptions {
        shift_ms: 1000,
        remove_formatting: true,
        ..Default::default()
    };

    convert(&input, &output, &options).unwrap();
    let written = fs::read_to_string(&output).unwrap();
    assert!(written.starts_with("[Script Info]\n"));
    assert!(written.contains("\nDialogue: 0,0:00:02.00,0:00:03.00,Default,,0,0,0,,Hello\n"));
    assert!(written.contains("\nDialogue: 0,0:00:04.00,0:00:05.50,Default,,0,0,0,,World\\Nsecond line\n"));
}

#[test]
fn ass_to_srt_skips_bad_records() {
    let dir = TempDir::new().unwrap();
    let input = write(
        &dir,
        "show.ssa",
        "\u{feff}[Script Info]\nTitle: Show\n\n[V4+ Styles]\nStyle: Short,Arial\n\n[Events]\nDialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,,Hi, {\\i1}there{\\i0}\\Nfriend\nDialogue: broken\n",
    );
    let output = dir.path().join("show.srt");

    let report = convert(&input, &output, &ConvertOptions::default()).unwrap();
    assert_eq!(report.entries, 1);
    assert_eq!(report.warnings.len(), 2);
    assert_eq!(report.warnings[0].record, Record::Style);
    assert_eq!(report.warnings[1].record, Record::Dialogue);
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "1\n00:00:01,000 --> 00:00:02,000\nHi, there\nfriend\n\n"
    );
}

#[test]
fn ass_line_breaks_stay_inside_cues() {
    let dir = TempDir::new().unwrap();
    let input = write(
        &dir,
        "breaks.ass",
        "[Script Info]\n\n[Events]\nDialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,,{\\an8}\\NHello\nDialogue: 0,0:00:03.00,0:00:04.00,Default,,0,0,0,,Top\\N\\NBottom\n",
    );
    let output = dir.path().join("breaks.srt");

    convert(&input, &output, &ConvertOptions::default()).unwrap();
    let written = fs::read_to_string(&output).unwrap();
    assert_eq!(
        written,
        "1\n00:00:01,000 --> 00:00:02,000\nHello\n\n2\n00:00:03,000 --> 00:00:04,000\nTop\nBottom\n\n"
    );

    let srt = written.parse::<Srt>().unwrap();
    assert_eq!(srt.entries().len(), 2);
    assert_eq!(srt.entries().get(1).unwrap().text, "Top\nBottom");

    let vtt = dir.path().join("breaks.vtt");
    convert(&input, &vtt, &ConvertOptions::default()).unwrap();
    let again = convert(
        &vtt,
        &dir.path().join("again.srt"),
        &ConvertOptions::default(),
    )
    .unwrap();
    assert_eq!(again.entries, 2);
}

#[test]
fn sami_to_srt() {
    let dir = TempDir::new().unwrap();
    let input = write(
        &dir,
        "clip.smi",
        "<SAMI>\n<HEAD><TITLE>clip</TITLE></HEAD>\n<BODY>\n<SYNC Start=0><P>Hello</P></SYNC>\n<SYNC Start=1000><P>World</P></SYNC>\n</BODY>\n</SAMI>\n",
    );
    let output = dir.path().join("clip.srt");

    convert(&input, &output, &ConvertOptions::default()).unwrap();
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "1\n00:00:00,000 --> 00:00:01,000\nHello\n\n2\n00:00:01,000 --> 00:00:01,000\nWorld\n\n"
    );
}

#[test]
fn vtt_notes_only_survive_vtt() {
    let dir = TempDir::new().unwrap();
    let input = write(
        &dir,
        "notes.vtt",
        "WEBVTT\n\nNOTE keep me\n\n00:01.000 --> 00:02.000\nHello\n",
    );
    let keep = ConvertOptions {
        keep_notes: true,
        ..Default::default()
    };

    let same = dir.path().join("copy.vtt");
    convert(&input, &same, &keep).unwrap();
    assert!(fs::read_to_string(&same)
        .unwrap()
        .starts_with("WEBVTT\n\nNOTE keep me\n\n0:00:01.000 --> 0:00:02.000\n"));

    let dropped = dir.path().join("copy2.vtt");
    convert(&input, &dropped, &ConvertOptions::default()).unwrap();
    assert!(!fs::read_to_string(&dropped).unwrap().contains("NOTE"));

    let other = dir.path().join("copy.smi");
    convert(&input, &other, &keep).unwrap();
    assert!(!fs::read_to_string(&other).unwrap().contains("keep me"));
}

#[test]
fn vtt_rejects_unknown_style_tag() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "movie.srt", SRT);
    let output = dir.path().join("movie.vtt");
    let options = ConvertOptions {
        style_tag: Some(String::from("font")),
        shift_ms: 250,
        shift_mode: ShiftMode::EndOnly,
        ..Default::default()
    };

    convert(&input, &output, &options).unwrap();
    let written = fs::read_to_string(&output).unwrap();
    assert!(written.contains("0:00:01.000 --> 0:00:02.250\n<i>Hello</i>\n"));
    assert!(!written.contains("<font>"));
}

#[test]
fn srt_round_trip_is_stable() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "a.srt", SRT);
    let first = dir.path().join("b.srt");
    let second = dir.path().join("c.srt");

    convert(&input, &first, &ConvertOptions::default()).unwrap();
    convert(&first, &second, &ConvertOptions::default()).unwrap();
    assert_eq!(
        fs::read_to_string(&first).unwrap(),
        fs::read_to_string(&second).unwrap()
    );
}

#[test]
fn errors() {
    let dir = TempDir::new().unwrap();
    let options = ConvertOptions::default();

    let input = write(&dir, "movie.txt", SRT);
    let err = convert(&input, &dir.path().join("movie.srt"), &options).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat(_)));

    let input = write(&dir, "movie.srt", SRT);
    let err = convert(&input, &dir.path().join("movie.doc"), &options).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat(_)));

    let err = convert(
        &dir.path().join("missing.srt"),
        &dir.path().join("out.srt"),
        &options,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Io { .. }));

    let input = write(&dir, "bad.vtt", "00:01.000 --> 00:02.000\nHello\n");
    let err = convert(&input, &dir.path().join("out.srt"), &options).unwrap_err();
    assert!(matches!(err, Error::InvalidFormat { line: 1, .. }));

    let err = convert(
        &dir.path().join("movie.srt"),
        &dir.path().join("no/such/dir/out.srt"),
        &options,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}
