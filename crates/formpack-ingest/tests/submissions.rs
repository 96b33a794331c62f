//! Reading submissions from JSON arrays and JSON lines.

use std::fs;
use std::io::Cursor;

use formpack_ingest::{IngestError, JsonLines, open_submissions, read_submissions};
use serde_json::json;

#[test]
fn json_array_files_are_read_whole() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("submissions.json");
    fs::write(&path, "  [{\"q1\": \"a\"}, {\"q1\": \"b\"}]").expect("write");

    let submissions = read_submissions(&path).expect("read");
    assert_eq!(submissions, vec![json!({"q1": "a"}), json!({"q1": "b"})]);
}

#[test]
fn json_lines_skip_blank_lines() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("submissions.jsonl");
    fs::write(&path, "{\"q1\": \"a\"}\n\n{\"q1\": \"b\"}\n").expect("write");

    let submissions = read_submissions(&path).expect("read");
    assert_eq!(submissions, vec![json!({"q1": "a"}), json!({"q1": "b"})]);
}

#[test]
fn bad_lines_report_their_line_number() {
    let text = "{\"q1\": \"a\"}\n{broken\n{\"q1\": \"c\"}\n";
    let results: Vec<_> = JsonLines::new(Cursor::new(text), "inline").collect();

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    match &results[1] {
        Err(IngestError::Json { context, .. }) => assert_eq!(context, "inline line 2"),
        other => panic!("unexpected result {other:?}"),
    }
    assert_eq!(results[2].as_ref().ok(), Some(&json!({"q1": "c"})));
}

#[test]
fn open_submissions_streams_lines_lazily() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("submissions.jsonl");
    fs::write(&path, "{\"n\": 1}\nnot json\n{\"n\": 3}\n").expect("write");

    let good: Vec<_> = open_submissions(&path)
        .expect("open")
        .filter_map(Result::ok)
        .collect();
    assert_eq!(good, vec![json!({"n": 1}), json!({"n": 3})]);

    assert!(read_submissions(&path).is_err());
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = read_submissions(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, IngestError::Io { .. }));
}
