//! Tests for data file emission and the metadata manifest

use sgdata_common::output::{read_manifest, write_manifest, MANIFEST_FILE};
use sgdata_common::{DataFile, ProcessorMeta};
use tempfile::TempDir;

#[test]
fn test_data_file_written_under_category() {
    let temp_dir = TempDir::new().unwrap();
    let file = DataFile::new("testmrt.ics", "BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n");

    let path = file.write(temp_dir.path(), "hawker-closures").unwrap();

    assert_eq!(path, temp_dir.path().join("hawker-closures").join("testmrt.ics"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), file.content);
}

#[test]
fn test_data_file_overwrites_previous_run() {
    let temp_dir = TempDir::new().unwrap();
    DataFile::new("a.ics", "old").write(temp_dir.path(), "cat").unwrap();
    let path = DataFile::new("a.ics", "new").write(temp_dir.path(), "cat").unwrap();
    assert_eq!(std::fs::read_to_string(path).unwrap(), "new");
}

#[test]
fn test_manifest_round_trip() {
    let temp_dir = TempDir::new().unwrap();

    let mut meta = ProcessorMeta::new(
        "Hawker Center Closures",
        "hawker-closures",
        "Calendars of hawker center closures",
    );
    meta.add_file("bishan.ics");
    meta.add_file("ang mo kio.ics");

    let path = write_manifest(temp_dir.path(), &[meta.clone()]).unwrap();
    assert_eq!(path, temp_dir.path().join(MANIFEST_FILE));

    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw[0]["data_category"], "hawker-closures");
    assert_eq!(raw[0]["files"][0], "ang mo kio.ics");

    assert_eq!(read_manifest(temp_dir.path()).unwrap(), vec![meta]);
}
