//! Bundle an export into a single ZIP archive.
//!
//! The archive holds one CSV sheet per flattened record set and the raw feedback as a JSON
//! document, so nothing the upstream returned is lost by flattening.
use std::io::{Seek, Write};

use feedback_common::flatten::coerce_to_string;
use feedback_common::page::Record;
use serde_json::Value;

use crate::error::ArchiveError;
use crate::pipeline::ResultSet;

pub const FEEDBACK_SHEET: &str = "feedback.csv";
pub const REPLIES_SHEET: &str = "replies.csv";
pub const RAW_FEEDBACK_DOCUMENT: &str = "feedback_raw.json";

/// Write `result` as a ZIP archive into `writer`, returning the writer once the archive is
/// complete.
pub fn write_archive<W: Write + Seek>(result: &ResultSet, writer: W) -> Result<W, ArchiveError> {
    let mut zip = zip::ZipWriter::new(writer);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    zip.start_file(FEEDBACK_SHEET, options)?;
    write_sheet(&mut zip, &result.feedback)?;

    zip.start_file(REPLIES_SHEET, options)?;
    write_sheet(&mut zip, &result.replies)?;

    zip.start_file(RAW_FEEDBACK_DOCUMENT, options)?;
    serde_json::to_writer_pretty(&mut zip, &result.raw_feedback)?;

    Ok(zip.finish()?)
}

/// Write records as CSV. The header is every field name, in order of first appearance.
/// Empty input produces an empty sheet.
pub fn write_sheet<W: Write>(writer: W, records: &[Record]) -> Result<(), ArchiveError> {
    let columns = columns(records);
    if columns.is_empty() {
        return Ok(());
    }

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(&columns)?;
    for record in records {
        csv_writer.write_record(columns.iter().map(|column| cell(record.get(*column))))?;
    }
    csv_writer.flush()?;

    Ok(())
}

fn columns(records: &[Record]) -> Vec<&str> {
    let mut columns: Vec<&str> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }
    columns
}

fn cell(value: Option<&Value>) -> String {
    value.map(coerce_to_string).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::{Cursor, Read};

    fn records(value: Value) -> Vec<Record> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_sheet_header_is_union_of_fields() {
        let mut buffer = Vec::new();
        write_sheet(
            &mut buffer,
            &records(json!([
                {"id": 1, "content": "a, b"},
                {"id": 2, "likes": 3, "avatar": null},
                {"content": "line\nbreak", "id": true}
            ])),
        )
        .unwrap();

        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "id,content,likes,avatar\n1,\"a, b\",,\n2,,3,\ntrue,\"line\nbreak\",,\n"
        );
    }

    #[test]
    fn test_sheet_cells_render_integral_floats_without_fraction() {
        let mut buffer = Vec::new();
        write_sheet(&mut buffer, &records(json!([{"id": 1.0, "score": 4.5}]))).unwrap();

        assert_eq!(String::from_utf8(buffer).unwrap(), "id,score
1,4.5
");
    }

    #[test]
    fn test_empty_sheet() {
        let mut buffer = Vec::new();
        write_sheet(&mut buffer, &[]).unwrap();

        assert!(buffer.is_empty());
    }

    #[test]
    fn test_archive_contains_sheets_and_raw_document() {
        let result = ResultSet {
            feedback: records(json!([{"id": 1, "content": "hi"}])),
            replies: records(json!([{"id": "10", "images": "u1\nu2"}])),
            raw_feedback: records(json!([
                {"id": 1, "content": "hi", "replies_all": {"10": {"self": {"id": 10}}}}
            ])),
            pages: 1,
        };

        let cursor = write_archive(&result, Cursor::new(Vec::new())).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(cursor.into_inner())).unwrap();

        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec![FEEDBACK_SHEET, RAW_FEEDBACK_DOCUMENT, REPLIES_SHEET]
        );

        let mut feedback = String::new();
        archive
            .by_name(FEEDBACK_SHEET)
            .unwrap()
            .read_to_string(&mut feedback)
            .unwrap();
        assert_eq!(feedback, "id,content\n1,hi\n");

        let mut replies = String::new();
        archive
            .by_name(REPLIES_SHEET)
            .unwrap()
            .read_to_string(&mut replies)
            .unwrap();
        assert_eq!(replies, "id,images\n10,\"u1\nu2\"\n");

        let mut raw = String::new();
        archive
            .by_name(RAW_FEEDBACK_DOCUMENT)
            .unwrap()
            .read_to_string(&mut raw)
            .unwrap();
        assert!(raw.starts_with("[\n  {\n    \"id\": 1,"));
        let raw: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(raw[0]["replies_all"]["10"]["self"]["id"], json!(10));
    }
}
