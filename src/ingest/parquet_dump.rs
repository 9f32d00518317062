//! Parquet dumps, read row by row into the same all-text frames as CSV.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, NaiveDate};
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field;

use crate::error::{Error, Result};
use crate::table::Frame;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
/// Days from 0001-01-01 to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// How list cells of the `tag_string` column are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagLists {
    /// Elements are joined with spaces as they are.
    #[default]
    Plain,
    /// Spaces inside each tag become underscores before joining, so that every
    /// tag stays one whitespace-separated token.
    Underscored,
}

fn open(path: &Path) -> Result<SerializedFileReader<File>> {
    Ok(SerializedFileReader::new(File::open(path)?)?)
}

pub(crate) fn read_columns(path: &Path) -> Result<Vec<String>> {
    let reader = open(path)?;
    let schema = reader.metadata().file_metadata().schema_descr().root_schema();
    Ok(schema
        .get_fields()
        .iter()
        .map(|field| field.name().to_string())
        .collect())
}

pub(crate) fn read_frame(path: &Path, columns: &[String], tag_lists: TagLists) -> Result<Frame> {
    let reader = open(path)?;
    let mut cells: Vec<Vec<String>> = vec![Vec::new(); columns.len()];
    for row in reader.get_row_iter(None)? {
        let row = row?;
        if row.len() != columns.len() {
            return Err(Error::Shape(format!(
                "parquet row has {} fields, expected {}",
                row.len(),
                columns.len()
            )));
        }
        for (column, (name, field)) in cells.iter_mut().zip(row.get_column_iter()) {
            let text = match (field, tag_lists) {
                (Field::ListInternal(list), TagLists::Underscored) if name == "tag_string" => list
                    .elements()
                    .iter()
                    .map(|tag| field_text(tag).replace(' ', "_"))
                    .collect::<Vec<_>>()
                    .join(" "),
                _ => field_text(field),
            };
            column.push(text);
        }
    }
    Frame::from_columns(columns.to_vec(), cells)
}

/// Text form of one cell, matching what the CSV exports hold.
fn field_text(field: &Field) -> String {
    match field {
        Field::Null => String::new(),
        Field::Bool(value) => if *value { "t" } else { "f" }.to_string(),
        Field::Str(value) => value.clone(),
        Field::Bytes(value) => String::from_utf8_lossy(value.data()).into_owned(),
        Field::Float(value) => value.to_string(),
        Field::Double(value) => value.to_string(),
        Field::Date(days) => UNIX_EPOCH_DAYS_FROM_CE
            .checked_add(*days)
            .and_then(NaiveDate::from_num_days_from_ce_opt)
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        Field::TimestampMillis(millis) => DateTime::from_timestamp_millis(*millis)
            .map(|at| at.naive_utc().format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_default(),
        Field::TimestampMicros(micros) => DateTime::from_timestamp_micros(*micros)
            .map(|at| at.naive_utc().format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_default(),
        Field::ListInternal(list) => list
            .elements()
            .iter()
            .map(field_text)
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string(),
    }
}
