use std::path::Path;

use anyhow::Context;
use rusqlite::{params_from_iter, Connection};
use tracing::info;

use crate::error::{Error, Result};
use crate::table::{Frame, Row};

/// Table every exported dump stores its rows in.
pub const DUMP_TABLE: &str = "dump";

pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Buffered writer of rows into a SQLite dump file.
pub struct FrameWriter {
    conn: Connection,
    columns: Vec<String>,
    buffer: Vec<Vec<String>>,
    buffer_limit: usize,
    written: usize,
}

impl FrameWriter {
    pub fn create(path: &Path, columns: &[String], allow_overwrite: bool) -> Result<Self> {
        if path.exists() {
            if !allow_overwrite {
                return Err(Error::FileExists(path.to_path_buf()));
            }
            std::fs::remove_file(path)?;
        }
        let conn = Connection::open(path)?;
        let definitions = columns
            .iter()
            .map(|column| format!("{} TEXT NOT NULL", quote_identifier(column)))
            .collect::<Vec<_>>()
            .join(", ");
        conn.execute_batch(&format!("CREATE TABLE {DUMP_TABLE} ({definitions});"))?;
        Ok(Self {
            conn,
            columns: columns.to_vec(),
            buffer: Vec::new(),
            buffer_limit: 1000,
            written: 0,
        })
    }

    pub fn add(&mut self, row: &Row<'_>) -> Result<()> {
        self.buffer.push(row.values().map(str::to_string).collect());
        if self.buffer.len() >= self.buffer_limit {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        {
            let placeholders = (1..=self.columns.len())
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", ");
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {DUMP_TABLE} VALUES ({placeholders})"
            ))?;
            for row in &self.buffer {
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;

        self.written += self.buffer.len();
        self.buffer.clear();
        Ok(())
    }

    /// Flushes what is left and reports the number of rows written.
    pub fn finish(mut self) -> Result<usize> {
        self.flush()?;
        Ok(self.written)
    }
}

/// Writes every row of `frame` into a new SQLite dump at `path`.
pub fn write_sqlite(frame: &Frame, path: &Path, allow_overwrite: bool) -> anyhow::Result<usize> {
    let mut writer = FrameWriter::create(path, frame.column_names(), allow_overwrite)
        .with_context(|| format!("Failed to create dump {}", path.display()))?;
    for row in frame.rows() {
        writer.add(&row)?;
    }
    let written = writer.finish().context("Failed to flush dump rows")?;
    info!("Wrote {} rows to {}", written, path.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::testing::{frame_of, PostRow};

    #[test]
    fn test_write_and_refuse_overwrite() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("posts-2024-01-01.sqlite");
        let frame = frame_of(&[PostRow::new(1, "fox"), PostRow::new(2, "wolf \"grey\"")]);

        assert_eq!(write_sqlite(&frame, &path, false)?, 2);
        let err = write_sqlite(&frame, &path, false).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::FileExists(_))));
        assert_eq!(write_sqlite(&frame.slice(0, 1), &path, true)?, 1);

        let conn = Connection::open(&path)?;
        let tags: String = conn.query_row("SELECT tag_string FROM dump", [], |row| row.get(0))?;
        assert_eq!(tags, "fox");
        Ok(())
    }

    #[test]
    fn test_flushes_in_batches() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let rows: Vec<PostRow> = (1..=2500).map(|id| PostRow::new(id, "fox")).collect();
        let frame = frame_of(&rows);
        let mut writer =
            FrameWriter::create(&dir.path().join("out.sqlite"), frame.column_names(), false)?;
        for row in frame.rows() {
            writer.add(&row)?;
        }
        assert_eq!(writer.written, 2000);
        assert_eq!(writer.finish()?, 2500);
        Ok(())
    }
}
