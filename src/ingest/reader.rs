//! Loading of dump files into columnar frames.
//!
//! CSV dumps go through SQLite's CSV virtual table, SQLite dumps are read
//! from their `dump` table and Parquet dumps row by row. In every case each
//! cell arrives as text.

use std::fmt;
use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use tracing::info;

use crate::database::repo::{quote_identifier, DUMP_TABLE};
use crate::database::{Posts, TagCatalog};
use crate::error::{Error, Result};
use crate::ingest::parquet_dump::{self, TagLists};
use crate::table::{Frame, LazyFrame, Scan, Source};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DumpFormat {
    Csv,
    Sqlite,
    Parquet,
}

impl DumpFormat {
    pub fn from_extension(ext: &str) -> Option<DumpFormat> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(DumpFormat::Csv),
            "sqlite" | "db" => Some(DumpFormat::Sqlite),
            "parquet" => Some(DumpFormat::Parquet),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Result<DumpFormat> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        DumpFormat::from_extension(ext).ok_or_else(|| Error::UnsupportedFormat(ext.to_string()))
    }
}

impl fmt::Display for DumpFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DumpFormat::Csv => "csv",
            DumpFormat::Sqlite => "sqlite",
            DumpFormat::Parquet => "parquet",
        })
    }
}

fn connect(path: &Path, format: DumpFormat) -> Result<Connection> {
    match format {
        DumpFormat::Csv => {
            let conn = Connection::open_in_memory()?;
            rusqlite::vtab::csvtab::load_module(&conn)?;
            let filename = path.to_string_lossy().replace('\'', "''");
            conn.execute_batch(&format!(
                "CREATE VIRTUAL TABLE {DUMP_TABLE} USING csv(filename='{filename}', header=YES);"
            ))?;
            Ok(conn)
        }
        DumpFormat::Sqlite => Ok(Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?),
        DumpFormat::Parquet => Err(Error::UnsupportedFormat(format.to_string())),
    }
}

fn read_columns(conn: &Connection) -> Result<Vec<String>> {
    let stmt = conn.prepare(&format!("SELECT * FROM {DUMP_TABLE} LIMIT 0"))?;
    Ok(stmt.column_names().into_iter().map(str::to_string).collect())
}

fn cell_text(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

fn read_frame(conn: &Connection, columns: &[String]) -> Result<Frame> {
    let selected = columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ");
    let mut stmt = conn.prepare(&format!("SELECT {selected} FROM {DUMP_TABLE}"))?;
    let mut cells: Vec<Vec<String>> = vec![Vec::new(); columns.len()];
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        for (position, column) in cells.iter_mut().enumerate() {
            column.push(cell_text(row.get_ref(position)?));
        }
    }
    Frame::from_columns(columns.to_vec(), cells)
}

/// A dump file whose header is known and whose rows are read on demand.
pub struct DumpScan {
    path: PathBuf,
    format: DumpFormat,
    columns: Vec<String>,
    tag_lists: TagLists,
}

impl DumpScan {
    pub fn open(path: &Path) -> Result<DumpScan> {
        DumpScan::open_with(path, TagLists::Plain)
    }

    /// `tag_lists` only matters for Parquet dumps storing tags as lists.
    pub fn open_with(path: &Path, tag_lists: TagLists) -> Result<DumpScan> {
        let format = DumpFormat::from_path(path)?;
        let columns = match format {
            DumpFormat::Parquet => parquet_dump::read_columns(path)?,
            _ => read_columns(&connect(path, format)?)?,
        };
        Ok(DumpScan {
            path: path.to_path_buf(),
            format,
            columns,
            tag_lists,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> DumpFormat {
        self.format
    }
}

impl Scan for DumpScan {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn load(&self) -> Result<Frame> {
        let frame = match self.format {
            DumpFormat::Parquet => {
                parquet_dump::read_frame(&self.path, &self.columns, self.tag_lists)?
            }
            _ => read_frame(&connect(&self.path, self.format)?, &self.columns)?,
        };
        info!("Loaded {} rows from {}", frame.len(), self.path.display());
        Ok(frame)
    }

    fn describe(&self) -> String {
        format!("{} dump {}", self.format, self.path.display())
    }
}

/// Opens `path` as a source; a lazy source defers reading the rows.
pub fn open_source(path: &Path, lazy: bool) -> Result<Source> {
    source_of(DumpScan::open(path)?, lazy)
}

fn source_of(scan: DumpScan, lazy: bool) -> Result<Source> {
    if lazy {
        Ok(Source::Lazy(LazyFrame::scan(scan)))
    } else {
        Ok(Source::Eager(scan.load()?))
    }
}

pub fn open_posts(path: &Path, lazy: bool) -> Result<Posts> {
    Posts::new(open_source(path, lazy)?)
}

pub fn open_tags(path: &Path, lazy: bool) -> Result<TagCatalog> {
    TagCatalog::new(open_source(path, lazy)?)
}

/// Opens a fluffyrock posts dump, a Parquet file whose `tag_string` is a list
/// of tags written with spaces. Each tag gets underscores instead, and the
/// list is joined into the usual space-separated tag string.
pub fn open_fluffyrock_posts(path: &Path, lazy: bool) -> Result<Posts> {
    let scan = DumpScan::open_with(path, TagLists::Underscored)?;
    Posts::new(source_of(scan, lazy)?)
}
