//! CSV-backed row store implementation.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;
use tracing::debug;

use super::{ContactRow, RowField, RowStore, StorageError, REQUIRED_COLUMNS};

const BOM: char = '\u{feff}';

/// CSV-backed contact table.
///
/// Updates re-read the file, change one cell and replace the file through a
/// temporary sibling and a rename, all under one lock per store.
pub struct CsvRowStore {
    path: PathBuf,
    lock: Mutex<()>,
}

/// In-memory copy of the file.
struct Table {
    /// The file started with a UTF-8 byte order mark.
    bom: bool,
    headers: Vec<String>,
    records: Vec<Vec<String>>,
    columns: Columns,
}

/// Positions of the required columns.
struct Columns {
    contact_id: usize,
    telephone: usize,
    recording_url: usize,
    status: usize,
}

impl Columns {
    fn locate(headers: &[String]) -> Result<Self, StorageError> {
        let mut found = [0usize; 4];
        for (slot, name) in found.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| StorageError::MissingColumn(name.to_string()))?;
        }

        let [contact_id, telephone, recording_url, status] = found;
        Ok(Self {
            contact_id,
            telephone,
            recording_url,
            status,
        })
    }

    fn of(&self, field: RowField) -> usize {
        match field {
            RowField::Status => self.status,
            RowField::RecordingUrl => self.recording_url,
        }
    }
}

impl Table {
    fn cell<'a>(record: &'a [String], column: usize) -> &'a str {
        record.get(column).map(String::as_str).unwrap_or("")
    }

    fn rows(&self) -> Vec<ContactRow> {
        self.records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let recording_url = Self::cell(record, self.columns.recording_url);
                ContactRow {
                    index,
                    contact_id: Self::cell(record, self.columns.contact_id).to_string(),
                    telephone: Self::cell(record, self.columns.telephone).to_string(),
                    recording_url: if recording_url.trim().is_empty() {
                        None
                    } else {
                        Some(recording_url.to_string())
                    },
                    status: Self::cell(record, self.columns.status).to_string(),
                }
            })
            .collect()
    }

    fn set(&mut self, index: usize, field: RowField, value: &str) -> Result<(), StorageError> {
        let rows = self.records.len();
        let column = self.columns.of(field);
        let width = self.headers.len();
        let record = self
            .records
            .get_mut(index)
            .ok_or(StorageError::RowOutOfRange { index, rows })?;

        if record.len() < width {
            record.resize(width, String::new());
        }
        record[column] = value.to_string();
        Ok(())
    }
}

impl CsvRowStore {
    /// Open a store over an existing CSV file. The file is validated eagerly.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        read_table(&path)?;
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, ()> {
        // The mutex guards no data, so a poisoned lock is still usable.
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RowStore for CsvRowStore {
    fn load(&self) -> Result<Vec<ContactRow>, StorageError> {
        let _guard = self.guard();
        Ok(read_table(&self.path)?.rows())
    }

    fn update(&self, index: usize, field: RowField, value: &str) -> Result<(), StorageError> {
        let _guard = self.guard();
        let mut table = read_table(&self.path)?;
        table.set(index, field, value)?;
        write_table(&self.path, &table)?;
        debug!("Row {} {} = {:?}", index, field.column(), value);
        Ok(())
    }
}

fn read_table(path: &Path) -> Result<Table, StorageError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StorageError::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let mut headers: Vec<String> = reader
        .headers()
        .map_err(|e| StorageError::Malformed(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();
    let mut bom = false;
    if let Some(first) = headers.first_mut() {
        if let Some(rest) = first.strip_prefix(BOM) {
            *first = rest.to_string();
            bom = true;
        }
    }
    let columns = Columns::locate(&headers)?;

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| StorageError::Malformed(e.to_string()))?;
        records.push(record.iter().map(str::to_string).collect());
    }

    Ok(Table {
        bom,
        headers,
        records,
        columns,
    })
}

fn write_table(path: &Path, table: &Table) -> Result<(), StorageError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    if table.bom {
        write!(tmp.as_file_mut(), "{}", BOM)?;
    }

    {
        let mut writer = csv::Writer::from_writer(tmp.as_file_mut());
        writer
            .write_record(&table.headers)
            .map_err(csv_io_error)?;
        let width = table.headers.len();
        for record in &table.records {
            if record.len() < width {
                let mut padded = record.clone();
                padded.resize(width, String::new());
                writer.write_record(&padded).map_err(csv_io_error)?;
            } else {
                writer.write_record(record).map_err(csv_io_error)?;
            }
        }
        writer.flush()?;
    }
    tmp.as_file_mut().flush()?;
    tmp.as_file().sync_all()?;
    // Temp files are created owner-only; keep the table's own mode.
    tmp.as_file()
        .set_permissions(std::fs::metadata(path)?.permissions())?;

    tmp.persist(path).map_err(|e| StorageError::Io(e.error))?;
    Ok(())
}

fn csv_io_error(e: csv::Error) -> StorageError {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => StorageError::Io(io),
        other => StorageError::Malformed(format!("{:?}", other)),
    }
}
