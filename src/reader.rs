//! Streaming reader for the Propublica CSV export.
//!
//! Rows are decoded one at a time into [`AdRecord`]s so memory stays bounded
//! regardless of export size. Field length is unlimited; the export carries
//! very large `html` and `targeting` cells.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::error::{SplitError, SplitResult};
use crate::record::{
    AdRecord, RawMetadata, ENTITIES_COLUMN, ID_COLUMN, MESSAGE_COLUMN, TARGETS_COLUMN,
};

/// Header name → column position, resolved once from the header row.
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    /// Index the header row. `id` and `message` are required.
    pub fn from_headers(headers: &StringRecord) -> SplitResult<Self> {
        let mut positions = HashMap::new();
        for (pos, name) in headers.iter().enumerate() {
            let name = name.trim_start_matches('\u{feff}').trim();
            // First occurrence wins on duplicate headers.
            positions.entry(name.to_string()).or_insert(pos);
        }

        for required in [ID_COLUMN, MESSAGE_COLUMN] {
            if !positions.contains_key(required) {
                return Err(SplitError::MissingColumn(required.to_string()));
            }
        }

        Ok(Self { positions })
    }

    pub fn contains(&self, column: &str) -> bool {
        self.positions.contains_key(column)
    }

    /// Cell value for a named column; `None` if the column or cell is absent.
    pub fn cell<'r>(&self, record: &'r StringRecord, column: &str) -> Option<&'r str> {
        self.positions.get(column).and_then(|&pos| record.get(pos))
    }

    /// Build the fixed-field view of one row. `None` when the id is blank.
    pub fn ad_record(&self, record: &StringRecord) -> Option<AdRecord> {
        let id = self.cell(record, ID_COLUMN)?;
        if id.trim().is_empty() {
            return None;
        }
        let text = |column: &str| self.cell(record, column).unwrap_or_default().to_string();

        Some(AdRecord {
            id: id.to_string(),
            message: text(MESSAGE_COLUMN),
            entities: text(ENTITIES_COLUMN),
            targets: text(TARGETS_COLUMN),
            metadata: RawMetadata::from_lookup(|column| {
                self.cell(record, column).map(|v| v.to_string())
            }),
        })
    }
}

/// Result of reading one data row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Ad(AdRecord),
    /// Row could not be used; `row` is the 1-based data row number.
    Skipped { row: u64, reason: String },
}

/// Iterator over the data rows of an export.
pub struct AdReader<R> {
    reader: csv::Reader<R>,
    columns: ColumnIndex,
    record: StringRecord,
    row: u64,
}

impl AdReader<File> {
    /// Open an export on disk. A missing file is reported distinctly from
    /// other open failures.
    pub fn open(path: &Path) -> SplitResult<Self> {
        if !path.exists() {
            return Err(SplitError::MissingInput(path.to_path_buf()));
        }
        let file = File::open(path).map_err(|e| SplitError::io(path, e))?;
        Self::from_reader(file)
    }
}

impl<R: Read> AdReader<R> {
    pub fn from_reader(input: R) -> SplitResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .from_reader(input);

        let headers = reader.headers()?.clone();
        let columns = ColumnIndex::from_headers(&headers)?;
        if !columns.contains(ENTITIES_COLUMN) {
            tracing::warn!("Export has no '{}' column; no entity rows will be written", ENTITIES_COLUMN);
        }
        if !columns.contains(TARGETS_COLUMN) {
            tracing::warn!("Export has no '{}' column; every ad gets the sentinel target", TARGETS_COLUMN);
        }

        Ok(Self {
            reader,
            columns,
            record: StringRecord::new(),
            row: 0,
        })
    }
}

impl<R: Read> Iterator for AdReader<R> {
    type Item = SplitResult<RowOutcome>;

    /// I/O failures end the scan with an error; undecodable rows and rows
    /// without an id are reported as skipped and the scan continues.
    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record(&mut self.record) {
            Ok(false) => None,
            Ok(true) => {
                self.row += 1;
                let outcome = match self.columns.ad_record(&self.record) {
                    Some(ad) => RowOutcome::Ad(ad),
                    None => RowOutcome::Skipped {
                        row: self.row,
                        reason: "missing id".to_string(),
                    },
                };
                Some(Ok(outcome))
            }
            Err(e) if e.is_io_error() => Some(Err(SplitError::Csv(e))),
            Err(e) => {
                self.row += 1;
                Some(Ok(RowOutcome::Skipped {
                    row: self.row,
                    reason: e.to_string(),
                }))
            }
        }
    }
}
