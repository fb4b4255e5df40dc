//! Streaming CSV reader and row validator.
//!
//! Rows are read one record at a time from the underlying file, so memory
//! use is bounded by the chunk size plus the set of ids seen so far. The
//! reader is blocking and is driven from `spawn_blocking` by the runner.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ByteRecord, ReaderBuilder, Trim};
use psgc_core::entity::{EntityType, ID_COLUMN, KEY_COLUMN, NAME_COLUMN};
use psgc_core::job::RowError;
use psgc_core::types::DbId;
use psgc_db::models::barangay::UpsertBarangay;
use psgc_db::models::citymun::UpsertCityMun;
use psgc_db::models::province::UpsertProvince;
use psgc_db::models::region::UpsertRegion;

use crate::error::ImportError;
use crate::record::ReferenceRecord;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

// ---------------------------------------------------------------------------
// Row outcomes
// ---------------------------------------------------------------------------

/// A structurally valid data row and the line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRow {
    pub line: u64,
    pub record: ReferenceRecord,
}

/// Result of validating one data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Valid(ParsedRow),
    Invalid(RowError),
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Lazy, single-pass reader of one entity's CSV file.
///
/// Blank records and a leading header row are skipped. A first record is
/// treated as a header only when its fields equal the schema's column names
/// (ignoring case), so headerless files load as data.
pub struct CsvRowReader<R: Read = File> {
    reader: csv::Reader<R>,
    entity_type: EntityType,
    record: ByteRecord,
    header_checked: bool,
    /// Id → line of its first occurrence.
    seen_ids: HashMap<DbId, u64>,
    /// Region code → line of its first occurrence.
    seen_codes: HashMap<String, u64>,
}

impl CsvRowReader<File> {
    /// Open `path` for `entity_type`.
    pub fn open(path: &Path, entity_type: EntityType) -> Result<Self, ImportError> {
        let file = File::open(path)?;
        Ok(Self::from_reader(file, entity_type))
    }
}

impl<R: Read> CsvRowReader<R> {
    pub fn from_reader(rdr: R, entity_type: EntityType) -> Self {
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(rdr);
        Self {
            reader,
            entity_type,
            record: ByteRecord::new(),
            header_checked: false,
            seen_ids: HashMap::new(),
            seen_codes: HashMap::new(),
        }
    }

    /// Advance to the next data record, skipping blanks and the header.
    ///
    /// Returns the record's 1-based line number, or `None` at end of file.
    fn next_data_record(&mut self) -> Result<Option<u64>, ImportError> {
        loop {
            if !self.reader.read_byte_record(&mut self.record)? {
                return Ok(None);
            }
            if is_blank(&self.record) {
                continue;
            }

            let line = self.record.position().map(|p| p.line()).unwrap_or(0);
            if !self.header_checked {
                self.header_checked = true;
                if is_header(&self.record, self.entity_type.columns()) {
                    continue;
                }
            }
            return Ok(Some(line));
        }
    }

    /// Read and validate the next data row.
    pub fn next_row(&mut self) -> Result<Option<RowOutcome>, ImportError> {
        let Some(line) = self.next_data_record()? else {
            return Ok(None);
        };

        let outcome = match validate(&self.record, self.entity_type) {
            Ok(record) => match self.first_use(&record) {
                Some(reason) => RowOutcome::Invalid(RowError::new(line, reason)),
                None => {
                    self.seen_ids.insert(record.id(), line);
                    if let ReferenceRecord::Region(region) = &record {
                        self.seen_codes.insert(region.code.clone(), line);
                    }
                    RowOutcome::Valid(ParsedRow { line, record })
                }
            },
            Err(reason) => RowOutcome::Invalid(RowError::new(line, reason)),
        };
        Ok(Some(outcome))
    }

    /// Reason a valid record repeats an earlier row's id or region code.
    fn first_use(&self, record: &ReferenceRecord) -> Option<String> {
        if let Some(first) = self.seen_ids.get(&record.id()) {
            return Some(format!("duplicate id {} (first seen on line {first})", record.id()));
        }
        match record {
            ReferenceRecord::Region(region) => self.seen_codes.get(&region.code).map(|first| {
                format!("duplicate region_code '{}' (first seen on line {first})", region.code)
            }),
            _ => None,
        }
    }

    /// Read up to `max` data rows. An empty result means end of file.
    pub fn next_chunk(&mut self, max: usize) -> Result<Vec<RowOutcome>, ImportError> {
        let mut chunk = Vec::with_capacity(max);
        while chunk.len() < max {
            match self.next_row()? {
                Some(outcome) => chunk.push(outcome),
                None => break,
            }
        }
        Ok(chunk)
    }
}

impl<R: Read> Iterator for CsvRowReader<R> {
    type Item = Result<RowOutcome, ImportError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}

/// Count the data rows of a file with the same blank and header rules the
/// reader applies, without validating them.
pub fn count_data_rows(path: &Path, entity_type: EntityType) -> Result<u64, ImportError> {
    let mut reader = CsvRowReader::open(path, entity_type)?;
    let mut count = 0;
    while reader.next_data_record()?.is_some() {
        count += 1;
    }
    Ok(count)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn is_blank(record: &ByteRecord) -> bool {
    record.iter().all(|field| strip_bom(field).is_empty())
}

fn strip_bom(field: &[u8]) -> &[u8] {
    field.strip_prefix(UTF8_BOM).unwrap_or(field)
}

fn is_header(record: &ByteRecord, columns: &[&str]) -> bool {
    record.len() == columns.len()
        && record
            .iter()
            .enumerate()
            .zip(columns)
            .all(|((i, field), column)| {
                let field = if i == 0 { strip_bom(field) } else { field };
                field.eq_ignore_ascii_case(column.as_bytes())
            })
}

fn field<'r>(record: &'r ByteRecord, index: usize, column: &str) -> Result<&'r str, String> {
    let raw = record.get(index).unwrap_or_default();
    let raw = if index == 0 { strip_bom(raw) } else { raw };
    std::str::from_utf8(raw).map_err(|_| format!("{column} is not valid UTF-8"))
}

fn required<'r>(record: &'r ByteRecord, index: usize, column: &str) -> Result<&'r str, String> {
    let value = field(record, index, column)?;
    if value.is_empty() {
        return Err(format!("{column} is empty"));
    }
    Ok(value)
}

fn positive_id(record: &ByteRecord, index: usize, column: &str) -> Result<DbId, String> {
    let value = required(record, index, column)?;
    match value.parse::<DbId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(format!("{column} '{value}' is not a positive integer")),
    }
}

/// Check one record against the entity's schema.
fn validate(record: &ByteRecord, entity_type: EntityType) -> Result<ReferenceRecord, String> {
    let columns = entity_type.columns();
    if record.len() != columns.len() {
        return Err(format!(
            "expected {} columns, found {}",
            columns.len(),
            record.len()
        ));
    }

    let id = positive_id(record, ID_COLUMN, columns[ID_COLUMN])?;
    let name = required(record, NAME_COLUMN, columns[NAME_COLUMN])?.to_string();
    let key_column = columns[KEY_COLUMN];

    let parsed = match entity_type {
        EntityType::Region => ReferenceRecord::Region(UpsertRegion {
            id,
            name,
            code: required(record, KEY_COLUMN, key_column)?.to_string(),
        }),
        EntityType::Province => ReferenceRecord::Province(UpsertProvince {
            id,
            name,
            region_code: required(record, KEY_COLUMN, key_column)?.to_string(),
        }),
        EntityType::CityMun => ReferenceRecord::CityMun(UpsertCityMun {
            id,
            name,
            province_id: positive_id(record, KEY_COLUMN, key_column)?,
        }),
        EntityType::Barangay => ReferenceRecord::Barangay(UpsertBarangay {
            id,
            name,
            citymun_id: positive_id(record, KEY_COLUMN, key_column)?,
        }),
    };
    Ok(parsed)
}
