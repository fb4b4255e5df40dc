//! Parent resolution and atomic batch commits.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use psgc_core::entity::ParentKey;
use psgc_core::job::RowError;

use crate::error::ImportError;
use crate::parser::ParsedRow;
use crate::record::ReferenceRecord;
use crate::store::ReferenceStore;

/// A batch split into rows whose parent exists and rows that must be skipped.
#[derive(Debug, Default)]
pub struct ResolvedBatch {
    pub rows: Vec<ParsedRow>,
    pub rejected: Vec<RowError>,
}

/// Writes validated rows to the [`ReferenceStore`] one batch at a time.
pub struct BatchLoader {
    store: Arc<dyn ReferenceStore>,
}

impl BatchLoader {
    pub fn new(store: Arc<dyn ReferenceStore>) -> Self {
        Self { store }
    }

    /// Drop rows that the store would refuse: a parent row that does not
    /// exist yet, or a region code already held by another region.
    ///
    /// Uses one lookup for all distinct parent keys in the batch and one for
    /// its region codes.
    pub async fn resolve_parents(&self, rows: Vec<ParsedRow>) -> Result<ResolvedBatch, ImportError> {
        let keys: Vec<ParentKey> = rows
            .iter()
            .filter_map(|row| row.record.parent_key())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let codes: Vec<String> = rows
            .iter()
            .filter_map(|row| match &row.record {
                ReferenceRecord::Region(region) => Some(region.code.clone()),
                _ => None,
            })
            .collect();

        let existing = if keys.is_empty() {
            HashSet::new()
        } else {
            self.store.existing_parents(&keys).await?
        };
        let owners = if codes.is_empty() {
            HashMap::new()
        } else {
            self.store.region_code_owners(&codes).await?
        };

        let mut resolved = ResolvedBatch::default();
        for row in rows {
            if let Some(key) = row.record.parent_key() {
                if !existing.contains(&key) {
                    resolved.rejected.push(RowError::new(row.line, format!("unknown {key}")));
                    continue;
                }
            }
            if let ReferenceRecord::Region(region) = &row.record {
                match owners.get(&region.code) {
                    Some(&owner) if owner != region.id => {
                        resolved.rejected.push(RowError::new(
                            row.line,
                            format!("region_code '{}' already belongs to region {owner}", region.code),
                        ));
                        continue;
                    }
                    _ => {}
                }
            }
            resolved.rows.push(row);
        }
        Ok(resolved)
    }

    /// Upsert `rows` as one atomic batch and return the number written.
    ///
    /// A failure names the line range of the batch.
    pub async fn commit(&self, rows: &[ParsedRow]) -> Result<u64, ImportError> {
        let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
            return Ok(0);
        };

        let records: Vec<ReferenceRecord> = rows.iter().map(|row| row.record.clone()).collect();
        self.store
            .upsert_batch(&records)
            .await
            .map_err(|source| ImportError::BatchFailed {
                first_line: first.line,
                last_line: last.line,
                source,
            })
    }
}
