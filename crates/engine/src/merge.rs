//! Merge engine: deduplicates two record sequences by normalized address
//!
//! Each source's list is first collapsed on its own (a later repeat replaces the
//! earlier record but keeps its position). The primary contribution is then
//! emitted in order, followed by secondary records whose address the primary
//! did not produce. Records without an address are dropped.

use std::collections::HashMap;

use tokenagg_core::TokenRecord;

/// Conflict resolution for addresses present in both sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    /// The primary record wins as a whole
    #[default]
    Precedence,
    /// The primary record wins, with its empty/zero fields filled from the secondary
    Enrich,
}

/// Insertion-ordered map from normalized address to record
#[derive(Debug, Default)]
struct OrderedRecords {
    index: HashMap<String, usize>,
    records: Vec<TokenRecord>,
}

impl OrderedRecords {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            index: HashMap::with_capacity(capacity),
            records: Vec::with_capacity(capacity),
        }
    }

    /// Last-wins insert that keeps the slot of the first occurrence
    fn upsert(&mut self, key: String, record: TokenRecord) {
        match self.index.get(&key) {
            Some(&slot) => self.records[slot] = record,
            None => {
                self.index.insert(key, self.records.len());
                self.records.push(record);
            }
        }
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut TokenRecord> {
        let slot = *self.index.get(key)?;
        self.records.get_mut(slot)
    }

    fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    fn into_records(self) -> Vec<TokenRecord> {
        self.records
    }
}

/// Collapse one source's list: identifiable records only, later repeats win.
/// Records leave in storage form, keyed by their normalized address.
fn collapse(records: Vec<TokenRecord>) -> Vec<(String, TokenRecord)> {
    let mut collapsed = OrderedRecords::with_capacity(records.len());
    for record in records.into_iter().filter(TokenRecord::is_identifiable) {
        let record = record.normalized();
        collapsed.upsert(record.address.clone(), record);
    }

    collapsed
        .records
        .into_iter()
        .map(|record| (record.address.clone(), record))
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MergeEngine {
    strategy: MergeStrategy,
}

impl MergeEngine {
    pub fn new(strategy: MergeStrategy) -> Self {
        Self { strategy }
    }

    pub fn merge(&self, primary: Vec<TokenRecord>, secondary: Vec<TokenRecord>) -> Vec<TokenRecord> {
        let mut merged = OrderedRecords::with_capacity(primary.len() + secondary.len());

        for (key, record) in collapse(primary) {
            merged.upsert(key, record);
        }

        for (key, record) in collapse(secondary) {
            if !merged.contains(&key) {
                merged.upsert(key, record);
                continue;
            }
            if self.strategy == MergeStrategy::Enrich {
                if let Some(existing) = merged.get_mut(&key) {
                    existing.fill_missing_from(&record);
                }
            }
        }

        merged.into_records()
    }
}

/// Whole-record precedence merge
pub fn merge(primary: Vec<TokenRecord>, secondary: Vec<TokenRecord>) -> Vec<TokenRecord> {
    MergeEngine::default().merge(primary, secondary)
}
