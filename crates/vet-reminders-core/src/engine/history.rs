//! Per-cycle, in-memory view of notification history.

use std::collections::HashMap;

use crate::models::SentRecord;

/// History loaded once per cycle, grouped by pet and sorted newest first.
///
/// Records written during the cycle are pushed back in so later evaluations
/// in the same cycle see them.
#[derive(Debug, Default)]
pub struct HistoryIndex {
    by_pet: HashMap<i64, Vec<SentRecord>>,
}

impl HistoryIndex {
    pub fn from_records(records: Vec<SentRecord>) -> Self {
        let mut by_pet: HashMap<i64, Vec<SentRecord>> = HashMap::new();
        for record in records {
            by_pet.entry(record.pet_id).or_default().push(record);
        }
        for history in by_pet.values_mut() {
            sort_newest_first(history);
        }
        Self { by_pet }
    }

    /// The pet's records, newest first.
    pub fn for_pet(&self, pet_id: i64) -> &[SentRecord] {
        self.by_pet.get(&pet_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn push(&mut self, record: SentRecord) {
        let history = self.by_pet.entry(record.pet_id).or_default();
        history.push(record);
        sort_newest_first(history);
    }

    pub fn record_count(&self) -> usize {
        self.by_pet.values().map(Vec::len).sum()
    }
}

fn sort_newest_first(records: &mut [SentRecord]) {
    records.sort_by(|a, b| b.sent_at.cmp(&a.sent_at).then(b.id.cmp(&a.id)));
}
