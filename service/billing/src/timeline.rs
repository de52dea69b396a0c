//! Timeline of canonical states rebuilt from a VM's hosting history.

use domain_billing::model::{entity::HistoryRecord, vo::Record};

use crate::{lazy::Lazy, state::map_code};

/// Anything that can hand out an ordered timeline, possibly computing it on first use.
pub trait Timeline {
    fn records(&self) -> &[Record];
}

impl Timeline for [Record] {
    fn records(&self) -> &[Record] {
        self
    }
}

impl Timeline for Vec<Record> {
    fn records(&self) -> &[Record] {
        self
    }
}

impl<F> Timeline for Lazy<Vec<Record>, F>
where
    F: FnOnce() -> Vec<Record>,
{
    fn records(&self) -> &[Record] {
        self.get()
    }
}

/// One record per history entry, ordered by `seq` and contiguous.
///
/// An entry lasts until the next one starts; the last one is still open and ends at `now`.
/// Starts going backwards in time are raised to the previous start so that no record ends
/// before it begins.
pub fn build_timeline(history: &[HistoryRecord], now: i64) -> Vec<Record> {
    let mut entries: Vec<&HistoryRecord> = history.iter().collect();
    entries.sort_by_key(|entry| entry.seq);

    let starts: Vec<i64> = entries
        .iter()
        .scan(i64::MIN, |floor, entry| {
            *floor = (*floor).max(entry.start);
            Some(*floor)
        })
        .collect();

    entries
        .iter()
        .zip(&starts)
        .enumerate()
        .map(|(i, (entry, &start))| {
            let end = starts.get(i + 1).copied().unwrap_or(now.max(start));
            Record::new(start, end, map_code(&entry.state))
        })
        .collect()
}

/// Restrict a timeline to `[from, to)`, clipping the records crossing a boundary.
pub fn filter_timeline(timeline: &[Record], from: i64, to: i64) -> Vec<Record> {
    if from >= to {
        return vec![];
    }
    timeline
        .iter()
        .filter(|record| record.end > from && record.start < to)
        .map(|record| Record::new(record.start.max(from), record.end.min(to), record.state))
        .collect()
}
