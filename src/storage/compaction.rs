//! Compaction
//!
//! Merges an ordered run of segments (oldest → newest) into one segment by a
//! left fold of two-way streaming merges:
//!
//! ```text
//! merge(merge(merge(s0, s1), s2), ..., sN-1)
//! ```
//!
//! Each two-way merge walks both inputs with one cursor each. On equal keys
//! the younger (right-hand) record wins and the older one is discarded.
//!
//! Tombstones may only be dropped when nothing older than the merged inputs
//! can still hold the key, i.e. when the inputs are the complete segment
//! list. Callers state this through [`TombstonePolicy`].
//!
//! The fold is evaluated as nested iterators streaming into a single output
//! segment; no partial merge is ever written under a segment name. Inputs
//! are never modified or removed here. Retiring them is left to the caller,
//! after it has switched over to the output.

use std::cell::Cell;
use std::cmp::Ordering;

use tracing::{info, warn};

use crate::error::{KvError, Result};
use crate::record::{Key, Record};

use super::{SegmentMeta, SegmentStore};

/// What to do with tombstones while merging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TombstonePolicy {
    /// Keep tombstones; required unless every older segment takes part
    Preserve,

    /// Discard tombstones; only valid for a full compaction
    Drop,
}

/// Counters for one two-way merge
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeStats {
    /// Records emitted
    pub records_written: u64,
    /// Older duplicates discarded in favour of a younger record
    pub duplicates_resolved: u64,
    /// Tombstones discarded under `TombstonePolicy::Drop`
    pub tombstones_dropped: u64,
}

/// Two-way streaming merge of ascending record streams
///
/// `older` and `younger` must each be strictly ascending. The output is
/// strictly ascending, with the younger record winning on equal keys.
/// After an input error the merge yields that error once and then stops.
pub struct TwoWayMerge<A, B>
where
    A: Iterator<Item = Result<Record>>,
    B: Iterator<Item = Result<Record>>,
{
    older: A,
    younger: B,
    older_head: Option<Record>,
    younger_head: Option<Record>,
    policy: TombstonePolicy,
    stats: MergeStats,
    failed: bool,
}

impl<A, B> TwoWayMerge<A, B>
where
    A: Iterator<Item = Result<Record>>,
    B: Iterator<Item = Result<Record>>,
{
    pub fn new(older: A, younger: B, policy: TombstonePolicy) -> Self {
        Self {
            older,
            younger,
            older_head: None,
            younger_head: None,
            policy,
            stats: MergeStats::default(),
            failed: false,
        }
    }

    /// Counters so far
    pub fn stats(&self) -> &MergeStats {
        &self.stats
    }

    /// Refill an empty head from its stream
    fn fill(head: &mut Option<Record>, stream: &mut impl Iterator<Item = Result<Record>>) -> Result<()> {
        if head.is_none() {
            *head = stream.next().transpose()?;
        }
        Ok(())
    }

    /// Pick the next record to consider, advancing the cursors it consumes
    fn pick(&mut self) -> Result<Option<Record>> {
        Self::fill(&mut self.older_head, &mut self.older)?;
        Self::fill(&mut self.younger_head, &mut self.younger)?;

        let picked = match (self.older_head.take(), self.younger_head.take()) {
            (None, None) => None,
            (Some(old), None) => Some(old),
            (None, Some(young)) => Some(young),
            (Some(old), Some(young)) => match old.key.cmp(&young.key) {
                Ordering::Equal => {
                    self.stats.duplicates_resolved += 1;
                    Some(young)
                }
                Ordering::Less => {
                    self.younger_head = Some(young);
                    Some(old)
                }
                Ordering::Greater => {
                    self.older_head = Some(old);
                    Some(young)
                }
            },
        };
        Ok(picked)
    }
}

impl<A, B> Iterator for TwoWayMerge<A, B>
where
    A: Iterator<Item = Result<Record>>,
    B: Iterator<Item = Result<Record>>,
{
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            match self.pick() {
                Ok(Some(record)) => {
                    if record.entry.is_tombstone() && self.policy == TombstonePolicy::Drop {
                        self.stats.tombstones_dropped += 1;
                        continue;
                    }
                    self.stats.records_written += 1;
                    return Some(Ok(record));
                }
                Ok(None) => return None,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Result of a compaction
#[derive(Debug, Clone)]
pub struct CompactionOutcome {
    /// The consolidated segment
    pub segment: SegmentMeta,
    /// Every key written to the consolidated segment, ascending
    pub keys: Vec<Key>,
    /// Number of input segments
    pub inputs: usize,
    /// Older duplicates discarded across all merge steps
    pub duplicates_resolved: u64,
    /// Tombstones discarded across all merge steps
    pub tombstones_dropped: u64,
}

/// Merges segments of a `SegmentStore`
pub struct Compactor<'a> {
    store: &'a SegmentStore,
}

impl<'a> Compactor<'a> {
    pub fn new(store: &'a SegmentStore) -> Self {
        Self { store }
    }

    /// Merge two segments (`older`, `younger`) into a new one
    pub fn merge(
        &self,
        older: &str,
        younger: &str,
        policy: TombstonePolicy,
    ) -> Result<(SegmentMeta, MergeStats)> {
        let mut merge = TwoWayMerge::new(
            self.store.reader(older)?,
            self.store.reader(younger)?,
            policy,
        );
        let meta = self.store.write_results(&mut merge)?;
        Ok((meta, merge.stats().clone()))
    }

    /// Compact `inputs` (oldest → newest) into a single new segment
    ///
    /// The fold runs as nested streaming merges feeding one output file, so
    /// the only segment ever committed is the finished result. Any failure
    /// removes the partial output and returns `KvError::Compaction`; the
    /// inputs are left untouched either way.
    pub fn compact(&self, inputs: &[String], policy: TombstonePolicy) -> Result<CompactionOutcome> {
        if inputs.is_empty() {
            return Err(KvError::Compaction("no segments to compact".to_string()));
        }

        info!(inputs = inputs.len(), ?policy, "compaction started");

        let outcome = self.fold(inputs, policy).map_err(|e| {
            warn!(error = %e, "compaction aborted, inputs left intact");
            KvError::Compaction(e.to_string())
        })?;

        info!(
            segment = %outcome.segment.name,
            inputs = outcome.inputs,
            records = outcome.segment.record_count,
            duplicates_resolved = outcome.duplicates_resolved,
            tombstones_dropped = outcome.tombstones_dropped,
            "compaction finished"
        );
        Ok(outcome)
    }

    /// Build `merge(merge(s0, s1), ..., sN-1)` and stream it into one segment
    ///
    /// Inner merges keep tombstones so a younger tombstone still shadows
    /// older values further up the fold; `policy` is applied once, on the
    /// fully merged stream.
    fn fold(&self, inputs: &[String], policy: TombstonePolicy) -> Result<CompactionOutcome> {
        let records_read = Cell::new(0u64);
        let count = |r: &Result<Record>| {
            if r.is_ok() {
                records_read.set(records_read.get() + 1);
            }
        };

        let mut stream: Box<dyn Iterator<Item = Result<Record>> + '_> =
            Box::new(std::iter::empty());
        for name in inputs {
            let younger = self.store.reader(name)?.inspect(count);
            stream = Box::new(TwoWayMerge::new(stream, younger, TombstonePolicy::Preserve));
        }

        let mut keys = Vec::new();
        let mut merge = TwoWayMerge::new(stream, std::iter::empty(), policy);
        let segment = self.store.write_results(merge.by_ref().inspect(|r| {
            if let Ok(record) = r {
                keys.push(record.key);
            }
        }))?;

        // Every record read is either written, shadowed by a younger copy,
        // or a dropped tombstone
        let stats = merge.stats();
        let duplicates_resolved = records_read
            .get()
            .saturating_sub(stats.records_written + stats.tombstones_dropped);

        Ok(CompactionOutcome {
            segment,
            keys,
            inputs: inputs.len(),
            duplicates_resolved,
            tombstones_dropped: stats.tombstones_dropped,
        })
    }
}
