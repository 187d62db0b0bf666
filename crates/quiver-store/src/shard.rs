//! The snapshot-consistent shard planner.
//!
//! For a requested shard count `N`, the planner produces `N` contiguous key
//! ranges that partition the entry key space, never split a
//! `(source, edge-kind)` group, and hold approximately equal entry counts.
//!
//! # The staggered group walker
//!
//! `N` independent iterators are opened over the whole entry space under one
//! fresh snapshot. In a round-robin loop, iterator `i` advances `i + 1`
//! groups per round, so after `k` rounds iterator `i` sits roughly `(i+1)/N`
//! of the way through what the fastest iterator has covered. The iterators
//! spread themselves across the key space, and each one's final position
//! becomes a shard boundary. Group walks always run to a group's end before
//! recording a boundary, which is what keeps groups whole.
//!
//! While advancing, a walker counts every entry it visits and records the
//! visited key as its shard's provisional end. The key that terminates a
//! group walk (the first key of the following group) is visited, meaning
//! counted and recorded, but pushed back so the next walk starts from it.
//! Each walker's count is therefore cumulative: exactly the entries at or
//! before its recorded end. The post-processing below turns those cumulative
//! marks into exact per-shard counts.

use tracing::debug;

use crate::backend::{KeyRange, KeyValue, KeyValueStore, ScanIter, ScanOptions, Snapshot};
use crate::error::StoreResult;
use crate::key;

/// One shard of the entry key space: a contiguous range and the exact number
/// of entries it held in the planning snapshot.
pub(crate) struct Shard {
    pub range: KeyRange,
    pub count: i64,
}

/// A published shard table, pinned to the snapshot it was planned against.
/// Never mutated after publication.
pub(crate) struct ShardTable {
    pub shards: Vec<Shard>,
    pub snapshot: Box<dyn Snapshot>,
}

/// Cumulative position of one walker: entries visited and the last visited
/// key.
#[derive(Clone, Default)]
struct WalkMark {
    count: i64,
    end: Vec<u8>,
}

/// Plan a shard table for `num` shards against a fresh snapshot of `db`.
///
/// The caller validates `num >= 1`.
pub(crate) fn plan<D: KeyValueStore>(db: &D, num: u64) -> StoreResult<ShardTable> {
    let num = num as usize;
    let snapshot = db.snapshot()?;

    let mut walkers = Vec::with_capacity(num);
    for _ in 0..num {
        let iter = db.scan_prefix(
            key::ENTRY_KEY_PREFIX,
            ScanOptions::large(Some(snapshot.as_ref())),
        )?;
        walkers.push(GroupWalker::new(iter));
    }

    let mut marks = vec![WalkMark::default(); num];
    'walk: loop {
        for i in 0..num {
            for _ in 0..=i {
                if !walkers[i].advance_group(&mut marks[i])? {
                    // This walker drained the stream; its shard absorbs the
                    // universal end of the entry space.
                    marks[i].end = key::entry_key_space_end();
                    break 'walk;
                }
            }
        }
    }
    drop(walkers);

    let table = finish(marks, snapshot);
    debug!(
        shards = table.shards.len(),
        total = table.shards.iter().map(|s| s.count).sum::<i64>(),
        "planned shard table"
    );
    Ok(table)
}

/// Turn cumulative walk marks into a published table.
fn finish(mut marks: Vec<WalkMark>, snapshot: Box<dyn Snapshot>) -> ShardTable {
    let num = marks.len();

    // Walkers that never advanced (more shards than groups) or were
    // overtaken when the walk stopped mid-round sit behind their
    // predecessors; clamp them forward so boundaries stay monotone. The
    // drained walker carries the maximal count, so everything after it
    // inherits its position and becomes an empty trailing shard.
    for i in 1..num {
        if marks[i].count < marks[i - 1].count {
            marks[i].count = marks[i - 1].count;
            marks[i].end = marks[i - 1].end.clone();
        }
    }

    let total = marks[num - 1].count;
    let end_of_space = key::entry_key_space_end();
    if total == 0 {
        // Empty entry space: shard 0 covers all of it.
        let mut shards = vec![Shard {
            range: key::entry_key_space(),
            count: 0,
        }];
        shards.extend((1..num).map(|_| Shard {
            range: KeyRange::new(end_of_space.clone(), end_of_space.clone()),
            count: 0,
        }));
        return ShardTable { shards, snapshot };
    }

    marks[num - 1].end = end_of_space;

    // Chain each shard's start to its predecessor's end.
    let mut shards = Vec::with_capacity(num);
    let mut start = key::ENTRY_KEY_PREFIX.to_vec();
    for mark in marks {
        shards.push(Shard {
            range: KeyRange::new(start, mark.end.clone()),
            count: mark.count,
        });
        start = mark.end;
    }

    // Cumulative counts to per-shard counts.
    for i in (1..num).rev() {
        shards[i].count -= shards[i - 1].count;
    }

    // Boundary bookkeeping: every non-drained walker's cumulative count
    // includes the boundary key it pushed back, which lies in the next
    // shard's range. The differences cancel those out pairwise except at the
    // edges: shard 0 counted its boundary key (not in its range), and the
    // shard holding the universal end bound had its first key subtracted
    // away with its predecessor's cumulative count.
    shards[0].count -= 1;
    let last_covering = shards
        .iter()
        .rposition(|s| !s.range.is_empty())
        .unwrap_or(0);
    shards[last_covering].count += 1;

    ShardTable { shards, snapshot }
}

/// Walks an entry iterator one `(source, edge-kind)` group at a time.
struct GroupWalker<'a> {
    iter: ScanIter<'a>,
    /// The boundary key that ended the previous group walk, already counted,
    /// waiting to start the next one.
    pushback: Option<KeyValue>,
}

impl<'a> GroupWalker<'a> {
    fn new(iter: ScanIter<'a>) -> Self {
        Self {
            iter,
            pushback: None,
        }
    }

    /// Advance past one whole group. Returns `Ok(false)` when the stream is
    /// exhausted.
    fn advance_group(&mut self, mark: &mut WalkMark) -> StoreResult<bool> {
        let first_key = match self.pushback.take() {
            Some((key, _)) => key,
            None => match self.visit(mark)? {
                Some((key, _)) => key,
                None => return Ok(false),
            },
        };
        let prefix = key::group_prefix(&first_key)?.to_vec();
        loop {
            match self.visit(mark)? {
                None => return Ok(false),
                Some((key, value)) => {
                    if !key.starts_with(&prefix) {
                        self.pushback = Some((key, value));
                        return Ok(true);
                    }
                }
            }
        }
    }

    /// Pull one fresh entry, counting it and recording its key.
    fn visit(&mut self, mark: &mut WalkMark) -> StoreResult<Option<KeyValue>> {
        match self.iter.next().transpose()? {
            Some((key, value)) => {
                mark.count += 1;
                mark.end = key.clone();
                Ok(Some((key, value)))
            }
            None => Ok(None),
        }
    }
}
