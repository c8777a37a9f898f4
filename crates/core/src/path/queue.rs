use fnv::FnvHashMap;
use std::{
    cmp::{Ordering, Reverse},
    collections::{BTreeSet, BinaryHeap},
};

/// Priority of a node in an open set. Floats aren't `Ord`, so this orders
/// by IEEE total order, which agrees with `<` for every score a search can
/// produce (non-negative, possibly infinite, never NaN).
#[derive(Copy, Clone, Debug)]
struct Score(f64);

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// The frontier of a best-first search. Nodes are ordered by `(score, id)`,
/// so ties always resolve toward the lower ID and a search's result never
/// depends on insertion order.
pub trait OpenSet: Default {
    /// Insert a node, or replace its score if it's already in the set. The
    /// search only ever replaces a score with a lower one (decrease-key).
    fn push(&mut self, id: usize, score: f64);

    /// Remove and return the node with the lowest `(score, id)`
    fn pop(&mut self) -> Option<(usize, f64)>;

    /// Number of distinct nodes in the set
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An open set backed by an ordered tree. Decrease-key removes the old entry
/// and inserts the new one, so the tree never holds stale entries. Fine for
/// small searches, but every operation pays for tree rebalancing.
#[derive(Debug, Default)]
pub struct SortedOpenSet {
    entries: BTreeSet<(Score, usize)>,
    scores: FnvHashMap<usize, Score>,
}

impl OpenSet for SortedOpenSet {
    fn push(&mut self, id: usize, score: f64) {
        let score = Score(score);
        if let Some(old) = self.scores.insert(id, score) {
            self.entries.remove(&(old, id));
        }
        self.entries.insert((score, id));
    }

    fn pop(&mut self) -> Option<(usize, f64)> {
        let first = *self.entries.iter().next()?;
        self.entries.remove(&first);
        let (Score(score), id) = first;
        self.scores.remove(&id);
        Some((id, score))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// An open set backed by a binary heap. Decrease-key pushes a fresh entry
/// and leaves the old one in the heap; stale entries are recognized by
/// their score no longer matching the node's current score, and skipped on
/// pop. This trades some memory for much cheaper updates.
#[derive(Debug, Default)]
pub struct HeapOpenSet {
    heap: BinaryHeap<Reverse<(Score, usize)>>,
    scores: FnvHashMap<usize, Score>,
}

impl OpenSet for HeapOpenSet {
    fn push(&mut self, id: usize, score: f64) {
        let score = Score(score);
        self.scores.insert(id, score);
        self.heap.push(Reverse((score, id)));
    }

    fn pop(&mut self) -> Option<(usize, f64)> {
        while let Some(Reverse((score, id))) = self.heap.pop() {
            match self.scores.get(&id) {
                Some(current) if *current == score => {
                    self.scores.remove(&id);
                    return Some((id, score.0));
                }
                // Superseded by a later push, or already popped
                _ => {}
            }
        }
        None
    }

    fn len(&self) -> usize {
        self.scores.len()
    }
}
