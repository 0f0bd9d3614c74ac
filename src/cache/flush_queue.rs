// # Write-Coalescing Queue
//
// Ordered set of contiguous dirty-page runs awaiting batched flush. Blocks
// pushed one page at a time are merged into batches; a batch is later
// popped whole and submitted as one vectorised write.

use std::collections::VecDeque;

/// A run of pages with contiguous ids, queued for a single gather write.
///
/// `lines[k]` is the cacheline holding page `first_id + k`.
#[derive(Debug)]
pub(crate) struct Batch {
    pub first_id: u32,
    pub lines: VecDeque<usize>,
}

impl Batch {
    fn single(id: u32, line: usize) -> Self {
        let mut lines = VecDeque::with_capacity(4);
        lines.push_back(line);
        Self {
            first_id: id,
            lines,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[inline]
    pub fn last_id(&self) -> u32 {
        self.first_id + self.lines.len() as u32 - 1
    }

    #[inline]
    fn contains(&self, id: u32) -> bool {
        (self.first_id..=self.last_id()).contains(&id)
    }
}

/// Ordered queue of disjoint batches, sorted by first id, with adjacent
/// batches always at least two ids apart (a gap of one would have merged).
#[derive(Debug, Default)]
pub(crate) struct FlushQueue {
    batches: VecDeque<Batch>,
}

impl FlushQueue {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Number of queued batches.
    #[inline]
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// Total number of queued blocks across all batches.
    pub fn blocks(&self) -> usize {
        self.batches.iter().map(Batch::len).sum()
    }

    /// Queue one block, merging it with any run it extends or bridges.
    /// Pushing an id that is already queued is a no-op.
    pub fn push_block(&mut self, id: u32, line: usize) {
        for i in 0..self.batches.len() {
            if id + 1 == self.batches[i].first_id {
                self.batches[i].lines.push_front(line);
                self.batches[i].first_id = id;
                // The extended batch may now touch its left neighbour.
                if i > 0 && self.batches[i - 1].last_id() + 1 == id {
                    let right = self.batches.remove(i).unwrap();
                    self.batches[i - 1].lines.extend(right.lines);
                }
                return;
            }
            if self.batches[i].last_id() + 1 == id {
                self.batches[i].lines.push_back(line);
                // Appending may bridge the gap to the right neighbour.
                if i + 1 < self.batches.len() && self.batches[i + 1].first_id == id + 1 {
                    let right = self.batches.remove(i + 1).unwrap();
                    self.batches[i].lines.extend(right.lines);
                }
                return;
            }
            if self.batches[i].contains(id) {
                debug_assert_eq!(
                    self.batches[i].lines[(id - self.batches[i].first_id) as usize],
                    line
                );
                return;
            }
            if id < self.batches[i].first_id {
                self.batches.insert(i, Batch::single(id, line));
                return;
            }
        }
        self.batches.push_back(Batch::single(id, line));
    }

    /// Remove and return the head batch.
    pub fn pop_front(&mut self) -> Option<Batch> {
        self.batches.pop_front()
    }

    /// Un-queue the block for `id`, splitting its batch when interior.
    /// Returns the cacheline that was queued for it.
    pub fn remove(&mut self, id: u32) -> Option<usize> {
        let i = self.batches.iter().position(|b| b.contains(id))?;
        let batch = &mut self.batches[i];

        if batch.len() == 1 {
            let line = batch.lines[0];
            self.batches.remove(i);
            return Some(line);
        }
        if id == batch.first_id {
            batch.first_id += 1;
            return batch.lines.pop_front();
        }
        if id == batch.last_id() {
            return batch.lines.pop_back();
        }

        // Interior: split into [first..id) and (id..last].
        let split_at = (id - batch.first_id) as usize;
        let mut tail = batch.lines.split_off(split_at);
        let line = tail.pop_front();
        let right = Batch {
            first_id: id + 1,
            lines: tail,
        };
        self.batches.insert(i + 1, right);
        Some(line.expect("interior block exists"))
    }

    /// Iterate `(first_id, len)` pairs in queue order.
    #[cfg(test)]
    pub fn runs(&self) -> impl Iterator<Item = (u32, usize)> + '_ {
        self.batches.iter().map(|b| (b.first_id, b.len()))
    }

    #[cfg(test)]
    pub fn assert_well_formed(&self) {
        for pair in self.batches.iter().zip(self.batches.iter().skip(1)) {
            assert!(
                pair.0.last_id() + 2 <= pair.1.first_id,
                "batches must be sorted, disjoint and non-adjacent"
            );
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn runs(queue: &FlushQueue) -> Vec<(u32, usize)> {
        queue.runs().collect()
    }

    #[test]
    fn out_of_order_pushes_coalesce_into_one_batch() {
        let mut queue = FlushQueue::new();
        queue.push_block(3, 30);
        queue.push_block(4, 40);
        queue.push_block(2, 20);
        queue.push_block(5, 50);
        queue.assert_well_formed();

        assert_eq!(runs(&queue), vec![(2, 4)]);
        let batch = queue.pop_front().unwrap();
        assert_eq!(batch.first_id, 2);
        assert_eq!(batch.lines, [20, 30, 40, 50]);
        assert!(queue.is_empty());
    }

    #[test]
    fn bridge_push_concatenates_neighbours() {
        let mut queue = FlushQueue::new();
        queue.push_block(1, 1);
        queue.push_block(3, 3);
        assert_eq!(runs(&queue), vec![(1, 1), (3, 1)]);

        queue.push_block(2, 2);
        queue.assert_well_formed();
        assert_eq!(runs(&queue), vec![(1, 3)]);
        assert_eq!(queue.pop_front().unwrap().lines, [1, 2, 3]);
    }

    #[test]
    fn prepend_merges_with_left_neighbour() {
        let mut queue = FlushQueue::new();
        queue.push_block(1, 1);
        queue.push_block(4, 4);
        queue.push_block(5, 5);
        // 3 prepends onto {4,5}; the gap to {1} stays at two ids.
        queue.push_block(3, 3);
        queue.assert_well_formed();
        assert_eq!(runs(&queue), vec![(1, 1), (3, 3)]);

        // 2 closes the gap and bridges {1} with {3,4,5}.
        queue.push_block(2, 2);
        queue.assert_well_formed();
        assert_eq!(runs(&queue), vec![(1, 5)]);
    }

    #[test]
    fn duplicate_push_is_a_no_op() {
        let mut queue = FlushQueue::new();
        queue.push_block(7, 70);
        queue.push_block(8, 80);
        queue.push_block(7, 70);
        queue.push_block(8, 80);
        assert_eq!(runs(&queue), vec![(7, 2)]);
        assert_eq!(queue.blocks(), 2);
    }

    #[test]
    fn disjoint_runs_stay_sorted() {
        let mut queue = FlushQueue::new();
        queue.push_block(9, 9);
        queue.push_block(0, 0);
        queue.push_block(5, 5);
        queue.assert_well_formed();
        assert_eq!(runs(&queue), vec![(0, 1), (5, 1), (9, 1)]);
    }

    #[test]
    fn remove_head_tail_and_singleton() {
        let mut queue = FlushQueue::new();
        for id in 2..=5 {
            queue.push_block(id, id as usize * 10);
        }
        assert_eq!(queue.remove(2), Some(20));
        assert_eq!(runs(&queue), vec![(3, 3)]);
        assert_eq!(queue.remove(5), Some(50));
        assert_eq!(runs(&queue), vec![(3, 2)]);

        assert_eq!(queue.remove(9), None);

        let mut single = FlushQueue::new();
        single.push_block(1, 1);
        assert_eq!(single.remove(1), Some(1));
        assert!(single.is_empty());
    }

    #[test]
    fn remove_interior_splits_batch() {
        let mut queue = FlushQueue::new();
        for id in 10..=14 {
            queue.push_block(id, id as usize);
        }
        assert_eq!(queue.remove(12), Some(12));
        queue.assert_well_formed();
        assert_eq!(runs(&queue), vec![(10, 2), (13, 2)]);
        assert_eq!(queue.pop_front().unwrap().lines, [10, 11]);
        assert_eq!(queue.pop_front().unwrap().lines, [13, 14]);
    }
}
