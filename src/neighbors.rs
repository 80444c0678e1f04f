use ordered_float::OrderedFloat;
use std::collections::BinaryHeap;

/// Bounded max-heap holding the best `k` candidates seen so far.
pub(crate) struct Neighbors {
    k: usize,
    heap: BinaryHeap<(OrderedFloat<f64>, usize)>,
}

impl Neighbors {
    pub(crate) fn new(k: usize) -> Self {
        Neighbors {
            k,
            heap: BinaryHeap::with_capacity(k + 1),
        }
    }

    pub(crate) fn push(&mut self, distance: f64, id: usize) {
        if self.k == 0 {
            return;
        }
        if self.heap.len() < self.k {
            self.heap.push((OrderedFloat(distance), id));
        } else if distance < self.kth_distance() {
            self.heap.push((OrderedFloat(distance), id));
            self.heap.pop();
        }
    }

    pub(crate) fn is_full(&self) -> bool {
        self.heap.len() == self.k
    }

    /// Distance of the current `k`-th candidate, infinite until the heap is full.
    pub(crate) fn kth_distance(&self) -> f64 {
        if !self.is_full() {
            return f64::INFINITY;
        }
        self.heap.peek().map_or(f64::INFINITY, |(distance, _)| distance.0)
    }

    /// Identifiers ordered by non-decreasing distance, ties by identifier.
    pub(crate) fn into_ids(self) -> Vec<usize> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|(_, id)| id)
            .collect()
    }
}
