//! Weighted reservoir sampling (Efraimidis–Spirakis A-Res)

use rand::Rng;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

struct Keyed<T> {
    key: f64,
    item: T,
}

impl<T> PartialEq for Keyed<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key.total_cmp(&other.key) == Ordering::Equal
    }
}

impl<T> Eq for Keyed<T> {}

impl<T> PartialOrd for Keyed<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Keyed<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.total_cmp(&other.key)
    }
}

/// Fixed-size sample where inclusion probability grows with weight
///
/// Each offered item gets the key `ln(u) / weight` for `u` uniform in
/// `(0, 1)`; the reservoir keeps the `capacity` largest keys in a min-heap,
/// so memory stays bounded by the capacity regardless of population size.
pub struct WeightedReservoir<T> {
    capacity: usize,
    heap: BinaryHeap<Reverse<Keyed<T>>>,
}

/// Slots reserved up front; the heap grows past this on demand
const PREALLOCATED_SLOTS: usize = 64;

impl<T> WeightedReservoir<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity.min(PREALLOCATED_SLOTS)),
        }
    }

    /// Offer an item; returns whether it is currently retained
    ///
    /// Items with zero weight are never retained.
    pub fn offer<R: Rng + ?Sized>(&mut self, item: T, weight: u64, rng: &mut R) -> bool {
        if self.capacity == 0 || weight == 0 {
            return false;
        }

        let u = loop {
            let u: f64 = rng.random();
            if u > 0.0 {
                break u;
            }
        };
        let key = u.ln() / weight as f64;

        if self.heap.len() < self.capacity {
            self.heap.push(Reverse(Keyed { key, item }));
            return true;
        }

        match self.heap.peek() {
            Some(Reverse(smallest)) if key > smallest.key => {
                self.heap.pop();
                self.heap.push(Reverse(Keyed { key, item }));
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Retained items, in no particular order
    pub fn into_items(self) -> Vec<T> {
        self.heap
            .into_vec()
            .into_iter()
            .map(|Reverse(keyed)| keyed.item)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_huge_capacity_allocates_lazily() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut reservoir = WeightedReservoir::new(usize::MAX);
        for i in 0..200u64 {
            assert!(reservoir.offer(i, 10, &mut rng));
        }
        assert_eq!(reservoir.len(), 200);
    }

    #[test]
    fn test_keeps_at_most_capacity() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut reservoir = WeightedReservoir::new(5);
        for i in 0..100u64 {
            reservoir.offer(i, i + 1, &mut rng);
        }
        assert_eq!(reservoir.len(), 5);
        assert_eq!(reservoir.into_items().len(), 5);
    }

    #[test]
    fn test_small_population_is_kept_whole() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut reservoir = WeightedReservoir::new(10);
        for i in 0..3u64 {
            assert!(reservoir.offer(i, 100, &mut rng));
        }
        let mut items = reservoir.into_items();
        items.sort_unstable();
        assert_eq!(items, vec![0, 1, 2]);
    }

    #[test]
    fn test_zero_weight_and_zero_capacity() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut reservoir = WeightedReservoir::new(4);
        assert!(!reservoir.offer("empty", 0, &mut rng));
        assert!(reservoir.is_empty());

        let mut none = WeightedReservoir::new(0);
        assert!(!none.offer("file", 10, &mut rng));
        assert!(none.is_empty());
    }

    #[test]
    fn test_selection_favours_large_weights() {
        // One 10 MB file among 99 files of 10 KB, ten slots per trial.
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut large_selected = 0;

        for _ in 0..1000 {
            let mut reservoir = WeightedReservoir::new(10);
            reservoir.offer("large", 10 * 1024 * 1024, &mut rng);
            for _ in 0..99 {
                reservoir.offer("small", 10 * 1024, &mut rng);
            }
            if reservoir.into_items().contains(&"large") {
                large_selected += 1;
            }
        }

        assert!(
            large_selected > 950,
            "large file selected in only {large_selected} of 1000 trials"
        );
    }

    #[test]
    fn test_equal_weights_are_roughly_uniform() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut hits = [0u32; 4];

        for _ in 0..4000 {
            let mut reservoir = WeightedReservoir::new(1);
            for i in 0..4usize {
                reservoir.offer(i, 1, &mut rng);
            }
            for i in reservoir.into_items() {
                hits[i] += 1;
            }
        }

        for count in hits {
            assert!((700..=1300).contains(&count), "skewed hits: {hits:?}");
        }
    }
}
