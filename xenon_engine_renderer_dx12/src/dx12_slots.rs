/// Slot ranges of a shader-visible descriptor heap
///
/// Only one CBV/SRV/UAV heap and one sampler heap can be bound at a time, so
/// every descriptor carves its tables out of two device-wide heaps.
/// `SlotAllocator` hands out contiguous ranges first-fit and merges freed
/// neighbours back together.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotAllocator {
    capacity: u32,
    /// Free ranges as (start, length), sorted by start and never adjacent
    free: Vec<(u32, u32)>,
}

impl SlotAllocator {
    pub fn new(capacity: u32) -> Self {
        let free = if capacity > 0 { vec![(0, capacity)] } else { Vec::new() };
        Self { capacity, free }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Slots not handed out
    pub fn available(&self) -> u32 {
        self.free.iter().map(|(_, length)| length).sum()
    }

    /// Reserve `count` contiguous slots, returning the first one
    ///
    /// A zero count always succeeds with slot 0 and reserves nothing.
    pub fn allocate(&mut self, count: u32) -> Option<u32> {
        if count == 0 {
            return Some(0);
        }
        let index = self.free.iter().position(|(_, length)| *length >= count)?;
        let (start, length) = self.free[index];
        if length == count {
            self.free.remove(index);
        } else {
            self.free[index] = (start + count, length - count);
        }
        Some(start)
    }

    /// Return a range previously handed out by `allocate`
    pub fn release(&mut self, start: u32, count: u32) {
        if count == 0 {
            return;
        }
        let index = self.free.partition_point(|(free_start, _)| *free_start < start);
        self.free.insert(index, (start, count));

        // Merge with the following range, then with the preceding one
        if index + 1 < self.free.len() {
            let (next_start, next_length) = self.free[index + 1];
            if start + count == next_start {
                self.free[index].1 += next_length;
                self.free.remove(index + 1);
            }
        }
        if index > 0 {
            let (previous_start, previous_length) = self.free[index - 1];
            if previous_start + previous_length == start {
                self.free[index - 1].1 += self.free[index].1;
                self.free.remove(index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocations_are_contiguous_and_disjoint() {
        let mut slots = SlotAllocator::new(16);
        assert_eq!(slots.allocate(4), Some(0));
        assert_eq!(slots.allocate(3), Some(4));
        assert_eq!(slots.available(), 9);
    }

    #[test]
    fn test_exhaustion_returns_none() {
        let mut slots = SlotAllocator::new(4);
        assert_eq!(slots.allocate(4), Some(0));
        assert_eq!(slots.allocate(1), None);
        assert_eq!(SlotAllocator::new(0).allocate(1), None);
    }

    #[test]
    fn test_zero_count_reserves_nothing() {
        let mut slots = SlotAllocator::new(2);
        assert_eq!(slots.allocate(0), Some(0));
        assert_eq!(slots.available(), 2);
    }

    #[test]
    fn test_released_ranges_merge_back() {
        let mut slots = SlotAllocator::new(12);
        let a = slots.allocate(4).unwrap();
        let b = slots.allocate(4).unwrap();
        let c = slots.allocate(4).unwrap();

        slots.release(a, 4);
        slots.release(c, 4);
        // Fragmented: no room for 8 contiguous slots yet
        assert_eq!(slots.allocate(8), None);

        slots.release(b, 4);
        assert_eq!(slots.available(), 12);
        assert_eq!(slots.allocate(12), Some(0));
    }

    #[test]
    fn test_first_fit_reuses_holes() {
        let mut slots = SlotAllocator::new(10);
        let a = slots.allocate(2).unwrap();
        let _b = slots.allocate(2).unwrap();
        slots.release(a, 2);
        assert_eq!(slots.allocate(1), Some(0));
        assert_eq!(slots.allocate(1), Some(1));
        assert_eq!(slots.allocate(1), Some(4));
    }
}
