//! Fixed-capacity segment ring buffer.

use crate::error::PlannerError;

use super::segment::MotionSegment;

/// Default number of buffered segments.
pub const SEGMENT_QUEUE_CAPACITY: usize = 18;

/// Index-based ring buffer of planned segments.
///
/// Logical index 0 is the oldest segment. Slots are reused in place and the
/// buffer never grows; pushing onto a full queue fails.
#[derive(Debug, Clone)]
pub struct SegmentQueue<const N: usize = SEGMENT_QUEUE_CAPACITY> {
    slots: [MotionSegment; N],
    /// Physical index of the oldest segment.
    tail: usize,
    len: usize,
}

impl<const N: usize> Default for SegmentQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SegmentQueue<N> {
    /// Create an empty queue.
    pub const fn new() -> Self {
        Self {
            slots: [MotionSegment::EMPTY; N],
            tail: 0,
            len: 0,
        }
    }

    /// Maximum number of segments.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of queued segments.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if no segment is queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if the queue is at capacity.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Append a segment.
    ///
    /// # Errors
    ///
    /// Returns `QueueFull` if the queue is at capacity.
    pub fn push(&mut self, segment: MotionSegment) -> Result<(), PlannerError> {
        if self.is_full() {
            return Err(PlannerError::QueueFull);
        }
        let head = self.physical(self.len);
        self.slots[head] = segment;
        self.len += 1;
        Ok(())
    }

    /// Remove and return the oldest segment.
    pub fn pop(&mut self) -> Option<MotionSegment> {
        if self.is_empty() {
            return None;
        }
        let segment = self.slots[self.tail];
        self.tail = (self.tail + 1) % N;
        self.len -= 1;
        Some(segment)
    }

    /// Segment at logical `index`.
    pub fn get(&self, index: usize) -> Option<&MotionSegment> {
        if index < self.len {
            Some(&self.slots[self.physical(index)])
        } else {
            None
        }
    }

    /// Mutable segment at logical `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut MotionSegment> {
        if index < self.len {
            let slot = self.physical(index);
            Some(&mut self.slots[slot])
        } else {
            None
        }
    }

    /// Oldest segment.
    #[inline]
    pub fn front(&self) -> Option<&MotionSegment> {
        self.get(0)
    }

    /// Newest segment.
    #[inline]
    pub fn back(&self) -> Option<&MotionSegment> {
        self.len.checked_sub(1).and_then(|i| self.get(i))
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &MotionSegment> + '_ {
        (0..self.len).map(move |i| &self.slots[self.physical(i)])
    }

    /// Drop every segment.
    pub fn clear(&mut self) {
        self.tail = 0;
        self.len = 0;
    }

    #[inline]
    fn physical(&self, index: usize) -> usize {
        (self.tail + index) % N
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(count: u32) -> MotionSegment {
        MotionSegment {
            step_event_count: count,
            ..MotionSegment::EMPTY
        }
    }

    #[test]
    fn test_fifo_order_across_wrap() {
        let mut queue: SegmentQueue<3> = SegmentQueue::new();

        for round in 0..4u32 {
            queue.push(segment(round * 10 + 1)).unwrap();
            queue.push(segment(round * 10 + 2)).unwrap();
            assert_eq!(queue.pop().unwrap().step_event_count, round * 10 + 1);
            assert_eq!(queue.pop().unwrap().step_event_count, round * 10 + 2);
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_full_queue_rejects() {
        let mut queue: SegmentQueue<2> = SegmentQueue::new();
        queue.push(segment(1)).unwrap();
        queue.push(segment(2)).unwrap();

        assert!(queue.is_full());
        assert_eq!(queue.push(segment(3)), Err(PlannerError::QueueFull));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_logical_indexing() {
        let mut queue: SegmentQueue<4> = SegmentQueue::new();
        for i in 1..=4 {
            queue.push(segment(i)).unwrap();
        }
        queue.pop();
        queue.push(segment(5)).unwrap();

        assert_eq!(queue.front().unwrap().step_event_count, 2);
        assert_eq!(queue.back().unwrap().step_event_count, 5);
        assert_eq!(queue.get(2).unwrap().step_event_count, 4);
        assert!(queue.get(4).is_none());

        queue.get_mut(1).unwrap().entry_speed = 42.0;
        let speeds: Vec<f32> = queue.iter().map(|s| s.entry_speed).collect();
        assert_eq!(speeds, [0.0, 42.0, 0.0, 0.0]);
    }

    #[test]
    fn test_clear() {
        let mut queue: SegmentQueue<2> = SegmentQueue::new();
        queue.push(segment(1)).unwrap();
        queue.clear();
        assert!(queue.is_empty());
        assert!(queue.pop().is_none());
    }
}
