//! FIFO of grid positions awaiting constraint propagation.
//!
//! A plain `VecDeque` rather than a stack with set-based dedup: no dedup is
//! required here, since propagation is idempotent on cells whose masks did
//! not shrink (re-processing a cell twice does no harm, it just does no
//! work).

use std::collections::VecDeque;

#[derive(Default)]
pub struct Queue {
    inner: VecDeque<(usize, usize)>,
}

impl Queue {
    pub fn new() -> Self {
        Queue {
            inner: VecDeque::new(),
        }
    }

    pub fn enqueue(&mut self, pos: (usize, usize)) {
        self.inner.push_back(pos);
    }

    pub fn dequeue(&mut self) -> Option<(usize, usize)> {
        self.inner.pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let mut q = Queue::new();
        q.enqueue((0, 0));
        q.enqueue((1, 1));
        q.enqueue((2, 2));
        assert_eq!(q.len(), 3);
        assert_eq!(q.dequeue(), Some((0, 0)));
        assert_eq!(q.dequeue(), Some((1, 1)));
        assert_eq!(q.len(), 1);
        assert_eq!(q.dequeue(), Some((2, 2)));
        assert_eq!(q.dequeue(), None);
        assert!(q.is_empty());
    }
}
