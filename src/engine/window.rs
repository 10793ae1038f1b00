use std::collections::VecDeque;

use crate::input::Candle;

/// Most recent candles for one asset, up to a fixed capacity.
///
/// The window is either filling up or exactly full. Once full, every push evicts the oldest
/// candle.
#[derive(Clone, Debug)]
pub struct SlidingWindow {
    capacity: usize,
    inner: VecDeque<Candle>,
}

impl SlidingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: VecDeque::with_capacity(capacity + 1),
        }
    }

    pub fn push(&mut self, candle: Candle) {
        self.inner.push_back(candle);
        while self.inner.len() > self.capacity {
            self.inner.pop_front();
        }
    }

    pub fn is_full(&self) -> bool {
        self.capacity > 0 && self.inner.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Candles oldest first.
    pub fn candles(&mut self) -> &[Candle] {
        self.inner.make_contiguous()
    }

    pub fn latest(&self) -> Option<&Candle> {
        self.inner.back()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::SlidingWindow;
    use crate::input::Candle;

    #[test]
    fn test_that_window_evicts_oldest_once_full() {
        let mut window = SlidingWindow::new(3);
        window.push(Candle::flat(1, 1.0));
        window.push(Candle::flat(2, 2.0));
        assert!(!window.is_full());

        window.push(Candle::flat(3, 3.0));
        assert!(window.is_full());

        window.push(Candle::flat(4, 4.0));
        assert!(window.is_full());
        let closes: Vec<f64> = window.candles().iter().map(|c| c.close).collect();
        assert_eq!(closes, vec![2.0, 3.0, 4.0]);
        assert_eq!(*window.latest().unwrap().timestamp, 4);
    }

    #[test]
    fn test_that_zero_capacity_window_is_never_full() {
        let mut window = SlidingWindow::new(0);
        window.push(Candle::flat(1, 1.0));
        assert!(!window.is_full());
        assert!(window.is_empty());
    }
}
