/// Fixed-size window over the most recent mono samples of a stream.
///
/// The generator writes every block; analysers read the tail without
/// consuming it, so several readers can observe the same window.
///
/// Overflow behavior: the oldest samples are overwritten.
#[derive(Debug)]
pub struct SampleTap {
    buffer: Vec<f32>,
    write_index: usize,
    filled: usize,
}

impl SampleTap {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity.max(1)],
            write_index: 0,
            filled: 0,
        }
    }

    pub fn write(&mut self, samples: &[f32]) {
        let capacity = self.buffer.len();

        let samples = if samples.len() > capacity {
            &samples[samples.len() - capacity..]
        } else {
            samples
        };

        for &sample in samples {
            self.buffer[self.write_index] = sample;
            self.write_index = (self.write_index + 1) % capacity;
        }
        self.filled = (self.filled + samples.len()).min(capacity);
    }

    /// Copy of the newest `count` samples, oldest first.
    ///
    /// Returns fewer when the tap has not seen `count` samples yet.
    pub fn latest(&self, count: usize) -> Vec<f32> {
        let capacity = self.buffer.len();
        let count = count.min(self.filled);
        let start = (self.write_index + capacity - count) % capacity;
        (0..count).map(|i| self.buffer[(start + i) % capacity]).collect()
    }

    /// Samples currently held.
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_returns_tail_in_order() {
        let mut tap = SampleTap::new(8);
        tap.write(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        assert_eq!(tap.latest(3), vec![3.0, 4.0, 5.0]);
        assert_eq!(tap.len(), 5);
    }

    #[test]
    fn reads_do_not_consume() {
        let mut tap = SampleTap::new(4);
        tap.write(&[1.0, 2.0]);

        assert_eq!(tap.latest(2), tap.latest(2));
        assert_eq!(tap.len(), 2);
    }

    #[test]
    fn short_tap_returns_what_it_has() {
        let mut tap = SampleTap::new(10);
        tap.write(&[0.5, 0.25]);

        assert_eq!(tap.latest(6), vec![0.5, 0.25]);
    }

    #[test]
    fn wraparound_keeps_newest() {
        let mut tap = SampleTap::new(4);
        tap.write(&[1.0, 2.0, 3.0]);
        tap.write(&[4.0, 5.0, 6.0]);

        assert_eq!(tap.len(), 4);
        assert_eq!(tap.latest(4), vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn oversized_block_keeps_its_tail() {
        let mut tap = SampleTap::new(3);
        tap.write(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        assert_eq!(tap.latest(3), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn empty_write_leaves_tap_empty() {
        let mut tap = SampleTap::new(4);
        tap.write(&[]);

        assert!(tap.is_empty());
        assert!(tap.latest(4).is_empty());
    }
}
