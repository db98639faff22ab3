use parking_lot::Mutex;
use ringbuf::{traits::*, HeapRb};
use std::sync::Arc;

/// Shared sample tap between the capture callback and the silence detector.
///
/// The capture callback writes every mono frame it sees; the detector drains
/// whatever has accumulated since its last polling tick. When the tap
/// overflows the oldest samples are dropped, which only ever loses level
/// history the detector was too slow to look at.
pub struct LevelTap {
    buffer: Arc<Mutex<HeapRb<f32>>>,
}

impl LevelTap {
    /// Create a tap holding up to `capacity` samples
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(HeapRb::new(capacity))),
        }
    }

    /// Write samples, evicting the oldest on overflow
    pub fn write(&self, samples: &[f32]) {
        let mut buffer = self.buffer.lock();
        for &sample in samples {
            if buffer.try_push(sample).is_err() {
                let _ = buffer.try_pop();
                let _ = buffer.try_push(sample);
            }
        }
    }

    /// Take every sample accumulated since the last drain
    pub fn drain(&self) -> Vec<f32> {
        let mut buffer = self.buffer.lock();
        let mut samples = Vec::with_capacity(buffer.occupied_len());
        while let Some(sample) = buffer.try_pop() {
            samples.push(sample);
        }
        samples
    }

    /// Number of samples waiting to be drained
    pub fn len(&self) -> usize {
        self.buffer.lock().occupied_len()
    }

    /// Check if the tap is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }

    /// Get the capacity of the tap
    pub fn capacity(&self) -> usize {
        self.buffer.lock().capacity().get()
    }
}

impl Clone for LevelTap {
    fn clone(&self) -> Self {
        Self {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_drain() {
        let tap = LevelTap::new(1024);
        let data: Vec<f32> = (0..100).map(|i| i as f32).collect();

        tap.write(&data);
        assert_eq!(tap.len(), 100);
        assert_eq!(tap.capacity(), 1024);

        let drained = tap.drain();
        assert_eq!(drained, data);
        assert!(tap.is_empty());
    }

    #[test]
    fn test_overflow_keeps_newest() {
        let tap = LevelTap::new(10);
        let data: Vec<f32> = (0..20).map(|i| i as f32).collect();

        tap.write(&data);
        let drained = tap.drain();

        assert_eq!(drained.len(), 10);
        assert_eq!(drained[9], 19.0);
    }

    #[test]
    fn test_shared_between_clones() {
        let tap = LevelTap::new(16);
        let writer = tap.clone();

        writer.write(&[0.5, 0.25]);
        assert_eq!(tap.drain(), vec![0.5, 0.25]);
    }
}
