use std::collections::VecDeque;

/// Fixed-capacity ring of recent samples.
#[derive(Clone, Debug)]
pub struct TimeSeries {
  samples: VecDeque<f32>,
  capacity: usize,
}

impl TimeSeries {
  pub fn new(capacity: usize) -> Self {
    Self {
      samples: VecDeque::with_capacity(capacity),
      capacity: capacity.max(1),
    }
  }

  /// Appends a sample, discarding the oldest when full.
  pub fn push(&mut self, value: f32) {
    if self.samples.len() == self.capacity {
      self.samples.pop_front();
    }
    self.samples.push_back(value);
  }

  pub fn len(&self) -> usize {
    self.samples.len()
  }

  pub fn is_empty(&self) -> bool {
    self.samples.is_empty()
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Most recent sample.
  pub fn current(&self) -> Option<f32> {
    self.samples.back().copied()
  }

  pub fn samples(&self) -> impl Iterator<Item = f32> + '_ {
    self.samples.iter().copied()
  }

  pub fn sum(&self) -> f32 {
    self.samples.iter().sum()
  }

  /// Mean of the held samples; 0 when empty.
  pub fn avg(&self) -> f32 {
    if self.samples.is_empty() {
      0.0
    } else {
      self.sum() / self.samples.len() as f32
    }
  }

  pub fn min(&self) -> f32 {
    self.samples.iter().copied().fold(f32::INFINITY, f32::min)
  }

  pub fn max(&self) -> f32 {
    self.samples.iter().copied().fold(f32::NEG_INFINITY, f32::max)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn oldest_sample_is_dropped_at_capacity() {
    let mut series = TimeSeries::new(3);
    for v in [1.0, 2.0, 3.0, 4.0] {
      series.push(v);
    }
    assert_eq!(series.samples().collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);
    assert_eq!(series.current(), Some(4.0));
    assert_eq!(series.avg(), 3.0);
    assert_eq!(series.min(), 2.0);
    assert_eq!(series.max(), 4.0);
  }

  #[test]
  fn empty_series_averages_zero() {
    let series = TimeSeries::new(8);
    assert!(series.is_empty());
    assert_eq!(series.avg(), 0.0);
    assert_eq!(series.current(), None);
  }
}
