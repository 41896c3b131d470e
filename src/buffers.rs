use std::collections::VecDeque;

use crate::sample::Sample;

/// Fixed-capacity sequence that drops its oldest element on overflow.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append `item`, returning whatever fell off the front.
    pub fn push(&mut self, item: T) -> Option<T> {
        self.items.push_back(item);
        if self.items.len() > self.capacity {
            self.items.pop_front()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

/// The last N samples, kept as three parallel columns for plotting.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    times: RingBuffer<String>,
    node1: RingBuffer<f64>,
    node2: RingBuffer<f64>,
}

impl SampleWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            times: RingBuffer::new(capacity),
            node1: RingBuffer::new(capacity),
            node2: RingBuffer::new(capacity),
        }
    }

    pub fn push(&mut self, sample: &Sample) {
        self.times.push(sample.timestamp.clone());
        self.node1.push(sample.node1);
        self.node2.push(sample.node2);
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &RingBuffer<String> {
        &self.times
    }

    pub fn node1(&self) -> &RingBuffer<f64> {
        &self.node1
    }

    pub fn node2(&self) -> &RingBuffer<f64> {
        &self.node2
    }
}
