// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Scheduled<T> {
    due: Instant,
    seq: u64,
    task: T,
}

/// Timer queue drained by the single UI loop. Tasks never cancel; equal deadlines
/// fire in scheduling order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredQueue<T> {
    entries: Vec<Scheduled<T>>,
    next_seq: u64,
}

impl<T> Default for DeferredQueue<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_seq: 0,
        }
    }
}

impl<T> DeferredQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, now: Instant, delay: Duration, task: T) {
        let due = now.checked_add(delay).unwrap_or(now);
        let seq = self.next_seq;
        self.next_seq += 1;
        let position = self
            .entries
            .partition_point(|entry| (entry.due, entry.seq) <= (due, seq));
        self.entries.insert(position, Scheduled { due, seq, task });
    }

    /// Removes and returns every task due at or before `now`, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<T> {
        let split = self.entries.partition_point(|entry| entry.due <= now);
        self.entries.drain(..split).map(|entry| entry.task).collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.first().map(|entry| entry.due)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
