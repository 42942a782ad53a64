//! Identifier generation
//!
//! Document ids, index row ids and query parameter names are all drawn from
//! an injected `IdGenerator`, never from a global source, so tests can run
//! against a deterministic sequence.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Source of fresh unique identifiers
pub trait IdGenerator {
    /// Returns an identifier never returned before by this generator
    fn next_id(&self) -> String;
}

/// Random UUID v4 identifiers in 32-char simple form
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

/// Deterministic identifiers: 32 hex digits counting up from a start value
#[derive(Debug)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    /// Counts up from 1
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Counts up from `start`
    pub fn starting_at(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{:032x}", n)
    }
}

impl<G: IdGenerator + ?Sized> IdGenerator for &G {
    fn next_id(&self) -> String {
        (**self).next_id()
    }
}
