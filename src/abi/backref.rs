//! Back-reference tables shared by the Itanium and MSVC encoders.
//!
//! Entries are appended in first-encounter order and never removed. A
//! bounded table keeps answering lookups once full but stops growing.

/// Ordered list of previously emitted entities.
#[derive(Debug, Clone)]
pub(crate) struct BackRefTable<T> {
    entries: Vec<T>,
    capacity: Option<usize>,
}

impl<T: PartialEq> BackRefTable<T> {
    pub(crate) fn unbounded() -> Self {
        Self {
            entries: Vec::new(),
            capacity: None,
        }
    }

    pub(crate) fn bounded(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity: Some(capacity),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_full(&self) -> bool {
        self.capacity
            .is_some_and(|capacity| self.entries.len() >= capacity)
    }

    pub(crate) fn position(&self, item: &T) -> Option<usize> {
        self.entries.iter().position(|entry| entry == item)
    }

    /// Append `item`; returns its index, or `None` when the table is full.
    pub(crate) fn push(&mut self, item: T) -> Option<usize> {
        if self.is_full() {
            return None;
        }
        self.entries.push(item);
        Some(self.entries.len() - 1)
    }

    /// Index of an existing entry equal to `item`; otherwise records `item`
    /// if there is room and returns `None`.
    pub(crate) fn check_and_save(&mut self, item: T) -> Option<usize> {
        if let Some(index) = self.position(&item) {
            return Some(index);
        }
        self.push(item);
        None
    }

    /// Record `item` unless it is already present.
    pub(crate) fn save(&mut self, item: T) {
        if self.position(&item).is_none() {
            self.push(item);
        }
    }
}
