// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Pending options buffer and dimension scratch table.
//!
//! Options accumulate between directive calls and are consumed when the
//! entity they attach to completes. In aggregate context they attach to
//! the previously completed member, so the buffer survives until the
//! next member opens. Entry parameters consume only their own option
//! kinds and leave entry-level options for the ENTRY call.

use crate::core::model::Dimension;
use crate::core::types::{Radix, TypeRef};

/// One accumulated option.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingOption {
    Align,
    NoAlign,
    BaseAlign(i64),
    Dimension(usize),
    Length(i64),
    Mask,
    Signed,
    Common,
    Global,
    Typedef,
    Fill,
    Prefix(String),
    Tag(String),
    Based(String),
    Marker(String),
    Origin(String),
    Counter(String),
    Increment(i64),
    Radix(Radix),
    Enumerate(String),
    TypeName(String),
    Alias(String),
    Linkage(String),
    Variable,
    ReturnsType(TypeRef, bool),
    ReturnsNamed(String),
    Named(String),
    In,
    Out,
    Default(i64),
    Optional,
    List,
    SubType(TypeRef),
}

/// Growable buffer of pending options.
#[derive(Debug, Default)]
pub struct OptionList {
    options: Vec<PendingOption>,
}

impl OptionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, option: PendingOption) {
        self.options.push(option);
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Take every pending option, leaving the buffer empty.
    pub fn drain(&mut self) -> Vec<PendingOption> {
        std::mem::take(&mut self.options)
    }

    /// Take only the options `matches` selects, preserving the rest in
    /// order. Parameters use this so entry-level options stay queued.
    pub fn take_matching<F>(&mut self, matches: F) -> Vec<PendingOption>
    where
        F: Fn(&PendingOption) -> bool,
    {
        let mut taken = Vec::new();
        let mut kept = Vec::new();
        for option in self.options.drain(..) {
            if matches(&option) {
                taken.push(option);
            } else {
                kept.push(option);
            }
        }
        self.options = kept;
        taken
    }

    pub fn clear(&mut self) {
        self.options.clear();
    }
}

/// Named dimension records referenced by index from Dimension options.
#[derive(Debug, Default)]
pub struct DimensionTable {
    slots: Vec<Option<Dimension>>,
}

impl DimensionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bound pair and return its slot index.
    pub fn insert(&mut self, lbound: i64, hbound: i64) -> usize {
        let dimension = Dimension { lbound, hbound };
        if let Some(idx) = self.slots.iter().position(Option::is_none) {
            self.slots[idx] = Some(dimension);
            idx
        } else {
            self.slots.push(Some(dimension));
            self.slots.len() - 1
        }
    }

    /// Consume the slot, freeing it for reuse.
    pub fn take(&mut self, idx: usize) -> Option<Dimension> {
        self.slots.get_mut(idx).and_then(Option::take)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_matching_preserves_the_rest() {
        let mut list = OptionList::new();
        list.push(PendingOption::Alias("ext".to_string()));
        list.push(PendingOption::In);
        list.push(PendingOption::Named("fd".to_string()));
        let taken = list.take_matching(|o| {
            matches!(o, PendingOption::In | PendingOption::Named(_))
        });
        assert_eq!(taken.len(), 2);
        let rest = list.drain();
        assert_eq!(rest, vec![PendingOption::Alias("ext".to_string())]);
    }

    #[test]
    fn dimension_slots_recycle_after_take() {
        let mut dims = DimensionTable::new();
        let a = dims.insert(1, 10);
        assert_eq!(dims.take(a), Some(Dimension { lbound: 1, hbound: 10 }));
        assert_eq!(dims.take(a), None);
        let b = dims.insert(0, 3);
        assert_eq!(b, a, "freed slot is reused");
    }
}
