//! Data-section literal interning
//!
//! Strings and floats share one `lcN` label counter. Equal literals map to
//! the same label, so each appears once in the data section.

use crate::asm::DataEntry;
use log::{debug, trace};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Interner {
    strings: HashMap<String, String>,
    /// Keyed by bit pattern so that every float, NaN included, is hashable
    floats: HashMap<u32, String>,
    entries: Vec<DataEntry>,
    next_label: u32,
}

impl Interner {
    /// Label of `text`, adding a data entry on first use
    pub fn intern_string(&mut self, text: &str) -> String {
        if let Some(label) = self.strings.get(text) {
            trace!("data: reusing {} for {:?}", label, text);
            return label.clone();
        }
        let label = self.fresh_label();
        debug!("data: {} = {:?}", label, text);
        self.strings.insert(text.to_string(), label.clone());
        self.entries.push(DataEntry::Str { label: label.clone(), text: text.to_string() });
        label
    }

    pub fn intern_float(&mut self, value: f32) -> String {
        if let Some(label) = self.floats.get(&value.to_bits()) {
            trace!("data: reusing {} for {}", label, value);
            return label.clone();
        }
        let label = self.fresh_label();
        debug!("data: {} = {}", label, value);
        self.floats.insert(value.to_bits(), label.clone());
        self.entries.push(DataEntry::Float { label: label.clone(), value });
        label
    }

    /// Entries in first-use order
    pub fn into_entries(self) -> Vec<DataEntry> {
        self.entries
    }

    fn fresh_label(&mut self) -> String {
        let label = format!("lc{}", self.next_label);
        self.next_label += 1;
        label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strings_deduplicated() {
        let mut interner = Interner::default();
        assert_eq!(interner.intern_string("hello"), "lc0");
        assert_eq!(interner.intern_string("world"), "lc1");
        assert_eq!(interner.intern_string("hello"), "lc0");
        assert_eq!(interner.into_entries().len(), 2);
    }

    #[test]
    fn test_shared_counter() {
        let mut interner = Interner::default();
        interner.intern_string("a");
        assert_eq!(interner.intern_float(1.5), "lc1");
        assert_eq!(interner.intern_float(1.5), "lc1");
        let entries = interner.into_entries();
        assert_eq!(entries[1].to_string(), "lc1: dd 1.5");
    }

    #[test]
    fn test_empty() {
        assert!(Interner::default().into_entries().is_empty());
    }
}
