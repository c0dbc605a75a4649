//! Fragment identifiers: `f` followed by a zero-padded, 1-based index.
//!
//! Every id in a document is padded to the digit count of that document's
//! final fragment total, so the total must be known before the first id is
//! handed out.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};

/// Number of decimal digits in `n`, with a minimum of 1.
pub fn digit_count(n: usize) -> usize {
    n.checked_ilog10().map_or(1, |log| log as usize + 1)
}

/// One allocated identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FragmentId {
    index: usize,
    width: usize,
}

impl FragmentId {
    /// Build an id directly. Mostly useful for tests and downstream lookups.
    pub fn new(index: usize, width: usize) -> Self {
        Self { index, width }
    }

    /// The 1-based position of this id in its document.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The zero-padding width shared by every id in the document.
    pub fn width(&self) -> usize {
        self.width
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{:0width$}", self.index, width = self.width)
    }
}

impl Serialize for FragmentId {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Sequential allocator for one document's identifiers.
///
/// This is the running counter threaded through the header, chapter-title
/// and paragraph stages, in that order.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: usize,
    total: usize,
    width: usize,
}

impl IdAllocator {
    /// Allocator for a document with `total` fragments.
    pub fn new(total: usize) -> Self {
        Self {
            next: 1,
            total,
            width: digit_count(total),
        }
    }

    /// Hand out the next identifier.
    pub fn next_id(&mut self) -> Result<FragmentId> {
        if self.next > self.total {
            return Err(Error::IdOverflow { total: self.total });
        }
        let id = FragmentId::new(self.next, self.width);
        self.next += 1;
        Ok(id)
    }

    /// Identifiers handed out so far.
    pub fn allocated(&self) -> usize {
        self.next - 1
    }

    /// Identifiers still available.
    pub fn remaining(&self) -> usize {
        self.total - self.allocated()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn width(&self) -> usize {
        self.width
    }
}
