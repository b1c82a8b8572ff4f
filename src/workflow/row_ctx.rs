//! Row processing context
//!
//! Which row of the input is being processed, for log prefixes

use std::fmt::Display;

#[derive(Debug, Clone, Copy)]
pub struct RowCtx {
    /// Zero-based input index
    pub index: usize,

    /// Total rows in the input (logging only)
    pub total: usize,
}

impl RowCtx {
    pub fn new(index: usize, total: usize) -> Self {
        Self { index, total }
    }
}

impl Display for RowCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[row {}/{}]", self.index + 1, self.total)
    }
}
