//! Configuration for host sessions driven by [`crate::driver`].
//!
//! Mirrors the knobs a real host has over the scanner: which structural tokens the grammar accepts, whether state is
//! persisted between calls, and how large the persistence buffer is.

use rad_scanner::{SERIALIZATION_BUFFER_SIZE, ValidSymbols};

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexConfig {
    /// Structural tokens the simulated grammar accepts at every position
    pub accept: ValidSymbols,
    /// Round-trip scanner state through serialize/deserialize before every scan call
    pub checkpoint: bool,
    /// Capacity of the serialization buffer used for checkpoints and snapshots
    pub state_capacity: usize,
    /// Treat `//` line comments as trivia, like the grammar's `comment` extra
    pub skip_comments: bool,
}

impl Default for LexConfig {
    fn default() -> Self {
        Self {
            accept: ValidSymbols::all(),
            checkpoint: false,
            state_capacity: SERIALIZATION_BUFFER_SIZE,
            skip_comments: true,
        }
    }
}

impl LexConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the accepted structural tokens
    pub fn with_accept(mut self, accept: ValidSymbols) -> Self {
        self.accept = accept;
        self
    }

    /// Enable or disable per-call checkpointing
    pub fn with_checkpoint(mut self, checkpoint: bool) -> Self {
        self.checkpoint = checkpoint;
        self
    }

    /// Set the serialization buffer capacity
    pub fn with_state_capacity(mut self, capacity: usize) -> Self {
        self.state_capacity = capacity;
        self
    }

    /// Enable or disable skipping of `//` comments
    pub fn with_skip_comments(mut self, skip: bool) -> Self {
        self.skip_comments = skip;
        self
    }
}
