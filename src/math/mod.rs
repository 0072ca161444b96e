//! Mathematical utilities for pattern matching

/// Run-length encoding and cyclic subsequence search
pub mod sequence;
