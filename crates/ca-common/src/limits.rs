//! Centralized limits and thresholds.

/// Maximum number of formal or actual arguments in an argument list,
/// and of members in a struct or tuple definition.
pub const MAX_ARGS: usize = 16;

/// Maximum number of compacted array dimensions before expansion.
pub const MAX_DIM: usize = 16;

/// Unwinding signature buffers start at this capacity.
pub const SIGNATURE_BUF_INIT: usize = 4096;
