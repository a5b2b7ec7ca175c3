use thiserror::Error;

/// Errors raised by queue construction and capacity queries.
///
/// Operations on a live queue never fail with these; they either succeed,
/// block, or report "full"/"empty" through their return type. A failed
/// construction never produces a half-built queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// A bounded queue was constructed with capacity zero.
    #[error("capacity must be greater than zero")]
    ZeroCapacity,

    /// The requested capacity is below the variant's minimum.
    #[error("capacity must be at least {min}")]
    CapacityTooSmall {
        /// Smallest capacity the variant supports.
        min: usize,
    },

    /// A capacity query was made against an unbounded queue.
    #[error("queue has no capacity bound")]
    Unbounded,
}

impl QueueError {
    /// Returns `true` if the error stems from an invalid capacity argument.
    #[inline]
    pub fn is_capacity(&self) -> bool {
        matches!(self, Self::ZeroCapacity | Self::CapacityTooSmall { .. })
    }
}
