//! Error taxonomy for parameter normalization and range arithmetic.
use thiserror::Error;

/// Errors raised while normalizing scan parameters or decomposing
/// address ranges.
///
/// A connection attempt that fails or times out is never an error:
/// the endpoint is simply reported as unreachable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// Malformed dotted-quad or CIDR text.
    #[error("could not parse {input:?} as an IPv4 address or CIDR block")]
    Parse {
        /// The text that failed to parse.
        input: String,
    },

    /// Start address greater than end address when decomposing a range.
    #[error("start address {start} must not be greater than end address {end}")]
    InvalidRange {
        /// Dotted-quad form of the requested start address.
        start: String,
        /// Dotted-quad form of the requested end address.
        end: String,
    },

    /// Effective start port greater than effective end port after defaulting.
    #[error("start port {start} must not be greater than end port {end}")]
    InvalidPortRange {
        /// Effective start port.
        start: u16,
        /// Effective end port.
        end: u16,
    },
}
