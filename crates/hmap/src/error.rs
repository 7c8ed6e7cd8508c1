//! Error types for descriptor parsing, map resolution and device lifecycle.

use crate::usage::Usage;
use thiserror::Error;

/// Malformed report descriptor. Every variant carries the byte offset of the
/// offending item.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("Truncated item at offset {offset}")]
    Truncated { offset: usize },

    #[error("Push stack overflow at offset {offset} (max depth {max})")]
    StackOverflow { offset: usize, max: usize },

    #[error("Pop without matching push at offset {offset}")]
    StackUnderflow { offset: usize },

    #[error("{depth} push item(s) without matching pop at end of descriptor (offset {offset})")]
    UnbalancedPush { offset: usize, depth: usize },

    #[error("Report size {size} exceeds 32 bits at offset {offset}")]
    ReportSizeTooLarge { offset: usize, size: u32 },

    #[error("Invalid report ID {id} at offset {offset}")]
    InvalidReportId { offset: usize, id: u32 },

    #[error("End collection without open collection at offset {offset}")]
    UnbalancedCollection { offset: usize },

    #[error("Invalid usage range {min}..={max} at offset {offset}")]
    InvalidUsageRange { offset: usize, min: Usage, max: Usage },

    #[error("Report exceeds addressable length at offset {offset}")]
    ReportTooLong { offset: usize },
}

impl DescriptorError {
    pub fn offset(&self) -> usize {
        match *self {
            Self::Truncated { offset }
            | Self::StackOverflow { offset, .. }
            | Self::StackUnderflow { offset }
            | Self::UnbalancedPush { offset, .. }
            | Self::ReportSizeTooLarge { offset, .. }
            | Self::InvalidReportId { offset, .. }
            | Self::UnbalancedCollection { offset }
            | Self::InvalidUsageRange { offset, .. }
            | Self::ReportTooLong { offset } => offset,
        }
    }
}

/// Failure reported by a [`HidTransport`](crate::transport::HidTransport).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Failed to read from device: {0}")]
    ReadError(String),

    #[error("Failed to write to device: {0}")]
    WriteError(String),

    #[error("Invalid report format: {0}")]
    InvalidReport(String),

    #[error("Buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    #[error("Device disconnected")]
    Disconnected,
}

/// Result of a map callback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallbackError {
    /// Returned from the attaching call: the row is not invoked again at
    /// runtime or detach.
    #[error("Callback only runs at attach")]
    AttachOnly,

    #[error("Callback failed: {0}")]
    Failed(String),
}

pub type CallbackResult = Result<(), CallbackError>;

/// Failure reported by an [`EvdevSink`](crate::sink::EvdevSink).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("Sink registration failed: {0}")]
    RegistrationFailed(String),

    #[error("Sink already registered")]
    AlreadyRegistered,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HmapError {
    #[error("Descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),

    #[error("Required map row {name} matched no descriptor item")]
    RequiredRowUnbound { name: &'static str },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Resource error: {0}")]
    Resource(String),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Top-level collection {usage} is not handled by this driver")]
    UnsupportedCollection { usage: Usage },

    #[error("Device already attached")]
    AlreadyAttached,

    #[error("Device not attached")]
    NotAttached,

    #[error("No usage maps registered")]
    NoMaps,
}

pub type HmapResult<T> = Result<T, HmapError>;

impl HmapError {
    /// True for errors that leave the device usable for another attempt.
    pub fn is_lifecycle_misuse(&self) -> bool {
        matches!(
            self,
            Self::AlreadyAttached | Self::NotAttached | Self::NoMaps
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HmapError::RequiredRowUnbound {
            name: "TIP_PRESSURE",
        };
        assert_eq!(
            err.to_string(),
            "Required map row TIP_PRESSURE matched no descriptor item"
        );

        let err = HmapError::from(DescriptorError::StackUnderflow { offset: 7 });
        assert_eq!(
            err.to_string(),
            "Descriptor error: Pop without matching push at offset 7"
        );

        let err = HmapError::from(TransportError::Disconnected);
        assert_eq!(err.to_string(), "Transport error: Device disconnected");
    }

    #[test]
    fn test_descriptor_error_offset() {
        let err = DescriptorError::InvalidUsageRange {
            offset: 12,
            min: Usage::new(0x07, 0x10),
            max: Usage::new(0x07, 0x04),
        };
        assert_eq!(err.offset(), 12);
        assert_eq!(
            DescriptorError::ReportSizeTooLarge {
                offset: 3,
                size: 64
            }
            .offset(),
            3
        );
    }

    #[test]
    fn test_lifecycle_misuse() {
        assert!(HmapError::AlreadyAttached.is_lifecycle_misuse());
        assert!(HmapError::NoMaps.is_lifecycle_misuse());
        assert!(!HmapError::Resource("x".to_string()).is_lifecycle_misuse());
    }
}
