use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which half of a read or write a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    General,
    Exif,
    Xmp,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::General => "general",
            Phase::Exif => "exif",
            Phase::Xmp => "xmp",
        })
    }
}

/// Errors surfaced by the metadata engine.
///
/// Only [`MetadataError::NotFound`] and [`MetadataError::UnsupportedFormat`]
/// abort a call. Decode and encode failures are scoped to one [`Phase`] and
/// are reported next to a best-effort result instead.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Error reading {phase}: {message}")]
    DecodeFailure { phase: Phase, message: String },

    #[error("Error writing {phase}: {message}")]
    EncodeFailure { phase: Phase, message: String },

    #[error("Malformed XMP packet: {0}")]
    MalformedPacket(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MetadataError {
    pub(crate) fn decode(phase: Phase, message: impl fmt::Display) -> Self {
        Self::DecodeFailure { phase, message: message.to_string() }
    }

    pub(crate) fn encode(phase: Phase, message: impl fmt::Display) -> Self {
        Self::EncodeFailure { phase, message: message.to_string() }
    }

    /// The phase this error is scoped to, if any.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::DecodeFailure { phase, .. } | Self::EncodeFailure { phase, .. } => Some(*phase),
            Self::MalformedPacket(_) => Some(Phase::Xmp),
            _ => None,
        }
    }

    /// True for the failures that are reported before any codec work begins.
    pub fn is_hard(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::UnsupportedFormat(_))
    }
}

pub type Result<T, E = MetadataError> = std::result::Result<T, E>;
