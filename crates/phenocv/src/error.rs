use std::fmt;

use serde::Serialize;

/// An error type for the analysis operations.
///
/// Every variant aborts the call without a partial result.
#[derive(thiserror::Error, Debug)]
pub enum PhenoError {
    /// The ROI policy string is not recognised.
    #[error("ROI type {0} is not \"cutto\", \"partial\", \"largest\", \"massc\" or \"<N>pct\"")]
    InvalidRoiPolicy(String),

    /// The size marker mode is not recognised.
    #[error("marker must be either 'define' or 'detect' but {0} was provided")]
    InvalidMarkerMode(String),

    /// The HSV channel name is not recognised.
    #[error("channel {0} is not 'h', 's' or 'v'")]
    InvalidChannel(String),

    /// The object color is not recognised.
    #[error("object color {0} is not 'dark' or 'light'")]
    InvalidObjectColor(String),

    /// The landmark axis is not recognised.
    #[error("axis {0} is not 'x' or 'y'")]
    InvalidAxis(String),

    /// Detect mode needs both a channel and a threshold.
    #[error("thresh_channel and thresh must be defined in detect mode")]
    MissingThreshold,

    /// A group refers to a contour that does not exist.
    #[error("contour index {0} is out of range for {1} contours")]
    InvalidContourIndex(usize, usize),

    /// Two rasters that must share a size do not.
    #[error("Image size ({0}x{1}) does not match the expected size ({2}x{3})")]
    SizeMismatch(usize, usize, usize, usize),

    /// Error from the image primitives.
    #[error("Image operation failed. {0}")]
    Image(#[from] phenocv_image::ImageError),

    /// Error writing a diagnostic artifact.
    #[error("Failed to write diagnostic artifact. {0}")]
    Diagnostics(String),
}

/// A recoverable mismatch, reported next to a best-effort result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ConsistencyWarning {
    /// The `largest` policy dropped other kept objects.
    SiblingsDropped {
        /// Number of top level objects that passed the membership test.
        kept: usize,
    },
    /// Fewer names than groups, the smallest groups were removed.
    GroupsTrimmed {
        /// Number of groups before trimming.
        groups: usize,
        /// Number of names supplied.
        names: usize,
    },
    /// More names than groups, the name list was truncated.
    NamesTruncated {
        /// Number of groups.
        groups: usize,
        /// Number of names supplied.
        names: usize,
    },
    /// A group rasterized to an empty mask and was skipped.
    EmptyGroup {
        /// Position of the group in the input.
        index: usize,
    },
}

impl fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SiblingsDropped { kept } => write!(
                f,
                "largest policy kept one of {kept} objects, the others were dropped"
            ),
            Self::GroupsTrimmed { groups, names } => write!(
                f,
                "number of names ({names}) is less than number of grouped contours ({groups}), \
                 smallest groups removed, double check output"
            ),
            Self::NamesTruncated { groups, names } => write!(
                f,
                "number of names ({names}) is more than number of grouped contours ({groups}), \
                 double check output"
            ),
            Self::EmptyGroup { index } => write!(f, "group {index} has an empty mask"),
        }
    }
}

impl ConsistencyWarning {
    /// Log the warning and hand it back for collection.
    pub(crate) fn emit(self) -> Self {
        log::warn!("{self}");
        self
    }
}
