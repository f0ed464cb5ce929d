#![deny(missing_docs)]
//! Shape phenotyping of segmented objects.
//!
//! The entry points take the raster buffers and contours produced upstream,
//! an immutable [`PipelineContext`] and a [`DiagnosticsSink`] that receives
//! the optional debug images:
//!
//! * [`descriptor::analyze_object`] computes the [`descriptor::ShapeDescriptor`] of one object.
//! * [`roi::classify_objects`] keeps the objects that belong to a region of interest.
//! * [`watershed::watershed_segmentation`] separates touching objects.
//! * [`landmarks::axis_landmarks`] samples 20 pseudo-landmarks along an axis.
//! * [`size_marker::report_size_marker`] measures a calibration marker.
//! * [`cluster::split_clusters`] turns grouped contours into one mask per group.
//! * [`bound::analyze_bound_horizontal`] splits an object at a horizontal line.
//! * [`turgor::turgor_proxy`] summarizes scaled landmarks around their references.

/// object extent above and below a horizontal line.
pub mod bound;

/// splitting of grouped contours into per-cluster outputs.
pub mod cluster;

/// merging of several contours into one object.
pub mod composition;

/// immutable pipeline context.
pub mod context;

/// shape descriptor engine.
pub mod descriptor;

/// diagnostics sinks for debug images.
pub mod diagnostics;

/// Error types for the analysis crate.
pub mod error;

/// axis pseudo-landmark sampling.
pub mod landmarks;

/// tabular records.
pub mod record;

/// region of interest classification.
pub mod roi;

/// unit box scaling of landmarks.
pub mod scale;

/// calibration marker analysis.
pub mod size_marker;

/// landmark posture relative to the centroid and boundary line.
pub mod turgor;

/// distance transform watershed splitting.
pub mod watershed;

pub use crate::context::PipelineContext;
pub use crate::diagnostics::{DiagnosticsSink, MemorySink, NoopSink, PngSink};
pub use crate::error::{ConsistencyWarning, PhenoError};
pub use crate::record::{Field, Record};

#[doc(inline)]
pub use phenocv_image as image;

#[doc(inline)]
pub use phenocv_imgproc as imgproc;
