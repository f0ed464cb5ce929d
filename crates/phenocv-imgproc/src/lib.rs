#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// RGB to HSV conversion.
pub mod color;

/// Border following and the contour hierarchy.
pub mod contours;

/// Pixelwise mask operations.
pub mod core;

/// Exact Euclidean distance transform.
pub mod distance_transform;

/// Lines, circles and polygon filling.
pub mod draw;

/// Least-squares ellipse fitting.
pub mod ellipse;

/// Raster and polygon moments.
pub mod moments;

/// Row-parallel pixel loops.
pub mod parallel;

/// Connected components, peak detection and watershed.
pub mod segmentation;

/// Convex hull, areas, lengths and point-in-polygon tests.
pub mod shape;

/// Binary thresholding.
pub mod threshold;
