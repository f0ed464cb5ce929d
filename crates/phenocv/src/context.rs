use serde::{Deserialize, Serialize};

/// Pipeline state passed by value into every analysis call.
///
/// The context is never mutated; each call receives the context of its own
/// step and the caller moves on with [`PipelineContext::next`].
///
/// # Examples
///
/// ```
/// use phenocv::PipelineContext;
///
/// let ctx = PipelineContext::default();
/// let next = ctx.next();
///
/// assert_eq!(ctx.step, 0);
/// assert_eq!(next.step, 1);
/// assert_eq!(next.artifact_name("shapes"), "1_shapes");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineContext {
    /// Index of the current pipeline step.
    pub step: u32,
    /// Thickness of the lines of diagnostic overlays.
    pub line_thickness: usize,
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self {
            step: 0,
            line_thickness: 5,
        }
    }
}

impl PipelineContext {
    /// Create a context at the given step.
    pub fn new(step: u32, line_thickness: usize) -> Self {
        Self {
            step,
            line_thickness,
        }
    }

    /// The context of the following step.
    pub fn next(self) -> Self {
        Self {
            step: self.step + 1,
            ..self
        }
    }

    /// Name of a diagnostic artifact produced at this step.
    pub fn artifact_name(&self, label: &str) -> String {
        format!("{}_{}", self.step, label)
    }
}
