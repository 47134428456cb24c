/// Re-expresses a point in another coordinate frame at a given time.
///
/// Supplied by the caller; the decoder only consumes it. Latency and
/// timeout policy belong to the implementation, failures are reported
/// per call and handled locally by the decoder.
pub trait FrameTransformer {
    /// `fixed_frame` names an intermediate frame for time-travelling
    /// lookups where the implementation supports one.
    fn transform(
        &self,
        point: [f32; 3],
        source_frame: &str,
        target_frame: &str,
        fixed_frame: Option<&str>,
        stamp: f64,
    ) -> Result<[f32; 3], TransformError>;
}

#[derive(thiserror::Error, Debug)]
#[error("{reason}")]
pub struct TransformError {
    reason: String,
}

impl TransformError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
