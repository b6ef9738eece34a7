//! Operation progress reporting
//!
//! Long-running operations (load, OCR, export) report through a sink the
//! caller injects, so the core stays independent of any UI toolkit. Every
//! operation calls `finish` on every exit path, success or failure, so a
//! progress indicator can never get stuck mid-operation.

/// Receiver for operation progress.
///
/// `update` values are percentages in `0.0..=100.0`; implementations should
/// clamp rather than reject out-of-range values.
pub trait ProgressSink {
    /// A new operation started; show the indicator.
    fn begin(&mut self, label: &str);

    /// Overall completion in percent.
    fn update(&mut self, percent: f32);

    /// Human-readable status line, e.g. which page is being processed.
    fn status(&mut self, text: &str);

    /// The operation ended (either way); hide the indicator.
    fn finish(&mut self);
}

/// Sink that ignores everything, for headless callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn begin(&mut self, _label: &str) {}

    fn update(&mut self, _percent: f32) {}

    fn status(&mut self, _text: &str) {}

    fn finish(&mut self) {}
}
