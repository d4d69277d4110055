use thiserror::Error;

/// Hard failures surfaced by the state engine.
///
/// Data-quality problems in the event stream (missing fields, underflow
/// attempts, unknown resource ids) are never errors; handlers log them and
/// repair or skip. The only hard failure is a caller contract violation.
#[derive(Debug, Error)]
pub enum StateError {
    /// `init` was called before a trace context was supplied.
    #[error("no trace context has been supplied to the state store")]
    MissingContext,
}
