use thiserror::Error;

/// Errors that can occur during wenzi core operations.
#[derive(Debug, Error)]
pub enum WenziError {
    /// Reading or writing a model directory failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A metadata document could not be (de)serialized.
    #[error("invalid metadata JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Candle ML framework error.
    #[error("ML framework error: {0}")]
    Candle(#[from] candle_core::Error),

    /// A pretrained tokenizer could not be read.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// A stored `module.class_name` path does not name a known class.
    #[error("unknown class `{path}`{}", suggestion.as_ref().map(|s| format!(", did you mean `{s}`?")).unwrap_or_default())]
    UnknownClass {
        /// The fully qualified path that failed to resolve.
        path: String,
        /// Closest registered path, if any is reasonably similar.
        suggestion: Option<String>,
    },

    /// The model network has not been created yet.
    #[error("model is not built, call `build_model` before {0}")]
    ModelNotBuilt(&'static str),

    /// Labels of one task were passed to a model of another task.
    #[error("task mismatch: model expects {expected} labels, got {actual}")]
    TaskMismatch {
        /// The task the model was declared with.
        expected: &'static str,
        /// The task of the labels that were supplied.
        actual: &'static str,
    },

    /// Two parallel sequences differ in length.
    #[error("length mismatch: {left} != {right}")]
    LengthMismatch {
        /// Length of the first sequence.
        left: usize,
        /// Length of the second sequence.
        right: usize,
    },

    /// An entity span points outside its token sequence.
    #[error("invalid span [{start}, {end}] for a sequence of {len} tokens")]
    InvalidSpan {
        /// First token of the span.
        start: usize,
        /// Last token of the span (inclusive).
        end: usize,
        /// Number of tokens in the sequence.
        len: usize,
    },

    /// A serving export version contains characters unsafe for a path.
    #[error("invalid export version: {0:?}")]
    InvalidVersion(String),

    /// A label was not seen when the processor was fitted.
    #[error("unknown label {0:?}")]
    UnknownLabel(String),

    /// The processor has no vocabulary yet.
    #[error("processor is not fitted, call `fit` first")]
    ProcessorNotFitted,

    /// The input is empty where at least one element is required.
    #[error("input is empty: {0}")]
    EmptyInput(&'static str),

    /// A version pattern failed to compile (should not happen with static patterns).
    #[error("regex compilation error: {0}")]
    Regex(#[from] regex::Error),

    /// The operation is not available in the model's current state.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// A shared weight map was poisoned by a panicking thread.
    #[error("weight map lock poisoned")]
    LockPoisoned,

    /// A device specification could not be used.
    #[error("invalid device: {0}")]
    InvalidDevice(String),
}

/// Result type alias for wenzi core operations.
pub type Result<T> = std::result::Result<T, WenziError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = WenziError::ModelNotBuilt("export");
        assert_eq!(
            err.to_string(),
            "model is not built, call `build_model` before export"
        );

        let err = WenziError::LengthMismatch { left: 3, right: 4 };
        assert!(err.to_string().contains("3 != 4"));
    }

    #[test]
    fn unknown_class_mentions_suggestion() {
        let err = WenziError::UnknownClass {
            path: "wenzi_core::model.GruLabelModel".into(),
            suggestion: Some("wenzi_core::model.GruLabelingModel".into()),
        };
        assert!(err.to_string().contains("did you mean"));

        let err = WenziError::UnknownClass {
            path: "x.Y".into(),
            suggestion: None,
        };
        assert_eq!(err.to_string(), "unknown class `x.Y`");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WenziError>();
    }
}
