use thiserror::Error;

/// Raised when character timing input cannot be aggregated.
///
/// Carries which field was missing or how the lengths disagreed so the caller
/// can decide whether to skip, retry with different input, or abort.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedInputError {
    #[error("character data is missing field `{field}`")]
    MissingField { field: &'static str },
    #[error(
        "character data length mismatch: {characters} characters but {timestamps} start times"
    )]
    LengthMismatch {
        characters: usize,
        timestamps: usize,
    },
}

impl MalformedInputError {
    pub(crate) fn missing(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    pub(crate) fn length_mismatch(characters: usize, timestamps: usize) -> Self {
        Self::LengthMismatch {
            characters,
            timestamps,
        }
    }

    /// Name of the offending input field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingField { field } => field,
            Self::LengthMismatch { .. } => "character_start_times_seconds",
        }
    }
}
