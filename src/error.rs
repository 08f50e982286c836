//! Error types for quiz generation, playback transitions, and request input.

/// Failures of the external quiz generation call. All of them land the flow in `Failed`.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Network/HTTP transport errors.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success status from the model provider.
    #[error("Model API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message extracted from the provider body.
        message: String,
    },

    /// The response carried no completion choice at all.
    #[error("Model returned no completion")]
    EmptyCompletion,
}

/// Rejected playback transitions. A rejected call never mutates state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    #[error("option {index} is out of range (question has {options} options)")]
    InvalidSelection { index: usize, options: usize },

    #[error("no answer has been selected for the current question")]
    NoAnswerSelected,

    #[error("the quiz attempt is already completed")]
    AlreadyCompleted,

    #[error("no quiz is in play")]
    NotPlaying,
}

/// Invalid input supplied by the caller or by the generator payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("source material is empty")]
    EmptySource,

    #[error("a question needs at least 2 options, got {0}")]
    TooFewOptions(usize),

    #[error("correct answer index {index} is out of range for {options} options")]
    CorrectIndexOutOfRange { index: usize, options: usize },

    #[error("number of questions must be between 1 and 20, got {0}")]
    QuestionCount(usize),

    #[error("language must not be empty")]
    EmptyLanguage,
}

/// Errors surfaced by the session layer to HTTP and WebSocket callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("unknown quiz session: {0}")]
    NotFound(String),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    /// Reviewer generation failed; details are logged, callers get a stable message.
    #[error("Failed to generate reviewer content")]
    ReviewerFailed,
}
