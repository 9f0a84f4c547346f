/// Engine version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum stored length of a prediction's text.
pub const MAX_PREDICTION_TEXT_LEN: usize = 500;

/// Maximum length of a single extracted prediction before storage trimming.
pub const MAX_EXTRACTED_LEN: usize = 300;

/// Minimum length for an extracted prediction to be kept.
pub const MIN_EXTRACTED_LEN: usize = 15;

/// Minimum input length before extraction is attempted at all.
pub const MIN_EXTRACTION_INPUT_LEN: usize = 50;

/// Maximum predictions extracted from a single message.
pub const MAX_PREDICTIONS_PER_MESSAGE: usize = 8;

/// Truncation length for prediction excerpts stored in domain history.
pub const HISTORY_EXCERPT_LEN: usize = 80;

/// Number of recent wrong predictions examined when mining a pattern.
pub const RECENT_WRONG_WINDOW: usize = 30;

/// Tokens shorter than or equal to this are ignored when building signatures.
pub const SIGNATURE_MIN_TOKEN_LEN: usize = 3;

/// Number of top recurring tokens joined into a pattern signature.
pub const SIGNATURE_TOP_TOKENS: usize = 5;

/// Upper bound on outcome ids retained per pattern.
pub const MAX_CONTRIBUTING_OUTCOMES: usize = 20;

/// Upper bound on retained gene mutation history entries.
pub const MAX_MUTATION_HISTORY: usize = 10;

/// Accuracy history window used for trend and volatility.
pub const ACCURACY_WINDOW: usize = 20;

/// Number of equal-width calibration buckets over [0, 1).
pub const CALIBRATION_BUCKETS: usize = 5;
