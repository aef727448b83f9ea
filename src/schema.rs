//! Database schema definitions
//!
//! Table and column names used in rusqlite queries. The DDL lives in
//! `migrations/`.

/// Feedback table schema
pub mod feedback {
    /// Table name
    pub const TABLE: &str = "feedback";
    /// Surrogate primary key
    pub const ID: &str = "id";
    /// Message identifier, unique
    pub const MESSAGE_ID: &str = "message_id";
    /// Submitting user
    pub const USER_ID: &str = "user_id";
    /// Message text
    pub const TEXT: &str = "text";
    /// Spam score the model gave
    pub const INITIAL_SPAM_PREDICTION: &str = "initial_spam_prediction";
    /// Emotion label the model gave
    pub const INITIAL_SENTIMENT_PREDICTION: &str = "initial_sentiment_prediction";
    /// Ground-truth spam flag
    pub const REAL_SPAM: &str = "real_spam";
    /// Ground-truth emotion label
    pub const REAL_EMOTION: &str = "real_emotion";
    /// First insert timestamp
    pub const CREATED_AT: &str = "created_at";
    /// Last write timestamp
    pub const UPDATED_AT: &str = "updated_at";
}
