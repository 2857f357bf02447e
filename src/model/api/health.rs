use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Liveness report, including whether the database answered a ping.
#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub database: DatabaseStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseStatus {
    Connected,
    Disconnected,
}

impl Health {
    pub fn new(database: DatabaseStatus) -> Self {
        Self {
            status: "OK".to_string(),
            message: "FeedbackFuse API is running".to_string(),
            timestamp: Utc::now(),
            database,
        }
    }
}
