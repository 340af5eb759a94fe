//! Story records and the JSON bodies exchanged with the store service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub title: String,
    pub content: String,
    /// Write time, serialised as RFC 3339.
    pub date: DateTime<Utc>,
}

/// Body of `POST /api/save`.  Missing fields default to empty strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewStory {
    pub title: String,
    pub content: String,
}

impl NewStory {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    /// Stamp the story with `date`.
    pub fn into_story(self, date: DateTime<Utc>) -> Story {
        Story {
            title: self.title,
            content: self.content,
            date,
        }
    }
}

/// Success body: `{"message": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

/// Failure body: `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
