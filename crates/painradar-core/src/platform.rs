use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// External content source a post was retrieved from.
///
/// Stored and serialized in upper-case form (`"HACKERNEWS"`, `"REDDIT"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "REDDIT")]
    Reddit,
    #[serde(rename = "HACKERNEWS")]
    HackerNews,
    #[serde(rename = "HABR")]
    Habr,
    #[serde(rename = "VCRU")]
    VcRu,
    #[serde(rename = "LINKEDIN")]
    LinkedIn,
    #[serde(rename = "TELEGRAM")]
    Telegram,
    #[serde(rename = "PIKABU")]
    Pikabu,
    #[serde(rename = "TWITTER")]
    Twitter,
    #[serde(rename = "THREADS")]
    Threads,
    #[serde(rename = "INSTAGRAM")]
    Instagram,
    #[serde(rename = "WEB")]
    Web,
}

impl Platform {
    pub const ALL: [Platform; 11] = [
        Platform::Reddit,
        Platform::HackerNews,
        Platform::Habr,
        Platform::VcRu,
        Platform::LinkedIn,
        Platform::Telegram,
        Platform::Pikabu,
        Platform::Twitter,
        Platform::Threads,
        Platform::Instagram,
        Platform::Web,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Reddit => "REDDIT",
            Platform::HackerNews => "HACKERNEWS",
            Platform::Habr => "HABR",
            Platform::VcRu => "VCRU",
            Platform::LinkedIn => "LINKEDIN",
            Platform::Telegram => "TELEGRAM",
            Platform::Pikabu => "PIKABU",
            Platform::Twitter => "TWITTER",
            Platform::Threads => "THREADS",
            Platform::Instagram => "INSTAGRAM",
            Platform::Web => "WEB",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == upper)
            .ok_or_else(|| CoreError::UnknownPlatform(s.to_string()))
    }
}
