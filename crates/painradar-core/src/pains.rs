//! Closed enumerations attached to every extracted pain.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PainCategory {
    TimeManagement,
    Cost,
    Technical,
    Process,
    Communication,
    Quality,
    Scalability,
    Security,
    Other,
}

impl PainCategory {
    pub const ALL: [PainCategory; 9] = [
        PainCategory::TimeManagement,
        PainCategory::Cost,
        PainCategory::Technical,
        PainCategory::Process,
        PainCategory::Communication,
        PainCategory::Quality,
        PainCategory::Scalability,
        PainCategory::Security,
        PainCategory::Other,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PainCategory::TimeManagement => "TIME_MANAGEMENT",
            PainCategory::Cost => "COST",
            PainCategory::Technical => "TECHNICAL",
            PainCategory::Process => "PROCESS",
            PainCategory::Communication => "COMMUNICATION",
            PainCategory::Quality => "QUALITY",
            PainCategory::Scalability => "SCALABILITY",
            PainCategory::Security => "SECURITY",
            PainCategory::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for PainCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PainCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        PainCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == upper)
            .ok_or_else(|| CoreError::UnknownCategory(s.to_string()))
    }
}

/// Ordered `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PainSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PainSeverity {
    pub const ALL: [PainSeverity; 4] = [
        PainSeverity::Low,
        PainSeverity::Medium,
        PainSeverity::High,
        PainSeverity::Critical,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PainSeverity::Low => "LOW",
            PainSeverity::Medium => "MEDIUM",
            PainSeverity::High => "HIGH",
            PainSeverity::Critical => "CRITICAL",
        }
    }

    /// Numeric rank used for ordering in SQL (`1` = low .. `4` = critical).
    #[must_use]
    pub fn rank(self) -> i16 {
        match self {
            PainSeverity::Low => 1,
            PainSeverity::Medium => 2,
            PainSeverity::High => 3,
            PainSeverity::Critical => 4,
        }
    }
}

impl std::fmt::Display for PainSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PainSeverity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        PainSeverity::ALL
            .into_iter()
            .find(|v| v.as_str() == upper)
            .ok_or_else(|| CoreError::UnknownSeverity(s.to_string()))
    }
}
