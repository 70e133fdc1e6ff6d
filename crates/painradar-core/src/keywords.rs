use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, CoreError};

const KEYWORD_MIN_CHARS: usize = 2;
const KEYWORD_MAX_CHARS: usize = 100;
const CATEGORY_MAX_CHARS: usize = 50;

/// Validate and normalize a tracked keyword.
///
/// Accepts 2–100 characters of letters (any script), digits, spaces, `-`
/// and `_`. Surrounding whitespace is trimmed.
///
/// # Errors
///
/// Returns [`CoreError::InvalidKeyword`] describing the first violated rule.
pub fn validate_keyword(raw: &str) -> Result<String, CoreError> {
    let keyword = raw.trim();
    let len = keyword.chars().count();

    if len < KEYWORD_MIN_CHARS {
        return Err(CoreError::InvalidKeyword(format!(
            "must be at least {KEYWORD_MIN_CHARS} characters"
        )));
    }
    if len > KEYWORD_MAX_CHARS {
        return Err(CoreError::InvalidKeyword(format!(
            "must be at most {KEYWORD_MAX_CHARS} characters"
        )));
    }
    if let Some(bad) = keyword
        .chars()
        .find(|c| !(c.is_alphanumeric() || *c == ' ' || *c == '-' || *c == '_'))
    {
        return Err(CoreError::InvalidKeyword(format!(
            "unsupported character '{bad}'; use letters, digits, spaces, '-' and '_'"
        )));
    }

    Ok(keyword.to_string())
}

/// Validate an optional keyword category tag.
///
/// # Errors
///
/// Returns [`CoreError::InvalidKeyword`] if the category exceeds 50 characters.
pub fn validate_category(raw: Option<&str>) -> Result<Option<String>, CoreError> {
    match raw.map(str::trim).filter(|c| !c.is_empty()) {
        None => Ok(None),
        Some(c) if c.chars().count() > CATEGORY_MAX_CHARS => Err(CoreError::InvalidKeyword(
            format!("category must be at most {CATEGORY_MAX_CHARS} characters"),
        )),
        Some(c) => Ok(Some(c.to_string())),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordSeed {
    pub keyword: String,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct KeywordsFile {
    pub keywords: Vec<KeywordSeed>,
}

/// Load and validate a keyword seed file (YAML).
///
/// ```yaml
/// keywords:
///   - keyword: slow onboarding
///     category: saas
/// ```
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_keyword_seeds(path: &Path) -> Result<KeywordsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::KeywordsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_keyword_seeds(&content)
}

fn parse_keyword_seeds(content: &str) -> Result<KeywordsFile, ConfigError> {
    let mut file: KeywordsFile =
        serde_yaml::from_str(content).map_err(ConfigError::KeywordsFileParse)?;

    let mut seen = HashSet::new();
    for seed in &mut file.keywords {
        seed.keyword = validate_keyword(&seed.keyword)
            .map_err(|e| ConfigError::Validation(format!("'{}': {e}", seed.keyword)))?;
        seed.category = validate_category(seed.category.as_deref())
            .map_err(|e| ConfigError::Validation(format!("'{}': {e}", seed.keyword)))?;

        if !seen.insert(seed.keyword.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate keyword: '{}'",
                seed.keyword
            )));
        }
    }

    Ok(file)
}
