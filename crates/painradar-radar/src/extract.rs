//! Stage 2: structured pain extraction with a stronger model.
//!
//! One inference call per post. Each post's outcome is independent: a
//! transport failure marks only that post failed, and a malformed answer
//! yields an empty extraction for that post.

use std::fmt::Write as _;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use painradar_core::{PainCategory, PainSeverity};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::RadarError;
use crate::inference::{ChatMessage, InferenceClient};
use crate::response::extract_json_object;

const MAX_TOKENS: u32 = 1500;
const TEMPERATURE: f32 = 0.3;
const DEFAULT_CONFIDENCE: f64 = 0.8;
/// Stored as the pain context when the model gives none.
const CONTEXT_FALLBACK_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub struct ExtractInput {
    pub post_id: Uuid,
    pub content: String,
    pub author: String,
    /// What was searched for (e.g. the keyword category); added to the prompt.
    pub search_context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedPain {
    pub pain_text: String,
    pub category: PainCategory,
    pub severity: PainSeverity,
    /// `-1.0` (very negative) ..= `1.0`.
    pub sentiment: f64,
    /// `0.0` ..= `1.0`.
    pub confidence: f64,
    pub keywords: Vec<String>,
    pub context: Option<String>,
}

#[derive(Debug)]
pub struct PostExtraction {
    pub post_id: Uuid,
    pub result: Result<Vec<ExtractedPain>, RadarError>,
}

#[derive(Clone)]
pub struct PainExtractor {
    client: Arc<dyn InferenceClient>,
    model: String,
    concurrency: usize,
}

impl PainExtractor {
    pub fn new(client: Arc<dyn InferenceClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            concurrency: 1,
        }
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Extract pains from every post, preserving input order.
    pub async fn extract(&self, posts: &[ExtractInput]) -> Vec<PostExtraction> {
        let futures: Vec<_> = posts
            .iter()
            .map(|post| async move {
                PostExtraction {
                    post_id: post.post_id,
                    result: self.extract_one(post).await,
                }
            })
            .collect();
        stream::iter(futures)
            .buffered(self.concurrency)
            .collect()
            .await
    }

    async fn extract_one(&self, post: &ExtractInput) -> Result<Vec<ExtractedPain>, RadarError> {
        let prompt = build_prompt(post);
        let text = self
            .client
            .invoke(&self.model, &[ChatMessage::user(prompt)], MAX_TOKENS, Some(TEMPERATURE))
            .await
            .inspect_err(|e| {
                tracing::warn!(post_id = %post.post_id, error = %e, "pain extraction call failed");
            })?;

        let Some(pains) = parse_pains(&text) else {
            tracing::warn!(post_id = %post.post_id, "malformed extraction response, no pains recorded");
            return Ok(Vec::new());
        };
        let fallback_context: String = post.content.chars().take(CONTEXT_FALLBACK_CHARS).collect();
        Ok(pains
            .into_iter()
            .map(|mut pain| {
                if pain.context.is_none() && !fallback_context.is_empty() {
                    pain.context = Some(fallback_context.clone());
                }
                pain
            })
            .collect())
    }
}

/// Parse a model answer into pains.
///
/// Accepts `{"posts": [{"pains": [...]}]}` or a bare `{"pains": [...]}`.
/// Returns `None` when no JSON object with either shape is present. Pains with
/// empty text are dropped; other missing or invalid fields take defaults.
#[must_use]
pub fn parse_pains(text: &str) -> Option<Vec<ExtractedPain>> {
    let value = extract_json_object(text)?;
    let raw: Vec<&Value> = if let Some(posts) = value.get("posts").and_then(Value::as_array) {
        posts
            .iter()
            .filter_map(|p| p.get("pains").and_then(Value::as_array))
            .flatten()
            .collect()
    } else {
        value.get("pains").and_then(Value::as_array)?.iter().collect()
    };
    Some(raw.into_iter().filter_map(parse_pain).collect())
}

fn parse_pain(value: &Value) -> Option<ExtractedPain> {
    let pain_text = value.get("painText").and_then(Value::as_str)?.trim();
    if pain_text.is_empty() {
        return None;
    }
    let str_field = |name: &str| value.get(name).and_then(Value::as_str);

    Some(ExtractedPain {
        pain_text: pain_text.to_string(),
        category: str_field("category")
            .and_then(|s| s.parse().ok())
            .unwrap_or(PainCategory::Other),
        severity: str_field("severity")
            .and_then(|s| s.parse().ok())
            .unwrap_or(PainSeverity::Medium),
        sentiment: value
            .get("sentiment")
            .and_then(Value::as_f64)
            .map_or(0.0, |s| s.clamp(-1.0, 1.0)),
        confidence: value
            .get("confidence")
            .and_then(Value::as_f64)
            .map_or(DEFAULT_CONFIDENCE, |c| c.clamp(0.0, 1.0)),
        keywords: value
            .get("keywords")
            .and_then(Value::as_array)
            .map(|k| {
                k.iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default(),
        context: str_field("context")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from),
    })
}

fn build_prompt(post: &ExtractInput) -> String {
    let categories: Vec<&str> = PainCategory::ALL.iter().map(|c| c.as_str()).collect();
    let severities: Vec<&str> = PainSeverity::ALL.iter().map(|s| s.as_str()).collect();

    let mut prompt = String::from(
        "You are an expert in business pains and customer needs.\n\n\
         Analyze the following social media post and extract the pains, problems \
         and needs it describes.\n\n",
    );
    let _ = write!(prompt, "Author: {}\nText: \"{}\"\n\n", post.author, post.content);
    if let Some(context) = post.search_context.as_deref().filter(|c| !c.trim().is_empty()) {
        let _ = write!(prompt, "Search context: {context}\n\n");
    }
    let _ = write!(
        prompt,
        "For each pain determine:\n\
         1. painText: a short description of the pain\n\
         2. category: one of {}\n\
         3. severity: one of {}\n\
         4. sentiment: a number from -1.0 (very negative) to 1.0 (positive)\n\
         5. confidence: your confidence from 0.0 to 1.0\n\
         6. keywords: 2-5 key words\n\
         7. context: one sentence of context\n\n\
         Return ONLY JSON with no other text:\n\
         {{\"posts\": [{{\"postIndex\": 0, \"pains\": [{{\"painText\": \"...\", \
         \"category\": \"TECHNICAL\", \"severity\": \"HIGH\", \"sentiment\": -0.7, \
         \"confidence\": 0.9, \"keywords\": [\"bug\", \"crash\"], \"context\": \"...\"}}]}}]}}\n\n\
         If the post contains no pains, return an empty pains array.",
        categories.join(", "),
        severities.join(", ")
    );
    prompt
}
