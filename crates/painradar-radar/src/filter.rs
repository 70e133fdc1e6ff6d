//! Stage 1: cheap relevance triage with a small model.
//!
//! Posts are scored in fixed-size batches, one inference call per batch. The
//! stage never fails: a batch whose call errors or whose answer cannot be
//! parsed gets [`FALLBACK_SCORE`] for every post, and a short answer is padded
//! with it. Callers always receive exactly one result per input post, in input
//! order.

use std::fmt::Write as _;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use uuid::Uuid;

use crate::inference::{ChatMessage, InferenceClient};
use crate::response::extract_score_array;

/// Posts scoring at least this proceed to Stage 2.
pub const PASS_THRESHOLD: u8 = 50;
/// Neutral score used when the model gives no usable answer.
pub const FALLBACK_SCORE: u8 = 50;
pub const DEFAULT_BATCH_SIZE: usize = 50;

const HIGH_SCORE: u8 = 80;
const SNIPPET_CHARS: usize = 300;
const MAX_TOKENS: u32 = 200;
const TEMPERATURE: f32 = 0.3;

/// What Stage 1 sees of a post.
#[derive(Debug, Clone)]
pub struct FilterInput {
    pub post_id: Uuid,
    pub platform: String,
    pub title: String,
    pub content: String,
    pub author: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterResult {
    pub post_id: Uuid,
    pub score: u8,
}

impl FilterResult {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.score >= PASS_THRESHOLD
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreDistribution {
    /// 80..=100
    pub high: usize,
    /// 50..=79
    pub medium: usize,
    /// 0..=49
    pub low: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterStats {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Mean score rounded to one decimal.
    pub avg_score: f64,
    pub distribution: ScoreDistribution,
}

#[must_use]
pub fn filter_stats(results: &[FilterResult]) -> FilterStats {
    let mut distribution = ScoreDistribution::default();
    for result in results {
        match result.score {
            s if s >= HIGH_SCORE => distribution.high += 1,
            s if s >= PASS_THRESHOLD => distribution.medium += 1,
            _ => distribution.low += 1,
        }
    }
    let passed = results.iter().filter(|r| r.passed()).count();
    FilterStats {
        total: results.len(),
        passed,
        failed: results.len() - passed,
        avg_score: crate::scoring::mean(results.iter().map(|r| f64::from(r.score))),
        distribution,
    }
}

#[derive(Clone)]
pub struct RelevanceFilter {
    client: Arc<dyn InferenceClient>,
    model: String,
    batch_size: usize,
    concurrency: usize,
}

impl RelevanceFilter {
    pub fn new(client: Arc<dyn InferenceClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: 1,
        }
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Maximum batches in flight at once.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Score every post; the result has the same length and order as `posts`.
    pub async fn filter(&self, posts: &[FilterInput]) -> Vec<FilterResult> {
        if posts.is_empty() {
            return Vec::new();
        }
        let futures: Vec<_> = posts
            .chunks(self.batch_size)
            .enumerate()
            .map(|(index, batch)| self.score_batch(index, batch))
            .collect();
        let batches: Vec<Vec<FilterResult>> = stream::iter(futures)
            .buffered(self.concurrency)
            .collect()
            .await;
        batches.into_iter().flatten().collect()
    }

    async fn score_batch(&self, index: usize, batch: &[FilterInput]) -> Vec<FilterResult> {
        let prompt = build_prompt(batch);
        let scores = match self
            .client
            .invoke(&self.model, &[ChatMessage::user(prompt)], MAX_TOKENS, Some(TEMPERATURE))
            .await
        {
            Ok(text) => parse_scores(index, &text, batch.len()),
            Err(e) => {
                tracing::warn!(
                    batch = index,
                    size = batch.len(),
                    error = %e,
                    "relevance batch failed, using fallback scores"
                );
                vec![FALLBACK_SCORE; batch.len()]
            }
        };

        batch
            .iter()
            .zip(scores)
            .map(|(post, score)| FilterResult {
                post_id: post.post_id,
                score,
            })
            .collect()
    }
}

/// Exactly `expected` scores from a model answer, padding or falling back as
/// needed.
fn parse_scores(batch: usize, text: &str, expected: usize) -> Vec<u8> {
    let Some(mut scores) = extract_score_array(text) else {
        tracing::warn!(batch, "no score array in relevance response, using fallback scores");
        return vec![FALLBACK_SCORE; expected];
    };
    if scores.len() != expected {
        tracing::warn!(
            batch,
            expected,
            received = scores.len(),
            "relevance score count mismatch"
        );
        scores.resize(expected, FALLBACK_SCORE);
    }
    scores
}

fn build_prompt(batch: &[FilterInput]) -> String {
    let mut prompt = String::from(
        "You are an expert at spotting real business problems and pain points.\n\n\
         Rate each post from 0 to 100 for the presence of a REAL business pain:\n\
         - 80-100: a serious problem that needs solving (explicit pain, concrete problem)\n\
         - 50-79: moderate pain with potential (dissatisfaction, difficulty)\n\
         - 0-49: not relevant (news, advertising, a question without pain, general talk)\n\n\
         Posts:\n",
    );
    for (i, post) in batch.iter().enumerate() {
        let snippet: String = post.content.chars().take(SNIPPET_CHARS).collect();
        let _ = write!(
            prompt,
            "{}. [{}] {}\nAuthor: {}\nContent: {}...\n\n",
            i + 1,
            post.platform,
            post.title,
            post.author,
            snippet
        );
    }
    let _ = write!(
        prompt,
        "IMPORTANT: return ONLY a JSON array of {} integer scores, in the same order \
         as the posts, with no other text.\nFormat: [85, 23, 67, ...]\n\nScores:",
        batch.len()
    );
    prompt
}
