//! Two-stage analysis of user-selected posts.
//!
//! Stage 1 scores every loaded post; posts at or above
//! [`PASS_THRESHOLD`](crate::filter::PASS_THRESHOLD) go through Stage 2.
//! Nothing is written until both stages have run, and then everything is
//! written in one [`PainStore::persist_analysis`] call. A run whose Stage 2
//! calls all fail, or whose write fails, leaves storage untouched.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use painradar_db::{AnalysisWrite, NewActivity, NewPain, PainRow};
use uuid::Uuid;

use crate::config::RadarConfig;
use crate::error::RadarError;
use crate::extract::{ExtractInput, PainExtractor};
use crate::filter::{filter_stats, FilterInput, FilterResult, FilterStats, RelevanceFilter};
use crate::inference::InferenceClient;
use crate::store::PainStore;

/// Upper bound on post ids per analysis request.
pub const MAX_ANALYSIS_POSTS: usize = 50;

#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub workspace_id: Uuid,
    pub post_ids: Vec<Uuid>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// Posts loaded and scored by Stage 1.
    pub analyzed: usize,
    /// Posts that passed Stage 1.
    pub filtered: usize,
    pub pains_extracted: usize,
    pub pains: Vec<PainRow>,
    pub filter_results: Vec<FilterResult>,
    pub filter_stats: FilterStats,
    /// Stage 1 survivors whose Stage 2 call failed; they stay unanalyzed.
    pub failed_post_ids: Vec<Uuid>,
}

#[derive(Clone)]
pub struct Analyzer {
    store: Arc<dyn PainStore>,
    filter: RelevanceFilter,
    extractor: PainExtractor,
}

impl Analyzer {
    pub fn new(
        store: Arc<dyn PainStore>,
        client: Arc<dyn InferenceClient>,
        config: &RadarConfig,
    ) -> Self {
        let filter = RelevanceFilter::new(Arc::clone(&client), config.filter_model.clone())
            .with_batch_size(config.filter_batch_size)
            .with_concurrency(config.inference_concurrency);
        let extractor = PainExtractor::new(client, config.extract_model.clone())
            .with_concurrency(config.inference_concurrency);
        Self {
            store,
            filter,
            extractor,
        }
    }

    /// # Errors
    ///
    /// Returns [`RadarError::Validation`] for an empty or oversized id list,
    /// [`RadarError::NoPostsFound`] when none of the ids belong to the
    /// workspace, the Stage 2 error when every Stage 2 call failed, or
    /// [`RadarError::Store`] when persisting fails.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, RadarError> {
        let mut seen = HashSet::new();
        let ids: Vec<Uuid> = request
            .post_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();
        if ids.is_empty() || ids.len() > MAX_ANALYSIS_POSTS {
            return Err(RadarError::Validation(format!(
                "between 1 and {MAX_ANALYSIS_POSTS} post ids are required"
            )));
        }

        let rows = self.store.load_posts(request.workspace_id, &ids).await?;
        if rows.is_empty() {
            return Err(RadarError::NoPostsFound);
        }

        let filter_inputs: Vec<FilterInput> = rows
            .iter()
            .map(|row| FilterInput {
                post_id: row.post.id,
                platform: row.post.platform.clone(),
                title: row.post.title.clone(),
                content: row.post.content.clone(),
                author: row.post.author.clone(),
            })
            .collect();
        let filter_results = self.filter.filter(&filter_inputs).await;
        let stats = filter_stats(&filter_results);
        tracing::info!(
            posts = stats.total,
            passed = stats.passed,
            avg_score = stats.avg_score,
            "relevance filter finished"
        );

        let extract_inputs: Vec<ExtractInput> = rows
            .iter()
            .zip(&filter_results)
            .filter(|(_, result)| result.passed())
            .map(|(row, _)| ExtractInput {
                post_id: row.post.id,
                content: row.post.content.clone(),
                author: row.post.author.clone(),
                search_context: row.keyword_category.clone(),
            })
            .collect();
        let mut extractions = self.extractor.extract(&extract_inputs).await;

        if !extractions.is_empty() && extractions.iter().all(|e| e.result.is_err()) {
            let first = extractions.swap_remove(0);
            let err = first
                .result
                .err()
                .unwrap_or_else(|| RadarError::MalformedResponse("extraction failed".into()));
            tracing::error!(posts = extract_inputs.len(), error = %err, "every extraction call failed");
            return Err(err);
        }

        let filter_scores: Vec<(Uuid, i16)> = filter_results
            .iter()
            .map(|r| (r.post_id, i16::from(r.score)))
            .collect();
        let mut analyzed_post_ids: Vec<Uuid> = filter_results
            .iter()
            .filter(|r| !r.passed())
            .map(|r| r.post_id)
            .collect();
        let mut new_pains = Vec::new();
        let mut failed_post_ids = Vec::new();
        for extraction in extractions {
            match extraction.result {
                Ok(extracted) => {
                    new_pains.extend(extracted.into_iter().map(|pain| NewPain {
                        post_id: extraction.post_id,
                        pain_text: pain.pain_text,
                        category: pain.category,
                        severity: pain.severity,
                        sentiment: pain.sentiment,
                        confidence: pain.confidence,
                        keywords: pain.keywords,
                        context: pain.context,
                    }));
                    analyzed_post_ids.push(extraction.post_id);
                }
                Err(_) => failed_post_ids.push(extraction.post_id),
            }
        }

        let pains = self
            .store
            .persist_analysis(&AnalysisWrite {
                workspace_id: request.workspace_id,
                analyzed_at: Utc::now(),
                filter_scores: &filter_scores,
                pains: &new_pains,
                analyzed_post_ids: &analyzed_post_ids,
            })
            .await
            .inspect_err(|e| tracing::error!(error = %e, "failed to persist analysis"))?;

        let activity = NewActivity {
            workspace_id: request.workspace_id,
            user_id: request.user_id.as_deref(),
            activity_type: "CREATE",
            entity_type: "pain_analysis",
            entity_id: request.workspace_id.to_string(),
            action: "pain_radar.analyze",
            new_value: serde_json::json!({
                "postsAnalyzed": rows.len(),
                "painsExtracted": pains.len(),
            }),
        };
        if let Err(e) = self.store.record_activity(&activity).await {
            tracing::warn!(error = %e, "failed to record analysis activity");
        }

        Ok(AnalysisResult {
            analyzed: rows.len(),
            filtered: stats.passed,
            pains_extracted: pains.len(),
            pains,
            filter_results,
            filter_stats: stats,
            failed_post_ids,
        })
    }
}
