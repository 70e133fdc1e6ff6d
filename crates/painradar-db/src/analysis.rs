//! The single write that commits one analysis run.
//!
//! Stage 1 scores, Stage 2 pains and the `is_analyzed` flags land in one
//! transaction. If any statement fails the whole run rolls back and every
//! post stays eligible for the next analysis.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::pains::{insert_pain_on, NewPain, PainRow};
use crate::DbError;

/// Everything an analysis run writes.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisWrite<'a> {
    pub workspace_id: Uuid,
    pub analyzed_at: DateTime<Utc>,
    /// Stage 1 `(post_id, score)` for every scored post.
    pub filter_scores: &'a [(Uuid, i16)],
    pub pains: &'a [NewPain],
    /// Posts that failed Stage 1 or completed Stage 2.
    pub analyzed_post_ids: &'a [Uuid],
}

/// Persist an analysis run atomically and return the inserted pains in
/// input order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; nothing is committed
/// in that case.
pub async fn persist_analysis(
    pool: &PgPool,
    write: &AnalysisWrite<'_>,
) -> Result<Vec<PainRow>, DbError> {
    let (ids, scores): (Vec<Uuid>, Vec<i16>) = write.filter_scores.iter().copied().unzip();

    let mut tx = pool.begin().await?;

    if !ids.is_empty() {
        sqlx::query(
            "UPDATE social_posts AS p SET filter_score = s.score \
             FROM UNNEST($1::uuid[], $2::smallint[]) AS s(id, score) \
             WHERE p.id = s.id",
        )
        .bind(&ids)
        .bind(&scores)
        .execute(&mut *tx)
        .await?;
    }

    let mut rows = Vec::with_capacity(write.pains.len());
    for pain in write.pains {
        rows.push(insert_pain_on(&mut *tx, write.workspace_id, pain).await?);
    }

    if !write.analyzed_post_ids.is_empty() {
        sqlx::query(
            "UPDATE social_posts SET is_analyzed = true, analyzed_at = $1 WHERE id = ANY($2)",
        )
        .bind(write.analyzed_at)
        .bind(write.analyzed_post_ids)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(rows)
}
