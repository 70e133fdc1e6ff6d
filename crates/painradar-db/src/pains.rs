//! Database operations for the `extracted_pains` table.

use chrono::{DateTime, Utc};
use painradar_core::{PainCategory, PainSeverity};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `extracted_pains` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PainRow {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub post_id: Uuid,
    pub pain_text: String,
    pub category: String,
    pub severity: String,
    /// `1` (LOW) .. `4` (CRITICAL); mirrors `severity` for ordering.
    pub severity_rank: i16,
    pub sentiment: f64,
    pub confidence: f64,
    pub frequency: i32,
    pub trend: f64,
    pub keywords: Vec<String>,
    pub context: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Values for a new pain row.
#[derive(Debug, Clone)]
pub struct NewPain {
    pub post_id: Uuid,
    pub pain_text: String,
    pub category: PainCategory,
    pub severity: PainSeverity,
    pub sentiment: f64,
    pub confidence: f64,
    pub keywords: Vec<String>,
    pub context: Option<String>,
}

/// Sort key for [`list_pains`]. Every variant sorts descending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PainSortField {
    #[default]
    CreatedAt,
    Frequency,
    Trend,
    Severity,
}

impl PainSortField {
    fn order_by(self) -> &'static str {
        match self {
            PainSortField::CreatedAt => "created_at DESC, id",
            PainSortField::Frequency => "frequency DESC, created_at DESC, id",
            PainSortField::Trend => "trend DESC, created_at DESC, id",
            PainSortField::Severity => "severity_rank DESC, created_at DESC, id",
        }
    }
}

/// Filters and paging for [`list_pains`].
#[derive(Debug, Clone, Default)]
pub struct PainFilters<'a> {
    pub category: Option<PainCategory>,
    pub severity: Option<PainSeverity>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    /// Case-insensitive substring match on `pain_text`.
    pub search: Option<&'a str>,
    pub sort: PainSortField,
    pub limit: i64,
    pub offset: i64,
}

/// Reviewer edits to a pain; `None` leaves the field unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PainUpdate {
    pub category: Option<PainCategory>,
    pub severity: Option<PainSeverity>,
}

/// A pain as it was before and after [`update_pain`].
#[derive(Debug, Clone)]
pub struct PainChange {
    pub before: PainRow,
    pub after: PainRow,
}

const PAIN_COLUMNS: &str = "id, workspace_id, post_id, pain_text, category, severity, \
     severity_rank, sentiment, confidence, frequency, trend, keywords, context, created_at";

const PAIN_FILTER_CLAUSE: &str = "workspace_id = $1 \
       AND ($2::TEXT IS NULL OR category = $2) \
       AND ($3::TEXT IS NULL OR severity = $3) \
       AND ($4::timestamptz IS NULL OR created_at >= $4) \
       AND ($5::timestamptz IS NULL OR created_at <= $5) \
       AND ($6::TEXT IS NULL OR pain_text ILIKE $6 ESCAPE '\\')";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Insert one extracted pain with `frequency = 1` and `trend = 0`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_pain(
    pool: &PgPool,
    workspace_id: Uuid,
    pain: &NewPain,
) -> Result<PainRow, DbError> {
    let mut conn = pool.acquire().await?;
    insert_pain_on(&mut conn, workspace_id, pain).await
}

pub(crate) async fn insert_pain_on(
    conn: &mut PgConnection,
    workspace_id: Uuid,
    pain: &NewPain,
) -> Result<PainRow, DbError> {
    let sql = format!(
        "INSERT INTO extracted_pains \
             (id, workspace_id, post_id, pain_text, category, severity, severity_rank, \
              sentiment, confidence, keywords, context) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING {PAIN_COLUMNS}"
    );

    let row = sqlx::query_as::<_, PainRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(workspace_id)
        .bind(pain.post_id)
        .bind(&pain.pain_text)
        .bind(pain.category.as_str())
        .bind(pain.severity.as_str())
        .bind(pain.severity.rank())
        .bind(pain.sentiment)
        .bind(pain.confidence)
        .bind(&pain.keywords)
        .bind(pain.context.as_deref())
        .fetch_one(&mut *conn)
        .await?;

    Ok(row)
}

/// Fetch one pain scoped to the workspace.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no pain with that id belongs to the
/// workspace, or [`DbError::Sqlx`] if the query fails.
pub async fn get_pain(pool: &PgPool, workspace_id: Uuid, id: Uuid) -> Result<PainRow, DbError> {
    let sql = format!(
        "SELECT {PAIN_COLUMNS} FROM extracted_pains \
         WHERE id = $1 AND workspace_id = $2"
    );

    sqlx::query_as::<_, PainRow>(&sql)
        .bind(id)
        .bind(workspace_id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Apply a reviewer's category/severity edit. `severity_rank` follows the
/// new severity. The row is locked between the read and the write so the
/// returned `before` is exactly what the update replaced.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no pain with that id belongs to the
/// workspace, or [`DbError::Sqlx`] if a statement fails.
pub async fn update_pain(
    pool: &PgPool,
    workspace_id: Uuid,
    id: Uuid,
    update: PainUpdate,
) -> Result<PainChange, DbError> {
    let mut tx = pool.begin().await?;

    let select_sql = format!(
        "SELECT {PAIN_COLUMNS} FROM extracted_pains \
         WHERE id = $1 AND workspace_id = $2 \
         FOR UPDATE"
    );
    let before = sqlx::query_as::<_, PainRow>(&select_sql)
        .bind(id)
        .bind(workspace_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;

    let update_sql = format!(
        "UPDATE extracted_pains SET \
             category      = COALESCE($3, category), \
             severity      = COALESCE($4, severity), \
             severity_rank = COALESCE($5, severity_rank) \
         WHERE id = $1 AND workspace_id = $2 \
         RETURNING {PAIN_COLUMNS}"
    );
    let after = sqlx::query_as::<_, PainRow>(&update_sql)
        .bind(id)
        .bind(workspace_id)
        .bind(update.category.map(PainCategory::as_str))
        .bind(update.severity.map(PainSeverity::as_str))
        .bind(update.severity.map(PainSeverity::rank))
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(PainChange { before, after })
}

/// One page of the workspace's pains plus the total matching the filters.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either query fails.
pub async fn list_pains(
    pool: &PgPool,
    workspace_id: Uuid,
    filters: &PainFilters<'_>,
) -> Result<(Vec<PainRow>, i64), DbError> {
    let category = filters.category.map(PainCategory::as_str);
    let severity = filters.severity.map(PainSeverity::as_str);
    let pattern = filters.search.map(like_pattern);

    let sql = format!(
        "SELECT {PAIN_COLUMNS} FROM extracted_pains \
         WHERE {PAIN_FILTER_CLAUSE} \
         ORDER BY {} \
         LIMIT $7 OFFSET $8",
        filters.sort.order_by()
    );

    let rows = sqlx::query_as::<_, PainRow>(&sql)
        .bind(workspace_id)
        .bind(category)
        .bind(severity)
        .bind(filters.date_from)
        .bind(filters.date_to)
        .bind(pattern.as_deref())
        .bind(filters.limit)
        .bind(filters.offset)
        .fetch_all(pool)
        .await?;

    let count_sql = format!("SELECT COUNT(*) FROM extracted_pains WHERE {PAIN_FILTER_CLAUSE}");
    let total = sqlx::query_scalar::<_, i64>(&count_sql)
        .bind(workspace_id)
        .bind(category)
        .bind(severity)
        .bind(filters.date_from)
        .bind(filters.date_to)
        .bind(pattern.as_deref())
        .fetch_one(pool)
        .await?;

    Ok((rows, total))
}

/// Pain counts per category across the whole workspace.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_pains_by_category(
    pool: &PgPool,
    workspace_id: Uuid,
) -> Result<Vec<(String, i64)>, DbError> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT category, COUNT(*) FROM extracted_pains \
         WHERE workspace_id = $1 \
         GROUP BY category \
         ORDER BY COUNT(*) DESC, category",
    )
    .bind(workspace_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Pain counts per severity across the whole workspace.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_pains_by_severity(
    pool: &PgPool,
    workspace_id: Uuid,
) -> Result<Vec<(String, i64)>, DbError> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT severity, COUNT(*) FROM extracted_pains \
         WHERE workspace_id = $1 \
         GROUP BY severity, severity_rank \
         ORDER BY severity_rank DESC",
    )
    .bind(workspace_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Every pain created in the workspace since `since`, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_pains_since(
    pool: &PgPool,
    workspace_id: Uuid,
    since: DateTime<Utc>,
) -> Result<Vec<PainRow>, DbError> {
    let sql = format!(
        "SELECT {PAIN_COLUMNS} FROM extracted_pains \
         WHERE workspace_id = $1 AND created_at >= $2 \
         ORDER BY created_at, id"
    );

    let rows = sqlx::query_as::<_, PainRow>(&sql)
        .bind(workspace_id)
        .bind(since)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// The `limit` most frequent pains since `since`, ties broken by severity.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_top_pains(
    pool: &PgPool,
    workspace_id: Uuid,
    since: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<PainRow>, DbError> {
    let sql = format!(
        "SELECT {PAIN_COLUMNS} FROM extracted_pains \
         WHERE workspace_id = $1 AND created_at >= $2 \
         ORDER BY frequency DESC, severity_rank DESC, created_at DESC, id \
         LIMIT $3"
    );

    let rows = sqlx::query_as::<_, PainRow>(&sql)
        .bind(workspace_id)
        .bind(since)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Wrap user text as an `ILIKE` substring pattern with `%`, `_` and `\` escaped.
pub(crate) fn like_pattern(raw: &str) -> String {
    let mut pattern = String::with_capacity(raw.len() + 2);
    pattern.push('%');
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
