//! Live integration tests for painradar-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness, so they need `DATABASE_URL` and are ignored by default:
//! run with `cargo test -p painradar-db -- --ignored`.

use chrono::Utc;
use painradar_core::{
    calculate_engagement, EngagementMetrics, NormalizedPost, PainCategory, PainSeverity, Platform,
};
use painradar_db::{
    complete_scan, create_keyword, create_scan, fail_scan, find_post_by_key, get_pain,
    get_scan, insert_pain, insert_post, list_keywords_with_counts, list_pains, list_posts,
    list_posts_by_ids, persist_analysis, update_keyword, update_pain, update_post_metrics,
    AnalysisWrite, DbError, KeywordUpdate, NewPain, PainFilters, PainSortField, PainUpdate,
    PostFilters,
};
use uuid::Uuid;

fn make_post(platform_id: &str) -> NormalizedPost {
    let metrics = EngagementMetrics {
        likes: 5,
        comments: 2,
        shares: 0,
    };
    NormalizedPost {
        platform: Platform::HackerNews,
        platform_id: platform_id.to_string(),
        author: "pg".to_string(),
        author_url: None,
        title: "Ask HN: onboarding".to_string(),
        content: "Onboarding new engineers is painfully slow".to_string(),
        url: format!("https://news.ycombinator.com/item?id={platform_id}"),
        metrics,
        engagement: calculate_engagement(metrics),
        published_at: Utc::now(),
    }
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_keyword_is_a_conflict(pool: sqlx::PgPool) {
    let workspace = Uuid::new_v4();
    create_keyword(&pool, workspace, "slow onboarding", None, None)
        .await
        .expect("first insert");

    let err = create_keyword(&pool, workspace, "slow onboarding", None, None)
        .await
        .expect_err("second insert should conflict");
    assert!(matches!(err, DbError::Conflict(_)), "got {err:?}");

    // Same text in another workspace is fine.
    create_keyword(&pool, Uuid::new_v4(), "slow onboarding", None, None)
        .await
        .expect("other workspace");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn keyword_deactivation_keeps_row(pool: sqlx::PgPool) {
    let workspace = Uuid::new_v4();
    let keyword = create_keyword(&pool, workspace, "invoice hell", Some("finance"), None)
        .await
        .expect("create");

    let updated = update_keyword(
        &pool,
        workspace,
        keyword.id,
        KeywordUpdate {
            is_active: Some(false),
            category: Some(None),
            ..KeywordUpdate::default()
        },
    )
    .await
    .expect("update");
    assert!(!updated.is_active);
    assert!(updated.category.is_none());

    let listed = list_keywords_with_counts(&pool, workspace)
        .await
        .expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].post_count, 0);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn scan_lifecycle_allows_one_terminal_transition(pool: sqlx::PgPool) {
    let workspace = Uuid::new_v4();
    let keyword = create_keyword(&pool, workspace, "slow onboarding", None, None)
        .await
        .expect("keyword");
    let scan = create_scan(&pool, workspace, keyword.id, "HACKERNEWS")
        .await
        .expect("scan");
    assert_eq!(scan.status, "RUNNING");

    complete_scan(&pool, scan.id, 3, 2).await.expect("complete");
    let err = fail_scan(&pool, scan.id, "late failure")
        .await
        .expect_err("terminal scans cannot transition again");
    assert!(matches!(err, DbError::InvalidScanTransition { .. }));

    let fetched = get_scan(&pool, workspace, scan.id).await.expect("get");
    assert_eq!(fetched.status, "COMPLETED");
    assert_eq!((fetched.posts_found, fetched.posts_new), (3, 2));
    assert!(fetched.completed_at.is_some());

    let hidden = get_scan(&pool, Uuid::new_v4(), scan.id).await;
    assert!(matches!(hidden, Err(DbError::NotFound)));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn posts_are_unique_by_natural_key(pool: sqlx::PgPool) {
    let workspace = Uuid::new_v4();
    let keyword = create_keyword(&pool, workspace, "slow onboarding", None, None)
        .await
        .expect("keyword");
    let post = make_post("4242");

    let inserted = insert_post(&pool, keyword.id, &post).await.expect("insert");
    let err = insert_post(&pool, keyword.id, &post)
        .await
        .expect_err("duplicate natural key");
    assert!(matches!(err, DbError::Conflict(_)));

    let metrics = EngagementMetrics {
        likes: 50,
        comments: 9,
        shares: 0,
    };
    update_post_metrics(&pool, inserted.id, metrics, calculate_engagement(metrics))
        .await
        .expect("update metrics");

    let found = find_post_by_key(&pool, "HACKERNEWS", "4242")
        .await
        .expect("find")
        .expect("present");
    assert_eq!(found.id, inserted.id);
    assert_eq!(found.likes, 50);
    assert_eq!(found.engagement, 77);

    let other_workspace = list_posts_by_ids(&pool, Uuid::new_v4(), &[inserted.id])
        .await
        .expect("scoped list");
    assert!(other_workspace.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn pains_filter_by_category_and_search(pool: sqlx::PgPool) {
    let workspace = Uuid::new_v4();
    let keyword = create_keyword(&pool, workspace, "slow onboarding", None, None)
        .await
        .expect("keyword");
    let post = insert_post(&pool, keyword.id, &make_post("1"))
        .await
        .expect("post");

    for (text, category, severity) in [
        ("Onboarding takes weeks", PainCategory::Process, PainSeverity::High),
        ("Licenses are too expensive", PainCategory::Cost, PainSeverity::Medium),
    ] {
        insert_pain(
            &pool,
            workspace,
            &NewPain {
                post_id: post.id,
                pain_text: text.to_string(),
                category,
                severity,
                sentiment: -0.6,
                confidence: 0.9,
                keywords: vec!["onboarding".to_string()],
                context: None,
            },
        )
        .await
        .expect("insert pain");
    }

    let (rows, total) = list_pains(
        &pool,
        workspace,
        &PainFilters {
            search: Some("ONBOARDING"),
            sort: PainSortField::Severity,
            limit: 50,
            ..PainFilters::default()
        },
    )
    .await
    .expect("list");
    assert_eq!(total, 1);
    assert_eq!(rows[0].category, "PROCESS");
    assert_eq!(rows[0].frequency, 1);

    let (rows, total) = list_pains(
        &pool,
        workspace,
        &PainFilters {
            category: Some(PainCategory::Cost),
            limit: 50,
            ..PainFilters::default()
        },
    )
    .await
    .expect("list by category");
    assert_eq!(total, 1);
    assert_eq!(rows[0].severity, "MEDIUM");
}

fn make_pain(post_id: Uuid, text: &str, sentiment: f64) -> NewPain {
    NewPain {
        post_id,
        pain_text: text.to_string(),
        category: PainCategory::Process,
        severity: PainSeverity::High,
        sentiment,
        confidence: 0.8,
        keywords: Vec::new(),
        context: None,
    }
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn analysis_write_commits_scores_pains_and_flags_together(pool: sqlx::PgPool) {
    let workspace = Uuid::new_v4();
    let keyword = create_keyword(&pool, workspace, "slow onboarding", None, None)
        .await
        .expect("keyword");
    let relevant = insert_post(&pool, keyword.id, &make_post("10")).await.expect("post");
    let noise = insert_post(&pool, keyword.id, &make_post("11")).await.expect("post");

    let pains = [make_pain(relevant.id, "Onboarding takes weeks", -0.7)];
    let rows = persist_analysis(
        &pool,
        &AnalysisWrite {
            workspace_id: workspace,
            analyzed_at: Utc::now(),
            filter_scores: &[(relevant.id, 88), (noise.id, 12)],
            pains: &pains,
            analyzed_post_ids: &[noise.id, relevant.id],
        },
    )
    .await
    .expect("persist");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].severity_rank, 3);

    let posts = list_posts_by_ids(&pool, workspace, &[relevant.id, noise.id])
        .await
        .expect("posts");
    assert_eq!(posts.len(), 2);
    for row in &posts {
        assert!(row.post.is_analyzed);
        assert!(row.post.analyzed_at.is_some());
        let expected = if row.post.id == relevant.id { 88 } else { 12 };
        assert_eq!(row.post.filter_score, Some(expected));
    }
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn analysis_write_rolls_back_when_a_pain_is_rejected(pool: sqlx::PgPool) {
    let workspace = Uuid::new_v4();
    let keyword = create_keyword(&pool, workspace, "slow onboarding", None, None)
        .await
        .expect("keyword");
    let post = insert_post(&pool, keyword.id, &make_post("20")).await.expect("post");

    // The second pain violates the sentiment range check.
    let pains = [
        make_pain(post.id, "Onboarding takes weeks", -0.7),
        make_pain(post.id, "Out of range", 5.0),
    ];
    persist_analysis(
        &pool,
        &AnalysisWrite {
            workspace_id: workspace,
            analyzed_at: Utc::now(),
            filter_scores: &[(post.id, 90)],
            pains: &pains,
            analyzed_post_ids: &[post.id],
        },
    )
    .await
    .expect_err("check violation");

    let (rows, total) = list_pains(
        &pool,
        workspace,
        &PainFilters {
            limit: 50,
            ..PainFilters::default()
        },
    )
    .await
    .expect("list");
    assert!(rows.is_empty());
    assert_eq!(total, 0);

    let stored = find_post_by_key(&pool, "HACKERNEWS", "20")
        .await
        .expect("find")
        .expect("present");
    assert!(!stored.is_analyzed);
    assert!(stored.filter_score.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn posts_list_filters_by_keyword_state_and_text(pool: sqlx::PgPool) {
    let workspace = Uuid::new_v4();
    let onboarding = create_keyword(&pool, workspace, "slow onboarding", None, None)
        .await
        .expect("keyword");
    let billing = create_keyword(&pool, workspace, "billing pain", None, None)
        .await
        .expect("keyword");
    let first = insert_post(&pool, onboarding.id, &make_post("30")).await.expect("post");
    insert_post(&pool, onboarding.id, &make_post("31")).await.expect("post");
    let mut invoice = make_post("32");
    invoice.title = "Invoices 100% manual".to_string();
    invoice.content = "We reconcile by hand".to_string();
    insert_post(&pool, billing.id, &invoice).await.expect("post");

    let foreign = create_keyword(&pool, Uuid::new_v4(), "slow onboarding", None, None)
        .await
        .expect("keyword");
    insert_post(&pool, foreign.id, &make_post("33")).await.expect("post");

    persist_analysis(
        &pool,
        &AnalysisWrite {
            workspace_id: workspace,
            analyzed_at: Utc::now(),
            filter_scores: &[(first.id, 10)],
            pains: &[],
            analyzed_post_ids: &[first.id],
        },
    )
    .await
    .expect("mark analyzed");

    let (rows, total) = list_posts(
        &pool,
        workspace,
        &PostFilters {
            limit: 50,
            ..PostFilters::default()
        },
    )
    .await
    .expect("all");
    assert_eq!(total, 3);
    assert_eq!(rows.len(), 3);

    let (rows, total) = list_posts(
        &pool,
        workspace,
        &PostFilters {
            keyword_id: Some(onboarding.id),
            is_analyzed: Some(false),
            limit: 50,
            ..PostFilters::default()
        },
    )
    .await
    .expect("unanalyzed for keyword");
    assert_eq!(total, 1);
    assert_eq!(rows[0].platform_id, "31");

    let (rows, total) = list_posts(
        &pool,
        workspace,
        &PostFilters {
            search: Some("100%"),
            limit: 50,
            ..PostFilters::default()
        },
    )
    .await
    .expect("search");
    assert_eq!(total, 1);
    assert_eq!(rows[0].platform_id, "32");

    let (rows, total) = list_posts(
        &pool,
        workspace,
        &PostFilters {
            limit: 1,
            offset: 2,
            ..PostFilters::default()
        },
    )
    .await
    .expect("page");
    assert_eq!(total, 3);
    assert_eq!(rows.len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn pain_update_reports_previous_values(pool: sqlx::PgPool) {
    let workspace = Uuid::new_v4();
    let keyword = create_keyword(&pool, workspace, "slow onboarding", None, None)
        .await
        .expect("keyword");
    let post = insert_post(&pool, keyword.id, &make_post("40")).await.expect("post");
    let pain = insert_pain(&pool, workspace, &make_pain(post.id, "Onboarding takes weeks", -0.4))
        .await
        .expect("pain");

    let change = update_pain(
        &pool,
        workspace,
        pain.id,
        PainUpdate {
            severity: Some(PainSeverity::Critical),
            ..PainUpdate::default()
        },
    )
    .await
    .expect("update");
    assert_eq!(change.before.severity, "HIGH");
    assert_eq!(change.after.severity, "CRITICAL");
    assert_eq!(change.after.severity_rank, 4);
    assert_eq!(change.after.category, "PROCESS");

    let fetched = get_pain(&pool, workspace, pain.id).await.expect("get");
    assert_eq!(fetched.severity, "CRITICAL");

    let hidden = get_pain(&pool, Uuid::new_v4(), pain.id).await;
    assert!(matches!(hidden, Err(DbError::NotFound)));
    let missing = update_pain(&pool, workspace, Uuid::new_v4(), PainUpdate::default()).await;
    assert!(matches!(missing, Err(DbError::NotFound)));
}
