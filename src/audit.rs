use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::collectors::{AuditContext, Collector};
use crate::fetch::{Fetcher, PageSnapshot};
use crate::models::{AuditResult, Submission, Task};
use crate::narrative::{self, NarrativeDelegate};
use crate::page::Page;
use crate::scoring;

/// Runs every registered collector over one snapshot and pools the tasks.
/// A collector that panics contributes no tasks; the rest still run.
pub fn collect_tasks(submission: &Submission, snapshot: &PageSnapshot) -> Vec<Task> {
    let page = snapshot.html.as_deref().map(Page::parse);
    if page.is_none() {
        warn!(url = %submission.website_url, "Homepage unavailable; document checks degrade to INFO");
    }

    let ctx = AuditContext {
        submission,
        page: page.as_ref(),
        snapshot,
    };

    let mut pool = Vec::new();
    for collector in Collector::REGISTRY {
        debug!(category = %collector.category(), "Running collector");
        pool.extend(run_isolated(collector, || collector.collect(&ctx)));
    }
    pool
}

pub fn run_isolated<F>(collector: Collector, collect: F) -> Vec<Task>
where
    F: FnOnce() -> Vec<Task>,
{
    match panic::catch_unwind(AssertUnwindSafe(collect)) {
        Ok(tasks) => tasks,
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!(category = %collector.category(), reason = %reason, "Collector failed; contributing no tasks");
            Vec::new()
        }
    }
}

/// Scores a snapshot and attaches the narrative. Network-free.
pub async fn evaluate(
    submission: Submission,
    snapshot: &PageSnapshot,
    delegate: Option<&dyn NarrativeDelegate>,
    narrative_timeout: Duration,
) -> AuditResult {
    let tasks = collect_tasks(&submission, snapshot);
    let mut overall = scoring::score_all(&tasks);
    overall.narrative =
        Some(narrative::build_narrative(&submission, &overall, delegate, narrative_timeout).await);

    info!(
        business = %submission.business_name,
        total = overall.total_points,
        max = overall.max_total_points,
        grade = %overall.grade,
        "Audit scored"
    );

    AuditResult {
        job_id: Uuid::new_v4(),
        submission,
        overall,
        completed_at: Utc::now(),
    }
}

pub async fn run_audit(
    fetcher: &Fetcher,
    submission: Submission,
    delegate: Option<&dyn NarrativeDelegate>,
    narrative_timeout: Duration,
) -> AuditResult {
    info!(business = %submission.business_name, url = %submission.website_url, "Starting audit");
    let snapshot = fetcher.snapshot(&submission.website_url).await;
    evaluate(submission, &snapshot, delegate, narrative_timeout).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::L1_NAME;
    use crate::models::{Category, Narrative, TaskStatus};

    fn submission() -> Submission {
        Submission {
            id: Uuid::new_v4(),
            business_name: "Rise Bakery".to_string(),
            website_url: "https://risebakery.com".to_string(),
            contact_email: "owner@risebakery.com".to_string(),
            location: None,
            services: Vec::new(),
            created_at: Utc::now(),
        }
    }

    const FULL_HTML: &str = r#"
        <html><head>
          <title>Rise Bakery | Tampa Sourdough</title>
          <meta name="description" content="Artisan sourdough, pastries and custom cakes baked fresh every morning in Tampa.">
          <link rel="canonical" href="https://risebakery.com">
          <script type="application/ld+json">{"@type": "LocalBusiness"}</script>
          <script type="application/ld+json">{"@type": "FAQPage"}</script>
          <script src="https://www.googletagmanager.com/gtag/js"></script>
          <script src="https://widget.intercom.io/widget.js"></script>
        </head><body>
          <h1>Rise Bakery</h1>
          <h2>Breads</h2>
          <p>(813) 555-0199</p>
          <a href="/about">About</a>
          <a href="/contact">Contact</a>
          <a href="https://facebook.com/rise">Facebook</a>
          <a href="https://linkedin.com/company/rise">LinkedIn</a>
          <a href="https://g.page/rise-bakery">Find us</a>
          <a href="https://www.bbb.org/rise">BBB</a>
          <form action="/order"></form>
        </body></html>
    "#;

    #[test]
    fn pool_covers_every_category_in_order() {
        let tasks = collect_tasks(&submission(), &PageSnapshot::default());
        let categories: Vec<Category> = tasks.iter().map(|t| t.category()).collect();
        let mut sorted = categories.clone();
        sorted.sort();
        assert_eq!(categories, sorted);
        assert_eq!(tasks.len(), 22);
    }

    #[test]
    fn panicking_collector_contributes_nothing() {
        let tasks = run_isolated(Collector::Semantic, || panic!("selector engine exploded"));
        assert!(tasks.is_empty());

        let tasks = run_isolated(Collector::Identity, || vec![L1_NAME.pass(3, "found")]);
        assert_eq!(tasks.len(), 1);
    }

    #[tokio::test]
    async fn unreachable_site_still_scores() {
        let result = evaluate(
            submission(),
            &PageSnapshot::default(),
            None,
            Duration::from_secs(1),
        )
        .await;

        let overall = &result.overall;
        assert_eq!(overall.category_scores.len(), 5);
        assert_eq!(overall.total_points, 3);
        assert_eq!(overall.max_total_points, 99);
        assert_eq!(overall.grade, 'F');
        assert!(matches!(overall.narrative, Some(Narrative::Deterministic(_))));
        for score in &overall.category_scores {
            for task in &score.tasks {
                assert!(task.points_awarded() <= task.points_possible());
                if task.points_awarded() > 0 {
                    assert_eq!(task.status(), TaskStatus::Pass);
                }
            }
        }
    }

    #[tokio::test]
    async fn complete_site_scores_full_marks() {
        let snapshot = PageSnapshot {
            html: Some(FULL_HTML.to_string()),
            ttfb: Some(Duration::from_millis(200)),
            robots_status: Some(200),
            sitemap_status: Some(200),
        };
        let result = evaluate(submission(), &snapshot, None, Duration::from_secs(1)).await;
        let overall = &result.overall;

        let earned: Vec<u32> = overall.category_scores.iter().map(|s| s.points_earned).collect();
        // The Facebook profile doubles as a review platform link.
        assert_eq!(earned, vec![24, 20, 20, 20, 15]);
        assert_eq!(overall.total_points, 99);
        assert_eq!(overall.grade, 'A');
        assert!(overall.summary_text.ends_with("strong across all tracked layers."));
        for score in &overall.category_scores {
            assert_eq!(
                score.points_earned,
                score.tasks.iter().map(|t| t.points_awarded()).sum::<u32>()
            );
        }
    }
}
