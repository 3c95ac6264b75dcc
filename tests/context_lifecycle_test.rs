//! Context lifecycle: retries, timeouts, cancellation and slot release

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::future::join_all;
use tokio::time::Instant;

use lms_autoscan::config::ScanConfig;
use lms_autoscan::crawl_engine::{ContextLifecycleManager, CrawlTarget, ScanError};
use lms_autoscan::page_extractor::analyze_review_page;
use lms_autoscan::slot_pool::SlotPool;

mod common;
use common::{FixtureBackend, test_config, url};

const REVIEW: &str = "/mod/quiz/review.php?attempt=9";

struct Harness {
    backend: Arc<FixtureBackend>,
    slots: Arc<SlotPool>,
    active: Arc<AtomicBool>,
    lifecycle: ContextLifecycleManager,
}

fn harness(backend: FixtureBackend, config: ScanConfig) -> Harness {
    let backend = Arc::new(backend);
    let config = Arc::new(config);
    let slots = Arc::new(SlotPool::new(
        config.max_concurrent_contexts(),
        config.slot_poll_interval(),
    ));
    let active = Arc::new(AtomicBool::new(true));
    let lifecycle = ContextLifecycleManager::new(
        backend.clone(),
        Arc::clone(&slots),
        config,
        Arc::clone(&active),
    );
    Harness {
        backend,
        slots,
        active,
        lifecycle,
    }
}

fn assert_gap(earlier: Instant, later: Instant, expected: Duration) {
    let gap = later - earlier;
    assert!(
        gap >= expected && gap < expected + Duration::from_millis(10),
        "expected a gap of {expected:?}, got {gap:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn creation_failures_back_off_linearly() {
    let h = harness(
        FixtureBackend::new().review(REVIEW, 2, 0).fail_open(REVIEW, 2),
        test_config(),
    );

    let questions = h
        .lifecycle
        .with_page(&CrawlTarget::review(url(REVIEW)), |page| {
            Ok(analyze_review_page(page).question_count)
        })
        .await
        .expect("third attempt succeeds");

    // the snapshot came from the context that was actually created
    assert_eq!(questions, 2);
    let attempts = h.backend.open_attempts();
    assert_eq!(attempts.len(), 3);
    assert_gap(attempts[0].1, attempts[1].1, Duration::from_secs(1));
    assert_gap(attempts[1].1, attempts[2].1, Duration::from_secs(2));
    assert_eq!(h.backend.opened_count(), 1);
    assert_eq!(h.backend.open_now(), 0);
    assert_eq!(h.slots.open_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_report_context_creation() {
    let h = harness(
        FixtureBackend::new().review(REVIEW, 2, 0).fail_open(REVIEW, 10),
        test_config(),
    );

    let result = h
        .lifecycle
        .with_page(&CrawlTarget::review(url(REVIEW)), |_| Ok(()))
        .await;

    match result {
        Err(ScanError::ContextCreation { attempts, url, .. }) => {
            assert_eq!(attempts, 4);
            assert!(url.contains("attempt=9"));
        }
        other => panic!("expected ContextCreation, got {other:?}"),
    }
    let attempts = h.backend.open_attempts();
    assert_eq!(attempts.len(), 4);
    assert_gap(attempts[0].1, attempts[1].1, Duration::from_secs(1));
    assert_gap(attempts[1].1, attempts[2].1, Duration::from_secs(2));
    assert_gap(attempts[2].1, attempts[3].1, Duration::from_secs(3));
    assert_eq!(h.slots.open_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn third_retry_is_the_last_chance() {
    let h = harness(
        FixtureBackend::new().review(REVIEW, 3, 0).fail_open(REVIEW, 3),
        test_config(),
    );

    let questions = h
        .lifecycle
        .with_page(&CrawlTarget::review(url(REVIEW)), |page| {
            Ok(analyze_review_page(page).question_count)
        })
        .await
        .expect("fourth attempt succeeds");

    assert_eq!(questions, 3);
    let attempts = h.backend.open_attempts();
    assert_eq!(attempts.len(), 4);
    assert_gap(attempts[2].1, attempts[3].1, Duration::from_secs(3));
    assert_eq!(h.backend.opened_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn zero_retries_gives_up_after_one_attempt() {
    let config = ScanConfig::builder()
        .site_url(common::SITE)
        .max_retry_attempts(0)
        .build()
        .expect("valid config");
    let h = harness(FixtureBackend::new().review(REVIEW, 1, 0).fail_open(REVIEW, 1), config);

    let result = h
        .lifecycle
        .with_page(&CrawlTarget::review(url(REVIEW)), |_| Ok(()))
        .await;

    assert!(matches!(result, Err(ScanError::ContextCreation { attempts: 1, .. })));
    assert_eq!(h.backend.open_attempts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn hung_page_times_out_and_is_closed() {
    let h = harness(FixtureBackend::new().hang(REVIEW), test_config());
    let started = Instant::now();

    let result = h
        .lifecycle
        .with_page(&CrawlTarget::review(url(REVIEW)), |_| Ok(()))
        .await;

    assert!(matches!(result, Err(ScanError::LoadTimeout { .. })));
    assert!(started.elapsed() >= Duration::from_secs(30));
    assert_eq!(h.backend.closed_count(), 1);
    assert_eq!(h.backend.open_now(), 0);
    assert_eq!(h.slots.open_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn analysis_errors_still_close_the_context() {
    let h = harness(FixtureBackend::new().review(REVIEW, 1, 0), test_config());

    let result: Result<(), _> = h
        .lifecycle
        .with_page(&CrawlTarget::review(url(REVIEW)), |page| {
            Err(ScanError::ProbeExecution {
                url: page.url.clone(),
                message: "selector blew up".to_string(),
            })
        })
        .await;

    assert!(matches!(result, Err(ScanError::ProbeExecution { .. })));
    assert_eq!(h.backend.closed_count(), 1);
    assert_eq!(h.slots.open_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn inactive_session_opens_nothing() {
    let h = harness(FixtureBackend::new().review(REVIEW, 1, 0), test_config());
    h.active.store(false, Ordering::SeqCst);

    let result = h
        .lifecycle
        .with_page(&CrawlTarget::review(url(REVIEW)), |_| Ok(()))
        .await;

    assert!(matches!(result, Err(ScanError::Cancelled)));
    assert!(h.backend.open_attempts().is_empty());
    assert_eq!(h.slots.open_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn stop_during_backoff_cancels_the_retry() {
    let h = harness(
        FixtureBackend::new().review(REVIEW, 1, 0).fail_open(REVIEW, 10),
        test_config(),
    );
    let active = Arc::clone(&h.active);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        active.store(false, Ordering::SeqCst);
    });

    let result = h
        .lifecycle
        .with_page(&CrawlTarget::review(url(REVIEW)), |_| Ok(()))
        .await;

    assert!(matches!(result, Err(ScanError::Cancelled)));
    assert_eq!(h.backend.open_attempts().len(), 1);
    assert_eq!(h.slots.open_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn dropped_visit_releases_context_and_slot() {
    let h = harness(FixtureBackend::new().hang(REVIEW), test_config());

    let target = CrawlTarget::review(url(REVIEW));
    let visit = h.lifecycle.with_page(&target, |_| Ok(()));
    let outcome = tokio::time::timeout(Duration::from_secs(5), visit).await;
    assert!(outcome.is_err(), "visit should still be waiting for load");

    // the deferred close runs on the runtime
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(h.backend.open_now(), 0);
    assert_eq!(h.slots.open_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn concurrent_visits_share_two_slots() {
    let mut site = FixtureBackend::new();
    for i in 0..6 {
        site = site.review(&format!("/mod/quiz/review.php?attempt={i}"), 1, 0);
    }
    let h = harness(site, test_config());
    let targets: Vec<CrawlTarget> = (0..6)
        .map(|i| CrawlTarget::review(url(&format!("/mod/quiz/review.php?attempt={i}"))))
        .collect();

    let results = join_all(
        targets
            .iter()
            .map(|t| h.lifecycle.with_page(t, |page| Ok(analyze_review_page(page).question_count))),
    )
    .await;

    assert!(results.iter().all(|r| matches!(r, Ok(1))));
    assert!(h.backend.peak_open() <= 2);
    assert_eq!(h.slots.peak(), 2);
    assert_eq!(h.backend.opened_count(), 6);
    assert_eq!(h.slots.open_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn unlimited_load_timeout_waits_for_the_page() {
    let config = ScanConfig::builder()
        .site_url(common::SITE)
        .load_timeout_secs(None)
        .build()
        .expect("valid config");
    let h = harness(FixtureBackend::new().review(REVIEW, 1, 0), config);

    let result = h
        .lifecycle
        .with_page(&CrawlTarget::review(url(REVIEW)), |_| Ok(()))
        .await;

    assert!(result.is_ok());
}

async fn timed_visit(h: &Harness, target: CrawlTarget) -> Duration {
    let started = Instant::now();
    h.lifecycle
        .with_page(&target, |_| Ok(()))
        .await
        .expect("visit succeeds");
    started.elapsed()
}

#[tokio::test(start_paused = true)]
async fn settle_delays_depend_on_the_page_kind() {
    let h = harness(
        FixtureBackend::new()
            .page("/course/view.php?id=1", common::html_page("course"))
            .page("/mod/quiz/view.php?id=2", common::html_page("quiz"))
            .review(REVIEW, 1, 0),
        test_config(),
    );
    let tolerance = Duration::from_millis(10);

    // settle + close delay
    let course = timed_visit(&h, CrawlTarget::course(url("/course/view.php?id=1"))).await;
    assert!(course >= Duration::from_millis(3500) && course < Duration::from_millis(3500) + tolerance);

    let quiz = timed_visit(&h, CrawlTarget::quiz(url("/mod/quiz/view.php?id=2"))).await;
    assert!(quiz >= Duration::from_millis(2500) && quiz < Duration::from_millis(2500) + tolerance);

    // settle + persist wait + close delay
    let review = timed_visit(&h, CrawlTarget::review(url(REVIEW))).await;
    assert!(review >= Duration::from_millis(7500) && review < Duration::from_millis(7500) + tolerance);
}

mod release_on_every_path {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn failing_visits_never_leak_contexts(
            failures in prop::collection::vec(any::<bool>(), 1..10)
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .start_paused(true)
                .build()
                .expect("test runtime");

            let mut site = FixtureBackend::new();
            for i in 0..failures.len() {
                site = site.review(&format!("/mod/quiz/review.php?attempt={i}"), 1, 0);
            }
            let h = harness(site, test_config());
            let targets: Vec<CrawlTarget> = (0..failures.len())
                .map(|i| CrawlTarget::review(url(&format!("/mod/quiz/review.php?attempt={i}"))))
                .collect();

            let results = runtime.block_on(join_all(targets.iter().zip(&failures).map(
                |(target, &fail)| {
                    h.lifecycle.with_page(target, move |page| {
                        if fail {
                            Err(ScanError::ProbeExecution {
                                url: page.url.clone(),
                                message: "page analysis failed".to_string(),
                            })
                        } else {
                            Ok(())
                        }
                    })
                },
            )));

            let failed = results.iter().filter(|r| r.is_err()).count();
            prop_assert_eq!(failed, failures.iter().filter(|f| **f).count());
            prop_assert_eq!(h.slots.open_count(), 0);
            prop_assert_eq!(h.backend.open_now(), 0);
            prop_assert_eq!(h.backend.opened_count(), h.backend.closed_count());
            prop_assert!(h.backend.peak_open() <= 2);
        }
    }
}
