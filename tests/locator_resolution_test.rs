// Locator resolution against the scripted page: candidate priority, probe
// windows, visibility/enabled filtering and cancellation.


use formdriver::{DriverError, Locator, Target};
use mock_document::{Call, Harness, Node};
use std::time::Duration;
use tokio::time::Instant;

fn three_way_target() -> Target {
    Target::new("Submit button", Locator::test_id("submit"))
        .or(Locator::role("button", Some("Submit")))
        .or(Locator::css("form button[type=submit]"))
}

#[tokio::test(start_paused = true)]
async fn test_only_third_candidate_present() {
    let h = Harness::new();
    let target = three_way_target();
    h.doc.node(&target.candidates()[2], Node::new());

    let resolved = h
        .executor
        .resolver()
        .resolve(&target, Duration::from_secs(5), &h.cancel)
        .await
        .unwrap();

    assert_eq!(resolved.candidate, 2);
    assert_eq!(resolved.locator, target.candidates()[2]);
    assert!(resolved.state.attached && resolved.state.visible);
}

#[tokio::test(start_paused = true)]
async fn test_primary_candidate_wins_when_all_present() {
    let h = Harness::new();
    let target = three_way_target();
    for candidate in target.candidates() {
        h.doc.node(candidate, Node::new());
    }

    let resolved = h
        .executor
        .resolver()
        .resolve(&target, Duration::from_secs(5), &h.cancel)
        .await
        .unwrap();

    assert_eq!(resolved.candidate, 0);
    let probed_fallback = h
        .doc
        .count(|c| matches!(c, Call::Inspect(l) if l != &target.candidates()[0]));
    assert_eq!(probed_fallback, 0);
}

#[tokio::test(start_paused = true)]
async fn test_candidates_probed_in_priority_order() {
    let h = Harness::new();
    let target = three_way_target();
    h.doc.node(&target.candidates()[1], Node::new());

    h.executor
        .resolver()
        .resolve(&target, Duration::from_secs(5), &h.cancel)
        .await
        .unwrap();

    let first_probe_of = |index: usize| {
        h.doc
            .calls()
            .iter()
            .position(|c| matches!(c, Call::Inspect(l) if l == &target.candidates()[index]))
    };
    let first = first_probe_of(0).unwrap();
    let second = first_probe_of(1).unwrap();
    assert!(first < second);
    assert_eq!(first_probe_of(2), None);
}

#[tokio::test(start_paused = true)]
async fn test_hidden_and_disabled_candidates_are_skipped() {
    let h = Harness::new();
    let target = three_way_target();
    h.doc.node(&target.candidates()[0], Node::hidden());
    h.doc.node(&target.candidates()[1], Node::disabled());
    h.doc.node(&target.candidates()[2], Node::new());

    let resolved = h
        .executor
        .resolver()
        .resolve(&target, Duration::from_secs(5), &h.cancel)
        .await
        .unwrap();
    assert_eq!(resolved.candidate, 2);

    // Read-only targets accept a disabled element
    let resolved = h
        .executor
        .resolver()
        .resolve(&target.clone().passive(), Duration::from_secs(5), &h.cancel)
        .await
        .unwrap();
    assert_eq!(resolved.candidate, 1);
}

#[tokio::test(start_paused = true)]
async fn test_ambiguous_match_does_not_resolve_without_ordinal() {
    let h = Harness::new();
    let input = Locator::css("input.search");
    h.doc.set(&input, vec![Node::new(), Node::new()]);

    let target = Target::new("search input", input.clone());
    let err = h
        .executor
        .resolver()
        .resolve(&target, Duration::from_secs(1), &h.cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, DriverError::NotFound { .. }));

    let target = Target::new("second search input", input.nth(1));
    let resolved = h
        .executor
        .resolver()
        .resolve(&target, Duration::from_secs(1), &h.cancel)
        .await
        .unwrap();
    assert_eq!(resolved.state.matched, 2);
}

#[tokio::test(start_paused = true)]
async fn test_not_found_lists_every_candidate() {
    let h = Harness::new();
    let target = three_way_target();
    let start = Instant::now();

    let err = h
        .executor
        .resolver()
        .resolve(&target, Duration::from_secs(2), &h.cancel)
        .await
        .unwrap_err();

    match err {
        DriverError::NotFound {
            description,
            attempted,
        } => {
            assert_eq!(description, "Submit button");
            assert_eq!(attempted.len(), 3);
            assert_eq!(attempted[0], "testid=submit");
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(2));
    assert!(elapsed < Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn test_late_element_is_found_in_a_later_round() {
    let h = Harness::new();
    let target = three_way_target();
    let doc = h.doc.clone();
    let late = target.candidates()[0].clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(3)).await;
        doc.node(&late, Node::new());
    });

    let resolved = h
        .executor
        .resolver()
        .resolve(&target, Duration::from_secs(10), &h.cancel)
        .await
        .unwrap();
    assert_eq!(resolved.candidate, 0);
}

#[tokio::test(start_paused = true)]
async fn test_resolution_stops_on_cancel() {
    let h = Harness::new();
    let target = three_way_target();
    let cancel = h.cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
    });
    let start = Instant::now();

    let err = h
        .executor
        .resolver()
        .resolve(&target, Duration::from_secs(30), &h.cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(start.elapsed() < Duration::from_secs(2));
}
