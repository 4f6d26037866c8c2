// Search-as-you-type college field and the UI settling helpers.


use formdriver::widgets::antd;
use formdriver::{close_ui, wait_for_ui_stable, CollegeSearch, DriverError, Key, Locator};
use formdriver::{OptionMatch, Severity, Target};
use mock_document::{Call, Harness, Node};

fn college_input() -> Target {
    Target::new("College", Locator::css("#college"))
}

fn suggestion(name: &str) -> Locator {
    antd::open_select_panel()
        .child_css(antd::SELECT_OPTION)
        .has_text(name)
        .first()
}

/// Typing opens the suggestion panel; suggestions exist only for `known`.
fn install(h: &Harness, known: &'static [&'static str]) {
    let input = college_input().candidates()[0].clone();
    h.doc.node(&input, Node::new());

    let panel = antd::open_select_panel();
    let input_key = input.key();
    h.doc.on(move |call, page| match call {
        Call::SetValue(l, typed) if l.key() == input_key => {
            page.set(&panel, vec![Node::new()]);
            if known.contains(&typed.as_str()) {
                page.set(
                    &suggestion(typed),
                    vec![Node::text(&format!("{} University", typed))],
                );
            }
        }
        Call::Click(l, _) if l.key().contains("has-text") => page.remove(&panel),
        _ => {}
    });
}

#[tokio::test(start_paused = true)]
async fn test_picks_matching_suggestion() {
    let h = Harness::new();
    install(&h, &["Stanford"]);

    let matched = CollegeSearch::new(&h.executor)
        .select_college(&college_input(), "Stanford", false)
        .await
        .unwrap();

    assert_eq!(matched, Some(OptionMatch::CaseInsensitive));
    assert_eq!(h.doc.clicks_on(&suggestion("Stanford")).len(), 1);
    assert!(h.doc.presses().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_missing_suggestion_without_fallback() {
    let h = Harness::new();
    install(&h, &[]);

    let err = CollegeSearch::new(&h.executor)
        .select_college(&college_input(), "Hogwarts", false)
        .await
        .unwrap_err();

    assert!(matches!(err, DriverError::NoMatchingOption { .. }));
    assert!(h.doc.presses().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_missing_suggestion_with_keyboard_fallback() {
    let h = Harness::new();
    install(&h, &[]);

    let matched = CollegeSearch::new(&h.executor)
        .select_college(&college_input(), "Hogwarts", true)
        .await
        .unwrap();

    assert_eq!(matched, Some(OptionMatch::Keyboard));
    // The panel lingers, so closing falls back to Escape
    assert_eq!(h.doc.presses(), vec![Key::ArrowDown, Key::Enter, Key::Escape]);
}

#[tokio::test(start_paused = true)]
async fn test_blank_college_is_skipped() {
    let h = Harness::new();
    install(&h, &["Stanford"]);

    let matched = CollegeSearch::new(&h.executor)
        .select_college(&college_input(), "", true)
        .await
        .unwrap();

    assert_eq!(matched, None);
    assert!(h.doc.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_close_ui_escapes_and_clicks_away() {
    let h = Harness::new();
    let dialog = Locator::css(antd::DIALOG);
    h.doc.node(&dialog, Node::new());
    h.doc.on(move |call, page| {
        if *call == Call::Press(Key::Escape) {
            page.remove(&dialog);
        }
    });

    close_ui(&h.executor).await.unwrap();

    let calls = h.doc.calls();
    assert_eq!(calls.first(), Some(&Call::Press(Key::Escape)));
    assert_eq!(calls.last(), Some(&Call::MouseClick(5.0, 5.0)));
}

#[tokio::test(start_paused = true)]
async fn test_close_ui_tolerates_stuck_overlays() {
    let h = Harness::new();
    h.doc.node(&Locator::css(antd::DIALOG), Node::new());
    h.doc.node(&antd::picker_panel(), Node::new());

    close_ui(&h.executor).await.unwrap();

    assert!(h.doc.calls().contains(&Call::MouseClick(5.0, 5.0)));
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_ui_stable_reports_open_dialog() {
    let h = Harness::new();
    h.doc.node(&Locator::css(antd::DIALOG), Node::new());

    wait_for_ui_stable(&h.executor).await.unwrap();

    assert!(h
        .sink
        .messages(Severity::Warn)
        .iter()
        .any(|m| m.contains("Dialog still open")));
}
