// Multi-select: one search-and-pick cycle per value, then dismissal.


use formdriver::widgets::antd::{self, FieldRef};
use formdriver::{DriverError, Key, Locator, MultiSelect, OptionMatch, Ordinal};
use mock_document::{Call, Harness, Node};
use std::sync::{Arc, Mutex};

const SKILLS: [&str; 5] = ["Rust", "Go", "Python", "TypeScript", "Google Cloud"];

fn options() -> Locator {
    Locator::css(antd::SELECT_PANEL)
        .last()
        .child_css(antd::OPTION_CONTENT)
}

/// Skills field whose panel filters `SKILLS` by the typed text. Returns the
/// list of option texts clicked.
fn install(h: &Harness, field: &FieldRef) -> Arc<Mutex<Vec<String>>> {
    let input = field.multi_search_input().candidates()[0].clone();
    h.doc.node(&input, Node::new());

    let picked = Arc::new(Mutex::new(Vec::new()));
    let clicked = picked.clone();
    let panel = Locator::css(antd::SELECT_PANEL).last();
    let options = options();
    let input_key = input.key();
    h.doc.on(move |call, page| match call {
        Call::SetValue(l, typed) if l.key() == input_key => {
            let typed = typed.to_lowercase();
            let shown: Vec<&str> = SKILLS
                .iter()
                .copied()
                .filter(|s| s.to_lowercase().contains(&typed))
                .collect();
            page.set(&panel, vec![Node::new()]);
            page.texts(&options, &shown);
        }
        Call::Click(l, _) if l.key() == options.key() => {
            let index = match l.ordinal {
                Ordinal::Nth(i) => i,
                _ => 0,
            };
            if let Some(node) = page.nodes_mut(&options).and_then(|n| n.get(index)) {
                clicked.lock().unwrap().push(node.text.clone());
            }
        }
        _ => {}
    });
    picked
}

fn values(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test(start_paused = true)]
async fn test_selects_each_value_in_order() {
    let h = Harness::new();
    let field = FieldRef::new("Skills");
    let clicked = install(&h, &field);

    let picked = MultiSelect::new(&h.executor)
        .select_multiple(&field, &values(&["Rust", " ", "go"]))
        .await
        .unwrap();

    assert_eq!(picked.len(), 2);
    assert_eq!(picked[0].value, "Rust");
    assert_eq!(picked[0].matched, OptionMatch::Exact);
    assert_eq!(picked[1].value, "go");
    assert_eq!(picked[1].matched, OptionMatch::CaseInsensitive);
    // "go" filters to Go and Google Cloud; the first containing match wins
    assert_eq!(*clicked.lock().unwrap(), vec!["Rust", "Go"]);

    let calls = h.doc.calls();
    assert_eq!(calls.last(), Some(&Call::MouseClick(10.0, 10.0)));
    assert_eq!(
        h.doc
            .count(|c| matches!(c, Call::SetValue(_, v) if v == "Rust" || v == "go")),
        2
    );
}

#[tokio::test(start_paused = true)]
async fn test_unmatched_value_uses_keyboard() {
    let h = Harness::new();
    let field = FieldRef::new("Skills");
    let clicked = install(&h, &field);

    let picked = MultiSelect::new(&h.executor)
        .select_multiple(&field, &values(&["Haskell"]))
        .await
        .unwrap();

    assert_eq!(picked[0].matched, OptionMatch::Keyboard);
    assert!(clicked.lock().unwrap().is_empty());
    assert_eq!(h.doc.presses(), vec![Key::ArrowDown, Key::Enter]);
}

#[tokio::test(start_paused = true)]
async fn test_strict_mode_fails_on_unmatched_value() {
    let h = Harness::with_config(|c| c.strict_options = true);
    let field = FieldRef::new("Skills");
    install(&h, &field);

    let err = MultiSelect::new(&h.executor)
        .select_multiple(&field, &values(&["Rust", "Haskell"]))
        .await
        .unwrap_err();

    match err {
        DriverError::NoMatchingOption { value, .. } => assert_eq!(value, "Haskell"),
        other => panic!("expected NoMatchingOption, got {other:?}"),
    }
    let shots = h.sink.screenshots();
    assert_eq!(shots.len(), 1);
    assert!(shots[0]
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("multiselect-failure-skills-search-input"));
}

#[tokio::test(start_paused = true)]
async fn test_panel_timeout() {
    let h = Harness::with_config(|c| c.panel_timeout_ms = 1_000);
    let field = FieldRef::new("Skills");
    let input = field.multi_search_input().candidates()[0].clone();
    h.doc.node(&input, Node::new());

    let err = MultiSelect::new(&h.executor)
        .select_multiple(&field, &values(&["Rust"]))
        .await
        .unwrap_err();

    assert!(matches!(err, DriverError::PanelTimeout { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_no_values_does_nothing() {
    let h = Harness::new();
    let field = FieldRef::new("Skills");
    install(&h, &field);

    let picked = MultiSelect::new(&h.executor)
        .select_multiple(&field, &values(&["", "  "]))
        .await
        .unwrap();

    assert!(picked.is_empty());
    assert!(h.doc.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_blank_and_hidden_options_keep_positions() {
    let h = Harness::new();
    let field = FieldRef::new("Skills");
    let clicked = install(&h, &field);
    let input_key = field.multi_search_input().candidates()[0].key();
    let options = options();
    // Group header and a filtered-out entry rendered ahead of the matches
    h.doc.on(move |call, page| {
        if let Call::SetValue(l, _) = call {
            if l.key() == input_key {
                if let Some(nodes) = page.nodes_mut(&options) {
                    nodes.insert(0, Node::text(""));
                    nodes.insert(
                        1,
                        Node {
                            visible: false,
                            ..Node::text("Golang")
                        },
                    );
                }
            }
        }
    });

    let picked = MultiSelect::new(&h.executor)
        .select_multiple(&field, &values(&["Google Cloud"]))
        .await
        .unwrap();

    assert_eq!(picked[0].matched, OptionMatch::Exact);
    assert_eq!(*clicked.lock().unwrap(), vec!["Google Cloud"]);
    let nth: Vec<Ordinal> = h
        .doc
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::Click(l, _) if l.key() == crate::options().key() => Some(l.ordinal),
            _ => None,
        })
        .collect();
    assert_eq!(nth, vec![Ordinal::Nth(2)]);
}
