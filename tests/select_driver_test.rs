// Searchable select against a scripted Ant Design dropdown.


use formdriver::widgets::antd::{self, FieldRef};
use formdriver::{
    DriverError, Key, Locator, Ordinal, OptionMatch, SearchableSelect, SelectField,
    SelectOptions, SelectState,
};
use mock_document::{Call, Harness, Node};

const ROLES: [&str; 3] = ["Analyst", "Engineer", "Manager"];

struct Dropdown {
    field: SelectField,
    trigger: Locator,
    search: Locator,
    display: Locator,
    panel: Locator,
    options: Locator,
}

fn role_dropdown() -> Dropdown {
    let field_ref = FieldRef::new("Role").with_test_id("role-dropdown");
    let field = SelectField::from(&field_ref);
    Dropdown {
        trigger: field.trigger.candidates()[0].clone(),
        search: field.search_input.candidates()[0].clone(),
        display: field.display.as_ref().unwrap().candidates()[0].clone(),
        panel: antd::open_select_panel(),
        options: antd::select_options(),
        field,
    }
}

/// Wire a dropdown that opens on trigger click, shows `catalog`, optionally
/// filters it by the typed text, and commits the clicked option.
fn install(h: &Harness, d: &Dropdown, catalog: &'static [&'static str], filters: bool) {
    h.doc.node(&d.trigger, Node::new());
    h.doc.node(&d.search, Node::new());
    h.doc.node(&d.display, Node::text(""));

    let (trigger, search, display, panel, options) = (
        d.trigger.key(),
        d.search.key(),
        d.display.clone(),
        d.panel.clone(),
        d.options.clone(),
    );
    h.doc.on(move |call, page| match call {
        Call::Click(l, _) if l.key() == trigger => {
            page.set(&panel, vec![Node::new()]);
            page.texts(&options, catalog);
        }
        Call::SetValue(l, typed) if filters && l.key() == search => {
            let typed = typed.to_lowercase();
            let shown: Vec<&str> = catalog
                .iter()
                .copied()
                .filter(|o| o.to_lowercase().contains(&typed))
                .collect();
            page.texts(&options, &shown);
        }
        Call::Click(l, _) if l.key() == options.key() => {
            let index = match l.ordinal {
                Ordinal::Nth(i) => i,
                _ => 0,
            };
            let chosen = page
                .nodes_mut(&options)
                .and_then(|nodes| nodes.get(index))
                .map(|n| n.text.clone())
                .unwrap_or_default();
            if let Some(nodes) = page.nodes_mut(&display) {
                nodes[0].text = chosen;
            }
            page.remove(&panel);
            page.remove(&options);
        }
        _ => {}
    });
}

#[tokio::test(start_paused = true)]
async fn test_partial_text_selects_filtered_option() {
    let h = Harness::new();
    let d = role_dropdown();
    install(&h, &d, &ROLES, true);

    let selection = SearchableSelect::new(&h.executor)
        .select(&d.field, "Eng", SelectOptions::default())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(selection.chosen, "Engineer");
    assert_eq!(selection.matched, OptionMatch::CaseInsensitive);
    assert_eq!(selection.committed.as_deref(), Some("Engineer"));
    assert_eq!(
        selection.transitions,
        vec![
            SelectState::Closed,
            SelectState::Open,
            SelectState::Filtering,
            SelectState::OptionVisible,
            SelectState::Closed,
        ]
    );

    let calls = h.doc.calls();
    let opened = calls
        .iter()
        .position(|c| matches!(c, Call::Click(l, _) if *l == d.trigger))
        .unwrap();
    let typed = calls
        .iter()
        .position(|c| matches!(c, Call::SetValue(l, v) if *l == d.search && v == "Eng"))
        .unwrap();
    let picked = calls
        .iter()
        .position(|c| matches!(c, Call::Click(l, _) if l.key() == d.options.key()))
        .unwrap();
    assert!(opened < typed && typed < picked);
    assert_eq!(
        h.doc.clicks_on(&d.options),
        vec![formdriver::ClickMode::Standard]
    );
    // The panel closed on its own
    assert!(h.doc.presses().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_exact_match_preferred() {
    let h = Harness::new();
    let d = role_dropdown();
    install(
        &h,
        &d,
        &["Senior Engineer", "Engineer", "Engineering Manager"],
        true,
    );

    let selection = SearchableSelect::new(&h.executor)
        .select(&d.field, "Engineer", SelectOptions::default())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(selection.chosen, "Engineer");
    assert_eq!(selection.matched, OptionMatch::Exact);
    assert_eq!(selection.committed.as_deref(), Some("Engineer"));
}

#[tokio::test(start_paused = true)]
async fn test_no_match_takes_first_option() {
    let h = Harness::new();
    let d = role_dropdown();
    install(&h, &d, &ROLES, false);

    let selection = SearchableSelect::new(&h.executor)
        .select(&d.field, "Pilot", SelectOptions::default())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(selection.chosen, "Analyst");
    assert_eq!(selection.matched, OptionMatch::FirstOption);
    assert!(selection.matched.is_fallback());
    assert!(selection.transitions.contains(&SelectState::NoMatch));
    assert_eq!(selection.committed.as_deref(), Some("Analyst"));
}

#[tokio::test(start_paused = true)]
async fn test_strict_mode_rejects_no_match() {
    let h = Harness::new();
    let d = role_dropdown();
    install(&h, &d, &ROLES, false);

    let err = SearchableSelect::new(&h.executor)
        .select(&d.field, "Pilot", SelectOptions::strict())
        .await
        .unwrap_err();

    match err {
        DriverError::NoMatchingOption { value, available } => {
            assert_eq!(value, "Pilot");
            assert_eq!(available, ROLES.to_vec());
        }
        other => panic!("expected NoMatchingOption, got {other:?}"),
    }
    let shots = h.sink.screenshots();
    assert_eq!(shots.len(), 1);
    assert!(shots[0]
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("dropdown-failure-role-dropdown"));
}

#[tokio::test(start_paused = true)]
async fn test_strict_mode_from_config() {
    let h = Harness::with_config(|c| c.strict_options = true);
    let d = role_dropdown();
    install(&h, &d, &ROLES, false);

    let err = SearchableSelect::new(&h.executor)
        .select(&d.field, "Pilot", SelectOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DriverError::NoMatchingOption { .. }));

    // A per-call override wins over the configured default
    let selection = SearchableSelect::new(&h.executor)
        .select(&d.field, "Pilot", SelectOptions { strict: Some(false) })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(selection.matched, OptionMatch::FirstOption);
}

#[tokio::test(start_paused = true)]
async fn test_empty_panel_uses_keyboard_and_tolerates_stuck_panel() {
    let h = Harness::new();
    let d = role_dropdown();
    install(&h, &d, &[], false);

    let selection = SearchableSelect::new(&h.executor)
        .select(&d.field, "Engineer", SelectOptions::default())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(selection.matched, OptionMatch::Keyboard);
    assert_eq!(selection.chosen, "Engineer");
    // Arrow-Down + Enter to pick, then Escape because the panel never closed
    assert_eq!(h.doc.presses(), vec![Key::ArrowDown, Key::Enter, Key::Escape]);
}

#[tokio::test(start_paused = true)]
async fn test_blocked_option_click_falls_back_to_keyboard() {
    let h = Harness::with_config(|c| c.attempt_timeout_ms = 1_000);
    let d = role_dropdown();
    install(&h, &d, &ROLES, true);

    // Every option is covered; hooks reinstall them on open
    let options = d.options.clone();
    let trigger = d.trigger.key();
    h.doc.on(move |call, page| {
        if matches!(call, Call::Click(l, _) | Call::SetValue(l, _) if l.key() == trigger || l.key().contains("combobox"))
        {
            if let Some(nodes) = page.nodes_mut(&options) {
                for node in nodes.iter_mut() {
                    *node = node
                        .clone()
                        .failing(&formdriver::ClickMode::ESCALATION);
                }
            }
        }
    });

    let selection = SearchableSelect::new(&h.executor)
        .select(&d.field, "Manager", SelectOptions::default())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(selection.chosen, "Manager");
    assert_eq!(selection.matched, OptionMatch::Keyboard);
    assert_eq!(&h.doc.presses()[..2], &[Key::ArrowDown, Key::Enter]);
}

#[tokio::test(start_paused = true)]
async fn test_panel_that_never_opens() {
    let h = Harness::new();
    let d = role_dropdown();
    h.doc.node(&d.trigger, Node::new());
    h.doc.node(&d.search, Node::new());

    let err = SearchableSelect::new(&h.executor)
        .select(&d.field, "Engineer", SelectOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, DriverError::PanelTimeout { .. }));
    assert_eq!(h.doc.count(|c| matches!(c, Call::SetValue(..))), 0);
}

#[tokio::test(start_paused = true)]
async fn test_blank_value_is_skipped() {
    let h = Harness::new();
    let d = role_dropdown();
    install(&h, &d, &ROLES, true);

    let selection = SearchableSelect::new(&h.executor)
        .select(&d.field, "   ", SelectOptions::default())
        .await
        .unwrap();

    assert!(selection.is_none());
    assert!(h.doc.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_label_relative_field_in_dialog() {
    let h = Harness::new();
    let field_ref = FieldRef::new("Company").nth(2).in_dialog();
    let field = SelectField::from(&field_ref);
    let d = Dropdown {
        trigger: field.trigger.candidates()[0].clone(),
        search: field.search_input.candidates()[0].clone(),
        display: field.display.as_ref().unwrap().candidates()[0].clone(),
        panel: antd::open_select_panel(),
        options: antd::select_options(),
        field,
    };
    assert!(d.trigger.to_string().contains("'Company *'])[2]"));
    assert!(d.trigger.key().starts_with("css=[role=\"dialog\"] >> nth=-1"));
    install(&h, &d, &["Acme", "Globex"], true);

    let selection = SearchableSelect::new(&h.executor)
        .select(&d.field, "Globex", SelectOptions::default())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(selection.committed.as_deref(), Some("Globex"));
}

#[tokio::test(start_paused = true)]
async fn test_blank_and_hidden_options_before_match() {
    let h = Harness::new();
    let d = role_dropdown();
    install(&h, &d, &["", "Engineer", "Analyst", "Manager"], false);
    let (trigger, options) = (d.trigger.key(), d.options.clone());
    h.doc.on(move |call, page| match call {
        Call::Click(l, _) if l.key() == trigger => {
            if let Some(nodes) = page.nodes_mut(&options) {
                nodes[1].visible = false;
            }
        }
        _ => {}
    });

    let selection = SearchableSelect::new(&h.executor)
        .select(&d.field, "Manager", SelectOptions::default())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(selection.chosen, "Manager");
    assert_eq!(selection.matched, OptionMatch::Exact);
    assert_eq!(selection.committed.as_deref(), Some("Manager"));
    let picked = h.doc.calls().into_iter().find_map(|c| match c {
        Call::Click(l, _) if l.key() == d.options.key() => Some(l.ordinal),
        _ => None,
    });
    assert_eq!(picked, Some(Ordinal::Nth(3)));
}

#[tokio::test(start_paused = true)]
async fn test_hidden_option_is_never_the_fallback() {
    let h = Harness::new();
    let d = role_dropdown();
    install(&h, &d, &["Engineer", "Analyst"], false);
    let (trigger, options) = (d.trigger.key(), d.options.clone());
    h.doc.on(move |call, page| match call {
        Call::Click(l, _) if l.key() == trigger => {
            if let Some(nodes) = page.nodes_mut(&options) {
                nodes[0].visible = false;
            }
        }
        _ => {}
    });

    let selection = SearchableSelect::new(&h.executor)
        .select(&d.field, "Eng", SelectOptions::default())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(selection.chosen, "Analyst");
    assert_eq!(selection.matched, OptionMatch::FirstOption);
    assert_eq!(selection.committed.as_deref(), Some("Analyst"));
}

#[tokio::test(start_paused = true)]
async fn test_last_of_two_same_label_fields() {
    let h = Harness::new();
    let first = SelectField::from(&FieldRef::new("Company"));
    let field = SelectField::from(&FieldRef::new("Company").last());
    let d = Dropdown {
        trigger: field.trigger.candidates()[0].clone(),
        search: field.search_input.candidates()[0].clone(),
        display: field.display.as_ref().unwrap().candidates()[0].clone(),
        panel: antd::open_select_panel(),
        options: antd::select_options(),
        field,
    };
    assert!(d.trigger.to_string().contains("'Company *'])[last()]"));
    let first_trigger = first.trigger.candidates()[0].clone();
    let first_display = first.display.as_ref().unwrap().candidates()[0].clone();
    assert_ne!(first_trigger.key(), d.trigger.key());
    h.doc.node(&first_trigger, Node::new());
    h.doc.node(&first_display, Node::text("Initech"));
    install(&h, &d, &["Acme", "Globex"], true);

    let selection = SearchableSelect::new(&h.executor)
        .select(&d.field, "Globex", SelectOptions::default())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(selection.committed.as_deref(), Some("Globex"));
    assert!(h.doc.clicks_on(&first_trigger).is_empty());
    assert!(!h.doc.clicks_on(&d.trigger).is_empty());
    let untouched = h.doc.with_page(|page| {
        page.nodes_mut(&first_display).map(|nodes| nodes[0].text.clone())
    });
    assert_eq!(untouched.as_deref(), Some("Initech"));
}
