//! Page-settling helpers run between form sections.

use crate::action::ActionExecutor;
use crate::document::Key;
use crate::error::Result;
use crate::locator::Locator;
use crate::retry::best_effort;
use crate::widgets::antd;
use std::time::Duration;

const SETTLE: Duration = Duration::from_millis(300);
const CLOSE_WAIT: Duration = Duration::from_secs(5);
const STABLE_WAIT: Duration = Duration::from_secs(2);

/// Dismiss whatever overlay is open: Escape, wait for dialogs and panels to
/// go, then click the page corner. Only cancellation is reported.
pub async fn close_ui(executor: &ActionExecutor) -> Result<()> {
    let executor = executor.for_component("CloseUi");
    let diagnostics = executor.diagnostics();

    best_effort(diagnostics, "Escape", executor.press(Key::Escape)).await;
    executor.pause(SETTLE).await?;

    for (what, selector) in [
        ("dialog", antd::DIALOG),
        ("dropdown", antd::OPEN_SELECT_PANEL),
        ("date picker", antd::PICKER_PANEL),
    ] {
        let overlay = Locator::css(selector).last();
        let closed = executor.wait_hidden(&overlay, CLOSE_WAIT).await;
        if let Err(e) = closed {
            if e.is_cancelled() {
                return Err(e);
            }
            log::debug!(target: "CloseUi", "{} still open: {}", what, e);
        }
    }

    best_effort(diagnostics, "Click-away", executor.mouse_click(5.0, 5.0)).await;
    executor.pause(SETTLE).await
}

/// Give lingering panels a short chance to close. Open dialogs are reported
/// but never waited on.
pub async fn wait_for_ui_stable(executor: &ActionExecutor) -> Result<()> {
    let executor = executor.for_component("UiStability");

    let dialog = Locator::css(antd::DIALOG).first();
    if let Ok(state) = executor.document().inspect(&dialog).await {
        if state.matched > 0 && state.visible {
            executor
                .diagnostics()
                .warn("Dialog still open, continuing");
        }
    }

    for selector in [antd::OPEN_SELECT_PANEL, antd::PICKER_PANEL] {
        let overlay = Locator::css(selector).last();
        if let Err(e) = executor.wait_hidden(&overlay, STABLE_WAIT).await {
            if e.is_cancelled() {
                return Err(e);
            }
        }
    }

    executor.pause(SETTLE).await
}
