//! The browser seam.
//!
//! Every interaction the crate performs goes through [`Document`]. Element
//! arguments are [`Locator`]s, re-evaluated against the live page on each call,
//! so no node handle outlives a single operation.

use crate::error::Result;
use crate::locator::Locator;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Observed state of the element a locator picks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementState {
    /// Number of elements matching the locator before the ordinal is applied
    pub matched: usize,
    /// The ordinal picked exactly one attached element
    pub attached: bool,
    pub visible: bool,
    pub enabled: bool,
}

impl ElementState {
    pub fn detached() -> Self {
        Self::default()
    }

    /// Present and visible, and enabled when the target is actionable.
    pub fn is_usable(&self, actionable: bool) -> bool {
        self.attached && self.visible && (self.enabled || !actionable)
    }
}

/// Click strategies, in escalation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickMode {
    /// Mouse click at the element centre after a hit-test
    Standard,
    /// Mouse click at the element centre without the hit-test
    Forced,
    /// Double click at the element centre
    Double,
    /// `element.click()` invoked inside the page
    Dom,
}

impl ClickMode {
    pub const ESCALATION: [ClickMode; 4] = [
        ClickMode::Standard,
        ClickMode::Forced,
        ClickMode::Double,
        ClickMode::Dom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClickMode::Standard => "standard click",
            ClickMode::Forced => "forced click",
            ClickMode::Double => "double click",
            ClickMode::Dom => "DOM click",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    ArrowDown,
    ArrowUp,
    Enter,
    Escape,
    Tab,
    Backspace,
}

impl Key {
    /// DOM `KeyboardEvent.key` value
    pub fn name(&self) -> &'static str {
        match self {
            Key::ArrowDown => "ArrowDown",
            Key::ArrowUp => "ArrowUp",
            Key::Enter => "Enter",
            Key::Escape => "Escape",
            Key::Tab => "Tab",
            Key::Backspace => "Backspace",
        }
    }

    /// Windows virtual key code, needed by CDP for non-printable keys
    pub fn key_code(&self) -> i64 {
        match self {
            Key::ArrowDown => 40,
            Key::ArrowUp => 38,
            Key::Enter => 13,
            Key::Escape => 27,
            Key::Tab => 9,
            Key::Backspace => 8,
        }
    }
}

/// Operations on the live page.
#[async_trait]
pub trait Document: Send + Sync {
    /// Load a URL and wait for the document to settle.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Snapshot the state of the element `locator` picks.
    async fn inspect(&self, locator: &Locator) -> Result<ElementState>;

    async fn scroll_into_view(&self, locator: &Locator) -> Result<()>;

    async fn click(&self, locator: &Locator, mode: ClickMode) -> Result<()>;

    /// Empty an input.
    async fn clear(&self, locator: &Locator) -> Result<()>;

    /// Assign an input's value programmatically and fire input/change events.
    async fn set_value(&self, locator: &Locator, value: &str) -> Result<()>;

    /// Focus the element and type `text` one key at a time, without pausing.
    async fn type_text(&self, locator: &Locator, text: &str) -> Result<()>;

    async fn input_value(&self, locator: &Locator) -> Result<String>;

    async fn inner_text(&self, locator: &Locator) -> Result<String>;

    /// One text per element matching the locator, ignoring its ordinal, in
    /// document order. Elements that are not visible yield an empty string,
    /// so a position in the result is the `Ordinal::Nth` that clicks it.
    async fn all_inner_texts(&self, locator: &Locator) -> Result<Vec<String>>;

    /// Press a key on whatever element has focus.
    async fn press_key(&self, key: Key) -> Result<()>;

    /// Click at viewport coordinates.
    async fn mouse_click(&self, x: f64, y: f64) -> Result<()>;

    /// PNG bytes of the page.
    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>>;
}
