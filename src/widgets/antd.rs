//! Ant Design selectors and the named field model.
//!
//! The component framework renders no stable ids, so fields are located
//! relative to their visible label. A [`FieldRef`] names a field by label,
//! position among same-labelled fields, and scope, and turns that into
//! [`Target`]s for the parts of the widget a driver touches.

use crate::locator::{Locator, Target};
use serde::{Deserialize, Serialize};

pub const SELECT_PANEL: &str = ".ant-select-dropdown";
pub const OPEN_SELECT_PANEL: &str = ".ant-select-dropdown:not(.ant-select-dropdown-hidden)";
pub const SELECT_OPTION: &str = ".ant-select-item-option";
pub const OPTION_CONTENT: &str = ".ant-select-item-option-content";
pub const PICKER_PANEL: &str = ".ant-picker-dropdown";
pub const PICKER_HEADER: &str = ".ant-picker-header-view";
pub const PICKER_SUPER_NEXT: &str = ".ant-picker-header-super-next-btn";
pub const PICKER_SUPER_PREV: &str = ".ant-picker-header-super-prev-btn";
pub const PICKER_CELL: &str = ".ant-picker-cell:not(.ant-picker-cell-disabled) .ant-picker-cell-inner";
pub const DIALOG: &str = "[role=\"dialog\"]";

/// The open select panel. Panels stack, so the last one is the live one.
pub fn open_select_panel() -> Locator {
    Locator::css(OPEN_SELECT_PANEL).last()
}

/// Option labels inside the open select panel.
pub fn select_options() -> Locator {
    open_select_panel().child_css(OPTION_CONTENT)
}

/// The most recently opened picker panel.
pub fn picker_panel() -> Locator {
    Locator::css(PICKER_PANEL).last()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    #[default]
    Page,
    /// Inside the topmost modal dialog
    Dialog,
}

/// Which of several fields carrying the same label.
///
/// Serialized as a 1-based number, `"first"` or `"last"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OrdinalRepr", into = "OrdinalRepr")]
pub enum FieldOrdinal {
    /// 1-based position in document order
    Position(usize),
    Last,
}

impl Default for FieldOrdinal {
    fn default() -> Self {
        FieldOrdinal::Position(1)
    }
}

impl FieldOrdinal {
    /// XPath predicate selecting this field among same-labelled ones.
    fn predicate(&self) -> String {
        match self {
            FieldOrdinal::Position(n) => n.to_string(),
            FieldOrdinal::Last => "last()".to_string(),
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, FieldOrdinal::Position(0))
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum OrdinalRepr {
    Position(usize),
    Keyword(String),
}

impl TryFrom<OrdinalRepr> for FieldOrdinal {
    type Error = String;

    fn try_from(repr: OrdinalRepr) -> Result<Self, Self::Error> {
        match repr {
            OrdinalRepr::Position(n) => Ok(FieldOrdinal::Position(n)),
            OrdinalRepr::Keyword(word) => match word.as_str() {
                "first" => Ok(FieldOrdinal::Position(1)),
                "last" => Ok(FieldOrdinal::Last),
                other => Err(format!("unknown field ordinal {:?}", other)),
            },
        }
    }
}

impl From<FieldOrdinal> for OrdinalRepr {
    fn from(ordinal: FieldOrdinal) -> Self {
        match ordinal {
            FieldOrdinal::Position(n) => OrdinalRepr::Position(n),
            FieldOrdinal::Last => OrdinalRepr::Keyword("last".to_string()),
        }
    }
}

/// A form field identified by its label rather than by page-wide position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRef {
    pub label: String,
    #[serde(default)]
    pub ordinal: FieldOrdinal,
    #[serde(default)]
    pub scope: Scope,
    /// `data-testid` of the field container, tried before the label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
}

impl FieldRef {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ordinal: FieldOrdinal::default(),
            scope: Scope::Page,
            test_id: None,
        }
    }

    pub fn nth(mut self, ordinal: usize) -> Self {
        self.ordinal = FieldOrdinal::Position(ordinal.max(1));
        self
    }

    /// The last field with this label.
    pub fn last(mut self) -> Self {
        self.ordinal = FieldOrdinal::Last;
        self
    }

    pub fn in_dialog(mut self) -> Self {
        self.scope = Scope::Dialog;
        self
    }

    pub fn with_test_id(mut self, id: impl Into<String>) -> Self {
        self.test_id = Some(id.into());
        self
    }

    fn describe(&self, part: &str) -> String {
        match self.ordinal {
            FieldOrdinal::Position(n) if n > 1 => format!("{} {} #{}", self.label, part, n),
            FieldOrdinal::Last => format!("{} {} (last)", self.label, part),
            FieldOrdinal::Position(_) => format!("{} {}", self.label, part),
        }
    }

    /// Test-id candidate, then the required-field label ("Board *"), then the bare label.
    fn target(&self, part: &str, test_id_css: &str, tail: &str) -> Target {
        let labelled = |text: String| {
            self.scoped(Locator::xpath(format!(
                "(.//span[normalize-space()={}])[{}]/../..{}",
                xpath_literal(&text),
                self.ordinal.predicate(),
                tail
            )))
        };

        let required = labelled(format!("{} *", self.label));
        let plain = labelled(self.label.clone());

        let target = match &self.test_id {
            Some(id) => Target::new(
                self.describe(part),
                self.scoped(Locator::test_id(id.clone())).child_css(test_id_css),
            )
            .or(required),
            None => Target::new(self.describe(part), required),
        };
        target.or(plain)
    }

    fn scoped(&self, locator: Locator) -> Locator {
        match self.scope {
            Scope::Page => locator,
            Scope::Dialog => locator.within(Locator::css(DIALOG).last()),
        }
    }

    /// Clickable surface of a select.
    pub fn selector(&self) -> Target {
        self.target(
            "dropdown",
            ".ant-select-selector",
            "//div[contains(@class,'ant-select-selector')]",
        )
    }

    /// Search box embedded in a select.
    pub fn search_input(&self) -> Target {
        self.target(
            "search input",
            "input[role=\"combobox\"]",
            "//input[@role='combobox']",
        )
    }

    /// Search box of a multi-value select.
    pub fn multi_search_input(&self) -> Target {
        self.target(
            "search input",
            "input.ant-select-selection-search-input",
            "//input[contains(@class,'ant-select-selection-search-input')]",
        )
    }

    /// Committed value shown in a closed single select.
    pub fn display(&self) -> Target {
        self.target(
            "value",
            ".ant-select-selection-item",
            "//span[contains(@class,'ant-select-selection-item')]",
        )
        .passive()
    }

    /// Input of a date or month picker.
    pub fn picker_input(&self) -> Target {
        self.target(
            "picker",
            ".ant-picker input",
            "//div[contains(@class,'ant-picker')]//input",
        )
    }
}

/// Quote `text` as an XPath string literal.
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        format!("'{}'", text)
    } else if !text.contains('"') {
        format!("\"{}\"", text)
    } else {
        let parts: Vec<String> = text.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}
