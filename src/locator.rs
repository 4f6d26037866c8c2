//! Declarative element queries and Target Descriptors.
//!
//! A [`Locator`] describes *how* to find an element in the live document; it
//! never holds a node handle. A [`Target`] is an ordered, non-empty list of
//! locators for one semantic element, tried strictly in order by the
//! [`Resolver`](crate::resolve::Resolver). Both are built fresh for every call.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One way of matching elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Query {
    /// Accessible role plus optional accessible name (`button` named "Apply")
    Role {
        role: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default)]
        exact: bool,
    },
    /// `data-testid` attribute
    TestId { id: String },
    /// Visible text content
    Text {
        text: String,
        #[serde(default)]
        exact: bool,
    },
    /// Form control labelled by the given text
    Label {
        text: String,
        #[serde(default)]
        exact: bool,
    },
    /// Input placeholder
    Placeholder { text: String },
    /// CSS selector
    Css { selector: String },
    /// XPath expression
    #[serde(rename = "xpath")]
    XPath { expr: String },
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Role { role, name, exact } => match name {
                Some(name) if *exact => write!(f, "role={}[name={:?}s]", role, name),
                Some(name) => write!(f, "role={}[name={:?}i]", role, name),
                None => write!(f, "role={}", role),
            },
            Query::TestId { id } => write!(f, "testid={}", id),
            Query::Text { text, exact } => {
                write!(f, "text={:?}{}", text, if *exact { "s" } else { "i" })
            }
            Query::Label { text, exact } => {
                write!(f, "label={:?}{}", text, if *exact { "s" } else { "i" })
            }
            Query::Placeholder { text } => write!(f, "placeholder={:?}", text),
            Query::Css { selector } => write!(f, "css={}", selector),
            Query::XPath { expr } => write!(f, "xpath={}", expr),
        }
    }
}

/// Which of the matched elements a locator designates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ordinal {
    /// Exactly one element must match
    #[default]
    Only,
    First,
    Last,
    /// Zero-based position among the matches
    Nth(usize),
}

impl Ordinal {
    /// Index picked out of `count` matches, if any.
    pub fn pick(self, count: usize) -> Option<usize> {
        match self {
            Ordinal::Only => (count == 1).then_some(0),
            Ordinal::First => (count > 0).then_some(0),
            Ordinal::Last => count.checked_sub(1),
            Ordinal::Nth(n) => (n < count).then_some(n),
        }
    }
}

/// A scoped, filtered, ordinal-qualified query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    /// Element the query runs inside; `None` means the whole document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Box<Locator>>,

    #[serde(flatten)]
    pub query: Query,

    /// Keep only matches whose text contains this string (case-insensitive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_text: Option<String>,

    #[serde(default)]
    pub ordinal: Ordinal,
}

impl Locator {
    pub fn new(query: Query) -> Self {
        Self {
            scope: None,
            query,
            has_text: None,
            ordinal: Ordinal::Only,
        }
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::new(Query::Css {
            selector: selector.into(),
        })
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::new(Query::XPath { expr: expr.into() })
    }

    pub fn test_id(id: impl Into<String>) -> Self {
        Self::new(Query::TestId { id: id.into() })
    }

    pub fn role(role: impl Into<String>, name: Option<&str>) -> Self {
        Self::new(Query::Role {
            role: role.into(),
            name: name.map(str::to_string),
            exact: true,
        })
    }

    pub fn text(text: impl Into<String>, exact: bool) -> Self {
        Self::new(Query::Text {
            text: text.into(),
            exact,
        })
    }

    pub fn label(text: impl Into<String>) -> Self {
        Self::new(Query::Label {
            text: text.into(),
            exact: false,
        })
    }

    pub fn placeholder(text: impl Into<String>) -> Self {
        Self::new(Query::Placeholder { text: text.into() })
    }

    /// Run this query inside `scope`.
    pub fn within(mut self, scope: Locator) -> Self {
        self.scope = Some(Box::new(scope));
        self
    }

    /// A query that runs inside this locator's element.
    pub fn child(&self, query: Query) -> Locator {
        Locator::new(query).within(self.clone())
    }

    pub fn child_css(&self, selector: impl Into<String>) -> Locator {
        self.child(Query::Css {
            selector: selector.into(),
        })
    }

    pub fn has_text(mut self, text: impl Into<String>) -> Self {
        self.has_text = Some(text.into());
        self
    }

    pub fn first(self) -> Self {
        self.at(Ordinal::First)
    }

    pub fn last(self) -> Self {
        self.at(Ordinal::Last)
    }

    pub fn nth(self, index: usize) -> Self {
        self.at(Ordinal::Nth(index))
    }

    pub fn at(mut self, ordinal: Ordinal) -> Self {
        self.ordinal = ordinal;
        self
    }

    /// Identity of the match set, ignoring this locator's own ordinal.
    ///
    /// Two locators with the same key match the same elements and differ only
    /// in which one they pick.
    pub fn key(&self) -> String {
        let mut key = String::new();
        if let Some(scope) = &self.scope {
            key.push_str(&scope.to_string());
            key.push_str(" >> ");
        }
        key.push_str(&self.query.to_string());
        if let Some(text) = &self.has_text {
            key.push_str(&format!(" >> has-text={:?}", text));
        }
        key
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())?;
        match self.ordinal {
            Ordinal::Only => Ok(()),
            Ordinal::First => write!(f, " >> nth=0"),
            Ordinal::Last => write!(f, " >> nth=-1"),
            Ordinal::Nth(n) => write!(f, " >> nth={}", n),
        }
    }
}

/// Target Descriptor: ordered candidates for one semantic element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TargetRepr", into = "TargetRepr")]
pub struct Target {
    description: String,
    candidates: Vec<Locator>,
    actionable: bool,
}

impl Target {
    /// A target with its highest-priority candidate.
    pub fn new(description: impl Into<String>, primary: Locator) -> Self {
        Self {
            description: description.into(),
            candidates: vec![primary],
            actionable: true,
        }
    }

    /// Append a lower-priority candidate.
    pub fn or(mut self, fallback: Locator) -> Self {
        self.candidates.push(fallback);
        self
    }

    /// Targets that are only read, never clicked or typed into, skip the enabled check.
    pub fn passive(mut self) -> Self {
        self.actionable = false;
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn candidates(&self) -> &[Locator] {
        &self.candidates
    }

    pub fn is_actionable(&self) -> bool {
        self.actionable
    }
}

impl From<Locator> for Target {
    fn from(locator: Locator) -> Self {
        let description = locator.to_string();
        Target::new(description, locator)
    }
}

#[derive(Serialize, Deserialize)]
struct TargetRepr {
    description: String,
    candidates: Vec<Locator>,
    #[serde(default = "default_actionable")]
    actionable: bool,
}

fn default_actionable() -> bool {
    true
}

impl TryFrom<TargetRepr> for Target {
    type Error = String;

    fn try_from(repr: TargetRepr) -> Result<Self, Self::Error> {
        if repr.candidates.is_empty() {
            return Err(format!(
                "target '{}' must have at least one candidate",
                repr.description
            ));
        }
        Ok(Target {
            description: repr.description,
            candidates: repr.candidates,
            actionable: repr.actionable,
        })
    }
}

impl From<Target> for TargetRepr {
    fn from(target: Target) -> Self {
        TargetRepr {
            description: target.description,
            candidates: target.candidates,
            actionable: target.actionable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinal_pick() {
        assert_eq!(Ordinal::Only.pick(1), Some(0));
        assert_eq!(Ordinal::Only.pick(2), None);
        assert_eq!(Ordinal::First.pick(3), Some(0));
        assert_eq!(Ordinal::Last.pick(3), Some(2));
        assert_eq!(Ordinal::Last.pick(0), None);
        assert_eq!(Ordinal::Nth(2).pick(2), None);
        assert_eq!(Ordinal::Nth(1).pick(2), Some(1));
    }

    #[test]
    fn test_display_and_key() {
        let panel = Locator::css(".ant-picker-dropdown").last();
        let header = panel.child_css(".ant-picker-header-view");

        assert_eq!(panel.to_string(), "css=.ant-picker-dropdown >> nth=-1");
        assert_eq!(
            header.to_string(),
            "css=.ant-picker-dropdown >> nth=-1 >> css=.ant-picker-header-view"
        );

        let option = Locator::css(".opt").has_text("Eng").nth(2);
        assert_eq!(option.key(), "css=.opt >> has-text=\"Eng\"");
        assert_eq!(option.to_string(), "css=.opt >> has-text=\"Eng\" >> nth=2");
    }

    #[test]
    fn test_target_json() {
        let json = serde_json::json!({
            "description": "Apply button",
            "candidates": [
                {"by": "test_id", "id": "apply-button"},
                {"by": "role", "role": "button", "name": "Apply", "exact": true},
                {"by": "css", "selector": "button.apply", "ordinal": "first"}
            ]
        });

        let target: Target = serde_json::from_value(json).unwrap();
        assert_eq!(target.description(), "Apply button");
        assert_eq!(target.candidates().len(), 3);
        assert!(target.is_actionable());
        assert_eq!(target.candidates()[2].ordinal, Ordinal::First);

        let nth: Locator =
            serde_json::from_value(serde_json::json!({"by": "css", "selector": "input", "ordinal": {"nth": 1}}))
                .unwrap();
        assert_eq!(nth.ordinal, Ordinal::Nth(1));
    }

    #[test]
    fn test_empty_target_rejected() {
        let json = serde_json::json!({"description": "nothing", "candidates": []});
        assert!(serde_json::from_value::<Target>(json).is_err());
    }
}
