//! Month picker driver.
//!
//! The picker has no year entry, so the driver reads the displayed year from
//! the panel header and pages toward the target one year at a time. Paging is
//! capped by `max_year_pages`.

use crate::action::{ActionExecutor, ActionOptions};
use crate::document::ClickMode;
use crate::error::{DriverError, Result};
use crate::locator::{Locator, Query, Target};
use crate::widgets::antd;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Pause after a year-page click for the header to re-render.
const PAGE_SETTLE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    pub year: i32,
    /// 1-based
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(DriverError::InvalidValue(format!(
                "month {} out of range in {}-{:02}",
                month, year, month
            )));
        }
        Ok(Self { year, month })
    }

    /// Three-letter label of the month cell ("Mar").
    pub fn abbreviation(&self) -> &'static str {
        MONTH_ABBREVIATIONS[(self.month - 1) as usize]
    }
}

impl FromStr for YearMonth {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || DriverError::InvalidValue(format!("expected YYYY-MM, got {:?}", s));
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 {
            return Err(invalid());
        }
        let year = year.parse().map_err(|_| invalid())?;
        let month = month.parse().map_err(|_| invalid())?;
        YearMonth::new(year, month)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = DriverError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

/// First run of four digits in a header label ("2024", "Mar 2024").
pub fn parse_header_year(header: &str) -> Option<i32> {
    let digits: Vec<char> = header.chars().collect();
    digits
        .windows(4)
        .enumerate()
        .find(|(i, w)| {
            w.iter().all(|c| c.is_ascii_digit())
                && (*i == 0 || !digits[i - 1].is_ascii_digit())
        })
        .and_then(|(_, w)| w.iter().collect::<String>().parse().ok())
}

pub struct MonthPicker {
    executor: ActionExecutor,
}

impl MonthPicker {
    pub fn new(executor: &ActionExecutor) -> Self {
        Self {
            executor: executor.for_component("MonthPicker"),
        }
    }

    /// Open the picker behind `trigger` and choose `target`.
    pub async fn select_month(&self, trigger: &Target, target: YearMonth) -> Result<()> {
        let diagnostics = self.executor.diagnostics();
        diagnostics.info(format!(
            "Selecting month {} via {}",
            target,
            trigger.description()
        ));

        match self.run(trigger, target).await {
            Ok(()) => {
                diagnostics.info(format!("Selected month {}", target));
                Ok(())
            }
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                diagnostics
                    .failure(
                        format!("Month selection failed for {}: {}", trigger.description(), e),
                        &format!("month-picker-failure-{}", trigger.description()),
                    )
                    .await;
                Err(e)
            }
        }
    }

    /// Fill a start/end pair. `from` must not be after `to`.
    pub async fn select_month_range(
        &self,
        start: &Target,
        end: &Target,
        from: YearMonth,
        to: YearMonth,
    ) -> Result<()> {
        if from > to {
            return Err(DriverError::InvalidValue(format!(
                "range start {} is after end {}",
                from, to
            )));
        }
        self.select_month(start, from).await?;
        self.select_month(end, to).await
    }

    async fn run(&self, trigger: &Target, target: YearMonth) -> Result<()> {
        let executor = &self.executor;
        let config = executor.config();

        executor.click(trigger, ActionOptions::default()).await?;

        let panel = antd::picker_panel();
        let panel_target = Target::new("picker panel", panel.clone()).passive();
        if let Err(e) = executor.wait_visible(&panel_target, config.panel_timeout()).await {
            if e.is_cancelled() {
                return Err(e);
            }
            return Err(DriverError::PickerNotFound(format!(
                "no picker panel opened by {}",
                trigger.description()
            )));
        }

        self.page_to_year(&panel, target).await?;

        let cell = Target::new(
            format!("{} cell", target.abbreviation()),
            panel
                .child_css(antd::PICKER_CELL)
                .has_text(target.abbreviation())
                .first(),
        )
        .or(panel.child(Query::XPath {
            expr: format!(
                ".//td[@title='{}' and not(contains(@class,'disabled'))]",
                target
            ),
        }))
        .passive();

        let resolved = match executor
            .resolver()
            .resolve(&cell, config.panel_timeout(), executor.cancel_token())
            .await
        {
            Ok(resolved) => resolved,
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                return Err(DriverError::CellNotFound {
                    month: target.to_string(),
                    reason: e.to_string(),
                })
            }
        };
        if let Err(e) = executor
            .click_with(&resolved.locator, ClickMode::Forced)
            .await
        {
            if e.is_cancelled() {
                return Err(e);
            }
            return Err(DriverError::ActionFailed {
                description: format!("click {} cell", target.abbreviation()),
                target: resolved.locator.to_string(),
                reason: e.to_string(),
            });
        }

        if executor
            .wait_hidden(&panel, config.panel_timeout())
            .await
            .is_err()
        {
            executor
                .diagnostics()
                .warn("Picker panel still visible after selecting a month");
        }
        Ok(())
    }

    /// Page the panel until its header shows `target.year`.
    async fn page_to_year(&self, panel: &Locator, target: YearMonth) -> Result<()> {
        let executor = &self.executor;
        let max_pages = executor.config().max_year_pages;
        let header = panel.child_css(antd::PICKER_HEADER);
        let mut pages = 0;

        loop {
            let current = self.displayed_year(&header).await?;
            if current == target.year {
                return Ok(());
            }
            if pages >= max_pages {
                return Err(DriverError::CellNotFound {
                    month: target.to_string(),
                    reason: format!(
                        "year {} not reached after {} pages (showing {})",
                        target.year, pages, current
                    ),
                });
            }

            let button = if current < target.year {
                antd::PICKER_SUPER_NEXT
            } else {
                antd::PICKER_SUPER_PREV
            };
            log::debug!(
                target: "MonthPicker",
                "Header shows {}, paging toward {}",
                current,
                target.year
            );
            executor
                .click_with(&panel.child_css(button), ClickMode::Forced)
                .await?;
            pages += 1;
            executor.pause(PAGE_SETTLE).await?;
        }
    }

    async fn displayed_year(&self, header: &Locator) -> Result<i32> {
        let executor = &self.executor;
        let text = match executor
            .bounded(
                executor.config().attempt_timeout(),
                "read picker header",
                executor.document().inner_text(header),
            )
            .await
        {
            Ok(text) => text,
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                log::debug!(target: "MonthPicker", "Reading header failed: {}", e);
                String::new()
            }
        };

        parse_header_year(&text).ok_or_else(|| {
            DriverError::PickerNotFound(format!("unreadable picker header {:?}", text))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_year_month() {
        let ym: YearMonth = "2024-03".parse().unwrap();
        assert_eq!(ym, YearMonth { year: 2024, month: 3 });
        assert_eq!(ym.abbreviation(), "Mar");
        assert_eq!(ym.to_string(), "2024-03");

        assert!("2024-13".parse::<YearMonth>().is_err());
        assert!("24-03".parse::<YearMonth>().is_err());
        assert!("March 2024".parse::<YearMonth>().is_err());
    }

    #[test]
    fn test_ordering() {
        let a: YearMonth = "2023-12".parse().unwrap();
        let b: YearMonth = "2024-01".parse().unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_parse_header_year() {
        assert_eq!(parse_header_year("2022"), Some(2022));
        assert_eq!(parse_header_year("Mar 2024"), Some(2024));
        assert_eq!(parse_header_year("2020-2029"), Some(2020));
        assert_eq!(parse_header_year("12345"), Some(1234));
        assert_eq!(parse_header_year(""), None);
        assert_eq!(parse_header_year("Year"), None);
    }
}
