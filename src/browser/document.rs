//! [`Document`] implementation on a live Chrome page.
//!
//! Element work goes through the in-page locator script; mouse and keyboard
//! input is dispatched as CDP `Input` events so the page sees trusted events.

use crate::browser::js;
use crate::document::{ClickMode, Document, ElementState, Key};
use crate::error::{DriverError, Result};
use crate::locator::Locator;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
    DispatchMouseEventType, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::page::{EventLoadEventFired, NavigateParams};
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct Point {
    x: f64,
    y: f64,
    hit: bool,
}

#[derive(Clone)]
pub struct ChromeDocument {
    page: Page,
}

impl ChromeDocument {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    async fn run(&self, locator: &Locator, op: &str, arg: Value) -> Result<Value> {
        let expression = js::call(locator, op, &arg)?;
        let result = self
            .page
            .evaluate(expression)
            .await
            .map_err(|e| DriverError::Browser(format!("Script execution failed: {}", e)))?;
        let value = result.into_value().unwrap_or(Value::Null);
        js::check(locator, value)
    }

    async fn mouse(&self, kind: DispatchMouseEventType, x: f64, y: f64, clicks: i64) -> Result<()> {
        let params = DispatchMouseEventParams::builder()
            .r#type(kind)
            .x(x)
            .y(y)
            .button(MouseButton::Left)
            .click_count(clicks)
            .build()
            .map_err(|e| DriverError::Browser(format!("Failed to build mouse event: {}", e)))?;
        self.page.execute(params).await?;
        Ok(())
    }

    async fn click_at(&self, x: f64, y: f64, clicks: i64) -> Result<()> {
        self.mouse(DispatchMouseEventType::MouseMoved, x, y, 0).await?;
        for count in 1..=clicks {
            self.mouse(DispatchMouseEventType::MousePressed, x, y, count)
                .await?;
            self.mouse(DispatchMouseEventType::MouseReleased, x, y, count)
                .await?;
        }
        Ok(())
    }

    async fn key_event(
        &self,
        kind: DispatchKeyEventType,
        key: &str,
        text: Option<&str>,
        code: Option<i64>,
    ) -> Result<()> {
        let mut builder = DispatchKeyEventParams::builder().r#type(kind).key(key);
        if let Some(text) = text {
            builder = builder.text(text);
        }
        if let Some(code) = code {
            builder = builder.windows_virtual_key_code(code);
        }
        let params = builder
            .build()
            .map_err(|e| DriverError::Browser(format!("Failed to build key event: {}", e)))?;
        self.page.execute(params).await?;
        Ok(())
    }
}

#[async_trait]
impl Document for ChromeDocument {
    async fn navigate(&self, url: &str) -> Result<()> {
        let url = normalize_url(url);
        log::info!(target: "ChromeDocument", "Navigating to {}", url);

        let mut loaded = self.page.event_listener::<EventLoadEventFired>().await?;
        let params = NavigateParams::builder()
            .url(&url)
            .build()
            .map_err(|e| DriverError::NavigationFailed(format!("Invalid URL {}: {}", url, e)))?;

        let response = self.page.execute(params).await.map_err(|e| {
            if e.to_string().contains("oneshot canceled") {
                DriverError::NavigationFailed(
                    "Browser connection lost; the browser may have been closed or crashed"
                        .to_string(),
                )
            } else {
                DriverError::NavigationFailed(format!("Failed to navigate to {}: {}", url, e))
            }
        })?;

        if let Some(error_text) = &response.result.error_text {
            return Err(DriverError::NavigationFailed(format!(
                "Navigation error: {}",
                error_text
            )));
        }

        match tokio::time::timeout(LOAD_TIMEOUT, loaded.next()).await {
            Ok(Some(_)) => log::debug!(target: "ChromeDocument", "Load event fired for {}", url),
            Ok(None) => log::warn!(target: "ChromeDocument", "Load event stream closed for {}", url),
            Err(_) => {
                return Err(DriverError::NavigationFailed(format!(
                    "Timed out after {}s waiting for {} to load",
                    LOAD_TIMEOUT.as_secs(),
                    url
                )))
            }
        }
        Ok(())
    }

    async fn inspect(&self, locator: &Locator) -> Result<ElementState> {
        let value = self.run(locator, "inspect", Value::Null).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn scroll_into_view(&self, locator: &Locator) -> Result<()> {
        self.run(locator, "scroll", Value::Null).await?;
        Ok(())
    }

    async fn click(&self, locator: &Locator, mode: ClickMode) -> Result<()> {
        if mode == ClickMode::Dom {
            self.run(locator, "dom_click", Value::Null).await?;
            return Ok(());
        }

        let point: Point = serde_json::from_value(self.run(locator, "point", Value::Null).await?)?;
        match mode {
            ClickMode::Standard if !point.hit => Err(DriverError::Browser(format!(
                "{} is covered by another element at ({:.0}, {:.0})",
                locator, point.x, point.y
            ))),
            ClickMode::Double => self.click_at(point.x, point.y, 2).await,
            _ => self.click_at(point.x, point.y, 1).await,
        }
    }

    async fn clear(&self, locator: &Locator) -> Result<()> {
        self.run(locator, "set_value", Value::String(String::new()))
            .await?;
        Ok(())
    }

    async fn set_value(&self, locator: &Locator, value: &str) -> Result<()> {
        self.run(locator, "set_value", Value::String(value.to_string()))
            .await?;
        Ok(())
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<()> {
        self.run(locator, "focus", Value::Null).await?;
        for c in text.chars() {
            let key = c.to_string();
            self.key_event(DispatchKeyEventType::KeyDown, &key, Some(&key), None)
                .await?;
            self.key_event(DispatchKeyEventType::KeyUp, &key, None, None)
                .await?;
        }
        Ok(())
    }

    async fn input_value(&self, locator: &Locator) -> Result<String> {
        let value = self.run(locator, "value", Value::Null).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn inner_text(&self, locator: &Locator) -> Result<String> {
        let value = self.run(locator, "text", Value::Null).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn all_inner_texts(&self, locator: &Locator) -> Result<Vec<String>> {
        let value = self.run(locator, "all_texts", Value::Null).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn press_key(&self, key: Key) -> Result<()> {
        let text = match key {
            Key::Enter => Some("\r"),
            _ => None,
        };
        self.key_event(
            DispatchKeyEventType::KeyDown,
            key.name(),
            text,
            Some(key.key_code()),
        )
        .await?;
        self.key_event(
            DispatchKeyEventType::KeyUp,
            key.name(),
            None,
            Some(key.key_code()),
        )
        .await
    }

    async fn mouse_click(&self, x: f64, y: f64) -> Result<()> {
        self.click_at(x, y, 1).await
    }

    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>> {
        let params = ScreenshotParams::builder().full_page(full_page).build();
        self.page
            .screenshot(params)
            .await
            .map_err(|e| DriverError::Browser(format!("Failed to take screenshot: {}", e)))
    }
}

/// Add `https://` when no scheme is given.
pub fn normalize_url(url: &str) -> String {
    const SCHEMES: [&str; 5] = ["http://", "https://", "file://", "about:", "data:"];
    if SCHEMES.iter().any(|s| url.starts_with(s)) {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}
