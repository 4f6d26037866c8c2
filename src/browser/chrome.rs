use crate::browser::document::ChromeDocument;
use crate::config::DriverConfig;
use crate::error::{DriverError, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::path::PathBuf;

pub struct ChromeDriver {
    browser: Browser,
    temp_dir: Option<PathBuf>,
}

/// Connection mode for Chrome browser
#[derive(Debug, Clone)]
pub enum ConnectionMode {
    /// Launches Chrome from the system installation
    Sandboxed {
        chrome_path: Option<String>,
        no_sandbox: bool,
        headless: bool,
    },
    /// Connects to an existing Chrome on a debug port
    DebugPort(u16),
}

const INSTALL_HINT: &str = "Chrome not found. You can:\n\
     - Install Chrome: https://www.google.com/chrome/\n\
     - Ubuntu/Debian: sudo apt install chromium-browser\n\
     - Fedora: sudo dnf install chromium\n\
     - macOS: brew install --cask google-chrome\n\
     - Or specify path: --chrome-path /path/to/chrome\n\
     - Linux sandbox issue? Try: --no-sandbox";

impl ChromeDriver {
    /// Current page, skipping Chrome's own `chrome://` tabs. Creates a blank
    /// page when none exists.
    async fn get_active_page(&self) -> Result<chromiumoxide::page::Page> {
        let pages = self.browser.pages().await?;

        for page in pages.iter() {
            if let Ok(Some(url)) = page.url().await {
                if !url.starts_with("chrome://") {
                    return Ok(page.clone());
                }
            }
        }

        if let Some(page) = pages.last() {
            return Ok(page.clone());
        }

        self.browser
            .new_page("about:blank")
            .await
            .map_err(|e| DriverError::Browser(format!("Failed to create page: {}", e)))
    }

    /// Launch according to the configured browser mode.
    pub async fn launch(
        config: &DriverConfig,
        chrome_path: Option<String>,
        no_sandbox: bool,
    ) -> Result<Self> {
        Self::new(ConnectionMode::Sandboxed {
            chrome_path,
            no_sandbox,
            headless: config.headless,
        })
        .await
    }

    /// Launch with CI auto-detection: CI runs get `--no-sandbox` and headless mode.
    pub async fn launch_auto() -> Result<Self> {
        let is_ci = std::env::var("CI").is_ok()
            || std::env::var("GITHUB_ACTIONS").is_ok()
            || std::env::var("GITLAB_CI").is_ok()
            || std::env::var("JENKINS_HOME").is_ok()
            || std::env::var("CIRCLECI").is_ok();

        Self::new(ConnectionMode::Sandboxed {
            chrome_path: None,
            no_sandbox: is_ci,
            headless: is_ci,
        })
        .await
    }

    pub async fn connect_debug_port(port: u16) -> Result<Self> {
        Self::new(ConnectionMode::DebugPort(port)).await
    }

    pub async fn new(mode: ConnectionMode) -> Result<Self> {
        let (browser, temp_dir) = match mode {
            ConnectionMode::Sandboxed {
                chrome_path,
                no_sandbox,
                headless,
            } => {
                // Unique profile per instance so parallel runs never share state
                let unique_id = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_nanos())
                    .unwrap_or_default();
                let temp_dir = std::env::temp_dir().join(format!("formdriver-{}", unique_id));
                std::fs::create_dir_all(&temp_dir).map_err(|e| {
                    DriverError::LaunchFailed(format!("Failed to create temp directory: {}", e))
                })?;

                let mut config = if headless {
                    BrowserConfig::builder()
                } else {
                    BrowserConfig::builder().with_head()
                };
                config = config.user_data_dir(&temp_dir);

                if no_sandbox {
                    config = config.arg("--no-sandbox");
                }
                if let Some(path) = chrome_path {
                    config = config.chrome_executable(path);
                }

                log::info!(
                    target: "ChromeDriver",
                    "Launching Chrome (headless: {}, no-sandbox: {})",
                    headless,
                    no_sandbox
                );

                let config = config
                    .build()
                    .map_err(|e| DriverError::LaunchFailed(format!("{}.\n\n{}", e, INSTALL_HINT)))?;
                let (browser, mut handler) = Browser::launch(config)
                    .await
                    .map_err(|e| DriverError::LaunchFailed(format!("{}.\n\n{}", e, INSTALL_HINT)))?;

                tokio::spawn(async move {
                    while (handler.next().await).is_some() {
                        // Handle browser events
                    }
                });

                (browser, Some(temp_dir))
            }
            ConnectionMode::DebugPort(port) => {
                let url = format!("http://localhost:{}", port);
                let (browser, mut handler) = Browser::connect(&url).await.map_err(|e| {
                    DriverError::ConnectionFailed(format!(
                        "Failed to connect to Chrome on port {}. \
                             Make sure Chrome is running with --remote-debugging-port={}: {}",
                        port, port, e
                    ))
                })?;

                tokio::spawn(async move {
                    while (handler.next().await).is_some() {
                        // Handle browser events
                    }
                });

                (browser, None)
            }
        };

        Ok(Self { browser, temp_dir })
    }

    /// Document handle on the active page.
    pub async fn document(&self) -> Result<ChromeDocument> {
        Ok(ChromeDocument::new(self.get_active_page().await?))
    }

    /// Document handle on a fresh page, for running scenarios side by side.
    pub async fn new_document(&self) -> Result<ChromeDocument> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| DriverError::Browser(format!("Failed to create page: {}", e)))?;
        Ok(ChromeDocument::new(page))
    }

    pub async fn current_url(&self) -> Result<String> {
        let page = self.get_active_page().await?;

        page.url()
            .await
            .map_err(|e| DriverError::Browser(e.to_string()))?
            .ok_or_else(|| DriverError::Browser("page has no URL".to_string()))
    }

    pub async fn title(&self) -> Result<String> {
        let page = self.get_active_page().await?;

        page.get_title()
            .await
            .map_err(|e| DriverError::Browser(e.to_string()))?
            .ok_or_else(|| DriverError::Browser("page has no title".to_string()))
    }

    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Returns true if the browser connection still answers.
    pub async fn is_alive(&self) -> bool {
        match self.browser.pages().await {
            Ok(pages) => {
                if let Some(page) = pages.first() {
                    matches!(
                        tokio::time::timeout(tokio::time::Duration::from_secs(2), page.url()).await,
                        Ok(Ok(_))
                    )
                } else {
                    true
                }
            }
            Err(_) => false,
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .map_err(|e| DriverError::Browser(e.to_string()))?;
        Ok(())
    }
}

impl Drop for ChromeDriver {
    fn drop(&mut self) {
        if let Some(temp_dir) = &self.temp_dir {
            if temp_dir.exists() {
                let _ = std::fs::remove_dir_all(temp_dir);
            }
        }
    }
}
