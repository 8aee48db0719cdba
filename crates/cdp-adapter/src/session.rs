use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::handler::viewport::Viewport;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::chromium::ChromiumPage;
use crate::config::CdpConfig;
use crate::driver::PageDriver;
use crate::error::{AdapterError, AdapterErrorKind};
use crate::mask;

/// One browser process and its single page, owned by one run.
///
/// Call [`BrowserSession::shutdown`] on every exit path. Dropping without it
/// still stops the event loop, and chromiumoxide kills the child process.
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Arc<ChromiumPage>,
    closed: bool,
}

impl BrowserSession {
    pub async fn launch(cfg: &CdpConfig) -> Result<Self, AdapterError> {
        let browser_cfg = browser_config(cfg)?;
        let (browser, mut handler) = Browser::launch(browser_cfg).await.map_err(|err| {
            AdapterError::new(AdapterErrorKind::CdpIo)
                .with_hint(format!("failed to launch chromium: {err}"))
        })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(target: "cdp-session", ?err, "handler loop stopped");
                    break;
                }
            }
        });

        let deadline = Duration::from_millis(cfg.default_deadline_ms);
        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                handler.abort();
                return Err(AdapterError::new(AdapterErrorKind::CdpIo)
                    .with_hint(format!("failed to open page: {err}")));
            }
        };

        if let Some(ua) = &cfg.user_agent {
            if let Err(err) = page.set_user_agent(ua.as_str()).await {
                warn!(target: "cdp-session", %err, "user agent override rejected");
            }
        }

        if cfg.mask_personal_info {
            if let Err(err) = page
                .evaluate_on_new_document(mask::PRIVACY_MASK_SCRIPT)
                .await
            {
                warn!(target: "cdp-session", %err, "privacy mask not installed");
            }
        }

        info!(
            target: "cdp-session",
            headless = cfg.headless,
            width = cfg.viewport.width,
            height = cfg.viewport.height,
            "chromium session started"
        );

        Ok(Self {
            browser,
            handler,
            page: Arc::new(ChromiumPage::new(page, deadline)),
            closed: false,
        })
    }

    pub fn page(&self) -> Arc<dyn PageDriver> {
        self.page.clone()
    }

    /// Closes the browser and waits for the process to exit.
    pub async fn shutdown(mut self) -> Result<(), AdapterError> {
        self.closed = true;
        let close = self.browser.close().await.map_err(|err| {
            AdapterError::new(AdapterErrorKind::CdpIo).with_hint(format!("close: {err}"))
        });
        if let Err(err) = self.browser.wait().await {
            warn!(target: "cdp-session", %err, "browser process did not exit cleanly");
        }
        self.handler.abort();
        info!(target: "cdp-session", "chromium session closed");
        close.map(|_| ())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if !self.closed {
            warn!(target: "cdp-session", "session dropped without shutdown");
            self.handler.abort();
        }
    }
}

fn browser_config(cfg: &CdpConfig) -> Result<BrowserConfig, AdapterError> {
    if !cfg.executable.as_os_str().is_empty() && !cfg.executable.exists() {
        return Err(AdapterError::new(AdapterErrorKind::CdpIo).with_hint(format!(
            "chrome executable not found at {}",
            cfg.executable.display()
        )));
    }

    let mut builder = BrowserConfig::builder()
        .request_timeout(Duration::from_millis(cfg.default_deadline_ms))
        .launch_timeout(Duration::from_millis(cfg.launch_timeout_ms))
        .viewport(Viewport {
            width: cfg.viewport.width,
            height: cfg.viewport.height,
            ..Viewport::default()
        })
        .no_sandbox()
        .args(cfg.launch_args());

    if !cfg.headless {
        builder = builder.with_head();
    }
    if !cfg.executable.as_os_str().is_empty() {
        builder = builder.chrome_executable(cfg.executable.clone());
    }
    if let Some(dir) = &cfg.user_data_dir {
        builder = builder.user_data_dir(dir.clone());
    }

    builder.build().map_err(|err| {
        AdapterError::new(AdapterErrorKind::Internal)
            .with_hint(format!("browser config error: {err}"))
    })
}
