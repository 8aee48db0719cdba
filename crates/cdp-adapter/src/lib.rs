//! Browser-automation binding for ticketpilot.
//!
//! Higher layers only see the [`PageDriver`] / [`ElementHandle`] traits. The
//! Chromium implementation lives in [`chromium`], launched and torn down by
//! [`BrowserSession`]. The `scripted` module provides an in-memory page for
//! tests.

use std::{env, path::PathBuf};

use which::which;

pub mod chromium;
pub mod driver;
pub mod mask;
pub mod session;

#[cfg(any(test, feature = "scripted"))]
pub mod scripted;

pub use config::{CdpConfig, ViewportSize};
pub use driver::{ClickMode, ElementHandle, ElementRef, Navigation, PageDriver};
pub use error::{AdapterError, AdapterErrorKind};
pub use session::BrowserSession;
pub use ticketpilot_core_types::AnchorDescriptor;

pub mod error {
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use thiserror::Error;

    /// High-level error categories surfaced by the adapter.
    #[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
    pub enum AdapterErrorKind {
        #[error("navigation timed out")]
        NavTimeout,
        #[error("navigation failed")]
        NavFailed,
        #[error("cdp i/o failure")]
        CdpIo,
        #[error("target element not found")]
        TargetNotFound,
        #[error("script evaluation failed")]
        Script,
        #[error("file i/o failure")]
        Io,
        #[error("unsupported operation")]
        Unsupported,
        #[error("internal error")]
        Internal,
    }

    /// Enriched error metadata passed back to higher layers.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct AdapterError {
        pub kind: AdapterErrorKind,
        pub hint: Option<String>,
        pub retriable: bool,
    }

    impl fmt::Display for AdapterError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.kind)?;
            if let Some(hint) = &self.hint {
                write!(f, ": {}", hint)?;
            }
            Ok(())
        }
    }

    impl std::error::Error for AdapterError {}

    impl AdapterError {
        pub fn new(kind: AdapterErrorKind) -> Self {
            Self {
                kind,
                hint: None,
                retriable: false,
            }
        }

        pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
            self.hint = Some(hint.into());
            self
        }

        pub fn retriable(mut self, flag: bool) -> Self {
            self.retriable = flag;
            self
        }

        /// Operation exceeded its deadline.
        pub fn timed_out(op: &str) -> Self {
            Self::new(AdapterErrorKind::NavTimeout)
                .with_hint(format!("{op} timed out"))
                .retriable(true)
        }

        pub fn is_transport(&self) -> bool {
            matches!(
                self.kind,
                AdapterErrorKind::NavTimeout | AdapterErrorKind::NavFailed | AdapterErrorKind::CdpIo
            )
        }
    }
}

pub mod config {
    use super::detect_chrome_executable;
    use serde::{Deserialize, Serialize};
    use std::{env, path::PathBuf};

    /// Desktop Chrome 120 user agent, what the site sees from a regular visitor.
    pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

    #[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
    pub struct ViewportSize {
        pub width: u32,
        pub height: u32,
    }

    impl Default for ViewportSize {
        fn default() -> Self {
            Self {
                width: 1280,
                height: 800,
            }
        }
    }

    /// Configuration for launching and tuning the browser.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct CdpConfig {
        pub executable: PathBuf,
        pub user_data_dir: Option<PathBuf>,
        pub headless: bool,
        /// Upper bound for every single driver call.
        pub default_deadline_ms: u64,
        pub launch_timeout_ms: u64,
        pub viewport: ViewportSize,
        pub user_agent: Option<String>,
        pub extra_args: Vec<String>,
        pub mask_personal_info: bool,
    }

    impl Default for CdpConfig {
        fn default() -> Self {
            Self {
                executable: default_chrome_path(),
                user_data_dir: None,
                headless: resolve_headless_default(),
                default_deadline_ms: 30_000,
                launch_timeout_ms: 20_000,
                viewport: ViewportSize::default(),
                user_agent: Some(DEFAULT_USER_AGENT.to_string()),
                extra_args: Vec::new(),
                mask_personal_info: true,
            }
        }
    }

    impl CdpConfig {
        /// Launch flags applied on top of chromiumoxide's defaults.
        pub fn launch_args(&self) -> Vec<String> {
            let mut args = vec![
                "--disable-blink-features=AutomationControlled".to_string(),
                "--no-first-run".to_string(),
                "--no-default-browser-check".to_string(),
                "--disable-popup-blocking".to_string(),
                format!(
                    "--window-size={},{}",
                    self.viewport.width, self.viewport.height
                ),
            ];
            if self.headless {
                args.push("--headless=new".to_string());
                args.push("--hide-scrollbars".to_string());
                args.push("--mute-audio".to_string());
            }
            args.extend(self.extra_args.iter().cloned());
            args
        }
    }

    fn resolve_headless_default() -> bool {
        // TICKETPILOT_HEADLESS: "1", "true", "yes", "on" means headless
        match env::var("TICKETPILOT_HEADLESS") {
            Ok(value) => {
                let lower = value.to_ascii_lowercase();
                matches!(lower.as_str(), "1" | "true" | "yes" | "on")
            }
            Err(_) => false,
        }
    }

    fn default_chrome_path() -> PathBuf {
        detect_chrome_executable().unwrap_or_default()
    }
}

/// Finds a Chrome/Chromium binary: explicit env override, then `PATH`, then
/// the usual install locations.
pub fn detect_chrome_executable() -> Option<PathBuf> {
    if let Ok(raw) = env::var("TICKETPILOT_CHROME") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let candidate = PathBuf::from(trimmed);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    for name in chrome_executable_names() {
        if let Ok(path) = which(name) {
            return Some(path);
        }
    }

    let skip_defaults = env::var("TICKETPILOT_SKIP_OS_PATHS")
        .map(|value| !value.trim().is_empty())
        .unwrap_or(false);

    if !skip_defaults {
        for candidate in os_specific_chrome_paths() {
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    None
}

fn chrome_executable_names() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["chrome.exe", "chromium.exe", "msedge.exe"]
    }

    #[cfg(any(target_os = "macos", target_os = "linux", target_os = "freebsd"))]
    {
        &[
            "google-chrome-stable",
            "google-chrome",
            "chromium",
            "chromium-browser",
        ]
    }

    #[cfg(not(any(
        target_os = "windows",
        target_os = "macos",
        target_os = "linux",
        target_os = "freebsd"
    )))]
    {
        &["chrome"]
    }
}

fn os_specific_chrome_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let mut paths = Vec::new();
        for key in ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"] {
            if let Ok(value) = env::var(key) {
                let root = PathBuf::from(value.trim());
                paths.push(root.join("Google/Chrome/Application/chrome.exe"));
                paths.push(root.join("Chromium/Application/chrome.exe"));
            }
        }
        paths
    }

    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        ]
    }

    #[cfg(any(target_os = "linux", target_os = "freebsd"))]
    {
        vec![
            PathBuf::from("/usr/bin/google-chrome-stable"),
            PathBuf::from("/usr/bin/google-chrome"),
            PathBuf::from("/usr/bin/chromium-browser"),
            PathBuf::from("/usr/bin/chromium"),
        ]
    }

    #[cfg(not(any(
        target_os = "windows",
        target_os = "macos",
        target_os = "linux",
        target_os = "freebsd"
    )))]
    {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{chrome_executable_names, detect_chrome_executable, CdpConfig};
    use serial_test::serial;
    use std::{env, fs};
    use tempfile::tempdir;

    #[test]
    #[serial]
    fn detects_from_env_var() {
        let dir = tempdir().unwrap();
        let exe_path = dir.path().join("my-chrome");
        fs::write(&exe_path, b"").unwrap();
        let original = env::var("TICKETPILOT_CHROME").ok();
        env::set_var("TICKETPILOT_CHROME", exe_path.to_string_lossy().to_string());
        let detected = detect_chrome_executable();
        match original {
            Some(value) => env::set_var("TICKETPILOT_CHROME", value),
            None => env::remove_var("TICKETPILOT_CHROME"),
        }
        assert_eq!(detected, Some(exe_path));
    }

    #[test]
    #[serial]
    fn detects_from_path_entries() {
        let dir = tempdir().unwrap();
        let name = chrome_executable_names()
            .first()
            .expect("chrome executable names must not be empty");
        let exe_path = dir.path().join(name);
        fs::write(&exe_path, b"").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&exe_path, fs::Permissions::from_mode(0o755)).unwrap();
        }
        let original_path = env::var("PATH").ok();
        let original_env = env::var("TICKETPILOT_CHROME").ok();
        env::set_var("TICKETPILOT_CHROME", "");
        env::set_var("TICKETPILOT_SKIP_OS_PATHS", "1");
        env::set_var("PATH", dir.path());
        let detected = detect_chrome_executable();
        if let Some(value) = original_path {
            env::set_var("PATH", value);
        }
        match original_env {
            Some(value) => env::set_var("TICKETPILOT_CHROME", value),
            None => env::remove_var("TICKETPILOT_CHROME"),
        }
        env::remove_var("TICKETPILOT_SKIP_OS_PATHS");
        assert_eq!(detected, Some(exe_path));
    }

    #[test]
    fn launch_args_hide_automation_flag() {
        let cfg = CdpConfig {
            headless: true,
            ..CdpConfig::default()
        };
        let args = cfg.launch_args();
        assert!(args.contains(&"--disable-blink-features=AutomationControlled".to_string()));
        assert!(args.contains(&"--window-size=1280,800".to_string()));
        assert!(args.contains(&"--headless=new".to_string()));
    }
}
