//! Run configuration.
//!
//! A [`FlowConfig`] is assembled once per invocation (defaults, YAML file,
//! environment, CLI flags) and then frozen behind an `Arc` for the run.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use cdp_adapter::{CdpConfig, ViewportSize};
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::flows::FlowKind;

pub const DEFAULT_BASE_URL: &str = "https://eplus.jp";

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FlowConfig {
    pub credentials: Credentials,
    pub target: TargetConfig,
    pub selection: SelectionConfig,
    pub methods: MethodConfig,
    pub timing: TimingConfig,
    pub browser: BrowserSettings,
    pub recording: RecordingConfig,
}

#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn is_complete(&self) -> bool {
        !self.email.trim().is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &ticketpilot_core_types::redact::email(&self.email))
            .field("password", &mask(&self.password))
            .finish()
    }
}

fn mask(secret: &str) -> &'static str {
    if secret.is_empty() {
        ""
    } else {
        "********"
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TargetConfig {
    pub base_url: String,
    /// e.g. `0424600001-P0030270`
    pub event_id: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            event_id: String::new(),
        }
    }
}

impl TargetConfig {
    pub fn event_url(&self) -> String {
        format!(
            "{}/sf/detail/{}",
            self.base_url.trim_end_matches('/'),
            self.event_id
        )
    }

    pub fn top_url(&self) -> String {
        format!("{}/", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SelectionConfig {
    pub performance_keyword: Option<String>,
    pub seat_type_keyword: Option<String>,
    pub ticket_count: u32,
    pub performance_index: usize,
    pub seat_type_index: usize,
    pub skip_leading_placeholder: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            performance_keyword: None,
            seat_type_keyword: None,
            ticket_count: 1,
            performance_index: 0,
            seat_type_index: 0,
            skip_leading_placeholder: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MethodConfig {
    pub payment_method: String,
    pub delivery_method: String,
}

impl Default for MethodConfig {
    fn default() -> Self {
        Self {
            payment_method: "クレジットカード".to_string(),
            delivery_method: "スマチケ".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimingConfig {
    pub poll_interval_ms: u64,
    pub max_poll_ms: u64,
    pub progress_every_ms: u64,
    pub selector_timeout_ms: u64,
    pub strategy_timeout_ms: u64,
    pub operator_pause_ms: u64,
    pub settle_ms: u64,
    pub page_ready_ms: u64,
    pub keep_open_minutes: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
            max_poll_ms: 3_600_000,
            progress_every_ms: 60_000,
            selector_timeout_ms: 2_000,
            strategy_timeout_ms: 3_000,
            operator_pause_ms: 30_000,
            settle_ms: 500,
            page_ready_ms: 10_000,
            keep_open_minutes: 0,
        }
    }
}

impl TimingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_poll(&self) -> Duration {
        Duration::from_millis(self.max_poll_ms)
    }

    pub fn progress_every(&self) -> Duration {
        Duration::from_millis(self.progress_every_ms)
    }

    pub fn selector_timeout(&self) -> Duration {
        Duration::from_millis(self.selector_timeout_ms)
    }

    pub fn page_ready(&self) -> Duration {
        Duration::from_millis(self.page_ready_ms)
    }

    pub fn operator_pause(&self) -> Duration {
        Duration::from_millis(self.operator_pause_ms)
    }

    pub fn keep_open(&self) -> Duration {
        Duration::from_secs(self.keep_open_minutes * 60)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    pub executable: Option<PathBuf>,
    pub user_data_dir: Option<PathBuf>,
    pub viewport: ViewportSize,
    pub user_agent: String,
    pub operation_timeout_ms: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: false,
            executable: None,
            user_data_dir: None,
            viewport: ViewportSize::default(),
            user_agent: cdp_adapter::config::DEFAULT_USER_AGENT.to_string(),
            operation_timeout_ms: 30_000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RecordingConfig {
    pub screenshot_dir: PathBuf,
    pub mask_personal_info: bool,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            screenshot_dir: PathBuf::from("screenshots"),
            mask_personal_info: true,
        }
    }
}

impl FlowConfig {
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Applies `TICKETPILOT_*` / `EPLUS_*` variables from the process.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`, which maps a variable name to its
    /// value. Blank values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(v) = get("EPLUS_EMAIL") {
            self.credentials.email = v.trim().to_string();
        }
        if let Some(v) = get("EPLUS_PASSWORD") {
            self.credentials.password = v;
        }
        if let Some(v) = get("TICKETPILOT_BASE_URL") {
            self.target.base_url = v.trim().to_string();
        }
        if let Some(v) = get("TICKETPILOT_EVENT_ID") {
            self.target.event_id = v.trim().to_string();
        }
        if let Some(v) = get("TICKETPILOT_PERFORMANCE_KEYWORD") {
            self.selection.performance_keyword = Some(v);
        }
        if let Some(v) = get("TICKETPILOT_SEAT_TYPE_KEYWORD") {
            self.selection.seat_type_keyword = Some(v);
        }
        if let Some(v) = get("TICKETPILOT_TICKET_COUNT") {
            self.selection.ticket_count = parse("TICKETPILOT_TICKET_COUNT", &v)?;
        }
        if let Some(v) = get("TICKETPILOT_PERFORMANCE_INDEX") {
            self.selection.performance_index = parse("TICKETPILOT_PERFORMANCE_INDEX", &v)?;
        }
        if let Some(v) = get("TICKETPILOT_SEAT_TYPE_INDEX") {
            self.selection.seat_type_index = parse("TICKETPILOT_SEAT_TYPE_INDEX", &v)?;
        }
        if let Some(v) = get("TICKETPILOT_PAYMENT_METHOD") {
            self.methods.payment_method = v;
        }
        if let Some(v) = get("TICKETPILOT_DELIVERY_METHOD") {
            self.methods.delivery_method = v;
        }
        if let Some(v) = get("TICKETPILOT_POLL_INTERVAL_MS") {
            self.timing.poll_interval_ms = parse("TICKETPILOT_POLL_INTERVAL_MS", &v)?;
        }
        if let Some(v) = get("TICKETPILOT_MAX_POLL_MS") {
            self.timing.max_poll_ms = parse("TICKETPILOT_MAX_POLL_MS", &v)?;
        }
        if let Some(v) = get("TICKETPILOT_KEEP_OPEN_MINUTES") {
            self.timing.keep_open_minutes = parse("TICKETPILOT_KEEP_OPEN_MINUTES", &v)?;
        }
        if let Some(v) = get("TICKETPILOT_HEADLESS") {
            self.browser.headless = parse_bool("TICKETPILOT_HEADLESS", &v)?;
        }
        if let Some(v) = get("TICKETPILOT_CHROME") {
            self.browser.executable = Some(PathBuf::from(v.trim()));
        }
        if let Some(v) = get("TICKETPILOT_SCREENSHOT_DIR") {
            self.recording.screenshot_dir = PathBuf::from(v.trim());
        }
        if let Some(v) = get("TICKETPILOT_MASK_PERSONAL_INFO") {
            self.recording.mask_personal_info = parse_bool("TICKETPILOT_MASK_PERSONAL_INFO", &v)?;
        }
        Ok(())
    }

    /// Checks that hold for every command.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let timing = &self.timing;
        if timing.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("timing.poll_interval_ms must be > 0".into()));
        }
        if timing.poll_interval_ms > timing.max_poll_ms {
            return Err(ConfigError::Invalid(format!(
                "timing.poll_interval_ms ({}) exceeds timing.max_poll_ms ({})",
                timing.poll_interval_ms, timing.max_poll_ms
            )));
        }
        if self.selection.ticket_count == 0 {
            return Err(ConfigError::Invalid("selection.ticket_count must be >= 1".into()));
        }
        if url::Url::parse(&self.target.base_url).is_err() {
            return Err(ConfigError::Invalid(format!(
                "target.base_url is not a URL: {:?}",
                self.target.base_url
            )));
        }
        Ok(())
    }

    /// [`validate`](Self::validate) plus what `kind` needs to run.
    pub fn validate_for(&self, kind: FlowKind) -> Result<(), ConfigError> {
        self.validate()?;
        if kind.needs_event_id() && self.target.event_id.trim().is_empty() {
            return Err(ConfigError::Missing("target.event_id"));
        }
        if kind.authenticates() && !self.credentials.is_complete() {
            return Err(ConfigError::Missing("credentials (EPLUS_EMAIL / EPLUS_PASSWORD)"));
        }
        Ok(())
    }

    /// Copy safe to print.
    pub fn masked(&self) -> Self {
        let mut copy = self.clone();
        copy.credentials.email = ticketpilot_core_types::redact::email(&self.credentials.email);
        copy.credentials.password = mask(&self.credentials.password).to_string();
        copy
    }

    pub fn cdp_config(&self) -> CdpConfig {
        let mut cfg = CdpConfig::default();
        if let Some(executable) = &self.browser.executable {
            cfg.executable = executable.clone();
        }
        cfg.user_data_dir = self.browser.user_data_dir.clone();
        cfg.headless = self.browser.headless;
        cfg.default_deadline_ms = self.browser.operation_timeout_ms;
        cfg.viewport = self.browser.viewport;
        cfg.user_agent = Some(self.browser.user_agent.clone()).filter(|ua| !ua.is_empty());
        cfg.mask_personal_info = self.recording.mask_personal_info;
        cfg
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_site_tooling() {
        let cfg = FlowConfig::default();
        assert_eq!(cfg.target.base_url, "https://eplus.jp");
        assert_eq!(cfg.selection.ticket_count, 1);
        assert_eq!(cfg.methods.payment_method, "クレジットカード");
        assert_eq!(cfg.timing.poll_interval(), Duration::from_secs(2));
        assert_eq!(cfg.timing.max_poll(), Duration::from_secs(3600));
        assert!(cfg.recording.mask_personal_info);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn yaml_fills_missing_fields_with_defaults() {
        let cfg = FlowConfig::from_yaml(
            "target:\n  event_id: 0424600001-P0030270\nselection:\n  ticket_count: 2\n",
        )
        .unwrap();
        assert_eq!(cfg.target.event_id, "0424600001-P0030270");
        assert_eq!(cfg.target.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.selection.ticket_count, 2);
        assert!(cfg.selection.skip_leading_placeholder);
        assert_eq!(FlowConfig::from_yaml("  \n").unwrap(), FlowConfig::default());
    }

    #[test]
    fn env_overrides_win_over_file_values() {
        let mut cfg = FlowConfig::default();
        cfg.apply_overrides_from(lookup(&[
            ("EPLUS_EMAIL", " taro@example.com "),
            ("EPLUS_PASSWORD", "secret"),
            ("TICKETPILOT_EVENT_ID", "EV1"),
            ("TICKETPILOT_TICKET_COUNT", "4"),
            ("TICKETPILOT_HEADLESS", "yes"),
            ("TICKETPILOT_SEAT_TYPE_KEYWORD", "S席"),
            ("TICKETPILOT_PERFORMANCE_KEYWORD", "  "),
        ]))
        .unwrap();
        assert_eq!(cfg.credentials.email, "taro@example.com");
        assert_eq!(cfg.target.event_id, "EV1");
        assert_eq!(cfg.selection.ticket_count, 4);
        assert!(cfg.browser.headless);
        assert_eq!(cfg.selection.seat_type_keyword.as_deref(), Some("S席"));
        assert_eq!(cfg.selection.performance_keyword, None);
    }

    #[test]
    fn bad_env_values_are_reported() {
        let mut cfg = FlowConfig::default();
        let err = cfg
            .apply_overrides_from(lookup(&[("TICKETPILOT_TICKET_COUNT", "two")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { ref key, .. } if key == "TICKETPILOT_TICKET_COUNT"));
    }

    #[test]
    fn validation_rules() {
        let mut cfg = FlowConfig::default();
        cfg.timing.poll_interval_ms = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = FlowConfig::default();
        cfg.timing.poll_interval_ms = 10_000;
        cfg.timing.max_poll_ms = 5_000;
        assert!(cfg.validate().is_err());

        let mut cfg = FlowConfig::default();
        cfg.selection.ticket_count = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn per_flow_requirements() {
        let mut cfg = FlowConfig::default();
        assert!(matches!(
            cfg.validate_for(FlowKind::FirstCome),
            Err(ConfigError::Missing("target.event_id"))
        ));
        cfg.target.event_id = "EV1".into();
        assert!(matches!(
            cfg.validate_for(FlowKind::FirstCome),
            Err(ConfigError::Missing(_))
        ));
        cfg.credentials.email = "a@b.jp".into();
        cfg.credentials.password = "pw".into();
        assert!(cfg.validate_for(FlowKind::FirstCome).is_ok());

        let anonymous = FlowConfig::default();
        assert!(anonymous.validate_for(FlowKind::Lottery).is_ok());
        assert!(anonymous.validate_for(FlowKind::Login).is_err());
    }

    #[test]
    fn secrets_never_print() {
        let mut cfg = FlowConfig::default();
        cfg.credentials.email = "taro@example.com".into();
        cfg.credentials.password = "hunter2".into();

        let debug = format!("{:?}", cfg);
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("taro@"));

        let shown = serde_yaml::to_string(&cfg.masked()).unwrap();
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("t***@example.com"));
    }

    #[test]
    fn browser_settings_map_to_cdp_config() {
        let mut cfg = FlowConfig::default();
        cfg.browser.headless = true;
        cfg.browser.executable = Some(PathBuf::from("/opt/chrome"));
        cfg.recording.mask_personal_info = false;
        let cdp = cfg.cdp_config();
        assert!(cdp.headless);
        assert_eq!(cdp.executable, PathBuf::from("/opt/chrome"));
        assert!(!cdp.mask_personal_info);
        assert_eq!(cdp.default_deadline_ms, 30_000);
    }
}
