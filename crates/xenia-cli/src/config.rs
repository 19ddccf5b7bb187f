use std::time::Duration;

use serde::Deserialize;
use xenia_core::{
    ClassSelector, Fragment, XeniaResult, BADGE_CLASS, BADGE_TEXT, DEFAULT_POLL_INTERVAL_MS,
    WATERMARK_CLASS,
};
use xenia_inject::InjectorConfig;

#[derive(Deserialize, Default)]
pub struct XeniaConfig {
    #[serde(default)]
    pub badge: BadgeConfig,
    #[serde(default)]
    pub poll: PollConfig,
}

#[derive(Deserialize)]
pub struct BadgeConfig {
    #[serde(default = "default_target_class")]
    pub target_class: String,
    #[serde(default = "default_marker_class")]
    pub marker_class: String,
    #[serde(default = "default_badge_tag")]
    pub tag: String,
    #[serde(default = "default_badge_text")]
    pub text: String,
}

#[derive(Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    pub max_attempts: Option<u64>,
}

fn default_target_class() -> String {
    WATERMARK_CLASS.to_string()
}
fn default_marker_class() -> String {
    BADGE_CLASS.to_string()
}
fn default_badge_tag() -> String {
    "span".to_string()
}
fn default_badge_text() -> String {
    BADGE_TEXT.to_string()
}
fn default_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Default for BadgeConfig {
    fn default() -> Self {
        Self {
            target_class: default_target_class(),
            marker_class: default_marker_class(),
            tag: default_badge_tag(),
            text: default_badge_text(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_attempts: None,
        }
    }
}

impl XeniaConfig {
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn load(path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn target(&self) -> XeniaResult<ClassSelector> {
        ClassSelector::parse(&self.badge.target_class)
    }

    pub fn marker(&self) -> XeniaResult<ClassSelector> {
        ClassSelector::parse(&self.badge.marker_class)
    }

    pub fn fragment(&self) -> Fragment {
        Fragment::new(&self.badge.tag, &self.badge.marker_class, &self.badge.text)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.poll.interval_ms)
    }

    pub fn injector_config(&self) -> XeniaResult<InjectorConfig> {
        Ok(InjectorConfig {
            interval: self.interval(),
            target: self.target()?,
            marker: self.marker()?,
            fragment: self.fragment(),
            max_attempts: self.poll.max_attempts,
        })
    }
}
