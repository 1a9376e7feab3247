//! Engine configuration

use std::time::Duration;

use nwkrust_core::constants::{
    DEFAULT_LEVEL_TOLERANCE, DEFAULT_LOGIN_PROMPT, DEFAULT_LOGIN_SUCCESS, DEFAULT_READY_PROMPTS,
    DEFAULT_SHADE_PULSE_MS, DEFAULT_USERNAME, DISPATCH_INTERVAL_MS, EVENT_CHANNEL_CAPACITY,
    RECEIVE_POLL_MS,
};
use nwkrust_core::FrameTokens;

/// Settings for one processor connection
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use nwkrust::Config;
///
/// let config = Config::default()
///     .with_username("lutron")
///     .with_level_tolerance(0.01)
///     .with_shade_pulse(Duration::from_millis(750));
/// assert_eq!(config.username, "lutron");
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Sent in reply to the login prompt
    pub username: String,
    /// Login prompt, matched ignoring case
    pub login_prompt: String,
    /// Prompts that mark the link ready
    pub ready_prompts: Vec<String>,
    /// Optional explicit login acknowledgement
    pub login_success: Option<String>,
    /// Command queue drain period
    pub dispatch_interval: Duration,
    /// Minimum level delta that counts as a change
    pub level_tolerance: f64,
    pub default_fade: Duration,
    pub default_delay: Duration,
    /// Hold time for button-driven shades
    pub shade_pulse: Duration,
    /// Receive window of the link driver
    pub receive_poll: Duration,
    pub event_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: DEFAULT_USERNAME.to_string(),
            login_prompt: DEFAULT_LOGIN_PROMPT.to_string(),
            ready_prompts: DEFAULT_READY_PROMPTS.iter().map(|p| p.to_string()).collect(),
            login_success: Some(DEFAULT_LOGIN_SUCCESS.to_string()),
            dispatch_interval: Duration::from_millis(DISPATCH_INTERVAL_MS),
            level_tolerance: DEFAULT_LEVEL_TOLERANCE,
            default_fade: Duration::ZERO,
            default_delay: Duration::ZERO,
            shade_pulse: Duration::from_millis(DEFAULT_SHADE_PULSE_MS),
            receive_poll: Duration::from_millis(RECEIVE_POLL_MS),
            event_capacity: EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl Config {
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn with_login_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.login_prompt = prompt.into();
        self
    }

    /// Replace the ready prompts
    pub fn with_ready_prompts<I, S>(mut self, prompts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ready_prompts = prompts.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_login_success(mut self, token: Option<String>) -> Self {
        self.login_success = token;
        self
    }

    pub fn with_dispatch_interval(mut self, interval: Duration) -> Self {
        self.dispatch_interval = interval;
        self
    }

    pub fn with_level_tolerance(mut self, tolerance: f64) -> Self {
        self.level_tolerance = tolerance;
        self
    }

    pub fn with_default_fade(mut self, fade: Duration) -> Self {
        self.default_fade = fade;
        self
    }

    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn with_shade_pulse(mut self, pulse: Duration) -> Self {
        self.shade_pulse = pulse;
        self
    }

    pub fn with_receive_poll(mut self, poll: Duration) -> Self {
        self.receive_poll = poll;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Framing tokens for these prompts
    pub fn frame_tokens(&self) -> FrameTokens {
        FrameTokens::new(&self.ready_prompts, &self.login_prompt)
    }

    /// Does a framed line mark the link ready?
    pub(crate) fn is_ready_line(&self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return false;
        }
        if self.ready_prompts.iter().any(|p| p.trim() == trimmed) {
            return true;
        }
        self.login_success
            .as_deref()
            .is_some_and(|token| contains_ignore_case(line, token))
    }

    /// Does a framed line carry the login prompt?
    pub(crate) fn is_login_line(&self, line: &str) -> bool {
        let prompt = self.login_prompt.trim();
        !prompt.is_empty() && contains_ignore_case(line, prompt)
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_ascii_lowercase().contains(&needle.to_ascii_lowercase())
}
