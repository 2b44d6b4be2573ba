//! Per-request protection rules.
//!
//! A [`ProtectionPolicy`] runs an ordered list of [`Rule`]s against every
//! incoming request: shield, then bot detection, then the sliding-window
//! rate limit. The first rule in `LIVE` mode that objects decides the
//! request. Rules in `DRY_RUN` mode are evaluated and logged, but never
//! block.

mod bot;
mod shield;
mod sliding_window;

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Environment;

pub use bot::{classify_user_agent, BotCategory, BotDetection};
pub use shield::Shield;
pub use sliding_window::SlidingWindow;

/// Requests allowed per client within [`RATE_LIMIT_INTERVAL`].
pub const RATE_LIMIT_MAX: usize = 5;
pub const RATE_LIMIT_INTERVAL: Duration = Duration::from_secs(2);

/// Bot categories let through unless configured otherwise.
pub const DEFAULT_ALLOWED_BOTS: [BotCategory; 2] = [BotCategory::SearchEngine, BotCategory::Preview];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Log what would have been denied, allow everything.
    DryRun,
    /// Enforce denials.
    Live,
}

impl Mode {
    pub fn for_environment(environment: Environment) -> Self {
        if environment.is_development() {
            Mode::DryRun
        } else {
            Mode::Live
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::DryRun => "DRY_RUN",
            Mode::Live => "LIVE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Shield,
    Bot(BotCategory),
    RateLimit,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::Shield => f.write_str("shield"),
            DenyReason::Bot(category) => write!(f, "bot ({})", category.as_str()),
            DenyReason::RateLimit => f.write_str("rate limit"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_denied(&self) -> bool {
        matches!(self, Decision::Deny(_))
    }
}

/// The parts of a request the rules look at.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub ip: IpAddr,
    pub method: String,
    pub path: String,
    pub query: String,
    pub user_agent: Option<String>,
}

pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;

    fn mode(&self) -> Mode;

    /// `Some` when the rule objects to the request.
    fn evaluate(&self, request: &RequestContext) -> Option<DenyReason>;

    /// Drops per-client state that can no longer affect a decision.
    fn cleanup(&self) {}
}

#[derive(Clone)]
pub struct ProtectionConfig {
    pub key: Option<String>,
    pub mode: Mode,
    pub allowed_bots: Vec<BotCategory>,
    pub rate_limit_max: usize,
    pub rate_limit_interval: Duration,
}

impl ProtectionConfig {
    pub fn from_lookup<F>(lookup: F, environment: Environment) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = lookup("ARCJET_KEY").filter(|key| !key.is_empty());
        if key.is_none() {
            log::warn!("ARCJET_KEY is not set; protection rules run without a site key");
        }

        Self {
            key,
            mode: Mode::for_environment(environment),
            allowed_bots: DEFAULT_ALLOWED_BOTS.to_vec(),
            rate_limit_max: RATE_LIMIT_MAX,
            rate_limit_interval: RATE_LIMIT_INTERVAL,
        }
    }

    /// Short identifier for logs; never the full key.
    pub fn site(&self) -> String {
        match &self.key {
            Some(key) => {
                let visible: String = key.chars().take(6).collect();
                format!("{visible}****")
            }
            None => "local".to_string(),
        }
    }
}

impl fmt::Debug for ProtectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtectionConfig")
            .field("site", &self.site())
            .field("mode", &self.mode)
            .field("allowed_bots", &self.allowed_bots)
            .field("rate_limit_max", &self.rate_limit_max)
            .field("rate_limit_interval", &self.rate_limit_interval)
            .finish()
    }
}

#[derive(Clone)]
pub struct ProtectionPolicy {
    site: String,
    rules: Arc<Vec<Box<dyn Rule>>>,
}

impl ProtectionPolicy {
    /// Shield, bot detection and sliding window, all in the configured mode.
    pub fn new(config: &ProtectionConfig) -> Self {
        let rules: Vec<Box<dyn Rule>> = vec![
            Box::new(Shield::new(config.mode)),
            Box::new(BotDetection::new(config.allowed_bots.clone(), config.mode)),
            Box::new(SlidingWindow::new(
                config.rate_limit_max,
                config.rate_limit_interval,
                config.mode,
            )),
        ];

        log::info!(
            "Protection policy for site {} running in {} mode ({} requests per {:?})",
            config.site(),
            config.mode.as_str(),
            config.rate_limit_max,
            config.rate_limit_interval
        );

        Self::with_rules(config.site(), rules)
    }

    pub fn with_rules(site: impl Into<String>, rules: Vec<Box<dyn Rule>>) -> Self {
        Self {
            site: site.into(),
            rules: Arc::new(rules),
        }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    pub fn protect(&self, request: &RequestContext) -> Decision {
        for rule in self.rules.iter() {
            let Some(reason) = rule.evaluate(request) else {
                continue;
            };

            match rule.mode() {
                Mode::Live => {
                    log::warn!(
                        "[{}] {} denied {} {} from {}: {}",
                        self.site,
                        rule.name(),
                        request.method,
                        request.path,
                        request.ip,
                        reason
                    );
                    return Decision::Deny(reason);
                }
                Mode::DryRun => {
                    log::info!(
                        "[{}] DRY_RUN {} would deny {} {} from {}: {}",
                        self.site,
                        rule.name(),
                        request.method,
                        request.path,
                        request.ip,
                        reason
                    );
                }
            }
        }

        Decision::Allow
    }

    pub fn cleanup(&self) {
        for rule in self.rules.iter() {
            rule.cleanup();
        }
    }
}
