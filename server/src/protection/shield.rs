use dashmap::DashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{DenyReason, Mode, RequestContext, Rule};

/// Suspicious requests a client may send within [`SHIELD_WINDOW`] before it
/// is blocked.
pub const SUSPICIOUS_THRESHOLD: usize = 5;
pub const SHIELD_WINDOW: Duration = Duration::from_secs(15 * 60);

// Lowercase fragments of common injection and probing payloads.
const ATTACK_SIGNATURES: &[&str] = &[
    "union select",
    "union all select",
    "' or '1'='1",
    "' or 1=1",
    "\" or 1=1",
    "or 1=1--",
    "; drop table",
    "information_schema",
    "sleep(",
    "benchmark(",
    "<script",
    "javascript:",
    "onerror=",
    "onload=",
    "../",
    "..\\",
    "/etc/passwd",
    "/proc/self/",
    "win.ini",
    "\0",
    "$(",
    ";cat ",
    "|cat ",
    "${jndi:",
    "/.env",
    "/.git/",
    "/wp-login.php",
];

/// Scores clients on attack signatures and blocks repeat offenders for the
/// rest of the window.
#[derive(Clone)]
pub struct Shield {
    hits: Arc<DashMap<IpAddr, Vec<Instant>>>,
    threshold: usize,
    window: Duration,
    mode: Mode,
}

impl Shield {
    pub fn new(mode: Mode) -> Self {
        Self::with_limits(SUSPICIOUS_THRESHOLD, SHIELD_WINDOW, mode)
    }

    pub fn with_limits(threshold: usize, window: Duration, mode: Mode) -> Self {
        Self {
            hits: Arc::new(DashMap::new()),
            threshold,
            window,
            mode,
        }
    }

    pub fn is_suspicious(request: &RequestContext) -> bool {
        let target = if request.query.is_empty() {
            request.path.clone()
        } else {
            format!("{}?{}", request.path, request.query)
        };

        let decoded = percent_decode(&target).to_lowercase();
        let user_agent = request
            .user_agent
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_default();

        ATTACK_SIGNATURES
            .iter()
            .any(|signature| decoded.contains(signature) || user_agent.contains(signature))
    }

    fn record(&self, ip: IpAddr, suspicious: bool, now: Instant) -> usize {
        let cutoff = now.checked_sub(self.window);

        let mut entry = self.hits.entry(ip).or_default();
        if let Some(cutoff) = cutoff {
            entry.retain(|&timestamp| timestamp > cutoff);
        }
        if suspicious {
            entry.push(now);
        }
        entry.len()
    }
}

impl Rule for Shield {
    fn name(&self) -> &'static str {
        "shield"
    }

    fn mode(&self) -> Mode {
        self.mode
    }

    fn evaluate(&self, request: &RequestContext) -> Option<DenyReason> {
        let suspicious = Self::is_suspicious(request);
        if !suspicious && !self.hits.contains_key(&request.ip) {
            return None;
        }

        let score = self.record(request.ip, suspicious, Instant::now());
        if suspicious {
            log::debug!(
                "Suspicious request from {} ({}/{}): {} {}",
                request.ip,
                score,
                self.threshold,
                request.method,
                request.path
            );
        }

        (score >= self.threshold).then_some(DenyReason::Shield)
    }

    fn cleanup(&self) {
        let Some(cutoff) = Instant::now().checked_sub(self.window) else {
            return;
        };

        self.hits.retain(|_, timestamps| {
            timestamps.retain(|&timestamp| timestamp > cutoff);
            !timestamps.is_empty()
        });
    }
}

/// Decodes `%XX` escapes and `+`; malformed escapes are left as-is.
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(high), Some(low)) => {
                        decoded.push(high << 4 | low);
                        i += 3;
                    }
                    _ => {
                        decoded.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                decoded.push(b' ');
                i += 1;
            }
            byte => {
                decoded.push(byte);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&decoded).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
