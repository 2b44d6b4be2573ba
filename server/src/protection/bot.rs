use super::{DenyReason, Mode, RequestContext, Rule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BotCategory {
    SearchEngine,
    Preview,
    Monitor,
    Ai,
    Tool,
    /// Missing user agent, or one that only self-identifies as a crawler.
    Unknown,
}

impl BotCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            BotCategory::SearchEngine => "CATEGORY:SEARCH_ENGINE",
            BotCategory::Preview => "CATEGORY:PREVIEW",
            BotCategory::Monitor => "CATEGORY:MONITOR",
            BotCategory::Ai => "CATEGORY:AI",
            BotCategory::Tool => "CATEGORY:TOOL",
            BotCategory::Unknown => "CATEGORY:UNKNOWN",
        }
    }
}

// Matched as lowercase substrings, most specific first.
const SIGNATURES: &[(&str, BotCategory)] = &[
    ("googlebot", BotCategory::SearchEngine),
    ("bingbot", BotCategory::SearchEngine),
    ("duckduckbot", BotCategory::SearchEngine),
    ("yandexbot", BotCategory::SearchEngine),
    ("baiduspider", BotCategory::SearchEngine),
    ("applebot", BotCategory::SearchEngine),
    ("slurp", BotCategory::SearchEngine),
    ("seznambot", BotCategory::SearchEngine),
    ("facebookexternalhit", BotCategory::Preview),
    ("twitterbot", BotCategory::Preview),
    ("slackbot", BotCategory::Preview),
    ("discordbot", BotCategory::Preview),
    ("linkedinbot", BotCategory::Preview),
    ("telegrambot", BotCategory::Preview),
    ("whatsapp", BotCategory::Preview),
    ("skypeuripreview", BotCategory::Preview),
    ("embedly", BotCategory::Preview),
    ("uptimerobot", BotCategory::Monitor),
    ("pingdom", BotCategory::Monitor),
    ("statuscake", BotCategory::Monitor),
    ("datadog", BotCategory::Monitor),
    ("site24x7", BotCategory::Monitor),
    ("gptbot", BotCategory::Ai),
    ("chatgpt-user", BotCategory::Ai),
    ("claudebot", BotCategory::Ai),
    ("anthropic-ai", BotCategory::Ai),
    ("ccbot", BotCategory::Ai),
    ("perplexitybot", BotCategory::Ai),
    ("bytespider", BotCategory::Ai),
    ("curl/", BotCategory::Tool),
    ("wget/", BotCategory::Tool),
    ("python-requests", BotCategory::Tool),
    ("python-urllib", BotCategory::Tool),
    ("aiohttp", BotCategory::Tool),
    ("httpx", BotCategory::Tool),
    ("go-http-client", BotCategory::Tool),
    ("java/", BotCategory::Tool),
    ("okhttp", BotCategory::Tool),
    ("libwww-perl", BotCategory::Tool),
    ("axios/", BotCategory::Tool),
    ("node-fetch", BotCategory::Tool),
    ("postmanruntime", BotCategory::Tool),
    ("insomnia", BotCategory::Tool),
    ("httpie", BotCategory::Tool),
    ("scrapy", BotCategory::Tool),
    ("headlesschrome", BotCategory::Tool),
    ("phantomjs", BotCategory::Tool),
];

// Self-identifying crawlers. Only counted when the word closes a product
// token, so device names such as "CUBOT_X30" or "CUBOT KINGKONG" pass.
const GENERIC_MARKERS: &[&str] = &["bot", "crawler", "spider", "scraper"];
const TOKEN_TERMINATORS: &[char] = &['/', ';', ')', '+', ','];

fn closes_token(user_agent: &str, marker: &str) -> bool {
    user_agent.match_indices(marker).any(|(start, _)| {
        match user_agent[start + marker.len()..].chars().next() {
            None => true,
            Some(next) => TOKEN_TERMINATORS.contains(&next),
        }
    })
}

/// `None` when the user agent looks like a regular browser.
pub fn classify_user_agent(user_agent: Option<&str>) -> Option<BotCategory> {
    let user_agent = match user_agent.map(str::trim) {
        Some(ua) if !ua.is_empty() => ua.to_ascii_lowercase(),
        _ => return Some(BotCategory::Unknown),
    };

    SIGNATURES
        .iter()
        .find(|(needle, _)| user_agent.contains(needle))
        .map(|&(_, category)| category)
        .or_else(|| {
            GENERIC_MARKERS
                .iter()
                .any(|marker| closes_token(&user_agent, marker))
                .then_some(BotCategory::Unknown)
        })
}

/// Denies automated clients whose category is not allow-listed.
pub struct BotDetection {
    allow: Vec<BotCategory>,
    mode: Mode,
}

impl BotDetection {
    pub fn new(allow: Vec<BotCategory>, mode: Mode) -> Self {
        Self { allow, mode }
    }
}

impl Rule for BotDetection {
    fn name(&self) -> &'static str {
        "detect_bot"
    }

    fn mode(&self) -> Mode {
        self.mode
    }

    fn evaluate(&self, request: &RequestContext) -> Option<DenyReason> {
        let category = classify_user_agent(request.user_agent.as_deref())?;
        if self.allow.contains(&category) {
            log::debug!("Allowing {} from {}", category.as_str(), request.ip);
            None
        } else {
            Some(DenyReason::Bot(category))
        }
    }
}
