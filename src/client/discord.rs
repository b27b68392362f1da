// Discord REST client: finds the tracked post, lists its reactors, posts summaries.
use crate::client::http::{build_client, ensure_success, join_segments};
use crate::client::{MessageSource, SummaryPublisher};
use crate::config::Config;
use crate::model::ReactionSet;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use chrono_tz::Tz;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Discord rejects messages longer than this.
pub const MAX_MESSAGE_CHARS: usize = 2000;
/// Largest page the messages and reactions endpoints return.
const PAGE_LIMIT: u32 = 100;
const RATE_LIMIT_RETRIES: usize = 3;
/// Upper bound on a single rate-limit wait.
const MAX_RETRY_WAIT_SECS: f64 = 30.0;

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Embed {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Emoji {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Reaction {
    pub emoji: Emoji,
    #[serde(default)]
    pub count: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub content: String,
    pub author: User,
    pub timestamp: DateTime<FixedOffset>,
    #[serde(default)]
    pub embeds: Vec<Embed>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

#[derive(Debug, Deserialize)]
struct RateLimited {
    retry_after: f64,
}

impl Message {
    /// Whether `needle` (already lowercased) appears in the content or an embed.
    fn mentions(&self, needle: &str) -> bool {
        if self.content.to_lowercase().contains(needle) {
            return true;
        }
        self.embeds.iter().any(|embed| {
            [&embed.title, &embed.description]
                .into_iter()
                .flatten()
                .any(|text| text.to_lowercase().contains(needle))
        })
    }

    /// Calendar day the message was posted on, as seen in `tz`.
    pub fn date_in(&self, tz: Tz) -> NaiveDate {
        self.timestamp.with_timezone(&tz).date_naive()
    }

    fn has_reaction(&self, emoji: &str) -> bool {
        self.reactions.iter().any(|r| {
            r.emoji.name.as_deref() == Some(emoji) || emoji_path(&r.emoji) == emoji
        })
    }
}

/// The form the reactions endpoint expects: `name` for unicode emoji,
/// `name:id` for custom ones.
pub fn emoji_path(emoji: &Emoji) -> String {
    let name = emoji.name.clone().unwrap_or_default();
    match &emoji.id {
        Some(id) => format!("{}:{}", name, id),
        None => name,
    }
}

/// Cuts `text` to Discord's message limit, ending with an ellipsis when cut.
pub fn truncate_message(text: &str) -> String {
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(MAX_MESSAGE_CHARS - 1).collect();
    cut.push('…');
    cut
}

/// Picks the tracked post for `today` (a date in `tz`) out of a
/// newest-first message list.
pub fn find_tracked_message<'a>(
    messages: &'a [Message],
    today: NaiveDate,
    tz: Tz,
    author_id: &str,
    title_match: &str,
) -> Option<&'a Message> {
    let needle = title_match.to_lowercase();
    messages.iter().find(|m| {
        m.author.id == author_id && m.date_in(tz) == today && m.mentions(&needle)
    })
}

#[derive(Debug)]
pub struct DiscordClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
    track_channel_id: String,
    status_channel_id: String,
    require_author_id: String,
    title_match: String,
    track_emoji: String,
    lookback: u32,
    tz: Tz,
}

impl DiscordClient {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        api_base: &str,
        token: &str,
        track_channel_id: &str,
        status_channel_id: &str,
        require_author_id: &str,
        title_match: &str,
        track_emoji: &str,
        lookback: u32,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            http: build_client(timeout_secs)?,
            api_base: api_base.to_string(),
            token: token.trim().to_string(),
            track_channel_id: track_channel_id.trim().to_string(),
            status_channel_id: status_channel_id.trim().to_string(),
            require_author_id: require_author_id.trim().to_string(),
            title_match: title_match.to_string(),
            track_emoji: track_emoji.to_string(),
            lookback: lookback.max(1),
            tz: Tz::UTC,
        })
    }

    /// Zone used to decide which day a message belongs to. UTC until set.
    pub fn with_timezone(mut self, tz: Tz) -> Self {
        self.tz = tz;
        self
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::publisher_from_config(config)?.with_timezone(config.tz()?))
    }

    /// Client built from the connection settings alone. Good enough for
    /// posting to the status channel when the rest of the config is broken.
    pub fn publisher_from_config(config: &Config) -> Result<Self> {
        let d = &config.discord;
        Self::new(
            &d.api_base,
            &d.token,
            &d.track_channel_id,
            &d.status_channel_id,
            &d.require_author_id,
            &d.title_match,
            &d.track_emoji,
            d.lookback_messages,
            config.http_timeout_secs,
        )
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        join_segments(&self.api_base, segments)
    }

    /// Sends a request, waiting out 429 responses a few times.
    async fn send(&self, build: impl Fn() -> RequestBuilder, what: &str) -> Result<Response> {
        for attempt in 0..=RATE_LIMIT_RETRIES {
            let response = build()
                .header("Authorization", format!("Bot {}", self.token))
                .send()
                .await
                .with_context(|| format!("{} failed", what))?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS || attempt == RATE_LIMIT_RETRIES
            {
                return ensure_success(response, what).await;
            }

            let wait = response
                .json::<RateLimited>()
                .await
                .map(|r| r.retry_after)
                .unwrap_or(1.0)
                .clamp(0.0, MAX_RETRY_WAIT_SECS);
            log::warn!("{} rate limited; retrying in {:.1}s", what, wait);
            tokio::time::sleep(Duration::from_secs_f64(wait)).await;
        }
        bail!("{} kept hitting the rate limit", what)
    }

    /// The last `lookback` messages in the tracked channel, newest first.
    /// Pages backwards with `before` when more than one page is wanted.
    pub async fn recent_messages(&self) -> Result<Vec<Message>> {
        let url = self.url(&["channels", self.track_channel_id.as_str(), "messages"])?;
        let wanted = self.lookback as usize;

        let mut messages: Vec<Message> = Vec::new();
        while messages.len() < wanted {
            let limit = (wanted - messages.len()).min(PAGE_LIMIT as usize);
            let mut query = vec![("limit", limit.to_string())];
            if let Some(oldest) = messages.last() {
                query.push(("before", oldest.id.clone()));
            }
            let response = self
                .send(|| self.http.get(url.clone()).query(&query), "Message lookup")
                .await?;
            let page: Vec<Message> = response
                .json()
                .await
                .context("Message list was not valid JSON")?;

            let exhausted = page.len() < limit;
            messages.extend(page);
            if exhausted {
                break;
            }
        }
        Ok(messages)
    }

    /// Everyone who reacted with `emoji` to `message_id`, bots excluded.
    pub async fn reactors(&self, message_id: &str, emoji: &str) -> Result<ReactionSet> {
        let url = self.url(&[
            "channels",
            self.track_channel_id.as_str(),
            "messages",
            message_id,
            "reactions",
            emoji,
        ])?;

        let mut reactors = ReactionSet::new();
        let mut after: Option<String> = None;
        loop {
            let mut query = vec![("limit", PAGE_LIMIT.to_string())];
            if let Some(after) = &after {
                query.push(("after", after.clone()));
            }
            let response = self
                .send(|| self.http.get(url.clone()).query(&query), "Reaction lookup")
                .await?;
            let page: Vec<User> = response
                .json()
                .await
                .context("Reaction list was not valid JSON")?;

            let full_page = page.len() == PAGE_LIMIT as usize;
            after = page.last().map(|u| u.id.clone());
            reactors.extend(page.into_iter().filter(|u| !u.bot).map(|u| u.id));

            if !full_page || after.is_none() {
                break;
            }
        }
        Ok(reactors)
    }
}

#[async_trait]
impl MessageSource for DiscordClient {
    async fn todays_reactors(&self, today: NaiveDate) -> Result<Option<ReactionSet>> {
        let messages = self.recent_messages().await?;
        log::debug!(
            "Scanned {} messages in channel {}",
            messages.len(),
            self.track_channel_id
        );

        let Some(message) = find_tracked_message(
            &messages,
            today,
            self.tz,
            &self.require_author_id,
            &self.title_match,
        ) else {
            log::warn!("No tracked post for {} among the last {} messages", today, messages.len());
            return Ok(None);
        };
        log::info!("Tracked post for {} is message {}", today, message.id);

        if !message.has_reaction(&self.track_emoji) {
            log::info!("Tracked post has no {} reactions yet", self.track_emoji);
            return Ok(Some(ReactionSet::new()));
        }

        let emoji = message
            .reactions
            .iter()
            .find(|r| r.emoji.name.as_deref() == Some(self.track_emoji.as_str()))
            .map(|r| emoji_path(&r.emoji))
            .unwrap_or_else(|| self.track_emoji.clone());
        self.reactors(&message.id, &emoji).await.map(Some)
    }
}

#[async_trait]
impl SummaryPublisher for DiscordClient {
    async fn publish(&self, text: &str) -> Result<()> {
        let url = self.url(&["channels", self.status_channel_id.as_str(), "messages"])?;
        let body = json!({
            "content": truncate_message(text),
            "allowed_mentions": { "parse": [] },
        });
        self.send(|| self.http.post(url.clone()).json(&body), "Summary post")
            .await?;
        Ok(())
    }
}
