//! Navigation trace used to decide, after login, whether to resume the last
//! page or start from the home division.

use std::{fmt, sync::Arc};

use time::{Duration, OffsetDateTime};

use crate::core::{clock, division::Division, storage::ClientStorage};

pub const LAST_VISITED_URL_KEY: &str = "lastVisitedUrl";
pub const LAST_VISITED_TIME_KEY: &str = "lastVisitedTime";
pub const LOGOUT_TIME_KEY: &str = "logoutTime";
pub const LAST_VISITED_DIVISION_KEY: &str = "lastVisitedDivision";

const TRACKED_KEYS: [&str; 4] = [
    LAST_VISITED_URL_KEY,
    LAST_VISITED_TIME_KEY,
    LOGOUT_TIME_KEY,
    LAST_VISITED_DIVISION_KEY,
];

/// A session idle for less than this resumes where it left off.
pub const RESUME_WINDOW: Duration = Duration::minutes(30);

#[derive(Debug, Clone, PartialEq)]
pub enum RedirectReason {
    NoPreviousVisit,
    Resume { minutes_since_logout: f64 },
    Stale { minutes_since_logout: f64 },
}

impl fmt::Display for RedirectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedirectReason::NoPreviousVisit => write!(f, "no previous visit data"),
            RedirectReason::Resume { minutes_since_logout } => write!(
                f,
                "resuming session, {:.1} minutes since logout",
                minutes_since_logout
            ),
            RedirectReason::Stale { minutes_since_logout } => write!(
                f,
                "session stale, {:.1} minutes since logout",
                minutes_since_logout
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmartRedirect {
    pub url: String,
    pub reason: RedirectReason,
}

#[derive(Debug)]
pub struct NavigationTracker<S> {
    storage: Arc<S>,
}

impl<S> Clone for NavigationTracker<S> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
        }
    }
}

impl<S: ClientStorage> NavigationTracker<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    pub async fn track_page_visit(
        &self,
        url: &str,
        division: Option<&Division>,
    ) -> anyhow::Result<()> {
        self.track_page_visit_at(url, division, OffsetDateTime::now_utc())
            .await
    }

    pub async fn track_page_visit_at(
        &self,
        url: &str,
        division: Option<&Division>,
        at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        self.storage.set_item(LAST_VISITED_URL_KEY, url).await?;
        self.storage
            .set_item(LAST_VISITED_TIME_KEY, &clock::unix_millis(at).to_string())
            .await?;
        if let Some(division) = division {
            let json = serde_json::to_string(division)?;
            self.storage.set_item(LAST_VISITED_DIVISION_KEY, &json).await?;
        }
        tracing::trace!(url, "page visit tracked");
        Ok(())
    }

    pub async fn track_logout(&self) -> anyhow::Result<()> {
        self.track_logout_at(OffsetDateTime::now_utc()).await
    }

    pub async fn track_logout_at(&self, at: OffsetDateTime) -> anyhow::Result<()> {
        self.storage
            .set_item(LOGOUT_TIME_KEY, &clock::unix_millis(at).to_string())
            .await
    }

    pub async fn smart_redirect_url(&self, home_url: &str) -> SmartRedirect {
        self.smart_redirect_url_at(home_url, OffsetDateTime::now_utc())
            .await
    }

    pub async fn smart_redirect_url_at(&self, home_url: &str, now: OffsetDateTime) -> SmartRedirect {
        let last_url = self.read(LAST_VISITED_URL_KEY).await;
        let last_time = self.read_millis(LAST_VISITED_TIME_KEY).await;
        let (Some(last_url), Some(last_time)) = (last_url, last_time) else {
            return SmartRedirect {
                url: home_url.to_string(),
                reason: RedirectReason::NoPreviousVisit,
            };
        };

        let reference = self.read_millis(LOGOUT_TIME_KEY).await.unwrap_or(last_time);
        let minutes_since_logout = (clock::unix_millis(now) - reference) as f64 / 60_000.0;
        let decision = if minutes_since_logout < RESUME_WINDOW.whole_minutes() as f64 {
            SmartRedirect {
                url: last_url,
                reason: RedirectReason::Resume { minutes_since_logout },
            }
        } else {
            SmartRedirect {
                url: home_url.to_string(),
                reason: RedirectReason::Stale { minutes_since_logout },
            }
        };
        tracing::debug!(url = %decision.url, reason = %decision.reason, "smart redirect computed");
        decision
    }

    pub async fn last_visited_division(&self) -> Option<Division> {
        let raw = self.read(LAST_VISITED_DIVISION_KEY).await?;
        serde_json::from_str(&raw)
            .inspect_err(|e| tracing::warn!(error = %e, "ignoring corrupt last visited division"))
            .ok()
    }

    /// Wipe every tracked key. Ordinary logout keeps the trace so the next
    /// login can resume; this is for hard resets.
    pub async fn clear_all_navigation_tracking(&self) -> anyhow::Result<()> {
        for key in TRACKED_KEYS {
            self.storage.remove_item(key).await?;
        }
        Ok(())
    }

    async fn read(&self, key: &str) -> Option<String> {
        self.storage
            .get_item(key)
            .await
            .inspect_err(|e| tracing::warn!(key, error = %e, "failed to read navigation trace"))
            .ok()
            .flatten()
    }

    async fn read_millis(&self, key: &str) -> Option<i64> {
        self.read(key).await?.trim().parse().ok()
    }
}
