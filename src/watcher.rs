//! One invocation of the promo watcher.
//!
//! Reads the cursor, fetches newer items, mails the newest promotional one
//! and advances the cursor to the newest fetched item. Every collaborator
//! error is returned as-is and ends the invocation; an email that was already
//! accepted is not undone if the cursor write fails afterwards.
use anyhow::Result;
use tracing::{info, instrument};

use crate::config::{Config, ConfigError};
use crate::mail::{MailMessage, Mailer};
use crate::model::Outcome;
use crate::promo::{find_candidates, PromoMarker};
use crate::store::{StoredState, TaskStorage};
use crate::timeline::TimelineSource;

/// Per-invocation settings derived from `Config`.
#[derive(Debug, Clone)]
pub struct WatchSettings {
    pub marker: PromoMarker,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub status_url_base: String,
}

impl WatchSettings {
    pub fn from_config(cfg: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            marker: PromoMarker::from_config(&cfg.promo)?,
            from: cfg.mail.from.clone(),
            to: cfg.mail.to.clone(),
            subject: cfg.mail.subject.clone(),
            status_url_base: cfg.timeline.status_url_base.clone(),
        })
    }
}

#[instrument(skip_all)]
pub async fn run(
    storage: &dyn TaskStorage,
    timeline: &dyn TimelineSource,
    mailer: &dyn Mailer,
    settings: &WatchSettings,
) -> Result<Outcome> {
    info!("reading last processed tweet");
    let cursor = storage
        .get()
        .await?
        .last_item_id
        .filter(|id| !id.is_empty());

    let items = timeline.fetch_since(cursor.as_deref()).await?;
    let Some(newest) = items.first() else {
        return Ok(Outcome::NoNewItems { since: cursor });
    };

    let candidates = find_candidates(&items, &settings.marker, &settings.status_url_base);
    let outcome = match candidates.into_iter().next() {
        Some(candidate) => {
            let message = MailMessage {
                from: settings.from.clone(),
                to: settings.to.clone(),
                subject: settings.subject.clone(),
                text: serde_json::to_string(&candidate)?,
            };
            info!(id = %candidate.id, "promo found; sending email");
            mailer.send(&message).await?;
            Outcome::PromoSent { candidate }
        }
        None => Outcome::NoPromo { count: items.len() },
    };

    info!(id = %newest.id, "setting last processed tweet");
    storage.set(&StoredState::with_cursor(newest.id.clone())).await?;
    Ok(outcome)
}
