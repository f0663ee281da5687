//! The per-frame presence loop.
//!
//! ```text
//!   set_active(new profile) ──► publish now ──► Published
//!                                                  │ tick
//!   Idle ◄── clear()                     Armed ◄───┘
//!                                          │ elapsed >= effective delay
//!                                          └──► publish ──► Published
//! ```
//!
//! A failed publish keeps the accumulated time, so the next tick tries
//! again. An unready transport waits out a normal interval instead, and a
//! rate limited one holds every attempt until the publisher's next free
//! slot.

use std::sync::Arc;

use labpresence_types::{MAX_FIELD_BYTES, MIN_REFRESH_DELAY, RpcConfig, fit_field, strip_rich_text};

use super::activity::{ActivityType, Asset, Party, Presence, Secrets};
use super::publisher::{PresencePublisher, PublishOutcome};
use super::timestamp::TimestampState;
use crate::error::PublishError;
use crate::placeholders::{DelayResolver, PlaceholderRegistry, TemplateEngine};

/// A profile to show plus everything published alongside its text.
///
/// Identity is the `Arc` of the profile: installing the same `Arc` again
/// only refreshes the extras.
#[derive(Debug, Clone)]
pub struct PresenceRequest {
    pub config: Arc<RpcConfig>,
    pub activity_type: ActivityType,
    /// Defaults to the game logo when unset
    pub large_image: Option<Asset>,
    pub small_image: Option<Asset>,
    pub party: Option<Party>,
    pub secrets: Option<Secrets>,
}

impl PresenceRequest {
    pub fn new(config: Arc<RpcConfig>) -> Self {
        Self {
            config,
            activity_type: ActivityType::default(),
            large_image: None,
            small_image: None,
            party: None,
            secrets: None,
        }
    }

    pub fn with_small_image(mut self, asset: Option<Asset>) -> Self {
        self.small_image = asset;
        self
    }

    pub fn with_party(mut self, party: Option<Party>) -> Self {
        self.party = party;
        self
    }

    pub fn with_secrets(mut self, secrets: Option<Secrets>) -> Self {
        self.secrets = secrets;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No active profile
    Idle,
    /// Counting toward the next refresh
    Armed,
    /// Published during the last call
    Published,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Nothing active
    Idle,
    /// Not due yet
    Waiting,
    /// Same profile was already active; extras were replaced
    Unchanged,
    /// The profile has `Use = false`; nothing changed
    Disabled,
    Published(PublishOutcome),
    Failed(PublishError),
}

#[derive(Debug)]
pub struct PresenceScheduler {
    active: Option<PresenceRequest>,
    state: SchedulerState,
    elapsed: f32,
    retry: bool,
    /// Seconds until the publisher accepts updates again
    cooldown: f32,
    refresh_delay: f32,
    extra_minimum_delay: Option<f32>,
    timestamps: TimestampState,
    last_published: Option<Presence>,
}

impl PresenceScheduler {
    pub fn new(refresh_delay: f32) -> Self {
        Self {
            active: None,
            state: SchedulerState::Idle,
            elapsed: 0.0,
            retry: false,
            cooldown: 0.0,
            refresh_delay,
            extra_minimum_delay: None,
            timestamps: TimestampState::default(),
            last_published: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn active(&self) -> Option<&PresenceRequest> {
        self.active.as_ref()
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Seconds left before a rate limited publisher is tried again.
    pub fn cooldown(&self) -> f32 {
        self.cooldown
    }

    /// Last presence the publisher accepted
    pub fn last_published(&self) -> Option<&Presence> {
        self.last_published.as_ref()
    }

    pub fn timestamps(&self) -> &TimestampState {
        &self.timestamps
    }

    pub fn timestamps_mut(&mut self) -> &mut TimestampState {
        &mut self.timestamps
    }

    pub fn set_refresh_delay(&mut self, secs: f32) {
        self.refresh_delay = secs;
    }

    /// An additional floor on the refresh interval, e.g. from the running
    /// gamemode.
    pub fn set_extra_minimum_delay(&mut self, secs: Option<f32>) {
        self.extra_minimum_delay = secs;
    }

    /// Interval between refreshes for the active profile.
    pub fn effective_delay(&self, registry: &PlaceholderRegistry) -> f32 {
        let base = match &self.active {
            Some(request) => DelayResolver::new(registry).effective_delay(&request.config, self.refresh_delay),
            None => self.refresh_delay.max(MIN_REFRESH_DELAY),
        };
        self.extra_minimum_delay.map_or(base, |extra| base.max(extra))
    }

    /// Whether a [`tick`](Self::tick) of `dt` would try to publish.
    pub fn is_due(&self, dt: f32, registry: &PlaceholderRegistry) -> bool {
        self.active.is_some()
            && self.cooldown <= dt
            && (self.retry || self.elapsed + dt >= self.effective_delay(registry))
    }

    /// Install `request`. A new profile publishes immediately; the same
    /// profile only swaps in the new extras for the next refresh.
    pub fn set_active(
        &mut self,
        request: PresenceRequest,
        registry: &PlaceholderRegistry,
        publisher: &mut dyn PresencePublisher,
    ) -> TickOutcome {
        if !request.config.enabled {
            tracing::debug!("Skipping disabled presence profile");
            return TickOutcome::Disabled;
        }

        let same = self
            .active
            .as_ref()
            .is_some_and(|active| Arc::ptr_eq(&active.config, &request.config));
        self.active = Some(request);
        if same {
            return TickOutcome::Unchanged;
        }

        self.elapsed = 0.0;
        self.state = SchedulerState::Armed;
        if self.cooldown > 0.0 {
            self.retry = true;
            return TickOutcome::Waiting;
        }
        self.attempt(registry, publisher)
    }

    /// Advance by `dt` seconds and publish if due.
    pub fn tick(
        &mut self,
        dt: f32,
        registry: &PlaceholderRegistry,
        publisher: &mut dyn PresencePublisher,
    ) -> TickOutcome {
        if self.active.is_none() {
            self.elapsed = 0.0;
            self.state = SchedulerState::Idle;
            return TickOutcome::Idle;
        }

        self.elapsed += dt;
        if self.cooldown > 0.0 {
            self.cooldown = (self.cooldown - dt).max(0.0);
            if self.cooldown > 0.0 {
                self.state = SchedulerState::Armed;
                return TickOutcome::Waiting;
            }
        }
        if !self.retry && self.elapsed < self.effective_delay(registry) {
            self.state = SchedulerState::Armed;
            return TickOutcome::Waiting;
        }
        self.attempt(registry, publisher)
    }

    /// Publish the active profile now, regardless of timing. Used when
    /// something outside the templates changed (timestamps, lobby). While
    /// rate limited the refresh is queued for the end of the cooldown.
    pub fn refresh(&mut self, registry: &PlaceholderRegistry, publisher: &mut dyn PresencePublisher) -> TickOutcome {
        if self.active.is_none() {
            return TickOutcome::Idle;
        }
        if self.cooldown > 0.0 {
            self.retry = true;
            return TickOutcome::Waiting;
        }
        self.attempt(registry, publisher)
    }

    /// Make the next [`tick`](Self::tick) publish regardless of the
    /// interval. A rate limit cooldown still applies.
    pub fn request_refresh(&mut self) {
        if self.active.is_some() {
            self.retry = true;
        }
    }

    /// Drop the active profile and clear the presence.
    pub fn clear(&mut self, publisher: &mut dyn PresencePublisher) -> Result<(), PublishError> {
        self.active = None;
        self.last_published = None;
        self.elapsed = 0.0;
        self.retry = false;
        self.cooldown = 0.0;
        self.state = SchedulerState::Idle;
        publisher.clear()
    }

    /// Render `request` into a presence, enforcing the field limits.
    pub fn render(&self, request: &PresenceRequest, registry: &PlaceholderRegistry) -> Result<Presence, PublishError> {
        let engine = TemplateEngine::new(registry);
        let field = |name: &'static str, template: Option<&str>| {
            let rendered = template.map(|t| strip_rich_text(&engine.apply(t)));
            fit_field(rendered.as_deref(), MAX_FIELD_BYTES).map_err(|e| PublishError::FieldLengthExceeded {
                field: name,
                len: e.len,
                max: e.max,
            })
        };
        let asset = |name: &'static str, asset: &Asset| -> Result<Asset, PublishError> {
            Ok(Asset {
                key: asset.key.clone(),
                tooltip: field(name, asset.tooltip.as_deref())?,
            })
        };

        let large_image = request.large_image.clone().unwrap_or_default();
        Ok(Presence {
            details: field("details", request.config.details.as_deref())?,
            state: field("state", request.config.state.as_deref())?,
            timestamps: self.timestamps.effective(),
            activity_type: request.activity_type,
            large_image: Some(asset("large image tooltip", &large_image)?),
            small_image: request
                .small_image
                .as_ref()
                .map(|a| asset("small image tooltip", a))
                .transpose()?,
            party: request.party.clone(),
            secrets: request.secrets.clone(),
        })
    }

    fn attempt(&mut self, registry: &PlaceholderRegistry, publisher: &mut dyn PresencePublisher) -> TickOutcome {
        let Some(request) = &self.active else {
            return TickOutcome::Idle;
        };

        let result = self
            .render(request, registry)
            .and_then(|presence| publisher.publish(&presence).map(|outcome| (presence, outcome)));

        match result {
            Ok((presence, outcome)) => {
                if outcome == PublishOutcome::Sent {
                    tracing::debug!(
                        details = presence.details.as_deref().unwrap_or(""),
                        state = presence.state.as_deref().unwrap_or(""),
                        "Published presence"
                    );
                }
                self.last_published = Some(presence);
                self.elapsed = 0.0;
                self.retry = false;
                self.state = SchedulerState::Published;
                TickOutcome::Published(outcome)
            }
            Err(PublishError::TransportNotReady) => {
                tracing::debug!(publisher = publisher.name(), "Presence transport not ready, skipping update");
                self.elapsed = 0.0;
                self.retry = false;
                self.state = SchedulerState::Armed;
                TickOutcome::Failed(PublishError::TransportNotReady)
            }
            Err(PublishError::RateLimited { retry_in }) => {
                let e = PublishError::RateLimited { retry_in };
                tracing::debug!(error = %e, "Presence update deferred");
                self.cooldown = retry_in.as_secs_f32();
                self.retry = true;
                self.state = SchedulerState::Armed;
                TickOutcome::Failed(e)
            }
            Err(e) => {
                tracing::error!(error = %e, "Presence update failed");
                self.retry = true;
                self.state = SchedulerState::Armed;
                TickOutcome::Failed(e)
            }
        }
    }
}
