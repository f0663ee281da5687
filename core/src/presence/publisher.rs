//! The boundary between the scheduler and whatever talks to Discord.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use super::activity::Presence;
use crate::error::PublishError;

/// Platform limit: at most this many updates per window.
pub const RATE_LIMIT_UPDATES: usize = 5;
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Handed to the transport
    Sent,
    /// Identical to the last presence sent; nothing was transmitted
    SkippedIdentical,
}

/// Receives fully rendered presences. Implementations must not block.
pub trait PresencePublisher {
    fn name(&self) -> &str;

    /// Whether the transport is connected and accepting updates
    fn is_ready(&self) -> bool;

    fn publish(&mut self, presence: &Presence) -> Result<PublishOutcome, PublishError>;

    fn clear(&mut self) -> Result<(), PublishError>;
}

impl<P: PresencePublisher + ?Sized> PresencePublisher for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn publish(&mut self, presence: &Presence) -> Result<PublishOutcome, PublishError> {
        (**self).publish(presence)
    }

    fn clear(&mut self) -> Result<(), PublishError> {
        (**self).clear()
    }
}

// ─── Rate limiting ──────────────────────────────────────────────────────────

/// Enforces the platform's rolling-window limit and drops repeats of the
/// last presence before they reach `inner`.
#[derive(Debug)]
pub struct RateLimitedPublisher<P> {
    inner: P,
    max_updates: usize,
    window: Duration,
    skip_identical: bool,
    sent: VecDeque<Instant>,
    last: Option<Presence>,
}

impl<P: PresencePublisher> RateLimitedPublisher<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            max_updates: RATE_LIMIT_UPDATES,
            window: RATE_LIMIT_WINDOW,
            skip_identical: true,
            sent: VecDeque::with_capacity(RATE_LIMIT_UPDATES),
            last: None,
        }
    }

    pub fn with_limit(mut self, max_updates: usize, window: Duration) -> Self {
        self.max_updates = max_updates.max(1);
        self.window = window;
        self
    }

    pub fn skip_identical(mut self, skip: bool) -> Self {
        self.skip_identical = skip;
        self
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut P {
        &mut self.inner
    }

    pub fn into_inner(self) -> P {
        self.inner
    }

    /// [`PresencePublisher::publish`] against an explicit clock.
    pub fn publish_at(&mut self, presence: &Presence, now: Instant) -> Result<PublishOutcome, PublishError> {
        if !self.inner.is_ready() {
            return Err(PublishError::TransportNotReady);
        }
        if self.skip_identical && self.last.as_ref() == Some(presence) {
            return Ok(PublishOutcome::SkippedIdentical);
        }

        while let Some(&oldest) = self.sent.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                self.sent.pop_front();
            } else {
                break;
            }
        }
        if self.sent.len() >= self.max_updates
            && let Some(&oldest) = self.sent.front()
        {
            let retry_in = self.window.saturating_sub(now.saturating_duration_since(oldest));
            return Err(PublishError::RateLimited { retry_in });
        }

        let outcome = self.inner.publish(presence)?;
        if outcome == PublishOutcome::Sent {
            self.sent.push_back(now);
        }
        self.last = Some(presence.clone());
        Ok(outcome)
    }
}

impl<P: PresencePublisher> PresencePublisher for RateLimitedPublisher<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }

    fn publish(&mut self, presence: &Presence) -> Result<PublishOutcome, PublishError> {
        self.publish_at(presence, Instant::now())
    }

    fn clear(&mut self) -> Result<(), PublishError> {
        self.last = None;
        self.inner.clear()
    }
}

// ─── Channel transport ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum PresenceCommand {
    Set(Box<Presence>),
    Clear,
}

/// Forwards presences to a transport task over an unbounded channel. The
/// task owns the actual IPC connection and flips the ready flag once the
/// handshake is done.
#[derive(Debug)]
pub struct ChannelPublisher {
    tx: mpsc::UnboundedSender<PresenceCommand>,
    ready: Arc<AtomicBool>,
}

/// The transport task's end of a [`ChannelPublisher`].
#[derive(Debug)]
pub struct TransportEndpoint {
    pub commands: mpsc::UnboundedReceiver<PresenceCommand>,
    ready: Arc<AtomicBool>,
}

impl TransportEndpoint {
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }
}

impl ChannelPublisher {
    pub fn new() -> (Self, TransportEndpoint) {
        let (tx, commands) = mpsc::unbounded_channel();
        let ready = Arc::new(AtomicBool::new(false));
        (
            Self {
                tx,
                ready: Arc::clone(&ready),
            },
            TransportEndpoint { commands, ready },
        )
    }

    fn send(&self, command: PresenceCommand) -> Result<(), PublishError> {
        self.tx
            .send(command)
            .map_err(|_| PublishError::Transport("transport task has stopped".to_string()))
    }
}

impl PresencePublisher for ChannelPublisher {
    fn name(&self) -> &str {
        "channel"
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire) && !self.tx.is_closed()
    }

    fn publish(&mut self, presence: &Presence) -> Result<PublishOutcome, PublishError> {
        if !self.is_ready() {
            return Err(PublishError::TransportNotReady);
        }
        self.send(PresenceCommand::Set(Box::new(presence.clone())))?;
        Ok(PublishOutcome::Sent)
    }

    fn clear(&mut self) -> Result<(), PublishError> {
        self.send(PresenceCommand::Clear)
    }
}

// ─── Logging ────────────────────────────────────────────────────────────────

/// Log target of [`LogPublisher`], filtered by the configured RPC log level.
pub const TRANSPORT_LOG_TARGET: &str = "labpresence::transport";

/// Logs every presence instead of sending it anywhere.
#[derive(Debug, Default)]
pub struct LogPublisher {
    published: usize,
}

impl LogPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> usize {
        self.published
    }
}

impl PresencePublisher for LogPublisher {
    fn name(&self) -> &str {
        "log"
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn publish(&mut self, presence: &Presence) -> Result<PublishOutcome, PublishError> {
        self.published += 1;
        tracing::info!(
            target: TRANSPORT_LOG_TARGET,
            details = presence.details.as_deref().unwrap_or(""),
            state = presence.state.as_deref().unwrap_or(""),
            small_image = presence.small_image.as_ref().map(|a| a.key.as_str()).unwrap_or(""),
            party = presence.party.as_ref().map(|p| p.id.as_str()).unwrap_or(""),
            "Presence update"
        );
        Ok(PublishOutcome::Sent)
    }

    fn clear(&mut self) -> Result<(), PublishError> {
        tracing::info!(target: TRANSPORT_LOG_TARGET, "Presence cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records what reaches the transport.
    #[derive(Default)]
    struct Recorder {
        ready: bool,
        sent: Vec<Presence>,
    }

    impl PresencePublisher for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn is_ready(&self) -> bool {
            self.ready
        }

        fn publish(&mut self, presence: &Presence) -> Result<PublishOutcome, PublishError> {
            self.sent.push(presence.clone());
            Ok(PublishOutcome::Sent)
        }

        fn clear(&mut self) -> Result<(), PublishError> {
            Ok(())
        }
    }

    fn presence(details: &str) -> Presence {
        Presence {
            details: Some(details.to_string()),
            ..Presence::default()
        }
    }

    fn ready() -> Recorder {
        Recorder {
            ready: true,
            ..Recorder::default()
        }
    }

    #[test]
    fn test_window_allows_five_updates() {
        let mut publisher = RateLimitedPublisher::new(ready());
        let start = Instant::now();

        for i in 0..5 {
            let at = start + Duration::from_secs(i);
            assert_eq!(publisher.publish_at(&presence(&i.to_string()), at), Ok(PublishOutcome::Sent));
        }

        let err = publisher
            .publish_at(&presence("sixth"), start + Duration::from_secs(5))
            .unwrap_err();
        assert_eq!(
            err,
            PublishError::RateLimited {
                retry_in: Duration::from_secs(15)
            }
        );

        // the first slot frees up 20 s after it was used
        let at = start + Duration::from_secs(20);
        assert_eq!(publisher.publish_at(&presence("sixth"), at), Ok(PublishOutcome::Sent));
        assert_eq!(publisher.inner().sent.len(), 6);
    }

    #[test]
    fn test_identical_presence_skipped() {
        let mut publisher = RateLimitedPublisher::new(ready());
        let now = Instant::now();

        assert_eq!(publisher.publish_at(&presence("a"), now), Ok(PublishOutcome::Sent));
        assert_eq!(
            publisher.publish_at(&presence("a"), now),
            Ok(PublishOutcome::SkippedIdentical)
        );
        assert_eq!(publisher.inner().sent.len(), 1);

        // skipped presences do not use up the window
        for i in 0..4 {
            assert_eq!(publisher.publish_at(&presence(&i.to_string()), now), Ok(PublishOutcome::Sent));
        }
    }

    #[test]
    fn test_identical_sent_again_after_clear_or_when_disabled() {
        let mut publisher = RateLimitedPublisher::new(ready());
        let now = Instant::now();
        publisher.publish_at(&presence("a"), now).unwrap();
        publisher.clear().unwrap();
        assert_eq!(publisher.publish_at(&presence("a"), now), Ok(PublishOutcome::Sent));

        let mut publisher = RateLimitedPublisher::new(ready()).skip_identical(false);
        publisher.publish_at(&presence("a"), now).unwrap();
        assert_eq!(publisher.publish_at(&presence("a"), now), Ok(PublishOutcome::Sent));
    }

    #[test]
    fn test_not_ready_transport() {
        let mut publisher = RateLimitedPublisher::new(Recorder::default());
        assert_eq!(
            publisher.publish(&presence("a")),
            Err(PublishError::TransportNotReady)
        );
        assert!(publisher.inner().sent.is_empty());
    }

    #[test]
    fn test_custom_limit() {
        let mut publisher = RateLimitedPublisher::new(ready()).with_limit(1, Duration::from_secs(2));
        let start = Instant::now();
        publisher.publish_at(&presence("a"), start).unwrap();
        assert!(matches!(
            publisher.publish_at(&presence("b"), start + Duration::from_secs(1)),
            Err(PublishError::RateLimited { .. })
        ));
        assert!(publisher.publish_at(&presence("b"), start + Duration::from_secs(2)).is_ok());
    }

    #[tokio::test]
    async fn test_channel_publisher_forwards_commands() {
        let (mut publisher, mut endpoint) = ChannelPublisher::new();
        assert_eq!(
            publisher.publish(&presence("early")),
            Err(PublishError::TransportNotReady)
        );

        endpoint.set_ready(true);
        assert!(publisher.is_ready());
        publisher.publish(&presence("hello")).unwrap();
        publisher.clear().unwrap();

        assert_eq!(
            endpoint.commands.recv().await,
            Some(PresenceCommand::Set(Box::new(presence("hello"))))
        );
        assert_eq!(endpoint.commands.recv().await, Some(PresenceCommand::Clear));
    }

    #[test]
    fn test_channel_publisher_after_transport_stops() {
        let (mut publisher, endpoint) = ChannelPublisher::new();
        endpoint.set_ready(true);
        drop(endpoint);

        assert!(!publisher.is_ready());
        assert!(matches!(publisher.clear(), Err(PublishError::Transport(_))));
    }

    #[test]
    fn test_log_publisher_counts() {
        let mut publisher = LogPublisher::new();
        publisher.publish(&presence("a")).unwrap();
        publisher.publish(&presence("a")).unwrap();
        assert_eq!(publisher.published(), 2);
    }
}
