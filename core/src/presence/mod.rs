//! Presence values, the publisher boundary and the refresh scheduler.

mod activity;
mod publisher;
mod scheduler;
mod secrets;
mod timestamp;


pub use activity::{
    ActivityType, Asset, DEFAULT_LARGE_IMAGE_KEY, DEFAULT_LARGE_IMAGE_TOOLTIP, Party, PartyPrivacy, Presence,
    Secrets,
};
pub use publisher::{
    ChannelPublisher, LogPublisher, PresenceCommand, PresencePublisher, PublishOutcome, RATE_LIMIT_UPDATES,
    RATE_LIMIT_WINDOW, RateLimitedPublisher, TRANSPORT_LOG_TARGET, TransportEndpoint,
};
pub use scheduler::{PresenceRequest, PresenceScheduler, SchedulerState, TickOutcome};
pub use secrets::{JoinTarget, decode_join_secret, encode_join_secret};
pub use timestamp::{DayRolloverClock, Timestamp, TimestampOverride, TimestampState};
