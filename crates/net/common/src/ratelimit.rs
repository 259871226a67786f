//! Per-peer rate limiting for inbound request streams.
//!
//! Every protocol topic gets its own [`LeakyBucketCollector`] which keeps one bucket per remote
//! peer. Serving a request fills the peer's bucket, and the bucket drains at the configured
//! [`Rate`]. A request is only admitted while the bucket has room left.

use ember_primitives::PeerId;
use parking_lot::Mutex;
use std::{collections::HashMap, fmt, sync::Arc, time::Duration};
use tokio::time::Instant;
use tracing::warn;

/// A rate of units per time period.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Rate {
    limit: u64,
    duration: Duration,
}

impl Rate {
    /// Create a new [Rate] with the given `limit/duration` ratio.
    ///
    /// # Panics
    ///
    /// If `limit` or `duration` is zero.
    pub fn new(limit: u64, duration: Duration) -> Self {
        assert!(limit > 0 && !duration.is_zero(), "rate must be positive");
        Self { limit, duration }
    }

    /// Create a new [Rate] of `limit` units per second.
    pub fn per_second(limit: u64) -> Self {
        Self::new(limit, Duration::from_secs(1))
    }

    /// Units per period.
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// Length of the period.
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Number of whole units that drain within `elapsed`.
    fn units_in(&self, elapsed: Duration) -> u64 {
        let units = elapsed.as_nanos() * self.limit as u128 / self.duration.as_nanos();
        units.min(u64::MAX as u128) as u64
    }

    /// Time it takes to drain `units`.
    fn time_for(&self, units: u64) -> Duration {
        let nanos = units as u128 * self.duration.as_nanos() / self.limit as u128;
        Duration::from_nanos(nanos.min(u64::MAX as u128) as u64)
    }
}

/// Identifies a single inbound stream for rate limiting purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamIdentity {
    /// The remote peer.
    pub peer_id: PeerId,
    /// The protocol id the stream was opened for.
    pub protocol: String,
}

impl StreamIdentity {
    /// Creates a new identity.
    pub fn new(peer_id: PeerId, protocol: impl Into<String>) -> Self {
        Self { peer_id, protocol: protocol.into() }
    }

    /// Key of the remote peer inside a collector.
    pub fn key(&self) -> String {
        self.peer_id.to_string()
    }
}

impl fmt::Display for StreamIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.peer_id, self.protocol)
    }
}

/// Errors returned by a [`RangeRateLimiter`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    /// The peer used up its budget on the topic.
    #[error("rate limited: peer {peer_id} requested {requested} units on {topic}, {remaining} remaining")]
    Exhausted {
        /// The remote peer.
        peer_id: PeerId,
        /// The protocol topic.
        topic: String,
        /// Units the request asked for.
        requested: u64,
        /// Units left in the peer's budget.
        remaining: i64,
    },
    /// No collector is registered for the topic.
    #[error("no rate limit collector for topic {0}")]
    UnknownTopic(String),
}

/// Quota state of one protocol topic.
#[auto_impl::auto_impl(&, Arc)]
pub trait TopicQuota: Send + Sync {
    /// Units the peer identified by `key` may still consume right now.
    fn remaining(&self, key: &str) -> i64;

    /// Time until the peer's budget is fully replenished.
    fn time_until_refill(&self, key: &str) -> Duration;
}

/// The contract a range request handler relies on to protect the node.
///
/// Admission is checked coarsely before each unit of work with
/// [`check_budget`](RangeRateLimiter::check_budget), the real cost is only known afterwards and
/// charged with [`debit`](RangeRateLimiter::debit).
#[auto_impl::auto_impl(&, Arc)]
pub trait RangeRateLimiter: Send + Sync {
    /// Per topic quota handle.
    type Quota: TopicQuota;

    /// Checks whether the stream's peer may consume `units` more on the stream's topic.
    fn check_budget(&self, stream: &StreamIdentity, units: u64) -> Result<(), RateLimitError>;

    /// Charges the stream's peer for `units` that were served.
    fn debit(&self, stream: &StreamIdentity, units: u64);

    /// Returns the quota tracker of the given topic.
    fn topic_quota(&self, topic: &str) -> Result<Self::Quota, RateLimitError>;
}

/// Upper bound for the time between two sweeps of drained buckets.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// A leaky bucket per key.
///
/// Buckets hold at most `capacity` units and drain at `rate`. Keys without a bucket are empty.
/// Drained buckets are dropped when they are looked up and by a sweep that runs on insertion at
/// most once per drain period, so idle peers do not accumulate.
#[derive(Debug)]
pub struct LeakyBucketCollector {
    rate: Rate,
    capacity: u64,
    sweep_interval: Duration,
    buckets: Mutex<Buckets>,
}

#[derive(Debug)]
struct Buckets {
    by_key: HashMap<String, Bucket>,
    next_sweep: Instant,
}

impl Buckets {
    fn sweep(&mut self, rate: Rate, now: Instant) {
        self.by_key.retain(|_, bucket| {
            bucket.drain(rate, now);
            !bucket.is_empty()
        });
    }
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    level: u64,
    /// Point in time up to which draining was accounted for.
    drained_at: Instant,
}

impl Bucket {
    fn drain(&mut self, rate: Rate, now: Instant) {
        let elapsed = now.saturating_duration_since(self.drained_at);
        let units = rate.units_in(elapsed);
        if units >= self.level {
            self.level = 0;
            self.drained_at = now;
        } else if units > 0 {
            self.level -= units;
            // keep the partially drained unit
            self.drained_at += rate.time_for(units);
        }
    }

    const fn is_empty(&self) -> bool {
        self.level == 0
    }
}

// === impl LeakyBucketCollector ===

impl LeakyBucketCollector {
    /// Creates a collector whose buckets drain at `rate` and hold at most `capacity` units.
    pub fn new(rate: Rate, capacity: u64) -> Self {
        let sweep_interval = rate.time_for(capacity).max(rate.duration()).min(MAX_SWEEP_INTERVAL);
        let buckets = Buckets { by_key: HashMap::new(), next_sweep: Instant::now() };
        Self { rate, capacity, sweep_interval, buckets: Mutex::new(buckets) }
    }

    /// Maximum number of units a bucket holds.
    pub const fn capacity(&self) -> u64 {
        self.capacity
    }

    /// The drain rate.
    pub const fn rate(&self) -> Rate {
        self.rate
    }

    /// Adds `amount` units to the key's bucket and returns the new level.
    ///
    /// The level saturates at the capacity.
    pub fn add(&self, key: &str, amount: u64) -> u64 {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();
        if now >= buckets.next_sweep {
            buckets.sweep(self.rate, now);
            buckets.next_sweep = now.checked_add(self.sweep_interval).unwrap_or(now);
        }

        let level = {
            let bucket = buckets
                .by_key
                .entry(key.to_string())
                .or_insert(Bucket { level: 0, drained_at: now });
            bucket.drain(self.rate, now);
            bucket.level = bucket.level.saturating_add(amount).min(self.capacity);
            bucket.level
        };
        if level == 0 {
            buckets.by_key.remove(key);
        }
        level
    }

    /// Removes all buckets that drained completely.
    pub fn prune(&self) {
        self.buckets.lock().sweep(self.rate, Instant::now());
    }

    /// Number of keys that still hold units.
    pub fn len(&self) -> usize {
        let mut buckets = self.buckets.lock();
        buckets.sweep(self.rate, Instant::now());
        buckets.by_key.len()
    }

    /// Returns `true` if no key has a bucket.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn level(&self, key: &str) -> Option<Bucket> {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();
        let bucket = buckets.by_key.get_mut(key)?;
        bucket.drain(self.rate, now);
        let bucket = *bucket;
        if bucket.is_empty() {
            buckets.by_key.remove(key);
            return None
        }
        Some(bucket)
    }
}

impl TopicQuota for LeakyBucketCollector {
    fn remaining(&self, key: &str) -> i64 {
        let level = self.level(key).map(|bucket| bucket.level).unwrap_or_default();
        let capacity = i64::try_from(self.capacity).unwrap_or(i64::MAX);
        capacity.saturating_sub(i64::try_from(level).unwrap_or(i64::MAX))
    }

    fn time_until_refill(&self, key: &str) -> Duration {
        let Some(bucket) = self.level(key) else { return Duration::ZERO };
        let already_drained = Instant::now().saturating_duration_since(bucket.drained_at);
        self.rate.time_for(bucket.level).saturating_sub(already_drained)
    }
}

/// A [`RangeRateLimiter`] with one [`LeakyBucketCollector`] per protocol topic.
#[derive(Debug, Default, Clone)]
pub struct PeerRateLimiter {
    topics: HashMap<String, Arc<LeakyBucketCollector>>,
}

// === impl PeerRateLimiter ===

impl PeerRateLimiter {
    /// Creates a limiter without any topics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a collector for `topic`.
    pub fn with_topic(mut self, topic: impl Into<String>, rate: Rate, capacity: u64) -> Self {
        self.topics.insert(topic.into(), Arc::new(LeakyBucketCollector::new(rate, capacity)));
        self
    }

    fn collector(&self, topic: &str) -> Result<&Arc<LeakyBucketCollector>, RateLimitError> {
        self.topics.get(topic).ok_or_else(|| RateLimitError::UnknownTopic(topic.to_string()))
    }
}

impl RangeRateLimiter for PeerRateLimiter {
    type Quota = Arc<LeakyBucketCollector>;

    fn check_budget(&self, stream: &StreamIdentity, units: u64) -> Result<(), RateLimitError> {
        let collector = self.collector(&stream.protocol)?;
        let remaining = collector.remaining(&stream.key());
        if (units as i128) > remaining as i128 {
            return Err(RateLimitError::Exhausted {
                peer_id: stream.peer_id,
                topic: stream.protocol.clone(),
                requested: units,
                remaining,
            })
        }
        Ok(())
    }

    fn debit(&self, stream: &StreamIdentity, units: u64) {
        match self.collector(&stream.protocol) {
            Ok(collector) => {
                collector.add(&stream.key(), units);
            }
            Err(err) => {
                warn!(target: "net::ratelimit", %stream, %err, "Dropping debit for unknown topic")
            }
        }
    }

    fn topic_quota(&self, topic: &str) -> Result<Self::Quota, RateLimitError> {
        self.collector(topic).cloned()
    }
}
