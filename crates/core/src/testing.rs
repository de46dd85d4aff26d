//! Test fixtures and helpers.
//!
//! Enabled for this crate's own tests and for dependents through the
//! `test-utils` feature.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use thiserror::Error;
use tokio::time::Instant;

use crate::clock::Clock;
use crate::registry::{RegistryError, UserRegistry};
use crate::storage::{ConditionalPut, Item, ItemKey, KeyValueStore, Result};
use crate::user::User;

const FIRST_NAMES: &[&str] = &[
    "Ada", "Grace", "Alan", "Barbara", "Edsger", "Frances", "Ken", "Radia", "Dennis", "Margaret",
];
const LAST_NAMES: &[&str] = &[
    "Lovelace", "Hopper", "Turing", "Liskov", "Dijkstra", "Allen", "Thompson", "Perlman",
    "Ritchie", "Hamilton",
];
const TITLES: &[&str] = &["Dr.", "Mr.", "Ms.", "Mx.", "Prof."];
const WEEKDAYS: &[&str] = &[
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
];

fn pick<'a>(rng: &mut impl Rng, values: &[&'a str]) -> &'a str {
    values[rng.random_range(0..values.len())]
}

/// A user with a random name, a unique `testuser_` email and a uuid id.
pub fn random_test_user(created_at: DateTime<Utc>) -> User {
    let mut rng = rand::rng();
    let first = pick(&mut rng, FIRST_NAMES);
    let last = pick(&mut rng, LAST_NAMES);
    let title = pick(&mut rng, TITLES);
    let domain = pick(&mut rng, WEEKDAYS);
    let id = uuid::Uuid::new_v4().to_string();
    let suffix = &id[..8];

    User::new(
        id.clone(),
        format!("testuser_{first}.{last}.{suffix}@{domain}.com").to_lowercase(),
        created_at,
    )
    .with_name(format!("{title} {first} {last}"))
}

/// Store wrapper that counts every call made through it.
#[derive(Debug, Clone)]
pub struct CountingStore<S> {
    inner: S,
    calls: Arc<AtomicUsize>,
}

impl<S> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Total calls across all operations.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl<S: KeyValueStore> KeyValueStore for CountingStore<S> {
    async fn get_by_key(&self, key: &ItemKey) -> Result<Item> {
        self.record();
        self.inner.get_by_key(key).await
    }

    async fn put(&self, put: ConditionalPut) -> Result<()> {
        self.record();
        self.inner.put(put).await
    }

    async fn transact_put(&self, puts: Vec<ConditionalPut>) -> Result<()> {
        self.record();
        self.inner.transact_put(puts).await
    }
}

/// Shortest delay [`wait_for_user`] sleeps between attempts.
pub const MIN_RETRY_INTERVAL: Duration = Duration::from_millis(1);

/// Exponential backoff bounds for [`wait_for_user`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    /// Total time budget, after which the wait gives up.
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(8),
            max_elapsed: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WaitError {
    #[error("User {id} still not found after {attempts} attempts over {elapsed:?}")]
    GaveUp {
        id: String,
        attempts: u32,
        elapsed: Duration,
    },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Reads a user back, retrying while the store has not caught up with a
/// recent write.
///
/// Only [`RegistryError::NotFound`] is retried. Running out of budget yields
/// [`WaitError::GaveUp`]; any other error is returned at once. Delays shorter
/// than [`MIN_RETRY_INTERVAL`] are raised to it.
pub async fn wait_for_user<S, C>(
    registry: &UserRegistry<S, C>,
    id: &str,
    policy: RetryPolicy,
) -> std::result::Result<User, WaitError>
where
    S: KeyValueStore,
    C: Clock,
{
    let start = Instant::now();
    let mut delay = policy.initial_interval.max(MIN_RETRY_INTERVAL);
    let mut attempts = 0;

    loop {
        attempts += 1;
        match registry.get_user_by_id(id).await {
            Ok(user) => return Ok(user),
            Err(RegistryError::NotFound { .. }) => {}
            Err(err) => return Err(err.into()),
        }

        let elapsed = start.elapsed();
        if elapsed + delay > policy.max_elapsed {
            return Err(WaitError::GaveUp {
                id: id.to_string(),
                attempts,
                elapsed,
            });
        }

        tracing::debug!(user_id = %id, attempts, ?delay, "User not visible yet, retrying");
        tokio::time::sleep(delay).await;
        delay = (delay * 2).min(policy.max_interval).max(MIN_RETRY_INTERVAL);
    }
}
