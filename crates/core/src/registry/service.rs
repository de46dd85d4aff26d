use crate::clock::Clock;
use crate::storage::{format_reasons, ConditionalPut, KeyValueStore, StoreError};
use crate::user::{Lifespan, User};

use super::records::{email_record, item_to_user, primary_record};
use super::{keys, RegistryError, Result};

/// Position of each record inside the registration transaction.
const PRIMARY_INDEX: usize = 0;
const EMAIL_INDEX: usize = 1;

/// Registers and looks up users while keeping emails unique.
///
/// Each user is written as a primary record plus an email reservation in a
/// single transaction, both guarded by "key must not exist". The store has
/// no unique secondary index, so the reservation is what stops two users
/// from claiming the same email.
#[derive(Debug, Clone)]
pub struct UserRegistry<S, C> {
    store: S,
    clock: C,
}

impl<S, C> UserRegistry<S, C>
where
    S: KeyValueStore,
    C: Clock,
{
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Registers a user.
    ///
    /// Fails with [`RegistryError::Validation`] before touching the store if
    /// `id`, `email` or `created_at` is unset, and with
    /// [`RegistryError::DuplicateEmail`] when the email is already reserved.
    /// `expires_at` takes precedence over `user.expires_at`; when both are
    /// `None` the records never expire.
    /// On success returns the user as decoded from the written primary record.
    pub async fn register_user(&self, user: &User, expires_at: Option<i64>) -> Result<User> {
        validate(user)?;

        let expires_at = expires_at.or(user.expires_at);
        let primary = primary_record(user, expires_at);
        let reservation = email_record(&user.email, expires_at);

        // Order must match PRIMARY_INDEX and EMAIL_INDEX.
        let puts = vec![
            ConditionalPut::if_not_exists(primary.clone()),
            ConditionalPut::if_not_exists(reservation),
        ];

        match self.store.transact_put(puts).await {
            Ok(()) => {
                tracing::info!(user_id = %user.id, email = %user.email, "Registered user");
                item_to_user(&primary)
            }
            Err(StoreError::TransactionCancelled { reasons }) => {
                let failed = |index: usize| {
                    reasons
                        .get(index)
                        .is_some_and(|reason| reason.is_condition_failure())
                };
                let (id_taken, mut email_taken) = (failed(PRIMARY_INDEX), failed(EMAIL_INDEX));

                let email_conflicted = reasons
                    .get(EMAIL_INDEX)
                    .is_some_and(|reason| reason.is_conflict());
                if !id_taken && !email_taken && email_conflicted {
                    email_taken = self.email_reserved_by_other(user).await;
                }

                tracing::warn!(
                    user_id = %user.id,
                    id_taken,
                    email_taken,
                    reasons = %format_reasons(&reasons),
                    "Failed to persist user"
                );
                if email_taken {
                    Err(RegistryError::DuplicateEmail {
                        email: user.email.clone(),
                    })
                } else {
                    Err(RegistryError::TransactionCancelled { reasons })
                }
            }
            Err(err) => {
                tracing::error!(user_id = %user.id, error = %err, "Failed to persist user");
                Err(err.into())
            }
        }
    }

    /// Settles a registration that lost a write conflict on its email record.
    ///
    /// The email counts as taken when its reservation exists and this user's
    /// primary record does not. Read failures leave the outcome undecided.
    async fn email_reserved_by_other(&self, user: &User) -> bool {
        let reserved = match self.store.get_by_key(&keys::email_key(&user.email)).await {
            Ok(_) => true,
            Err(StoreError::NotFound { .. }) => false,
            Err(err) => {
                tracing::warn!(user_id = %user.id, error = %err, "Failed to read email reservation");
                return false;
            }
        };
        if !reserved {
            return false;
        }

        match self.store.get_by_key(&keys::user_key(&user.id)).await {
            Err(StoreError::NotFound { .. }) => true,
            Ok(_) => false,
            Err(err) => {
                tracing::warn!(user_id = %user.id, error = %err, "Failed to read primary record");
                false
            }
        }
    }

    /// Registers a user that the store expires after `lifespan`.
    pub async fn add_test_user(&self, user: &User, lifespan: &Lifespan) -> Result<User> {
        let expires_at = lifespan.expires_at(self.clock.now());
        self.register_user(user, Some(expires_at)).await
    }

    /// Looks a user up by id.
    pub async fn get_user_by_id(&self, id: &str) -> Result<User> {
        match self.store.get_by_key(&keys::user_key(id)).await {
            Ok(item) => item_to_user(&item),
            Err(StoreError::NotFound { .. }) => Err(RegistryError::NotFound { id: id.to_string() }),
            Err(err) => {
                tracing::error!(user_id = %id, error = %err, "Failed to get user");
                Err(err.into())
            }
        }
    }
}

fn validate(user: &User) -> Result<()> {
    if user.id.trim().is_empty() {
        return Err(RegistryError::Validation { field: "id" });
    }
    if user.email.trim().is_empty() {
        return Err(RegistryError::Validation { field: "email" });
    }
    // An epoch timestamp is what an unset `created_at` defaults to.
    if user.created_at.timestamp() <= 0 {
        return Err(RegistryError::Validation { field: "createdAt" });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::*;
    use crate::clock::FixedClock;
    use crate::registry::records::{ATTR_CREATED_AT, ATTR_TTL};
    use crate::storage::{
        Attribute, CancellationCode, CancellationReason, InMemoryStore, Item, ItemKey,
        Result as StoreResult,
    };
    use crate::testing::CountingStore;

    fn fixed_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
    }

    fn registry() -> UserRegistry<InMemoryStore, FixedClock> {
        UserRegistry::new(InMemoryStore::new(), FixedClock::new(fixed_date()))
    }

    fn sample_user() -> User {
        User::new("u1", "a@b.com", fixed_date()).with_name("A B")
    }

    /// A store whose every call fails with the same error.
    struct FailingStore(StoreError);

    #[async_trait]
    impl KeyValueStore for FailingStore {
        async fn get_by_key(&self, _key: &ItemKey) -> StoreResult<Item> {
            Err(self.0.clone())
        }

        async fn put(&self, _put: ConditionalPut) -> StoreResult<()> {
            Err(self.0.clone())
        }

        async fn transact_put(&self, _puts: Vec<ConditionalPut>) -> StoreResult<()> {
            Err(self.0.clone())
        }
    }

    /// A store that cancels every transaction with fixed reasons and serves
    /// reads from `items`.
    struct CancellingStore {
        items: InMemoryStore,
        reasons: Vec<CancellationReason>,
    }

    impl CancellingStore {
        fn new(codes: [CancellationCode; 2]) -> Self {
            Self {
                items: InMemoryStore::new(),
                reasons: codes.into_iter().map(CancellationReason::new).collect(),
            }
        }
    }

    #[async_trait]
    impl KeyValueStore for CancellingStore {
        async fn get_by_key(&self, key: &ItemKey) -> StoreResult<Item> {
            self.items.get_by_key(key).await
        }

        async fn put(&self, put: ConditionalPut) -> StoreResult<()> {
            self.items.put(put).await
        }

        async fn transact_put(&self, _puts: Vec<ConditionalPut>) -> StoreResult<()> {
            Err(StoreError::TransactionCancelled {
                reasons: self.reasons.clone(),
            })
        }
    }

    fn cancelling_registry(
        codes: [CancellationCode; 2],
    ) -> UserRegistry<CancellingStore, FixedClock> {
        UserRegistry::new(CancellingStore::new(codes), FixedClock::new(fixed_date()))
    }

    async fn reserve_email(registry: &UserRegistry<CancellingStore, FixedClock>, email: &str) {
        registry
            .store()
            .items
            .put(ConditionalPut::new(email_record(email, None)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_register_then_get_round_trip() {
        let registry = registry();
        let user = sample_user();

        let saved = registry.register_user(&user, None).await.unwrap();
        let found = registry.get_user_by_id("u1").await.unwrap();

        assert_eq!(saved, user);
        assert_eq!(found.id, "u1");
        assert_eq!(found.email, "a@b.com");
        assert_eq!(found.name.as_deref(), Some("A B"));
        assert_eq!(found.created_at, fixed_date());
    }

    #[tokio::test]
    async fn test_register_writes_both_records() {
        let registry = registry();

        registry.register_user(&sample_user(), None).await.unwrap();

        let store = registry.store();
        assert_eq!(store.len().await, 2);
        assert!(store.peek(&keys::user_key("u1")).await.is_some());
        assert!(store.peek(&keys::email_key("a@b.com")).await.is_some());
    }

    #[tokio::test]
    async fn test_registering_twice_is_a_duplicate() {
        let registry = registry();
        registry.register_user(&sample_user(), None).await.unwrap();

        let again = sample_user().with_name("Someone Else");
        let result = registry.register_user(&again, None).await;

        assert_eq!(
            result,
            Err(RegistryError::DuplicateEmail {
                email: "a@b.com".to_string()
            })
        );
        let stored = registry.get_user_by_id("u1").await.unwrap();
        assert_eq!(stored.name.as_deref(), Some("A B"));
    }

    #[tokio::test]
    async fn test_duplicate_email_leaves_no_primary_record() {
        let registry = registry();
        registry.register_user(&sample_user(), None).await.unwrap();

        let other = User::new("u2", "a@b.com", fixed_date());
        let result = registry.register_user(&other, None).await;

        assert!(matches!(result, Err(RegistryError::DuplicateEmail { .. })));
        assert_eq!(
            registry.get_user_by_id("u2").await,
            Err(RegistryError::NotFound {
                id: "u2".to_string()
            })
        );
        assert_eq!(registry.store().len().await, 2);
    }

    #[tokio::test]
    async fn test_reused_id_with_new_email_is_a_write_failure() {
        let registry = registry();
        registry.register_user(&sample_user(), None).await.unwrap();

        let other = User::new("u1", "other@b.com", fixed_date());
        let result = registry.register_user(&other, None).await;

        match result {
            Err(RegistryError::TransactionCancelled { reasons }) => {
                assert_eq!(reasons[PRIMARY_INDEX].code, CancellationCode::ConditionalCheckFailed);
                assert_eq!(reasons[EMAIL_INDEX].code, CancellationCode::None);
            }
            other => panic!("expected a write failure, got {other:?}"),
        }
        assert!(registry
            .store()
            .peek(&keys::email_key("other@b.com"))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_concurrent_registrations_for_one_email() {
        let registry = Arc::new(registry());

        let tasks: Vec<_> = (0..10)
            .map(|i| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    let user = User::new(format!("user-{i}"), "race@b.com", fixed_date());
                    registry.register_user(&user, None).await
                })
            })
            .collect();

        let results: Vec<_> = futures_util::future::join_all(tasks)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        let winners = results.iter().filter(|r| r.is_ok()).count();
        let duplicates = results
            .iter()
            .filter(|r| matches!(r, Err(RegistryError::DuplicateEmail { .. })))
            .count();
        assert_eq!(winners, 1);
        assert_eq!(duplicates, 9);
        assert_eq!(registry.store().len().await, 2);
    }

    #[tokio::test]
    async fn test_missing_fields_fail_without_store_calls() {
        let store = CountingStore::new(InMemoryStore::new());
        let registry = UserRegistry::new(store.clone(), FixedClock::new(fixed_date()));

        let no_email = User::new("u1", "", fixed_date());
        let no_id = User::new("  ", "a@b.com", fixed_date());
        let no_created_at = User::new("u1", "a@b.com", DateTime::<Utc>::default());

        assert_eq!(
            registry.register_user(&no_email, None).await,
            Err(RegistryError::Validation { field: "email" })
        );
        assert_eq!(
            registry.register_user(&no_id, None).await,
            Err(RegistryError::Validation { field: "id" })
        );
        assert_eq!(
            registry.register_user(&no_created_at, None).await,
            Err(RegistryError::Validation { field: "createdAt" })
        );
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_add_test_user_sets_expiry_on_both_records() {
        let registry = registry();

        let saved = registry
            .add_test_user(&sample_user(), &Lifespan::Short)
            .await
            .unwrap();

        let expected = (fixed_date() + Duration::hours(24)).timestamp();
        assert_eq!(saved.expires_at, Some(expected));
        let reservation = registry
            .store()
            .peek(&keys::email_key("a@b.com"))
            .await
            .unwrap();
        assert_eq!(
            reservation.get(ATTR_TTL),
            Some(&Attribute::N(expected.to_string()))
        );
    }

    #[tokio::test]
    async fn test_unknown_lifespan_matches_short() {
        let registry = registry();
        let other = User::new("u2", "c@d.com", fixed_date());

        let short = registry
            .add_test_user(&sample_user(), &Lifespan::Short)
            .await
            .unwrap();
        let unknown = registry
            .add_test_user(&other, &"forever".parse::<Lifespan>().unwrap())
            .await
            .unwrap();

        assert_eq!(short.expires_at, unknown.expires_at);
    }

    #[tokio::test]
    async fn test_get_missing_user_is_not_found() {
        let registry = registry();

        assert_eq!(
            registry.get_user_by_id("ghost").await,
            Err(RegistryError::NotFound {
                id: "ghost".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_get_user_with_malformed_timestamp() {
        let registry = registry();
        let mut item = crate::registry::records::primary_record(&sample_user(), None);
        item.insert(
            ATTR_CREATED_AT.to_string(),
            Attribute::S("not-a-date".to_string()),
        );
        registry.store().put(ConditionalPut::new(item)).await.unwrap();

        let result = registry.get_user_by_id("u1").await;

        assert!(matches!(
            result,
            Err(RegistryError::Decoding {
                field: "createdAt",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_store_failures_are_surfaced() {
        let throttled = StoreError::Throttled("slow down".to_string());
        let registry = UserRegistry::new(
            FailingStore(throttled.clone()),
            FixedClock::new(fixed_date()),
        );

        assert_eq!(
            registry.register_user(&sample_user(), None).await,
            Err(RegistryError::Store(throttled.clone()))
        );
        assert_eq!(
            registry.get_user_by_id("u1").await,
            Err(RegistryError::Store(throttled))
        );
    }

    #[tokio::test]
    async fn test_conflict_on_reserved_email_is_a_duplicate() {
        let registry =
            cancelling_registry([CancellationCode::None, CancellationCode::TransactionConflict]);
        reserve_email(&registry, "a@b.com").await;

        let result = registry.register_user(&sample_user(), None).await;

        assert_eq!(
            result,
            Err(RegistryError::DuplicateEmail {
                email: "a@b.com".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_conflict_without_reservation_is_a_write_failure() {
        let registry = cancelling_registry([
            CancellationCode::TransactionConflict,
            CancellationCode::TransactionConflict,
        ]);

        let result = registry.register_user(&sample_user(), None).await;

        assert!(matches!(
            result,
            Err(RegistryError::TransactionCancelled { .. })
        ));
    }

    #[tokio::test]
    async fn test_conflict_with_own_primary_record_is_a_write_failure() {
        let registry =
            cancelling_registry([CancellationCode::None, CancellationCode::TransactionConflict]);
        reserve_email(&registry, "a@b.com").await;
        registry
            .store()
            .items
            .put(ConditionalPut::new(primary_record(&sample_user(), None)))
            .await
            .unwrap();

        let result = registry.register_user(&sample_user(), None).await;

        assert!(matches!(
            result,
            Err(RegistryError::TransactionCancelled { .. })
        ));
    }

    #[tokio::test]
    async fn test_throttled_email_item_is_a_write_failure() {
        let registry =
            cancelling_registry([CancellationCode::None, CancellationCode::ThrottlingError]);
        reserve_email(&registry, "a@b.com").await;

        let result = registry.register_user(&sample_user(), None).await;

        match result {
            Err(RegistryError::TransactionCancelled { reasons }) => {
                assert_eq!(reasons[EMAIL_INDEX].code, CancellationCode::ThrottlingError);
            }
            other => panic!("expected a write failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_user_expiry_is_written_when_no_override() {
        let registry = registry();
        let user = sample_user().with_expires_at(1_700_000_000);

        let saved = registry.register_user(&user, None).await.unwrap();

        assert_eq!(saved.expires_at, Some(1_700_000_000));
        let reservation = registry
            .store()
            .peek(&keys::email_key("a@b.com"))
            .await
            .unwrap();
        assert_eq!(
            reservation.get(ATTR_TTL),
            Some(&Attribute::N("1700000000".to_string()))
        );
    }

    #[tokio::test]
    async fn test_expiry_argument_overrides_user_expiry() {
        let registry = registry();
        let user = sample_user().with_expires_at(1_700_000_000);

        let saved = registry.register_user(&user, Some(1_800_000_000)).await.unwrap();

        assert_eq!(saved.expires_at, Some(1_800_000_000));
    }
}
