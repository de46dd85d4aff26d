use thiserror::Error;

use signup_core::clock::Clock;
use signup_core::registry::{RegistryError, UserRegistry};
use signup_core::storage::KeyValueStore;
use signup_core::user::User;

use crate::config::FUNCTION_NAME;
use crate::event::ConfirmationEvent;

/// The only trigger this function acts on. Compared case-insensitively.
pub const CONFIRM_SIGN_UP: &str = "PostConfirmation_ConfirmSignUp";

pub const ATTR_SUB: &str = "sub";
pub const ATTR_EMAIL: &str = "email";
pub const ATTR_NAME: &str = "name";

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Failed to register confirmed user: {0}")]
    Registration(#[from] RegistryError),
}

/// Persists users once Cognito confirms their sign-up.
///
/// Failures are returned to the platform so the whole event is retried.
#[derive(Debug, Clone)]
pub struct PostConfirmationHandler<S, C> {
    registry: UserRegistry<S, C>,
}

impl<S, C> PostConfirmationHandler<S, C>
where
    S: KeyValueStore,
    C: Clock,
{
    pub fn new(registry: UserRegistry<S, C>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &UserRegistry<S, C> {
        &self.registry
    }

    /// Handles one trigger invocation and hands the event back unchanged.
    pub async fn handle(&self, event: ConfirmationEvent) -> Result<ConfirmationEvent, HandlerError> {
        if !event.trigger_source.eq_ignore_ascii_case(CONFIRM_SIGN_UP) {
            tracing::debug!(
                handler = FUNCTION_NAME,
                trigger_source = %event.trigger_source,
                "Event is a no-op for this handler"
            );
            return Ok(event);
        }

        tracing::info!(handler = FUNCTION_NAME, "Handling {CONFIRM_SIGN_UP} event");

        let user = self.user_from_event(&event);
        match self.registry.register_user(&user, None).await {
            Ok(saved) => {
                tracing::info!(handler = FUNCTION_NAME, user_id = %saved.id, "Confirmed user saved");
                Ok(event)
            }
            Err(err) => {
                tracing::error!(
                    handler = FUNCTION_NAME,
                    user_id = %user.id,
                    error = %err,
                    "Failed to process {CONFIRM_SIGN_UP}"
                );
                Err(err.into())
            }
        }
    }

    /// Missing `sub` or `email` are left blank for the registry to reject.
    fn user_from_event(&self, event: &ConfirmationEvent) -> User {
        let mut user = User::new(
            event.attribute(ATTR_SUB).unwrap_or_default(),
            event.attribute(ATTR_EMAIL).unwrap_or_default(),
            self.registry.clock().now(),
        );
        user.name = event.attribute(ATTR_NAME).map(str::to_string);
        user
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use signup_core::clock::FixedClock;
    use signup_core::storage::InMemoryStore;
    use signup_core::testing::{random_test_user, CountingStore};

    use super::*;

    fn fixed_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
    }

    fn handler() -> (
        PostConfirmationHandler<CountingStore<InMemoryStore>, FixedClock>,
        CountingStore<InMemoryStore>,
    ) {
        let store = CountingStore::new(InMemoryStore::new());
        let registry = UserRegistry::new(store.clone(), FixedClock::new(fixed_date()));
        (PostConfirmationHandler::new(registry), store)
    }

    fn confirm_event(user: &User) -> ConfirmationEvent {
        let mut event = ConfirmationEvent::new(CONFIRM_SIGN_UP)
            .with_attribute(ATTR_SUB, &user.id)
            .with_attribute(ATTR_EMAIL, &user.email);
        if let Some(name) = &user.name {
            event = event.with_attribute(ATTR_NAME, name);
        }
        event
    }

    #[tokio::test]
    async fn test_confirmed_user_is_registered() {
        let (handler, _) = handler();
        let user = random_test_user(fixed_date());
        let event = confirm_event(&user);

        let returned = handler.handle(event.clone()).await.unwrap();

        assert_eq!(returned, event);
        let saved = handler.registry().get_user_by_id(&user.id).await.unwrap();
        assert_eq!(saved.email, user.email);
        assert_eq!(saved.name, user.name);
        assert_eq!(saved.created_at, fixed_date());
        assert_eq!(saved.expires_at, None);
    }

    #[tokio::test]
    async fn test_trigger_match_ignores_case() {
        let (handler, store) = handler();
        let user = random_test_user(fixed_date());
        let mut event = confirm_event(&user);
        event.trigger_source = CONFIRM_SIGN_UP.to_uppercase();

        handler.handle(event).await.unwrap();

        assert_eq!(store.inner().len().await, 2);
    }

    #[tokio::test]
    async fn test_other_triggers_are_a_no_op() {
        let (handler, store) = handler();
        let user = random_test_user(fixed_date());
        let mut event = confirm_event(&user);
        event.trigger_source = "PostConfirmation_ConfirmForgotPassword".to_string();

        let returned = handler.handle(event.clone()).await.unwrap();

        assert_eq!(returned, event);
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_email_is_rejected_without_store_calls() {
        let (handler, store) = handler();
        let event = ConfirmationEvent::new(CONFIRM_SIGN_UP).with_attribute(ATTR_SUB, "u1");

        let result = handler.handle(event).await;

        assert!(matches!(
            result,
            Err(HandlerError::Registration(RegistryError::Validation {
                field: "email"
            }))
        ));
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_name_is_stored_as_absent() {
        let (handler, _) = handler();
        let mut user = random_test_user(fixed_date());
        user.name = None;

        handler.handle(confirm_event(&user)).await.unwrap();

        let saved = handler.registry().get_user_by_id(&user.id).await.unwrap();
        assert_eq!(saved.name, None);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_surfaced() {
        let (handler, _) = handler();
        let first = random_test_user(fixed_date());
        let mut second = random_test_user(fixed_date());
        second.email = first.email.clone();

        handler.handle(confirm_event(&first)).await.unwrap();
        let result = handler.handle(confirm_event(&second)).await;

        match result {
            Err(HandlerError::Registration(RegistryError::DuplicateEmail { email })) => {
                assert_eq!(email, first.email);
            }
            other => panic!("expected duplicate email, got {other:?}"),
        }
        assert!(matches!(
            handler.registry().get_user_by_id(&second.id).await,
            Err(RegistryError::NotFound { .. })
        ));
    }
}
