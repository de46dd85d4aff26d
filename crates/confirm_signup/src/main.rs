use std::sync::Arc;

use anyhow::Context;
use lambda_runtime::{run, service_fn, LambdaEvent};

use confirm_signup::logging::init_logging;
use confirm_signup::{Config, ConfirmationEvent, DynamoDbStore, PostConfirmationHandler};
use signup_core::clock::SystemClock;
use signup_core::registry::UserRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    init_logging(&config);

    let store = DynamoDbStore::from_config(&config).await;
    tracing::info!(
        table = %store.table_name(),
        target = %config.target_display(),
        "Starting confirm-user-signup"
    );

    let handler = Arc::new(PostConfirmationHandler::new(UserRegistry::new(
        store,
        SystemClock,
    )));

    run(service_fn(move |event: LambdaEvent<ConfirmationEvent>| {
        let handler = Arc::clone(&handler);
        async move {
            handler
                .handle(event.payload)
                .await
                .map_err(lambda_runtime::Error::from)
        }
    }))
    .await
    .map_err(|e| anyhow::anyhow!(e))
}
