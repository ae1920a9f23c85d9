use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result as AnyResult};
use pitchfund_core::{EventStore, Repository};
use pitchfund_eventstore::RecordEventStore;
use pitchfund_gateway::{AppState, router};
use pitchfund_ledger::BalanceLedger;
use pitchfund_platform::{
    Hs256Verifier, PublishingEventStore, RedisBus, ServiceConfig, connect_record_store,
};
use pitchfund_settlement::SettlementEngine;
use tracing::info;

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| {
            "pitchfund_gateway=info,pitchfund_settlement=info,pitchfund_ledger=info".to_string()
        }))
        .init();

    let config = ServiceConfig::from_env("0.0.0.0:8080")?;
    let store = connect_record_store(&config.record_store);
    let ledger = Arc::new(BalanceLedger::new(Repository::new(store.clone())));

    let mut journal: Arc<dyn EventStore> = Arc::new(RecordEventStore::new(store));
    if let Some(redis_url) = &config.redis_url {
        let bus = RedisBus::connect(redis_url).context("invalid REDIS_URL")?;
        journal = Arc::new(PublishingEventStore::new(journal, bus));
        info!("publishing settlement events to redis");
    }

    let state = AppState {
        engine: Arc::new(SettlementEngine::new(ledger, journal)),
        verifier: Arc::new(Hs256Verifier::new(&config.jwt_secret, config.jwt_issuer.clone())),
    };

    let addr: SocketAddr = config.http_addr.parse().context("invalid HTTP_ADDR")?;
    info!("gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
