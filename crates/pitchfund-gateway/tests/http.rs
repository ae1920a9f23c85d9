use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use pitchfund_core::{
    IdentityVerifier, RecordStore, Repository, SettlementError, SettlementResult, Table,
};
use pitchfund_eventstore::{InMemoryRecordStore, RecordEventStore};
use pitchfund_gateway::{AppState, router};
use pitchfund_ledger::BalanceLedger;
use pitchfund_platform::WalletBalanceResponse;
use pitchfund_settlement::SettlementEngine;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use uuid::Uuid;

/// Treats the bearer token as the caller's user id.
struct UserIdTokens;

impl IdentityVerifier for UserIdTokens {
    fn verify(&self, token: &str) -> SettlementResult<Uuid> {
        Uuid::parse_str(token)
            .map_err(|_| SettlementError::Unauthorized("unknown token".to_string()))
    }
}

struct TestServer {
    addr: SocketAddr,
    client: Client,
    store: Arc<InMemoryRecordStore>,
    engine: Arc<SettlementEngine>,
}

impl TestServer {
    async fn start() -> Result<Self> {
        let store = Arc::new(InMemoryRecordStore::new());
        let ledger = Arc::new(BalanceLedger::new(Repository::new(store.clone())));
        let engine = Arc::new(SettlementEngine::new(
            ledger,
            Arc::new(RecordEventStore::new(store.clone())),
        ));
        let state = AppState {
            engine: engine.clone(),
            verifier: Arc::new(UserIdTokens),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router(state)).await;
        });

        Ok(Self {
            addr,
            client: Client::new(),
            store,
            engine,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn user(&self, role: &str, balance: Decimal) -> Uuid {
        let id = Uuid::new_v4();
        self.store
            .insert(
                Table::Profile,
                json!({ "id": id, "role": role, "dashboard_balance": balance }),
            )
            .await
            .unwrap();
        id
    }

    /// Active pitch owned by `owner` with tiers at 100 (x1.0) and 1000 (x1.5).
    async fn pitch(&self, owner: Uuid, target: Decimal) -> i64 {
        let row = self
            .store
            .insert(
                Table::Pitch,
                json!({
                    "user_id": owner,
                    "title": "Solar co-op",
                    "target_amount": target,
                    "raised_amount": 0,
                    "status": "Active",
                    "profit_share_percent": 20
                }),
            )
            .await
            .unwrap();
        let pitch_id = row["id"].as_i64().unwrap();
        for (min_amount, multiplier) in [(100, "1.0"), (1000, "1.5")] {
            self.store
                .insert(
                    Table::InvestmentTier,
                    json!({
                        "pitch_id": pitch_id,
                        "name": format!("from {min_amount}"),
                        "min_amount": min_amount,
                        "multiplier": multiplier
                    }),
                )
                .await
                .unwrap();
        }
        pitch_id
    }

    async fn balance(&self, user: Uuid) -> Decimal {
        self.engine.ledger().wallet_balance(user).await.unwrap()
    }
}

#[tokio::test]
async fn health_needs_no_credentials() -> Result<()> {
    let server = TestServer::start().await?;
    let response = server.client.get(server.url("/healthz")).send().await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "ok");
    Ok(())
}

#[tokio::test]
async fn requests_without_valid_credentials_are_unauthorized() -> Result<()> {
    let server = TestServer::start().await?;

    let missing = server.client.get(server.url("/wallet")).send().await?;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let invalid = server
        .client
        .get(server.url("/wallet"))
        .bearer_auth("not-a-user")
        .send()
        .await?;
    assert_eq!(invalid.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn investment_lifecycle_over_http() -> Result<()> {
    let server = TestServer::start().await?;
    let business = server.user("business", dec!(0)).await;
    let investor = server.user("investor", dec!(5000)).await;
    let pitch_id = server.pitch(business, dec!(10000)).await;

    let created = server
        .client
        .post(server.url("/investments"))
        .bearer_auth(investor)
        .json(&json!({ "pitch_id": pitch_id, "amount": 1500 }))
        .send()
        .await?;
    assert_eq!(created.status(), StatusCode::CREATED);
    let investment: Value = created.json().await?;
    let investment_id = investment["id"].as_i64().unwrap();
    assert_eq!(server.balance(investor).await, dec!(3500));

    let listed: Vec<Value> = server
        .client
        .get(server.url("/investments"))
        .bearer_auth(investor)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(listed.len(), 1);

    let not_a_refund = server
        .client
        .patch(server.url(&format!("/investments?id={investment_id}")))
        .bearer_auth(investor)
        .json(&json!({ "refunded": false }))
        .send()
        .await?;
    assert_eq!(not_a_refund.status(), StatusCode::BAD_REQUEST);

    let refunded = server
        .client
        .patch(server.url(&format!("/investments?id={investment_id}")))
        .bearer_auth(investor)
        .json(&json!({ "refunded": true }))
        .send()
        .await?;
    assert_eq!(refunded.status(), StatusCode::OK);
    assert_eq!(server.balance(investor).await, dec!(5000));

    let again = server
        .client
        .patch(server.url(&format!("/investments?id={investment_id}")))
        .bearer_auth(investor)
        .json(&json!({ "refunded": true }))
        .send()
        .await?;
    assert_eq!(again.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn investment_failures_map_to_status_codes() -> Result<()> {
    let server = TestServer::start().await?;
    let business = server.user("business", dec!(0)).await;
    let broke = server.user("investor", dec!(0)).await;
    let pitch_id = server.pitch(business, dec!(1000)).await;

    let unfunded = server
        .client
        .post(server.url("/investments"))
        .bearer_auth(broke)
        .json(&json!({ "pitch_id": pitch_id, "amount": 500 }))
        .send()
        .await?;
    assert_eq!(unfunded.status(), StatusCode::PAYMENT_REQUIRED);

    let overfunding = server
        .client
        .post(server.url("/investments"))
        .bearer_auth(broke)
        .json(&json!({ "pitch_id": pitch_id, "amount": 1500 }))
        .send()
        .await?;
    assert_eq!(overfunding.status(), StatusCode::BAD_REQUEST);

    let wrong_role = server
        .client
        .post(server.url("/investments"))
        .bearer_auth(business)
        .json(&json!({ "pitch_id": pitch_id, "amount": 500 }))
        .send()
        .await?;
    assert_eq!(wrong_role.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn declare_and_distribute_profit() -> Result<()> {
    let server = TestServer::start().await?;
    let business = server.user("business", dec!(5000)).await;
    let investor = server.user("investor", dec!(3000)).await;
    let pitch_id = server.pitch(business, dec!(10000)).await;

    for amount in [100, 1000] {
        let response = server
            .client
            .post(server.url("/investments"))
            .bearer_auth(investor)
            .json(&json!({ "pitch_id": pitch_id, "amount": amount }))
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let declared = server
        .client
        .post(server.url("/profits"))
        .bearer_auth(business)
        .json(&json!({
            "pitch_id": pitch_id,
            "total_profit": 10000,
            "period_start": "2025-01-01",
            "period_end": "2025-03-31"
        }))
        .send()
        .await?;
    assert_eq!(declared.status(), StatusCode::CREATED);
    let profit: Value = declared.json().await?;
    let profit_id = profit["id"].as_i64().unwrap();

    let outsider = server.user("business", dec!(5000)).await;
    let forbidden = server
        .client
        .get(server.url(&format!("/profits?id={profit_id}")))
        .bearer_auth(outsider)
        .send()
        .await?;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let as_investor = server
        .client
        .post(server.url(&format!("/distribute?profit_id={profit_id}")))
        .bearer_auth(investor)
        .send()
        .await?;
    assert_eq!(as_investor.status(), StatusCode::FORBIDDEN);

    let distributed = server
        .client
        .post(server.url(&format!("/distribute?profit_id={profit_id}")))
        .bearer_auth(business)
        .send()
        .await?;
    assert_eq!(distributed.status(), StatusCode::NO_CONTENT);
    assert_eq!(server.balance(business).await, dec!(3000));
    // shares 100 + 1500 of 1600 split 2000
    assert_eq!(server.balance(investor).await, dec!(3900));

    let repeated = server
        .client
        .post(server.url(&format!("/distribute?profit_id={profit_id}")))
        .bearer_auth(business)
        .send()
        .await?;
    assert_eq!(repeated.status(), StatusCode::BAD_REQUEST);

    let received: Vec<Value> = server
        .client
        .get(server.url("/distribute"))
        .bearer_auth(investor)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(received.len(), 2);

    let portfolio: Value = server
        .client
        .get(server.url("/portfolio"))
        .bearer_auth(investor)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(portfolio["items"].as_array().map(Vec::len), Some(2));
    Ok(())
}

#[tokio::test]
async fn underfunded_distribution_is_payment_required() -> Result<()> {
    let server = TestServer::start().await?;
    let business = server.user("business", dec!(100)).await;
    let investor = server.user("investor", dec!(1000)).await;
    let pitch_id = server.pitch(business, dec!(10000)).await;
    server
        .engine
        .create_investment(investor, pitch_id, dec!(1000))
        .await?;
    let profit_id = server
        .client
        .post(server.url("/profits"))
        .bearer_auth(business)
        .json(&json!({
            "pitch_id": pitch_id,
            "total_profit": 10000,
            "period_start": "2025-01-01",
            "period_end": "2025-03-31"
        }))
        .send()
        .await?
        .json::<Value>()
        .await?["id"]
        .as_i64()
        .unwrap();

    let response = server
        .client
        .post(server.url(&format!("/distribute?profit_id={profit_id}")))
        .bearer_auth(business)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    assert_eq!(server.balance(business).await, dec!(100));
    Ok(())
}

#[tokio::test]
async fn wallet_and_bank_transfers() -> Result<()> {
    let server = TestServer::start().await?;
    let investor = server.user("investor", dec!(0)).await;

    let no_bank = server
        .client
        .patch(server.url("/wallet"))
        .bearer_auth(investor)
        .json(&json!({ "amount": 10 }))
        .send()
        .await?;
    assert_eq!(no_bank.status(), StatusCode::NOT_FOUND);

    let linked = server
        .client
        .post(server.url("/bank"))
        .bearer_auth(investor)
        .json(&json!({
            "account_holder_name": "Ada Lovelace",
            "sort_code": "12-34-56",
            "account_number": "12345678",
            "balance": 1000
        }))
        .send()
        .await?;
    assert_eq!(linked.status(), StatusCode::CREATED);

    let topped_up: WalletBalanceResponse = server
        .client
        .patch(server.url("/wallet"))
        .bearer_auth(investor)
        .json(&json!({ "amount": 400 }))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(topped_up.dashboard_balance, dec!(400));

    let overdraw = server
        .client
        .patch(server.url("/wallet/withdraw"))
        .bearer_auth(investor)
        .json(&json!({ "amount": 401 }))
        .send()
        .await?;
    assert_eq!(overdraw.status(), StatusCode::PAYMENT_REQUIRED);

    let withdrawn: WalletBalanceResponse = server
        .client
        .patch(server.url("/wallet/withdraw"))
        .bearer_auth(investor)
        .json(&json!({ "amount": 150 }))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(withdrawn.dashboard_balance, dec!(250));

    let bank: Value = server
        .client
        .get(server.url("/bank"))
        .bearer_auth(investor)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(bank["balance"], json!("750"));

    let negative = server
        .client
        .patch(server.url("/bank"))
        .bearer_auth(investor)
        .json(&json!({ "balance": -5 }))
        .send()
        .await?;
    assert_eq!(negative.status(), StatusCode::BAD_REQUEST);

    let unlinked = server
        .client
        .delete(server.url("/bank"))
        .bearer_auth(investor)
        .send()
        .await?;
    assert_eq!(unlinked.status(), StatusCode::NO_CONTENT);

    let gone = server
        .client
        .get(server.url("/bank"))
        .bearer_auth(investor)
        .send()
        .await?;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn pitch_journal_is_readable_by_its_owner() -> Result<()> {
    let server = TestServer::start().await?;
    let business = server.user("business", dec!(0)).await;
    let investor = server.user("investor", dec!(2000)).await;
    let pitch_id = server.pitch(business, dec!(10000)).await;
    server
        .engine
        .create_investment(investor, pitch_id, dec!(500))
        .await?;

    let oversized = server
        .client
        .post(server.url("/profits"))
        .bearer_auth(business)
        .json(&json!({
            "pitch_id": pitch_id,
            "total_profit": Decimal::MAX.to_string(),
            "period_start": "2025-01-01",
            "period_end": "2025-03-31"
        }))
        .send()
        .await?;
    assert_eq!(oversized.status(), StatusCode::BAD_REQUEST);

    let events: Vec<Value> = server
        .client
        .get(server.url(&format!("/journal?pitch_id={pitch_id}")))
        .bearer_auth(business)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["event"]["kind"], json!("investment_created"));

    let outsider = server.user("business", dec!(0)).await;
    let forbidden = server
        .client
        .get(server.url(&format!("/journal?pitch_id={pitch_id}")))
        .bearer_auth(outsider)
        .send()
        .await?;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let missing = server
        .client
        .get(server.url("/journal"))
        .bearer_auth(business)
        .send()
        .await?;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
