use std::{sync::Arc, time::Instant};

use axum::{
    Json, Router,
    extract::{Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch},
};
use pitchfund_core::{IdentityVerifier, NewBankAccount, Role, SettlementError};
use pitchfund_platform::{
    BankBalanceResponse, CreateBankAccountRequest, CreateInvestmentRequest, DeclareProfitRequest,
    DistributeQuery, InvestmentQuery, JournalQuery, ProfitQuery, UpdateBankBalanceRequest,
    UpdateInvestmentRequest, WalletAmountRequest, WalletBalanceResponse,
};
use pitchfund_settlement::{ProfitDeclaration, SettlementEngine};
use tracing::{error, info, warn};

use crate::auth::Caller;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SettlementEngine>,
    pub verifier: Arc<dyn IdentityVerifier>,
}

type ApiResult<T> = Result<T, (StatusCode, String)>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/investments",
            get(list_investments)
                .post(create_investment)
                .patch(update_investment),
        )
        .route("/profits", get(list_profits).post(declare_profit))
        .route("/distribute", get(list_distributions).post(distribute_profit))
        .route("/journal", get(pitch_journal))
        .route("/portfolio", get(portfolio))
        .route("/wallet", get(wallet_balance).patch(top_up_wallet))
        .route("/wallet/withdraw", patch(withdraw_wallet))
        .route(
            "/bank",
            get(bank_account)
                .post(link_bank_account)
                .patch(update_bank_balance)
                .delete(unlink_bank_account),
        )
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if status.is_server_error() {
        warn!(%method, %path, status = status.as_u16(), elapsed_ms, "request failed");
    } else {
        info!(%method, %path, status = status.as_u16(), elapsed_ms, "request handled");
    }
    response
}

async fn healthz() -> &'static str {
    "ok"
}

async fn create_investment(
    State(state): State<AppState>,
    caller: Caller,
    Json(payload): Json<CreateInvestmentRequest>,
) -> ApiResult<impl IntoResponse> {
    caller.require_role(&state, Role::Investor).await?;
    if payload.pitch_id <= 0 {
        return Err(invalid_request("pitch_id must be positive"));
    }

    let investment = state
        .engine
        .create_investment(caller.user_id, payload.pitch_id, payload.amount)
        .await
        .map_err(settlement_error)?;
    Ok((StatusCode::CREATED, Json(investment)))
}

async fn list_investments(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<InvestmentQuery>,
) -> ApiResult<Response> {
    caller.require_role(&state, Role::Investor).await?;

    if let Some(id) = query.id {
        let investment = state
            .engine
            .investment_for_investor(caller.user_id, id)
            .await
            .map_err(settlement_error)?;
        return Ok(Json(investment).into_response());
    }

    let investments = state
        .engine
        .investments_for_investor(caller.user_id)
        .await
        .map_err(settlement_error)?;
    Ok(Json(investments).into_response())
}

/// Only refunding is supported: `PATCH /investments?id=` with `{"refunded": true}`.
async fn update_investment(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<InvestmentQuery>,
    Json(payload): Json<UpdateInvestmentRequest>,
) -> ApiResult<impl IntoResponse> {
    caller.require_role(&state, Role::Investor).await?;
    let id = query
        .id
        .ok_or_else(|| invalid_request("investment id is required"))?;
    if payload.refunded != Some(true) {
        return Err(invalid_request(
            "only {\"refunded\": true} updates are supported",
        ));
    }

    let investment = state
        .engine
        .refund_investment(caller.user_id, id)
        .await
        .map_err(settlement_error)?;
    Ok(Json(investment))
}

async fn declare_profit(
    State(state): State<AppState>,
    caller: Caller,
    Json(payload): Json<DeclareProfitRequest>,
) -> ApiResult<impl IntoResponse> {
    let declaration = ProfitDeclaration {
        pitch_id: payload.pitch_id,
        total_profit: payload.total_profit,
        period_start: payload.period_start,
        period_end: payload.period_end,
    };

    let profit = state
        .engine
        .declare_profit(caller.user_id, declaration)
        .await
        .map_err(settlement_error)?;
    Ok((StatusCode::CREATED, Json(profit)))
}

async fn list_profits(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<ProfitQuery>,
) -> ApiResult<Response> {
    let engine = &state.engine;
    let response = match (query.id, query.pitch_id) {
        (Some(id), _) => engine
            .profit_for_owner(caller.user_id, id)
            .await
            .map(|profit| Json(profit).into_response()),
        (None, Some(pitch_id)) => engine
            .profits_for_pitch(caller.user_id, pitch_id)
            .await
            .map(|profits| Json(profits).into_response()),
        (None, None) => engine
            .profits_for_owner(caller.user_id)
            .await
            .map(|profits| Json(profits).into_response()),
    };
    response.map_err(settlement_error)
}

async fn distribute_profit(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<DistributeQuery>,
) -> ApiResult<StatusCode> {
    caller.require_role(&state, Role::Business).await?;
    let profit_id = query
        .profit_id
        .ok_or_else(|| invalid_request("profit_id is required"))?;

    state
        .engine
        .distribute_profit(caller.user_id, profit_id)
        .await
        .map_err(settlement_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_distributions(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<impl IntoResponse> {
    let distributions = state
        .engine
        .distributions_for_investor(caller.user_id)
        .await
        .map_err(settlement_error)?;
    Ok(Json(distributions))
}

async fn pitch_journal(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<JournalQuery>,
) -> ApiResult<impl IntoResponse> {
    caller.require_role(&state, Role::Business).await?;
    let pitch_id = query
        .pitch_id
        .ok_or_else(|| invalid_request("pitch_id is required"))?;

    let events = state
        .engine
        .journal_for_owner(caller.user_id, pitch_id)
        .await
        .map_err(settlement_error)?;
    Ok(Json(events))
}

async fn portfolio(State(state): State<AppState>, caller: Caller) -> ApiResult<impl IntoResponse> {
    caller.require_role(&state, Role::Investor).await?;
    let portfolio = state
        .engine
        .portfolio(caller.user_id)
        .await
        .map_err(settlement_error)?;
    Ok(Json(portfolio))
}

async fn wallet_balance(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<WalletBalanceResponse>> {
    let dashboard_balance = state
        .engine
        .ledger()
        .wallet_balance(caller.user_id)
        .await
        .map_err(settlement_error)?;
    Ok(Json(WalletBalanceResponse { dashboard_balance }))
}

async fn top_up_wallet(
    State(state): State<AppState>,
    caller: Caller,
    Json(payload): Json<WalletAmountRequest>,
) -> ApiResult<Json<WalletBalanceResponse>> {
    let dashboard_balance = state
        .engine
        .ledger()
        .top_up_from_bank(caller.user_id, payload.amount)
        .await
        .map_err(settlement_error)?;
    Ok(Json(WalletBalanceResponse { dashboard_balance }))
}

async fn withdraw_wallet(
    State(state): State<AppState>,
    caller: Caller,
    Json(payload): Json<WalletAmountRequest>,
) -> ApiResult<Json<WalletBalanceResponse>> {
    let dashboard_balance = state
        .engine
        .ledger()
        .withdraw_to_bank(caller.user_id, payload.amount)
        .await
        .map_err(settlement_error)?;
    Ok(Json(WalletBalanceResponse { dashboard_balance }))
}

async fn bank_account(State(state): State<AppState>, caller: Caller) -> ApiResult<impl IntoResponse> {
    let account = state
        .engine
        .ledger()
        .bank_account_for(caller.user_id)
        .await
        .map_err(settlement_error)?;
    Ok(Json(account))
}

async fn link_bank_account(
    State(state): State<AppState>,
    caller: Caller,
    Json(payload): Json<CreateBankAccountRequest>,
) -> ApiResult<impl IntoResponse> {
    let account = state
        .engine
        .ledger()
        .link_bank_account(NewBankAccount {
            owner_id: caller.user_id,
            account_holder_name: payload.account_holder_name.trim().to_string(),
            sort_code: payload.sort_code.trim().to_string(),
            account_number: payload.account_number.trim().to_string(),
            balance: payload.balance,
        })
        .await
        .map_err(settlement_error)?;
    Ok((StatusCode::CREATED, Json(account)))
}

async fn update_bank_balance(
    State(state): State<AppState>,
    caller: Caller,
    Json(payload): Json<UpdateBankBalanceRequest>,
) -> ApiResult<Json<BankBalanceResponse>> {
    let balance = state
        .engine
        .ledger()
        .set_bank_balance(caller.user_id, payload.balance)
        .await
        .map_err(settlement_error)?;
    Ok(Json(BankBalanceResponse { balance }))
}

async fn unlink_bank_account(State(state): State<AppState>, caller: Caller) -> ApiResult<StatusCode> {
    state
        .engine
        .ledger()
        .unlink_bank_account(caller.user_id)
        .await
        .map_err(settlement_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn settlement_error(err: SettlementError) -> (StatusCode, String) {
    let status = match &err {
        SettlementError::NotFound(_) => StatusCode::NOT_FOUND,
        SettlementError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        SettlementError::Forbidden(_) => StatusCode::FORBIDDEN,
        SettlementError::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
        SettlementError::InvalidState(_)
        | SettlementError::LimitExceeded
        | SettlementError::NoMatchingTier
        | SettlementError::AlreadyRefunded
        | SettlementError::AlreadyDistributed
        | SettlementError::NoActiveInvestments
        | SettlementError::NoValidShares
        | SettlementError::Validation(_) => StatusCode::BAD_REQUEST,
        SettlementError::Store(store) => {
            error!("record store failure: {store}");
            return internal_error(store);
        }
        SettlementError::Journal(_) => {
            error!("{err}");
            return internal_error(&err);
        }
    };
    (status, err.to_string())
}

fn invalid_request(message: &str) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, message.to_string())
}

fn internal_error<E: std::fmt::Display>(err: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

#[cfg(test)]
mod tests {
    use pitchfund_core::StoreError;

    use super::*;

    #[test]
    fn maps_errors_to_status_codes() {
        let cases = [
            (SettlementError::NotFound("pitch"), StatusCode::NOT_FOUND),
            (
                SettlementError::Unauthorized("expired".to_string()),
                StatusCode::UNAUTHORIZED,
            ),
            (
                SettlementError::Forbidden("not owner".to_string()),
                StatusCode::FORBIDDEN,
            ),
            (SettlementError::InsufficientFunds, StatusCode::PAYMENT_REQUIRED),
            (SettlementError::LimitExceeded, StatusCode::BAD_REQUEST),
            (SettlementError::AlreadyDistributed, StatusCode::BAD_REQUEST),
            (
                SettlementError::Store(StoreError::Transport("reset".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                SettlementError::Journal("connection refused".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(settlement_error(err).0, expected);
        }
    }
}
