//! HTTP server and API endpoints for the faucet server.

use crate::{
    config::FaucetConfig,
    error::{FaucetError, FaucetResult},
    state::{ensure_deployer, AppState, SnapshotStore},
};
use alloy::primitives::Address;
use axum::{
    extract::{Path, Query, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
    routing::{get, post},
    Router,
};
use faucet_core::{
    AccountView, ContractAddresses, Deployment, EngineConfig, LogEntry, SystemClock, TokenMetadata,
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, str::FromStr, sync::Arc};
use tokio::sync::broadcast::error::RecvError;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

/// Shared application state
pub type SharedState = Arc<AppState>;

/// Request to claim tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct ClaimRequest {
    pub address: String,
}

/// Response after a successful claim
#[derive(Debug, Serialize, Deserialize)]
pub struct ClaimResponse {
    pub message: String,
    pub entry: LogEntry,
    pub account: AccountView,
}

/// Request to change the pause flag
#[derive(Debug, Serialize, Deserialize)]
pub struct PauseRequest {
    pub caller: String,
    pub paused: bool,
}

/// Response after a pause change
#[derive(Debug, Serialize, Deserialize)]
pub struct PauseResponse {
    pub paused: bool,
    pub entry: LogEntry,
}

/// Deployed contracts and their parameters
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub contracts: ContractAddresses,
    pub token: TokenMetadata,
    pub policy: EngineConfig,
    pub admin: Address,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub paused: bool,
    pub minter_is_faucet: bool,
    pub events: usize,
    pub claimants: usize,
}

/// Query for the event log
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub since: u64,
}

fn parse_address(raw: &str) -> FaucetResult<Address> {
    Address::from_str(raw.trim()).map_err(|_| FaucetError::InvalidAddress(raw.to_string()))
}

/// Create the HTTP router with all endpoints
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/config", get(contract_config))
        .route("/claim", post(claim))
        .route("/accounts/:address", get(account))
        .route("/admin/pause", post(set_paused))
        .route("/events", get(events))
        .route("/events/stream", get(event_stream))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Root endpoint - provides basic information
async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "Token Faucet Server",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "GET /config": "Token and faucet addresses, token metadata and claim policy",
            "POST /claim": "Claim tokens (provide address)",
            "GET /accounts/{address}": "Balance, claimed total, remaining allowance and eligibility",
            "POST /admin/pause": "Pause or unpause the faucet (provide caller and paused)",
            "GET /events?since=N": "Event log from sequence N",
            "GET /events/stream": "Server-sent events for new log entries",
            "GET /health": "Health check",
        }
    }))
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let response = state
        .read(|deployment, _| {
            let paused = deployment.engine().is_paused();
            let minter_is_faucet = deployment.ledger().minter() == deployment.engine().address();
            HealthResponse {
                status: if minter_is_faucet && !paused {
                    "healthy".to_string()
                } else {
                    "degraded".to_string()
                },
                paused,
                minter_is_faucet,
                events: deployment.log().len(),
                claimants: deployment.engine().claimant_count(),
            }
        })
        .await;

    info!("Health check completed: {:?}", response);
    Json(response)
}

/// Contract addresses and parameters
async fn contract_config(State(state): State<SharedState>) -> Json<ConfigResponse> {
    let response = state
        .read(|deployment, _| ConfigResponse {
            contracts: deployment.addresses(),
            token: deployment.ledger().metadata().clone(),
            policy: deployment.engine().config().clone(),
            admin: deployment.engine().admin(),
        })
        .await;
    Json(response)
}

/// Claim tokens for an address
async fn claim(
    State(state): State<SharedState>,
    Json(request): Json<ClaimRequest>,
) -> FaucetResult<Json<ClaimResponse>> {
    let caller = parse_address(&request.address)?;
    info!("Claim request for {}", caller);

    let (entry, account) = state.request_tokens(caller).await?;

    Ok(Json(ClaimResponse {
        message: format!("Tokens sent to {}", caller),
        entry,
        account,
    }))
}

/// Account status
async fn account(
    State(state): State<SharedState>,
    Path(address): Path<String>,
) -> FaucetResult<Json<AccountView>> {
    let address = parse_address(&address)?;
    Ok(Json(state.account(address).await))
}

/// Pause or unpause distribution
async fn set_paused(
    State(state): State<SharedState>,
    Json(request): Json<PauseRequest>,
) -> FaucetResult<Json<PauseResponse>> {
    let caller = parse_address(&request.caller)?;
    info!("Pause request from {}: paused={}", caller, request.paused);

    let entry = state.set_paused(caller, request.paused).await?;

    Ok(Json(PauseResponse {
        paused: request.paused,
        entry,
    }))
}

/// Event log from a given sequence number
async fn events(
    State(state): State<SharedState>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<LogEntry>> {
    Json(state.events_since(query.since).await)
}

/// Live notification stream
async fn event_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe();

    let stream = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(entry) => {
                    let event = Event::default()
                        .id(entry.sequence.to_string())
                        .json_data(&entry)
                        .unwrap_or_else(|_| Event::default().comment("unencodable entry"));
                    return Some((Ok(event), rx));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event stream subscriber lagged by {} entries", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Load the persisted deployment or bootstrap a fresh one
pub async fn open_state(config: &FaucetConfig) -> FaucetResult<AppState> {
    let deployer = config.deployer()?;
    let store = config.deployment.state_path.as_ref().map(SnapshotStore::new);

    let stored = match &store {
        Some(store) => store.load().await?,
        None => None,
    };

    let fresh = stored.is_none();
    let deployment = match stored {
        Some(deployment) => {
            ensure_deployer(&deployment, deployer)?;
            if deployment.engine().config() != &config.engine_config()? {
                warn!("Stored claim policy differs from configuration; keeping stored policy");
            }
            deployment
        }
        None => {
            info!("No stored state, bootstrapping a new deployment");
            Deployment::bootstrap(deployer, config.token_metadata(), config.engine_config()?)?
        }
    };

    let addresses = deployment.addresses();
    info!("Token contract: {}", addresses.token);
    info!("Faucet contract: {}", addresses.faucet);

    let state = AppState::new(deployment, Arc::new(SystemClock), store);
    if fresh {
        state.flush().await?;
    }
    Ok(state)
}

/// Start the HTTP server
pub async fn start_server(config: &FaucetConfig) -> FaucetResult<()> {
    info!("Starting faucet server...");

    let state = Arc::new(open_state(config).await?);
    let app = create_router(state);

    // Bind and serve
    let bind_addr = format!("{}:{}", config.http.bind_address, config.http.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await
        .map_err(|e| FaucetError::Internal(anyhow::anyhow!("Failed to bind to {}: {}", bind_addr, e)))?;

    info!("Faucet server listening on {}", bind_addr);
    info!("Endpoints:");
    info!("  GET  /                  - Server information");
    info!("  GET  /health            - Health check");
    info!("  GET  /config            - Contract addresses and policy");
    info!("  POST /claim             - Claim tokens");
    info!("  GET  /accounts/:address - Account status");
    info!("  POST /admin/pause       - Pause or unpause");
    info!("  GET  /events            - Event log");
    info!("  GET  /events/stream     - Live events (SSE)");

    axum::serve(listener, app)
        .await
        .map_err(|e| FaucetError::Internal(anyhow::anyhow!("Server error: {}", e)))?;

    Ok(())
}
