//! HTTP functions: thin handlers that authenticate, call the gateway or the
//! calculation core, write through the [`RecordStore`] and return a JSON summary.

use crate::categories::CategoryBook;
use crate::config::ServiceConfig;
use crate::error::{FinancePlannerError, Result};
use crate::llm::{
    apply_plan_command, CategorizationReport, ChatClient, PlanCommand, PlanCommandInterpreter,
    PlanOutcome, ReceiptReader, StatementParser, TransactionCategorizer,
};
use crate::roi::{analyze, RoiAnalysis};
use crate::scenario::{InvestmentScenario, YearProjection};
use crate::schema::{Category, Receipt, Transaction};
use crate::simulation::{simulate, SimulationOutcome, SimulationSettings};
use crate::store::{CategoryUpdate, RecordStore};
use crate::valuation::{blend, ValuationInputs, ValuationSummary, ValuationWeights};
use axum::extract::{DefaultBodyLimit, FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{Local, NaiveDate, Utc};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub chat: ChatClient,
    pub vision: ChatClient,
    pub store: Arc<dyn RecordStore>,
    pub categories: Arc<CategoryBook>,
}

impl AppState {
    pub fn new(config: ServiceConfig, store: Arc<dyn RecordStore>) -> Result<Self> {
        config.validate()?;
        let chat = ChatClient::from_config(&config)?;
        let vision = chat.with_model(&config.vision_model);

        Ok(Self {
            config: Arc::new(config),
            chat,
            vision,
            store,
            categories: Arc::new(CategoryBook::turkish_defaults()),
        })
    }

    pub fn with_categories(mut self, book: CategoryBook) -> Self {
        self.categories = Arc::new(book);
        self
    }
}

/// Error rendered as `{"error": "<localized message>"}` with a matching status.
pub struct ApiError(pub FinancePlannerError);

impl From<FinancePlannerError> for ApiError {
    fn from(err: FinancePlannerError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            FinancePlannerError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            FinancePlannerError::QuotaExhausted => StatusCode::PAYMENT_REQUIRED,
            FinancePlannerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            FinancePlannerError::InvalidInput(_)
            | FinancePlannerError::InvalidWeights(_)
            | FinancePlannerError::DateError(_)
            | FinancePlannerError::MissingExchangeRate { .. } => StatusCode::BAD_REQUEST,
            FinancePlannerError::UnparseableResponse { .. }
            | FinancePlannerError::CommandNotUnderstood(_) => StatusCode::UNPROCESSABLE_ENTITY,
            FinancePlannerError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            FinancePlannerError::Gateway { .. } | FinancePlannerError::Http(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Request rejected: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.user_message() }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

#[derive(Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    exp: Option<i64>,
}

/// Caller identity from the bearer JWT's `sub` claim. The signature is checked by the
/// auth gateway in front of the functions; only expiry is checked here.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub user_id: String,
}

impl AuthUser {
    pub fn from_bearer(value: &str) -> Result<Self> {
        let unauthorized = |msg: &str| FinancePlannerError::Unauthorized(msg.to_string());

        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| unauthorized("expected a bearer token"))?;

        let payload = token
            .split('.')
            .nth(1)
            .ok_or_else(|| unauthorized("token is not a JWT"))?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|_| unauthorized("token payload is not base64url"))?;
        let claims: Claims =
            serde_json::from_slice(&bytes).map_err(|_| unauthorized("token claims are invalid"))?;

        if let Some(exp) = claims.exp {
            if exp < Utc::now().timestamp() {
                return Err(unauthorized("token expired"));
            }
        }
        if claims.sub.trim().is_empty() {
            return Err(unauthorized("token has no subject"));
        }

        Ok(Self {
            user_id: claims.sub,
        })
    }
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                FinancePlannerError::Unauthorized("missing Authorization header".to_string())
            })?;

        Ok(Self::from_bearer(value)?)
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

#[derive(Debug, Deserialize)]
pub struct CategorizeRequest {
    /// Stored uncategorized transactions are used when absent.
    #[serde(default)]
    pub transactions: Option<Vec<Transaction>>,
    #[serde(default)]
    pub categories: Option<Vec<Category>>,
}

#[derive(Debug, Serialize)]
pub struct CategorizeResponse {
    #[serde(flatten)]
    pub report: CategorizationReport,
    pub updated: usize,
}

async fn categorize_transactions(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CategorizeRequest>,
) -> ApiResult<CategorizeResponse> {
    let book = match req.categories {
        Some(categories) => CategoryBook::new(categories)?,
        None => state.categories.as_ref().clone(),
    };
    let transactions = match req.transactions {
        Some(txs) => txs,
        None => state
            .store
            .transactions(&user.user_id)?
            .into_iter()
            .filter(|tx| tx.category_id.is_none())
            .collect(),
    };

    let categorizer = TransactionCategorizer::from_config(state.chat.clone(), &state.config);
    let report = categorizer.categorize(&transactions, &book).await?;

    let updates: Vec<CategoryUpdate> = report
        .assignments
        .iter()
        .filter_map(|a| {
            Some(CategoryUpdate {
                transaction_id: a.transaction_id.clone()?,
                category_id: a.category_id.clone(),
                confidence: a.confidence,
            })
        })
        .collect();
    let updated = state.store.set_categories(&user.user_id, &updates)?;

    info!(
        "User {} categorized {} transactions ({} stored rows updated)",
        user.user_id,
        report.assignments.len(),
        updated
    );
    Ok(Json(CategorizeResponse { report, updated }))
}

#[derive(Debug, Deserialize)]
pub struct ParseStatementRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ParseStatementResponse {
    pub bank_name: Option<String>,
    pub rows_read: usize,
    pub imported: usize,
    pub duplicates_skipped: usize,
    pub truncated: bool,
}

async fn parse_bank_statement(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<ParseStatementRequest>,
) -> ApiResult<ParseStatementResponse> {
    let existing = state.store.transactions(&user.user_id)?;
    let import = StatementParser::new(state.chat.clone())
        .parse_into_transactions(&req.text, &existing)
        .await?;
    let imported = state
        .store
        .insert_transactions(&user.user_id, &import.transactions)?;

    Ok(Json(ParseStatementResponse {
        bank_name: import.bank_name,
        rows_read: import.rows_read,
        imported,
        duplicates_skipped: import.duplicates_skipped,
        truncated: import.truncated,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ParseReceiptRequest {
    /// Raw base64 or a `data:` URL.
    pub image_base64: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ParseReceiptResponse {
    pub receipt: Receipt,
    pub transaction: Transaction,
}

fn decode_image(req: &ParseReceiptRequest) -> Result<(Vec<u8>, String)> {
    let (mime_from_url, data) = match req.image_base64.strip_prefix("data:") {
        Some(rest) => {
            let (meta, data) = rest.split_once(',').ok_or_else(|| {
                FinancePlannerError::InvalidInput("malformed data URL".to_string())
            })?;
            (meta.strip_suffix(";base64").map(str::to_string), data)
        }
        None => (None, req.image_base64.as_str()),
    };

    let mime = req
        .mime_type
        .clone()
        .or(mime_from_url)
        .unwrap_or_else(|| "image/jpeg".to_string());
    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|_| FinancePlannerError::InvalidInput("image is not valid base64".to_string()))?;

    Ok((bytes, mime))
}

async fn parse_receipt(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<ParseReceiptRequest>,
) -> ApiResult<ParseReceiptResponse> {
    let (bytes, mime) = decode_image(&req)?;
    let receipt = ReceiptReader::new(state.vision.clone())
        .read(&bytes, &mime, &state.categories)
        .await?;

    let transaction = receipt.to_transaction();
    state.store.insert_receipt(&user.user_id, &receipt)?;
    state
        .store
        .insert_transactions(&user.user_id, std::slice::from_ref(&transaction))?;

    Ok(Json(ParseReceiptResponse {
        receipt,
        transaction,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PlanCommandRequest {
    pub command: String,
    #[serde(default)]
    pub today: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct PlanCommandResponse {
    pub command: PlanCommand,
    pub outcome: PlanOutcome,
}

async fn interpret_plan_command(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<PlanCommandRequest>,
) -> ApiResult<PlanCommandResponse> {
    let today = req.today.unwrap_or_else(|| Local::now().date_naive());
    let command = PlanCommandInterpreter::new(state.chat.clone())
        .interpret(&user.user_id, &req.command, today, state.store.as_ref())
        .await?;
    let outcome = apply_plan_command(state.store.as_ref(), &user.user_id, &command, today)?;

    Ok(Json(PlanCommandResponse { command, outcome }))
}

#[derive(Debug, Deserialize)]
pub struct RoiRequest {
    pub scenario: InvestmentScenario,
    #[serde(default)]
    pub simulation: Option<SimulationSettings>,
}

#[derive(Debug, Serialize)]
pub struct RoiResponse {
    pub analysis: RoiAnalysis,
    pub projections: Vec<YearProjection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation: Option<SimulationOutcome>,
}

/// Monte Carlo trials are CPU-bound; they run on the blocking pool so other
/// requests keep being served.
async fn simulate_blocking(
    scenario: InvestmentScenario,
    settings: SimulationSettings,
) -> Result<SimulationOutcome> {
    tokio::task::spawn_blocking(move || simulate(&scenario, &settings))
        .await
        .map_err(|e| FinancePlannerError::TaskFailed(e.to_string()))?
}

async fn roi_analysis(_user: AuthUser, Json(req): Json<RoiRequest>) -> ApiResult<RoiResponse> {
    let analysis = analyze(&req.scenario)?;
    let projections = req.scenario.project()?;
    let simulation = match req.simulation {
        Some(settings) => Some(simulate_blocking(req.scenario, settings).await?),
        None => None,
    };

    Ok(Json(RoiResponse {
        analysis,
        projections,
        simulation,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ValuationRequest {
    pub inputs: ValuationInputs,
    #[serde(default)]
    pub weights: ValuationWeights,
}

async fn valuation(_user: AuthUser, Json(req): Json<ValuationRequest>) -> ApiResult<ValuationSummary> {
    Ok(Json(blend(&req.inputs, &req.weights)?))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(86_400));

    Router::new()
        .route("/health", get(health))
        .route("/categorize-transactions", post(categorize_transactions))
        .route("/parse-bank-statement", post(parse_bank_statement))
        .route("/parse-receipt", post(parse_receipt))
        .route("/interpret-plan-command", post(interpret_plan_command))
        .route("/roi-analysis", post(roi_analysis))
        .route("/valuation", post(valuation))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state)
}
