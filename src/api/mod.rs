use std::collections::HashSet;
use std::net::SocketAddr;

use axum::{
    Router,
    extract::{Json, Query},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::core::{
    AmortizationRow, DebtRecord, ExtraPaymentSolveConfig, PayoffStrategy, PortfolioSummary,
    SimulationResult, amortization_schedule, compare_strategies, fixed_payment, months_to_payoff,
    payoff_date_label, simulate, solve_extra_payment, sort_debts, summarize_portfolio,
    total_interest,
};

const DEFAULT_SOLVE_SEARCH_MAX: f64 = 10_000.0;
const DEFAULT_SOLVE_TOLERANCE: f64 = 0.01;
const DEFAULT_SOLVE_MAX_ITERATIONS: u32 = 40;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliStrategy {
    Avalanche,
    Snowball,
}

impl From<CliStrategy> for PayoffStrategy {
    fn from(value: CliStrategy) -> Self {
        match value {
            CliStrategy::Avalanche => PayoffStrategy::Avalanche,
            CliStrategy::Snowball => PayoffStrategy::Snowball,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ApiStrategy {
    #[serde(alias = "Avalanche", alias = "AVALANCHE", alias = "highest-rate")]
    Avalanche,
    #[serde(alias = "Snowball", alias = "SNOWBALL", alias = "lowest-balance")]
    Snowball,
}

impl From<ApiStrategy> for CliStrategy {
    fn from(value: ApiStrategy) -> Self {
        match value {
            ApiStrategy::Avalanche => CliStrategy::Avalanche,
            ApiStrategy::Snowball => CliStrategy::Snowball,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "debtplan",
    about = "Debt payoff planner (amortization math + avalanche/snowball simulation)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON API over HTTP.
    Serve(ServeArgs),
    /// Simulate a payoff plan and print it as JSON.
    Plan(PlanArgs),
    /// Compare avalanche and snowball against minimum payments only.
    Compare(PortfolioArgs),
    /// Print a fixed-term amortization schedule.
    Schedule(ScheduleArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, env = "DEBTPLAN_PORT", default_value_t = 8080)]
    pub port: u16,
}

#[derive(Args, Debug)]
pub struct PortfolioArgs {
    #[arg(
        long = "debt",
        required = true,
        value_parser = parse_debt_arg,
        help = "Debt as NAME:BALANCE:RATE:MIN, e.g. Visa:5000:23.5:150 (repeatable)"
    )]
    pub debts: Vec<DebtArg>,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Extra amount paid toward the target debt each month"
    )]
    pub extra: f64,
    #[arg(long, help = "Start date for payoff dates (YYYY-MM-DD), defaults to today")]
    pub today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub portfolio: PortfolioArgs,
    #[arg(long, value_enum, default_value_t = CliStrategy::Avalanche)]
    pub strategy: CliStrategy,
}

#[derive(Args, Debug)]
pub struct ScheduleArgs {
    #[arg(long)]
    pub principal: f64,
    #[arg(long, help = "Annual interest rate in percent, e.g. 6.5")]
    pub rate: f64,
    #[arg(long)]
    pub term_months: u32,
    #[arg(long, help = "Monthly payment; defaults to the level payment for the term")]
    pub payment: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DebtArg {
    pub name: String,
    pub balance: f64,
    pub rate: f64,
    pub minimum: f64,
}

fn parse_debt_arg(raw: &str) -> Result<DebtArg, String> {
    let mut parts = raw.rsplitn(4, ':');
    let (Some(minimum), Some(rate), Some(balance), Some(name)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("expected NAME:BALANCE:RATE:MIN, got {raw:?}"));
    };

    let number = |field: &str, value: &str| {
        value
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid {field} {value:?}: {e}"))
    };

    let name = name.trim();
    if name.is_empty() {
        return Err("debt name must not be empty".to_string());
    }

    Ok(DebtArg {
        name: name.to_string(),
        balance: number("balance", balance)?,
        rate: number("rate", rate)?,
        minimum: number("minimum payment", minimum)?,
    })
}

impl From<DebtArg> for DebtPayload {
    fn from(value: DebtArg) -> Self {
        DebtPayload {
            id: None,
            name: Some(value.name),
            balance: Some(value.balance),
            annual_rate_percent: Some(value.rate),
            minimum_payment: Some(value.minimum),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DebtPayload {
    id: Option<String>,
    name: Option<String>,
    #[serde(alias = "currentBalance")]
    balance: Option<f64>,
    #[serde(alias = "rate", alias = "interestRate", alias = "apr")]
    annual_rate_percent: Option<f64>,
    #[serde(alias = "minPayment", alias = "minimum")]
    minimum_payment: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PlanPayload {
    debts: Vec<DebtPayload>,
    #[serde(alias = "extra", alias = "extraPayment")]
    extra_monthly_amount: Option<f64>,
    strategy: Option<ApiStrategy>,
    today: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SolvePayload {
    debts: Vec<DebtPayload>,
    strategy: Option<ApiStrategy>,
    target_months: Option<u32>,
    search_min: Option<f64>,
    search_max: Option<f64>,
    tolerance: Option<f64>,
    max_iterations: Option<u32>,
    today: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PayoffPayload {
    balance: Option<f64>,
    #[serde(alias = "rate")]
    annual_rate_percent: Option<f64>,
    #[serde(alias = "payment")]
    monthly_payment: Option<f64>,
    today: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SchedulePayload {
    #[serde(alias = "balance")]
    principal: Option<f64>,
    #[serde(alias = "rate")]
    annual_rate_percent: Option<f64>,
    #[serde(alias = "term")]
    term_months: Option<u32>,
    #[serde(alias = "payment")]
    monthly_payment: Option<f64>,
}

#[derive(Debug)]
struct PlanRequest {
    debts: Vec<DebtRecord>,
    extra_monthly_amount: f64,
    strategy: PayoffStrategy,
    today: NaiveDate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DebtEstimate {
    id: String,
    name: String,
    months: Option<u32>,
    never_pays_off: bool,
    total_interest: f64,
    payoff_date: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    strategy: PayoffStrategy,
    extra_monthly_amount: f64,
    summary: PortfolioSummary,
    sorted_debts: Vec<DebtRecord>,
    estimates: Vec<DebtEstimate>,
    result: SimulationResult,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PayoffResponse {
    months: Option<u32>,
    never_pays_off: bool,
    total_interest: f64,
    payoff_date: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleResponse {
    monthly_payment: f64,
    total_interest: f64,
    rows: Vec<AmortizationRow>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn today_or_local(today: Option<NaiveDate>) -> NaiveDate {
    today.unwrap_or_else(|| Local::now().date_naive())
}

fn require_amount(field: &str, value: Option<f64>) -> Result<f64, String> {
    let Some(value) = value else {
        return Err(format!("{field} is required"));
    };
    if !value.is_finite() || value < 0.0 {
        return Err(format!("{field} must be >= 0"));
    }
    Ok(value)
}

fn build_debts(payloads: Vec<DebtPayload>) -> Result<Vec<DebtRecord>, String> {
    let mut seen = HashSet::new();
    let mut debts = Vec::with_capacity(payloads.len());

    for (idx, payload) in payloads.into_iter().enumerate() {
        let field = |name: &str| format!("debts[{idx}].{name}");

        let balance = require_amount(&field("balance"), payload.balance)?;
        let rate = require_amount(&field("annualRatePercent"), payload.annual_rate_percent)?;
        let minimum = require_amount(&field("minimumPayment"), payload.minimum_payment)?;
        if minimum == 0.0 && balance > 0.0 {
            return Err(format!(
                "{} must be > 0 while balance is outstanding",
                field("minimumPayment")
            ));
        }

        let id = payload
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("debt-{}", idx + 1));
        if !seen.insert(id.clone()) {
            return Err(format!("{} {id:?} is not unique", field("id")));
        }
        let name = payload.name.unwrap_or_else(|| id.clone());

        debts.push(DebtRecord::new(id, name, balance, rate, minimum));
    }

    Ok(debts)
}

fn plan_request_from_payload(payload: PlanPayload) -> Result<PlanRequest, String> {
    let debts = build_debts(payload.debts)?;
    let extra_monthly_amount = match payload.extra_monthly_amount {
        Some(extra) => require_amount("extraMonthlyAmount", Some(extra))?,
        None => 0.0,
    };
    let strategy = payload
        .strategy
        .map(CliStrategy::from)
        .unwrap_or(CliStrategy::Avalanche)
        .into();

    Ok(PlanRequest {
        debts,
        extra_monthly_amount,
        strategy,
        today: today_or_local(payload.today),
    })
}

fn estimate_debt(debt: &DebtRecord, today: NaiveDate) -> DebtEstimate {
    let months = months_to_payoff(debt.balance, debt.annual_rate_percent, debt.minimum_payment);
    DebtEstimate {
        id: debt.id.clone(),
        name: debt.name.clone(),
        months: months.months(),
        never_pays_off: months.is_never(),
        total_interest: total_interest(debt.balance, debt.minimum_payment, months),
        payoff_date: payoff_date_label(months, today),
    }
}

fn build_simulate_response(request: &PlanRequest) -> SimulateResponse {
    let result = simulate(
        &request.debts,
        request.extra_monthly_amount,
        request.strategy,
        request.today,
    );
    SimulateResponse {
        strategy: request.strategy,
        extra_monthly_amount: request.extra_monthly_amount,
        summary: summarize_portfolio(&request.debts),
        sorted_debts: sort_debts(&request.debts, request.strategy),
        estimates: request
            .debts
            .iter()
            .map(|debt| estimate_debt(debt, request.today))
            .collect(),
        result,
    }
}

fn solve_config_from_payload(payload: &SolvePayload) -> Result<ExtraPaymentSolveConfig, String> {
    let Some(target_months) = payload.target_months else {
        return Err("targetMonths is required".to_string());
    };
    Ok(ExtraPaymentSolveConfig {
        target_months,
        search_min: payload.search_min.unwrap_or(0.0),
        search_max: payload.search_max.unwrap_or(DEFAULT_SOLVE_SEARCH_MAX),
        tolerance: payload.tolerance.unwrap_or(DEFAULT_SOLVE_TOLERANCE),
        max_iterations: payload
            .max_iterations
            .unwrap_or(DEFAULT_SOLVE_MAX_ITERATIONS),
    })
}

fn build_payoff_response(payload: PayoffPayload) -> Result<PayoffResponse, String> {
    let balance = require_amount("balance", payload.balance)?;
    let rate = require_amount("annualRatePercent", payload.annual_rate_percent)?;
    let payment = require_amount("monthlyPayment", payload.monthly_payment)?;
    let today = today_or_local(payload.today);

    let months = months_to_payoff(balance, rate, payment);
    Ok(PayoffResponse {
        months: months.months(),
        never_pays_off: months.is_never(),
        total_interest: total_interest(balance, payment, months),
        payoff_date: payoff_date_label(months, today),
    })
}

fn build_schedule_response(payload: SchedulePayload) -> Result<ScheduleResponse, String> {
    let principal = require_amount("principal", payload.principal)?;
    let rate = require_amount("annualRatePercent", payload.annual_rate_percent)?;
    let term_months = match payload.term_months {
        Some(term) if term > 0 => term,
        Some(_) => return Err("termMonths must be > 0".to_string()),
        None => return Err("termMonths is required".to_string()),
    };
    let monthly_payment = match payload.monthly_payment {
        Some(payment) => require_amount("monthlyPayment", Some(payment))?,
        None => fixed_payment(principal, rate, term_months),
    };

    let rows = amortization_schedule(principal, rate, term_months, Some(monthly_payment));
    Ok(ScheduleResponse {
        monthly_payment,
        total_interest: rows
            .iter()
            .map(|row| row.interest - row.unpaid_interest)
            .sum(),
        rows,
    })
}

pub fn render_command(command: Command) -> Result<String, String> {
    let json = match command {
        Command::Serve(_) => return Err("serve does not produce a report".to_string()),
        Command::Plan(args) => {
            let request = PlanRequest {
                debts: build_debts(args.portfolio.debts.into_iter().map(Into::into).collect())?,
                extra_monthly_amount: require_amount("--extra", Some(args.portfolio.extra))?,
                strategy: args.strategy.into(),
                today: today_or_local(args.portfolio.today),
            };
            serde_json::to_string_pretty(&build_simulate_response(&request))
        }
        Command::Compare(args) => {
            let debts = build_debts(args.debts.into_iter().map(Into::into).collect())?;
            let extra = require_amount("--extra", Some(args.extra))?;
            let comparison = compare_strategies(&debts, extra, today_or_local(args.today));
            serde_json::to_string_pretty(&comparison)
        }
        Command::Schedule(args) => {
            let response = build_schedule_response(SchedulePayload {
                principal: Some(args.principal),
                annual_rate_percent: Some(args.rate),
                term_months: Some(args.term_months),
                monthly_payment: args.payment,
            })?;
            serde_json::to_string_pretty(&response)
        }
    };
    json.map_err(|e| format!("failed to encode report: {e}"))
}

pub fn router() -> Router {
    Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/api/simulate", post(simulate_handler))
        .route("/api/compare", post(compare_handler))
        .route("/api/solve", post(solve_handler))
        .route(
            "/api/payoff",
            get(payoff_get_handler).post(payoff_post_handler),
        )
        .route(
            "/api/schedule",
            get(schedule_get_handler).post(schedule_post_handler),
        )
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "debtplan HTTP API listening");

    axum::serve(listener, router())
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

async fn healthz_handler() -> &'static str {
    "ok"
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_handler(Json(payload): Json<PlanPayload>) -> Response {
    simulate_handler_impl(payload)
}

fn simulate_handler_impl(payload: PlanPayload) -> Response {
    let request = match plan_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return bad_request(&msg),
    };
    debug!(
        debts = request.debts.len(),
        strategy = ?request.strategy,
        extra = request.extra_monthly_amount,
        "simulating payoff plan"
    );
    json_response(StatusCode::OK, build_simulate_response(&request))
}

async fn compare_handler(Json(payload): Json<PlanPayload>) -> Response {
    compare_handler_impl(payload)
}

fn compare_handler_impl(payload: PlanPayload) -> Response {
    let request = match plan_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return bad_request(&msg),
    };
    debug!(debts = request.debts.len(), "comparing strategies");
    json_response(
        StatusCode::OK,
        compare_strategies(&request.debts, request.extra_monthly_amount, request.today),
    )
}

async fn solve_handler(Json(payload): Json<SolvePayload>) -> Response {
    solve_handler_impl(payload)
}

fn solve_handler_impl(payload: SolvePayload) -> Response {
    let config = match solve_config_from_payload(&payload) {
        Ok(config) => config,
        Err(msg) => return bad_request(&msg),
    };
    let debts = match build_debts(payload.debts) {
        Ok(debts) => debts,
        Err(msg) => return bad_request(&msg),
    };
    let strategy = payload
        .strategy
        .map(CliStrategy::from)
        .unwrap_or(CliStrategy::Avalanche)
        .into();
    debug!(debts = debts.len(), target = config.target_months, "solving extra payment");

    match solve_extra_payment(&debts, strategy, config, today_or_local(payload.today)) {
        Ok(result) => json_response(StatusCode::OK, result),
        Err(msg) => bad_request(&msg),
    }
}

async fn payoff_get_handler(Query(payload): Query<PayoffPayload>) -> Response {
    payoff_handler_impl(payload)
}

async fn payoff_post_handler(Json(payload): Json<PayoffPayload>) -> Response {
    payoff_handler_impl(payload)
}

fn payoff_handler_impl(payload: PayoffPayload) -> Response {
    match build_payoff_response(payload) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => bad_request(&msg),
    }
}

async fn schedule_get_handler(Query(payload): Query<SchedulePayload>) -> Response {
    schedule_handler_impl(payload)
}

async fn schedule_post_handler(Json(payload): Json<SchedulePayload>) -> Response {
    schedule_handler_impl(payload)
}

fn schedule_handler_impl(payload: SchedulePayload) -> Response {
    match build_schedule_response(payload) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => bad_request(&msg),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn bad_request(msg: &str) -> Response {
    warn!(error = msg, "rejected request");
    error_response(StatusCode::BAD_REQUEST, msg)
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn plan_request_from_json(json: &str) -> Result<PlanRequest, String> {
    let payload = serde_json::from_str::<PlanPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    plan_request_from_payload(payload)
}
