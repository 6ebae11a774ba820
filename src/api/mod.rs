pub mod report;

use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::core::{
    AssetAmounts, EARLY_WITHDRAWAL_PENALTY_RATE, HouseholdBudget, Projection, ProjectionError,
    ReturnRates, SimulationInputs, Summary, YearRecord, project, validate_inputs,
};
use report::{
    CSV_FILE_NAME, DEFAULT_CURRENCY_SYMBOL, render_csv, render_summary, render_table, write_csv,
};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

const CLI_NAME: &str = "nestegg";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Projection(#[from] ProjectionError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    annual_salary: Option<f64>,
    take_home_pay: Option<f64>,
    annual_living_expenses: Option<f64>,

    initial_investment: Option<f64>,
    years: Option<u32>,
    monthly_savings: Option<f64>,

    ira_contribution: Option<f64>,
    stocks_contribution: Option<f64>,
    bonds_contribution: Option<f64>,
    cash_contribution: Option<f64>,

    ira_rate: Option<f64>,
    stocks_rate: Option<f64>,
    bonds_rate: Option<f64>,
    cash_rate: Option<f64>,
    total_rate: Option<f64>,

    inflation_rate: Option<f64>,
    early_withdrawal_age: Option<u32>,
    current_age: Option<u32>,
    income_tax_rate: Option<f64>,
    capital_gains_tax_rate: Option<f64>,

    currency_symbol: Option<String>,
}

#[derive(Parser, Debug)]
#[command(
    name = "nestegg",
    about = "Deterministic year-by-year investment projection (IRA + stocks + bonds + cash)"
)]
struct Cli {
    #[arg(long, default_value_t = 220_000.0, help = "Annual salary")]
    annual_salary: f64,
    #[arg(long, default_value_t = 131_906.0, help = "Estimated take-home pay")]
    take_home_pay: f64,
    #[arg(
        long,
        default_value_t = 71_906.0,
        help = "Annual amount left for living expenses"
    )]
    annual_living_expenses: f64,
    #[arg(
        long,
        default_value_t = 100_000.0,
        help = "Lump sum invested at the start of year 1"
    )]
    initial_investment: f64,
    #[arg(long, default_value_t = 30, help = "Investment period in years")]
    years: u32,
    #[arg(long, default_value_t = 5_000.0, help = "Amount saved every month")]
    monthly_savings: f64,
    #[arg(long, default_value_t = 12_000.0, help = "Yearly IRA contribution")]
    ira_contribution: f64,
    #[arg(long, default_value_t = 24_000.0, help = "Yearly stock investment")]
    stocks_contribution: f64,
    #[arg(long, default_value_t = 12_000.0, help = "Yearly bond investment")]
    bonds_contribution: f64,
    #[arg(long, default_value_t = 12_000.0, help = "Yearly cash savings")]
    cash_contribution: f64,
    #[arg(long, default_value_t = 6.0, help = "IRA return rate in percent")]
    ira_rate: f64,
    #[arg(long, default_value_t = 8.0, help = "Stocks return rate in percent")]
    stocks_rate: f64,
    #[arg(long, default_value_t = 4.0, help = "Bonds return rate in percent")]
    bonds_rate: f64,
    #[arg(long, default_value_t = 1.0, help = "Cash return rate in percent")]
    cash_rate: f64,
    #[arg(
        long,
        default_value_t = 6.0,
        help = "Blended return rate in percent applied to the carried-over balance"
    )]
    total_rate: f64,
    #[arg(long, default_value_t = 2.0, help = "Annual inflation rate in percent")]
    inflation_rate: f64,
    #[arg(long, default_value_t = 59)]
    early_withdrawal_age: u32,
    #[arg(long, default_value_t = 30)]
    current_age: u32,
    #[arg(long, default_value_t = 25.0, help = "Income tax rate in percent")]
    income_tax_rate: f64,
    #[arg(long, default_value_t = 20.0, help = "Capital gains tax rate in percent")]
    capital_gains_tax_rate: f64,
    #[arg(long, default_value_t = DEFAULT_CURRENCY_SYMBOL.to_string())]
    currency_symbol: String,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
    #[arg(long, help = "Also write the yearly table as CSV to this path")]
    csv: Option<PathBuf>,
}

#[derive(Debug)]
struct ApiRequest {
    inputs: SimulationInputs,
    budget: HouseholdBudget,
    currency_symbol: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    currency_symbol: String,
    summary: Summary,
    average_annual_return: Option<f64>,
    average_annual_return_error: Option<String>,
    household_budget: HouseholdBudget,
    monthly_living_expenses: f64,
    records: Vec<YearRecord>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_inputs(cli: &Cli) -> Result<SimulationInputs, ProjectionError> {
    let inputs = SimulationInputs {
        initial_investment: cli.initial_investment,
        monthly_savings: cli.monthly_savings,
        category_contributions: AssetAmounts {
            ira: cli.ira_contribution,
            stocks: cli.stocks_contribution,
            bonds: cli.bonds_contribution,
            cash: cli.cash_contribution,
        },
        return_rates: ReturnRates {
            categories: AssetAmounts {
                ira: cli.ira_rate / 100.0,
                stocks: cli.stocks_rate / 100.0,
                bonds: cli.bonds_rate / 100.0,
                cash: cli.cash_rate / 100.0,
            },
            total: cli.total_rate / 100.0,
        },
        horizon_years: cli.years,
        inflation_rate: cli.inflation_rate / 100.0,
        current_age: cli.current_age,
        early_withdrawal_age: cli.early_withdrawal_age,
        income_tax_rate: cli.income_tax_rate / 100.0,
        capital_gains_tax_rate: cli.capital_gains_tax_rate / 100.0,
        early_withdrawal_penalty_rate: EARLY_WITHDRAWAL_PENALTY_RATE,
    };
    validate_inputs(&inputs)?;
    Ok(inputs)
}

fn build_budget(cli: &Cli) -> Result<HouseholdBudget, ProjectionError> {
    for (field, value) in [
        ("annual_salary", cli.annual_salary),
        ("take_home_pay", cli.take_home_pay),
        ("annual_living_expenses", cli.annual_living_expenses),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ProjectionError::InvalidInput {
                field,
                reason: format!("must be a finite value >= 0 (got {value})"),
            });
        }
    }
    Ok(HouseholdBudget {
        annual_salary: cli.annual_salary,
        estimated_take_home_pay: cli.take_home_pay,
        annual_living_expenses: cli.annual_living_expenses,
    })
}

fn api_request_from_cli(cli: &Cli) -> Result<ApiRequest, ProjectionError> {
    Ok(ApiRequest {
        inputs: build_inputs(cli)?,
        budget: build_budget(cli)?,
        currency_symbol: cli.currency_symbol.clone(),
    })
}

pub fn run_cli<I, T>(args: I) -> Result<(), ApiError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    let request = api_request_from_cli(&cli)?;
    let projection = project(&request.inputs)?;
    debug!(
        years = projection.summary.horizon_years,
        final_balance = projection.summary.final_balance,
        "projection complete"
    );

    let symbol = request.currency_symbol.as_str();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.format {
        OutputFormat::Table => {
            write!(out, "{}", render_table(&projection.records, symbol))?;
            writeln!(out)?;
            write!(
                out,
                "{}",
                render_summary(&projection.summary, Some(&request.budget), symbol)
            )?;
        }
        OutputFormat::Json => {
            let response = build_project_response(&request, projection.clone());
            serde_json::to_writer_pretty(&mut out, &response)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => write_csv(&mut out, &projection.records, symbol)?,
    }

    if let Some(path) = &cli.csv {
        write_csv(File::create(path)?, &projection.records, symbol)?;
        info!(path = %path.display(), "wrote projection CSV");
    }

    Ok(())
}

fn router() -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route(
            "/api/project.csv",
            get(project_csv_get_handler).post(project_csv_post_handler),
        )
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "projection HTTP API listening");
    info!("local access: http://127.0.0.1:{port}/");

    axum::serve(listener, router()).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(
    payload: Result<Query<ProjectPayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => project_handler_impl(payload),
        Err(rejection) => rejection_response(&rejection.body_text()),
    }
}

async fn project_post_handler(payload: Result<Json<ProjectPayload>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(payload)) => project_handler_impl(payload),
        Err(rejection) => rejection_response(&rejection.body_text()),
    }
}

async fn project_csv_get_handler(
    payload: Result<Query<ProjectPayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => project_csv_handler_impl(payload),
        Err(rejection) => rejection_response(&rejection.body_text()),
    }
}

async fn project_csv_post_handler(
    payload: Result<Json<ProjectPayload>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(payload)) => project_csv_handler_impl(payload),
        Err(rejection) => rejection_response(&rejection.body_text()),
    }
}

fn rejection_response(msg: &str) -> Response {
    warn!(error = %msg, "malformed projection payload");
    error_response(StatusCode::BAD_REQUEST, msg)
}

fn run_request(payload: ProjectPayload) -> Result<(ApiRequest, Projection), Response> {
    let request = api_request_from_payload(payload).map_err(|err| {
        warn!(error = %err, "rejected projection request");
        error_response(StatusCode::BAD_REQUEST, &err.to_string())
    })?;
    let projection = project(&request.inputs).map_err(|err| {
        warn!(error = %err, "projection failed");
        error_response(StatusCode::BAD_REQUEST, &err.to_string())
    })?;
    info!(
        years = request.inputs.horizon_years,
        final_balance = projection.summary.final_balance,
        "projection served"
    );
    Ok((request, projection))
}

fn project_handler_impl(payload: ProjectPayload) -> Response {
    match run_request(payload) {
        Ok((request, projection)) => {
            json_response(StatusCode::OK, build_project_response(&request, projection))
        }
        Err(response) => response,
    }
}

fn project_csv_handler_impl(payload: ProjectPayload) -> Response {
    let (request, projection) = match run_request(payload) {
        Ok(result) => result,
        Err(response) => return response,
    };
    match render_csv(&projection.records, &request.currency_symbol) {
        Ok(body) => with_cache_control((
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{CSV_FILE_NAME}\""),
                ),
            ],
            body,
        )),
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
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
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload).map_err(|e| e.to_string())
}

fn api_request_from_payload(payload: ProjectPayload) -> Result<ApiRequest, ProjectionError> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.annual_salary {
        cli.annual_salary = v;
    }
    if let Some(v) = payload.take_home_pay {
        cli.take_home_pay = v;
    }
    if let Some(v) = payload.annual_living_expenses {
        cli.annual_living_expenses = v;
    }

    if let Some(v) = payload.initial_investment {
        cli.initial_investment = v;
    }
    if let Some(v) = payload.years {
        cli.years = v;
    }
    if let Some(v) = payload.monthly_savings {
        cli.monthly_savings = v;
    }

    if let Some(v) = payload.ira_contribution {
        cli.ira_contribution = v;
    }
    if let Some(v) = payload.stocks_contribution {
        cli.stocks_contribution = v;
    }
    if let Some(v) = payload.bonds_contribution {
        cli.bonds_contribution = v;
    }
    if let Some(v) = payload.cash_contribution {
        cli.cash_contribution = v;
    }

    if let Some(v) = payload.ira_rate {
        cli.ira_rate = v;
    }
    if let Some(v) = payload.stocks_rate {
        cli.stocks_rate = v;
    }
    if let Some(v) = payload.bonds_rate {
        cli.bonds_rate = v;
    }
    if let Some(v) = payload.cash_rate {
        cli.cash_rate = v;
    }
    if let Some(v) = payload.total_rate {
        cli.total_rate = v;
    }

    if let Some(v) = payload.inflation_rate {
        cli.inflation_rate = v;
    }
    if let Some(v) = payload.early_withdrawal_age {
        cli.early_withdrawal_age = v;
    }
    if let Some(v) = payload.current_age {
        cli.current_age = v;
    }
    if let Some(v) = payload.income_tax_rate {
        cli.income_tax_rate = v;
    }
    if let Some(v) = payload.capital_gains_tax_rate {
        cli.capital_gains_tax_rate = v;
    }

    if let Some(v) = payload.currency_symbol.filter(|s| !s.trim().is_empty()) {
        cli.currency_symbol = v;
    }

    api_request_from_cli(&cli)
}

fn default_cli_for_api() -> Cli {
    Cli::parse_from([CLI_NAME])
}

fn build_project_response(request: &ApiRequest, projection: Projection) -> ProjectResponse {
    let (average_annual_return, average_annual_return_error) =
        match projection.summary.average_annual_return() {
            Ok(rate) => (Some(rate), None),
            Err(err) => (None, Some(err.to_string())),
        };

    ProjectResponse {
        currency_symbol: request.currency_symbol.clone(),
        summary: projection.summary,
        average_annual_return,
        average_annual_return_error,
        household_budget: request.budget,
        monthly_living_expenses: request.budget.monthly_living_expenses(),
        records: projection.records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TaxBranch;
    use axum::body::{Body, to_bytes};
    use axum::http::{HeaderMap, Method, Request};
    use tower::ServiceExt;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_cli() -> Cli {
        default_cli_for_api()
    }

    #[test]
    fn default_cli_matches_planning_form_defaults() {
        let cli = sample_cli();
        assert_approx(cli.initial_investment, 100_000.0);
        assert_eq!(cli.years, 30);
        assert_approx(cli.monthly_savings, 5_000.0);
        assert_approx(cli.stocks_contribution, 24_000.0);
        assert_eq!(cli.early_withdrawal_age, 59);
        assert_eq!(cli.current_age, 30);
        assert_eq!(cli.currency_symbol, "£");
        assert_eq!(cli.format, OutputFormat::Table);
        assert!(cli.csv.is_none());
    }

    #[test]
    fn build_inputs_converts_percentages_to_fractions() {
        let inputs = build_inputs(&sample_cli()).expect("valid inputs");
        assert_approx(inputs.return_rates.categories.ira, 0.06);
        assert_approx(inputs.return_rates.categories.stocks, 0.08);
        assert_approx(inputs.return_rates.categories.bonds, 0.04);
        assert_approx(inputs.return_rates.categories.cash, 0.01);
        assert_approx(inputs.return_rates.total, 0.06);
        assert_approx(inputs.inflation_rate, 0.02);
        assert_approx(inputs.income_tax_rate, 0.25);
        assert_approx(inputs.capital_gains_tax_rate, 0.20);
        assert_approx(inputs.early_withdrawal_penalty_rate, 0.10);
        assert_approx(inputs.annual_savings(), 60_000.0);
    }

    #[test]
    fn build_inputs_rejects_negative_contribution() {
        let mut cli = sample_cli();
        cli.cash_contribution = -5.0;
        let err = build_inputs(&cli).expect_err("must reject negative contribution");
        assert!(err.to_string().contains("cash_contribution"));
    }

    #[test]
    fn build_inputs_rejects_zero_years() {
        let mut cli = sample_cli();
        cli.years = 0;
        let err = build_inputs(&cli).expect_err("must reject zero years");
        assert!(err.to_string().contains("horizon_years"));
    }

    #[test]
    fn build_budget_rejects_negative_living_expenses() {
        let mut cli = sample_cli();
        cli.annual_living_expenses = -1.0;
        let err = build_budget(&cli).expect_err("must reject negative budget");
        assert!(err.to_string().contains("annual_living_expenses"));
    }

    #[test]
    fn cli_flags_override_defaults() {
        let cli = Cli::parse_from([
            CLI_NAME,
            "--years",
            "5",
            "--total-rate",
            "7.5",
            "--format",
            "csv",
            "--currency-symbol",
            "$",
        ]);
        assert_eq!(cli.years, 5);
        assert_eq!(cli.format, OutputFormat::Csv);
        let request = api_request_from_cli(&cli).expect("valid request");
        assert_approx(request.inputs.return_rates.total, 0.075);
        assert_eq!(request.currency_symbol, "$");
    }

    #[test]
    fn api_request_from_json_parses_web_keys() {
        let json = r#"{
          "initialInvestment": 50000,
          "years": 12,
          "monthlySavings": 250,
          "iraContribution": 6000,
          "stocksContribution": 1000,
          "bondsContribution": 0,
          "cashContribution": 300,
          "iraRate": 5,
          "stocksRate": 9,
          "bondsRate": 3,
          "cashRate": 0.5,
          "totalRate": 7,
          "inflationRate": 3,
          "earlyWithdrawalAge": 60,
          "currentAge": 41,
          "incomeTaxRate": 30,
          "capitalGainsTaxRate": 18,
          "annualLivingExpenses": 24000,
          "currencySymbol": "$"
        }"#;
        let request = api_request_from_json(json).expect("json should parse");
        let inputs = request.inputs;

        assert_approx(inputs.initial_investment, 50_000.0);
        assert_eq!(inputs.horizon_years, 12);
        assert_approx(inputs.monthly_savings, 250.0);
        assert_approx(inputs.category_contributions.ira, 6_000.0);
        assert_approx(inputs.category_contributions.stocks, 1_000.0);
        assert_approx(inputs.category_contributions.bonds, 0.0);
        assert_approx(inputs.category_contributions.cash, 300.0);
        assert_approx(inputs.return_rates.categories.cash, 0.005);
        assert_approx(inputs.return_rates.total, 0.07);
        assert_approx(inputs.inflation_rate, 0.03);
        assert_eq!(inputs.early_withdrawal_age, 60);
        assert_eq!(inputs.current_age, 41);
        assert_approx(inputs.income_tax_rate, 0.30);
        assert_approx(inputs.capital_gains_tax_rate, 0.18);
        assert_approx(request.budget.monthly_living_expenses(), 2_000.0);
        assert_eq!(request.currency_symbol, "$");
    }

    #[test]
    fn api_request_from_json_uses_defaults_for_missing_keys() {
        let request = api_request_from_json("{}").expect("empty payload is valid");
        assert_eq!(request.inputs, build_inputs(&sample_cli()).expect("valid"));
        assert_eq!(request.currency_symbol, "£");
    }

    #[test]
    fn api_request_from_json_ignores_blank_currency_symbol() {
        let request =
            api_request_from_json(r#"{"currencySymbol": "  "}"#).expect("payload is valid");
        assert_eq!(request.currency_symbol, "£");
    }

    #[test]
    fn api_request_from_json_rejects_negative_rate() {
        let err = api_request_from_json(r#"{"stocksRate": -1}"#).expect_err("must reject");
        assert!(err.contains("stocks_return_rate"));
    }

    #[test]
    fn project_response_serialization_contains_expected_fields() {
        let request = api_request_from_json(r#"{"years": 3, "currentAge": 57}"#)
            .expect("json should parse");
        let projection = project(&request.inputs).expect("valid inputs");
        assert_eq!(projection.records[0].tax_branch, TaxBranch::EarlyWithdrawal);

        let response = build_project_response(&request, projection);
        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"records\""));
        assert!(json.contains("\"summary\""));
        assert!(json.contains("\"averageAnnualReturn\""));
        assert!(json.contains("\"cumulativeContributionsByCategory\""));
        assert!(json.contains("\"inflationAdjustedBalance\""));
        assert!(json.contains("\"earlyWithdrawalPenalty\""));
        assert!(json.contains("\"taxBranch\":\"early-withdrawal\""));
        assert!(json.contains("\"monthlyLivingExpenses\""));
        assert!(json.contains("\"averageAnnualReturnError\":null"));
    }

    #[test]
    fn project_response_reports_undefined_average_return() {
        let request = api_request_from_json(
            r#"{
              "initialInvestment": 0,
              "monthlySavings": 0,
              "iraContribution": 0,
              "stocksContribution": 0,
              "bondsContribution": 0,
              "cashContribution": 0
            }"#,
        )
        .expect("json should parse");
        let projection = project(&request.inputs).expect("valid inputs");
        let response = build_project_response(&request, projection);

        assert!(response.average_annual_return.is_none());
        let message = response
            .average_annual_return_error
            .expect("error message present");
        assert!(message.contains("undefined"));
    }

    #[test]
    fn project_handler_returns_bad_request_for_invalid_payload() {
        let payload = ProjectPayload {
            years: Some(0),
            ..ProjectPayload::default()
        };
        let response = project_handler_impl(payload);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response
                .headers()
                .get(header::CACHE_CONTROL)
                .and_then(|v| v.to_str().ok()),
            Some("no-store")
        );
    }

    #[test]
    fn project_csv_handler_sets_attachment_headers() {
        let payload = ProjectPayload {
            years: Some(2),
            ..ProjectPayload::default()
        };
        let response = project_csv_handler_impl(payload);
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(
            headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("text/csv; charset=utf-8")
        );
        assert_eq!(
            headers
                .get(header::CONTENT_DISPOSITION)
                .and_then(|v| v.to_str().ok()),
            Some("attachment; filename=\"investment_projection.csv\"")
        );
    }

    async fn send(request: Request<Body>) -> (StatusCode, HeaderMap, String) {
        let response = router()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should read");
        let body = String::from_utf8(bytes.to_vec()).expect("body should be utf-8");
        (status, headers, body)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("valid request")
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("valid request")
    }

    fn header_str<'a>(headers: &'a HeaderMap, name: header::HeaderName) -> Option<&'a str> {
        headers.get(name).and_then(|v| v.to_str().ok())
    }

    fn assert_json_error(status: StatusCode, headers: &HeaderMap, body: &str, expected: StatusCode) {
        assert_eq!(status, expected);
        assert_eq!(header_str(headers, header::CACHE_CONTROL), Some("no-store"));
        assert_eq!(
            header_str(headers, header::CONTENT_TYPE),
            Some("application/json")
        );
        let value: serde_json::Value = serde_json::from_str(body).expect("error body is json");
        let message = value["error"].as_str().expect("error message present");
        assert!(!message.is_empty());
    }

    #[tokio::test]
    async fn post_with_negative_years_returns_json_bad_request() {
        let (status, headers, body) = send(post_json("/api/project", r#"{"years": -1}"#)).await;
        assert_json_error(status, &headers, &body, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn post_with_fractional_years_returns_json_bad_request() {
        let (status, headers, body) = send(post_json("/api/project", r#"{"years": 2.5}"#)).await;
        assert_json_error(status, &headers, &body, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn csv_post_with_malformed_body_returns_json_bad_request() {
        let (status, headers, body) = send(post_json("/api/project.csv", "{not json")).await;
        assert_json_error(status, &headers, &body, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn get_with_non_numeric_years_returns_json_bad_request() {
        let (status, headers, body) = send(get_request("/api/project?years=abc")).await;
        assert_json_error(status, &headers, &body, StatusCode::BAD_REQUEST);

        let (status, headers, body) = send(get_request("/api/project.csv?years=-3")).await;
        assert_json_error(status, &headers, &body, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn get_with_zero_years_returns_validation_error() {
        let (status, headers, body) = send(get_request("/api/project?years=0")).await;
        assert_json_error(status, &headers, &body, StatusCode::BAD_REQUEST);
        assert!(body.contains("horizon_years"));
    }

    #[tokio::test]
    async fn get_project_with_query_returns_records() {
        let (status, headers, body) = send(get_request("/api/project?years=3&currentAge=57")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(header_str(&headers, header::CACHE_CONTROL), Some("no-store"));

        let value: serde_json::Value = serde_json::from_str(&body).expect("response is json");
        let records = value["records"].as_array().expect("records array");
        assert_eq!(records.len(), 3);
        assert_eq!(value["summary"]["horizonYears"], 3);
        assert_eq!(records[0]["taxBranch"], "early-withdrawal");
        assert_eq!(records[2]["taxBranch"], "standard");
    }

    #[tokio::test]
    async fn post_project_with_json_body_returns_records() {
        let (status, _, body) =
            send(post_json("/api/project", r#"{"years": 2, "currencySymbol": "$"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        let value: serde_json::Value = serde_json::from_str(&body).expect("response is json");
        assert_eq!(value["records"].as_array().map(Vec::len), Some(2));
        assert_eq!(value["currencySymbol"], "$");
    }

    #[tokio::test]
    async fn get_project_csv_returns_header_and_one_row_per_year() {
        let (status, headers, body) = send(get_request("/api/project.csv?years=2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(header_str(&headers, header::CACHE_CONTROL), Some("no-store"));
        assert_eq!(
            header_str(&headers, header::CONTENT_TYPE),
            Some("text/csv; charset=utf-8")
        );
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Year,"));
        assert!(lines[1].starts_with("1,"));
        assert!(lines[2].starts_with("2,"));
    }

    #[tokio::test]
    async fn unknown_route_returns_json_not_found() {
        let (status, headers, body) = send(get_request("/api/unknown")).await;
        assert_json_error(status, &headers, &body, StatusCode::NOT_FOUND);
        assert!(body.contains("Not found"));
    }

    #[tokio::test]
    async fn static_assets_are_served_without_caching() {
        let (status, headers, body) = send(get_request("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(header_str(&headers, header::CACHE_CONTROL), Some("no-store"));
        assert!(body.contains("/app.js"));

        let (status, headers, _) = send(get_request("/app.js")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            header_str(&headers, header::CONTENT_TYPE),
            Some("application/javascript; charset=utf-8")
        );

        let (status, headers, _) = send(get_request("/styles.css")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            header_str(&headers, header::CONTENT_TYPE),
            Some("text/css; charset=utf-8")
        );
    }

    #[test]
    fn run_cli_writes_csv_file_alongside_output() {
        let path = std::env::temp_dir().join(format!(
            "nestegg-run-cli-{}.csv",
            std::process::id()
        ));
        let path_arg = path.to_str().expect("temp path is utf-8");

        run_cli([
            CLI_NAME, "--years", "2", "--format", "json", "--csv", path_arg,
        ])
        .expect("cli run succeeds");

        let written = std::fs::read_to_string(&path).expect("csv file written");
        let _ = std::fs::remove_file(&path);
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Year,"));
        assert!(lines[2].starts_with("2,"));
    }
}
