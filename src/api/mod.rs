use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::str::FromStr;

use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize, Serializer};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::core::{
    AmortizationYear, CashFlow, EquityProjection, ExpenseBreakdown, HorizonBenchmark,
    InvestmentInputs, InvestmentSummary, MAX_LOAN_TERM_YEARS, ProjectionConfig, Report,
    SaleProjection, StockProjection, evaluate_with,
};

#[derive(Parser, Debug)]
#[command(
    name = "rental",
    about = "Rental property investment calculator (amortization, cash flow, equity and cash-flow ROI)"
)]
pub struct App {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate one property and print the report as JSON.
    Evaluate(Cli),
    /// Serve the JSON API.
    Serve {
        #[arg(default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Parser, Debug, Clone)]
pub struct Cli {
    #[arg(long, default_value_t = 500_000.0)]
    home_price: f64,
    #[arg(
        long,
        default_value_t = 60.0,
        help = "Downpayment as percent of the home price"
    )]
    downpayment_percentage: f64,
    #[arg(long, default_value_t = 7.0, help = "Annual mortgage rate in percent")]
    interest_rate: f64,
    #[arg(long, default_value_t = 30, help = "Loan term in years")]
    loan_term: u32,
    #[arg(long, default_value_t = 3_000.0, help = "Expected monthly rent")]
    estimated_rent: f64,
    #[arg(long, default_value_t = 0.0, help = "Monthly HOA dues")]
    hoa: f64,
    #[arg(long, default_value_t = 7_500.0)]
    annual_maintenance: f64,
    #[arg(
        long,
        default_value_t = 1.25,
        help = "Annual property tax in percent of the home price"
    )]
    property_tax_percentage: f64,
    #[arg(
        long,
        help = "Annual property tax amount; overrides --property-tax-percentage"
    )]
    annual_property_tax: Option<f64>,
    #[arg(
        long,
        default_value_t = 10.0,
        help = "Property management fee in percent of rent"
    )]
    property_management_fee_percentage: f64,
    #[arg(long, default_value_t = 0.0)]
    closing_costs: f64,
    #[arg(long, default_value_t = 0.0)]
    initial_repairs: f64,
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = [5, 10, 15],
        help = "Holding periods in years to evaluate ROI at"
    )]
    horizons: Vec<u32>,
    #[arg(
        long,
        value_delimiter = ',',
        allow_hyphen_values = true,
        default_values_t = [2.0, 3.0, 4.0],
        help = "Annual appreciation scenarios in percent"
    )]
    appreciation_rates: Vec<f64>,
    #[arg(
        long,
        default_value_t = 8.0,
        allow_hyphen_values = true,
        help = "Yearly stock-market return the sale scenarios are compared against, in percent"
    )]
    benchmark_rate: f64,
}

// `[5, 10]` in JSON bodies, `"5,10"` in query strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ListParam<T> {
    Items(Vec<T>),
    Csv(String),
}

impl<T: FromStr> ListParam<T> {
    fn into_vec(self, name: &str) -> Result<Vec<T>, String> {
        match self {
            ListParam::Items(items) => Ok(items),
            ListParam::Csv(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<T>()
                        .map_err(|_| format!("{name}: cannot parse '{s}'"))
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EvaluatePayload {
    home_price: Option<f64>,
    downpayment_percentage: Option<f64>,
    interest_rate: Option<f64>,
    loan_term: Option<u32>,
    estimated_rent: Option<f64>,
    hoa: Option<f64>,
    annual_maintenance: Option<f64>,
    property_tax_percentage: Option<f64>,
    annual_property_tax: Option<f64>,
    property_management_fee_percentage: Option<f64>,
    closing_costs: Option<f64>,
    initial_repairs: Option<f64>,
    horizons: Option<ListParam<u32>>,
    appreciation_rates: Option<ListParam<f64>>,
    benchmark_rate: Option<f64>,
}

#[derive(Debug)]
struct ApiRequest {
    inputs: InvestmentInputs,
    projection: ProjectionConfig,
}

// Label -> value, serialized as a JSON object in the configured rate order.
#[derive(Debug)]
struct RateTable<T>(Vec<(String, T)>);

impl<T: Serialize> Serialize for RateTable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(label, value)| (label, value)))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExpensesResponse {
    monthly: ExpenseBreakdown,
    yearly: ExpenseBreakdown,
    monthly_total_costs: f64,
    yearly_total_costs: f64,
    yearly_shares: ExpenseBreakdown,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EvaluateResponse {
    summary: InvestmentSummary,
    amortization: Vec<AmortizationYear>,
    operating_expenses: ExpensesResponse,
    cash_flow: CashFlow,
    #[serde(rename = "equityROI")]
    equity_roi: BTreeMap<u32, RateTable<f64>>,
    equity_projections: BTreeMap<u32, Vec<EquityProjection>>,
    #[serde(rename = "cashFlowROI")]
    cash_flow_roi: BTreeMap<u32, f64>,
    benchmark: BTreeMap<u32, HorizonBenchmark>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_request(cli: Cli) -> Result<ApiRequest, String> {
    if !cli.home_price.is_finite() || cli.home_price <= 0.0 {
        return Err("--home-price must be > 0".to_string());
    }

    if !(0.0..=100.0).contains(&cli.downpayment_percentage) {
        return Err("--downpayment-percentage must be between 0 and 100".to_string());
    }

    if !(0.0..=100.0).contains(&cli.interest_rate) {
        return Err("--interest-rate must be between 0 and 100".to_string());
    }

    if !(1..=MAX_LOAN_TERM_YEARS).contains(&cli.loan_term) {
        return Err(format!(
            "--loan-term must be between 1 and {MAX_LOAN_TERM_YEARS} years"
        ));
    }

    for (name, value) in [
        ("--estimated-rent", cli.estimated_rent),
        ("--hoa", cli.hoa),
        ("--annual-maintenance", cli.annual_maintenance),
        ("--closing-costs", cli.closing_costs),
        ("--initial-repairs", cli.initial_repairs),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(format!("{name} must be >= 0"));
        }
    }

    for (name, rate) in [
        ("--property-tax-percentage", cli.property_tax_percentage),
        (
            "--property-management-fee-percentage",
            cli.property_management_fee_percentage,
        ),
    ] {
        if !(0.0..=100.0).contains(&rate) {
            return Err(format!("{name} must be between 0 and 100"));
        }
    }

    if let Some(tax) = cli.annual_property_tax {
        if !tax.is_finite() || tax < 0.0 {
            return Err("--annual-property-tax must be >= 0".to_string());
        }
    }

    let projection = ProjectionConfig {
        horizons: cli.horizons,
        appreciation_rates: cli.appreciation_rates,
        benchmark_rate: cli.benchmark_rate,
    };
    projection
        .validate()
        .map_err(|e| format!("--horizons/--appreciation-rates/--benchmark-rate: {e}"))?;

    Ok(ApiRequest {
        inputs: InvestmentInputs {
            home_price: cli.home_price,
            downpayment_percentage: cli.downpayment_percentage,
            interest_rate: cli.interest_rate,
            loan_term: cli.loan_term,
            estimated_rent: cli.estimated_rent,
            hoa: cli.hoa,
            annual_maintenance: cli.annual_maintenance,
            property_tax_percentage: cli.property_tax_percentage,
            property_management_fee_percentage: cli.property_management_fee_percentage,
            annual_property_tax: cli.annual_property_tax,
            closing_costs: cli.closing_costs,
            initial_repairs: cli.initial_repairs,
        },
        projection,
    })
}

pub fn run_cli_evaluation(cli: Cli) -> Result<String, String> {
    let request = build_request(cli)?;
    let report = evaluate_with(&request.inputs, &request.projection).map_err(|e| e.to_string())?;
    debug!(
        monthly_cash_flow = report.cash_flow.monthly_cash_flow,
        "evaluated property from CLI"
    );
    serde_json::to_string_pretty(&build_evaluate_response(&report))
        .map_err(|e| format!("failed to serialize report: {e}"))
}

fn router() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/evaluate",
            get(evaluate_get_handler).post(evaluate_post_handler),
        )
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "rental API listening");
    info!("local access: http://127.0.0.1:{port}/api/evaluate");

    axum::serve(listener, router()).await
}

async fn health_handler() -> impl IntoResponse {
    with_cache_control("ok")
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn evaluate_get_handler(Query(payload): Query<EvaluatePayload>) -> Response {
    evaluate_handler_impl(payload).await
}

async fn evaluate_post_handler(Json(payload): Json<EvaluatePayload>) -> Response {
    evaluate_handler_impl(payload).await
}

async fn evaluate_handler_impl(payload: EvaluatePayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => {
            warn!(error = %msg, "rejected evaluate request");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    let report = match evaluate_with(&request.inputs, &request.projection) {
        Ok(report) => report,
        Err(e) => {
            warn!(error = %e, "evaluation failed");
            return error_response(StatusCode::UNPROCESSABLE_ENTITY, &e.to_string());
        }
    };

    info!(
        home_price = request.inputs.home_price,
        monthly_cash_flow = report.cash_flow.monthly_cash_flow,
        "evaluated property"
    );
    json_response(StatusCode::OK, build_evaluate_response(&report))
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
    let payload = serde_json::from_str::<EvaluatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: EvaluatePayload) -> Result<ApiRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.home_price {
        cli.home_price = v;
    }
    if let Some(v) = payload.downpayment_percentage {
        cli.downpayment_percentage = v;
    }
    if let Some(v) = payload.interest_rate {
        cli.interest_rate = v;
    }
    if let Some(v) = payload.loan_term {
        cli.loan_term = v;
    }
    if let Some(v) = payload.estimated_rent {
        cli.estimated_rent = v;
    }
    if let Some(v) = payload.hoa {
        cli.hoa = v;
    }
    if let Some(v) = payload.annual_maintenance {
        cli.annual_maintenance = v;
    }
    if let Some(v) = payload.property_tax_percentage {
        cli.property_tax_percentage = v;
    }
    if payload.annual_property_tax.is_some() {
        cli.annual_property_tax = payload.annual_property_tax;
    }
    if let Some(v) = payload.property_management_fee_percentage {
        cli.property_management_fee_percentage = v;
    }
    if let Some(v) = payload.closing_costs {
        cli.closing_costs = v;
    }
    if let Some(v) = payload.initial_repairs {
        cli.initial_repairs = v;
    }
    if let Some(v) = payload.horizons {
        cli.horizons = v.into_vec("horizons")?;
    }
    if let Some(v) = payload.appreciation_rates {
        cli.appreciation_rates = v.into_vec("appreciationRates")?;
    }
    if let Some(v) = payload.benchmark_rate {
        cli.benchmark_rate = v;
    }

    build_request(cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        home_price: 500_000.0,
        downpayment_percentage: 60.0,
        interest_rate: 7.0,
        loan_term: 30,
        estimated_rent: 3_000.0,
        hoa: 0.0,
        annual_maintenance: 7_500.0,
        property_tax_percentage: 1.25,
        annual_property_tax: None,
        property_management_fee_percentage: 10.0,
        closing_costs: 0.0,
        initial_repairs: 0.0,
        horizons: vec![5, 10, 15],
        appreciation_rates: vec![2.0, 3.0, 4.0],
        benchmark_rate: 8.0,
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round_breakdown(b: &ExpenseBreakdown) -> ExpenseBreakdown {
    ExpenseBreakdown {
        rent: round_cents(b.rent),
        property_tax: round_cents(b.property_tax),
        hoa: round_cents(b.hoa),
        maintenance: round_cents(b.maintenance),
        property_management_fee: round_cents(b.property_management_fee),
        mortgage: round_cents(b.mortgage),
    }
}

fn round_projection(p: &EquityProjection) -> EquityProjection {
    EquityProjection {
        label: p.label.clone(),
        appreciation_rate: p.appreciation_rate,
        future_value: round_cents(p.future_value),
        capital_gain: round_cents(p.capital_gain),
        total_cash_flow: round_cents(p.total_cash_flow),
        roi_percent: round_cents(p.roi_percent),
    }
}

fn round_horizon_benchmark(h: &HorizonBenchmark) -> HorizonBenchmark {
    HorizonBenchmark {
        sales: h
            .sales
            .iter()
            .map(|s| SaleProjection {
                label: s.label.clone(),
                appreciation_rate: s.appreciation_rate,
                sale_price: round_cents(s.sale_price),
                rent_total: round_cents(s.rent_total),
                interest_cost: round_cents(s.interest_cost),
                total_proceeds: round_cents(s.total_proceeds),
                net_profit: round_cents(s.net_profit),
                roi_percent: round_cents(s.roi_percent),
                cagr_percent: round_cents(s.cagr_percent),
            })
            .collect(),
        stock: StockProjection {
            final_value: round_cents(h.stock.final_value),
            profit: round_cents(h.stock.profit),
            roi_percent: round_cents(h.stock.roi_percent),
            cagr_percent: round_cents(h.stock.cagr_percent),
            simple_return_percent: round_cents(h.stock.simple_return_percent),
        },
    }
}

// Rounding happens here only; the report keeps full precision.
fn build_evaluate_response(report: &Report) -> EvaluateResponse {
    let summary = &report.summary;
    let expenses = &report.operating_expenses;

    EvaluateResponse {
        summary: InvestmentSummary {
            downpayment: round_cents(summary.downpayment),
            loan_amount: round_cents(summary.loan_amount),
            total_investment: round_cents(summary.total_investment),
            total_interest_paid: round_cents(summary.total_interest_paid),
            total_principal_paid: round_cents(summary.total_principal_paid),
        },
        amortization: report
            .amortization
            .iter()
            .map(|y| AmortizationYear {
                year: y.year,
                interest_paid: round_cents(y.interest_paid),
                principal_paid: round_cents(y.principal_paid),
                monthly_payment: round_cents(y.monthly_payment),
                remaining_balance: round_cents(y.remaining_balance),
            })
            .collect(),
        operating_expenses: ExpensesResponse {
            monthly: round_breakdown(&expenses.monthly),
            yearly: round_breakdown(&expenses.yearly),
            monthly_total_costs: round_cents(expenses.monthly.total_costs()),
            yearly_total_costs: round_cents(expenses.yearly.total_costs()),
            yearly_shares: round_breakdown(&report.expense_shares),
        },
        cash_flow: CashFlow {
            monthly_cash_flow: round_cents(report.cash_flow.monthly_cash_flow),
            yearly_cash_flow: round_cents(report.cash_flow.yearly_cash_flow),
        },
        equity_roi: report
            .equity_roi
            .by_horizon
            .iter()
            .map(|(horizon, by_rate)| {
                let rois = by_rate
                    .iter()
                    .map(|p| (p.label.clone(), round_cents(p.roi_percent)))
                    .collect();
                (*horizon, RateTable(rois))
            })
            .collect(),
        equity_projections: report
            .equity_roi
            .by_horizon
            .iter()
            .map(|(horizon, by_rate)| (*horizon, by_rate.iter().map(round_projection).collect()))
            .collect(),
        cash_flow_roi: report
            .cash_flow_roi
            .by_horizon
            .iter()
            .map(|(horizon, roi)| (*horizon, round_cents(*roi)))
            .collect(),
        benchmark: report
            .benchmark
            .by_horizon
            .iter()
            .map(|(horizon, h)| (*horizon, round_horizon_benchmark(h)))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::evaluate;

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

    async fn response_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        serde_json::from_slice(&bytes).expect("body should be JSON")
    }

    #[test]
    fn cli_parses_subcommand_and_lists() {
        let app = App::try_parse_from([
            "rental",
            "evaluate",
            "--home-price",
            "350000",
            "--horizons",
            "3,7",
            "--appreciation-rates=-1,2.5",
            "--benchmark-rate",
            "6.5",
        ])
        .expect("args should parse");

        let Command::Evaluate(cli) = app.command else {
            panic!("expected evaluate subcommand");
        };
        assert_approx(cli.home_price, 350_000.0);
        assert_eq!(cli.horizons, vec![3, 7]);
        assert_eq!(cli.appreciation_rates, vec![-1.0, 2.5]);
        assert_approx(cli.benchmark_rate, 6.5);
        assert_approx(cli.downpayment_percentage, 60.0);
    }

    #[test]
    fn serve_defaults_to_port_8080() {
        let app = App::try_parse_from(["rental", "serve"]).expect("args should parse");
        assert!(matches!(app.command, Command::Serve { port: 8080 }));
    }

    #[test]
    fn build_request_rejects_out_of_range_downpayment() {
        let mut cli = sample_cli();
        cli.downpayment_percentage = 120.0;

        let err = build_request(cli).expect_err("must reject > 100%");
        assert!(err.contains("--downpayment-percentage"));
    }

    #[test]
    fn build_request_rejects_zero_loan_term() {
        let mut cli = sample_cli();
        cli.loan_term = 0;

        let err = build_request(cli).expect_err("must reject zero term");
        assert!(err.contains("--loan-term"));
    }

    #[test]
    fn build_request_rejects_oversized_loan_term() {
        let mut cli = sample_cli();
        cli.loan_term = MAX_LOAN_TERM_YEARS + 1;

        let err = build_request(cli).expect_err("must reject long term");
        assert!(err.contains("--loan-term"));
    }

    #[test]
    fn build_request_rejects_negative_costs() {
        let mut cli = sample_cli();
        cli.closing_costs = -1.0;

        let err = build_request(cli).expect_err("must reject negative costs");
        assert!(err.contains("--closing-costs"));
    }

    #[test]
    fn build_request_rejects_duplicate_horizons() {
        let mut cli = sample_cli();
        cli.horizons = vec![5, 5];

        let err = build_request(cli).expect_err("must reject duplicates");
        assert!(err.contains("--horizons"));
    }

    #[test]
    fn api_request_from_json_parses_web_keys() {
        let json = r#"{
          "homePrice": 400000,
          "downpaymentPercentage": 25,
          "interestRate": 6.5,
          "loanTerm": 15,
          "estimatedRent": 2800,
          "hoa": 120,
          "annualMaintenance": 4000,
          "propertyTaxPercentage": 1.1,
          "annualPropertyTax": 4200,
          "propertyManagementFeePercentage": 8,
          "closingCosts": 9000,
          "initialRepairs": 3000,
          "horizons": [5, 20],
          "appreciationRates": [1.5, 3]
        }"#;
        let request = api_request_from_json(json).expect("json should parse");
        let inputs = request.inputs;

        assert_approx(inputs.home_price, 400_000.0);
        assert_approx(inputs.downpayment_percentage, 25.0);
        assert_approx(inputs.interest_rate, 6.5);
        assert_eq!(inputs.loan_term, 15);
        assert_approx(inputs.estimated_rent, 2_800.0);
        assert_approx(inputs.hoa, 120.0);
        assert_approx(inputs.annual_maintenance, 4_000.0);
        assert_approx(inputs.property_tax_percentage, 1.1);
        assert_eq!(inputs.annual_property_tax, Some(4_200.0));
        assert_approx(inputs.property_management_fee_percentage, 8.0);
        assert_approx(inputs.closing_costs, 9_000.0);
        assert_approx(inputs.initial_repairs, 3_000.0);
        assert_eq!(request.projection.horizons, vec![5, 20]);
        assert_eq!(request.projection.appreciation_rates, vec![1.5, 3.0]);
    }

    #[test]
    fn api_request_accepts_comma_separated_lists() {
        let json = r#"{ "horizons": "1, 2,3", "appreciationRates": "0,5" }"#;
        let request = api_request_from_json(json).expect("json should parse");
        assert_eq!(request.projection.horizons, vec![1, 2, 3]);
        assert_eq!(request.projection.appreciation_rates, vec![0.0, 5.0]);

        let bad = r#"{ "horizons": "5,ten" }"#;
        let err = api_request_from_json(bad).expect_err("must reject bad list");
        assert!(err.contains("horizons"));
    }

    #[test]
    fn query_string_lists_are_comma_separated() {
        let uri: axum::http::Uri =
            "http://localhost/api/evaluate?homePrice=420000&horizons=5,20&appreciationRates=1.5,3&benchmarkRate=7"
                .parse()
                .expect("valid uri");
        let Query(payload) =
            Query::<EvaluatePayload>::try_from_uri(&uri).expect("query should deserialize");
        let request = api_request_from_payload(payload).expect("valid request");

        assert_approx(request.inputs.home_price, 420_000.0);
        assert_eq!(request.projection.horizons, vec![5, 20]);
        assert_eq!(request.projection.appreciation_rates, vec![1.5, 3.0]);
        assert_approx(request.projection.benchmark_rate, 7.0);
        assert_eq!(request.inputs.loan_term, 30);
    }

    #[test]
    fn empty_payload_uses_calculator_defaults() {
        let request = api_request_from_json("{}").expect("defaults are valid");
        assert_approx(request.inputs.home_price, 500_000.0);
        assert_eq!(request.inputs.loan_term, 30);
        assert_eq!(request.projection, ProjectionConfig::default());
    }

    #[test]
    fn response_rounds_to_cents_and_uses_camel_case_keys() {
        let request = build_request(sample_cli()).expect("valid inputs");
        let report = evaluate(&request.inputs).expect("valid report");
        let response = build_evaluate_response(&report);
        let json = serde_json::to_value(&response).expect("response should serialize");

        assert_eq!(json["equityROI"]["5"]["2Percent"].as_f64(), Some(21.82));
        assert_eq!(json["cashFlowROI"]["5"].as_f64(), Some(4.47));
        assert_eq!(json["cashFlow"]["monthlyCashFlow"].as_f64(), Some(223.56));
        assert_eq!(
            json["operatingExpenses"]["monthly"]["propertyTax"].as_f64(),
            Some(520.83)
        );
        assert_eq!(
            json["amortization"][0]["monthlyPayment"].as_f64(),
            Some(1330.6)
        );
        assert_eq!(json["summary"]["loanAmount"].as_f64(), Some(200_000.0));
        assert_eq!(
            json["equityProjections"]["15"][2]["label"].as_str(),
            Some("4Percent")
        );
        assert!(json["equityProjections"]["15"][2]["futureValue"].is_number());
        assert_eq!(json["amortization"].as_array().map(Vec::len), Some(30));
        assert_eq!(
            json["benchmark"]["5"]["sales"][0]["roiPercent"].as_f64(),
            Some(32.41)
        );
        assert_eq!(
            json["benchmark"]["5"]["stock"]["finalValue"].as_f64(),
            Some(734_664.04)
        );
        assert_eq!(
            json["benchmark"]["15"]["stock"]["simpleReturnPercent"].as_f64(),
            Some(120.0)
        );
        assert!(json["operatingExpenses"]["yearlyShares"]["mortgage"].is_number());
    }

    #[test]
    fn equity_roi_keys_follow_configured_rate_order() {
        let mut cli = sample_cli();
        cli.horizons = vec![5];
        cli.appreciation_rates = vec![2.0, 10.0, -1.0];
        let request = build_request(cli).expect("valid inputs");
        let report = evaluate_with(&request.inputs, &request.projection).expect("valid report");
        let response = build_evaluate_response(&report);

        let json = serde_json::to_string(&response.equity_roi[&5]).expect("serializes");
        let positions: Vec<usize> = ["\"2Percent\"", "\"10Percent\"", "\"-1Percent\""]
            .iter()
            .map(|key| json.find(key).expect("label present"))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{json}");
    }

    #[test]
    fn run_cli_evaluation_reports_engine_errors() {
        let mut cli = sample_cli();
        cli.downpayment_percentage = 0.0;

        let err = run_cli_evaluation(cli).expect_err("ROI undefined");
        assert!(err.contains("ROI is undefined"));
    }

    #[test]
    fn run_cli_evaluation_prints_report_json() {
        let out = run_cli_evaluation(sample_cli()).expect("valid inputs");
        assert!(out.contains("\"equityROI\""));
        assert!(out.contains("\"cashFlowROI\""));
        assert!(out.contains("\"operatingExpenses\""));
    }

    #[tokio::test]
    async fn evaluate_handler_returns_report() {
        let payload = EvaluatePayload {
            home_price: Some(300_000.0),
            ..EvaluatePayload::default()
        };
        let response = evaluate_handler_impl(payload).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).map(|v| v.as_bytes()),
            Some(&b"no-store"[..])
        );

        let body = response_json(response).await;
        assert_eq!(body["summary"]["downpayment"].as_f64(), Some(180_000.0));
        assert!(body["equityROI"]["10"]["3Percent"].is_number());
    }

    #[tokio::test]
    async fn evaluate_handler_rejects_invalid_input() {
        let payload = EvaluatePayload {
            home_price: Some(-5.0),
            ..EvaluatePayload::default()
        };
        let response = evaluate_handler_impl(payload).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response_json(response).await;
        let error = body["error"].as_str().expect("error message");
        assert!(error.contains("--home-price"));
    }

    #[tokio::test]
    async fn evaluate_handler_maps_undefined_roi_to_unprocessable() {
        let payload = EvaluatePayload {
            downpayment_percentage: Some(0.0),
            ..EvaluatePayload::default()
        };
        let response = evaluate_handler_impl(payload).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn unknown_route_is_json_not_found() {
        let response = not_found_handler().await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = response_json(response).await;
        assert_eq!(body["error"].as_str(), Some("Not found"));
    }
}
