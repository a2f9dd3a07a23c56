use std::collections::BTreeMap;

use serde::Serialize;

use super::error::EngineError;

#[derive(Debug, Clone, PartialEq)]
pub struct InvestmentInputs {
    pub home_price: f64,
    pub downpayment_percentage: f64,
    pub interest_rate: f64,
    pub loan_term: u32,
    pub estimated_rent: f64,
    pub hoa: f64,
    pub annual_maintenance: f64,
    pub property_tax_percentage: f64,
    pub property_management_fee_percentage: f64,
    // Replaces the percentage-derived yearly property tax when set.
    pub annual_property_tax: Option<f64>,
    pub closing_costs: f64,
    pub initial_repairs: f64,
}

impl InvestmentInputs {
    pub fn downpayment(&self) -> f64 {
        self.home_price * self.downpayment_percentage / 100.0
    }

    pub fn loan_amount(&self) -> f64 {
        self.home_price - self.downpayment()
    }

    pub fn total_investment(&self) -> f64 {
        self.downpayment() + self.closing_costs + self.initial_repairs
    }

    pub fn yearly_property_tax(&self) -> f64 {
        self.annual_property_tax
            .unwrap_or(self.home_price * self.property_tax_percentage / 100.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionConfig {
    pub horizons: Vec<u32>,
    pub appreciation_rates: Vec<f64>,
    pub benchmark_rate: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            horizons: vec![5, 10, 15],
            appreciation_rates: vec![2.0, 3.0, 4.0],
            benchmark_rate: 8.0,
        }
    }
}

impl ProjectionConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.horizons.is_empty() {
            return Err(EngineError::InvalidProjection(
                "at least one horizon is required".to_string(),
            ));
        }
        if self.appreciation_rates.is_empty() {
            return Err(EngineError::InvalidProjection(
                "at least one appreciation rate is required".to_string(),
            ));
        }
        for (i, horizon) in self.horizons.iter().enumerate() {
            if *horizon == 0 {
                return Err(EngineError::InvalidProjection(
                    "horizons must be >= 1 year".to_string(),
                ));
            }
            if self.horizons[..i].contains(horizon) {
                return Err(EngineError::InvalidProjection(format!(
                    "duplicate horizon {horizon}"
                )));
            }
        }
        for (i, rate) in self.appreciation_rates.iter().enumerate() {
            if !rate.is_finite() || *rate <= -100.0 {
                return Err(EngineError::InvalidProjection(format!(
                    "appreciation rate {rate} must be finite and > -100"
                )));
            }
            if self.appreciation_rates[..i].contains(rate) {
                return Err(EngineError::InvalidProjection(format!(
                    "duplicate appreciation rate {rate}"
                )));
            }
        }
        if !self.benchmark_rate.is_finite() || self.benchmark_rate <= -100.0 {
            return Err(EngineError::InvalidProjection(format!(
                "benchmark rate {} must be finite and > -100",
                self.benchmark_rate
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationYear {
    pub year: u32,
    pub interest_paid: f64,
    pub principal_paid: f64,
    pub monthly_payment: f64,
    pub remaining_balance: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct ExpenseParams {
    pub estimated_rent: f64,
    pub yearly_property_tax: f64,
    pub hoa: f64,
    pub monthly_payment: f64,
    pub annual_maintenance: f64,
    pub property_management_fee_percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseBreakdown {
    pub rent: f64,
    pub property_tax: f64,
    pub hoa: f64,
    pub maintenance: f64,
    pub property_management_fee: f64,
    pub mortgage: f64,
}

impl ExpenseBreakdown {
    pub fn total_costs(&self) -> f64 {
        self.property_tax + self.hoa + self.maintenance + self.property_management_fee + self.mortgage
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatingExpenses {
    pub monthly: ExpenseBreakdown,
    pub yearly: ExpenseBreakdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlow {
    pub monthly_cash_flow: f64,
    pub yearly_cash_flow: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct RoiParams {
    pub home_price: f64,
    pub annual_cash_flow: f64,
    pub total_investment: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquityProjection {
    pub label: String,
    pub appreciation_rate: f64,
    pub future_value: f64,
    pub capital_gain: f64,
    pub total_cash_flow: f64,
    pub roi_percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EquityRoi {
    pub by_horizon: BTreeMap<u32, Vec<EquityProjection>>,
}

impl EquityRoi {
    pub fn get(&self, horizon: u32, label: &str) -> Option<&EquityProjection> {
        self.by_horizon
            .get(&horizon)?
            .iter()
            .find(|p| p.label == label)
    }

    pub fn roi(&self, horizon: u32, label: &str) -> Option<f64> {
        self.get(horizon, label).map(|p| p.roi_percent)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CashFlowRoi {
    pub by_horizon: BTreeMap<u32, f64>,
}

impl CashFlowRoi {
    pub fn roi(&self, horizon: u32) -> Option<f64> {
        self.by_horizon.get(&horizon).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentSummary {
    pub downpayment: f64,
    pub loan_amount: f64,
    pub total_investment: f64,
    pub total_interest_paid: f64,
    pub total_principal_paid: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct BenchmarkParams {
    pub home_price: f64,
    pub monthly_rent: f64,
    pub loan_amount: f64,
    pub interest_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleProjection {
    pub label: String,
    pub appreciation_rate: f64,
    pub sale_price: f64,
    pub rent_total: f64,
    pub interest_cost: f64,
    pub total_proceeds: f64,
    pub net_profit: f64,
    pub roi_percent: f64,
    pub cagr_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockProjection {
    pub final_value: f64,
    pub profit: f64,
    pub roi_percent: f64,
    pub cagr_percent: f64,
    pub simple_return_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HorizonBenchmark {
    pub sales: Vec<SaleProjection>,
    pub stock: StockProjection,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Benchmark {
    pub by_horizon: BTreeMap<u32, HorizonBenchmark>,
}

impl Benchmark {
    pub fn sale(&self, horizon: u32, label: &str) -> Option<&SaleProjection> {
        self.by_horizon
            .get(&horizon)?
            .sales
            .iter()
            .find(|s| s.label == label)
    }

    pub fn stock(&self, horizon: u32) -> Option<&StockProjection> {
        self.by_horizon.get(&horizon).map(|h| &h.stock)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub summary: InvestmentSummary,
    pub amortization: Vec<AmortizationYear>,
    pub operating_expenses: OperatingExpenses,
    // Percent of rent plus all yearly costs.
    pub expense_shares: ExpenseBreakdown,
    pub cash_flow: CashFlow,
    pub equity_roi: EquityRoi,
    pub cash_flow_roi: CashFlowRoi,
    pub benchmark: Benchmark,
}
