mod engine;
mod error;
mod roi;
mod types;

pub use engine::{
    MAX_LOAN_TERM_YEARS, compute_cash_flow, compute_expense_shares, compute_expenses, evaluate,
    evaluate_with, generate_amortization,
};
pub use error::EngineError;
pub use roi::{appreciation_label, compute_benchmark, compute_cash_flow_roi, compute_equity_roi};
pub use types::{
    AmortizationYear, Benchmark, BenchmarkParams, CashFlow, CashFlowRoi, EquityProjection,
    EquityRoi, ExpenseBreakdown, ExpenseParams, HorizonBenchmark, InvestmentInputs,
    InvestmentSummary, OperatingExpenses, ProjectionConfig, Report, RoiParams, SaleProjection,
    StockProjection,
};
