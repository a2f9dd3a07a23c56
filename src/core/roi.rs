use std::collections::BTreeMap;

use super::error::EngineError;
use super::types::{
    Benchmark, BenchmarkParams, CashFlowRoi, EquityProjection, EquityRoi, HorizonBenchmark,
    ProjectionConfig, RoiParams, SaleProjection, StockProjection,
};

pub fn appreciation_label(rate_percent: f64) -> String {
    if rate_percent.fract() == 0.0 {
        format!("{rate_percent:.0}Percent")
    } else {
        format!("{rate_percent}Percent")
    }
}

fn future_value(initial_value: f64, rate: f64, years: u32) -> f64 {
    initial_value * (1.0 + rate).powf(f64::from(years))
}

fn roi_percent(profit: f64, total_investment: f64) -> Result<f64, EngineError> {
    if total_investment == 0.0 {
        return Err(EngineError::UndefinedRoi { total_investment });
    }
    let roi = profit * 100.0 / total_investment;
    if !roi.is_finite() {
        return Err(EngineError::NonFinite { stage: "roi" });
    }
    Ok(roi)
}

// Zero unless both ends are positive.
fn cagr_percent(initial: f64, final_value: f64, years: u32) -> f64 {
    if initial > 0.0 && final_value > 0.0 {
        ((final_value / initial).powf(1.0 / f64::from(years)) - 1.0) * 100.0
    } else {
        0.0
    }
}

pub fn compute_equity_roi(
    params: &RoiParams,
    projection: &ProjectionConfig,
) -> Result<EquityRoi, EngineError> {
    let mut by_horizon = BTreeMap::new();

    for &years in &projection.horizons {
        let mut by_rate = Vec::with_capacity(projection.appreciation_rates.len());
        for &rate_percent in &projection.appreciation_rates {
            let sale_price = future_value(params.home_price, rate_percent / 100.0, years);
            let capital_gain = sale_price - params.home_price;
            // Flat accumulation, neither compounded nor discounted.
            let total_cash_flow = f64::from(years) * params.annual_cash_flow;
            let roi = roi_percent(total_cash_flow + capital_gain, params.total_investment)?;

            by_rate.push(EquityProjection {
                label: appreciation_label(rate_percent),
                appreciation_rate: rate_percent,
                future_value: sale_price,
                capital_gain,
                total_cash_flow,
                roi_percent: roi,
            });
        }
        by_horizon.insert(years, by_rate);
    }

    Ok(EquityRoi { by_horizon })
}

pub fn compute_cash_flow_roi(
    params: &RoiParams,
    horizons: &[u32],
) -> Result<CashFlowRoi, EngineError> {
    let mut by_horizon = BTreeMap::new();
    for &years in horizons {
        let total_cash_flow = f64::from(years) * params.annual_cash_flow;
        by_horizon.insert(years, roi_percent(total_cash_flow, params.total_investment)?);
    }
    Ok(CashFlowRoi { by_horizon })
}

pub fn compute_benchmark(
    params: &BenchmarkParams,
    projection: &ProjectionConfig,
) -> Result<Benchmark, EngineError> {
    if !params.home_price.is_finite() || params.home_price <= 0.0 {
        return Err(EngineError::invalid("home_price", "must be finite and > 0"));
    }

    let property_value = params.home_price;
    let yearly_interest = params.loan_amount * params.interest_rate / 100.0;
    let mut by_horizon = BTreeMap::new();

    for &years in &projection.horizons {
        let held = f64::from(years);
        let rent_total = params.monthly_rent * 12.0 * held;
        // Interest-only: the loan is carried, never amortized.
        let interest_cost = yearly_interest * held;

        let mut sales = Vec::with_capacity(projection.appreciation_rates.len());
        for &rate_percent in &projection.appreciation_rates {
            let sale_price = future_value(property_value, rate_percent / 100.0, years);
            let total_proceeds = sale_price + rent_total;
            let net_profit = total_proceeds - property_value - interest_cost;
            sales.push(SaleProjection {
                label: appreciation_label(rate_percent),
                appreciation_rate: rate_percent,
                sale_price,
                rent_total,
                interest_cost,
                total_proceeds,
                net_profit,
                roi_percent: net_profit * 100.0 / property_value,
                cagr_percent: cagr_percent(property_value, total_proceeds, years),
            });
        }

        let final_value = future_value(property_value, projection.benchmark_rate / 100.0, years);
        let profit = final_value - property_value;
        let stock = StockProjection {
            final_value,
            profit,
            roi_percent: profit * 100.0 / property_value,
            cagr_percent: projection.benchmark_rate,
            simple_return_percent: projection.benchmark_rate * held,
        };

        let finite = stock.final_value.is_finite()
            && stock.roi_percent.is_finite()
            && sales.iter().all(|s| {
                s.total_proceeds.is_finite() && s.net_profit.is_finite() && s.cagr_percent.is_finite()
            });
        if !finite {
            return Err(EngineError::NonFinite { stage: "benchmark" });
        }

        by_horizon.insert(years, HorizonBenchmark { sales, stock });
    }

    Ok(Benchmark { by_horizon })
}
