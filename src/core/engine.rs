use super::error::EngineError;
use super::roi::{compute_benchmark, compute_cash_flow_roi, compute_equity_roi};
use super::types::{
    AmortizationYear, BenchmarkParams, CashFlow, ExpenseBreakdown, ExpenseParams,
    InvestmentInputs, InvestmentSummary, OperatingExpenses, ProjectionConfig, Report, RoiParams,
};

const MONTHS_PER_YEAR: u32 = 12;
pub const MAX_LOAN_TERM_YEARS: u32 = 50;

pub fn evaluate(inputs: &InvestmentInputs) -> Result<Report, EngineError> {
    evaluate_with(inputs, &ProjectionConfig::default())
}

pub fn evaluate_with(
    inputs: &InvestmentInputs,
    projection: &ProjectionConfig,
) -> Result<Report, EngineError> {
    validate_inputs(inputs)?;
    projection.validate()?;

    let downpayment = inputs.downpayment();
    let loan_amount = inputs.loan_amount();

    let amortization = generate_amortization(loan_amount, inputs.interest_rate, inputs.loan_term)?;
    // An empty schedule means nothing was borrowed.
    let monthly_payment = amortization.first().map_or(0.0, |y| y.monthly_payment);

    let operating_expenses = compute_expenses(&ExpenseParams {
        estimated_rent: inputs.estimated_rent,
        yearly_property_tax: inputs.yearly_property_tax(),
        hoa: inputs.hoa,
        monthly_payment,
        annual_maintenance: inputs.annual_maintenance,
        property_management_fee_percentage: inputs.property_management_fee_percentage,
    });
    let expense_shares = compute_expense_shares(&operating_expenses.yearly);
    let cash_flow = compute_cash_flow(&operating_expenses);
    if !cash_flow.yearly_cash_flow.is_finite() {
        return Err(EngineError::NonFinite { stage: "cash flow" });
    }

    let roi_params = RoiParams {
        home_price: inputs.home_price,
        annual_cash_flow: cash_flow.yearly_cash_flow,
        total_investment: inputs.total_investment(),
    };
    let equity_roi = compute_equity_roi(&roi_params, projection)?;
    let cash_flow_roi = compute_cash_flow_roi(&roi_params, &projection.horizons)?;
    let benchmark = compute_benchmark(
        &BenchmarkParams {
            home_price: inputs.home_price,
            monthly_rent: inputs.estimated_rent,
            loan_amount,
            interest_rate: inputs.interest_rate,
        },
        projection,
    )?;

    let summary = InvestmentSummary {
        downpayment,
        loan_amount,
        total_investment: roi_params.total_investment,
        total_interest_paid: amortization.iter().map(|y| y.interest_paid).sum(),
        total_principal_paid: amortization.iter().map(|y| y.principal_paid).sum(),
    };

    Ok(Report {
        summary,
        amortization,
        operating_expenses,
        expense_shares,
        cash_flow,
        equity_roi,
        cash_flow_roi,
        benchmark,
    })
}

fn validate_inputs(inputs: &InvestmentInputs) -> Result<(), EngineError> {
    if !inputs.home_price.is_finite() || inputs.home_price <= 0.0 {
        return Err(EngineError::invalid("home_price", "must be finite and > 0"));
    }
    if !inputs.downpayment_percentage.is_finite() {
        return Err(EngineError::invalid("downpayment_percentage", "must be finite"));
    }
    if !inputs.interest_rate.is_finite() || inputs.interest_rate < 0.0 {
        return Err(EngineError::invalid("interest_rate", "must be finite and >= 0"));
    }
    check_loan_term(inputs.loan_term)?;

    for (field, value) in [
        ("estimated_rent", inputs.estimated_rent),
        ("hoa", inputs.hoa),
        ("annual_maintenance", inputs.annual_maintenance),
        ("property_tax_percentage", inputs.property_tax_percentage),
        (
            "property_management_fee_percentage",
            inputs.property_management_fee_percentage,
        ),
        ("closing_costs", inputs.closing_costs),
        ("initial_repairs", inputs.initial_repairs),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(EngineError::invalid(field, "must be finite and >= 0"));
        }
    }

    if let Some(tax) = inputs.annual_property_tax {
        if !tax.is_finite() || tax < 0.0 {
            return Err(EngineError::invalid("annual_property_tax", "must be finite and >= 0"));
        }
    }

    Ok(())
}

fn monthly_payment(loan_amount: f64, monthly_rate: f64, number_of_payments: u32) -> f64 {
    let n = f64::from(number_of_payments);
    if monthly_rate == 0.0 {
        return loan_amount / n;
    }
    let denom = 1.0 - (1.0 + monthly_rate).powf(-n);
    if denom == 0.0 {
        // Rates small enough to vanish in (1 + r)^-n behave like a zero rate.
        return loan_amount / n;
    }
    loan_amount * monthly_rate / denom
}

fn check_loan_term(term_years: u32) -> Result<(), EngineError> {
    if !(1..=MAX_LOAN_TERM_YEARS).contains(&term_years) {
        return Err(EngineError::invalid(
            "loan_term",
            format!("must be between 1 and {MAX_LOAN_TERM_YEARS} years"),
        ));
    }
    Ok(())
}

pub fn generate_amortization(
    loan_amount: f64,
    annual_rate_percent: f64,
    term_years: u32,
) -> Result<Vec<AmortizationYear>, EngineError> {
    check_loan_term(term_years)?;
    if !loan_amount.is_finite() {
        return Err(EngineError::invalid("loan_amount", "must be finite"));
    }
    if !annual_rate_percent.is_finite() || annual_rate_percent < 0.0 {
        return Err(EngineError::invalid("interest_rate", "must be finite and >= 0"));
    }

    let monthly_rate = annual_rate_percent / 100.0 / 12.0;
    let number_of_payments = term_years * MONTHS_PER_YEAR;
    let payment = monthly_payment(loan_amount, monthly_rate, number_of_payments);
    if !payment.is_finite() {
        return Err(EngineError::NonFinite {
            stage: "amortization",
        });
    }

    let mut schedule = Vec::with_capacity(term_years as usize);
    let mut balance = loan_amount;
    let mut interest_acc = 0.0;
    let mut principal_acc = 0.0;
    let mut month = 0;

    while balance > 0.0 && month < number_of_payments {
        let interest = balance * monthly_rate;
        let principal = payment - interest;
        balance -= principal;
        if balance < 0.0 {
            balance = 0.0;
        }

        interest_acc += interest;
        principal_acc += principal;

        if (month + 1) % MONTHS_PER_YEAR == 0 || balance == 0.0 {
            schedule.push(AmortizationYear {
                year: month / MONTHS_PER_YEAR + 1,
                interest_paid: interest_acc,
                principal_paid: principal_acc,
                monthly_payment: payment,
                remaining_balance: balance,
            });
            interest_acc = 0.0;
            principal_acc = 0.0;
        }

        month += 1;
    }

    Ok(schedule)
}

pub fn compute_expenses(params: &ExpenseParams) -> OperatingExpenses {
    let yearly_fee =
        params.estimated_rent * 12.0 * params.property_management_fee_percentage / 100.0;

    let monthly = ExpenseBreakdown {
        rent: params.estimated_rent,
        property_tax: params.yearly_property_tax / 12.0,
        hoa: params.hoa,
        maintenance: params.annual_maintenance / 12.0,
        property_management_fee: params.estimated_rent
            * params.property_management_fee_percentage
            / 100.0,
        mortgage: params.monthly_payment,
    };
    let yearly = ExpenseBreakdown {
        rent: params.estimated_rent * 12.0,
        property_tax: params.yearly_property_tax,
        hoa: params.hoa * 12.0,
        maintenance: params.annual_maintenance,
        property_management_fee: yearly_fee,
        mortgage: params.monthly_payment * 12.0,
    };

    OperatingExpenses { monthly, yearly }
}

pub fn compute_expense_shares(yearly: &ExpenseBreakdown) -> ExpenseBreakdown {
    let total = yearly.rent + yearly.total_costs();
    let share = |value: f64| {
        if total == 0.0 {
            0.0
        } else {
            value * 100.0 / total
        }
    };

    ExpenseBreakdown {
        rent: share(yearly.rent),
        property_tax: share(yearly.property_tax),
        hoa: share(yearly.hoa),
        maintenance: share(yearly.maintenance),
        property_management_fee: share(yearly.property_management_fee),
        mortgage: share(yearly.mortgage),
    }
}

pub fn compute_cash_flow(expenses: &OperatingExpenses) -> CashFlow {
    let monthly_cash_flow = expenses.monthly.rent - expenses.monthly.total_costs();
    CashFlow {
        monthly_cash_flow,
        yearly_cash_flow: monthly_cash_flow * 12.0,
    }
}
