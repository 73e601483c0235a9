use chrono::{Months, NaiveDate};

use super::types::{AmortizationRow, PayoffMonths, monthly_rate};

pub const SCHEDULE_BUFFER_MONTHS: u32 = 120;

pub const NOT_APPLICABLE_LABEL: &str = "N/A";

pub fn months_to_payoff(
    balance: f64,
    annual_rate_percent: f64,
    monthly_payment: f64,
) -> PayoffMonths {
    if balance <= 0.0 {
        return PayoffMonths::Finite(0);
    }
    if monthly_payment <= 0.0 {
        return PayoffMonths::Never;
    }

    let r = monthly_rate(annual_rate_percent);
    if monthly_payment <= balance * r {
        return PayoffMonths::Never;
    }

    let months = if r == 0.0 {
        balance / monthly_payment
    } else {
        -(1.0 - balance * r / monthly_payment).ln() / (1.0 + r).ln()
    };
    let months = months.ceil();
    if !months.is_finite() || months > f64::from(u32::MAX) {
        return PayoffMonths::Never;
    }

    PayoffMonths::Finite(months as u32)
}

pub fn total_interest(balance: f64, monthly_payment: f64, months: PayoffMonths) -> f64 {
    match months {
        PayoffMonths::Finite(months) if months > 0 => {
            (monthly_payment * months as f64 - balance).max(0.0)
        }
        _ => 0.0,
    }
}

pub fn add_months(today: NaiveDate, months: u32) -> NaiveDate {
    today
        .checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}

pub fn payoff_date_label(months: PayoffMonths, today: NaiveDate) -> String {
    match months {
        PayoffMonths::Finite(months) if months > 0 => {
            add_months(today, months).format("%b %Y").to_string()
        }
        _ => NOT_APPLICABLE_LABEL.to_string(),
    }
}

pub fn fixed_payment(principal: f64, annual_rate_percent: f64, term_months: u32) -> f64 {
    if term_months == 0 || principal <= 0.0 {
        return 0.0;
    }

    let r = monthly_rate(annual_rate_percent);
    if r == 0.0 {
        return principal / term_months as f64;
    }

    let growth = (1.0 + r).powf(term_months as f64);
    round_to_cents(principal * (r * growth) / (growth - 1.0))
}

pub fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

pub fn amortization_schedule(
    principal: f64,
    annual_rate_percent: f64,
    term_months: u32,
    monthly_payment: Option<f64>,
) -> Vec<AmortizationRow> {
    if principal <= 0.0 {
        return Vec::new();
    }

    let payment = monthly_payment
        .unwrap_or_else(|| fixed_payment(principal, annual_rate_percent, term_months));
    let r = monthly_rate(annual_rate_percent);
    let max_rows = term_months.saturating_add(SCHEDULE_BUFFER_MONTHS);

    let mut rows = Vec::new();
    let mut balance = principal;
    let mut month = 0;
    while balance > 0.0 && month < max_rows {
        month += 1;
        let interest = balance * r;
        let paid = payment.min(balance + interest).max(0.0);
        // A payment short of interest leaves principal untouched; the gap is not capitalized.
        let principal_paid = (paid - interest).clamp(0.0, balance);
        balance = (balance - principal_paid).max(0.0);
        rows.push(AmortizationRow {
            month,
            payment: paid,
            principal: principal_paid,
            interest,
            unpaid_interest: (interest - paid).max(0.0),
            balance,
        });
    }
    rows
}
