use chrono::NaiveDate;
use serde::Serialize;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoffStrategy {
    Avalanche,
    Snowball,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PayoffMonths {
    Finite(u32),
    // Payment at or below the monthly interest.
    Never,
}

impl PayoffMonths {
    pub fn months(self) -> Option<u32> {
        match self {
            PayoffMonths::Finite(months) => Some(months),
            PayoffMonths::Never => None,
        }
    }

    pub fn is_never(self) -> bool {
        self == PayoffMonths::Never
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtRecord {
    pub id: String,
    pub name: String,
    pub balance: f64,
    pub annual_rate_percent: f64,
    pub minimum_payment: f64,
}

impl DebtRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        balance: f64,
        annual_rate_percent: f64,
        minimum_payment: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            balance,
            annual_rate_percent,
            minimum_payment,
        }
    }

    pub fn monthly_rate(&self) -> f64 {
        monthly_rate(self.annual_rate_percent)
    }
}

pub fn monthly_rate(annual_rate_percent: f64) -> f64 {
    annual_rate_percent / 100.0 / 12.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationRow {
    pub month: u32,
    pub payment: f64,
    pub principal: f64,
    pub interest: f64,
    pub unpaid_interest: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePoint {
    pub month: u32,
    pub total_balance: f64,
    pub total_interest_paid: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaidOffDebt {
    pub id: String,
    pub name: String,
    pub month: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub timeline: Vec<TimelinePoint>,
    pub payoff_date: NaiveDate,
    pub total_interest: f64,
    pub debts_paid_order: Vec<PaidOffDebt>,
    pub months: u32,
    pub all_paid: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub total_balance: f64,
    pub total_minimum_payment: f64,
    pub weighted_average_rate: f64,
    pub active_debts: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyOutcome {
    pub months: u32,
    pub all_paid: bool,
    pub total_interest: f64,
    pub payoff_date: NaiveDate,
    pub interest_saved: f64,
    pub months_saved: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyComparison {
    pub extra_monthly_amount: f64,
    pub minimum_only: StrategyOutcome,
    pub avalanche: StrategyOutcome,
    pub snowball: StrategyOutcome,
    pub recommended: PayoffStrategy,
}
