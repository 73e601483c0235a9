mod amortization;
mod simulator;
mod solver;
mod types;

pub use amortization::{
    NOT_APPLICABLE_LABEL, SCHEDULE_BUFFER_MONTHS, add_months, amortization_schedule,
    fixed_payment, months_to_payoff, payoff_date_label, round_to_cents, total_interest,
};
pub use simulator::{
    MAX_SIMULATION_MONTHS, compare_strategies, simulate, sort_debts, summarize_portfolio,
};
pub use solver::{
    ExtraPaymentSolveConfig, ExtraPaymentSolveIteration, ExtraPaymentSolveResult,
    solve_extra_payment,
};
pub use types::{
    AmortizationRow, DebtRecord, PaidOffDebt, PayoffMonths, PayoffStrategy, PortfolioSummary,
    SimulationResult, StrategyComparison, StrategyOutcome, TimelinePoint, monthly_rate,
};
