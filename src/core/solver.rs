use chrono::NaiveDate;
use serde::Serialize;

use super::simulator::{MAX_SIMULATION_MONTHS, simulate};
use super::types::{DebtRecord, PayoffStrategy};

#[derive(Debug, Clone, Copy)]
pub struct ExtraPaymentSolveConfig {
    pub target_months: u32,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraPaymentSolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_value: f64,
    pub months: u32,
    pub all_paid: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraPaymentSolveResult {
    pub strategy: PayoffStrategy,
    pub target_months: u32,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
    pub solved_value: Option<f64>,
    pub achieved_months: Option<u32>,
    pub payoff_date: Option<NaiveDate>,
    pub iterations: Vec<ExtraPaymentSolveIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

#[derive(Debug, Clone, Copy)]
struct CandidateEval {
    months: u32,
    all_paid: bool,
    payoff_date: NaiveDate,
}

impl CandidateEval {
    fn meets(self, target_months: u32) -> bool {
        self.all_paid && self.months <= target_months
    }
}

pub fn solve_extra_payment(
    debts: &[DebtRecord],
    strategy: PayoffStrategy,
    config: ExtraPaymentSolveConfig,
    today: NaiveDate,
) -> Result<ExtraPaymentSolveResult, String> {
    validate_config(config)?;

    let mut iterations = Vec::with_capacity(config.max_iterations as usize);
    let low_eval = evaluate_candidate(debts, strategy, config.search_min, today);
    let high_eval = evaluate_candidate(debts, strategy, config.search_max, today);

    let mut solved_value = None;
    let mut converged = false;
    let feasible;
    let message;

    if low_eval.meets(config.target_months) {
        solved_value = Some(config.search_min);
        converged = true;
        feasible = true;
        message = "Already debt-free within target at the lower search bound.".to_string();
    } else if !high_eval.meets(config.target_months) {
        feasible = false;
        message = "No extra payment within the search bounds reaches the target.".to_string();
    } else {
        let mut lo = config.search_min;
        let mut hi = config.search_max;
        let mut it = 0;
        while it < config.max_iterations {
            it += 1;
            let mid = (lo + hi) * 0.5;
            let eval = evaluate_candidate(debts, strategy, mid, today);
            iterations.push(ExtraPaymentSolveIteration {
                iteration: it,
                lower_bound: lo,
                upper_bound: hi,
                candidate_value: mid,
                months: eval.months,
                all_paid: eval.all_paid,
            });

            if eval.meets(config.target_months) {
                hi = mid;
            } else {
                lo = mid;
            }

            if (hi - lo).abs() <= config.tolerance {
                converged = true;
                break;
            }
        }
        solved_value = Some(hi);
        feasible = true;
        message = if converged {
            "Solved required extra monthly payment.".to_string()
        } else {
            "Reached max iterations before tolerance was met; returning best estimate."
                .to_string()
        };
    }

    let mut achieved_months = None;
    let mut payoff_date = None;
    if let Some(value) = solved_value {
        let final_eval = evaluate_candidate(debts, strategy, value, today);
        achieved_months = Some(final_eval.months);
        payoff_date = Some(final_eval.payoff_date);
    }

    Ok(ExtraPaymentSolveResult {
        strategy,
        target_months: config.target_months,
        search_min: config.search_min,
        search_max: config.search_max,
        tolerance: config.tolerance,
        max_iterations: config.max_iterations,
        solved_value,
        achieved_months,
        payoff_date,
        iterations,
        converged,
        feasible,
        message,
    })
}

fn evaluate_candidate(
    debts: &[DebtRecord],
    strategy: PayoffStrategy,
    extra_monthly_amount: f64,
    today: NaiveDate,
) -> CandidateEval {
    let result = simulate(debts, extra_monthly_amount, strategy, today);
    CandidateEval {
        months: result.months,
        all_paid: result.all_paid,
        payoff_date: result.payoff_date,
    }
}

fn validate_config(config: ExtraPaymentSolveConfig) -> Result<(), String> {
    if config.target_months == 0 || config.target_months > MAX_SIMULATION_MONTHS {
        return Err(format!(
            "targetMonths must be between 1 and {MAX_SIMULATION_MONTHS}"
        ));
    }
    if !config.search_min.is_finite() || !config.search_max.is_finite() {
        return Err("search bounds must be finite".to_string());
    }
    if config.search_min < 0.0 {
        return Err("searchMin must be >= 0".to_string());
    }
    if config.search_max <= config.search_min {
        return Err("searchMax must be greater than searchMin".to_string());
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err("tolerance must be > 0".to_string());
    }
    if config.max_iterations == 0 {
        return Err("maxIterations must be > 0".to_string());
    }
    Ok(())
}
