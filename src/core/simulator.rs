use std::cmp::Ordering;

use chrono::NaiveDate;

use super::amortization::add_months;
use super::types::{
    DebtRecord, PaidOffDebt, PayoffStrategy, PortfolioSummary, SimulationResult,
    StrategyComparison, StrategyOutcome, TimelinePoint,
};

pub const MAX_SIMULATION_MONTHS: u32 = 600;

const INTEREST_TIE_EPS: f64 = 1e-9;

pub fn simulate(
    debts: &[DebtRecord],
    extra_monthly_amount: f64,
    strategy: PayoffStrategy,
    today: NaiveDate,
) -> SimulationResult {
    let mut working = debts.to_vec();
    let mut recorded = working
        .iter()
        .map(|debt| debt.balance <= 0.0)
        .collect::<Vec<_>>();

    let mut timeline = Vec::new();
    timeline.push(TimelinePoint {
        month: 0,
        total_balance: total_balance(&working),
        total_interest_paid: 0.0,
    });

    let mut total_interest = 0.0;
    let mut debts_paid_order = Vec::new();
    let mut month = 0;

    while month < MAX_SIMULATION_MONTHS {
        let Some(target) = priority_target(&working, strategy) else {
            break;
        };
        month += 1;

        for (idx, debt) in working.iter_mut().enumerate() {
            if debt.balance <= 0.0 {
                continue;
            }

            let interest = debt.balance * debt.monthly_rate();
            total_interest += interest;

            let mut payment = debt.minimum_payment;
            if idx == target {
                payment += extra_monthly_amount;
            }

            let principal_paid = (payment - interest).max(0.0);
            debt.balance -= principal_paid;
            if debt.balance <= 0.0 {
                debt.balance = 0.0;
                record_paid_off(debt, month, &mut recorded[idx], &mut debts_paid_order);
            }
        }

        // Minimums no longer owed keep flowing, onto this month's target.
        let freed = freed_cash(debts, &working);
        let target_debt = &mut working[target];
        if freed > 0.0 && target_debt.balance > 0.0 {
            target_debt.balance = (target_debt.balance - freed).max(0.0);
            if target_debt.balance <= 0.0 {
                record_paid_off(
                    target_debt,
                    month,
                    &mut recorded[target],
                    &mut debts_paid_order,
                );
            }
        }

        timeline.push(TimelinePoint {
            month,
            total_balance: total_balance(&working),
            total_interest_paid: total_interest,
        });
    }

    SimulationResult {
        timeline,
        payoff_date: add_months(today, month),
        total_interest,
        debts_paid_order,
        months: month,
        all_paid: working.iter().all(|debt| debt.balance <= 0.0),
    }
}

pub fn sort_debts(debts: &[DebtRecord], strategy: PayoffStrategy) -> Vec<DebtRecord> {
    let mut sorted = debts.to_vec();
    sorted.sort_by(|a, b| priority_cmp(strategy, a, b));
    sorted
}

pub fn summarize_portfolio(debts: &[DebtRecord]) -> PortfolioSummary {
    let mut summary = PortfolioSummary {
        total_balance: 0.0,
        total_minimum_payment: 0.0,
        weighted_average_rate: 0.0,
        active_debts: 0,
    };
    let mut rate_weight = 0.0;
    for debt in debts.iter().filter(|debt| debt.balance > 0.0) {
        summary.total_balance += debt.balance;
        summary.total_minimum_payment += debt.minimum_payment;
        summary.active_debts += 1;
        rate_weight += debt.balance * debt.annual_rate_percent;
    }
    if summary.total_balance > 0.0 {
        summary.weighted_average_rate = rate_weight / summary.total_balance;
    }
    summary
}

pub fn compare_strategies(
    debts: &[DebtRecord],
    extra_monthly_amount: f64,
    today: NaiveDate,
) -> StrategyComparison {
    let baseline = simulate(debts, 0.0, PayoffStrategy::Avalanche, today);
    let avalanche = simulate(debts, extra_monthly_amount, PayoffStrategy::Avalanche, today);
    let snowball = simulate(debts, extra_monthly_amount, PayoffStrategy::Snowball, today);

    let minimum_only = outcome(&baseline, &baseline);
    let avalanche = outcome(&avalanche, &baseline);
    let snowball = outcome(&snowball, &baseline);

    StrategyComparison {
        extra_monthly_amount,
        minimum_only,
        avalanche,
        snowball,
        recommended: recommend(&avalanche, &snowball),
    }
}

fn outcome(result: &SimulationResult, baseline: &SimulationResult) -> StrategyOutcome {
    StrategyOutcome {
        months: result.months,
        all_paid: result.all_paid,
        total_interest: result.total_interest,
        payoff_date: result.payoff_date,
        interest_saved: baseline.total_interest - result.total_interest,
        months_saved: i64::from(baseline.months) - i64::from(result.months),
    }
}

fn recommend(avalanche: &StrategyOutcome, snowball: &StrategyOutcome) -> PayoffStrategy {
    let interest_gap = avalanche.total_interest - snowball.total_interest;
    if interest_gap > INTEREST_TIE_EPS {
        return PayoffStrategy::Snowball;
    }
    if interest_gap.abs() <= INTEREST_TIE_EPS && snowball.months < avalanche.months {
        return PayoffStrategy::Snowball;
    }
    PayoffStrategy::Avalanche
}

fn priority_cmp(strategy: PayoffStrategy, a: &DebtRecord, b: &DebtRecord) -> Ordering {
    match strategy {
        PayoffStrategy::Avalanche => b.annual_rate_percent.total_cmp(&a.annual_rate_percent),
        PayoffStrategy::Snowball => a.balance.total_cmp(&b.balance),
    }
}

// Ties keep input order.
fn priority_target(working: &[DebtRecord], strategy: PayoffStrategy) -> Option<usize> {
    working
        .iter()
        .enumerate()
        .filter(|(_, debt)| debt.balance > 0.0)
        .min_by(|(_, a), (_, b)| priority_cmp(strategy, a, b))
        .map(|(idx, _)| idx)
}

fn freed_cash(original: &[DebtRecord], working: &[DebtRecord]) -> f64 {
    original
        .iter()
        .zip(working)
        .filter(|(_, state)| state.balance <= 0.0)
        .map(|(debt, _)| debt.minimum_payment)
        .sum()
}

fn total_balance(working: &[DebtRecord]) -> f64 {
    working.iter().map(|debt| debt.balance).sum()
}

fn record_paid_off(
    debt: &DebtRecord,
    month: u32,
    recorded: &mut bool,
    order: &mut Vec<PaidOffDebt>,
) {
    if *recorded {
        return;
    }
    *recorded = true;
    order.push(PaidOffDebt {
        id: debt.id.clone(),
        name: debt.name.clone(),
        month,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::amortization::{months_to_payoff, total_interest};
    use crate::core::types::PayoffMonths;
    use proptest::collection::vec;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date")
    }

    fn debt(id: &str, balance: f64, rate: f64, minimum: f64) -> DebtRecord {
        DebtRecord::new(id, format!("Debt {id}"), balance, rate, minimum)
    }

    fn portfolio(raw: &[(u32, u32, u32)]) -> Vec<DebtRecord> {
        raw.iter()
            .enumerate()
            .map(|(idx, &(balance, rate_bp, minimum))| {
                debt(
                    &format!("d{idx}"),
                    balance as f64,
                    rate_bp as f64 / 100.0,
                    minimum as f64,
                )
            })
            .collect()
    }

    fn paid_month(result: &SimulationResult, id: &str) -> Option<u32> {
        result
            .debts_paid_order
            .iter()
            .find(|paid| paid.id == id)
            .map(|paid| paid.month)
    }

    fn paid_ids(result: &SimulationResult) -> Vec<&str> {
        result
            .debts_paid_order
            .iter()
            .map(|paid| paid.id.as_str())
            .collect()
    }

    #[test]
    fn single_debt_matches_closed_form_within_one_month() {
        let debts = vec![debt("card", 1_000.0, 24.0, 50.0)];
        let result = simulate(&debts, 0.0, PayoffStrategy::Avalanche, today());

        let PayoffMonths::Finite(closed_form) = months_to_payoff(1_000.0, 24.0, 50.0) else {
            panic!("payment clears the interest-only threshold");
        };
        // Closed form assumes a full final payment; the simulator clamps the last month.
        assert!(result.months.abs_diff(closed_form) <= 1);
        assert!(result.all_paid);
        assert_eq!(paid_month(&result, "card"), Some(result.months));

        let estimate = total_interest(1_000.0, 50.0, months_to_payoff(1_000.0, 24.0, 50.0));
        assert!(result.total_interest <= estimate + EPS);
        assert!(result.total_interest >= estimate - 50.0);
        assert_approx(
            result.timeline.last().map(|p| p.total_balance).unwrap_or(-1.0),
            0.0,
        );
    }

    #[test]
    fn avalanche_targets_highest_rate_first() {
        let debts = vec![debt("a", 500.0, 20.0, 50.0), debt("b", 2_000.0, 10.0, 80.0)];
        let result = simulate(&debts, 100.0, PayoffStrategy::Avalanche, today());

        assert_eq!(priority_target(&debts, PayoffStrategy::Avalanche), Some(0));
        assert_eq!(paid_ids(&result), vec!["a", "b"]);
        assert!(result.all_paid);
    }

    #[test]
    fn snowball_pays_lower_balance_first_when_rates_match() {
        let debts = vec![debt("big", 3_000.0, 15.0, 60.0), debt("small", 800.0, 15.0, 40.0)];
        let result = simulate(&debts, 50.0, PayoffStrategy::Snowball, today());

        assert_eq!(priority_target(&debts, PayoffStrategy::Snowball), Some(1));
        assert_eq!(paid_ids(&result), vec!["small", "big"]);
    }

    #[test]
    fn avalanche_retires_high_rate_debt_no_later_than_snowball() {
        let debts = vec![
            debt("x", 4_000.0, 25.0, 80.0),
            debt("y", 1_000.0, 5.0, 30.0),
            debt("z", 2_500.0, 12.0, 50.0),
        ];
        let avalanche = simulate(&debts, 300.0, PayoffStrategy::Avalanche, today());
        let snowball = simulate(&debts, 300.0, PayoffStrategy::Snowball, today());

        let avalanche_month = paid_month(&avalanche, "x").expect("x paid under avalanche");
        let snowball_month = paid_month(&snowball, "x").expect("x paid under snowball");
        assert!(avalanche_month <= snowball_month);
        assert_eq!(paid_ids(&avalanche)[0], "x");
        assert_eq!(paid_ids(&snowball)[0], "y");
    }

    #[test]
    fn freed_minimums_roll_onto_current_target() {
        let debts = vec![debt("a", 100.0, 0.0, 100.0), debt("b", 1_000.0, 0.0, 50.0)];
        let result = simulate(&debts, 0.0, PayoffStrategy::Snowball, today());

        // Month 1 pays off a; from month 2 its 100 joins b's 50.
        assert_approx(result.timeline[1].total_balance, 950.0);
        assert_approx(result.timeline[2].total_balance, 800.0);
        assert_approx(result.timeline[3].total_balance, 650.0);
        assert_eq!(paid_month(&result, "a"), Some(1));
        assert_eq!(paid_month(&result, "b"), Some(8));
        assert_eq!(result.months, 8);
    }

    #[test]
    fn already_settled_debt_frees_its_minimum_without_being_recorded() {
        let debts = vec![debt("done", 0.0, 10.0, 40.0), debt("open", 1_000.0, 0.0, 60.0)];
        let result = simulate(&debts, 0.0, PayoffStrategy::Avalanche, today());

        assert_approx(result.timeline[1].total_balance, 900.0);
        assert_eq!(paid_ids(&result), vec!["open"]);
        assert_eq!(result.months, 10);
    }

    #[test]
    fn empty_portfolio_runs_no_months() {
        let result = simulate(&[], 250.0, PayoffStrategy::Snowball, today());

        assert_eq!(result.months, 0);
        assert_eq!(result.timeline.len(), 1);
        assert_approx(result.timeline[0].total_balance, 0.0);
        assert_eq!(result.payoff_date, today());
        assert!(result.all_paid);
        assert!(result.debts_paid_order.is_empty());
    }

    #[test]
    fn zero_payments_stop_at_month_cap() {
        let debts = vec![debt("stuck", 1_000.0, 12.0, 0.0)];
        let result = simulate(&debts, 0.0, PayoffStrategy::Avalanche, today());

        assert_eq!(result.months, MAX_SIMULATION_MONTHS);
        assert_eq!(result.timeline.len(), MAX_SIMULATION_MONTHS as usize + 1);
        assert!(!result.all_paid);
        assert!(result.debts_paid_order.is_empty());
        assert_approx(result.timeline[600].total_balance, 1_000.0);
        assert!((result.total_interest - 6_000.0).abs() < 1e-6);
        assert_eq!(result.payoff_date, NaiveDate::from_ymd_opt(2076, 10, 19).expect("date"));
    }

    #[test]
    fn simulate_is_repeatable_and_leaves_input_untouched() {
        let debts = vec![debt("a", 500.0, 20.0, 50.0), debt("b", 2_000.0, 10.0, 80.0)];
        let snapshot = debts.clone();

        let first = simulate(&debts, 75.0, PayoffStrategy::Snowball, today());
        let second = simulate(&debts, 75.0, PayoffStrategy::Snowball, today());
        assert_eq!(first, second);
        assert_eq!(debts, snapshot);
    }

    #[test]
    fn sort_debts_orders_by_strategy_and_keeps_ties_in_input_order() {
        let debts = vec![
            debt("a", 900.0, 18.0, 30.0),
            debt("b", 400.0, 22.0, 25.0),
            debt("c", 400.0, 18.0, 20.0),
        ];

        let ids = |sorted: Vec<DebtRecord>| sorted.into_iter().map(|d| d.id).collect::<Vec<_>>();
        assert_eq!(ids(sort_debts(&debts, PayoffStrategy::Avalanche)), vec!["b", "a", "c"]);
        assert_eq!(ids(sort_debts(&debts, PayoffStrategy::Snowball)), vec!["b", "c", "a"]);
        assert_eq!(debts[0].id, "a");
    }

    #[test]
    fn summary_weights_rate_by_balance() {
        let debts = vec![
            debt("a", 1_000.0, 20.0, 40.0),
            debt("b", 3_000.0, 10.0, 90.0),
            debt("c", 0.0, 30.0, 25.0),
        ];
        let summary = summarize_portfolio(&debts);

        assert_approx(summary.total_balance, 4_000.0);
        assert_approx(summary.total_minimum_payment, 130.0);
        assert_approx(summary.weighted_average_rate, 12.5);
        assert_eq!(summary.active_debts, 2);
        assert_approx(summarize_portfolio(&[]).weighted_average_rate, 0.0);
    }

    #[test]
    fn comparison_reports_savings_against_minimums_only() {
        let debts = vec![
            debt("x", 4_000.0, 25.0, 120.0),
            debt("y", 1_000.0, 5.0, 30.0),
            debt("z", 2_500.0, 12.0, 60.0),
        ];
        let comparison = compare_strategies(&debts, 200.0, today());

        assert_approx(comparison.minimum_only.interest_saved, 0.0);
        assert_eq!(comparison.minimum_only.months_saved, 0);
        assert!(comparison.avalanche.interest_saved >= 0.0);
        assert!(comparison.avalanche.months_saved >= 0);
        assert_approx(
            comparison.avalanche.interest_saved,
            comparison.minimum_only.total_interest - comparison.avalanche.total_interest,
        );
        assert_eq!(
            comparison.recommended,
            recommend(&comparison.avalanche, &comparison.snowball)
        );
    }

    #[test]
    fn recommend_prefers_lower_interest_then_fewer_months() {
        let base = StrategyOutcome {
            months: 20,
            all_paid: true,
            total_interest: 500.0,
            payoff_date: today(),
            interest_saved: 0.0,
            months_saved: 0,
        };
        let cheaper = StrategyOutcome {
            total_interest: 450.0,
            ..base
        };
        let faster = StrategyOutcome { months: 18, ..base };

        assert_eq!(recommend(&base, &cheaper), PayoffStrategy::Snowball);
        assert_eq!(recommend(&cheaper, &base), PayoffStrategy::Avalanche);
        assert_eq!(recommend(&base, &faster), PayoffStrategy::Snowball);
        assert_eq!(recommend(&base, &base), PayoffStrategy::Avalanche);
    }

    #[test]
    fn snowball_extra_can_raise_interest_by_starving_high_rate_debt() {
        // Extra and freed minimums chase the smallest balance, here a near-zero-rate loan,
        // while the 20% card keeps compounding on its minimum alone.
        let debts = portfolio(&[(11_306, 2_057, 474), (2_162, 45, 362), (10_507, 246, 110)]);

        let without = simulate(&debts, 0.0, PayoffStrategy::Snowball, today());
        let with = simulate(&debts, 180.0, PayoffStrategy::Snowball, today());
        assert!(without.all_paid && with.all_paid);
        assert!(with.months < without.months);
        assert!(
            with.total_interest > without.total_interest + 100.0,
            "with {} without {}",
            with.total_interest,
            without.total_interest
        );

        let avalanche = simulate(&debts, 180.0, PayoffStrategy::Avalanche, today());
        assert!(avalanche.total_interest < with.total_interest);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(32))]

        #[test]
        fn prop_extra_payment_never_increases_avalanche_interest(
            raw in vec((100u32..20_000, 0u32..3_000, 10u32..600), 1..5),
            extra in 1u32..1_000
        ) {
            let debts = portfolio(&raw);

            let without = simulate(&debts, 0.0, PayoffStrategy::Avalanche, today());
            let with = simulate(&debts, extra as f64, PayoffStrategy::Avalanche, today());
            prop_assert!(with.total_interest <= without.total_interest + EPS);
            prop_assert!(with.months <= without.months);
        }

        #[test]
        fn prop_timeline_balance_falls_and_interest_accumulates(
            raw in vec((0u32..20_000, 0u32..3_000, 0u32..600), 0..6),
            extra in 0u32..1_000,
            snowball in proptest::bool::ANY
        ) {
            let debts = portfolio(&raw);
            let strategy = if snowball {
                PayoffStrategy::Snowball
            } else {
                PayoffStrategy::Avalanche
            };

            let result = simulate(&debts, extra as f64, strategy, today());
            prop_assert_eq!(result.timeline[0].month, 0);
            prop_assert_eq!(result.timeline.len(), result.months as usize + 1);
            prop_assert!(result.months <= MAX_SIMULATION_MONTHS);
            for pair in result.timeline.windows(2) {
                prop_assert!(pair[1].total_balance <= pair[0].total_balance);
                prop_assert!(pair[1].total_interest_paid >= pair[0].total_interest_paid);
            }

            let mut seen = std::collections::HashSet::new();
            for paid in &result.debts_paid_order {
                prop_assert!(seen.insert(paid.id.clone()));
            }
        }
    }
}
