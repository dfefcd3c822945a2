//! Property tests for the cash balancer.
//!
//! Prices and balances are whole dollars so that every share value is exact
//! and results can be compared without tolerance.

use proptest::prelude::*;

use cash_balancer::{calculate, Portfolio, PortfolioError, Position};

/// Up to six positions with targets normalized to a full allocation.
fn arb_portfolio() -> impl Strategy<Value = Portfolio> {
    (
        0u32..5_000,
        proptest::collection::vec((0u64..50, 1u32..500, 0u32..100), 0..6),
    )
        .prop_map(|(balance, lines)| {
            let weights: u32 = lines.iter().map(|(_, _, w)| w).sum();
            let positions = lines
                .iter()
                .enumerate()
                .map(|(i, (quantity, price, weight))| {
                    let target = if weights == 0 {
                        100.0 / lines.len() as f64
                    } else {
                        *weight as f64 * 100.0 / weights as f64
                    };
                    Position::new(&format!("T{}", i), *quantity, *price as f64, target)
                })
                .collect();
            Portfolio::new(balance as f64, positions)
        })
}

fn total(p: &Portfolio) -> f64 {
    p.total_available()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_value_is_conserved(p in arb_portfolio()) {
        let r = calculate(&p).unwrap();
        prop_assert_eq!(total(&r), total(&p));
    }

    #[test]
    fn prop_never_sells_or_overspends(p in arb_portfolio()) {
        let r = calculate(&p).unwrap();
        prop_assert!(r.balance >= 0.0);
        prop_assert!(r.balance <= p.balance);
        prop_assert_eq!(r.positions.len(), p.positions.len());
        for (old, new) in p.positions.iter().zip(r.positions.iter()) {
            prop_assert_eq!(&old.ticker, &new.ticker);
            prop_assert!(new.quantity >= old.quantity);
        }
    }

    #[test]
    fn prop_no_affordable_deficit_left(p in arb_portfolio()) {
        let r = calculate(&p).unwrap();
        let available = p.total_available();
        for pos in r.positions.iter() {
            let deficit = available * (pos.target_percentage / 100.0) - pos.value();
            prop_assert!(
                deficit <= 0.0 || pos.price > r.balance,
                "{} still short {} with {} left", pos.ticker, deficit, r.balance
            );
        }
    }

    #[test]
    fn prop_converged_result_is_stable(p in arb_portfolio()) {
        let once = calculate(&p).unwrap();
        let twice = calculate(&once).unwrap();
        prop_assert_eq!(twice, once);
    }

    #[test]
    fn prop_fractional_prices_conserve_value(
        balance in 0.0f64..10_000.0,
        prices in proptest::collection::vec(1.0f64..250.0, 1..5),
    ) {
        let target = 100.0 / prices.len() as f64;
        let positions = prices
            .iter()
            .enumerate()
            .map(|(i, price)| Position::new(&format!("T{}", i), 0, *price, target))
            .collect();
        let p = Portfolio::new(balance, positions);
        let r = calculate(&p).unwrap();
        prop_assert!(r.balance >= 0.0);
        prop_assert!((total(&r) - total(&p)).abs() < 1e-6);
    }

    #[test]
    fn prop_non_positive_price_is_rejected(
        p in arb_portfolio(),
        price in prop_oneof![Just(0.0f64), -1000.0f64..0.0],
    ) {
        let mut p = p;
        p.positions.push(Position::new("BAD", 0, price, 0.0));
        let is_invalid_price = matches!(calculate(&p), Err(PortfolioError::InvalidPrice { .. }));
        prop_assert!(is_invalid_price);
    }
}

#[test]
fn empty_portfolio_is_unchanged() {
    let p = Portfolio::new(1234.5, vec!());
    assert_eq!(calculate(&p).unwrap(), p);
}
