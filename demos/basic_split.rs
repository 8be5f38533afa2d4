//! Splitting one expense three ways.
//!
//! Shows how each strategy divides a total and how leftover cents are
//! assigned so the shares always add up.

use expense_engine::core::money::Money;
use expense_engine::split::calculator::compute_split;
use expense_engine::split::participant::Participant;
use expense_engine::split::strategy::SplitStrategy;
use rust_decimal_macros::dec;

fn main() {
    println!("╔══════════════════════════════════════════╗");
    println!("║  expense-engine: Basic Split Example     ║");
    println!("╚══════════════════════════════════════════╝\n");

    // --- Scenario 1: Equal split with leftover cents ---
    println!("━━━ Scenario 1: Equal Split ━━━\n");

    let result = compute_split(
        Money::new(dec!(100.00)),
        SplitStrategy::Equal,
        &[
            Participant::equal("alice"),
            Participant::equal("bob"),
            Participant::equal("carol"),
        ],
    );
    println!("{}", result);
    println!("The extra cent goes to the lowest user id.\n");

    // --- Scenario 2: Percentage split ---
    println!("━━━ Scenario 2: Percentage Split ━━━\n");

    let result = compute_split(
        Money::new(dec!(50.00)),
        SplitStrategy::Percentage,
        &[
            Participant::percentage("alice", dec!(60)),
            Participant::percentage("bob", dec!(40)),
        ],
    );
    println!("{}", result);

    // --- Scenario 3: Exact amounts that do not add up ---
    println!("━━━ Scenario 3: Exact Split (invalid) ━━━\n");

    let result = compute_split(
        Money::new(dec!(50.00)),
        SplitStrategy::Exact,
        &[
            Participant::exact("alice", dec!(20)),
            Participant::exact("bob", dec!(20)),
        ],
    );
    println!("{}", result);
}
