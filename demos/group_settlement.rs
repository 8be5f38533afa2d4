//! Settling a group after a shared trip.
//!
//! Records several expenses into a balance graph, then shows how the
//! optimizer collapses the pairwise debts into a few transfers.

use expense_engine::core::money::Money;
use expense_engine::core::user::UserId;
use expense_engine::graph::balance_graph::BalanceGraph;
use expense_engine::optimization::settlement::SettlementOptimizer;
use expense_engine::optimization::summary::SettlementSummary;
use expense_engine::split::calculator::compute_split;
use expense_engine::split::participant::Participant;
use expense_engine::split::strategy::SplitStrategy;
use rust_decimal_macros::dec;

fn main() {
    println!("╔═══════════════════════════════════════════════╗");
    println!("║  expense-engine: Group Settlement Example     ║");
    println!("╚═══════════════════════════════════════════════╝\n");

    let everyone = ["alice", "bob", "carol", "dave"];
    let mut graph = BalanceGraph::new();

    println!("Expenses:");
    println!("  alice paid 400.00 for the cabin (everyone)");
    println!("  bob   paid 100.00 for groceries (alice, bob, carol)");
    println!("  carol paid  75.00 for fuel (carol 20%, dave 80%)");
    println!("  dave  paid 120.00 for dinner (alice 35, bob 45, dave 40)\n");

    let expenses = [
        (
            "alice",
            compute_split(
                Money::new(dec!(400.00)),
                SplitStrategy::Equal,
                &everyone.map(Participant::equal),
            ),
        ),
        (
            "bob",
            compute_split(
                Money::new(dec!(100.00)),
                SplitStrategy::Equal,
                &["alice", "bob", "carol"].map(Participant::equal),
            ),
        ),
        (
            "carol",
            compute_split(
                Money::new(dec!(75.00)),
                SplitStrategy::Percentage,
                &[
                    Participant::percentage("carol", dec!(20)),
                    Participant::percentage("dave", dec!(80)),
                ],
            ),
        ),
        (
            "dave",
            compute_split(
                Money::new(dec!(120.00)),
                SplitStrategy::Exact,
                &[
                    Participant::exact("alice", dec!(35)),
                    Participant::exact("bob", dec!(45)),
                    Participant::exact("dave", dec!(40)),
                ],
            ),
        ),
    ];

    for (payer, split) in &expenses {
        if let Err(e) = graph.record_split(&UserId::new(*payer), split) {
            eprintln!("Skipping expense paid by {}: {}", payer, e);
        }
    }

    println!("Pairwise balances:");
    for balance in graph.balances() {
        println!("  {}", balance);
    }
    println!();

    println!("Per-user summary:");
    for user in everyone {
        let summary = graph.user_summary(&UserId::new(user));
        println!(
            "  {:<6} owed {:>7}  owes {:>7}  net {:>8}",
            user, summary.total_owed, summary.total_owing, summary.net_balance
        );
    }
    println!();

    match SettlementOptimizer::default().optimize_graph(&graph) {
        Ok(plan) => {
            println!("{}", plan);
            println!("{}", SettlementSummary::from_plan(&graph, &plan));
        }
        Err(e) => eprintln!("Settlement failed: {}", e),
    }
}
