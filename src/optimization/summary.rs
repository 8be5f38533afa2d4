use crate::core::money::Money;
use crate::graph::balance_graph::BalanceGraph;
use crate::optimization::settlement::SettlementPlan;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

/// How much a settlement plan saves over paying every pairwise debt directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementSummary {
    /// Non-zero pairwise balances, i.e. transfers needed without optimization.
    pub pairwise_transfers: usize,
    /// Money moved if every pair settled directly.
    pub pairwise_volume: Money,
    pub optimized_transfers: usize,
    pub optimized_volume: Money,
    /// Users with a positive net balance.
    pub creditor_count: usize,
    /// Users with a negative net balance.
    pub debtor_count: usize,
}

impl SettlementSummary {
    /// Compare a plan against the graph it was computed from.
    pub fn from_plan(graph: &BalanceGraph, plan: &SettlementPlan) -> Self {
        let net = plan.net_balances();
        SettlementSummary {
            pairwise_transfers: graph.edge_count(),
            pairwise_volume: graph.gross_total(),
            optimized_transfers: plan.transfer_count(),
            optimized_volume: plan.total_volume(),
            creditor_count: net.creditors().count(),
            debtor_count: net.debtors().count(),
        }
    }

    /// Transfers avoided by the plan.
    pub fn transfer_reduction(&self) -> usize {
        self.pairwise_transfers
            .saturating_sub(self.optimized_transfers)
    }

    /// Money that no longer has to move.
    pub fn savings(&self) -> Money {
        self.pairwise_volume - self.optimized_volume
    }

    /// Savings as a fraction of the pairwise volume.
    pub fn savings_ratio(&self) -> f64 {
        if self.pairwise_volume.is_zero() {
            return 0.0;
        }
        let ratio: Decimal = self.savings().amount() / self.pairwise_volume.amount();
        ratio.to_f64().unwrap_or(0.0)
    }
}

impl std::fmt::Display for SettlementSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Settlement Summary ===")?;
        writeln!(
            f,
            "Pairwise:  {} transfers, {} total",
            self.pairwise_transfers, self.pairwise_volume
        )?;
        writeln!(
            f,
            "Optimized: {} transfers, {} total",
            self.optimized_transfers, self.optimized_volume
        )?;
        writeln!(f, "Creditors: {}", self.creditor_count)?;
        writeln!(f, "Debtors:   {}", self.debtor_count)?;
        writeln!(f, "Transfers saved: {}", self.transfer_reduction())?;
        writeln!(
            f,
            "Volume saved:    {} ({:.1}%)",
            self.savings(),
            self.savings_ratio() * 100.0
        )?;
        Ok(())
    }
}
