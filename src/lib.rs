//! # expense-engine
//!
//! Expense splitting and debt settlement for shared-cost groups.
//!
//! Given a total and a split strategy, the engine computes what each
//! participant owes, reconciled to the cent. Given the pairwise balances that
//! accumulate from those splits, it reduces them to net balances and derives
//! a short list of transfers that settles everyone.
//!
//! ## Architecture
//!
//! - **core**: Foundational types: money, users, balances, transfers, ledger
//! - **split**: Split strategies, validation and the split calculator
//! - **graph**: Normalised pairwise balance graph
//! - **optimization**: Greedy settlement optimizer and savings summary
//! - **simulation**: Random balance networks for load testing

pub mod core;
pub mod graph;
pub mod optimization;
pub mod split;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::core::balance::PairwiseBalance;
    pub use crate::core::ledger::NetBalances;
    pub use crate::core::money::Money;
    pub use crate::core::policy::RoundingPolicy;
    pub use crate::core::transfer::Transfer;
    pub use crate::core::user::UserId;
    pub use crate::graph::balance_graph::BalanceGraph;
    pub use crate::optimization::settlement::{
        optimize_settlements, SettlementError, SettlementOptimizer, SettlementPlan,
    };
    pub use crate::optimization::summary::SettlementSummary;
    pub use crate::split::calculator::{compute_split, SplitCalculator, SplitResult};
    pub use crate::split::participant::{Participant, Share};
    pub use crate::split::strategy::SplitStrategy;
}
