//! Value types shared by the split calculator and the settlement optimizer.

pub mod apportion;
pub mod balance;
pub mod ledger;
pub mod money;
pub mod policy;
pub mod transfer;
pub mod user;
