pub mod calculator;
pub mod participant;
pub mod strategy;
pub mod validation;
