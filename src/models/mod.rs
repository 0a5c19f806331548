pub mod account;
pub mod dashboard;
pub mod error;
pub mod market;
pub mod trade;
