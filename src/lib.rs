pub mod config;
pub mod errors;
pub mod front;
pub mod ledger;
pub mod migration;
pub mod models;
