pub mod history;
pub mod ledger;
pub mod models;
pub mod stats;
pub mod store;
