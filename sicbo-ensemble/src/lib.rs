pub mod analysis;
pub mod display;
pub mod engine;
pub mod ensemble;
pub mod models;
pub mod tracker;
