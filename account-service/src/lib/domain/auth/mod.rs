pub mod activity;
pub mod errors;
pub mod models;
pub mod ports;
pub mod service;
