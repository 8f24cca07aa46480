pub mod account;
pub mod audit;
pub mod auth;
pub mod errors;
pub mod rate_limit;
pub mod session;
