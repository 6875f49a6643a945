pub mod auth;
pub mod error;
pub mod export;
pub mod portfolio;
pub mod routes;
