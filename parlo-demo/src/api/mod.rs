//! HTTP API handlers for parlo-demo

pub mod checkout;
pub mod demo;
pub mod health;
pub mod pronunciation;

pub use health::health_routes;
