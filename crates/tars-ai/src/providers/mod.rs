//! Model endpoint implementations

pub mod google;

pub use google::GoogleGateway;
