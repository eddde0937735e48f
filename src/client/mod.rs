//! Client Library
//!
//! Speaks the client side of the gateway protocol. `GatewayClient` wraps one
//! session; `validate` holds the checks made before anything is sent.

pub mod gateway_client;
pub mod validate;

pub use gateway_client::{GatewayClient, ItemReport};
pub use validate::{validate_command, validate_request};
