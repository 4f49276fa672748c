//! azurerm - manage Azure resources through Azure Resource Manager
//!
//! Typed Resource IDs, an ARM client with long-running-operation polling,
//! per-service API clients and a provider that plans and applies resource
//! definitions against them.

#[macro_use]
mod enums;

pub mod acceptance;
pub mod arm;
pub mod auth;
pub mod clients;
pub mod config;
pub mod definition;
pub mod plan;
pub mod provider;
pub mod resource;
pub mod resourceids;
pub mod schema;
pub mod sdk;
pub mod services;
pub mod state;

mod error;

pub use error::AzurermError;
pub use provider::Provider;
