//! Scripts for deploying and wiring the governance contracts.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod artifacts;
pub mod cli;
mod commands;
pub mod constants;
pub mod deployer;
pub mod errors;
pub mod ledger;
#[cfg(test)]
mod mock;
pub mod orchestrator;
pub mod proxy;
pub mod registry;
mod solidity;
pub mod types;
pub mod utils;
pub mod verification;
