//! Utilities for the governance deploy scripts.

use std::str::FromStr;

use alloy_primitives::{Address, U256};

use crate::{constants::BPS_DENOMINATOR, errors::ScriptError};

/// Parses a hex address supplied on the command line
pub fn parse_address(name: &str, value: &str) -> Result<Address, ScriptError> {
    Address::from_str(value.trim())
        .map_err(|e| ScriptError::InvalidParameter(format!("{name} `{value}`: {e}")))
}

/// Parses an optional hex address, falling back to `default` when absent
pub fn parse_address_or(
    name: &str,
    value: Option<&str>,
    default: Address,
) -> Result<Address, ScriptError> {
    value.map_or(Ok(default), |v| parse_address(name, v))
}

/// Parses a decimal-string integer into a `uint256`.
///
/// Only ASCII digits are accepted, so hex strings and signs are rejected
/// rather than silently reinterpreted.
pub fn parse_decimal(name: &str, value: &str) -> Result<U256, ScriptError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ScriptError::InvalidParameter(format!(
            "{name} `{value}` is not a decimal integer"
        )));
    }

    U256::from_str_radix(trimmed, 10)
        .map_err(|e| ScriptError::InvalidParameter(format!("{name} `{value}`: {e}")))
}

/// Parses a decimal-string basis-point value, rejecting anything above [`BPS_DENOMINATOR`]
pub fn parse_bps(name: &str, value: &str) -> Result<U256, ScriptError> {
    let bps = parse_decimal(name, value)?;
    if bps > U256::from(BPS_DENOMINATOR) {
        return Err(ScriptError::InvalidParameter(format!(
            "{name} `{value}` exceeds the basis-point denominator {BPS_DENOMINATOR}"
        )));
    }

    Ok(bps)
}
