//! Request validation at the transport boundary (`spec.md` §9): storage
//! contracts trust their callers completely, so anything a malicious or
//! sloppy client could send has to be rejected here, before a driver ever
//! sees it.

use lazy_regex::regex;
use serde_json::Value;

use crate::{
    service::{pagination::DEFAULT_LIMIT, ZephyrError},
    CONFIG,
};

/// The two name-charset-constrained identifiers a request can carry.
#[derive(Debug, Clone, Copy, Eq, PartialEq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum NameKind {
    Project,
    Queue,
}

/// `spec.md` §4.1 "Queue and project name charset": ASCII letters, digits,
/// `_` and `-`, 1-64 characters.
pub fn validate_name(kind: NameKind, value: &str) -> Result<(), ZephyrError> {
    let pattern = regex!(r"^[a-zA-Z0-9_-]{1,64}$");
    if pattern.is_match(value) {
        Ok(())
    } else {
        Err(ZephyrError::validation(format!(
            "{kind} '{value}' must be 1-64 characters of [a-zA-Z0-9_-]"
        )))
    }
}

pub fn validate_message_ttl(ttl_seconds: u64) -> Result<(), ZephyrError> {
    if ttl_seconds > CONFIG.max_message_ttl_seconds {
        return Err(ZephyrError::validation(format!(
            "message ttl {ttl_seconds} exceeds the maximum of {}",
            CONFIG.max_message_ttl_seconds
        )));
    }
    Ok(())
}

pub fn validate_claim_ttl(ttl_seconds: u64) -> Result<(), ZephyrError> {
    if ttl_seconds < CONFIG.min_claim_ttl_seconds || ttl_seconds > CONFIG.max_claim_ttl_seconds {
        return Err(ZephyrError::validation(format!(
            "claim ttl {ttl_seconds} must be between {} and {}",
            CONFIG.min_claim_ttl_seconds, CONFIG.max_claim_ttl_seconds
        )));
    }
    Ok(())
}

pub fn validate_grace(grace_seconds: u64) -> Result<(), ZephyrError> {
    if grace_seconds > CONFIG.max_grace_seconds {
        return Err(ZephyrError::validation(format!(
            "claim grace {grace_seconds} exceeds the maximum of {}",
            CONFIG.max_grace_seconds
        )));
    }
    Ok(())
}

/// `spec.md` §4.2 "Message size limit", also applied to claim PATCH bodies.
pub fn validate_body_size(body: &Value) -> Result<(), ZephyrError> {
    let encoded = serde_json::to_vec(body).map_err(|e| {
        ZephyrError::validation(format!("message body is not valid JSON: {e}"))
    })?;
    if encoded.len() > CONFIG.max_message_body_bytes {
        return Err(ZephyrError::validation(format!(
            "message body is {} bytes, exceeding the {}-byte limit",
            encoded.len(),
            CONFIG.max_message_body_bytes
        )));
    }
    Ok(())
}

/// Coerces an optional, caller-supplied page limit into `[1, max]`,
/// defaulting to [`DEFAULT_LIMIT`].
#[must_use]
pub fn clamp_limit(limit: Option<usize>) -> usize {
    limit
        .unwrap_or(DEFAULT_LIMIT)
        .clamp(1, CONFIG.max_page_limit)
}
