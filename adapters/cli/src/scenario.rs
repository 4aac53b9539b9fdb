#![allow(clippy::missing_errors_doc)]

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use hex_outbreak_core::TIER_COUNT;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SCENARIO_DOMAIN: &str = "hive";
const SCENARIO_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded scenario payload.
pub(crate) const SCENARIO_HEADER: &str = "hive:v1";
/// Delimiter used to separate the prefix, tier marker and payload.
const FIELD_DELIMITER: char = ':';

/// Complete set of inputs needed to replay a simulation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct Scenario {
    /// Per-tier bot populations in ascending tier order.
    pub bots: [f64; TIER_COUNT],
    /// Per-tier population growth per second in ascending tier order.
    pub growth: [f64; TIER_COUNT],
    /// Mask budget afforded by the economy.
    pub masks: f64,
    /// Scale applied to mask and immunity durations.
    pub mask_duration_multiplier: f64,
    /// Posts per second produced by the bot network.
    pub throughput: f64,
    /// Halves the spontaneous detection rate when set.
    pub encrypted_links: bool,
    /// Quarters the spontaneous detection rate when set.
    pub relay_shield: bool,
    /// Runs the late-game uncapped regime where masks stop mattering.
    pub uncapped: bool,
    /// Seed for the world's random decisions.
    pub seed: u64,
}

impl Scenario {
    /// Encodes the scenario into a single-line string suitable for sharing.
    #[must_use]
    pub(crate) fn encode(&self) -> String {
        let json = serde_json::to_vec(self).expect("scenario serialization never fails");
        let encoded = STANDARD_NO_PAD.encode(json);
        format!("{SCENARIO_HEADER}:t{TIER_COUNT}:{encoded}")
    }

    /// Decodes a scenario from the provided string representation.
    pub(crate) fn decode(value: &str) -> Result<Self, ScenarioError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ScenarioError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(ScenarioError::MissingPrefix)?;
        let version = parts.next().ok_or(ScenarioError::MissingVersion)?;
        let tiers = parts.next().ok_or(ScenarioError::MissingTiers)?;
        let payload = parts.next().ok_or(ScenarioError::MissingPayload)?;

        if domain != SCENARIO_DOMAIN {
            return Err(ScenarioError::InvalidPrefix(domain.to_owned()));
        }
        if version != SCENARIO_VERSION {
            return Err(ScenarioError::UnsupportedVersion(version.to_owned()));
        }
        if tiers != format!("t{TIER_COUNT}") {
            return Err(ScenarioError::MismatchedTiers(tiers.to_owned()));
        }

        let bytes = STANDARD_NO_PAD.decode(payload.as_bytes())?;
        let decoded: Self = serde_json::from_slice(&bytes)?;
        Ok(decoded)
    }
}

/// Errors that can occur while decoding scenario transfer strings.
#[derive(Debug, Error)]
pub(crate) enum ScenarioError {
    /// The provided string was empty or contained only whitespace.
    #[error("scenario string was empty")]
    EmptyPayload,
    /// The prefix segment was missing from the encoded scenario.
    #[error("scenario string is missing the prefix")]
    MissingPrefix,
    /// The encoded scenario did not contain a version segment.
    #[error("scenario string is missing the version")]
    MissingVersion,
    /// The encoded scenario did not include the tier marker.
    #[error("scenario string is missing the tier marker")]
    MissingTiers,
    /// The encoded scenario did not include the payload segment.
    #[error("scenario string is missing the payload")]
    MissingPayload,
    /// The encoded scenario used an unexpected prefix segment.
    #[error("scenario prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The encoded scenario used an unsupported version identifier.
    #[error("scenario version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The tier marker did not match the tiers this build simulates.
    #[error("scenario tier marker '{0}' does not match the supported tiers")]
    MismatchedTiers(String),
    /// The base64 payload could not be decoded.
    #[error("could not decode scenario payload: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),
    /// The decoded payload could not be deserialised.
    #[error("could not parse scenario payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}
