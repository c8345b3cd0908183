use serde::{Deserialize, Serialize};

/// Label preceding the value in labeled sensor lines.
const HUMIDITY_LABEL: &str = "Humedad:";

/// Terminator closing the value in labeled sensor lines.
const VALUE_TERMINATOR: char = '%';

/// How a humidity value is extracted from one received text chunk.
///
/// Firmware variants of the sensor module either stream the bare number or
/// a labeled line like `Humedad: 60.0%`. One policy is selected per link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParsePolicy {
    /// The whole trimmed chunk is the value. Chunks that fail to parse
    /// yield no reading.
    BareNumber,
    /// The value sits between the `Humedad:` label and a `%` terminator.
    /// Anything malformed yields `0.0`.
    Labeled,
}

impl ParsePolicy {
    /// Extract a humidity value from one received chunk.
    /// Returns `None` when the chunk carries no reading under this policy.
    pub fn extract(&self, chunk: &str) -> Option<f32> {
        match self {
            ParsePolicy::BareNumber => parse_bare(chunk),
            ParsePolicy::Labeled => Some(parse_labeled(chunk)),
        }
    }
}

fn parse_bare(chunk: &str) -> Option<f32> {
    chunk
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|value| value.is_finite())
}

fn parse_labeled(chunk: &str) -> f32 {
    let Some(start) = chunk.find(HUMIDITY_LABEL) else {
        return 0f32;
    };
    let rest = &chunk[start + HUMIDITY_LABEL.len()..];
    let Some(end) = rest.find(VALUE_TERMINATOR) else {
        return 0f32;
    };
    rest[..end]
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0f32)
}
