use crate::modules::error::{code::ErrorCode, SpamWardenResult};
use crate::raise_error;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Parses durations written the way the configuration file has always accepted them:
/// a sequence of decimal numbers each followed by a unit, e.g. `300ms`, `10s`, `1m30s`,
/// `1.5h`. Valid units are `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`.
pub fn parse_duration(input: &str) -> SpamWardenResult<Duration> {
    let input = input.trim();
    let invalid = || {
        raise_error!(
            format!("Invalid duration '{}', expected e.g. '30s', '5m' or '1h30m'", input),
            ErrorCode::InvalidConfiguration
        )
    };

    if input == "0" {
        return Ok(Duration::ZERO);
    }
    if input.is_empty() {
        return Err(invalid());
    }

    let mut total = 0f64;
    let mut rest = input;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        if number_len == 0 {
            return Err(invalid());
        }
        let value: f64 = rest[..number_len].parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let seconds_per_unit = match &rest[..unit_len] {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];
        total += value * seconds_per_unit;
    }

    Duration::try_from_secs_f64(total).map_err(|_| invalid())
}

pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_duration(&raw).map_err(serde::de::Error::custom)
}
