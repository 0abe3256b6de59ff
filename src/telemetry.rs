use crate::constants::TELEMETRY_TAG;
use crate::types::TelemetryReading;
use std::num::ParseIntError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("malformed telemetry line {line:?}: {source}")]
    Malformed {
        line: String,
        #[source]
        source: ParseIntError,
    },
}

/// What a line received from the controller turned out to be.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum LineKind {
    Empty,
    Telemetry(TelemetryReading),
    /// Anything else; counts as an acknowledgement when one is awaited.
    Other(String),
}

pub fn parse_line(line: &str) -> Result<LineKind, TelemetryError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(LineKind::Empty);
    }

    match line.strip_prefix(TELEMETRY_TAG) {
        Some(payload) => payload
            .trim()
            .parse::<i32>()
            .map(|value| LineKind::Telemetry(TelemetryReading(value)))
            .map_err(|source| TelemetryError::Malformed { line: line.to_string(), source }),
        None => Ok(LineKind::Other(line.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_reading() {
        assert_eq!(parse_line("ADC:42").unwrap(), LineKind::Telemetry(TelemetryReading(42)));
        assert_eq!(parse_line("ADC: 4095\r").unwrap(), LineKind::Telemetry(TelemetryReading(4095)));
        assert_eq!(parse_line("ADC:-3").unwrap(), LineKind::Telemetry(TelemetryReading(-3)));
    }

    #[test]
    fn rejects_non_numeric_payload() {
        let err = parse_line("ADC:notanumber").unwrap_err();
        assert!(err.to_string().contains("ADC:notanumber"));
        assert!(parse_line("ADC:").is_err());
    }

    #[test]
    fn other_lines_pass_through() {
        assert_eq!(parse_line("").unwrap(), LineKind::Empty);
        assert_eq!(parse_line("   \n").unwrap(), LineKind::Empty);
        assert_eq!(parse_line("OK").unwrap(), LineKind::Other("OK".into()));
        // tag must lead the line
        assert_eq!(parse_line("x ADC:1").unwrap(), LineKind::Other("x ADC:1".into()));
        assert_eq!(parse_line("adc:1").unwrap(), LineKind::Other("adc:1".into()));
    }
}
