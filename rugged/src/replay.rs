use chrono::{DateTime, Utc};
use nalgebra::Vector3;

use crate::error::RuggedError;

/// One call recorded by a [`crate::dumper::TextDumper`] and recovered by
/// [`ReplayReader`].
#[derive(Debug, Clone)]
pub enum ReplayedCall {
    /// A `direct location:` record.
    DirectLocation {
        /// Sensor the query targeted.
        sensor_name: String,
        /// Acquisition date.
        date: DateTime<Utc>,
        /// Ray origin, body frame.
        position: Vector3<f64>,
        /// Ray direction, body frame.
        los: Vector3<f64>,
        /// Whether light-time correction was enabled.
        light_time_correction: bool,
        /// Whether aberration-of-light correction was enabled.
        aberration_of_light_correction: bool,
    },
    /// A `direct location result:` record.
    DirectLocationResult {
        /// Result latitude, radians.
        latitude: f64,
        /// Result longitude, radians.
        longitude: f64,
        /// Result altitude, meters.
        elevation: f64,
    },
    /// An `inverse location:` record.
    InverseLocation {
        /// Sensor the query targeted.
        sensor_name: String,
        /// Target point latitude, radians.
        latitude: f64,
        /// Target point longitude, radians.
        longitude: f64,
        /// Target point altitude, meters.
        elevation: f64,
        /// Sensor's minimum line.
        min_line: f64,
        /// Sensor's maximum line.
        max_line: f64,
        /// Whether light-time correction was enabled.
        light_time_correction: bool,
        /// Whether aberration-of-light correction was enabled.
        aberration_of_light_correction: bool,
    },
    /// An `inverse location result:` record. `None` fields mean the target
    /// was invisible to the sensor.
    InverseLocationResult {
        /// Fractional acquisition line, if the target was visible.
        line: Option<f64>,
        /// Fractional pixel, if the target was visible.
        pixel: Option<f64>,
    },
}

/// Parses the text dump format written by [`crate::dumper::TextDumper`]
/// back into a sequence of [`ReplayedCall`]s, for regression tests that
/// want to exercise the geometry engine without the surrounding
/// application.
///
/// Only the location-query and location-result record kinds are parsed
/// into replayable calls; the provenance records (`span:`, `DEM tile:`,
/// `sensor:`, …) are accepted (skipped) but not reconstructed, since
/// replaying a query needs a `Rugged` instance built out-of-band, the same
/// way a real player reconstructs configuration before feeding it
/// recorded queries.
pub struct ReplayReader;

impl ReplayReader {
    /// Parses `text` into the sequence of calls it records.
    ///
    /// # Errors
    ///
    /// Returns [`RuggedError::CannotParseLine`] if a location-query or
    /// location-result line doesn't match the expected record shape, and
    /// [`RuggedError::LightTimeCorrectionRedefined`] /
    /// [`RuggedError::AberrationOfLightCorrectionRedefined`] if a later
    /// record sets either correction flag to a value that disagrees with
    /// an earlier one.
    pub fn parse(text: &str) -> Result<Vec<ReplayedCall>, RuggedError> {
        let mut calls = Vec::new();
        let mut light_time_correction: Option<bool> = None;
        let mut aberration_of_light_correction: Option<bool> = None;

        for (index, raw_line) in text.lines().enumerate() {
            let line_number = index + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(rest) = line.strip_prefix("direct location result:") {
                calls.push(Self::parse_direct_location_result(rest, line_number, raw_line)?);
            } else if let Some(rest) = line.strip_prefix("direct location:") {
                let call = Self::parse_direct_location(rest, line_number, raw_line)?;
                if let ReplayedCall::DirectLocation { light_time_correction: lt, aberration_of_light_correction: ab, .. } = &call {
                    Self::check_redefinition(&mut light_time_correction, *lt, line_number, true)?;
                    Self::check_redefinition(&mut aberration_of_light_correction, *ab, line_number, false)?;
                }
                calls.push(call);
            } else if let Some(rest) = line.strip_prefix("inverse location result:") {
                calls.push(Self::parse_inverse_location_result(rest, line_number, raw_line)?);
            } else if let Some(rest) = line.strip_prefix("inverse location:") {
                let call = Self::parse_inverse_location(rest, line_number, raw_line)?;
                if let ReplayedCall::InverseLocation { light_time_correction: lt, aberration_of_light_correction: ab, .. } = &call {
                    Self::check_redefinition(&mut light_time_correction, *lt, line_number, true)?;
                    Self::check_redefinition(&mut aberration_of_light_correction, *ab, line_number, false)?;
                }
                calls.push(call);
            }
            // Provenance records (span:, DEM tile:, sensor:, …) are skipped.
        }

        Ok(calls)
    }

    fn check_redefinition(slot: &mut Option<bool>, value: bool, line_number: usize, is_light_time: bool) -> Result<(), RuggedError> {
        match *slot {
            Some(previous) if previous != value => {
                if is_light_time {
                    Err(RuggedError::LightTimeCorrectionRedefined { line_number })
                } else {
                    Err(RuggedError::AberrationOfLightCorrectionRedefined { line_number })
                }
            }
            _ => {
                *slot = Some(value);
                Ok(())
            }
        }
    }

    fn parse_direct_location(rest: &str, line_number: usize, raw_line: &str) -> Result<ReplayedCall, RuggedError> {
        let tokens: Vec<&str> = rest.split_whitespace().collect();
        let fail = || RuggedError::CannotParseLine { line_number, line: raw_line.to_string() };
        Ok(ReplayedCall::DirectLocation {
            sensor_name: token_after(&tokens, "sensorName").ok_or_else(fail)?.to_string(),
            date: scalar_after(&tokens, "date").ok_or_else(fail)?,
            position: vector_after(&tokens, "position").ok_or_else(fail)?,
            los: vector_after(&tokens, "los").ok_or_else(fail)?,
            light_time_correction: scalar_after(&tokens, "lightTime").ok_or_else(fail)?,
            aberration_of_light_correction: scalar_after(&tokens, "aberration").ok_or_else(fail)?,
        })
    }

    fn parse_direct_location_result(rest: &str, line_number: usize, raw_line: &str) -> Result<ReplayedCall, RuggedError> {
        let tokens: Vec<&str> = rest.split_whitespace().collect();
        let fail = || RuggedError::CannotParseLine { line_number, line: raw_line.to_string() };
        Ok(ReplayedCall::DirectLocationResult {
            latitude: scalar_after(&tokens, "latitude").ok_or_else(fail)?,
            longitude: scalar_after(&tokens, "longitude").ok_or_else(fail)?,
            elevation: scalar_after(&tokens, "elevation").ok_or_else(fail)?,
        })
    }

    fn parse_inverse_location(rest: &str, line_number: usize, raw_line: &str) -> Result<ReplayedCall, RuggedError> {
        let tokens: Vec<&str> = rest.split_whitespace().collect();
        let fail = || RuggedError::CannotParseLine { line_number, line: raw_line.to_string() };
        Ok(ReplayedCall::InverseLocation {
            sensor_name: token_after(&tokens, "sensorName").ok_or_else(fail)?.to_string(),
            latitude: scalar_after(&tokens, "latitude").ok_or_else(fail)?,
            longitude: scalar_after(&tokens, "longitude").ok_or_else(fail)?,
            elevation: scalar_after(&tokens, "elevation").ok_or_else(fail)?,
            min_line: scalar_after(&tokens, "minLine").ok_or_else(fail)?,
            max_line: scalar_after(&tokens, "maxLine").ok_or_else(fail)?,
            light_time_correction: scalar_after(&tokens, "lightTime").ok_or_else(fail)?,
            aberration_of_light_correction: scalar_after(&tokens, "aberration").ok_or_else(fail)?,
        })
    }

    fn parse_inverse_location_result(rest: &str, line_number: usize, raw_line: &str) -> Result<ReplayedCall, RuggedError> {
        let tokens: Vec<&str> = rest.split_whitespace().collect();
        let fail = || RuggedError::CannotParseLine { line_number, line: raw_line.to_string() };
        let line_token = token_after(&tokens, "lineNumber").ok_or_else(fail)?;
        let pixel_token = token_after(&tokens, "pixelNumber").ok_or_else(fail)?;
        if line_token == "none" || pixel_token == "none" {
            return Ok(ReplayedCall::InverseLocationResult { line: None, pixel: None });
        }
        Ok(ReplayedCall::InverseLocationResult {
            line: Some(line_token.parse().map_err(|_| fail())?),
            pixel: Some(pixel_token.parse().map_err(|_| fail())?),
        })
    }
}

fn find_index(tokens: &[&str], key: &str) -> Option<usize> {
    tokens.iter().position(|t| *t == key)
}

fn token_after<'a>(tokens: &[&'a str], key: &str) -> Option<&'a str> {
    let idx = find_index(tokens, key)?;
    tokens.get(idx + 1).copied()
}

fn scalar_after<T: std::str::FromStr>(tokens: &[&str], key: &str) -> Option<T> {
    token_after(tokens, key)?.parse().ok()
}

fn vector_after(tokens: &[&str], key: &str) -> Option<Vector3<f64>> {
    let idx = find_index(tokens, key)?;
    let x = tokens.get(idx + 1)?.parse().ok()?;
    let y = tokens.get(idx + 2)?.parse().ok()?;
    let z = tokens.get(idx + 3)?.parse().ok()?;
    Some(Vector3::new(x, y, z))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_direct_location_record() {
        let text = "direct location: sensorName pan date 2020-01-01T00:00:00Z position 1.0 2.0 3.0 los 0.0 0.0 1.0 lightTime false aberration true\n\
                     direct location result: latitude 0.5 longitude 1.2 elevation 100.0\n";
        let calls = ReplayReader::parse(text).unwrap();
        assert_eq!(calls.len(), 2);
        match &calls[0] {
            ReplayedCall::DirectLocation { sensor_name, light_time_correction, aberration_of_light_correction, .. } => {
                assert_eq!(sensor_name, "pan");
                assert!(!light_time_correction);
                assert!(aberration_of_light_correction);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn rejects_conflicting_light_time_flags() {
        let text = "direct location: sensorName pan date 2020-01-01T00:00:00Z position 0.0 0.0 0.0 los 0.0 0.0 1.0 lightTime false aberration false\n\
                     direct location: sensorName pan date 2020-01-01T00:00:01Z position 0.0 0.0 0.0 los 0.0 0.0 1.0 lightTime true aberration false\n";
        let result = ReplayReader::parse(text);
        assert!(matches!(result, Err(RuggedError::LightTimeCorrectionRedefined { .. })));
    }

    #[test]
    fn parses_invisible_inverse_location_result() {
        let text = "inverse location result: lineNumber none pixelNumber none\n";
        let calls = ReplayReader::parse(text).unwrap();
        assert!(matches!(calls[0], ReplayedCall::InverseLocationResult { line: None, pixel: None }));
    }
}
