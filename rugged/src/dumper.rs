use std::io::Write;

use chrono::{DateTime, SecondsFormat, Utc};
use nalgebra::Vector3;
use rugged_ellipsoid::NormalizedGeodeticPoint;

/// Recording hook passed by reference into [`crate::Rugged::direct_location`]
/// and [`crate::Rugged::inverse_location`], rather than kept as
/// thread-local state (§9 design note): nothing to reason about across
/// threads beyond whatever the caller does with the `&mut dyn Dumper` it
/// holds.
pub trait Dumper {
    /// Records a direct-location query before it runs.
    #[allow(clippy::too_many_arguments)]
    fn dump_direct_location(
        &mut self,
        sensor_name: &str,
        date: DateTime<Utc>,
        position: Vector3<f64>,
        los: Vector3<f64>,
        light_time_correction: bool,
        aberration_of_light_correction: bool,
    );

    /// Records a direct-location result.
    fn dump_direct_location_result(&mut self, result: &NormalizedGeodeticPoint);

    /// Records an inverse-location query before it runs.
    fn dump_inverse_location(
        &mut self,
        sensor_name: &str,
        target: &NormalizedGeodeticPoint,
        min_line: f64,
        max_line: f64,
        light_time_correction: bool,
        aberration_of_light_correction: bool,
    );

    /// Records an inverse-location result. `None` for either field means
    /// the target was invisible to the sensor.
    fn dump_inverse_location_result(&mut self, line: Option<f64>, pixel: Option<f64>);
}

/// The one shipped [`Dumper`]: writes the line-oriented, `key: field
/// value …` text format of §6 to any [`Write`] sink.
pub struct TextDumper<W> {
    sink: W,
}

impl<W: Write> TextDumper<W> {
    /// Wraps `sink`, writing a header comment line first.
    pub fn new(mut sink: W) -> Self {
        let _ = writeln!(sink, "# rugged debug dump");
        Self { sink }
    }

    fn format_date(date: DateTime<Utc>) -> String {
        date.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    fn format_float(value: f64) -> String {
        format!("{value:22.15e}")
    }

    fn format_vector(v: Vector3<f64>) -> String {
        format!("{} {} {}", Self::format_float(v.x), Self::format_float(v.y), Self::format_float(v.z))
    }
}

impl<W: Write> Dumper for TextDumper<W> {
    fn dump_direct_location(
        &mut self,
        sensor_name: &str,
        date: DateTime<Utc>,
        position: Vector3<f64>,
        los: Vector3<f64>,
        light_time_correction: bool,
        aberration_of_light_correction: bool,
    ) {
        let _ = writeln!(
            self.sink,
            "direct location: sensorName {sensor_name} date {} position {} los {} lightTime {light_time_correction} aberration {aberration_of_light_correction}",
            Self::format_date(date),
            Self::format_vector(position),
            Self::format_vector(los),
        );
    }

    fn dump_direct_location_result(&mut self, result: &NormalizedGeodeticPoint) {
        let _ = writeln!(
            self.sink,
            "direct location result: latitude {} longitude {} elevation {}",
            Self::format_float(result.latitude()),
            Self::format_float(result.longitude()),
            Self::format_float(result.altitude()),
        );
    }

    fn dump_inverse_location(
        &mut self,
        sensor_name: &str,
        target: &NormalizedGeodeticPoint,
        min_line: f64,
        max_line: f64,
        light_time_correction: bool,
        aberration_of_light_correction: bool,
    ) {
        let _ = writeln!(
            self.sink,
            "inverse location: sensorName {sensor_name} latitude {} longitude {} elevation {} minLine {min_line} maxLine {max_line} lightTime {light_time_correction} aberration {aberration_of_light_correction}",
            Self::format_float(target.latitude()),
            Self::format_float(target.longitude()),
            Self::format_float(target.altitude()),
        );
    }

    fn dump_inverse_location_result(&mut self, line: Option<f64>, pixel: Option<f64>) {
        match (line, pixel) {
            (Some(l), Some(p)) => {
                let _ = writeln!(self.sink, "inverse location result: lineNumber {} pixelNumber {}", Self::format_float(l), Self::format_float(p));
            }
            _ => {
                let _ = writeln!(self.sink, "inverse location result: lineNumber none pixelNumber none");
            }
        }
    }
}
