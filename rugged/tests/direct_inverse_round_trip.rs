//! P1 (§8): direct location followed by inverse location on the same
//! sensor recovers the original (line, pixel).

use chrono::{DateTime, Duration, Utc};
use nalgebra::{UnitQuaternion, Vector3};
use rugged::{IntersectionAlgorithmKind, RuggedBuilder};
use rugged_dem::{TileUpdater, UpdatableTile};
use rugged_ellipsoid::{BodyFrameId, EllipsoidId, InertialFrameId};
use rugged_frames::{AngularInterpolationFilter, AngularSample, CartesianInterpolationFilter, CartesianSample, SpacecraftToBody};
use rugged_sensor::{AffineLineDatation, LineSensor, PolynomialLos};

/// Never consulted: every test here uses the bare-ellipsoid algorithm.
struct NoDem;

impl TileUpdater for NoDem {
    fn update_tile(&self, _lat: f64, _lon: f64, _out: &mut UpdatableTile) {
        unreachable!("no test in this module selects a DEM-backed algorithm");
    }
}

fn epoch() -> DateTime<Utc> {
    "2020-01-01T00:00:00Z".parse().unwrap()
}

/// A short, straight-line equatorial overflight: close enough to a real
/// orbit arc over the ~4 second span these tests query, and simple enough
/// to hand-place ground truth pixels against.
fn equatorial_overflight() -> SpacecraftToBody {
    const EQUATORIAL_RADIUS: f64 = 6_378_137.0;
    const ALTITUDE: f64 = 700_000.0;
    const ALONG_TRACK_SPEED: f64 = 7_500.0;

    let orbit: Vec<CartesianSample> = (0..=4)
        .map(|second| CartesianSample {
            date: epoch() + Duration::seconds(second),
            position: Vector3::new(EQUATORIAL_RADIUS + ALTITUDE, ALONG_TRACK_SPEED * second as f64, 0.0),
            velocity: Vector3::new(0.0, ALONG_TRACK_SPEED, 0.0),
            acceleration: Vector3::zeros(),
        })
        .collect();

    let attitude: Vec<AngularSample> = (0..=4)
        .map(|second| AngularSample {
            date: epoch() + Duration::seconds(second),
            rotation: UnitQuaternion::identity(),
            rotation_rate: Vector3::zeros(),
            rotation_acceleration: Vector3::zeros(),
        })
        .collect();

    SpacecraftToBody::from_samples(
        &orbit,
        CartesianInterpolationFilter::UseP,
        &attitude,
        AngularInterpolationFilter::UseR,
        &attitude,
        AngularInterpolationFilter::UseR,
        1.0,
        1.0e-6,
        InertialFrameId::Gcrf,
        BodyFrameId::Itrf,
    )
    .unwrap()
}

/// Three-pixel pushbroom line, nadir-pointing with a small cross-track
/// tilt per pixel, one line per second.
fn nadir_sensor() -> LineSensor {
    let datation = AffineLineDatation::new(epoch(), 0.0, 1.0).unwrap();
    let los = PolynomialLos::new([vec![-1.0], vec![0.0], vec![0.0, 0.01]], 3).unwrap();
    LineSensor::new("pan", Vector3::zeros(), datation, los, 0.0, 4.0).unwrap()
}

fn build_rugged() -> rugged::Rugged<NoDem> {
    RuggedBuilder::<NoDem>::new()
        .with_ellipsoid(EllipsoidId::Wgs84)
        .with_inertial_frame(InertialFrameId::Gcrf)
        .with_body_frame(BodyFrameId::Itrf)
        .with_algorithm(IntersectionAlgorithmKind::IgnoreDemUseEllipsoid)
        .with_sc_to_body(equatorial_overflight())
        .add_line_sensor(nadir_sensor())
        .unwrap()
        .build()
        .unwrap()
}

#[test]
fn direct_then_inverse_recovers_line_and_pixel() {
    let rugged = build_rugged();

    let ground_point = rugged.direct_location("pan", 2.0, 1.0, None).unwrap();

    let (line, pixel) = rugged
        .inverse_location("pan", &ground_point, None)
        .unwrap()
        .expect("nadir target must be visible to the sensor that imaged it");

    assert!((line - 2.0).abs() < 1.0e-2, "line = {line}");
    assert!((pixel - 1.0).abs() < 1.0e-2, "pixel = {pixel}");
}

#[test]
fn unknown_sensor_name_is_rejected() {
    let rugged = build_rugged();
    let err = rugged.direct_location("does-not-exist", 0.0, 0.0, None).unwrap_err();
    assert!(matches!(err, rugged::RuggedError::UnknownSensor { .. }));
}

#[test]
fn duplicated_sensor_name_is_rejected_by_the_builder() {
    let result = RuggedBuilder::<NoDem>::new()
        .with_ellipsoid(EllipsoidId::Wgs84)
        .with_inertial_frame(InertialFrameId::Gcrf)
        .with_body_frame(BodyFrameId::Itrf)
        .with_algorithm(IntersectionAlgorithmKind::IgnoreDemUseEllipsoid)
        .with_sc_to_body(equatorial_overflight())
        .add_line_sensor(nadir_sensor())
        .unwrap()
        .add_line_sensor(nadir_sensor());

    assert!(matches!(result, Err(rugged::RuggedError::DuplicatedParameterName { .. })));
}
