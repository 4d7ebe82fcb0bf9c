use nalgebra::Vector3;
use rugged_ellipsoid::{convert_los, point_at_latitude_k, point_at_longitude_k, Ellipsoid, GeodeticPoint, NormalizedGeodeticPoint};

use crate::indexed_tile::IndexedTile;

/// Converts `position` to geodetic coordinates, either exactly or (when
/// `flat_body` is set) by linearizing around `anchor` in its local tangent
/// plane. Called at every step of the tile walk, so this is the one place
/// the flat-body simplification (§4.3) actually saves work: it trades
/// `Ellipsoid::to_geodetic`'s Newton iteration for a few dot products.
fn geodetic_of(ellipsoid: &Ellipsoid, anchor: GeodeticPoint, flat_body: bool, position: Vector3<f64>) -> GeodeticPoint {
    if flat_body {
        ellipsoid.to_geodetic_flat(anchor, position)
    } else {
        ellipsoid.to_geodetic(position)
    }
}

/// Outcome of marching a ray through one tile's cell grid.
pub(crate) enum WalkOutcome {
    /// The ray crosses the bilinear terrain surface at ray parameter `k`.
    Hit(f64, NormalizedGeodeticPoint),
    /// The ray left the tile's interior without crossing the surface; the
    /// payload is the ray parameter and point at the point of exit, so the
    /// caller can fetch the neighboring tile and keep marching.
    Exited(f64, NormalizedGeodeticPoint),
}

/// Marches the ray `position + k*los`, `k >= k0`, cell by cell through
/// `tile`, solving the exact bilinear-cell crossing in each cell it visits.
///
/// When `prune` is true, a cell is only attempted if the ray's altitude
/// bracket over that cell's k-range can plausibly reach the cell's maximum
/// elevation (Duvenhage's pruning, using the cell's kd-tree leaf bound).
/// When false every visited cell is attempted regardless (the brute-force
/// scan used as a correctness oracle).
pub(crate) fn walk_within_tile(
    tile: &IndexedTile,
    ellipsoid: &Ellipsoid,
    position: Vector3<f64>,
    los: Vector3<f64>,
    k0: f64,
    central_longitude: f64,
    prune: bool,
    flat_body: bool,
) -> WalkOutcome {
    let point0 = position + k0 * los;
    let gp0 = ellipsoid.to_geodetic(point0);
    let anchor = gp0;

    let i0 = tile.latitude_index(gp0.latitude);
    let j0 = tile.longitude_index(gp0.longitude);
    if i0 < 0 || j0 < 0 || i0 as usize > tile.rows() - 2 || j0 as usize > tile.cols() - 2 {
        return WalkOutcome::Exited(k0, gp0.normalize(central_longitude));
    }

    let mut i = i0 as usize;
    let mut j = j0 as usize;
    let mut k_cur = k0;

    // Generous bound: a ray should cross at most a handful of multiples of
    // the tile's own cell count before leaving it; this just prevents a
    // runaway loop if the geometry is pathological (near-tangent rays).
    let max_steps = 4 * tile.rows() * tile.cols() + 16;

    for _ in 0..max_steps {
        let point_cur = position + k_cur * los;
        let gp_cur = geodetic_of(ellipsoid, anchor, flat_body, point_cur);
        let topo = convert_los(ellipsoid, gp_cur, los);
        let north = topo.north >= 0.0;
        let east = topo.east >= 0.0;

        let lat_bound = if north { tile.lat_of(i + 1) } else { tile.lat_of(i) };
        let lon_bound = if east { tile.lon_of(j + 1) } else { tile.lon_of(j) };

        let k_lat = point_at_latitude_k(ellipsoid, position, los, lat_bound, point_cur, central_longitude)
            .ok()
            .map(|(k, _)| k)
            .filter(|k| *k > k_cur);
        let k_lon = point_at_longitude_k(ellipsoid, position, los, lon_bound, central_longitude)
            .ok()
            .map(|(k, _)| k)
            .filter(|k| *k > k_cur);

        let Some(k_exit) = min_option(k_lat, k_lon) else {
            // Ray runs tangent to both bounding meridian and parallel; give
            // up on this tile rather than loop forever.
            return WalkOutcome::Exited(k_cur, gp_cur.normalize(central_longitude));
        };

        let attempt = if prune {
            match tile.tree().leaf_cell_containing(i, j) {
                Some((leaf, _, _)) => {
                    let (_, max_e) = tile.tree().node_min_max(leaf);
                    let alt_lo = geodetic_of(ellipsoid, anchor, flat_body, position + k_cur * los).altitude;
                    let alt_hi = geodetic_of(ellipsoid, anchor, flat_body, position + k_exit * los).altitude;
                    alt_lo.min(alt_hi) <= max_e
                }
                None => true,
            }
        } else {
            true
        };

        if attempt {
            if let Some((k_hit, gp_hit)) = solve_cell(tile, ellipsoid, position, los, k_cur, k_exit, central_longitude, anchor, flat_body) {
                return WalkOutcome::Hit(k_hit, gp_hit);
            }
        }

        k_cur = k_exit;
        let crossed_lat = k_lat.is_some_and(|k| k <= k_exit);
        if crossed_lat {
            if north {
                i += 1;
            } else if i == 0 {
                break;
            } else {
                i -= 1;
            }
        } else if east {
            j += 1;
        } else if j == 0 {
            break;
        } else {
            j -= 1;
        }

        if i > tile.rows() - 2 || j > tile.cols() - 2 {
            break;
        }
    }

    let gp_exit = geodetic_of(ellipsoid, anchor, flat_body, position + k_cur * los);
    WalkOutcome::Exited(k_cur, gp_exit.normalize(central_longitude))
}

/// Solves `altitude(k) == tile.interpolate_elevation(...)` within
/// `[k_lo, k_hi]` by bisection, after confirming the endpoints bracket a
/// sign change.
fn solve_cell(
    tile: &IndexedTile,
    ellipsoid: &Ellipsoid,
    position: Vector3<f64>,
    los: Vector3<f64>,
    k_lo: f64,
    k_hi: f64,
    central_longitude: f64,
    anchor: GeodeticPoint,
    flat_body: bool,
) -> Option<(f64, NormalizedGeodeticPoint)> {
    let residual = |k: f64| -> Option<f64> {
        let p = position + k * los;
        let gp = geodetic_of(ellipsoid, anchor, flat_body, p);
        let terrain = tile.interpolate_elevation(gp.latitude, gp.longitude).ok()?;
        Some(gp.altitude - terrain)
    };

    let f_lo = residual(k_lo)?;
    let f_hi = residual(k_hi)?;
    if f_lo == 0.0 {
        let gp = geodetic_of(ellipsoid, anchor, flat_body, position + k_lo * los);
        return Some((k_lo, gp.normalize(central_longitude)));
    }
    if f_lo.signum() == f_hi.signum() {
        return None;
    }

    let (mut a, mut b, mut fa) = (k_lo, k_hi, f_lo);
    for _ in 0..60 {
        let m = 0.5 * (a + b);
        let fm = residual(m)?;
        if fm == 0.0 || (b - a).abs() < 1e-15 {
            let gp = geodetic_of(ellipsoid, anchor, flat_body, position + m * los);
            return Some((m, gp.normalize(central_longitude)));
        }
        if fm.signum() == fa.signum() {
            a = m;
            fa = fm;
        } else {
            b = m;
        }
    }
    let m = 0.5 * (a + b);
    let gp = geodetic_of(ellipsoid, anchor, flat_body, position + m * los);
    Some((m, gp.normalize(central_longitude)))
}

fn min_option(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}
