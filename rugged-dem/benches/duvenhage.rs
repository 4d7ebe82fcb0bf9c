use std::{hint::black_box, sync::Arc};

use criterion::{criterion_group, criterion_main, Criterion};
use nalgebra::Vector3;
use rugged_dem::{Duvenhage, MinMaxKdTree, TileUpdater, TilesCache, UpdatableTile};
use rugged_ellipsoid::{BodyFrameId, Ellipsoid, EllipsoidId, GeodeticPoint};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

struct RidgeUpdater {
    tile_size: f64,
    dim: usize,
}

impl TileUpdater for RidgeUpdater {
    fn update_tile(&self, lat: f64, lon: f64, out: &mut UpdatableTile) {
        let min_lat = (lat / self.tile_size).floor() * self.tile_size;
        let min_lon = (lon / self.tile_size).floor() * self.tile_size;
        let step = self.tile_size / (self.dim - 1) as f64;
        out.set_geometry(min_lat, min_lon, step, step, self.dim, self.dim);
        for i in 0..self.dim {
            for j in 0..self.dim {
                let ridge = ((i as f64 - self.dim as f64 / 2.0).abs()).max((j as f64 - self.dim as f64 / 2.0).abs());
                out.set_elevation(i, j, 1000.0 - 2.0 * ridge);
            }
        }
    }
}

fn wgs84() -> Ellipsoid {
    Ellipsoid::from_id(EllipsoidId::Wgs84, BodyFrameId::Itrf)
}

fn nadir_view(e: &Ellipsoid, lat: f64, lon: f64, range: f64) -> (Vector3<f64>, Vector3<f64>) {
    let surface = e.to_cartesian(GeodeticPoint::new(lat, lon, 0.0));
    let zenith = Vector3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin());
    (surface + zenith * range, -zenith)
}

fn kdtree_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("MinMaxKdTree::build");
    for dim in [64usize, 256, 1024] {
        let cache = TilesCache::new(RidgeUpdater { tile_size: 0.02, dim }, 2);
        let indexed = cache.get_tile(0.01, 0.01).unwrap();
        let tile = indexed.tile();
        group.bench_function(format!("{dim}x{dim}"), |b| {
            b.iter(|| black_box(MinMaxKdTree::build(tile)));
        });
    }
}

fn duvenhage_walk(c: &mut Criterion) {
    let e = wgs84();
    let mut group = c.benchmark_group("Duvenhage::intersection");
    for dim in [64usize, 256] {
        let cache = Arc::new(TilesCache::new(RidgeUpdater { tile_size: 0.02, dim }, 16));
        let duvenhage = Duvenhage::new(cache);
        let (position, los) = nadir_view(&e, 0.01, 0.01, 700_000.0);
        group.bench_function(format!("{dim}x{dim}"), |b| {
            b.iter(|| black_box(duvenhage.intersection(&e, position, los).unwrap()));
        });
    }
}

criterion_group!(benches, kdtree_build, duvenhage_walk);
criterion_main!(benches);
