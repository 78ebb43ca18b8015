use nalgebra::Point3;

use crate::error::SpatialError;

pub mod kd_indexer;
pub mod linear_indexer;
pub mod point;

pub use point::Point;

// Number of coordinates a query slice must carry
pub const DIMENSIONS: usize = 3;

pub trait Positioned {
    fn position(&self) -> Point3<f64>;
}

impl Positioned for Point3<f64> {
    fn position(&self) -> Point3<f64> {
        *self
    }
}

impl Positioned for [f64; 3] {
    fn position(&self) -> Point3<f64> {
        Point3::new(self[0], self[1], self[2])
    }
}

impl<P: Positioned + ?Sized> Positioned for &P {
    fn position(&self) -> Point3<f64> {
        (**self).position()
    }
}

// query_from_slice turns a raw coordinate slice into a query point, rejecting anything that isn't 3D
pub fn query_from_slice(query: &[f64]) -> Result<Point3<f64>, SpatialError> {
    match query {
        [x, y, z] => Ok(Point3::new(*x, *y, *z)),
        _ => Err(SpatialError::InvalidDimension {
            expected: DIMENSIONS,
            found: query.len(),
        }),
    }
}

// SpatialIndexer answers radius and nearest neighbour queries over a fixed snapshot of points.
// It is built once and never mutated, so shared references can be queried from many threads.
pub trait SpatialIndexer<T> {
    // len is the number of stored points, duplicates included
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // range_search returns every point within `radius` of `origin`, boundary included
    fn range_search(&self, origin: Point3<f64>, radius: f64) -> Vec<&Point<T>>;

    // nearest_neighbor returns the closest point to `origin`, or None when nothing is indexed
    fn nearest_neighbor(&self, origin: Point3<f64>) -> Option<&Point<T>>;

    fn range_search_slice(&self, query: &[f64], radius: f64) -> Result<Vec<&Point<T>>, SpatialError> {
        let origin = query_from_slice(query)?;
        Ok(self.range_search(origin, radius))
    }

    fn nearest_neighbor_slice(&self, query: &[f64]) -> Result<Option<&Point<T>>, SpatialError> {
        let origin = query_from_slice(query)?;
        Ok(self.nearest_neighbor(origin))
    }
}
