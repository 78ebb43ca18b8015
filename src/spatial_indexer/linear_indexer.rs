use nalgebra::Point3;

use crate::spatial_indexer::{Point, Positioned, SpatialIndexer};

// LinearIndex answers every query with a full scan. It is the reference the KD-tree is checked against,
// and is also the cheaper choice for a handful of points
#[derive(Debug, Clone)]
pub struct LinearIndex<T> {
    points: Vec<Point<T>>,
}

impl<P: Positioned> LinearIndex<P> {
    pub fn from_items(items: impl IntoIterator<Item = P>) -> Self {
        LinearIndex::build(
            items
                .into_iter()
                .map(|item| Point::from_position(item.position(), item))
                .collect(),
        )
    }
}

impl<T> LinearIndex<T> {
    pub fn build(points: Vec<Point<T>>) -> Self {
        LinearIndex { points }
    }

    pub fn points(&self) -> &[Point<T>] {
        &self.points
    }
}

impl<T> SpatialIndexer<T> for LinearIndex<T> {
    fn len(&self) -> usize {
        self.points.len()
    }

    fn range_search(&self, origin: Point3<f64>, radius: f64) -> Vec<&Point<T>> {
        if !(radius >= 0.0) {
            return vec![];
        }

        self.points
            .iter()
            .filter(|p| p.distance_from(&origin) <= radius)
            .collect()
    }

    fn nearest_neighbor(&self, origin: Point3<f64>) -> Option<&Point<T>> {
        self.points
            .iter()
            .map(|p| (p, p.distance_squared_to(&origin)))
            .filter(|(_, dist_sq)| !dist_sq.is_nan())
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(p, _)| p)
    }
}
