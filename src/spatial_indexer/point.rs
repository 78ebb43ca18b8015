use nalgebra::{distance, Point3};

use crate::spatial_indexer::Positioned;

// Point pairs an immutable position with an opaque payload, usually the star it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct Point<T> {
    position: Point3<f64>,
    data: T,
}

impl<T> Point<T> {
    pub fn new(x: f64, y: f64, z: f64, data: T) -> Self {
        Point {
            position: Point3::new(x, y, z),
            data,
        }
    }

    pub fn from_position(position: Point3<f64>, data: T) -> Self {
        Point { position, data }
    }

    pub fn x(&self) -> f64 {
        self.position.x
    }

    pub fn y(&self) -> f64 {
        self.position.y
    }

    pub fn z(&self) -> f64 {
        self.position.z
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn into_data(self) -> T {
        self.data
    }

    pub fn distance_to<U>(&self, other: &Point<U>) -> f64 {
        distance(&self.position, &other.position)
    }

    pub fn distance_to_coords(&self, x: f64, y: f64, z: f64) -> f64 {
        distance(&self.position, &Point3::new(x, y, z))
    }

    // distance_from measures from `origin` with the same expression as distance_to, so range
    // membership and reported distances always agree
    pub(crate) fn distance_from(&self, origin: &Point3<f64>) -> f64 {
        distance(origin, &self.position)
    }

    pub(crate) fn distance_squared_to(&self, origin: &Point3<f64>) -> f64 {
        (self.position - *origin).norm_squared()
    }
}

impl<T> Positioned for Point<T> {
    fn position(&self) -> Point3<f64> {
        self.position
    }
}

#[cfg(test)]
mod test {
    use nalgebra::point;

    use super::*;

    #[test]
    fn euclidean_distance() {
        let a = Point::new(0.0, 0.0, 0.0, "Sol");
        let b = Point::new(1.0, 2.0, 2.0, "Other");

        assert_eq!(a.distance_to(&b), 3.0);
        assert_eq!(b.distance_to(&a), 3.0);
        assert_eq!(a.distance_to_coords(0.0, 3.0, 4.0), 5.0);
        assert_eq!(a.distance_to(&a), 0.0);
    }

    #[test]
    fn negative_coordinates() {
        let a = Point::new(-5.0, -10.0, -15.0, ());
        let b = Point::from_position(point![5.0, 10.0, 15.0], ());

        assert!((a.distance_to(&b) - 37.416_573_867_739_41).abs() < 1e-9);
        assert_eq!(a.x(), -5.0);
        assert_eq!(a.y(), -10.0);
        assert_eq!(a.z(), -15.0);
    }

    #[test]
    fn payload_is_untouched() {
        let p = Point::new(1.0, 1.0, 1.0, String::from("Barnard's Star"));

        assert_eq!(p.data(), "Barnard's Star");
        assert_eq!(p.position(), point![1.0, 1.0, 1.0]);
        assert_eq!(p.into_data(), "Barnard's Star");
    }
}
