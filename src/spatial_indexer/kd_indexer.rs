use std::ops::Index;
use std::time::Instant;

use nalgebra::Point3;

use crate::spatial_indexer::{Point, Positioned, SpatialIndexer};

// KD_LEAF_SIZE controls the max size of leaf nodes. Below this a linear scan beats another split
const KD_LEAF_SIZE: usize = 8;

// Subtrees are pruned against a radius a few ulps wider than the query. Membership itself is always
// decided on the rounded Euclidean distance, so a pair reported at distance d is found by a query of radius d
const PRUNE_SLACK: f64 = 4.0 * f64::EPSILON;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum SplitAxis {
    X,
    Y,
    Z,
}

impl SplitAxis {
    fn next(&self) -> SplitAxis {
        match self {
            SplitAxis::X => SplitAxis::Y,
            SplitAxis::Y => SplitAxis::Z,
            SplitAxis::Z => SplitAxis::X,
        }
    }

    fn component(&self, v: &Point3<f64>) -> f64 {
        match self {
            SplitAxis::X => v.x,
            SplitAxis::Y => v.y,
            SplitAxis::Z => v.z,
        }
    }
}

// Nodes live in a flat arena and refer to each other by position in it
#[derive(Debug, Clone)]
enum KdNode {
    // Leaf covers order[start..end]
    Leaf { start: usize, end: usize },
    // Everything under `left` has component <= midpoint, everything under `right` has component >= midpoint
    Split {
        axis: SplitAxis,
        midpoint: f64,
        left: usize,
        right: usize,
    },
}

fn _construct<T>(
    points: &[Point<T>],
    items: &mut [usize],
    offset: usize,
    axis: SplitAxis,
    nodes: &mut Vec<KdNode>,
) -> usize {
    if items.len() <= KD_LEAF_SIZE {
        nodes.push(KdNode::Leaf {
            start: offset,
            end: offset + items.len(),
        });
        return nodes.len() - 1;
    }

    let (midpoint, median) = _split(points, items, axis);

    // Reserve our slot before the children so the root is always node 0
    let node = nodes.len();
    nodes.push(KdNode::Leaf { start: 0, end: 0 });

    let (left_items, right_items) = items.split_at_mut(median);
    let left = _construct(points, left_items, offset, axis.next(), nodes);
    let right = _construct(points, right_items, offset + median, axis.next(), nodes);

    nodes[node] = KdNode::Split {
        axis,
        midpoint,
        left,
        right,
    };

    node
}

// _split partitions items around their median on `axis`, returning the split value and its position
fn _split<T>(points: &[Point<T>], items: &mut [usize], axis: SplitAxis) -> (f64, usize) {
    let median = items.len() / 2;

    items.select_nth_unstable_by(median, |a, b| {
        let a = axis.component(&points[*a].position());
        let b = axis.component(&points[*b].position());
        a.total_cmp(&b)
    });

    (axis.component(&points[items[median]].position()), median)
}

// KdIndex is a balanced KD-tree built once from a snapshot of points.
// Coordinates are assumed to be finite; NaN positions are never reported by queries.
#[derive(Debug, Clone)]
pub struct KdIndex<T> {
    points: Vec<Point<T>>,
    // Point indices grouped so every leaf owns a contiguous run
    order: Vec<usize>,
    nodes: Vec<KdNode>,
}

impl<T> Index<usize> for KdIndex<T> {
    type Output = Point<T>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}

impl<P: Positioned> KdIndex<P> {
    // from_items indexes anything with a position, keeping the item itself as the payload
    pub fn from_items(items: impl IntoIterator<Item = P>) -> Self {
        KdIndex::build(
            items
                .into_iter()
                .map(|item| Point::from_position(item.position(), item))
                .collect(),
        )
    }
}

impl<T> KdIndex<T> {
    pub fn build(points: Vec<Point<T>>) -> Self {
        let started = Instant::now();

        let mut order: Vec<usize> = (0..points.len()).collect();
        let mut nodes = Vec::with_capacity(2 * points.len() / KD_LEAF_SIZE + 1);

        if !points.is_empty() {
            _construct(&points, &mut order, 0, SplitAxis::X, &mut nodes);
        }

        log::trace!(
            "kd index over {} points built with {} nodes in {:?}",
            points.len(),
            nodes.len(),
            started.elapsed()
        );

        KdIndex {
            points,
            order,
            nodes,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Point<T>> {
        self.points.get(index)
    }

    // points are kept in the order they were given
    pub fn points(&self) -> &[Point<T>] {
        &self.points
    }

    // height is the number of levels from the root to the deepest leaf
    pub fn height(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }

        let mut height = 0;
        let mut stack = vec![(0, 1)];
        while let Some((node, depth)) = stack.pop() {
            height = height.max(depth);
            if let KdNode::Split { left, right, .. } = self.nodes[node] {
                stack.push((left, depth + 1));
                stack.push((right, depth + 1));
            }
        }

        height
    }

    pub fn range_search_xyz(&self, x: f64, y: f64, z: f64, radius: f64) -> Vec<&Point<T>> {
        self.range_search(Point3::new(x, y, z), radius)
    }

    // indices_within returns the input position of every point within `radius` of `origin`
    pub fn indices_within(&self, origin: Point3<f64>, radius: f64) -> Vec<usize> {
        let mut indices = vec![];

        self.visit_in_radius(origin, radius, |i| indices.push(i));

        indices
    }

    pub fn range_count(&self, origin: Point3<f64>, radius: f64) -> usize {
        let mut count = 0;

        self.visit_in_radius(origin, radius, |_| count += 1);

        count
    }

    // any_within stops at the first point found within `radius` of `origin`
    pub fn any_within(&self, origin: Point3<f64>, radius: f64) -> bool {
        if self.nodes.is_empty() || !(radius >= 0.0) {
            return false;
        }

        self.any_overlap(0, &origin, radius, radius * (1.0 + PRUNE_SLACK))
    }

    fn visit_in_radius(&self, origin: Point3<f64>, radius: f64, mut f: impl FnMut(usize)) {
        // A negative or NaN radius can't contain anything
        if self.nodes.is_empty() || !(radius >= 0.0) {
            return;
        }

        self.get_items_in_radius(0, &origin, radius, radius * (1.0 + PRUNE_SLACK), &mut f)
    }

    fn get_items_in_radius(
        &self,
        node: usize,
        origin: &Point3<f64>,
        radius: f64,
        reach: f64,
        f: &mut impl FnMut(usize),
    ) {
        match self.nodes[node] {
            KdNode::Leaf { start, end } => {
                for &i in &self.order[start..end] {
                    if self.points[i].distance_from(origin) <= radius {
                        f(i)
                    }
                }
            }
            KdNode::Split {
                axis,
                midpoint,
                left,
                right,
            } => {
                let diff = axis.component(origin) - midpoint;
                let (near, far) = if diff <= 0.0 {
                    (left, right)
                } else {
                    (right, left)
                };

                self.get_items_in_radius(near, origin, radius, reach, f);

                // The far side is only reachable if the splitting plane is inside the sphere
                if diff.abs() <= reach {
                    self.get_items_in_radius(far, origin, radius, reach, f);
                }
            }
        }
    }

    fn any_overlap(&self, node: usize, origin: &Point3<f64>, radius: f64, reach: f64) -> bool {
        match self.nodes[node] {
            KdNode::Leaf { start, end } => self.order[start..end]
                .iter()
                .any(|&i| self.points[i].distance_from(origin) <= radius),
            KdNode::Split {
                axis,
                midpoint,
                left,
                right,
            } => {
                let diff = axis.component(origin) - midpoint;
                let (near, far) = if diff <= 0.0 {
                    (left, right)
                } else {
                    (right, left)
                };

                self.any_overlap(near, origin, radius, reach)
                    || (diff.abs() <= reach && self.any_overlap(far, origin, radius, reach))
            }
        }
    }

    // nearest_in descends towards origin first, then backtracks into any side that could hold something closer
    fn nearest_in(&self, node: usize, origin: &Point3<f64>, best: &mut Option<(usize, f64)>) {
        match self.nodes[node] {
            KdNode::Leaf { start, end } => {
                for &i in &self.order[start..end] {
                    let dist_sq = self.points[i].distance_squared_to(origin);
                    let closer = match *best {
                        Some((_, best_sq)) => dist_sq < best_sq,
                        None => !dist_sq.is_nan(),
                    };
                    if closer {
                        *best = Some((i, dist_sq));
                    }
                }
            }
            KdNode::Split {
                axis,
                midpoint,
                left,
                right,
            } => {
                let diff = axis.component(origin) - midpoint;
                let (near, far) = if diff <= 0.0 {
                    (left, right)
                } else {
                    (right, left)
                };

                self.nearest_in(near, origin, best);

                let worth_visiting = match *best {
                    Some((_, best_sq)) => diff * diff < best_sq,
                    None => true,
                };
                if worth_visiting {
                    self.nearest_in(far, origin, best);
                }
            }
        }
    }
}

impl<T> SpatialIndexer<T> for KdIndex<T> {
    fn len(&self) -> usize {
        self.points.len()
    }

    fn range_search(&self, origin: Point3<f64>, radius: f64) -> Vec<&Point<T>> {
        let mut items = vec![];

        self.visit_in_radius(origin, radius, |i| items.push(&self.points[i]));

        items
    }

    fn nearest_neighbor(&self, origin: Point3<f64>) -> Option<&Point<T>> {
        if self.nodes.is_empty() {
            return None;
        }

        let mut best = None;
        self.nearest_in(0, &origin, &mut best);

        best.map(|(i, _)| &self.points[i])
    }
}

#[cfg(test)]
mod test {
    use nalgebra::point;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::error::SpatialError;
    use crate::spatial_indexer::linear_indexer::LinearIndex;

    use super::*;

    fn random_points(rng: &mut StdRng, n: usize, extent: f64) -> Vec<Point<usize>> {
        (0..n)
            .map(|i| {
                Point::new(
                    rng.gen_range(-extent..extent),
                    rng.gen_range(-extent..extent),
                    rng.gen_range(-extent..extent),
                    i,
                )
            })
            .collect()
    }

    fn sorted_ids(points: Vec<&Point<usize>>) -> Vec<usize> {
        let mut ids: Vec<usize> = points.iter().map(|p| *p.data()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn empty_index() {
        let index: KdIndex<()> = KdIndex::build(vec![]);

        assert_eq!(index.len(), 0);
        assert!(index.is_empty());
        assert_eq!(index.height(), 0);
        assert!(index.range_search(point![0.0, 0.0, 0.0], 100.0).is_empty());
        assert!(index.nearest_neighbor(point![0.0, 0.0, 0.0]).is_none());
        assert_eq!(index.range_count(point![0.0, 0.0, 0.0], 100.0), 0);
        assert!(!index.any_within(point![0.0, 0.0, 0.0], 100.0));
    }

    #[test]
    fn single_point() {
        let index = KdIndex::build(vec![Point::new(1.0, 2.0, 3.0, 42)]);

        assert_eq!(index.len(), 1);
        assert!(!index.is_empty());

        let nearest = index.nearest_neighbor(point![0.0, 0.0, 0.0]).unwrap();
        assert_eq!(*nearest.data(), 42);

        assert_eq!(index.range_search_xyz(1.0, 2.0, 3.0, 0.01).len(), 1);
        assert!(index.range_search_xyz(100.0, 100.0, 100.0, 0.01).is_empty());
    }

    #[test]
    fn duplicates_are_kept() {
        let index = KdIndex::build(vec![
            Point::new(1.0, 1.0, 1.0, 0),
            Point::new(1.0, 1.0, 1.0, 1),
            Point::new(1.0, 1.0, 1.0, 2),
        ]);

        assert_eq!(index.len(), 3);
        assert_eq!(sorted_ids(index.range_search(point![1.0, 1.0, 1.0], 0.0)), vec![0, 1, 2]);
    }

    #[test]
    fn many_duplicates_across_splits() {
        let points: Vec<Point<usize>> = (0..100).map(|i| Point::new(5.0, 5.0, 5.0, i)).collect();
        let index = KdIndex::build(points);

        assert_eq!(index.len(), 100);
        assert_eq!(index.range_count(point![5.0, 5.0, 5.0], 0.01), 100);
        assert_eq!(
            index
                .nearest_neighbor(point![5.0, 5.0, 5.0])
                .unwrap()
                .distance_to_coords(5.0, 5.0, 5.0),
            0.0
        );
    }

    #[test]
    fn radius_is_inclusive() {
        let index = KdIndex::build(vec![Point::new(0.0, 0.0, 0.0, 0), Point::new(3.0, 4.0, 0.0, 1)]);

        assert_eq!(sorted_ids(index.range_search(point![0.0, 0.0, 0.0], 5.0)), vec![0, 1]);
        assert_eq!(sorted_ids(index.range_search(point![0.0, 0.0, 0.0], 4.999)), vec![0]);
    }

    #[test]
    fn radius_equal_to_measured_distance() {
        let mut rng = StdRng::seed_from_u64(2024);
        let points = random_points(&mut rng, 300, 50.0);
        let index = KdIndex::build(points.clone());

        for _ in 0..500 {
            let origin = point![
                rng.gen_range(-50.0..50.0),
                rng.gen_range(-50.0..50.0),
                rng.gen_range(-50.0..50.0)
            ];
            let target = &points[rng.gen_range(0..points.len())];
            let radius = nalgebra::distance(&origin, &target.position());

            let expected: Vec<usize> = points
                .iter()
                .filter(|p| nalgebra::distance(&origin, &p.position()) <= radius)
                .map(|p| *p.data())
                .collect();

            let found = sorted_ids(index.range_search(origin, radius));
            assert!(found.contains(target.data()), "radius {radius} misses its own point");
            assert_eq!(found, expected);
            assert!(index.any_within(origin, radius));
        }
    }

    #[test]
    fn negative_radius_finds_nothing() {
        let index = KdIndex::build(vec![Point::new(0.0, 0.0, 0.0, 0)]);

        assert!(index.range_search(point![0.0, 0.0, 0.0], -1.0).is_empty());
        assert!(index.range_search(point![0.0, 0.0, 0.0], f64::NAN).is_empty());
        assert!(!index.any_within(point![0.0, 0.0, 0.0], -1.0));
    }

    #[test]
    fn wrong_dimension_is_rejected() {
        let index = KdIndex::build(vec![Point::new(0.0, 0.0, 0.0, 0)]);

        assert_eq!(
            index.range_search_slice(&[0.0, 0.0], 1.0),
            Err(SpatialError::InvalidDimension {
                expected: 3,
                found: 2
            })
        );
        assert!(index.nearest_neighbor_slice(&[0.0, 0.0, 0.0, 0.0]).is_err());
        assert_eq!(index.range_search_slice(&[0.0, 0.0, 0.0], 1.0).unwrap().len(), 1);
    }

    #[test]
    fn wrong_dimension_is_rejected_when_empty() {
        let index: KdIndex<()> = KdIndex::build(vec![]);

        assert!(index.range_search_slice(&[0.0], 1.0).is_err());
        assert_eq!(index.nearest_neighbor_slice(&[0.0, 0.0, 0.0]), Ok(None));
    }

    #[test]
    fn tree_is_balanced() {
        let mut rng = StdRng::seed_from_u64(7);
        let index = KdIndex::build(random_points(&mut rng, 4096, 100.0));

        // 4096 points in leaves of at most 8 need 9 levels of splits
        assert_eq!(index.height(), 10);
    }

    #[test]
    fn input_order_is_preserved() {
        let mut rng = StdRng::seed_from_u64(3);
        let points = random_points(&mut rng, 200, 10.0);
        let index = KdIndex::build(points.clone());

        for (i, point) in points.iter().enumerate() {
            assert_eq!(&index[i], point);
            assert_eq!(*index.get(i).unwrap().data(), i);
        }
        assert!(index.get(200).is_none());
    }

    #[test]
    fn range_search_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(123_456_789);
        let points = random_points(&mut rng, 1000, 50.0);
        let index = KdIndex::build(points.clone());
        let reference = LinearIndex::build(points);

        for _ in 0..100 {
            let origin = point![
                rng.gen_range(-60.0..60.0),
                rng.gen_range(-60.0..60.0),
                rng.gen_range(-60.0..60.0)
            ];
            let radius = rng.gen_range(0.0..30.0);

            let found = index.range_search(origin, radius);
            for p in &found {
                assert!(nalgebra::distance(&p.position(), &origin) <= radius + 1e-9);
            }

            let expected = sorted_ids(reference.range_search(origin, radius));
            assert_eq!(sorted_ids(found), expected, "origin {origin:?} radius {radius}");

            let mut indices = index.indices_within(origin, radius);
            indices.sort();
            assert_eq!(indices, expected);
            assert_eq!(index.range_count(origin, radius), expected.len());
            assert_eq!(index.any_within(origin, radius), !expected.is_empty());
        }
    }

    #[test]
    fn nearest_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(987_654_321);
        let points = random_points(&mut rng, 500, 20.0);
        let index = KdIndex::build(points.clone());
        let reference = LinearIndex::build(points);

        for _ in 0..200 {
            let origin = point![
                rng.gen_range(-25.0..25.0),
                rng.gen_range(-25.0..25.0),
                rng.gen_range(-25.0..25.0)
            ];

            let found = index.nearest_neighbor(origin).unwrap();
            let expected = reference.nearest_neighbor(origin).unwrap();

            assert_eq!(
                nalgebra::distance(&found.position(), &origin),
                nalgebra::distance(&expected.position(), &origin)
            );
        }
    }

    #[test]
    fn nearest_on_exact_point() {
        let mut rng = StdRng::seed_from_u64(42);
        let points = random_points(&mut rng, 100, 10.0);
        let index = KdIndex::build(points.clone());

        for point in &points {
            let found = index.nearest_neighbor(point.position()).unwrap();
            assert_eq!(found.data(), point.data());
            assert_eq!(found.distance_to(point), 0.0);
        }
    }

    #[test]
    fn from_positioned_items() {
        let index = KdIndex::from_items(vec![[0.0, 0.0, 0.0], [10.0, 0.0, 0.0]]);

        let nearest = index.nearest_neighbor_slice(&[9.0, 1.0, 0.0]).unwrap().unwrap();
        assert_eq!(*nearest.data(), [10.0, 0.0, 0.0]);
    }
}
