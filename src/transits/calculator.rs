use std::collections::HashMap;
use std::time::Instant;

use rayon::prelude::*;

use crate::error::TransitError;
use crate::spatial_indexer::kd_indexer::KdIndex;
use crate::spatial_indexer::Positioned;
use crate::transits::band::{BandDefinition, BandId};
use crate::transits::definitions::TransitDefinitions;
use crate::transits::route::TransitRoute;

// Below this many stars the sequential loop beats the cost of fanning out
pub const PARALLEL_THRESHOLD: usize = 500;

// Stars handed to a worker at a time in parallel mode
pub const DEFAULT_CHUNK_SIZE: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalculatorConfig {
    pub parallel: bool,
    pub parallel_threshold: usize,
    pub chunk_size: usize,
    // None runs on rayon's global pool
    pub worker_threads: Option<usize>,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        CalculatorConfig {
            parallel: true,
            parallel_threshold: PARALLEL_THRESHOLD,
            chunk_size: DEFAULT_CHUNK_SIZE,
            worker_threads: None,
        }
    }
}

impl CalculatorConfig {
    pub fn sequential() -> Self {
        CalculatorConfig {
            parallel: false,
            ..CalculatorConfig::default()
        }
    }
}

// TransitPair is a connection between stars[source] and stars[target], always with source < target
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TransitPair {
    pub source: usize,
    pub target: usize,
    pub distance: f64,
}

// TransitCalculator finds every pair of stars whose separation falls inside a distance band.
// Each call builds a KD-tree and runs one radius query per star at the band's upper bound. A pair is
// only kept from the end with the lower input position, so each unordered pair is reported once.
// Large inputs are queried in chunks on a rayon pool; the result holds the same pairs as a
// sequential run, possibly in a different order.
#[derive(Debug)]
pub struct TransitCalculator {
    config: CalculatorConfig,
    pool: Option<rayon::ThreadPool>,
}

impl Default for TransitCalculator {
    fn default() -> Self {
        TransitCalculator::new()
    }
}

impl TransitCalculator {
    pub fn new() -> Self {
        TransitCalculator {
            config: CalculatorConfig::default(),
            pool: None,
        }
    }

    pub fn sequential() -> Self {
        TransitCalculator {
            config: CalculatorConfig::sequential(),
            pool: None,
        }
    }

    pub fn with_config(config: CalculatorConfig) -> Result<Self, TransitError> {
        let pool = match config.worker_threads {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("transit-worker-{i}"))
                    .build()?,
            ),
            None => None,
        };

        Ok(TransitCalculator { config, pool })
    }

    pub fn config(&self) -> &CalculatorConfig {
        &self.config
    }

    // runs_parallel is true when `star_count` stars would be fanned out across workers
    pub fn runs_parallel(&self, star_count: usize) -> bool {
        self.config.parallel && star_count >= self.config.parallel_threshold
    }

    // find_pairs returns every pair of stars with lower < distance <= upper, by position in `stars`
    pub fn find_pairs<S>(&self, stars: &[S], lower: f64, upper: f64) -> Vec<TransitPair>
    where
        S: Positioned + Sync,
    {
        if stars.len() < 2 || !(lower < upper) {
            return vec![];
        }

        let index = KdIndex::from_items(stars);

        self.discover(&index, upper, |source, target, distance| {
            (distance > lower && distance <= upper).then_some(TransitPair {
                source,
                target,
                distance,
            })
        })
    }

    // calculate styles every route inside `band` with the band's color and line width
    pub fn calculate<S>(&self, band: &BandDefinition, stars: &[S]) -> Vec<TransitRoute<S>>
    where
        S: Positioned + Clone + Send + Sync,
    {
        if stars.len() < 2 {
            return vec![];
        }
        if band.is_degenerate() {
            log::debug!(
                "band '{}' has an empty range ({}, {}], no transits",
                band.band_name,
                band.lower_range,
                band.upper_range
            );
            return vec![];
        }

        log::debug!(
            "calculating transits for {} stars (range: {}-{} ly)",
            stars.len(),
            band.lower_range,
            band.upper_range
        );

        let started = Instant::now();
        let index = KdIndex::from_items(stars);
        log::debug!("kd index built in {:?}", started.elapsed());

        let started = Instant::now();
        let routes = self.discover(&index, band.upper_range, |source, target, distance| {
            band.contains(distance).then(|| {
                TransitRoute::for_band(stars[source].clone(), stars[target].clone(), distance, band)
            })
        });
        log::debug!(
            "transit queries completed in {:?}, found {} routes",
            started.elapsed(),
            routes.len()
        );

        routes
    }

    // calculate_multi_band shares one index and one query per star across the enabled bands.
    // A pair matching more than one band goes to the first of them, bands without routes are left out
    pub fn calculate_multi_band<S>(
        &self,
        bands: &[BandDefinition],
        stars: &[S],
    ) -> HashMap<BandId, Vec<TransitRoute<S>>>
    where
        S: Positioned + Clone + Send + Sync,
    {
        let enabled: Vec<&BandDefinition> = bands.iter().filter(|b| b.enabled).collect();
        let max_range = enabled
            .iter()
            .map(|b| b.upper_range)
            .fold(f64::NEG_INFINITY, f64::max);

        if stars.len() < 2 || !(max_range > 0.0) {
            return HashMap::new();
        }

        log::debug!(
            "calculating transits for {} stars over {} bands (max range: {} ly)",
            stars.len(),
            enabled.len(),
            max_range
        );

        let started = Instant::now();
        let index = KdIndex::from_items(stars);

        let found = self.discover(&index, max_range, |source, target, distance| {
            enabled.iter().find(|b| b.contains(distance)).map(|band| {
                (
                    band.band_id,
                    TransitRoute::for_band(
                        stars[source].clone(),
                        stars[target].clone(),
                        distance,
                        band,
                    ),
                )
            })
        });

        let mut by_band: HashMap<BandId, Vec<TransitRoute<S>>> = HashMap::new();
        for (band_id, route) in found {
            by_band.entry(band_id).or_default().push(route);
        }

        log::debug!(
            "multi band transits completed in {:?}, {} bands have routes",
            started.elapsed(),
            by_band.len()
        );

        by_band
    }

    // calculate_definitions validates a dataset's bands before routing stars through its enabled ones
    pub fn calculate_definitions<S>(
        &self,
        definitions: &TransitDefinitions,
        stars: &[S],
    ) -> Result<HashMap<BandId, Vec<TransitRoute<S>>>, TransitError>
    where
        S: Positioned + Clone + Send + Sync,
    {
        definitions.validate()?;

        Ok(self.calculate_multi_band(&definitions.bands, stars))
    }

    // discover runs one radius query per star and hands each unordered pair to `accept` exactly once
    fn discover<P, R, F>(&self, index: &KdIndex<P>, radius: f64, accept: F) -> Vec<R>
    where
        P: Sync,
        R: Send,
        F: Fn(usize, usize, f64) -> Option<R> + Sync,
    {
        let from_source = |source: usize, found: &mut Vec<R>| {
            let origin = &index[source];

            for target in index.indices_within(origin.position(), radius) {
                // Both ends find the pair, only the lower index keeps it. This also drops source itself
                if target <= source {
                    continue;
                }

                if let Some(r) = accept(source, target, origin.distance_to(&index[target])) {
                    found.push(r)
                }
            }
        };

        let star_count = index.len();

        if !self.runs_parallel(star_count) {
            let mut found = vec![];
            for source in 0..star_count {
                from_source(source, &mut found);
            }
            return found;
        }

        let sources: Vec<usize> = (0..star_count).collect();
        let chunk_size = self.config.chunk_size.max(1);

        let fan_out = || {
            sources
                .par_chunks(chunk_size)
                .map(|chunk| {
                    let mut found = vec![];
                    for &source in chunk {
                        from_source(source, &mut found);
                    }
                    found
                })
                .collect::<Vec<Vec<R>>>()
        };

        let partitions = match &self.pool {
            Some(pool) => pool.install(fan_out),
            None => fan_out(),
        };

        log::trace!(
            "merging {} partitions from {} stars",
            partitions.len(),
            star_count
        );

        partitions.into_iter().flatten().collect()
    }
}

// brute_force_pairs checks every pair of stars directly. Quadratic, meant for verifying the indexed search
pub fn brute_force_pairs<S: Positioned>(stars: &[S], lower: f64, upper: f64) -> Vec<TransitPair> {
    let mut pairs = vec![];

    for (source, a) in stars.iter().enumerate() {
        for (target, b) in stars.iter().enumerate().skip(source + 1) {
            let distance = nalgebra::distance(&a.position(), &b.position());
            if distance > lower && distance <= upper {
                pairs.push(TransitPair {
                    source,
                    target,
                    distance,
                })
            }
        }
    }

    pairs
}
