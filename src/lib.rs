// Distance-banded star connections. Stars are indexed once per batch in a KD-tree, then a
// TransitCalculator runs one radius query per star to find every unique pair within a band

pub mod error;
pub mod spatial_indexer;
pub mod transits;

pub use error::{BandError, ColorParseError, SpatialError, TransitError};
pub use spatial_indexer::kd_indexer::KdIndex;
pub use spatial_indexer::linear_indexer::LinearIndex;
pub use spatial_indexer::{Point, Positioned, SpatialIndexer};
pub use transits::{
    brute_force_pairs, BandDefinition, BandId, CalculatorConfig, Color, TransitCalculator,
    TransitDefinitions, TransitPair, TransitRoute,
};
