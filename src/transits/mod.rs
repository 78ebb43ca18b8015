pub mod band;
pub mod calculator;
pub mod color;
pub mod definitions;
pub mod route;

pub use band::{BandDefinition, BandId, DEFAULT_BAND_LINE_WIDTH};
pub use calculator::{brute_force_pairs, CalculatorConfig, TransitCalculator, TransitPair};
pub use color::Color;
pub use definitions::TransitDefinitions;
pub use route::TransitRoute;
