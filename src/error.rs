use thiserror::Error;

use crate::transits::band::BandId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpatialError {
    #[error("query point must have {expected} dimensions, got {found}")]
    InvalidDimension { expected: usize, found: usize },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BandError {
    #[error("band '{name}' has an invalid range ({lower}, {upper}]")]
    InvalidRange {
        band_id: BandId,
        name: String,
        lower: f64,
        upper: f64,
    },

    #[error("band '{first}' overlaps band '{second}'")]
    Overlap {
        first_id: BandId,
        first: String,
        second_id: BandId,
        second: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorParseError {
    #[error("color '{0}' must be 0xRRGGBB[AA] or #RRGGBB[AA]")]
    Format(String),

    #[error("color '{0}' contains non-hex digits")]
    Digits(String),
}

#[derive(Debug, Error)]
pub enum TransitError {
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Band(#[from] BandError),
}
