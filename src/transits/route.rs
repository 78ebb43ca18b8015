use std::fmt::Display;

use nalgebra::Point3;

use crate::spatial_indexer::Positioned;
use crate::transits::band::BandDefinition;
use crate::transits::color::Color;

// TransitRoute is one connection between two stars, styled by the band it was found in.
// Routes produced by the calculator are always good; `invalid` exists for consumers that need a placeholder
#[derive(Debug, Clone, PartialEq)]
pub struct TransitRoute<T> {
    pub source: T,
    pub target: T,
    pub distance: f64,
    pub color: Color,
    pub line_weight: f64,
    pub good: bool,
}

impl<T> TransitRoute<T> {
    pub fn new(source: T, target: T, distance: f64, color: Color, line_weight: f64) -> Self {
        TransitRoute {
            source,
            target,
            distance,
            color,
            line_weight,
            good: true,
        }
    }

    pub fn invalid(source: T, target: T) -> Self {
        TransitRoute {
            source,
            target,
            distance: 0.0,
            color: Color::TRANSPARENT,
            line_weight: 0.0,
            good: false,
        }
    }

    pub fn for_band(source: T, target: T, distance: f64, band: &BandDefinition) -> Self {
        TransitRoute::new(source, target, distance, band.color, band.line_width)
    }

    pub fn is_good(&self) -> bool {
        self.good
    }
}

impl<T: Display> TransitRoute<T> {
    // name is "source,target"
    pub fn name(&self) -> String {
        format!("{},{}", self.source, self.target)
    }
}

impl<T: Positioned> TransitRoute<T> {
    pub fn source_endpoint(&self) -> Point3<f64> {
        self.source.position()
    }

    pub fn target_endpoint(&self) -> Point3<f64> {
        self.target.position()
    }
}
