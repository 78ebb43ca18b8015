use std::fmt;

use uuid::Uuid;

use crate::error::BandError;
use crate::transits::color::Color;

pub const DEFAULT_BAND_LINE_WIDTH: f64 = 0.5;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BandId(Uuid);

impl BandId {
    pub fn new() -> Self {
        BandId(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        BandId(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BandId {
    fn default() -> Self {
        BandId::new()
    }
}

impl fmt::Display for BandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

// BandDefinition connects stars strictly further apart than `lower_range` and no further than
// `upper_range`. lower_range >= upper_range is tolerated, such a band never matches
#[derive(Debug, Clone, PartialEq)]
pub struct BandDefinition {
    pub band_id: BandId,
    pub band_name: String,
    pub enabled: bool,
    pub lower_range: f64,
    pub upper_range: f64,
    pub color: Color,
    pub line_width: f64,
}

impl BandDefinition {
    pub fn new(band_name: impl Into<String>, lower_range: f64, upper_range: f64) -> Self {
        BandDefinition {
            band_id: BandId::new(),
            band_name: band_name.into(),
            enabled: true,
            lower_range,
            upper_range,
            color: Color::default(),
            line_width: DEFAULT_BAND_LINE_WIDTH,
        }
    }

    pub fn with_id(mut self, band_id: BandId) -> Self {
        self.band_id = band_id;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_line_width(mut self, line_width: f64) -> Self {
        self.line_width = line_width;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    // contains is lower < distance <= upper
    pub fn contains(&self, distance: f64) -> bool {
        distance > self.lower_range && distance <= self.upper_range
    }

    // a degenerate band can never contain any distance
    pub fn is_degenerate(&self) -> bool {
        !(self.lower_range < self.upper_range)
    }

    // overlaps is true when some distance satisfies both bands. Adjacent bands such as (0, 5] and (5, 10] don't
    pub fn overlaps(&self, other: &BandDefinition) -> bool {
        if self.is_degenerate() || other.is_degenerate() {
            return false;
        }

        self.lower_range < other.upper_range && other.lower_range < self.upper_range
    }

    // check_range rejects ranges no star pair could ever fall in
    pub(crate) fn check_range(&self) -> Result<(), BandError> {
        if self.is_degenerate() || self.lower_range < 0.0 {
            return Err(BandError::InvalidRange {
                band_id: self.band_id,
                name: self.band_name.clone(),
                lower: self.lower_range,
                upper: self.upper_range,
            });
        }

        Ok(())
    }
}
