use crate::error::BandError;
use crate::transits::band::{BandDefinition, BandId};

// TransitDefinitions is the set of bands configured for one dataset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitDefinitions {
    pub data_set_name: Option<String>,
    pub selected: bool,
    pub bands: Vec<BandDefinition>,
}

impl TransitDefinitions {
    pub fn new(data_set_name: impl Into<String>, bands: Vec<BandDefinition>) -> Self {
        TransitDefinitions {
            data_set_name: Some(data_set_name.into()),
            selected: true,
            bands,
        }
    }

    pub fn find(&self, band_id: BandId) -> Option<&BandDefinition> {
        self.bands.iter().find(|b| b.band_id == band_id)
    }

    pub fn find_mut(&mut self, band_id: BandId) -> Option<&mut BandDefinition> {
        self.bands.iter_mut().find(|b| b.band_id == band_id)
    }

    pub fn enabled_bands(&self) -> impl Iterator<Item = &BandDefinition> + '_ {
        self.bands.iter().filter(|b| b.enabled)
    }

    // validate checks the enabled bands only: each must have a usable range and none may overlap
    pub fn validate(&self) -> Result<(), BandError> {
        let enabled: Vec<&BandDefinition> = self.enabled_bands().collect();

        for band in &enabled {
            band.check_range()?;
        }

        for (i, first) in enabled.iter().enumerate() {
            for second in &enabled[i + 1..] {
                if first.overlaps(second) {
                    return Err(BandError::Overlap {
                        first_id: first.band_id,
                        first: first.band_name.clone(),
                        second_id: second.band_id,
                        second: second.band_name.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}
