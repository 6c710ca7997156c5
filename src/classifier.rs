use log::debug;

use crate::errors::Result;
use crate::input::Tile;
use crate::traits::ClassificationModel;

/// Probability above which a tile is reported as containing a silo.
pub const SILO_PROBABILITY_THRESHOLD: f32 = 0.5;

/// Classifier verdict for one tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Presence {
    pub probability: f32,
}

impl Presence {
    pub fn from_probability(probability: f32) -> Self {
        Self { probability }
    }

    pub fn is_silo(&self) -> bool {
        self.probability > SILO_PROBABILITY_THRESHOLD
    }
}

/// Ask `model` whether `tile` shows a silo. The classifier sees raw 0..=255 samples.
pub fn classify<M>(model: &M, tile: &Tile) -> Result<Presence>
where
    M: ClassificationModel + ?Sized,
{
    let probability = model.predict_probability(tile.batch())?;
    debug!("silo probability {probability:.4}");
    Ok(Presence::from_probability(probability))
}
