//! Encoder backbone families

use serde::{Deserialize, Serialize};
use std::fmt;

/// U-Net encoder backbone family.
///
/// Each family fixes the decoder output width its task head consumes;
/// the layers themselves live in the model-definition collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Backbone {
    /// ResNet-34 encoder.
    Resnet34,
    /// SE-ResNeXt-50 encoder.
    SeResnext50,
    /// DPN-92 encoder.
    Dpn92,
    /// EfficientNet-B0 encoder.
    EfficientNetB0,
}

impl Backbone {
    /// Family name as used in architecture identifiers.
    pub fn name(&self) -> &'static str {
        match self {
            Backbone::Resnet34 => "Resnet34Unet",
            Backbone::SeResnext50 => "SeResnext50Unet",
            Backbone::Dpn92 => "Dpn92Unet",
            Backbone::EfficientNetB0 => "EfficientUnetB0",
        }
    }

    /// Channel width of the decoder output the task head consumes.
    pub fn unet_out_channels(&self) -> usize {
        match self {
            Backbone::Resnet34 => 32,
            Backbone::SeResnext50 => 64,
            Backbone::Dpn92 => 64,
            Backbone::EfficientNetB0 => 48,
        }
    }
}

impl fmt::Display for Backbone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
