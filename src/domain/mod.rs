// Domain layer: listing models and the ports (storage, geocoding, sleeping, pipeline) the core depends on.

pub mod model;
pub mod ports;
