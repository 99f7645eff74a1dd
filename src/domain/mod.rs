// Domain layer: models and ports. The core only talks to the platform through these traits.

pub mod model;
pub mod ports;
