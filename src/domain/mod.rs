// Domain layer: search models, the specialty catalog and the ports the core talks through.

pub mod model;
pub mod ports;
pub mod specialty;
