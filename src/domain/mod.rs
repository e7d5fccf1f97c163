// Domain layer: core models, ports (interfaces) and pure services.
// No infrastructure concerns beyond std/serde.

pub mod model;
pub mod ports;
pub mod services;
