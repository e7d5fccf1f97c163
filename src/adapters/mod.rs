// Adapters layer: concrete implementations for external systems
// (the in-memory form the engine drives, the HTTP price API, snapshot files).

pub mod form;
pub mod http;
