// Adapters layer: concrete implementations for external systems (model service, geolocation, storage, rendering).

pub mod gemini;
pub mod location;
pub mod render;
pub mod storage;
