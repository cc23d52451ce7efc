//! Intensity compression transforms applied before gating.

pub mod hlog;

pub use hlog::HlogTransform;
