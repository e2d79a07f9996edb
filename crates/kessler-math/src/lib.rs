//! # kessler-math
//!
//! Numeric kernels for the Kessler screening engine.
//!
//! Provides:
//! - Re-exports of `glam` double-precision types (`DVec3`, `DVec4`)
//! - [`DDouble`] — double-double scalar for substep time accumulation
//! - Dense polynomial kernels (evaluation, translation, rescaling,
//!   squared-difference composition, Descartes sign-change bound)
//! - Morton (Z-order) encoding of AABB centroids
//! - 4-lane AABBs with lock-free atomic lane reduction

pub mod aabb;
pub mod dfloat;
pub mod morton;
pub mod poly;

// Re-export glam types as the canonical math types for Kessler.
pub use glam::{DVec3, DVec4};

pub use aabb::{Aabb, AtomicAabb};
pub use dfloat::DDouble;
