//! Data model for the engine: the system-state handle and the external
//! calculator contract.
//!
//! The engine never inspects a system beyond the [`system::System`] trait,
//! and never talks to a simulation code except through
//! [`provider::EnergyForceProvider`]. Everything format- or engine-specific
//! lives behind those two seams.

pub mod provider;
pub mod system;
