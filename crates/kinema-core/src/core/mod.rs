//! # Core Module
//!
//! Stateless building blocks of the toolkit: the data model the run-loop
//! engine operates on and a small set of analytic potentials.
//!
//! ## Architecture
//!
//! - **System Model** ([`models`]) - The [`models::system::System`] state
//!   handle, the optional curvature capability, and the
//!   [`models::provider::EnergyForceProvider`] calculator contract.
//! - **Analytic Potentials** ([`potentials`]) - Closed-form providers with
//!   known minima, used for validation and as lightweight stand-ins for
//!   external engines.
//!
//! Everything here is free of run-loop state; the stateful orchestration
//! lives in [`crate::engine`].

pub mod models;
pub mod potentials;
