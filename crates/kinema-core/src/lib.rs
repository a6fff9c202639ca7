//! # Kinema Core Library
//!
//! A calculator-agnostic engine for iterative atomistic simulation loops:
//! structure relaxation and molecular dynamics drivers built on repeated
//! energy/force evaluations from an external provider.
//!
//! ## Architectural Philosophy
//!
//! The library is designed with a strict three-layer architecture to keep
//! the run-loop machinery independent of any particular simulation code.
//!
//! - **[`core`]: The Foundation.** The [`core::models::system::System`]
//!   state handle, the [`core::models::provider::EnergyForceProvider`]
//!   calculator contract, and analytic test potentials. No run-loop state
//!   lives here.
//!
//! - **[`engine`]: The Logic Core.** The stateful orchestration layer: the
//!   generic [`engine::dynamics::Dynamics`] run-loop with its cooperative
//!   step-at-a-time iteration protocol, the force-based
//!   [`engine::optimizer::Optimizer`], pluggable
//!   [`engine::algorithms::StepAlgorithm`] implementations, observers, and
//!   the log/trajectory/restart sinks.
//!
//! - **[`workflows`]: The Public API.** High-level procedures tying the
//!   engine together behind validated configurations, such as
//!   [`workflows::relax`].
//!
//! ## Cooperative iteration
//!
//! The run loop never spawns threads. [`engine::dynamics::Iteration::poll`]
//! advances a run to its next well-defined suspension point and hands
//! control back to the caller, so several independent drivers can be
//! interleaved step by step from a single external loop.

pub mod core;
pub mod engine;
pub mod workflows;
