//! # Engine Module
//!
//! The stateful run-loop core: a generic, calculator-agnostic state machine
//! that drives repeated energy/force evaluations toward a convergence
//! criterion.
//!
//! ## Architecture
//!
//! - **Run Loop** ([`dynamics`]) - The [`dynamics::Dynamics`] trait with the
//!   cooperative [`dynamics::Iteration`] driver and step/budget bookkeeping.
//! - **Relaxation** ([`optimizer`]) - The force-based [`optimizer::Optimizer`]
//!   with convergence testing, logging, and restart persistence.
//! - **Step Algorithms** ([`algorithms`]) - The pluggable
//!   [`algorithms::StepAlgorithm`] interface and its concrete implementors.
//! - **Observers** ([`observer`]) - Interval-triggered callbacks fired at
//!   controlled points of every run.
//! - **Sinks** ([`logger`], [`trajectory`], [`restart`]) - The optimization
//!   text log, the frame-per-line trajectory file, and the JSON restart
//!   record.
//! - **Error Handling** ([`error`]) - The engine-wide error taxonomy.
//!
//! Scheduling is strictly single-threaded and cooperative: the only
//! concurrency-like construct is the explicit suspension of
//! [`dynamics::Iteration::poll`], which lets a caller interleave several
//! independent drivers one step at a time.

pub mod algorithms;
pub mod dynamics;
pub mod error;
pub mod logger;
pub mod observer;
pub mod optimizer;
pub mod restart;
pub mod trajectory;
