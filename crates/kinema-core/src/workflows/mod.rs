//! # Workflows Module
//!
//! The highest-level, user-facing layer: complete procedures built from the
//! [`crate::engine`] and [`crate::core`] layers. Currently the single
//! procedure is [`relax`], structure relaxation behind a builder-validated
//! configuration.

pub mod relax;
