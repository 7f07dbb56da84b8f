//! Intersection Simulation Library
//!
//! A four-approach signalized intersection simulation. The engine in
//! [`simulation`] can be stepped directly; [`control`] runs it on a
//! background thread behind start/stop/reset commands.

pub mod control;
pub mod simulation;
