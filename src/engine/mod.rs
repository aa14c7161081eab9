//! Core engine: trade tracking, settlement and the tick loop.

pub mod accountant;
pub mod runner;
pub mod scheduler;
pub mod tracker;

pub use scheduler::Simulation;
