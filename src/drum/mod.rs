//! Drum engine: patch format, knob mapping, the unified synth voice and
//! the per-track dispatch.

pub mod machine;
pub mod mapping;
pub mod patch;
pub mod synth;

pub use machine::DrumMachine;
pub use patch::Patch;
