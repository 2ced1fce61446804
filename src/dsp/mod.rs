//! DSP primitives — pure Rust synthesis building blocks.
//!
//! Every voice in the crate is assembled from these parts and rendered
//! against an absolute sample clock, so the same code serves realtime
//! playback and offline WAV export.

pub mod automation;
pub mod delay;
pub mod filter;
pub mod ladder;
pub mod mixer;
pub mod noise;
pub mod oscillator;
pub mod renderer;
pub mod sampler;
pub mod shaper;
pub mod voice;
