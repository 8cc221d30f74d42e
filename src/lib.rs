//! Workspace facade crate.
//!
//! Re-exports the individual workspace crates so host integrations can depend
//! on `player-workspace` alone instead of wiring `bridge-traits`,
//! `core-runtime` and `core-playback` one by one.

pub use bridge_traits as bridge;
pub use core_playback as playback;
pub use core_runtime as runtime;
