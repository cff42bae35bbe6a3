//! Setup and invocation of the external modding tools: the `c2ditools` scene codec,
//! the `unluac` decompiler and the `offsetting` container codec.
//!
//! Nothing here understands the game's formats; every transformation is a subprocess.

pub mod config;
pub mod error;
pub mod executor;
pub mod operations;
pub mod resolver;
pub mod setup;
pub mod toolchain;
