//! Shared trait-first kernel substrate.
//!
//! This module defines the constructor validation lifecycle and the contiguous
//! 1D buffer adapters every kernel in the crate reads from and writes into.

mod errors;
mod io;
mod lifecycle;

pub use errors::*;
pub use io::*;
pub use lifecycle::*;
