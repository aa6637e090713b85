#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// message passing between ranks and the collectives built on it.
pub mod comm;

/// utilities to render histograms.
pub mod draw;

/// histogram equalization strategies.
pub mod equalize;

/// compute image histogram module.
pub mod histogram;

/// pdf, cdf and lookup table derivation.
pub mod lut;

/// module containing parallization utilities.
pub mod parallel;

/// image concatenation with a divider.
pub mod stack;
