//! Core types of the tessera data availability share layer.
//!
//! The block data lives in an [`ExtendedDataSquare`]: a square of fixed-size
//! [`Share`]s extended with 2D Reed-Solomon parity. Each row and column of
//! the square is committed with a [`Nmt`] whose roots form the
//! [`DataAvailabilityHeader`]. Tree nodes are content-addressed through the
//! CID helpers in [`multihash`].
//!
//! [`Nmt`]: crate::nmt::Nmt
//! [`multihash`]: crate::multihash

pub mod consts;
mod data_availability_header;
pub mod eds;
mod error;
pub mod multihash;
pub mod nmt;
mod share;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use crate::data_availability_header::DataAvailabilityHeader;
pub use crate::eds::{AxisType, ExtendedDataSquare};
pub use crate::error::*;
pub use crate::share::*;
