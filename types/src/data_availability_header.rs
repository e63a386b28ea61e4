use sha2::{Digest, Sha256};

use crate::consts::data_availability_header::{
    MAX_EXTENDED_SQUARE_WIDTH, MIN_EXTENDED_SQUARE_WIDTH,
};
use crate::eds::AxisType;
use crate::nmt::NamespacedHash;
use crate::{Error, ExtendedDataSquare, Result};

/// Header with commitments of the data availability.
///
/// It consists of the root hashes of the merkle trees created from each
/// row and column of the [`ExtendedDataSquare`]. Those are used to prove
/// the inclusion of the data in the block.
///
/// The hash of this header is a hash of all rows and columns and thus a
/// data commitment of the block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataAvailabilityHeader {
    /// Merkle roots of the [`ExtendedDataSquare`] rows.
    row_roots: Vec<NamespacedHash>,
    /// Merkle roots of the [`ExtendedDataSquare`] columns.
    column_roots: Vec<NamespacedHash>,
}

impl DataAvailabilityHeader {
    /// Create a new [`DataAvailabilityHeader`].
    pub fn new(
        row_roots: Vec<NamespacedHash>,
        column_roots: Vec<NamespacedHash>,
    ) -> Result<Self> {
        let dah = DataAvailabilityHeader {
            row_roots,
            column_roots,
        };
        dah.validate_basic()?;
        Ok(dah)
    }

    /// Create a [`DataAvailabilityHeader`] by computing the roots of the
    /// given [`ExtendedDataSquare`].
    pub fn from_eds(eds: &ExtendedDataSquare) -> Result<Self> {
        let square_width = eds.square_width();

        let mut row_roots = Vec::with_capacity(square_width);
        let mut column_roots = Vec::with_capacity(square_width);

        for i in 0..square_width {
            row_roots.push(eds.row_nmt(i)?.root());
            column_roots.push(eds.column_nmt(i)?.root());
        }

        DataAvailabilityHeader::new(row_roots, column_roots)
    }

    /// Get the root of an axis at the given index.
    pub fn root(&self, axis: AxisType, index: usize) -> Option<NamespacedHash> {
        match axis {
            AxisType::Row => self.row_root(index),
            AxisType::Col => self.column_root(index),
        }
    }

    /// Merkle roots of the [`ExtendedDataSquare`] rows.
    pub fn row_roots(&self) -> &[NamespacedHash] {
        &self.row_roots
    }

    /// Merkle roots of the [`ExtendedDataSquare`] columns.
    pub fn column_roots(&self) -> &[NamespacedHash] {
        &self.column_roots
    }

    /// Get the root of the row with the given index.
    pub fn row_root(&self, row: usize) -> Option<NamespacedHash> {
        self.row_roots.get(row).copied()
    }

    /// Get the root of the column with the given index.
    pub fn column_root(&self, column: usize) -> Option<NamespacedHash> {
        self.column_roots.get(column).copied()
    }

    /// Get the size of the [`ExtendedDataSquare`] for which this header
    /// was built.
    pub fn square_width(&self) -> usize {
        // validate_basic checks that row and column amounts match
        self.row_roots.len()
    }

    /// Compute the combined hash of all rows and columns.
    ///
    /// This is the data commitment of the block and the key under which
    /// peers look the square up.
    pub fn hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        for root in self.row_roots.iter().chain(self.column_roots.iter()) {
            hasher.update(root.to_array());
        }
        hasher.finalize().into()
    }

    /// Validate the shape of the header.
    pub fn validate_basic(&self) -> Result<()> {
        if self.column_roots.len() != self.row_roots.len() {
            return Err(Error::EdsInvalidDimensions);
        }

        if self.row_roots.len() < MIN_EXTENDED_SQUARE_WIDTH
            || self.row_roots.len() > MAX_EXTENDED_SQUARE_WIDTH
        {
            return Err(Error::EdsInvalidDimensions);
        }

        Ok(())
    }
}
