//! The extended data square and its Reed-Solomon codec.

use std::fmt::Display;

use rayon::prelude::*;
use reed_solomon_erasure::galois_8::ReedSolomon;

use crate::consts::appconsts::SHARE_SIZE;
use crate::consts::data_availability_header::{
    MAX_EXTENDED_SQUARE_WIDTH, MIN_EXTENDED_SQUARE_WIDTH,
};
use crate::nmt::{Namespace, Nmt, NS_SIZE};
use crate::{Error, Result, Share};

/// Name of the codec used to compute parity shares.
pub const CODEC_NAME: &str = "reed-solomon-gf8";

/// Represents either a column or a row of the [`ExtendedDataSquare`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum AxisType {
    /// A row of the data square.
    Row = 0,
    /// A column of the data square.
    Col,
}

impl TryFrom<i32> for AxisType {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AxisType::Row),
            1 => Ok(AxisType::Col),
            n => Err(Error::InvalidAxis(n)),
        }
    }
}

impl Display for AxisType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AxisType::Row => write!(f, "row"),
            AxisType::Col => write!(f, "column"),
        }
    }
}

/// The block data extended with 2D Reed-Solomon parity.
///
/// The square consists of four quadrants. The first (upper-left) quadrant
/// is the original data, the other three hold parity computed with the
/// systematic codec along rows and columns:
///
/// ```text
///  ---------------------------
/// |             |             |
/// |           --|->           |
/// |      1    --|->    2      |
/// |           --|->           |
/// |    | | |    |             |
///  -------------+-------------
/// |    v v v    |             |
/// |           --|->           |
/// |      3    --|->    4      |
/// |           --|->           |
/// |             |             |
///  ---------------------------
/// ```
///
/// Thanks to the extension, every row and every column of the square is a
/// codeword: any half of it recovers the other half. An unknown share is
/// represented by an empty buffer, which is how partially available squares
/// travel into [`ExtendedDataSquare::repair`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedDataSquare {
    /// The shares of the square, row-major. An empty share is unknown.
    square: Vec<Vec<u8>>,
    /// The codec used to encode parity shares.
    codec: String,
    /// Pre-calculated square width.
    square_width: usize,
}

impl ExtendedDataSquare {
    /// Create a new [`ExtendedDataSquare`] by extending the given original
    /// shares with parity data.
    ///
    /// Shares should be provided in a row-major order.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    ///  - shares are of sizes different than [`SHARE_SIZE`]
    ///  - the amount of shares doesn't form a square
    ///  - the extended width would be outside of the allowed bounds or not
    ///    a power of 2
    ///  - namespaces of shares aren't non-decreasing row and column wise
    pub fn from_ods(ods_shares: Vec<Vec<u8>>) -> Result<Self> {
        let ods_width = square_width(ods_shares.len())?;
        let width = ods_width * 2;
        validate_extended_width(width)?;

        for share in &ods_shares {
            if share.len() != SHARE_SIZE {
                return Err(Error::InvalidShareSize(share.len()));
            }
        }

        validate_ods_namespace_order(&ods_shares, ods_width)?;

        // place the original data into the first quadrant, zero the rest
        let mut square = vec![Vec::new(); width * width];
        for (idx, share) in ods_shares.into_iter().enumerate() {
            let (row, col) = (idx / ods_width, idx % ods_width);
            square[row * width + col] = share;
        }
        for share in square.iter_mut() {
            if share.is_empty() {
                *share = vec![0; SHARE_SIZE];
            }
        }

        let codec = ReedSolomon::new(ods_width, ods_width)?;

        // 2nd quadrant, parity of the original rows
        square
            .par_chunks_mut(width)
            .take(ods_width)
            .try_for_each(|row| codec.encode(row))?;

        // 3rd and 4th quadrants, parity of every column. The bottom half of
        // a right-side column is derived from row parity, which makes all
        // the bottom rows codewords as well.
        let parity_columns = (0..width)
            .into_par_iter()
            .map(|col| {
                let mut shards: Vec<Vec<u8>> = (0..ods_width)
                    .map(|row| square[row * width + col].clone())
                    .chain((0..ods_width).map(|_| vec![0; SHARE_SIZE]))
                    .collect();

                codec.encode(&mut shards)?;

                Ok((col, shards.split_off(ods_width)))
            })
            .collect::<Result<Vec<_>>>()?;

        for (col, parity) in parity_columns {
            for (i, share) in parity.into_iter().enumerate() {
                square[(ods_width + i) * width + col] = share;
            }
        }

        Ok(ExtendedDataSquare {
            square,
            codec: CODEC_NAME.to_string(),
            square_width: width,
        })
    }

    /// Reconstruct an [`ExtendedDataSquare`] from a flat row-major sequence
    /// of its shares.
    ///
    /// Unknown positions are represented by empty buffers. The square can
    /// later be completed with [`ExtendedDataSquare::repair`].
    pub fn import(shares: Vec<Vec<u8>>) -> Result<Self> {
        let width = square_width(shares.len())?;
        validate_extended_width(width)?;

        for share in &shares {
            if !share.is_empty() && share.len() != SHARE_SIZE {
                return Err(Error::InvalidShareSize(share.len()));
            }
        }

        Ok(ExtendedDataSquare {
            square: shares,
            codec: CODEC_NAME.to_string(),
            square_width: width,
        })
    }

    /// The codec used to encode parity shares.
    pub fn codec(&self) -> &str {
        &self.codec
    }

    /// Width of the extended square.
    pub fn square_width(&self) -> usize {
        self.square_width
    }

    /// Width of the original data square.
    pub fn ods_width(&self) -> usize {
        self.square_width / 2
    }

    /// The raw share at the given coordinates.
    pub fn share(&self, row: usize, column: usize) -> Result<&[u8]> {
        if row >= self.square_width || column >= self.square_width {
            return Err(Error::EdsIndexOutOfRange(row, column));
        }

        let share = &self.square[row * self.square_width + column];
        if share.is_empty() {
            return Err(Error::ShareNotAvailable(row, column));
        }

        Ok(share)
    }

    /// The typed share at the given coordinates.
    pub fn typed_share(&self, row: usize, column: usize) -> Result<Share> {
        let raw = self.share(row, column)?;

        if is_ods_square(row, column, self.square_width) {
            Share::from_raw(raw)
        } else {
            Share::parity(raw)
        }
    }

    /// The shares of a row, unknown positions as empty buffers.
    pub fn row(&self, index: usize) -> Result<Vec<Vec<u8>>> {
        self.axis(AxisType::Row, index)
    }

    /// The shares of a column, unknown positions as empty buffers.
    pub fn column(&self, index: usize) -> Result<Vec<Vec<u8>>> {
        self.axis(AxisType::Col, index)
    }

    /// The shares of a row or column, unknown positions as empty buffers.
    pub fn axis(&self, axis: AxisType, index: usize) -> Result<Vec<Vec<u8>>> {
        if index >= self.square_width {
            let (row, col) = match axis {
                AxisType::Row => (index, 0),
                AxisType::Col => (0, index),
            };
            return Err(Error::EdsIndexOutOfRange(row, col));
        }

        Ok((0..self.square_width)
            .map(|i| {
                let idx = match axis {
                    AxisType::Row => index * self.square_width + i,
                    AxisType::Col => i * self.square_width + index,
                };
                self.square[idx].clone()
            })
            .collect())
    }

    /// The [`Nmt`] of a row.
    pub fn row_nmt(&self, index: usize) -> Result<Nmt> {
        self.axis_nmt(AxisType::Row, index)
    }

    /// The [`Nmt`] of a column.
    pub fn column_nmt(&self, index: usize) -> Result<Nmt> {
        self.axis_nmt(AxisType::Col, index)
    }

    /// The [`Nmt`] of a row or column.
    ///
    /// Every share of the axis must be available.
    pub fn axis_nmt(&self, axis: AxisType, index: usize) -> Result<Nmt> {
        let mut tree = Nmt::default();

        for i in 0..self.square_width {
            let (row, col) = match axis {
                AxisType::Row => (index, i),
                AxisType::Col => (i, index),
            };

            let (namespace, leaf_bytes) = self.typed_share(row, col)?.to_leaf();
            tree.push_leaf(namespace, leaf_bytes)?;
        }

        Ok(tree)
    }

    /// Complete the square from the shares that are available.
    ///
    /// Rows and columns are solved alternately until a fixed point: an
    /// incomplete axis with at least half of its shares known is
    /// reconstructed with the codec and then verified against the
    /// corresponding provided root. If the fixed point is reached with
    /// unknown shares remaining, no deletion pattern of the known data can
    /// complete the square and [`Error::FailedToSolve`] is returned.
    pub fn repair(
        &mut self,
        row_roots: &[crate::nmt::NamespacedHash],
        col_roots: &[crate::nmt::NamespacedHash],
    ) -> Result<()> {
        let width = self.square_width;
        if row_roots.len() != width || col_roots.len() != width {
            return Err(Error::EdsInvalidDimensions);
        }

        let ods_width = width / 2;
        let codec = ReedSolomon::new(ods_width, ods_width)?;

        let mut row_done = vec![false; width];
        let mut col_done = vec![false; width];

        loop {
            let mut progress = false;

            for index in 0..width {
                if !row_done[index] && self.solve_axis(AxisType::Row, index, &codec)? {
                    let root = self.row_nmt(index)?.root();
                    if root != row_roots[index] {
                        return Err(Error::RootMismatch {
                            axis: "row",
                            index,
                        });
                    }
                    row_done[index] = true;
                    progress = true;
                }
            }

            for index in 0..width {
                if !col_done[index] && self.solve_axis(AxisType::Col, index, &codec)? {
                    let root = self.column_nmt(index)?.root();
                    if root != col_roots[index] {
                        return Err(Error::RootMismatch {
                            axis: "column",
                            index,
                        });
                    }
                    col_done[index] = true;
                    progress = true;
                }
            }

            if !progress {
                break;
            }
        }

        if row_done.iter().all(|done| *done) && col_done.iter().all(|done| *done) {
            Ok(())
        } else {
            Err(Error::FailedToSolve)
        }
    }

    /// Try to complete a single axis. Returns `true` when the axis is fully
    /// known afterwards and ready to be verified.
    fn solve_axis(&mut self, axis: AxisType, index: usize, codec: &ReedSolomon) -> Result<bool> {
        let width = self.square_width;
        let shares = self.axis(axis, index)?;

        let known = shares.iter().filter(|share| !share.is_empty()).count();
        if known == width {
            return Ok(true);
        }
        if known < width / 2 {
            return Ok(false);
        }

        let mut shards: Vec<Option<Vec<u8>>> = shares
            .into_iter()
            .map(|share| if share.is_empty() { None } else { Some(share) })
            .collect();

        codec.reconstruct(&mut shards)?;

        for (i, shard) in shards.into_iter().enumerate() {
            let idx = match axis {
                AxisType::Row => index * width + i,
                AxisType::Col => i * width + index,
            };
            self.square[idx] = shard.expect("reconstruct fills every shard");
        }

        Ok(true)
    }

    /// The original quadrant as a flat row-major sequence.
    pub fn extract_ods(&self) -> Vec<Vec<u8>> {
        let ods_width = self.ods_width();

        let mut shares = Vec::with_capacity(ods_width * ods_width);
        for row in 0..ods_width {
            for col in 0..ods_width {
                shares.push(self.square[row * self.square_width + col].clone());
            }
        }
        shares
    }

    /// The full square as a flat row-major sequence.
    pub fn extract_eds(&self) -> Vec<Vec<u8>> {
        self.square.clone()
    }
}

/// Returns true if and only if the provided coordinates belong to the
/// original data square (i.e. the first quadrant of the extended square).
pub(crate) fn is_ods_square(row: usize, column: usize, square_width: usize) -> bool {
    let ods_width = square_width / 2;
    row < ods_width && column < ods_width
}

fn square_width(shares: usize) -> Result<usize> {
    let width = (shares as f64).sqrt() as usize;
    if width * width != shares {
        return Err(Error::EdsInvalidDimensions);
    }
    Ok(width)
}

fn validate_extended_width(width: usize) -> Result<()> {
    if width < MIN_EXTENDED_SQUARE_WIDTH
        || width > MAX_EXTENDED_SQUARE_WIDTH
        || !width.is_power_of_two()
    {
        return Err(Error::EdsInvalidDimensions);
    }
    Ok(())
}

fn validate_ods_namespace_order(shares: &[Vec<u8>], ods_width: usize) -> Result<()> {
    let namespace_of = |row: usize, col: usize| {
        Namespace::from_raw(&shares[row * ods_width + col][..NS_SIZE]).expect("size checked")
    };

    for row in 0..ods_width {
        for col in 1..ods_width {
            if namespace_of(row, col) < namespace_of(row, col - 1) {
                return Err(Error::UnorderedShares {
                    axis: "row",
                    index: row,
                });
            }
        }
    }

    for col in 0..ods_width {
        for row in 1..ods_width {
            if namespace_of(row, col) < namespace_of(row - 1, col) {
                return Err(Error::UnorderedShares {
                    axis: "column",
                    index: col,
                });
            }
        }
    }

    Ok(())
}
