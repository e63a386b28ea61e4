//! Constants of the share layout and the data square geometry.

pub mod appconsts {
    /// Size of a single share in bytes.
    pub const SHARE_SIZE: usize = 512;

    /// Upper bound for the width of the original data square.
    pub const SQUARE_SIZE_UPPER_BOUND: usize = 128;

    /// Lower bound for the width of the original data square.
    pub const MIN_SQUARE_SIZE: usize = 1;
}

pub mod data_availability_header {
    /// Maximum width of the extended data square.
    pub const MAX_EXTENDED_SQUARE_WIDTH: usize = super::appconsts::SQUARE_SIZE_UPPER_BOUND * 2;

    /// Minimum width of the extended data square.
    pub const MIN_EXTENDED_SQUARE_WIDTH: usize = super::appconsts::MIN_SQUARE_SIZE * 2;
}
