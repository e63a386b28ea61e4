//! Utilities for writing tests against the share layer.

use rand::Rng;

use crate::consts::appconsts::SHARE_SIZE;
use crate::nmt::{Namespace, NS_SIZE};
use crate::ExtendedDataSquare;

/// Generate a random [`Namespace`] below the parity sentinel.
pub fn random_namespace() -> Namespace {
    let mut rng = rand::thread_rng();
    let mut bytes = [0u8; NS_SIZE];
    rng.fill(&mut bytes);
    // stay below the reserved parity namespace
    bytes[0] %= 0xFF;
    Namespace::new_unchecked(bytes)
}

/// Generate `amount` random shares, sorted by their namespace so they can
/// form valid rows of a data square.
pub fn random_shares(amount: usize) -> Vec<Vec<u8>> {
    let mut rng = rand::thread_rng();

    let mut shares: Vec<Vec<u8>> = (0..amount)
        .map(|_| {
            let mut share = vec![0u8; SHARE_SIZE];
            rng.fill(&mut share[..]);
            share[..NS_SIZE].copy_from_slice(random_namespace().as_bytes());
            share
        })
        .collect();

    shares.sort_by(|a, b| a[..NS_SIZE].cmp(&b[..NS_SIZE]));
    shares
}

/// A zeroed share with the given namespace.
pub fn share_with_namespace(namespace: &[u8]) -> Vec<u8> {
    let mut share = vec![0u8; SHARE_SIZE];
    share[..NS_SIZE].copy_from_slice(namespace);
    share
}

/// Generate a random [`ExtendedDataSquare`] with the given original width.
pub fn random_eds(ods_width: usize) -> ExtendedDataSquare {
    let shares = random_shares(ods_width * ods_width);
    ExtendedDataSquare::from_ods(shares).expect("valid dimensions")
}

/// Empty out `amount` random shares of the given flat square.
pub fn remove_random_shares(mut shares: Vec<Vec<u8>>, amount: usize) -> Vec<Vec<u8>> {
    let mut rng = rand::thread_rng();
    let total = shares.len();

    let mut removed = 0;
    while removed < amount {
        let idx = rng.gen_range(0..total);
        if shares[idx].is_empty() {
            continue;
        }
        shares[idx] = Vec::new();
        removed += 1;
    }

    shares
}
