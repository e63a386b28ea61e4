//! shrex/nd: a single-shot streaming protocol serving all shares of a
//! namespace in a square, row by row, with inclusion or absence proofs.
//!
//! The transport is any ordered duplex byte stream. A request/response
//! exchange is: open stream, write the request, half-close the write
//! side, read the response, close. Dropping the stream mid-exchange
//! resets it.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::io::{AsyncRead, AsyncReadExt};
use integer_encoding::VarInt;
use prost::Message;
use tessera_types::nmt::{NamespaceProof, NamespacedHash};
use tessera_types::{NamespacedRow, NamespacedShares, Share};

use crate::{Error, Result};

mod client;
pub mod pb;
mod server;

pub use client::Client;
pub use server::Server;

/// Protocol string, versioned independently of the crate.
pub const PROTOCOL_STRING: &str = "shrex/nd/v0.0.1";

/// Upper bound for a received message, requests and responses alike.
const MESSAGE_MAX_SIZE: usize = 64 * 1024 * 1024;

/// Configuration of the shrex/nd client and server.
#[derive(Debug, Clone)]
pub struct Parameters {
    /// Name of the network the protocol id is derived from.
    pub network_id: String,
    /// How long the server waits for a request; doubles as the client's
    /// write deadline when the caller supplies none.
    pub server_read_timeout: Duration,
    /// How long the server takes to write a response; doubles as the
    /// client's read deadline when the caller supplies none.
    pub server_write_timeout: Duration,
    /// How many rows are collected concurrently, and how many streams the
    /// server serves at a time before shedding load.
    pub concurrency_limit: usize,
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters {
            network_id: "private".to_string(),
            server_read_timeout: Duration::from_secs(5),
            server_write_timeout: Duration::from_secs(10),
            concurrency_limit: 4,
        }
    }
}

impl Parameters {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.network_id.is_empty() {
            return Err(Error::InvalidParameters("network_id must not be empty"));
        }
        if self.server_read_timeout.is_zero() {
            return Err(Error::InvalidParameters(
                "server_read_timeout must be positive",
            ));
        }
        if self.server_write_timeout.is_zero() {
            return Err(Error::InvalidParameters(
                "server_write_timeout must be positive",
            ));
        }
        if self.concurrency_limit == 0 {
            return Err(Error::InvalidParameters(
                "concurrency_limit must be positive",
            ));
        }
        Ok(())
    }

    /// The versioned protocol id for this network.
    pub fn protocol_id(&self) -> String {
        protocol_id(&self.network_id, PROTOCOL_STRING)
    }
}

pub(crate) fn protocol_id(network: &str, protocol: &str) -> String {
    let network = network.trim_matches('/');
    let protocol = protocol.trim_matches('/');
    format!("/{network}/{protocol}")
}

/// Outcome of a request as observed by the [`Metrics`] facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Timeout,
    NotFound,
    RateLimited,
    Invalid,
}

/// Request counters, one per [`Status`].
///
/// This is the narrow surface a metrics backend consumes; the core only
/// counts.
#[derive(Debug, Default)]
pub struct Metrics {
    success: AtomicU64,
    timeout: AtomicU64,
    not_found: AtomicU64,
    rate_limited: AtomicU64,
    invalid: AtomicU64,
}

impl Metrics {
    fn counter(&self, status: Status) -> &AtomicU64 {
        match status {
            Status::Success => &self.success,
            Status::Timeout => &self.timeout,
            Status::NotFound => &self.not_found,
            Status::RateLimited => &self.rate_limited,
            Status::Invalid => &self.invalid,
        }
    }

    /// Record an observed request outcome.
    pub fn observe(&self, status: Status) {
        self.counter(status).fetch_add(1, Ordering::Relaxed);
    }

    /// Amount of requests observed with the given outcome.
    pub fn count(&self, status: Status) -> u64 {
        self.counter(status).load(Ordering::Relaxed)
    }
}

pub(crate) async fn read_varint<T>(io: &mut T) -> io::Result<usize>
where
    T: AsyncRead + Unpin + Send,
{
    let mut buf = [0u8; 10];

    for i in 0..buf.len() {
        io.read_exact(&mut buf[i..=i]).await?;

        if let Some((val, _)) = usize::decode_var(&buf[..=i]) {
            return Ok(val);
        }
    }

    Err(io::Error::other("failed to read a valid varint"))
}

pub(crate) async fn read_message<T, M>(io: &mut T) -> io::Result<M>
where
    T: AsyncRead + Unpin + Send,
    M: Message + Default,
{
    let len = read_varint(io).await?;

    if len > MESSAGE_MAX_SIZE {
        return Err(io::Error::other("message bigger than MESSAGE_MAX_SIZE"));
    }

    let mut buf = vec![0u8; len];
    io.read_exact(&mut buf[..]).await?;

    M::decode(&buf[..]).map_err(|e| io::Error::other(format!("failed to decode message: {e}")))
}

pub(crate) fn rows_to_proto(shares: &NamespacedShares) -> Vec<pb::Row> {
    shares.rows.iter().map(row_to_proto).collect()
}

fn row_to_proto(row: &NamespacedRow) -> pb::Row {
    pb::Row {
        shares: row.shares.iter().map(|share| share.to_vec()).collect(),
        proof: Some(proof_to_proto(&row.proof)),
    }
}

fn proof_to_proto(proof: &NamespaceProof) -> pb::Proof {
    pb::Proof {
        start: proof.start_idx() as i64,
        end: proof.end_idx() as i64,
        nodes: proof.siblings().iter().map(|node| node.to_vec()).collect(),
        leaf_hash: proof.leaf().map(|leaf| leaf.to_vec()),
    }
}

pub(crate) fn rows_from_proto(rows: Vec<pb::Row>) -> Result<NamespacedShares> {
    let rows = rows
        .into_iter()
        .map(row_from_proto)
        .collect::<Result<Vec<_>>>()?;

    Ok(NamespacedShares { rows })
}

fn row_from_proto(row: pb::Row) -> Result<NamespacedRow> {
    let shares = row
        .shares
        .iter()
        .map(|bytes| Share::from_raw(bytes))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| Error::InvalidResponse)?;

    let proof = proof_from_proto(row.proof.ok_or(Error::InvalidResponse)?)?;

    // a row without shares is only valid as a proof of absence
    if shares.is_empty() && !proof.is_of_absence() {
        return Err(Error::InvalidResponse);
    }

    Ok(NamespacedRow { shares, proof })
}

fn proof_from_proto(proof: pb::Proof) -> Result<NamespaceProof> {
    if proof.start < 0 || proof.end < proof.start {
        return Err(Error::InvalidResponse);
    }

    let nodes = proof
        .nodes
        .iter()
        .map(|bytes| NamespacedHash::from_raw(bytes))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| Error::InvalidResponse)?;

    match proof.leaf_hash {
        Some(leaf_hash) => {
            if proof.end != proof.start + 1 {
                return Err(Error::InvalidResponse);
            }
            let leaf_hash =
                NamespacedHash::from_raw(&leaf_hash).map_err(|_| Error::InvalidResponse)?;
            Ok(NamespaceProof::new_absence(
                proof.start as u64,
                nodes,
                leaf_hash,
            ))
        }
        None => Ok(NamespaceProof::new_inclusion(
            proof.start as u64,
            proof.end as u64,
            nodes,
        )),
    }
}
