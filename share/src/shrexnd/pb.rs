//! Wire messages of the shrex/nd protocol.
//!
//! Messages travel varint length-delimited over the stream.

/// Request all shares of a namespace in the square committed by the data
/// availability header with the given hash.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetSharesByNamespaceRequest {
    /// Hash of the data availability header of the square.
    #[prost(bytes = "vec", tag = "1")]
    pub root_hash: Vec<u8>,
    /// The queried namespace.
    #[prost(bytes = "vec", tag = "2")]
    pub namespace_id: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetSharesByNamespaceResponse {
    #[prost(enumeration = "StatusCode", tag = "1")]
    pub status: i32,
    /// One entry per row of the square whose range contains the
    /// namespace, in row order.
    #[prost(message, repeated, tag = "2")]
    pub rows: Vec<Row>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Row {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub shares: Vec<Vec<u8>>,
    #[prost(message, optional, tag = "2")]
    pub proof: Option<Proof>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Proof {
    #[prost(int64, tag = "1")]
    pub start: i64,
    #[prost(int64, tag = "2")]
    pub end: i64,
    #[prost(bytes = "vec", repeated, tag = "3")]
    pub nodes: Vec<Vec<u8>>,
    /// Digest of the successor leaf for proofs of absence.
    #[prost(bytes = "vec", optional, tag = "4")]
    pub leaf_hash: Option<Vec<u8>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum StatusCode {
    Invalid = 0,
    Ok = 1,
    NotFound = 2,
    Internal = 3,
    NamespaceNotFound = 4,
}
