use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use prost::Message;
use tessera_types::nmt::Namespace;
use tessera_types::NamespacedShares;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::shrexnd::{pb, read_message, rows_from_proto, Metrics, Parameters, Status};
use crate::{Error, Result};

/// Client side of the shrex/nd protocol.
///
/// The client is transport agnostic: it drives any ordered duplex byte
/// stream the caller has opened towards a peer under
/// [`Client::protocol_id`].
pub struct Client {
    params: Parameters,
    protocol_id: String,
    metrics: Arc<Metrics>,
}

impl Client {
    /// Create a new shrex/nd client.
    pub fn new(params: Parameters) -> Result<Client> {
        params.validate()?;
        let protocol_id = params.protocol_id();

        Ok(Client {
            params,
            protocol_id,
            metrics: Arc::new(Metrics::default()),
        })
    }

    /// The protocol id streams for this client must be opened under.
    pub fn protocol_id(&self) -> &str {
        &self.protocol_id
    }

    /// Counters of the request outcomes this client observed.
    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    /// Request all shares of `namespace` in the square committed by the
    /// header with `root_hash`.
    ///
    /// When `deadline` is given it bounds both directions of the
    /// exchange; otherwise the server write timeout bounds the read and
    /// the server read timeout bounds the write. The stream is consumed:
    /// closed on success, dropped (reset) on failure.
    pub async fn request_nd<S>(
        &self,
        mut stream: S,
        token: &CancellationToken,
        root_hash: &[u8],
        namespace: Namespace,
        deadline: Option<Duration>,
    ) -> Result<NamespacedShares>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin,
    {
        let started = Instant::now();

        let result = match token
            .run_until_cancelled(self.do_request(&mut stream, root_hash, namespace, deadline))
            .await
        {
            Some(result) => result,
            None => {
                self.metrics.observe(Status::Timeout);
                return Err(Error::Canceled);
            }
        };

        match result {
            Ok(shares) => Ok(shares),
            Err(Error::Timeout) => {
                self.metrics.observe(Status::Timeout);
                Err(Error::Timeout)
            }
            // a transport level timeout after the deadline has already
            // passed is a deadline miss
            Err(Error::Io(e))
                if e.kind() == io::ErrorKind::TimedOut
                    && deadline.is_some_and(|d| started.elapsed() >= d) =>
            {
                self.metrics.observe(Status::Timeout);
                Err(Error::Timeout)
            }
            Err(e) => {
                if !matches!(e, Error::NotFound | Error::NamespaceNotFound) {
                    warn!("shrex/nd: peer returned an error: {e}");
                }
                Err(e)
            }
        }
    }

    async fn do_request<S>(
        &self,
        stream: &mut S,
        root_hash: &[u8],
        namespace: Namespace,
        deadline: Option<Duration>,
    ) -> Result<NamespacedShares>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin,
    {
        let write_deadline = deadline.unwrap_or(self.params.server_read_timeout);
        let read_deadline = deadline.unwrap_or(self.params.server_write_timeout);

        let request = pb::GetSharesByNamespaceRequest {
            root_hash: root_hash.to_vec(),
            namespace_id: namespace.as_bytes().to_vec(),
        };
        let buf = request.encode_length_delimited_to_vec();

        timeout(write_deadline, async {
            stream.write_all(&buf).await?;
            stream.flush().await?;
            // half-close, the server reads the request until here
            stream.close().await
        })
        .await
        .map_err(|_| Error::Timeout)??;

        let response: pb::GetSharesByNamespaceResponse =
            match timeout(read_deadline, read_message(stream)).await {
                Err(_) => return Err(Error::Timeout),
                Ok(Err(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    // the server shed load and closed the stream before
                    // writing a response
                    self.metrics.observe(Status::RateLimited);
                    return Err(Error::NotFound);
                }
                Ok(Err(e)) => return Err(e.into()),
                Ok(Ok(response)) => response,
            };

        match pb::StatusCode::try_from(response.status) {
            Ok(pb::StatusCode::Ok) => {
                self.metrics.observe(Status::Success);
                rows_from_proto(response.rows)
            }
            Ok(pb::StatusCode::NotFound) => {
                self.metrics.observe(Status::NotFound);
                Err(Error::NotFound)
            }
            Ok(pb::StatusCode::NamespaceNotFound) => Err(Error::NamespaceNotFound),
            Ok(pb::StatusCode::Invalid) => {
                debug!("shrex/nd: server rejected the request as invalid");
                self.metrics.observe(Status::Invalid);
                Err(Error::InvalidResponse)
            }
            Ok(pb::StatusCode::Internal) | Err(_) => {
                self.metrics.observe(Status::Invalid);
                Err(Error::InvalidResponse)
            }
        }
    }
}
