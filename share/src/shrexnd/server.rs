use std::sync::Arc;

use futures::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use prost::Message;
use tessera_blockstore::Blockstore;
use tessera_types::nmt::Namespace;
use tessera_types::DataAvailabilityHeader;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::getter::get_namespaced_shares;
use crate::shrexnd::{pb, read_message, rows_to_proto, Parameters};
use crate::{Error, Result};

/// Server side of the shrex/nd protocol.
///
/// Serves namespaced shares with proofs out of the block store for every
/// square registered with [`Server::register_eds`]. The caller owns the
/// transport and hands accepted streams to [`Server::handle_stream`].
pub struct Server<B>
where
    B: Blockstore,
{
    params: Parameters,
    protocol_id: String,
    store: Arc<B>,
    squares: dashmap::DashMap<[u8; 32], DataAvailabilityHeader>,
    semaphore: Arc<Semaphore>,
}

impl<B> Server<B>
where
    B: Blockstore,
{
    /// Create a new shrex/nd server over the given store.
    pub fn new(params: Parameters, store: Arc<B>) -> Result<Server<B>> {
        params.validate()?;
        let protocol_id = params.protocol_id();
        let semaphore = Arc::new(Semaphore::new(params.concurrency_limit));

        Ok(Server {
            params,
            protocol_id,
            store,
            squares: dashmap::DashMap::new(),
            semaphore,
        })
    }

    /// The protocol id this server answers under.
    pub fn protocol_id(&self) -> &str {
        &self.protocol_id
    }

    /// Announce a square so its root hash can be resolved by requests.
    pub fn register_eds(&self, dah: DataAvailabilityHeader) {
        self.squares.insert(dah.hash(), dah);
    }

    /// Serve a single request/response exchange over the stream.
    ///
    /// When the concurrency limit is saturated the stream is dropped
    /// without a response and the peer observes EOF.
    pub async fn handle_stream<'a, S>(
        &'a self,
        mut stream: S,
        token: &'a CancellationToken,
    ) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin,
    {
        let Ok(_permit) = self.semaphore.clone().try_acquire_owned() else {
            debug!("shrex/nd: concurrency limit reached, resetting the stream");
            return Ok(());
        };

        let request = match timeout(
            self.params.server_read_timeout,
            read_message::<_, pb::GetSharesByNamespaceRequest>(&mut stream),
        )
        .await
        {
            Err(_) => return Err(Error::Timeout),
            Ok(Err(e)) => return Err(e.into()),
            Ok(Ok(request)) => request,
        };

        let (status, rows) = self.process_request(token, &request).await;
        let response = pb::GetSharesByNamespaceResponse {
            status: status as i32,
            rows,
        };
        let buf = response.encode_length_delimited_to_vec();

        timeout(self.params.server_write_timeout, async {
            stream.write_all(&buf).await?;
            stream.flush().await?;
            stream.close().await
        })
        .await
        .map_err(|_| Error::Timeout)??;

        Ok(())
    }

    async fn process_request<'a>(
        &'a self,
        token: &'a CancellationToken,
        request: &'a pb::GetSharesByNamespaceRequest,
    ) -> (pb::StatusCode, Vec<pb::Row>) {
        let Ok(namespace) = Namespace::from_raw(&request.namespace_id) else {
            return (pb::StatusCode::Invalid, Vec::new());
        };

        let Ok(root_hash) = <[u8; 32]>::try_from(&request.root_hash[..]) else {
            return (pb::StatusCode::Invalid, Vec::new());
        };

        let Some(dah) = self.squares.get(&root_hash).map(|entry| entry.value().clone()) else {
            return (pb::StatusCode::NotFound, Vec::new());
        };

        match get_namespaced_shares(
            token,
            &*self.store,
            &dah,
            namespace,
            self.params.concurrency_limit,
        )
        .await
        {
            Ok(shares) => (pb::StatusCode::Ok, rows_to_proto(&shares)),
            Err(Error::NamespaceNotFound) => (pb::StatusCode::NamespaceNotFound, Vec::new()),
            Err(Error::NotFound) => (pb::StatusCode::NotFound, Vec::new()),
            Err(e) => {
                warn!("shrex/nd: failed to serve namespace data: {e}");
                (pb::StatusCode::Internal, Vec::new())
            }
        }
    }
}
