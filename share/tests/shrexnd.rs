use std::sync::Arc;
use std::time::Duration;

use prost::Message;
use tessera_blockstore::InMemoryBlockstore;
use tessera_share::ipld::add_shares;
use tessera_share::shrexnd::{pb, Client, Parameters, Server, Status};
use tessera_share::Error;
use tessera_types::multihash::NMT_ID_SIZE;
use tessera_types::nmt::{Namespace, NS_SIZE};
use tessera_types::test_utils::random_shares;
use tessera_types::DataAvailabilityHeader;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::compat::TokioAsyncReadCompatExt;
use tokio_util::sync::CancellationToken;

type Store = InMemoryBlockstore<NMT_ID_SIZE>;

struct TestSetup {
    server: Arc<Server<Store>>,
    client: Client,
    dah: DataAvailabilityHeader,
    namespace: Namespace,
    expected: Vec<u8>,
}

/// A square of 16 shares holding `expected` twice, served by a registered
/// shrex/nd server.
async fn new_setup() -> TestSetup {
    let token = CancellationToken::new();
    let store = Arc::new(Store::new());

    let mut shares = random_shares(16);
    let expected = shares[7].clone();
    shares[8] = expected.clone();
    let namespace = Namespace::from_raw(&expected[..NS_SIZE]).unwrap();

    let (_eds, dah) = add_shares(&token, &*store, shares).await.unwrap();

    let server = Arc::new(Server::new(Parameters::default(), store).unwrap());
    server.register_eds(dah.clone());

    let client = Client::new(Parameters::default()).unwrap();

    TestSetup {
        server,
        client,
        dah,
        namespace,
        expected,
    }
}

fn spawn_server(server: Arc<Server<Store>>, stream: tokio::io::DuplexStream) {
    let token = CancellationToken::new();
    tokio::spawn(async move {
        server.handle_stream(stream.compat(), &token).await.unwrap();
    });
}

#[tokio::test]
async fn nd_round_trip() {
    let setup = new_setup().await;
    let token = CancellationToken::new();

    let (client_io, server_io) = tokio::io::duplex(1024 * 1024);
    spawn_server(setup.server.clone(), server_io);

    let ns_shares = setup
        .client
        .request_nd(
            client_io.compat(),
            &token,
            &setup.dah.hash(),
            setup.namespace,
            None,
        )
        .await
        .unwrap();

    let collected: Vec<_> = ns_shares
        .rows
        .iter()
        .flat_map(|row| row.shares.iter())
        .collect();
    assert_eq!(collected.len(), 2);
    for share in collected {
        assert_eq!(share.as_ref(), &setup.expected[..]);
    }

    // every returned row verifies against the data availability header
    let mut in_range_roots = setup
        .dah
        .row_roots()
        .iter()
        .filter(|root| root.contains(setup.namespace));
    for row in &ns_shares.rows {
        let root = in_range_roots.next().expect("more rows than roots in range");
        row.proof
            .verify_complete_namespace(root, &row.shares, setup.namespace)
            .unwrap();
    }

    assert_eq!(setup.client.metrics().count(Status::Success), 1);
}

#[tokio::test]
async fn nd_unknown_root() {
    let setup = new_setup().await;
    let token = CancellationToken::new();

    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    spawn_server(setup.server.clone(), server_io);

    let err = setup
        .client
        .request_nd(client_io.compat(), &token, &[0u8; 32], setup.namespace, None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotFound));
    assert_eq!(setup.client.metrics().count(Status::NotFound), 1);
}

#[tokio::test]
async fn nd_namespace_not_found() {
    let token = CancellationToken::new();
    let store = Arc::new(Store::new());

    // controlled namespaces so the query is outside every row
    let shares: Vec<_> = (1..=4u8)
        .map(|n| {
            tessera_types::test_utils::share_with_namespace(&[0, 0, 0, 0, 0, 0, 0, n])
        })
        .collect();
    let (_eds, dah) = add_shares(&token, &*store, shares).await.unwrap();

    let server = Arc::new(Server::new(Parameters::default(), store).unwrap());
    server.register_eds(dah.clone());
    let client = Client::new(Parameters::default()).unwrap();

    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    spawn_server(server, server_io);

    let queried = Namespace::from_raw(&[0x7F; NS_SIZE]).unwrap();
    let err = client
        .request_nd(client_io.compat(), &token, &dah.hash(), queried, None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NamespaceNotFound));
}

#[tokio::test]
async fn nd_rate_limited_server() {
    let setup = new_setup().await;
    let token = CancellationToken::new();

    let (client_io, server_io) = tokio::io::duplex(64 * 1024);

    // an overloaded server consumes the request and closes the stream
    // without writing a response
    tokio::spawn(async move {
        let mut server_io = server_io;
        let mut buf = vec![0u8; 4096];
        loop {
            match server_io.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
    });

    let err = setup
        .client
        .request_nd(
            client_io.compat(),
            &token,
            &setup.dah.hash(),
            setup.namespace,
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotFound));
    assert_eq!(setup.client.metrics().count(Status::RateLimited), 1);
    assert_eq!(setup.client.metrics().count(Status::NotFound), 0);
}

#[tokio::test]
async fn nd_invalid_status() {
    let setup = new_setup().await;
    let token = CancellationToken::new();

    let (client_io, server_io) = tokio::io::duplex(64 * 1024);

    // a misbehaving server answers with the INVALID status
    tokio::spawn(async move {
        let mut server_io = server_io;
        let mut buf = vec![0u8; 4096];
        loop {
            match server_io.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }

        let response = pb::GetSharesByNamespaceResponse {
            status: pb::StatusCode::Invalid as i32,
            rows: Vec::new(),
        };
        server_io
            .write_all(&response.encode_length_delimited_to_vec())
            .await
            .unwrap();
    });

    let err = setup
        .client
        .request_nd(
            client_io.compat(),
            &token,
            &setup.dah.hash(),
            setup.namespace,
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidResponse));
    assert_eq!(setup.client.metrics().count(Status::Invalid), 1);
}

#[tokio::test]
async fn nd_deadline_exceeded() {
    let setup = new_setup().await;
    let token = CancellationToken::new();

    let (client_io, server_io) = tokio::io::duplex(64 * 1024);

    // a stuck server holds the stream open without ever responding
    tokio::spawn(async move {
        let mut server_io = server_io;
        let mut buf = vec![0u8; 4096];
        loop {
            match server_io.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let err = setup
        .client
        .request_nd(
            client_io.compat(),
            &token,
            &setup.dah.hash(),
            setup.namespace,
            Some(Duration::from_millis(100)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout));
    assert_eq!(setup.client.metrics().count(Status::Timeout), 1);
}

#[tokio::test]
async fn nd_canceled_request() {
    let setup = new_setup().await;
    let token = CancellationToken::new();
    token.cancel();

    let (client_io, _server_io) = tokio::io::duplex(64 * 1024);

    let err = setup
        .client
        .request_nd(
            client_io.compat(),
            &token,
            &setup.dah.hash(),
            setup.namespace,
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Canceled));
}

#[tokio::test]
async fn nd_server_rejects_invalid_request() {
    let setup = new_setup().await;

    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    spawn_server(setup.server.clone(), server_io);

    // namespace of a wrong size
    let request = pb::GetSharesByNamespaceRequest {
        root_hash: setup.dah.hash().to_vec(),
        namespace_id: vec![1, 2, 3],
    };

    let mut client_io = client_io;
    client_io
        .write_all(&request.encode_length_delimited_to_vec())
        .await
        .unwrap();
    client_io.shutdown().await.unwrap();

    let mut buf = Vec::new();
    client_io.read_to_end(&mut buf).await.unwrap();

    let response = pb::GetSharesByNamespaceResponse::decode_length_delimited(&buf[..]).unwrap();
    assert_eq!(response.status, pb::StatusCode::Invalid as i32);
    assert!(response.rows.is_empty());
}

#[tokio::test]
async fn nd_absence_row_over_the_wire() {
    let token = CancellationToken::new();
    let store = Arc::new(Store::new());

    // namespaces switch mid-row, so one row brackets the queried one
    let low = [0, 0, 0, 0, 0, 0, 0, 2];
    let high = [0, 0, 0, 0, 0, 0, 0, 8];
    let shares: Vec<_> = (0..16)
        .map(|i| {
            let ns = if i < 6 { low } else { high };
            tessera_types::test_utils::share_with_namespace(&ns)
        })
        .collect();
    let (_eds, dah) = add_shares(&token, &*store, shares).await.unwrap();

    let server = Arc::new(Server::new(Parameters::default(), store).unwrap());
    server.register_eds(dah.clone());
    let client = Client::new(Parameters::default()).unwrap();

    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    spawn_server(server, server_io);

    let queried = Namespace::from_raw(&[0, 0, 0, 0, 0, 0, 0, 5]).unwrap();
    let ns_shares = client
        .request_nd(client_io.compat(), &token, &dah.hash(), queried, None)
        .await
        .unwrap();

    assert_eq!(ns_shares.rows.len(), 1);
    let row = &ns_shares.rows[0];
    assert!(row.shares.is_empty());
    assert!(row.proof.is_of_absence());

    let root = dah
        .row_roots()
        .iter()
        .find(|root| root.contains(queried))
        .unwrap();
    row.proof
        .verify_complete_namespace(root, tessera_types::nmt::EMPTY_LEAVES, queried)
        .unwrap();
}
