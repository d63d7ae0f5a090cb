//! Two nodes gossiping over real HTTP on localhost.

use std::sync::Arc;
use std::time::Duration;

use rumor::store::{MemoryStore, SqliteStore, Store};
use rumor::sync::{GossipMessage, SyncError, Transport, WantMessage};
use rumor::{http, Endpoint, HttpTransport, Node, NodeConfig, StreamId, SummaryVector};

async fn serve<S: Store + 'static>(store: S, name: &str) -> Arc<Node<S, HttpTransport>> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let config = NodeConfig {
        endpoint: Endpoint::new(format!("http://{}{}", addr, http::GOSSIP_PATH)),
        listen: addr.to_string(),
        originator: name.into(),
        anti_entropy_interval: Duration::from_secs(3600),
        request_timeout: Duration::from_secs(5),
        ..Default::default()
    };
    let transport = HttpTransport::from_config(&config).unwrap();
    let node = Arc::new(Node::start(config, store, transport).await.unwrap());

    let app = http::router(Arc::clone(&node));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    node
}

#[tokio::test]
async fn test_http_round_trip() {
    let a = serve(MemoryStore::new(), "a").await;
    let b = serve(MemoryStore::new(), "b").await;

    a.publish("news", "one").await.unwrap();
    a.publish("news", "two").await.unwrap();

    b.add_peer(a.endpoint()).await.unwrap();
    let report = b.run_round().await.unwrap();
    assert_eq!(report.sent, 1);
    a.wait_idle().await;

    let news = b.stream(&StreamId::new("news")).await.unwrap();
    assert_eq!(news.len(), 2);
    assert_eq!(news[1].payload, "two");
    assert_eq!(news[1].originator, "a");

    // a now knows b from the want.
    let peers = a.peers().await.unwrap();
    assert_eq!(peers.len(), 1);
    assert_eq!(&peers[0].endpoint, b.endpoint());
}

#[tokio::test]
async fn test_http_sqlite_node() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(dir.path().join("b.db")).unwrap();

    let a = serve(MemoryStore::new(), "a").await;
    let b = serve(store, "b").await;

    a.publish("s1", "x").await.unwrap();
    b.add_peer(a.endpoint()).await.unwrap();
    b.run_round().await.unwrap();
    a.wait_idle().await;

    let summary = b.summary().await.unwrap();
    assert_eq!(summary.get(&StreamId::new("s1")), Some(0));
}

#[tokio::test]
async fn test_http_transport_reports_rejection() {
    let a = serve(MemoryStore::new(), "a").await;
    let transport = HttpTransport::new(Duration::from_secs(5), false).unwrap();

    // Wrong path: the router answers 404.
    let wrong = Endpoint::new(a.endpoint().as_str().replace("/gossip", "/nope"));
    let message = GossipMessage::Want(WantMessage {
        want: SummaryVector::new(),
        reply_endpoint: Endpoint::new("http://127.0.0.1:1/gossip"),
    });

    let err = transport.send(&wrong, message).await.unwrap_err();
    assert!(matches!(err, SyncError::PeerRejected { status: 404, .. }));
}

#[tokio::test]
async fn test_http_transport_unreachable() {
    // Bind then drop to find a port nobody is listening on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = HttpTransport::new(Duration::from_secs(5), false).unwrap();
    let message = GossipMessage::Want(WantMessage {
        want: SummaryVector::new(),
        reply_endpoint: Endpoint::new("http://127.0.0.1:1/gossip"),
    });

    let err = transport
        .send(&Endpoint::new(format!("http://{}/gossip", addr)), message)
        .await
        .unwrap_err();
    assert!(err.is_transport());
}
