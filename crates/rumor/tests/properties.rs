//! Property tests: arbitrary record distributions converge.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use rumor::store::{MemoryStore, Store};
use rumor::sync::{verify_convergence, MemoryNetwork};
use rumor::{Endpoint, Node, NodeConfig, Record};

/// Streams of `len` records, each held whole by node a (0), node b (1), or
/// both (2). Streams split across nodes by position are not covered: the
/// high-water mark only asks for records above it.
fn placements() -> impl Strategy<Value = Vec<(String, u64, u8)>> {
    prop::collection::btree_map("[a-f]{1,2}", (1u64..6, 0u8..3), 0..8)
        .prop_map(|m| m.into_iter().map(|(s, (len, side))| (s, len, side)).collect())
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn one_bidirectional_round_yields_union(placements in placements()) {
        let (union_a, union_b, converged, expected) = runtime().block_on(async {
            let network = MemoryNetwork::new();
            let mut nodes = Vec::new();
            for (name, peer) in [("a", "b"), ("b", "a")] {
                let endpoint = Endpoint::new(format!("mem://{}", name));
                let config = NodeConfig {
                    endpoint: endpoint.clone(),
                    originator: name.into(),
                    anti_entropy_interval: Duration::from_secs(3600),
                    seed_peers: vec![Endpoint::new(format!("mem://{}", peer))],
                    ..Default::default()
                };
                let node = Arc::new(
                    Node::start(config, MemoryStore::new(), network.transport(endpoint.clone()))
                        .await
                        .unwrap(),
                );
                network.register(endpoint, node.handler()).await;
                nodes.push(node);
            }

            let mut expected = BTreeSet::new();
            for (stream, len, side) in &placements {
                for seq in 0..*len {
                    let record = Record::new(stream.as_str(), seq, "gen", format!("{}:{}", stream, seq));
                    if *side != 1 {
                        nodes[0].store().merge_record(&record).await.unwrap();
                    }
                    if *side != 0 {
                        nodes[1].store().merge_record(&record).await.unwrap();
                    }
                    expected.insert(record.label());
                }
            }

            for node in &nodes {
                node.run_round().await.unwrap();
            }
            for node in &nodes {
                node.wait_idle().await;
            }

            let held = |streams: Vec<(rumor::StreamId, Vec<Record>)>| -> BTreeSet<String> {
                streams.into_iter().flat_map(|(_, rs)| rs).map(|r| r.label()).collect()
            };
            let union_a = held(nodes[0].store().list_streams().await.unwrap());
            let union_b = held(nodes[1].store().list_streams().await.unwrap());
            let converged = verify_convergence(nodes[0].store().as_ref(), nodes[1].store().as_ref())
                .await
                .unwrap()
                .is_converged();

            for node in &nodes {
                node.shutdown().await.unwrap();
            }
            (union_a, union_b, converged, expected)
        });

        prop_assert_eq!(&union_a, &expected);
        prop_assert_eq!(&union_b, &expected);
        prop_assert!(converged);
    }
}
