/*
    service_tests.rs - End-to-end tests over real TCP sockets

    Each cluster binds every listener first (so peer addresses are
    known), then starts the servers. Replication is asynchronous and
    best-effort, so assertions about remote state poll with a timeout.
*/

use crate::config::{NodeConfig, PeerConfig, ReplicationConfig};
use crate::node::server::NodeServer;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

struct TestClient {
    reader: BufReader<TcpStream>,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect to node");
        TestClient {
            reader: BufReader::new(stream),
        }
    }

    async fn send(&mut self, line: &str) -> Value {
        let stream = self.reader.get_mut();
        stream.write_all(line.as_bytes()).await.expect("write line");
        stream.write_all(b"\n").await.expect("write newline");

        let mut response = String::new();
        self.reader
            .read_line(&mut response)
            .await
            .expect("read response");
        serde_json::from_str(&response).expect("response is JSON")
    }
}

struct TestCluster {
    addrs: Vec<SocketAddr>,
    handles: Vec<JoinHandle<std::io::Result<()>>>,
}

/// Bind `size` listeners on ephemeral ports, then start fully meshed
/// servers around them
async fn start_cluster(size: usize, replication: ReplicationConfig) -> TestCluster {
    let mut listeners = Vec::new();
    for _ in 0..size {
        listeners.push(
            TcpListener::bind("127.0.0.1:0")
                .await
                .expect("bind ephemeral port"),
        );
    }
    let addrs: Vec<SocketAddr> = listeners
        .iter()
        .map(|l| l.local_addr().expect("local addr"))
        .collect();

    let mut handles = Vec::new();
    for (i, listener) in listeners.into_iter().enumerate() {
        let peers = addrs
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(j, addr)| PeerConfig {
                node_id: format!("node{}", j + 1),
                address: *addr,
            })
            .collect();

        let config = NodeConfig {
            node_id: format!("node{}", i + 1),
            bind_address: addrs[i],
            peers,
            replication: replication.clone(),
            ..NodeConfig::default()
        };

        let server = NodeServer::new(config, listener);
        handles.push(tokio::spawn(server.run()));
    }

    TestCluster { addrs, handles }
}

/// Poll `addr` with `line` until `check` passes or the deadline hits
async fn wait_for(addr: SocketAddr, line: &str, check: impl Fn(&Value) -> bool) -> Value {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let mut client = TestClient::connect(addr).await;
        let response = client.send(line).await;
        if check(&response) {
            return response;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("condition not reached for '{}', last response: {}", line, response);
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

fn no_push() -> ReplicationConfig {
    ReplicationConfig {
        push_enabled: false,
        ..Default::default()
    }
}

#[tokio::test]
async fn single_node_command_surface() {
    let cluster = start_cluster(1, no_push()).await;
    let mut client = TestClient::connect(cluster.addrs[0]).await;

    let pong = client.send("PING").await;
    assert_eq!(pong["status"], "OK");
    assert_eq!(pong["message"], "PONG");

    let status = client.send("STATUS").await;
    assert_eq!(status["node_id"], "node1");
    assert_eq!(status["mode"], "masterless");
    assert_eq!(status["peers"], 0);

    let set = client.send(r#"SET user:1 '{"age":30,"city":"NYC"}'"#).await;
    assert_eq!(set["status"], "OK");
    assert_eq!(set["versions"], 1);

    let get = client.send("GET user:1").await;
    assert_eq!(get["status"], "OK");
    assert_eq!(get["value"], json!({"age": 30, "city": "NYC"}));

    let missing = client.send("GET nope").await;
    assert_eq!(missing["status"], "ERROR");
    assert_eq!(missing["message"], "Key 'nope' not found");

    let deleted = client.send("DELETE user:1").await;
    assert_eq!(deleted["status"], "OK");
    let gone = client.send("GET user:1").await;
    assert_eq!(gone["status"], "ERROR");
}

#[tokio::test]
async fn protocol_errors_leave_connection_open() {
    let cluster = start_cluster(1, no_push()).await;
    let mut client = TestClient::connect(cluster.addrs[0]).await;

    let unknown = client.send("FROBNICATE x").await;
    assert_eq!(unknown["status"], "ERROR");
    assert_eq!(unknown["message"], "Unknown command: FROBNICATE");

    let arity = client.send("SET onlykey").await;
    assert_eq!(arity["status"], "ERROR");

    let quoting = client.send(r#"SET key "unclosed"#).await;
    assert_eq!(quoting["status"], "ERROR");

    let bad_index = client.send("SEARCH missing_idx 1").await;
    assert_eq!(bad_index["status"], "ERROR");
    assert_eq!(bad_index["message"], "Index 'missing_idx' not found");

    // Same connection still serves commands
    let pong = client.send("PING").await;
    assert_eq!(pong["status"], "OK");
}

#[tokio::test]
async fn index_and_search_scenario() {
    let cluster = start_cluster(1, no_push()).await;
    let mut client = TestClient::connect(cluster.addrs[0]).await;

    client.send(r#"SET user:1 '{"age":30,"city":"NYC","bio":"Rust developer"}'"#).await;
    client.send(r#"SET user:2 '{"age":25,"city":"SF","bio":"Python developer"}'"#).await;

    let created = client.send("CREATE_INDEX age_idx age").await;
    assert_eq!(created["status"], "OK");

    let range = client.send("RANGE_SEARCH age_idx 25 30").await;
    assert_eq!(range["status"], "OK");
    assert_eq!(range["keys"], json!(["user:1", "user:2"]));

    client.send("CREATE_INDEX city_idx city").await;
    let exact = client.send(r#"SEARCH city_idx "NYC""#).await;
    assert_eq!(exact["keys"], json!(["user:1"]));

    let both = client.send("FULLTEXT developer").await;
    assert_eq!(both["keys"], json!(["user:1", "user:2"]));

    let and = client.send(r#"FULLTEXT "rust developer" and"#).await;
    assert_eq!(and["keys"], json!(["user:1"]));

    let semantic = client.send(r#"SEMANTIC "rust developer" 1"#).await;
    assert_eq!(semantic["status"], "OK");
    let results = semantic["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["key"], "user:1");

    // DELETE drops the key out of every index
    client.send("DELETE user:1").await;
    let range = client.send("RANGE_SEARCH age_idx 25 30").await;
    assert_eq!(range["keys"], json!(["user:2"]));
    let fulltext = client.send("FULLTEXT rust").await;
    assert_eq!(fulltext["keys"], json!([]));
}

#[tokio::test]
async fn replicate_push_propagates_writes() {
    let cluster = start_cluster(3, ReplicationConfig::default()).await;
    let mut client = TestClient::connect(cluster.addrs[0]).await;

    let set = client.send(r#"SET shared '{"origin":"node1"}'"#).await;
    assert_eq!(set["status"], "OK");

    for addr in &cluster.addrs[1..] {
        let response = wait_for(*addr, "GET shared", |r| r["status"] == "OK").await;
        assert_eq!(response["value"], json!({"origin": "node1"}));
    }

    // DELETE pushes too
    client.send("DELETE shared").await;
    for addr in &cluster.addrs[1..] {
        wait_for(*addr, "GET shared", |r| r["status"] == "ERROR").await;
    }
}

#[tokio::test]
async fn concurrent_replicated_writes_resolve_by_timestamp() {
    let cluster = start_cluster(1, no_push()).await;
    let addr = cluster.addrs[0];
    let mut client = TestClient::connect(addr).await;

    // Two REPLICATE frames with mutually concurrent clocks, as pushed
    // by two nodes that wrote independently
    let first = client
        .send(r#"{"type":"REPLICATE","operation":"SET","key":"counter","value":1,"vector_clock":{"clocks":{"a":1}}}"#)
        .await;
    assert_eq!(first["status"], "OK");

    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = client
        .send(r#"{"type":"REPLICATE","operation":"SET","key":"counter","value":2,"vector_clock":{"clocks":{"b":1}}}"#)
        .await;
    assert_eq!(second["status"], "OK");

    // Last write wins by wall clock on the read view
    let get = client.send("GET counter").await;
    assert_eq!(get["value"], json!(2));
}

#[tokio::test]
async fn sync_frame_merges_log_entries() {
    let cluster = start_cluster(1, no_push()).await;
    let mut client = TestClient::connect(cluster.addrs[0]).await;

    let sync = client
        .send(r#"{"type":"SYNC","log_entries":[{"operation":"SET","key":"k","value":"v","vector_clock":{"clocks":{"a":1}},"timestamp":1},{"operation":"DELETE","key":"gone","timestamp":2}]}"#)
        .await;
    assert_eq!(sync["status"], "OK");

    let get = client.send("GET k").await;
    assert_eq!(get["value"], json!("v"));
}

#[tokio::test]
async fn unknown_control_frame_is_rejected() {
    let cluster = start_cluster(1, no_push()).await;
    let mut client = TestClient::connect(cluster.addrs[0]).await;

    let response = client.send(r#"{"type":"GOSSIP"}"#).await;
    assert_eq!(response["status"], "ERROR");
    assert_eq!(response["message"], "Unknown internal command");
}

#[tokio::test]
async fn anti_entropy_heals_missed_pushes() {
    // Pushes disabled: state can only travel via SYNC rounds
    let replication = ReplicationConfig {
        push_enabled: false,
        sync_interval: Duration::from_millis(200),
        ..Default::default()
    };
    let cluster = start_cluster(2, replication).await;

    let mut client = TestClient::connect(cluster.addrs[0]).await;
    client.send(r#"SET healed '{"via":"sync"}'"#).await;

    let response = wait_for(cluster.addrs[1], "GET healed", |r| r["status"] == "OK").await;
    assert_eq!(response["value"], json!({"via": "sync"}));
}

#[tokio::test]
async fn shutdown_stops_the_listener() {
    let mut cluster = start_cluster(1, no_push()).await;
    let mut client = TestClient::connect(cluster.addrs[0]).await;

    let response = client.send("SHUTDOWN").await;
    assert_eq!(response["status"], "OK");
    assert_eq!(response["message"], "Shutting down");

    let run_result = tokio::time::timeout(Duration::from_secs(2), cluster.handles.remove(0))
        .await
        .expect("server must stop after SHUTDOWN")
        .expect("server task must not panic");
    assert!(run_result.is_ok());
}

#[tokio::test]
async fn outdated_replicated_write_is_acknowledged_not_stored() {
    let cluster = start_cluster(1, no_push()).await;
    let mut client = TestClient::connect(cluster.addrs[0]).await;

    // Build causal history on the node: each SET re-stamps node1's
    // counter, so the stored clock ends at {"node1": 3}
    client.send(r#"SET k "v1""#).await;
    let sync = client
        .send(r#"{"type":"SYNC","log_entries":[{"operation":"SET","key":"k","value":"v2","vector_clock":{"clocks":{"node1":1}},"timestamp":1},{"operation":"SET","key":"k","value":"v3","vector_clock":{"clocks":{"node1":2}},"timestamp":2}]}"#)
        .await;
    assert_eq!(sync["status"], "OK");

    // A client SET starts from an empty clock, lands at {"node1": 1},
    // and is causally behind: acknowledged as OK but ignored
    let stale = client.send(r#"SET k "stale""#).await;
    assert_eq!(stale["status"], "OK");
    assert_eq!(stale["message"], "Outdated version ignored");

    let get = client.send("GET k").await;
    assert_eq!(get["value"], json!("v3"));
}
