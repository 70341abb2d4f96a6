//! Independent sessions per partition against one node.

use std::sync::{Arc, Barrier};
use std::thread;

use extframe_protocol::{
    connect, prepare_wire_types, ExportClient, FrameServer, IngestClient, IngestRequest,
    ServerConfig, Value,
};
use extframe_store::{ColumnType, FrameBuilder, FrameStore, MemoryStore};
use extframe_transport::Endpoint;
use extframe_wire::WireType;

const WORDS: [&str; 7] = ["zero", "one", "two", "three", "four", "five", "six"];

fn scenario_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    FrameBuilder::new("scenario")
        .numeric(
            "x",
            vec![
                Some(f64::NAN),
                Some(1.5),
                Some(2.0),
                Some(3.25),
                Some(4.0),
                Some(5.5),
                Some(6.0),
            ],
        )
        .string("word", WORDS.iter().map(|w| Some(*w)).collect())
        .with_chunk_layout(vec![2, 2, 2, 1])
        .build(&store)
        .unwrap();
    Arc::new(store)
}

#[test]
fn partitions_export_concurrently() {
    let store = scenario_store();
    let server = FrameServer::bind(
        &Endpoint::tcp("127.0.0.1", 0),
        Arc::clone(&store),
        ServerConfig::default(),
    )
    .unwrap();
    let endpoint = server.endpoint().clone();
    let shutdown = server.shutdown_handle();
    let serving = thread::spawn(move || server.serve());

    let wire_types = prepare_wire_types(&store.resolve_frame("scenario").unwrap());
    assert_eq!(wire_types, vec![WireType::Float, WireType::String]);

    let start = Arc::new(Barrier::new(4));
    let sessions: Vec<_> = (0..4)
        .map(|partition| {
            let endpoint = endpoint.clone();
            let wire_types = wire_types.clone();
            let start = Arc::clone(&start);
            thread::spawn(move || {
                let mut conn = connect(&endpoint).unwrap();
                start.wait();
                let mut client =
                    ExportClient::open(&mut conn, "scenario", partition, &[0, 1]).unwrap();
                let rows: Vec<Vec<Value>> = (0..client.num_rows())
                    .map(|_| client.read_row(&wire_types).unwrap())
                    .collect();
                client.wait_until_all_received().unwrap();
                (partition, rows)
            })
        })
        .collect();

    let mut results: Vec<(usize, Vec<Vec<Value>>)> =
        sessions.into_iter().map(|s| s.join().unwrap()).collect();
    results.sort_by_key(|(partition, _)| *partition);

    let sizes: Vec<usize> = results.iter().map(|(_, rows)| rows.len()).collect();
    assert_eq!(sizes, vec![2, 2, 2, 1]);
    assert_eq!(sizes.iter().sum::<usize>(), 7);

    let (_, first) = &results[0];
    assert_eq!(first[0][0], Value::Na);
    assert_eq!(first[1][0], Value::Float(1.5));

    let words: Vec<String> = results
        .iter()
        .flat_map(|(_, rows)| rows.iter().map(|row| row[1].as_str().unwrap().to_string()))
        .collect();
    assert_eq!(words, WORDS);

    shutdown.shutdown();
    serving.join().unwrap().unwrap();
}

#[test]
fn partitions_ingest_concurrently() {
    let store = Arc::new(MemoryStore::new());
    let server = FrameServer::bind(
        &Endpoint::tcp("127.0.0.1", 0),
        Arc::clone(&store),
        ServerConfig::default(),
    )
    .unwrap();
    let endpoint = server.endpoint().clone();
    let shutdown = server.shutdown_handle();
    let serving = thread::spawn(move || server.serve());

    let sessions: Vec<_> = (0..8usize)
        .map(|partition| {
            let endpoint = endpoint.clone();
            thread::spawn(move || {
                let mut conn = connect(&endpoint).unwrap();
                let rows = partition + 1;
                let request = IngestRequest::new(
                    "parallel",
                    vec![ColumnType::Numeric, ColumnType::Categorical],
                    vec![WireType::Long, WireType::String],
                    partition,
                    rows,
                );
                let mut client = IngestClient::create_chunks(&mut conn, request).unwrap();
                for row in 0..rows {
                    client.send_long((partition * 100 + row) as i64).unwrap();
                    client.send_string(&format!("p{}", partition % 3)).unwrap();
                }
                client.wait_until_all_written().unwrap();
            })
        })
        .collect();
    for session in sessions {
        session.join().unwrap();
    }

    let frame = store.resolve_frame("parallel").unwrap();
    assert_eq!(frame.partitions, (0..8).collect::<Vec<_>>());
    let mut domain = frame.columns[1].domain.to_vec();
    domain.sort();
    assert_eq!(domain, vec!["p0", "p1", "p2"]);
    for partition in 0..8usize {
        let chunks = store.get_chunks("parallel", partition).unwrap();
        assert_eq!(chunks[0].len(), partition + 1);
        assert_eq!(chunks[0].int_value(partition), Some((partition * 101) as i64));
        let label = format!("p{}", partition % 3);
        assert_eq!(chunks[1].label(0), Some(label.as_str()));
    }

    shutdown.shutdown();
    serving.join().unwrap().unwrap();
}
