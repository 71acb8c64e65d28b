//! Tests for the acquisition client.

use super::super::client::*;
use super::super::error::StreamError;
use super::super::protocol::{ControlMessage, Record};
use super::super::sources::{SyntheticConfig, TcpConfig};
use super::super::traits::SampleSink;
use super::{RecordingSink, ScriptedSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

fn client_for(address: std::net::SocketAddr) -> StreamClient {
    StreamClient::new(ClientConfig {
        tcp: TcpConfig::with_address(address),
        ..ClientConfig::network()
    })
}

#[test]
fn test_defaults_before_start() {
    let client = StreamClient::new(ClientConfig::default());
    assert_eq!(client.latest_sample(), 0);
    assert_eq!(client.latest_quality(), 0);
    assert_eq!(client.sample_rate(), 0);
    assert_eq!(client.state(), ConnectionState::Initializing);
    assert!(client.is_open());
    assert!(!client.config().synthetic);
}

#[test]
fn test_start_requires_runtime() {
    let client = StreamClient::new(ClientConfig::synthetic());
    assert!(matches!(client.start(), Err(StreamError::Runtime(_))));
}

#[test]
fn test_close_twice_is_harmless() {
    let sink = Arc::new(RecordingSink::default());
    let client = StreamClient::with_sinks(
        ClientConfig::default(),
        vec![sink.clone() as Arc<dyn SampleSink>],
    );
    client.close();
    client.close();
    assert!(!client.is_open());
    assert_eq!(client.state(), ConnectionState::Closed);
    assert!(*sink.closed.lock());
}

#[tokio::test]
async fn test_records_published_in_wire_order() {
    let sink = Arc::new(RecordingSink::default());
    let source = ScriptedSource::new(vec![
        Ok(vec![Record::RawEeg(42)]),
        Ok(vec![]),
        Ok(vec![
            Record::PoorSignal { poor_signal_level: 5 },
            Record::RawEeg(-9),
            Record::ESense { poor_signal_level: 80 },
        ]),
    ]);
    let client = StreamClient::with_sinks(
        ClientConfig::default(),
        vec![sink.clone() as Arc<dyn SampleSink>],
    );
    client.start_with_source(source).unwrap();

    wait_for(|| client.records_published() == 4).await;
    assert_eq!(client.state(), ConnectionState::Streaming);
    assert_eq!(*sink.samples.lock(), vec![42, 5, -9, 80]);
    assert_eq!(client.latest_sample(), 80);
    assert_eq!(client.latest_quality(), 80);

    client.close();
    assert!(client.join().await.is_ok());
    assert!(*sink.closed.lock());
    assert_eq!(client.records_skipped(), 0);
}

#[tokio::test]
async fn test_raw_record_leaves_quality_alone() {
    let source = ScriptedSource::new(vec![
        Ok(vec![Record::PoorSignal { poor_signal_level: 200 }]),
        Ok(vec![Record::RawEeg(42)]),
    ]);
    let client = StreamClient::new(ClientConfig::default().verbose(true));
    client.start_with_source(source).unwrap();

    wait_for(|| client.records_published() == 2).await;
    assert_eq!(client.latest_sample(), 42);
    assert_eq!(client.latest_quality(), 200);
    client.close();
}

#[tokio::test]
async fn test_source_error_closes_client() {
    let source = ScriptedSource::new(vec![
        Ok(vec![Record::RawEeg(1)]),
        Err(StreamError::UnexpectedEnd("bridge went away".to_string())),
    ]);
    let client = StreamClient::new(ClientConfig::default());
    client.start_with_source(source).unwrap();

    let result = client.join().await;
    assert!(matches!(result, Err(StreamError::UnexpectedEnd(_))));
    assert!(!client.is_open());
    assert_eq!(client.latest_sample(), 1);
    assert!(matches!(
        client.last_error(),
        Some(StreamError::UnexpectedEnd(_))
    ));
    // Surfaced once.
    assert!(client.join().await.is_ok());
}

#[tokio::test]
async fn test_cannot_restart() {
    let client = StreamClient::new(ClientConfig::default());
    client.start_with_source(ScriptedSource::new(vec![])).unwrap();
    assert!(matches!(
        client.start_with_source(ScriptedSource::new(vec![])),
        Err(StreamError::InvalidConfig(_))
    ));
    client.close();
    assert!(client.join().await.is_ok());

    let closed = StreamClient::new(ClientConfig::default());
    closed.close();
    assert!(closed.start_with_source(ScriptedSource::new(vec![])).is_err());
}

#[tokio::test(start_paused = true)]
async fn test_rate_reflects_samples_in_window() {
    let source = ScriptedSource::new(vec![Ok((0..300).map(Record::RawEeg).collect())]);
    let client = StreamClient::new(ClientConfig::default());
    client.start_with_source(source).unwrap();

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(client.records_published(), 300);
    assert_eq!(client.sample_rate(), 300);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(client.sample_rate(), 0);
    client.close();
}

#[tokio::test]
async fn test_tcp_stream_end_to_end() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let (hangup_tx, hangup_rx) = oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let expected = ControlMessage::default().to_bytes().unwrap();
        let mut handshake = vec![0u8; expected.len()];
        socket.read_exact(&mut handshake).await.unwrap();
        assert_eq!(handshake, expected);

        for chunk in [
            &b"{\"rawEeg\": 42}\r{\"poorSig"[..],
            &b"nalLevel\": 5}\rnot-json\r"[..],
            &b"{\"eSense\":{\"poorSignalLevel\":80},\"a\":1,\"b\":2,\"c\":3}\r{\"rawEeg\": -3"[..],
            &b"}\r"[..],
        ] {
            socket.write_all(chunk).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let _ = hangup_rx.await;
    });

    let client = client_for(address);
    client.start().unwrap();

    wait_for(|| client.records_published() == 4 && client.records_skipped() == 1).await;
    assert_eq!(client.state(), ConnectionState::Streaming);
    assert_eq!(client.latest_sample(), -3);
    assert_eq!(client.latest_quality(), 80);

    hangup_tx.send(()).unwrap();
    server.await.unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), client.join())
        .await
        .expect("client should notice the hang-up");
    assert!(matches!(result, Err(StreamError::UnexpectedEnd(_))));
    assert!(!client.is_open());
}

#[tokio::test]
async fn test_connection_refused_is_surfaced() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(address);
    client.start().unwrap();

    let result = tokio::time::timeout(Duration::from_secs(15), client.join())
        .await
        .expect("connect should fail promptly");
    let error = result.unwrap_err();
    assert!(error.is_fatal());
    assert!(matches!(
        error,
        StreamError::Connection { .. } | StreamError::Timeout { .. }
    ));
    assert!(!client.is_open());
    assert!(client.last_error().is_some());
}

#[tokio::test]
async fn test_close_interrupts_pending_receive() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut sink = Vec::new();
        // Returns once the client drops its socket.
        let _ = socket.read_to_end(&mut sink).await;
    });

    let client = client_for(address);
    client.start().unwrap();
    wait_for(|| client.state() == ConnectionState::Streaming).await;

    client.close();
    let result = tokio::time::timeout(Duration::from_secs(5), client.join())
        .await
        .expect("close should stop the acquisition loop");
    assert!(result.is_ok());

    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("socket should be released")
        .unwrap();
}

#[test]
fn test_tcp_config_parse() {
    let config = TcpConfig::parse("127.0.0.1:4000").unwrap();
    assert_eq!(config.address.port(), 4000);
    assert_eq!(config.chunk_size, TcpConfig::default().chunk_size);

    assert!(matches!(
        TcpConfig::parse("localhost"),
        Err(StreamError::InvalidConfig(_))
    ));
}

#[tokio::test]
async fn test_synthetic_source_that_cannot_draw_closes_client() {
    let client = StreamClient::new(ClientConfig {
        synthetic_source: SyntheticConfig {
            mean: 0.5,
            std_dev: 1.0e9,
            bound: 1,
            ..SyntheticConfig::seeded(5)
        },
        ..ClientConfig::synthetic()
    });
    client.start().unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), client.join())
        .await
        .expect("acquisition should stop instead of spinning");
    assert!(matches!(result, Err(StreamError::InvalidConfig(_))));
    assert!(!client.is_open());
}
