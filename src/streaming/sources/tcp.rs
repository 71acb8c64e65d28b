//! TCP source for the ThinkGear Connector bridge.

use crate::streaming::{
    error::{StreamError, StreamResult},
    protocol::{ControlMessage, RecordFramer, decode_record},
    traits::{Reading, SampleSource},
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};
use tracing::{debug, trace};

/// Configuration for the TCP source.
#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// Bridge address to connect to
    pub address: SocketAddr,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Read timeout for each chunk; `None` waits indefinitely
    pub read_timeout: Option<Duration>,
    /// Bytes requested per socket read
    pub chunk_size: usize,
    /// Longest record accepted before it is dropped as garbage
    pub max_record_len: usize,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            address: SocketAddr::from(([127, 0, 0, 1], 13854)),
            connect_timeout: Duration::from_secs(10),
            read_timeout: None,
            chunk_size: 1000,
            max_record_len: 64 * 1024,
        }
    }
}

impl TcpConfig {
    /// Default configuration pointed at another address.
    pub fn with_address(address: SocketAddr) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }

    /// Parse an address such as `"127.0.0.1:13854"`.
    pub fn parse(address: &str) -> StreamResult<Self> {
        let address = address
            .parse()
            .map_err(|e| StreamError::InvalidConfig(format!("invalid address '{address}': {e}")))?;
        Ok(Self::with_address(address))
    }
}

/// Reads JSON records from a ThinkGear Connector socket.
pub struct TcpRecordSource {
    config: TcpConfig,
    connection: Option<TcpStream>,
    framer: RecordFramer,
    read_buffer: Vec<u8>,
    skipped_records: u64,
}

impl TcpRecordSource {
    /// Create a source; no connection is made until [`SampleSource::open`].
    pub fn new(config: TcpConfig) -> Self {
        let framer = RecordFramer::new(config.max_record_len);
        let read_buffer = vec![0u8; config.chunk_size.max(1)];
        Self {
            config,
            connection: None,
            framer,
            read_buffer,
            skipped_records: 0,
        }
    }

    async fn connect(&mut self) -> StreamResult<TcpStream> {
        let connection_result = timeout(
            self.config.connect_timeout,
            TcpStream::connect(self.config.address),
        )
        .await;

        match connection_result {
            Ok(Ok(stream)) => {
                stream
                    .set_nodelay(true)
                    .map_err(|e| StreamError::connection("set_nodelay", e))?;
                Ok(stream)
            }
            Ok(Err(e)) => Err(StreamError::connection("connect", e)),
            Err(_) => Err(StreamError::timeout("connect", self.config.connect_timeout)),
        }
    }

    async fn read_chunk(&mut self) -> StreamResult<usize> {
        let connection = self.connection.as_mut().ok_or_else(|| {
            StreamError::InvalidConfig("read attempted before the source was opened".to_string())
        })?;

        let read = connection.read(&mut self.read_buffer);
        let result = match self.config.read_timeout {
            Some(limit) => timeout(limit, read)
                .await
                .map_err(|_| StreamError::timeout("read", limit))?,
            None => read.await,
        };

        match result {
            Ok(0) => {
                self.connection = None;
                Err(StreamError::UnexpectedEnd(
                    "connection closed by the bridge".to_string(),
                ))
            }
            Ok(bytes_read) => Ok(bytes_read),
            Err(e) => {
                self.connection = None;
                Err(StreamError::connection("read", e))
            }
        }
    }
}

impl SampleSource for TcpRecordSource {
    fn name(&self) -> &'static str {
        "thinkgear-tcp"
    }

    async fn open(&mut self) -> StreamResult<()> {
        let mut stream = self.connect().await?;
        let handshake = ControlMessage::default().to_bytes()?;
        stream
            .write_all(&handshake)
            .await
            .map_err(|e| StreamError::connection("handshake", e))?;
        debug!(address = %self.config.address, "Sent raw output request to bridge");

        self.framer.clear();
        self.connection = Some(stream);
        Ok(())
    }

    async fn next_readings(&mut self) -> StreamResult<Vec<Reading>> {
        let bytes_read = self.read_chunk().await?;
        let lines = self.framer.push(&self.read_buffer[..bytes_read]);

        let mut readings = Vec::with_capacity(lines.len());
        for line in lines {
            match decode_record(&line) {
                Ok(record) => readings.push(Reading::from(record)),
                Err(e) => {
                    self.skipped_records += 1;
                    trace!(error = %e, "Skipping undecodable record");
                }
            }
        }
        Ok(readings)
    }

    fn skipped_records(&self) -> u64 {
        self.skipped_records + self.framer.oversized_records()
    }
}
