//! ThinkGear Connector wire protocol.
//!
//! After connecting, the client sends a single [`ControlMessage`] asking the
//! bridge for raw samples in JSON form. The bridge then writes a stream of
//! JSON objects separated by `\r` (and sometimes `\n`). Socket reads do not
//! respect record boundaries, so bytes go through a [`RecordFramer`] first and
//! each complete record is decoded with [`decode_record`].
//!
//! Three record shapes are understood, tried in order:
//!
//! ```text
//! {"rawEeg": 42}                                        -> Record::RawEeg
//! {"eSense": {"poorSignalLevel": 80}, "a":1, "b":2, ...} -> Record::ESense     (4+ fields)
//! {"poorSignalLevel": 5}                                 -> Record::PoorSignal
//! ```

use super::error::{StreamError, StreamResult};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

/// One EEG amplitude reading per device tick.
pub type RawSample = i32;

/// Device contact quality in `[0, 200]`; 0 is good contact.
pub type SignalQuality = i32;

/// Quality value the bridge reports when the headset has no usable contact.
pub const NO_CONTACT_LEVEL: SignalQuality = 200;

/// Default ThinkGear Connector endpoint.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:13854";

const PROTOCOL: &str = "thinkgear-json";

const RAW_EEG_FIELD: &str = "rawEeg";
const ESENSE_FIELD: &str = "eSense";
const POOR_SIGNAL_FIELD: &str = "poorSignalLevel";

/// Records with at least this many top-level fields carry their quality in `eSense`.
const ESENSE_MIN_FIELDS: usize = 4;

/// Output format requested from the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutputFormat {
    Json,
}

/// Handshake sent once, immediately after connecting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlMessage {
    pub enable_raw_output: bool,
    pub format: OutputFormat,
}

impl Default for ControlMessage {
    fn default() -> Self {
        Self {
            enable_raw_output: true,
            format: OutputFormat::Json,
        }
    }
}

impl ControlMessage {
    /// Encode the message as the ASCII bytes written to the socket.
    pub fn to_bytes(&self) -> StreamResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| StreamError::protocol(PROTOCOL, e.to_string()))
    }
}

/// A decoded record.
///
/// The quality-only variants also set the raw sample; the device bridge has
/// always been consumed this way and downstream plots rely on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record {
    /// Raw amplitude sample.
    RawEeg(RawSample),
    /// Quality nested under `eSense` in a full summary record.
    ESense { poor_signal_level: SignalQuality },
    /// Top-level quality in a short record.
    PoorSignal { poor_signal_level: SignalQuality },
}

impl Record {
    /// Value this record publishes as the latest raw sample.
    pub const fn raw_sample(&self) -> RawSample {
        match *self {
            Self::RawEeg(raw) => raw,
            Self::ESense { poor_signal_level } | Self::PoorSignal { poor_signal_level } => {
                poor_signal_level
            }
        }
    }

    /// Value this record publishes as the latest signal quality, if any.
    pub const fn signal_quality(&self) -> Option<SignalQuality> {
        match *self {
            Self::RawEeg(_) => None,
            Self::ESense { poor_signal_level } | Self::PoorSignal { poor_signal_level } => {
                Some(poor_signal_level)
            }
        }
    }
}

/// Decode one complete record.
///
/// Returns a [`StreamError::Protocol`] for anything that is not a JSON object
/// matching one of the known shapes; callers skip such records.
pub fn decode_record(text: &str) -> StreamResult<Record> {
    let value: Value = serde_json::from_str(text.trim())
        .map_err(|e| StreamError::protocol(PROTOCOL, format!("invalid JSON: {e}")))?;

    let Value::Object(fields) = value else {
        return Err(StreamError::protocol(PROTOCOL, "record is not a JSON object"));
    };

    if let Some(raw) = fields.get(RAW_EEG_FIELD) {
        return as_i32(raw, RAW_EEG_FIELD).map(Record::RawEeg);
    }

    if fields.len() >= ESENSE_MIN_FIELDS {
        let level = fields
            .get(ESENSE_FIELD)
            .and_then(|esense| esense.get(POOR_SIGNAL_FIELD))
            .ok_or_else(|| missing_field(&fields, "eSense.poorSignalLevel"))?;
        return as_i32(level, POOR_SIGNAL_FIELD)
            .map(|poor_signal_level| Record::ESense { poor_signal_level });
    }

    let level = fields
        .get(POOR_SIGNAL_FIELD)
        .ok_or_else(|| missing_field(&fields, POOR_SIGNAL_FIELD))?;
    as_i32(level, POOR_SIGNAL_FIELD).map(|poor_signal_level| Record::PoorSignal { poor_signal_level })
}

fn as_i32(value: &Value, field: &str) -> StreamResult<i32> {
    value
        .as_i64()
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(|| {
            StreamError::protocol(PROTOCOL, format!("field '{field}' is not a 32-bit integer: {value}"))
        })
}

fn missing_field(fields: &Map<String, Value>, field: &str) -> StreamError {
    let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
    StreamError::protocol(
        PROTOCOL,
        format!("record has no '{field}' field (keys: {keys:?})"),
    )
}

/// Reassembles delimited records from arbitrarily split socket reads.
///
/// Both `\r` and `\n` end a record; empty records are ignored. A record that
/// grows past `max_record_len` without a delimiter is dropped up to the next
/// delimiter.
#[derive(Debug, Clone)]
pub struct RecordFramer {
    pending: Vec<u8>,
    max_record_len: usize,
    discarding: bool,
    oversized: u64,
}

impl RecordFramer {
    /// Create a framer that holds at most `max_record_len` bytes of a partial record.
    pub fn new(max_record_len: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_record_len: max_record_len.max(1),
            discarding: false,
            oversized: 0,
        }
    }

    /// Feed a chunk and return every record it completes, in wire order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut records = Vec::new();

        for &byte in chunk {
            if byte == b'\r' || byte == b'\n' {
                if self.discarding {
                    self.discarding = false;
                } else if !self.pending.is_empty() {
                    records.push(String::from_utf8_lossy(&self.pending).into_owned());
                    self.pending.clear();
                }
            } else if self.discarding {
                continue;
            } else if self.pending.len() >= self.max_record_len {
                warn!(
                    limit = self.max_record_len,
                    "Dropping record that exceeds the maximum record length"
                );
                self.pending.clear();
                self.discarding = true;
                self.oversized += 1;
            } else {
                self.pending.push(byte);
            }
        }

        records
    }

    /// Number of bytes buffered for the record currently being assembled.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of records dropped for exceeding the length limit.
    pub fn oversized_records(&self) -> u64 {
        self.oversized
    }

    /// Forget any partially assembled record.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.discarding = false;
    }
}

impl Default for RecordFramer {
    fn default() -> Self {
        Self::new(64 * 1024)
    }
}
