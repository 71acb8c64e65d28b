//! Tests for streaming functionality.
//!
//! Covers the wire protocol, both sample sources, the rate monitor and the
//! acquisition client.

use super::error::{StreamError, StreamResult};
use super::protocol::{RawSample, Record};
use super::traits::{Reading, SampleSink, SampleSource};
use parking_lot::Mutex;
use std::collections::VecDeque;

mod client_tests;
mod protocol_tests;

/// In-memory source that replays a script of wire records, then waits forever.
pub(crate) struct ScriptedSource {
    open_error: Option<StreamError>,
    script: VecDeque<StreamResult<Vec<Record>>>,
}

impl ScriptedSource {
    pub(crate) fn new(script: Vec<StreamResult<Vec<Record>>>) -> Self {
        Self {
            open_error: None,
            script: script.into(),
        }
    }

    pub(crate) fn failing_open(error: StreamError) -> Self {
        Self {
            open_error: Some(error),
            script: VecDeque::new(),
        }
    }
}

impl SampleSource for ScriptedSource {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn open(&mut self) -> StreamResult<()> {
        match self.open_error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn next_readings(&mut self) -> StreamResult<Vec<Reading>> {
        match self.script.pop_front() {
            Some(step) => step.map(|records| records.into_iter().map(Reading::from).collect()),
            None => std::future::pending().await,
        }
    }
}

/// Sink that remembers every sample it was handed.
#[derive(Default)]
pub(crate) struct RecordingSink {
    pub(crate) samples: Mutex<Vec<RawSample>>,
    pub(crate) closed: Mutex<bool>,
}

impl SampleSink for RecordingSink {
    fn push_sample(&self, sample: RawSample) {
        self.samples.lock().push(sample);
    }

    fn on_close(&self) {
        *self.closed.lock() = true;
    }
}
