//! Tests for record decoding and framing.

use super::super::error::StreamError;
use super::super::protocol::*;

#[test]
fn test_control_message_bytes() {
    let bytes = ControlMessage::default().to_bytes().unwrap();
    assert_eq!(bytes, br#"{"enableRawOutput":true,"format":"Json"}"#.to_vec());
    assert!(bytes.is_ascii());
}

#[test]
fn test_decode_raw_eeg() {
    let record = decode_record(r#"{"rawEeg": 42}"#).unwrap();
    assert_eq!(record, Record::RawEeg(42));
    assert_eq!(record.raw_sample(), 42);
    assert_eq!(record.signal_quality(), None);
}

#[test]
fn test_decode_raw_eeg_wins_over_quality() {
    let record = decode_record(r#"{"rawEeg": -7, "poorSignalLevel": 200}"#).unwrap();
    assert_eq!(record, Record::RawEeg(-7));
}

#[test]
fn test_decode_esense_summary() {
    let record = decode_record(r#"{"eSense":{"poorSignalLevel":80},"a":1,"b":2,"c":3}"#).unwrap();
    assert_eq!(record, Record::ESense { poor_signal_level: 80 });
    assert_eq!(record.raw_sample(), 80);
    assert_eq!(record.signal_quality(), Some(80));
}

#[test]
fn test_decode_short_quality_record() {
    let record = decode_record(r#"{"poorSignalLevel": 5}"#).unwrap();
    assert_eq!(record, Record::PoorSignal { poor_signal_level: 5 });
    assert_eq!(record.raw_sample(), 5);
    assert_eq!(record.signal_quality(), Some(5));
}

#[test]
fn test_three_field_record_uses_top_level_quality() {
    let record =
        decode_record(r#"{"eSense":{"poorSignalLevel":80},"poorSignalLevel":12,"x":0}"#).unwrap();
    assert_eq!(record, Record::PoorSignal { poor_signal_level: 12 });
}

#[test]
fn test_malformed_records_are_protocol_errors() {
    for text in [
        "not-json",
        "",
        "[1, 2, 3]",
        r#"{"blinkStrength": 55}"#,
        r#"{"rawEeg": "loud"}"#,
        r#"{"rawEeg": 1.5}"#,
        r#"{"rawEeg": 99999999999}"#,
        r#"{"a":1,"b":2,"c":3,"d":4}"#,
        r#"{"rawEeg": 4"#,
    ] {
        let err = decode_record(text).unwrap_err();
        assert!(
            matches!(err, StreamError::Protocol { .. }),
            "{text:?} gave {err:?}"
        );
        assert!(err.is_recoverable());
    }
}

#[test]
fn test_framer_handles_split_records() {
    let mut framer = RecordFramer::default();
    assert!(framer.push(br#"{"rawE"#).is_empty());
    assert_eq!(framer.pending_len(), 6);

    let records = framer.push(b"eg\": 42}\r{\"rawEeg\": -3}\r{\"poorSig");
    assert_eq!(records, vec![r#"{"rawEeg": 42}"#, r#"{"rawEeg": -3}"#]);

    let records = framer.push(b"nalLevel\": 5}\r\n");
    assert_eq!(records, vec![r#"{"poorSignalLevel": 5}"#]);
    assert_eq!(framer.pending_len(), 0);
}

#[test]
fn test_framer_byte_at_a_time_matches_whole_chunk() {
    let stream = b"{\"rawEeg\": 1}\r{\"rawEeg\": 2}\n\r{\"poorSignalLevel\": 200}\r";
    let mut whole = RecordFramer::default();
    let expected = whole.push(stream);
    assert_eq!(expected.len(), 3);

    let mut split = RecordFramer::default();
    let mut collected = Vec::new();
    for byte in stream.iter() {
        collected.extend(split.push(std::slice::from_ref(byte)));
    }
    assert_eq!(collected, expected);
}

#[test]
fn test_framer_drops_oversized_record() {
    let mut framer = RecordFramer::new(8);
    let records = framer.push(b"0123456789abcdef\r{\"a\":1}\r");
    assert_eq!(records, vec![r#"{"a":1}"#]);
    assert_eq!(framer.oversized_records(), 1);
}

#[test]
fn test_records_become_readings() {
    use super::super::traits::Reading;

    assert_eq!(Reading::from(Record::RawEeg(42)), Reading::raw(42));
    assert_eq!(
        Reading::from(Record::ESense { poor_signal_level: 80 }),
        Reading::with_quality(80, 80)
    );
    assert_eq!(
        Reading::from(Record::PoorSignal { poor_signal_level: 5 }),
        Reading::with_quality(5, 5)
    );
}

#[test]
fn test_four_fields_switch_to_esense() {
    let err = decode_record(r#"{"eSense":{"poorSignalLevel":7},"a":1,"b":2}"#).unwrap_err();
    assert!(err_is_protocol(&err));
    let record = decode_record(r#"{"eSense":{"poorSignalLevel":7},"a":1,"b":2,"c":3}"#).unwrap();
    assert_eq!(record, Record::ESense { poor_signal_level: 7 });
}

fn err_is_protocol(err: &StreamError) -> bool {
    matches!(err, StreamError::Protocol { .. })
}

#[test]
fn test_default_address_constant() {
    use super::super::sources::TcpConfig;
    assert_eq!(TcpConfig::default().address.to_string(), DEFAULT_ADDRESS);
}
