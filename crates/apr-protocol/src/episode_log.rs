// SPDX-License-Identifier: MIT OR Apache-2.0
//! Line-delimited episode logs: ordered packet streams sharing one
//! `correlation_id`.

use std::io::{BufRead, Write};

use apr_core::Packet;

use crate::error::ProtocolError;
use crate::wire::{decode_packet, encode_packet};

/// Read every packet from a line-delimited episode log, verifying that
/// every line shares the same `correlation_id` and preserving order.
pub fn read_episode_log<R: BufRead>(reader: R) -> Result<Vec<Packet>, ProtocolError> {
    let mut packets = Vec::new();
    let mut expected_correlation_id: Option<String> = None;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let line_no = idx + 1;
        let packet = decode_packet(line_no, &line)?;

        match &expected_correlation_id {
            None => expected_correlation_id = Some(packet.header.correlation_id.clone()),
            Some(expected) if expected != &packet.header.correlation_id => {
                return Err(ProtocolError::CorrelationMismatch {
                    line: line_no,
                    expected: expected.clone(),
                    found: packet.header.correlation_id.clone(),
                });
            }
            Some(_) => {}
        }

        packets.push(packet);
    }

    Ok(packets)
}

/// Write packets to a line-delimited episode log, one JSON object per
/// line, in the given order.
pub fn write_episode_log<W: Write>(mut writer: W, packets: &[Packet]) -> Result<(), ProtocolError> {
    for packet in packets {
        let line = encode_packet(packet)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use apr_core::payload::ObservationPayload;
    use apr_core::{PacketHeader, PacketKind, PacketPayload, SourceLayer};
    use chrono::Utc;
    use serde_json::json;
    use std::io::Cursor;

    fn packet(id: &str, corr: &str) -> Packet {
        Packet::new(
            PacketHeader::new(id, PacketKind::Observation, Utc::now(), SourceLayer::TaskProsecution, corr),
            None,
            PacketPayload::Observation(ObservationPayload {
                observation_type: "market_tick".into(),
                data: json!({"price": 1}),
                source_tool: None,
                reliability: None,
            }),
        )
    }

    #[test]
    fn writes_then_reads_back_in_order() {
        let packets = vec![packet("pkt_1", "corr_test_1"), packet("pkt_2", "corr_test_1")];
        let mut buf = Vec::new();
        write_episode_log(&mut buf, &packets).unwrap();
        let read_back = read_episode_log(Cursor::new(buf)).unwrap();
        assert_eq!(read_back, packets);
    }

    #[test]
    fn rejects_mixed_correlation_ids() {
        let packets = vec![packet("pkt_1", "corr_a"), packet("pkt_2", "corr_b")];
        let mut buf = Vec::new();
        write_episode_log(&mut buf, &packets).unwrap();
        let err = read_episode_log(Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, ProtocolError::CorrelationMismatch { .. }));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let text = "\n\n";
        let packets = read_episode_log(Cursor::new(text.as_bytes())).unwrap();
        assert!(packets.is_empty());
    }
}
