//! End-to-end tracking of CQL connections from raw captured chunks

use wiretap_protocols::cql::{Cql, Opcode};
use wiretap_protocols::{Role, TrackerConfig, TrackerRegistry, TrafficDirection};

const SEC: u64 = 1_000_000_000;

fn cql_frame(response: bool, stream: i16, opcode: Opcode, body: &[u8]) -> Vec<u8> {
    let mut out = vec![if response { 0x84 } else { 0x04 }, 0x00];
    out.extend_from_slice(&stream.to_be_bytes());
    out.push(opcode as u8);
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(body);
    out
}

fn query(stream: i16, text: &str) -> Vec<u8> {
    let mut body = (text.len() as i32).to_be_bytes().to_vec();
    body.extend_from_slice(text.as_bytes());
    body.extend_from_slice(&[0x00, 0x01, 0x00]);
    cql_frame(false, stream, Opcode::Query, &body)
}

fn void_result(stream: i16) -> Vec<u8> {
    cql_frame(true, stream, Opcode::Result, &[0, 0, 0, 1])
}

fn registry() -> TrackerRegistry<Cql> {
    TrackerRegistry::new(TrackerConfig::default(), Role::Client)
}

#[test]
fn test_byte_at_a_time_capture() {
    let mut reg = registry();
    let req = query(1, "SELECT now() FROM system.local");
    let resp = void_result(1);

    let mut ts = 100;
    for byte in &req {
        reg.add_data(1, TrafficDirection::Egress, std::slice::from_ref(byte), ts);
        ts += 1;
        assert!(reg.poll(ts).records.is_empty());
    }
    for byte in &resp {
        reg.add_data(1, TrafficDirection::Ingress, std::slice::from_ref(byte), ts);
        ts += 1;
    }

    let result = reg.poll(ts);
    assert_eq!(result.error_count, 0);
    assert_eq!(result.records.len(), 1);
    let record = &result.records[0].record;
    assert_eq!(record.req.msg, "SELECT now() FROM system.local");
    // Timestamps come from the first byte of each frame.
    assert_eq!(record.req.timestamp_ns, 100);
    assert_eq!(record.resp.timestamp_ns, 100 + req.len() as u64);
}

#[test]
fn test_coalesced_frames_in_one_chunk() {
    let mut reg = registry();
    let requests: Vec<u8> = [query(1, "a"), query(2, "b"), query(3, "c")].concat();
    let responses: Vec<u8> = [void_result(2), void_result(3), void_result(1)].concat();
    reg.add_data(9, TrafficDirection::Egress, &requests, 10);
    reg.add_data(9, TrafficDirection::Ingress, &responses, 20);

    let result = reg.poll(20);
    assert_eq!(result.error_count, 0);
    let queries: Vec<&str> = result.records.iter().map(|r| r.record.req.msg.as_str()).collect();
    assert_eq!(queries, ["b", "c", "a"]);
    assert!(result.records.iter().all(|r| r.conn_id == 9));
}

#[test]
fn test_capture_starting_mid_frame_resynchronizes() {
    let mut reg = registry();
    let partial = query(7, "lost in capture");
    let mut egress = partial[partial.len() - 6..].to_vec();
    egress.extend_from_slice(&query(1, "kept"));

    reg.add_data(3, TrafficDirection::Egress, &egress, 10);
    reg.add_data(3, TrafficDirection::Ingress, &void_result(1), 20);

    let result = reg.poll(20);
    assert_eq!(result.error_count, 1);
    assert_eq!(result.records.len(), 1);
    assert_eq!(result.records[0].record.req.msg, "kept");

    let stats = reg.stats();
    assert_eq!(stats.totals.parse_errors, 1);
    assert_eq!(stats.totals.bytes_dropped, 6);
}

#[test]
fn test_unanswered_request_expires_before_idle_close() {
    let mut reg = registry();
    reg.add_data(4, TrafficDirection::Egress, &query(1, "never answered"), SEC);

    let result = reg.poll(30 * SEC);
    assert_eq!(result.error_count, 0);
    assert_eq!(reg.get(4).map(|t| t.queued_frames()), Some((1, 0)));

    let result = reg.poll(62 * SEC);
    assert_eq!(result.error_count, 1);
    assert_eq!(reg.len(), 1);

    reg.poll(302 * SEC);
    assert!(reg.is_empty());
    assert_eq!(reg.stats().closed_connections, 1);
}

#[test]
fn test_records_serialize_with_connection_id() {
    let mut reg = registry();
    reg.add_data(11, TrafficDirection::Egress, &query(1, "q"), 5);
    reg.add_data(11, TrafficDirection::Ingress, &void_result(1), 8);

    let result = reg.poll(8);
    let json = serde_json::to_value(&result.records[0]).unwrap();
    assert_eq!(json["conn_id"], 11);
    assert_eq!(json["req"]["op"], "Query");
    assert_eq!(json["req"]["msg"], "q");
    assert_eq!(json["resp"]["msg"], "Response type = VOID");
}
