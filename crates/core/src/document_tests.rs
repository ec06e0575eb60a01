// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn msgpack(value: &serde_json::Value) -> Vec<u8> {
    rmp_serde::to_vec(value).unwrap()
}

#[test]
fn decodes_nested_maps_and_sequences() {
    let raw = msgpack(&json!({
        "Node": {"ID": "node-1", "Datacenter": "dc1", "Drain": false},
        "Ports": [22, 80],
        "Weight": -3,
        "Ratio": 0.5,
        "Missing": null,
    }));

    let doc = Document::from_msgpack(&raw).unwrap();

    assert_eq!(
        doc.get("Node").and_then(|n| n.get("ID")),
        Some(&Document::from("node-1"))
    );
    assert_eq!(
        doc.get("Ports"),
        Some(&Document::Seq(vec![Document::Int(22), Document::Int(80)]))
    );
    assert_eq!(doc.get("Weight"), Some(&Document::Int(-3)));
    assert_eq!(doc.get("Ratio"), Some(&Document::Float(0.5)));
    assert_eq!(doc.get("Missing"), Some(&Document::Null));
}

#[test]
fn invalid_utf8_raw_strings_become_bytes() {
    let mut raw = Vec::new();
    rmp::encode::write_map_len(&mut raw, 1).unwrap();
    rmp::encode::write_str(&mut raw, "Blob").unwrap();
    rmp::encode::write_str_len(&mut raw, 2).unwrap();
    raw.extend_from_slice(&[0xff, 0xfe]);

    let doc = Document::from_msgpack(&raw).unwrap();

    assert_eq!(doc.get("Blob"), Some(&Document::Bytes(vec![0xff, 0xfe])));
}

#[test]
fn integer_map_keys_are_rendered_as_strings() {
    let mut raw = Vec::new();
    rmp::encode::write_map_len(&mut raw, 1).unwrap();
    rmp::encode::write_uint(&mut raw, 7).unwrap();
    rmp::encode::write_str(&mut raw, "seven").unwrap();

    let doc = Document::from_msgpack(&raw).unwrap();

    assert_eq!(doc.get("7"), Some(&Document::from("seven")));
}

#[test]
fn composite_map_keys_are_rejected() {
    let mut raw = Vec::new();
    rmp::encode::write_map_len(&mut raw, 1).unwrap();
    raw.extend(msgpack(&json!({"ID": "job", "Namespace": "default"})));
    rmp::encode::write_bool(&mut raw, true).unwrap();

    assert!(Document::from_msgpack(&raw).is_err());
}

#[test]
fn malformed_payload_is_an_error() {
    assert!(Document::from_msgpack(&[0xc1]).is_err());
    assert!(Document::from_msgpack(&[0x82, 0xa1]).is_err());
}

#[test]
fn serializes_to_json_with_sorted_keys() {
    let doc = Document::map([
        ("b", Document::Bytes(vec![b'h', b'i', 0xff])),
        ("a", Document::Uint(u64::MAX)),
        ("c", Document::Seq(vec![Document::Null, Document::Bool(true)])),
    ]);

    let rendered = serde_json::to_string(&doc).unwrap();

    assert_eq!(
        rendered,
        "{\"a\":18446744073709551615,\"b\":\"hi\u{fffd}\",\"c\":[null,true]}"
    );
}

#[test]
fn timestamps_render_as_rfc3339() {
    let t = DateTime::parse_from_rfc3339("2024-03-01T12:30:00.250Z").unwrap();
    let rendered = serde_json::to_string(&Document::Timestamp(t)).unwrap();
    assert_eq!(rendered, r#""2024-03-01T12:30:00.250Z""#);
}

#[test]
fn str_field_ignores_empty_strings() {
    let doc = Document::map([("ID", Document::from("")), ("Name", Document::from("web"))]);
    assert_eq!(doc.str_field("ID"), None);
    assert_eq!(doc.str_field("Name"), Some("web"));
    assert_eq!(doc.str_field("Other"), None);
}

#[test]
fn large_unsigned_values_stay_unsigned() {
    let raw = msgpack(&json!(u64::MAX));
    assert_eq!(Document::from_msgpack(&raw).unwrap(), Document::Uint(u64::MAX));
    let raw = msgpack(&json!(42u64));
    assert_eq!(Document::from_msgpack(&raw).unwrap(), Document::Int(42));
}
