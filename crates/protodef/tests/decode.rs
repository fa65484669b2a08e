//! Packet decoding through loaded schemas.

use protodef::{
    BufferError, DecodeError, DecodedPacket, DecoderOptions, PacketValue, TypeId, TypeRegistry,
};
use serde_json::{json, Value};

fn registry(types: Value) -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.load(&json!({ "types": types })).unwrap();
    registry
}

fn decode(registry: &TypeRegistry, root: &str, bytes: &[u8]) -> Result<DecodedPacket, DecodeError> {
    registry.decode(&TypeId::parse(root), bytes)
}

fn decode_json(registry: &TypeRegistry, root: &str, bytes: &[u8]) -> Value {
    Value::from(decode(registry, root, bytes).unwrap().value)
}

#[test]
fn fixed_width_numerics() {
    let registry = TypeRegistry::new();
    let cases: Vec<(&str, Vec<u8>, PacketValue)> = vec![
        ("i32", (-123_456i32).to_be_bytes().to_vec(), PacketValue::Int(-123_456)),
        ("u64", u64::MAX.to_be_bytes().to_vec(), PacketValue::UInt(u64::MAX)),
        ("f32", 3.5f32.to_be_bytes().to_vec(), PacketValue::Float(3.5)),
        ("i8", vec![0x80], PacketValue::Int(-128)),
        ("u16", vec![0x01, 0x00], PacketValue::Int(256)),
        ("li32", 77i32.to_le_bytes().to_vec(), PacketValue::Int(77)),
        ("bool", vec![0x02], PacketValue::Bool(true)),
        ("void", vec![], PacketValue::Null),
    ];
    for (name, bytes, expected) in cases {
        let packet = decode(&registry, name, &bytes).unwrap();
        assert_eq!(packet.value, expected, "{name}");
        assert_eq!(packet.consumed, bytes.len(), "{name}");
    }
}

#[test]
fn varints_follow_leb128() {
    let registry = TypeRegistry::new();
    let cases: [(&[u8], i64); 6] = [
        (&[0x00], 0),
        (&[0x7f], 127),
        (&[0x80, 0x01], 128),
        (&[0x80, 0x80, 0x01], 16384),
        (&[0xff, 0xff, 0xff, 0xff, 0x0f], -1),
        (&[0x80, 0x80, 0x80, 0x80, 0x08], i32::MIN as i64),
    ];
    for (bytes, expected) in cases {
        assert_eq!(decode(&registry, "varint", bytes).unwrap().value, PacketValue::Int(expected));
    }
    let long_min = [0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
    assert_eq!(decode(&registry, "varlong", &long_min).unwrap().value, PacketValue::Int(i64::MIN));
    assert_eq!(
        decode(&registry, "varint", &[0xff; 6]).unwrap_err(),
        DecodeError::Buffer(BufferError::VarIntTooLong)
    );
}

#[test]
fn container_fields_in_order() {
    let registry = registry(json!({
        "packet": ["container", [
            { "name": "a", "type": "u8" },
            { "name": "b", "type": "u16" },
            { "name": "c", "type": "bool" }
        ]],
        "outer": ["container", [{ "name": "inner", "type": "packet" }]]
    }));

    let packet = decode(&registry, "packet", &[0x05, 0x00, 0x0a, 0x01]).unwrap();
    assert_eq!(Value::from(packet.value), json!({ "a": 5, "b": 10, "c": true }));
    let paths: Vec<&str> = packet.record.entries().map(|(path, _)| path).collect();
    assert_eq!(paths, ["a", "b", "c"]);
    assert_eq!(packet.record.try_get_entry_type("", "b"), Some(&TypeId::native("u16")));

    let packet = decode(&registry, "outer", &[0x05, 0x00, 0x0a, 0x01]).unwrap();
    assert_eq!(packet.record.try_get_entry_value("inner", "b"), Some(&PacketValue::Int(10)));
    assert_eq!(packet.record.try_get_entry_value("", "inner/c"), Some(&PacketValue::Bool(true)));
}

#[test]
fn array_count_from_earlier_field() {
    let registry = registry(json!({
        "packet": ["container", [
            { "name": "count", "type": "varint" },
            { "name": "items", "type": ["array", { "count": "count", "type": "u8" }] }
        ]],
        "nested": ["container", [
            { "name": "n", "type": "u8" },
            { "name": "body", "type": ["container", [
                { "name": "xs", "type": ["array", { "count": "../n", "type": "u8" }] }
            ]] }
        ]],
        "fixed": ["array", { "count": 2, "type": "u8" }]
    }));

    let packet = decode(&registry, "packet", &[0x03, 0x11, 0x22, 0x33]).unwrap();
    assert_eq!(Value::from(packet.value), json!({ "count": 3, "items": [17, 34, 51] }));

    assert_eq!(
        decode_json(&registry, "nested", &[0x02, 0x07, 0x08]),
        json!({ "n": 2, "body": { "xs": [7, 8] } })
    );
    assert_eq!(decode_json(&registry, "fixed", &[0x01, 0x02, 0x03]), json!([1, 2]));
}

#[test]
fn element_references_reach_the_enclosing_container() {
    let registry = registry(json!({
        "packet": ["container", [
            { "name": "width", "type": "u8" },
            { "name": "rows", "type": ["array", { "countType": "u8", "type": ["container", [
                { "name": "kind", "type": "u8" },
                { "name": "cells", "type": ["array", { "count": "../width", "type": "u8" }] },
                { "name": "extra", "type": ["switch", { "compareTo": "kind", "fields": { "1": "u8" }, "default": "void" }] }
            ]] }] }
        ]]
    }));
    let bytes = [0x02, 0x02, 0x01, 0x0a, 0x0b, 0x63, 0x00, 0x0c, 0x0d];
    assert_eq!(
        decode_json(&registry, "packet", &bytes),
        json!({
            "width": 2,
            "rows": [
                { "kind": 1, "cells": [10, 11], "extra": 99 },
                { "kind": 0, "cells": [12, 13], "extra": null }
            ]
        })
    );
}

#[test]
fn switch_falls_back_to_default() {
    let types = json!({
        "withDefault": ["container", [
            { "name": "kind", "type": "varint" },
            { "name": "data", "type": ["switch", {
                "compareTo": "kind",
                "fields": { "0": "u8", "1": "bool" },
                "default": "i16"
            }] }
        ]],
        "withoutDefault": ["container", [
            { "name": "kind", "type": "varint" },
            { "name": "data", "type": ["switch", {
                "compareTo": "kind",
                "fields": { "0": "u8", "1": "bool" }
            }] }
        ]]
    });
    let registry = registry(types);

    assert_eq!(decode_json(&registry, "withDefault", &[0x01, 0x01]), json!({ "kind": 1, "data": true }));
    assert_eq!(
        decode_json(&registry, "withDefault", &[0x07, 0xff, 0xfe]),
        json!({ "kind": 7, "data": -2 })
    );
    assert_eq!(
        decode(&registry, "withoutDefault", &[0x07, 0x00]).unwrap_err(),
        DecodeError::UnmatchedSwitchCase {
            compare_to: "kind".into(),
            key: "7".into()
        }
    );
}

#[test]
fn switch_on_mapped_name_and_constants() {
    let registry = registry(json!({
        "packet_ping": ["container", [{ "name": "id", "type": "i32" }]],
        "packet": ["container", [
            { "name": "name", "type": ["mapper", { "type": "varint", "mappings": { "0x00": "ping", "0x01": "pong" } }] },
            { "name": "params", "type": ["switch", { "compareTo": "name", "fields": { "ping": "packet_ping", "pong": "void" } }] }
        ]],
        "constant": ["switch", { "compareToValue": 1, "fields": { "1": "u8" } }],
        "flagged": ["container", [
            { "name": "on", "type": "bool" },
            { "name": "value", "type": ["switch", { "compareTo": "on", "fields": { "true": "u8", "false": "void" } }] }
        ]],
        "missing": ["switch", { "compareTo": "nope", "fields": {} }]
    }));

    assert_eq!(
        decode_json(&registry, "packet", &[0x00, 0x00, 0x00, 0x00, 0x2a]),
        json!({ "name": "ping", "params": { "id": 42 } })
    );
    assert_eq!(decode_json(&registry, "packet", &[0x01]), json!({ "name": "pong", "params": null }));
    assert_eq!(decode_json(&registry, "constant", &[0x09]), json!(9));
    assert_eq!(decode_json(&registry, "flagged", &[0x01, 0x05]), json!({ "on": true, "value": 5 }));
    assert_eq!(decode_json(&registry, "flagged", &[0x00]), json!({ "on": false, "value": null }));
    assert_eq!(
        decode(&registry, "missing", &[]).unwrap_err(),
        DecodeError::MissingRecordEntry { path: "nope".into() }
    );
}

#[test]
fn pstring_refinement_keeps_encoding() {
    let registry = registry(json!({
        "string": ["pstring", { "countType": "varint" }],
        "shortString": ["string", { "countType": "u16" }],
        "latin": ["pstring", { "countType": "varint", "encoding": "latin1" }],
        "shortLatin": ["latin", { "countType": "u16" }]
    }));

    assert_eq!(decode_json(&registry, "string", &[0x03, 0xc3, 0xa9, b'!']), json!("é!"));
    assert_eq!(decode_json(&registry, "shortString", &[0x00, 0x02, 0xc3, 0xa9]), json!("é"));
    assert_eq!(decode_json(&registry, "shortLatin", &[0x00, 0x02, b'c', 0xe9]), json!("cé"));
    assert_eq!(
        decode(&registry, "shortString", &[0x00, 0x01, 0xff]).unwrap_err(),
        DecodeError::Buffer(BufferError::InvalidUtf8)
    );
}

#[test]
fn mapper_translates_or_fails() {
    let registry = registry(json!({
        "strict": ["mapper", { "type": "varint", "mappings": { "0x00": "a", "1": "b" } }],
        "lenient": ["strict", { "passthrough": true }]
    }));
    assert_eq!(decode_json(&registry, "strict", &[0x00]), json!("a"));
    assert_eq!(decode_json(&registry, "strict", &[0x01]), json!("b"));
    assert_eq!(
        decode(&registry, "strict", &[0x05]).unwrap_err(),
        DecodeError::UnmappedValue("5".into())
    );
    assert_eq!(decode_json(&registry, "lenient", &[0x01]), json!("b"));
    assert_eq!(decode_json(&registry, "lenient", &[0x05]), json!(5));
}

#[test]
fn bitfield_sign_extension() {
    let registry = registry(json!({
        "position": ["bitfield", [
            { "name": "x", "size": 26, "signed": true },
            { "name": "z", "size": 26, "signed": true },
            { "name": "y", "size": 12, "signed": true }
        ]],
        "nibbles": ["bitfield", [
            { "name": "hi", "size": 4, "signed": false },
            { "name": "lo", "size": 4, "signed": true }
        ]],
        "block": ["container", [{ "name": "pos", "type": "position" }]]
    }));

    let raw: u64 = (((-1i64 as u64) & 0x3ff_ffff) << 38) | (2u64 << 12) | 0xffd;
    let packet = decode(&registry, "block", &raw.to_be_bytes()).unwrap();
    assert_eq!(Value::from(packet.value), json!({ "pos": { "x": -1, "z": 2, "y": -3 } }));
    assert_eq!(packet.record.try_get_entry_value("pos", "z"), Some(&PacketValue::Int(2)));
    assert_eq!(packet.consumed, 8);

    assert_eq!(decode_json(&registry, "nibbles", &[0xf8]), json!({ "hi": 15, "lo": -8 }));
}

#[test]
fn option_presence_byte() {
    let registry = registry(json!({
        "packet": ["container", [{ "name": "a", "type": ["option", "varint"] }]]
    }));
    assert_eq!(decode_json(&registry, "packet", &[0x00]), json!({ "a": null }));
    assert_eq!(decode_json(&registry, "packet", &[0x01, 0x05]), json!({ "a": 5 }));
}

#[test]
fn buffers_uuids_and_rest() {
    let registry = registry(json!({
        "counted": ["buffer", { "countType": "varint" }],
        "fixed": ["buffer", { "count": 2 }],
        "tail": ["buffer", { "rest": true }],
        "packet": ["container", [
            { "name": "id", "type": "UUID" },
            { "name": "data", "type": "restBuffer" }
        ]]
    }));
    assert_eq!(
        decode(&registry, "counted", &[0x02, 0xaa, 0xbb]).unwrap().value,
        PacketValue::Bytes(vec![0xaa, 0xbb])
    );
    assert_eq!(decode(&registry, "fixed", &[1, 2, 3]).unwrap().consumed, 2);
    assert_eq!(decode(&registry, "tail", &[1, 2, 3]).unwrap().value, PacketValue::Bytes(vec![1, 2, 3]));

    let mut bytes = vec![0u8; 15];
    bytes.push(0x01);
    bytes.extend_from_slice(&[0x01, 0x02, 0x03]);
    assert_eq!(
        decode_json(&registry, "packet", &bytes),
        json!({
            "id": "00000000-0000-0000-0000-000000000001",
            "data": "data:application/octet-stream;base64,AQID"
        })
    );
    assert_eq!(
        decode(&registry, "counted", &[0x05, 0x01]).unwrap_err(),
        DecodeError::Buffer(BufferError::EndOfBuffer)
    );
}

fn hp_compound(named: bool) -> Vec<u8> {
    let mut bytes = vec![0x0a];
    if named {
        bytes.extend_from_slice(&[0x00, 0x00]);
    }
    bytes.extend_from_slice(&[0x03, 0x00, 0x02, b'h', b'p']);
    bytes.extend_from_slice(&20i32.to_be_bytes());
    bytes.push(0x00);
    bytes
}

#[test]
fn nbt_forms() {
    let registry = TypeRegistry::new();
    assert_eq!(
        decode_json(&registry, "nbt", &hp_compound(true)),
        json!({ "name": "", "value": { "hp": 20 } })
    );
    assert_eq!(decode_json(&registry, "anonymousNbt", &hp_compound(false)), json!({ "hp": 20 }));
    assert_eq!(decode(&registry, "optionalNbt", &[0x00]).unwrap().value, PacketValue::Null);
    assert_eq!(decode(&registry, "anonOptionalNbt", &[0x00]).unwrap().value, PacketValue::Null);
    assert_eq!(decode_json(&registry, "anonOptionalNbt", &hp_compound(false)), json!({ "hp": 20 }));
    assert_eq!(
        decode(&registry, "anonymousNbt", &[0x0e]).unwrap_err(),
        DecodeError::InvalidNbtTag(0x0e)
    );
}

#[test]
fn nbt_depth_limit() {
    let mut registry = TypeRegistry::with_options(DecoderOptions {
        max_nbt_depth: 1,
        ..DecoderOptions::default()
    });
    registry.load(&json!({})).unwrap();
    // compound { a: compound { b: compound {} } }
    let bytes = [0x0a, 0x0a, 0x00, 0x01, b'a', 0x0a, 0x00, 0x01, b'b', 0x00, 0x00, 0x00];
    assert_eq!(decode(&registry, "anonymousNbt", &bytes).unwrap_err(), DecodeError::NbtTooDeep(1));
}

#[test]
fn top_bit_set_terminated_array() {
    let registry = registry(json!({
        "equipment": ["topBitSetTerminatedArray", { "type": ["container", [
            { "name": "slot", "type": "i8" },
            { "name": "item", "type": "u8" }
        ]] }]
    }));
    let packet = decode(&registry, "equipment", &[0x80, 0x0a, 0x05, 0x0b, 0xff]).unwrap();
    assert_eq!(
        Value::from(packet.value),
        json!([{ "slot": 0, "item": 10 }, { "slot": 5, "item": 11 }])
    );
    assert_eq!(packet.consumed, 4);
    assert_eq!(packet.record.try_get_entry_value("", "[1]/slot"), Some(&PacketValue::Int(5)));
}

#[test]
fn top_bit_set_terminated_array_of_many_items() {
    let registry = registry(json!({
        "flags": ["topBitSetTerminatedArray", { "type": "u8" }]
    }));
    let n = 200_000;
    let mut bytes = vec![0x81u8; n - 1];
    bytes.push(0x01);
    bytes.push(0xee);
    let packet = decode(&registry, "flags", &bytes).unwrap();
    assert_eq!(packet.consumed, n);
    let PacketValue::Array(items) = packet.value else {
        panic!("expected an array");
    };
    assert_eq!(items.len(), n);
    assert!(items.iter().all(|v| *v == PacketValue::Int(1)));
    assert_eq!(
        decode(&registry, "flags", &[0x81, 0x82]).unwrap_err(),
        DecodeError::Buffer(BufferError::EndOfBuffer)
    );
}

#[test]
fn entity_metadata_loop_stops_at_sentinel() {
    let registry = registry(json!({
        "metadata": ["entityMetadataLoop", { "endVal": 255, "type": ["container", [
            { "name": "key", "type": "u8" },
            { "name": "value", "type": "varint" }
        ]] }]
    }));
    let packet = decode(&registry, "metadata", &[0x00, 0x05, 0x02, 0x07, 0xff]).unwrap();
    assert_eq!(
        Value::from(packet.value),
        json!([{ "key": 0, "value": 5 }, { "key": 2, "value": 7 }])
    );
    assert_eq!(packet.consumed, 5);
    assert_eq!(decode_json(&registry, "metadata", &[0xff]), json!([]));
    assert_eq!(
        decode(&registry, "metadata", &[0x00, 0x05]).unwrap_err(),
        DecodeError::Buffer(BufferError::EndOfBuffer)
    );
}

#[test]
fn array_with_length_offset() {
    let registry = registry(json!({
        "plusOne": ["arrayWithLengthOffset", { "countType": "u8", "lengthOffset": 1, "type": "u8" }]
    }));
    let packet = decode(&registry, "plusOne", &[0x01, 0x0a, 0x0b]).unwrap();
    assert_eq!(Value::from(packet.value), json!([10, 11]));
    assert_eq!(packet.consumed, 3);
}

#[test]
fn self_reference_through_proxy() {
    let registry = registry(json!({
        "node": ["container", [
            { "name": "value", "type": "u8" },
            { "name": "next", "type": ["option", "node"] }
        ]]
    }));
    let packet = decode(&registry, "node", &[0x01, 0x01, 0x02, 0x00]).unwrap();
    assert_eq!(
        Value::from(packet.value),
        json!({ "value": 1, "next": { "value": 2, "next": null } })
    );
    assert_eq!(packet.record.try_get_entry_value("", "next/value"), Some(&PacketValue::Int(2)));
}

fn tree_types() -> Value {
    json!({
        "node": ["container", [
            { "name": "kids", "type": ["array", { "countType": "varint", "type": "node" }] }
        ]]
    })
}

#[test]
fn recursion_depth_is_bounded() {
    let registry = registry(tree_types());
    assert_eq!(
        decode(&registry, "node", &vec![0x01; 2000]).unwrap_err(),
        DecodeError::TooDeep(256)
    );

    let mut shallow = TypeRegistry::with_options(DecoderOptions {
        max_depth: 4,
        ..DecoderOptions::default()
    });
    shallow.load(&json!({ "types": tree_types() })).unwrap();
    assert_eq!(
        decode_json(&shallow, "node", &[0x01, 0x01, 0x01, 0x01, 0x00]),
        json!({ "kids": [{ "kids": [{ "kids": [{ "kids": [{ "kids": [] }] }] }] }] })
    );
    assert_eq!(
        decode(&shallow, "node", &[0x01, 0x01, 0x01, 0x01, 0x01, 0x00]).unwrap_err(),
        DecodeError::TooDeep(4)
    );
    // Siblings do not add up: depth is released after each item.
    assert_eq!(
        decode(&shallow, "node", &[0x03, 0x01, 0x01, 0x00, 0x00, 0x01, 0x01, 0x00]).unwrap().consumed,
        8
    );
}

#[test]
fn anonymous_fields_share_the_container_namespace() {
    let registry = registry(json!({
        "packet": ["container", [
            { "name": "kind", "type": "u8" },
            { "anon": true, "type": ["switch", {
                "compareTo": "kind",
                "fields": { "1": ["container", [{ "name": "x", "type": "u8" }]] },
                "default": "void"
            }] },
            { "type": "u8" }
        ]]
    }));

    let packet = decode(&registry, "packet", &[0x01, 0x09, 0x04]).unwrap();
    assert_eq!(Value::from(packet.value), json!({ "kind": 1, "x": 9, "anon2": 4 }));
    assert_eq!(packet.record.try_get_entry_value("", "x"), Some(&PacketValue::Int(9)));

    assert_eq!(decode_json(&registry, "packet", &[0x02, 0x04]), json!({ "kind": 2, "anon2": 4 }));
}

#[test]
fn length_limits() {
    let mut registry = TypeRegistry::with_options(DecoderOptions {
        max_array_length: 2,
        ..DecoderOptions::default()
    });
    registry
        .load(&json!({ "types": {
            "list": ["array", { "countType": "varint", "type": "u8" }],
            "signed": ["array", { "countType": "i8", "type": "u8" }],
            "text": ["pstring", { "countType": "i8" }]
        } }))
        .unwrap();
    assert_eq!(
        decode(&registry, "list", &[0x03, 1, 2, 3]).unwrap_err(),
        DecodeError::LengthTooLarge { length: 3, limit: 2 }
    );
    assert_eq!(decode(&registry, "signed", &[0xff]).unwrap_err(), DecodeError::NegativeLength(-1));
    assert_eq!(decode(&registry, "text", &[0xfe]).unwrap_err(), DecodeError::NegativeLength(-2));
}

#[test]
fn trailing_bytes_are_not_an_error() {
    let registry = TypeRegistry::new();
    let packet = decode(&registry, "u8", &[0x01, 0x02, 0x03]).unwrap();
    assert_eq!(packet.value, PacketValue::Int(1));
    assert_eq!(packet.consumed, 1);
}

#[test]
fn truncated_input_fails() {
    let registry = registry(json!({
        "packet": ["container", [{ "name": "a", "type": "u8" }, { "name": "b", "type": "i32" }]]
    }));
    assert_eq!(
        decode(&registry, "packet", &[0x01, 0x00]).unwrap_err(),
        DecodeError::Buffer(BufferError::EndOfBuffer)
    );
}

#[test]
fn unknown_root_type() {
    let registry = TypeRegistry::new();
    assert!(matches!(decode(&registry, "play:missing", &[]), Err(DecodeError::Lookup(_))));
    assert!(matches!(decode(&registry, "container", &[]), Err(DecodeError::Lookup(_))));
}

#[test]
fn record_carries_protocol_version() {
    let registry = TypeRegistry::new();
    let mut reader = protodef::Reader::new(&[0x2a]);
    let packet = registry
        .decode_with_record(&TypeId::native("u8"), protodef::PacketRecord::with_protocol_version(767), &mut reader)
        .unwrap();
    assert_eq!(packet.record.protocol_version(), Some(767));
    assert!(packet.record.is_empty());
    assert_eq!(packet.record.to_json(), json!({}));
}
