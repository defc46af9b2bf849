//! Unit tests for body encoding and decoding

use httpr_codec::{decode_content, decode_text, json_view, StreamDecoder};
use httpr_codec::{cbor, form};
use serde_json::json;

#[test]
fn test_form_duplicate_keys_survive_roundtrip() {
    let pairs = vec![
        ("x".to_string(), "1".to_string()),
        ("x".to_string(), "2".to_string()),
        ("y".to_string(), "3".to_string()),
    ];
    let decoded = form::decode(&form::encode(&pairs));
    assert_eq!(decoded, pairs);
}

#[test]
fn test_cbor_identity_on_json_shapes() {
    let values = [
        json!(null),
        json!(true),
        json!(42),
        json!(-7),
        json!(1.5),
        json!("text"),
        json!([1, "two", null, {"k": false}]),
        json!({"nested": {"deep": [1, 2, 3]}}),
    ];
    for value in values {
        let bytes = cbor::encode(&value).unwrap();
        assert_eq!(cbor::decode(&bytes).unwrap(), value, "roundtrip of {value}");
    }
}

#[test]
fn test_identity_content_passes_through() {
    let data = b"plain".to_vec();
    assert_eq!(decode_content(data.clone(), None).unwrap(), data);
    assert_eq!(decode_content(data.clone(), Some("identity")).unwrap(), data);
}

#[test]
fn test_stream_decoder_identity() {
    let mut decoder = StreamDecoder::new(None);
    assert_eq!(&decoder.push(b"chunk").unwrap()[..], b"chunk");
    assert!(decoder.finish().unwrap().is_empty());
}

#[test]
fn test_text_defaults_to_utf8() {
    assert_eq!(decode_text("héllo".as_bytes(), None), "héllo");
}

#[test]
fn test_json_view_reports_decoding_error() {
    let err = json_view(b"{not json", Some("application/json")).unwrap_err();
    assert!(matches!(err, httpr_errors::Error::Decoding(_)));
}
