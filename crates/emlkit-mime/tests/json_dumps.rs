//! JSON dumps of parse trees and read messages.

#![cfg(feature = "serde")]
#![allow(clippy::unwrap_used)]

use emlkit_mime::{
    Attachment, FriendlyMessage, HeaderMap, HeaderValue, MimeEngine, ParseNode,
};

const RAW: &str = concat!(
    "From: a@example.com\r\n",
    "To: b@example.com\r\n",
    "Received: from one\r\n",
    "Received: from two\r\n",
    "Subject: JSON\r\n",
    "Date: Mon, 2 Jan 2023 10:00:00 +0000\r\n",
    "Content-Type: multipart/mixed; boundary=\"b\"\r\n",
    "\r\n",
    "--b\r\n",
    "Content-Type: text/plain; charset=utf-8\r\n",
    "\r\n",
    "hello\r\n",
    "--b\r\n",
    "Content-Type: application/octet-stream; name=\"x.bin\"\r\n",
    "Content-Transfer-Encoding: base64\r\n",
    "\r\n",
    "AAEC\r\n",
    "--b--\r\n",
);

#[test]
fn test_header_map_json_shape() {
    let mut headers = HeaderMap::new();
    headers.add("to", "b@example.com");
    headers.add("received", "one");
    headers.add("received", "two");

    let json = serde_json::to_value(&headers).unwrap();
    assert_eq!(
        json,
        serde_json::json!([["To", "b@example.com"], ["Received", ["one", "two"]]])
    );

    let back: HeaderMap = serde_json::from_value(json).unwrap();
    assert_eq!(back, headers);
    assert_eq!(
        back.get_value("Received"),
        Some(&HeaderValue::Multi(vec!["one".into(), "two".into()]))
    );
}

#[test]
fn test_parse_tree_json_round_trip() {
    let engine = MimeEngine::default();
    let node = engine.parse(RAW).unwrap();

    let json = serde_json::to_string(&node).unwrap();
    let back: ParseNode = serde_json::from_str(&json).unwrap();

    assert_eq!(back, node);
    assert_eq!(back.parts().unwrap().len(), 2);
}

#[test]
fn test_message_json_round_trip() {
    let engine = MimeEngine::default();
    let message = engine.read_str(RAW).unwrap();

    let json = serde_json::to_value(&message).unwrap();
    assert_eq!(json["subject"], "JSON");
    assert_eq!(json["text"], "hello");

    let back: FriendlyMessage = serde_json::from_value(json).unwrap();
    assert_eq!(back, message);
    assert_eq!(back.attachments[0].data.as_bytes(), &[0, 1, 2]);
}

#[test]
fn test_message_json_fills_defaults() {
    let message: FriendlyMessage =
        serde_json::from_str(r#"{"to": "b@example.com", "text": "hi"}"#).unwrap();

    assert!(message.has_sentinel_date());
    assert_eq!(message.to.as_deref(), Some("b@example.com"));
    assert!(message.headers.is_empty());
    assert_eq!(message.attachments, Vec::<Attachment>::new());
}
