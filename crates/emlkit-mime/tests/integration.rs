//! End-to-end tests: raw text through parser, reader and builder.

#![allow(clippy::unwrap_used)]

use emlkit_mime::{
    Attachment, AttachmentData, Body, Config, Error, FriendlyMessage, MessageBuilder, MimeEngine,
};

const SAMPLE: &str = concat!(
    "Date: Wed, 29 Jan 2020 22:07:54 +0100\r\n",
    "From: =?iso-8859-2?Q?Pawe=B3?= <pawel@example.com>\r\n",
    "To: \"Anna\" <anna@example.com>\r\n",
    "Subject: =?UTF-8?B?WmHFvMOzxYLEhw==?=\r\n",
    " =?UTF-8?B?IGfEmcWbbMSFIGphxbrFhA==?=\r\n",
    "Message-ID: <abc@example.com>\r\n",
    "References: <prev@example.com>\r\n",
    "MIME-Version: 1.0\r\n",
    "Content-Type: multipart/mixed;\r\n",
    "\tboundary=\"----=_NextPart_000_0001\"\r\n",
    "\r\n",
    "This is a multi-part message in MIME format.\r\n",
    "\r\n",
    "------=_NextPart_000_0001\r\n",
    "Content-Type: multipart/alternative; boundary=\"alt\"\r\n",
    "\r\n",
    "--alt\r\n",
    "Content-Type: text/plain; charset=\"iso-8859-2\"\r\n",
    "Content-Transfer-Encoding: quoted-printable\r\n",
    "\r\n",
    "Dzie=F1 dobry,\r\n",
    "to jest d=B3uga linia, kt=F3ra zosta=B3a zawini=EAta mi=EAkkim =\r\n",
    "=B3amaniem.\r\n",
    "\r\n",
    "--alt\r\n",
    "Content-Type: text/html; charset=utf-8\r\n",
    "Content-Transfer-Encoding: base64\r\n",
    "\r\n",
    "PHA+RHppZcWEIGRvYnJ5PC9wPg==\r\n",
    "\r\n",
    "--alt--\r\n",
    "\r\n",
    "------=_NextPart_000_0001\r\n",
    "Content-Type: image/png; name=\"logo.png\"\r\n",
    "Content-Transfer-Encoding: base64\r\n",
    "Content-Disposition: inline; filename=\"logo.png\"\r\n",
    "Content-ID: <logo@example.com>\r\n",
    "\r\n",
    "iVBORw0KGgo=\r\n",
    "\r\n",
    "------=_NextPart_000_0001\r\n",
    "Content-Type: application/pdf\r\n",
    "Content-Transfer-Encoding: base64\r\n",
    "Content-Disposition: attachment;\r\n",
    " filename*0*=utf-8''Raport%20Q1;\r\n",
    " filename*1*=%2Epdf\r\n",
    "\r\n",
    "JVBERi0xLjQK\r\n",
    "\r\n",
    "------=_NextPart_000_0001\r\n",
    "Content-Type: text/csv; name=\"=?UTF-8?Q?dane_=C5=82=C3=B3d=C5=BA?=\r\n",
    " =?UTF-8?Q?.csv?=\"\r\n",
    "\r\n",
    "a;b\r\n",
    "1;2\r\n",
    "\r\n",
    "------=_NextPart_000_0001--\r\n",
    "\r\n",
);

fn read(raw: &str) -> FriendlyMessage {
    MimeEngine::default().read_str(raw).unwrap()
}

#[test]
fn test_read_sample_message() {
    let message = read(SAMPLE);

    assert!(!message.has_sentinel_date());
    assert_eq!(message.date.to_rfc3339(), "2020-01-29T21:07:54+00:00");
    assert_eq!(message.from.as_deref(), Some("Pawe\u{142} <pawel@example.com>"));
    assert_eq!(message.to.as_deref(), Some("\"Anna\" <anna@example.com>"));
    assert_eq!(
        message.subject.as_deref(),
        Some("Za\u{17c}\u{f3}\u{142}\u{107} g\u{119}\u{15b}l\u{105} ja\u{17a}\u{144}")
    );
    assert_eq!(message.message_id.as_deref(), Some("<abc@example.com>"));
    assert_eq!(message.references.as_deref(), Some("<prev@example.com>"));

    assert_eq!(
        message.text.as_deref(),
        Some(
            "Dzie\u{144} dobry,\r\nto jest d\u{142}uga linia, kt\u{f3}ra zosta\u{142}a \
             zawini\u{119}ta mi\u{119}kkim \u{142}amaniem."
        )
    );
    assert_eq!(message.html.as_deref(), Some("<p>Dzie\u{144} dobry</p>"));

    assert_eq!(message.attachments.len(), 3);

    let logo = &message.attachments[0];
    assert_eq!(logo.name.as_deref(), Some("logo.png"));
    assert_eq!(logo.id.as_deref(), Some("<logo@example.com>"));
    assert!(logo.inline);
    assert_eq!(
        logo.data,
        AttachmentData::Bytes(vec![0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'])
    );

    let report = &message.attachments[1];
    assert_eq!(report.name.as_deref(), Some("Raport Q1.pdf"));
    assert!(!report.inline);
    assert_eq!(report.data.as_bytes(), b"%PDF-1.4\n");

    let csv = &message.attachments[2];
    assert_eq!(csv.name.as_deref(), Some("dane \u{142}\u{f3}d\u{17a}.csv"));
    assert_eq!(csv.data, AttachmentData::Text("a;b\r\n1;2".to_string()));
}

#[test]
fn test_round_trip_keeps_content() {
    let engine = MimeEngine::default();
    let first = engine.read_str(SAMPLE).unwrap();

    let rebuilt = engine.build(&MessageBuilder::from_message(&first)).unwrap();
    let second = engine.read_str(&rebuilt).unwrap();

    assert_eq!(second.text, first.text);
    assert_eq!(second.html, first.html);
    assert_eq!(second.subject, first.subject);
    assert_eq!(second.from, first.from);
    assert_eq!(second.to, first.to);
    assert_eq!(second.message_id, first.message_id);
    assert_eq!(second.date, first.date);

    let payloads = |message: &FriendlyMessage| -> Vec<(Option<String>, Vec<u8>)> {
        message
            .attachments
            .iter()
            .map(|a| (a.name.clone(), a.data.as_bytes().to_vec()))
            .collect()
    };
    assert_eq!(payloads(&second), payloads(&first));
    assert!(second.attachments[0].inline);
    assert_eq!(second.attachments[0].id.as_deref(), Some("<logo@example.com>"));
}

#[test]
fn test_continuation_count_does_not_change_value() {
    let one = "Subject: =?UTF-8?B?SGVsbG8gV29ybGQ=?=\r\n\r\n";
    let two = "Subject: =?UTF-8?B?SGVsbG8g?=\r\n =?UTF-8?B?V29ybGQ=?=\r\n\r\n";
    let three = "Subject: =?UTF-8?Q?Hel?=\r\n =?UTF-8?Q?lo_?=\r\n\t=?UTF-8?Q?World?=\r\n\r\n";

    for raw in [one, two, three] {
        assert_eq!(read(raw).subject.as_deref(), Some("Hello World"), "{raw:?}");
    }
}

#[test]
fn test_decode_header_examples() {
    let engine = MimeEngine::default();
    assert_eq!(engine.decode_header_value("=?UTF-8?B?VGVzdA==?="), "Test");
    assert_eq!(engine.decode_header_value("=?UTF-8?Q?A=20B?="), "A B");
}

#[test]
fn test_two_parts_in_order() {
    let engine = MimeEngine::default();
    let node = engine
        .parse(concat!(
            "Content-Type: multipart/mixed; boundary=\"X\"\r\n",
            "\r\n",
            "--X\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "one\r\n",
            "--X\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "two\r\n",
            "--X--\r\n",
        ))
        .unwrap();

    let parts = node.parts().unwrap();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0].part.leaf(), Some("one"));
    assert_eq!(parts[1].part.leaf(), Some("two"));
}

#[test]
fn test_multipart_without_boundary_is_leaf() {
    let engine = MimeEngine::default();
    let node = engine
        .parse("Content-Type: multipart/mixed\r\n\r\n--X\r\nx\r\n--X--\r\n")
        .unwrap();
    assert!(matches!(node.body, Some(Body::Leaf(_))));

    let message = engine.read(&node).unwrap();
    assert_eq!(message.attachments.len(), 1);
}

#[test]
fn test_rfc2231_attachment_name() {
    let message = read(concat!(
        "Content-Type: multipart/mixed; boundary=b\r\n",
        "\r\n",
        "--b\r\n",
        "Content-Type: application/octet-stream\r\n",
        "Content-Disposition: attachment; filename*0*=UTF-8''na%20me; filename*1*=.txt\r\n",
        "\r\n",
        "data\r\n",
        "--b--\r\n",
    ));
    assert_eq!(message.attachments[0].name.as_deref(), Some("na me.txt"));
}

#[test]
fn test_build_minimal_message() {
    let engine = MimeEngine::default();
    let raw = engine
        .build(&MessageBuilder::new().to("a@b.com").text_body("hi"))
        .unwrap();

    assert!(raw.contains("To: a@b.com\r\n"));
    assert!(raw.contains("text/plain"));

    let message = engine.read_str(&raw).unwrap();
    assert_eq!(message.to.as_deref(), Some("a@b.com"));
    assert!(message.from.is_none());
    assert_eq!(message.text.as_deref(), Some("hi"));
}

#[test]
fn test_build_without_recipient_fails() {
    let err = MimeEngine::default()
        .build(&MessageBuilder::new().text_body("hi"))
        .unwrap_err();
    assert!(matches!(err, Error::MissingRecipient));
}

#[test]
fn test_quoted_printable_emoji() {
    let engine = MimeEngine::default();
    assert_eq!(
        engine.decode_quoted_printable("Hi =F0=9F=91=8D!", "UTF-8"),
        "Hi \u{1f44d}!"
    );
}

#[test]
fn test_lf_only_input() {
    let message = read("To: a@example.com\nSubject: lf\n\nline 1\nline 2\n");
    assert_eq!(message.subject.as_deref(), Some("lf"));
    assert_eq!(message.text.as_deref(), Some("line 1\r\nline 2\r\n"));
}

#[test]
fn test_strict_boundaries_from_config() {
    let raw = concat!(
        "Content-Type: multipart/mixed; boundary=X\r\n",
        "\r\n",
        "--X\r\n",
        "\r\n",
        "body\r\n",
        "--X\r\n",
        "more\r\n",
        "--X--\r\n",
    );
    let strict = MimeEngine::new(Config::builder().lenient_boundary_detection(false).build());
    let message = strict.read_str(raw).unwrap();
    assert_eq!(message.text.as_deref(), Some("body\r\n--X\r\nmore\r\n--X--"));
}

#[test]
fn test_builder_attachment_round_trip() {
    let engine = MimeEngine::default();
    let raw = engine
        .build(
            &MessageBuilder::new()
                .to("a@b.com")
                .subject("\u{142}\u{f3}d\u{17a}")
                .html_body("<p>x</p>\r\n")
                .attach(Attachment::new(
                    "\u{17c}\u{f3}\u{142}w.bin",
                    "application/octet-stream",
                    vec![0u8, 255, 10, 13],
                ))
                .attach(Attachment {
                    content_type: Some("image/jpeg".into()),
                    data: AttachmentData::Bytes(vec![0xFF, 0xD8]),
                    ..Attachment::default()
                }),
        )
        .unwrap();

    let message = engine.read_str(&raw).unwrap();
    assert_eq!(message.subject.as_deref(), Some("\u{142}\u{f3}d\u{17a}"));
    assert!(message.text.is_none());
    assert_eq!(message.html.as_deref(), Some("<p>x</p>\r\n"));
    assert_eq!(message.attachments[0].name.as_deref(), Some("\u{17c}\u{f3}\u{142}w.bin"));
    assert_eq!(message.attachments[0].data.as_bytes(), &[0, 255, 10, 13]);
    assert_eq!(message.attachments[1].name.as_deref(), Some("attachment_2.jpg"));
}
