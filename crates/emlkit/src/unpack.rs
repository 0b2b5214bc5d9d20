//! Write a read message to a directory.
//!
//! The text body goes to `index.txt`, the HTML body to `index.html` and
//! every attachment to a file of its own.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use emlkit_mime::{Config, FriendlyMessage, MimeEngine};
use serde::Serialize;

/// Options for [`unpack`] and [`unpack_raw`].
#[derive(Debug, Clone, Default)]
pub struct UnpackOptions {
    /// Report file names without writing anything.
    pub simulate: bool,
    /// Prepended to every file name.
    pub prefix: String,
    /// Also save the parse tree as JSON under this name.
    pub parsed_json: Option<PathBuf>,
    /// Also save the read message as JSON under this name.
    pub read_json: Option<PathBuf>,
}

/// Files produced by an unpack, relative to the target directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnpackReport {
    /// File names in the order they were written.
    pub files: Vec<PathBuf>,
}

/// Writes `message` into `dir`.
///
/// Unnamed attachments are called `attachment_<n>` plus the extension
/// configured for their content type. Names already used in this
/// message get a `_<n>` suffix.
///
/// # Errors
///
/// Returns an error if the directory or a file cannot be written.
pub fn unpack(
    message: &FriendlyMessage,
    dir: &Path,
    options: &UnpackOptions,
    config: &Config,
) -> Result<UnpackReport> {
    let mut report = UnpackReport::default();
    unpack_into(message, dir, options, config, &mut report)?;
    Ok(report)
}

/// Parses, reads and unpacks a raw message, saving the requested JSON
/// dumps alongside.
///
/// # Errors
///
/// Returns an error if the message is not text or a file cannot be
/// written.
pub fn unpack_raw(
    engine: &MimeEngine,
    raw: &[u8],
    dir: &Path,
    options: &UnpackOptions,
) -> Result<UnpackReport> {
    let mut report = UnpackReport::default();

    let parsed = engine.parse_bytes(raw).context("Failed to parse message")?;
    if let Some(name) = &options.parsed_json {
        write_json(dir, name, &parsed, options, &mut report)?;
    }

    let message = engine.read(&parsed).context("Failed to read message")?;
    if let Some(name) = &options.read_json {
        write_json(dir, name, &message, options, &mut report)?;
    }

    unpack_into(&message, dir, options, engine.config(), &mut report)?;
    Ok(report)
}

fn unpack_into(
    message: &FriendlyMessage,
    dir: &Path,
    options: &UnpackOptions,
    config: &Config,
    report: &mut UnpackReport,
) -> Result<()> {
    ensure_dir(dir, options)?;
    let mut used = HashSet::new();

    if let Some(text) = &message.text {
        let name = unique_name(&format!("{}index.txt", options.prefix), &mut used);
        write_file(dir, &name, text.as_bytes(), options, report)?;
    }

    if let Some(html) = &message.html {
        let name = unique_name(&format!("{}index.html", options.prefix), &mut used);
        write_file(dir, &name, html.as_bytes(), options, report)?;
    }

    for (index, attachment) in message.attachments.iter().enumerate() {
        let Some(file_name) = message.attachment_file_name(index, config) else {
            continue;
        };
        let name = unique_name(&format!("{}{file_name}", options.prefix), &mut used);
        write_file(dir, &name, attachment.data.as_bytes(), options, report)?;
    }

    Ok(())
}

fn ensure_dir(dir: &Path, options: &UnpackOptions) -> Result<()> {
    if options.simulate {
        return Ok(());
    }
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))
}

fn write_file(
    dir: &Path,
    name: &str,
    data: &[u8],
    options: &UnpackOptions,
    report: &mut UnpackReport,
) -> Result<()> {
    if !options.simulate {
        let path = dir.join(name);
        std::fs::write(&path, data)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::debug!(path = %path.display(), bytes = data.len(), "Wrote file");
    }
    report.files.push(PathBuf::from(name));
    Ok(())
}

fn write_json<T: Serialize>(
    dir: &Path,
    name: &Path,
    value: &T,
    options: &UnpackOptions,
    report: &mut UnpackReport,
) -> Result<()> {
    if !options.simulate {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(value)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    report.files.push(name.to_path_buf());
    Ok(())
}

/// Appends `_<n>` before the extension until `name` is unused.
fn unique_name(name: &str, used: &mut HashSet<String>) -> String {
    if used.insert(name.to_string()) {
        return name.to_string();
    }

    let (stem, ext) = match name.rfind('.') {
        Some(dot) if dot > 0 => name.split_at(dot),
        _ => (name, ""),
    };
    let mut counter = 1;
    loop {
        let candidate = format!("{stem}_{counter}{ext}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        counter += 1;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use emlkit_mime::{Attachment, AttachmentData};

    fn sample() -> FriendlyMessage {
        FriendlyMessage {
            text: Some("plain".into()),
            html: Some("<p>html</p>".into()),
            attachments: vec![
                Attachment::new("a.bin", "application/octet-stream", vec![1u8, 2, 3]),
                Attachment {
                    content_type: Some("image/png".into()),
                    data: AttachmentData::Bytes(vec![0x89]),
                    ..Attachment::default()
                },
                Attachment::new("a.bin", "application/octet-stream", vec![4u8]),
            ],
            ..FriendlyMessage::default()
        }
    }

    #[test]
    fn test_unpack_writes_files() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("out");

        let report = unpack(&sample(), &dir, &UnpackOptions::default(), &Config::default())
            .unwrap();

        let names: Vec<_> = report.files.iter().map(|p| p.to_str().unwrap()).collect();
        assert_eq!(
            names,
            vec!["index.txt", "index.html", "a.bin", "attachment_2.png", "a_1.bin"]
        );
        assert_eq!(std::fs::read_to_string(dir.join("index.txt")).unwrap(), "plain");
        assert_eq!(std::fs::read(dir.join("a.bin")).unwrap(), vec![1, 2, 3]);
        assert_eq!(std::fs::read(dir.join("a_1.bin")).unwrap(), vec![4]);
    }

    #[test]
    fn test_unpack_simulate_with_prefix() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("never");
        let options = UnpackOptions {
            simulate: true,
            prefix: "msg1_".into(),
            ..UnpackOptions::default()
        };

        let report = unpack(&sample(), &dir, &options, &Config::default()).unwrap();

        assert_eq!(report.files[0], PathBuf::from("msg1_index.txt"));
        assert_eq!(report.files[3], PathBuf::from("msg1_attachment_2.png"));
        assert!(!dir.exists());
    }

    #[test]
    fn test_unpack_raw_with_json_dumps() {
        let tmp = tempfile::tempdir().unwrap();
        let raw = concat!(
            "To: a@example.com\r\n",
            "Subject: Hi\r\n",
            "Content-Type: multipart/mixed; boundary=b\r\n",
            "\r\n",
            "--b\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "hello\r\n",
            "--b\r\n",
            "Content-Type: application/octet-stream\r\n",
            "Content-Disposition: attachment; filename=\"x.dat\"\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "AAE=\r\n",
            "--b--\r\n",
        );
        let options = UnpackOptions {
            parsed_json: Some(PathBuf::from("json/parsed.json")),
            read_json: Some(PathBuf::from("read.json")),
            ..UnpackOptions::default()
        };

        let report =
            unpack_raw(&MimeEngine::default(), raw.as_bytes(), tmp.path(), &options).unwrap();

        assert_eq!(report.files.len(), 4);
        assert_eq!(std::fs::read(tmp.path().join("x.dat")).unwrap(), vec![0, 1]);
        let read: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(tmp.path().join("read.json")).unwrap())
                .unwrap();
        assert_eq!(read["subject"], "Hi");
        assert!(tmp.path().join("json/parsed.json").exists());
    }

    #[test]
    fn test_unpack_dot_names_fall_back() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("out");
        let raw = concat!(
            "To: a@example.com\r\n",
            "Content-Type: multipart/mixed; boundary=b\r\n",
            "\r\n",
            "--b\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "hello\r\n",
            "--b\r\n",
            "Content-Type: application/octet-stream\r\n",
            "Content-Disposition: attachment; filename=\"..\"\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "AAE=\r\n",
            "--b\r\n",
            "Content-Type: application/octet-stream\r\n",
            "Content-Disposition: attachment; filename=\"good.bin\"\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "AgM=\r\n",
            "--b--\r\n",
        );

        let report = unpack_raw(
            &MimeEngine::default(),
            raw.as_bytes(),
            &dir,
            &UnpackOptions::default(),
        )
        .unwrap();

        let names: Vec<_> = report.files.iter().map(|p| p.to_str().unwrap()).collect();
        assert_eq!(names, vec!["index.txt", "attachment_1", "good.bin"]);
        assert_eq!(std::fs::read(dir.join("attachment_1")).unwrap(), vec![0, 1]);
        assert_eq!(std::fs::read(dir.join("good.bin")).unwrap(), vec![2, 3]);
    }

    #[test]
    fn test_unique_name() {
        let mut used = HashSet::new();
        assert_eq!(unique_name("a.txt", &mut used), "a.txt");
        assert_eq!(unique_name("a.txt", &mut used), "a_1.txt");
        assert_eq!(unique_name("a.txt", &mut used), "a_2.txt");
        assert_eq!(unique_name(".hidden", &mut used), ".hidden");
        assert_eq!(unique_name(".hidden", &mut used), ".hidden_1");
    }
}
