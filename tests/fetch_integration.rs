//! Changelog Fetch Integration Tests
//!
//! Exercises the three retrieval tiers against a local HTTP responder and a
//! stub metadata tool.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::Path;
use std::thread;

use apt_changelog_viewer::core::{ChangelogSource, Config, NO_CHANGELOG};
use apt_changelog_viewer::ChangelogFetcher;
use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::TempDir;

/// Serve a single HTTP response on an ephemeral port and return its URL.
fn serve_once(status: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            while reader.read_line(&mut line).is_ok() {
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                line.clear();
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });

    format!("http://{addr}/changelog")
}

/// Config whose metadata tool prints `uri_output` and whose doc root is `doc_root`.
fn config_with(uri_output: &str, doc_root: &Path) -> Config {
    let mut config = Config::default();
    config.tools.changelog_uri_program = "sh".to_string();
    config.tools.changelog_uri_args =
        vec!["-c".to_string(), format!("printf '%s\\n' \"{uri_output}\"")];
    config.tools.timeout_secs = 5;
    config.changelog.fetch_timeout_secs = 5;
    config.changelog.doc_root = doc_root.to_path_buf();
    config
}

fn write_local(doc_root: &Path, package: &str, text: &str) {
    let dir = doc_root.join(package);
    std::fs::create_dir_all(&dir).unwrap();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    std::fs::write(dir.join("changelog.Debian.gz"), encoder.finish().unwrap()).unwrap();
}

#[test]
fn test_remote_changelog_wins() {
    let temp = TempDir::new().unwrap();
    write_local(temp.path(), "foo", "Y");
    let url = serve_once("200 OK", "X");

    let fetcher = ChangelogFetcher::new(&config_with(&format!("'{url}' foo_1.0_changelog"), temp.path()));
    let changelog = fetcher.fetch_changelog_with_source("foo");

    assert_eq!(changelog.text, "X");
    assert_eq!(changelog.source, ChangelogSource::Remote);
}

#[test]
fn test_http_error_falls_back_to_local() {
    let temp = TempDir::new().unwrap();
    write_local(temp.path(), "foo", "Y");
    let url = serve_once("404 Not Found", "gone");

    let fetcher = ChangelogFetcher::new(&config_with(&format!("'{url}' foo"), temp.path()));
    let changelog = fetcher.fetch_changelog_with_source("foo");

    assert_eq!(changelog.text, "Y");
    assert_eq!(changelog.source, ChangelogSource::Local);
}

#[test]
fn test_unreachable_host_falls_back_to_local() {
    let temp = TempDir::new().unwrap();
    write_local(temp.path(), "foo", "Y");

    // Bind and drop to get a port nothing listens on
    let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    let fetcher = ChangelogFetcher::new(&config_with(
        &format!("'http://127.0.0.1:{port}/x' foo"),
        temp.path(),
    ));

    assert_eq!(fetcher.fetch_changelog("foo"), "Y");
}

#[test]
fn test_no_uri_and_no_local_gives_placeholder() {
    let temp = TempDir::new().unwrap();
    let fetcher = ChangelogFetcher::new(&config_with("", temp.path()));

    let changelog = fetcher.fetch_changelog_with_source("foo");
    assert_eq!(changelog.text, NO_CHANGELOG);
    assert_eq!(changelog.source, ChangelogSource::Unavailable);
}

#[test]
fn test_package_placeholder_reaches_metadata_tool() {
    let temp = TempDir::new().unwrap();
    let url = serve_once("200 OK", "remote body");

    let mut config = config_with("", temp.path());
    // Only print the URI when the tool was called with the right package
    config.tools.changelog_uri_args = vec![
        "-c".to_string(),
        format!("[ \"$1\" = zlib1g ] && echo \"'{url}' zlib1g\""),
        "sh".to_string(),
        "{package}".to_string(),
    ];

    let fetcher = ChangelogFetcher::new(&config);
    assert_eq!(fetcher.fetch_changelog("zlib1g"), "remote body");
}
