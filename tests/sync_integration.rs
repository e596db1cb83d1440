//! Background Work Integration Tests
//!
//! Verifies that slow, superseded work never overwrites newer results.

use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use apt_changelog_viewer::app::LOADING_TEXT;
use apt_changelog_viewer::core::{
    ChangelogSource, Config, PackageRecord, TaskDispatcher, TaskSlot,
};
use apt_changelog_viewer::App;
use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::TempDir;

fn write_local(doc_root: &Path, package: &str, text: &str) {
    let dir = doc_root.join(package);
    std::fs::create_dir_all(&dir).unwrap();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    std::fs::write(dir.join("changelog.Debian.gz"), encoder.finish().unwrap()).unwrap();
}

fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn test_slow_changelog_does_not_override_newer_selection() {
    let temp = TempDir::new().unwrap();
    write_local(temp.path(), "slow", "SLOW");
    write_local(temp.path(), "fast", "FAST");

    let mut config = Config::default();
    config.tools.query_program = "true".to_string();
    config.tools.query_args = Vec::new();
    // Metadata tool prints nothing; it just stalls for the slow package
    config.tools.changelog_uri_program = "sh".to_string();
    config.tools.changelog_uri_args = vec![
        "-c".to_string(),
        "if [ \"$1\" = slow ]; then sleep 1; fi".to_string(),
        "sh".to_string(),
        "{package}".to_string(),
    ];
    config.changelog.doc_root = temp.path().to_path_buf();
    config.workers.threads = 2;

    let mut app = App::with_stores(config, None, None);
    app.packages = vec![PackageRecord::new("slow", "1", ""), PackageRecord::new("fast", "1", "")];
    app.update_filtered_packages();

    app.open_selected();
    app.select_next();
    app.open_selected();

    assert!(wait_until(Duration::from_secs(5), || {
        app.tick();
        app.changelog_text != LOADING_TEXT
    }));
    assert_eq!(app.changelog_text, "FAST");

    // Give the slow fetch time to finish, then make sure it was dropped
    thread::sleep(Duration::from_millis(1500));
    app.tick();
    assert_eq!(app.changelog_text, "FAST");
    assert_eq!(app.current_package.as_deref(), Some("fast"));
    assert_eq!(app.changelog_source, Some(ChangelogSource::Local));
}

#[test]
fn test_rescan_keeps_only_latest_result() {
    let dispatcher: TaskDispatcher<&'static str> = TaskDispatcher::new(2, 4);

    dispatcher
        .submit(TaskSlot::Scan, |_| {
            thread::sleep(Duration::from_millis(200));
            "first"
        })
        .unwrap();
    let second = dispatcher.submit(TaskSlot::Scan, |_| "second").unwrap();

    let mut seen = Vec::new();
    wait_until(Duration::from_secs(2), || {
        seen.extend(dispatcher.poll());
        false
    });

    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].id, second);
    assert_eq!(seen[0].result, "second");
}

#[test]
fn test_worker_pool_is_bounded() {
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let dispatcher: TaskDispatcher<()> = TaskDispatcher::new(2, 16);

    for i in 0..6 {
        let slot = if i % 2 == 0 { TaskSlot::Scan } else { TaskSlot::Changelog };
        let running = Arc::clone(&running);
        let peak = Arc::clone(&peak);
        dispatcher
            .submit(slot, move |_| {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(50));
                running.fetch_sub(1, Ordering::SeqCst);
            })
            .unwrap();
    }

    drop(dispatcher);
    assert!(peak.load(Ordering::SeqCst) <= 2);
}
