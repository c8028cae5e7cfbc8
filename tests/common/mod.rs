use std::fs;
use std::path::{Path, PathBuf};

const UPDATE_ENV: &str = "BULKRANK_UPDATE_SNAPSHOTS";

fn snapshot_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("snapshots")
        .join(name)
}

/// Compare a rendered report with `tests/snapshots/<name>`, or rewrite the
/// snapshot when `BULKRANK_UPDATE_SNAPSHOTS` is set.
pub fn assert_snapshot(name: &str, actual: &str) {
    let path = snapshot_path(name);
    if std::env::var_os(UPDATE_ENV).is_some() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create snapshot directory");
        }
        fs::write(&path, actual).expect("write snapshot");
        return;
    }

    let expected =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("snapshot {:?} not found", path));
    let expected_lines: Vec<&str> = expected.lines().collect();
    let actual_lines: Vec<&str> = actual.lines().collect();

    if let Some(idx) = expected_lines
        .iter()
        .zip(&actual_lines)
        .position(|(e, a)| e.trim_end_matches('\r') != a.trim_end_matches('\r'))
    {
        panic!(
            "snapshot {:?} differs at line {}. Set {UPDATE_ENV}=1 to regenerate.\nexpected: {}\nactual:   {}",
            path,
            idx + 1,
            expected_lines[idx],
            actual_lines[idx]
        );
    }
    assert_eq!(
        expected_lines.len(),
        actual_lines.len(),
        "snapshot {:?} has a different number of rows. Set {UPDATE_ENV}=1 to regenerate.",
        path
    );
}
