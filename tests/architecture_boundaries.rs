use std::fs;
use std::path::{Path, PathBuf};

fn rs_files(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().and_then(|s| s.to_str()) == Some("rs") {
                out.push(path);
            }
        }
    }
    out.sort();
    out
}

fn rel(path: &Path) -> String {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

#[test]
fn only_the_collector_talks_to_sysinfo() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
    let mut violations = Vec::new();

    for file in rs_files(&root) {
        let content = fs::read_to_string(&file).unwrap_or_default();
        let rel_path = rel(&file);
        if content.contains("sysinfo::") && rel_path != "src/system/collector.rs" {
            violations.push(format!("{rel_path} uses `sysinfo` outside the collector"));
        }
    }

    assert!(
        violations.is_empty(),
        "OS access boundary violations:\n{}",
        violations.join("\n")
    );
}

#[test]
fn sampler_core_is_synchronous() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("src/system");
    let mut violations = Vec::new();

    for file in rs_files(&root) {
        let content = fs::read_to_string(&file).unwrap_or_default();
        for forbidden in ["tokio", "async fn", "std::thread::spawn"] {
            if content.contains(forbidden) {
                violations.push(format!(
                    "{} uses forbidden construct `{}`",
                    rel(&file),
                    forbidden
                ));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Sampler must stay single-threaded and synchronous:\n{}",
        violations.join("\n")
    );
}

#[test]
fn library_code_does_not_print() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
    let mut violations = Vec::new();

    for file in rs_files(&root) {
        let rel_path = rel(&file);
        if rel_path == "src/main.rs" {
            continue;
        }
        let content = fs::read_to_string(&file).unwrap_or_default();
        for forbidden in ["println!", "eprintln!"] {
            if content.contains(forbidden) {
                violations.push(format!("{rel_path} calls `{forbidden}`"));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Library output must go through tracing:\n{}",
        violations.join("\n")
    );
}
