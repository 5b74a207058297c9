use std::fs;
use std::path::{Path, PathBuf};

const ALLOWED_WRITERS: &[&str] = &["src/artifacts.rs"];

const WRITE_CALLS: &[&str] = &[
    "fs::write(",
    "fs::rename(",
    "fs::create_dir",
    "fs::remove_",
    "File::create(",
    "OpenOptions::new(",
];

fn collect_rust_files(root: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(root) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_rust_files(&path, out);
            continue;
        }
        if path.extension().and_then(|s| s.to_str()) == Some("rs") {
            out.push(path);
        }
    }
}

#[test]
fn filesystem_writes_are_limited_to_artifact_store() {
    let repo_root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let src_root = repo_root.join("src");
    let mut files = Vec::new();
    collect_rust_files(&src_root, &mut files);
    assert!(!files.is_empty(), "no sources under {}", src_root.display());

    let mut offenders = Vec::new();
    for file in files {
        let rel = file
            .strip_prefix(repo_root)
            .unwrap_or(&file)
            .to_string_lossy()
            .replace('\\', "/");
        if ALLOWED_WRITERS.iter().any(|allowed| *allowed == rel) {
            continue;
        }
        let content = fs::read_to_string(&file).unwrap_or_default();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if WRITE_CALLS.iter().any(|call| trimmed.contains(call)) {
                offenders.push(format!("{rel}:{}: {}", idx + 1, trimmed));
            }
        }
    }

    assert!(
        offenders.is_empty(),
        "filesystem writes outside the artifact store:\n{}",
        offenders.join("\n")
    );
}

#[test]
fn inference_does_not_touch_training_code() {
    let repo_root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let content = fs::read_to_string(repo_root.join("src/inference.rs")).unwrap();
    let body = content.split("#[cfg(test)]").next().unwrap_or_default();
    for forbidden in ["fit_logistic", "fit_mlp", "Splitter", "Cleaner", "::fit("] {
        assert!(
            !body.contains(forbidden),
            "inference path references {forbidden}"
        );
    }
}
