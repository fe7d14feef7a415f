//! Hygiene: enforces coding standards for the library at test time.
//!
//! Scans `src/` (test files excluded) for patterns the client must not ship.
//! Every budget is zero. A library that panics or drops an error takes the
//! host application down with it or hides a failed request.

use std::fs;
use std::path::Path;

struct SourceFile {
    path: String,
    content: String,
}

struct Budget {
    pattern: &'static str,
    max: usize,
    why: &'static str,
}

const BUDGETS: &[Budget] = &[
    Budget { pattern: ".unwrap()", max: 0, why: "panics the host" },
    Budget { pattern: ".expect(", max: 0, why: "panics the host" },
    Budget { pattern: "panic!(", max: 0, why: "panics the host" },
    Budget { pattern: "unreachable!(", max: 0, why: "panics the host" },
    Budget { pattern: "todo!(", max: 0, why: "unfinished stub" },
    Budget { pattern: "unimplemented!(", max: 0, why: "unfinished stub" },
    Budget { pattern: "dbg!(", max: 0, why: "debug output bypasses tracing" },
    Budget { pattern: "let _ =", max: 0, why: "discards a result without inspecting it" },
    Budget { pattern: ".ok()", max: 0, why: "discards an error without inspecting it" },
    Budget { pattern: "#[allow(dead_code)]", max: 0, why: "hides unused code" },
];

fn source_files() -> Vec<SourceFile> {
    let mut files = Vec::new();
    collect_rs_files(Path::new("src"), &mut files);
    files
}

fn collect_rs_files(dir: &Path, out: &mut Vec<SourceFile>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_rs_files(&path, out);
        } else if path.extension().is_some_and(|e| e == "rs") {
            let path_str = path.to_string_lossy().to_string();
            if path_str.ends_with("_test.rs") {
                continue;
            }
            if let Ok(content) = fs::read_to_string(&path) {
                out.push(SourceFile { path: path_str, content });
            }
        }
    }
}

fn hits(files: &[SourceFile], pattern: &str) -> Vec<(String, usize)> {
    files
        .iter()
        .filter_map(|file| {
            let count = file.content.lines().filter(|line| line.contains(pattern)).count();
            (count > 0).then(|| (file.path.clone(), count))
        })
        .collect()
}

#[test]
fn source_tree_is_scanned() {
    let files = source_files();
    assert!(files.iter().any(|f| f.path.ends_with("lib.rs")), "run from the crate root; src/lib.rs not found");
}

#[test]
fn every_budget_holds() {
    let files = source_files();
    let mut violations = Vec::new();
    for budget in BUDGETS {
        let found = hits(&files, budget.pattern);
        let count: usize = found.iter().map(|(_, c)| c).sum();
        if count > budget.max {
            let detail = found.iter().map(|(path, c)| format!("    {path}: {c}")).collect::<Vec<_>>().join("\n");
            violations.push(format!(
                "`{}` ({}): found {count}, max {}\n{detail}",
                budget.pattern, budget.why, budget.max
            ));
        }
    }
    assert!(violations.is_empty(), "hygiene budgets exceeded:\n{}", violations.join("\n"));
}
