use std::fs;
use std::path::Path;

/// Tokens that would give the basis engine I/O or process access.
const FORBIDDEN: &[&str] = &[
    "std::process",
    "std::fs",
    "std::net",
    "Command::new",
    "File::open",
    "File::create",
];

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src");

    let mut hits = Vec::new();
    scan_sources(Path::new("src"), &mut hits);
    if !hits.is_empty() {
        panic!("basis engine must stay free of I/O:\n{}", hits.join("\n"));
    }
}

fn scan_sources(dir: &Path, hits: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for path in entries.flatten().map(|entry| entry.path()) {
        if path.is_dir() {
            scan_sources(&path, hits);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            let Ok(text) = fs::read_to_string(&path) else {
                continue;
            };
            let shown = path.display().to_string();
            let shown = &shown;
            hits.extend(text.lines().enumerate().flat_map(|(n, line)| {
                FORBIDDEN
                    .iter()
                    .filter(move |token| line.contains(*token))
                    .map(move |token| format!("  {shown}:{}: {token}", n + 1))
            }));
        }
    }
}
