use crate::book::BookRecord;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Load the corpus from a `.json`/`.jsonl` file or a directory of them.
/// Directory entries are read in sorted path order.
pub fn load_corpus<P: AsRef<Path>>(input: P) -> Result<Vec<BookRecord>> {
    let input_path = input.as_ref();
    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(extension(p), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    } else {
        anyhow::bail!("corpus path {} does not exist", input_path.display());
    }

    let mut books = Vec::new();
    for file in files {
        let before = books.len();
        if extension(&file) == Some("jsonl") {
            read_jsonl(&file, &mut books)?;
        } else {
            read_json(&file, &mut books)?;
        }
        tracing::debug!(file = %file.display(), records = books.len() - before, "read corpus file");
    }
    tracing::info!(num_books = books.len(), "loaded corpus");
    Ok(books)
}

fn extension(p: &Path) -> Option<&str> {
    p.extension().and_then(|s| s.to_str())
}

fn read_jsonl(file: &Path, books: &mut Vec<BookRecord>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let book: BookRecord = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}", file.display(), lineno + 1))?;
        books.push(book);
    }
    Ok(())
}

fn read_json(file: &Path, books: &mut Vec<BookRecord>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value = serde_json::from_reader(reader)
        .with_context(|| format!("parsing {}", file.display()))?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                if v.is_null() { continue; }
                books.push(serde_json::from_value(v).with_context(|| format!("record in {}", file.display()))?);
            }
        }
        serde_json::Value::Object(_) => {
            books.push(serde_json::from_value(json).with_context(|| format!("record in {}", file.display()))?);
        }
        _ => tracing::warn!(file = %file.display(), "ignoring non-record JSON"),
    }
    Ok(())
}
