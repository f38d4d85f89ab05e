use crate::ProductRecord;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Load product records from a `.json` / `.jsonl` file, or from every such file
/// under a directory (visited in path order).
///
/// A `.json` file may hold an array of records, a single record, or an object
/// mapping ids to records. Records with a blank `pid` are skipped.
pub fn load_corpus<P: AsRef<Path>>(input: P) -> Result<Vec<ProductRecord>> {
    let input = input.as_ref();
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(extension(p), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        anyhow::bail!("corpus path {} does not exist", input.display());
    }

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for file in files {
        let loaded = if extension(&file) == Some("jsonl") { load_jsonl(&file)? } else { load_json(&file)? };
        for record in loaded {
            if record.pid.trim().is_empty() {
                skipped += 1;
                continue;
            }
            records.push(record);
        }
    }
    if skipped > 0 {
        tracing::warn!(skipped, "skipped records without a product id");
    }
    tracing::info!(num_products = records.len(), path = %input.display(), "corpus loaded");
    Ok(records)
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|s| s.to_str())
}

fn load_jsonl(file: &Path) -> Result<Vec<ProductRecord>> {
    let reader = BufReader::new(File::open(file).with_context(|| format!("opening {}", file.display()))?);
    let mut out = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let record: ProductRecord = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid product record", file.display(), lineno + 1))?;
        out.push(record);
    }
    Ok(out)
}

fn load_json(file: &Path) -> Result<Vec<ProductRecord>> {
    let reader = BufReader::new(File::open(file).with_context(|| format!("opening {}", file.display()))?);
    let json: serde_json::Value =
        serde_json::from_reader(reader).with_context(|| format!("{}: invalid JSON", file.display()))?;
    let out: Vec<ProductRecord> = match json {
        serde_json::Value::Array(arr) => arr.into_iter().map(serde_json::from_value).collect::<Result<Vec<_>, _>>()?,
        serde_json::Value::Object(map) if map.contains_key("pid") => {
            vec![serde_json::from_value(serde_json::Value::Object(map))?]
        }
        serde_json::Value::Object(map) => {
            map.into_iter().map(|(_, v)| serde_json::from_value(v)).collect::<Result<Vec<_>, _>>()?
        }
        _ => Vec::new(),
    };
    Ok(out)
}
