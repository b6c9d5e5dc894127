// I/O: delimited tables, dictionary-text dumps, directory reshuffling

use crate::gen::tidy::{natural_cmp, Table};
use anyhow::{bail, Context, Result};
use log::{debug, info};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// ============================================================================
// DELIMITED TABLES
// ============================================================================

/// Delimiter implied by a file suffix
pub fn delimiter_for(path: &Path) -> Result<u8> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => Ok(b','),
        "tsv" | "txt" => Ok(b'\t'),
        other => bail!(
            "unsupported table suffix '.{}' for {} (use .csv, .tsv or .txt)",
            other,
            path.display()
        ),
    }
}

pub fn read_table(path: &Path) -> Result<Table> {
    let delim = delimiter_for(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delim)
        .flexible(false)
        .from_path(path)
        .with_context(|| format!("Failed to open table: {}", path.display()))?;

    let columns: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("Bad record {} in {}", i + 2, path.display()))?;
        rows.push(record.iter().map(|c| c.to_string()).collect());
    }
    debug!("read {} rows x {} cols from {}", rows.len(), columns.len(), path.display());
    Table::from_rows(columns, rows).with_context(|| format!("Invalid table {}", path.display()))
}

/// Every `*{suffix}` table in `dir`, keyed by file stem
pub fn read_dir(dir: &Path, suffix: &str) -> Result<BTreeMap<String, Table>> {
    let mut out = BTreeMap::new();
    for name in sorted_file_names(dir, suffix)? {
        let path = dir.join(&name);
        let stem = name.strip_suffix(suffix).unwrap_or(&name).to_string();
        out.insert(stem, read_table(&path)?);
    }
    Ok(out)
}

pub fn write_table(path: &Path, table: &Table) -> Result<()> {
    let delim = delimiter_for(path)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delim)
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Save `table` as `dir/file`, creating `dir`
pub fn save_table(dir: &Path, file: &str, table: &Table) -> Result<PathBuf> {
    let path = dir.join(file);
    write_table(&path, table)?;
    info!("saved {} rows → {}", table.len(), path.display());
    Ok(path)
}

/// Save a list as one sorted CSV row
pub fn save_list(dir: &Path, file: &str, items: &[String]) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let mut sorted = items.to_vec();
    sorted.sort_by(|a, b| natural_cmp(a, b));
    let path = dir.join(file);
    let mut writer = csv::WriterBuilder::new()
        .from_path(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(&sorted)?;
    writer.flush()?;
    Ok(path)
}

/// Save each table as `dir/{name}{suffix}`
pub fn save_dir(dir: &Path, suffix: &str, tables: &BTreeMap<String, Table>) -> Result<Vec<PathBuf>> {
    tables
        .iter()
        .map(|(name, table)| save_table(dir, &format!("{}{}", name, suffix), table))
        .collect()
}

// ============================================================================
// DICTIONARY TEXT
// ============================================================================

/// One JSON object per row, keys in column order
pub fn df_to_dc_txt(table: &Table) -> String {
    let mut out = String::new();
    for row in &table.rows {
        let mut obj = Map::new();
        for (col, cell) in table.columns.iter().zip(row) {
            obj.insert(col.clone(), Value::String(cell.clone()));
        }
        out.push_str(&Value::Object(obj).to_string());
        out.push('\n');
    }
    out
}

/// Inverse of `df_to_dc_txt`; columns are the union of keys, first seen first
pub fn dc_txt_to_df(text: &str) -> Result<Table> {
    let mut columns: Vec<String> = Vec::new();
    let mut records: Vec<Map<String, Value>> = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .with_context(|| format!("line {} is not a JSON object", i + 1))?;
        let Value::Object(map) = value else {
            bail!("line {} is not a JSON object", i + 1);
        };
        for key in map.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
        records.push(map);
    }
    let rows = records
        .iter()
        .map(|m| {
            columns
                .iter()
                .map(|c| match m.get(c) {
                    None | Some(Value::Null) => String::new(),
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                })
                .collect()
        })
        .collect();
    Table::from_rows(columns, rows)
}

// ============================================================================
// DIRECTORY OPERATIONS
// ============================================================================

/// Move each `name{suffix}` in `dir` into `dir/name/`
pub fn in_subs(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let mut moved = Vec::new();
    for name in sorted_file_names(dir, suffix)? {
        let stem = name.strip_suffix(suffix).unwrap_or(&name);
        let sub = dir.join(stem);
        fs::create_dir_all(&sub).with_context(|| format!("Failed to create {}", sub.display()))?;
        let dest = sub.join(&name);
        fs::rename(dir.join(&name), &dest)
            .with_context(|| format!("Failed to move {} into {}", name, sub.display()))?;
        info!("moved {} → {}", name, dest.display());
        moved.push(dest);
    }
    Ok(moved)
}

/// Flatten every nested file into `dir`, renaming conflicts `base_{n}{ext}`,
/// then remove the emptied subdirectories (deepest first)
pub fn out_subs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("not a directory: {}", dir.display());
    }
    let nested: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(2)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();

    let mut moved = Vec::new();
    for src in nested {
        let Some(name) = src.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let dest = free_name(dir, name);
        fs::rename(&src, &dest)
            .with_context(|| format!("Failed to move {} to {}", src.display(), dest.display()))?;
        debug!("moved {} → {}", src.display(), dest.display());
        moved.push(dest);
    }

    let mut subdirs: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect();
    subdirs.sort_by_key(|p| std::cmp::Reverse(p.components().count()));
    for sub in subdirs {
        let empty = fs::read_dir(&sub)
            .map(|mut it| it.next().is_none())
            .unwrap_or(false);
        if empty {
            fs::remove_dir(&sub).with_context(|| format!("Failed to remove {}", sub.display()))?;
        }
    }
    Ok(moved)
}

/// `dir/name`, or `dir/base_{n}{ext}` with the lowest free n ≥ 1
fn free_name(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let (base, ext) = match name.rfind('.') {
        Some(i) if i > 0 => (&name[..i], &name[i..]),
        _ => (name, ""),
    };
    let mut n = 1;
    loop {
        let candidate = dir.join(format!("{}_{}{}", base, n, ext));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// All files under `dir`, relative to it, sorted
pub fn relative_paths(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        bail!("not a directory: {}", dir.display());
    }
    let mut out: Vec<String> = WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            e.path()
                .strip_prefix(dir)
                .ok()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
        })
        .collect();
    out.sort();
    Ok(out)
}

/// File names in `dir` ending with `suffix`, natural order
pub fn sorted_file_names(dir: &Path, suffix: &str) -> Result<Vec<String>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read directory {}", dir.display()))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with(suffix) {
            names.push(name);
        }
    }
    names.sort_by(|a, b| natural_cmp(a, b));
    Ok(names)
}

/// Replace strings that hold JSON arrays/objects with their decoded value
pub fn recursive_json_decode(value: Value) -> Value {
    match value {
        Value::String(s) => {
            let t = s.trim();
            if t.starts_with('{') || t.starts_with('[') {
                match serde_json::from_str::<Value>(t) {
                    Ok(decoded) => recursive_json_decode(decoded),
                    Err(_) => Value::String(s),
                }
            } else {
                Value::String(s)
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(recursive_json_decode).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, recursive_json_decode(v)))
                .collect(),
        ),
        other => other,
    }
}
