// HTML index: one page linking every .html (and optionally image) file in a directory

use crate::gen::tidy::{natural_key, re_un_cap};
use anyhow::{bail, Context, Result};
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid title regex"));
static SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

const TITLE_SCAN_BYTES: u64 = 200_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexSort {
    #[default]
    Title,
    Name,
    /// Newest first
    Mtime,
}

impl IndexSort {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "title" => Ok(IndexSort::Title),
            "name" => Ok(IndexSort::Name),
            "mtime" => Ok(IndexSort::Mtime),
            other => bail!("unknown sort '{}' (title, name, mtime)", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Output file, relative to the scanned directory unless absolute
    pub file: String,
    pub recursive: bool,
    /// File names to skip (case insensitive)
    pub exclude: Vec<String>,
    pub sort: IndexSort,
    pub preview: bool,
    pub grid_cols: usize,
    /// Extra extensions to list, e.g. `png`, `.svg`
    pub image_types: Vec<String>,
    pub preview_height_px: u32,
}

impl Default for IndexOptions {
    fn default() -> Self {
        IndexOptions {
            file: "index.html".to_string(),
            recursive: false,
            exclude: vec!["index.html".to_string(), "index.pdf".to_string()],
            sort: IndexSort::Title,
            preview: true,
            grid_cols: 3,
            image_types: Vec::new(),
            preview_height_px: 900,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    rel: String,
    title: String,
    name: String,
    mtime: SystemTime,
    group: String,
}

pub(crate) fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Whitespace-collapsed `<title>` from the head of an HTML file
pub fn extract_html_title(path: &Path) -> Option<String> {
    let mut buf = Vec::new();
    fs::File::open(path).ok()?.take(TITLE_SCAN_BYTES).read_to_end(&mut buf).ok()?;
    let text = String::from_utf8_lossy(&buf);
    let raw = TITLE_RE.captures(&text)?.get(1)?.as_str();
    let title = SPACE_RE.replace_all(raw, " ").trim().to_string();
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

fn normalize_ext(ext: &str) -> String {
    ext.trim_start_matches('.').to_ascii_lowercase()
}

fn collect(dir: &Path, out_parent: &Path, options: &IndexOptions) -> Result<Vec<Entry>> {
    let mut exts = vec!["html".to_string()];
    exts.extend(options.image_types.iter().map(|e| normalize_ext(e)));
    let exclude: Vec<String> = options.exclude.iter().map(|e| e.to_lowercase()).collect();

    let mut walker = WalkDir::new(dir).min_depth(1);
    if !options.recursive {
        walker = walker.max_depth(1);
    }
    let mut entries = Vec::new();
    for item in walker {
        let item = item.with_context(|| format!("Failed to scan {}", dir.display()))?;
        let path = item.path();
        if !item.file_type().is_file() {
            continue;
        }
        let ext = path.extension().and_then(|e| e.to_str()).map(normalize_ext).unwrap_or_default();
        let name = item.file_name().to_string_lossy().to_string();
        if !exts.contains(&ext) || exclude.contains(&name.to_lowercase()) {
            continue;
        }
        let stem = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
        let title = if ext == "html" {
            extract_html_title(path).unwrap_or(stem)
        } else {
            stem
        };
        let group = match path.parent().and_then(|p| p.strip_prefix(dir).ok()) {
            Some(rel) if !rel.as_os_str().is_empty() => rel.to_string_lossy().replace('\\', "/"),
            _ => "root".to_string(),
        };
        let rel = match path.strip_prefix(out_parent) {
            Ok(r) => r.to_string_lossy().replace('\\', "/"),
            Err(_) => path.to_string_lossy().to_string(),
        };
        let mtime = item
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        debug!("index entry {} ({})", rel, title);
        entries.push(Entry { rel, title, name, mtime, group });
    }
    Ok(entries)
}

fn card(entry: &Entry) -> String {
    let rel = escape(&entry.rel);
    format!(
        r#"<div class="card">
<div class="title">{title}</div>
<div class="actions">
  <button class="btn" data-href="{rel}" onclick="openPlot(this)">Open</button>
  <a class="link" href="{rel}" target="_blank" rel="noopener">New tab</a>
</div>
<div class="meta">{name}</div>
</div>"#,
        title = escape(&entry.title),
        rel = rel,
        name = escape(&entry.name)
    )
}

const STYLE: &str = r#"
    :root { --bg: #0b0c10; --panel: #111318; --card: #151823; --text: #e8e8ea; --muted: #a8abb5; --accent: #6ea8fe; --border: #2a2f3a; }
    body { margin: 0; padding: 20px; background: var(--bg); color: var(--text); font-family: ui-sans-serif, system-ui, -apple-system, Segoe UI, Roboto, Arial, sans-serif; }
    h1 { margin: 0 0 12px; font-size: 20px; }
    .wrap { display: grid; grid-template-columns: 1fr; gap: 16px; }
    .topbar, .preview { background: var(--panel); border: 1px solid var(--border); border-radius: 12px; }
    .topbar { padding: 12px; }
    .preview { overflow: hidden; }
    .grid { display: grid; grid-template-columns: repeat(GRID_COLS, minmax(240px, 1fr)); gap: 10px; align-items: start; }
    .card { background: var(--card); border: 1px solid var(--border); border-radius: 12px; padding: 10px; }
    .card.active { border-color: var(--accent); box-shadow: 0 0 0 2px rgba(110,168,254,0.15) inset; }
    .group { margin-top: 10px; }
    .group:first-child { margin-top: 0; }
    .group-title { font-size: 12px; color: var(--muted); margin: 6px 4px 10px; letter-spacing: 0.06em; text-transform: uppercase; }
    .title { font-size: 13px; font-weight: 650; line-height: 1.2; word-break: break-word; }
    .meta { margin-top: 6px; font-size: 11px; color: var(--muted); word-break: break-word; }
    .actions { margin-top: 8px; display: flex; gap: 10px; align-items: center; }
    .btn { background: var(--accent); color: #07101f; border: 0; border-radius: 10px; padding: 7px 10px; font-weight: 650; cursor: pointer; }
    .link { color: var(--muted); text-decoration: none; font-size: 12px; }
    .link:hover { color: var(--text); text-decoration: underline; }
    .previewbar { display: flex; gap: 10px; align-items: center; padding: 10px 12px; border-bottom: 1px solid var(--border); }
    .current { font-size: 13px; }
    .spacer { flex: 1; }
    iframe { width: 100%; border: 0; background: #fff; }
    @media (max-width: 1100px) { .grid { grid-template-columns: 1fr; } }
"#;

const PREVIEW_JS: &str = r#"
    function openPlot(btn) {
      const href = btn.getAttribute('data-href');
      const card = btn.closest('.card');
      document.getElementById('viewer').src = href;
      document.getElementById('currentTitle').textContent = 'Showing: ' + card.querySelector('.title').textContent;
      document.getElementById('currentLink').href = href;
      document.querySelectorAll('.card').forEach(c => c.classList.remove('active'));
      card.classList.add('active');
    }
    window.addEventListener('DOMContentLoaded', () => {
      const first = document.querySelector('.card');
      if (first) first.classList.add('active');
    });
"#;

fn render(entries: &[Entry], heading: &str, options: &IndexOptions) -> String {
    let mut body = String::new();
    if options.recursive {
        let mut current: Option<&str> = None;
        for entry in entries {
            if current != Some(entry.group.as_str()) {
                if current.is_some() {
                    body.push_str("</div></div>\n");
                }
                body.push_str(&format!(
                    "<div class=\"group\"><div class=\"group-title\">{}</div><div class=\"grid\">\n",
                    escape(&entry.group)
                ));
                current = Some(entry.group.as_str());
            }
            body.push_str(&card(entry));
            body.push('\n');
        }
        body.push_str("</div></div>\n");
    } else {
        body.push_str("<div class=\"grid\">\n");
        for entry in entries {
            body.push_str(&card(entry));
            body.push('\n');
        }
        body.push_str("</div>\n");
    }

    let (preview, script) = if options.preview {
        let first = &entries[0];
        let rel = escape(&first.rel);
        (
            format!(
                r#"<div class="preview">
  <div class="previewbar">
    <div id="currentTitle" class="current">Showing: {title}</div>
    <div class="spacer"></div>
    <a id="currentLink" class="link" href="{rel}" target="_blank" rel="noopener">Open in new tab</a>
  </div>
  <iframe id="viewer" src="{rel}" style="height:{height}px;"></iframe>
</div>"#,
                title = escape(&first.title),
                rel = rel,
                height = options.preview_height_px
            ),
            PREVIEW_JS,
        )
    } else {
        (String::new(), "")
    };

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width,initial-scale=1" />
  <title>{heading}</title>
  <style>{style}</style>
</head>
<body>
  <h1>{heading}</h1>
  <div class="wrap">
    <div class="topbar">
{body}    </div>
    {preview}
  </div>
  <script>{script}</script>
</body>
</html>
"#,
        heading = escape(heading),
        style = STYLE.replace("GRID_COLS", &options.grid_cols.max(1).to_string()),
        body = body,
        preview = preview,
        script = script
    )
}

/// Write an index page for `dir` and return its path
pub fn make_html_index(dir: &Path, options: &IndexOptions) -> Result<PathBuf> {
    let dir = fs::canonicalize(dir).with_context(|| format!("Directory not found: {}", dir.display()))?;
    let file = Path::new(&options.file);
    let out_path = if file.is_absolute() { file.to_path_buf() } else { dir.join(file) };
    let out_parent = out_path.parent().map(Path::to_path_buf).unwrap_or_else(|| dir.clone());

    let mut entries = collect(&dir, &out_parent, options)?;
    if entries.is_empty() {
        bail!("No .html files found in: {}", dir.display());
    }
    match options.sort {
        IndexSort::Mtime => entries.sort_by(|a, b| b.mtime.cmp(&a.mtime)),
        IndexSort::Name => entries.sort_by(|a, b| natural_key(&a.name).cmp(&natural_key(&b.name))),
        IndexSort::Title => entries.sort_by(|a, b| natural_key(&a.title).cmp(&natural_key(&b.title))),
    }
    if options.recursive {
        // Stable: keeps the chosen order inside each group
        entries.sort_by(|a, b| natural_key(&a.group).cmp(&natural_key(&b.group)));
    }

    let stem = file.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
    let heading = format!("IND {}", re_un_cap(&stem));
    let page = render(&entries, &heading, options);

    fs::create_dir_all(&out_parent).with_context(|| format!("Failed to create {}", out_parent.display()))?;
    fs::write(&out_path, page).with_context(|| format!("Failed to write {}", out_path.display()))?;
    info!("wrote index of {} files to {}", entries.len(), out_path.display());
    Ok(out_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn page(title: &str) -> String {
        format!("<html><head><TITLE>\n  {}\n</TITLE></head></html>", title)
    }

    #[test]
    fn test_extract_title() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("a.html");
        fs::write(&p, page("Dose   Response")).unwrap();
        assert_eq!(extract_html_title(&p).as_deref(), Some("Dose Response"));
        fs::write(&p, "<html></html>").unwrap();
        assert_eq!(extract_html_title(&p), None);
    }

    #[test]
    fn test_index_sorted_by_title() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.html"), page("Plot 10")).unwrap();
        fs::write(dir.path().join("a.html"), page("Plot 2")).unwrap();
        fs::write(dir.path().join("c.png"), b"png").unwrap();
        let out = make_html_index(dir.path(), &IndexOptions::default()).unwrap();
        let html = fs::read_to_string(&out).unwrap();
        assert!(html.contains("<title>IND Index</title>"));
        let two = html.find("Plot 2").unwrap();
        let ten = html.find("Plot 10").unwrap();
        assert!(two < ten);
        assert!(!html.contains("c.png"));
        assert!(html.contains("<iframe id=\"viewer\" src=\"a.html\""));
    }

    #[test]
    fn test_index_recursive_groups_and_images() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("x.svg"), "<svg/>").unwrap();
        fs::write(dir.path().join("top.html"), page("Top")).unwrap();
        let options = IndexOptions {
            recursive: true,
            preview: false,
            image_types: vec![".SVG".to_string()],
            ..Default::default()
        };
        let out = make_html_index(dir.path(), &options).unwrap();
        let html = fs::read_to_string(out).unwrap();
        let root = html.find(">root<").unwrap();
        let sub = html.find(">sub<").unwrap();
        assert!(root < sub);
        assert!(html.contains("data-href=\"sub/x.svg\""));
        assert!(!html.contains("id=\"viewer\""));
    }

    #[test]
    fn test_index_empty_dir_is_error() {
        let dir = TempDir::new().unwrap();
        let err = make_html_index(dir.path(), &IndexOptions::default()).unwrap_err();
        assert!(err.to_string().contains("No .html files found"));
    }
}
