// Plot: self-contained SVG charts written to `dir/file`
//
// Every renderer takes a `Table`, column names and a `PlotStyle`, and returns
// the written path. Axis labels default to the column names (run through
// `re_un_cap` when `space_capitalize` is set).

use crate::gen::html::escape;
use crate::gen::stat::mean;
use crate::gen::tidy::{fmt_num, natural_cmp, parse_number, Table};
pub use crate::gen::tidy::re_un_cap;
use anyhow::{bail, Context, Result};
use log::info;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const PX_PER_INCH: f64 = 96.0;
const FONT: &str = "Arial, Helvetica, sans-serif";

/// seaborn "colorblind"
const COLORBLIND: [&str; 10] = [
    "#0173b2", "#de8f05", "#029e73", "#d55e00", "#cc78bc", "#ca9161", "#fbafe4", "#949494",
    "#ece133", "#56b4e9",
];

// ============================================================================
// STYLE
// ============================================================================

#[derive(Debug, Clone)]
pub struct PlotStyle {
    pub title: String,
    pub x_axis: String,
    pub y_axis: String,
    pub legend_title: String,
    /// Width, height in inches
    pub figsize: (f64, f64),
    pub space_capitalize: bool,
    pub x_dims: Option<(f64, f64)>,
    pub y_dims: Option<(f64, f64)>,
    pub x_ticks_rot: f64,
}

impl Default for PlotStyle {
    fn default() -> Self {
        PlotStyle {
            title: String::new(),
            x_axis: String::new(),
            y_axis: String::new(),
            legend_title: String::new(),
            figsize: (5.0, 5.0),
            space_capitalize: true,
            x_dims: None,
            y_dims: None,
            x_ticks_rot: 0.0,
        }
    }
}

impl PlotStyle {
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn with_axes(mut self, x_axis: &str, y_axis: &str) -> Self {
        self.x_axis = x_axis.to_string();
        self.y_axis = y_axis.to_string();
        self
    }

    pub fn with_legend_title(mut self, legend_title: &str) -> Self {
        self.legend_title = legend_title.to_string();
        self
    }

    pub fn with_figsize(mut self, width: f64, height: f64) -> Self {
        self.figsize = (width, height);
        self
    }

    pub fn with_x_dims(mut self, lo: f64, hi: f64) -> Self {
        self.x_dims = Some((lo, hi));
        self
    }

    pub fn with_y_dims(mut self, lo: f64, hi: f64) -> Self {
        self.y_dims = Some((lo, hi));
        self
    }

    pub fn with_x_ticks_rot(mut self, degrees: f64) -> Self {
        self.x_ticks_rot = degrees;
        self
    }

    pub fn with_space_capitalize(mut self, on: bool) -> Self {
        self.space_capitalize = on;
        self
    }

    fn label(&self, explicit: &str, column: &str) -> String {
        if !explicit.is_empty() {
            explicit.to_string()
        } else if self.space_capitalize {
            re_un_cap(column)
        } else {
            column.to_string()
        }
    }
}

/// Result of a render
#[derive(Debug, Clone)]
pub struct PlotOutput {
    pub path: PathBuf,
    /// Annotated data, for plots that derive columns (volcano)
    pub data: Option<Table>,
}

// ============================================================================
// HELPERS
// ============================================================================

/// Rounds up to the leading digit at the magnitude of `number` (e.g. 42 → 50, 0.031 → 0.04)
pub fn round_up_pow_10(number: f64) -> f64 {
    if number == 0.0 {
        return 0.0;
    }
    let exponent = number.abs().log10().ceil() as i32;
    let p = 10f64.powi(exponent);
    (number / p).ceil() * p
}

pub fn round_down_pow_10(number: f64) -> f64 {
    if number == 0.0 {
        return 0.0;
    }
    let exponent = number.abs().log10().floor() as i32;
    let p = 10f64.powi(exponent);
    (number / p).floor() * p
}

/// log10 of each value, flooring values below 1 to 0
pub fn log10(values: &[f64]) -> Vec<f64> {
    values.iter().map(|v| v.max(1.0).log10()).collect()
}

/// `n` colors from the colorblind palette, repeating when n > 10
pub fn palette(n: usize) -> Vec<&'static str> {
    (0..n).map(|i| COLORBLIND[i % COLORBLIND.len()]).collect()
}

/// About five round tick positions spanning [lo, hi]
pub fn nice_ticks(lo: f64, hi: f64) -> Vec<f64> {
    if !(hi > lo) || !lo.is_finite() || !hi.is_finite() {
        return vec![lo];
    }
    let raw = (hi - lo) / 5.0;
    let mag = 10f64.powf(raw.log10().floor());
    let step = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * mag)
        .find(|s| *s >= raw)
        .unwrap_or(10.0 * mag);
    let first = (lo / step).ceil() as i64;
    let last = (hi / step).floor() as i64;
    (first..=last).map(|i| i as f64 * step).collect()
}

fn tick_label(v: f64, ticks: &[f64]) -> String {
    let step = if ticks.len() > 1 { (ticks[1] - ticks[0]).abs() } else { 1.0 };
    let decimals = if step >= 1.0 { 0 } else { (-step.log10().floor()) as usize };
    let s = format!("{:.*}", decimals, v);
    if s == "-0" { "0".to_string() } else { s }
}

fn padded_range(values: impl Iterator<Item = f64>, dims: Option<(f64, f64)>) -> (f64, f64) {
    if let Some(d) = dims {
        return d;
    }
    let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for v in values.filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    if lo == hi {
        return (lo - 1.0, hi + 1.0);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad, hi + pad)
}

fn ordered_unique<'a>(values: impl Iterator<Item = &'a str>, order: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for v in values {
        if !seen.iter().any(|s| s == v) {
            seen.push(v.to_string());
        }
    }
    if order.is_empty() {
        seen.sort_by(|a, b| natural_cmp(a, b));
        return seen;
    }
    order.iter().filter(|o| seen.contains(o)).cloned().collect()
}

fn output_path(dir: &Path, file: &str) -> Result<PathBuf> {
    let path = dir.join(file);
    match path.extension().and_then(|e| e.to_str()) {
        None => Ok(path.with_extension("svg")),
        Some(ext) if ext.eq_ignore_ascii_case("svg") => Ok(path),
        Some(ext) => bail!("unsupported plot format '.{}'; plots are written as .svg", ext),
    }
}

// ============================================================================
// SVG CANVAS
// ============================================================================

struct Svg {
    width: f64,
    height: f64,
    body: String,
}

impl Svg {
    fn new(width: f64, height: f64) -> Self {
        Svg {
            width,
            height,
            body: String::new(),
        }
    }

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, fill: &str, opacity: f64) {
        self.body.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\" fill-opacity=\"{}\" stroke=\"black\" stroke-width=\"0.5\"/>\n",
            x, y, w.max(0.0), h.max(0.0), fill, opacity
        ));
    }

    fn circle(&mut self, cx: f64, cy: f64, r: f64, fill: &str, opacity: f64, title: Option<&str>) {
        let tip = title.map(|t| format!("<title>{}</title>", escape(t))).unwrap_or_default();
        self.body.push_str(&format!(
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" fill=\"{}\" fill-opacity=\"{}\" stroke=\"black\" stroke-width=\"0.5\">{}</circle>\n",
            cx, cy, r, fill, opacity, tip
        ));
    }

    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, stroke: &str, dashed: bool) {
        let dash = if dashed { " stroke-dasharray=\"4 3\"" } else { "" };
        self.body.push_str(&format!(
            "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"{}\" stroke-width=\"1\"{}/>\n",
            x1, y1, x2, y2, stroke, dash
        ));
    }

    fn polyline(&mut self, points: &[(f64, f64)], stroke: &str) {
        let pts: Vec<String> = points.iter().map(|(x, y)| format!("{:.2},{:.2}", x, y)).collect();
        self.body.push_str(&format!(
            "<polyline points=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.5\"/>\n",
            pts.join(" "),
            stroke
        ));
    }

    #[allow(clippy::too_many_arguments)]
    fn text(&mut self, x: f64, y: f64, s: &str, size: f64, anchor: &str, bold: bool, rotate: f64) {
        let weight = if bold { " font-weight=\"bold\"" } else { "" };
        let transform = if rotate != 0.0 {
            format!(" transform=\"rotate({} {:.2} {:.2})\"", rotate, x, y)
        } else {
            String::new()
        };
        self.body.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{}\" text-anchor=\"{}\"{}{}>{}</text>\n",
            x, y, FONT, size, anchor, weight, transform, escape(s)
        ));
    }

    fn finish(self) -> String {
        format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w:.0}\" height=\"{h:.0}\" viewBox=\"0 0 {w:.0} {h:.0}\">\n<rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n{body}</svg>\n",
            w = self.width,
            h = self.height,
            body = self.body
        )
    }
}

#[derive(Debug, Clone, Copy)]
struct Scale {
    lo: f64,
    hi: f64,
    px_lo: f64,
    px_hi: f64,
}

impl Scale {
    fn map(&self, v: f64) -> f64 {
        if self.hi == self.lo {
            return (self.px_lo + self.px_hi) / 2.0;
        }
        self.px_lo + (v - self.lo) / (self.hi - self.lo) * (self.px_hi - self.px_lo)
    }
}

/// Plot area inside the margins
#[derive(Debug, Clone, Copy)]
struct Frame {
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
}

impl Frame {
    fn x_scale(&self, lo: f64, hi: f64) -> Scale {
        Scale { lo, hi, px_lo: self.left, px_hi: self.right }
    }

    fn y_scale(&self, lo: f64, hi: f64) -> Scale {
        Scale { lo, hi, px_lo: self.bottom, px_hi: self.top }
    }

    fn band(&self, i: usize, n: usize) -> (f64, f64) {
        let w = (self.right - self.left) / n.max(1) as f64;
        (self.left + i as f64 * w, w)
    }
}

struct Canvas {
    svg: Svg,
    frame: Frame,
    style: PlotStyle,
}

impl Canvas {
    fn new(style: &PlotStyle, legend: bool) -> Self {
        let width = style.figsize.0 * PX_PER_INCH + if legend { 140.0 } else { 0.0 };
        let height = style.figsize.1 * PX_PER_INCH;
        let bottom_pad = if style.x_ticks_rot != 0.0 { 90.0 } else { 55.0 };
        let frame = Frame {
            left: 70.0,
            top: if style.title.is_empty() { 20.0 } else { 45.0 },
            right: style.figsize.0 * PX_PER_INCH - 20.0,
            bottom: height - bottom_pad,
        };
        let mut svg = Svg::new(width, height);
        if !style.title.is_empty() {
            svg.text(width / 2.0, 28.0, &style.title, 18.0, "middle", true, 0.0);
        }
        Canvas { svg, frame, style: style.clone() }
    }

    fn y_axis(&mut self, ys: &Scale, label: &str) {
        let f = self.frame;
        self.svg.line(f.left, f.top, f.left, f.bottom, "black", false);
        let ticks = nice_ticks(ys.lo.min(ys.hi), ys.hi.max(ys.lo));
        for t in &ticks {
            let y = ys.map(*t);
            self.svg.line(f.left - 4.0, y, f.left, y, "black", false);
            self.svg.text(f.left - 7.0, y + 3.0, &tick_label(*t, &ticks), 9.0, "end", false, 0.0);
        }
        let mid = (f.top + f.bottom) / 2.0;
        self.svg.text(18.0, mid, label, 12.0, "middle", true, -90.0);
    }

    fn x_axis_numeric(&mut self, xs: &Scale, label: &str) {
        let f = self.frame;
        self.svg.line(f.left, f.bottom, f.right, f.bottom, "black", false);
        let ticks = nice_ticks(xs.lo.min(xs.hi), xs.hi.max(xs.lo));
        for t in &ticks {
            let x = xs.map(*t);
            self.svg.line(x, f.bottom, x, f.bottom + 4.0, "black", false);
            self.svg.text(x, f.bottom + 16.0, &tick_label(*t, &ticks), 9.0, "middle", false, 0.0);
        }
        self.x_label(label);
    }

    fn x_axis_bands(&mut self, labels: &[String], label: &str) {
        let f = self.frame;
        self.svg.line(f.left, f.bottom, f.right, f.bottom, "black", false);
        let rot = self.style.x_ticks_rot;
        for (i, l) in labels.iter().enumerate() {
            let (x0, w) = f.band(i, labels.len());
            let anchor = if rot != 0.0 { "end" } else { "middle" };
            self.svg.text(x0 + w / 2.0, f.bottom + 16.0, l, 9.0, anchor, false, -rot);
        }
        self.x_label(label);
    }

    fn x_label(&mut self, label: &str) {
        let f = self.frame;
        let y = self.svg.height - 12.0;
        self.svg.text((f.left + f.right) / 2.0, y, label, 12.0, "middle", true, 0.0);
    }

    fn legend(&mut self, title: &str, entries: &[(String, &str)]) {
        if entries.is_empty() {
            return;
        }
        let x = self.frame.right + 30.0;
        let mut y = self.frame.top + 10.0;
        if !title.is_empty() {
            self.svg.text(x, y, title, 12.0, "start", true, 0.0);
            y += 18.0;
        }
        for (name, color) in entries {
            self.svg.rect(x, y - 9.0, 10.0, 10.0, color, 1.0);
            self.svg.text(x + 16.0, y, name, 9.0, "start", false, 0.0);
            y += 16.0;
        }
    }

    fn save(self, dir: &Path, file: &str) -> Result<PathBuf> {
        let path = output_path(dir, file)?;
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        fs::write(&path, self.svg.finish()).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("plot saved to {}", path.display());
        Ok(path)
    }
}

fn pairs(table: &Table, x: &str, y: &str) -> Result<Vec<(usize, f64, f64)>> {
    let xs = table.numeric(x)?;
    let ys = table.numeric(y)?;
    Ok(xs
        .into_iter()
        .zip(ys)
        .enumerate()
        .filter_map(|(i, (a, b))| Some((i, a?, b?)))
        .collect())
}

// ============================================================================
// SCATTER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScatKind {
    #[default]
    Scat,
    Line,
    LineScat,
}

impl ScatKind {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "scat" => Ok(ScatKind::Scat),
            "line" => Ok(ScatKind::Line),
            "line_scat" => Ok(ScatKind::LineScat),
            other => bail!("unknown scatter type '{}' (scat, line, line_scat)", other),
        }
    }
}

/// Scatter (or line) plot of `y` against `x`, colored by `cols` when given
pub fn scat(
    table: &Table,
    kind: ScatKind,
    x: &str,
    y: &str,
    cols: Option<&str>,
    style: &PlotStyle,
    dir: &Path,
    file: &str,
) -> Result<PlotOutput> {
    let points = pairs(table, x, y)?;
    if points.is_empty() {
        bail!("no numeric ({}, {}) pairs to plot", x, y);
    }
    let groups: Vec<String> = match cols {
        Some(c) => ordered_unique(table.column(c)?.into_iter(), &[]),
        None => vec![String::new()],
    };
    let colors = palette(groups.len());
    let group_of = |row: usize| -> Result<usize> {
        match cols {
            Some(c) => {
                let v = table.cell(row, c)?;
                Ok(groups.iter().position(|g| g == v).unwrap_or_default())
            }
            None => Ok(0),
        }
    };

    let mut canvas = Canvas::new(style, cols.is_some());
    let (x_lo, x_hi) = padded_range(points.iter().map(|p| p.1), style.x_dims);
    let (y_lo, y_hi) = padded_range(points.iter().map(|p| p.2), style.y_dims);
    let xs = canvas.frame.x_scale(x_lo, x_hi);
    let ys = canvas.frame.y_scale(y_lo, y_hi);

    if kind != ScatKind::Scat {
        for (g, color) in colors.iter().enumerate() {
            let mut line: Vec<(f64, f64)> = Vec::new();
            for (row, px, py) in &points {
                if group_of(*row)? == g {
                    line.push((*px, *py));
                }
            }
            line.sort_by(|a, b| a.0.total_cmp(&b.0));
            let mapped: Vec<(f64, f64)> = line.iter().map(|(a, b)| (xs.map(*a), ys.map(*b))).collect();
            canvas.svg.polyline(&mapped, color);
        }
    }
    if kind != ScatKind::Line {
        for (row, px, py) in &points {
            let color = colors[group_of(*row)?];
            canvas.svg.circle(xs.map(*px), ys.map(*py), 3.5, color, 0.8, None);
        }
    }

    canvas.x_axis_numeric(&xs, &style.label(&style.x_axis, x));
    canvas.y_axis(&ys, &style.label(&style.y_axis, y));
    if let Some(c) = cols {
        let entries: Vec<(String, &str)> = groups.iter().cloned().zip(colors.iter().copied()).collect();
        canvas.legend(&style.label(&style.legend_title, c), &entries);
    }
    Ok(PlotOutput { path: canvas.save(dir, file)?, data: None })
}

// ============================================================================
// CATEGORICAL
// ============================================================================

/// Mean of `y` per `x` category with SD error bars, plus the raw points
pub fn cat(
    table: &Table,
    x: &str,
    y: &str,
    cats_ord: &[String],
    style: &PlotStyle,
    dir: &Path,
    file: &str,
) -> Result<PlotOutput> {
    let keys = table.column(x)?;
    let values = table.numeric(y)?;
    let cats = ordered_unique(keys.iter().copied(), cats_ord);
    if cats.is_empty() {
        bail!("no categories in column '{}'", x);
    }
    let per_cat: Vec<Vec<f64>> = cats
        .iter()
        .map(|c| {
            keys.iter()
                .zip(&values)
                .filter(|(k, _)| **k == c)
                .filter_map(|(_, v)| *v)
                .collect()
        })
        .collect();
    let stats: Vec<(f64, f64)> = per_cat
        .iter()
        .map(|v| {
            let sd = crate::gen::stat::variance(v).sqrt();
            (mean(v), if sd.is_nan() { 0.0 } else { sd })
        })
        .collect();

    let mut canvas = Canvas::new(style, false);
    let top = stats
        .iter()
        .map(|(m, s)| m + s)
        .chain(per_cat.iter().flatten().copied())
        .fold(0.0, f64::max);
    let bottom = per_cat.iter().flatten().copied().fold(0.0, f64::min);
    let (y_lo, y_hi) = style.y_dims.unwrap_or((bottom, if top > 0.0 { top * 1.05 } else { 1.0 }));
    let ys = canvas.frame.y_scale(y_lo, y_hi);
    let colors = palette(cats.len());

    for (i, ((m, sd), raw)) in stats.iter().zip(&per_cat).enumerate() {
        let (x0, w) = canvas.frame.band(i, cats.len());
        let (bx, bw) = (x0 + w * 0.15, w * 0.7);
        if m.is_finite() {
            let y_top = ys.map(*m);
            let y_zero = ys.map(y_lo.max(0.0));
            canvas.svg.rect(bx, y_top.min(y_zero), bw, (y_zero - y_top).abs(), colors[i], 0.8);
            let cx = x0 + w / 2.0;
            canvas.svg.line(cx, ys.map(m - sd), cx, ys.map(m + sd), "black", false);
            canvas.svg.line(cx - w * 0.08, ys.map(m + sd), cx + w * 0.08, ys.map(m + sd), "black", false);
            canvas.svg.line(cx - w * 0.08, ys.map(m - sd), cx + w * 0.08, ys.map(m - sd), "black", false);
        }
        for (j, v) in raw.iter().enumerate() {
            let jitter = ((j % 5) as f64 - 2.0) * bw * 0.06;
            canvas.svg.circle(x0 + w / 2.0 + jitter, ys.map(*v), 2.5, "white", 0.9, None);
        }
    }

    canvas.x_axis_bands(&cats, &style.label(&style.x_axis, x));
    canvas.y_axis(&ys, &style.label(&style.y_axis, y));
    Ok(PlotOutput { path: canvas.save(dir, file)?, data: None })
}

// ============================================================================
// DISTRIBUTION
// ============================================================================

/// Bin counts over [lo, hi]; the last bin is closed
pub fn histogram(values: &[f64], bins: usize, lo: f64, hi: f64) -> Vec<usize> {
    let bins = bins.max(1);
    let mut counts = vec![0; bins];
    let width = (hi - lo) / bins as f64;
    for v in values.iter().filter(|v| **v >= lo && **v <= hi) {
        let idx = if width > 0.0 { ((v - lo) / width) as usize } else { 0 };
        counts[idx.min(bins - 1)] += 1;
    }
    counts
}

/// Histogram of `x` (overlaid per `cols` group when given)
#[allow(clippy::too_many_arguments)]
pub fn dist(
    table: &Table,
    x: &str,
    cols: Option<&str>,
    bins: usize,
    style: &PlotStyle,
    dir: &Path,
    file: &str,
) -> Result<PlotOutput> {
    let values = table.numeric(x)?;
    let groups: Vec<String> = match cols {
        Some(c) => ordered_unique(table.column(c)?.into_iter(), &[]),
        None => vec![String::new()],
    };
    let keys: Vec<&str> = match cols {
        Some(c) => table.column(c)?,
        None => vec![""; table.len()],
    };
    let all: Vec<f64> = values.iter().flatten().copied().collect();
    if all.is_empty() {
        bail!("no numeric values in column '{}'", x);
    }
    let (x_lo, x_hi) = style.x_dims.unwrap_or_else(|| {
        let lo = all.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = all.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if lo == hi { (lo - 0.5, hi + 0.5) } else { (lo, hi) }
    });

    let per_group: Vec<Vec<usize>> = groups
        .iter()
        .map(|g| {
            let v: Vec<f64> = keys
                .iter()
                .zip(&values)
                .filter(|(k, _)| *k == g)
                .filter_map(|(_, v)| *v)
                .collect();
            histogram(&v, bins, x_lo, x_hi)
        })
        .collect();
    let max_count = per_group.iter().flatten().copied().max().unwrap_or(1).max(1);

    let mut canvas = Canvas::new(style, cols.is_some());
    let xs = canvas.frame.x_scale(x_lo, x_hi);
    let (y_lo, y_hi) = style.y_dims.unwrap_or((0.0, max_count as f64 * 1.05));
    let ys = canvas.frame.y_scale(y_lo, y_hi);
    let colors = palette(groups.len());
    let width = (x_hi - x_lo) / bins.max(1) as f64;
    let opacity = if groups.len() > 1 { 0.5 } else { 0.85 };

    for (g, counts) in per_group.iter().enumerate() {
        for (b, count) in counts.iter().enumerate() {
            if *count == 0 {
                continue;
            }
            let left = xs.map(x_lo + b as f64 * width);
            let right = xs.map(x_lo + (b + 1) as f64 * width);
            let top = ys.map(*count as f64);
            canvas.svg.rect(left, top, right - left, ys.map(y_lo) - top, colors[g], opacity);
        }
    }

    canvas.x_axis_numeric(&xs, &style.label(&style.x_axis, x));
    let y_label = if style.y_axis.is_empty() { "Count".to_string() } else { style.y_axis.clone() };
    canvas.y_axis(&ys, &y_label);
    if let Some(c) = cols {
        let entries: Vec<(String, &str)> = groups.iter().cloned().zip(colors.iter().copied()).collect();
        canvas.legend(&style.label(&style.legend_title, c), &entries);
    }
    Ok(PlotOutput { path: canvas.save(dir, file)?, data: None })
}

// ============================================================================
// HEATMAP
// ============================================================================

fn lerp(a: u8, b: u8, t: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * t).round() as u8
}

fn mix(from: (u8, u8, u8), to: (u8, u8, u8), t: f64) -> String {
    let t = t.clamp(0.0, 1.0);
    format!("#{:02x}{:02x}{:02x}", lerp(from.0, to.0, t), lerp(from.1, to.1, t), lerp(from.2, to.2, t))
}

/// White → red, or blue → white → red around `center`
fn heat_color(v: f64, lo: f64, hi: f64, center: Option<f64>) -> String {
    const WHITE: (u8, u8, u8) = (255, 245, 240);
    const RED: (u8, u8, u8) = (103, 0, 13);
    const BLUE: (u8, u8, u8) = (5, 48, 97);
    match center {
        Some(c) if v < c => mix(WHITE, BLUE, if c > lo { (c - v) / (c - lo) } else { 0.0 }),
        Some(c) => mix(WHITE, RED, if hi > c { (v - c) / (hi - c) } else { 0.0 }),
        None => mix(WHITE, RED, if hi > lo { (v - lo) / (hi - lo) } else { 0.0 }),
    }
}

/// Heatmap of the numeric columns of `table`, one row per table row labelled by `index`
#[allow(clippy::too_many_arguments)]
pub fn heat(
    table: &Table,
    index: Option<&str>,
    vals_dims: Option<(f64, f64)>,
    center: Option<f64>,
    annot: bool,
    style: &PlotStyle,
    dir: &Path,
    file: &str,
) -> Result<PlotOutput> {
    let value_cols: Vec<String> = table
        .numeric_columns()
        .into_iter()
        .filter(|c| Some(c.as_str()) != index)
        .collect();
    if value_cols.is_empty() || table.is_empty() {
        bail!("heatmap needs at least one numeric column and one row");
    }
    let row_labels: Vec<String> = match index {
        Some(i) => table.column(i)?.iter().map(|s| s.to_string()).collect(),
        None => (0..table.len()).map(|i| i.to_string()).collect(),
    };
    let matrix: Vec<Vec<Option<f64>>> = table
        .rows
        .iter()
        .map(|row| {
            value_cols
                .iter()
                .filter_map(|c| table.columns.iter().position(|k| k == c))
                .map(|i| parse_number(&row[i]))
                .collect()
        })
        .collect();
    let (lo, hi) = vals_dims.unwrap_or_else(|| {
        let vals: Vec<f64> = matrix.iter().flatten().flatten().copied().collect();
        (
            vals.iter().copied().fold(f64::INFINITY, f64::min),
            vals.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        )
    });

    let mut style = style.clone();
    if style.x_ticks_rot == 0.0 {
        style.x_ticks_rot = 45.0;
    }
    let mut canvas = Canvas::new(&style, true);
    canvas.frame.left = 110.0;
    let f = canvas.frame;
    let n_rows = matrix.len();
    let cell_h = (f.bottom - f.top) / n_rows as f64;
    for (r, row) in matrix.iter().enumerate() {
        let y = f.top + r as f64 * cell_h;
        for (c, v) in row.iter().enumerate() {
            let (x, w) = f.band(c, value_cols.len());
            let color = v.map(|v| heat_color(v, lo, hi, center)).unwrap_or_else(|| "#dddddd".to_string());
            canvas.svg.rect(x, y, w, cell_h, &color, 1.0);
            if annot {
                if let Some(v) = v {
                    canvas.svg.text(x + w / 2.0, y + cell_h / 2.0 + 3.0, &format!("{:.2}", v), 8.0, "middle", false, 0.0);
                }
            }
        }
        canvas.svg.text(f.left - 6.0, y + cell_h / 2.0 + 3.0, &row_labels[r], 9.0, "end", false, 0.0);
    }
    canvas.x_axis_bands(&value_cols, &style.x_axis);
    if !style.y_axis.is_empty() {
        canvas.svg.text(18.0, (f.top + f.bottom) / 2.0, &style.y_axis, 12.0, "middle", true, -90.0);
    }

    // Color bar
    let bar_x = f.right + 30.0;
    let steps = 20;
    let bar_h = (f.bottom - f.top) / steps as f64;
    for s in 0..steps {
        let v = hi - (hi - lo) * (s as f64 + 0.5) / steps as f64;
        canvas.svg.rect(bar_x, f.top + s as f64 * bar_h, 14.0, bar_h, &heat_color(v, lo, hi, center), 1.0);
    }
    canvas.svg.text(bar_x + 18.0, f.top + 8.0, &fmt_num(hi), 9.0, "start", false, 0.0);
    canvas.svg.text(bar_x + 18.0, f.bottom, &fmt_num(lo), 9.0, "start", false, 0.0);
    if !style.legend_title.is_empty() {
        canvas.svg.text(bar_x, f.top - 8.0, &style.legend_title, 10.0, "start", true, 0.0);
    }
    Ok(PlotOutput { path: canvas.save(dir, file)?, data: None })
}

// ============================================================================
// STACKED BAR
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct StackOptions {
    pub x_ord: Vec<String>,
    pub cols_ord: Vec<String>,
    /// Scale each bar so its segments sum to 1
    pub normalize: bool,
    /// Rows with `y` below the cutoff are pooled into one `<cutoff` segment
    pub cutoff: Option<f64>,
}

/// Mean of `y` per (`x`, `cols`) as stacked bars; returns the stacked values too
#[allow(clippy::too_many_arguments)]
pub fn stack(
    table: &Table,
    x: &str,
    y: &str,
    cols: &str,
    options: &StackOptions,
    style: &PlotStyle,
    dir: &Path,
    file: &str,
) -> Result<PlotOutput> {
    let xs_col = table.column(x)?;
    let cs_col = table.column(cols)?;
    let ys_col = table.numeric(y)?;

    let mut cells: BTreeMap<(String, String), Vec<f64>> = BTreeMap::new();
    let mut pooled: BTreeMap<String, f64> = BTreeMap::new();
    let cutoff_label = options.cutoff.map(|c| format!("<{}", fmt_num(c)));
    for ((xk, ck), v) in xs_col.iter().zip(&cs_col).zip(&ys_col) {
        let Some(v) = v else { continue };
        match options.cutoff {
            Some(c) if *v < c => *pooled.entry(xk.to_string()).or_default() += v,
            _ => cells.entry((xk.to_string(), ck.to_string())).or_default().push(*v),
        }
    }
    if let Some(label) = &cutoff_label {
        for (xk, total) in &pooled {
            cells.entry((xk.clone(), label.clone())).or_default().push(*total);
        }
    }

    let x_cats = ordered_unique(cells.keys().map(|(a, _)| a.as_str()), &options.x_ord);
    let mut segs = ordered_unique(cells.keys().map(|(_, b)| b.as_str()), &options.cols_ord);
    if let Some(label) = &cutoff_label {
        if let Some(pos) = segs.iter().position(|s| s == label) {
            let l = segs.remove(pos);
            segs.push(l);
        }
    }
    if x_cats.is_empty() {
        bail!("nothing to stack");
    }

    let mut heights: Vec<Vec<f64>> = x_cats
        .iter()
        .map(|xk| {
            segs.iter()
                .map(|s| cells.get(&(xk.clone(), s.clone())).map(|v| mean(v)).unwrap_or(0.0))
                .collect()
        })
        .collect();
    if options.normalize {
        for bar in heights.iter_mut() {
            let total: f64 = bar.iter().sum();
            if total > 0.0 {
                bar.iter_mut().for_each(|h| *h /= total);
            }
        }
    }

    let max_total = heights.iter().map(|b| b.iter().sum::<f64>()).fold(0.0, f64::max);
    let mut canvas = Canvas::new(style, true);
    let (y_lo, y_hi) = style.y_dims.unwrap_or((0.0, if max_total > 0.0 { max_total * 1.05 } else { 1.0 }));
    let ys = canvas.frame.y_scale(y_lo, y_hi);
    let colors = palette(segs.len());
    for (i, bar) in heights.iter().enumerate() {
        let (x0, w) = canvas.frame.band(i, x_cats.len());
        let mut base = 0.0;
        for (s, h) in bar.iter().enumerate() {
            if *h <= 0.0 {
                continue;
            }
            let top = ys.map(base + h);
            canvas.svg.rect(x0 + w * 0.15, top, w * 0.7, ys.map(base) - top, colors[s], 1.0);
            base += h;
        }
    }
    canvas.x_axis_bands(&x_cats, &style.label(&style.x_axis, x));
    canvas.y_axis(&ys, &style.label(&style.y_axis, y));
    let entries: Vec<(String, &str)> = segs.iter().cloned().zip(colors.iter().copied()).collect();
    canvas.legend(&style.label(&style.legend_title, cols), &entries);

    let mut data = Table::new(vec![x.to_string(), cols.to_string(), y.to_string()])?;
    for (xk, bar) in x_cats.iter().zip(&heights) {
        for (s, h) in segs.iter().zip(bar) {
            data.push_row(vec![xk.clone(), s.clone(), fmt_num(*h)])?;
        }
    }
    Ok(PlotOutput { path: canvas.save(dir, file)?, data: Some(data) })
}

// ============================================================================
// VOLCANO
// ============================================================================

pub const SIGNIFICANCE: [&str; 4] = ["FC & p-value", "p-value", "FC", "NS"];

/// Significance class of a point given |log2 FC| and -log10 p thresholds
pub fn significance(log2_fc: f64, neg_log10_p: f64, fc_threshold: f64, p_threshold: f64) -> &'static str {
    let fc_hit = log2_fc.abs() >= fc_threshold.log2();
    let p_hit = neg_log10_p >= -p_threshold.log10();
    match (fc_hit, p_hit) {
        (true, true) => SIGNIFICANCE[0],
        (false, true) => SIGNIFICANCE[1],
        (true, false) => SIGNIFICANCE[2],
        (false, false) => SIGNIFICANCE[3],
    }
}

/// Volcano plot: x = log2(`fc`), y = -log10(`pval`). Adds those columns and a
/// `Significance` column to the returned data.
#[allow(clippy::too_many_arguments)]
pub fn vol(
    table: &Table,
    fc: &str,
    pval: &str,
    fc_threshold: f64,
    p_threshold: f64,
    label: Option<&str>,
    style: &PlotStyle,
    dir: &Path,
    file: &str,
) -> Result<PlotOutput> {
    let fcs = table.numeric(fc)?;
    let ps = table.numeric(pval)?;
    let labels: Option<Vec<&str>> = label.map(|l| table.column(l)).transpose()?;

    let log_fc_col = format!("log2({})", fc);
    let log_p_col = format!("-log10({})", pval);
    let mut data = table.clone();
    let mut log_fc = Vec::with_capacity(table.len());
    let mut log_p = Vec::with_capacity(table.len());
    let mut classes = Vec::with_capacity(table.len());
    for (f, p) in fcs.iter().zip(&ps) {
        let lf = f.map(f64::log2).unwrap_or(f64::NAN);
        let lp = p.map(|p| -p.log10()).unwrap_or(f64::NAN);
        classes.push(significance(lf, lp, fc_threshold, p_threshold).to_string());
        log_fc.push(lf);
        log_p.push(lp);
    }
    data.add_column(&log_fc_col, log_fc.iter().map(|v| fmt_num(*v)).collect())?;
    data.add_column(&log_p_col, log_p.iter().map(|v| fmt_num(*v)).collect())?;
    data.add_column("Significance", classes.clone())?;

    let mut canvas = Canvas::new(style, true);
    let (x_lo, x_hi) = padded_range(log_fc.iter().copied(), style.x_dims);
    let x_abs = x_lo.abs().max(x_hi.abs());
    let (x_lo, x_hi) = if style.x_dims.is_some() { (x_lo, x_hi) } else { (-x_abs, x_abs) };
    let (y_lo, y_hi) = style.y_dims.unwrap_or_else(|| {
        let (_, hi) = padded_range(log_p.iter().copied(), None);
        (0.0, hi.max(1.0))
    });
    let xs = canvas.frame.x_scale(x_lo, x_hi);
    let ys = canvas.frame.y_scale(y_lo, y_hi);
    let colors = ["#d55e00", "#0173b2", "#029e73", "lightgray"];

    let f = canvas.frame;
    let fc_line = fc_threshold.log2();
    if fc_line > 0.0 {
        canvas.svg.line(xs.map(-fc_line), f.top, xs.map(-fc_line), f.bottom, "black", true);
        canvas.svg.line(xs.map(fc_line), f.top, xs.map(fc_line), f.bottom, "black", true);
    }
    let p_line = -p_threshold.log10();
    if p_line > 0.0 {
        canvas.svg.line(f.left, ys.map(p_line), f.right, ys.map(p_line), "black", true);
    }
    for (i, ((lf, lp), class)) in log_fc.iter().zip(&log_p).zip(&classes).enumerate() {
        if !lf.is_finite() || !lp.is_finite() {
            continue;
        }
        let ci = SIGNIFICANCE.iter().position(|s| s == class).unwrap_or(3);
        let tip = labels.as_ref().map(|l| l[i]);
        canvas.svg.circle(xs.map(*lf), ys.map(*lp), 3.5, colors[ci], 0.7, tip);
    }

    let x_label = if style.x_axis.is_empty() { log_fc_col.clone() } else { style.x_axis.clone() };
    let y_label = if style.y_axis.is_empty() { log_p_col.clone() } else { style.y_axis.clone() };
    canvas.x_axis_numeric(&xs, &x_label);
    canvas.y_axis(&ys, &y_label);
    let entries: Vec<(String, &str)> = SIGNIFICANCE.iter().map(|s| s.to_string()).zip(colors).collect();
    let legend = if style.legend_title.is_empty() { "Significance" } else { style.legend_title.as_str() };
    canvas.legend(legend, &entries);
    Ok(PlotOutput { path: canvas.save(dir, file)?, data: Some(data) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_round_pow_10() {
        assert_eq!(round_up_pow_10(42.0), 100.0);
        assert_eq!(round_up_pow_10(0.0), 0.0);
        assert_eq!(round_down_pow_10(42.0), 40.0);
        assert_eq!(round_down_pow_10(-42.0), -50.0);
        assert_eq!(log10(&[0.5, 100.0]), vec![0.0, 2.0]);
    }

    #[test]
    fn test_nice_ticks() {
        assert_eq!(nice_ticks(0.0, 10.0), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        let t = nice_ticks(-0.03, 0.27);
        assert_eq!(t.first().copied(), Some(0.0));
        assert_eq!(tick_label(0.05 * 3.0, &[0.0, 0.05]), "0.15");
    }

    #[test]
    fn test_palette_repeats() {
        let p = palette(12);
        assert_eq!(p.len(), 12);
        assert_eq!(p[10], p[0]);
    }

    #[test]
    fn test_histogram_edges() {
        let counts = histogram(&[0.0, 0.5, 1.0, 2.0], 2, 0.0, 2.0);
        assert_eq!(counts, vec![2, 2]);
    }

    #[test]
    fn test_significance_classes() {
        assert_eq!(significance(2.0, 3.0, 2.0, 0.05), "FC & p-value");
        assert_eq!(significance(0.1, 3.0, 2.0, 0.05), "p-value");
        assert_eq!(significance(-2.0, 0.1, 2.0, 0.05), "FC");
        assert_eq!(significance(0.1, 0.1, 2.0, 0.05), "NS");
    }

    #[test]
    fn test_scat_and_cat_write_svg() {
        let dir = TempDir::new().unwrap();
        let t = Table::from_str_rows(
            &["dose", "response", "arm"],
            &[&["1", "2.0", "a"], &["2", "3.5", "a"], &["3", "5", "b"], &["4", "", "b"]],
        )
        .unwrap();
        let style = PlotStyle::default().with_title("Dose & response");
        let out = scat(&t, ScatKind::LineScat, "dose", "response", Some("arm"), &style, dir.path(), "s.svg").unwrap();
        let svg = fs::read_to_string(&out.path).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Dose &amp; response"));
        assert_eq!(svg.matches("<circle").count(), 3);

        let out = cat(&t, "arm", "response", &[], &PlotStyle::default(), dir.path(), "c").unwrap();
        assert_eq!(out.path.extension().unwrap(), "svg");
        assert!(cat(&t, "arm", "response", &[], &PlotStyle::default(), dir.path(), "c.png").is_err());
    }

    #[test]
    fn test_stack_cutoff_and_normalize() {
        let dir = TempDir::new().unwrap();
        let t = Table::from_str_rows(
            &["sample", "edit", "fraction"],
            &[&["s1", "A", "0.6"], &["s1", "B", "0.3"], &["s1", "C", "0.05"], &["s1", "D", "0.05"]],
        )
        .unwrap();
        let opts = StackOptions { cutoff: Some(0.1), normalize: true, ..Default::default() };
        let out = stack(&t, "sample", "fraction", "edit", &opts, &PlotStyle::default(), dir.path(), "stack.svg").unwrap();
        let data = out.data.unwrap();
        assert_eq!(data.column("edit").unwrap(), vec!["A", "B", "<0.1"]);
        let total: f64 = data.numeric_values("fraction").unwrap().iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_vol_annotates_data() {
        let dir = TempDir::new().unwrap();
        let t = Table::from_str_rows(
            &["gene", "FC", "pval"],
            &[&["up", "8", "0.001"], &["flat", "1", "0.5"], &["down", "0.25", "0.2"]],
        )
        .unwrap();
        let out = vol(&t, "FC", "pval", 2.0, 0.05, Some("gene"), &PlotStyle::default(), dir.path(), "vol.svg").unwrap();
        let data = out.data.unwrap();
        assert_eq!(data.column("log2(FC)").unwrap(), vec!["3", "0", "-2"]);
        assert_eq!(data.column("Significance").unwrap(), vec!["FC & p-value", "NS", "FC"]);
        let svg = fs::read_to_string(out.path).unwrap();
        assert!(svg.contains("<title>up</title>"));
    }

    #[test]
    fn test_heat_and_dist() {
        let dir = TempDir::new().unwrap();
        let t = Table::from_str_rows(&["gene", "s1", "s2"], &[&["g1", "1", "2"], &["g2", "3", ""]]).unwrap();
        let out = heat(&t, Some("gene"), None, None, true, &PlotStyle::default(), dir.path(), "heat.svg").unwrap();
        let svg = fs::read_to_string(out.path).unwrap();
        assert!(svg.contains("#dddddd"));
        assert!(svg.contains(">3.00<"));

        let out = dist(&t, "s1", None, 4, &PlotStyle::default(), dir.path(), "dist.svg").unwrap();
        assert!(out.path.exists());
    }
}
