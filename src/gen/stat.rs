// Statistics: descriptive summaries, hypothesis tests, correlation and
// per-condition comparisons over `Table`s

use crate::gen::dist::{f_sf, hypergeom_pmf, norm_sf, ptukey_sf, t_cdf, t_sf, t_two_sided};
use crate::gen::tidy::{fmt_num, Table};
use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet};

// ============================================================================
// OPTIONS
// ============================================================================

/// Multiple-testing correction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Correction {
    Bonferroni,
    #[default]
    Holm,
    FdrBh,
    None,
}

impl Correction {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bonferroni" => Ok(Correction::Bonferroni),
            "holm" => Ok(Correction::Holm),
            "fdr_bh" => Ok(Correction::FdrBh),
            "none" => Ok(Correction::None),
            other => bail!("unknown correction '{}' (bonferroni, holm, fdr_bh, none)", other),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Correction::Bonferroni => "bonferroni",
            Correction::Holm => "holm",
            Correction::FdrBh => "fdr_bh",
            Correction::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alternative {
    #[default]
    TwoSided,
    Less,
    Greater,
}

impl Alternative {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "two-sided" | "two_sided" => Ok(Alternative::TwoSided),
            "less" => Ok(Alternative::Less),
            "greater" => Ok(Alternative::Greater),
            other => bail!("unknown alternative '{}' (two-sided, less, greater)", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorrMethod {
    #[default]
    Pearson,
    Spearman,
    Kendall,
}

impl CorrMethod {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pearson" => Ok(CorrMethod::Pearson),
            "spearman" => Ok(CorrMethod::Spearman),
            "kendall" => Ok(CorrMethod::Kendall),
            other => bail!("Invalid method: {}. Choose 'pearson', 'spearman', or 'kendall'.", other),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CorrMethod::Pearson => "pearson",
            CorrMethod::Spearman => "spearman",
            CorrMethod::Kendall => "kendall",
        }
    }
}

/// How `difference` picks its tests
#[derive(Debug, Clone)]
pub struct DifferenceOptions {
    /// Same subjects measured under each condition (paired tests)
    pub same: bool,
    /// Parametric tests (normally distributed data)
    pub para: bool,
    pub alpha: f64,
    pub method: Correction,
}

impl Default for DifferenceOptions {
    fn default() -> Self {
        DifferenceOptions {
            same: false,
            para: true,
            alpha: 0.05,
            method: Correction::Holm,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestResult {
    pub statistic: f64,
    pub p_value: f64,
}

// ============================================================================
// SUMMARY HELPERS
// ============================================================================

pub fn mean(v: &[f64]) -> f64 {
    if v.is_empty() {
        return f64::NAN;
    }
    v.iter().sum::<f64>() / v.len() as f64
}

/// Sample variance (ddof = 1)
pub fn variance(v: &[f64]) -> f64 {
    if v.len() < 2 {
        return f64::NAN;
    }
    let m = mean(v);
    v.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (v.len() - 1) as f64
}

fn sorted(v: &[f64]) -> Vec<f64> {
    let mut s = v.to_vec();
    s.sort_by(|a, b| a.total_cmp(b));
    s
}

/// Linear-interpolated quantile, `q` in [0, 1]
pub fn quantile(v: &[f64], q: f64) -> f64 {
    if v.is_empty() {
        return f64::NAN;
    }
    let s = sorted(v);
    let pos = q * (s.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    s[lo] + (s[hi] - s[lo]) * (pos - lo as f64)
}

pub fn median(v: &[f64]) -> f64 {
    quantile(v, 0.5)
}

fn central_moment(v: &[f64], k: i32) -> f64 {
    let m = mean(v);
    v.iter().map(|x| (x - m).powi(k)).sum::<f64>() / v.len() as f64
}

/// Biased sample skewness
pub fn skewness(v: &[f64]) -> f64 {
    let m2 = central_moment(v, 2);
    if v.is_empty() || m2 == 0.0 {
        return f64::NAN;
    }
    central_moment(v, 3) / m2.powf(1.5)
}

/// Biased excess kurtosis
pub fn kurtosis(v: &[f64]) -> f64 {
    let m2 = central_moment(v, 2);
    if v.is_empty() || m2 == 0.0 {
        return f64::NAN;
    }
    central_moment(v, 4) / (m2 * m2) - 3.0
}

/// Average ranks (1-based) plus the sizes of tie groups
pub fn rank_average(v: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let mut idx: Vec<usize> = (0..v.len()).collect();
    idx.sort_by(|&a, &b| v[a].total_cmp(&v[b]));
    let mut ranks = vec![0.0; v.len()];
    let mut ties = Vec::new();
    let mut i = 0;
    while i < idx.len() {
        let mut j = i;
        while j + 1 < idx.len() && v[idx[j + 1]] == v[idx[i]] {
            j += 1;
        }
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &k in &idx[i..=j] {
            ranks[k] = avg;
        }
        if j > i {
            ties.push(j - i + 1);
        }
        i = j + 1;
    }
    (ranks, ties)
}

fn tie_sum(ties: &[usize]) -> f64 {
    ties.iter().map(|&t| (t as f64).powi(3) - t as f64).sum()
}

// ============================================================================
// TESTS
// ============================================================================

fn sided_t_p(t: f64, df: f64, alternative: Alternative) -> f64 {
    match alternative {
        Alternative::TwoSided => t_two_sided(t, df),
        Alternative::Less => t_cdf(t, df),
        Alternative::Greater => t_sf(t, df),
    }
}

/// Student's two-sample t-test with pooled variance
pub fn ttest_ind(x: &[f64], y: &[f64], alternative: Alternative) -> Result<TestResult> {
    let (n1, n2) = (x.len() as f64, y.len() as f64);
    if x.len() < 2 || y.len() < 2 {
        bail!("t-test needs at least 2 observations per group (got {} and {})", x.len(), y.len());
    }
    let df = n1 + n2 - 2.0;
    let pooled = ((n1 - 1.0) * variance(x) + (n2 - 1.0) * variance(y)) / df;
    let se = (pooled * (1.0 / n1 + 1.0 / n2)).sqrt();
    let t = if se == 0.0 { f64::NAN } else { (mean(x) - mean(y)) / se };
    Ok(TestResult {
        statistic: t,
        p_value: sided_t_p(t, df, alternative),
    })
}

/// Paired t-test on x[i] - y[i]
pub fn ttest_rel(x: &[f64], y: &[f64]) -> Result<TestResult> {
    if x.len() != y.len() {
        bail!("paired test needs equal group sizes (got {} and {})", x.len(), y.len());
    }
    if x.len() < 2 {
        bail!("paired t-test needs at least 2 pairs");
    }
    let d: Vec<f64> = x.iter().zip(y).map(|(a, b)| a - b).collect();
    let n = d.len() as f64;
    let se = (variance(&d) / n).sqrt();
    let t = if se == 0.0 { f64::NAN } else { mean(&d) / se };
    Ok(TestResult {
        statistic: t,
        p_value: t_two_sided(t, n - 1.0),
    })
}

/// One-way ANOVA
pub fn f_oneway(groups: &[&[f64]]) -> Result<TestResult> {
    if groups.len() < 2 || groups.iter().any(|g| g.is_empty()) {
        bail!("ANOVA needs at least 2 non-empty groups");
    }
    let all: Vec<f64> = groups.iter().flat_map(|g| g.iter().copied()).collect();
    let grand = mean(&all);
    let ss_between: f64 = groups.iter().map(|g| g.len() as f64 * (mean(g) - grand).powi(2)).sum();
    let ss_within: f64 = groups
        .iter()
        .map(|g| {
            let m = mean(g);
            g.iter().map(|x| (x - m).powi(2)).sum::<f64>()
        })
        .sum();
    let df1 = (groups.len() - 1) as f64;
    let df2 = (all.len() - groups.len()) as f64;
    if df2 <= 0.0 {
        bail!("ANOVA needs more observations than groups");
    }
    let f = (ss_between / df1) / (ss_within / df2);
    Ok(TestResult {
        statistic: f,
        p_value: f_sf(f, df1, df2),
    })
}

/// Repeated-measures ANOVA; subject i is the i-th value of every group
pub fn repeated_anova(groups: &[&[f64]]) -> Result<TestResult> {
    let k = groups.len();
    if k < 2 {
        bail!("repeated ANOVA needs at least 2 conditions");
    }
    let n = groups[0].len();
    if n < 2 || groups.iter().any(|g| g.len() != n) {
        bail!("repeated ANOVA needs the same number (>= 2) of subjects in every condition");
    }
    let all: Vec<f64> = groups.iter().flat_map(|g| g.iter().copied()).collect();
    let grand = mean(&all);
    let ss_total: f64 = all.iter().map(|x| (x - grand).powi(2)).sum();
    let ss_cond: f64 = groups.iter().map(|g| n as f64 * (mean(g) - grand).powi(2)).sum();
    let ss_subj: f64 = (0..n)
        .map(|s| {
            let m = groups.iter().map(|g| g[s]).sum::<f64>() / k as f64;
            k as f64 * (m - grand).powi(2)
        })
        .sum();
    let ss_err = ss_total - ss_cond - ss_subj;
    let df1 = (k - 1) as f64;
    let df2 = ((k - 1) * (n - 1)) as f64;
    let f = (ss_cond / df1) / (ss_err / df2);
    Ok(TestResult {
        statistic: f,
        p_value: f_sf(f, df1, df2),
    })
}

/// Tukey HSD p-values for every pair of groups, in the order given
pub fn tukey_hsd(groups: &[(&str, &[f64])]) -> Result<Vec<(String, String, f64)>> {
    let k = groups.len();
    let n_total: usize = groups.iter().map(|(_, g)| g.len()).sum();
    if k < 2 || n_total <= k {
        bail!("Tukey HSD needs at least 2 groups and more observations than groups");
    }
    let ss_within: f64 = groups
        .iter()
        .map(|(_, g)| {
            let m = mean(g);
            g.iter().map(|x| (x - m).powi(2)).sum::<f64>()
        })
        .sum();
    let df = (n_total - k) as f64;
    let mse = ss_within / df;

    let mut out = Vec::new();
    for i in 0..k {
        for j in (i + 1)..k {
            let (a, ga) = groups[i];
            let (b, gb) = groups[j];
            let se = (mse / 2.0 * (1.0 / ga.len() as f64 + 1.0 / gb.len() as f64)).sqrt();
            let q = (mean(ga) - mean(gb)).abs() / se;
            out.push((a.to_string(), b.to_string(), ptukey_sf(q, k, df)));
        }
    }
    Ok(out)
}

/// Counts of the Mann-Whitney U statistic over all arrangements of m and n items
fn mann_whitney_counts(m: usize, n: usize) -> Vec<f64> {
    let max_u = m * n;
    // prev[i] holds the counts for (i, j - 1)
    let mut prev: Vec<Vec<f64>> = (0..=m)
        .map(|_| {
            let mut v = vec![0.0; max_u + 1];
            v[0] = 1.0;
            v
        })
        .collect();
    for j in 1..=n {
        let mut cur: Vec<Vec<f64>> = Vec::with_capacity(m + 1);
        let mut base = vec![0.0; max_u + 1];
        base[0] = 1.0;
        cur.push(base);
        for i in 1..=m {
            let mut v = prev[i].clone();
            for s in j..=max_u {
                v[s] += cur[i - 1][s - j];
            }
            cur.push(v);
        }
        prev = cur;
    }
    prev.swap_remove(m)
}

/// Two-sided Mann-Whitney U. Exact when either sample has at most 8
/// observations and there are no ties; otherwise the normal approximation
/// with tie and continuity correction.
pub fn mann_whitney_u(x: &[f64], y: &[f64]) -> Result<TestResult> {
    let (n1, n2) = (x.len(), y.len());
    if n1 == 0 || n2 == 0 {
        bail!("Mann-Whitney U needs non-empty samples");
    }
    let combined: Vec<f64> = x.iter().chain(y).copied().collect();
    let (ranks, ties) = rank_average(&combined);
    let r1: f64 = ranks[..n1].iter().sum();
    let u1 = r1 - (n1 * (n1 + 1)) as f64 / 2.0;
    let u2 = (n1 * n2) as f64 - u1;
    let u = u1.max(u2);

    let p = if (n1 <= 8 || n2 <= 8) && ties.is_empty() {
        let counts = mann_whitney_counts(n1.min(n2), n1.max(n2));
        let total: f64 = counts.iter().sum();
        let upper: f64 = counts[u.round() as usize..].iter().sum();
        2.0 * upper / total
    } else {
        let n = (n1 + n2) as f64;
        let mu = (n1 * n2) as f64 / 2.0;
        let sigma = ((n1 * n2) as f64 / 12.0 * ((n + 1.0) - tie_sum(&ties) / (n * (n - 1.0)))).sqrt();
        2.0 * norm_sf((u - mu - 0.5) / sigma)
    };
    Ok(TestResult {
        statistic: u1,
        p_value: p.min(1.0),
    })
}

/// Two-sided Wilcoxon signed-rank test on x[i] - y[i]; zero differences are dropped
pub fn wilcoxon(x: &[f64], y: &[f64]) -> Result<TestResult> {
    if x.len() != y.len() {
        bail!("paired test needs equal group sizes (got {} and {})", x.len(), y.len());
    }
    let d: Vec<f64> = x.iter().zip(y).map(|(a, b)| a - b).filter(|v| *v != 0.0).collect();
    let had_zeros = d.len() != x.len();
    let n = d.len();
    if n == 0 {
        bail!("Wilcoxon signed-rank test needs at least one non-zero difference");
    }
    let abs: Vec<f64> = d.iter().map(|v| v.abs()).collect();
    let (ranks, ties) = rank_average(&abs);
    let r_plus: f64 = ranks.iter().zip(&d).filter(|(_, v)| **v > 0.0).map(|(r, _)| r).sum();
    let r_minus: f64 = ranks.iter().zip(&d).filter(|(_, v)| **v < 0.0).map(|(r, _)| r).sum();
    let stat = r_plus.min(r_minus);

    let p = if n <= 50 && ties.is_empty() && !had_zeros {
        let max = n * (n + 1) / 2;
        let mut counts = vec![0.0; max + 1];
        counts[0] = 1.0;
        for k in 1..=n {
            for s in (k..=max).rev() {
                counts[s] += counts[s - k];
            }
        }
        let below: f64 = counts[..=(stat.round() as usize)].iter().sum();
        2.0 * below / 2f64.powi(n as i32)
    } else {
        let n = n as f64;
        let mu = n * (n + 1.0) / 4.0;
        let var = n * (n + 1.0) * (2.0 * n + 1.0) / 24.0 - tie_sum(&ties) / 48.0;
        2.0 * norm_sf(((stat - mu) / var.sqrt()).abs())
    };
    Ok(TestResult {
        statistic: stat,
        p_value: p.min(1.0),
    })
}

/// Fisher's exact test on [[a, b], [c, d]]; returns (sample odds ratio, p)
pub fn fisher_exact(a: u64, b: u64, c: u64, d: u64, alternative: Alternative) -> (f64, f64) {
    let odds = if b * c == 0 {
        if a * d == 0 { f64::NAN } else { f64::INFINITY }
    } else {
        (a * d) as f64 / (b * c) as f64
    };
    let total = a + b + c + d;
    let good = a + c;
    let draws = a + b;
    let lo = draws.saturating_sub(total - good);
    let hi = draws.min(good);
    let pmf = |k: u64| hypergeom_pmf(k, total, good, draws);
    let p = match alternative {
        Alternative::Less => (lo..=a).map(pmf).sum::<f64>(),
        Alternative::Greater => (a..=hi).map(pmf).sum::<f64>(),
        Alternative::TwoSided => {
            let observed = pmf(a) * (1.0 + 1e-7);
            (lo..=hi).map(pmf).filter(|p| *p <= observed).sum::<f64>()
        }
    };
    (odds, p.min(1.0))
}

/// Adjusted p-values and reject decisions at `alpha`
pub fn adjust_p_values(p: &[f64], method: Correction, alpha: f64) -> (Vec<f64>, Vec<bool>) {
    let m = p.len();
    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| p[a].total_cmp(&p[b]));
    let mut adj = vec![0.0; m];
    match method {
        Correction::None => adj.copy_from_slice(p),
        Correction::Bonferroni => {
            for i in 0..m {
                adj[i] = (p[i] * m as f64).min(1.0);
            }
        }
        Correction::Holm => {
            let mut running: f64 = 0.0;
            for (rank, &i) in order.iter().enumerate() {
                running = running.max(((m - rank) as f64 * p[i]).min(1.0));
                adj[i] = running;
            }
        }
        Correction::FdrBh => {
            let mut running: f64 = 1.0;
            for (rank, &i) in order.iter().enumerate().rev() {
                running = running.min(p[i] * m as f64 / (rank + 1) as f64);
                adj[i] = running.min(1.0);
            }
        }
    }
    let reject = adj.iter().map(|v| *v <= alpha).collect();
    (adj, reject)
}

// ============================================================================
// DESCRIBE
// ============================================================================

const DESCRIBE_STATS: [&str; 15] = [
    "mean", "median", "variance", "std_dev", "mad", "min", "max", "range", "skewness", "kurtosis",
    "count", "sum", "25%", "50%", "75%",
];

fn describe_values(v: &[f64]) -> Vec<String> {
    let med = median(v);
    let abs_dev: Vec<f64> = v.iter().map(|x| (x - med).abs()).collect();
    let min = v.iter().copied().fold(f64::INFINITY, f64::min);
    let max = v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let (min, max) = if v.is_empty() { (f64::NAN, f64::NAN) } else { (min, max) };
    vec![
        fmt_num(mean(v)),
        fmt_num(med),
        fmt_num(variance(v)),
        fmt_num(variance(v).sqrt()),
        fmt_num(median(&abs_dev)),
        fmt_num(min),
        fmt_num(max),
        fmt_num(max - min),
        fmt_num(skewness(v)),
        fmt_num(kurtosis(v)),
        v.len().to_string(),
        fmt_num(v.iter().sum()),
        fmt_num(quantile(v, 0.25)),
        fmt_num(quantile(v, 0.5)),
        fmt_num(quantile(v, 0.75)),
    ]
}

/// Descriptive statistics per numeric column (and per group value when `group` is set)
pub fn describe(table: &Table, cols: &[String], group: Option<&str>) -> Result<Table> {
    let cols: Vec<String> = if cols.is_empty() {
        table
            .numeric_columns()
            .into_iter()
            .filter(|c| Some(c.as_str()) != group)
            .collect()
    } else {
        cols.to_vec()
    };
    if cols.is_empty() {
        bail!("no numeric columns to describe");
    }

    let mut columns = vec!["variable".to_string()];
    if let Some(g) = group {
        columns.push(g.to_string());
    }
    columns.extend(DESCRIBE_STATS.iter().map(|s| s.to_string()));
    let mut out = Table::new(columns)?;

    for col in &cols {
        match group {
            Some(g) => {
                for (key, sub) in table.group_by(g)? {
                    let mut row = vec![col.clone(), key];
                    row.extend(describe_values(&sub.numeric_values(col)?));
                    out.push_row(row)?;
                }
            }
            None => {
                let mut row = vec![col.clone()];
                row.extend(describe_values(&table.numeric_values(col)?));
                out.push_row(row)?;
            }
        }
    }
    Ok(out)
}

// ============================================================================
// DIFFERENCE
// ============================================================================

fn null_hypothesis(reject: bool) -> String {
    if reject { "reject" } else { "fail to reject" }.to_string()
}

fn group_values(table: &Table, data_col: &str, compare_col: &str, compare: &[String]) -> Result<Vec<Vec<f64>>> {
    let data = table.numeric(data_col)?;
    let keys = table.column(compare_col)?;
    compare
        .iter()
        .map(|c| {
            let values: Vec<f64> = keys
                .iter()
                .zip(&data)
                .filter(|(k, _)| *k == c)
                .filter_map(|(_, v)| *v)
                .collect();
            if values.is_empty() {
                Err(anyhow!("no '{}' values for {}='{}'", data_col, compare_col, c))
            } else {
                Ok(values)
            }
        })
        .collect()
}

/// Pairwise tests with multiple-testing correction, one row per pair
fn pairwise<F>(
    out: &mut Table,
    test_name: &str,
    compare: &[String],
    groups: &[Vec<f64>],
    opts: &DifferenceOptions,
    test: F,
) -> Result<()>
where
    F: Fn(&[f64], &[f64]) -> Result<TestResult>,
{
    let mut comparisons = Vec::new();
    let mut p_values = Vec::new();
    for i in 0..compare.len() {
        for j in (i + 1)..compare.len() {
            let r = test(&groups[i], &groups[j])
                .with_context(|| format!("comparing {} vs {}", compare[i], compare[j]))?;
            comparisons.push(format!("{},{}", compare[i], compare[j]));
            p_values.push(r.p_value);
        }
    }
    let (_, reject) = adjust_p_values(&p_values, opts.method, opts.alpha);
    for ((comparison, p), rej) in comparisons.into_iter().zip(p_values).zip(reject) {
        out.push_row(vec![test_name.to_string(), comparison, fmt_num(p), null_hypothesis(rej)])?;
    }
    Ok(())
}

/// Chooses and runs the appropriate tests for `data_col` across the `compare`
/// values of `compare_col`. Output columns: test, comparison, p_value, null_hypothesis.
pub fn difference(
    table: &Table,
    data_col: &str,
    compare_col: &str,
    compare: &[String],
    opts: &DifferenceOptions,
) -> Result<Table> {
    if compare.len() < 2 {
        bail!("Invalid compare: need 2 or more values of '{}'", compare_col);
    }
    let groups = group_values(table, data_col, compare_col, compare)?;
    let refs: Vec<&[f64]> = groups.iter().map(Vec::as_slice).collect();
    let joined = compare.join(",");
    let method = opts.method.name();
    let mut out = Table::new(
        ["test", "comparison", "p_value", "null_hypothesis"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    )?;
    let single = |out: &mut Table, name: &str, p: f64| {
        out.push_row(vec![name.to_string(), joined.clone(), fmt_num(p), null_hypothesis(p < opts.alpha)])
    };
    let n_pairs = compare.len() * (compare.len() - 1) / 2;

    match (opts.same, opts.para) {
        (false, true) if compare.len() == 2 => {
            info!("Statistical test: Student's t-test");
            let r = ttest_ind(refs[0], refs[1], Alternative::TwoSided)?;
            single(&mut out, "Student's T-test", r.p_value)?;
        }
        (false, true) => {
            info!("Statistical tests: 1-way ANOVA, Tukey's HSD, pairwise t-tests ({} correction)", method);
            let r = f_oneway(&refs)?;
            single(&mut out, "1-way Anova Test", r.p_value)?;

            let mut labelled: Vec<(&str, &[f64])> =
                compare.iter().map(String::as_str).zip(refs.iter().copied()).collect();
            labelled.sort_by(|a, b| a.0.cmp(b.0));
            for (a, b, p) in tukey_hsd(&labelled)? {
                out.push_row(vec![
                    "Tukey's HSD Test".to_string(),
                    format!("{},{}", a, b),
                    fmt_num(p),
                    null_hypothesis(p < opts.alpha),
                ])?;
            }
            pairwise(
                &mut out,
                &format!("Student's T-test ({} correction)", method),
                compare,
                &groups,
                opts,
                |x, y| ttest_ind(x, y, Alternative::TwoSided),
            )?;
        }
        (false, false) => {
            info!("Statistical test: Mann Whitney U ({} correction)", method);
            let name = if n_pairs == 1 {
                "Mann Whitney U Test".to_string()
            } else {
                format!("Mann Whitney U Test ({} correction)", method)
            };
            pairwise(&mut out, &name, compare, &groups, opts, mann_whitney_u)?;
        }
        (true, true) if compare.len() == 2 => {
            info!("Statistical test: paired Student's t-test");
            let r = ttest_rel(refs[0], refs[1])?;
            single(&mut out, "Paired Student's T-test", r.p_value)?;
        }
        (true, true) => {
            info!("Statistical tests: repeated ANOVA, pairwise paired t-tests ({} correction)", method);
            let r = repeated_anova(&refs)?;
            single(&mut out, "Repeated Anova", r.p_value)?;
            pairwise(
                &mut out,
                &format!("Student's Paired T-test ({} correction)", method),
                compare,
                &groups,
                opts,
                ttest_rel,
            )?;
        }
        (true, false) => {
            info!("Statistical test: Wilcoxon signed-rank ({} correction)", method);
            let name = if n_pairs == 1 {
                "Wilcoxon Signed-Rank Test".to_string()
            } else {
                format!("Wilcoxon Signed-Rank Test ({} correction)", method)
            };
            pairwise(&mut out, &name, compare, &groups, opts, wilcoxon)?;
        }
    }
    Ok(out)
}

// ============================================================================
// CORRELATION
// ============================================================================

fn pearson(x: &[f64], y: &[f64]) -> f64 {
    weighted_pearson(x, y, &vec![1.0; x.len()])
}

fn weighted_pearson(x: &[f64], y: &[f64], w: &[f64]) -> f64 {
    let total: f64 = w.iter().sum();
    if x.is_empty() || total == 0.0 {
        return f64::NAN;
    }
    let w: Vec<f64> = w.iter().map(|v| v / total).collect();
    let mx: f64 = w.iter().zip(x).map(|(w, x)| w * x).sum();
    let my: f64 = w.iter().zip(y).map(|(w, y)| w * y).sum();
    let mut cov = 0.0;
    let mut sx = 0.0;
    let mut sy = 0.0;
    for i in 0..x.len() {
        cov += w[i] * (x[i] - mx) * (y[i] - my);
        sx += w[i] * (x[i] - mx).powi(2);
        sy += w[i] * (y[i] - my).powi(2);
    }
    cov / (sx.sqrt() * sy.sqrt())
}

fn sign(a: f64, b: f64) -> i8 {
    match a.partial_cmp(&b) {
        Some(std::cmp::Ordering::Greater) => 1,
        Some(std::cmp::Ordering::Less) => -1,
        _ => 0,
    }
}

/// Kendall tau-b
fn kendall(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len();
    let (mut concordant, mut discordant, mut tie_x, mut tie_y) = (0.0_f64, 0.0_f64, 0.0_f64, 0.0_f64);
    for i in 0..n {
        for j in (i + 1)..n {
            let sx = sign(x[i], x[j]);
            let sy = sign(y[i], y[j]);
            if sx == 0 && sy == 0 {
                continue;
            } else if sx == 0 {
                tie_x += 1.0;
            } else if sy == 0 {
                tie_y += 1.0;
            } else if sx == sy {
                concordant += 1.0;
            } else {
                discordant += 1.0;
            }
        }
    }
    let denom = ((concordant + discordant + tie_x) * (concordant + discordant + tie_y)).sqrt();
    if denom == 0.0 {
        f64::NAN
    } else {
        (concordant - discordant) / denom
    }
}

pub fn corr(x: &[f64], y: &[f64], method: CorrMethod) -> f64 {
    match method {
        CorrMethod::Pearson => pearson(x, y),
        CorrMethod::Spearman => pearson(&rank_average(x).0, &rank_average(y).0),
        CorrMethod::Kendall => kendall(x, y),
    }
}

/// Correlation matrix over `cols` (all numeric columns when empty), using
/// pairwise-complete observations. First column is `variable`.
pub fn correlation(table: &Table, cols: &[String], method: CorrMethod) -> Result<Table> {
    let cols: Vec<String> = if cols.is_empty() { table.numeric_columns() } else { cols.to_vec() };
    if cols.len() < 2 {
        bail!("correlation needs at least 2 numeric columns");
    }
    let data: Vec<Vec<Option<f64>>> = cols.iter().map(|c| table.numeric(c)).collect::<Result<_>>()?;

    let mut columns = vec!["variable".to_string()];
    columns.extend(cols.iter().cloned());
    let mut out = Table::new(columns)?;
    for (i, name) in cols.iter().enumerate() {
        let mut row = vec![name.clone()];
        for j in 0..cols.len() {
            let (x, y): (Vec<f64>, Vec<f64>) = data[i]
                .iter()
                .zip(&data[j])
                .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
                .unzip();
            row.push(fmt_num(corr(&x, &y, method)));
        }
        out.push_row(row)?;
    }
    debug!("{} correlation over {} columns", method.name(), cols.len());
    Ok(out)
}

/// Weighted correlation; unit weights when `w` is None. Kendall skips pairs
/// tied in either variable.
pub fn weighted_correlation(x: &[f64], y: &[f64], w: Option<&[f64]>, method: CorrMethod) -> Result<f64> {
    let unit;
    let w = match w {
        Some(w) => w,
        None => {
            unit = vec![1.0; x.len()];
            &unit
        }
    };
    if x.len() != y.len() || x.len() != w.len() {
        bail!("x, y and weights must have the same length");
    }
    Ok(match method {
        CorrMethod::Pearson => weighted_pearson(x, y, w),
        CorrMethod::Spearman => weighted_pearson(&rank_average(x).0, &rank_average(y).0, w),
        CorrMethod::Kendall => {
            let (mut num, mut den) = (0.0, 0.0);
            for i in 0..x.len() {
                for j in (i + 1)..x.len() {
                    if x[i] == x[j] || y[i] == y[j] {
                        continue;
                    }
                    let ww = w[i] * w[j];
                    num += ww * (x[i] - x[j]).signum() * (y[i] - y[j]).signum();
                    den += ww;
                }
            }
            if den == 0.0 { f64::NAN } else { num / den }
        }
    })
}

/// Regression line `y = intercept + slope * x`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub intercept: f64,
    pub slope: f64,
}

impl Line {
    pub fn at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Least-squares line
pub fn corr_line(x: &[f64], y: &[f64]) -> Result<Line> {
    weighted_corr_line(x, y, &vec![1.0; x.len()])
}

pub fn weighted_corr_line(x: &[f64], y: &[f64], w: &[f64]) -> Result<Line> {
    if x.len() != y.len() || x.len() != w.len() || x.len() < 2 {
        bail!("regression needs at least 2 points with matching x, y and weights");
    }
    let total: f64 = w.iter().sum();
    if total == 0.0 {
        bail!("weights sum to zero");
    }
    let mx: f64 = w.iter().zip(x).map(|(w, x)| w * x).sum::<f64>() / total;
    let my: f64 = w.iter().zip(y).map(|(w, y)| w * y).sum::<f64>() / total;
    let sxy: f64 = (0..x.len()).map(|i| w[i] * (x[i] - mx) * (y[i] - my)).sum();
    let sxx: f64 = (0..x.len()).map(|i| w[i] * (x[i] - mx).powi(2)).sum();
    if sxx == 0.0 {
        bail!("x has no variance; slope is undefined");
    }
    let slope = sxy / sxx;
    Ok(Line {
        intercept: my - slope * mx,
        slope,
    })
}

// ============================================================================
// COMPARISON
// ============================================================================

#[derive(Debug, Default)]
struct CondVar {
    counts: Vec<f64>,
    fpm: Vec<f64>,
    fpm_pc: Vec<f64>,
}

/// Fold change and t-test p-values of every (condition, variable) against `cond_comp`
#[allow(clippy::too_many_arguments)]
pub fn compare(
    table: &Table,
    sample: &str,
    cond: &str,
    cond_comp: &str,
    var: &str,
    count: &str,
    pseudocount: f64,
    alternative: Alternative,
) -> Result<Table> {
    let samples = table.column(sample)?;
    let conds = table.column(cond)?;
    let vars = table.column(var)?;
    let counts: Vec<f64> = table.numeric(count)?.into_iter().map(|v| v.unwrap_or(0.0)).collect();

    info!("Add pseudocount ({}) and compute fraction per million (FPM)", pseudocount);
    let mut totals: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for (s, c) in samples.iter().zip(&counts) {
        let e = totals.entry(*s).or_insert((0.0, 0));
        e.0 += c;
        e.1 += 1;
    }

    let mut grouped: BTreeMap<(String, String), CondVar> = BTreeMap::new();
    for i in 0..table.len() {
        let (total, n_rows) = totals[samples[i]];
        let total_pc = total + pseudocount * n_rows as f64;
        let fpm = if total > 0.0 { counts[i] / total * 1e6 } else { 0.0 };
        let fpm_pc = if total_pc > 0.0 {
            (counts[i] + pseudocount) / total_pc * 1e6
        } else {
            0.0
        };
        let e = grouped.entry((conds[i].to_string(), vars[i].to_string())).or_default();
        e.counts.push(counts[i]);
        e.fpm.push(fpm);
        e.fpm_pc.push(fpm_pc);
    }

    if !grouped.keys().any(|(c, _)| c == cond_comp) {
        bail!("comparison condition '{}' not found in column '{}'", cond_comp, cond);
    }

    let columns: Vec<String> = vec![
        cond.to_string(),
        var.to_string(),
        format!("{}_mean", count),
        "FPM_mean".to_string(),
        "FPM_pc_mean".to_string(),
        "FPM_pc_mean_compare".to_string(),
        "FC".to_string(),
        "log2FC".to_string(),
        "pval".to_string(),
        "tstat".to_string(),
        "-log10p".to_string(),
        "compare".to_string(),
    ];
    let mut out = Table::new(columns)?;
    info!("Compute FC and p-values relative to {}", cond_comp);
    for ((c, v), stats) in &grouped {
        if c == cond_comp {
            continue;
        }
        let Some(comp) = grouped.get(&(cond_comp.to_string(), v.clone())) else {
            debug!("skipping {}: absent from {}", v, cond_comp);
            continue;
        };
        let comp_mean = mean(&comp.fpm_pc);
        let den = if comp_mean <= 0.0 { f64::EPSILON } else { comp_mean };
        let fc = mean(&stats.fpm_pc) / den;
        let (t, p) = match ttest_ind(&stats.fpm_pc, &comp.fpm_pc, alternative) {
            Ok(r) => (r.statistic, r.p_value),
            Err(e) => {
                debug!("t-test skipped for {} {}: {:#}", c, v, e);
                (f64::NAN, f64::NAN)
            }
        };
        out.push_row(vec![
            c.clone(),
            v.clone(),
            fmt_num(mean(&stats.counts)),
            fmt_num(mean(&stats.fpm)),
            fmt_num(mean(&stats.fpm_pc)),
            fmt_num(comp_mean),
            fmt_num(fc),
            fmt_num(fc.log2()),
            fmt_num(p),
            fmt_num(t),
            fmt_num(-p.log10()),
            cond_comp.to_string(),
        ])?;
    }
    Ok(out)
}

/// Fisher exact odds ratios of every (condition, variable) against the
/// (`cond_comp`, `var_comp`) reference cells
#[allow(clippy::too_many_arguments)]
pub fn odds_ratio(
    table: &Table,
    cond: &str,
    cond_comp: &str,
    var: &str,
    var_comp: &str,
    count: &str,
    pseudocount: f64,
    alternative: Alternative,
) -> Result<Table> {
    let conds = table.column(cond)?;
    let vars = table.column(var)?;
    let counts: Vec<f64> = table.numeric(count)?.into_iter().map(|v| v.unwrap_or(0.0)).collect();

    let mut sums: BTreeMap<&str, BTreeMap<&str, f64>> = BTreeMap::new();
    for i in 0..table.len() {
        *sums.entry(conds[i]).or_default().entry(vars[i]).or_default() += counts[i];
    }
    let cell = |c: &str, v: &str| -> Result<f64> {
        sums.get(c)
            .and_then(|m| m.get(v))
            .copied()
            .ok_or_else(|| anyhow!("No data found for condition \"{}\" and variable \"{}\". Cannot compute odds ratio.", c, v))
    };
    let ref_count = cell(cond_comp, var_comp)?;
    let ref_pc = ref_count + pseudocount;

    let pc = fmt_num(pseudocount);
    let columns: Vec<String> = vec![
        cond.to_string(),
        var.to_string(),
        count.to_string(),
        format!("{}+{}", count, pc),
        format!("{}_compare_{}", count, var_comp),
        format!("{}+{}_compare_{}", count, pc, var_comp),
        format!("{}_compare_{}_{}", count, cond_comp, var_comp),
        format!("{}+{}_compare_{}_{}", count, pc, cond_comp, var_comp),
        format!("compare_{}", cond),
        format!("compare_{}", var),
        "fisher_exact_odds_ratio".to_string(),
        "fisher_exact_pval".to_string(),
    ];
    let mut out = Table::new(columns)?;
    let conditions: BTreeSet<&str> = sums.keys().copied().filter(|c| *c != cond_comp).collect();
    for c in conditions {
        let cond_ref = cell(c, var_comp)?;
        let cond_ref_pc = cond_ref + pseudocount;
        for (v, n) in &sums[c] {
            if *v == var_comp {
                continue;
            }
            let comp_v_pc = cell(cond_comp, v)? + pseudocount;
            let n_pc = n + pseudocount;
            let cells = [n_pc, cond_ref_pc, comp_v_pc, ref_pc].map(|x| x.round().max(0.0) as u64);
            let (_, p) = fisher_exact(cells[0], cells[1], cells[2], cells[3], alternative);
            let odds = (n_pc * ref_pc) / (cond_ref_pc * comp_v_pc);
            out.push_row(vec![
                c.to_string(),
                v.to_string(),
                fmt_num(*n),
                fmt_num(n_pc),
                fmt_num(cond_ref),
                fmt_num(cond_ref_pc),
                fmt_num(ref_count),
                fmt_num(ref_pc),
                cond_comp.to_string(),
                var_comp.to_string(),
                fmt_num(odds),
                fmt_num(p),
            ])?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    fn tidy(rows: &[(&str, f64)]) -> Table {
        let mut t = Table::new(vec!["group".to_string(), "value".to_string()]).unwrap();
        for (g, v) in rows {
            t.push_row(vec![g.to_string(), v.to_string()]).unwrap();
        }
        t
    }

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_summary_helpers() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(mean(&v), 2.5);
        assert!(close(variance(&v), 1.666_666_666_666_666_7, 1e-12));
        assert_eq!(median(&v), 2.5);
        assert_eq!(quantile(&v, 0.25), 1.75);
        assert!(close(skewness(&v), 0.0, 1e-12));
        assert!(close(kurtosis(&v), -1.36, 1e-12));
    }

    #[test]
    fn test_rank_average_ties() {
        let (r, ties) = rank_average(&[10.0, 20.0, 10.0, 30.0]);
        assert_eq!(r, vec![1.5, 3.0, 1.5, 4.0]);
        assert_eq!(ties, vec![2]);
    }

    #[test]
    fn test_ttests_match_reference() {
        let r = ttest_ind(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.0, 4.0, 6.0, 8.0, 10.0], Alternative::TwoSided).unwrap();
        assert!(close(r.statistic, -1.897_366_596_101_027_5, 1e-9));
        assert!(close(r.p_value, 0.094_349_772_842_437_83, 1e-6));

        let paired = ttest_rel(&[5.0, 6.0, 7.0, 8.0, 9.0], &[4.0, 4.0, 6.0, 5.0, 7.0]).unwrap();
        assert!(close(paired.p_value, 0.008_580_918_721_924_794, 1e-6));

        let less = ttest_ind(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0], Alternative::Less).unwrap();
        let greater = ttest_ind(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0], Alternative::Greater).unwrap();
        assert!(close(less.p_value + greater.p_value, 1.0, 1e-12));
        assert!(less.p_value < 0.05);
    }

    #[test]
    fn test_kendall_tau_b() {
        let tau = corr(&[1.0, 2.0, 3.0, 4.0], &[1.0, 3.0, 2.0, 4.0], CorrMethod::Kendall);
        assert!(close(tau, 4.0 / 6.0, 1e-12));
        // one tie in x: c=4, d=1, tie_x=1 -> 3 / sqrt(6 * 5)
        let tied = corr(&[1.0, 1.0, 2.0, 3.0], &[1.0, 2.0, 4.0, 3.0], CorrMethod::Kendall);
        assert!(close(tied, 3.0 / 30f64.sqrt(), 1e-12));
    }

    #[test]
    fn test_anova_and_tukey() {
        let (a, b, c) = ([1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]);
        let r = f_oneway(&[&a[..], &b[..], &c[..]]).unwrap();
        assert!(close(r.statistic, 27.0, 1e-12));
        assert!(close(r.p_value, 0.001, 1e-9));

        let pairs = tukey_hsd(&[("a", &a[..]), ("b", &b[..]), ("c", &c[..])]).unwrap();
        assert_eq!(pairs.len(), 3);
        assert!(close(pairs[0].2, 0.024_229, 1e-3));
        assert!(close(pairs[1].2, 0.000_794, 1e-4));
    }

    #[test]
    fn test_repeated_anova() {
        let (a, b, c) = ([1.0, 2.0, 3.0], [2.0, 4.0, 5.0], [3.0, 5.0, 9.0]);
        let r = repeated_anova(&[&a[..], &b[..], &c[..]]).unwrap();
        assert!(close(r.statistic, 7.913_043_478_260_9, 1e-9));
        assert!(close(r.p_value, 0.040_704_832_256_078_64, 1e-6));
        assert!(repeated_anova(&[&a[..2], &b[..1]]).is_err());
    }

    #[test]
    fn test_mann_whitney() {
        let exact = mann_whitney_u(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]).unwrap();
        assert_eq!(exact.statistic, 0.0);
        assert!(close(exact.p_value, 0.1, 1e-12));

        let ties = mann_whitney_u(&[1.0, 2.0, 2.0, 3.0, 7.0], &[2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(ties.statistic, 7.5);
        assert!(close(ties.p_value, 0.339_782_974_355_818_95, 1e-9));

        let x: Vec<f64> = (1..=10).map(f64::from).collect();
        let y: Vec<f64> = (4..14).map(|v| v as f64 + 0.5).collect();
        let large = mann_whitney_u(&x, &y).unwrap();
        assert!(close(large.p_value, 0.031_209_012_771_740_242, 1e-9));
    }

    #[test]
    fn test_wilcoxon() {
        let exact = wilcoxon(&[1.0, 2.0, 3.0, 4.0, 5.0], &[0.0; 5]).unwrap();
        assert!(close(exact.p_value, 0.0625, 1e-12));

        let approx = wilcoxon(&[5.0, 6.0, 7.0, 8.0, 9.0, 10.0], &[4.0, 4.0, 9.0, 5.0, 6.0, 4.0]).unwrap();
        assert_eq!(approx.statistic, 2.5);
        assert!(close(approx.p_value, 0.091_690_281_549_429_21, 1e-9));
    }

    #[test]
    fn test_fisher_exact() {
        let (odds, p) = fisher_exact(8, 2, 1, 5, Alternative::TwoSided);
        assert_eq!(odds, 20.0);
        assert!(close(p, 0.034_965_034_965_034_97, 1e-9));
        let (_, p) = fisher_exact(3, 1, 1, 3, Alternative::TwoSided);
        assert!(close(p, 0.485_714_285_714_285_7, 1e-9));
        let (_, p) = fisher_exact(10, 0, 0, 10, Alternative::TwoSided);
        assert!(close(p, 1.082_508_822_446_903e-5, 1e-12));
    }

    #[test]
    fn test_holm_is_monotone() {
        let p = [0.01, 0.04, 0.03, 0.005];
        let (adj, reject) = adjust_p_values(&p, Correction::Holm, 0.05);
        assert!(close(adj[3], 0.02, 1e-12));
        assert!(close(adj[0], 0.03, 1e-12));
        assert!(close(adj[2], 0.06, 1e-12));
        assert!(close(adj[1], 0.06, 1e-12));
        assert_eq!(reject, vec![true, false, false, true]);

        let (bh, _) = adjust_p_values(&p, Correction::FdrBh, 0.05);
        assert!(close(bh[1], 0.04, 1e-12));
        assert!(close(bh[3], 0.02, 1e-12));
        let (bon, _) = adjust_p_values(&p, Correction::Bonferroni, 0.05);
        assert!(close(bon[1], 0.16, 1e-12));
    }

    #[test]
    fn test_describe() {
        let t = tidy(&[("a", 1.0), ("a", 3.0), ("b", 10.0)]);
        let d = describe(&t, &[], None).unwrap();
        assert_eq!(d.len(), 1);
        assert_eq!(d.cell(0, "variable").unwrap(), "value");
        assert_eq!(d.cell(0, "count").unwrap(), "3");
        assert_eq!(d.cell(0, "median").unwrap(), "3");
        assert_eq!(d.cell(0, "range").unwrap(), "9");

        let g = describe(&t, &names(&["value"]), Some("group")).unwrap();
        assert_eq!(g.column("group").unwrap(), vec!["a", "b"]);
        assert_eq!(g.cell(0, "mean").unwrap(), "2");
        assert_eq!(g.cell(1, "variance").unwrap(), "");
    }

    #[test]
    fn test_difference_two_groups() {
        let t = tidy(&[("x", 1.0), ("x", 2.0), ("x", 3.0), ("x", 4.0), ("x", 5.0),
                       ("y", 2.0), ("y", 4.0), ("y", 6.0), ("y", 8.0), ("y", 10.0)]);
        let out = difference(&t, "value", "group", &names(&["x", "y"]), &DifferenceOptions::default()).unwrap();
        assert_eq!(out.columns, vec!["test", "comparison", "p_value", "null_hypothesis"]);
        assert_eq!(out.rows[0][0], "Student's T-test");
        assert_eq!(out.rows[0][1], "x,y");
        assert_eq!(out.rows[0][3], "fail to reject");
    }

    #[test]
    fn test_difference_three_groups_dispatch() {
        let t = tidy(&[("a", 1.0), ("a", 2.0), ("a", 3.0), ("b", 4.0), ("b", 5.0), ("b", 6.0),
                       ("c", 7.0), ("c", 8.0), ("c", 9.0)]);
        let groups = names(&["a", "b", "c"]);
        let out = difference(&t, "value", "group", &groups, &DifferenceOptions::default()).unwrap();
        let tests = out.column("test").unwrap();
        assert_eq!(tests[0], "1-way Anova Test");
        assert_eq!(tests.iter().filter(|t| **t == "Tukey's HSD Test").count(), 3);
        assert_eq!(tests.last().copied(), Some("Student's T-test (holm correction)"));
        assert_eq!(out.len(), 7);

        let opts = DifferenceOptions { para: false, ..Default::default() };
        let np = difference(&t, "value", "group", &groups, &opts).unwrap();
        assert_eq!(np.rows[0][0], "Mann Whitney U Test (holm correction)");
        assert_eq!(np.len(), 3);

        let opts = DifferenceOptions { same: true, ..Default::default() };
        let rm = difference(&t, "value", "group", &groups, &opts).unwrap();
        assert_eq!(rm.rows[0][0], "Repeated Anova");
        assert_eq!(rm.rows[1][0], "Student's Paired T-test (holm correction)");

        assert!(difference(&t, "value", "group", &names(&["a"]), &DifferenceOptions::default()).is_err());
        assert!(difference(&t, "value", "group", &names(&["a", "zzz"]), &DifferenceOptions::default()).is_err());
    }

    #[test]
    fn test_correlation_methods() {
        let t = Table::from_str_rows(
            &["x", "y", "z"],
            &[&["1", "2", "5"], &["2", "4", "3"], &["3", "6", "4"], &["4", "8", "1"]],
        )
        .unwrap();
        let m = correlation(&t, &[], CorrMethod::Pearson).unwrap();
        assert_eq!(m.columns, vec!["variable", "x", "y", "z"]);
        let r: f64 = m.cell(0, "y").unwrap().parse().unwrap();
        assert!(close(r, 1.0, 1e-12));
        let k = correlation(&t, &names(&["x", "z"]), CorrMethod::Kendall).unwrap();
        let tau: f64 = k.cell(0, "z").unwrap().parse().unwrap();
        assert!(close(tau, -2.0 / 3.0, 1e-12));
        let s = correlation(&t, &names(&["x", "z"]), CorrMethod::Spearman).unwrap();
        let rho: f64 = s.cell(0, "z").unwrap().parse().unwrap();
        assert!(close(rho, -0.8, 1e-12));
    }

    #[test]
    fn test_weighted_correlation_and_lines() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [3.0, 5.0, 7.0, 9.0];
        assert!(close(weighted_correlation(&x, &y, None, CorrMethod::Pearson).unwrap(), 1.0, 1e-12));
        let w = [1.0, 2.0, 1.0, 2.0];
        assert!(close(weighted_correlation(&x, &y, Some(&w), CorrMethod::Kendall).unwrap(), 1.0, 1e-12));
        assert!(weighted_correlation(&[1.0, 1.0], &[2.0, 3.0], None, CorrMethod::Kendall).unwrap().is_nan());

        let line = corr_line(&x, &y).unwrap();
        assert!(close(line.slope, 2.0, 1e-12));
        assert!(close(line.intercept, 1.0, 1e-12));
        assert!(close(line.at(10.0), 21.0, 1e-12));
        let wl = weighted_corr_line(&x, &y, &w).unwrap();
        assert!(close(wl.slope, 2.0, 1e-12));
        assert!(corr_line(&[1.0, 1.0], &[1.0, 2.0]).is_err());
    }

    fn counts_table() -> Table {
        Table::from_str_rows(
            &["sample", "cond", "var", "count"],
            &[
                &["s1", "ctrl", "g1", "10"],
                &["s1", "ctrl", "g2", "90"],
                &["s2", "ctrl", "g1", "12"],
                &["s2", "ctrl", "g2", "88"],
                &["s3", "trt", "g1", "40"],
                &["s3", "trt", "g2", "60"],
                &["s4", "trt", "g1", "44"],
                &["s4", "trt", "g2", "56"],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_compare_fold_change() {
        let out = compare(&counts_table(), "sample", "cond", "ctrl", "var", "count", 1.0, Alternative::TwoSided).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.column("var").unwrap(), vec!["g1", "g2"]);
        assert!(out.column("cond").unwrap().iter().all(|c| *c == "trt"));
        let fc: f64 = out.cell(0, "FC").unwrap().parse().unwrap();
        // (41/102 + 45/102) / (11/102 + 13/102)
        assert!(close(fc, 86.0 / 24.0, 1e-9));
        let log2fc: f64 = out.cell(0, "log2FC").unwrap().parse().unwrap();
        assert!(close(log2fc, fc.log2(), 1e-12));
        let p: f64 = out.cell(0, "pval").unwrap().parse().unwrap();
        assert!(p < 0.01);
        assert!(compare(&counts_table(), "sample", "cond", "nope", "var", "count", 1.0, Alternative::TwoSided).is_err());
    }

    #[test]
    fn test_odds_ratio() {
        let t = Table::from_str_rows(
            &["cond", "var", "count"],
            &[&["trt", "edit", "7"], &["trt", "null", "1"], &["ctrl", "edit", "0"], &["ctrl", "null", "4"]],
        )
        .unwrap();
        let out = odds_ratio(&t, "cond", "ctrl", "var", "null", "count", 1.0, Alternative::TwoSided).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.cell(0, "count+1").unwrap(), "8");
        // [[8, 2], [1, 5]]
        assert_eq!(out.cell(0, "fisher_exact_odds_ratio").unwrap(), "20");
        let p: f64 = out.cell(0, "fisher_exact_pval").unwrap().parse().unwrap();
        assert!(close(p, 0.034_965_034_965_034_97, 1e-9));

        assert!(odds_ratio(&t, "cond", "ctrl", "var", "missing", "count", 1.0, Alternative::TwoSided).is_err());
    }
}
