// Tidy: a small string-celled table plus reshaping helpers

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

// ============================================================================
// TABLE
// ============================================================================

/// Column-named rows of string cells. Every row has `columns.len()` cells.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Empty table; fails on duplicate column names
    pub fn new(columns: Vec<String>) -> Result<Self> {
        Table::from_rows(columns, Vec::new())
    }

    fn empty_like(&self) -> Self {
        Table {
            columns: self.columns.clone(),
            rows: Vec::new(),
        }
    }

    /// Build from columns + rows, validating widths and uniqueness
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for col in &columns {
            if !seen.insert(col.as_str()) {
                bail!("duplicate column name '{}'", col);
            }
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                bail!(
                    "row {} has {} cells but table has {} columns",
                    i,
                    row.len(),
                    columns.len()
                );
            }
        }
        Ok(Table { columns, rows })
    }

    /// Convenience for literals in code and tests
    pub fn from_str_rows(columns: &[&str], rows: &[&[&str]]) -> Result<Self> {
        Table::from_rows(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| anyhow!("column '{}' not found (have: {})", name, self.columns.join(", ")))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn push_row(&mut self, row: Vec<String>) -> Result<()> {
        if row.len() != self.columns.len() {
            bail!("row has {} cells but table has {} columns", row.len(), self.columns.len());
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn cell(&self, row: usize, col: &str) -> Result<&str> {
        let idx = self.index_of(col)?;
        self.rows
            .get(row)
            .map(|r| r[idx].as_str())
            .ok_or_else(|| anyhow!("row {} out of range", row))
    }

    pub fn column(&self, name: &str) -> Result<Vec<&str>> {
        let idx = self.index_of(name)?;
        Ok(self.rows.iter().map(|r| r[idx].as_str()).collect())
    }

    /// Parsed numeric column; empty/unparsable cells become `None`
    pub fn numeric(&self, name: &str) -> Result<Vec<Option<f64>>> {
        Ok(self.column(name)?.into_iter().map(parse_number).collect())
    }

    /// Numeric column with missing values dropped
    pub fn numeric_values(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self.numeric(name)?.into_iter().flatten().collect())
    }

    /// Columns where every non-empty cell parses as a number
    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(i, _)| {
                let mut any = false;
                for row in &self.rows {
                    let cell = row[*i].trim();
                    if cell.is_empty() {
                        continue;
                    }
                    if parse_number(cell).is_none() {
                        return false;
                    }
                    any = true;
                }
                any
            })
            .map(|(_, c)| c.clone())
            .collect()
    }

    pub fn add_column(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        if self.has_column(name) {
            bail!("column '{}' already exists", name);
        }
        if values.len() != self.rows.len() {
            bail!(
                "column '{}' has {} values but table has {} rows",
                name,
                values.len(),
                self.rows.len()
            );
        }
        self.columns.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }

    pub fn drop_columns(&self, names: &[&str]) -> Result<Table> {
        for n in names {
            self.index_of(n)?;
        }
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|i| !names.contains(&self.columns[*i].as_str()))
            .collect();
        Ok(self.project(&keep))
    }

    pub fn select(&self, names: &[&str]) -> Result<Table> {
        let idx: Vec<usize> = names
            .iter()
            .map(|n| self.index_of(n))
            .collect::<Result<_>>()?;
        let projected = self.project(&idx);
        Table::from_rows(projected.columns, projected.rows)
    }

    fn project(&self, idx: &[usize]) -> Table {
        Table {
            columns: idx.iter().map(|i| self.columns[*i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| idx.iter().map(|i| r[*i].clone()).collect())
                .collect(),
        }
    }

    pub fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        if from != to && self.has_column(to) {
            bail!("column '{}' already exists", to);
        }
        let idx = self.index_of(from)?;
        self.columns[idx] = to.to_string();
        Ok(())
    }

    pub fn filter<F>(&self, col: &str, pred: F) -> Result<Table>
    where
        F: Fn(&str) -> bool,
    {
        let idx = self.index_of(col)?;
        Ok(Table {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|r| pred(&r[idx]))
                .cloned()
                .collect(),
        })
    }

    /// Stable sort; numeric sorts put missing values last
    pub fn sort_by(&mut self, col: &str, numeric: bool, descending: bool) -> Result<()> {
        let idx = self.index_of(col)?;
        self.rows.sort_by(|a, b| {
            let ord = if numeric {
                match (parse_number(&a[idx]), parse_number(&b[idx])) {
                    (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                    (Some(_), None) => return Ordering::Less,
                    (None, Some(_)) => return Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            } else {
                natural_cmp(&a[idx], &b[idx])
            };
            if descending {
                ord.reverse()
            } else {
                ord
            }
        });
        Ok(())
    }

    /// Distinct values in first-seen order
    pub fn unique(&self, col: &str) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for v in self.column(col)? {
            if seen.insert(v) {
                out.push(v.to_string());
            }
        }
        Ok(out)
    }

    pub fn group_by(&self, col: &str) -> Result<BTreeMap<String, Table>> {
        let idx = self.index_of(col)?;
        let mut groups: BTreeMap<String, Table> = BTreeMap::new();
        for row in &self.rows {
            groups
                .entry(row[idx].clone())
                .or_insert_with(|| self.empty_like())
                .rows
                .push(row.clone());
        }
        Ok(groups)
    }

    /// Concatenate rows of tables with identical columns
    pub fn concat(tables: &[Table]) -> Result<Table> {
        let Some(first) = tables.first() else {
            return Ok(Table::default());
        };
        let mut out = first.empty_like();
        for t in tables {
            if t.columns != out.columns {
                bail!("cannot concatenate tables with different columns");
            }
            out.rows.extend(t.rows.iter().cloned());
        }
        Ok(out)
    }
}

pub fn parse_number(cell: &str) -> Option<f64> {
    let t = cell.trim();
    if t.is_empty() {
        return None;
    }
    match t.to_ascii_lowercase().as_str() {
        "nan" | "na" | "n/a" | "none" | "null" => None,
        _ => t.parse::<f64>().ok().filter(|v| !v.is_nan()),
    }
}

/// Format a float for a table cell (NaN → empty)
pub fn fmt_num(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else if v.is_infinite() {
        if v > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else {
        format!("{}", v)
    }
}

// ============================================================================
// RESHAPING
// ============================================================================

/// Long → wide: one row per `index` value, one column per `columns` value
pub fn pivot(table: &Table, index: &str, columns: &str, values: &str) -> Result<Table> {
    let (ii, ci, vi) = (table.index_of(index)?, table.index_of(columns)?, table.index_of(values)?);
    let row_keys = table.unique(index)?;
    let col_keys = table.unique(columns)?;
    let mut out_cols = vec![index.to_string()];
    out_cols.extend(col_keys.iter().cloned());

    let mut rows: Vec<Vec<String>> = row_keys
        .iter()
        .map(|k| {
            let mut r = vec![String::new(); out_cols.len()];
            r[0] = k.clone();
            r
        })
        .collect();
    let mut filled = HashSet::new();
    for row in &table.rows {
        let r = row_keys.iter().position(|k| *k == row[ii]).unwrap_or_default();
        let c = 1 + col_keys.iter().position(|k| *k == row[ci]).unwrap_or_default();
        if !filled.insert((r, c)) {
            bail!("duplicate entry for ({}, {}) while pivoting", row[ii], row[ci]);
        }
        rows[r][c] = row[vi].clone();
    }
    Table::from_rows(out_cols, rows)
}

/// Wide → long: every non-id column becomes a (variable, value) row
pub fn melt(table: &Table, id_vars: &[&str], var_name: &str, value_name: &str) -> Result<Table> {
    let id_idx: Vec<usize> = id_vars
        .iter()
        .map(|c| table.index_of(c))
        .collect::<Result<_>>()?;
    let value_idx: Vec<usize> = (0..table.width()).filter(|i| !id_idx.contains(i)).collect();

    let mut columns: Vec<String> = id_vars.iter().map(|c| c.to_string()).collect();
    columns.push(var_name.to_string());
    columns.push(value_name.to_string());

    let mut rows = Vec::with_capacity(table.len() * value_idx.len());
    for vi in &value_idx {
        for row in &table.rows {
            let mut out: Vec<String> = id_idx.iter().map(|i| row[*i].clone()).collect();
            out.push(table.columns[*vi].clone());
            out.push(row[*vi].clone());
            rows.push(out);
        }
    }
    Table::from_rows(columns, rows)
}

/// Split `col` on `sep` into the `into` columns (missing parts are empty)
pub fn split_column(table: &Table, col: &str, sep: &str, into: &[&str]) -> Result<Table> {
    let idx = table.index_of(col)?;
    let mut out = table.clone();
    let mut new_cols: Vec<Vec<String>> = vec![Vec::with_capacity(table.len()); into.len()];
    for row in &table.rows {
        let mut parts = row[idx].splitn(into.len(), sep);
        for values in new_cols.iter_mut() {
            values.push(parts.next().unwrap_or("").to_string());
        }
    }
    for (name, values) in into.iter().zip(new_cols) {
        out.add_column(name, values)?;
    }
    Ok(out)
}

/// Join `cols` with `sep` into a new column `into`
pub fn join_columns(table: &Table, cols: &[&str], sep: &str, into: &str) -> Result<Table> {
    let idx: Vec<usize> = cols.iter().map(|c| table.index_of(c)).collect::<Result<_>>()?;
    let values = table
        .rows
        .iter()
        .map(|r| {
            idx.iter()
                .map(|i| r[*i].as_str())
                .collect::<Vec<_>>()
                .join(sep)
        })
        .collect();
    let mut out = table.clone();
    out.add_column(into, values)?;
    Ok(out)
}

// ============================================================================
// STRING HELPERS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum KeyPart {
    Num(u128),
    Text(String),
}

/// Natural sort key: "a2" < "a10"
pub fn natural_key(s: &str) -> Vec<KeyPart> {
    let mut parts = Vec::new();
    let mut digits = String::new();
    let mut text = String::new();
    for ch in s.chars() {
        if ch.is_ascii_digit() {
            if !text.is_empty() {
                parts.push(KeyPart::Text(std::mem::take(&mut text).to_lowercase()));
            }
            digits.push(ch);
        } else {
            if !digits.is_empty() {
                parts.push(KeyPart::Num(digits.parse().unwrap_or(u128::MAX)));
                digits.clear();
            }
            text.push(ch);
        }
    }
    if !digits.is_empty() {
        parts.push(KeyPart::Num(digits.parse().unwrap_or(u128::MAX)));
    }
    if !text.is_empty() {
        parts.push(KeyPart::Text(text.to_lowercase()));
    }
    parts
}

pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_key(a).cmp(&natural_key(b)).then_with(|| a.cmp(b))
}

/// "fold_change" → "Fold Change"
pub fn re_un_cap(s: &str) -> String {
    s.replace('_', " ")
        .split(' ')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_str_rows(
            &["id", "a", "b"],
            &[&["x", "1", "4"], &["y", "2", ""], &["z", "3", "6"]],
        )
        .unwrap()
    }

    #[test]
    fn test_from_rows_validates() {
        assert!(Table::from_str_rows(&["a", "a"], &[]).is_err());
        assert!(Table::from_str_rows(&["a", "b"], &[&["1"]]).is_err());
    }

    #[test]
    fn test_numeric_access() {
        let t = sample();
        assert_eq!(t.numeric("b").unwrap(), vec![Some(4.0), None, Some(6.0)]);
        assert_eq!(t.numeric_values("b").unwrap(), vec![4.0, 6.0]);
        assert_eq!(t.numeric_columns(), vec!["a".to_string(), "b".to_string()]);
        assert!(t.numeric("missing").is_err());
    }

    #[test]
    fn test_select_drop_rename() {
        let mut t = sample();
        assert_eq!(t.select(&["b", "id"]).unwrap().columns, vec!["b", "id"]);
        assert_eq!(t.drop_columns(&["a"]).unwrap().columns, vec!["id", "b"]);
        t.rename("a", "alpha").unwrap();
        assert!(t.has_column("alpha"));
        assert!(t.rename("alpha", "b").is_err());
    }

    #[test]
    fn test_sort_and_filter() {
        let mut t = sample();
        t.sort_by("b", true, true).unwrap();
        assert_eq!(t.column("id").unwrap(), vec!["z", "x", "y"]);
        let f = t.filter("id", |v| v != "x").unwrap();
        assert_eq!(f.len(), 2);
    }

    #[test]
    fn test_group_by_and_unique() {
        let t = Table::from_str_rows(
            &["g", "v"],
            &[&["b", "1"], &["a", "2"], &["b", "3"]],
        )
        .unwrap();
        let groups = t.group_by("g").unwrap();
        assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(groups["b"].len(), 2);
        assert_eq!(t.unique("g").unwrap(), vec!["b", "a"]);
    }

    #[test]
    fn test_melt() {
        let t = sample();
        let long = melt(&t, &["id"], "variable", "value").unwrap();
        assert_eq!(long.columns, vec!["id", "variable", "value"]);
        assert_eq!(long.len(), 6);
        assert_eq!(long.rows[0], vec!["x", "a", "1"]);
        assert_eq!(long.rows[3], vec!["x", "b", "4"]);
    }

    #[test]
    fn test_column_names_stay_unique() {
        assert!(Table::new(vec!["a".into(), "a".into()]).is_err());
        assert!(Table::new(vec!["a".into(), "b".into()]).unwrap().is_empty());

        let t = sample();
        assert!(melt(&t, &["id"], "id", "value").is_err());
        assert!(melt(&t, &["id"], "variable", "variable").is_err());
        assert!(t.select(&["a", "a"]).is_err());
    }

    #[test]
    fn test_pivot() {
        let long = Table::from_str_rows(
            &["gene", "sample", "count"],
            &[&["g1", "s1", "5"], &["g1", "s2", "7"], &["g2", "s1", "1"]],
        )
        .unwrap();
        let wide = pivot(&long, "gene", "sample", "count").unwrap();
        assert_eq!(wide.columns, vec!["gene", "s1", "s2"]);
        assert_eq!(wide.rows[0], vec!["g1", "5", "7"]);
        assert_eq!(wide.rows[1], vec!["g2", "1", ""]);

        let dup = Table::from_str_rows(&["a", "b", "v"], &[&["x", "y", "1"], &["x", "y", "2"]]).unwrap();
        assert!(pivot(&dup, "a", "b", "v").is_err());
    }

    #[test]
    fn test_split_and_join_columns() {
        let t = Table::from_str_rows(&["name"], &[&["BRCA1_exon2"], &["TP53"]]).unwrap();
        let split = split_column(&t, "name", "_", &["gene", "region"]).unwrap();
        assert_eq!(split.column("gene").unwrap(), vec!["BRCA1", "TP53"]);
        assert_eq!(split.column("region").unwrap(), vec!["exon2", ""]);
        let joined = join_columns(&split, &["gene", "region"], "-", "id").unwrap();
        assert_eq!(joined.column("id").unwrap(), vec!["BRCA1-exon2", "TP53-"]);
    }

    #[test]
    fn test_natural_sort() {
        let mut names = vec!["a10", "a2", "A1", "b"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["A1", "a2", "a10", "b"]);
    }

    #[test]
    fn test_re_un_cap() {
        assert_eq!(re_un_cap("fold_change"), "Fold Change");
        assert_eq!(re_un_cap("p"), "P");
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(" 1.5 "), Some(1.5));
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(fmt_num(f64::NAN), "");
        assert_eq!(fmt_num(2.0), "2");
    }
}
