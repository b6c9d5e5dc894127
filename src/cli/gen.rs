use crate::gen::com::{self, Shell};
use crate::gen::html::{make_html_index, IndexOptions, IndexSort};
use crate::gen::io::{self, read_table, save_table};
use crate::gen::plot::{self, PlotStyle, ScatKind, StackOptions};
use crate::gen::stat::{self, Alternative, CorrMethod, Correction, DifferenceOptions};
use crate::gen::Table;
use crate::utils::parse_tuple_float;
use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table as TextTable};
use std::path::{Path, PathBuf};

use super::split_list;

#[derive(Subcommand, Debug)]
pub enum GenCmd {
    /// File and directory helpers
    #[command(subcommand)]
    Io(IoCmd),
    /// Descriptive and inferential statistics on a table
    #[command(subcommand)]
    Stat(StatCmd),
    /// SVG plots from a table
    #[command(subcommand)]
    Plot(PlotCmd),
    /// Shell environment helpers
    #[command(subcommand)]
    Com(ComCmd),
    /// Build an index.html for the HTML/PDF files in a directory
    Html(HtmlArgs),
}

pub fn run(cmd: GenCmd) -> Result<()> {
    match cmd {
        GenCmd::Io(cmd) => run_io(cmd),
        GenCmd::Stat(cmd) => run_stat(cmd),
        GenCmd::Plot(cmd) => run_plot(cmd),
        GenCmd::Com(cmd) => run_com(cmd),
        GenCmd::Html(args) => run_html(args),
    }
}

// ============================================================================
// TABLE OUTPUT
// ============================================================================

/// Where a result table goes: a file when `--dir` is given, else stdout
#[derive(Args, Debug, Clone)]
pub struct TableOut {
    /// Output directory
    #[clap(long)]
    pub dir: Option<PathBuf>,
    /// Output file name (.csv, .tsv or .txt)
    #[clap(long)]
    pub file: Option<String>,
}

impl TableOut {
    fn emit(&self, table: &Table, default_file: &str) -> Result<()> {
        match &self.dir {
            Some(dir) => {
                let file = self.file.as_deref().unwrap_or(default_file);
                let path = save_table(dir, file, table)?;
                println!("✓ Wrote {} rows to {}", table.len(), path.display());
            }
            None => println!("{}", text_table(table)),
        }
        Ok(())
    }
}

pub(crate) fn text_table(table: &Table) -> TextTable {
    let mut out = TextTable::new();
    out.load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(table.columns.clone());
    for row in &table.rows {
        out.add_row(row.clone());
    }
    out
}

// ============================================================================
// IO
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum IoCmd {
    /// Move each `name{suffix}` file into its own `name/` subdirectory
    #[command(name = "in_subs")]
    InSubs {
        #[clap(long)]
        dir: PathBuf,
        #[clap(long)]
        suffix: String,
    },
    /// Flatten nested files into the directory, renaming conflicts
    #[command(name = "out_subs")]
    OutSubs {
        #[clap(long)]
        dir: PathBuf,
    },
}

fn run_io(cmd: IoCmd) -> Result<()> {
    let moved = match cmd {
        IoCmd::InSubs { dir, suffix } => io::in_subs(&dir, &suffix)?,
        IoCmd::OutSubs { dir } => io::out_subs(&dir)?,
    };
    for path in &moved {
        println!("  {}", path.display());
    }
    println!("✓ Moved {} file(s)", moved.len());
    Ok(())
}

// ============================================================================
// STAT
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum StatCmd {
    /// Summary statistics per numeric column (optionally per group)
    Describe {
        /// Input table
        #[clap(long)]
        df: PathBuf,
        /// Comma-separated columns; all numeric columns when omitted
        #[clap(long)]
        cols: Option<String>,
        #[clap(long)]
        group: Option<String>,
        #[command(flatten)]
        out: TableOut,
    },
    /// Pairwise tests of `data_col` between groups of `compare_col`
    Difference {
        #[clap(long)]
        df: PathBuf,
        #[clap(long)]
        data_col: String,
        #[clap(long)]
        compare_col: String,
        /// Comma-separated group labels
        #[clap(long)]
        compare: String,
        /// Paired samples
        #[clap(long)]
        same: bool,
        /// Non-parametric tests
        #[clap(long)]
        nonpara: bool,
        #[clap(long, default_value_t = 0.05)]
        alpha: f64,
        /// holm or bonferroni
        #[clap(long, default_value = "holm")]
        method: String,
        #[command(flatten)]
        out: TableOut,
    },
    /// Correlation matrix
    Correlation {
        #[clap(long)]
        df: PathBuf,
        #[clap(long)]
        cols: Option<String>,
        /// pearson, spearman or kendall
        #[clap(long, default_value = "pearson")]
        method: String,
        #[command(flatten)]
        out: TableOut,
    },
    /// Per-variant fold change and significance between two conditions
    Compare {
        #[clap(long)]
        df: PathBuf,
        #[clap(long)]
        sample: String,
        #[clap(long)]
        cond: String,
        #[clap(long)]
        cond_comp: String,
        #[clap(long)]
        var: String,
        #[clap(long)]
        count: String,
        #[clap(long, default_value_t = 1.0)]
        pseudocount: f64,
        /// two-sided, less or greater
        #[clap(long, default_value = "two-sided")]
        alternative: String,
        #[command(flatten)]
        out: TableOut,
    },
    /// Odds ratios with Fisher's exact test
    #[command(name = "odds_ratio")]
    OddsRatio {
        #[clap(long)]
        df: PathBuf,
        #[clap(long)]
        cond: String,
        #[clap(long)]
        cond_comp: String,
        #[clap(long)]
        var: String,
        #[clap(long)]
        var_comp: String,
        #[clap(long)]
        count: String,
        #[clap(long, default_value_t = 1.0)]
        pseudocount: f64,
        #[clap(long, default_value = "two-sided")]
        alternative: String,
        #[command(flatten)]
        out: TableOut,
    },
}

fn run_stat(cmd: StatCmd) -> Result<()> {
    match cmd {
        StatCmd::Describe { df, cols, group, out } => {
            let table = read_table(&df)?;
            let cols = cols.map(|c| split_list(&c)).unwrap_or_default();
            out.emit(&stat::describe(&table, &cols, group.as_deref())?, "describe.csv")
        }
        StatCmd::Difference {
            df,
            data_col,
            compare_col,
            compare,
            same,
            nonpara,
            alpha,
            method,
            out,
        } => {
            let table = read_table(&df)?;
            let opts = DifferenceOptions {
                same,
                para: !nonpara,
                alpha,
                method: Correction::parse(&method)?,
            };
            let result = stat::difference(&table, &data_col, &compare_col, &split_list(&compare), &opts)?;
            out.emit(&result, "difference.csv")
        }
        StatCmd::Correlation { df, cols, method, out } => {
            let table = read_table(&df)?;
            let cols = cols.map(|c| split_list(&c)).unwrap_or_default();
            out.emit(&stat::correlation(&table, &cols, CorrMethod::parse(&method)?)?, "correlation.csv")
        }
        StatCmd::Compare {
            df,
            sample,
            cond,
            cond_comp,
            var,
            count,
            pseudocount,
            alternative,
            out,
        } => {
            let table = read_table(&df)?;
            let result = stat::compare(
                &table,
                &sample,
                &cond,
                &cond_comp,
                &var,
                &count,
                pseudocount,
                Alternative::parse(&alternative)?,
            )?;
            out.emit(&result, "compare.csv")
        }
        StatCmd::OddsRatio {
            df,
            cond,
            cond_comp,
            var,
            var_comp,
            count,
            pseudocount,
            alternative,
            out,
        } => {
            let table = read_table(&df)?;
            let result = stat::odds_ratio(
                &table,
                &cond,
                &cond_comp,
                &var,
                &var_comp,
                &count,
                pseudocount,
                Alternative::parse(&alternative)?,
            )?;
            out.emit(&result, "odds_ratio.csv")
        }
    }
}

// ============================================================================
// PLOT
// ============================================================================

#[derive(Args, Debug, Clone)]
pub struct PlotIo {
    /// Input table
    #[clap(long)]
    pub df: PathBuf,
    /// Output directory
    #[clap(long, default_value = ".")]
    pub dir: PathBuf,
    /// Output SVG file name
    #[clap(long)]
    pub file: String,
}

#[derive(Args, Debug, Clone, Default)]
pub struct StyleArgs {
    #[clap(long, default_value = "")]
    pub title: String,
    #[clap(long, default_value = "")]
    pub x_axis: String,
    #[clap(long, default_value = "")]
    pub y_axis: String,
    #[clap(long, default_value = "")]
    pub legend_title: String,
    /// Width,height in inches
    #[clap(long)]
    pub figsize: Option<String>,
    /// lo,hi
    #[clap(long)]
    pub x_dims: Option<String>,
    /// lo,hi
    #[clap(long)]
    pub y_dims: Option<String>,
    #[clap(long, default_value_t = 0.0)]
    pub x_ticks_rot: f64,
    /// Keep column names as-is in default labels
    #[clap(long)]
    pub no_space_capitalize: bool,
}

/// `"lo,hi"` → `(lo, hi)`
fn float_pair(raw: &str) -> Result<(f64, f64)> {
    match parse_tuple_float(raw)?.as_slice() {
        [a, b] => Ok((*a, *b)),
        other => bail!("expected two comma-separated numbers, got {} in '{}'", other.len(), raw),
    }
}

impl StyleArgs {
    fn style(&self) -> Result<PlotStyle> {
        let mut style = PlotStyle::default()
            .with_title(&self.title)
            .with_axes(&self.x_axis, &self.y_axis)
            .with_legend_title(&self.legend_title)
            .with_x_ticks_rot(self.x_ticks_rot)
            .with_space_capitalize(!self.no_space_capitalize);
        if let Some(raw) = &self.figsize {
            let (w, h) = float_pair(raw)?;
            style = style.with_figsize(w, h);
        }
        if let Some(raw) = &self.x_dims {
            let (lo, hi) = float_pair(raw)?;
            style = style.with_x_dims(lo, hi);
        }
        if let Some(raw) = &self.y_dims {
            let (lo, hi) = float_pair(raw)?;
            style = style.with_y_dims(lo, hi);
        }
        Ok(style)
    }
}

#[derive(Subcommand, Debug)]
pub enum PlotCmd {
    /// Scatter or line plot
    Scat {
        #[command(flatten)]
        io: PlotIo,
        #[clap(long)]
        x: String,
        #[clap(long)]
        y: String,
        #[clap(long)]
        cols: Option<String>,
        /// scat, line or line_scat
        #[clap(long = "typ", default_value = "scat")]
        kind: String,
        #[command(flatten)]
        style: StyleArgs,
    },
    /// Mean per category with individual points
    Cat {
        #[command(flatten)]
        io: PlotIo,
        #[clap(long)]
        x: String,
        #[clap(long)]
        y: String,
        /// Comma-separated category order
        #[clap(long)]
        cats_ord: Option<String>,
        #[command(flatten)]
        style: StyleArgs,
    },
    /// Histogram
    Dist {
        #[command(flatten)]
        io: PlotIo,
        #[clap(long)]
        x: String,
        #[clap(long)]
        cols: Option<String>,
        #[clap(long, default_value_t = 20)]
        bins: usize,
        #[command(flatten)]
        style: StyleArgs,
    },
    /// Heatmap of the numeric columns
    Heat {
        #[command(flatten)]
        io: PlotIo,
        /// Column holding row labels
        #[clap(long)]
        index: Option<String>,
        /// lo,hi color range
        #[clap(long)]
        vals_dims: Option<String>,
        #[clap(long)]
        center: Option<f64>,
        /// Print values in the cells
        #[clap(long)]
        annot: bool,
        #[command(flatten)]
        style: StyleArgs,
    },
    /// Stacked bars of mean `y` per `x` and `cols`
    Stack {
        #[command(flatten)]
        io: PlotIo,
        #[clap(long)]
        x: String,
        #[clap(long)]
        y: String,
        #[clap(long)]
        cols: String,
        #[clap(long)]
        x_ord: Option<String>,
        #[clap(long)]
        cols_ord: Option<String>,
        /// Scale each bar to sum to 1
        #[clap(long)]
        normalize: bool,
        /// Pool segments below this value
        #[clap(long)]
        cutoff: Option<f64>,
        #[command(flatten)]
        style: StyleArgs,
    },
    /// Volcano plot of fold change against p-value
    Vol {
        #[command(flatten)]
        io: PlotIo,
        #[clap(long)]
        fc: String,
        #[clap(long)]
        pval: String,
        #[clap(long, default_value_t = 2.0)]
        fc_threshold: f64,
        #[clap(long, default_value_t = 0.05)]
        pval_threshold: f64,
        /// Column with point labels for significant hits
        #[clap(long)]
        label: Option<String>,
        #[command(flatten)]
        style: StyleArgs,
    },
}

fn run_plot(cmd: PlotCmd) -> Result<()> {
    let output = match cmd {
        PlotCmd::Scat {
            io,
            x,
            y,
            cols,
            kind,
            style,
        } => plot::scat(
            &read_table(&io.df)?,
            ScatKind::parse(&kind)?,
            &x,
            &y,
            cols.as_deref(),
            &style.style()?,
            &io.dir,
            &io.file,
        )?,
        PlotCmd::Cat {
            io,
            x,
            y,
            cats_ord,
            style,
        } => {
            let order = cats_ord.map(|c| split_list(&c)).unwrap_or_default();
            plot::cat(&read_table(&io.df)?, &x, &y, &order, &style.style()?, &io.dir, &io.file)?
        }
        PlotCmd::Dist {
            io,
            x,
            cols,
            bins,
            style,
        } => plot::dist(&read_table(&io.df)?, &x, cols.as_deref(), bins, &style.style()?, &io.dir, &io.file)?,
        PlotCmd::Heat {
            io,
            index,
            vals_dims,
            center,
            annot,
            style,
        } => {
            let dims = vals_dims.as_deref().map(float_pair).transpose()?;
            plot::heat(
                &read_table(&io.df)?,
                index.as_deref(),
                dims,
                center,
                annot,
                &style.style()?,
                &io.dir,
                &io.file,
            )?
        }
        PlotCmd::Stack {
            io,
            x,
            y,
            cols,
            x_ord,
            cols_ord,
            normalize,
            cutoff,
            style,
        } => {
            let options = StackOptions {
                x_ord: x_ord.map(|c| split_list(&c)).unwrap_or_default(),
                cols_ord: cols_ord.map(|c| split_list(&c)).unwrap_or_default(),
                normalize,
                cutoff,
            };
            plot::stack(&read_table(&io.df)?, &x, &y, &cols, &options, &style.style()?, &io.dir, &io.file)?
        }
        PlotCmd::Vol {
            io,
            fc,
            pval,
            fc_threshold,
            pval_threshold,
            label,
            style,
        } => plot::vol(
            &read_table(&io.df)?,
            &fc,
            &pval,
            fc_threshold,
            pval_threshold,
            label.as_deref(),
            &style.style()?,
            &io.dir,
            &io.file,
        )?,
    };
    println!("✓ Wrote {}", output.path.display());
    Ok(())
}

// ============================================================================
// COM
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ComCmd {
    /// Append `export NAME="path"` to the shell config
    #[command(name = "create_export_var")]
    CreateExportVar {
        name: String,
        pt: String,
        /// bash or zsh; detected from $SHELL when omitted
        #[clap(long)]
        shell: Option<String>,
    },
    /// List the exports in the shell config
    #[command(name = "view_export_vars")]
    ViewExportVars {
        #[clap(long)]
        shell: Option<String>,
    },
}

fn parse_shell(raw: Option<&str>) -> Result<Option<Shell>> {
    raw.map(Shell::parse).transpose()
}

fn run_com(cmd: ComCmd) -> Result<()> {
    match cmd {
        ComCmd::CreateExportVar { name, pt, shell } => {
            let outcome = com::create_export_var(&name, &pt, parse_shell(shell.as_deref())?)?;
            println!("{}", outcome.summary());
        }
        ComCmd::ViewExportVars { shell } => {
            for line in com::view_export_vars(parse_shell(shell.as_deref())?)? {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

// ============================================================================
// HTML
// ============================================================================

#[derive(Args, Debug)]
pub struct HtmlArgs {
    /// Directory to index
    #[clap(long, default_value = ".")]
    pub dir: PathBuf,
    #[clap(long, default_value = "index.html")]
    pub file: String,
    #[clap(long)]
    pub recursive: bool,
    /// Comma-separated file names to skip
    #[clap(long)]
    pub exclude: Option<String>,
    /// title, name or mtime
    #[clap(long, default_value = "title")]
    pub sort: String,
    /// List links only, without embedded previews
    #[clap(long)]
    pub no_preview: bool,
    #[clap(long, default_value_t = 3)]
    pub grid_cols: usize,
    /// Extra extensions to include, e.g. png,svg
    #[clap(long)]
    pub image_types: Option<String>,
    #[clap(long, default_value_t = 900)]
    pub preview_height: u32,
}

impl HtmlArgs {
    fn options(&self) -> Result<IndexOptions> {
        let mut options = IndexOptions {
            file: self.file.clone(),
            recursive: self.recursive,
            sort: IndexSort::parse(&self.sort)?,
            preview: !self.no_preview,
            grid_cols: self.grid_cols,
            preview_height_px: self.preview_height,
            ..Default::default()
        };
        if let Some(raw) = &self.exclude {
            options.exclude.extend(split_list(raw));
        }
        if let Some(raw) = &self.image_types {
            options.image_types = split_list(raw);
        }
        Ok(options)
    }
}

fn run_html(args: HtmlArgs) -> Result<()> {
    let path = make_html_index(Path::new(&args.dir), &args.options()?)?;
    println!("✓ Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    fn gen(args: &[&str]) -> GenCmd {
        let mut argv = vec!["ind", "gen"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Gen(cmd) => cmd,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_float_pair() {
        assert_eq!(float_pair("1,2.5").unwrap(), (1.0, 2.5));
        assert!(float_pair("1").is_err());
        assert!(float_pair("1,2,3").is_err());
    }

    #[test]
    fn test_style_args() {
        let args = StyleArgs {
            title: "T".to_string(),
            figsize: Some("8,4".to_string()),
            y_dims: Some("0,10".to_string()),
            no_space_capitalize: true,
            ..Default::default()
        };
        let style = args.style().unwrap();
        assert_eq!(style.title, "T");
        assert_eq!(style.figsize, (8.0, 4.0));
        assert_eq!(style.y_dims, Some((0.0, 10.0)));
        assert!(!style.space_capitalize);
    }

    #[test]
    fn test_underscore_subcommand_names() {
        assert!(matches!(
            gen(&["io", "out_subs", "--dir", "x"]),
            GenCmd::Io(IoCmd::OutSubs { .. })
        ));
        assert!(matches!(
            gen(&["stat", "odds_ratio", "--df", "a.csv", "--cond", "c", "--cond-comp", "d", "--var", "v",
                "--var-comp", "w", "--count", "n"]),
            GenCmd::Stat(StatCmd::OddsRatio { .. })
        ));
        assert!(matches!(
            gen(&["com", "view_export_vars", "--shell", "zsh"]),
            GenCmd::Com(ComCmd::ViewExportVars { .. })
        ));
    }

    #[test]
    fn test_html_options() {
        let GenCmd::Html(args) = gen(&["html", "--exclude", "skip.html", "--sort", "mtime", "--no-preview"]) else {
            panic!("expected html");
        };
        let options = args.options().unwrap();
        assert!(options.exclude.contains(&"index.html".to_string()));
        assert!(options.exclude.contains(&"skip.html".to_string()));
        assert_eq!(options.sort, IndexSort::Mtime);
        assert!(!options.preview);
    }

    #[test]
    fn test_describe_writes_file() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in.csv");
        fs::write(&input, "g,v\na,1\na,3\nb,5\n").unwrap();
        let out_dir = tmp.path().join("out");
        let cmd = gen(&[
            "stat",
            "describe",
            "--df",
            input.to_str().unwrap(),
            "--dir",
            out_dir.to_str().unwrap(),
        ]);
        run(cmd).unwrap();
        let table = read_table(&out_dir.join("describe.csv")).unwrap();
        assert!(!table.is_empty());
    }

    #[test]
    fn test_text_table_has_header() {
        let table = Table::from_str_rows(&["a", "b"], &[&["1", "2"]]).unwrap();
        let text = text_table(&table).to_string();
        assert!(text.contains('a'));
        assert!(text.contains('2'));
    }
}
