use crate::ncbi::{EFetch, ELink, ESearch, ESummary, EntrezClient, EutilsBody, NcbiConfig};
use crate::utils::mkdir;
use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use std::fs;
use std::path::PathBuf;

use super::print_json;

const ELINK_COMMANDS: [&str; 9] = [
    "neighbor",
    "neighbor_score",
    "neighbor_history",
    "acheck",
    "ncheck",
    "lcheck",
    "llinks",
    "llinkslib",
    "prlinks",
];

#[derive(Args, Debug)]
pub struct NcbiArgs {
    /// Contact email; falls back to NCBI_EMAIL, then the config store
    #[clap(long, global = true)]
    pub email: Option<String>,
    /// Raises the rate limit to 10 requests/s
    #[clap(long, global = true)]
    pub api_key: Option<String>,
    #[clap(long, global = true, default_value = "ind-ncbi")]
    pub tool: String,
    #[clap(long, global = true, default_value_t = 30.0)]
    pub timeout: f64,
    #[clap(long, global = true)]
    pub compact: bool,
    #[command(subcommand)]
    pub command: NcbiCmd,
}

#[derive(Subcommand, Debug)]
pub enum NcbiCmd {
    /// Search a database for UIDs
    Esearch {
        /// pubmed, nucleotide, gene, ...
        db: String,
        term: String,
        #[clap(long, default_value_t = 20)]
        retmax: u32,
        #[clap(long, default_value_t = 0)]
        retstart: u32,
        /// Do not keep results on the History server
        #[clap(long)]
        no_usehistory: bool,
        #[clap(long)]
        sort: Option<String>,
        #[clap(long)]
        field: Option<String>,
        #[clap(long)]
        datetype: Option<String>,
        #[clap(long)]
        mindate: Option<String>,
        #[clap(long)]
        maxdate: Option<String>,
        #[clap(long)]
        webenv: Option<String>,
        #[clap(long)]
        query_key: Option<String>,
        /// uilist or count
        #[clap(long)]
        rettype: Option<String>,
        /// json or xml
        #[clap(long, default_value = "json")]
        retmode: String,
        #[clap(long)]
        idtype: Option<String>,
        #[clap(long)]
        reldate: Option<u32>,
    },
    /// Document summaries for UIDs or a History set
    Esummary {
        db: String,
        #[clap(long, num_args = 1..)]
        ids: Vec<String>,
        #[clap(long)]
        webenv: Option<String>,
        #[clap(long)]
        query_key: Option<String>,
        #[clap(long, default_value_t = 0)]
        retstart: u32,
        #[clap(long)]
        retmax: Option<u32>,
        #[clap(long, default_value = "json")]
        retmode: String,
        /// ESummary XML version, e.g. 2.0
        #[clap(long = "esummary-version")]
        version: Option<String>,
    },
    /// Full records in the requested format
    Efetch {
        db: String,
        #[clap(long, num_args = 1..)]
        ids: Vec<String>,
        /// fasta, gb, abstract, ...
        #[clap(long)]
        rettype: Option<String>,
        /// xml, text or html
        #[clap(long, default_value = "xml")]
        retmode: String,
        #[clap(long, default_value_t = 0)]
        retstart: u32,
        #[clap(long)]
        retmax: Option<u32>,
        /// 1 (plus) or 2 (minus)
        #[clap(long)]
        strand: Option<u8>,
        #[clap(long)]
        seq_start: Option<u64>,
        #[clap(long)]
        seq_stop: Option<u64>,
        /// 0..=4
        #[clap(long)]
        complexity: Option<u8>,
        #[clap(long)]
        webenv: Option<String>,
        #[clap(long)]
        query_key: Option<String>,
    },
    /// Database list, or field and link info for one database
    Einfo {
        #[clap(long)]
        db: Option<String>,
        #[clap(long = "einfo-version")]
        version: Option<String>,
        #[clap(long, default_value = "json")]
        retmode: String,
    },
    /// Links between databases
    Elink {
        dbfrom: String,
        #[clap(long)]
        db: Option<String>,
        #[clap(long, num_args = 1..)]
        ids: Vec<String>,
        /// e.g. pubmed_pubmed
        #[clap(long)]
        linkname: Option<String>,
        #[clap(long, default_value = "neighbor")]
        cmd: String,
        #[clap(long)]
        term: Option<String>,
        #[clap(long)]
        holding: Option<String>,
        #[clap(long)]
        datetype: Option<String>,
        #[clap(long)]
        reldate: Option<u32>,
        #[clap(long)]
        mindate: Option<String>,
        #[clap(long)]
        maxdate: Option<String>,
        #[clap(long)]
        idtype: Option<String>,
        #[clap(long, default_value = "json")]
        retmode: String,
    },
    /// Hit counts across all databases
    Egquery {
        term: String,
    },
    /// Spelling suggestion for a query
    Espell {
        db: String,
        term: String,
    },
    /// Match citations to PMIDs
    Ecitmatch {
        /// `journal|year|volume|first_page|author|key|` lines
        #[clap(long)]
        bdata: Option<String>,
        #[clap(long)]
        bdata_file: Option<PathBuf>,
        #[clap(long, default_value = "xml")]
        retmode: String,
    },
    /// Search PubMed and fetch abstracts
    #[command(name = "search-abstracts")]
    SearchAbstracts {
        term: String,
        #[clap(long, default_value_t = 50)]
        limit: usize,
    },
    /// FASTA for Gene IDs via elink then efetch
    #[command(name = "gene-fasta")]
    GeneFasta {
        #[clap(long, num_args = 1.., required = true)]
        gene_ids: Vec<String>,
        /// Write one `<gene_id>.fasta` per gene here instead of printing
        #[clap(long)]
        dir: Option<PathBuf>,
    },
}

fn print_body(body: &EutilsBody, compact: bool) -> Result<()> {
    match body {
        EutilsBody::Json(value) => print_json(value, compact),
        EutilsBody::Text(text) => {
            println!("{}", text);
            Ok(())
        }
    }
}

/// `--bdata` wins over `--bdata-file`; one of them is needed
fn read_bdata(bdata: Option<String>, file: Option<PathBuf>) -> Result<String> {
    match (bdata, file) {
        (Some(b), _) => Ok(b),
        (None, Some(path)) => {
            fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
        }
        (None, None) => bail!("Provide --bdata or --bdata-file"),
    }
}

pub async fn run(args: NcbiArgs) -> Result<()> {
    let config = NcbiConfig::resolve(args.email.as_deref(), args.api_key.as_deref())?
        .with_tool(&args.tool)
        .with_timeout(args.timeout);
    let client = EntrezClient::new(config)?;
    let compact = args.compact;

    match args.command {
        NcbiCmd::Esearch {
            db,
            term,
            retmax,
            retstart,
            no_usehistory,
            sort,
            field,
            datetype,
            mindate,
            maxdate,
            webenv,
            query_key,
            rettype,
            retmode,
            idtype,
            reldate,
        } => {
            let req = ESearch {
                usehistory: !no_usehistory,
                sort,
                field,
                datetype,
                mindate,
                maxdate,
                webenv,
                query_key,
                rettype,
                retmode,
                idtype,
                reldate,
                ..ESearch::new(&db, &term).page(retstart, retmax)
            };
            print_body(&client.esearch(&req).await?, compact)
        }
        NcbiCmd::Esummary {
            db,
            ids,
            webenv,
            query_key,
            retstart,
            retmax,
            retmode,
            version,
        } => {
            let req = ESummary {
                webenv,
                query_key,
                retstart,
                retmax,
                retmode,
                version,
                ..ESummary::new(&db, &ids)
            };
            print_body(&client.esummary(&req).await?, compact)
        }
        NcbiCmd::Efetch {
            db,
            ids,
            rettype,
            retmode,
            retstart,
            retmax,
            strand,
            seq_start,
            seq_stop,
            complexity,
            webenv,
            query_key,
        } => {
            let req = EFetch {
                rettype,
                retmode,
                retstart,
                retmax,
                strand,
                seq_start,
                seq_stop,
                complexity,
                webenv,
                query_key,
                ..EFetch::new(&db, &ids)
            };
            print_body(&client.efetch(&req).await?, compact)
        }
        NcbiCmd::Einfo { db, version, retmode } => {
            print_body(&client.einfo(db.as_deref(), version.as_deref(), &retmode).await?, compact)
        }
        NcbiCmd::Elink {
            dbfrom,
            db,
            ids,
            linkname,
            cmd,
            term,
            holding,
            datetype,
            reldate,
            mindate,
            maxdate,
            idtype,
            retmode,
        } => {
            if !ELINK_COMMANDS.contains(&cmd.as_str()) {
                bail!("--cmd must be one of {}", ELINK_COMMANDS.join(", "));
            }
            let req = ELink {
                db,
                linkname,
                cmd: Some(cmd),
                term,
                holding,
                datetype,
                reldate,
                mindate,
                maxdate,
                idtype,
                retmode,
                ..ELink::new(&dbfrom, &ids)
            };
            print_body(&client.elink(&req).await?, compact)
        }
        NcbiCmd::Egquery { term } => {
            println!("{}", client.egquery(&term).await?);
            Ok(())
        }
        NcbiCmd::Espell { db, term } => print_json(&client.espell(&db, &term).await?, compact),
        NcbiCmd::Ecitmatch {
            bdata,
            bdata_file,
            retmode,
        } => {
            let bdata = read_bdata(bdata, bdata_file)?;
            println!("{}", client.ecitmatch(&bdata, &retmode).await?);
            Ok(())
        }
        NcbiCmd::SearchAbstracts { term, limit } => {
            let abstracts = client.search_then_fetch_abstracts(&term, "pubmed", limit).await?;
            print_json(&abstracts, compact)
        }
        NcbiCmd::GeneFasta { gene_ids, dir } => {
            let fasta = client.download_fasta_for_gene_ids(&gene_ids).await?;
            match dir {
                Some(dir) => {
                    mkdir(&dir)?;
                    for (gene_id, text) in &fasta {
                        let path = dir.join(format!("{}.fasta", gene_id));
                        fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
                        println!("✓ Wrote {}", path.display());
                    }
                    Ok(())
                }
                None => print_json(&fasta, compact),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use tempfile::TempDir;

    fn ncbi(args: &[&str]) -> NcbiArgs {
        let mut argv = vec!["ind", "ncbi"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Ncbi(args) => args,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_global_email_after_subcommand() {
        let args = ncbi(&["esearch", "pubmed", "asthma", "--email", "me@example.org", "--retmax", "5"]);
        assert_eq!(args.email.as_deref(), Some("me@example.org"));
        match args.command {
            NcbiCmd::Esearch { db, term, retmax, retmode, no_usehistory, .. } => {
                assert_eq!(db, "pubmed");
                assert_eq!(term, "asthma");
                assert_eq!(retmax, 5);
                assert_eq!(retmode, "json");
                assert!(!no_usehistory);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_ids_take_multiple_values() {
        let args = ncbi(&["efetch", "nucleotide", "--ids", "1", "2", "3", "--rettype", "fasta"]);
        match args.command {
            NcbiCmd::Efetch { ids, rettype, .. } => {
                assert_eq!(ids, vec!["1", "2", "3"]);
                assert_eq!(rettype.as_deref(), Some("fasta"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_read_bdata() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cites.txt");
        fs::write(&path, "proc natl acad sci u s a|1991|88|3248|mann bj|Art1|\n").unwrap();
        assert!(read_bdata(None, Some(path.clone())).unwrap().starts_with("proc natl"));
        assert_eq!(read_bdata(Some("x|".to_string()), Some(path)).unwrap(), "x|");
        assert!(read_bdata(None, None).is_err());
    }
}
