use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pkgrank_core::{Catalog, CatalogSource, Expansion, Field, QueryExpander, RankConfig, RankRequest, Ranker};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "ranker")]
#[command(about = "Rank catalog records against a free-text query", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank the catalog for a query and print matching identifiers
    Rank {
        /// Catalog path (JSON/JSONL file or a directory of them)
        #[arg(long)]
        catalog: String,
        #[arg(long)]
        query: String,
        /// Identifier to place ahead of the ranked results (repeatable)
        #[arg(long = "candidate")]
        candidates: Vec<String>,
        /// Expansion term to consider alongside the query (repeatable)
        #[arg(long = "expand")]
        expansion_terms: Vec<String>,
        /// JSON file with precomputed `candidates` and `terms`
        #[arg(long)]
        expansion: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        threshold: Option<f64>,
        /// JSON file with ranking settings
        #[arg(long)]
        config: Option<String>,
        /// Print per-record score breakdowns as JSON
        #[arg(long, default_value_t = false)]
        explain: bool,
    },
    /// Print corpus statistics for a catalog
    Inspect {
        #[arg(long)]
        catalog: String,
        /// Number of most frequent terms to show
        #[arg(long, default_value_t = 20)]
        top: usize,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Rank { catalog, query, candidates, expansion_terms, expansion, limit, threshold, config, explain } => {
            let config = match config {
                Some(path) => load_config(Path::new(&path))?,
                None => RankConfig::default(),
            };
            let mut fixed = match expansion {
                Some(path) => load_expansion(Path::new(&path))?,
                None => Expansion::default(),
            };
            fixed.candidates.extend(candidates);
            fixed.terms.extend(expansion_terms);
            let source = FileCatalog::new(&catalog);
            let expander = StaticExpander(fixed);
            let ranker = Ranker::new(config);
            if explain {
                let catalog = source.load()?;
                let expansion = expander.expand(&query)?;
                let request = RankRequest {
                    query: &query,
                    candidates: &expansion.candidates,
                    expansion_terms: &expansion.terms,
                    limit,
                    threshold,
                };
                let outcome = ranker.explain(&catalog, &request);
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                for id in ranker.rank_from(&source, Some(&expander as &dyn QueryExpander), &query, limit, threshold)? {
                    println!("{id}");
                }
            }
            Ok(())
        }
        Commands::Inspect { catalog, top } => {
            let catalog = FileCatalog::new(&catalog).load()?;
            let report = inspect(&catalog, top);
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

/// Catalog stored as JSON or JSONL files on disk.
struct FileCatalog {
    root: PathBuf,
}

impl FileCatalog {
    fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    fn files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = Vec::new();
        if self.root.is_dir() {
            for entry in WalkDir::new(&self.root).into_iter().filter_map(|e| e.ok()) {
                let p = entry.path();
                if p.is_file() {
                    if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                        if matches!(ext, "json" | "jsonl") {
                            files.push(p.to_path_buf());
                        }
                    }
                }
            }
        } else if self.root.is_file() {
            files.push(self.root.clone());
        }
        files.sort();
        files
    }
}

impl CatalogSource for FileCatalog {
    fn load(&self) -> Result<Catalog> {
        let files = self.files();
        if files.is_empty() {
            anyhow::bail!("no catalog files found at {}", self.root.display());
        }
        let mut catalog = Catalog::default();
        for file in files {
            let f = File::open(&file).with_context(|| format!("opening {}", file.display()))?;
            let reader = BufReader::new(f);
            let part = if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
                Catalog::from_jsonl_reader(reader)
            } else {
                Catalog::from_json_reader(reader)
            }
            .with_context(|| format!("loading {}", file.display()))?;
            tracing::debug!(file = %file.display(), records = part.len(), "loaded catalog file");
            catalog.extend(part);
        }
        tracing::info!(records = catalog.len(), "catalog loaded");
        Ok(catalog)
    }
}

/// Expansion known ahead of time, from flags or a file.
struct StaticExpander(Expansion);

impl QueryExpander for StaticExpander {
    fn expand(&self, _query: &str) -> Result<Expansion> { Ok(self.0.clone()) }
}

fn load_config(path: &Path) -> Result<RankConfig> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    RankConfig::from_json_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn load_expansion(path: &Path) -> Result<Expansion> {
    let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(BufReader::new(f)).with_context(|| format!("parsing {}", path.display()))
}

#[derive(Serialize)]
struct IndexReport {
    total_documents: usize,
    num_terms: usize,
    average_field_length: Vec<(&'static str, f64)>,
    most_frequent: Vec<(String, u32)>,
}

fn inspect(catalog: &Catalog, top: usize) -> IndexReport {
    let index = pkgrank_core::build_index(catalog);
    IndexReport {
        total_documents: index.total_documents,
        num_terms: index.num_terms(),
        average_field_length: Field::ALL.iter().map(|f| (f.as_str(), index.avg_len(*f))).collect(),
        most_frequent: index.most_frequent(top).into_iter().map(|(t, df)| (t.to_string(), df)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::tempdir;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
        let cli = Cli::try_parse_from([
            "ranker", "rank", "--catalog", "c.json", "--query", "maps", "--candidate", "sf", "--candidate", "terra",
            "--limit", "5",
        ])
        .unwrap();
        match cli.command {
            Commands::Rank { candidates, limit, threshold, explain, .. } => {
                assert_eq!(candidates, vec!["sf", "terra"]);
                assert_eq!(limit, Some(5));
                assert_eq!(threshold, None);
                assert!(!explain);
            }
            Commands::Inspect { .. } => panic!("expected rank"),
        }
    }

    #[test]
    fn loads_a_directory_of_json_and_jsonl() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("a.json"),
            r#"[{"package_name": "sf", "title": "Simple Features for R", "topics": ["spatial"]}]"#,
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("more")).unwrap();
        fs::write(
            dir.path().join("more/b.jsonl"),
            "{\"name\": \"incidence\", \"title\": \"Epidemic curves\"}\n\n{\"name\": \"dplyr\"}\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let catalog = FileCatalog::new(dir.path()).load().unwrap();
        let ids: Vec<&str> = catalog.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["sf", "incidence", "dplyr"]);

        let ranker = Ranker::default();
        let expander = StaticExpander(Expansion { candidates: vec!["dplyr".into()], terms: vec![] });
        let got = ranker
            .rank_from(&FileCatalog::new(dir.path()), Some(&expander as &dyn QueryExpander), "epidemic curves", None, None)
            .unwrap();
        assert_eq!(got, vec!["dplyr", "incidence"]);
    }

    #[test]
    fn missing_catalog_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(FileCatalog::new(dir.path().join("nope.json")).load().is_err());
        fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        let err = FileCatalog::new(dir.path().join("bad.json")).load().unwrap_err();
        assert!(format!("{err:#}").contains("bad.json"));
    }

    #[test]
    fn config_and_expansion_files() {
        let dir = tempdir().unwrap();
        let cfg = dir.path().join("cfg.json");
        fs::write(&cfg, r#"{"threshold": 1.5}"#).unwrap();
        assert_eq!(load_config(&cfg).unwrap().threshold, 1.5);
        let exp = dir.path().join("exp.json");
        fs::write(&exp, r#"{"terms": ["epidemic curves"]}"#).unwrap();
        let expansion = load_expansion(&exp).unwrap();
        assert!(expansion.candidates.is_empty());
        assert_eq!(expansion.terms, vec!["epidemic curves"]);
    }

    #[test]
    fn inspect_reports_field_averages() {
        let catalog: Catalog = vec![pkgrank_core::Record::new("sf", "sf").with_title("Simple features")].into();
        let report = inspect(&catalog, 5);
        assert_eq!(report.total_documents, 1);
        assert_eq!(report.average_field_length[1], ("title", 2.0));
        assert!(report.most_frequent.iter().any(|(t, _)| t == "featur"));
    }
}
