use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use doc_extract::sources::list_directory;
use doc_extract::spec::ReaderSpec;
use doc_extract::{Format, Metadata, Reader, Source};

#[derive(Parser)]
#[command(name = "doc-extract")]
#[command(about = "Extract flat JSON documents from CSV, XML, HTML, JSON and RDF sources")]
struct Args {
    /// Reader definition (JSON)
    #[arg(short, long)]
    reader: PathBuf,

    /// Metadata for every source, as key=value
    #[arg(short, long = "metadata", value_name = "KEY=VALUE")]
    metadata: Vec<String>,

    /// Read all RDF sources into a single graph
    #[arg(long)]
    merge: bool,

    /// Files, directories or http(s) URLs
    #[arg(required = true)]
    sources: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let spec = ReaderSpec::from_path(&args.reader)
        .with_context(|| format!("loading reader definition {}", args.reader.display()))?;
    let reader = spec.build().context("building reader")?;

    let metadata = parse_metadata(&args.metadata)?;
    let mut sources = collect_sources(&args.sources, &metadata)?;
    if args.merge {
        if reader.format() != Format::Rdf {
            bail!("--merge only applies to RDF readers");
        }
        sources = vec![merge_files(sources)?];
    }

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for doc in reader.documents(sources) {
        let doc = doc?;
        serde_json::to_writer(&mut out, &doc)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

/// `key=value` pairs; values that parse as JSON keep their type
fn parse_metadata(pairs: &[String]) -> Result<Metadata> {
    let mut metadata = Metadata::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("metadata `{pair}` is not of the form key=value");
        };
        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        metadata.insert(key.to_string(), value);
    }
    Ok(metadata)
}

fn collect_sources(args: &[String], metadata: &Metadata) -> Result<Vec<Source>> {
    let mut sources = Vec::new();
    for arg in args {
        if arg.starts_with("http://") || arg.starts_with("https://") {
            sources.push(Source::url(arg)?.with_metadata(metadata.clone()));
            continue;
        }
        let path = Path::new(arg);
        if path.is_dir() {
            for source in list_directory(path, None)? {
                let mut combined = metadata.clone();
                combined.extend(source.metadata);
                sources.push(Source::new(source.location).with_metadata(combined));
            }
        } else {
            sources.push(Source::path(path).with_metadata(metadata.clone()));
        }
    }
    Ok(sources)
}

fn merge_files(sources: Vec<Source>) -> Result<Source> {
    let metadata = sources.first().map(|s| s.metadata.clone()).unwrap_or_default();
    let mut paths = Vec::new();
    for source in sources {
        match source.location {
            doc_extract::Location::Path(path) => paths.push(path),
            other => bail!("--merge needs local files, got {other}"),
        }
    }
    Ok(Source::files(paths).with_metadata(metadata))
}
