use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::info;

use crate::build::builder::{build_index, BuiltArtifacts};
use crate::core::config::BuilderConfig;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::SourceRow;

/// Builds the search artifacts for a comics catalog (§6a).
///
/// Reads `SOURCE_PATH` as JSON Lines, one `SourceRow` object per line, and
/// writes `tags.json`, `dict.bin`, `meta.<n>.bin`, `index.<n>.bin`, and
/// `manifest.json` under `--out`.
#[derive(Debug, Parser)]
#[command(name = "comic-search-build", version)]
pub struct Args {
    /// Path to a JSON-Lines file of source rows.
    pub source_path: PathBuf,

    /// Remove stale artifacts in the output directory before writing.
    #[clap(long)]
    pub clean: bool,

    /// Timestamp recorded in manifest.json's `generatedAt`. Defaults to empty.
    #[clap(long)]
    pub generated_at: Option<String>,

    #[clap(long, default_value_t = 4096)]
    pub meta_shard_docs: usize,

    /// 0 derives the shard count from total postings bytes (§3 shard policy).
    #[clap(long, default_value_t = 0)]
    pub index_shard_count: usize,

    #[clap(long, default_value = "./dist")]
    pub out: PathBuf,

    #[clap(long, default_value = "info")]
    pub log_level: String,
}

pub fn init_logging(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn read_rows(path: &Path) -> Result<Vec<SourceRow>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut rows = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row: SourceRow = serde_json::from_str(&line).map_err(|e| {
            Error::new(ErrorKind::Parse, format!("{}:{}: {e}", path.display(), line_no + 1))
        })?;
        rows.push(row);
    }
    Ok(rows)
}

/// Recognized output filenames this builder owns; `--clean` only removes
/// these, never arbitrary files a caller might have placed alongside them.
fn owned_file_names(built: &BuiltArtifacts) -> Vec<String> {
    let mut names = vec!["tags.json".to_string(), "dict.bin".to_string(), "manifest.json".to_string()];
    names.extend((0..built.meta_shards.len()).map(|i| format!("meta.{i}.bin")));
    names.extend((0..built.index_shards.len()).map(|i| format!("index.{i}.bin")));
    names
}

fn clean_out_dir(out_dir: &Path) -> Result<()> {
    if !out_dir.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(out_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name == "manifest.json"
            || name == "tags.json"
            || name == "dict.bin"
            || name.starts_with("meta.")
            || name.starts_with("index.")
        {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

fn write_artifact(out_dir: &Path, name: &str, bytes: &[u8]) -> Result<()> {
    let path = out_dir.join(name);
    let mut f = File::create(&path)?;
    f.write_all(bytes)?;
    Ok(())
}

pub fn run(args: Args) -> Result<()> {
    init_logging(&args.log_level);
    info!(source = %args.source_path.display(), out = %args.out.display(), "reading source rows");

    let rows = read_rows(&args.source_path)?;

    let config = BuilderConfig {
        out_dir: args.out.clone(),
        clean: args.clean,
        generated_at: args.generated_at,
        meta_shard_docs: args.meta_shard_docs,
        index_shard_count: args.index_shard_count,
    };

    let built = build_index(rows, &config)?;

    fs::create_dir_all(&config.out_dir)?;
    if config.clean {
        clean_out_dir(&config.out_dir)?;
    }

    write_artifact(&config.out_dir, "tags.json", &built.tags)?;
    write_artifact(&config.out_dir, "dict.bin", &built.dict)?;
    for (i, bytes) in built.meta_shards.iter().enumerate() {
        write_artifact(&config.out_dir, &format!("meta.{i}.bin"), bytes)?;
    }
    for (i, bytes) in built.index_shards.iter().enumerate() {
        write_artifact(&config.out_dir, &format!("index.{i}.bin"), bytes)?;
    }

    let manifest_json = built.manifest.to_json()?;
    write_artifact(&config.out_dir, "manifest.json", manifest_json.as_bytes())?;

    info!(
        files = owned_file_names(&built).len(),
        out = %config.out_dir.display(),
        "wrote artifacts"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_source_rows_from_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.jsonl");
        fs::write(
            &path,
            r#"{"id":1,"title":"凉宫春日","aliases":[],"authors":["author"],"cover":null,"tags":["sci-fi"],"flags":0}
{"id":2,"title":"阿虚","aliases":["alias"],"authors":[],"cover":"https://cdn/a.jpg","tags":[],"flags":1}
"#,
        )
        .unwrap();
        let rows = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, 1);
        assert_eq!(rows[1].flags, 1);
    }

    #[test]
    fn clean_only_removes_owned_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("manifest.json"), b"{}").unwrap();
        fs::write(dir.path().join("index.0.bin"), b"x").unwrap();
        fs::write(dir.path().join("keep-me.txt"), b"x").unwrap();
        clean_out_dir(dir.path()).unwrap();
        assert!(!dir.path().join("manifest.json").exists());
        assert!(!dir.path().join("index.0.bin").exists());
        assert!(dir.path().join("keep-me.txt").exists());
    }
}
