use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::info;
use walkdir::WalkDir;

const DUMP_DIR_KEY: &str = "DUMP_DIR";
const POSTS_FILE_PATTERN: &str = r"^posts-\d{4}-\d{2}-\d{2}\.[A-Za-z0-9]+$";

/// Resolves the directory holding the dumps.
/// An explicit path wins, then `.env`, then a search of nearby directories.
pub fn get_dump_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    let env_path = Path::new(".env");

    if env_path.exists() {
        if let Ok(dir) = load_from_env(env_path) {
            info!("Loaded dump directory from .env");
            return Ok(dir);
        }
    }

    info!("Dump directory not found in .env. Searching filesystem...");
    let dir = find_dump_dir(&std::env::current_dir()?, 4)?;
    info!("Found dumps in {:?}", dir);

    save_to_env(env_path, &dir)?;
    info!("Saved dump directory to .env");
    Ok(dir)
}

/// Searches `root` and then its parent for a directory with a posts dump.
fn find_dump_dir(root: &Path, max_depth: usize) -> Result<PathBuf> {
    let pattern = Regex::new(POSTS_FILE_PATTERN)?;
    let search = |start: &Path| {
        WalkDir::new(start)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .find(|e| {
                e.file_type().is_file()
                    && e.file_name().to_str().is_some_and(|name| pattern.is_match(name))
            })
            .and_then(|e| e.path().parent().map(Path::to_path_buf))
    };

    if let Some(dir) = search(root) {
        return Ok(dir);
    }
    if let Some(dir) = root.parent().and_then(search) {
        return Ok(dir);
    }
    Err(anyhow!("Could not find any posts dump near {:?}", root))
}

fn load_from_env(path: &Path) -> Result<PathBuf> {
    let reader = BufReader::new(File::open(path)?);
    for line in reader.lines() {
        let line = line?;
        if let Some((key, value)) = line.split_once('=') {
            if key.trim() == DUMP_DIR_KEY && !value.trim().is_empty() {
                return Ok(PathBuf::from(value.trim()));
            }
        }
    }
    Err(anyhow!("{} is missing from {:?}", DUMP_DIR_KEY, path))
}

/// Writes `DUMP_DIR`, keeping any other entries already in the file.
fn save_to_env(path: &Path, dir: &Path) -> Result<()> {
    let mut lines = Vec::new();
    if path.exists() {
        for line in BufReader::new(File::open(path)?).lines() {
            let line = line?;
            let is_dump_dir = line
                .split_once('=')
                .is_some_and(|(key, _)| key.trim() == DUMP_DIR_KEY);
            if !is_dump_dir {
                lines.push(line);
            }
        }
    }
    let mut file = File::create(path).context("Failed to create .env file")?;
    for line in lines {
        writeln!(file, "{}", line)?;
    }
    writeln!(file, "{}={}", DUMP_DIR_KEY, dir.display())?;
    Ok(())
}

/// Reads a JSON settings file; absent fields take their defaults.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {:?}", path))
}
