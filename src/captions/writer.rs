use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::info;

use crate::error::{Error, Result};

pub const CAPTION_EXTENSION: &str = "txt";

fn caption_path(target_dir: &Path, key: &str) -> PathBuf {
    target_dir.join(format!("{key}.{CAPTION_EXTENSION}"))
}

fn ensure_absent(targets: impl IntoIterator<Item = PathBuf>) -> Result<()> {
    match targets.into_iter().find(|path| path.exists()) {
        Some(existing) => Err(Error::FileExists(existing)),
        None => Ok(()),
    }
}

/// Writes one `<key>.txt` file per caption into `target_dir`.
///
/// Without `allow_overwrite` every target is checked before anything is
/// written, so an existing file leaves the directory untouched.
pub fn write_captions(
    captions: &BTreeMap<String, String>,
    target_dir: &Path,
    allow_overwrite: bool,
) -> Result<usize> {
    if !allow_overwrite {
        ensure_absent(captions.keys().map(|key| caption_path(target_dir, key)))?;
    }
    fs::create_dir_all(target_dir)?;

    captions
        .par_iter()
        .try_for_each(|(key, caption)| -> Result<()> {
            fs::write(caption_path(target_dir, key), caption)?;
            Ok(())
        })?;

    info!("Wrote {} captions to {}", captions.len(), target_dir.display());
    Ok(captions.len())
}

/// [`write_captions`] followed by [`write_stats`]. The stats file is checked
/// together with the caption targets, before either is written.
pub fn write_captions_and_stats(
    captions: &BTreeMap<String, String>,
    target_dir: &Path,
    stats: &BTreeMap<String, u64>,
    stats_path: &Path,
    allow_overwrite: bool,
) -> Result<usize> {
    if !allow_overwrite {
        ensure_absent(
            captions
                .keys()
                .map(|key| caption_path(target_dir, key))
                .chain(std::iter::once(stats_path.to_path_buf())),
        )?;
    }
    let written = write_captions(captions, target_dir, true)?;
    write_stats(stats, stats_path, true)?;
    Ok(written)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Writes `tag,count` rows, most frequent first, ties by tag name.
pub fn write_stats(
    stats: &BTreeMap<String, u64>,
    path: &Path,
    allow_overwrite: bool,
) -> Result<()> {
    if !allow_overwrite && path.exists() {
        return Err(Error::FileExists(path.to_path_buf()));
    }

    let mut entries: Vec<(&String, &u64)> = stats.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "tag,count")?;
    for (tag, count) in entries {
        writeln!(out, "{},{}", csv_field(tag), count)?;
    }
    out.flush()?;
    info!("Wrote stats of {} tags to {}", stats.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_captions() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let captions = BTreeMap::from([
            ("1".to_string(), "fox, solo".to_string()),
            ("2".to_string(), String::new()),
        ]);
        assert_eq!(write_captions(&captions, dir.path(), false)?, 2);
        assert_eq!(fs::read_to_string(dir.path().join("1.txt"))?, "fox, solo");
        assert_eq!(fs::read_to_string(dir.path().join("2.txt"))?, "");
        Ok(())
    }

    #[test]
    fn test_existing_caption_blocks_whole_batch() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("2.txt"), "old")?;
        let captions = BTreeMap::from([
            ("1".to_string(), "fox".to_string()),
            ("2".to_string(), "wolf".to_string()),
        ]);
        assert!(matches!(
            write_captions(&captions, dir.path(), false),
            Err(Error::FileExists(_))
        ));
        assert!(!dir.path().join("1.txt").exists());
        write_captions(&captions, dir.path(), true)?;
        assert_eq!(fs::read_to_string(dir.path().join("2.txt"))?, "wolf");
        Ok(())
    }

    #[test]
    fn test_existing_stats_file_blocks_captions() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let captions_dir = dir.path().join("captions");
        let stats_path = dir.path().join("stats.csv");
        fs::write(&stats_path, "old")?;
        let captions = BTreeMap::from([("1".to_string(), "fox".to_string())]);
        let stats = BTreeMap::from([("fox".to_string(), 1)]);

        assert!(matches!(
            write_captions_and_stats(&captions, &captions_dir, &stats, &stats_path, false),
            Err(Error::FileExists(path)) if path == stats_path
        ));
        assert!(!captions_dir.join("1.txt").exists());
        assert_eq!(fs::read_to_string(&stats_path)?, "old");

        assert_eq!(
            write_captions_and_stats(&captions, &captions_dir, &stats, &stats_path, true)?,
            1
        );
        assert_eq!(fs::read_to_string(captions_dir.join("1.txt"))?, "fox");
        assert_eq!(fs::read_to_string(&stats_path)?, "tag,count\nfox,1\n");
        Ok(())
    }

    #[test]
    fn test_stats_sorted_by_count_then_name() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("stats.csv");
        let stats = BTreeMap::from([
            ("solo".to_string(), 2),
            ("fox".to_string(), 5),
            ("canine".to_string(), 2),
            ("a,b".to_string(), 1),
        ]);
        write_stats(&stats, &path, false)?;
        assert_eq!(
            fs::read_to_string(&path)?,
            "tag,count\nfox,5\ncanine,2\nsolo,2\n\"a,b\",1\n"
        );
        assert!(matches!(write_stats(&stats, &path, false), Err(Error::FileExists(_))));
        write_stats(&BTreeMap::new(), &path, true)?;
        assert_eq!(fs::read_to_string(&path)?, "tag,count\n");
        Ok(())
    }
}
