use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::{info, warn};

use dump_curator::captions::{
    build_captions, write_captions, write_captions_and_stats, write_stats, CaptionOptions, Naming,
};
use dump_curator::database::repo::write_sqlite;
use dump_curator::database::{Dataset, Query};
use dump_curator::fetch::{download_posts, FilesDownloader};
use dump_curator::ingest::autoinit_from_directory;
use dump_curator::utils::config::{get_dump_dir, load_json};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    source: SourceArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct SourceArgs {
    /// Directory with posts-YYYY-MM-DD.* and tags-YYYY-MM-DD.* files
    #[arg(short, long, global = true)]
    dump_dir: Option<PathBuf>,

    /// Only use dumps of this date
    #[arg(long, global = true)]
    date: Option<NaiveDate>,

    /// Defer reading rows until they are needed
    #[arg(long, global = true)]
    lazy: bool,

    /// Allow posts and tags from different dump dates
    #[arg(long, global = true)]
    mixed_dates: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print selected posts as JSON lines, or export them to SQLite
    Select {
        #[arg(short, long)]
        query: Option<PathBuf>,
        #[arg(long)]
        include_deleted: bool,
        #[arg(long)]
        exclude_unknown_tags: bool,
        #[arg(short, long)]
        export: Option<PathBuf>,
        #[arg(long)]
        overwrite: bool,
    },
    /// Write one caption file per selected post
    Captions {
        #[arg(short, long)]
        query: Option<PathBuf>,
        /// JSON caption settings
        #[arg(short, long)]
        options: Option<PathBuf>,
        #[arg(short = 'O', long)]
        output: PathBuf,
        /// Also write tag counts of the selection to this CSV file
        #[arg(long)]
        stats: Option<PathBuf>,
        #[arg(long)]
        overwrite: bool,
    },
    /// Write tag counts of the selected posts as CSV
    Stats {
        #[arg(short, long)]
        query: Option<PathBuf>,
        #[arg(short = 'O', long)]
        output: PathBuf,
        #[arg(long)]
        overwrite: bool,
    },
    /// Download the files of the selected posts
    Download {
        #[arg(short, long)]
        query: Option<PathBuf>,
        #[arg(short = 'O', long)]
        output: PathBuf,
        #[arg(long, value_enum, default_value_t = Naming::Id)]
        naming: Naming,
        #[arg(short, long, default_value_t = 16)]
        workers: usize,
        /// http(s):// or socks5:// proxy
        #[arg(long)]
        proxy: Option<String>,
    },
}

fn load_query(path: Option<&Path>) -> Result<Query> {
    match path {
        Some(path) => load_json(path),
        None => Ok(Query::default()),
    }
}

fn open_dataset(args: &SourceArgs) -> Result<Dataset> {
    let dump_dir = get_dump_dir(args.dump_dir.as_deref())?;
    info!("Dumps: {:?}", dump_dir);
    let dataset = autoinit_from_directory(&dump_dir, args.date, !args.mixed_dates, args.lazy)
        .with_context(|| format!("Failed to load dumps from {:?}", dump_dir))?;
    Ok(dataset)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    let dataset = open_dataset(&args.source)?;

    match args.command {
        Command::Select {
            query,
            include_deleted,
            exclude_unknown_tags,
            export,
            overwrite,
        } => {
            let query = load_query(query.as_deref())?;
            let posts = dataset.select_posts(&query, include_deleted, exclude_unknown_tags)?;
            match export {
                Some(path) => {
                    let written = write_sqlite(&posts.collect()?, &path, overwrite)?;
                    info!("Exported {} posts to {:?}", written, path);
                }
                None => {
                    let mut out = BufWriter::new(io::stdout().lock());
                    for post in posts.iter()? {
                        writeln!(out, "{}", serde_json::to_string(&post?)?)?;
                    }
                    out.flush()?;
                }
            }
        }
        Command::Captions {
            query,
            options,
            output,
            stats,
            overwrite,
        } => {
            let query = load_query(query.as_deref())?;
            let options: CaptionOptions = match options {
                Some(path) => load_json(&path)?,
                None => CaptionOptions::default(),
            };
            let selected = dataset.select(&query)?;
            let captions = build_captions(&selected.posts, &selected.tags, &options)?;
            let written = match stats {
                Some(path) => {
                    let stats = selected.posts.tag_stats()?;
                    let written =
                        write_captions_and_stats(&captions, &output, &stats, &path, overwrite)?;
                    info!("Wrote tag stats to {:?}", path);
                    written
                }
                None => write_captions(&captions, &output, overwrite)?,
            };
            info!("Wrote {} captions to {:?}", written, output);
        }
        Command::Stats {
            query,
            output,
            overwrite,
        } => {
            let query = load_query(query.as_deref())?;
            let selected = dataset.select(&query)?;
            let stats = selected.posts.tag_stats()?;
            write_stats(&stats, &output, overwrite)?;
            info!("Wrote {} tag counts to {:?}", stats.len(), output);
        }
        Command::Download {
            query,
            output,
            naming,
            workers,
            proxy,
        } => {
            let query = load_query(query.as_deref())?;
            let selected = dataset.select(&query)?;
            let downloader = FilesDownloader::new().workers(workers).proxy_url(proxy);
            let results = download_posts(&selected.posts, &output, naming, &downloader)?;
            let failed = results.iter().filter(|r| !r.ok()).count();
            if failed > 0 {
                warn!("{} of {} downloads failed", failed, results.len());
            }
        }
    }

    info!("Done.");
    Ok(())
}
