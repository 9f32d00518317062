use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{anyhow, Context, Result};
use crossbeam::channel::{bounded, unbounded};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use reqwest::blocking::Client;
use tracing::{error, info, warn};

use crate::captions::Naming;
use crate::database::Posts;
use crate::model::Post;

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// One file to fetch, with whatever the caller wants back alongside it.
#[derive(Debug, Clone)]
pub struct DownloadTask<M> {
    pub url: String,
    pub target_file: PathBuf,
    pub meta: M,
}

#[derive(Debug)]
pub struct FinishedDownload<M> {
    pub task: DownloadTask<M>,
    pub bytes: u64,
    pub error: Option<anyhow::Error>,
}

impl<M> FinishedDownload<M> {
    pub fn ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Fetches files over HTTP with a fixed pool of worker threads sharing one
/// task queue. A failed file is reported in its result and never stops the
/// other workers.
#[derive(Debug, Clone)]
pub struct FilesDownloader {
    workers: usize,
    proxy_url: Option<String>,
    chunk_size: usize,
    progress: bool,
}

impl Default for FilesDownloader {
    fn default() -> Self {
        FilesDownloader {
            workers: 16,
            proxy_url: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            progress: true,
        }
    }
}

impl FilesDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// `http://`, `https://` and `socks5://` proxies are accepted.
    pub fn proxy_url(mut self, proxy_url: Option<String>) -> Self {
        self.proxy_url = proxy_url;
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    fn client(&self) -> Result<Client> {
        let builder = Client::builder();
        let builder = match &self.proxy_url {
            Some(url) => builder.proxy(reqwest::Proxy::all(url).context("Invalid proxy URL")?),
            None => builder.no_proxy(),
        };
        builder.build().context("Failed to build HTTP client")
    }

    pub fn download_all<M>(&self, tasks: Vec<DownloadTask<M>>) -> Result<Vec<FinishedDownload<M>>>
    where
        M: Send + 'static,
    {
        if tasks.is_empty() {
            return Ok(Vec::new());
        }
        let client = self.client()?;
        let workers_count = self.workers.min(tasks.len());
        info!("Start downloading {} files with {} workers", tasks.len(), workers_count);

        let multi = if self.progress {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };
        let total = multi.add(ProgressBar::new(tasks.len() as u64));
        total.set_style(
            ProgressStyle::with_template("{prefix} [{bar:40}] {pos}/{len} files")
                .context("Invalid progress template")?,
        );
        total.set_prefix("Total");
        let bytes_style = ProgressStyle::with_template("{prefix} {bytes} {binary_bytes_per_sec}")
            .context("Invalid progress template")?;

        let (task_tx, task_rx) = bounded::<DownloadTask<M>>(tasks.len());
        let (result_tx, result_rx) = unbounded::<FinishedDownload<M>>();
        for task in tasks {
            task_tx
                .send(task)
                .map_err(|_| anyhow!("Download queue closed early"))?;
        }
        drop(task_tx);

        let mut handles = Vec::with_capacity(workers_count);
        for i in 1..=workers_count {
            let rx = task_rx.clone();
            let tx = result_tx.clone();
            let client = client.clone();
            let total = total.clone();
            let bar = multi.add(ProgressBar::new_spinner());
            bar.set_style(bytes_style.clone());
            bar.set_prefix(format!("Worker {i:02}"));
            let chunk_size = self.chunk_size;

            handles.push(thread::spawn(move || {
                info!("Worker {} started", i);
                for task in rx {
                    let outcome = fetch(&client, &task.url, &task.target_file, chunk_size, &bar);
                    let finished = match outcome {
                        Ok(bytes) => {
                            info!("Downloaded '{}' to {:?}", task.url, task.target_file);
                            FinishedDownload {
                                task,
                                bytes,
                                error: None,
                            }
                        }
                        Err(e) => {
                            error!(
                                "Failed to download '{}' to {:?}: {:#}",
                                task.url, task.target_file, e
                            );
                            FinishedDownload {
                                task,
                                bytes: 0,
                                error: Some(e),
                            }
                        }
                    };
                    total.inc(1);
                    if tx.send(finished).is_err() {
                        break;
                    }
                }
                bar.finish_and_clear();
                info!("Worker {} finished", i);
            }));
        }
        drop(result_tx);

        for (i, handle) in handles.into_iter().enumerate() {
            handle
                .join()
                .map_err(|_| anyhow!("Download worker {} panicked", i + 1))?;
        }
        total.finish();

        let results: Vec<FinishedDownload<M>> = result_rx.into_iter().collect();
        let failed = results.iter().filter(|r| !r.ok()).count();
        info!("Downloads finished: {} ok, {} failed", results.len() - failed, failed);
        Ok(results)
    }
}

fn fetch(
    client: &Client,
    url: &str,
    target: &Path,
    chunk_size: usize,
    bar: &ProgressBar,
) -> Result<u64> {
    let mut response = client
        .get(url)
        .send()
        .with_context(|| format!("Request to {url} failed"))?
        .error_for_status()?;
    bar.reset();
    if let Some(len) = response.content_length() {
        bar.set_length(len);
    }

    if let Some(dir) = target.parent() {
        fs::create_dir_all(dir).context("Failed to create target directory")?;
    }
    let mut file = BufWriter::new(
        File::create(target).with_context(|| format!("Failed to create {:?}", target))?,
    );
    let mut buffer = vec![0; chunk_size];
    let mut downloaded = 0u64;
    loop {
        let count = response.read(&mut buffer).context("Failed to read response body")?;
        if count == 0 {
            break;
        }
        file.write_all(&buffer[..count])?;
        downloaded += count as u64;
        bar.inc(count as u64);
    }
    file.flush()?;
    drop(file);

    check_file_type(target);
    Ok(downloaded)
}

/// Warns when the sniffed type of a written file disagrees with its extension.
fn check_file_type(path: &Path) {
    let Some(expected) = path.extension().and_then(|ext| ext.to_str()) else {
        return;
    };
    match infer::get_from_path(path) {
        Ok(Some(kind)) if kind.extension() != expected => {
            warn!("{:?} looks like {} rather than {}", path, kind.mime_type(), expected);
        }
        Ok(_) => {}
        Err(e) => warn!("Can not sniff type of {:?}: {}", path, e),
    }
}

/// Tasks fetching the file of every post into `target_dir`, named `<key>.<ext>`.
pub fn post_tasks(
    posts: &Posts,
    target_dir: &Path,
    naming: Naming,
) -> crate::Result<Vec<DownloadTask<Post>>> {
    posts
        .iter()?
        .map(|post| {
            let post = post?;
            Ok(DownloadTask {
                url: post.file_url(),
                target_file: target_dir
                    .join(format!("{}.{}", naming.key(&post), post.raw_file_ext)),
                meta: post,
            })
        })
        .collect()
}

pub fn download_posts(
    posts: &Posts,
    target_dir: &Path,
    naming: Naming,
    downloader: &FilesDownloader,
) -> Result<Vec<FinishedDownload<Post>>> {
    let tasks = post_tasks(posts, target_dir, naming).context("Failed to prepare download tasks")?;
    downloader.download_all(tasks)
}
