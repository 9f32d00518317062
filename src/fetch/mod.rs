pub mod downloader;

pub use downloader::{download_posts, DownloadTask, FilesDownloader, FinishedDownload};
