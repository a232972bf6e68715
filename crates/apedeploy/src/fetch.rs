//! Prebuilt libCppJit download
//!
//! The C++ compiler backend links against libCppJit, which is too heavy to build
//! as part of the project. A prebuilt release archive is downloaded for the host
//! platform and the shared library and header are taken out of it; the archive
//! itself is removed again whether or not extraction succeeded.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use tracing_indicatif::span_ext::IndicatifSpanExt;
use zip::ZipArchive;

use crate::{Error, Result};

/// Release archive location; `{version}` and `{suffix}` are substituted
pub const DEFAULT_URL_TEMPLATE: &str =
    "https://github.com/Mayae/libcppjit/releases/download/v{version}/libcppjit-{version}-{suffix}.zip";

/// Header shipped in every archive
pub const HEADER_NAME: &str = "libCppJit.h";

/// Host platforms with published libCppJit builds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPlatform {
    Windows,
    MacOs,
}

impl HostPlatform {
    /// Platform this process runs on
    pub fn detect() -> Result<Self> {
        Self::from_os(std::env::consts::OS)
    }

    /// Map an OS name as reported by `std::env::consts::OS`
    pub fn from_os(os: &str) -> Result<Self> {
        match os {
            "windows" => Ok(HostPlatform::Windows),
            "macos" => Ok(HostPlatform::MacOs),
            other => Err(Error::fetch(
                format!("No prebuilt libCppJit is published for '{}'", other),
                "Build libCppJit from source and copy it into make/skeleton/compilers/CppAPE",
            )),
        }
    }

    /// Archive name suffix for this platform
    pub fn archive_suffix(self) -> &'static str {
        match self {
            HostPlatform::Windows => "win-x64",
            HostPlatform::MacOs => "macos-x64",
        }
    }

    /// Shared library file name inside the archive
    pub fn library_name(self) -> &'static str {
        match self {
            HostPlatform::Windows => "libCppJit.dll",
            HostPlatform::MacOs => "libCppJit.dylib",
        }
    }
}

/// Transport used to fetch the archive
pub trait Downloader {
    /// Write the body found at `url` into `sink`, returning the byte count
    fn download(&self, url: &str, sink: &mut dyn Write) -> Result<u64>;
}

/// Blocking HTTP(S) downloader.
///
/// The HTTP client is only built once a download is requested.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpDownloader;

impl HttpDownloader {
    pub fn new() -> Self {
        Self
    }

    fn client(&self) -> Result<reqwest::blocking::Client> {
        reqwest::blocking::Client::builder()
            .user_agent(concat!("apedeploy/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                Error::fetch(
                    format!("Failed to create HTTP client: {}", e),
                    "Check the TLS configuration of this machine",
                )
            })
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, url: &str, sink: &mut dyn Write) -> Result<u64> {
        let mut response = self
            .client()?
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                Error::fetch(
                    format!("Failed to download {}: {}", url, e),
                    "Check the network connection and that the requested version exists",
                )
            })?;

        let span = tracing::info_span!("download", url = %url);
        if let Some(length) = response.content_length() {
            if let Ok(style) = indicatif::ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            ) {
                span.pb_set_style(&style.progress_chars("#>-"));
            }
            span.pb_set_length(length);
        }
        let _entered = span.enter();

        let mut buf = vec![0u8; 64 * 1024];
        let mut written = 0u64;
        loop {
            let n = response.read(&mut buf)?;
            if n == 0 {
                break;
            }
            sink.write_all(&buf[..n])?;
            written += n as u64;
            span.pb_inc(n as u64);
        }

        Ok(written)
    }
}

/// A file taken out of the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// File name to look for, at any depth in the archive
    pub name: String,
    /// Where the file is written
    pub target: Utf8PathBuf,
}

/// Downloads and unpacks the prebuilt JIT compiler
pub struct RemoteComponentFetcher<'a> {
    root: &'a Utf8Path,
    downloader: &'a dyn Downloader,
    url_template: String,
    download_dir: Option<Utf8PathBuf>,
}

impl<'a> RemoteComponentFetcher<'a> {
    /// Fetcher writing into the project checkout at `root`
    pub fn new(root: &'a Utf8Path, downloader: &'a dyn Downloader) -> Self {
        Self {
            root,
            downloader,
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            download_dir: None,
        }
    }

    pub fn with_url_template(mut self, template: impl Into<String>) -> Self {
        self.url_template = template.into();
        self
    }

    /// Directory the archive is downloaded into (default: system temp dir)
    pub fn with_download_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    pub fn archive_url(&self, version: &str, platform: HostPlatform) -> String {
        self.url_template
            .replace("{version}", version)
            .replace("{suffix}", platform.archive_suffix())
    }

    /// Files extracted for a platform and where they go
    pub fn entries(&self, platform: HostPlatform) -> Vec<ArchiveEntry> {
        vec![
            ArchiveEntry {
                name: platform.library_name().to_string(),
                target: self
                    .root
                    .join("make/skeleton/compilers/CppAPE")
                    .join(platform.library_name()),
            },
            ArchiveEntry {
                name: HEADER_NAME.to_string(),
                target: self.root.join("projects/cppape/src").join(HEADER_NAME),
            },
        ]
    }

    /// Download the release `version` for `platform` and extract its entries.
    ///
    /// Returns the written paths. The downloaded archive never outlives this call.
    pub fn fetch(&self, version: &str, platform: HostPlatform) -> Result<Vec<Utf8PathBuf>> {
        let url = self.archive_url(version, platform);
        tracing::info!(version, url = %url, "Downloading libCppJit");

        let builder = {
            let mut builder = tempfile::Builder::new();
            builder.prefix("libcppjit-").suffix(".zip");
            builder
        };
        let mut archive = match &self.download_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        // `archive` is removed on drop, so every exit below cleans it up
        let bytes = self.downloader.download(&url, archive.as_file_mut())?;
        tracing::debug!(bytes, path = %archive.path().display(), "Archive downloaded");

        let written = extract_entries(archive.as_file_mut(), &self.entries(platform))?;
        for path in &written {
            tracing::info!(path = %path, "Extracted");
        }

        Ok(written)
    }
}

/// Extract each entry by file name from a zip archive
fn extract_entries(file: &mut File, entries: &[ArchiveEntry]) -> Result<Vec<Utf8PathBuf>> {
    file.seek(SeekFrom::Start(0))?;
    let mut archive = ZipArchive::new(file).map_err(|e| {
        Error::fetch(
            format!("Downloaded file is not a valid zip archive: {}", e),
            "The release may be missing for this version; re-run to download it again",
        )
    })?;

    let mut written = Vec::with_capacity(entries.len());
    for entry in entries {
        let archive_name = archive
            .file_names()
            .find(|name| !name.ends_with('/') && file_name(name) == entry.name)
            .map(str::to_owned)
            .ok_or_else(|| {
                Error::fetch(
                    format!("Archive does not contain {}", entry.name),
                    "Check that the requested libCppJit version supports this platform",
                )
            })?;

        let mut zip_file = archive.by_name(&archive_name).map_err(|e| {
            Error::fetch(
                format!("Failed to read {} from archive: {}", archive_name, e),
                "The download may be corrupted; run the command again",
            )
        })?;

        if let Some(parent) = entry.target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&entry.target)?;
        std::io::copy(&mut zip_file, &mut out)?;

        written.push(entry.target.clone());
    }

    Ok(written)
}

/// Last component of a path inside a zip archive
fn file_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}
