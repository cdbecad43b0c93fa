//! File content extraction: size limits, binary detection, encoding, binary policy, metadata.

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::debug;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crate::error::{DigestError, Outcome};
use crate::pipeline::cancel::{CancellationToken, check_cancelled};
use crate::pipeline::pool::{Task, run_bounded};
use crate::types::{BinaryPolicy, DigestConfig, FileMetadata};
use crate::utils::config::ContentConsts;
use crate::utils::fd_limit::cap_workers;

use super::hashing::{checksum_bytes, checksum_file};
use super::language::detect_language;

/// Options for [`ContentProcessor::process_file`].
#[derive(Debug, Clone)]
pub struct ContentOptions {
    pub binary_policy: BinaryPolicy,
    pub max_file_size: u64,
    pub stream_threshold: u64,
    pub detect_language: bool,
    /// Fill size, line count, checksum and processing time.
    pub include_metadata: bool,
}

impl Default for ContentOptions {
    fn default() -> Self {
        Self {
            binary_policy: BinaryPolicy::default(),
            max_file_size: ContentConsts::MAX_FILE_SIZE,
            stream_threshold: ContentConsts::STREAM_THRESHOLD,
            detect_language: true,
            include_metadata: true,
        }
    }
}

impl ContentOptions {
    pub fn from_config(config: &DigestConfig, binary_policy: BinaryPolicy, include_metadata: bool) -> Self {
        Self {
            binary_policy,
            max_file_size: config.max_file_size,
            stream_threshold: config.stream_threshold,
            detect_language: config.detect_language,
            include_metadata,
        }
    }
}

/// Extracted content of one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessedContent {
    pub path: PathBuf,
    pub content: String,
    /// `utf-8`, `utf-8-bom`, `utf-16le`, `utf-16be`, `latin1`, `base64`, or `binary`.
    pub encoding: String,
    pub is_binary: bool,
    /// Left out entirely (binary skip policy or over the size limit).
    pub skipped: bool,
    pub language_id: Option<String>,
    pub metadata: FileMetadata,
    pub warnings: Vec<String>,
}

/// Reads files into [`ProcessedContent`]. The pipeline holds it behind this trait so reads can be swapped.
pub trait FileProcessor: Send + Sync {
    fn process_file(&self, path: &Path, options: &ContentOptions) -> Result<ProcessedContent>;
}

/// Batch progress callback: `(completed, total, path)`. Returning `Err` aborts the batch.
pub type BatchProgressFn = Arc<dyn Fn(usize, usize, &Path) -> Outcome<()> + Send + Sync>;

/// Options for [`ContentProcessor::process_files`].
#[derive(Clone, Default)]
pub struct BatchOptions {
    /// Worker count. Default: rayon's thread count, capped by the FD limit.
    pub concurrency: Option<usize>,
    pub cancel: Option<CancellationToken>,
    pub on_progress: Option<BatchProgressFn>,
}

/// Per-file result of a batch; a failed read does not abort the batch.
pub type BatchItem = Result<ProcessedContent>;

#[derive(Debug, Default, Clone, Copy)]
pub struct ContentProcessor;

impl ContentProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Process one file: size check, binary sniff, policy, decode, metadata.
    pub fn process_file(&self, path: &Path, options: &ContentOptions) -> Result<ProcessedContent> {
        let started = Instant::now();
        let meta = std::fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
        let size = meta.len();
        let mut out = ProcessedContent {
            path: path.to_path_buf(),
            language_id: options
                .detect_language
                .then(|| detect_language(path).map(str::to_string))
                .flatten(),
            ..Default::default()
        };
        if options.include_metadata {
            out.metadata.size = Some(size);
        }

        if size > options.max_file_size {
            debug!("Skipping {} ({} bytes > {})", path.display(), size, options.max_file_size);
            out.skipped = true;
            out.encoding = "binary".to_string();
            out.warnings.push(format!(
                "file size {} bytes exceeds the {} byte limit",
                size, options.max_file_size
            ));
            return Ok(finish(out, started, options));
        }

        let sample = read_sample(path)?;
        let utf16 = utf16_bom(&sample);
        if utf16.is_none() && looks_binary(&sample) {
            out.is_binary = true;
            match options.binary_policy {
                BinaryPolicy::Skip => {
                    out.skipped = true;
                    out.encoding = "binary".to_string();
                    out.warnings.push("binary file skipped".to_string());
                    if options.include_metadata {
                        out.metadata.checksum = Some(checksum_file(path, size)?);
                    }
                }
                BinaryPolicy::Placeholder => {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    out.content = format!("[binary file: {} ({} bytes)]", name, size);
                    out.encoding = "binary".to_string();
                    if options.include_metadata {
                        out.metadata.checksum = Some(checksum_file(path, size)?);
                    }
                }
                BinaryPolicy::Base64 => {
                    let bytes = read_bytes(path, size, options.stream_threshold)?;
                    out.content = STANDARD.encode(&bytes);
                    out.encoding = "base64".to_string();
                    if options.include_metadata {
                        out.metadata.checksum = Some(checksum_bytes(&bytes));
                    }
                }
            }
            return Ok(finish(out, started, options));
        }

        let bytes = read_bytes(path, size, options.stream_threshold)?;
        let (text, encoding) = decode_text(&bytes);
        if options.include_metadata {
            out.metadata.checksum = Some(checksum_bytes(&bytes));
            out.metadata.lines = Some(text.lines().count());
        }
        out.content = text;
        out.encoding = encoding.to_string();
        Ok(finish(out, started, options))
    }

    /// Process many files on a bounded pool. Result slots follow `paths` order.
    ///
    /// Only cancellation (from the token or the progress callback) fails the whole call;
    /// per-file errors come back as `Err` items.
    pub fn process_files(
        &self,
        paths: &[PathBuf],
        options: &ContentOptions,
        batch: &BatchOptions,
    ) -> Outcome<Vec<BatchItem>> {
        check_cancelled(batch.cancel.as_ref())?;
        let total = paths.len();
        let limit = cap_workers(batch.concurrency.unwrap_or_else(rayon::current_num_threads));
        let completed = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<Task<BatchItem, DigestError>> = paths
            .iter()
            .cloned()
            .map(|path| {
                let options = options.clone();
                let cancel = batch.cancel.clone();
                let on_progress = batch.on_progress.clone();
                let completed = Arc::clone(&completed);
                let processor = *self;
                Box::new(move || {
                    check_cancelled(cancel.as_ref())?;
                    let item = processor.process_file(&path, &options);
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(cb) = on_progress.as_ref() {
                        cb(done, total, &path)?;
                    }
                    check_cancelled(cancel.as_ref())?;
                    Ok(item)
                }) as Task<BatchItem, DigestError>
            })
            .collect();

        run_bounded(tasks, limit)
    }
}

impl FileProcessor for ContentProcessor {
    fn process_file(&self, path: &Path, options: &ContentOptions) -> Result<ProcessedContent> {
        ContentProcessor::process_file(self, path, options)
    }
}

fn finish(mut out: ProcessedContent, started: Instant, options: &ContentOptions) -> ProcessedContent {
    if options.include_metadata {
        out.metadata.processing_time_ms = Some(started.elapsed().as_millis() as u64);
    }
    out
}

/// Leading bytes for binary/BOM detection. The handle is dropped before returning.
fn read_sample(path: &Path) -> Result<Vec<u8>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut sample = Vec::with_capacity(ContentConsts::BINARY_SNIFF_BYTES);
    file.take(ContentConsts::BINARY_SNIFF_BYTES as u64)
        .read_to_end(&mut sample)
        .with_context(|| format!("read {}", path.display()))?;
    Ok(sample)
}

/// Whole file; chunked reads above `stream_threshold`.
fn read_bytes(path: &Path, size: u64, stream_threshold: u64) -> Result<Vec<u8>> {
    if size <= stream_threshold {
        return std::fs::read(path).with_context(|| format!("read {}", path.display()));
    }
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut reader = BufReader::with_capacity(ContentConsts::READ_CHUNK_SIZE, file);
    let mut bytes = Vec::with_capacity(size as usize);
    let mut chunk = vec![0u8; ContentConsts::READ_CHUNK_SIZE];
    loop {
        let n = reader
            .read(&mut chunk)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..n]);
    }
    Ok(bytes)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Utf16 {
    Le,
    Be,
}

fn utf16_bom(bytes: &[u8]) -> Option<Utf16> {
    match bytes {
        [0xFF, 0xFE, ..] => Some(Utf16::Le),
        [0xFE, 0xFF, ..] => Some(Utf16::Be),
        _ => None,
    }
}

/// NUL in the window, or too many control bytes.
pub fn looks_binary(sample: &[u8]) -> bool {
    if sample.is_empty() {
        return false;
    }
    if sample.contains(&0) {
        return true;
    }
    let control = sample
        .iter()
        .filter(|&&b| b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0C | 0x1B))
        .count();
    control as f64 / sample.len() as f64 > ContentConsts::BINARY_CONTROL_RATIO
}

/// Decode text bytes, returning the text and the detected encoding label.
pub fn decode_text(bytes: &[u8]) -> (String, &'static str) {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return (String::from_utf8_lossy(rest).into_owned(), "utf-8-bom");
    }
    if let Some(order) = utf16_bom(bytes) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| match order {
                Utf16::Le => u16::from_le_bytes([pair[0], pair[1]]),
                Utf16::Be => u16::from_be_bytes([pair[0], pair[1]]),
            })
            .collect();
        let label = match order {
            Utf16::Le => "utf-16le",
            Utf16::Be => "utf-16be",
        };
        return (String::from_utf16_lossy(&units), label);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => (s.to_string(), "utf-8"),
        // Latin-1 maps every byte to a char, so nothing is lost.
        Err(_) => (bytes.iter().map(|&b| b as char).collect(), "latin1"),
    }
}
