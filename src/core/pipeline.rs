//! Reader/writer copy pipeline
//!
//! One thread reads the source in fixed-size chunks and pushes them to the
//! tail of a [`BlockingDeque`]; a second thread pops from the head and
//! writes. Closing the deque is the end-of-input signal, aborting it is the
//! teardown signal. The calling thread opens both files, starts the two
//! roles, joins them and reports the first real failure.

use crate::config::{HashAlgorithm, PipelineConfig, MAX_CHUNK_SIZE};
use crate::core::chunk::{read_chunk, Chunk};
use crate::error::{CopyToolError, IoResultExt, Result};
use crate::hash::{verify_file, HashResult, StreamingHasher};
use crate::progress::ProgressReporter;
use crate::queue::BlockingDeque;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const PRODUCER_THREAD: &str = "copy-producer";
const CONSUMER_THREAD: &str = "copy-consumer";

/// Outcome of a completed copy
#[derive(Debug, Clone, Serialize)]
pub struct CopyResult {
    /// Source path
    pub source: PathBuf,
    /// Destination path
    pub destination: PathBuf,
    /// Bytes written to the destination
    pub bytes_copied: u64,
    /// Chunks passed through the queue
    pub chunks: u64,
    /// Total duration
    pub duration: Duration,
    /// Average throughput in bytes/second
    pub throughput: f64,
    /// Hash of the bytes read, when verification is enabled
    pub source_hash: Option<HashResult>,
    /// True once the destination was re-read and matched `source_hash`
    pub verified: bool,
}

impl CopyResult {
    /// Print summary to console
    pub fn print_summary(&self) {
        println!("\n=== Copy Summary ===");
        println!("Source:          {}", self.source.display());
        println!("Destination:     {}", self.destination.display());
        println!("Bytes copied:    {}", humansize::format_size(self.bytes_copied, humansize::BINARY));
        println!("Chunks:          {}", self.chunks);
        println!("Duration:        {:.2?}", self.duration);
        println!("Throughput:      {}/s", humansize::format_size(self.throughput as u64, humansize::BINARY));

        if let Some(hash) = &self.source_hash {
            println!("\nVerification:");
            println!("  Algorithm: {}", hash.algorithm.name());
            println!("  Hash:      {}", hash);
            println!("  Verified:  {}", if self.verified { "YES ✓" } else { "NO ✗" });
        }
    }
}

/// What the reader thread did
#[derive(Debug)]
struct ProducerReport {
    chunks: u64,
    bytes: u64,
    hash: Option<HashResult>,
}

/// What the writer thread did
#[derive(Debug)]
struct ConsumerReport {
    chunks: u64,
    bytes: u64,
}

/// Handle that stops a running pipeline from another thread
#[derive(Clone)]
pub struct Canceller {
    queue: Arc<BlockingDeque<Chunk>>,
}

impl Canceller {
    /// Abort the pipeline; both roles stop at their next queue operation
    pub fn cancel(&self) {
        tracing::warn!("Copy cancelled");
        self.queue.abort();
    }

    /// Check if the pipeline was aborted
    pub fn is_cancelled(&self) -> bool {
        self.queue.is_aborted()
    }
}

/// Closes the queue when the reader exits, aborting instead on panic so the
/// writer never waits for input that will not come
struct CloseOnExit<'a>(&'a BlockingDeque<Chunk>);

impl Drop for CloseOnExit<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.abort();
        } else {
            self.0.close();
        }
    }
}

/// Aborts the queue if the writer panics so the reader is not left blocked on
/// a full queue
struct AbortOnPanic<'a>(&'a BlockingDeque<Chunk>);

impl Drop for AbortOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.abort();
        }
    }
}

/// Producer/consumer copy over a single blocking deque
///
/// A pipeline runs once; [`run`](Self::run) and
/// [`copy_file`](Self::copy_file) consume it.
pub struct CopyPipeline {
    chunk_size: usize,
    queue: Arc<BlockingDeque<Chunk>>,
    verify: Option<HashAlgorithm>,
    progress: Option<Arc<ProgressReporter>>,
}

impl CopyPipeline {
    /// Create a pipeline reading `chunk_size` bytes per chunk, buffering at
    /// most `queue_capacity` chunks (`None` for unbounded)
    pub fn new(chunk_size: usize, queue_capacity: Option<usize>) -> Result<Self> {
        if chunk_size == 0 {
            return Err(CopyToolError::config("Chunk size must be at least 1 byte"));
        }
        if chunk_size > MAX_CHUNK_SIZE {
            return Err(CopyToolError::config(format!(
                "Chunk size {} exceeds the maximum of {} bytes",
                chunk_size, MAX_CHUNK_SIZE
            )));
        }

        Ok(Self {
            chunk_size,
            queue: Arc::new(BlockingDeque::with_capacity(queue_capacity.map(|cap| cap.max(1)))),
            verify: None,
            progress: None,
        })
    }

    /// Create a pipeline from runtime configuration
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.chunk_size, config.queue_capacity)?.with_verify(config.verify))
    }

    /// Hash everything read with `algorithm`
    pub fn with_verify(mut self, algorithm: Option<HashAlgorithm>) -> Self {
        self.verify = algorithm;
        self
    }

    /// Set progress reporter
    pub fn with_progress(mut self, progress: Arc<ProgressReporter>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Get a handle for external cancellation
    pub fn canceller(&self) -> Canceller {
        Canceller {
            queue: Arc::clone(&self.queue),
        }
    }

    /// Cancel the operation
    pub fn cancel(&self) {
        self.canceller().cancel();
    }

    /// Bytes per chunk
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Copy `source` to `destination`
    ///
    /// The source is opened first; if that fails, or the source is a
    /// directory, the destination is never created. The destination is
    /// truncated. With verification enabled the destination is re-read
    /// afterwards and compared.
    pub fn copy_file(self, source: &Path, destination: &Path) -> Result<CopyResult> {
        let src_file = File::open(source).open_context(source)?;
        let metadata = src_file.metadata().open_context(source)?;
        if metadata.is_dir() {
            return Err(CopyToolError::open_failed(
                source,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "source is a directory"),
            ));
        }
        let source_len = metadata.len();
        let dst_file = File::create(destination).open_context(destination)?;

        if let Some(progress) = &self.progress {
            progress.set_total_bytes(source_len);
        }

        let mut result = self.run_labeled(
            BufReader::new(src_file),
            source.to_path_buf(),
            BufWriter::new(dst_file),
            destination.to_path_buf(),
        )?;

        if let Some(expected) = &result.source_hash {
            verify_file(destination, expected)?;
            result.verified = true;
            tracing::info!("Verified {:?} ({})", destination, expected.algorithm.name());
        }

        Ok(result)
    }

    /// Copy everything from `reader` into `writer`
    pub fn run<R, W>(self, reader: R, writer: W) -> Result<CopyResult>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        self.run_labeled(reader, PathBuf::from("<source>"), writer, PathBuf::from("<destination>"))
    }

    fn run_labeled<R, W>(
        self,
        reader: R,
        source: PathBuf,
        writer: W,
        destination: PathBuf,
    ) -> Result<CopyResult>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let start_time = Instant::now();
        tracing::info!(
            "Copying {:?} -> {:?} (chunk size {}, queue capacity {:?})",
            source,
            destination,
            self.chunk_size,
            self.queue.capacity()
        );

        let producer = {
            let queue = Arc::clone(&self.queue);
            let path = source.clone();
            let chunk_size = self.chunk_size;
            let hasher = self.verify.map(StreamingHasher::new);
            thread::Builder::new()
                .name(PRODUCER_THREAD.to_string())
                .spawn(move || produce(reader, &path, chunk_size, &queue, hasher))
                .map_err(|e| CopyToolError::ThreadPoolError(format!("spawn {}: {}", PRODUCER_THREAD, e)))?
        };

        let consumer = {
            let queue = Arc::clone(&self.queue);
            let path = destination.clone();
            let progress = self.progress.clone();
            thread::Builder::new()
                .name(CONSUMER_THREAD.to_string())
                .spawn(move || consume(writer, &path, &queue, progress.as_deref()))
        };

        let consumer = match consumer {
            Ok(handle) => handle,
            Err(e) => {
                self.queue.abort();
                let _ = producer.join();
                return Err(CopyToolError::ThreadPoolError(format!(
                    "spawn {}: {}",
                    CONSUMER_THREAD, e
                )));
            }
        };

        let produced = producer
            .join()
            .unwrap_or_else(|_| Err(CopyToolError::WorkerPanicked(PRODUCER_THREAD.to_string())));
        let consumed = consumer
            .join()
            .unwrap_or_else(|_| Err(CopyToolError::WorkerPanicked(CONSUMER_THREAD.to_string())));

        let (produced, consumed) = match settle(produced, consumed) {
            Ok(reports) => reports,
            Err(e) => {
                if let Some(progress) = &self.progress {
                    progress.finish_error(&e.to_string());
                }
                return Err(e);
            }
        };

        if produced.bytes != consumed.bytes || produced.chunks != consumed.chunks {
            return Err(CopyToolError::io(
                destination,
                std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    format!(
                        "read {} bytes in {} chunks but wrote {} bytes in {} chunks",
                        produced.bytes, produced.chunks, consumed.bytes, consumed.chunks
                    ),
                ),
            ));
        }

        let duration = start_time.elapsed();
        let throughput = if duration.as_secs_f64() > 0.0 {
            consumed.bytes as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        if let Some(progress) = &self.progress {
            progress.finish_success("Copy complete");
        }
        tracing::info!(
            "Copied {} bytes in {} chunks in {:.2?}",
            consumed.bytes,
            consumed.chunks,
            duration
        );

        Ok(CopyResult {
            source,
            destination,
            bytes_copied: consumed.bytes,
            chunks: consumed.chunks,
            duration,
            throughput,
            source_hash: produced.hash,
            verified: false,
        })
    }
}

/// Reader role: fill chunks and push them until the source is exhausted
fn produce<R: Read>(
    mut reader: R,
    path: &Path,
    chunk_size: usize,
    queue: &BlockingDeque<Chunk>,
    mut hasher: Option<StreamingHasher>,
) -> Result<ProducerReport> {
    let _close = CloseOnExit(queue);
    let mut chunks = 0u64;
    let mut bytes = 0u64;

    loop {
        if queue.is_aborted() {
            return Err(CopyToolError::Cancelled);
        }

        let data = match read_chunk(&mut reader, chunk_size) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Read failed after {} bytes: {}", bytes, e);
                queue.abort();
                return Err(CopyToolError::io(path, e));
            }
        };
        if data.is_empty() {
            break;
        }

        if let Some(hasher) = hasher.as_mut() {
            hasher.process(&data);
        }

        let len = data.len() as u64;
        tracing::trace!("Read chunk {} ({} bytes)", chunks, len);
        if queue.push_back(Chunk::new(chunks, data)).is_err() {
            return Err(CopyToolError::Cancelled);
        }
        chunks += 1;
        bytes += len;
    }

    tracing::debug!("Reader done: {} chunks, {} bytes", chunks, bytes);
    Ok(ProducerReport {
        chunks,
        bytes,
        hash: hasher.map(StreamingHasher::finalize),
    })
}

/// Writer role: pop and write chunks until the queue is closed and drained
fn consume<W: Write>(
    mut writer: W,
    path: &Path,
    queue: &BlockingDeque<Chunk>,
    progress: Option<&ProgressReporter>,
) -> Result<ConsumerReport> {
    let _abort = AbortOnPanic(queue);
    let mut chunks = 0u64;
    let mut bytes = 0u64;

    while let Some(chunk) = queue.pop_front() {
        if let Err(e) = writer.write_all(chunk.as_bytes()) {
            tracing::warn!("Write of chunk {} failed: {}", chunk.seq(), e);
            queue.abort();
            return Err(CopyToolError::io(path, e));
        }
        tracing::trace!("Wrote chunk {} ({} bytes)", chunk.seq(), chunk.len());

        chunks += 1;
        bytes += chunk.len() as u64;
        if let Some(progress) = progress {
            progress.record_chunk(chunk.len() as u64);
        }
    }

    if queue.is_aborted() {
        return Err(CopyToolError::Cancelled);
    }

    writer.flush().with_path(path)?;
    tracing::debug!("Writer done: {} chunks, {} bytes", chunks, bytes);
    Ok(ConsumerReport { chunks, bytes })
}

/// Pick the error to report; a role that only stopped because the other
/// one aborted is never the root cause
fn settle(
    produced: Result<ProducerReport>,
    consumed: Result<ConsumerReport>,
) -> Result<(ProducerReport, ConsumerReport)> {
    match (produced, consumed) {
        (Ok(p), Ok(c)) => Ok((p, c)),
        (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
        (Err(p), Err(c)) => Err(if p.is_cancelled() { c } else { p }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, ErrorKind};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Writer that records every write call into shared state
    #[derive(Clone, Default)]
    struct Recorder {
        data: Arc<Mutex<Vec<u8>>>,
        writes: Arc<Mutex<Vec<usize>>>,
        delay: Duration,
    }

    impl Write for Recorder {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            self.data.lock().unwrap().extend_from_slice(buf);
            self.writes.lock().unwrap().push(buf.len());
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Reader that fails after handing out `good` bytes
    struct FailingReader {
        good: usize,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.good == 0 {
                return Err(std::io::Error::new(ErrorKind::Other, "disk on fire"));
            }
            let n = self.good.min(buf.len());
            buf[..n].fill(1);
            self.good -= n;
            Ok(n)
        }
    }

    /// Writer that always fails
    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(ErrorKind::Other, "no space left"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn write_source(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_130_bytes_in_64_byte_chunks() {
        let source = pattern(130);
        let recorder = Recorder::default();

        let pipeline = CopyPipeline::new(64, Some(8)).unwrap();
        let result = pipeline.run(Cursor::new(source.clone()), recorder.clone()).unwrap();

        assert_eq!(result.bytes_copied, 130);
        assert_eq!(result.chunks, 3);
        assert_eq!(*recorder.writes.lock().unwrap(), vec![64, 64, 2]);
        assert_eq!(*recorder.data.lock().unwrap(), source);
    }

    #[test]
    fn test_order_preserved_with_tiny_queue() {
        let source = pattern(10_000);
        let recorder = Recorder::default();

        let pipeline = CopyPipeline::new(7, Some(1)).unwrap();
        let result = pipeline.run(Cursor::new(source.clone()), recorder.clone()).unwrap();

        assert_eq!(result.bytes_copied, 10_000);
        assert_eq!(result.chunks, 10_000 / 7 + 1);
        assert_eq!(*recorder.data.lock().unwrap(), source);
    }

    #[test]
    fn test_unbounded_queue() {
        let source = pattern(4096);
        let recorder = Recorder::default();

        let pipeline = CopyPipeline::new(100, None).unwrap();
        pipeline.run(Cursor::new(source.clone()), recorder.clone()).unwrap();

        assert_eq!(*recorder.data.lock().unwrap(), source);
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        assert!(matches!(
            CopyPipeline::new(0, None),
            Err(CopyToolError::ConfigError(_))
        ));
    }

    #[test]
    fn test_oversized_chunk_rejected() {
        assert!(matches!(
            CopyPipeline::new(MAX_CHUNK_SIZE + 1, Some(8)),
            Err(CopyToolError::ConfigError(_))
        ));
        assert!(matches!(
            CopyPipeline::new(usize::MAX, Some(8)),
            Err(CopyToolError::ConfigError(_))
        ));
        assert_eq!(CopyPipeline::new(MAX_CHUNK_SIZE, Some(8)).unwrap().chunk_size(), MAX_CHUNK_SIZE);
    }

    #[test]
    fn test_read_error_is_reported() {
        let recorder = Recorder::default();
        let pipeline = CopyPipeline::new(64, Some(2)).unwrap();

        let err = pipeline
            .run(FailingReader { good: 1000 }, recorder)
            .unwrap_err();
        assert!(matches!(err, CopyToolError::Io { .. }), "got {:?}", err);
    }

    #[test]
    fn test_write_error_stops_blocked_reader() {
        // Enough input that the reader would block on the full queue forever
        // if the writer's failure did not release it
        let pipeline = CopyPipeline::new(16, Some(2)).unwrap();
        let err = pipeline
            .run(Cursor::new(pattern(1 << 20)), FailingWriter)
            .unwrap_err();

        assert!(matches!(err, CopyToolError::Io { .. }), "got {:?}", err);
    }

    #[test]
    fn test_cancel_running_pipeline() {
        let recorder = Recorder {
            delay: Duration::from_millis(5),
            ..Default::default()
        };
        let pipeline = CopyPipeline::new(64, Some(4)).unwrap();
        let canceller = pipeline.canceller();

        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            canceller.cancel();
            canceller
        });

        let err = pipeline
            .run(Cursor::new(pattern(64 * 10_000)), recorder.clone())
            .unwrap_err();
        assert!(err.is_cancelled(), "got {:?}", err);
        assert!(stopper.join().unwrap().is_cancelled());
        assert!(recorder.data.lock().unwrap().len() < 64 * 10_000);
    }

    #[test]
    fn test_settle_prefers_root_cause() {
        let io = || CopyToolError::io("x", std::io::Error::new(ErrorKind::Other, "boom"));

        let err = settle(Err(CopyToolError::Cancelled), Err(io())).unwrap_err();
        assert!(matches!(err, CopyToolError::Io { .. }));

        let err = settle(Err(io()), Err(CopyToolError::Cancelled)).unwrap_err();
        assert!(matches!(err, CopyToolError::Io { .. }));
    }

    #[test]
    fn test_copy_file_sizes() {
        let dir = TempDir::new().unwrap();

        for size in [0usize, 64, 65, 130, 100_000] {
            let content = pattern(size);
            let src = write_source(dir.path(), &format!("src_{}.bin", size), &content);
            let dst = dir.path().join(format!("dst_{}.bin", size));

            let result = CopyPipeline::new(64, Some(8))
                .unwrap()
                .copy_file(&src, &dst)
                .unwrap();

            assert_eq!(result.bytes_copied, size as u64);
            assert_eq!(std::fs::read(&dst).unwrap(), content, "size {}", size);
        }
    }

    #[test]
    fn test_copy_file_truncates_destination() {
        let dir = TempDir::new().unwrap();
        let src = write_source(dir.path(), "src.bin", b"short");
        let dst = write_source(dir.path(), "dst.bin", &pattern(4096));

        CopyPipeline::new(64, Some(8)).unwrap().copy_file(&src, &dst).unwrap();
        assert_eq!(std::fs::read(&dst).unwrap(), b"short");
    }

    #[test]
    fn test_copy_file_with_verification() {
        let dir = TempDir::new().unwrap();
        let src = write_source(dir.path(), "src.bin", &pattern(50_000));
        let dst = dir.path().join("dst.bin");

        let config = PipelineConfig {
            chunk_size: 4096,
            verify: Some(HashAlgorithm::XXHash3),
            ..PipelineConfig::new(&src, &dst)
        };
        let progress = Arc::new(ProgressReporter::disabled());
        let result = CopyPipeline::from_config(&config)
            .unwrap()
            .with_progress(Arc::clone(&progress))
            .copy_file(&src, &dst)
            .unwrap();

        assert!(result.verified);
        assert_eq!(result.source_hash.as_ref().unwrap().size, 50_000);
        assert_eq!(progress.summary().bytes_copied, 50_000);
        assert_eq!(progress.summary().total_bytes, 50_000);
    }

    #[test]
    fn test_missing_source_leaves_destination_untouched() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("missing.bin");
        let dst = dir.path().join("dst.bin");

        let err = CopyPipeline::new(64, Some(8)).unwrap().copy_file(&src, &dst).unwrap_err();

        assert!(matches!(err, CopyToolError::OpenFailed { .. }));
        assert_eq!(err.path(), Some(&src));
        assert!(!dst.exists());
    }

    #[test]
    fn test_directory_source_leaves_destination_untouched() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("srcdir");
        std::fs::create_dir(&src).unwrap();
        let dst = write_source(dir.path(), "dst.bin", b"precious contents");

        let err = CopyPipeline::new(64, Some(8)).unwrap().copy_file(&src, &dst).unwrap_err();

        assert!(matches!(err, CopyToolError::OpenFailed { .. }));
        assert_eq!(err.path(), Some(&src));
        assert_eq!(std::fs::read(&dst).unwrap(), b"precious contents");
    }

    #[test]
    fn test_unopenable_destination() {
        let dir = TempDir::new().unwrap();
        let src = write_source(dir.path(), "src.bin", b"data");
        let dst = dir.path().join("no_such_dir").join("dst.bin");

        let err = CopyPipeline::new(64, Some(8)).unwrap().copy_file(&src, &dst).unwrap_err();
        assert!(matches!(err, CopyToolError::OpenFailed { .. }));
        assert_eq!(err.path(), Some(&dst));
    }
}
