use anyhow::Context;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, instrument, trace};

use crate::probe::clock::WallClock;
use crate::probe::probe_config::{ProbeConfig, ReadMode};
use crate::probe::record_log::{LogSink, RecordLog};
use crate::probe::stream_scanner::StreamScanner;

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ReceiveSummary {
    pub num_chunks: u64,
    pub num_bytes: u64,
    pub num_markers: u64,
    /// sentinel matches that were not followed by a live counter
    pub num_discarded: u64,
    pub num_records_skipped: u64,
}
impl ReceiveSummary {
    /// markers whose arrival made it into the log
    pub fn num_logged(&self) -> u64 {
        self.num_markers - self.num_records_skipped
    }
}

/// The receiving end of a measurement: reads the stream until the peer closes it, and logs the
///  arrival time of every counter found in it.
pub struct SegmentReceiver<S: AsyncRead + Unpin, W: LogSink, C: WallClock> {
    stream: S,
    scanner: StreamScanner,
    read_mode: ReadMode,
    buf: Vec<u8>,
    log: RecordLog<W, C>,
    summary: ReceiveSummary,
}

impl <S: AsyncRead + Unpin, W: LogSink, C: WallClock> SegmentReceiver<S, W, C> {
    pub fn new(config: &ProbeConfig, stream: S, log: RecordLog<W, C>) -> anyhow::Result<SegmentReceiver<S, W, C>> {
        config.validate()?;

        Ok(SegmentReceiver {
            stream,
            scanner: StreamScanner::new(config.layout.sentinel, config.leading_skip),
            read_mode: config.read_mode,
            buf: vec![0u8; config.read_buffer_len],
            log,
            summary: Default::default(),
        })
    }

    /// Runs until end-of-stream. A read error or a failure to write the log ends the run with an
    ///  error.
    #[instrument(skip_all)]
    pub async fn run(&mut self) -> anyhow::Result<ReceiveSummary> {
        loop {
            let n = self.read_chunk().await?;
            if n == 0 {
                debug!("end of stream");
                break;
            }

            self.summary.num_chunks += 1;
            self.summary.num_bytes += n as u64;
            trace!(n, "received chunk");

            self.on_chunk(n)?;

            if n < self.buf.len() && self.read_mode == ReadMode::Segment {
                // a partial segment is only returned at the end of the stream
                break;
            }
        }

        self.summary.num_records_skipped = self.log.num_skipped();
        info!(summary = ?self.summary, "receiver finished");
        Ok(self.summary.clone())
    }

    async fn read_chunk(&mut self) -> anyhow::Result<usize> {
        match self.read_mode {
            ReadMode::Chunk => {
                Ok(self.stream.read(&mut self.buf).await
                    .context("reading from stream")?)
            }
            ReadMode::Segment => {
                let mut filled = 0;
                while filled < self.buf.len() {
                    let n = self.stream.read(&mut self.buf[filled..]).await
                        .context("reading from stream")?;
                    if n == 0 {
                        if filled > 0 {
                            debug!(filled, "stream ended in the middle of a segment");
                        }
                        break;
                    }
                    filled += n;
                }
                Ok(filled)
            }
        }
    }

    fn on_chunk(&mut self, n: usize) -> anyhow::Result<()> {
        let mut markers = self.scanner.scan(&self.buf[..n]);
        for marker in &mut markers {
            trace!(offset = marker.offset, value = ?marker.value, "decoded marker");
            self.summary.num_markers += 1;
            self.log.record(marker.value)?;
        }
        self.summary.num_discarded += markers.num_discarded() as u64;
        Ok(())
    }

    pub fn log(&self) -> &RecordLog<W, C> {
        &self.log
    }
}
