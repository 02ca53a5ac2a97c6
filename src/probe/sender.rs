use anyhow::Context;
use bytes::BytesMut;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, instrument, trace};

use crate::probe::clock::WallClock;
use crate::probe::counter::SequenceCounter;
use crate::probe::pacer::Pacer;
use crate::probe::probe_config::ProbeConfig;
use crate::probe::record_log::{LogSink, RecordLog};
use crate::probe::segment_encoder::SegmentEncoder;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SendSummary {
    pub num_segments: u64,
    pub num_bytes: u64,
    pub num_records_skipped: u64,
}

/// The sending end of a measurement: writes paced, counter-stamped segments to the stream and
///  logs the send time of each one.
pub struct SegmentSender<S: AsyncWrite + Unpin, W: LogSink, C: WallClock> {
    stream: S,
    encoder: SegmentEncoder,
    counter: SequenceCounter,
    pacer: Pacer,
    log: RecordLog<W, C>,
}

impl <S: AsyncWrite + Unpin, W: LogSink, C: WallClock> SegmentSender<S, W, C> {
    pub fn new(config: &ProbeConfig, stream: S, log: RecordLog<W, C>) -> anyhow::Result<SegmentSender<S, W, C>> {
        config.validate()?;

        Ok(SegmentSender {
            stream,
            encoder: SegmentEncoder::new(config.layout)?,
            counter: SequenceCounter::new(config.start_counter),
            pacer: Pacer::new(config.num_segments, config.send_interval),
            log,
        })
    }

    /// Sends all segments. Any failure to write to the stream or the log ends the run.
    #[instrument(skip_all)]
    pub async fn run(&mut self) -> anyhow::Result<SendSummary> {
        let mut buf = BytesMut::with_capacity(self.encoder.layout().segment_len);
        let mut num_bytes = 0u64;

        while let Some(idx) = self.pacer.next().await {
            let value = self.counter.current();
            self.encoder.encode_into(value, &mut buf);

            self.stream.write_all(&buf).await
                .with_context(|| format!("sending segment #{}", idx))?;
            self.stream.flush().await
                .context("flushing stream")?;
            num_bytes += buf.len() as u64;

            trace!(idx, ?value, "sent segment");
            self.log.record(value)?;

            self.counter.advance();
        }

        debug!("all segments sent, shutting down the stream");
        self.stream.shutdown().await
            .context("shutting down stream")?;

        let summary = SendSummary {
            num_segments: self.pacer.num_issued(),
            num_bytes,
            num_records_skipped: self.log.num_skipped(),
        };
        info!(?summary, "sender finished");
        Ok(summary)
    }

    pub fn log(&self) -> &RecordLog<W, C> {
        &self.log
    }

    #[cfg(test)]
    pub fn stream(&self) -> &S {
        &self.stream
    }
}
