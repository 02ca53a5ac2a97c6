use std::path::PathBuf;
use std::time::Duration;
use anyhow::bail;

use crate::probe::counter::{MIN_DIGIT, NUM_DIGITS};
use crate::probe::segment_encoder::{MarkerLayout, MARKER_WINDOW_LEN};
use crate::probe::stream_scanner::DEFAULT_LEADING_SKIP;

pub const DEFAULT_SEGMENT_LEN: usize = 500;

/// How the receiver cuts the byte stream into chunks for scanning
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ReadMode {
    /// Scan whatever a single read returns. Markers that straddle two reads are lost.
    Chunk,
    /// Keep reading until a full segment's worth of bytes is buffered, then scan. Since the sender
    ///  writes nothing but fixed size segments, this keeps chunks aligned with segments.
    Segment,
}

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub layout: MarkerLayout,

    /// number of bytes at the start of every received chunk that are not scanned for markers
    pub leading_skip: usize,
    /// capacity of the receive buffer, i.e. the maximum chunk size
    pub read_buffer_len: usize,
    pub read_mode: ReadMode,

    pub num_segments: u64,
    pub send_interval: Duration,
    /// digits `A` to `E`, clamped so that no digit is reserved
    pub start_counter: [u8; NUM_DIGITS],

    pub log_path: PathBuf,
    /// free text, written as the first line of the log
    pub annotation: Option<String>,
    /// `fsync` the log after every record rather than just flushing it to the OS
    pub sync_log_to_disk: bool,
}

impl ProbeConfig {
    pub fn new(log_path: impl Into<PathBuf>) -> ProbeConfig {
        ProbeConfig {
            layout: MarkerLayout::centered(DEFAULT_SEGMENT_LEN),
            leading_skip: DEFAULT_LEADING_SKIP,
            read_buffer_len: DEFAULT_SEGMENT_LEN,
            read_mode: ReadMode::Chunk,
            num_segments: 100,
            send_interval: Duration::from_millis(10),
            start_counter: [MIN_DIGIT; NUM_DIGITS],
            log_path: log_path.into(),
            annotation: None,
            sync_log_to_disk: false,
        }
    }

    /// Changes the segment length, moving the marker to the centered default position
    pub fn with_segment_len(mut self, segment_len: usize) -> ProbeConfig {
        self.layout = MarkerLayout {
            sentinel: self.layout.sentinel,
            ..MarkerLayout::centered(segment_len)
        };
        self.read_buffer_len = segment_len;
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.layout.validate()?;

        if self.layout.marker_offset < self.leading_skip {
            bail!("marker window at offset {} lies inside the leading {} bytes that are not scanned", self.layout.marker_offset, self.leading_skip);
        }
        if self.read_buffer_len < MARKER_WINDOW_LEN {
            bail!("read buffer of {} bytes cannot hold a marker window", self.read_buffer_len);
        }
        if self.read_mode == ReadMode::Segment && self.read_buffer_len != self.layout.segment_len {
            bail!("reading full segments requires a read buffer of exactly one segment ({} bytes), was {}", self.layout.segment_len, self.read_buffer_len);
        }
        if let Some(annotation) = &self.annotation {
            if annotation.contains('\n') {
                bail!("log annotation must be a single line");
            }
        }
        Ok(())
    }
}
