use anyhow::bail;
use bytes::{BufMut, BytesMut};

use crate::probe::counter::{CounterValue, MIN_DIGIT, NUM_DIGITS};

pub const DEFAULT_SENTINEL: u8 = 1;
pub const FILL_BYTE: u8 = 0;

/// sentinel byte followed by the counter digits
pub const MARKER_WINDOW_LEN: usize = 1 + NUM_DIGITS;

/// Where in a segment the marker window goes. This is shared between sender and receiver, and
///  both sides must agree on it for measurements to work.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct MarkerLayout {
    pub segment_len: usize,
    pub marker_offset: usize,
    pub sentinel: u8,
}

impl MarkerLayout {
    /// The reference layout: the window is centered in the segment, starting at `len/2 - 3`.
    pub fn centered(segment_len: usize) -> MarkerLayout {
        MarkerLayout {
            segment_len,
            marker_offset: default_marker_offset(segment_len),
            sentinel: DEFAULT_SENTINEL,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.segment_len < MARKER_WINDOW_LEN {
            bail!("segment length {} is too small for the {} byte marker window", self.segment_len, MARKER_WINDOW_LEN);
        }
        if self.marker_offset > self.segment_len - MARKER_WINDOW_LEN {
            bail!("marker window at offset {} does not fit into a segment of {} bytes", self.marker_offset, self.segment_len);
        }
        if self.sentinel == FILL_BYTE {
            bail!("sentinel must differ from the fill byte {}", FILL_BYTE);
        }
        // A sentinel that is also a live digit relies on a fill byte behind the window: a read
        //  that starts inside a window then sees that fill byte in every window it can match.
        if self.sentinel >= MIN_DIGIT && self.marker_offset + MARKER_WINDOW_LEN == self.segment_len {
            bail!("sentinel {} is a valid counter digit and needs at least one fill byte after the marker window", self.sentinel);
        }
        Ok(())
    }
}

pub fn default_marker_offset(segment_len: usize) -> usize {
    (segment_len / 2).saturating_sub(MARKER_WINDOW_LEN / 2)
}

#[derive(Debug)]
pub struct SegmentEncoder {
    layout: MarkerLayout,
}

impl SegmentEncoder {
    pub fn new(layout: MarkerLayout) -> anyhow::Result<SegmentEncoder> {
        layout.validate()?;
        Ok(SegmentEncoder { layout })
    }

    pub fn layout(&self) -> &MarkerLayout {
        &self.layout
    }

    pub fn encode(&self, value: CounterValue) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.layout.segment_len);
        self.encode_into(value, &mut buf);
        buf
    }

    /// Clears `buf` and writes a full segment into it
    pub fn encode_into(&self, value: CounterValue, buf: &mut BytesMut) {
        buf.clear();
        buf.put_bytes(FILL_BYTE, self.layout.marker_offset);
        buf.put_u8(self.layout.sentinel);
        buf.put_slice(&value.to_wire());
        buf.put_bytes(FILL_BYTE, self.layout.segment_len - self.layout.marker_offset - MARKER_WINDOW_LEN);
    }
}
