//! One-way delay measurement over a byte stream.
//!
//! The sender writes fixed size segments, each carrying a sequence counter behind a sentinel
//!  byte at a fixed offset, and logs when it sent each counter value. The receiver scans
//!  whatever the stream delivers for sentinel bytes, decodes the counters and logs when each
//!  one arrived. Joining the two logs on the counter value gives per-segment delays (plus the
//!  offset between the two hosts' clocks, which is not corrected for).
//!
//! Segment layout, with the marker window at `marker_offset` (`segment_len/2 - 3` by default):
//!
//! ```ascii
//! 0:                  zero fill
//! marker_offset:      sentinel (u8, 1 by default)
//! marker_offset + 1:  counter digits E, D, C, B, A (u8 each, most significant first)
//! marker_offset + 6:  zero fill up to segment_len
//! ```
//!
//! Counter digits never take the values 0 or 1, so the fill bytes and a default sentinel can
//!  not be confused with a digit.
//!
//! Log records are text lines `seconds, nanoseconds, A, B, C, D, E`, optionally preceded by one
//!  line of free text.

pub mod clock;
pub mod counter;
pub mod endpoint;
pub mod pacer;
pub mod probe_config;
pub mod receiver;
pub mod record_log;
pub mod segment_encoder;
pub mod sender;
pub mod stream_scanner;
