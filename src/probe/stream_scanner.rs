use tracing::trace;

use crate::probe::counter::{CounterValue, NUM_DIGITS};
use crate::probe::segment_encoder::{DEFAULT_SENTINEL, MARKER_WINDOW_LEN};

/// Number of leading bytes of each chunk that are never scanned. A plain TCP stream carries no
///  preamble, so nothing is skipped by default.
pub const DEFAULT_LEADING_SKIP: usize = 0;

/// A counter found in a received chunk
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct DecodedMarker {
    /// offset of the sentinel byte inside the chunk
    pub offset: usize,
    pub value: CounterValue,
}

/// Finds marker windows in chunks of received bytes.
///
/// The scanner works on one chunk at a time and keeps no state between chunks: a window whose
///  counter bytes are split across two reads is not decoded. This loses measurements for
///  segments whose marker happens to land on a read boundary, which biases delay statistics
///  slightly towards segments that arrived in one piece.
#[derive(Debug, Clone)]
pub struct StreamScanner {
    sentinel: u8,
    leading_skip: usize,
}

impl StreamScanner {
    pub fn new(sentinel: u8, leading_skip: usize) -> StreamScanner {
        StreamScanner {
            sentinel,
            leading_skip,
        }
    }

    /// Iterates over all complete marker windows in `chunk`, left to right.
    pub fn scan<'a>(&self, chunk: &'a [u8]) -> ScanIter<'a> {
        ScanIter {
            chunk,
            sentinel: self.sentinel,
            pos: self.leading_skip,
            num_discarded: 0,
        }
    }
}

impl Default for StreamScanner {
    fn default() -> Self {
        StreamScanner::new(DEFAULT_SENTINEL, DEFAULT_LEADING_SKIP)
    }
}

pub struct ScanIter<'a> {
    chunk: &'a [u8],
    sentinel: u8,
    pos: usize,
    num_discarded: usize,
}

impl ScanIter<'_> {
    /// Number of sentinel matches so far whose trailing bytes were not a live counter (i.e.
    ///  contained a reserved digit). These are most likely tails of a window that started in
    ///  the previous chunk.
    pub fn num_discarded(&self) -> usize {
        self.num_discarded
    }
}

impl Iterator for ScanIter<'_> {
    type Item = DecodedMarker;

    fn next(&mut self) -> Option<DecodedMarker> {
        // a sentinel in the last NUM_DIGITS bytes has no complete counter behind it
        while self.pos + MARKER_WINDOW_LEN <= self.chunk.len() {
            let offset = self.pos;
            if self.chunk[offset] != self.sentinel {
                self.pos += 1;
                continue;
            }

            let mut wire = [0u8; NUM_DIGITS];
            wire.copy_from_slice(&self.chunk[offset + 1 .. offset + MARKER_WINDOW_LEN]);
            let value = CounterValue::from_wire(wire);

            if !value.is_live() {
                trace!(offset, ?value, "sentinel match is not followed by a live counter - skipping");
                self.num_discarded += 1;
                self.pos += 1;
                continue;
            }

            self.pos = offset + MARKER_WINDOW_LEN;
            return Some(DecodedMarker { offset, value });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use crate::probe::counter::SequenceCounter;
    use crate::probe::segment_encoder::{MarkerLayout, SegmentEncoder};
    use super::*;

    fn digits(markers: &[DecodedMarker]) -> Vec<[u8; 5]> {
        markers.iter().map(|m| m.value.digits()).collect()
    }

    #[rstest]
    #[case::reference(500, [2, 2, 2, 2, 2])]
    #[case::reference_high(500, [255, 254, 253, 252, 251])]
    #[case::minimal(6, [9, 8, 7, 6, 5])]
    #[case::small(7, [2, 3, 4, 5, 6])]
    #[case::large(9000, [17, 2, 255, 3, 200])]
    fn test_round_trip(#[case] segment_len: usize, #[case] start: [u8; 5]) {
        let encoder = SegmentEncoder::new(MarkerLayout::centered(segment_len)).unwrap();
        let value = CounterValue::initial(start);
        let segment = encoder.encode(value);

        let found = StreamScanner::default().scan(&segment).collect::<Vec<_>>();
        assert_eq!(found, vec![DecodedMarker {
            offset: encoder.layout().marker_offset,
            value,
        }]);
    }

    #[test]
    fn test_round_trip_counter_sequence() {
        let encoder = SegmentEncoder::new(MarkerLayout::centered(64)).unwrap();
        let scanner = StreamScanner::default();
        let mut counter = SequenceCounter::new([250, 255, 2, 2, 2]);

        for _ in 0..20 {
            let value = counter.current();
            let segment = encoder.encode(value);
            let found = scanner.scan(&segment).map(|m| m.value).collect::<Vec<_>>();
            assert_eq!(found, vec![value]);
            counter.advance();
        }
    }

    #[rstest]
    #[case::last_byte(b"\0\0\0\0\0\0\0\x01")]
    #[case::four_from_end(b"\0\0\0\0\x01\x02\x02\x02")]
    #[case::five_from_end(b"\0\0\0\x01\x02\x02\x02\x02")]
    #[case::only_sentinel(b"\x01")]
    #[case::short(b"\x01\x02\x02")]
    #[case::empty(b"")]
    fn test_incomplete_window_at_end(#[case] chunk: &[u8]) {
        let mut iter = StreamScanner::default().scan(chunk);
        assert_eq!(iter.next(), None);
        assert_eq!(iter.num_discarded(), 0);
    }

    #[test]
    fn test_complete_window_at_end() {
        let found = StreamScanner::default().scan(b"\0\0\x01\x06\x05\x04\x03\x02").collect::<Vec<_>>();
        assert_eq!(found, vec![DecodedMarker { offset: 2, value: CounterValue::from_digits([2, 3, 4, 5, 6]) }]);
    }

    #[test]
    fn test_two_markers_in_order() {
        let mut chunk = vec![0u8; 40];
        chunk[3..9].copy_from_slice(&[1, 2, 2, 2, 2, 7]);
        chunk[25..31].copy_from_slice(&[1, 2, 2, 2, 2, 8]);

        let found = StreamScanner::default().scan(&chunk).collect::<Vec<_>>();
        assert_eq!(found.iter().map(|m| m.offset).collect::<Vec<_>>(), vec![3, 25]);
        assert_eq!(digits(&found), vec![[7, 2, 2, 2, 2], [8, 2, 2, 2, 2]]);
    }

    #[test]
    fn test_adjacent_segments() {
        let encoder = SegmentEncoder::new(MarkerLayout::centered(100)).unwrap();
        let mut chunk = encoder.encode(CounterValue::from_digits([2, 2, 2, 2, 2])).to_vec();
        chunk.extend_from_slice(&encoder.encode(CounterValue::from_digits([3, 2, 2, 2, 2])));
        chunk.extend_from_slice(&encoder.encode(CounterValue::from_digits([4, 2, 2, 2, 2])));

        let found = StreamScanner::default().scan(&chunk).collect::<Vec<_>>();
        assert_eq!(found.iter().map(|m| m.offset).collect::<Vec<_>>(), vec![47, 147, 247]);
        assert_eq!(digits(&found), vec![[2, 2, 2, 2, 2], [3, 2, 2, 2, 2], [4, 2, 2, 2, 2]]);
    }

    #[rstest]
    #[case::skip_covers_marker(4, b"\0\0\x01\x02\x02\x02\x02\x02\0\0", vec![])]
    #[case::skip_before_marker(2, b"\0\0\x01\x02\x02\x02\x02\x02\0\0", vec![[2, 2, 2, 2, 2]])]
    #[case::skip_past_chunk(20, b"\0\0\x01\x02\x02\x02\x02\x02\0\0", vec![])]
    fn test_leading_skip(#[case] skip: usize, #[case] chunk: &[u8], #[case] expected: Vec<[u8; 5]>) {
        let found = StreamScanner::new(1, skip).scan(chunk).collect::<Vec<_>>();
        assert_eq!(digits(&found), expected);
    }

    #[test]
    fn test_tail_of_split_window_is_discarded() {
        // the first chunk ended after the sentinel and one digit of a window; what remains looks
        //  like a window with reserved digits
        let chunk = b"\x02\x02\x01\x02\x02\0\0\0\0\0\0";
        let mut iter = StreamScanner::default().scan(chunk);
        assert_eq!(iter.next(), None);
        assert_eq!(iter.num_discarded(), 1);
    }

    #[test]
    fn test_counter_digits_are_not_rescanned() {
        // with a sentinel value that is also a valid digit, the digits of a decoded window must
        //  not be taken for another sentinel
        let chunk = b"\0\x07\x07\x07\x07\x07\x07\x07\x07\x07\x07\x07\x07\0";
        let found = StreamScanner::new(7, 0).scan(chunk).collect::<Vec<_>>();
        assert_eq!(found.iter().map(|m| m.offset).collect::<Vec<_>>(), vec![1, 7]);
    }

    #[test]
    fn test_digit_sentinel_with_read_starting_inside_window() {
        // segments of 7 bytes, sentinel 7, one fill byte behind each window; the read starts right
        //  behind the first sentinel, so the first window's last digit is a 7
        let encoder = SegmentEncoder::new(MarkerLayout { segment_len: 7, marker_offset: 0, sentinel: 7 }).unwrap();
        let mut data = encoder.encode(CounterValue::from_digits([7, 2, 2, 2, 2])).to_vec();
        data.extend_from_slice(&encoder.encode(CounterValue::from_digits([8, 2, 2, 2, 2])));

        let mut iter = StreamScanner::new(7, 0).scan(&data[1..]);
        let found = (&mut iter).map(|m| m.value.digits()).collect::<Vec<_>>();
        assert_eq!(found, vec![[8, 2, 2, 2, 2]]);
        assert_eq!(iter.num_discarded(), 1);
    }

    #[test]
    fn test_custom_sentinel() {
        let chunk = b"\x01\x01\x09\x05\x04\x03\x02\x02\0";
        let found = StreamScanner::new(9, 0).scan(chunk).collect::<Vec<_>>();
        assert_eq!(found, vec![DecodedMarker { offset: 2, value: CounterValue::from_digits([2, 2, 3, 4, 5]) }]);
    }
}
