use std::fmt::{Debug, Display, Formatter};

pub const NUM_DIGITS: usize = 5;

/// Digits below this value are reserved: 0 is the segment fill byte and 1 is the default sentinel,
///  so neither can appear as a live counter digit without confusing the scanner.
pub const MIN_DIGIT: u8 = 2;

/// A five-digit base-256 sequence number. Digits are stored least significant first, i.e.
///  `digits[0]` is `A` (varies fastest) and `digits[4]` is `E`.
///
/// On the wire the digits are written most significant first (`E, D, C, B, A`), directly after
///  the sentinel byte.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct CounterValue {
    digits: [u8; NUM_DIGITS],
}

impl Debug for CounterValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d, e] = self.digits;
        write!(f, "({},{},{},{},{})", a, b, c, d, e)
    }
}

impl Display for CounterValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d, e] = self.digits;
        write!(f, "{}, {}, {}, {}, {}", a, b, c, d, e)
    }
}

impl CounterValue {
    /// The starting value for a run: every digit is clamped up to [MIN_DIGIT].
    pub fn initial(digits: [u8; NUM_DIGITS]) -> CounterValue {
        CounterValue {
            digits: digits.map(|d| d.max(MIN_DIGIT)),
        }
    }

    /// Digits in `A, B, C, D, E` order, without clamping. Values with reserved digits are
    ///  representable so that the scanner can report what it saw.
    pub fn from_digits(digits: [u8; NUM_DIGITS]) -> CounterValue {
        CounterValue { digits }
    }

    /// `bytes` in wire order, i.e. `E, D, C, B, A`
    pub fn from_wire(bytes: [u8; NUM_DIGITS]) -> CounterValue {
        let [e, d, c, b, a] = bytes;
        CounterValue { digits: [a, b, c, d, e] }
    }

    pub fn to_wire(&self) -> [u8; NUM_DIGITS] {
        let [a, b, c, d, e] = self.digits;
        [e, d, c, b, a]
    }

    pub fn digits(&self) -> [u8; NUM_DIGITS] {
        self.digits
    }

    /// true iff no digit has a reserved value
    pub fn is_live(&self) -> bool {
        self.digits.iter().all(|&d| d >= MIN_DIGIT)
    }

    /// The digits interpreted as a plain base-256 number with `A` least significant.
    #[cfg(test)]
    pub fn as_u64(&self) -> u64 {
        self.digits.iter()
            .rev()
            .fold(0u64, |acc, &d| (acc << 8) | d as u64)
    }
}

/// The sender's sequence counter. It is created once per run and advanced after every segment
///  that was written successfully.
///
/// A digit that is advanced past 255 rolls over to [MIN_DIGIT] and carries one into the next
///  more significant digit. The carry out of `E` wraps the whole counter, which takes about
///  `254^5` advances and does not happen in realistic runs.
#[derive(Debug)]
pub struct SequenceCounter {
    current: CounterValue,
}

impl SequenceCounter {
    pub fn new(start: [u8; NUM_DIGITS]) -> SequenceCounter {
        SequenceCounter {
            current: CounterValue::initial(start),
        }
    }

    pub fn current(&self) -> CounterValue {
        self.current
    }

    pub fn advance(&mut self) -> CounterValue {
        for digit in self.current.digits.iter_mut() {
            if *digit == u8::MAX {
                *digit = MIN_DIGIT;
                // carry into the next digit
            }
            else {
                *digit += 1;
                break;
            }
        }
        self.current
    }
}

impl Default for SequenceCounter {
    fn default() -> Self {
        SequenceCounter::new([MIN_DIGIT; NUM_DIGITS])
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use super::*;

    #[rstest]
    #[case::all_floor([2, 2, 2, 2, 2], [2, 2, 2, 2, 2])]
    #[case::zeros([0, 0, 0, 0, 0], [2, 2, 2, 2, 2])]
    #[case::ones([1, 1, 1, 1, 1], [2, 2, 2, 2, 2])]
    #[case::mixed([0, 7, 1, 255, 2], [2, 7, 2, 255, 2])]
    #[case::untouched([3, 4, 5, 6, 7], [3, 4, 5, 6, 7])]
    fn test_initial_clamps(#[case] start: [u8; 5], #[case] expected: [u8; 5]) {
        assert_eq!(CounterValue::initial(start).digits(), expected);
        assert_eq!(SequenceCounter::new(start).current().digits(), expected);
    }

    #[rstest]
    #[case::simple([2, 2, 2, 2, 2], [3, 2, 2, 2, 2])]
    #[case::below_max([254, 2, 2, 2, 2], [255, 2, 2, 2, 2])]
    #[case::carry_a([255, 2, 2, 2, 2], [2, 3, 2, 2, 2])]
    #[case::carry_ab([255, 255, 9, 2, 2], [2, 2, 10, 2, 2])]
    #[case::carry_abcd([255, 255, 255, 255, 17], [2, 2, 2, 2, 18])]
    #[case::wrap_all([255, 255, 255, 255, 255], [2, 2, 2, 2, 2])]
    fn test_advance(#[case] start: [u8; 5], #[case] expected: [u8; 5]) {
        let mut counter = SequenceCounter::new(start);
        let returned = counter.advance();
        assert_eq!(returned.digits(), expected);
        assert_eq!(counter.current(), returned);
    }

    #[test]
    fn test_carry_chain_from_all_max() {
        let mut counter = SequenceCounter::new([255, 255, 255, 255, 40]);
        assert_eq!(counter.advance().digits(), [2, 2, 2, 2, 41]);
        assert_eq!(counter.advance().digits(), [3, 2, 2, 2, 41]);
        assert_eq!(counter.advance().digits(), [4, 2, 2, 2, 41]);
    }

    #[test]
    fn test_monotonic_and_live() {
        let mut counter = SequenceCounter::default();
        let mut prev = counter.current();
        assert!(prev.is_live());

        // enough advances to run several carries through B and one into C
        for _ in 0..200_000 {
            let next = counter.advance();
            assert!(next.is_live(), "{:?}", next);
            assert!(next.as_u64() > prev.as_u64(), "{:?} -> {:?}", prev, next);
            prev = next;
        }
        assert!(prev.digits()[2] > MIN_DIGIT);
    }

    #[rstest]
    #[case([2, 3, 4, 5, 6], [6, 5, 4, 3, 2])]
    #[case([255, 2, 2, 2, 9], [9, 2, 2, 2, 255])]
    fn test_wire_order(#[case] digits: [u8; 5], #[case] wire: [u8; 5]) {
        let value = CounterValue::from_digits(digits);
        assert_eq!(value.to_wire(), wire);
        assert_eq!(CounterValue::from_wire(wire), value);
    }

    #[rstest]
    #[case([2, 2, 2, 2, 2], true)]
    #[case([255, 255, 255, 255, 255], true)]
    #[case([2, 2, 0, 2, 2], false)]
    #[case([2, 2, 2, 2, 1], false)]
    fn test_is_live(#[case] digits: [u8; 5], #[case] expected: bool) {
        assert_eq!(CounterValue::from_digits(digits).is_live(), expected);
    }

    #[test]
    fn test_as_u64() {
        assert_eq!(CounterValue::from_digits([2, 2, 2, 2, 2]).as_u64(), 0x02_02_02_02_02);
        assert_eq!(CounterValue::from_digits([1, 0, 0, 0, 0]).as_u64(), 1);
        assert_eq!(CounterValue::from_digits([0, 1, 0, 0, 0]).as_u64(), 256);
    }

    #[test]
    fn test_display() {
        assert_eq!(CounterValue::from_digits([3, 4, 5, 6, 7]).to_string(), "3, 4, 5, 6, 7");
        assert_eq!(format!("{:?}", CounterValue::from_digits([3, 4, 5, 6, 7])), "(3,4,5,6,7)");
    }
}
