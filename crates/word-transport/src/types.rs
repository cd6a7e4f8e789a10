use core::fmt;

/// One protocol word (a 16-bit holding register).
pub type Word = u16;

/// Upper bound on words fetched by a single read request.
pub const MAX_WORDS_PER_READ: u16 = 125;

/// A contiguous run of words starting at `start`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct WordSpan {
    start: Word,
    count: u16,
}

impl WordSpan {
    pub fn new(start: Word, count: u16) -> Option<Self> {
        if count == 0 || count > MAX_WORDS_PER_READ {
            return None;
        }
        // last word must still be addressable
        start.checked_add(count - 1)?;
        Some(Self { start, count })
    }

    /// Span covering `start..=end`.
    pub fn inclusive(start: Word, end: Word) -> Option<Self> {
        if end < start {
            return None;
        }
        let count = u16::try_from(u32::from(end) - u32::from(start) + 1).ok()?;
        Self::new(start, count)
    }

    pub fn start(&self) -> Word {
        self.start
    }
    pub fn count(&self) -> u16 {
        self.count
    }
    pub fn end(&self) -> Word {
        self.start + (self.count - 1)
    }

    pub fn addresses(&self) -> impl Iterator<Item = Word> {
        self.start..=self.end()
    }
}

impl fmt::Display for WordSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 1 {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end())
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransportInfo {
    pub name: String,
    pub driver: String,
}
