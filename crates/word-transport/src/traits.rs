use crate::{Result, TransportInfo, Word};

/// A minimal blocking word-addressed transport.
///
/// Each call is one request/response exchange. Implementations own their timeout;
/// nothing here retries.
pub trait WordTransport: Send {
    /// Open (or re-open) the underlying connection.
    fn connect(&mut self) -> Result<()>;

    /// Release the connection. Must be safe to call when already closed.
    fn close(&mut self);

    fn is_connected(&self) -> bool;

    /// Read `count` consecutive words starting at `address`.
    fn read_words(&mut self, address: Word, count: u16) -> Result<Vec<Word>>;

    /// Write one word at `address`.
    fn write_word(&mut self, address: Word, value: Word) -> Result<()>;

    fn describe(&self) -> TransportInfo;
}

impl<T: WordTransport + ?Sized> WordTransport for Box<T> {
    fn connect(&mut self) -> Result<()> {
        (**self).connect()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn read_words(&mut self, address: Word, count: u16) -> Result<Vec<Word>> {
        (**self).read_words(address, count)
    }

    fn write_word(&mut self, address: Word, value: Word) -> Result<()> {
        (**self).write_word(address, value)
    }

    fn describe(&self) -> TransportInfo {
        (**self).describe()
    }
}
