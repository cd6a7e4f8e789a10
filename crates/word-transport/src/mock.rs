use crate::{Result, TransportError, TransportInfo, Word, WordSpan};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct MockState {
    words: HashMap<Word, Word>,
    connected: bool,
    refuse_connect: bool,
    pending_read_faults: usize,
    pending_write_faults: usize,
    rejected: HashSet<Word>,
    reads: usize,
    writes: usize,
    connects: usize,
    closes: usize,
}

/// In-process transport backed by a word map. Unwritten words read as zero.
///
/// Clones of the [`MockHandle`] share state with the transport, so a test can
/// keep a handle after moving the transport into a client.
pub struct MockTransport {
    name: String,
    state: Arc<Mutex<MockState>>,
}

/// Inspection and fault-injection side of a [`MockTransport`].
#[derive(Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockTransport {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    pub fn handle(&self) -> MockHandle {
        MockHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl MockHandle {
    pub fn word(&self, address: Word) -> Word {
        lock(&self.state).words.get(&address).copied().unwrap_or(0)
    }

    pub fn set_word(&self, address: Word, value: Word) {
        lock(&self.state).words.insert(address, value);
    }

    /// Drop the link as if the peer went away; the next request fails.
    pub fn drop_link(&self) {
        lock(&self.state).connected = false;
    }

    pub fn refuse_connect(&self, refuse: bool) {
        lock(&self.state).refuse_connect = refuse;
    }

    /// Fail the next `n` reads with an I/O error.
    pub fn fail_reads(&self, n: usize) {
        lock(&self.state).pending_read_faults = n;
    }

    /// Fail the next `n` writes with an I/O error.
    pub fn fail_writes(&self, n: usize) {
        lock(&self.state).pending_write_faults = n;
    }

    /// Answer any request touching `address` with an exception response.
    pub fn reject_address(&self, address: Word) {
        lock(&self.state).rejected.insert(address);
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.state).connected
    }

    pub fn read_calls(&self) -> usize {
        lock(&self.state).reads
    }

    pub fn write_calls(&self) -> usize {
        lock(&self.state).writes
    }

    pub fn connect_calls(&self) -> usize {
        lock(&self.state).connects
    }

    pub fn close_calls(&self) -> usize {
        lock(&self.state).closes
    }
}

impl MockTransport {
    fn check_link(state: &MockState) -> Result<()> {
        if state.connected {
            Ok(())
        } else {
            Err(TransportError::NotConnected)
        }
    }
}

impl crate::WordTransport for MockTransport {
    fn connect(&mut self) -> Result<()> {
        let mut st = lock(&self.state);
        st.connects += 1;
        if st.refuse_connect {
            st.connected = false;
            return Err(TransportError::Io(format!("{}: connection refused", self.name)));
        }
        st.connected = true;
        Ok(())
    }

    fn close(&mut self) {
        let mut st = lock(&self.state);
        st.closes += 1;
        st.connected = false;
    }

    fn is_connected(&self) -> bool {
        lock(&self.state).connected
    }

    fn read_words(&mut self, address: Word, count: u16) -> Result<Vec<Word>> {
        let mut st = lock(&self.state);
        st.reads += 1;
        Self::check_link(&st)?;
        if st.pending_read_faults > 0 {
            st.pending_read_faults -= 1;
            return Err(TransportError::Io("connection reset by peer".into()));
        }
        let span = WordSpan::new(address, count).ok_or(TransportError::InvalidRequest("span"))?;
        if span.addresses().any(|a| st.rejected.contains(&a)) {
            return Err(TransportError::Exception("IllegalDataAddress".into()));
        }
        Ok(span
            .addresses()
            .map(|a| st.words.get(&a).copied().unwrap_or(0))
            .collect())
    }

    fn write_word(&mut self, address: Word, value: Word) -> Result<()> {
        let mut st = lock(&self.state);
        st.writes += 1;
        Self::check_link(&st)?;
        if st.pending_write_faults > 0 {
            st.pending_write_faults -= 1;
            return Err(TransportError::Io("broken pipe".into()));
        }
        if st.rejected.contains(&address) {
            return Err(TransportError::Exception("IllegalDataAddress".into()));
        }
        st.words.insert(address, value);
        Ok(())
    }

    fn describe(&self) -> TransportInfo {
        TransportInfo {
            name: self.name.clone(),
            driver: "mock".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WordTransport;

    #[test]
    fn requires_connect() {
        let mut t = MockTransport::new("mock0");
        assert_eq!(t.read_words(0, 1), Err(TransportError::NotConnected));
        t.connect().unwrap();
        assert_eq!(t.read_words(0, 1).unwrap(), vec![0]);
    }

    #[test]
    fn reads_back_writes() {
        let mut t = MockTransport::new("mock0");
        let h = t.handle();
        t.connect().unwrap();
        t.write_word(1000, 5).unwrap();
        h.set_word(1001, 7);
        assert_eq!(t.read_words(1000, 2).unwrap(), vec![5, 7]);
        assert_eq!(h.word(1000), 5);
        assert_eq!(h.read_calls(), 1);
        assert_eq!(h.write_calls(), 1);
    }

    #[test]
    fn injected_faults() {
        let mut t = MockTransport::new("mock0");
        let h = t.handle();
        t.connect().unwrap();
        h.fail_reads(1);
        assert!(matches!(t.read_words(0, 1), Err(TransportError::Io(_))));
        assert!(t.read_words(0, 1).is_ok());

        h.reject_address(1474);
        let err = t.read_words(1474, 2).unwrap_err();
        assert!(err.is_protocol());
        assert!(t.write_word(1474, 1).unwrap_err().is_protocol());

        h.refuse_connect(true);
        t.close();
        assert!(t.connect().is_err());
        assert!(!h.is_connected());
        assert_eq!(h.connect_calls(), 2);
        assert_eq!(h.close_calls(), 1);
    }
}
