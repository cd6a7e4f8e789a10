use crate::{Result, TransportError, TransportInfo, Word, WordSpan};
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;
use tokio_modbus::client::sync::{self, Context, Reader, Writer};
use tokio_modbus::Slave;
use tracing::debug;

/// Port the RH56 family listens on out of the box.
pub const DEFAULT_MODBUS_PORT: u16 = 6000;

/// Bounded wait for one request/response exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Modbus TCP backend: words are holding registers of one unit.
pub struct ModbusTcpTransport {
    addr: SocketAddr,
    unit_id: u8,
    timeout: Duration,
    ctx: Option<Context>,
}

impl ModbusTcpTransport {
    /// Does not touch the network; call [`connect`](crate::WordTransport::connect).
    pub fn new(addr: SocketAddr, unit_id: u8, timeout: Duration) -> Self {
        Self {
            addr,
            unit_id,
            timeout,
            ctx: None,
        }
    }

    /// Resolve `host:port` and build an unconnected transport.
    pub fn resolve(host: &str, port: u16, unit_id: u8, timeout: Duration) -> Result<Self> {
        let addr = (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| TransportError::Io(format!("cannot resolve {host}:{port}")))?;
        Ok(Self::new(addr, unit_id, timeout))
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn context(&mut self) -> Result<&mut Context> {
        self.ctx.as_mut().ok_or(TransportError::NotConnected)
    }
}

fn map_error(err: tokio_modbus::Error) -> TransportError {
    match err {
        tokio_modbus::Error::Transport(io) => TransportError::from(io),
        other => TransportError::Io(other.to_string()),
    }
}

impl crate::WordTransport for ModbusTcpTransport {
    fn connect(&mut self) -> Result<()> {
        self.ctx = None;
        debug!(addr = %self.addr, unit = self.unit_id, "modbus connect");
        let ctx =
            sync::tcp::connect_slave_with_timeout(self.addr, Slave(self.unit_id), Some(self.timeout))?;
        self.ctx = Some(ctx);
        Ok(())
    }

    fn close(&mut self) {
        // dropping the context shuts the socket
        if self.ctx.take().is_some() {
            debug!(addr = %self.addr, "modbus close");
        }
    }

    fn is_connected(&self) -> bool {
        self.ctx.is_some()
    }

    fn read_words(&mut self, address: Word, count: u16) -> Result<Vec<Word>> {
        let span = WordSpan::new(address, count).ok_or(TransportError::InvalidRequest("span"))?;
        let ctx = self.context()?;
        match ctx.read_holding_registers(span.start(), span.count()) {
            Ok(Ok(words)) => Ok(words),
            Ok(Err(code)) => Err(TransportError::Exception(format!("{code:?}"))),
            Err(e) => Err(map_error(e)),
        }
    }

    fn write_word(&mut self, address: Word, value: Word) -> Result<()> {
        let ctx = self.context()?;
        match ctx.write_single_register(address, value) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(code)) => Err(TransportError::Exception(format!("{code:?}"))),
            Err(e) => Err(map_error(e)),
        }
    }

    fn describe(&self) -> TransportInfo {
        TransportInfo {
            name: self.addr.to_string(),
            driver: "modbus-tcp".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WordTransport;

    #[test]
    fn unconnected_requests_fail_without_io() {
        let addr: SocketAddr = "127.0.0.1:6000".parse().unwrap();
        let mut t = ModbusTcpTransport::new(addr, 1, Duration::from_millis(100));
        assert!(!t.is_connected());
        assert_eq!(t.read_words(0, 1), Err(TransportError::NotConnected));
        assert_eq!(t.write_word(0, 1), Err(TransportError::NotConnected));
        t.close();
        t.close();
        assert_eq!(t.describe().driver, "modbus-tcp");
    }

    #[test]
    fn rejects_bad_span_before_io() {
        let addr: SocketAddr = "127.0.0.1:6000".parse().unwrap();
        let mut t = ModbusTcpTransport::new(addr, 1, DEFAULT_TIMEOUT);
        assert_eq!(
            t.read_words(0, 0),
            Err(TransportError::InvalidRequest("span"))
        );
    }
}
