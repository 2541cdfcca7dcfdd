//! Byte transport to the module
//!
//! Bring-up only needs three things from the UART the module hangs off:
//! write a byte, read a byte if one is waiting, and change the line rate.
//! [`Transport`] and [`AsyncTransport`] capture exactly that so boards can
//! plug in whatever driver they have. Changing the rate is a register write
//! on every UART we know of, so both share the blocking [`BaudControl`].
//! [`SerialTransport`] adapts any `embedded-io` serial port that can also
//! change its baud rate.

/// Control over the local line rate.
pub trait BaudControl {
    /// Transport error type
    type Error;

    /// Switches the local side of the line to `baud`.
    fn set_baud_rate(&mut self, baud: u32) -> Result<(), Self::Error>;

    /// Current local baud rate.
    fn baud_rate(&self) -> u32;
}

impl<T: BaudControl + ?Sized> BaudControl for &mut T {
    type Error = T::Error;

    fn set_baud_rate(&mut self, baud: u32) -> Result<(), Self::Error> {
        T::set_baud_rate(self, baud)
    }

    fn baud_rate(&self) -> u32 {
        T::baud_rate(self)
    }
}

/// Blocking byte transport.
pub trait Transport: BaudControl {
    /// Writes a single byte.
    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error>;

    /// Reads a single byte, returning `None` if nothing is waiting.
    fn read_byte(&mut self) -> Result<Option<u8>, Self::Error>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        T::write_byte(self, byte)
    }

    fn read_byte(&mut self) -> Result<Option<u8>, Self::Error> {
        T::read_byte(self)
    }
}

/// Async byte transport.
///
/// This is the async version of [`Transport`].
pub trait AsyncTransport: BaudControl {
    /// Writes a single byte.
    async fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error>;

    /// Reads a single byte, returning `None` if nothing is waiting.
    async fn read_byte(&mut self) -> Result<Option<u8>, Self::Error>;
}

impl<T: AsyncTransport + ?Sized> AsyncTransport for &mut T {
    async fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        T::write_byte(self, byte).await
    }

    async fn read_byte(&mut self) -> Result<Option<u8>, Self::Error> {
        T::read_byte(self).await
    }
}

/// Serial ports whose line rate can be changed at runtime.
pub trait BaudRate: embedded_io::ErrorType {
    /// Reconfigures the port for `baud`.
    fn set_baud_rate(&mut self, baud: u32) -> Result<(), Self::Error>;
}

/// [`Transport`] over an `embedded-io` serial port.
///
/// Reads never block: the port is asked whether a byte is waiting before
/// reading.
pub struct SerialTransport<IO> {
    io: IO,
    baud: u32,
}

impl<IO> SerialTransport<IO> {
    /// Wraps a serial port currently running at `baud`.
    pub fn new(io: IO, baud: u32) -> Self {
        Self { io, baud }
    }

    /// Releases the underlying serial port.
    pub fn release(self) -> IO {
        self.io
    }
}

impl<IO: BaudRate> BaudControl for SerialTransport<IO> {
    type Error = IO::Error;

    fn set_baud_rate(&mut self, baud: u32) -> Result<(), Self::Error> {
        BaudRate::set_baud_rate(&mut self.io, baud)?;
        self.baud = baud;
        Ok(())
    }

    fn baud_rate(&self) -> u32 {
        self.baud
    }
}

impl<IO> Transport for SerialTransport<IO>
where
    IO: embedded_io::Read + embedded_io::ReadReady + embedded_io::Write + BaudRate,
{
    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        embedded_io::Write::write_all(&mut self.io, &[byte])
    }

    fn read_byte(&mut self) -> Result<Option<u8>, Self::Error> {
        if !self.io.read_ready()? {
            return Ok(None);
        }

        let mut byte = [0u8];
        match embedded_io::Read::read(&mut self.io, &mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }
}

impl<IO> AsyncTransport for SerialTransport<IO>
where
    IO: embedded_io_async::Read + embedded_io_async::Write + embedded_io::ReadReady + BaudRate,
{
    async fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        embedded_io_async::Write::write_all(&mut self.io, &[byte]).await
    }

    async fn read_byte(&mut self) -> Result<Option<u8>, Self::Error> {
        if !self.io.read_ready()? {
            return Ok(None);
        }

        let mut byte = [0u8];
        match embedded_io_async::Read::read(&mut self.io, &mut byte).await? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct Loopback {
        rx: VecDeque<u8>,
        tx: Vec<u8>,
        baud: u32,
    }

    impl embedded_io::ErrorType for Loopback {
        type Error = Infallible;
    }

    impl embedded_io::Read for Loopback {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            let mut n = 0;
            while n < buf.len() {
                match self.rx.pop_front() {
                    Some(byte) => {
                        buf[n] = byte;
                        n += 1;
                    }
                    None => break,
                }
            }
            Ok(n)
        }
    }

    impl embedded_io::ReadReady for Loopback {
        fn read_ready(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.rx.is_empty())
        }
    }

    impl embedded_io::Write for Loopback {
        fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            self.tx.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    impl BaudRate for Loopback {
        fn set_baud_rate(&mut self, baud: u32) -> Result<(), Self::Error> {
            self.baud = baud;
            Ok(())
        }
    }

    #[test]
    fn test_read_without_data_returns_none() {
        let mut transport = SerialTransport::new(Loopback::default(), 115200);
        assert_eq!(Transport::read_byte(&mut transport), Ok(None));
    }

    #[test]
    fn test_reads_bytes_in_order() {
        let port = Loopback {
            rx: VecDeque::from(b"OK".to_vec()),
            ..Default::default()
        };
        let mut transport = SerialTransport::new(port, 115200);
        assert_eq!(Transport::read_byte(&mut transport), Ok(Some(b'O')));
        assert_eq!(Transport::read_byte(&mut transport), Ok(Some(b'K')));
        assert_eq!(Transport::read_byte(&mut transport), Ok(None));
    }

    #[test]
    fn test_writes_reach_port() {
        let mut transport = SerialTransport::new(Loopback::default(), 115200);
        for byte in *b"GB\r" {
            Transport::write_byte(&mut transport, byte).unwrap();
        }
        assert_eq!(transport.release().tx, b"GB\r");
    }

    #[test]
    fn test_baud_rate_tracks_port() {
        let mut transport = SerialTransport::new(Loopback::default(), 115200);
        transport.set_baud_rate(9600).unwrap();
        assert_eq!(transport.baud_rate(), 9600);
        assert_eq!(transport.release().baud, 9600);
    }
}
