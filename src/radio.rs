//! The capability trait a concrete packet radio driver must implement to
//! back a [`crate::network::Network`]. Modeled directly on the
//! nRF24L01+ command surface the mesh layer actually exercises: six
//! reading pipes, dynamic payloads/ACKs, and a configurable auto-retry
//! schedule.

/// A packet radio capable of acting as the mesh layer's physical transport.
///
/// Implementors own SPI/GPIO access to the hardware (or a mock, in tests)
/// and translate these calls into the appropriate register writes. All
/// methods are synchronous; the network layer polls rather than blocking
/// on interrupts.
pub trait Radio {
    /// Radio-specific error type, wrapped by [`crate::error::NetworkError`].
    type Error;

    /// True if the radio responded to initialization as expected (e.g. a
    /// status register read-back matches). A false return from `begin`
    /// short-circuits [`crate::network::Network::begin`] with
    /// `NetworkError::RadioNotValid`, since nothing downstream can
    /// recover from a radio that was never really there.
    fn is_valid(&self) -> bool;

    fn set_channel(&mut self, channel: u8) -> Result<(), Self::Error>;

    fn enable_dynamic_ack(&mut self) -> Result<(), Self::Error>;

    fn enable_dynamic_payloads(&mut self) -> Result<(), Self::Error>;

    /// Sets the auto-retry delay (in 250us units, hardware-native) and
    /// count.
    fn set_retries(&mut self, delay: u8, count: u8) -> Result<(), Self::Error>;

    fn open_reading_pipe(&mut self, pipe: u8, address: [u8; 5]) -> Result<(), Self::Error>;

    fn open_writing_pipe(&mut self, address: [u8; 5]) -> Result<(), Self::Error>;

    fn start_listening(&mut self) -> Result<(), Self::Error>;

    fn stop_listening(&mut self) -> Result<(), Self::Error>;

    /// True if a frame is waiting on any open reading pipe.
    fn available(&mut self) -> Result<bool, Self::Error>;

    /// Reads exactly `len` bytes of the waiting frame into `buf`.
    fn read(&mut self, buf: &mut [u8], len: usize) -> Result<(), Self::Error>;

    /// Size, in bytes, of the next waiting dynamic payload.
    fn get_dynamic_payload_size(&mut self) -> Result<usize, Self::Error>;

    /// Transmits `buf` without blocking for the auto-ACK; `multicast`
    /// selects the no-ACK variant of the hardware write command.
    fn write_fast(&mut self, buf: &[u8], multicast: bool) -> Result<(), Self::Error>;

    /// Flushes the TX FIFO and blocks (hardware-side) until the last
    /// `write_fast` either lands an ACK or exhausts its retries, or
    /// `timeout_ms` elapses, returning whether it succeeded.
    fn tx_standby(&mut self, timeout_ms: u32) -> Result<bool, Self::Error>;
}

#[cfg(any(test, feature = "mocks"))]
pub mod mock {
    use std::collections::VecDeque;
    use std::vec::Vec;

    use super::Radio;

    /// A single logged interaction, for assertions in network-level tests.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        SetChannel(u8),
        SetRetries(u8, u8),
        OpenReadingPipe(u8, [u8; 5]),
        OpenWritingPipe([u8; 5]),
        StartListening,
        StopListening,
        WriteFast(Vec<u8>, bool),
        TxStandby(u32),
    }

    /// An in-memory stand-in for a physical radio: transmissions pushed via
    /// `write_fast` land directly in `inbox`, simulating the point-to-point
    /// link in unit tests without any actual RF hardware.
    pub struct MockRadio {
        pub valid: bool,
        pub inbox: VecDeque<Vec<u8>>,
        pub tx_ack: bool,
        pub calls: Vec<Call>,
    }

    impl MockRadio {
        pub fn new() -> Self {
            MockRadio {
                valid: true,
                inbox: VecDeque::new(),
                tx_ack: true,
                calls: Vec::new(),
            }
        }

        /// Queues `bytes` as if received over the air.
        pub fn deliver(&mut self, bytes: &[u8]) {
            self.inbox.push_back(bytes.to_vec());
        }
    }

    impl Default for MockRadio {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Radio for MockRadio {
        type Error = ();

        fn is_valid(&self) -> bool {
            self.valid
        }

        fn set_channel(&mut self, channel: u8) -> Result<(), Self::Error> {
            self.calls.push(Call::SetChannel(channel));
            Ok(())
        }

        fn enable_dynamic_ack(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }

        fn enable_dynamic_payloads(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }

        fn set_retries(&mut self, delay: u8, count: u8) -> Result<(), Self::Error> {
            self.calls.push(Call::SetRetries(delay, count));
            Ok(())
        }

        fn open_reading_pipe(&mut self, pipe: u8, address: [u8; 5]) -> Result<(), Self::Error> {
            self.calls.push(Call::OpenReadingPipe(pipe, address));
            Ok(())
        }

        fn open_writing_pipe(&mut self, address: [u8; 5]) -> Result<(), Self::Error> {
            self.calls.push(Call::OpenWritingPipe(address));
            Ok(())
        }

        fn start_listening(&mut self) -> Result<(), Self::Error> {
            self.calls.push(Call::StartListening);
            Ok(())
        }

        fn stop_listening(&mut self) -> Result<(), Self::Error> {
            self.calls.push(Call::StopListening);
            Ok(())
        }

        fn available(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.inbox.is_empty())
        }

        fn read(&mut self, buf: &mut [u8], len: usize) -> Result<(), Self::Error> {
            if let Some(frame) = self.inbox.pop_front() {
                let n = len.min(frame.len()).min(buf.len());
                buf[..n].copy_from_slice(&frame[..n]);
            }
            Ok(())
        }

        fn get_dynamic_payload_size(&mut self) -> Result<usize, Self::Error> {
            Ok(self.inbox.front().map(|f| f.len()).unwrap_or(0))
        }

        fn write_fast(&mut self, buf: &[u8], multicast: bool) -> Result<(), Self::Error> {
            self.calls.push(Call::WriteFast(buf.to_vec(), multicast));
            Ok(())
        }

        fn tx_standby(&mut self, timeout_ms: u32) -> Result<bool, Self::Error> {
            self.calls.push(Call::TxStandby(timeout_ms));
            Ok(self.tx_ack)
        }
    }

    #[test]
    fn mock_echoes_what_is_delivered() {
        let mut radio = MockRadio::new();
        radio.deliver(&[1, 2, 3]);
        assert!(radio.available().unwrap());
        assert_eq!(radio.get_dynamic_payload_size().unwrap(), 3);

        let mut buf = [0u8; 8];
        radio.read(&mut buf, 3).unwrap();
        assert_eq!(&buf[..3], &[1, 2, 3]);
        assert!(!radio.available().unwrap());
    }

    #[test]
    fn tx_standby_reports_configured_ack() {
        let mut radio = MockRadio::new();
        radio.tx_ack = false;
        assert_eq!(radio.tx_standby(30).unwrap(), false);
    }
}
