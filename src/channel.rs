//! RF channel diagnostics for the 2.4 GHz ISM band used by nRF24L01-class
//! radios (1 MHz channel spacing, channel 0 at 2400 MHz).

/// Converts an nRF24 channel number (0..125) into its centre frequency in MHz.
pub fn channel_mhz(channel: u8) -> u16 {
    2400 + channel as u16
}
