// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Line Configuration
//!
//! Caller-supplied line protocol settings, their validation, and the
//! fractional baud-rate divisor computation for the PL011 baud generator.

use core::fmt;

/// Lowest baud rate the line supports.
pub const MIN_BAUDRATE: u32 = 110;

/// Highest baud rate the line supports.
pub const MAX_BAUDRATE: u32 = 460_800;

/// Driver error codes.
///
/// Every fallible driver operation reports one of these; there is no
/// unrecoverable error class and no error state is held between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UartError {
    /// `data_bits` outside 5..=8
    InvalidWordSize,
    /// `stop_bits` other than 1 or 2
    InvalidStopBits,
    /// `baudrate` outside 110..=460800
    InvalidBaudrate,
    /// Receive FIFO empty, nothing to read
    NoData,
    /// The received character arrived with a framing, parity, break or
    /// overrun error; it was consumed and the error state cleared
    ReceiveError,
}

impl fmt::Display for UartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            UartError::InvalidWordSize => "word size must be 5 to 8 data bits",
            UartError::InvalidStopBits => "stop bits must be 1 or 2",
            UartError::InvalidBaudrate => "baud rate must be 110 to 460800",
            UartError::NoData => "receive FIFO is empty",
            UartError::ReceiveError => "received character had an error",
        };
        f.write_str(msg)
    }
}

/// Line protocol configuration.
///
/// Read-only to the driver; consumed once per [`configure`] call.
///
/// [`configure`]: crate::pl011::Pl011Uart::configure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineConfig {
    /// Bits per second, 110..=460800
    pub baudrate: u32,
    /// Data bits per frame, 5..=8
    pub data_bits: u8,
    /// Stop bits per frame, 1 or 2
    pub stop_bits: u8,
    /// Enable parity (even parity only)
    pub parity: bool,
}

impl LineConfig {
    /// Validate the configuration.
    ///
    /// Checks short-circuit in a fixed order: word size, stop bits, baud
    /// rate. The first violated constraint is reported and later fields are
    /// left unexamined.
    pub fn validate(&self) -> Result<(), UartError> {
        if self.data_bits < 5 || self.data_bits > 8 {
            return Err(UartError::InvalidWordSize);
        }
        if self.stop_bits == 0 || self.stop_bits > 2 {
            return Err(UartError::InvalidStopBits);
        }
        if self.baudrate < MIN_BAUDRATE || self.baudrate > MAX_BAUDRATE {
            return Err(UartError::InvalidBaudrate);
        }
        Ok(())
    }
}

impl Default for LineConfig {
    /// 115200 baud, 8 data bits, 1 stop bit, no parity.
    fn default() -> Self {
        Self {
            baudrate: 115_200,
            data_bits: 8,
            stop_bits: 1,
            parity: false,
        }
    }
}

/// Fixed-point baud-rate divisor pair for the PL011 baud generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaudDivisor {
    /// Integer divisor, programmed into IBRD (16-bit field)
    pub integer: u16,
    /// Fractional divisor in 1/64ths, programmed into FBRD (6-bit field)
    pub fractional: u8,
}

impl BaudDivisor {
    /// Compute the divisor pair for `baudrate` from `refclock` (Hz).
    ///
    /// The generator divides the reference clock by 16 times the divisor.
    /// The integer part is truncated; the fractional part is scaled by 64
    /// and rounded half-up, matching the hardware's observed baud rates.
    pub fn for_baudrate(refclock: u32, baudrate: u32) -> Self {
        let divisor = refclock as f64 / (16 * baudrate) as f64;
        let integer = divisor as u16;
        let fractional = ((divisor - integer as f64) * 64.0 + 0.5) as u8;

        Self { integer, fractional }
    }
}
