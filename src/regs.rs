// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! PL011 Register Definitions and Access
//!
//! Register offsets and bit-field definitions for the ARM PrimeCell PL011,
//! plus the [`UartRegisters`] trait the driver is written against. The
//! production implementation is [`Mmio`], a thin volatile wrapper over the
//! peripheral's base address; tests substitute a recording mock.

use bitflags::bitflags;

// ============================================================================
// Register Offsets
// ============================================================================

pub const UART_DR: usize = 0x00; // Data Register
pub const UART_RSR: usize = 0x04; // Receive Status / Error Clear Register
pub const UART_FR: usize = 0x18; // Flag Register
pub const UART_IBRD: usize = 0x24; // Integer Baud Rate Divisor
pub const UART_FBRD: usize = 0x28; // Fractional Baud Rate Divisor
pub const UART_LCRH: usize = 0x2C; // Line Control Register
pub const UART_CR: usize = 0x30; // Control Register
pub const UART_IMSC: usize = 0x38; // Interrupt Mask Set/Clear
pub const UART_RIS: usize = 0x3C; // Raw Interrupt Status
pub const UART_MIS: usize = 0x40; // Masked Interrupt Status
pub const UART_ICR: usize = 0x44; // Interrupt Clear Register

/// Data bits of the data register; the upper bits carry per-character
/// error flags that this driver reads from RSR instead.
pub const DR_DATA_MASK: u32 = 0xFF;

// ============================================================================
// Register Bit Fields
// ============================================================================

bitflags! {
    /// Flag register (FR) bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Flags: u32 {
        /// TX FIFO empty
        const TXFE = 1 << 7;
        /// RX FIFO full
        const RXFF = 1 << 6;
        /// TX FIFO full
        const TXFF = 1 << 5;
        /// RX FIFO empty
        const RXFE = 1 << 4;
        /// UART busy transmitting
        const BUSY = 1 << 3;
    }
}

bitflags! {
    /// Control register (CR) bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Control: u32 {
        /// RX enable
        const RXE = 1 << 9;
        /// TX enable
        const TXE = 1 << 8;
        /// UART enable
        const UARTEN = 1 << 0;
    }
}

bitflags! {
    /// Line control register (LCRH) bits.
    ///
    /// The word-length encodings occupy the same 2-bit field; exactly one
    /// of them is programmed per configuration.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LineControl: u32 {
        /// Stick parity select
        const SPS = 1 << 7;
        /// Word length: 8 bits
        const WLEN_8BITS = 0b11 << 5;
        /// Word length: 7 bits
        const WLEN_7BITS = 0b10 << 5;
        /// Word length: 6 bits
        const WLEN_6BITS = 0b01 << 5;
        /// Word length: 5 bits
        const WLEN_5BITS = 0b00 << 5;
        /// FIFO enable
        const FEN = 1 << 4;
        /// Two stop bits select
        const STP2 = 1 << 3;
        /// Even parity select
        const EPS = 1 << 2;
        /// Parity enable
        const PEN = 1 << 1;
    }
}

bitflags! {
    /// Interrupt bits, shared by IMSC, RIS, MIS and ICR.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Interrupt: u32 {
        /// Overrun error interrupt
        const OEIM = 1 << 10;
        /// Break error interrupt
        const BEIM = 1 << 9;
        /// Parity error interrupt
        const PEIM = 1 << 8;
        /// Framing error interrupt
        const FEIM = 1 << 7;
        /// Receive timeout interrupt
        const RTIM = 1 << 6;
        /// Transmit interrupt
        const TXIM = 1 << 5;
        /// Receive interrupt
        const RXIM = 1 << 4;
    }
}

bitflags! {
    /// Receive status / error clear register (RSR/ECR) bits.
    ///
    /// Reading reports the error state of the last received character;
    /// writing any of these bits back clears the error state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ReceiveStatus: u32 {
        /// Overrun error
        const OE = 1 << 3;
        /// Break error
        const BE = 1 << 2;
        /// Parity error
        const PE = 1 << 1;
        /// Framing error
        const FE = 1 << 0;
    }
}

impl ReceiveStatus {
    /// All per-character error conditions.
    pub const ERROR_MASK: ReceiveStatus = ReceiveStatus::all();
}

// ============================================================================
// Register Access
// ============================================================================

/// Access to the PL011 register block.
///
/// The driver performs every hardware interaction through this trait so the
/// register set can be mocked out under test. All methods take `&self`: the
/// hardware itself is the mutable state, and mainline code shares the block
/// with the interrupt handler without locking.
pub trait UartRegisters {
    /// Read the 32-bit register at `offset`.
    fn read(&self, offset: usize) -> u32;

    /// Write the 32-bit register at `offset`.
    fn write(&self, offset: usize, value: u32);
}

impl<R: UartRegisters> UartRegisters for &R {
    fn read(&self, offset: usize) -> u32 {
        (*self).read(offset)
    }

    fn write(&self, offset: usize, value: u32) {
        (*self).write(offset, value)
    }
}

/// Memory-mapped PL011 register block at a fixed base address.
pub struct Mmio {
    base: usize,
}

impl Mmio {
    /// Create an accessor for the register block at `base`.
    ///
    /// # Safety
    ///
    /// `base` must be the base address of a mapped PL011 register block and
    /// must remain mapped for the lifetime of the returned value.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }
}

impl UartRegisters for Mmio {
    #[inline]
    fn read(&self, offset: usize) -> u32 {
        unsafe { core::ptr::read_volatile((self.base + offset) as *const u32) }
    }

    #[inline]
    fn write(&self, offset: usize, value: u32) {
        unsafe { core::ptr::write_volatile((self.base + offset) as *mut u32, value) }
    }
}
