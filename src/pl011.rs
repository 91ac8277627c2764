// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! ARM PL011 UART Driver
//!
//! Line configuration, blocking character transmit, polled receive, and the
//! receive-path interrupt service routine. The driver is generic over
//! [`UartRegisters`] so the register block can be mocked under test; the
//! process-wide instance bound to the hardware lives in the crate root.
//!
//! # Blocking behavior
//!
//! `put_char` and `configure` contain unbounded busy-wait loops on hardware
//! flags (TX FIFO full, UART busy). These are the driver's only suspension
//! points; a stuck peripheral hangs the calling context. The interrupt
//! handler transmits through the same blocking path, which is safe because
//! both contexts poll the hardware flag rather than holding a lock.

use crate::config::{BaudDivisor, LineConfig, UartError};
use crate::irq::{self, InterruptHandler};
use crate::regs::{
    Control, Flags, Interrupt, LineControl, ReceiveStatus, UartRegisters, DR_DATA_MASK, UART_CR,
    UART_DR, UART_FBRD, UART_FR, UART_IBRD, UART_ICR, UART_IMSC, UART_LCRH, UART_MIS, UART_RSR,
};

/// UART reference clock in Hz (24 MHz crystal on this platform).
pub const REFCLOCK_HZ: u32 = 24_000_000;

/// A PL011 UART.
///
/// One instance exists per physical UART; its lifetime is the lifetime of
/// the powered peripheral. Methods take `&self`: the hardware registers are
/// the mutable state, shared with the interrupt handler without locking.
/// Callers must serialize `configure` against themselves and against
/// interrupt-driven receive.
pub struct Pl011Uart<R: UartRegisters> {
    regs: R,
    irq: u32,
    isr: InterruptHandler,
}

impl<R: UartRegisters> Pl011Uart<R> {
    /// Create a driver over `regs`, to be serviced by `isr` on interrupt
    /// line `irq`.
    ///
    /// The ISR is not registered here; registration happens on each
    /// successful [`configure`](Self::configure).
    pub const fn new(regs: R, irq: u32, isr: InterruptHandler) -> Self {
        Self { regs, irq, isr }
    }

    /// Apply a line configuration.
    ///
    /// Validation short-circuits in a fixed order (word size, stop bits,
    /// baud rate) and performs no register writes on failure. On success the
    /// UART is disabled and drained, the baud divisor and line controls are
    /// reprogrammed, the receive interrupt is unmasked and the ISR
    /// registered with the dispatcher (last registration wins), and the
    /// UART is re-enabled as the final step.
    pub fn configure(&self, config: &LineConfig) -> Result<(), UartError> {
        config.validate()?;

        // Disable the UART while the line controls are reprogrammed.
        let cr = self.regs.read(UART_CR);
        self.regs.write(UART_CR, cr & !Control::UARTEN.bits());

        // Finish any in-flight transmission, then bypass the FIFOs.
        while self.regs.read(UART_FR) & Flags::BUSY.bits() != 0 {
            core::hint::spin_loop();
        }
        let lcrh = self.regs.read(UART_LCRH);
        self.regs.write(UART_LCRH, lcrh & !LineControl::FEN.bits());

        let divisor = BaudDivisor::for_baudrate(REFCLOCK_HZ, config.baudrate);
        self.regs.write(UART_IBRD, divisor.integer as u32);
        self.regs.write(UART_FBRD, divisor.fractional as u32);

        let mut lcrh = match config.data_bits {
            5 => LineControl::WLEN_5BITS,
            6 => LineControl::WLEN_6BITS,
            7 => LineControl::WLEN_7BITS,
            8 => LineControl::WLEN_8BITS,
            // Validated above.
            _ => unreachable!(),
        };

        // Even parity only; PEN, EPS and SPS are programmed together.
        if config.parity {
            lcrh |= LineControl::PEN | LineControl::EPS | LineControl::SPS;
        }

        if config.stop_bits == 2 {
            lcrh |= LineControl::STP2;
        }

        // The FIFO bypass during the drain above is transient.
        lcrh |= LineControl::FEN;
        self.regs.write(UART_LCRH, lcrh.bits());

        // Unmask the receive interrupt and hook the dispatcher.
        let imsc = self.regs.read(UART_IMSC);
        self.regs.write(UART_IMSC, imsc | Interrupt::RXIM.bits());
        irq::register_handler(self.irq, self.isr);

        // Re-enable the UART.
        let cr = self.regs.read(UART_CR);
        self.regs.write(UART_CR, cr | Control::UARTEN.bits());

        #[cfg(feature = "log")]
        log::debug!(
            "pl011: {} baud, {} data bits, {} stop bits, parity {}",
            config.baudrate,
            config.data_bits,
            config.stop_bits,
            if config.parity { "even" } else { "off" }
        );

        Ok(())
    }

    /// Transmit one character, blocking while the TX FIFO is full.
    pub fn put_char(&self, c: u8) {
        while self.regs.read(UART_FR) & Flags::TXFF.bits() != 0 {
            core::hint::spin_loop();
        }
        self.regs.write(UART_DR, c as u32);
    }

    /// Transmit a string, blocking for the full duration.
    pub fn write(&self, s: &str) {
        for c in s.bytes() {
            self.put_char(c);
        }
    }

    /// Transmit an unsigned integer in decimal.
    ///
    /// Digits are extracted least-significant-first and emitted in reverse,
    /// so zero emits nothing at all. That quirk is kept deliberately; see
    /// the note in DESIGN.md before changing it.
    pub fn write_uint(&self, value: u32) {
        // 10 digits covers u32::MAX.
        let mut digits = [0u8; 10];
        let mut count = 0;

        let mut value = value;
        while value != 0 {
            digits[count] = b'0' + (value % 10) as u8;
            value /= 10;
            count += 1;
        }

        for &digit in digits[..count].iter().rev() {
            self.put_char(digit);
        }
    }

    /// Read one character without blocking.
    ///
    /// Returns [`UartError::NoData`] immediately if the receive FIFO is
    /// empty. A character that arrived with a framing, parity, break or
    /// overrun error is consumed from the FIFO, the error state is cleared,
    /// and [`UartError::ReceiveError`] is returned; only clean characters
    /// are yielded, so the caller can simply poll again.
    pub fn get_char(&self) -> Result<u8, UartError> {
        if self.regs.read(UART_FR) & Flags::RXFE.bits() != 0 {
            return Err(UartError::NoData);
        }

        let c = (self.regs.read(UART_DR) & DR_DATA_MASK) as u8;

        let status = self.regs.read(UART_RSR) & ReceiveStatus::ERROR_MASK.bits();
        if status != 0 {
            // Writing the error bits back clears them.
            self.regs.write(UART_RSR, status);
            return Err(UartError::ReceiveError);
        }

        Ok(c)
    }

    /// Service a pending UART interrupt.
    ///
    /// Reads the masked interrupt status once and takes a single branch,
    /// receive first:
    ///
    /// - Receive: echo the character back; carriage return additionally
    ///   echoes a line feed. Reading the data register clears the condition.
    /// - Break error: report on the line itself, then clear the error state
    ///   (ECR) and the pending interrupt (ICR). Skipping either clear
    ///   retriggers the line immediately.
    ///
    /// Runs in interrupt context and transmits through the blocking path;
    /// see the module docs for why that cannot deadlock against mainline
    /// transmit.
    pub fn handle_interrupt(&self) {
        let status = Interrupt::from_bits_truncate(self.regs.read(UART_MIS));

        if status.contains(Interrupt::RXIM) {
            let c = (self.regs.read(UART_DR) & DR_DATA_MASK) as u8;
            self.put_char(c);
            if c == b'\r' {
                self.write("\n");
            }
        } else if status.contains(Interrupt::BEIM) {
            self.write("Break error detected!\n");
            self.regs.write(UART_RSR, ReceiveStatus::BE.bits());
            self.regs.write(UART_ICR, Interrupt::BEIM.bits());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;
    use std::collections::VecDeque;
    use std::vec::Vec;

    /// Register block size in words (DR through ICR).
    const NUM_REGS: usize = 0x48 / 4;

    /// Recording mock of the PL011 register block.
    ///
    /// Writes land in a backing store and an ordered log; data-register
    /// reads pop from a scripted receive queue; writes to RSR/ECR clear the
    /// stored error bits, matching the hardware's write-to-clear semantics.
    struct MockRegs {
        regs: RefCell<[u32; NUM_REGS]>,
        rx: RefCell<VecDeque<u32>>,
        reads: RefCell<Vec<usize>>,
        writes: RefCell<Vec<(usize, u32)>>,
    }

    impl MockRegs {
        fn new() -> Self {
            Self {
                regs: RefCell::new([0; NUM_REGS]),
                rx: RefCell::new(VecDeque::new()),
                reads: RefCell::new(Vec::new()),
                writes: RefCell::new(Vec::new()),
            }
        }

        fn set(&self, offset: usize, value: u32) {
            self.regs.borrow_mut()[offset / 4] = value;
        }

        fn get(&self, offset: usize) -> u32 {
            self.regs.borrow()[offset / 4]
        }

        fn push_rx(&self, c: u32) {
            self.rx.borrow_mut().push_back(c);
        }

        fn writes(&self) -> Vec<(usize, u32)> {
            self.writes.borrow().clone()
        }

        fn read_offsets(&self) -> Vec<usize> {
            self.reads.borrow().clone()
        }

        /// Bytes written to the data register, in order.
        fn transmitted(&self) -> Vec<u8> {
            self.writes
                .borrow()
                .iter()
                .filter(|(offset, _)| *offset == UART_DR)
                .map(|(_, value)| *value as u8)
                .collect()
        }
    }

    impl UartRegisters for MockRegs {
        fn read(&self, offset: usize) -> u32 {
            self.reads.borrow_mut().push(offset);
            if offset == UART_DR {
                if let Some(c) = self.rx.borrow_mut().pop_front() {
                    return c;
                }
            }
            self.regs.borrow()[offset / 4]
        }

        fn write(&self, offset: usize, value: u32) {
            self.writes.borrow_mut().push((offset, value));
            let mut regs = self.regs.borrow_mut();
            if offset == UART_RSR {
                // Write-to-clear.
                regs[offset / 4] &= !value;
            } else {
                regs[offset / 4] = value;
            }
        }
    }

    fn noop_isr() {}

    fn uart(mock: &MockRegs) -> Pl011Uart<&MockRegs> {
        Pl011Uart::new(mock, 60, noop_isr)
    }

    fn valid_config() -> LineConfig {
        LineConfig {
            baudrate: 9600,
            data_bits: 8,
            stop_bits: 1,
            parity: false,
        }
    }

    // ------------------------------------------------------------------
    // configure
    // ------------------------------------------------------------------

    #[test]
    fn test_configure_invalid_word_size_no_mutation() {
        let mock = MockRegs::new();
        let config = LineConfig {
            data_bits: 9,
            ..valid_config()
        };

        assert_eq!(uart(&mock).configure(&config), Err(UartError::InvalidWordSize));
        assert!(mock.writes().is_empty());
    }

    #[test]
    fn test_configure_invalid_stop_bits_no_mutation() {
        let mock = MockRegs::new();
        let config = LineConfig {
            stop_bits: 3,
            ..valid_config()
        };

        assert_eq!(uart(&mock).configure(&config), Err(UartError::InvalidStopBits));
        assert!(mock.writes().is_empty());
    }

    #[test]
    fn test_configure_invalid_baudrate_no_mutation() {
        let mock = MockRegs::new();
        let config = LineConfig {
            baudrate: 500_000,
            ..valid_config()
        };

        assert_eq!(uart(&mock).configure(&config), Err(UartError::InvalidBaudrate));
        assert!(mock.writes().is_empty());
    }

    #[test]
    fn test_configure_register_sequence() {
        let mock = MockRegs::new();
        // Peripheral up and running from a previous configuration.
        mock.set(UART_CR, (Control::UARTEN | Control::TXE | Control::RXE).bits());
        mock.set(UART_LCRH, (LineControl::WLEN_8BITS | LineControl::FEN).bits());

        assert_eq!(uart(&mock).configure(&valid_config()), Ok(()));

        let writes = mock.writes();
        assert_eq!(
            writes,
            Vec::from([
                // Disable, keeping TXE/RXE.
                (UART_CR, (Control::TXE | Control::RXE).bits()),
                // Transient FIFO bypass while drained.
                (UART_LCRH, LineControl::WLEN_8BITS.bits()),
                // 24 MHz / (16 * 9600) = 156.25
                (UART_IBRD, 156),
                (UART_FBRD, 16),
                // Final line controls: 8N1 with FIFOs back on.
                (UART_LCRH, (LineControl::WLEN_8BITS | LineControl::FEN).bits()),
                (UART_IMSC, Interrupt::RXIM.bits()),
                // Re-enable last.
                (UART_CR, (Control::UARTEN | Control::TXE | Control::RXE).bits()),
            ])
        );
    }

    #[test]
    fn test_configure_parity_and_two_stop_bits() {
        let mock = MockRegs::new();
        let config = LineConfig {
            baudrate: 9600,
            data_bits: 7,
            stop_bits: 2,
            parity: true,
        };

        assert_eq!(uart(&mock).configure(&config), Ok(()));

        let lcrh = LineControl::from_bits_truncate(mock.get(UART_LCRH));
        assert!(lcrh.contains(LineControl::WLEN_7BITS));
        assert!(lcrh.contains(LineControl::PEN | LineControl::EPS | LineControl::SPS));
        assert!(lcrh.contains(LineControl::STP2));
        assert!(lcrh.contains(LineControl::FEN));
    }

    #[test]
    fn test_configure_registers_isr_with_dispatcher() {
        let mock = MockRegs::new();
        let driver = Pl011Uart::new(&mock, 61, noop_isr);

        assert_eq!(driver.configure(&valid_config()), Ok(()));

        // The line now holds our ISR; re-registering hands it back.
        assert!(irq::register_handler(61, noop_isr).is_some());
    }

    // ------------------------------------------------------------------
    // transmit
    // ------------------------------------------------------------------

    #[test]
    fn test_put_char_writes_data_register() {
        let mock = MockRegs::new();
        uart(&mock).put_char(b'x');
        assert_eq!(mock.transmitted(), Vec::from([b'x']));
    }

    #[test]
    fn test_write_transmits_in_order() {
        let mock = MockRegs::new();
        uart(&mock).write("ok\n");
        assert_eq!(mock.transmitted(), Vec::from([b'o', b'k', b'\n']));
    }

    #[test]
    fn test_write_uint_digit_order() {
        let mock = MockRegs::new();
        uart(&mock).write_uint(1234);
        assert_eq!(mock.transmitted(), Vec::from([b'1', b'2', b'3', b'4']));
    }

    #[test]
    fn test_write_uint_zero_emits_nothing() {
        // Preserved reference behavior: the digit loop never runs for zero.
        let mock = MockRegs::new();
        uart(&mock).write_uint(0);
        assert!(mock.transmitted().is_empty());
    }

    #[test]
    fn test_write_uint_max_value() {
        let mock = MockRegs::new();
        uart(&mock).write_uint(u32::MAX);
        assert_eq!(mock.transmitted(), Vec::from(*b"4294967295"));
    }

    // ------------------------------------------------------------------
    // receive
    // ------------------------------------------------------------------

    #[test]
    fn test_get_char_empty_fifo_returns_nodata() {
        let mock = MockRegs::new();
        mock.set(UART_FR, Flags::RXFE.bits());

        assert_eq!(uart(&mock).get_char(), Err(UartError::NoData));
        // No blocking, and the data register was never touched.
        assert!(!mock.read_offsets().contains(&UART_DR));
    }

    #[test]
    fn test_get_char_returns_clean_character() {
        let mock = MockRegs::new();
        mock.push_rx(b'a' as u32);

        assert_eq!(uart(&mock).get_char(), Ok(b'a'));
    }

    #[test]
    fn test_get_char_masks_data_byte() {
        let mock = MockRegs::new();
        // Error flags ride in the upper bits of DR; only the low byte is data.
        mock.push_rx(0x0100 | b'a' as u32);

        assert_eq!(uart(&mock).get_char(), Ok(b'a'));
    }

    #[test]
    fn test_get_char_error_consumed_and_cleared() {
        let mock = MockRegs::new();
        mock.push_rx(b'a' as u32);
        mock.push_rx(b'b' as u32);
        mock.set(UART_RSR, ReceiveStatus::FE.bits());

        // The erroring character is consumed but not yielded, and the
        // error state is cleared by the driver.
        assert_eq!(uart(&mock).get_char(), Err(UartError::ReceiveError));
        assert_eq!(mock.get(UART_RSR), 0);

        // The next poll yields the following character, not a repeat.
        assert_eq!(uart(&mock).get_char(), Ok(b'b'));
    }

    // ------------------------------------------------------------------
    // interrupt handler
    // ------------------------------------------------------------------

    #[test]
    fn test_isr_echoes_received_character() {
        let mock = MockRegs::new();
        mock.set(UART_MIS, Interrupt::RXIM.bits());
        mock.push_rx(b'a' as u32);

        uart(&mock).handle_interrupt();
        assert_eq!(mock.transmitted(), Vec::from([b'a']));
    }

    #[test]
    fn test_isr_carriage_return_adds_line_feed() {
        let mock = MockRegs::new();
        mock.set(UART_MIS, Interrupt::RXIM.bits());
        mock.push_rx(0x0D);

        uart(&mock).handle_interrupt();
        assert_eq!(mock.transmitted(), Vec::from([0x0D, 0x0A]));
    }

    #[test]
    fn test_isr_break_error_reports_and_clears() {
        let mock = MockRegs::new();
        mock.set(UART_MIS, Interrupt::BEIM.bits());

        uart(&mock).handle_interrupt();

        // Diagnostic first, then both clears, in order.
        let writes = mock.writes();
        let tail = &writes[writes.len() - 2..];
        assert_eq!(mock.transmitted(), Vec::from(*b"Break error detected!\n"));
        assert_eq!(tail[0], (UART_RSR, ReceiveStatus::BE.bits()));
        assert_eq!(tail[1], (UART_ICR, Interrupt::BEIM.bits()));

        // The receive branch was not taken.
        assert!(!mock.read_offsets().contains(&UART_DR));
    }

    #[test]
    fn test_isr_receive_takes_priority_over_break() {
        let mock = MockRegs::new();
        mock.set(UART_MIS, (Interrupt::RXIM | Interrupt::BEIM).bits());
        mock.push_rx(b'q' as u32);

        uart(&mock).handle_interrupt();

        // Only the echo; the break branch did not run.
        assert_eq!(mock.transmitted(), Vec::from([b'q']));
        assert!(!mock.writes().contains(&(UART_ICR, Interrupt::BEIM.bits())));
    }

    #[test]
    fn test_isr_no_pending_interrupt_does_nothing() {
        let mock = MockRegs::new();
        uart(&mock).handle_interrupt();
        assert!(mock.writes().is_empty());
    }
}
