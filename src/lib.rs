// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! ARM PrimeCell PL011 UART Driver
//!
//! Standalone PL011 driver for Rustux-family kernels: line configuration
//! with a fractional baud-rate divisor, blocking character transmit, polled
//! receive, and an interrupt-driven receive path (echo plus break-error
//! recovery).
//!
//! # Usage
//!
//! ```rust,ignore
//! use rustux_pl011::{LineConfig, UART0};
//!
//! // Once, during platform bring-up (serialized by the caller):
//! UART0.configure(&LineConfig::default())?;
//!
//! // Afterwards, freely from mainline code:
//! UART0.write("uptime: ");
//! UART0.write_uint(ticks);
//! UART0.write("\n");
//!
//! if let Ok(c) = UART0.get_char() {
//!     // one polled character, never blocks
//! }
//! ```
//!
//! The platform's interrupt controller drives the receive path by calling
//! [`irq::dispatch`] with the acknowledged interrupt ID; `configure`
//! registers the UART's service routine there.
//!
//! # Register Map
//!
//! | Offset | Name    | Description                |
//! |--------|---------|----------------------------|
//! | 0x00   | DR      | Data Register              |
//! | 0x04   | RSR/ECR | Receive Status/Error Clear |
//! | 0x18   | FR      | Flag Register              |
//! | 0x24   | IBRD    | Integer Baud Rate Divisor  |
//! | 0x28   | FBRD    | Fractional Baud Rate Div.  |
//! | 0x2C   | LCRH    | Line Control Register      |
//! | 0x30   | CR      | Control Register           |
//! | 0x38   | IMSC    | Interrupt Mask Set/Clear   |
//! | 0x3C   | RIS     | Raw Interrupt Status       |
//! | 0x40   | MIS     | Masked Interrupt Status    |
//! | 0x44   | ICR     | Interrupt Clear Register   |
//!
//! # QEMU Support
//!
//! The fixed base address and interrupt line below match QEMU's
//! vexpress-a9 machine:
//! ```bash
//! qemu-system-arm -M vexpress-a9 -m 32M -nographic -kernel rustux.elf
//! ```

#![no_std]

#[cfg(test)]
extern crate std;

pub mod config;
pub mod irq;
pub mod pl011;
pub mod regs;

pub use config::{LineConfig, UartError};
pub use pl011::{Pl011Uart, REFCLOCK_HZ};
pub use regs::{Mmio, UartRegisters};

/// UART0 register block base address.
pub const UART0_BASE: usize = 0x1000_9000;

/// UART0 interrupt line at the interrupt controller.
pub const UART0_IRQ: u32 = 37;

/// The board's UART0.
///
/// The single process-wide handle to the peripheral; it lives as long as
/// the powered hardware and is shared between mainline code and the
/// interrupt handler. See [`Pl011Uart`] for the concurrency contract.
pub static UART0: Pl011Uart<Mmio> =
    Pl011Uart::new(unsafe { Mmio::new(UART0_BASE) }, UART0_IRQ, uart0_isr);

/// UART0 interrupt service routine, invoked through [`irq::dispatch`].
fn uart0_isr() {
    UART0.handle_interrupt();
}
