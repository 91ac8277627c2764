// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Interrupt Handler Registration
//!
//! A small dispatch table between the platform interrupt controller and
//! device drivers. Drivers register a handler for their interrupt line;
//! the controller's exception path calls [`dispatch`] with the acknowledged
//! interrupt ID. Registration is last-wins: re-registering a line replaces
//! the previous handler and hands it back to the caller.

use spin::Mutex;

/// Interrupt handler function type.
pub type InterruptHandler = fn();

/// Number of interrupt lines the table covers (SGI + PPI + SPI block on
/// the GIC this platform uses).
pub const MAX_INTERRUPTS: usize = 96;

static HANDLERS: Mutex<[Option<InterruptHandler>; MAX_INTERRUPTS]> =
    Mutex::new([None; MAX_INTERRUPTS]);

/// Register `handler` for interrupt line `irq`.
///
/// Returns the handler that was previously registered for the line, if any.
/// Out-of-range lines are rejected without touching the table.
pub fn register_handler(irq: u32, handler: InterruptHandler) -> Option<InterruptHandler> {
    let slot = irq as usize;
    if slot >= MAX_INTERRUPTS {
        return None;
    }

    HANDLERS.lock()[slot].replace(handler)
}

/// Invoke the handler registered for `irq`.
///
/// Called by the interrupt controller with interrupts already acknowledged.
/// Returns whether a handler was registered and ran. The handler is called
/// outside the table lock so it may re-register itself.
pub fn dispatch(irq: u32) -> bool {
    let slot = irq as usize;
    if slot >= MAX_INTERRUPTS {
        return false;
    }

    let handler = HANDLERS.lock()[slot];
    match handler {
        Some(handler) => {
            handler();
            true
        }
        None => false,
    }
}
