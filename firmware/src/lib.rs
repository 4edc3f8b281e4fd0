//! Breath-controlled XAC gamepad firmware for RP2040.
//!
//! This crate binds the platform-agnostic [`breath_core`] engines to the
//! Raspberry Pi Pico peripherals.
//!
//! # Overview
//!
//! The firmware:
//! 1. Reads breath readings from the sensor board over UART (115200 baud, 8N1)
//! 2. Maps them onto an Xbox Adaptive Controller compatible USB HID gamepad
//! 3. Drives an LED ring, a status pixel, two trigger outputs and a DFPlayer
//! 4. Accepts configuration commands on a USB CDC-ACM serial port and keeps
//!    settings in flash
//!
//! See [`config`] for the pin map.
//!
//! # Architecture
//!
//! The firmware uses the Embassy async runtime with four tasks:
//!
//! - **USB Task**: Runs the USB device stack
//! - **Sensor Task**: Reads sensor lines and signals the latest reading
//! - **Command Task**: Reads CDC packets and queues them
//! - **Reply Task**: Writes response lines back to the host
//!
//! The control loop in `main` owns the [`BreathEngine`](breath_core::BreathEngine)
//! and every actuator. It waits on the reading signal, the command queue
//! and a poll ticker, runs one engine step and applies the outputs before
//! waiting again.
//!
//! # Modules
//!
//! - [`sensor`]: Sensor UART source ([`UartBreathSource`])
//! - [`usb`]: HID gamepad and CDC command port ([`UsbGamepad`], [`PacketDecoder`])
//! - [`leds`]: WS2812 ring and status pixel ([`LedRing`], [`StatusPixel`])
//! - [`triggers`]: Trigger outputs ([`GpioTriggers`])
//! - [`dfplayer`]: Audio module ([`DfPlayer`])
//! - [`flash_store`]: Settings persistence ([`FlashSettingsStore`])
//!
//! # Features
//!
//! - **`dev-panic`** (default): Use `panic-probe` for development (prints panic info via RTT)
//! - **`prod-panic`**: Use `panic-reset` for production (silent watchdog reset)

#![no_std]

extern crate alloc;

pub mod config;
pub mod dfplayer;
pub mod flash_store;
pub mod leds;
pub mod sensor;
pub mod triggers;
pub mod usb;

pub use dfplayer::DfPlayer;
pub use flash_store::FlashSettingsStore;
pub use leds::{LedRing, StatusPixel};
pub use sensor::UartBreathSource;
pub use triggers::GpioTriggers;
pub use usb::{
    configure_usb_cdc, configure_usb_hid, write_reply, CommandPacket, GamepadRequestHandler,
    PacketDecoder, UsbDriver, UsbGamepad, UsbStateHandler, XAC_REPORT_DESCRIPTOR,
};
