#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![doc = include_str!("../README.md")]

//! # Core Concepts
//!
//! - **`RegisterFile`**: The byte-addressable register image the host sees over I2C
//! - **`EncoderDecoder`**: Pin-change handler turning quadrature edges into a signed delta
//! - **`I2cSlaveProtocol`**: Offset-then-data slave engine with a transactional counter
//! - **`LedScheduler`**: Builds per-group charlieplex schedules from `led_level`
//! - **`TimerCycleDriver`**: Timer overflow/compare handlers that draw one group per period
//! - **`Mailbox`**: Single-slot, last-write-wins hand-off of schedule sets
//! - **`Device`**: The shared context, one `static` per firmware image
//! - **`Controller`**: The main-loop step: button, counter, style, command
//!
//! Hardware is reached through small traits (`I2cTarget`, `QuadraturePins`,
//! `ButtonPin`, `LedPorts`, `LedTimer`) so the same code runs on the MCU and
//! against host-side mocks.

pub mod button;
pub mod config;
pub mod critical;
pub mod device;
pub mod driver;
pub mod encoder;
pub mod i2c;
pub mod mailbox;
pub mod registers;
pub mod schedule;
pub mod styles;

pub use button::{ButtonPin, ButtonPoller};
pub use config::{
    DEFAULT_I2C_ADDRESS, DEMO_TRIANGLE, DEVICE_ID, DEVICE_VERSION, LED_RING, LedDef, PORT_COUNT,
    PinDef, Wiring, WiringError,
};
pub use critical::InterruptGuard;
pub use device::{Controller, Device, Tick};
pub use driver::{CycleCounter, LedPorts, LedTimer, TimerCycleDriver};
pub use encoder::{EncoderDecoder, QuadraturePins, QuadratureSample};
pub use i2c::{I2cSlaveProtocol, I2cTarget, TargetStatus, TransferState};
pub use mailbox::{Mailbox, Publish};
pub use registers::{Command, Config, Counter, RegisterFile, Status, UnknownCommand};
pub use schedule::{LedScheduler, SENTINEL_CMP, Schedule, ScheduleItem, ScheduleSet, gamma};
pub use styles::{StyleContext, StyleFn, builtin};
