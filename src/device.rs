//! Shared device context and the main-loop step.
//!
//! [`Device`] holds everything more than one execution context touches and is
//! meant to live in a `static`. Each interrupt binding owns its own handler
//! state ([`I2cSlaveProtocol`], [`TimerCycleDriver`]) and forwards to the
//! `on_*` methods here; the main loop owns a [`Controller`].
//!
//! ```ignore
//! static DEVICE: Device<6, 30> = Device::new();
//!
//! fn main_loop(button: &mut impl ButtonPin) -> ! {
//!     let styles = builtin::<6, 30>();
//!     let mut controller = Controller::new(&LED_RING, &styles);
//!     controller.refresh(&DEVICE);
//!     loop {
//!         if let Some(command) = controller.tick(&DEVICE, button).command {
//!             // reset / save handling
//!         }
//!     }
//! }
//! ```

use crate::button::{ButtonPin, ButtonPoller};
use crate::config::Wiring;
use crate::critical::InterruptGuard;
use crate::driver::{CycleCounter, LedPorts, LedTimer, TimerCycleDriver};
use crate::encoder::{EncoderDecoder, QuadraturePins};
use crate::i2c::{I2cSlaveProtocol, I2cTarget};
use crate::mailbox::{Mailbox, Publish};
use crate::registers::{Command, Counter, RegisterFile, Status};
use crate::schedule::{LedScheduler, ScheduleSet, empty_set};
use crate::styles::{StyleContext, StyleFn, dispatch};

/// State shared between the interrupt handlers and the main loop.
///
/// # Type Parameters
/// * `PINS` - Number of charlieplex pins, which is also the number of groups
/// * `LEDS` - Number of LEDs
pub struct Device<const PINS: usize, const LEDS: usize> {
    registers: RegisterFile<LEDS>,
    counter: Counter,
    encoder: EncoderDecoder,
    schedules: Mailbox<ScheduleSet<PINS>>,
    cycles: CycleCounter,
}

impl<const PINS: usize, const LEDS: usize> Device<PINS, LEDS> {
    /// Power-up state: default registers, counter at zero, LEDs dark.
    pub const fn new() -> Self {
        Self {
            registers: RegisterFile::new(),
            counter: Counter::new(0),
            encoder: EncoderDecoder::new(),
            schedules: Mailbox::new(empty_set()),
            cycles: CycleCounter::new(),
        }
    }

    pub fn registers(&self) -> &RegisterFile<LEDS> {
        &self.registers
    }

    pub fn counter(&self) -> &Counter {
        &self.counter
    }

    pub fn encoder(&self) -> &EncoderDecoder {
        &self.encoder
    }

    /// Schedule set published by the main loop, waiting for the driver.
    pub fn schedules(&self) -> &Mailbox<ScheduleSet<PINS>> {
        &self.schedules
    }

    pub fn cycles(&self) -> &CycleCounter {
        &self.cycles
    }

    /// Pin-change interrupt, any port covering an encoder pin.
    pub fn on_encoder_edge<P: QuadraturePins>(&self, pins: &mut P) {
        self.encoder.on_edge(pins);
    }

    /// I2C slave interrupt.
    pub fn on_i2c<B: I2cTarget>(&self, protocol: &mut I2cSlaveProtocol, bus: &mut B) {
        protocol.on_interrupt(bus, &self.registers, &self.counter);
    }

    /// Timer overflow interrupt.
    pub fn on_timer_overflow<P: LedPorts, T: LedTimer>(
        &self,
        driver: &mut TimerCycleDriver<PINS>,
        ports: &mut P,
        timer: &mut T,
    ) {
        driver.on_overflow(ports, timer, &self.schedules, &self.cycles);
    }

    /// Timer compare interrupt.
    pub fn on_timer_compare<P: LedPorts, T: LedTimer>(
        &self,
        driver: &mut TimerCycleDriver<PINS>,
        ports: &mut P,
        timer: &mut T,
    ) {
        driver.on_compare(ports, timer);
    }
}

impl<const PINS: usize, const LEDS: usize> Default for Device<PINS, LEDS> {
    fn default() -> Self {
        Self::new()
    }
}

/// What one main-loop tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tick {
    /// Encoder steps folded into the counter this tick.
    pub delta: i8,
    /// Button status written this tick.
    pub status: Status,
    /// A style ran.
    pub styled: bool,
    /// Command the host left in the `command` register, now cleared.
    pub command: Option<Command>,
}

/// Main-loop state.
pub struct Controller<'a, const PINS: usize, const LEDS: usize> {
    scheduler: LedScheduler<'a, PINS, LEDS>,
    button: ButtonPoller,
    styles: &'a [StyleFn<PINS, LEDS>],
    last_cycle: u8,
    pending_delta: i8,
}

impl<'a, const PINS: usize, const LEDS: usize> Controller<'a, PINS, LEDS> {
    pub fn new(wiring: &'a Wiring<PINS, LEDS>, styles: &'a [StyleFn<PINS, LEDS>]) -> Self {
        Self {
            scheduler: LedScheduler::new(wiring),
            button: ButtonPoller::new(),
            styles,
            last_cycle: 0,
            pending_delta: 0,
        }
    }

    pub fn scheduler(&self) -> &LedScheduler<'a, PINS, LEDS> {
        &self.scheduler
    }

    /// Publishes schedules for the current `led_level` values.
    pub fn refresh(&self, device: &Device<PINS, LEDS>) -> Publish {
        self.scheduler.rebuild(&device.registers, &device.schedules)
    }

    /// One pass of the main loop.
    ///
    /// The style runs only once the refresh driver has started a new cycle,
    /// and sees every encoder step taken since it last ran.
    pub fn tick<B: ButtonPin>(&mut self, device: &Device<PINS, LEDS>, button: &mut B) -> Tick {
        let status = self.button.poll_into(button, &device.registers);

        let delta = {
            let masked = InterruptGuard::acquire();
            let delta = device.encoder.take_delta(&masked);
            device.counter.fold(delta, &masked);
            delta
        };
        self.pending_delta = self.pending_delta.wrapping_add(delta);

        let mut styled = false;
        let cycle = device.cycles.get();
        if cycle != self.last_cycle {
            self.last_cycle = cycle;
            let ctx = StyleContext {
                registers: &device.registers,
                counter: &device.counter,
                scheduler: &self.scheduler,
                schedules: &device.schedules,
            };
            styled = dispatch(self.styles, device.registers.style(), &ctx, self.pending_delta);
            self.pending_delta = 0;
        }

        Tick {
            delta,
            status,
            styled,
            command: device.registers.take_command(),
        }
    }
}
