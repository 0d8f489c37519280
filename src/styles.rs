//! LED styles.
//!
//! A style turns the counter and config into `led_level` values. The main
//! loop runs the one selected by `config.style` at most once per full refresh
//! cycle, passing the encoder delta accumulated since the previous run.

use crate::mailbox::Mailbox;
use crate::registers::{Counter, RegisterFile};
use crate::schedule::{LedScheduler, ScheduleSet};

/// Everything a style may touch.
pub struct StyleContext<'a, const PINS: usize, const LEDS: usize> {
    pub registers: &'a RegisterFile<LEDS>,
    pub counter: &'a Counter,
    pub scheduler: &'a LedScheduler<'a, PINS, LEDS>,
    pub schedules: &'a Mailbox<ScheduleSet<PINS>>,
}

impl<const PINS: usize, const LEDS: usize> StyleContext<'_, PINS, LEDS> {
    /// Publishes schedules for the current `led_level` values.
    pub fn rebuild(&self) {
        let _ = self.scheduler.rebuild(self.registers, self.schedules);
    }
}

/// A style callback, given the encoder delta.
pub type StyleFn<const PINS: usize, const LEDS: usize> = fn(&StyleContext<'_, PINS, LEDS>, i8);

/// `config.style` value selecting [`single`].
pub const STYLE_SINGLE: u8 = 0;
/// `config.style` value selecting [`manual`].
pub const STYLE_MANUAL: u8 = 1;

/// Lights the one LED the counter points at.
///
/// Only redraws when the encoder moved, so host writes to `led_level` stay
/// visible until the next turn.
pub fn single<const PINS: usize, const LEDS: usize>(ctx: &StyleContext<'_, PINS, LEDS>, delta: i8) {
    if delta == 0 || LEDS == 0 {
        return;
    }

    let config = ctx.registers.config();
    ctx.registers.fill_led_levels(config.off_level);
    let lit = ctx.counter.get() as usize % LEDS;
    ctx.registers.set_led_level(lit, config.on_level);
    ctx.rebuild();
}

/// Shows whatever the host wrote to `led_level`.
pub fn manual<const PINS: usize, const LEDS: usize>(ctx: &StyleContext<'_, PINS, LEDS>, _delta: i8) {
    ctx.rebuild();
}

/// The built-in style table, indexed by `config.style`.
pub const fn builtin<const PINS: usize, const LEDS: usize>() -> [StyleFn<PINS, LEDS>; 2] {
    [single::<PINS, LEDS>, manual::<PINS, LEDS>]
}

/// Runs `styles[index]`. An index past the table leaves the LEDs as they are.
pub fn dispatch<const PINS: usize, const LEDS: usize>(
    styles: &[StyleFn<PINS, LEDS>],
    index: u8,
    ctx: &StyleContext<'_, PINS, LEDS>,
    delta: i8,
) -> bool {
    match styles.get(index as usize) {
        Some(style) => {
            style(ctx, delta);
            true
        }
        None => {
            #[cfg(feature = "defmt")]
            defmt::debug!("style {} not in table, skipped", index);
            false
        }
    }
}
