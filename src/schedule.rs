//! Charlieplex schedules.
//!
//! LEDs sharing an anode ("high pin") form a group, and one group is drawn per
//! timer period. A group's [`Schedule`] is an ordered list of
//! [`ScheduleItem`]s: the first is applied when the period starts and drives
//! the cathode of every lit LED low; each later item is applied when the timer
//! reaches the previous item's `next_cmp` and releases the cathodes of the
//! LEDs whose on-time has run out. The last item is the sentinel, with
//! `next_cmp == SENTINEL_CMP`, after which nothing else happens until the
//! next period.
//!
//! [`LedScheduler::rebuild`] computes a full set of schedules from the
//! `led_level` registers and publishes it through a [`Mailbox`]; the timer
//! driver adopts it between full cycles.

use heapless::Vec;

use crate::config::{PORT_COUNT, PinDef, Wiring};
use crate::mailbox::{Mailbox, Publish};
use crate::registers::RegisterFile;

/// `next_cmp` of the terminating item. Never a real LED threshold.
pub const SENTINEL_CMP: u8 = 255;

/// Perceptual brightness correction, level to timer threshold.
#[rustfmt::skip]
pub const GAMMA: [u8; 256] = [
      0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   1,   1,   1,   1,
      1,   1,   1,   1,   2,   2,   2,   2,   2,   2,   3,   3,   3,   3,   4,   4,
      4,   4,   5,   5,   5,   5,   6,   6,   6,   7,   7,   7,   8,   8,   8,   9,
      9,   9,  10,  10,  11,  11,  11,  12,  12,  13,  13,  14,  14,  15,  15,  16,
     16,  17,  17,  18,  18,  19,  19,  20,  20,  21,  21,  22,  23,  23,  24,  24,
     25,  26,  26,  27,  28,  28,  29,  30,  30,  31,  32,  32,  33,  34,  35,  35,
     36,  37,  38,  38,  39,  40,  41,  42,  42,  43,  44,  45,  46,  47,  47,  48,
     49,  50,  51,  52,  53,  54,  55,  56,  56,  57,  58,  59,  60,  61,  62,  63,
     64,  65,  66,  67,  68,  69,  70,  71,  73,  74,  75,  76,  77,  78,  79,  80,
     81,  82,  84,  85,  86,  87,  88,  89,  91,  92,  93,  94,  95,  97,  98,  99,
    100, 102, 103, 104, 105, 107, 108, 109, 111, 112, 113, 115, 116, 117, 119, 120,
    121, 123, 124, 126, 127, 128, 130, 131, 133, 134, 136, 137, 139, 140, 142, 143,
    145, 146, 148, 149, 151, 152, 154, 155, 157, 158, 160, 162, 163, 165, 166, 168,
    170, 171, 173, 175, 176, 178, 180, 181, 183, 185, 186, 188, 190, 192, 193, 195,
    197, 199, 200, 202, 204, 206, 207, 209, 211, 213, 215, 217, 218, 220, 222, 224,
    226, 228, 230, 232, 233, 235, 237, 239, 241, 243, 245, 247, 249, 251, 253, 255,
];

/// Timer threshold for a brightness level.
///
/// Clamped below [`SENTINEL_CMP`]. A result of 0 means the LED is never
/// driven.
pub const fn gamma(level: u8) -> u8 {
    let threshold = GAMMA[level as usize];
    if threshold >= SENTINEL_CMP {
        SENTINEL_CMP - 1
    } else {
        threshold
    }
}

/// One pin-drive snapshot of a group's period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScheduleItem {
    /// Cathode pins driven low while this item is active, per port.
    pub port_dir: [u8; PORT_COUNT],
    /// Timer value at which the following item takes over.
    pub next_cmp: u8,
}

impl ScheduleItem {
    /// Terminating item: nothing driven, no further compare.
    pub const SENTINEL: Self = Self {
        port_dir: [0; PORT_COUNT],
        next_cmp: SENTINEL_CMP,
    };

    pub const fn is_sentinel(&self) -> bool {
        self.next_cmp == SENTINEL_CMP
    }
}

/// Drive plan for one group.
///
/// Holds at most `PINS` items: one per distinct threshold among the group's
/// at most `PINS - 1` LEDs, plus the initial snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule<const PINS: usize> {
    high_pin: [u8; PORT_COUNT],
    items: Vec<ScheduleItem, PINS>,
}

impl<const PINS: usize> Schedule<PINS> {
    /// An empty schedule: no anode, only the sentinel.
    pub const fn new() -> Self {
        Self {
            high_pin: [0; PORT_COUNT],
            items: Vec::new(),
        }
    }

    /// The group's anode, per port.
    pub fn high_pin(&self) -> [u8; PORT_COUNT] {
        self.high_pin
    }

    pub fn items(&self) -> &[ScheduleItem] {
        &self.items
    }

    /// Returns item `index`, or the sentinel past the end.
    pub fn item(&self, index: usize) -> ScheduleItem {
        self.items
            .get(index)
            .copied()
            .unwrap_or(ScheduleItem::SENTINEL)
    }

    /// Direction image for item `index`: the anode plus its cathodes.
    pub fn outputs(&self, index: usize) -> [u8; PORT_COUNT] {
        let item = self.item(index);
        core::array::from_fn(|port| self.high_pin[port] | item.port_dir[port])
    }

    fn push(&mut self, item: ScheduleItem) {
        // Capacity is guaranteed by `Wiring` validation.
        let _ = self.items.push(item);
    }
}

impl<const PINS: usize> Default for Schedule<PINS> {
    fn default() -> Self {
        Self::new()
    }
}

/// One schedule per group, indexed by high pin.
pub type ScheduleSet<const PINS: usize> = [Schedule<PINS>; PINS];

/// Returns a set of empty schedules.
pub const fn empty_set<const PINS: usize>() -> ScheduleSet<PINS> {
    [const { Schedule::<PINS>::new() }; PINS]
}

/// Builds schedule sets from the `led_level` registers.
pub struct LedScheduler<'w, const PINS: usize, const LEDS: usize> {
    wiring: &'w Wiring<PINS, LEDS>,
}

impl<'w, const PINS: usize, const LEDS: usize> LedScheduler<'w, PINS, LEDS> {
    pub const fn new(wiring: &'w Wiring<PINS, LEDS>) -> Self {
        Self { wiring }
    }

    pub fn wiring(&self) -> &'w Wiring<PINS, LEDS> {
        self.wiring
    }

    /// Rebuilds every group and publishes the set for the timer driver.
    ///
    /// A set published earlier and not yet adopted is overwritten.
    pub fn rebuild(
        &self,
        registers: &RegisterFile<LEDS>,
        pending: &Mailbox<ScheduleSet<PINS>>,
    ) -> Publish {
        let outcome = pending.publish_with(|set| self.build_set(registers, set));
        if outcome == Publish::Busy {
            #[cfg(feature = "defmt")]
            defmt::warn!("schedule publish skipped, mailbox busy");
        }
        outcome
    }

    /// Builds every group into `set`.
    pub fn build_set(&self, registers: &RegisterFile<LEDS>, set: &mut ScheduleSet<PINS>) {
        for (group, schedule) in set.iter_mut().enumerate() {
            self.build_group(group, registers, schedule);
        }
    }

    /// Builds the schedule of the group whose anode is pin `group`.
    ///
    /// A `group` that names no pin leaves `schedule` empty: no anode, only
    /// the sentinel.
    pub fn build_group(
        &self,
        group: usize,
        registers: &RegisterFile<LEDS>,
        schedule: &mut Schedule<PINS>,
    ) {
        let Some(anode) = self.wiring.pins().get(group) else {
            #[cfg(feature = "defmt")]
            defmt::warn!("schedule: no pin for group {}", group);

            *schedule = Schedule::new();
            return;
        };
        schedule.high_pin = anode.port_image();
        schedule.items.clear();

        // Cathode and threshold of every lit LED. Levels are copied once so
        // a concurrent register write cannot change them mid-build.
        let mut lit: Vec<(PinDef, u8), PINS> = Vec::new();
        for led in self.wiring.group(group) {
            let threshold = gamma(registers.led_level(led.led_index as usize));
            if threshold == 0 {
                continue;
            }
            let _ = lit.push((self.wiring.pin(led.low_pin), threshold));
        }

        let mut drive = [0u8; PORT_COUNT];
        for (pin, _) in &lit {
            drive[pin.port as usize] |= pin.mask;
        }

        let mut current = lit
            .iter()
            .map(|&(_, threshold)| threshold)
            .min()
            .unwrap_or(SENTINEL_CMP);
        schedule.push(ScheduleItem {
            port_dir: drive,
            next_cmp: current,
        });

        // Release every LED at the current threshold, then move to the
        // smallest threshold above it. Equal thresholds share one item.
        while current != SENTINEL_CMP {
            let mut next = SENTINEL_CMP;
            for &(pin, threshold) in &lit {
                if threshold == current {
                    drive[pin.port as usize] &= !pin.mask;
                } else if threshold > current && threshold < next {
                    next = threshold;
                }
            }
            schedule.push(ScheduleItem {
                port_dir: drive,
                next_cmp: next,
            });
            current = next;
        }
    }
}
