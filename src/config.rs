//! Build-time pin and LED wiring.
//!
//! A charlieplexed array is described by two tables: [`PinDef`] maps each
//! logical pin to a bit on one of the GPIO ports, and [`LedDef`] maps each LED
//! to the pin pair that lights it. [`Wiring::new`] validates both tables and is
//! a `const fn`, so binding a [`Wiring`] to a `const` rejects a broken table at
//! build time.

/// Number of GPIO ports the LED pins may live on.
pub const PORT_COUNT: usize = 3;

/// I2C address the device answers on unless rebound by firmware.
pub const DEFAULT_I2C_ADDRESS: u8 = 0x37;

/// Value of the read-only `device_id` register.
pub const DEVICE_ID: u16 = 0x1337;

/// Value of the read-only `device_version` register.
pub const DEVICE_VERSION: u16 = 0x0001;

/// A logical pin: one bit on one GPIO port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinDef {
    /// Port index, `0..PORT_COUNT`.
    pub port: u8,
    /// Single-bit mask within the port.
    pub mask: u8,
}

impl PinDef {
    /// Creates a pin definition.
    pub const fn new(port: u8, mask: u8) -> Self {
        Self { port, mask }
    }

    /// Returns the per-port image with only this pin's bit set.
    pub const fn port_image(self) -> [u8; PORT_COUNT] {
        let mut image = [0; PORT_COUNT];
        image[self.port as usize] = self.mask;
        image
    }
}

/// A single LED: the pin driven high, the pin driven low, and the
/// `led_level` slot that holds its brightness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LedDef {
    /// Anode pin index.
    pub high_pin: u8,
    /// Cathode pin index.
    pub low_pin: u8,
    /// Index into the `led_level` registers.
    pub led_index: u8,
}

impl LedDef {
    /// Creates an LED definition.
    pub const fn new(high_pin: u8, low_pin: u8, led_index: u8) -> Self {
        Self {
            high_pin,
            low_pin,
            led_index,
        }
    }
}

/// Wiring table validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WiringError {
    /// Charlieplexing needs at least two pins.
    TooFewPins,

    /// A pin refers to a port outside `0..PORT_COUNT`.
    PortOutOfRange { pin: usize },

    /// A pin mask is zero or has more than one bit set.
    InvalidMask { pin: usize },

    /// Two pins share the same port bit.
    DuplicatePin { pin: usize },

    /// An LED refers to a pin outside the pin table.
    PinOutOfRange { led: usize },

    /// An LED uses the same pin as anode and cathode.
    SamePin { led: usize },

    /// An LED's level slot is outside `0..LEDS`.
    LevelOutOfRange { led: usize },

    /// Two LEDs share the same anode/cathode pair.
    DuplicatePair { led: usize },
}

impl core::fmt::Display for WiringError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            WiringError::TooFewPins => write!(f, "charlieplexing needs at least two pins"),
            WiringError::PortOutOfRange { pin } => {
                write!(f, "pin {} uses a port outside 0..{}", pin, PORT_COUNT)
            }
            WiringError::InvalidMask { pin } => {
                write!(f, "pin {} mask must have exactly one bit set", pin)
            }
            WiringError::DuplicatePin { pin } => {
                write!(f, "pin {} duplicates an earlier pin", pin)
            }
            WiringError::PinOutOfRange { led } => {
                write!(f, "LED {} refers to a pin outside the pin table", led)
            }
            WiringError::SamePin { led } => {
                write!(f, "LED {} uses the same pin as anode and cathode", led)
            }
            WiringError::LevelOutOfRange { led } => {
                write!(f, "LED {} level slot is outside the level registers", led)
            }
            WiringError::DuplicatePair { led } => {
                write!(f, "LED {} duplicates an earlier pin pair", led)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for WiringError {}

/// Validated pin and LED tables.
///
/// # Type Parameters
/// * `PINS` - Number of charlieplexed pins (and LED groups)
/// * `LEDS` - Number of LEDs and `led_level` registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wiring<const PINS: usize, const LEDS: usize> {
    pins: [PinDef; PINS],
    leds: [LedDef; LEDS],
}

impl<const PINS: usize, const LEDS: usize> Wiring<PINS, LEDS> {
    /// Validates and wraps a pin table and an LED table.
    ///
    /// Every group then holds at most `PINS - 1` LEDs, which bounds the
    /// schedule built for it.
    pub const fn new(pins: [PinDef; PINS], leds: [LedDef; LEDS]) -> Result<Self, WiringError> {
        if PINS < 2 {
            return Err(WiringError::TooFewPins);
        }

        let mut i = 0;
        while i < PINS {
            let pin = pins[i];
            if pin.port as usize >= PORT_COUNT {
                return Err(WiringError::PortOutOfRange { pin: i });
            }
            if !pin.mask.is_power_of_two() {
                return Err(WiringError::InvalidMask { pin: i });
            }
            let mut j = 0;
            while j < i {
                if pins[j].port == pin.port && pins[j].mask == pin.mask {
                    return Err(WiringError::DuplicatePin { pin: i });
                }
                j += 1;
            }
            i += 1;
        }

        let mut i = 0;
        while i < LEDS {
            let led = leds[i];
            if led.high_pin as usize >= PINS || led.low_pin as usize >= PINS {
                return Err(WiringError::PinOutOfRange { led: i });
            }
            if led.high_pin == led.low_pin {
                return Err(WiringError::SamePin { led: i });
            }
            if led.led_index as usize >= LEDS {
                return Err(WiringError::LevelOutOfRange { led: i });
            }
            let mut j = 0;
            while j < i {
                if leds[j].high_pin == led.high_pin && leds[j].low_pin == led.low_pin {
                    return Err(WiringError::DuplicatePair { led: i });
                }
                j += 1;
            }
            i += 1;
        }

        Ok(Self { pins, leds })
    }

    /// Returns the pin table.
    pub const fn pins(&self) -> &[PinDef; PINS] {
        &self.pins
    }

    /// Returns the LED table.
    pub const fn leds(&self) -> &[LedDef; LEDS] {
        &self.leds
    }

    /// Returns the pin definition at `index`.
    ///
    /// Indices taken from the LED table are always in range.
    pub fn pin(&self, index: u8) -> PinDef {
        self.pins[index as usize]
    }

    /// Iterates over the LEDs whose anode is `high_pin`.
    pub fn group(&self, high_pin: usize) -> impl Iterator<Item = &LedDef> + '_ {
        self.leds
            .iter()
            .filter(move |led| led.high_pin as usize == high_pin)
    }
}

/// Production ring: 6 pins on ports A and C driving 30 LEDs.
pub const LED_RING: Wiring<6, 30> = match Wiring::new(
    [
        PinDef::new(0, 1 << 3),
        PinDef::new(0, 1 << 2),
        PinDef::new(0, 1 << 1),
        PinDef::new(2, 1 << 3),
        PinDef::new(2, 1 << 2),
        PinDef::new(2, 1 << 1),
    ],
    [
        LedDef::new(0, 1, 0),
        LedDef::new(0, 2, 2),
        LedDef::new(0, 3, 4),
        LedDef::new(0, 4, 6),
        LedDef::new(0, 5, 8),
        LedDef::new(1, 0, 1),
        LedDef::new(1, 2, 10),
        LedDef::new(1, 3, 12),
        LedDef::new(1, 4, 14),
        LedDef::new(1, 5, 16),
        LedDef::new(2, 0, 3),
        LedDef::new(2, 1, 11),
        LedDef::new(2, 3, 18),
        LedDef::new(2, 4, 20),
        LedDef::new(2, 5, 22),
        LedDef::new(3, 0, 5),
        LedDef::new(3, 1, 13),
        LedDef::new(3, 2, 19),
        LedDef::new(3, 4, 24),
        LedDef::new(3, 5, 26),
        LedDef::new(4, 0, 7),
        LedDef::new(4, 1, 15),
        LedDef::new(4, 2, 21),
        LedDef::new(4, 3, 25),
        LedDef::new(4, 5, 28),
        LedDef::new(5, 0, 9),
        LedDef::new(5, 1, 17),
        LedDef::new(5, 2, 23),
        LedDef::new(5, 3, 27),
        LedDef::new(5, 4, 29),
    ],
) {
    Ok(wiring) => wiring,
    Err(_) => panic!("invalid LED ring wiring"),
};

/// Minimal array: 3 pins, one per port, every ordered pair wired.
pub const DEMO_TRIANGLE: Wiring<3, 6> = match Wiring::new(
    [
        PinDef::new(0, 1 << 0),
        PinDef::new(1, 1 << 1),
        PinDef::new(2, 1 << 2),
    ],
    [
        LedDef::new(0, 1, 0),
        LedDef::new(0, 2, 1),
        LedDef::new(1, 0, 2),
        LedDef::new(1, 2, 3),
        LedDef::new(2, 0, 4),
        LedDef::new(2, 1, 5),
    ],
) {
    Ok(wiring) => wiring,
    Err(_) => panic!("invalid demo wiring"),
};
