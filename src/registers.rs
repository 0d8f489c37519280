//! The host-visible register file.
//!
//! The register file is a fixed byte layout shared by the I2C slave (raw byte
//! access) and the rest of the firmware (typed field access). Every byte is an
//! atomic, so handlers and the main loop can touch it through `&self` without
//! locks. Multi-byte fields are read and written one byte at a time; a host
//! write racing a main-loop write of the same field may leave a mix of old and
//! new bytes.
//!
//! | Offset | Field                       | Size | Access        |
//! |--------|-----------------------------|------|---------------|
//! | `0x00` | `buffered_counter`          | 2    | read/write    |
//! | `0x02` | `status`                    | 1    | clear on read |
//! | `0x03` | `command`                   | 1    | read/write    |
//! | `0x04` | `read_only.device_id`       | 2    | read only     |
//! | `0x06` | `read_only.device_version`  | 2    | read only     |
//! | `0x08` | `config.style`              | 1    | read/write    |
//! | `0x09` | `config.counter_min`        | 2    | read/write    |
//! | `0x0B` | `config.counter_max`        | 2    | read/write    |
//! | `0x0D` | `config.led_min`            | 1    | read/write    |
//! | `0x0E` | `config.led_max`            | 1    | read/write    |
//! | `0x0F` | `config.on_level`           | 1    | read/write    |
//! | `0x10` | `config.off_level`          | 1    | read/write    |
//! | `0x11` | `config.unused_level`       | 1    | read/write    |
//! | `0x12` | `config.i2c_addr`           | 1    | read/write    |
//! | `0x13` | `led_level[0..LEDS]`        | LEDS | read/write    |
//!
//! Multi-byte fields are little-endian.

use core::ops::{BitOr, BitOrAssign};

use portable_atomic::{AtomicU8, AtomicU16, Ordering};

use crate::config::{DEFAULT_I2C_ADDRESS, DEVICE_ID, DEVICE_VERSION};
use crate::critical::InterruptGuard;

/// Size of the fixed part of the register file, before `led_level`.
pub const HEADER_SIZE: usize = 0x13;

/// Register file fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Field {
    BufferedCounter,
    Status,
    Command,
    DeviceId,
    DeviceVersion,
    Style,
    CounterMin,
    CounterMax,
    LedMin,
    LedMax,
    OnLevel,
    OffLevel,
    UnusedLevel,
    I2cAddr,
    LedLevel,
}

/// How the host may access a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Access {
    ReadWrite,
    /// Host writes are silently dropped.
    ReadOnly,
    /// Host reads clear [`STATUS_CLEAR_ON_READ`].
    ClearOnRead,
}

/// One entry of the register layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FieldDef {
    pub field: Field,
    pub offset: usize,
    pub len: usize,
    pub access: Access,
}

impl FieldDef {
    const fn new(field: Field, offset: usize, len: usize, access: Access) -> Self {
        Self {
            field,
            offset,
            len,
            access,
        }
    }

    /// Returns true if `offset` is one of this field's bytes.
    pub const fn contains(&self, offset: usize) -> bool {
        offset >= self.offset && offset < self.offset + self.len
    }
}

/// Layout of the fixed header. `led_level` follows at [`HEADER_SIZE`].
pub const HEADER_FIELDS: [FieldDef; 14] = [
    FieldDef::new(Field::BufferedCounter, 0x00, 2, Access::ReadWrite),
    FieldDef::new(Field::Status, 0x02, 1, Access::ClearOnRead),
    FieldDef::new(Field::Command, 0x03, 1, Access::ReadWrite),
    FieldDef::new(Field::DeviceId, 0x04, 2, Access::ReadOnly),
    FieldDef::new(Field::DeviceVersion, 0x06, 2, Access::ReadOnly),
    FieldDef::new(Field::Style, 0x08, 1, Access::ReadWrite),
    FieldDef::new(Field::CounterMin, 0x09, 2, Access::ReadWrite),
    FieldDef::new(Field::CounterMax, 0x0B, 2, Access::ReadWrite),
    FieldDef::new(Field::LedMin, 0x0D, 1, Access::ReadWrite),
    FieldDef::new(Field::LedMax, 0x0E, 1, Access::ReadWrite),
    FieldDef::new(Field::OnLevel, 0x0F, 1, Access::ReadWrite),
    FieldDef::new(Field::OffLevel, 0x10, 1, Access::ReadWrite),
    FieldDef::new(Field::UnusedLevel, 0x11, 1, Access::ReadWrite),
    FieldDef::new(Field::I2cAddr, 0x12, 1, Access::ReadWrite),
];

const fn header_field(field: Field) -> FieldDef {
    let mut i = 0;
    while i < HEADER_FIELDS.len() {
        if HEADER_FIELDS[i].field as u8 == field as u8 {
            return HEADER_FIELDS[i];
        }
        i += 1;
    }
    panic!("field is not part of the header");
}

const BUFFERED_COUNTER: FieldDef = header_field(Field::BufferedCounter);
const STATUS: FieldDef = header_field(Field::Status);
const COMMAND: FieldDef = header_field(Field::Command);
const DEVICE_ID_FIELD: FieldDef = header_field(Field::DeviceId);
const DEVICE_VERSION_FIELD: FieldDef = header_field(Field::DeviceVersion);
const STYLE: FieldDef = header_field(Field::Style);
const COUNTER_MIN: FieldDef = header_field(Field::CounterMin);
const COUNTER_MAX: FieldDef = header_field(Field::CounterMax);
const LED_MIN: FieldDef = header_field(Field::LedMin);
const LED_MAX: FieldDef = header_field(Field::LedMax);
const ON_LEVEL: FieldDef = header_field(Field::OnLevel);
const OFF_LEVEL: FieldDef = header_field(Field::OffLevel);
const UNUSED_LEVEL: FieldDef = header_field(Field::UnusedLevel);
const I2C_ADDR: FieldDef = header_field(Field::I2cAddr);

/// Byte offset of the `status` register.
pub const STATUS_OFFSET: usize = STATUS.offset;

/// Button status flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status(u8);

impl Status {
    /// Button is currently held.
    pub const HELD: Self = Self(1 << 0);
    /// Button went down since the previous poll.
    pub const PRESSED: Self = Self(1 << 1);
    /// Button went up since the previous poll.
    pub const RELEASED: Self = Self(1 << 2);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl BitOr for Status {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for Status {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

/// Bits cleared when the host reads `status`.
///
/// Only the edge flags are cleared. `HELD` mirrors the live button level and
/// is left for the next poll to rewrite.
pub const STATUS_CLEAR_ON_READ: Status = Status::PRESSED.union(Status::RELEASED);

/// Commands the host can post through the `command` register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    Reset = 0x01,
    ResetNv = 0x02,
    SaveNv = 0x03,
}

/// A `command` byte that names no [`Command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UnknownCommand(pub u8);

impl core::fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "unknown command code {:#04x}", self.0)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for UnknownCommand {}

impl TryFrom<u8> for Command {
    type Error = UnknownCommand;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0x01 => Ok(Command::Reset),
            0x02 => Ok(Command::ResetNv),
            0x03 => Ok(Command::SaveNv),
            other => Err(UnknownCommand(other)),
        }
    }
}

/// Snapshot of the `config` block. Values are not validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub style: u8,
    pub counter_min: u16,
    pub counter_max: u16,
    pub led_min: u8,
    pub led_max: u8,
    pub on_level: u8,
    pub off_level: u8,
    pub unused_level: u8,
    pub i2c_addr: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            style: 0,
            counter_min: 0,
            counter_max: 0,
            led_min: 0,
            led_max: 0,
            on_level: 255,
            off_level: 0,
            unused_level: 0,
            i2c_addr: DEFAULT_I2C_ADDRESS,
        }
    }
}

const fn default_header() -> [u8; HEADER_SIZE] {
    let mut image = [0; HEADER_SIZE];
    let id = DEVICE_ID.to_le_bytes();
    let version = DEVICE_VERSION.to_le_bytes();
    image[DEVICE_ID_FIELD.offset] = id[0];
    image[DEVICE_ID_FIELD.offset + 1] = id[1];
    image[DEVICE_VERSION_FIELD.offset] = version[0];
    image[DEVICE_VERSION_FIELD.offset + 1] = version[1];
    image[ON_LEVEL.offset] = 255;
    image[I2C_ADDR.offset] = DEFAULT_I2C_ADDRESS;
    image
}

const fn atomic_image<const N: usize>(bytes: [u8; N]) -> [AtomicU8; N] {
    let mut cells = [const { AtomicU8::new(0) }; N];
    let mut i = 0;
    while i < N {
        cells[i] = AtomicU8::new(bytes[i]);
        i += 1;
    }
    cells
}

/// The register file.
///
/// # Type Parameters
/// * `LEDS` - Number of `led_level` registers
pub struct RegisterFile<const LEDS: usize> {
    header: [AtomicU8; HEADER_SIZE],
    led_level: [AtomicU8; LEDS],
}

impl<const LEDS: usize> RegisterFile<LEDS> {
    /// Total size in bytes; host offsets wrap modulo this.
    pub const SIZE: usize = HEADER_SIZE + LEDS;

    /// Creates a register file holding the power-up defaults.
    pub const fn new() -> Self {
        assert!(
            HEADER_SIZE + LEDS <= 256,
            "register file must be addressable with one offset byte"
        );
        Self {
            header: atomic_image(default_header()),
            led_level: [const { AtomicU8::new(0) }; LEDS],
        }
    }

    /// Returns the total size in bytes.
    pub const fn size(&self) -> usize {
        Self::SIZE
    }

    /// Returns the layout entry covering `offset`, after wraparound.
    pub fn field_at(offset: usize) -> FieldDef {
        let offset = offset % Self::SIZE;
        HEADER_FIELDS
            .iter()
            .copied()
            .find(|def| def.contains(offset))
            .unwrap_or(FieldDef::new(Field::LedLevel, HEADER_SIZE, LEDS, Access::ReadWrite))
    }

    fn cell(&self, offset: usize) -> &AtomicU8 {
        let offset = offset % Self::SIZE;
        match offset.checked_sub(HEADER_SIZE) {
            Some(led) => &self.led_level[led],
            None => &self.header[offset],
        }
    }

    /// Reads the byte at `offset` without side effects.
    pub fn read_byte(&self, offset: usize) -> u8 {
        self.cell(offset).load(Ordering::Relaxed)
    }

    /// Host write of the byte at `offset`.
    ///
    /// Returns the field that was written, or `None` when the byte belongs to
    /// a read-only field and the write was dropped.
    pub fn write_byte(&self, offset: usize, value: u8) -> Option<Field> {
        let def = Self::field_at(offset);
        if def.access == Access::ReadOnly {
            return None;
        }
        self.cell(offset).store(value, Ordering::Relaxed);
        Some(def.field)
    }

    fn load_u16(&self, def: FieldDef) -> u16 {
        u16::from_le_bytes([self.read_byte(def.offset), self.read_byte(def.offset + 1)])
    }

    fn store_u16(&self, def: FieldDef, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.header[def.offset].store(lo, Ordering::Relaxed);
        self.header[def.offset + 1].store(hi, Ordering::Relaxed);
    }

    fn load_u8(&self, def: FieldDef) -> u8 {
        self.header[def.offset].load(Ordering::Relaxed)
    }

    fn store_u8(&self, def: FieldDef, value: u8) {
        self.header[def.offset].store(value, Ordering::Relaxed);
    }

    pub fn buffered_counter(&self) -> u16 {
        self.load_u16(BUFFERED_COUNTER)
    }

    pub fn set_buffered_counter(&self, value: u16) {
        self.store_u16(BUFFERED_COUNTER, value);
    }

    /// Reads `status` without clearing anything.
    pub fn status(&self) -> Status {
        Status(self.load_u8(STATUS))
    }

    pub fn set_status(&self, status: Status) {
        self.store_u8(STATUS, status.bits());
    }

    /// Host read of `status`: returns the current flags and clears
    /// [`STATUS_CLEAR_ON_READ`] in one step.
    pub fn read_status_clearing(&self) -> Status {
        Status(
            self.header[STATUS.offset].fetch_and(!STATUS_CLEAR_ON_READ.bits(), Ordering::Relaxed),
        )
    }

    /// Returns the raw `command` byte.
    pub fn command_code(&self) -> u8 {
        self.load_u8(COMMAND)
    }

    /// Takes the pending command, clearing the register.
    ///
    /// Unknown codes are cleared and dropped.
    pub fn take_command(&self) -> Option<Command> {
        let code = self.header[COMMAND.offset].swap(0, Ordering::Relaxed);
        if code == 0 {
            return None;
        }
        match Command::try_from(code) {
            Ok(command) => Some(command),
            Err(_unknown) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("dropping {}", _unknown);
                None
            }
        }
    }

    pub fn device_id(&self) -> u16 {
        self.load_u16(DEVICE_ID_FIELD)
    }

    pub fn device_version(&self) -> u16 {
        self.load_u16(DEVICE_VERSION_FIELD)
    }

    pub fn style(&self) -> u8 {
        self.load_u8(STYLE)
    }

    /// Returns a snapshot of the `config` block.
    pub fn config(&self) -> Config {
        Config {
            style: self.load_u8(STYLE),
            counter_min: self.load_u16(COUNTER_MIN),
            counter_max: self.load_u16(COUNTER_MAX),
            led_min: self.load_u8(LED_MIN),
            led_max: self.load_u8(LED_MAX),
            on_level: self.load_u8(ON_LEVEL),
            off_level: self.load_u8(OFF_LEVEL),
            unused_level: self.load_u8(UNUSED_LEVEL),
            i2c_addr: self.load_u8(I2C_ADDR),
        }
    }

    /// Overwrites the `config` block.
    pub fn set_config(&self, config: &Config) {
        self.store_u8(STYLE, config.style);
        self.store_u16(COUNTER_MIN, config.counter_min);
        self.store_u16(COUNTER_MAX, config.counter_max);
        self.store_u8(LED_MIN, config.led_min);
        self.store_u8(LED_MAX, config.led_max);
        self.store_u8(ON_LEVEL, config.on_level);
        self.store_u8(OFF_LEVEL, config.off_level);
        self.store_u8(UNUSED_LEVEL, config.unused_level);
        self.store_u8(I2C_ADDR, config.i2c_addr);
    }

    /// Returns the level in slot `index`, or 0 past the end.
    pub fn led_level(&self, index: usize) -> u8 {
        self.led_level
            .get(index)
            .map_or(0, |level| level.load(Ordering::Relaxed))
    }

    /// Sets the level in slot `index`; ignored past the end.
    pub fn set_led_level(&self, index: usize, level: u8) {
        if let Some(slot) = self.led_level.get(index) {
            slot.store(level, Ordering::Relaxed);
        }
    }

    /// Sets every level slot.
    pub fn fill_led_levels(&self, level: u8) {
        for slot in &self.led_level {
            slot.store(level, Ordering::Relaxed);
        }
    }

    /// Copies all level slots.
    pub fn led_levels(&self) -> [u8; LEDS] {
        core::array::from_fn(|i| self.led_level[i].load(Ordering::Relaxed))
    }
}

impl<const LEDS: usize> Default for RegisterFile<LEDS> {
    fn default() -> Self {
        Self::new()
    }
}

/// The authoritative step counter.
///
/// `buffered_counter` in the register file mirrors it for the host; the I2C
/// slave refreshes the mirror when a transaction starts and commits a host
/// write back on STOP.
pub struct Counter(AtomicU16);

impl Counter {
    pub const fn new(value: u16) -> Self {
        Self(AtomicU16::new(value))
    }

    pub fn get(&self) -> u16 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, value: u16) {
        self.0.store(value, Ordering::Relaxed);
    }

    /// Adds an encoder delta, wrapping, and returns the new value.
    ///
    /// Takes the guard so the read-modify-write cannot interleave with an
    /// I2C commit.
    pub fn fold(&self, delta: i8, _masked: &InterruptGuard) -> u16 {
        let value = self.get().wrapping_add_signed(i16::from(delta));
        self.set(value);
        value
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new(0)
    }
}
