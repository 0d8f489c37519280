//! Integration tests for the shared device context and main-loop step

mod common;
use common::*;

use charlie_ring::styles::{STYLE_MANUAL, STYLE_SINGLE};
use charlie_ring::{
    Command, Controller, DEMO_TRIANGLE, Device, Status, TimerCycleDriver, builtin, gamma,
};

/// Runs one full refresh cycle so the next tick may run the style.
fn run_cycle(device: &DemoDevice, driver: &mut TimerCycleDriver<3>) {
    let mut ports = MockPorts::new();
    let mut timer = MockTimer::new();
    for _ in 0..3 {
        device.on_timer_overflow(driver, &mut ports, &mut timer);
    }
}

static SHARED: Device<3, 6> = Device::new();

#[test]
fn static_device_serves_host_reads() {
    let mut host = Host::new();
    let bytes = host.read_registers(&SHARED, 0x04, 4);
    assert_eq!(bytes.as_slice(), &[0x37, 0x13, 0x01, 0x00]);
}

#[test]
fn power_up_defaults() {
    let device = DemoDevice::new();
    let config = device.registers().config();

    assert_eq!(config.on_level, 255);
    assert_eq!(config.off_level, 0);
    assert_eq!(config.style, STYLE_SINGLE);
    assert_eq!(config.i2c_addr, 0x37);
    assert_eq!(device.registers().led_levels(), [0; 6]);
}

#[test]
fn tick_folds_encoder_steps_into_counter() {
    let device = DemoDevice::new();
    let styles = builtin::<3, 6>();
    let mut controller = Controller::new(&DEMO_TRIANGLE, &styles);
    let mut pins = MockPins::new();
    let mut button = MockButton::default();

    for (a, b) in FORWARD_CYCLE {
        pins.set(a != 0, b != 0);
        device.on_encoder_edge(&mut pins);
    }
    let tick = controller.tick(&device, &mut button);

    assert_eq!(tick.delta, 4);
    assert_eq!(device.counter().get(), 4);
    assert_eq!(device.encoder().delta(), 0);

    for (a, b) in BACKWARD_CYCLE.iter().chain(BACKWARD_CYCLE.iter()) {
        pins.set(*a != 0, *b != 0);
        device.on_encoder_edge(&mut pins);
    }
    controller.tick(&device, &mut button);

    // Wraps below zero.
    assert_eq!(device.counter().get(), u16::MAX - 3);
}

#[test]
fn host_sees_counter_moved_by_encoder() {
    let device = DemoDevice::new();
    let styles = builtin::<3, 6>();
    let mut controller = Controller::new(&DEMO_TRIANGLE, &styles);
    let mut pins = MockPins::new();
    let mut host = Host::new();

    pins.drive_all(device.encoder(), &FORWARD_CYCLE);
    controller.tick(&device, &mut MockButton::default());

    assert_eq!(host.read_registers(&device, 0x00, 2).as_slice(), &[4, 0]);
}

#[test]
fn host_counter_write_then_encoder_turn() {
    let device = DemoDevice::new();
    let styles = builtin::<3, 6>();
    let mut controller = Controller::new(&DEMO_TRIANGLE, &styles);
    let mut pins = MockPins::new();
    let mut host = Host::new();

    host.write_registers(&device, 0x00, &[100, 0]);
    pins.drive(device.encoder(), true, false);
    controller.tick(&device, &mut MockButton::default());

    assert_eq!(device.counter().get(), 101);
}

#[test]
fn tick_reports_button_status() {
    let device = DemoDevice::new();
    let styles = builtin::<3, 6>();
    let mut controller = Controller::new(&DEMO_TRIANGLE, &styles);
    let mut button = MockButton { held: true };

    let tick = controller.tick(&device, &mut button);
    assert_eq!(tick.status, Status::HELD | Status::PRESSED);

    let tick = controller.tick(&device, &mut button);
    assert_eq!(tick.status, Status::HELD);
    assert_eq!(device.registers().status(), Status::HELD);
}

#[test]
fn single_style_follows_counter_once_per_cycle() {
    let device = DemoDevice::new();
    let styles = builtin::<3, 6>();
    let mut controller = Controller::new(&DEMO_TRIANGLE, &styles);
    let mut driver = TimerCycleDriver::<3>::new();
    let mut pins = MockPins::new();
    let mut button = MockButton::default();

    // Turn before the first cycle completes: folded, but not styled yet.
    pins.drive_all(device.encoder(), &FORWARD_CYCLE[..2]);
    let tick = controller.tick(&device, &mut button);
    assert!(!tick.styled);
    assert_eq!(device.registers().led_levels(), [0; 6]);

    run_cycle(&device, &mut driver);
    let tick = controller.tick(&device, &mut button);
    assert!(tick.styled);
    assert_eq!(tick.delta, 0);
    assert_eq!(device.registers().led_levels(), [0, 0, 255, 0, 0, 0]);

    // Adopted at the next group 0.
    run_cycle(&device, &mut driver);
    let slot2 = &driver.active()[1];
    assert_eq!(slot2.items()[0].next_cmp, gamma(255));
    assert_eq!(slot2.items()[0].port_dir, [1 << 0, 0, 0]);
}

#[test]
fn manual_style_shows_host_levels() {
    let device = DemoDevice::new();
    let styles = builtin::<3, 6>();
    let mut controller = Controller::new(&DEMO_TRIANGLE, &styles);
    let mut driver = TimerCycleDriver::<3>::new();
    let mut host = Host::new();

    host.write_registers(&device, 0x08, &[STYLE_MANUAL]);
    host.write_registers(&device, 0x13, &[0, 16, 16, 16, 16, 16]);

    run_cycle(&device, &mut driver);
    assert!(controller.tick(&device, &mut MockButton::default()).styled);
    assert!(device.schedules().is_ready());

    run_cycle(&device, &mut driver);
    assert_eq!(driver.active()[0].items()[0].port_dir, [0, 0, 1 << 2]);
}

#[test]
fn unknown_style_leaves_levels_alone() {
    let device = DemoDevice::new();
    let styles = builtin::<3, 6>();
    let mut controller = Controller::new(&DEMO_TRIANGLE, &styles);
    let mut driver = TimerCycleDriver::<3>::new();
    let mut pins = MockPins::new();
    let mut host = Host::new();

    host.write_registers(&device, 0x08, &[42]);
    device.registers().set_led_level(4, 99);
    pins.drive_all(device.encoder(), &FORWARD_CYCLE);

    run_cycle(&device, &mut driver);
    let tick = controller.tick(&device, &mut MockButton::default());

    assert!(!tick.styled);
    assert_eq!(device.counter().get(), 4);
    assert_eq!(device.registers().led_levels(), [0, 0, 0, 0, 99, 0]);
    assert!(!device.schedules().is_ready());
}

#[test]
fn tick_hands_over_pending_command() {
    let device = DemoDevice::new();
    let styles = builtin::<3, 6>();
    let mut controller = Controller::new(&DEMO_TRIANGLE, &styles);
    let mut host = Host::new();

    host.write_registers(&device, 0x03, &[0x01]);

    let tick = controller.tick(&device, &mut MockButton::default());
    assert_eq!(tick.command, Some(Command::Reset));

    let tick = controller.tick(&device, &mut MockButton::default());
    assert_eq!(tick.command, None);
}
