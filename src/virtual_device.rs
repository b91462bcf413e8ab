//! Virtual devices using evdev/uinput
//!
//! Creates an extended joystick (eight axes, 40 buttons) and an Xbox-style
//! gamepad that appear as standard controllers to simulators. Writes are
//! buffered and emitted as one `SYN_REPORT` frame per flush.

use evdev::{
    uinput::{VirtualDevice, VirtualDeviceBuilder},
    AbsInfo, AbsoluteAxisType, AttributeSet, BusType, EventType, InputEvent, InputId, Key,
    UinputAbsSetup,
};
use quadrant_core::output::{JOYSTICK_AXIS_MAX, STICK_MAX, STICK_MIN, TRIGGER_MAX};
use quadrant_core::{JoystickAxis, OutputError, OutputKind, OutputSink, StickSide, TriggerSide};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

/// Buttons exposed by the virtual joystick (BTN_TRIGGER_HAPPY1..40)
pub const JOYSTICK_BUTTONS: u16 = 40;

pub const JOYSTICK_NAME: &str = "Quadrant Bridge Joystick";
pub const GAMEPAD_NAME: &str = "Quadrant Bridge Gamepad";

/// Errors from virtual device operations
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Failed to create virtual device: {0}")]
    CreateDevice(#[source] std::io::Error),
    #[error("Failed to emit event: {0}")]
    EmitEvent(#[source] std::io::Error),
}

impl From<DeviceError> for OutputError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::CreateDevice(e) | DeviceError::EmitEvent(e) => OutputError::Device(e),
        }
    }
}

/// Pending axis and key events with change detection, flushed as one frame
struct EventBuffer {
    device: VirtualDevice,
    abs_values: HashMap<u16, i32>,
    key_values: HashMap<Key, bool>,
    pending: Vec<InputEvent>,
}

impl EventBuffer {
    fn new(device: VirtualDevice) -> Self {
        Self {
            device,
            abs_values: HashMap::new(),
            key_values: HashMap::new(),
            pending: Vec::new(),
        }
    }

    fn set_abs(&mut self, code: AbsoluteAxisType, value: i32) {
        // Only queue if changed
        if self.abs_values.get(&code.0) == Some(&value) {
            return;
        }
        self.abs_values.insert(code.0, value);
        self.pending
            .push(InputEvent::new_now(EventType::ABSOLUTE, code.0, value));
    }

    fn set_key(&mut self, key: Key, pressed: bool) {
        if self.key_values.get(&key) == Some(&pressed) {
            return;
        }
        self.key_values.insert(key, pressed);
        self.pending
            .push(InputEvent::new_now(EventType::KEY, key.code(), i32::from(pressed)));
    }

    fn flush(&mut self) -> Result<(), DeviceError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let events = std::mem::take(&mut self.pending);
        self.device.emit(&events).map_err(DeviceError::EmitEvent)
    }

    fn device_path(&mut self) -> Option<PathBuf> {
        self.device
            .enumerate_dev_nodes_blocking()
            .ok()?
            .next()?
            .ok()
    }
}

/// Extended joystick: X/Y/Z/RX/RY/RZ plus two sliders, all `0..=32768`
pub struct VirtualJoystick {
    events: EventBuffer,
}

impl VirtualJoystick {
    /// Create a new virtual joystick device
    ///
    /// `name` is shown in `evtest` and game controller settings.
    pub fn new(name: &str) -> Result<Self, DeviceError> {
        let mut builder = VirtualDeviceBuilder::new()
            .map_err(DeviceError::CreateDevice)?
            .name(name);

        let mut keys = AttributeSet::<Key>::new();
        for id in 1..=JOYSTICK_BUTTONS {
            if let Some(key) = button_key(id) {
                keys.insert(key);
            }
        }
        builder = builder
            .with_keys(&keys)
            .map_err(DeviceError::CreateDevice)?;

        for &axis in JoystickAxis::ALL {
            let abs_setup = UinputAbsSetup::new(
                joystick_axis_code(axis),
                AbsInfo::new(0, 0, JOYSTICK_AXIS_MAX, 0, 0, 1),
            );
            builder = builder
                .with_absolute_axis(&abs_setup)
                .map_err(DeviceError::CreateDevice)?;
        }

        let device = builder.build().map_err(DeviceError::CreateDevice)?;
        Ok(Self {
            events: EventBuffer::new(device),
        })
    }

    /// Queue an axis value, clamped to `[0, 32768]`
    pub fn set_axis(&mut self, axis: JoystickAxis, value: i32) {
        self.events
            .set_abs(joystick_axis_code(axis), value.clamp(0, JOYSTICK_AXIS_MAX));
    }

    /// Queue a button state; ids beyond the device's 40 buttons are rejected
    pub fn set_button(&mut self, id: u16, pressed: bool) -> Result<(), OutputError> {
        let key = button_key(id).ok_or_else(|| {
            OutputError::Unsupported(format!(
                "button {id} (joystick exposes 1-{JOYSTICK_BUTTONS})"
            ))
        })?;
        self.events.set_key(key, pressed);
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), DeviceError> {
        self.events.flush()
    }

    /// Get the device path (e.g., /dev/input/eventX)
    pub fn device_path(&mut self) -> Option<PathBuf> {
        self.events.device_path()
    }
}

/// Xbox-style gamepad: two sticks and two analog triggers
pub struct VirtualGamepad {
    events: EventBuffer,
}

impl VirtualGamepad {
    pub fn new(name: &str) -> Result<Self, DeviceError> {
        // Xbox 360 controller ids so games pick their default layout
        let mut builder = VirtualDeviceBuilder::new()
            .map_err(DeviceError::CreateDevice)?
            .name(name)
            .input_id(InputId::new(BusType::BUS_USB, 0x045e, 0x028e, 0x0110));

        // Face and shoulder buttons for Steam Input compatibility
        let mut keys = AttributeSet::<Key>::new();
        for key in [
            Key::BTN_SOUTH,
            Key::BTN_EAST,
            Key::BTN_NORTH,
            Key::BTN_WEST,
            Key::BTN_TL,
            Key::BTN_TR,
            Key::BTN_SELECT,
            Key::BTN_START,
            Key::BTN_MODE,
            Key::BTN_THUMBL,
            Key::BTN_THUMBR,
        ] {
            keys.insert(key);
        }
        builder = builder
            .with_keys(&keys)
            .map_err(DeviceError::CreateDevice)?;

        for side in [StickSide::Left, StickSide::Right] {
            let (x, y) = stick_codes(side);
            for code in [x, y] {
                let stick =
                    AbsInfo::new(0, i32::from(STICK_MIN), i32::from(STICK_MAX), 16, 128, 0);
                builder = builder
                    .with_absolute_axis(&UinputAbsSetup::new(code, stick))
                    .map_err(DeviceError::CreateDevice)?;
            }
        }
        for side in [TriggerSide::Left, TriggerSide::Right] {
            let trigger = AbsInfo::new(0, 0, i32::from(TRIGGER_MAX), 0, 0, 0);
            builder = builder
                .with_absolute_axis(&UinputAbsSetup::new(trigger_code(side), trigger))
                .map_err(DeviceError::CreateDevice)?;
        }

        let device = builder.build().map_err(DeviceError::CreateDevice)?;
        Ok(Self {
            events: EventBuffer::new(device),
        })
    }

    pub fn set_trigger(&mut self, side: TriggerSide, value: u8) {
        self.events.set_abs(trigger_code(side), i32::from(value));
    }

    /// Queue a stick position, `y` positive up
    pub fn set_stick(&mut self, side: StickSide, x: i16, y: i16) {
        let (x_code, y_code) = stick_codes(side);
        self.events.set_abs(x_code, i32::from(x));
        // evdev Y grows downward
        self.events.set_abs(y_code, i32::from(!y));
    }

    pub fn flush(&mut self) -> Result<(), DeviceError> {
        self.events.flush()
    }

    pub fn device_path(&mut self) -> Option<PathBuf> {
        self.events.device_path()
    }
}

/// Joystick button id (1-based) to its key code
fn button_key(id: u16) -> Option<Key> {
    (1..=JOYSTICK_BUTTONS)
        .contains(&id)
        .then(|| Key::new(Key::BTN_TRIGGER_HAPPY1.code() + id - 1))
}

fn joystick_axis_code(axis: JoystickAxis) -> AbsoluteAxisType {
    match axis {
        JoystickAxis::X => AbsoluteAxisType::ABS_X,
        JoystickAxis::Y => AbsoluteAxisType::ABS_Y,
        JoystickAxis::Z => AbsoluteAxisType::ABS_Z,
        JoystickAxis::RX => AbsoluteAxisType::ABS_RX,
        JoystickAxis::RY => AbsoluteAxisType::ABS_RY,
        JoystickAxis::RZ => AbsoluteAxisType::ABS_RZ,
        JoystickAxis::Slider0 => AbsoluteAxisType::ABS_THROTTLE,
        JoystickAxis::Slider1 => AbsoluteAxisType::ABS_RUDDER,
    }
}

fn stick_codes(side: StickSide) -> (AbsoluteAxisType, AbsoluteAxisType) {
    match side {
        StickSide::Left => (AbsoluteAxisType::ABS_X, AbsoluteAxisType::ABS_Y),
        StickSide::Right => (AbsoluteAxisType::ABS_RX, AbsoluteAxisType::ABS_RY),
    }
}

fn trigger_code(side: TriggerSide) -> AbsoluteAxisType {
    match side {
        TriggerSide::Left => AbsoluteAxisType::ABS_Z,
        TriggerSide::Right => AbsoluteAxisType::ABS_RZ,
    }
}

/// Output sink backed by whichever uinput devices could be created
///
/// A missing device reports as unavailable; the engine then skips batches
/// that target it.
#[derive(Default)]
pub struct UinputSink {
    joystick: Option<VirtualJoystick>,
    gamepad: Option<VirtualGamepad>,
}

impl UinputSink {
    /// Create both devices, logging any that cannot be created
    pub fn open() -> Self {
        let joystick = match VirtualJoystick::new(JOYSTICK_NAME) {
            Ok(mut js) => {
                info!("Created virtual joystick: {}", JOYSTICK_NAME);
                if let Some(path) = js.device_path() {
                    info!("Device path: {}", path.display());
                }
                Some(js)
            }
            Err(e) => {
                warn!("Joystick unavailable: {}", e);
                None
            }
        };
        let gamepad = match VirtualGamepad::new(GAMEPAD_NAME) {
            Ok(mut pad) => {
                info!("Created virtual gamepad: {}", GAMEPAD_NAME);
                if let Some(path) = pad.device_path() {
                    info!("Device path: {}", path.display());
                }
                Some(pad)
            }
            Err(e) => {
                warn!("Gamepad unavailable: {}", e);
                None
            }
        };
        Self { joystick, gamepad }
    }

    fn joystick(&mut self) -> Result<&mut VirtualJoystick, OutputError> {
        self.joystick
            .as_mut()
            .ok_or(OutputError::SinkUnavailable(OutputKind::ExtendedJoystick))
    }

    fn gamepad(&mut self) -> Result<&mut VirtualGamepad, OutputError> {
        self.gamepad
            .as_mut()
            .ok_or(OutputError::SinkUnavailable(OutputKind::Gamepad))
    }
}

impl OutputSink for UinputSink {
    fn is_available(&self, device: OutputKind) -> bool {
        match device {
            OutputKind::Gamepad => self.gamepad.is_some(),
            OutputKind::ExtendedJoystick => self.joystick.is_some(),
        }
    }

    fn set_axis(&mut self, axis: JoystickAxis, value: i32) -> Result<(), OutputError> {
        self.joystick()?.set_axis(axis, value);
        Ok(())
    }

    fn set_trigger(&mut self, side: TriggerSide, value: u8) -> Result<(), OutputError> {
        self.gamepad()?.set_trigger(side, value);
        Ok(())
    }

    fn set_stick(&mut self, stick: StickSide, x: i16, y: i16) -> Result<(), OutputError> {
        self.gamepad()?.set_stick(stick, x, y);
        Ok(())
    }

    fn set_button(&mut self, id: u16, pressed: bool) -> Result<(), OutputError> {
        self.joystick()?.set_button(id, pressed)
    }

    fn flush(&mut self) -> Result<(), OutputError> {
        if let Some(js) = self.joystick.as_mut() {
            js.flush()?;
        }
        if let Some(pad) = self.gamepad.as_mut() {
            pad.flush()?;
        }
        Ok(())
    }
}
