/// Gamepad input tracker using gilrs.
///
/// Button mapping comes from the `[gamepad]` section of config.toml.
/// Default mapping:
///   D-pad / Left Stick X  →  Walk left / right
///   A / B                 →  Jump (held)
///   Start                 →  Pause
///   Y                     →  Restart
///   Select                →  Quit

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;
use crate::domain::entity::FrameInput;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,
    R1,
    Start,
    Select,
}

const BTN_COUNT: usize = 8;

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH" => Some(Btn::A),
            "B" | "EAST" => Some(Btn::B),
            "X" | "WEST" => Some(Btn::X),
            "Y" | "NORTH" => Some(Btn::Y),
            "L1" | "LB" => Some(Btn::L1),
            "R1" | "RB" => Some(Btn::R1),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South => Some(Btn::A),
            Button::East => Some(Btn::B),
            Button::West => Some(Btn::X),
            Button::North => Some(Btn::Y),
            Button::LeftTrigger => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::Start => Some(Btn::Start),
            Button::Select => Some(Btn::Select),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct BtnState {
    held: bool,
    just_pressed: bool,
}

struct ActionMap {
    jump: Vec<Btn>,
    pause: Vec<Btn>,
    quit: Vec<Btn>,
    restart: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            jump: vec![Btn::A, Btn::B],
            pause: vec![Btn::Start],
            quit: vec![Btn::Select],
            restart: vec![Btn::Y],
        }
    }
}

impl ActionMap {
    /// Names that don't parse are dropped; an action left with no buttons
    /// keeps its default.
    fn from_config(cfg: &GamepadConfig) -> Self {
        fn parse_or(names: &[String], fallback: Vec<Btn>) -> Vec<Btn> {
            let btns: Vec<Btn> = names.iter().filter_map(|s| Btn::from_name(s)).collect();
            if btns.is_empty() { fallback } else { btns }
        }
        let d = ActionMap::default();
        ActionMap {
            jump: parse_or(&cfg.jump, d.jump),
            pause: parse_or(&cfg.pause, d.pause),
            quit: parse_or(&cfg.quit, d.quit),
            restart: parse_or(&cfg.restart, d.restart),
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    buttons: [BtnState; BTN_COUNT],
    dpad_left: bool,
    dpad_right: bool,
    stick_x: f32,

    action_map: ActionMap,
}

impl GamepadState {
    pub fn new(cfg: &GamepadConfig) -> Self {
        #[cfg(feature = "gamepad")]
        let gilrs_opt = match Gilrs::new() {
            Ok(g) => {
                for (_, pad) in g.gamepads() {
                    tracing::info!(name = pad.name(), "gamepad_found");
                }
                Some(g)
            }
            Err(e) => {
                tracing::warn!(error = %e, "gamepad_unavailable");
                None
            }
        };

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            buttons: [BtnState::default(); BTN_COUNT],
            dpad_left: false,
            dpad_right: false,
            stick_x: 0.0,
            action_map: ActionMap::from_config(cfg),
        }
    }

    pub fn update(&mut self) {
        for b in &mut self.buttons {
            b.just_pressed = false;
        }

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => self.set_button(btn, true),
                EventType::ButtonReleased(btn, _) => self.set_button(btn, false),
                EventType::AxisChanged(Axis::LeftStickX, value, _) => self.stick_x = value,
                EventType::Connected => tracing::info!(id = ?event.id, "gamepad_connected"),
                EventType::Disconnected => {
                    tracing::info!(id = ?event.id, "gamepad_disconnected");
                    self.release_all();
                }
                _ => {}
            }
        }
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, gilrs_btn: Button, held: bool) {
        match gilrs_btn {
            Button::DPadLeft => self.dpad_left = held,
            Button::DPadRight => self.dpad_right = held,
            other => {
                if let Some(btn) = Btn::from_gilrs(other) {
                    let state = &mut self.buttons[btn as usize];
                    state.just_pressed |= held && !state.held;
                    state.held = held;
                }
            }
        }
    }

    // ── Action queries ──

    fn any_held(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[b as usize].held)
    }

    fn any_just_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[b as usize].just_pressed)
    }

    pub fn frame_input(&self) -> FrameInput {
        FrameInput {
            left: self.dpad_left || self.stick_x < -STICK_DEADZONE,
            right: self.dpad_right || self.stick_x > STICK_DEADZONE,
            jump: self.any_held(&self.action_map.jump),
        }
    }

    pub fn pause_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.pause)
    }

    pub fn quit_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.quit)
    }

    pub fn restart_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.restart)
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn release_all(&mut self) {
        self.buttons = [BtnState::default(); BTN_COUNT];
        self.dpad_left = false;
        self.dpad_right = false;
        self.stick_x = 0.0;
    }
}
