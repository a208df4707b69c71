/// Keyboard state tracker.
///
/// Movement and jump are continuous (held keys); pause, restart and quit
/// are edge-triggered. Terminals that report key releases get exact hold
/// tracking; everywhere else a key counts as held until `HOLD_TIMEOUT`
/// passes without a Press/Repeat event.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::entity::FrameInput;

/// Terminal auto-repeat is ~30 Hz after an initial delay of up to ~500 ms.
/// Shorter than that and a held key flickers; longer and the player slides.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_JUMP: &[KeyCode] = &[
    KeyCode::Char(' '),
    KeyCode::Up,
    KeyCode::Char('w'),
    KeyCode::Char('W'),
];
const KEYS_PAUSE: &[KeyCode] = &[KeyCode::F(1), KeyCode::Char('p'), KeyCode::Char('P')];
const KEYS_RESTART: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Esc, KeyCode::Char('q'), KeyCode::Char('Q')];

pub struct InputState {
    /// Last Press/Repeat per key.
    last_active: HashMap<KeyCode, Instant>,
    /// Keys that went from released to held during the last drain.
    fresh_presses: Vec<KeyCode>,
    ctrl_c: bool,
    /// Only set once keyboard enhancement is confirmed.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            ctrl_c: false,
            honor_release: false,
        }
    }

    /// Drain all pending terminal events. Call once per loop iteration.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.ctrl_c = false;

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.apply(key, Instant::now());
            }
        }
        self.expire(Instant::now());
    }

    fn apply(&mut self, key: KeyEvent, now: Instant) {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            self.ctrl_c = true;
            return;
        }
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            // Unconfirmed releases are ignored; the timeout expires the key.
            KeyEventKind::Release => {}
            _ => {
                if !self.is_held_at(key.code, now) {
                    self.fresh_presses.push(key.code);
                }
                self.last_active.insert(key.code, now);
            }
        }
    }

    fn expire(&mut self, now: Instant) {
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn is_held_at(&self, code: KeyCode, now: Instant) -> bool {
        self.last_active.get(&code)
            .is_some_and(|t| now.duration_since(*t) < HOLD_TIMEOUT)
    }

    fn any_held(&self, codes: &[KeyCode]) -> bool {
        let now = Instant::now();
        codes.iter().any(|c| self.is_held_at(*c, now))
    }

    fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.fresh_presses.contains(c))
    }

    // ── Actions ──

    /// Held movement and jump keys as this frame's input.
    pub fn frame_input(&self) -> FrameInput {
        FrameInput {
            left: self.any_held(KEYS_LEFT) || self.any_pressed(KEYS_LEFT),
            right: self.any_held(KEYS_RIGHT) || self.any_pressed(KEYS_RIGHT),
            jump: self.any_held(KEYS_JUMP) || self.any_pressed(KEYS_JUMP),
        }
    }

    pub fn pause_pressed(&self) -> bool {
        self.any_pressed(KEYS_PAUSE)
    }

    pub fn restart_pressed(&self) -> bool {
        self.any_pressed(KEYS_RESTART)
    }

    pub fn quit_pressed(&self) -> bool {
        self.ctrl_c || self.any_pressed(KEYS_QUIT)
    }
}
