/// Entry point and game loop.

mod config;
mod domain;
mod error;
mod sim;
mod ui;

use std::fs::File;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::GameConfig;
use domain::entity::FrameInput;
use error::LevelError;
use sim::event::LevelEvent;
use sim::level::{build_level, load_levels, LevelDef};
use sim::world::Level;
use ui::gamepad::GamepadState;
use ui::input::InputState;
use ui::renderer::{Hud, Renderer};
use ui::sound::{play_events, SoundEngine};

const FRAME_SLEEP: Duration = Duration::from_millis(5);
const MESSAGE_TICKS: u32 = 90;
const LOG_ENV: &str = "WILDRUN_LOG";

fn main() {
    init_logging();
    let config = GameConfig::load();

    let levels = match load_levels(&config.levels_dir) {
        Ok(levels) if !levels.is_empty() => levels,
        Ok(_) => {
            eprintln!("No levels to play.");
            return;
        }
        Err(e) => {
            tracing::error!(error = %e, "level_discovery_failed");
            eprintln!("Failed to load levels: {e}");
            return;
        }
    };

    let mut renderer = Renderer::new(ui::atlas::GlyphAtlas::new(), &config.level);
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();
    let result = game_loop(&levels, &mut renderer, sound.as_ref(), &config);

    // The terminal has to be back to normal before anything is printed.
    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        tracing::error!(error = %e, "game_loop_failed");
        eprintln!("Game error: {e}");
    }
}

/// Log to a file: the terminal belongs to the renderer.
fn init_logging() {
    let path = std::env::var(LOG_ENV).unwrap_or_else(|_| "wildrun.log".into());
    let Ok(file) = File::create(&path) else { return };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
}

// ══════════════════════════════════════════════════════════════
// Session: which level is running
// ══════════════════════════════════════════════════════════════

struct Session<'a> {
    levels: &'a [LevelDef],
    index: usize,
    level: Level,
    rng: ChaCha8Rng,
    paused: bool,
    message: &'static str,
    message_timer: u32,
}

impl<'a> Session<'a> {
    fn start(levels: &'a [LevelDef], renderer: &Renderer, config: &GameConfig) -> Result<Self, LevelError> {
        let mut rng = ChaCha8Rng::from_os_rng();
        let level = build_level(&levels[0], config.level, renderer.atlas(), &mut rng)?;
        info!(level = %level.name, "level_started");
        Ok(Session {
            levels,
            index: 0,
            level,
            rng,
            paused: false,
            message: "",
            message_timer: 0,
        })
    }

    /// Rebuild level `index` from its definition (wrapping past the last).
    fn load(&mut self, index: usize, renderer: &Renderer, config: &GameConfig) -> Result<(), LevelError> {
        self.index = index % self.levels.len();
        self.level = build_level(&self.levels[self.index], config.level, renderer.atlas(), &mut self.rng)?;
        info!(level = %self.level.name, index = self.index, "level_started");
        Ok(())
    }

    fn say(&mut self, message: &'static str) {
        self.message = message;
        self.message_timer = MESSAGE_TICKS;
    }

    fn tick_message(&mut self) {
        if self.message_timer > 0 {
            self.message_timer -= 1;
            if self.message_timer == 0 {
                self.message = "";
            }
        }
    }

    fn hud(&self) -> Hud<'_> {
        Hud {
            level_name: &self.level.name,
            level_index: self.index,
            level_count: self.levels.len(),
            bounds: self.level.player.bounds,
            paused: self.paused,
            message: self.message,
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Game loop
// ══════════════════════════════════════════════════════════════

fn game_loop(
    levels: &[LevelDef],
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    kb.honor_release = renderer.reports_releases();
    let mut gp = GamepadState::new(&config.gamepad);
    let mut session = Session::start(levels, renderer, config)?;
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(config.tick_rate_ms);

    loop {
        kb.drain_events();
        gp.update();

        if kb.quit_pressed() || gp.quit_pressed() {
            info!("quit");
            break;
        }
        if kb.pause_pressed() || gp.pause_pressed() {
            session.paused = !session.paused;
        }
        if kb.restart_pressed() || gp.restart_pressed() {
            session.paused = false;
            session.load(session.index, renderer, config)?;
            session.say("Level restarted");
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
            if session.paused {
                renderer.hold_frame(&session.hud())?;
            } else {
                renderer.begin_frame()?;
                let input = merge(kb.frame_input(), gp.frame_input());
                let events = session.level.run(input, &mut *renderer);
                play_events(sound, &events);
                session.tick_message();
                renderer.finish_frame(&session.hud())?;
                advance(&mut session, &events, renderer, config)?;
            }
        }

        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn merge(a: FrameInput, b: FrameInput) -> FrameInput {
    FrameInput {
        left: a.left || b.left,
        right: a.right || b.right,
        jump: a.jump || b.jump,
    }
}

/// Level flow: the goal moves on to the next level, a fall restarts this one.
fn advance(
    session: &mut Session,
    events: &[LevelEvent],
    renderer: &Renderer,
    config: &GameConfig,
) -> Result<(), LevelError> {
    for event in events {
        match event {
            LevelEvent::GoalReached => {
                info!(level = %session.level.name, frame = session.level.frame, "goal_reached");
                session.load(session.index + 1, renderer, config)?;
                session.say("Level cleared!");
                return Ok(());
            }
            LevelEvent::PlayerFell => {
                info!(level = %session.level.name, "player_fell");
                session.load(session.index, renderer, config)?;
                session.say("Ouch! Try again");
                return Ok(());
            }
            LevelEvent::EnemiesTurned { count } => {
                tracing::debug!(count, "enemies_turned");
            }
            LevelEvent::Dust { .. } => {}
        }
    }
    Ok(())
}
