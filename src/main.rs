/// Entry point and game loop.

mod config;
mod domain;
mod error;
mod sim;
mod ui;

use std::process::ExitCode;
use std::time::{Duration, Instant};

use log::{error, info, trace, warn};

use config::GameConfig;
use domain::rom::Rom;
use error::Result;
use sim::event::GameEvent;
use sim::step;
use sim::world::Playfield;
use ui::compositor::Compositor;
use ui::display::DisplaySpec;
use ui::gamepad::GamepadState;
use ui::input::{InputState, TouchInput, TouchSink};
use ui::renderer::{ActionFace, TerminalPanel};
use ui::sound::{play_events, AudioSink, Silence, SoundEngine};

const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("error")).init();

    let config = GameConfig::load();

    // An unusable panel never reaches the loop.
    let spec = match DisplaySpec::from_config(&config.display) {
        Ok(spec) => spec,
        Err(e) => {
            error!("display rejected: {e}");
            eprintln!("pacfield: {e}");
            return ExitCode::FAILURE;
        }
    };
    let mut panel = match TerminalPanel::new(spec, &config.terminal) {
        Ok(panel) => panel,
        Err(e) => {
            error!("terminal panel rejected: {e}");
            eprintln!("pacfield: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        "panel {}x{} at {} bpp ({:?}), frame {} ms, seed {:?}",
        spec.width, spec.height, spec.bits_per_pixel, spec.order, config.timing.frame_ms, config.seed
    );

    let mut pf = Playfield::new(config.seed);
    let mut compositor = Compositor::new(Rom::generate(), &spec);
    let engine = if config.sound.enabled { SoundEngine::new() } else { None };
    let mut audio: Box<dyn AudioSink> = match engine {
        Some(engine) => Box::new(engine),
        None => Box::new(Silence),
    };

    let honor_release = match panel.init() {
        Ok(enhanced) => enhanced,
        Err(e) => {
            let _ = panel.cleanup();
            eprintln!("Terminal init failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = game_loop(&mut pf, &mut compositor, &mut panel, audio.as_mut(), &config, honor_release);

    if let Err(e) = panel.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        eprintln!("Game error: {e}");
        return ExitCode::FAILURE;
    }

    println!();
    println!("Thanks for playing Pacfield!");
    println!("High Score: {}", pf.hiscore);
    ExitCode::SUCCESS
}

fn game_loop(
    pf: &mut Playfield,
    compositor: &mut Compositor,
    panel: &mut TerminalPanel,
    audio: &mut dyn AudioSink,
    config: &GameConfig,
    honor_release: bool,
) -> Result<()> {
    let mut kb = InputState::new();
    kb.honor_release = honor_release;
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    if gp.connected {
        info!("gamepad connected");
    }
    let mut touch = TouchInput::new(&config.input);
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(config.timing.frame_ms);

    loop {
        kb.drain_events();
        gp.update();

        if kb.quit_requested() {
            break;
        }

        // Latch everything pressed since the last poll.
        for &(col, row) in &kb.mouse_presses {
            panel.mouse_press(col, row);
        }
        drain_touch(panel, &mut touch, pf);
        for button in kb.buttons().chain(gp.pressed()) {
            pf.keys.press(button);
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();

            let events = step::step(pf);
            trace_events(&events);
            if play_events(audio, &events) {
                while audio.is_playing() {
                    std::thread::sleep(FRAME_SLEEP);
                }
            }

            compositor.draw_all(pf, panel);
            panel.show_action(ActionFace::for_game(pf.demo, pf.paused));
            panel.present()?;
        }

        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

/// Per-frame event trail (`RUST_LOG=trace`).
fn trace_events(events: &[GameEvent]) {
    for ev in events {
        match *ev {
            GameEvent::DotEaten { cx, cy, in_demo } => trace!("dot ({cx}, {cy}) demo={in_demo}"),
            GameEvent::PillEaten { cx, cy, in_demo } => trace!("pill ({cx}, {cy}) demo={in_demo}"),
            GameEvent::GhostEaten { who, points, in_demo } => {
                trace!("{who:?} eaten for {points} demo={in_demo}")
            }
            GameEvent::BonusCollected { points, in_demo } => trace!("bonus {points} demo={in_demo}"),
            GameEvent::ExtraLife { lives } => trace!("extra life, {lives} now"),
            GameEvent::PacmanDied { in_demo, game_over } => {
                trace!("pacman died demo={in_demo} game_over={game_over}")
            }
            GameEvent::LevelCleared { level } => trace!("level {level} cleared"),
            GameEvent::LevelStarted { level } => trace!("level {level} started"),
            GameEvent::GameStarted | GameEvent::Paused | GameEvent::Resumed | GameEvent::ResetToAttract => {
                trace!("{ev:?}")
            }
        }
    }
}

fn drain_touch(sink: &mut dyn TouchSink, touch: &mut TouchInput, pf: &mut Playfield) {
    let now = Instant::now();
    loop {
        match sink.read() {
            Ok(Some(sample)) => {
                if let Some(button) = touch.feed(sample, now) {
                    pf.keys.press(button);
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("touch read failed: {e}");
                break;
            }
        }
    }
}
