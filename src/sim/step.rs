/// The step function: advances the playfield by one frame.
///
/// Processing order:
///   1. Level advance (after the last dot)
///   2. Buttons: start, pause/resume, reset
///   3. Unless paused:
///      a. Timers (scatter/chase waves, bonus cycle, frightened window)
///      b. Targets (Pac-Man plan, ghost personalities, pen release)
///      c. State timer (READY banner, ghost-eaten freeze)
///      d. Motion (speed accumulators, direction choice, dot eating)
///      e. Bonus pickup
///      f. Ghost collisions
///   4. Dirty marks and sprite frame selection for the compositor
///
/// Direction changes only happen on cell-aligned frames; everything else
/// about a mover is derived from its pixel position.

use log::{debug, info};

use crate::domain::ai::{self, Board, PEN_HOME};
use crate::domain::entity::{SpriteState, Who, FIELD_W, SPEED};
use crate::domain::maze::MAP_W;
use crate::domain::tile::Tile;
use super::event::GameEvent;
use super::world::{
    GameState, Playfield, BONUS_ACTIVE_TIME, BONUS_INACTIVE_TIME, DEAD_GHOST_TIME, FPS,
    FRIGHTENED_TIME, SCATTER_CHASE, START_LEVEL,
};

const PAC: usize = 4;
/// Frames a revived ghost waits in the pen.
const REVIVE_PEN_TIME: u8 = 80;

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(pf: &mut Playfield) -> Vec<GameEvent> {
    let mut events: Vec<GameEvent> = Vec::new();

    resolve_level_advance(pf, &mut events);
    resolve_buttons(pf, &mut events);

    if !pf.paused {
        resolve_timers(pf);
        resolve_targets(pf, &mut events);
        if resolve_state_timer(pf) {
            resolve_motion(pf, &mut events);
            resolve_bonus(pf, &mut events);
            resolve_ghost_collisions(pf, &mut events);
        }
    }

    if (!pf.active_bonus && pf.demo) || pf.paused {
        pf.mark_ready_slot();
    }
    finish_frame(pf);

    events
}

// ══════════════════════════════════════════════════════════════
// Modes
// ══════════════════════════════════════════════════════════════

fn resolve_level_advance(pf: &mut Playfield, events: &mut Vec<GameEvent>) {
    if !pf.game_win {
        return;
    }
    pf.level = pf.level.checked_add(1).unwrap_or(START_LEVEL);
    pf.init();
    info!("level {} started", pf.level);
    events.push(GameEvent::LevelStarted { level: pf.level });
}

/// A starts a game from attract mode and toggles pause in a game.
/// B always drops back to attract mode.
fn resolve_buttons(pf: &mut Playfield, events: &mut Vec<GameEvent>) {
    if pf.keys.a && !pf.paused {
        pf.keys.a = false;
        if pf.demo {
            pf.demo = false;
            pf.game_over = false;
            pf.init();
            info!("game started");
            events.push(GameEvent::GameStarted);
        } else {
            pf.paused = true;
            debug!("paused");
            events.push(GameEvent::Paused);
        }
    } else if pf.keys.a && pf.paused && !pf.demo {
        pf.keys.a = false;
        pf.paused = false;
        pf.mark_ready_slot();
        debug!("resumed");
        events.push(GameEvent::Resumed);
    }

    if pf.keys.b {
        pf.keys.b = false;
        pf.demo = true;
        pf.paused = false;
        pf.game_win = false;
        pf.init();
        debug!("reset to attract mode");
        events.push(GameEvent::ResetToAttract);
    } else if !pf.inited {
        pf.demo = true;
        pf.init();
    }
}

// ══════════════════════════════════════════════════════════════
// Timers
// ══════════════════════════════════════════════════════════════

fn resolve_timers(pf: &mut Playfield) {
    // Scatter/chase waves
    if pf.sc_index < SCATTER_CHASE.len() {
        if pf.sc_timer == 0 {
            pf.sc_timer = SCATTER_CHASE[pf.sc_index] * FPS;
            pf.sc_index += 1;
        } else {
            pf.sc_timer -= 1;
        }
    }

    // Bonus cycle
    if !pf.active_bonus {
        if pf.bonus_inactive_timer == 0 {
            pf.bonus_active_timer = BONUS_ACTIVE_TIME;
            pf.active_bonus = true;
        } else {
            pf.bonus_inactive_timer -= 1;
        }
    }
    if pf.active_bonus {
        if pf.bonus_active_timer == 0 {
            pf.bonus_inactive_timer = BONUS_INACTIVE_TIME;
            pf.active_bonus = false;
        } else {
            pf.bonus_active_timer -= 1;
        }
    }

    // Frightened window
    if pf.frightened_timer > 0 {
        pf.frightened_timer -= 1;
        if pf.frightened_timer == 0 {
            for g in pf.sprites.iter_mut().take(4) {
                if g.state == SpriteState::Frightened {
                    g.state = SpriteState::Run;
                    g.dir = g.dir.opposite();
                }
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Targets
// ══════════════════════════════════════════════════════════════

fn resolve_targets(pf: &mut Playfield, events: &mut Vec<GameEvent>) {
    if pf.state == GameState::Ready {
        return;
    }

    let plan = ai::pacman_plan(pf.pacman(), &pf.sprites[..4], pf.demo, pf.active_bonus, &pf.dots);
    if let Some((x, y)) = plan.target {
        pf.sprites[PAC].target(x, y);
    }
    pf.pacman_fallback = plan.fallback;
    if plan.maze_cleared {
        level_cleared(pf, events);
    }

    let scatter = pf.scatter();
    let pacman = pf.sprites[PAC].clone();
    let binky = pf.sprites[Who::Binky.index()].clone();
    for g in pf.sprites.iter_mut().take(4) {
        if g.state == SpriteState::DeadEyes {
            if (g.cx, g.cy) == PEN_HOME {
                g.state = SpriteState::Pen;
                g.pentimer = REVIVE_PEN_TIME;
            } else {
                g.target(PEN_HOME.0, PEN_HOME.1);
            }
            continue;
        }

        if g.pentimer > 0 {
            g.pentimer -= 1;
            if g.pentimer > 0 {
                continue;
            }
            if g.state == SpriteState::Pen {
                g.state = SpriteState::Run;
            }
        }

        let (tx, ty) = ai::ghost_target(g, &pacman, &binky, scatter);
        g.target(tx, ty);
    }
}

/// Returns false while the READY banner holds everything still.
fn resolve_state_timer(pf: &mut Playfield) -> bool {
    if pf.state_timer == 0 {
        return true;
    }
    pf.state_timer -= 1;
    if pf.state_timer > 0 {
        return pf.state != GameState::Ready;
    }
    match pf.state {
        GameState::Ready => {
            pf.state = GameState::Play;
            pf.mark_ready_slot();
        }
        GameState::DeadGhost => {
            pf.state = GameState::Play;
            for g in pf.sprites.iter_mut().take(4) {
                if g.state == SpriteState::DeadNumber {
                    g.state = SpriteState::DeadEyes;
                }
            }
        }
        _ => {}
    }
    true
}

// ══════════════════════════════════════════════════════════════
// Motion
// ══════════════════════════════════════════════════════════════

fn resolve_motion(pf: &mut Playfield, events: &mut Vec<GameEvent>) {
    let frightened_window = pf.frightened_timer > 0;
    for i in 0..pf.sprites.len() {
        if pf.state == GameState::DeadGhost && pf.sprites[i].state != SpriteState::DeadEyes {
            continue;
        }

        let s = &mut pf.sprites[i];
        let add = ai::speed(s, frightened_window);
        s.speed += add;
        if s.speed < 100 {
            continue;
        }
        s.speed -= 100;

        s.lastx = s.x;
        s.lasty = s.y;
        s.phase = s.phase.wrapping_add(1);
        if s.state == SpriteState::AteDot {
            s.state = SpriteState::Run;
        }

        if s.is_aligned() {
            let board = Board::new(pf.mazes.for_level(pf.level), pf.state == GameState::Ready);
            s.dir = ai::choose_dir(&board, s, pf.demo, &pf.keys, &mut pf.pacman_fallback);
        }

        let (dx, dy) = s.dir.delta();
        s.x = (s.x + dx * SPEED).rem_euclid(FIELD_W);
        s.y += dy * SPEED;
        s.sync_cell();
        debug_assert!((0..MAP_W as i16).contains(&s.cx), "{:?} left the corridor", s.who);

        if s.who == Who::Pacman {
            let (cx, cy) = (s.cx, s.cy);
            eat_dot(pf, cx, cy, events);
        }
    }
}

fn eat_dot(pf: &mut Playfield, cx: i16, cy: i16, events: &mut Vec<GameEvent>) {
    if !pf.dots.eat(cx, cy) {
        return;
    }
    pf.dirty.mark_cell(cx, cy);
    pf.sprites[PAC].state = SpriteState::AteDot;
    let in_demo = pf.demo;

    let code = pf.map()[cy as usize * MAP_W + cx as usize];
    if Tile::from_code(code) == Tile::Pill {
        pf.frightened_timer = FRIGHTENED_TIME;
        pf.frightened_count = 0;
        for g in pf.sprites.iter_mut().take(4) {
            if g.state == SpriteState::Run {
                g.state = SpriteState::Frightened;
                g.dir = g.dir.opposite();
            }
        }
        pf.add_score(50, events);
        events.push(GameEvent::PillEaten { cx, cy, in_demo });
    } else {
        pf.add_score(10, events);
        events.push(GameEvent::DotEaten { cx, cy, in_demo });
    }

    if pf.dots.remaining() == 0 {
        level_cleared(pf, events);
    }
}

fn level_cleared(pf: &mut Playfield, events: &mut Vec<GameEvent>) {
    if pf.game_win {
        return;
    }
    pf.game_win = true;
    pf.state = GameState::EndLevel;
    info!("level {} cleared, score {}", pf.level, pf.score);
    events.push(GameEvent::LevelCleared { level: pf.level });
}

// ══════════════════════════════════════════════════════════════
// Collisions
// ══════════════════════════════════════════════════════════════

fn resolve_bonus(pf: &mut Playfield, events: &mut Vec<GameEvent>) {
    let pac = &pf.sprites[PAC];
    if pf.active_bonus && pf.bonus.cx == pac.cx && pf.bonus.cy == pac.cy {
        pf.collect_bonus(events);
    }
}

/// Sprites overlap when both pixel axes are within one move.
fn resolve_ghost_collisions(pf: &mut Playfield, events: &mut Vec<GameEvent>) {
    for who in Who::GHOSTS {
        let i = who.index();
        let (px, py) = (pf.sprites[PAC].x, pf.sprites[PAC].y);
        let g = &mut pf.sprites[i];
        if (g.x - px).abs() > SPEED || (g.y - py).abs() > SPEED {
            continue;
        }

        let state = g.state;
        match state {
            SpriteState::Frightened => {
                g.state = SpriteState::DeadNumber;
                let who = g.who;
                pf.frightened_count += 1;
                pf.state = GameState::DeadGhost;
                pf.state_timer = DEAD_GHOST_TIME;
                let points = (1u32 << pf.frightened_count) * 100;
                pf.add_score(points, events);
                events.push(GameEvent::GhostEaten { who, points, in_demo: pf.demo });
            }
            SpriteState::DeadNumber | SpriteState::DeadEyes => {}
            _ => {
                let in_demo = pf.demo;
                pf.state = GameState::DeadPlayer;
                pf.sprites[PAC].state = SpriteState::DeadPacman;
                debug!("pacman caught by {:?} with {} lives left", pf.sprites[i].who, pf.lives);
                let game_over = pf.packman_died();
                events.push(GameEvent::PacmanDied { in_demo, game_over });
                return;
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Frame finish
// ══════════════════════════════════════════════════════════════

fn finish_frame(pf: &mut Playfield) {
    for s in pf.sprites.iter().chain(std::iter::once(&pf.bonus)) {
        pf.dirty.mark_sprite(s.lastx, s.lasty);
        pf.dirty.mark_sprite(s.x, s.y);
    }
    let dead_ghost = pf.frightened_count.saturating_sub(1);
    for s in pf.sprites.iter_mut() {
        s.setup_draw(dead_ghost, pf.actual_bonus);
    }
    pf.bonus.setup_draw(dead_ghost, pf.actual_bonus);
}
