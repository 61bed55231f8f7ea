//! WebAssembly bindings for the match3 engine.
//!
//! This module exposes a single game session to JavaScript through wasm-bindgen.

use wasm_bindgen::prelude::*;

use crate::config::GameConfig;
use crate::events::GameEvent;
use crate::grid::Coord;
use crate::session::{GameError, GameSession};
use crate::strategy::{GreedyStrategy, MoveStrategy, RandomStrategy};

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn to_js(e: GameError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn events_json(events: &[GameEvent]) -> String {
    serde_json::to_string(events).unwrap_or_else(|_| "[]".to_string())
}

/// WASM-exposed game wrapper
#[wasm_bindgen]
pub struct WasmGame {
    session: GameSession,
}

#[wasm_bindgen]
impl WasmGame {
    /// Start a game on a 1-based level; pass a seed for a reproducible board
    #[wasm_bindgen(constructor)]
    pub fn new(level: usize, seed: Option<u32>) -> Result<WasmGame, JsValue> {
        let config = GameConfig::default();
        let session = match seed {
            Some(seed) => GameSession::with_seed(config, level, u64::from(seed)),
            None => GameSession::new(config, level),
        }
        .map_err(to_js)?;

        Ok(WasmGame { session })
    }

    /// Start over on the given level, returns events JSON
    #[wasm_bindgen(js_name = newGame)]
    pub fn new_game(&mut self, level: usize) -> Result<String, JsValue> {
        let events = self.session.new_game(level).map_err(to_js)?;
        Ok(events_json(&events))
    }

    /// Advance by `dt` seconds, returns events JSON
    pub fn tick(&mut self, dt: f64) -> String {
        events_json(&self.session.tick(dt))
    }

    #[wasm_bindgen(js_name = selectTile)]
    pub fn select_tile(&mut self, column: usize, row: usize) -> Result<String, JsValue> {
        let events = self
            .session
            .select_tile(Coord::new(column, row))
            .map_err(to_js)?;
        Ok(events_json(&events))
    }

    #[wasm_bindgen(js_name = clearSelection)]
    pub fn clear_selection(&mut self) {
        self.session.clear_selection();
    }

    #[wasm_bindgen(js_name = attemptSwap)]
    pub fn attempt_swap(
        &mut self,
        from_column: usize,
        from_row: usize,
        to_column: usize,
        to_row: usize,
    ) -> Result<String, JsValue> {
        let events = self
            .session
            .attempt_swap(
                Coord::new(from_column, from_row),
                Coord::new(to_column, to_row),
            )
            .map_err(to_js)?;
        Ok(events_json(&events))
    }

    /// Flip move hints, returns the new setting
    #[wasm_bindgen(js_name = toggleShowMoves)]
    pub fn toggle_show_moves(&mut self) -> bool {
        self.session.toggle_show_moves()
    }

    /// Enable a bot: "Random" or "Greedy". Anything else turns it off.
    #[wasm_bindgen(js_name = setBot)]
    pub fn set_bot(&mut self, kind: &str) {
        let bot: Option<Box<dyn MoveStrategy>> = match kind {
            "Random" => Some(Box::new(RandomStrategy::new())),
            "Greedy" => Some(Box::new(GreedyStrategy::new())),
            _ => None,
        };
        self.session.set_bot(bot);
    }

    /// Get the current session snapshot as JSON
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> String {
        self.session
            .snapshot()
            .to_json()
            .unwrap_or_else(|_| "{}".to_string())
    }

    #[wasm_bindgen(js_name = isFinished)]
    pub fn is_finished(&self) -> bool {
        self.session.is_finished()
    }

    #[wasm_bindgen(js_name = getScore)]
    pub fn get_score(&self) -> u32 {
        self.session.score()
    }
}
