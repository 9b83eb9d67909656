//! Browser-facing exports. One game lives behind a process-wide lock; every call
//! returns a fresh [`GameState`](crate::types::GameState) snapshot.

use std::sync::Mutex;

use once_cell::sync::Lazy;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::config::GameConfig;
use crate::game::GameController;

static GAME: Lazy<Mutex<Option<GameController>>> = Lazy::new(|| Mutex::new(None));

/// Starts a new game. `config` may be `undefined` for the defaults.
#[wasm_bindgen]
pub fn new_game(config: JsValue) -> Result<JsValue, JsValue> {
    let config: GameConfig = if config.is_undefined() || config.is_null() {
        GameConfig::default()
    } else {
        serde_wasm_bindgen::from_value(config)?
    };
    let game = GameController::new(config).map_err(|err| JsValue::from_str(&err))?;
    let state = game.to_game_state();

    let mut slot = GAME
        .lock()
        .map_err(|_| JsValue::from_str("game state lock is poisoned"))?;
    *slot = Some(game);
    to_js(&state)
}

/// Forwards a cell click. Returns whether a piece was selected or moved.
#[wasm_bindgen]
pub fn select_cell(row: u8, col: u8) -> Result<bool, JsValue> {
    with_game(|game| Ok(game.select(row, col)))
}

/// Plays the automated side. When the engine has no move the position is unchanged.
#[wasm_bindgen]
pub fn ai_move() -> Result<JsValue, JsValue> {
    let state = with_game(|game| {
        game.do_ai_move()?;
        Ok(game.to_game_state())
    })?;
    to_js(&state)
}

#[wasm_bindgen]
pub fn game_state() -> Result<JsValue, JsValue> {
    let state = with_game(|game| Ok(game.to_game_state()))?;
    to_js(&state)
}

#[wasm_bindgen]
pub fn reset_game() -> Result<JsValue, JsValue> {
    let state = with_game(|game| {
        game.reset();
        Ok(game.to_game_state())
    })?;
    to_js(&state)
}

fn with_game<T>(f: impl FnOnce(&mut GameController) -> Result<T, String>) -> Result<T, JsValue> {
    let mut slot = GAME
        .lock()
        .map_err(|_| JsValue::from_str("game state lock is poisoned"))?;
    let game = slot
        .as_mut()
        .ok_or_else(|| JsValue::from_str("no game in progress; call new_game first"))?;
    f(game).map_err(|err| JsValue::from_str(&err))
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(JsValue::from)
}
