pub mod config;
pub mod world;

use anyhow::Context;
use wasm_bindgen::prelude::*;

pub use config::LevelConfig;
pub use world::{Cell, Direction, TickOutcome, World};

#[wasm_bindgen(start)]
pub fn main_js() -> Result<(), JsValue> {
    #[cfg(debug_assertions)]
    console_error_panic_hook::set_once();
    wasm_log::init(wasm_log::Config::default());

    main().map_err(|e| JsError::new(&format!("{:?}", e)))?;
    Ok(())
}

pub fn main() -> Result<(), anyhow::Error> {
    log::info!("spawngrid {} loaded", env!("CARGO_PKG_VERSION"));
    Ok(())
}

fn js_error(e: anyhow::Error) -> JsError {
    JsError::new(&format!("{:?}", e))
}

fn parse_direction(direction: &str) -> Option<Direction> {
    match direction {
        "up" => Some(Direction::Up),
        "right" => Some(Direction::Right),
        "down" => Some(Direction::Down),
        "left" => Some(Direction::Left),
        _ => None,
    }
}

#[derive(serde::Serialize)]
struct ItemView<'a> {
    id: world::ItemId,
    name: &'a str,
    kind: world::ItemKind,
    rotation: Direction,
    origin: Option<Cell>,
    cells: &'a [Cell],
    cell_types: &'a [world::CellType],
}

/// A play session driven from JavaScript. The page owns the frame timer and calls `tick`.
#[wasm_bindgen]
pub struct Session(World);

impl Session {
    fn start(level: &LevelConfig, seed: u64) -> anyhow::Result<Session> {
        Ok(Session(World::new(level, seed).context("failed to start level")?))
    }

    pub fn world(&self) -> &World {
        &self.0
    }
}

#[wasm_bindgen]
impl Session {
    #[wasm_bindgen(constructor)]
    pub fn new(level: JsValue, seed: u64) -> Result<Session, JsError> {
        let level: LevelConfig = serde_wasm_bindgen::from_value(level)
            .map_err(|e| anyhow::anyhow!("{:?}", e))
            .context("malformed level object")
            .map_err(js_error)?;
        Self::start(&level, seed).map_err(js_error)
    }

    #[wasm_bindgen(js_name = fromYaml)]
    pub fn from_yaml(content: &str, seed: u64) -> Result<Session, JsError> {
        let level = LevelConfig::from_yaml(content)
            .context("malformed level document")
            .map_err(js_error)?;
        Self::start(&level, seed).map_err(js_error)
    }

    /// Queues a turn: `"up"`, `"right"`, `"down"` or `"left"`.
    pub fn steer(&mut self, direction: &str) -> bool {
        match parse_direction(direction) {
            Some(direction) => self.0.steer(direction),
            None => {
                log::warn!("ignoring unknown direction {:?}", direction);
                false
            }
        }
    }

    pub fn tick(&mut self) -> Result<JsValue, JsValue> {
        let outcome = self.0.tick().context("tick failed").map_err(js_error)?;
        Ok(serde_wasm_bindgen::to_value(&outcome)?)
    }

    #[wasm_bindgen(js_name = spawnRandom)]
    pub fn spawn_random(&mut self) -> Result<Option<u32>, JsError> {
        let id = self.0.spawn_random().context("spawn failed").map_err(js_error)?;
        Ok(id.map(|id| id.0))
    }

    #[wasm_bindgen(js_name = itemAt)]
    pub fn item_at(&self, x: i32, y: i32) -> Option<u32> {
        self.0.item_at(Cell::new(x, y)).map(|item| item.id().0)
    }

    #[wasm_bindgen(js_name = borderContains)]
    pub fn border_contains(&self, x: i32, y: i32) -> bool {
        self.0.border_contains(Cell::new(x, y))
    }

    #[wasm_bindgen(js_name = toWorld)]
    pub fn to_world(&self, x: i32, y: i32) -> Box<[f32]> {
        let (wx, wy) = self.0.to_world(Cell::new(x, y));
        Box::new([wx, wy])
    }

    #[wasm_bindgen(js_name = snakeCells)]
    pub fn snake_cells(&self) -> Result<JsValue, JsValue> {
        let cells = self.0.snake().cells().collect::<Vec<_>>();
        Ok(serde_wasm_bindgen::to_value(&cells)?)
    }

    pub fn items(&self) -> Result<JsValue, JsValue> {
        let items = self
            .0
            .items()
            .map(|item| ItemView {
                id: item.id(),
                name: item.definition().name(),
                kind: item.definition().kind(),
                rotation: item.view().rotation(),
                origin: item.origin(),
                cells: item.item_cells(),
                cell_types: item.cell_types(),
            })
            .collect::<Vec<_>>();
        Ok(serde_wasm_bindgen::to_value(&items)?)
    }

    pub fn score(&self) -> u64 {
        self.0.score()
    }

    #[wasm_bindgen(js_name = isOver)]
    pub fn is_over(&self) -> bool {
        self.0.is_over()
    }
}
