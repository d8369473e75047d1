//! Level descriptions.
//!
//! A level is read once at session start, either from YAML or from a JS object handed over the wasm boundary.

use crate::world::{Direction, ItemKind};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read level: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("grid must be at least 1x1, got {width}x{height}")]
    EmptyGrid { width: usize, height: usize },

    #[error("cell size must be positive, got {0}")]
    CellSize(f32),

    #[error("item {name:?} must be at least 1x1, got {width}x{height}")]
    EmptyItem {
        name: String,
        width: usize,
        height: usize,
    },

    #[error("item {name:?} ({width}x{height}) does not fit in the grid in any rotation")]
    ItemTooLarge {
        name: String,
        width: usize,
        height: usize,
    },

    #[error("placement {index} refers to item {item}, but only {count} items are defined")]
    UnknownItem {
        index: usize,
        item: usize,
        count: usize,
    },

    #[error("snake must be at least 1 cell long")]
    EmptySnake,

    #[error("snake starting at {start:?} with length {length} leaves the grid")]
    SnakeOutOfBounds { start: (i32, i32), length: usize },
}

/// Marks the side of an occupied cell (local, y up) that the snake may pass through.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct EntrySpec {
    pub x: usize,
    pub y: usize,
    pub side: Direction,
}

/// An item as it appears in level content.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct ItemSpec {
    pub name: String,

    #[serde(default)]
    pub kind: ItemKind,

    pub width: usize,
    pub height: usize,

    /// Rows of whitespace-separated `#` (occupied) and `_` (empty) tokens, top row first.
    pub structure: String,

    #[serde(default)]
    pub entries: Vec<EntrySpec>,

    /// Score awarded when eaten.
    #[serde(default = "default_value")]
    pub value: u32,

    /// Segments the snake grows by when eaten.
    #[serde(default = "default_growth")]
    pub growth: usize,
}

fn default_value() -> u32 {
    1
}

fn default_growth() -> usize {
    1
}

/// An item placed by the level author rather than by random spawning.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct PlacementSpec {
    /// Index into the level's items.
    pub item: usize,

    #[serde(default = "default_rotation")]
    pub rotation: Direction,

    /// Bounding box minimum.
    pub at: (i32, i32),
}

fn default_rotation() -> Direction {
    Direction::Up
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct GridConfig {
    pub width: usize,
    pub height: usize,

    #[serde(default = "default_cell_size")]
    pub cell_size: f32,

    /// World position of the bottom-left corner.
    #[serde(default)]
    pub origin: (f32, f32),
}

fn default_cell_size() -> f32 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Random origins sampled per spawn.
    pub max_tries: usize,

    /// Whether items may touch the outermost ring of cells.
    pub allow_border: bool,

    /// Keep new items out of the padded border region of existing ones.
    pub respect_borders: bool,

    /// Scan every origin when random sampling comes up empty.
    pub exhaustive_fallback: bool,

    /// Items spawned when the level starts.
    pub initial_items: usize,

    /// Item count each tick tops up to.
    pub target_items: usize,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        SpawnConfig {
            max_tries: 20,
            allow_border: true,
            respect_borders: true,
            exhaustive_fallback: false,
            initial_items: 3,
            target_items: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct SnakeConfig {
    /// Head cell. Defaults to the middle of the grid.
    pub start: Option<(i32, i32)>,
    pub heading: Direction,
    pub length: usize,
}

impl Default for SnakeConfig {
    fn default() -> Self {
        SnakeConfig {
            start: None,
            heading: Direction::Right,
            length: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct LevelConfig {
    pub grid: GridConfig,

    #[serde(default)]
    pub spawn: SpawnConfig,

    #[serde(default)]
    pub snake: SnakeConfig,

    #[serde(default)]
    pub items: Vec<ItemSpec>,

    #[serde(default)]
    pub placements: Vec<PlacementSpec>,
}

impl LevelConfig {
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: LevelConfig = serde_yaml_ng::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn snake_start(&self) -> (i32, i32) {
        self.snake
            .start
            .unwrap_or(((self.grid.width / 2) as i32, (self.grid.height / 2) as i32))
    }

    /// Snake cells, head first, trailing away from the heading.
    /// Fails at the first cell that leaves the grid.
    pub fn snake_body(&self) -> Result<Vec<(i32, i32)>, ConfigError> {
        let out_of_bounds = || ConfigError::SnakeOutOfBounds {
            start: self.snake_start(),
            length: self.snake.length,
        };
        let in_bounds = |(x, y): (i32, i32)| {
            x >= 0 && y >= 0 && (x as usize) < self.grid.width && (y as usize) < self.grid.height
        };
        if self.snake.length > self.grid.width.max(self.grid.height) {
            return Err(out_of_bounds());
        }

        let (dx, dy) = self.snake.heading.opposite().delta();
        let mut body = Vec::with_capacity(self.snake.length);
        let mut cell = self.snake_start();
        for i in 0..self.snake.length {
            if i > 0 {
                cell = match (cell.0.checked_add(dx), cell.1.checked_add(dy)) {
                    (Some(x), Some(y)) => (x, y),
                    _ => return Err(out_of_bounds()),
                };
            }
            if !in_bounds(cell) {
                return Err(out_of_bounds());
            }
            body.push(cell);
        }
        Ok(body)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let GridConfig {
            width,
            height,
            cell_size,
            ..
        } = self.grid;
        if width == 0 || height == 0 {
            return Err(ConfigError::EmptyGrid { width, height });
        }
        if cell_size.is_nan() || cell_size <= 0.0 {
            return Err(ConfigError::CellSize(cell_size));
        }

        let margin = if self.spawn.allow_border { 0 } else { 2 };
        for item in self.items.iter() {
            if item.width == 0 || item.height == 0 {
                return Err(ConfigError::EmptyItem {
                    name: item.name.clone(),
                    width: item.width,
                    height: item.height,
                });
            }

            let fits = |w: usize, h: usize| w + margin <= width && h + margin <= height;
            if !fits(item.width, item.height) && !fits(item.height, item.width) {
                return Err(ConfigError::ItemTooLarge {
                    name: item.name.clone(),
                    width: item.width,
                    height: item.height,
                });
            }
        }

        for (index, placement) in self.placements.iter().enumerate() {
            if placement.item >= self.items.len() {
                return Err(ConfigError::UnknownItem {
                    index,
                    item: placement.item,
                    count: self.items.len(),
                });
            }
        }

        if self.snake.length == 0 {
            return Err(ConfigError::EmptySnake);
        }
        self.snake_body()?;

        Ok(())
    }
}
