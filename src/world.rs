mod footprint;
mod grid;
mod item;
mod occupancy;
mod placement;
mod snake;

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};

pub use footprint::{compute_border_cells, compute_item_cells, ItemId, PlacedItem};
pub use grid::{Cell, Grid};
pub use item::{
    parse_structure, rotate_structure, CellType, Direction, ItemCatalog, ItemDefinition, ItemKind,
    ParsedStructure, RotatedItem, Rotation, StructureIssue,
};
pub use occupancy::{OccupancyError, OccupancyMap, Owner};
pub use placement::{try_place, PlaceError};
pub use snake::{Snake, MAX_QUEUED_TURNS};

use crate::config::{ConfigError, LevelConfig, SpawnConfig};

#[derive(thiserror::Error, Debug)]
pub enum WorldError {
    #[error("invalid level: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Place(#[from] PlaceError),

    /// The occupancy map disagreed with the world's own bookkeeping.
    #[error("occupancy invariant broken: {0}")]
    Occupancy(#[from] OccupancyError),

    #[error("no item definition at index {0}")]
    UnknownItem(usize),
}

/// Why the snake stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collision {
    Wall,
    SelfBite,
    Obstacle(ItemId),
    /// Hit a collectible anywhere other than through one of its entry sides.
    WrongEntry(ItemId),
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TickOutcome {
    Moved {
        head: Cell,
        vacated: Option<Cell>,
        spawned: Vec<ItemId>,
    },
    Ate {
        head: Cell,
        item: ItemId,
        value: u32,
        spawned: Vec<ItemId>,
    },
    Collided {
        collision: Collision,
        at: Cell,
    },
    GameOver,
}

/// One play session: the grid, everything on it and the rules for spawning more.
pub struct World {
    grid: Grid,
    catalog: ItemCatalog,
    occupancy: OccupancyMap,
    items: BTreeMap<ItemId, PlacedItem>,
    snake: Snake,
    rules: SpawnConfig,
    rng: rand::rngs::StdRng,
    next_id: u32,
    score: u64,
    collision: Option<Collision>,
}

impl World {
    pub fn new(config: &LevelConfig, seed: u64) -> Result<Self, WorldError> {
        config.validate()?;

        let grid = Grid::new(
            config.grid.width,
            config.grid.height,
            config.grid.cell_size,
            config.grid.origin,
        );

        let (catalog, issues) = ItemCatalog::new(&config.items);
        if !issues.is_empty() {
            log::warn!("{} problems in item layouts, affected cells read as empty", issues.len());
        }

        let body = config.snake_body()?.into_iter().map(Cell::from).collect::<Vec<_>>();
        let mut occupancy = OccupancyMap::new(grid.dim());
        occupancy.claim(Owner::Snake, &body)?;

        let mut world = World {
            grid,
            catalog,
            occupancy,
            items: BTreeMap::new(),
            snake: Snake::new(body, config.snake.heading),
            rules: config.spawn,
            rng: rand::rngs::StdRng::seed_from_u64(seed),
            next_id: 0,
            score: 0,
            collision: None,
        };

        for placement in config.placements.iter() {
            world.place_item_at(placement.item, placement.rotation, Cell::from(placement.at))?;
        }
        for _ in 0..config.spawn.initial_items {
            world.spawn_random()?;
        }

        log::info!(
            "level ready: {}x{} grid, {} item kinds, {} items placed, seed {}",
            world.grid.width(),
            world.grid.height(),
            world.catalog.len(),
            world.items.len(),
            seed
        );
        Ok(world)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    pub fn occupancy(&self) -> &OccupancyMap {
        &self.occupancy
    }

    pub fn snake(&self) -> &Snake {
        &self.snake
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn collision(&self) -> Option<Collision> {
        self.collision
    }

    pub fn is_over(&self) -> bool {
        self.collision.is_some()
    }

    pub fn to_world(&self, cell: Cell) -> (f32, f32) {
        self.grid.to_world(cell)
    }

    pub fn item(&self, id: ItemId) -> Option<&PlacedItem> {
        self.items.get(&id)
    }

    pub fn items(&self) -> impl Iterator<Item = &PlacedItem> + '_ {
        self.items.values()
    }

    /// The item whose structure covers `cell`.
    pub fn item_at(&self, cell: Cell) -> Option<&PlacedItem> {
        match self.occupancy.owner(cell)? {
            Owner::Item(id) => self.items.get(&id),
            Owner::Snake => None,
        }
    }

    /// Whether `cell` lies in the spawn-exclusion border of any item.
    pub fn border_contains(&self, cell: Cell) -> bool {
        self.items.values().any(|item| item.contains_border_cell(cell))
    }

    fn allocate_id(&mut self) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id += 1;
        id
    }

    fn register(&mut self, view: std::rc::Rc<RotatedItem>, origin: Cell) -> Result<ItemId, WorldError> {
        let id = self.allocate_id();
        let mut item = PlacedItem::floating(id, view);
        item.attach(origin);
        self.occupancy.claim(Owner::Item(id), item.item_cells())?;
        log::debug!(
            "item {} {:?} ({:?}) at {}",
            id,
            item.definition().name(),
            item.view().rotation(),
            origin
        );
        self.items.insert(id, item);
        Ok(id)
    }

    /// Places an item at a fixed origin. Fails if any of its cells is off the grid or taken.
    pub fn place_item_at(
        &mut self,
        index: usize,
        rotation: Rotation,
        origin: Cell,
    ) -> Result<ItemId, WorldError> {
        let view = self
            .catalog
            .view(index, rotation)
            .ok_or(WorldError::UnknownItem(index))?
            .clone();
        self.register(view, origin)
    }

    /// Places an item somewhere random. `Ok(None)` means there was no room this time.
    pub fn spawn_item(&mut self, index: usize, rotation: Rotation) -> Result<Option<ItemId>, WorldError> {
        let view = self
            .catalog
            .view(index, rotation)
            .ok_or(WorldError::UnknownItem(index))?
            .clone();

        let placed = self.items.values().collect::<Vec<_>>();
        let origin = placement::try_place(
            &mut self.rng,
            &self.grid,
            &self.occupancy,
            &placed,
            &view,
            &self.rules,
        )?;

        match origin {
            Some(origin) => Ok(Some(self.register(view, origin)?)),
            None => Ok(None),
        }
    }

    /// Spawns a random item kind in a random rotation that fits the grid.
    pub fn spawn_random(&mut self) -> Result<Option<ItemId>, WorldError> {
        if self.catalog.is_empty() {
            return Ok(None);
        }

        let index = self.rng.random_range(0..self.catalog.len());
        let rotations = Direction::ALL
            .into_iter()
            .filter(|&rotation| {
                self.catalog.view(index, rotation).is_some_and(|view| {
                    self.grid.fits(view.width(), view.height(), self.rules.allow_border)
                })
            })
            .collect::<Vec<_>>();
        if rotations.is_empty() {
            return Ok(None);
        }

        let rotation = rotations[self.rng.random_range(0..rotations.len())];
        self.spawn_item(index, rotation)
    }

    /// Takes an item off the grid, freeing its cells.
    pub fn remove_item(&mut self, id: ItemId) -> Option<PlacedItem> {
        let item = self.items.remove(&id)?;
        let freed = self.occupancy.release(Owner::Item(id));
        debug_assert_eq!(freed.len(), item.item_cells().len());
        Some(item)
    }

    /// Queues a turn for the snake. Ignored once the session is over.
    pub fn steer(&mut self, direction: Direction) -> bool {
        !self.is_over() && self.snake.steer(direction)
    }

    fn collide(&mut self, collision: Collision, at: Cell) -> TickOutcome {
        log::info!("snake stopped at {}: {:?} (score {})", at, collision, self.score);
        self.collision = Some(collision);
        TickOutcome::Collided { collision, at }
    }

    /// Moves the snake one cell, then tops items back up.
    pub fn tick(&mut self) -> Result<TickOutcome, WorldError> {
        if self.is_over() {
            return Ok(TickOutcome::GameOver);
        }

        let heading = self.snake.next_heading();
        let target = self.snake.next_head();
        if !self.grid.in_bounds(target) {
            return Ok(self.collide(Collision::Wall, target));
        }

        let mut eaten = None;
        match self.occupancy.owner(target) {
            None => {}
            Some(Owner::Snake) => {
                if self.snake.vacating_tail() != Some(target) {
                    return Ok(self.collide(Collision::SelfBite, target));
                }
            }
            Some(Owner::Item(id)) => {
                let Some(item) = self.items.get(&id) else {
                    return Err(OccupancyError::NotOwned {
                        cell: target,
                        owner: Owner::Item(id),
                    }
                    .into());
                };

                if item.definition().kind() != ItemKind::Collectible {
                    return Ok(self.collide(Collision::Obstacle(id), target));
                }

                // The snake enters through the side facing away from its heading.
                let admitted = match item.contains_structural_cell(target) {
                    Some(cell_type) if item.view().has_entries() => {
                        cell_type.entry_side() == Some(heading.opposite())
                    }
                    Some(_) => true,
                    None => false,
                };
                if !admitted {
                    return Ok(self.collide(Collision::WrongEntry(id), target));
                }
                eaten = Some(id);
            }
        }

        let mut ate = None;
        if let Some(id) = eaten {
            if let Some(item) = self.remove_item(id) {
                let definition = item.definition();
                self.score += u64::from(definition.value());
                self.snake.grow(definition.growth());
                log::debug!("ate {} {:?}, score {}", id, definition.name(), self.score);
                ate = Some((id, definition.value()));
            }
        }

        let (head, vacated) = self.snake.advance();
        if let Some(tail) = vacated {
            self.occupancy.release_cell(Owner::Snake, tail)?;
        }
        self.occupancy.claim_cell(Owner::Snake, head)?;

        let spawned = self.refill()?;
        Ok(match ate {
            Some((item, value)) => TickOutcome::Ate {
                head,
                item,
                value,
                spawned,
            },
            None => TickOutcome::Moved {
                head,
                vacated,
                spawned,
            },
        })
    }

    fn refill(&mut self) -> Result<Vec<ItemId>, WorldError> {
        let mut spawned = vec![];
        while self.items.len() < self.rules.target_items {
            match self.spawn_random()? {
                Some(id) => spawned.push(id),
                None => break,
            }
        }
        Ok(spawned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEVEL: &str = r##"
grid: { width: 10, height: 10 }
spawn: { initial_items: 0, target_items: 0 }
snake: { start: [5, 5], heading: right, length: 3 }
items:
  - { name: apple, kind: collectible, width: 1, height: 1, structure: "#", value: 2 }
  - { name: rock, kind: obstacle, width: 2, height: 1, structure: "# #" }
  - name: gate
    kind: collectible
    width: 1
    height: 1
    structure: "#"
    value: 10
    growth: 3
    entries: [{ x: 0, y: 0, side: up }]
"##;

    const APPLE: usize = 0;
    const ROCK: usize = 1;
    const GATE: usize = 2;

    fn level() -> LevelConfig {
        LevelConfig::from_yaml(LEVEL).unwrap()
    }

    fn world() -> World {
        World::new(&level(), 1).unwrap()
    }

    fn assert_consistent(world: &World) {
        let snake = world.snake().cells().collect::<Vec<_>>();
        let mut unique = snake.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), snake.len(), "snake overlaps itself");

        for cell in world.grid().cells() {
            match world.occupancy().owner(cell) {
                None => {
                    assert!(!snake.contains(&cell));
                    assert!(world.items().all(|item| item.contains_structural_cell(cell).is_none()));
                }
                Some(Owner::Snake) => {
                    assert!(snake.contains(&cell));
                    assert!(world.item_at(cell).is_none());
                }
                Some(Owner::Item(id)) => {
                    assert!(!snake.contains(&cell));
                    let item = world.item(id).unwrap();
                    assert!(item.contains_structural_cell(cell).is_some());
                    assert_eq!(world.item_at(cell).map(|i| i.id()), Some(id));
                }
            }
        }

        let item_cells = world.items().map(|item| item.item_cells().len()).sum::<usize>();
        assert_eq!(world.occupancy().occupied_count(), snake.len() + item_cells);
    }

    #[test]
    fn test_new_registers_snake() {
        let world = world();
        assert_eq!(
            world.occupancy().cells_of(Owner::Snake),
            &[Cell::new(5, 5), Cell::new(4, 5), Cell::new(3, 5)]
        );
        assert_eq!(world.items().count(), 0);
        assert_eq!(world.catalog().len(), 3);
        assert_consistent(&world);
    }

    #[test]
    fn test_tick_moves_snake() {
        let mut world = world();
        assert_eq!(
            world.tick().unwrap(),
            TickOutcome::Moved {
                head: Cell::new(6, 5),
                vacated: Some(Cell::new(3, 5)),
                spawned: vec![],
            }
        );
        assert_eq!(world.occupancy().owner(Cell::new(6, 5)), Some(Owner::Snake));
        assert!(world.occupancy().is_free(Cell::new(3, 5)));
        assert_consistent(&world);
    }

    #[test]
    fn test_eat_apple() {
        let mut world = world();
        let apple = world.place_item_at(APPLE, Direction::Up, Cell::new(6, 5)).unwrap();
        assert_eq!(world.item_at(Cell::new(6, 5)).map(|i| i.id()), Some(apple));

        assert_eq!(
            world.tick().unwrap(),
            TickOutcome::Ate {
                head: Cell::new(6, 5),
                item: apple,
                value: 2,
                spawned: vec![],
            }
        );
        assert_eq!(world.score(), 2);
        assert!(world.item(apple).is_none());
        assert_eq!(world.snake().len(), 4);
        assert_eq!(world.occupancy().owner(Cell::new(3, 5)), Some(Owner::Snake));
        assert_consistent(&world);
    }

    #[test]
    fn test_obstacle_ends_session() {
        let mut world = world();
        let rock = world.place_item_at(ROCK, Direction::Right, Cell::new(6, 4)).unwrap();

        assert_eq!(
            world.tick().unwrap(),
            TickOutcome::Collided {
                collision: Collision::Obstacle(rock),
                at: Cell::new(6, 5),
            }
        );
        assert!(world.is_over());
        assert!(!world.steer(Direction::Up));
        assert_eq!(world.tick().unwrap(), TickOutcome::GameOver);
        assert_eq!(world.snake().head(), Cell::new(5, 5));
        assert_consistent(&world);
    }

    #[test]
    fn test_wall() {
        let mut level = level();
        level.snake.start = Some((9, 5));
        let mut world = World::new(&level, 1).unwrap();
        assert_eq!(
            world.tick().unwrap(),
            TickOutcome::Collided {
                collision: Collision::Wall,
                at: Cell::new(10, 5),
            }
        );
        assert_eq!(world.collision(), Some(Collision::Wall));
    }

    #[test]
    fn test_gate_wrong_side() {
        let mut world = world();
        let gate = world.place_item_at(GATE, Direction::Up, Cell::new(6, 5)).unwrap();
        assert_matches::assert_matches!(
            world.tick().unwrap(),
            TickOutcome::Collided {
                collision: Collision::WrongEntry(id),
                ..
            } if id == gate
        );
        assert!(world.item(gate).is_some());
    }

    #[test]
    fn test_gate_entry_side() {
        let mut world = world();
        // Rotated left, the up entry faces left, towards the approaching snake.
        let gate = world.place_item_at(GATE, Direction::Left, Cell::new(6, 5)).unwrap();
        assert_matches::assert_matches!(
            world.tick().unwrap(),
            TickOutcome::Ate { item, value: 10, .. } if item == gate
        );
        assert_eq!(world.snake().pending_growth(), 2);
        assert_consistent(&world);
    }

    #[test]
    fn test_gate_from_above() {
        let mut world = world();
        let gate = world.place_item_at(GATE, Direction::Up, Cell::new(6, 4)).unwrap();
        assert!(world.steer(Direction::Up));
        world.tick().unwrap();
        assert!(world.steer(Direction::Right));
        world.tick().unwrap();
        assert!(world.steer(Direction::Down));
        world.tick().unwrap();
        assert_eq!(world.snake().head(), Cell::new(6, 5));
        assert_matches::assert_matches!(
            world.tick().unwrap(),
            TickOutcome::Ate { item, .. } if item == gate
        );
    }

    #[test]
    fn test_self_bite() {
        let mut level = level();
        level.snake.length = 5;
        let mut world = World::new(&level, 1).unwrap();
        assert!(world.steer(Direction::Up));
        assert!(world.steer(Direction::Left));
        assert!(world.steer(Direction::Down));
        world.tick().unwrap();
        world.tick().unwrap();
        assert_eq!(
            world.tick().unwrap(),
            TickOutcome::Collided {
                collision: Collision::SelfBite,
                at: Cell::new(4, 5),
            }
        );
    }

    #[test]
    fn test_tail_chase() {
        let mut level = level();
        level.snake.length = 4;
        let mut world = World::new(&level, 1).unwrap();
        assert!(world.steer(Direction::Up));
        assert!(world.steer(Direction::Left));
        assert!(world.steer(Direction::Down));
        world.tick().unwrap();
        world.tick().unwrap();
        assert_eq!(
            world.tick().unwrap(),
            TickOutcome::Moved {
                head: Cell::new(4, 5),
                vacated: Some(Cell::new(4, 5)),
                spawned: vec![],
            }
        );
        assert_consistent(&world);
    }

    #[test]
    fn test_remove_item() {
        let mut world = world();
        let rock = world.place_item_at(ROCK, Direction::Up, Cell::new(1, 1)).unwrap();
        assert!(world.border_contains(Cell::new(0, 0)));
        assert!(world.border_contains(Cell::new(3, 2)));
        assert!(!world.border_contains(Cell::new(4, 2)));

        let removed = world.remove_item(rock).unwrap();
        assert_eq!(removed.item_cells(), &[Cell::new(1, 1), Cell::new(2, 1)]);
        assert!(world.occupancy().is_free(Cell::new(1, 1)));
        assert!(world.item_at(Cell::new(2, 1)).is_none());
        assert!(!world.border_contains(Cell::new(0, 0)));
        assert!(world.remove_item(rock).is_none());

        world.place_item_at(ROCK, Direction::Up, Cell::new(1, 1)).unwrap();
        assert_consistent(&world);
    }

    #[test]
    fn test_place_item_on_snake() {
        let mut world = world();
        assert_matches::assert_matches!(
            world.place_item_at(APPLE, Direction::Up, Cell::new(4, 5)),
            Err(WorldError::Occupancy(OccupancyError::Clobbered {
                current: Owner::Snake,
                ..
            }))
        );
        assert_eq!(world.items().count(), 0);
        assert_consistent(&world);
    }

    #[test]
    fn test_unknown_item() {
        let mut world = world();
        assert_matches::assert_matches!(
            world.spawn_item(7, Direction::Up),
            Err(WorldError::UnknownItem(7))
        );
    }

    #[test]
    fn test_tick_refills_items() {
        let mut level = level();
        level.spawn.target_items = 4;
        level.spawn.exhaustive_fallback = true;
        let mut world = World::new(&level, 3).unwrap();
        assert_eq!(world.items().count(), 0);

        assert_matches::assert_matches!(
            world.tick().unwrap(),
            TickOutcome::Moved { spawned, .. } if spawned.len() == 4
        );
        assert_eq!(world.items().count(), 4);
        assert_consistent(&world);
    }

    #[test]
    fn test_same_seed_same_level() {
        let mut level = level();
        level.spawn.initial_items = 5;
        level.spawn.exhaustive_fallback = true;

        let origins = |seed| {
            World::new(&level, seed)
                .unwrap()
                .items()
                .map(|item| (item.definition().name().to_string(), item.origin()))
                .collect::<Vec<_>>()
        };
        assert_eq!(origins(11), origins(11));
        assert_eq!(origins(11).len(), 5);
    }

    #[test]
    fn test_invariants_hold_over_play() {
        let mut level = level();
        level.spawn.initial_items = 4;
        level.spawn.target_items = 6;
        level.spawn.exhaustive_fallback = true;

        let turns = [Direction::Up, Direction::Left, Direction::Down, Direction::Right];
        let mut seed = 0;
        let mut world = World::new(&level, seed).unwrap();
        for i in 0..400 {
            if i % 3 == 0 {
                world.steer(turns[(i / 3) % turns.len()]);
            }
            if world.tick().unwrap() == TickOutcome::GameOver {
                seed += 1;
                world = World::new(&level, seed).unwrap();
            }
            assert_consistent(&world);

            let items = world.items().collect::<Vec<_>>();
            for (j, a) in items.iter().enumerate() {
                for b in items.iter().skip(j + 1) {
                    assert!(a.item_cells().iter().all(|c| b.contains_structural_cell(*c).is_none()));
                }
            }
        }
    }
}
