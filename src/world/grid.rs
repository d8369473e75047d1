use rand::Rng;

/// A cell is a unit grid coordinate. `(0, 0)` is the bottom-left cell and y grows upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Cell { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Cell::new(self.x + dx, self.y + dy)
    }
}

impl From<(i32, i32)> for Cell {
    fn from((x, y): (i32, i32)) -> Self {
        Cell::new(x, y)
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A fixed-size 2D playfield.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    width: usize,
    height: usize,
    cell_size: f32,
    origin: (f32, f32),
}

impl Grid {
    pub fn new(width: usize, height: usize, cell_size: f32, origin: (f32, f32)) -> Self {
        assert!(width > 0 && height > 0, "grid must not be empty: {}x{}", width, height);
        assert!(cell_size > 0.0, "cell size must be positive: {}", cell_size);
        Grid {
            width,
            height,
            cell_size,
            origin,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dim(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// World position of the cell's minimum corner.
    pub fn to_world(&self, cell: Cell) -> (f32, f32) {
        (
            self.origin.0 + cell.x as f32 * self.cell_size,
            self.origin.1 + cell.y as f32 * self.cell_size,
        )
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as usize) < self.width && (cell.y as usize) < self.height
    }

    /// Converts an in-bounds cell into an `[[x, y]]` array index.
    pub fn index(&self, cell: Cell) -> Option<[usize; 2]> {
        if self.in_bounds(cell) {
            Some([cell.x as usize, cell.y as usize])
        } else {
            None
        }
    }

    /// Every cell, row by row from the bottom.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.height as i32).flat_map(move |y| (0..self.width as i32).map(move |x| Cell::new(x, y)))
    }

    /// Whether a block of the given size can be spawned at all.
    pub fn fits(&self, block_width: usize, block_height: usize, allow_border: bool) -> bool {
        let margin = if allow_border { 0 } else { 2 };
        block_width > 0
            && block_height > 0
            && block_width + margin <= self.width
            && block_height + margin <= self.height
    }

    /// Samples the minimum corner of a `block_width` x `block_height` block that lies inside the grid.
    ///
    /// When `allow_border` is false the block also keeps clear of the outermost ring of cells.
    pub fn random_spawn_cell<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        block_width: usize,
        block_height: usize,
        allow_border: bool,
    ) -> Cell {
        assert!(
            self.fits(block_width, block_height, allow_border),
            "block {}x{} does not fit in {}x{} grid (allow_border = {})",
            block_width,
            block_height,
            self.width,
            self.height,
            allow_border
        );

        let (lo, pad) = if allow_border { (0, 0) } else { (1, 1) };
        let max_x = (self.width - block_width - pad) as i32;
        let max_y = (self.height - block_height - pad) as i32;
        Cell::new(rng.random_range(lo..=max_x), rng.random_range(lo..=max_y))
    }
}
