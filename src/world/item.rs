use std::rc::Rc;

use crate::config::ItemSpec;

/// One of the four grid directions.
///
/// Also used as a rotation: the number of clockwise quarter turns away from `Up`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

/// A rotation is expressed as the direction an item's original top now faces.
pub type Rotation = Direction;

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Right, Direction::Down, Direction::Left];

    pub fn step(self) -> usize {
        self as usize
    }

    pub fn from_step(step: usize) -> Self {
        Self::ALL[step % 4]
    }

    /// Applies `rotation` on top of this direction.
    pub fn rotated(self, rotation: Rotation) -> Self {
        Self::from_step(self.step() + rotation.step())
    }

    /// The rotation that undoes this one.
    pub fn inverse(self) -> Self {
        Self::from_step(4 - self.step())
    }

    pub fn opposite(self) -> Self {
        Self::from_step(self.step() + 2)
    }

    /// Unit offset in grid space (y up).
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, 1),
            Direction::Right => (1, 0),
            Direction::Down => (0, -1),
            Direction::Left => (-1, 0),
        }
    }
}

/// What a cell of an item's structure holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize)]
pub enum CellType {
    #[default]
    Empty,
    Occupy,
    UpEntry,
    RightEntry,
    DownEntry,
    LeftEntry,
}

impl CellType {
    pub fn entry(side: Direction) -> Self {
        match side {
            Direction::Up => CellType::UpEntry,
            Direction::Right => CellType::RightEntry,
            Direction::Down => CellType::DownEntry,
            Direction::Left => CellType::LeftEntry,
        }
    }

    /// The side of the cell the snake may pass through, for entry cells.
    pub fn entry_side(self) -> Option<Direction> {
        match self {
            CellType::UpEntry => Some(Direction::Up),
            CellType::RightEntry => Some(Direction::Right),
            CellType::DownEntry => Some(Direction::Down),
            CellType::LeftEntry => Some(Direction::Left),
            CellType::Empty | CellType::Occupy => None,
        }
    }

    pub fn is_structural(self) -> bool {
        self != CellType::Empty
    }

    pub fn rotated(self, rotation: Rotation) -> Self {
        match self.entry_side() {
            Some(side) => CellType::entry(side.rotated(rotation)),
            None => self,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    #[default]
    None,
    Collectible,
    Obstacle,
}

/// A problem found while reading an item's text layout. Never fatal.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum StructureIssue {
    #[error("expected {expected} rows, found {found}")]
    RowCount { expected: usize, found: usize },

    #[error("row {row}: expected {expected} columns, found {found}")]
    ColumnCount {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("row {row}, column {column}: invalid token {token:?}")]
    InvalidToken {
        row: usize,
        column: usize,
        token: String,
    },

    #[error("entry marker at ({x}, {y}) is not on an occupied cell")]
    EntryOffStructure { x: usize, y: usize },
}

#[derive(Debug, Clone)]
pub struct ParsedStructure {
    /// Cell types indexed `[[x, y]]`, y up.
    pub structure: ndarray::Array2<CellType>,
    pub issues: Vec<StructureIssue>,
}

/// Reads a `#`/`_` layout. Row 0 of the text is the top row of the item.
/// Blank lines before the first row and after the last are dropped.
///
/// Anything that doesn't line up with `width` x `height` is reported and the missing cells stay empty.
pub fn parse_structure(text: &str, width: usize, height: usize) -> ParsedStructure {
    let mut structure = ndarray::Array2::from_elem((width, height), CellType::Empty);
    let mut issues = vec![];

    let lines = text.lines().collect::<Vec<_>>();
    let first = lines.iter().position(|line| !line.trim().is_empty());
    let last = lines.iter().rposition(|line| !line.trim().is_empty());
    let rows = match (first, last) {
        (Some(first), Some(last)) => &lines[first..=last],
        _ => &[][..],
    };
    if rows.len() != height {
        issues.push(StructureIssue::RowCount {
            expected: height,
            found: rows.len(),
        });
    }

    for (row, line) in rows.iter().enumerate().take(height) {
        let tokens = line.split_whitespace().collect::<Vec<_>>();
        if tokens.len() != width {
            issues.push(StructureIssue::ColumnCount {
                row,
                expected: width,
                found: tokens.len(),
            });
        }

        for (column, token) in tokens.into_iter().enumerate().take(width) {
            let cell_type = match token {
                "#" => CellType::Occupy,
                "_" => CellType::Empty,
                _ => {
                    issues.push(StructureIssue::InvalidToken {
                        row,
                        column,
                        token: token.to_string(),
                    });
                    CellType::Empty
                }
            };
            structure[[column, height - 1 - row]] = cell_type;
        }
    }

    ParsedStructure { structure, issues }
}

/// Rotates a structure clockwise by `rotation`, remapping entry sides along with positions.
pub fn rotate_structure(
    structure: &ndarray::Array2<CellType>,
    rotation: Rotation,
) -> ndarray::Array2<CellType> {
    let (w, h) = structure.dim();
    let dim = match rotation {
        Direction::Up | Direction::Down => (w, h),
        Direction::Right | Direction::Left => (h, w),
    };

    let mut rotated = ndarray::Array2::from_elem(dim, CellType::Empty);
    for ((x, y), &cell_type) in structure.indexed_iter() {
        let (rx, ry) = match rotation {
            Direction::Up => (x, y),
            Direction::Right => (y, w - 1 - x),
            Direction::Down => (w - 1 - x, h - 1 - y),
            Direction::Left => (h - 1 - y, x),
        };
        rotated[[rx, ry]] = cell_type.rotated(rotation);
    }
    rotated
}

/// An immutable item template. Shared by every placed copy.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDefinition {
    name: String,
    kind: ItemKind,
    value: u32,
    growth: usize,
    structure: ndarray::Array2<CellType>,
}

impl ItemDefinition {
    pub fn from_spec(spec: &ItemSpec) -> (Self, Vec<StructureIssue>) {
        assert!(
            spec.width > 0 && spec.height > 0,
            "item {:?} has an empty footprint",
            spec.name
        );

        let ParsedStructure {
            mut structure,
            mut issues,
        } = parse_structure(&spec.structure, spec.width, spec.height);

        for entry in spec.entries.iter() {
            match structure.get_mut([entry.x, entry.y]) {
                Some(cell_type) if cell_type.is_structural() => {
                    *cell_type = CellType::entry(entry.side);
                }
                _ => issues.push(StructureIssue::EntryOffStructure {
                    x: entry.x,
                    y: entry.y,
                }),
            }
        }

        for issue in issues.iter() {
            log::warn!("item {:?}: {}", spec.name, issue);
        }

        (
            ItemDefinition {
                name: spec.name.clone(),
                kind: spec.kind,
                value: spec.value,
                growth: spec.growth,
                structure,
            },
            issues,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn growth(&self) -> usize {
        self.growth
    }

    pub fn width(&self) -> usize {
        self.structure.dim().0
    }

    pub fn height(&self) -> usize {
        self.structure.dim().1
    }

    pub fn structure(&self) -> &ndarray::Array2<CellType> {
        &self.structure
    }
}

/// An item definition as seen through a rotation.
#[derive(Debug, Clone, PartialEq)]
pub struct RotatedItem {
    definition: Rc<ItemDefinition>,
    rotation: Rotation,
    structure: ndarray::Array2<CellType>,
}

impl RotatedItem {
    pub fn new(definition: Rc<ItemDefinition>, rotation: Rotation) -> Self {
        let structure = rotate_structure(definition.structure(), rotation);
        RotatedItem {
            definition,
            rotation,
            structure,
        }
    }

    pub fn definition(&self) -> &Rc<ItemDefinition> {
        &self.definition
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn width(&self) -> usize {
        self.structure.dim().0
    }

    pub fn height(&self) -> usize {
        self.structure.dim().1
    }

    pub fn structure(&self) -> &ndarray::Array2<CellType> {
        &self.structure
    }

    pub fn cell_type(&self, x: usize, y: usize) -> CellType {
        self.structure.get([x, y]).copied().unwrap_or_default()
    }

    /// Local cells through which the snake may enter, with the side it must come through.
    pub fn entries(&self) -> impl Iterator<Item = ((usize, usize), Direction)> + '_ {
        self.structure
            .indexed_iter()
            .filter_map(|(pos, cell_type)| cell_type.entry_side().map(|side| (pos, side)))
    }

    pub fn has_entries(&self) -> bool {
        self.entries().next().is_some()
    }
}

/// Every loaded definition with all four of its rotations precomputed.
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    views: Vec<[Rc<RotatedItem>; 4]>,
}

impl ItemCatalog {
    pub fn new(specs: &[ItemSpec]) -> (Self, Vec<(usize, StructureIssue)>) {
        let mut all_issues = vec![];
        let views = specs
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                let (definition, issues) = ItemDefinition::from_spec(spec);
                all_issues.extend(issues.into_iter().map(|issue| (i, issue)));
                let definition = Rc::new(definition);
                Direction::ALL.map(|rotation| Rc::new(RotatedItem::new(definition.clone(), rotation)))
            })
            .collect();
        (ItemCatalog { views }, all_issues)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn view(&self, index: usize, rotation: Rotation) -> Option<&Rc<RotatedItem>> {
        self.views.get(index).map(|views| &views[rotation.step()])
    }

    pub fn definition(&self, index: usize) -> Option<&Rc<ItemDefinition>> {
        self.views.get(index).map(|views| views[0].definition())
    }
}
