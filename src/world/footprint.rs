use std::rc::Rc;

use super::grid::Cell;
use super::item::{CellType, ItemDefinition, RotatedItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct ItemId(pub u32);

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Structural cells of a rotated structure at `origin`, in row-major order from the bottom row.
pub fn compute_item_cells(
    structure: &ndarray::Array2<CellType>,
    origin: Cell,
) -> (Vec<Cell>, Vec<CellType>) {
    let (w, h) = structure.dim();
    let mut cells = vec![];
    let mut cell_types = vec![];
    for y in 0..h {
        for x in 0..w {
            let cell_type = structure[[x, y]];
            if cell_type.is_structural() {
                cells.push(origin.offset(x as i32, y as i32));
                cell_types.push(cell_type);
            }
        }
    }
    (cells, cell_types)
}

/// Every cell of the rectangle at `border_origin`, whether or not it lies on the grid.
pub fn compute_border_cells(border_origin: Cell, border_size: (usize, usize)) -> Vec<Cell> {
    let (w, h) = border_size;
    (0..h as i32)
        .flat_map(|y| (0..w as i32).map(move |x| border_origin.offset(x, y)))
        .collect()
}

#[derive(Debug, Clone)]
struct Attachment {
    origin: Cell,
    item_cells: Vec<Cell>,
    cell_types: Vec<CellType>,
    border_cells: Vec<Cell>,
}

/// A rotated item instance, floating until attached to a grid origin.
#[derive(Debug, Clone)]
pub struct PlacedItem {
    id: ItemId,
    view: Rc<RotatedItem>,
    attachment: Option<Attachment>,
}

impl PlacedItem {
    pub fn floating(id: ItemId, view: Rc<RotatedItem>) -> Self {
        PlacedItem {
            id,
            view,
            attachment: None,
        }
    }

    /// Binds the item's bounding box minimum to `origin` and derives its cells.
    pub fn attach(&mut self, origin: Cell) {
        let (item_cells, cell_types) = compute_item_cells(self.view.structure(), origin);
        let border_cells = compute_border_cells(origin.offset(-1, -1), self.border_size());
        self.attachment = Some(Attachment {
            origin,
            item_cells,
            cell_types,
            border_cells,
        });
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn view(&self) -> &Rc<RotatedItem> {
        &self.view
    }

    pub fn definition(&self) -> &ItemDefinition {
        self.view.definition()
    }

    pub fn origin(&self) -> Option<Cell> {
        self.attachment.as_ref().map(|a| a.origin)
    }

    pub fn is_attached(&self) -> bool {
        self.attachment.is_some()
    }

    pub fn size(&self) -> (usize, usize) {
        (self.view.width(), self.view.height())
    }

    pub fn border_size(&self) -> (usize, usize) {
        (self.view.width() + 2, self.view.height() + 2)
    }

    pub fn item_cells(&self) -> &[Cell] {
        self.attachment
            .as_ref()
            .map(|a| a.item_cells.as_slice())
            .unwrap_or_default()
    }

    pub fn cell_types(&self) -> &[CellType] {
        self.attachment
            .as_ref()
            .map(|a| a.cell_types.as_slice())
            .unwrap_or_default()
    }

    pub fn border_cells(&self) -> &[Cell] {
        self.attachment
            .as_ref()
            .map(|a| a.border_cells.as_slice())
            .unwrap_or_default()
    }

    /// The type of `cell` if it is one of this item's structural cells.
    pub fn contains_structural_cell(&self, cell: Cell) -> Option<CellType> {
        let origin = self.origin()?;
        let (x, y) = (cell.x - origin.x, cell.y - origin.y);
        if x < 0 || y < 0 {
            return None;
        }
        Some(self.view.cell_type(x as usize, y as usize)).filter(|t| t.is_structural())
    }

    pub fn contains_border_cell(&self, cell: Cell) -> bool {
        self.origin()
            .is_some_and(|origin| in_rect(cell, origin.offset(-1, -1), self.border_size()))
    }

    pub fn contains_bounding_cell(&self, cell: Cell) -> bool {
        self.origin()
            .is_some_and(|origin| in_rect(cell, origin, self.size()))
    }
}

fn in_rect(cell: Cell, min: Cell, (w, h): (usize, usize)) -> bool {
    cell.x >= min.x && cell.y >= min.y && cell.x < min.x + w as i32 && cell.y < min.y + h as i32
}
