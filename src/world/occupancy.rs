use std::collections::HashMap;

use super::footprint::ItemId;
use super::grid::Cell;

/// Who holds a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Owner {
    Snake,
    Item(ItemId),
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum OccupancyError {
    #[error("cell {cell} is outside the {width}x{height} grid")]
    OutOfBounds {
        cell: Cell,
        width: usize,
        height: usize,
    },

    #[error("cell {cell} is held by {current:?}, cannot give it to {claimant:?}")]
    Clobbered {
        cell: Cell,
        current: Owner,
        claimant: Owner,
    },

    #[error("cell {cell} is not held by {owner:?}")]
    NotOwned { cell: Cell, owner: Owner },
}

/// The shared record of which owner holds each cell. A cell has at most one owner.
#[derive(Clone, Debug)]
pub struct OccupancyMap {
    repr: ndarray::Array2<Option<Owner>>,
    claims: HashMap<Owner, Vec<Cell>>,
}

impl OccupancyMap {
    pub fn new(size: (usize, usize)) -> Self {
        Self {
            repr: ndarray::Array2::from_elem(size, None),
            claims: HashMap::new(),
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        self.repr.dim()
    }

    fn index(&self, cell: Cell) -> Result<[usize; 2], OccupancyError> {
        let (width, height) = self.repr.dim();
        if cell.x < 0 || cell.y < 0 || cell.x as usize >= width || cell.y as usize >= height {
            return Err(OccupancyError::OutOfBounds {
                cell,
                width,
                height,
            });
        }
        Ok([cell.x as usize, cell.y as usize])
    }

    pub fn owner(&self, cell: Cell) -> Option<Owner> {
        self.index(cell).ok().and_then(|ix| self.repr[ix])
    }

    /// Whether `cell` is on the grid and unowned.
    pub fn is_free(&self, cell: Cell) -> bool {
        self.index(cell).is_ok_and(|ix| self.repr[ix].is_none())
    }

    /// Gives every cell in `cells` to `owner`.
    ///
    /// Nothing is written unless every cell is on the grid and unowned.
    pub fn claim(&mut self, owner: Owner, cells: &[Cell]) -> Result<(), OccupancyError> {
        let mut indices = Vec::with_capacity(cells.len());
        for &cell in cells.iter() {
            let ix = self.index(cell)?;
            let current = match self.repr[ix] {
                Some(current) => Some(current),
                None if indices.contains(&ix) => Some(owner),
                None => None,
            };
            if let Some(current) = current {
                return Err(OccupancyError::Clobbered {
                    cell,
                    current,
                    claimant: owner,
                });
            }
            indices.push(ix);
        }

        for ix in indices {
            self.repr[ix] = Some(owner);
        }
        self.claims.entry(owner).or_default().extend_from_slice(cells);
        Ok(())
    }

    pub fn claim_cell(&mut self, owner: Owner, cell: Cell) -> Result<(), OccupancyError> {
        self.claim(owner, &[cell])
    }

    /// Clears every cell held by `owner` and returns them.
    pub fn release(&mut self, owner: Owner) -> Vec<Cell> {
        let cells = self.claims.remove(&owner).unwrap_or_default();
        for &cell in cells.iter() {
            if let Ok(ix) = self.index(cell) {
                debug_assert_eq!(self.repr[ix], Some(owner));
                self.repr[ix] = None;
            }
        }
        cells
    }

    pub fn release_cell(&mut self, owner: Owner, cell: Cell) -> Result<(), OccupancyError> {
        let ix = self.index(cell)?;
        if self.repr[ix] != Some(owner) {
            return Err(OccupancyError::NotOwned { cell, owner });
        }

        self.repr[ix] = None;
        if let Some(cells) = self.claims.get_mut(&owner) {
            if let Some(i) = cells.iter().position(|&c| c == cell) {
                cells.swap_remove(i);
            }
            if cells.is_empty() {
                self.claims.remove(&owner);
            }
        }
        Ok(())
    }

    pub fn cells_of(&self, owner: Owner) -> &[Cell] {
        self.claims.get(&owner).map(|cells| cells.as_slice()).unwrap_or_default()
    }

    pub fn occupied_count(&self) -> usize {
        self.repr.iter().filter(|o| o.is_some()).count()
    }
}
