use rand::Rng;

use super::footprint::PlacedItem;
use super::grid::{Cell, Grid};
use super::item::RotatedItem;
use super::occupancy::OccupancyMap;
use crate::config::SpawnConfig;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum PlaceError {
    #[error("footprint {footprint:?} does not fit in {grid:?} grid (allow_border = {allow_border})")]
    FootprintExceedsGrid {
        footprint: (usize, usize),
        grid: (usize, usize),
        allow_border: bool,
    },
}

struct Candidate<'a> {
    occupancy: &'a OccupancyMap,
    placed: &'a [&'a PlacedItem],
    offsets: Vec<(i32, i32)>,
    respect_borders: bool,
}

impl Candidate<'_> {
    fn accepts(&self, origin: Cell) -> bool {
        self.offsets.iter().all(|&(dx, dy)| {
            let cell = origin.offset(dx, dy);
            self.occupancy.is_free(cell)
                && !(self.respect_borders && self.placed.iter().any(|p| p.contains_border_cell(cell)))
        })
    }
}

/// Finds an origin for `view` whose structural cells are all free.
///
/// Samples up to `rules.max_tries` random origins, then optionally scans every origin in order.
/// `Ok(None)` means no spot was found and the spawn should be skipped. Nothing is registered here.
pub fn try_place<R: Rng + ?Sized>(
    rng: &mut R,
    grid: &Grid,
    occupancy: &OccupancyMap,
    placed: &[&PlacedItem],
    view: &RotatedItem,
    rules: &SpawnConfig,
) -> Result<Option<Cell>, PlaceError> {
    let (w, h) = (view.width(), view.height());
    if !grid.fits(w, h, rules.allow_border) {
        return Err(PlaceError::FootprintExceedsGrid {
            footprint: (w, h),
            grid: grid.dim(),
            allow_border: rules.allow_border,
        });
    }

    let candidate = Candidate {
        occupancy,
        placed,
        offsets: view
            .structure()
            .indexed_iter()
            .filter(|(_, t)| t.is_structural())
            .map(|((x, y), _)| (x as i32, y as i32))
            .collect(),
        respect_borders: rules.respect_borders,
    };

    for attempt in 0..rules.max_tries {
        let origin = grid.random_spawn_cell(rng, w, h, rules.allow_border);
        if candidate.accepts(origin) {
            log::debug!(
                "placed {:?} at {} after {} tries",
                view.definition().name(),
                origin,
                attempt + 1
            );
            return Ok(Some(origin));
        }
    }

    if rules.exhaustive_fallback {
        let pad = if rules.allow_border { 0 } else { 1 };
        let (max_x, max_y) = ((grid.width() - w - pad) as i32, (grid.height() - h - pad) as i32);
        let found = (pad as i32..=max_y)
            .flat_map(|y| (pad as i32..=max_x).map(move |x| Cell::new(x, y)))
            .find(|&origin| candidate.accepts(origin));
        if let Some(origin) = found {
            log::debug!(
                "placed {:?} at {} by scanning after {} random tries",
                view.definition().name(),
                origin,
                rules.max_tries
            );
            return Ok(Some(origin));
        }
    }

    log::warn!(
        "no room for {:?} ({}x{}) after {} tries",
        view.definition().name(),
        w,
        h,
        rules.max_tries
    );
    Ok(None)
}
