//! Pure geometry behind directional navigation: bucketing tiles into rows and
//! columns and choosing the neighbour in a given direction.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Axis-aligned box in surface units (pixels for a page, cells for a terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Bounds {
    pub(crate) left: i32,
    pub(crate) top: i32,
    pub(crate) width: i32,
    pub(crate) height: i32,
}

impl Bounds {
    pub(crate) const fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub(crate) fn right(&self) -> i32 {
        self.left + self.width
    }

    pub(crate) fn bottom(&self) -> i32 {
        self.top + self.height
    }

    pub(crate) fn center_x(&self) -> f64 {
        f64::from(self.left) + f64::from(self.width) / 2.0
    }

    pub(crate) fn contains(&self, inner: &Bounds) -> bool {
        inner.left >= self.left
            && inner.top >= self.top
            && inner.right() <= self.right()
            && inner.bottom() <= self.bottom()
    }

    fn horizontal_offset(&self, other: &Bounds) -> f64 {
        (self.center_x() - other.center_x()).abs()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GridMetrics {
    pub(crate) tile_height: i32,
    pub(crate) tile_width: i32,
    /// Max horizontal center distance for an up/down candidate.
    pub(crate) align_tolerance: i32,
    /// Vertical gaps closer than this are treated as the same row.
    pub(crate) closeness: i32,
}

impl Default for GridMetrics {
    fn default() -> Self {
        Self {
            tile_height: 250,
            tile_width: 400,
            align_tolerance: 200,
            closeness: 50,
        }
    }
}

impl GridMetrics {
    fn row_of(&self, bounds: &Bounds) -> i32 {
        bounds.top.div_euclid(self.tile_height.max(1))
    }

    fn column_of(&self, bounds: &Bounds) -> i32 {
        bounds.left.div_euclid(self.tile_width.max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GridCell<H> {
    pub(crate) handle: H,
    pub(crate) row: i32,
    pub(crate) column: i32,
    pub(crate) bounds: Bounds,
}

/// Buckets tiles into (row, column) and sorts them by that key. Tiles sharing
/// a bucket keep their input order.
pub(crate) fn index_grid<H: Copy>(
    tiles: impl IntoIterator<Item = (H, Bounds)>,
    metrics: &GridMetrics,
) -> Vec<GridCell<H>> {
    let mut grid: Vec<GridCell<H>> = tiles
        .into_iter()
        .map(|(handle, bounds)| GridCell {
            handle,
            row: metrics.row_of(&bounds),
            column: metrics.column_of(&bounds),
            bounds,
        })
        .collect();
    grid.sort_by_key(|cell| (cell.row, cell.column));
    grid
}

/// Index of the grid cell reached from `grid[from]`, if any.
pub(crate) fn grid_step<H>(
    grid: &[GridCell<H>],
    from: usize,
    direction: Direction,
    metrics: &GridMetrics,
) -> Option<usize> {
    let current = grid.get(from)?;
    match direction {
        Direction::Up | Direction::Down => vertical_step(grid, current, direction, metrics),
        Direction::Left => grid
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.row == current.row && cell.column < current.column)
            .min_by_key(|(index, cell)| (current.column - cell.column, *index))
            .map(|(index, _)| index),
        Direction::Right => grid
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.row == current.row && cell.column > current.column)
            .min_by_key(|(index, cell)| (cell.column - current.column, *index))
            .map(|(index, _)| index),
    }
}

fn vertical_step<H>(
    grid: &[GridCell<H>],
    current: &GridCell<H>,
    direction: Direction,
    metrics: &GridMetrics,
) -> Option<usize> {
    let tolerance = f64::from(metrics.align_tolerance);
    let candidates: Vec<(usize, i32, f64)> = grid
        .iter()
        .enumerate()
        .filter(|(_, cell)| match direction {
            Direction::Up => cell.row < current.row,
            _ => cell.row > current.row,
        })
        .map(|(index, cell)| {
            let gap = match direction {
                Direction::Up => current.bounds.top - cell.bounds.bottom(),
                _ => cell.bounds.top - current.bounds.bottom(),
            };
            (index, gap, cell.bounds.horizontal_offset(&current.bounds))
        })
        .filter(|(_, _, offset)| *offset < tolerance)
        .collect();

    // Everything within `closeness` of the nearest gap counts as the next
    // row; among those the best-aligned tile wins.
    let nearest_gap = candidates.iter().map(|(_, gap, _)| *gap).min()?;
    candidates
        .into_iter()
        .filter(|(_, gap, _)| gap - nearest_gap < metrics.closeness)
        .min_by(|a, b| {
            a.2.total_cmp(&b.2)
                .then(a.1.cmp(&b.1))
                .then(a.0.cmp(&b.0))
        })
        .map(|(index, _, _)| index)
}

/// Fallback traversal for elements outside the grid: left/right walk the list
/// without wrapping, up/down pick the best-aligned element strictly above or
/// below.
pub(crate) fn linear_step(list: &[Bounds], from: usize, direction: Direction) -> Option<usize> {
    let current = list.get(from)?;
    match direction {
        Direction::Left => from.checked_sub(1),
        Direction::Right => (from + 1 < list.len()).then_some(from + 1),
        Direction::Up | Direction::Down => list
            .iter()
            .enumerate()
            .filter(|(_, bounds)| match direction {
                Direction::Up => bounds.bottom() < current.top,
                _ => bounds.top > current.bottom(),
            })
            .min_by(|(ia, a), (ib, b)| {
                a.horizontal_offset(current)
                    .total_cmp(&b.horizontal_offset(current))
                    .then(ia.cmp(ib))
            })
            .map(|(index, _)| index),
    }
}
