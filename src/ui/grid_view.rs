// Recycling host for a sectioned adapter.
// Keeps a window of rows bound; cells leaving the window go back to a pool and
// are handed to the adapter again for other positions.

use std::ops::Range;

use tracing::{trace, warn};

use crate::layout::{GridPosition, GridRow, SectionedLayout, ViewType};

use super::adapter::SectionedAdapter;
use super::cells::{Cell, HeaderCell, ItemCell};

#[derive(Debug)]
struct BoundCell {
    absolute: usize,
    cell: Cell,
}

pub struct SectionedGridView {
    grid_width: usize,
    layout: SectionedLayout,
    rows: Vec<GridRow>,
    visible_rows: Range<usize>,
    bound: Vec<BoundCell>,
    header_pool: Vec<HeaderCell>,
    item_pool: Vec<ItemCell>,
    created: usize,
}

impl SectionedGridView {
    pub fn new(grid_width: usize) -> Self {
        Self {
            grid_width: grid_width.max(1),
            layout: SectionedLayout::default(),
            rows: Vec::new(),
            visible_rows: 0..0,
            bound: Vec::new(),
            header_pool: Vec::new(),
            item_pool: Vec::new(),
            created: 0,
        }
    }

    pub fn layout(&self) -> &SectionedLayout {
        &self.layout
    }

    pub fn rows(&self) -> &[GridRow] {
        &self.rows
    }

    pub fn visible_rows(&self) -> Range<usize> {
        self.visible_rows.clone()
    }

    /// Re-read the adapter after its data changed and rebind every visible cell.
    pub fn refresh<A: SectionedAdapter>(&mut self, adapter: &mut A) {
        self.layout = adapter.layout();
        self.rows = self.layout.rows(self.grid_width);
        for bound in self.bound.drain(..) {
            match bound.cell {
                Cell::Header(h) => self.header_pool.push(h),
                Cell::Item(c) => self.item_pool.push(c),
            }
        }
        let visible = self.visible_rows.clone();
        self.visible_rows = 0..0;
        self.bind_rows(adapter, visible);
    }

    /// Make `rows` the visible window (clamped to the grid).
    ///
    /// Cells that stay visible keep their binding; cells that scroll out are
    /// recycled before the newly visible positions are bound.
    pub fn bind_rows<A: SectionedAdapter>(&mut self, adapter: &mut A, rows: Range<usize>) {
        let end = rows.end.min(self.rows.len());
        let start = rows.start.min(end);
        self.visible_rows = start..end;

        let positions = match (self.rows.get(start), end.checked_sub(1).and_then(|i| self.rows.get(i))) {
            (Some(first), Some(last)) if start < end => first.positions.start..last.positions.end,
            _ => 0..0,
        };

        let mut kept = Vec::with_capacity(self.bound.len());
        for bound in self.bound.drain(..) {
            if positions.contains(&bound.absolute) {
                kept.push(bound);
                continue;
            }
            match bound.cell {
                Cell::Header(h) => self.header_pool.push(h),
                Cell::Item(c) => self.item_pool.push(c),
            }
        }
        self.bound = kept;

        for absolute in positions {
            if self.bound.iter().any(|b| b.absolute == absolute) {
                continue;
            }
            if let Some(cell) = self.bind_position(adapter, absolute) {
                self.bound.push(BoundCell { absolute, cell });
            }
        }
        self.bound.sort_by_key(|b| b.absolute);

        trace!(
            rows = ?self.visible_rows,
            bound = self.bound.len(),
            pooled = self.item_pool.len(),
            "Bound grid window"
        );
    }

    fn obtain<A: SectionedAdapter>(&mut self, adapter: &mut A, view_type: ViewType) -> Cell {
        let pooled = match view_type {
            ViewType::Header => self.header_pool.pop().map(Cell::Header),
            ViewType::Item => self.item_pool.pop().map(Cell::Item),
        };
        pooled.unwrap_or_else(|| {
            self.created += 1;
            adapter.create_cell(view_type)
        })
    }

    fn bind_position<A: SectionedAdapter>(&mut self, adapter: &mut A, absolute: usize) -> Option<Cell> {
        let position = self.layout.resolve(absolute)?;
        let expected = position.view_type();
        let mut cell = self.obtain(adapter, expected);
        let created = cell.view_type();

        match (position, &mut cell) {
            (GridPosition::Header { section }, Cell::Header(header)) => {
                adapter.bind_header(header, section);
            }
            (
                GridPosition::Item {
                    section,
                    relative,
                    absolute,
                },
                Cell::Item(item),
            ) => {
                adapter.bind_cell(item, section, relative, absolute);
            }
            _ => {
                warn!(absolute, ?expected, ?created, "Adapter created a cell of the wrong type");
                return None;
            }
        }
        Some(cell)
    }

    /// Bound cells in position order.
    pub fn bound_cells(&self) -> impl Iterator<Item = (usize, &Cell)> {
        self.bound.iter().map(|b| (b.absolute, &b.cell))
    }

    pub fn item_cells_mut(&mut self) -> impl Iterator<Item = &mut ItemCell> {
        self.bound.iter_mut().filter_map(|b| match &mut b.cell {
            Cell::Item(item) => Some(item),
            Cell::Header(_) => None,
        })
    }

    pub fn cell_at(&self, absolute: usize) -> Option<&Cell> {
        self.bound
            .binary_search_by_key(&absolute, |b| b.absolute)
            .ok()
            .map(|i| &self.bound[i].cell)
    }

    /// The bound header of `section`, if it is inside the visible window.
    pub fn header_for(&self, section: usize) -> Option<&HeaderCell> {
        if section >= self.layout.section_count() {
            return None;
        }
        match self.cell_at(self.layout.header_position(section))? {
            Cell::Header(header) => Some(header),
            Cell::Item(_) => None,
        }
    }
}
