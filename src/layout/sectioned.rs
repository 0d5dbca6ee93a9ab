use std::ops::Range;

/// The two kinds of cell a sectioned grid is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewType {
    Header,
    Item,
}

/// What sits at a flat adapter position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridPosition {
    Header {
        section: usize,
    },
    Item {
        section: usize,
        relative: usize,
        absolute: usize,
    },
}

impl GridPosition {
    pub fn view_type(&self) -> ViewType {
        match self {
            Self::Header { .. } => ViewType::Header,
            Self::Item { .. } => ViewType::Item,
        }
    }
}

/// One visual row of the grid: a header alone, or up to `grid_width` items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRow {
    pub view_type: ViewType,
    pub positions: Range<usize>,
}

/// Maps flat positions of a sectioned grid to sections and items.
///
/// Each section occupies one header position followed by its items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionedLayout {
    item_counts: Vec<usize>,
    header_positions: Vec<usize>,
    total: usize,
}

impl SectionedLayout {
    pub fn new(item_counts: Vec<usize>) -> Self {
        let mut header_positions = Vec::with_capacity(item_counts.len());
        let mut total = 0;
        for &count in &item_counts {
            header_positions.push(total);
            total += 1 + count;
        }
        Self {
            item_counts,
            header_positions,
            total,
        }
    }

    /// Number of flat positions (headers plus items).
    pub fn total_count(&self) -> usize {
        self.total
    }

    pub fn section_count(&self) -> usize {
        self.item_counts.len()
    }

    pub fn header_position(&self, section: usize) -> usize {
        self.header_positions[section]
    }

    pub fn resolve(&self, absolute: usize) -> Option<GridPosition> {
        if absolute >= self.total {
            return None;
        }

        let section = match self.header_positions.binary_search(&absolute) {
            Ok(section) => return Some(GridPosition::Header { section }),
            Err(insert_at) => insert_at - 1,
        };
        let relative = absolute - self.header_positions[section] - 1;
        Some(GridPosition::Item {
            section,
            relative,
            absolute,
        })
    }

    /// Columns taken by the cell at `absolute`: headers span the whole row.
    pub fn span_size(&self, absolute: usize, grid_width: usize) -> usize {
        match self.resolve(absolute) {
            Some(GridPosition::Header { .. }) => grid_width.max(1),
            _ => 1,
        }
    }

    /// Pack positions into rows of `grid_width` columns by span size.
    pub fn rows(&self, grid_width: usize) -> Vec<GridRow> {
        let grid_width = grid_width.max(1);
        let mut rows: Vec<GridRow> = Vec::new();
        let mut used = 0;

        for absolute in 0..self.total {
            let Some(position) = self.resolve(absolute) else {
                break;
            };
            let span = self.span_size(absolute, grid_width);

            match rows.last_mut() {
                Some(row) if used + span <= grid_width => {
                    row.positions.end = absolute + 1;
                    used += span;
                }
                _ => {
                    rows.push(GridRow {
                        view_type: position.view_type(),
                        positions: absolute..absolute + 1,
                    });
                    used = span;
                }
            }
        }

        rows
    }
}
