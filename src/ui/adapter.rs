use crate::layout::{SectionedLayout, ViewType};

use super::cells::{Cell, HeaderCell, ItemCell};

/// View-model of a sectioned grid: sections with a header and a run of items.
///
/// A host (see `SectionedGridView`) asks for cell shells with `create_cell`
/// and fills them through the two bind methods. Cells are recycled, so a bind
/// must overwrite every piece of state it is responsible for.
pub trait SectionedAdapter {
    fn section_count(&self) -> usize;

    /// Number of items in `section`. Panics if `section` is out of range.
    fn item_count(&self, section: usize) -> usize;

    fn bind_header(&mut self, cell: &mut HeaderCell, section: usize);

    /// Bind item `relative` of `section`; `absolute` is its flat grid position.
    fn bind_cell(&mut self, cell: &mut ItemCell, section: usize, relative: usize, absolute: usize);

    fn create_cell(&mut self, view_type: ViewType) -> Cell;

    fn layout(&self) -> SectionedLayout {
        SectionedLayout::new(
            (0..self.section_count())
                .map(|section| self.item_count(section))
                .collect(),
        )
    }

    /// Headers plus items.
    fn total_item_count(&self) -> usize {
        (0..self.section_count())
            .map(|section| 1 + self.item_count(section))
            .sum()
    }
}
