use std::fmt::Write as _;

use crate::layout::ViewType;

use super::cells::{Cell, CellImage, HeaderCell, ItemCell};
use super::grid_view::SectionedGridView;

/// Column width of one item cell.
const CELL_WIDTH: usize = 14;

/// Renders the bound window of a grid view as plain text, one line per row.
#[derive(Debug, Clone, Copy)]
pub struct TextGridRenderer {
    cell_width: usize,
}

impl Default for TextGridRenderer {
    fn default() -> Self {
        Self {
            cell_width: CELL_WIDTH,
        }
    }
}

impl TextGridRenderer {
    pub fn new(cell_width: usize) -> Self {
        Self {
            cell_width: cell_width.max(6),
        }
    }

    pub fn render(&self, view: &SectionedGridView) -> String {
        let mut out = String::new();
        for row in &view.rows()[view.visible_rows()] {
            let line = match row.view_type {
                ViewType::Header => match view.cell_at(row.positions.start) {
                    Some(Cell::Header(header)) => self.header_line(header),
                    _ => String::new(),
                },
                ViewType::Item => row
                    .positions
                    .clone()
                    .filter_map(|p| match view.cell_at(p) {
                        Some(Cell::Item(item)) => Some(self.item_text(item)),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join(" "),
            };
            let _ = writeln!(out, "{}", line.trim_end());
        }
        out
    }

    pub fn header_line(&self, header: &HeaderCell) -> String {
        let mut line = format!("== {} ==", header.title);
        if header.sync_toggle_visible {
            line.push_str(" [sync]");
        }
        if header.settings_visible {
            line.push_str(" [...]");
        }
        line
    }

    pub fn item_text(&self, item: &ItemCell) -> String {
        let mut text = match &item.image {
            CellImage::Icon(icon) | CellImage::Loading(icon) => icon.glyph().to_string(),
            CellImage::Thumbnail(thumb) => {
                let (width, height) = thumb.dimensions();
                format!("[{}x{}]", width, height)
            }
        };
        if let Some(counter) = &item.counter {
            text = format!("{}+{}", if item.darkened { "#" } else { "" }, counter);
        }
        truncate_pad(&text, self.cell_width)
    }
}

fn truncate_pad(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count > width {
        let mut cut: String = text.chars().take(width - 1).collect();
        cut.push('~');
        cut
    } else {
        format!("{text:<width$}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Icon;
    use crate::thumbnails::{CellId, Thumbnail};
    use image::RgbImage;

    #[test]
    fn test_header_line() {
        let mut header = HeaderCell::default();
        header.title = "Camera".into();
        header.sync_toggle_visible = true;
        header.settings_visible = true;
        assert_eq!(
            TextGridRenderer::default().header_line(&header),
            "== Camera == [sync] [...]"
        );
    }

    #[test]
    fn test_item_text() {
        let renderer = TextGridRenderer::new(8);
        let mut item = ItemCell::new(CellId(0));

        item.image = CellImage::Icon(Icon::Folder);
        assert_eq!(renderer.item_text(&item), "[dir]   ");

        item.image = CellImage::Thumbnail(Thumbnail::new(RgbImage::new(12, 9)));
        assert_eq!(renderer.item_text(&item), "[12x9]  ");

        item.counter = Some("2".into());
        item.darkened = true;
        assert_eq!(renderer.item_text(&item), "#+2     ");
    }

    #[test]
    fn test_truncate_pad() {
        assert_eq!(truncate_pad("abcdefgh", 6), "abcde~");
        assert_eq!(truncate_pad("ab", 4), "ab  ");
    }
}
