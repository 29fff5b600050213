//! Layout of a Word table onto a rectangular grid, resolving `gridSpan` and
//! `vMerge` into HTML `colspan`/`rowspan`.

use crate::Result;
use rs_docx::document::{Table, TableCell, TableRowContent};
use rs_docx::formatting::VMergeType;

#[derive(Clone, Debug)]
pub(crate) enum Slot {
    /// Top-left slot of a rendered cell.
    Cell {
        html: String,
        rowspan: usize,
        colspan: usize,
    },
    /// Covered by a cell to the left (horizontal merge).
    SpannedLeft,
    /// Covered by a cell above (vertical merge).
    SpannedUp,
    Empty,
}

pub(crate) fn build_grid<'a, F>(table: &Table<'a>, mut convert_cell: F) -> Result<Vec<Vec<Slot>>>
where
    F: FnMut(&TableCell<'a>) -> Result<String>,
{
    let mut grid: Vec<Vec<Slot>> = Vec::with_capacity(table.rows.len());

    for (row_idx, row) in table.rows.iter().enumerate() {
        grid.push(Vec::new());
        let mut col = 0;

        for content in &row.cells {
            let TableRowContent::TableCell(cell) = content else {
                continue;
            };

            let span = cell
                .property
                .grid_span
                .as_ref()
                .map(|g| g.val as usize)
                .unwrap_or(1)
                .max(1);
            let continues_merge = cell
                .property
                .v_merge
                .as_ref()
                .is_some_and(|v| !matches!(v.val, Some(VMergeType::Restart)));

            if continues_merge {
                extend_rowspan(&mut grid, row_idx, col);
                for offset in 0..span {
                    place(&mut grid, row_idx, col + offset, Slot::SpannedUp);
                }
            } else {
                let html = convert_cell(cell)?;
                place(
                    &mut grid,
                    row_idx,
                    col,
                    Slot::Cell {
                        html,
                        rowspan: 1,
                        colspan: span,
                    },
                );
                for offset in 1..span {
                    place(&mut grid, row_idx, col + offset, Slot::SpannedLeft);
                }
            }
            col += span;
        }
    }

    Ok(grid)
}

pub(crate) fn render_grid(grid: Vec<Vec<Slot>>) -> String {
    let mut html = String::from("<table class=\"docx-table\">\n");
    for row in grid {
        html.push_str("  <tr>\n");
        for slot in row {
            match slot {
                Slot::Cell {
                    html: content,
                    rowspan,
                    colspan,
                } => {
                    let mut attrs = String::new();
                    if rowspan > 1 {
                        attrs.push_str(&format!(" rowspan=\"{}\"", rowspan));
                    }
                    if colspan > 1 {
                        attrs.push_str(&format!(" colspan=\"{}\"", colspan));
                    }
                    html.push_str(&format!("    <td{}>{}</td>\n", attrs, content));
                }
                Slot::SpannedLeft | Slot::SpannedUp => {}
                Slot::Empty => html.push_str("    <td></td>\n"),
            }
        }
        html.push_str("  </tr>\n");
    }
    html.push_str("</table>");
    html
}

fn place(grid: &mut [Vec<Slot>], row: usize, col: usize, slot: Slot) {
    let cells = &mut grid[row];
    if cells.len() <= col {
        cells.resize(col + 1, Slot::Empty);
    }
    cells[col] = slot;
}

/// Finds the cell a vertical continuation at `(row, col)` belongs to and
/// grows its rowspan. The owner may sit several rows up, or to the left when
/// it also spans columns.
fn extend_rowspan(grid: &mut [Vec<Slot>], row: usize, col: usize) {
    for above in (0..row).rev() {
        let Some(slot) = grid[above].get(col) else {
            return;
        };
        match slot {
            Slot::SpannedUp => continue,
            Slot::Cell { .. } => {
                if let Slot::Cell { rowspan, .. } = &mut grid[above][col] {
                    *rowspan += 1;
                }
                return;
            }
            Slot::SpannedLeft => {
                let owner = (0..col).rev().find(|&c| {
                    !matches!(grid[above][c], Slot::SpannedLeft)
                });
                if let Some(owner) = owner {
                    if let Slot::Cell {
                        rowspan, colspan, ..
                    } = &mut grid[above][owner]
                    {
                        if owner + *colspan > col {
                            *rowspan += 1;
                        }
                    }
                }
                return;
            }
            Slot::Empty => return,
        }
    }
}
