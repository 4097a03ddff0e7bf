use crate::ProgressError;

/// How the planner treats a final row the covers cannot fill.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LayoutMode {
    /// Every cover gets a cell; the last row may be partly empty.
    #[default]
    Balanced,
    /// Rows are truncated so the grid is a filled rectangle. Covers beyond
    /// `columns * rows` are left out.
    FullScreen,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridPlan {
    pub columns: u32,
    pub rows: u32,
    pub cell_width: u32,
    pub cell_height: u32,
    /// Gutter between neighbouring cells, about one percent of a cell width.
    pub padding: u32,
}

impl GridPlan {
    pub fn compute(
        item_count: usize,
        canvas_width: u32,
        canvas_height: u32,
        header_height: u32,
        mode: LayoutMode,
    ) -> Result<Self, ProgressError> {
        if item_count == 0 {
            return Err(ProgressError::EmptyCoverList);
        }

        let usable_width = canvas_width;
        let usable_height = canvas_height.checked_sub(header_height).ok_or_else(|| {
            ProgressError::InvalidLayout(format!(
                "header of {header_height}px exceeds canvas height {canvas_height}px"
            ))
        })?;

        let count = u32::try_from(item_count)
            .map_err(|_| ProgressError::InvalidLayout(format!("{item_count} items")))?;

        let columns = ceil_sqrt(count);
        let rows = match mode {
            LayoutMode::FullScreen => count / columns,
            // Two covers side by side make a squat strip; give them an empty
            // row underneath instead.
            LayoutMode::Balanced if count == 2 => count.div_ceil(columns) + 1,
            LayoutMode::Balanced => count.div_ceil(columns),
        };

        if rows == 0 {
            return Err(ProgressError::InvalidLayout(format!(
                "full-screen layout of {count} items across {columns} columns has no rows"
            )));
        }

        let cell_width = usable_width / columns;
        let cell_height = usable_height / rows;
        if cell_width == 0 || cell_height == 0 {
            return Err(ProgressError::InvalidLayout(format!(
                "{columns}x{rows} grid does not fit in {usable_width}x{usable_height}"
            )));
        }

        let padding = cell_width.div_ceil(100);

        Ok(Self { columns, rows, cell_width, cell_height, padding })
    }

    pub fn capacity(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    /// Top-left corner of the cell at `index` in row-major order.
    pub fn cell_origin(&self, index: usize, header_height: u32) -> (u32, u32) {
        let column = (index % self.columns as usize) as u32;
        let row = (index / self.columns as usize) as u32;
        (
            column * (self.cell_width + self.padding),
            header_height + row * (self.cell_height + self.padding),
        )
    }
}

/// Smallest `n` with `n * n >= value`.
fn ceil_sqrt(value: u32) -> u32 {
    let mut root = f64::from(value).sqrt() as u32;
    while u64::from(root) * u64::from(root) < u64::from(value) {
        root += 1;
    }
    while root > 0 && u64::from(root - 1) * u64::from(root - 1) >= u64::from(value) {
        root -= 1;
    }
    root
}
