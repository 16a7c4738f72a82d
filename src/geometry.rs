/// Density of the tiling lattice. The center-to-center distance along the
/// rotation diagonal is the rotated text diagonal multiplied by this factor,
/// so successive tiles overlap (a factor of `1.0` would pack them edge to
/// edge) and the grid shows no gaps for varying glyph widths.
pub const TILE_DENSITY: f32 = 0.7;

/// Fraction of the longer page edge added as a margin of extra tiles past all
/// four page edges, so that the corners are not left blank by the rotation.
pub const EDGE_PADDING_RATIO: f32 = 0.1;

/// The repetition lattice of stamp positions covering one page. It is
/// recomputed from each page's own dimensions, since the pages of a document
/// are not assumed to share a size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileGrid {
    /// Number of lattice columns over the padded page width.
    pub columns: i32,
    /// Number of lattice rows over the padded page height.
    pub rows: i32,
    /// Center-to-center distance between horizontally adjacent tiles.
    pub horizontal_spacing: f32,
    /// Center-to-center distance between vertically adjacent tiles.
    pub vertical_spacing: f32,
    /// Margin of extra tiles extending past the page edges.
    pub padding: f32,
}

impl TileGrid {
    /// Computes the lattice for a page of the given dimensions and a stamp of
    /// the given unrotated text extents (both in page-coordinate units).
    ///
    /// The diagonal spacing is decomposed into independent axis projections
    /// at the 45 degree lattice angle. Both reduce to `diagonal * sqrt(2)/2`,
    /// but they are kept as separate projections on purpose: each one is an
    /// explicit, individually tunable policy.
    pub fn for_page(page_width: f32, page_height: f32, text_width: f32, text_height: f32) -> Self {
        let diagonal_spacing = text_width.hypot(text_height) * TILE_DENSITY;
        let horizontal_spacing = diagonal_spacing * 45.0_f32.to_radians().cos();
        let vertical_spacing = diagonal_spacing * 45.0_f32.to_radians().sin();
        let padding = page_width.max(page_height) * EDGE_PADDING_RATIO;

        // A zero-size page (and therefore a zero-size stamp) degenerates to
        // an empty lattice instead of dividing by zero; the page is then
        // passed through unstamped.
        if !(horizontal_spacing > 0.0 && vertical_spacing > 0.0) {
            return TileGrid {
                columns: 0,
                rows: 0,
                horizontal_spacing,
                vertical_spacing,
                padding,
            };
        }

        let columns = ((page_width + 2.0 * padding) / horizontal_spacing).ceil() as i32 + 1;
        let rows = ((page_height + 2.0 * padding) / vertical_spacing).ceil() as i32 + 1;

        TileGrid {
            columns,
            rows,
            horizontal_spacing,
            vertical_spacing,
            padding,
        }
    }

    /// Collects the centers of every tile that could be visible on the page.
    ///
    /// Iteration starts one step before the lattice origin and ends one step
    /// past its extent, so that tiles whose center falls just outside the
    /// nominal grid due to padding or rounding are still considered. The
    /// visibility test is an axis-aligned check on the unrotated text box
    /// against the padded page rectangle: it may admit a few tiles whose
    /// rotated footprint never touches the page, but it never rejects one
    /// that would be visible.
    pub fn visible_tile_centers(
        &self,
        page_width: f32,
        page_height: f32,
        text_width: f32,
        text_height: f32,
    ) -> Vec<[f32; 2]> {
        if self.columns == 0 && self.rows == 0 {
            return Vec::new();
        }

        let mut centers = Vec::new();
        for row in -1..=self.rows {
            for column in -1..=self.columns {
                let x = column as f32 * self.horizontal_spacing - self.padding;
                let y = row as f32 * self.vertical_spacing - self.padding;

                let could_be_visible = x + text_width > -self.padding
                    && x < page_width + self.padding
                    && y + text_height > -self.padding
                    && y < page_height + self.padding;
                if could_be_visible {
                    centers.push([x, y]);
                }
            }
        }

        centers
    }
}
