//! Static geospatial lookup tables.
//!
//! Two 181×361 grids indexed `[90 - latitude][180 + longitude]`:
//!   brightness  night-time light intensity per cell
//!   population  cube root of population per cell
//!
//! Both ship as JSON under `data/geo/`, are embedded at compile time, and
//! are parsed once on first use. Lookups outside the grid read as zero.

use crate::error::SimResult;
use std::sync::OnceLock;

pub const GRID_ROWS: usize = 181;
pub const GRID_COLS: usize = 361;

static BRIGHTNESS_JSON: &str = include_str!("../data/geo/brightness.json");
static POPULATION_JSON: &str = include_str!("../data/geo/population.json");

static TABLES: OnceLock<GeoTables> = OnceLock::new();

/// The process-wide tables.
pub fn tables() -> &'static GeoTables {
    TABLES.get_or_init(|| {
        GeoTables::from_json(BRIGHTNESS_JSON, POPULATION_JSON).unwrap_or_else(|e| {
            log::error!("Embedded geo tables unreadable, all lookups read 0: {e}");
            GeoTables::empty()
        })
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<f64>>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        Self { rows }
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.rows.len(), self.rows.first().map_or(0, Vec::len))
    }

    /// The cell at (row, col), or `None` outside the grid. No wraparound.
    pub fn cell(&self, row: i64, col: i64) -> Option<f64> {
        let row = usize::try_from(row).ok()?;
        let col = usize::try_from(col).ok()?;
        self.rows.get(row)?.get(col).copied()
    }

    /// Sum of the `(2r+1)²` block centred on (row, col), skipping any
    /// cell that falls outside the grid.
    pub fn window_sum(&self, row: i64, col: i64, radius: i64) -> f64 {
        let mut sum = 0.0;
        for r in (row - radius)..=(row + radius) {
            for c in (col - radius)..=(col + radius) {
                sum += self.cell(r, c).unwrap_or(0.0);
            }
        }
        sum
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeoTables {
    pub brightness: Grid,
    pub population: Grid,
}

impl GeoTables {
    pub fn from_json(brightness: &str, population: &str) -> SimResult<Self> {
        Ok(Self {
            brightness: Grid::new(serde_json::from_str(brightness)?),
            population: Grid::new(serde_json::from_str(population)?),
        })
    }

    pub fn empty() -> Self {
        Self { brightness: Grid::new(vec![]), population: Grid::new(vec![]) }
    }

    pub fn brightness_at(&self, latitude: i32, longitude: i32) -> f64 {
        let (row, col) = grid_index(latitude, longitude);
        self.brightness.cell(row, col).unwrap_or(0.0)
    }

    pub fn population_window(&self, latitude: i32, longitude: i32, radius: i64) -> f64 {
        let (row, col) = grid_index(latitude, longitude);
        self.population.window_sum(row, col, radius)
    }
}

/// Grid (row, col) of a coordinate in integer degrees.
pub fn grid_index(latitude: i32, longitude: i32) -> (i64, i64) {
    (90 - i64::from(latitude), 180 + i64::from(longitude))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> Grid {
        Grid::new(vec![
            vec![1.0, 2.0, 3.0],
            vec![4.0, 5.0, 6.0],
            vec![7.0, 8.0, 9.0],
        ])
    }

    #[test]
    fn cell_outside_grid_is_none() {
        let grid = tiny();
        assert_eq!(grid.cell(1, 1), Some(5.0));
        assert_eq!(grid.cell(-1, 0), None);
        assert_eq!(grid.cell(0, 3), None);
    }

    #[test]
    fn window_sum_drops_out_of_bounds_cells() {
        let grid = tiny();
        assert_eq!(grid.window_sum(1, 1, 1), 45.0);
        // Corner: only the 2×2 block inside the grid counts.
        assert_eq!(grid.window_sum(0, 0, 1), 1.0 + 2.0 + 4.0 + 5.0);
        assert_eq!(grid.window_sum(10, 10, 1), 0.0);
    }

    #[test]
    fn embedded_tables_have_full_dimensions() {
        let t = tables();
        assert_eq!(t.brightness.dimensions(), (GRID_ROWS, GRID_COLS));
        assert_eq!(t.population.dimensions(), (GRID_ROWS, GRID_COLS));
    }

    #[test]
    fn grid_index_maps_poles_and_antimeridian() {
        assert_eq!(grid_index(90, -180), (0, 0));
        assert_eq!(grid_index(-90, 180), (180, 360));
        assert_eq!(grid_index(0, 0), (90, 180));
    }
}
