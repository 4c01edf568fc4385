/*
 * Spatial Grid Module
 *
 * This module defines the DensityGrid struct used for the dark-band effect.
 * It divides the viewport into square cells, counts the projected points in
 * each cell, and smooths the counts over each cell's 3x3 neighbourhood. The
 * smoothed occupancy, divided by its maximum over the grid, is the local
 * density reported for every primitive.
 *
 * Optimized for performance by:
 * - Using direct coordinate calculations instead of vector operations
 * - Storing counts in a flat row-major vector
 * - Computing the neighbourhood averages once per build
 */

use glam::Vec2;

pub struct DensityGrid {
    pub cell_size: f32,
    pub columns: usize,
    pub rows: usize,
    counts: Vec<u32>,
    averages: Vec<f32>,
    max_average: f32,
}

impl DensityGrid {
    pub fn new(cell_size: f32, width: f32, height: f32) -> Self {
        let cell_size = cell_size.max(1.0);
        let columns = (width.max(0.0) / cell_size).ceil() as usize;
        let rows = (height.max(0.0) / cell_size).ceil() as usize;

        Self {
            cell_size,
            columns,
            rows,
            counts: vec![0; columns * rows],
            averages: vec![0.0; columns * rows],
            max_average: 0.0,
        }
    }

    // Count every position, then compute the smoothed occupancy
    pub fn build<I>(cell_size: f32, width: f32, height: f32, positions: I) -> Self
    where
        I: IntoIterator<Item = Vec2>,
    {
        let mut grid = Self::new(cell_size, width, height);
        for position in positions {
            grid.insert(position);
        }
        grid.compute_averages();
        grid
    }

    // Convert screen coordinates to a cell index; None outside the grid
    #[inline]
    pub fn cell_index(&self, pos: Vec2) -> Option<usize> {
        if pos.x < 0.0 || pos.y < 0.0 {
            return None;
        }
        let grid_x = (pos.x / self.cell_size) as usize;
        let grid_y = (pos.y / self.cell_size) as usize;
        if grid_x >= self.columns || grid_y >= self.rows {
            return None;
        }
        Some(grid_y * self.columns + grid_x)
    }

    #[inline]
    pub fn insert(&mut self, pos: Vec2) {
        if let Some(index) = self.cell_index(pos) {
            self.counts[index] += 1;
        }
    }

    pub fn count(&self, pos: Vec2) -> u32 {
        self.cell_index(pos).map_or(0, |index| self.counts[index])
    }

    // Average each cell's count with its in-bounds 3x3 neighbours
    pub fn compute_averages(&mut self) {
        let columns = self.columns as isize;
        let rows = self.rows as isize;
        self.max_average = 0.0;

        for grid_y in 0..rows {
            for grid_x in 0..columns {
                let mut sum = 0u32;
                let mut cells = 0u32;

                for y_offset in -1..=1 {
                    let check_y = grid_y + y_offset;
                    if check_y < 0 || check_y >= rows {
                        continue;
                    }
                    for x_offset in -1..=1 {
                        let check_x = grid_x + x_offset;
                        if check_x < 0 || check_x >= columns {
                            continue;
                        }
                        sum += self.counts[(check_y * columns + check_x) as usize];
                        cells += 1;
                    }
                }

                let average = sum as f32 / cells as f32;
                self.averages[(grid_y * columns + grid_x) as usize] = average;
                self.max_average = self.max_average.max(average);
            }
        }
    }

    pub fn max_average(&self) -> f32 {
        self.max_average
    }

    // Smoothed occupancy relative to the densest neighbourhood, in [0, 1]
    pub fn density(&self, pos: Vec2) -> f32 {
        if self.max_average <= 0.0 {
            return 0.0;
        }
        self.cell_index(pos)
            .map_or(0.0, |index| self.averages[index] / self.max_average)
    }
}
