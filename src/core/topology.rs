//! Shape of an N-dimensional index space.
//!
//! Both the input space and the column space are N-dimensional grids addressed by flat, row-major
//! indices. Potential pools are drawn from an input neighborhood around each column's center, and
//! local inhibition compares a column with the columns in its own neighborhood; `Topology` does the
//! index/coordinate arithmetic for both.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Dimensions of a grid plus their row-major strides (the last dimension varies fastest).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    dims: Vec<usize>,
    strides: Vec<usize>,
}

impl Topology {
    pub fn new(dimensions: &[usize]) -> Self {
        let mut strides = vec![1; dimensions.len()];
        for axis in (1..dimensions.len()).rev() {
            strides[axis - 1] = strides[axis] * dimensions[axis];
        }
        Self {
            dims: dimensions.to_vec(),
            strides,
        }
    }

    #[inline]
    pub fn dimensions(&self) -> &[usize] {
        &self.dims
    }

    /// Number of dimensions.
    #[inline]
    pub fn num_dimensions(&self) -> usize {
        self.dims.len()
    }

    /// Total number of addressable elements.
    #[inline]
    pub fn size(&self) -> usize {
        self.dims.iter().product()
    }

    /// The largest dimension.
    #[inline]
    pub fn max_dimension(&self) -> usize {
        self.dims.iter().copied().max().unwrap_or(0)
    }

    /// Coordinates of a flat index, one per dimension.
    pub fn coordinates(&self, index: usize) -> Vec<usize> {
        self.strides
            .iter()
            .zip(&self.dims)
            .map(|(&stride, &dim)| (index / stride) % dim)
            .collect()
    }

    /// Flat index of `coords`, which must hold one coordinate per dimension.
    #[inline]
    pub fn index_from_coordinates(&self, coords: &[usize]) -> usize {
        debug_assert_eq!(coords.len(), self.dims.len());
        coords.iter().zip(&self.strides).map(|(&c, &s)| c * s).sum()
    }

    /// Iterates over the indices within `radius` of `center` along every dimension, in row-major
    /// order of the (unwrapped) box around the center.
    ///
    /// With `wrapping` the box continues on the opposite edge but never covers more than one full
    /// dimension, so every index is visited at most once. Without it the box is clipped.
    pub fn neighborhood(&self, center: usize, radius: usize, wrapping: bool) -> NeighborhoodIter<'_> {
        let ranges: Vec<Range<isize>> = self
            .coordinates(center)
            .into_iter()
            .zip(&self.dims)
            .map(|(c, &dim)| axis_range(c as isize, radius as isize, dim as isize, wrapping))
            .collect();

        let done = ranges.iter().any(|r| r.is_empty());
        NeighborhoodIter {
            topology: self,
            cursor: ranges.iter().map(|r| r.start).collect(),
            ranges,
            wrapping,
            done,
        }
    }
}

/// Extent of a neighborhood along one axis.
fn axis_range(center: isize, radius: isize, dim: isize, wrapping: bool) -> Range<isize> {
    if wrapping {
        let start = center - radius;
        start..(center + radius + 1).min(start + dim)
    } else {
        (center - radius).max(0)..(center + radius + 1).min(dim)
    }
}

/// Iterator over the flat indices of a neighborhood, see [`Topology::neighborhood`].
pub struct NeighborhoodIter<'a> {
    topology: &'a Topology,
    ranges: Vec<Range<isize>>,
    cursor: Vec<isize>,
    wrapping: bool,
    done: bool,
}

impl NeighborhoodIter<'_> {
    /// Moves the cursor like an odometer, last dimension first.
    fn advance(&mut self) {
        for axis in (0..self.cursor.len()).rev() {
            self.cursor[axis] += 1;
            if self.cursor[axis] < self.ranges[axis].end {
                return;
            }
            self.cursor[axis] = self.ranges[axis].start;
        }
        self.done = true;
    }
}

impl Iterator for NeighborhoodIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.done {
            return None;
        }

        let index = self
            .cursor
            .iter()
            .zip(&self.topology.dims)
            .zip(&self.topology.strides)
            .map(|((&c, &dim), &stride)| {
                let c = if self.wrapping { c.rem_euclid(dim as isize) } else { c };
                c as usize * stride
            })
            .sum();

        self.advance();
        Some(index)
    }

    /// Size of the whole neighborhood, not of what is left of it.
    fn size_hint(&self) -> (usize, Option<usize>) {
        let count = self.ranges.iter().map(|r| r.len()).product();
        (count, Some(count))
    }
}
