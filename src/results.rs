use std::collections::HashMap;

use log::warn;

use crate::error::{GridError, Result};

/// Active/inactive flags and the compressed active-cell index space.
///
/// Result arrays may be stored per reservoir cell or per active cell
/// only; this mapping translates between the two.
#[derive(Clone, Debug, Default)]
pub struct ActiveCellInfo {
    active_index_per_cell: Vec<Option<usize>>,
    active_count: usize,
}

impl ActiveCellInfo {
    pub fn all_active(cell_count: usize) -> Self {
        Self {
            active_index_per_cell: (0..cell_count).map(Some).collect(),
            active_count: cell_count,
        }
    }

    pub fn from_flags(flags: &[bool]) -> Self {
        let mut active_index_per_cell = Vec::with_capacity(flags.len());
        let mut active_count = 0;
        for &flag in flags {
            if flag {
                active_index_per_cell.push(Some(active_count));
                active_count += 1;
            } else {
                active_index_per_cell.push(None);
            }
        }
        Self {
            active_index_per_cell,
            active_count,
        }
    }

    #[inline]
    pub fn reservoir_cell_count(&self) -> usize {
        self.active_index_per_cell.len()
    }

    #[inline]
    pub fn active_cell_count(&self) -> usize {
        self.active_count
    }

    #[inline]
    pub fn is_active(&self, reservoir_cell_index: usize) -> bool {
        self.active_index_per_cell
            .get(reservoir_cell_index)
            .is_some_and(|v| v.is_some())
    }

    /// Compressed active index of a reservoir cell, `None` for inactive.
    #[inline]
    pub fn active_index(&self, reservoir_cell_index: usize) -> Option<usize> {
        self.active_index_per_cell.get(reservoir_cell_index).copied().flatten()
    }
}

/// Result array categories, mirroring how the surrounding application
/// groups per-cell properties.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResultCategory {
    StaticNative,
    DynamicNative,
    Generated,
}

/// Key addressing one named result series.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResultAddress {
    pub category: ResultCategory,
    pub name: String,
}

impl ResultAddress {
    pub fn new(category: ResultCategory, name: &str) -> Self {
        Self {
            category,
            name: name.to_string(),
        }
    }

    pub fn static_result(name: &str) -> Self {
        Self::new(ResultCategory::StaticNative, name)
    }

    pub fn dynamic_result(name: &str) -> Self {
        Self::new(ResultCategory::DynamicNative, name)
    }
}

/// Which index space a stored array uses, detected from its length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressingSpace {
    AllCells,
    ActiveCells,
}

/// Named per-cell scalar arrays, one vector per time step.
///
/// Static properties carry a single time step. Arrays are stored as
/// given; whether an array is addressed by reservoir cell index or by
/// active cell index is detected by comparing its length against the
/// known cell counts.
#[derive(Default)]
pub struct CaseCellResults {
    results: HashMap<ResultAddress, Vec<Vec<f64>>>,
}

impl CaseCellResults {
    pub fn set_result(&mut self, address: ResultAddress, time_steps: Vec<Vec<f64>>) {
        self.results.insert(address, time_steps);
    }

    pub fn has_result(&self, address: &ResultAddress) -> bool {
        self.results.contains_key(address)
    }

    pub fn result_values(&self, address: &ResultAddress, time_step: usize) -> Result<&[f64]> {
        self.results
            .get(address)
            .and_then(|steps| steps.get(time_step))
            .map(|v| v.as_slice())
            .ok_or_else(|| GridError::MissingResultArray {
                name: address.name.clone(),
            })
    }

    /// Detect the addressing space of an array by its length.
    pub fn addressing_space(
        values: &[f64],
        active_cell_info: &ActiveCellInfo,
    ) -> Option<AddressingSpace> {
        if values.len() == active_cell_info.reservoir_cell_count() {
            Some(AddressingSpace::AllCells)
        } else if values.len() == active_cell_info.active_cell_count() {
            Some(AddressingSpace::ActiveCells)
        } else {
            warn!(
                "result array length {} matches neither cell count {} nor active count {}",
                values.len(),
                active_cell_info.reservoir_cell_count(),
                active_cell_info.active_cell_count()
            );
            None
        }
    }

    /// Value for one reservoir cell, resolving the array's addressing
    /// space. Inactive cells read `None` from active-cell arrays.
    pub fn cell_scalar(
        &self,
        address: &ResultAddress,
        time_step: usize,
        reservoir_cell_index: usize,
        active_cell_info: &ActiveCellInfo,
    ) -> Option<f64> {
        let values = self.result_values(address, time_step).ok()?;
        match Self::addressing_space(values, active_cell_info)? {
            AddressingSpace::AllCells => values.get(reservoir_cell_index).copied(),
            AddressingSpace::ActiveCells => {
                let active_index = active_cell_info.active_index(reservoir_cell_index)?;
                values.get(active_index).copied()
            }
        }
    }
}
