use thiserror::Error;

/// Errors raised by the guarded indexing and result-lookup APIs.
///
/// Geometry kernels never return these; degenerate geometry is skipped
/// silently per cell or face. Only indexing contracts and missing
/// result arrays produce hard failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("ijk ({i}, {j}, {k}) outside grid dimensions ({ni}, {nj}, {nk})")]
    IjkOutOfRange {
        i: usize,
        j: usize,
        k: usize,
        ni: usize,
        nj: usize,
        nk: usize,
    },

    #[error("cell index {index} outside cell count {count}")]
    CellIndexOutOfRange { index: usize, count: usize },

    #[error("grid index {index} outside grid count {count}")]
    GridIndexOutOfRange { index: usize, count: usize },

    #[error("result array '{name}' not found")]
    MissingResultArray { name: String },
}

pub type Result<T> = std::result::Result<T, GridError>;
