pub mod config;
pub mod context;
pub mod executor;
pub mod file_ext;
pub mod folder_job;
pub mod operation;
pub mod pipeline;
pub mod registry;
pub mod result_error;
pub mod shell;
pub mod transport;
pub mod validate;

use std::num::NonZero;

/// Number of cores this process may use, at least 1.
pub fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(NonZero::get)
        .unwrap_or(1)
}
