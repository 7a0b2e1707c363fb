//! Cross-cutting helpers: filesystem primitives and terminal progress.

pub mod fs;
pub mod progress;

pub use fs::{atomic_write, ensure_dir, with_suffix};
pub use progress::{DownloadProgress, spinner};
