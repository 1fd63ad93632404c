//! CPU-side element buffers and their device mirrors.
//!
//! Performance characteristics:
//! - capacity only grows (by doubling) and survives `clear()`, so steady-state
//!   frames allocate nothing once the largest batch has been seen
//! - device uploads are skipped when nothing was pushed, and only the used
//!   prefix is transferred unless device storage has to grow

mod gpu;
mod index;
mod typed;

pub use gpu::{GpuBuffer, Upload};
pub use index::QuadIndexBuffer;
pub use typed::GrowableBuffer;
