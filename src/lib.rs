//! A fixed three-layer feed-forward network trained by backpropagation with
//! momentum, for single-variable time-series forecasting.

mod network;
mod series;

// Re-export the public types at the crate root
pub use network::{Network, NetworkError};
pub use series::{Sample, Scaler, sliding_windows};
