//! relay-axum: Axum surface for the stream relay.
//!
//! Serves `GET /dl/{handle}/{name}` and `GET /dl/{handle}` with HTTP range
//! support on top of a [`relay_stream::StreamRelay`], plus `/` and `/health`.

pub mod app;
pub mod download;
mod error;
pub mod filename;
pub mod range;
pub mod state;
pub use error::{api_error_for, RelayAxumError};
pub use state::RelayState;

pub use app::{axum, RelayApp};
pub use filename::sanitize_file_name;
pub use range::parse_range_header;
