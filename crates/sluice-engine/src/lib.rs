//! Sluice Engine - streaming log consumer with rotation and retention
//!
//! The engine reads newline-delimited bytes from an input stream and
//! appends them to a single active file, rotating it to a retired name
//! when a size or line-count threshold is crossed, flushing on a
//! background timer, and pruning old retired files after each rotation.
//!
//! ## Usage
//!
//! ```no_run
//! use sluice_core::Config;
//! use sluice_engine::{Consumer, NoProcessor};
//!
//! # #[tokio::main]
//! # async fn main() -> sluice_core::Result<()> {
//! let config = Config {
//!     max_lines: 10_000,
//!     ..Config::default()
//! };
//! let consumer = Consumer::new(config, Box::new(NoProcessor));
//! consumer.start(tokio::io::stdin()).await?;
//! # Ok(())
//! # }
//! ```

mod consumer;
mod naming;
mod processor;
mod retention;

pub use consumer::Consumer;
pub use naming::NamingPolicy;
pub use processor::{processor_for, LineProcessor, NoProcessor, PrefixProcessor};
pub use retention::RetentionSweeper;
