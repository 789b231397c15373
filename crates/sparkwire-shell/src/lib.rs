//! Interactive REPL transport for sparkwire.
//!
//! A `spark-shell` connection starts `spark-shell`, `pyspark` or `spark-sql`
//! under `sh -c`, feeds it wrapped statements and treats the prompt as the
//! end-of-statement fence. Failures are detected by scraping the output.

pub mod dialect;
pub mod executor;
pub mod scrape;
pub mod session;

pub use dialect::{Dialect, SCRATCH_PATH};
pub use executor::ShellQueryExecutor;
pub use scrape::check_output;
pub use session::ShellSession;
