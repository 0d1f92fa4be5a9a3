//! Core engine: price poll → condition → balances → size → quote → swap.

pub mod balances;
pub mod executor;
pub mod fees;
pub mod price_feed;
pub mod swap_engine;

pub use balances::BalanceReader;
pub use executor::{ExecutorSettings, SwapExecutor};
pub use fees::{FeeStrategy, FixedFees, NodeFees};
pub use price_feed::PriceFeed;
pub use swap_engine::{EngineSettings, IterationReport, SwapEngine};
