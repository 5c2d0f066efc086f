//! Price acquisition collaborators: providers, alignment, and the per-session
//! return cache. The core itself never touches these.

pub mod acquire;
pub mod align;
pub mod cache;
pub mod circuit_breaker;
pub mod csv_import;
pub mod provider;
pub mod synthetic;
pub mod yahoo;

pub use acquire::{load_returns, LoadedReturns, ReturnRequest};
pub use align::{align_series, AlignedPrices};
pub use cache::{ReturnCache, ReturnKey};
pub use circuit_breaker::CircuitBreaker;
pub use csv_import::CsvPriceProvider;
pub use provider::{DataError, DataSource, PricePoint, PriceProvider, PriceSeries};
pub use synthetic::SyntheticProvider;
pub use yahoo::YahooProvider;
