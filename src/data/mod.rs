pub mod connectors;
pub mod price_table;
pub mod window;

pub use connectors::{CsvConnector, DataValidator, DatasetMetadata};
pub use price_table::{IndicatorKey, PriceTable};
pub use window::DateWindow;
