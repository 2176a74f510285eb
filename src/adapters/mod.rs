pub mod binance_adapter;
pub mod csv_export;
pub mod file_config_adapter;
pub mod sqlite_store;

pub use binance_adapter::BinanceAdapter;
pub use file_config_adapter::FileConfigAdapter;
pub use sqlite_store::SqliteStore;
