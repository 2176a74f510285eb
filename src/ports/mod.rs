pub mod candle_store;
pub mod config_port;
pub mod exchange_port;

pub use candle_store::CandleStore;
pub use config_port::ConfigPort;
pub use exchange_port::ExchangePort;
