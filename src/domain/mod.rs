pub mod backtest;
pub mod candle;
pub mod decision;
pub mod error;
pub mod fetcher;
pub mod frequency;
pub mod indicator;
pub mod multifactor;
pub mod patterns;
pub mod performance;
pub mod signal;
pub mod simulator;
