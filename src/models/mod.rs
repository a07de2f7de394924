pub mod candle;
pub mod direction;
pub mod signal;
pub mod timeframe;

pub use candle::{Candle, CandleSeries};
pub use direction::{Breakout, Direction, Tier, Trend};
pub use signal::{Signal, TargetLevel};
pub use timeframe::Timeframe;
