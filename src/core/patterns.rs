use crate::models::{Breakout, Candle, CandleSeries, Direction, Trend};

const PIN_MAX_BODY_RATIO: f64 = 0.3;
const PIN_MIN_WICK_MULT: f64 = 2.0;
const PIN_MIN_CLOSE_POSITION: f64 = 0.6;

/// Higher-timeframe trend: newest close vs the close `lookback` bars back.
/// Fails closed to Flat when history is short.
pub fn trend(bars: &CandleSeries, lookback: usize) -> Trend {
    if bars.len() <= lookback {
        return Trend::Flat;
    }
    let newest = bars[bars.len() - 1].close;
    let reference = bars[bars.len() - 1 - lookback].close;
    if newest > reference {
        Trend::Up
    } else if newest < reference {
        Trend::Down
    } else {
        Trend::Flat
    }
}

/// Envelope breakout: the newest close beyond the high/low of the preceding
/// `window` bars (newest bar excluded from the envelope), within `tolerance`.
pub fn breakout(bars: &CandleSeries, window: usize, tolerance: f64) -> Breakout {
    if bars.len() < window + 1 {
        return Breakout::None;
    }
    let newest = bars[bars.len() - 1].clone();
    let tail = bars.tail(window + 1);
    let prior = &tail.as_slice()[..window];
    let env_high = prior.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    let env_low = prior.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);

    // Tolerance is lenient: a close within it on the inside of the envelope
    // extreme already counts as a break.
    if newest.close > env_high * (1.0 - tolerance) {
        Breakout::Up
    } else if newest.close < env_low * (1.0 + tolerance) {
        Breakout::Down
    } else {
        Breakout::None
    }
}

/// Swing highs and lows over the last `lookback` bars: a bar whose high (low)
/// is the extreme of its +/- `window` neighbourhood.
pub fn swing_levels(bars: &CandleSeries, lookback: usize, window: usize) -> Vec<f64> {
    let bars = bars.tail(lookback);
    let len = bars.len();
    let mut levels = Vec::new();
    if len <= window * 2 {
        return levels;
    }

    for i in window..(len - window) {
        let lo = i - window;
        let hi = (i + window).min(len - 1);

        let current_high = bars[i].high;
        if (lo..=hi).all(|j| bars[j].high <= current_high) {
            levels.push(current_high);
        }

        let current_low = bars[i].low;
        if (lo..=hi).all(|j| bars[j].low >= current_low) {
            levels.push(current_low);
        }
    }
    levels
}

/// "Looking left": true when the nearest swing level sits within
/// `threshold` relative distance of the current price.
pub fn structure_aligned(price: f64, levels: &[f64], threshold: f64) -> bool {
    if price <= 0.0 {
        return false;
    }
    levels
        .iter()
        .map(|lvl| (price - lvl).abs() / price)
        .fold(None, |best: Option<f64>, d| match best {
            Some(b) if b <= d => Some(b),
            _ => Some(d),
        })
        .map(|nearest| nearest < threshold)
        .unwrap_or(false)
}

/// Pin-bar reversal: small body, one dominant wick, close pinned to the
/// opposite extreme. The only condition allowed to trigger a signal.
pub fn pin_bar(candle: &Candle) -> Option<Direction> {
    let range = candle.total_range();
    if range <= 0.0 {
        return None;
    }
    let body = candle.body();
    if body / range >= PIN_MAX_BODY_RATIO {
        return None;
    }

    let lower_wick = candle.lower_wick();
    let upper_wick = candle.upper_wick();

    if lower_wick > PIN_MIN_WICK_MULT * body
        && (candle.body_top() - candle.low) / range > PIN_MIN_CLOSE_POSITION
    {
        return Some(Direction::Buy);
    }
    if upper_wick > PIN_MIN_WICK_MULT * body
        && (candle.high - candle.body_bottom()) / range > PIN_MIN_CLOSE_POSITION
    {
        return Some(Direction::Sell);
    }
    None
}
