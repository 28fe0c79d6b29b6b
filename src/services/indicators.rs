//! 技术指标计算
//!
//! 输入为按日期升序的 K 线序列，各指标互相独立：
//! 某个指标数据不足只会把它自己标记为 insufficient_data。
//!
//! - 均线: MA5 / MA10 / MA20 / MA60（不足 60 日按全部数据）
//! - MACD: EMA12 - EMA26，信号线为 DIF 的 EMA9，至少 26 日
//! - RSI: 14 日简单平均涨跌幅，至少 15 个收盘价（14 个差值）
//! - 布林带: 20 日均值 ± 2 倍总体标准差，至少 20 日

use crate::models::{
    BandPosition, BollingerBands, CrossSignal, IndicatorSet, Macd, MacdSignal, MovingAverages,
    OhlcvSeries, Rsi, RsiSignal, TrendSignal,
};

const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;
const RSI_PERIOD: usize = 14;
const BOLL_PERIOD: usize = 20;
const BOLL_WIDTH: f64 = 2.0;
const RSI_OVERBOUGHT: f64 = 70.0;
const RSI_OVERSOLD: f64 = 30.0;

/// 计算全部指标
pub fn compute(series: &OhlcvSeries) -> IndicatorSet {
    let closes = series.closes();
    IndicatorSet {
        periods: closes.len(),
        moving_averages: moving_averages(&closes),
        macd: macd(&closes),
        rsi: rsi(&closes),
        bollinger: bollinger(&closes),
    }
}

/// 以 `values[..end]` 的最后 `period` 个值计算简单均值
fn sma_ending_at(values: &[f64], period: usize, end: usize) -> Option<f64> {
    if period == 0 || end > values.len() || end < period {
        return None;
    }
    let window = &values[end - period..end];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// 最后 `period` 个值的简单均值
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    sma_ending_at(values, period, values.len())
}

/// 指数移动平均，alpha = 2 / (span + 1)，以第一个值为初值
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut result = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &v in values {
        let next = match prev {
            Some(p) => alpha * v + (1.0 - alpha) * p,
            None => v,
        };
        result.push(next);
        prev = Some(next);
    }
    result
}

pub fn moving_averages(closes: &[f64]) -> MovingAverages {
    let n = closes.len();
    let ma5 = sma(closes, 5);
    let ma20 = sma(closes, 20);

    let trend = match (ma5, ma20) {
        (Some(fast), Some(slow)) if fast > slow => TrendSignal::Up,
        (Some(_), Some(_)) => TrendSignal::Down,
        _ => TrendSignal::InsufficientData,
    };

    let prev5 = n.checked_sub(1).and_then(|end| sma_ending_at(closes, 5, end));
    let prev20 = n.checked_sub(1).and_then(|end| sma_ending_at(closes, 20, end));
    let cross = match (prev5, prev20, ma5, ma20) {
        (Some(p5), Some(p20), Some(c5), Some(c20)) => {
            if p5 <= p20 && c5 > c20 {
                CrossSignal::GoldenCross
            } else if p5 >= p20 && c5 < c20 {
                CrossSignal::DeathCross
            } else {
                CrossSignal::None
            }
        }
        _ => CrossSignal::InsufficientData,
    };

    MovingAverages {
        ma5,
        ma10: sma(closes, 10),
        ma20,
        ma60: sma(closes, n.min(60)),
        trend,
        cross,
    }
}

pub fn macd(closes: &[f64]) -> Macd {
    if closes.len() < MACD_SLOW {
        return Macd {
            macd: None,
            signal: None,
            histogram: None,
            label: MacdSignal::InsufficientData,
        };
    }

    let fast = ema(closes, MACD_FAST);
    let slow = ema(closes, MACD_SLOW);
    let dif: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let dea = ema(&dif, MACD_SIGNAL);

    match (dif.last(), dea.last()) {
        (Some(&line), Some(&signal)) => {
            let histogram = line - signal;
            Macd {
                macd: Some(line),
                signal: Some(signal),
                histogram: Some(histogram),
                label: if histogram > 0.0 {
                    MacdSignal::Bullish
                } else {
                    MacdSignal::Bearish
                },
            }
        }
        _ => Macd {
            macd: None,
            signal: None,
            histogram: None,
            label: MacdSignal::InsufficientData,
        },
    }
}

/// 14 期 RSI，"14 期"指 14 个相邻收盘价的涨跌差值，因此需要 15 个收盘价
pub fn rsi(closes: &[f64]) -> Rsi {
    let insufficient = Rsi {
        value: None,
        label: RsiSignal::InsufficientData,
    };
    if closes.len() < RSI_PERIOD + 1 {
        return insufficient;
    }

    let recent = &closes[closes.len() - RSI_PERIOD - 1..];
    let (gain, loss) = recent
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0, 0.0), |(g, l), d| {
            if d > 0.0 {
                (g + d, l)
            } else {
                (g, l - d)
            }
        });
    let avg_gain = gain / RSI_PERIOD as f64;
    let avg_loss = loss / RSI_PERIOD as f64;

    // 无下跌时 RS 无穷大，RSI 取上限；完全无波动时无定义
    let value = if avg_loss == 0.0 {
        if avg_gain > 0.0 {
            100.0
        } else {
            return insufficient;
        }
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    };

    let label = if value > RSI_OVERBOUGHT {
        RsiSignal::Overbought
    } else if value < RSI_OVERSOLD {
        RsiSignal::Oversold
    } else {
        RsiSignal::Neutral
    };

    Rsi {
        value: Some(value),
        label,
    }
}

pub fn bollinger(closes: &[f64]) -> BollingerBands {
    let middle = match sma(closes, BOLL_PERIOD) {
        Some(m) => m,
        None => {
            return BollingerBands {
                upper: None,
                middle: None,
                lower: None,
                position: BandPosition::InsufficientData,
            }
        }
    };

    let window = &closes[closes.len() - BOLL_PERIOD..];
    let variance = window.iter().map(|c| (c - middle).powi(2)).sum::<f64>() / BOLL_PERIOD as f64;
    let width = BOLL_WIDTH * variance.sqrt();
    let upper = middle + width;
    let lower = middle - width;

    let position = match closes.last() {
        Some(&c) if c > upper => BandPosition::Above,
        Some(&c) if c < lower => BandPosition::Below,
        Some(_) => BandPosition::Middle,
        None => BandPosition::InsufficientData,
    };

    BollingerBands {
        upper: Some(upper),
        middle: Some(middle),
        lower: Some(lower),
        position,
    }
}
