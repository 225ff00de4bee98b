//! Placeholder price series for when no provider has history.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use rand::Rng;
use rust_decimal::Decimal;

use crate::models::{ist_offset, HistoryPeriod, HistoryPoint};

/// Anchor used for symbols the catalog doesn't know.
const DEFAULT_ANCHOR: Decimal = Decimal::ONE_THOUSAND;

const MARKET_OPEN: (u32, u32) = (9, 15);
const MARKET_CLOSE: &str = "15:30";

/// Random-walk series ending at `anchor`, on trading-day timestamps
/// counting back from `now` in IST.
///
/// Callers must label the result as synthetic; nothing here resembles real
/// market data beyond its shape.
pub fn synthetic_series<R: Rng + ?Sized>(
    anchor: Option<Decimal>,
    period: HistoryPeriod,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Vec<HistoryPoint> {
    let anchor = anchor
        .filter(|a| *a > Decimal::ZERO)
        .unwrap_or(DEFAULT_ANCHOR);
    let count = period.synthetic_points();
    let timestamps = timestamps(period, now, count);

    // Walk backwards from the anchor so the latest point is the anchor.
    let max_step_bp: i64 = match period {
        HistoryPeriod::Intraday => 20,
        HistoryPeriod::ThreeYears => 300,
        _ => 150,
    };
    let floor = Decimal::ONE;
    let mut prices = Vec::with_capacity(timestamps.len());
    let mut price = anchor;
    for _ in 0..timestamps.len() {
        prices.push(price.round_dp(2));
        let step = Decimal::new(rng.gen_range(-max_step_bp..=max_step_bp), 4);
        price = (price * (Decimal::ONE - step)).max(floor);
    }
    prices.reverse();

    timestamps
        .into_iter()
        .zip(prices)
        .map(|((date, time), price)| HistoryPoint {
            date: date.format("%Y-%m-%d").to_string(),
            time,
            price,
            volume: rng.gen_range(10_000..5_000_000),
        })
        .collect()
}

fn is_trading_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn last_trading_day(mut date: NaiveDate) -> NaiveDate {
    while !is_trading_day(date) {
        date = date.pred_opt().unwrap_or(date);
    }
    date
}

/// `(date, HH:MM)` pairs in ascending order.
fn timestamps(period: HistoryPeriod, now: DateTime<Utc>, count: usize) -> Vec<(NaiveDate, String)> {
    let today = last_trading_day(now.with_timezone(&ist_offset()).date_naive());

    let mut out: Vec<(NaiveDate, String)> = match period {
        HistoryPeriod::Intraday => {
            let open = NaiveTime::from_hms_opt(MARKET_OPEN.0, MARKET_OPEN.1, 0).unwrap_or_default();
            (0..count)
                .rev()
                .map(|i| {
                    let time = open + Duration::minutes(5 * i as i64);
                    (today, time.format("%H:%M").to_string())
                })
                .collect()
        }
        HistoryPeriod::ThreeYears => (0..count)
            .map(|i| (today - Duration::weeks(i as i64), MARKET_CLOSE.to_string()))
            .collect(),
        _ => {
            let mut days = Vec::with_capacity(count);
            let mut date = today;
            while days.len() < count {
                if is_trading_day(date) {
                    days.push((date, MARKET_CLOSE.to_string()));
                }
                match date.pred_opt() {
                    Some(prev) => date = prev,
                    None => break,
                }
            }
            days
        }
    };

    out.reverse();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rust_decimal_macros::dec;

    fn saturday_evening() -> DateTime<Utc> {
        // 2024-06-15 is a Saturday
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_series_ends_at_anchor() {
        let mut rng = StdRng::seed_from_u64(7);
        let points = synthetic_series(
            Some(dec!(3950.50)),
            HistoryPeriod::OneMonth,
            saturday_evening(),
            &mut rng,
        );

        assert_eq!(points.len(), HistoryPeriod::OneMonth.synthetic_points());
        assert_eq!(points.last().unwrap().price, dec!(3950.50));
        assert_eq!(points.last().unwrap().date, "2024-06-14");
        assert!(points.iter().all(|p| p.price >= Decimal::ONE));
        assert!(points.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_daily_series_skips_weekends() {
        let mut rng = StdRng::seed_from_u64(1);
        let points = synthetic_series(None, HistoryPeriod::ThreeMonths, saturday_evening(), &mut rng);

        for point in &points {
            let date = NaiveDate::parse_from_str(&point.date, "%Y-%m-%d").unwrap();
            assert!(is_trading_day(date), "{} is a weekend", point.date);
        }
        assert_eq!(points.last().unwrap().price, DEFAULT_ANCHOR);
    }

    #[test]
    fn test_intraday_series_runs_from_open() {
        let mut rng = StdRng::seed_from_u64(3);
        let points = synthetic_series(Some(dec!(812.40)), HistoryPeriod::Intraday, saturday_evening(), &mut rng);

        assert_eq!(points.len(), 75);
        assert_eq!(points[0].time, "09:15");
        assert_eq!(points[1].time, "09:20");
        assert_eq!(points.last().unwrap().time, "15:25");
        assert!(points.iter().all(|p| p.date == "2024-06-14"));
    }

    #[test]
    fn test_three_year_series_is_weekly() {
        let mut rng = StdRng::seed_from_u64(11);
        let points = synthetic_series(Some(dec!(100)), HistoryPeriod::ThreeYears, saturday_evening(), &mut rng);

        assert_eq!(points.len(), 156);
        let first = NaiveDate::parse_from_str(&points[0].date, "%Y-%m-%d").unwrap();
        let second = NaiveDate::parse_from_str(&points[1].date, "%Y-%m-%d").unwrap();
        assert_eq!(second - first, Duration::weeks(1));
    }
}
