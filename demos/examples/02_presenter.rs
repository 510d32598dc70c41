use candela::{
    ChartSession, DisplaySeries, Presenter, TimeRange, candles, line, volume_bars,
};
use candela_demos::common::get_source;

/// Prints what a chart widget would draw.
struct ConsolePresenter;

impl Presenter for ConsolePresenter {
    fn render(&mut self, series: &DisplaySeries, density: f64) {
        let bars = candles(series);
        let volumes = volume_bars(series);
        let closes = line(series);
        println!("{} candles at width {density:.2}", bars.len());
        for (bar, vol) in bars.iter().zip(&volumes).take(5) {
            let dir = if vol.up { "up" } else { "down" };
            println!(
                "  t={} o={:.2} h={:.2} l={:.2} c={:.2} vol={:.2} {dir}",
                bar.time, bar.open, bar.high, bar.low, bar.close, vol.value
            );
        }
        if let (Some(first), Some(last)) = (closes.first(), closes.last()) {
            println!("  close {:.2} -> {:.2}", first.value, last.value);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let session = ChartSession::builder().source(get_source()).build()?;
    session.show_range(TimeRange::Day, None, 10_000).await?;

    session.render(ConsolePresenter).await;

    if let Some(s) = session.summary().await {
        println!(
            "min={:.2} max={:.2} change={:.2} ({:.2}%) volume={:.2} points={}",
            s.min_price, s.max_price, s.change, s.change_pct, s.total_volume, s.data_points
        );
    }
    Ok(())
}
