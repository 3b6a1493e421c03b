use super::{Context, ui};
use crate::core::currency::parse_pair;
use crate::core::rate::RateSample;
use anyhow::{Context as _, Result, anyhow, bail};
use chrono::{Local, NaiveDate, TimeDelta};
use comfy_table::Cell;

pub async fn run(ctx: &Context, base: &str, target: &str, days: u32) -> Result<()> {
    let (base, target) = parse_pair(base, target, &ctx.config.currencies)?;
    let (start, end) = window(Local::now().date_naive(), days)?;

    let pb = ui::new_spinner("Fetching history...");
    let samples = ctx.source.series(&base, &target, start, end).await;
    pb.finish_and_clear();
    let samples =
        samples.with_context(|| format!("Failed to fetch {base}/{target} history"))?;

    if samples.is_empty() {
        println!("No rates published between {start} and {end}.");
        return Ok(());
    }

    println!(
        "\n{}",
        ui::style_text(
            &format!("{base}/{target}, last {days} days"),
            ui::StyleType::Title
        )
    );
    display(&samples);
    Ok(())
}

/// The `days`-long range ending at `end`.
pub fn window(end: NaiveDate, days: u32) -> Result<(NaiveDate, NaiveDate)> {
    if days == 0 {
        bail!("History needs at least one day");
    }
    let start = TimeDelta::try_days(i64::from(days))
        .and_then(|span| end.checked_sub_signed(span))
        .ok_or_else(|| anyhow!("History of {days} days reaches before the earliest date"))?;
    Ok((start, end))
}

/// Lowest and highest sample, earliest wins on ties.
pub fn extremes(samples: &[RateSample]) -> Option<(RateSample, RateSample)> {
    let first = *samples.first()?;
    Some(samples.iter().fold((first, first), |(lo, hi), s| {
        (
            if s.rate < lo.rate { *s } else { lo },
            if s.rate > hi.rate { *s } else { hi },
        )
    }))
}

fn display(samples: &[RateSample]) {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Date"), ui::header_cell("Rate")]);
    for sample in samples {
        table.add_row(vec![
            Cell::new(sample.as_of.to_string()),
            ui::number_cell(format!("{:.4}", sample.rate)),
        ]);
    }
    println!("{table}");

    if let Some((lo, hi)) = extremes(samples) {
        let mut summary = ui::new_styled_table();
        summary.set_header(vec![
            ui::header_cell("Low"),
            ui::header_cell("High"),
            ui::header_cell("Change"),
        ]);
        let change = samples
            .last()
            .map(|last| last.rate - samples[0].rate)
            .unwrap_or_default();
        summary.add_row(vec![
            ui::number_cell(format!("{:.4} ({})", lo.rate, lo.as_of)),
            ui::number_cell(format!("{:.4} ({})", hi.rate, hi.as_of)),
            ui::change_cell(change),
        ]);
        println!("{summary}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(day: u32, rate: f64) -> RateSample {
        RateSample {
            rate,
            as_of: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
        }
    }

    #[test]
    fn test_extremes() {
        let samples = vec![sample(1, 150.0), sample(2, 148.5), sample(3, 152.0), sample(6, 148.5)];
        let (lo, hi) = extremes(&samples).unwrap();
        assert_eq!(lo, sample(2, 148.5));
        assert_eq!(hi, sample(3, 152.0));
    }

    #[test]
    fn test_extremes_empty() {
        assert!(extremes(&[]).is_none());
    }

    #[test]
    fn test_window() {
        let end = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        assert_eq!(
            window(end, 30).unwrap(),
            (NaiveDate::from_ymd_opt(2024, 4, 10).unwrap(), end)
        );
        assert!(window(end, 0).is_err());
    }

    #[test]
    fn test_window_out_of_range_is_an_error() {
        let end = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let err = window(end, u32::MAX).unwrap_err();
        assert!(err.to_string().contains("earliest date"));
    }
}
