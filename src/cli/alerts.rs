use super::{Context, ui};
use crate::AlertAction;
use crate::core::alerts::{AlertRequest, Evaluation};
use crate::core::models::RateDropAlertRule;
use anyhow::Result;
use comfy_table::Cell;

pub async fn run(ctx: &Context, action: AlertAction) -> Result<()> {
    let allowed = &ctx.config.currencies;
    match action {
        AlertAction::Check {
            base,
            target,
            threshold,
        } => {
            let request = AlertRequest::parse(&base, &target, &threshold, allowed)?;
            let pb = ui::new_spinner("Checking rate...");
            let evaluation = ctx.alerts.evaluate(&request).await;
            pb.finish_and_clear();
            print_evaluation(&request.base, &request.target, request.threshold, &evaluation);
        }
        AlertAction::CheckAll => {
            let rules = ctx.alerts.rules();
            if rules.is_empty() {
                println!("No rate-drop alerts saved.");
                return Ok(());
            }
            let pb = ui::new_spinner("Checking rates...");
            let results = ctx.alerts.check_all().await;
            pb.finish_and_clear();
            for (rule, evaluation) in &results {
                print_evaluation(&rule.base, &rule.target, rule.threshold, evaluation);
            }
        }
        AlertAction::List => display_rules(&ctx.alerts.rules()),
        AlertAction::Remove {
            base,
            target,
            threshold,
        } => {
            let request = AlertRequest::parse(&base, &target, &threshold, allowed)?;
            if ctx.alerts.remove(&request) {
                println!(
                    "{}",
                    ui::style_text("Alert removed", ui::StyleType::Success)
                );
            } else {
                println!(
                    "{}",
                    ui::style_text("No matching alert", ui::StyleType::Warning)
                );
            }
        }
    }
    Ok(())
}

fn print_evaluation(base: &str, target: &str, threshold: f64, evaluation: &Evaluation) {
    let Some(sample) = evaluation.current_rate else {
        println!(
            "{}",
            ui::style_text(
                &format!("{base}/{target}: current rate unavailable"),
                ui::StyleType::Error
            )
        );
        return;
    };

    let line = format!(
        "{base}/{target}: {:.4} (as of {}), threshold {threshold}",
        sample.rate, sample.as_of
    );
    if evaluation.fired {
        println!(
            "{} {}",
            line,
            ui::style_text("below threshold, notification scheduled", ui::StyleType::Warning)
        );
    } else {
        println!("{line}");
    }
}

fn display_rules(rules: &[RateDropAlertRule]) {
    if rules.is_empty() {
        println!("No rate-drop alerts saved.");
        return;
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Pair"), ui::header_cell("Threshold")]);
    for rule in rules {
        table.add_row(vec![
            Cell::new(format!("{}/{}", rule.base, rule.target)),
            ui::number_cell(rule.threshold.to_string()),
        ]);
    }
    println!("{table}");
}
