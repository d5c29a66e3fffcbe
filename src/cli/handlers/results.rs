//! Result-set rendering: shared by `compile` and `show`.

use anyhow::Result;
use colored::Colorize;

use crate::cli::output::{
    fill_in_label, output_json, print_error, print_failure, print_header, print_hint, print_kv,
    print_note, print_table, rule_status, DetailLevel, OutputMode,
};
use crate::init::AppContext;
use crate::models::{BeatResult, EpisodeResultSet, RuleStatus};

pub fn handle_show(
    ctx: &AppContext,
    story: &str,
    episode: u32,
    beat: Option<&str>,
    mode: OutputMode,
    detail: DetailLevel,
) -> Result<()> {
    let Some(results) = ctx.store.load(story, episode)? else {
        print_error(&format!("No stored results for {} episode {}", story, episode));
        print_hint("Run `beatframe compile <episode-file>` first.");
        return Ok(());
    };

    match beat {
        Some(beat_id) => {
            let matches = results.find_all(beat_id);
            if matches.is_empty() {
                print_error(&format!("Beat '{}' not found in episode {}", beat_id, episode));
                return Ok(());
            }
            if mode == OutputMode::Json {
                output_json(&matches);
                return Ok(());
            }
            for result in matches {
                match mode {
                    OutputMode::Markdown => print_beat_markdown(result),
                    _ => print_beat(result, DetailLevel::Full),
                }
            }
        }
        None => render_result_set(&results, mode, detail),
    }
    Ok(())
}

pub fn handle_episodes(ctx: &AppContext, story: &str, mode: OutputMode) -> Result<()> {
    let episodes = ctx.store.episodes(story)?;
    if mode == OutputMode::Json {
        output_json(&episodes);
        return Ok(());
    }

    let mut rows = Vec::with_capacity(episodes.len());
    for n in episodes {
        if let Some(results) = ctx.store.load(story, n)? {
            rows.push(vec![
                n.to_string(),
                results.title.clone().unwrap_or_default(),
                results.totals.compiled.to_string(),
                results.totals.failed.to_string(),
                results
                    .ending_time
                    .map(|t| t.to_string())
                    .unwrap_or_default(),
                results.created_at.format("%Y-%m-%d %H:%M").to_string(),
            ]);
        }
    }
    print_table(
        &["Episode", "Title", "Compiled", "Failed", "Ends", "Compiled at"],
        rows,
        &format!("No stored episodes for {}.", story),
    );
    Ok(())
}

/// Render a whole result set in the requested mode.
pub fn render_result_set(results: &EpisodeResultSet, mode: OutputMode, detail: DetailLevel) {
    match mode {
        OutputMode::Json => output_json(results),
        OutputMode::Markdown => {
            println!("# Episode {}", results.episode_number);
            if let Some(title) = &results.title {
                println!("\n_{}_", title);
            }
            for result in results.ordered() {
                println!();
                print_beat_markdown(result);
            }
        }
        OutputMode::Human => {
            if detail == DetailLevel::Brief {
                for result in results.ordered() {
                    println!("{}\t{}", result.beat_id, result.prompt.text());
                }
                return;
            }

            let title = match &results.title {
                Some(title) => format!("Episode {}: {}", results.episode_number, title),
                None => format!("Episode {}", results.episode_number),
            };
            print_header(&title);

            let rows = results
                .ordered()
                .into_iter()
                .map(|r| {
                    vec![
                        r.beat_id.clone(),
                        r.scene.to_string(),
                        r.shot.to_string(),
                        r.angle.to_string(),
                        r.time.token(),
                        fill_in_label(&r.fill_in).to_string(),
                        r.prompt.token_estimate().to_string(),
                        status_label(r),
                    ]
                })
                .collect();
            print_table(
                &[
                    "Beat", "Scene", "Shot", "Angle", "Time", "Fill-in", "Tokens", "Status",
                ],
                rows,
                "No beats compiled.",
            );

            for result in results.ordered() {
                print_beat(result, detail);
            }

            if !results.failures.is_empty() {
                print_header("Failed beats");
                results.failures.iter().for_each(print_failure);
            }

            let totals = &results.totals;
            print_header("Totals");
            print_kv("Beats", &totals.beats.to_string());
            print_kv("Compiled", &totals.compiled.to_string());
            print_kv("Failed", &totals.failed.to_string());
            if totals.skipped > 0 {
                print_kv("Skipped (cancelled)", &totals.skipped.to_string());
            }
            print_kv("Variety adjustments", &totals.variety_adjustments.to_string());
            print_kv("Fill-ins", &totals.fill_ins.to_string());
            print_kv("Repairs", &totals.repairs.to_string());
            print_kv("Warnings", &totals.warnings.to_string());
            if let Some(time) = results.ending_time {
                print_kv("Ending time", time.as_str());
            }
        }
    }
}

fn print_beat(result: &BeatResult, detail: DetailLevel) {
    println!("\n{} {}", result.beat_id.bold(), result.reason.dimmed());
    println!("  {}", result.prompt.text());
    if detail != DetailLevel::Full {
        return;
    }

    let report = result.prompt.report();
    for outcome in &report.outcomes {
        let status = rule_status(outcome.status);
        match &outcome.message {
            Some(message) => println!("    {:<18} {} ({})", outcome.rule, status, message),
            None => println!("    {:<18} {}", outcome.rule, status),
        }
    }
    for warning in &report.warnings {
        print_note(warning);
    }
    if !result.prompt.dropped().is_empty() {
        let dropped: Vec<&str> = result.prompt.dropped().iter().map(|f| f.as_str()).collect();
        print_note(&format!("INFO: dropped for budget: {}", dropped.join(", ")));
    }
}

fn print_beat_markdown(result: &BeatResult) {
    println!("## {}", result.beat_id);
    println!();
    println!("- scene: {}", result.scene);
    println!("- framing: {}, {}", result.shot, result.angle);
    println!("- time: {}", result.time.token());
    println!("- tokens: {}", result.prompt.token_estimate());
    println!();
    println!("```");
    println!("{}", result.prompt.text());
    println!("```");
    let warnings = &result.prompt.report().warnings;
    if !warnings.is_empty() {
        println!();
        for warning in warnings {
            println!("> {}", warning);
        }
    }
}

fn status_label(result: &BeatResult) -> String {
    let report = result.prompt.report();
    let warnings = report
        .outcomes
        .iter()
        .filter(|o| o.status == RuleStatus::Warning)
        .count();
    let mut parts = Vec::new();
    if result.variety_adjusted {
        parts.push("adjusted".to_string());
    }
    if report.repairs() > 0 {
        parts.push(format!("{} repaired", report.repairs()));
    }
    if warnings > 0 {
        parts.push(format!("{} warning(s)", warnings));
    }
    if parts.is_empty() {
        "ok".to_string()
    } else {
        parts.join(", ")
    }
}
