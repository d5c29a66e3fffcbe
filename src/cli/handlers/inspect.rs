//! Inspection commands: time resolution, arc recommendations, schemas, config.

use anyhow::Result;
use std::path::Path;

use crate::cli::output::{output_json, print_kv, print_table, OutputMode};
use crate::cli::SchemaDocument;
use crate::init::{read_document, AppContext};
use crate::models::{ArcPhase, EpisodeInput, StoryBible, VisualSignificance};
use crate::services::fill_in::FillInResponse;
use crate::services::{arc_visual, time_of_day, Pipeline};

pub fn handle_time(file: &Path, mode: OutputMode) -> Result<()> {
    let episode: EpisodeInput = read_document(file)?;
    let times = Pipeline::resolve_times(&episode);

    if mode == OutputMode::Json {
        let entries: Vec<serde_json::Value> = episode
            .scenes
            .iter()
            .zip(&times)
            .map(|(scene, time)| {
                serde_json::json!({
                    "scene": scene.scene_number,
                    "header": scene.header,
                    "time": time,
                    "token": time.token(),
                    "lighting": time_of_day::lighting_tokens(time.time(), time.setting()),
                })
            })
            .collect();
        output_json(&entries);
        return Ok(());
    }

    let rows = episode
        .scenes
        .iter()
        .zip(&times)
        .map(|(scene, time)| {
            vec![
                scene.scene_number.to_string(),
                scene.header.clone(),
                time.token(),
                time.provenance().as_str().to_string(),
                time.jump().unwrap_or_default().to_string(),
            ]
        })
        .collect();
    print_table(
        &["Scene", "Header", "Time", "Source", "Jump"],
        rows,
        "Episode has no scenes.",
    );
    Ok(())
}

pub fn handle_recommend(
    phase: ArcPhase,
    significance: VisualSignificance,
    index: usize,
    total: usize,
    intensity: u8,
    mode: OutputMode,
) {
    let rec = arc_visual::recommend(phase, significance, index, total, intensity);
    if mode == OutputMode::Json {
        output_json(&rec);
        return;
    }
    print_kv("Shot", rec.shot.as_str());
    print_kv("Angle", rec.angle.as_str());
    print_kv("Lighting", rec.lighting_style);
    print_kv("Reason", &rec.reason);
}

pub fn handle_schema(document: SchemaDocument) -> Result<()> {
    let schema = match document {
        SchemaDocument::Episode => schemars::schema_for!(EpisodeInput),
        SchemaDocument::Bible => schemars::schema_for!(StoryBible),
        SchemaDocument::FillInResponse => schemars::schema_for!(FillInResponse),
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

pub fn handle_config(ctx: &AppContext, mode: OutputMode) -> Result<()> {
    if mode == OutputMode::Json {
        output_json(ctx.config.as_ref());
    } else {
        print!("{}", toml::to_string_pretty(ctx.config.as_ref())?);
    }
    Ok(())
}
