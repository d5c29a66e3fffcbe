use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::cli::handlers::results::render_result_set;
use crate::cli::output::{print_success, DetailLevel, OutputMode};
use crate::init::{read_document, AppContext};
use crate::models::EpisodeInput;
use crate::services::{BarProgressReporter, Pipeline};
use crate::BeatframeError;

#[derive(Debug, Clone, Copy)]
pub struct CompileOptions {
    pub render: bool,
    pub save: bool,
    pub concurrency: Option<usize>,
    pub progress: bool,
    pub chain_time: bool,
}

pub async fn handle_compile(
    ctx: &AppContext,
    file: &Path,
    options: CompileOptions,
    mode: OutputMode,
    detail: DetailLevel,
) -> Result<()> {
    let mut episode: EpisodeInput = read_document(file)?;

    if options.chain_time && episode.starting_time.is_none() {
        episode.starting_time = ctx
            .store
            .previous_ending_time(&episode.story_id, episode.episode_number);
        if let Some(time) = episode.starting_time {
            tracing::info!("Continuing from previous episode's ending time: {}", time);
        }
    }

    let pipeline = match options.concurrency {
        Some(n) => {
            let mut config = (*ctx.config).clone();
            config.max_concurrent_scenes = n;
            Pipeline::new(ctx.lookup.clone(), ctx.generator.clone(), Arc::new(config))
        }
        None => ctx.pipeline(),
    };
    let mut pipeline = pipeline.with_render_requests(options.render);
    if options.progress {
        pipeline = pipeline.with_progress(Arc::new(BarProgressReporter::new(
            episode.total_beats(),
        )));
    }

    // Ctrl-C stops new beats; beats already running finish.
    let cancel = pipeline.cancellation();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; finishing in-flight beats");
            cancel.cancel();
        }
    });

    let results = pipeline.run_episode(&episode).await;
    interrupt.abort();
    ctx.lookup.clear();

    if options.save {
        let path = ctx.store.save(&results)?;
        if mode == OutputMode::Human {
            print_success(&format!("Saved to {}", path.display()));
        }
    }

    render_result_set(&results, mode, detail);

    if results.cancelled {
        return Err(BeatframeError::Cancelled.into());
    }
    Ok(())
}
