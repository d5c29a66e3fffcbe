//! CLI interface for Beatframe.

pub mod handlers;
pub mod output;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::models::{ArcPhase, VisualSignificance};
use output::{DetailLevel, OutputMode};

/// Beatframe - compile narrative beats into image-generation prompts
#[derive(Parser)]
#[command(name = "beatframe", version, about, long_about = None)]
pub struct Cli {
    /// Override data directory (default: ~/.beatframe)
    #[arg(long, env = "BEATFRAME_DATA_PATH", global = true)]
    pub data_path: Option<PathBuf>,

    /// Pipeline config file (default: <data-path>/beatframe.toml)
    #[arg(long, env = "BEATFRAME_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Story bible with character and location context (YAML or JSON)
    #[arg(long, env = "BEATFRAME_BIBLE", global = true)]
    pub bible: Option<PathBuf>,

    /// Output as JSON instead of human-readable format
    #[arg(long, global = true)]
    pub json: bool,

    /// Output as Markdown
    #[arg(long, global = true)]
    pub md: bool,

    /// Brief output (prompts only)
    #[arg(long, global = true)]
    pub brief: bool,

    /// Full output (validation reports and notes)
    #[arg(long, global = true)]
    pub full: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile an episode document into prompts
    Compile {
        /// Episode document (YAML or JSON)
        file: PathBuf,
        /// Attach render requests to every compiled beat
        #[arg(long)]
        render: bool,
        /// Do not persist the result set
        #[arg(long)]
        no_save: bool,
        /// Scenes compiled concurrently (overrides config)
        #[arg(long)]
        concurrency: Option<usize>,
        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
        /// Take the starting time from the stored previous episode when the document has none
        #[arg(long, default_value = "true", action = clap::ArgAction::Set)]
        chain_time: bool,
    },

    /// Show the resolved time of day for each scene
    Time {
        /// Episode document (YAML or JSON)
        file: PathBuf,
    },

    /// Show the arc-driven framing recommendation for a beat position
    Recommend {
        /// Arc phase (DORMANT, RISING, CLIMAX, FALLING, RESOLVED)
        #[arg(long)]
        phase: ArcPhase,
        /// Beat position in the scene (0-based)
        #[arg(long, default_value = "0")]
        index: usize,
        /// Number of beats in the scene
        #[arg(long, default_value = "1")]
        total: usize,
        /// Scene intensity 1-10
        #[arg(long, default_value = "5")]
        intensity: u8,
        /// Visual significance of the beat
        #[arg(long, value_enum, default_value = "medium")]
        significance: SignificanceArg,
    },

    /// Show a stored result set
    Show {
        /// Story id
        story: String,
        /// Episode number
        episode: u32,
        /// Only this beat: a bare beat id or a scene-qualified key like ep1-s2/b1
        #[arg(long)]
        beat: Option<String>,
    },

    /// List stored episodes for a story
    Episodes {
        /// Story id
        story: String,
    },

    /// Print a JSON Schema for an input or collaborator document
    Schema {
        #[arg(value_enum)]
        document: SchemaDocument,
    },

    /// Print the effective pipeline config as TOML
    Config,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SignificanceArg {
    Low,
    Medium,
    High,
    Critical,
}

impl From<SignificanceArg> for VisualSignificance {
    fn from(arg: SignificanceArg) -> Self {
        match arg {
            SignificanceArg::Low => VisualSignificance::Low,
            SignificanceArg::Medium => VisualSignificance::Medium,
            SignificanceArg::High => VisualSignificance::High,
            SignificanceArg::Critical => VisualSignificance::Critical,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SchemaDocument {
    Episode,
    Bible,
    FillInResponse,
}

/// Execute a CLI command.
pub async fn execute(
    cli: &Cli,
    ctx: &crate::init::AppContext,
    mode: OutputMode,
    detail: DetailLevel,
) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Compile {
            file,
            render,
            no_save,
            concurrency,
            no_progress,
            chain_time,
        } => {
            handlers::compile::handle_compile(
                ctx,
                file,
                handlers::compile::CompileOptions {
                    render: *render,
                    save: !*no_save,
                    concurrency: *concurrency,
                    progress: !*no_progress && mode == OutputMode::Human,
                    chain_time: *chain_time,
                },
                mode,
                detail,
            )
            .await?
        }

        Commands::Time { file } => handlers::inspect::handle_time(file, mode)?,

        Commands::Recommend {
            phase,
            index,
            total,
            intensity,
            significance,
        } => handlers::inspect::handle_recommend(
            *phase,
            (*significance).into(),
            *index,
            *total,
            *intensity,
            mode,
        ),

        Commands::Show {
            story,
            episode,
            beat,
        } => handlers::results::handle_show(ctx, story, *episode, beat.as_deref(), mode, detail)?,

        Commands::Episodes { story } => handlers::results::handle_episodes(ctx, story, mode)?,

        Commands::Schema { document } => handlers::inspect::handle_schema(*document)?,

        Commands::Config => handlers::inspect::handle_config(ctx, mode)?,

        Commands::Completions { shell } => {
            clap_complete::generate(
                *shell,
                &mut Cli::command(),
                "beatframe",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}
