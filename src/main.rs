use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;

use channel_planner::config::{DEFAULT_TIME_HORIZON_HOURS, Settings};
use channel_planner::graph::{ChannelGateway, GraphClient, GraphCredentials};
use channel_planner::llm::{LlmConfig, create_provider};
use channel_planner::pipeline::planner::{DEFAULT_LOOKBACK_HOURS, DEFAULT_TOP};
use channel_planner::pipeline::report;
use channel_planner::pipeline::{ActionAnalyzer, LlmAnalyzer, PlanRequest, Planner, RuleBasedAnalyzer};

/// AI-assisted Microsoft Teams follow-up planning.
#[derive(Parser, Debug)]
#[command(name = "channel-planner", version)]
struct Args {
    /// Microsoft Teams team ID.
    #[arg(long)]
    team_id: Option<String>,

    /// Channel ID inside the team.
    #[arg(long)]
    channel_id: Option<String>,

    /// Operational focus (e.g. blockers, customers).
    #[arg(long)]
    focus: Option<String>,

    /// Max messages to fetch.
    #[arg(long, default_value_t = DEFAULT_TOP)]
    top: u32,

    /// Hours of history to fetch.
    #[arg(long, default_value_t = DEFAULT_LOOKBACK_HOURS)]
    lookback: u32,

    /// Read cached Graph messages from this JSON file instead of fetching.
    #[arg(long)]
    offline_json: Option<PathBuf>,

    /// Write the generated plan to this JSON file.
    #[arg(long)]
    export_json: Option<PathBuf>,

    /// Send suggested follow-up messages to the channel (dry run unless --force-send).
    #[arg(long)]
    send_followups: bool,

    /// Disable dry-run safety when --send-followups is set.
    #[arg(long, requires = "send_followups")]
    force_send: bool,

    /// Use the rule-based analyzer instead of calling an LLM.
    #[arg(long)]
    fake_ai: bool,

    /// Path to a .env file.
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Install rustls crypto provider before any TLS usage
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider already installed");
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let needs_graph = args.offline_json.is_none() || args.send_followups;

    let (team_id, channel_id) = match (&args.team_id, &args.channel_id) {
        (Some(team), Some(channel)) => (team.clone(), channel.clone()),
        _ if needs_graph => {
            bail!("--team-id and --channel-id are required when calling Microsoft Graph")
        }
        _ => ("offline".to_string(), "offline".to_string()),
    };

    let settings = if needs_graph || !args.fake_ai {
        let settings = Settings::from_env(Some(&args.env_file), !args.fake_ai, needs_graph)?;
        tracing::debug!(settings = %settings.redacted(), "Loaded settings");
        Some(settings)
    } else {
        None
    };

    let gateway: Option<Arc<dyn ChannelGateway>> = match &settings {
        Some(s) if needs_graph => Some(Arc::new(GraphClient::new(GraphCredentials {
            tenant_id: s.tenant_id.clone(),
            client_id: s.client_id.clone(),
            client_secret: s.client_secret.clone(),
        })?)),
        _ => None,
    };

    let analyzer: Arc<dyn ActionAnalyzer> = match &settings {
        Some(s) if !args.fake_ai => {
            let llm = create_provider(&LlmConfig {
                api_key: s.openai_api_key.clone(),
                model: s.openai_model.clone(),
                base_url: s.openai_base_url.clone(),
            })?;
            Arc::new(LlmAnalyzer::new(llm))
        }
        _ => Arc::new(RuleBasedAnalyzer::new()),
    };

    let horizon = settings
        .as_ref()
        .map(|s| s.planner_time_horizon_hours)
        .unwrap_or(DEFAULT_TIME_HORIZON_HOURS);
    let planner = Planner::new(gateway, analyzer).with_time_horizon_hours(horizon);

    let mut request = PlanRequest::new(&team_id, &channel_id)
        .with_top(args.top)
        .with_lookback_hours(args.lookback);
    if let Some(focus) = &args.focus {
        request = request.with_focus(focus);
    }
    if let Some(path) = &args.offline_json {
        let records = report::load_offline_messages(path)
            .with_context(|| format!("reading offline messages from {}", path.display()))?;
        request = request.with_offline_messages(records);
    }

    let plan = planner.generate_plan(request).await?;
    print!("{}", report::render_table(&plan));

    if let Some(path) = &args.export_json {
        report::export_plan(&plan, path)
            .with_context(|| format!("writing plan to {}", path.display()))?;
        eprintln!("Plan written to {}", path.display());
    }

    if args.send_followups {
        let dry_run = !args.force_send;
        let results = planner
            .execute_followups(&plan, &team_id, &channel_id, dry_run)
            .await?;
        if dry_run {
            eprintln!("Dry run complete. Re-run with --force-send to post these messages.");
        } else {
            print!("{}", report::render_send_results(&results));
            let failed = results.iter().filter(|r| !r.is_sent()).count();
            if failed > 0 {
                bail!("{failed} of {} follow-ups failed to send", results.len());
            }
        }
    }

    Ok(())
}
