use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use viewforge_chat::{
    AgentInstructions, CampaignConfig, CampaignOptions, Participants, RefinementCampaign,
    ReflectionSummarizer, SchemaScope,
};
use viewforge_core::ToolCallingLlm;
use viewforge_llm::OpenAiCompatibleClient;
use viewforge_schema::{SchemaGraph, SchemaWording};
use viewforge_sqlite::SqliteDatabase;
use viewforge_views::{MaterializeOptions, MaterializeViews, ViewMaterializer};

use crate::output;

#[derive(Args, Debug)]
pub struct RefineArgs {
    /// SQLite database to explore.
    #[arg(long)]
    db: PathBuf,

    /// YAML file with the agents' instructions.
    #[arg(long)]
    instructions: PathBuf,

    /// Directory that receives chat_history.jsonl and code_history.sql.
    #[arg(long, default_value = "workspace")]
    workspace: PathBuf,

    #[arg(long, env = "VIEWFORGE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OpenAI-compatible endpoint; defaults to api.openai.com.
    #[arg(long, env = "VIEWFORGE_BASE_URL")]
    base_url: Option<String>,

    #[arg(long)]
    model: Option<String>,

    #[arg(long, default_value_t = 0.2)]
    temperature: f32,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 240)]
    timeout: u64,

    /// Let the Coder and Verifier materialize the proposed views.
    #[arg(long)]
    verify: bool,

    #[arg(long)]
    n_chats: Option<usize>,

    #[arg(long)]
    n_rounds: Option<usize>,

    #[arg(long)]
    n_verification_rounds: Option<usize>,

    /// Show each session a connected sample of tables instead of the full schema.
    #[arg(long)]
    subsample: bool,

    #[arg(long)]
    sample_size: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    termination_token: Option<String>,

    /// Show the agents a few rows of each table. Row values are sent to the
    /// language model provider.
    #[arg(long)]
    sample_data: bool,

    #[arg(long, default_value_t = 5)]
    sample_rows: usize,

    /// Drop every verified view again instead of keeping it.
    #[arg(long)]
    no_persist: bool,
}

impl RefineArgs {
    fn campaign_options(&self) -> CampaignOptions {
        CampaignOptions {
            n_chats: self.n_chats,
            subsample: self.subsample.then_some(true),
            sample_size: self.sample_size,
            seed: self.seed,
            n_rounds: self.n_rounds,
            n_verification_rounds: self.n_verification_rounds,
            verify: self.verify.then_some(true),
            termination_token: self.termination_token.clone(),
            model: self.model.clone(),
        }
    }

    fn materialize_options(&self) -> MaterializeOptions {
        MaterializeOptions::default()
            .replace_on_conflict(true)
            .persist(!self.no_persist)
    }
}

pub async fn run(args: RefineArgs) -> anyhow::Result<()> {
    let config = CampaignConfig::default().merge(&args.campaign_options());
    config.validate()?;

    let instructions = AgentInstructions::from_path(&args.instructions)
        .with_context(|| format!("loading {}", args.instructions.display()))?;

    let database = Arc::new(
        SqliteDatabase::builder(args.db.clone())
            .include_sample_data(args.sample_data)
            .sample_rows(args.sample_rows)
            .build()
            .await
            .with_context(|| format!("opening {}", args.db.display()))?,
    );

    let mut client = OpenAiCompatibleClient::builder()
        .default_model(config.session.model.clone())
        .temperature(Some(args.temperature))
        .timeout(Duration::from_secs(args.timeout));
    if let Some(base_url) = &args.base_url {
        client = client.base_url(base_url)?;
    }
    if let Some(api_key) = &args.api_key {
        client = client.api_key(api_key.clone());
    }
    let llm: Arc<dyn ToolCallingLlm> = Arc::new(client.build()?);

    let views: Option<Arc<dyn MaterializeViews>> = if config.session.verify {
        Some(Arc::new(
            ViewMaterializer::new(database.clone()).with_defaults(args.materialize_options()),
        ))
    } else {
        None
    };

    let scope = if config.subsample {
        let graph = SchemaGraph::build(database.as_ref())
            .await
            .context("building the schema graph")?;
        tracing::info!(
            tables = graph.node_count(),
            arcs = graph.edge_count(),
            "schema graph ready"
        );
        SchemaScope::Subsampled {
            graph: Arc::new(graph),
            wording: database.clone(),
        }
    } else {
        SchemaScope::Full(
            database
                .schema_wording(None)
                .await
                .context("rendering the schema")?,
        )
    };

    let participants =
        Participants::from_instructions(&instructions, llm.clone(), &config.session, views)?;
    let summarizer = ReflectionSummarizer::new(llm, config.session.model.clone());
    let campaign = RefinementCampaign::new(config, scope, participants, summarizer)?;

    tracing::info!(
        db = %args.db.display(),
        n_chats = campaign.config().n_chats,
        verify = campaign.config().session.verify,
        subsample = campaign.config().subsample,
        "starting campaign"
    );
    let result = campaign.run().await;

    let paths = output::write_outputs(&args.workspace, &result)?;
    if let Some(reason) = &result.stopped_early {
        tracing::warn!(reason = %reason, "campaign ended early");
    }
    tracing::info!(
        sessions = result.completed_sessions(),
        views = ?result.view_names,
        chat_history = %paths.chat_history.display(),
        code_history = %paths.code_history.display(),
        "campaign finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: RefineArgs,
    }

    #[test]
    fn unset_flags_keep_configured_values() {
        let harness = Harness::parse_from(["viewforge", "--db", "shop.db", "--instructions", "agents.yaml"]);
        let merged = CampaignConfig::default().merge(&harness.args.campaign_options());

        assert_eq!(merged, CampaignConfig::default());
        assert!(harness.args.materialize_options().persist);
        assert!(!harness.args.sample_data);
    }

    #[test]
    fn flags_override_campaign_settings() {
        let harness = Harness::parse_from([
            "viewforge",
            "--db",
            "shop.db",
            "--instructions",
            "agents.yaml",
            "--verify",
            "--subsample",
            "--n-chats",
            "3",
            "--seed",
            "7",
            "--no-persist",
            "--sample-data",
        ]);
        let merged = CampaignConfig::default().merge(&harness.args.campaign_options());

        assert_eq!(merged.n_chats, 3);
        assert_eq!(merged.seed, 7);
        assert!(merged.subsample);
        assert!(merged.session.verify);
        assert!(!harness.args.materialize_options().persist);
        assert!(harness.args.sample_data);
    }
}
