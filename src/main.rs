use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use cmdflow_command_registry::{CommandCatalog, DryRunExecutor, describe};
use cmdflow_config::Settings;
use cmdflow_dispatch::{
  ChannelHandoff, Outcome, RunReport, RunnerHandoff, WorkflowRunner, trace,
};
use cmdflow_session::{EditingSession, SessionError};
use cmdflow_store::{DeviceScope, SqliteStore, TemplateStore};
use cmdflow_workflow::{Operation, ValidationPolicy, WorkflowDocument, from_json, to_json_pretty};
use tokio_util::sync::CancellationToken;

/// cmdflow - device command workflows
#[derive(Parser)]
#[command(name = "cmdflow")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.cmdflow)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Device scope for templates (overrides config.json)
  #[arg(long, global = true)]
  device: Option<String>,

  /// Jump target checking (overrides config.json)
  #[arg(long, global = true, value_enum)]
  policy: Option<PolicyArg>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Check a workflow file and report the first problem
  Validate {
    /// Path to a workflow JSON file
    workflow_file: PathBuf,
  },

  /// Print a workflow file in canonical form
  Serialize {
    workflow_file: PathBuf,
  },

  /// Show each step with its command label and routing
  Describe {
    workflow_file: PathBuf,
  },

  /// Preview the steps visited for a list of outcomes
  Trace {
    workflow_file: PathBuf,

    /// Outcomes fed to visited steps in order, e.g. `s,f,s`
    #[arg(long, value_enum, value_delimiter = ',')]
    outcomes: Vec<OutcomeArg>,

    /// Maximum number of visits to show
    #[arg(long, default_value_t = 100)]
    limit: usize,
  },

  /// Run a workflow in-process with logged commands, or queue it
  Execute {
    /// Path to a workflow JSON file
    #[arg(required_unless_present = "template")]
    workflow_file: Option<PathBuf>,

    /// Run a saved template instead of a file
    #[arg(long, conflicts_with = "workflow_file")]
    template: Option<String>,

    /// Step numbers whose command reports failure, e.g. `2,3`
    #[arg(long, value_delimiter = ',')]
    fail: Vec<u32>,

    /// Print the queued canonical JSON instead of running it
    #[arg(long)]
    queue: bool,
  },

  /// Manage saved workflow templates
  Templates {
    #[command(subcommand)]
    action: TemplateAction,
  },
}

#[derive(Subcommand)]
enum TemplateAction {
  /// List templates of the device scope
  List,
  /// Validate and save a workflow file as a template
  Save { workflow_file: PathBuf },
  /// Print a stored template
  Show { workflow_id: String },
  /// Delete a stored template
  Delete { workflow_id: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
  Strict,
  Compatible,
}

impl From<PolicyArg> for ValidationPolicy {
  fn from(arg: PolicyArg) -> Self {
    match arg {
      PolicyArg::Strict => ValidationPolicy::Strict,
      PolicyArg::Compatible => ValidationPolicy::Compatible,
    }
  }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutcomeArg {
  #[value(alias = "s", alias = "ok")]
  Success,
  #[value(alias = "f", alias = "fail")]
  Failure,
}

impl From<OutcomeArg> for Outcome {
  fn from(arg: OutcomeArg) -> Self {
    match arg {
      OutcomeArg::Success => Outcome::Success,
      OutcomeArg::Failure => Outcome::Failure,
    }
  }
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".cmdflow"),
  };

  let Some(command) = cli.command else {
    println!("cmdflow - use --help to see available commands");
    return Ok(());
  };

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async {
    let mut settings = Settings::load(&data_dir)
      .await
      .context("failed to load settings")?;
    if let Some(device) = cli.device {
      settings.device_scope = device;
    }
    if let Some(policy) = cli.policy {
      settings.validation = policy.into();
    }

    run(command, &settings, &data_dir).await
  })
}

async fn run(command: Commands, settings: &Settings, data_dir: &Path) -> Result<()> {
  match command {
    Commands::Validate { workflow_file } => {
      let doc = read_workflow(&workflow_file).await?;
      match doc.validate(settings.validation) {
        Ok(()) => println!("{}: valid ({} steps)", doc.id, doc.len()),
        Err(e) => bail!("{}: {}", workflow_file.display(), e),
      }
    }
    Commands::Serialize { workflow_file } => {
      let doc = read_workflow(&workflow_file).await?;
      println!("{}", to_json_pretty(&doc));
    }
    Commands::Describe { workflow_file } => {
      let doc = read_workflow(&workflow_file).await?;
      let catalog = load_catalog(settings, data_dir).await?;
      println!("{}", doc.id);
      for row in describe(&doc, &catalog) {
        println!("{row}");
      }
    }
    Commands::Trace {
      workflow_file,
      outcomes,
      limit,
    } => {
      let doc = read_workflow(&workflow_file).await?;
      doc
        .validate(settings.validation)
        .with_context(|| format!("{} is not valid", workflow_file.display()))?;
      let result = trace(&doc, outcomes.into_iter().map(Outcome::from), limit)?;
      let path: Vec<String> = result.visited.iter().map(u32::to_string).collect();
      println!(
        "{}{}",
        path.join(" -> "),
        if result.terminated { " -> end" } else { " ..." }
      );
    }
    Commands::Execute {
      workflow_file,
      template,
      fail,
      queue,
    } => {
      let mut session = open_session(settings, data_dir).await?;
      match (workflow_file, template) {
        (Some(path), _) => {
          let doc = read_workflow(&path).await?;
          fill_draft(&mut session, &doc)?;
        }
        (None, Some(workflow_id)) => {
          session.load(&workflow_id).await?;
        }
        (None, None) => bail!("a workflow file or --template is required"),
      }

      if queue {
        queue_draft(&session).await?;
      } else {
        run_draft(&session, fail, settings, data_dir).await?;
      }
    }
    Commands::Templates { action } => run_templates(action, settings, data_dir).await?,
  }

  Ok(())
}

async fn run_templates(action: TemplateAction, settings: &Settings, data_dir: &Path) -> Result<()> {
  let mut session = open_session(settings, data_dir).await?;
  let scope = session.scope().clone();

  match action {
    TemplateAction::List => {
      let catalog = session.refresh_catalog().await?;
      for entry in catalog.entries() {
        println!(
          "{}\t{} steps\t{}",
          entry.workflow_id,
          entry.step_count,
          entry.saved_at.to_rfc3339()
        );
      }
    }
    TemplateAction::Save { workflow_file } => {
      let doc = read_workflow(&workflow_file).await?;
      fill_draft(&mut session, &doc)?;
      let summary = session
        .save()
        .await
        .with_context(|| format!("failed to save {}", workflow_file.display()))?;
      info!(scope = %scope, workflow_id = %summary.workflow_id, "template saved");
      println!("saved {}/{}", scope, summary.workflow_id);
    }
    TemplateAction::Show { workflow_id } => {
      let doc = session.load(&workflow_id).await?;
      println!("{}", to_json_pretty(doc));
    }
    TemplateAction::Delete { workflow_id } => {
      session.delete(&workflow_id).await?;
      println!("deleted {}/{}", scope, workflow_id);
    }
  }

  Ok(())
}

async fn open_session(settings: &Settings, data_dir: &Path) -> Result<EditingSession> {
  tokio::fs::create_dir_all(data_dir)
    .await
    .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

  let url = settings.database_url(data_dir);
  let store: Arc<dyn TemplateStore> = Arc::new(
    SqliteStore::connect(&url)
      .await
      .with_context(|| format!("failed to open template database: {url}"))?,
  );
  let scope = DeviceScope::new(settings.device_scope.clone());
  Ok(EditingSession::new(scope, store, settings.validation))
}

/// Rebuild `doc` in the session draft through sequencer operations.
fn fill_draft(session: &mut EditingSession, doc: &WorkflowDocument) -> Result<()> {
  session.discard();
  session.set_id(doc.id.clone());
  for step in doc.steps() {
    session.apply(Operation::Append(step.to_draft()))?;
  }
  Ok(())
}

async fn queue_draft(session: &EditingSession) -> Result<()> {
  let (handoff, mut queue) = ChannelHandoff::new(1);
  let receipt = session.execute(&handoff).await?;
  let queued = queue.recv().await.context("hand-off queue closed")?;

  println!("queued {} as {}", receipt.workflow_id, receipt.execution_id);
  println!("{}", queued.workflow_json);
  Ok(())
}

async fn run_draft(
  session: &EditingSession,
  fail: Vec<u32>,
  settings: &Settings,
  data_dir: &Path,
) -> Result<()> {
  let catalog = load_catalog(settings, data_dir).await?;
  let executor = Arc::new(DryRunExecutor::new(catalog).failing(fail));
  let runner = Arc::new(WorkflowRunner::new(executor).with_config(settings.runner_config()));

  let cancel = CancellationToken::new();
  let on_interrupt = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      info!("interrupt received, cancelling run");
      on_interrupt.cancel();
    }
  });

  let handoff = RunnerHandoff::new(runner, cancel);
  match session.execute(&handoff).await {
    Ok(receipt) => {
      if let Some(report) = &receipt.report {
        print_report(report);
      }
      Ok(())
    }
    Err(SessionError::Dispatch(e)) => {
      if let Some(report) = e.partial_report() {
        print_report(report);
      }
      Err(e.into())
    }
    Err(e) => Err(e.into()),
  }
}

fn print_report(report: &RunReport) {
  let earlier = report.visit_count - report.visits.len() as u64;
  if earlier > 0 {
    println!("... {earlier} earlier visits");
  }
  for visit in &report.visits {
    println!("step {}: {:?} {}", visit.step, visit.outcome, visit.detail);
  }
  println!(
    "{}: {} visits (execution {})",
    report.workflow_id, report.visit_count, report.execution_id
  );
}

async fn read_workflow(path: &Path) -> Result<WorkflowDocument> {
  let content = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read workflow file: {}", path.display()))?;

  from_json(&content).with_context(|| format!("failed to parse workflow file: {}", path.display()))
}

async fn load_catalog(settings: &Settings, data_dir: &Path) -> Result<CommandCatalog> {
  let path = settings.catalog_path(data_dir);
  if !path.exists() {
    return Ok(CommandCatalog::new());
  }
  CommandCatalog::load(&path)
    .await
    .with_context(|| format!("failed to load command catalog: {}", path.display()))
}
