//! Lessonpanel CLI
//!
//! The `lessonpanel` command reviews a lesson plan with a panel of learner
//! profiles and turns their feedback into an approved revision.
//!
//! ## Commands
//!
//! - `evaluate`: run every profile against a lesson and write the run
//! - `synthesize`: merge a run's reports into one revision proposal
//! - `apply`: apply the changes a teacher approved to the lesson
//! - `profiles`: list or validate profile definitions

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Level};

use lessonpanel_core::reporting::{read_json, render_run_md, write_json, write_proposal_md};
use lessonpanel_core::{
    approved_changes, execute_profiles_parallel, synthesize, CancelHandle, FeedbackReport,
    LessonPlan, OrchestrationRun, PanelConfig, ProfileStore, RevisionProposal, TeacherDecision,
};

#[derive(Parser)]
#[command(name = "lessonpanel")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Persona-based lesson plan review", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Panel configuration file (TOML)
    #[arg(long, global = true, env = "LESSONPANEL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a lesson plan with every profile
    Evaluate {
        /// Lesson plan JSON file
        lesson: PathBuf,

        /// Directory of profile files (default: built-in profiles)
        #[arg(short, long, env = "LESSONPANEL_PROFILES")]
        profiles: Option<PathBuf>,

        /// Write the run JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum profiles evaluated at once
        #[arg(long)]
        max_concurrent: Option<usize>,
    },

    /// Synthesize a revision proposal from a run or a list of reports
    Synthesize {
        /// Run JSON (from `evaluate`) or a JSON array of feedback reports
        input: PathBuf,

        /// Write the proposal JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write a markdown summary
        #[arg(long)]
        markdown: Option<PathBuf>,

        /// Distinct profiles needed for a universal improvement
        #[arg(long)]
        agreement_threshold: Option<usize>,
    },

    /// Apply approved changes to a lesson plan
    Apply {
        /// Lesson plan JSON file
        lesson: PathBuf,

        /// Proposal JSON (from `synthesize`)
        #[arg(long)]
        proposal: PathBuf,

        /// Teacher decisions JSON (array of {change_id, decision})
        #[arg(long)]
        decisions: PathBuf,

        /// Write the patch outcome JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the revised lesson plan JSON
        #[arg(long)]
        lesson_out: Option<PathBuf>,
    },

    /// Inspect profile definitions
    Profiles {
        #[command(subcommand)]
        action: ProfilesAction,
    },
}

#[derive(Subcommand)]
enum ProfilesAction {
    /// List loaded profiles
    List {
        /// Directory of profile files (default: built-in profiles)
        #[arg(short, long, env = "LESSONPANEL_PROFILES")]
        profiles: Option<PathBuf>,
    },
    /// Load every profile and report the ones that fail
    Validate {
        /// Directory of profile files (default: built-in profiles)
        #[arg(short, long, env = "LESSONPANEL_PROFILES")]
        profiles: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    lessonpanel_core::init_tracing(cli.json, level);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Evaluate {
            lesson,
            profiles,
            output,
            max_concurrent,
        } => {
            cmd_evaluate(
                &config,
                &lesson,
                profiles.as_deref(),
                output.as_deref(),
                max_concurrent,
            )
            .await
        }
        Commands::Synthesize {
            input,
            output,
            markdown,
            agreement_threshold,
        } => cmd_synthesize(
            &config,
            &input,
            output.as_deref(),
            markdown.as_deref(),
            agreement_threshold,
        ),
        Commands::Apply {
            lesson,
            proposal,
            decisions,
            output,
            lesson_out,
        } => cmd_apply(
            &lesson,
            &proposal,
            &decisions,
            output.as_deref(),
            lesson_out.as_deref(),
        ),
        Commands::Profiles { action } => match action {
            ProfilesAction::List { profiles } => cmd_profiles_list(profiles.as_deref()),
            ProfilesAction::Validate { profiles } => cmd_profiles_validate(profiles.as_deref()),
        },
    }
}

/// Defaults, then the config file, then `LESSONPANEL_*` variables.
fn load_config(path: Option<&Path>) -> Result<PanelConfig> {
    let base = match path {
        Some(path) => PanelConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config: {:?}", path))?,
        None => PanelConfig::default(),
    };
    Ok(base.overlay_env())
}

fn load_store(dir: Option<&Path>) -> Result<ProfileStore> {
    match dir {
        Some(dir) => ProfileStore::load_dir(dir)
            .with_context(|| format!("Failed to read profile directory: {:?}", dir)),
        None => Ok(ProfileStore::builtin()),
    }
}

/// Evaluate a lesson with every profile, in parallel, honouring Ctrl-C
async fn cmd_evaluate(
    config: &PanelConfig,
    lesson: &Path,
    profiles: Option<&Path>,
    output: Option<&Path>,
    max_concurrent: Option<usize>,
) -> Result<()> {
    let plan: LessonPlan = read_json(lesson)?;
    let store = load_store(profiles)?;
    for failure in store.failures() {
        warn!(source = %failure.source, reason = %failure.reason, "profile will be skipped");
    }

    let mut parallel = config.parallel_config();
    if let Some(n) = max_concurrent {
        parallel.max_concurrent = n.max(1);
    }

    let cancel = CancelHandle::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; cancelling evaluation");
            on_interrupt.cancel();
        }
    });

    let run = execute_profiles_parallel(store.slots().to_vec(), Arc::new(plan), parallel, cancel)
        .await
        .context("Lesson plan failed validation")?;

    match output {
        Some(path) => {
            write_json(path, &run)?;
            println!("{}", render_run_md(&run));
            println!("Wrote run {} to {:?}", run.run_id, path);
        }
        None => println!("{}", serde_json::to_string_pretty(&run)?),
    }
    Ok(())
}

/// Accepts either an `OrchestrationRun` or a bare array of reports.
fn read_reports(path: &Path) -> Result<Vec<FeedbackReport>> {
    let value: Value = read_json(path)?;
    if value.is_array() {
        return serde_json::from_value(value)
            .with_context(|| format!("Invalid feedback reports in {:?}", path));
    }
    let run: OrchestrationRun = serde_json::from_value(value)
        .with_context(|| format!("Invalid run in {:?}", path))?;
    if !run.is_complete() {
        warn!(
            run = %run.run_id,
            skipped = run.skipped.len(),
            cancelled = run.cancelled,
            "synthesizing from a partial run"
        );
    }
    Ok(run.reports)
}

fn cmd_synthesize(
    config: &PanelConfig,
    input: &Path,
    output: Option<&Path>,
    markdown: Option<&Path>,
    agreement_threshold: Option<usize>,
) -> Result<()> {
    let reports = read_reports(input)?;
    let mut synthesis = config.synthesis_config();
    if let Some(n) = agreement_threshold {
        synthesis.agreement_threshold = n.max(1);
    }

    let proposal = synthesize(&reports, &synthesis);

    if let Some(path) = markdown {
        write_proposal_md(path, &proposal)?;
    }
    match output {
        Some(path) => {
            write_json(path, &proposal)?;
            println!(
                "Proposal: {} universal, {} categories, {} conflicts -> {:?}",
                proposal.universal_improvements.len(),
                proposal.priority_categories.len(),
                proposal.conflicts.len(),
                path
            );
        }
        None => println!("{}", serde_json::to_string_pretty(&proposal)?),
    }
    Ok(())
}

fn cmd_apply(
    lesson: &Path,
    proposal: &Path,
    decisions: &Path,
    output: Option<&Path>,
    lesson_out: Option<&Path>,
) -> Result<()> {
    let plan: LessonPlan = read_json(lesson)?;
    let proposal: RevisionProposal = read_json(proposal)?;
    let decisions: Vec<TeacherDecision> = read_json(decisions)?;

    let selection = approved_changes(&proposal, &decisions);
    info!(
        approved = selection.approved.len(),
        unmatched = selection.unmatched.len(),
        needs_choice = selection.needs_choice.len(),
        "applying approved changes"
    );

    let outcome = lessonpanel_core::apply(&plan, &selection.approved)
        .context("Failed to digest lesson plan")?;

    if let Some(path) = lesson_out {
        write_json(path, &outcome.plan)?;
    }
    match output {
        Some(path) => {
            write_json(path, &outcome)?;
            println!(
                "Applied {} change(s); {} need manual review; {} failed",
                outcome.applied.len(),
                outcome.manual_review_required.len(),
                outcome.apply_failed.len()
            );
            println!("Version: {} -> {}", outcome.base_digest, outcome.digest);
        }
        None => println!("{}", serde_json::to_string_pretty(&outcome)?),
    }
    Ok(())
}

fn cmd_profiles_list(dir: Option<&Path>) -> Result<()> {
    let store = load_store(dir)?;
    if store.is_empty() {
        println!("No profiles found.");
        return Ok(());
    }

    for profile in store.profiles() {
        let criteria: Vec<&str> = profile
            .evaluation_criteria
            .iter()
            .map(|c| c.as_str())
            .collect();
        println!(
            "{} ({}) [{}]: {}",
            profile.id,
            profile.display_name,
            profile.priority_tag,
            criteria.join(", ")
        );
    }
    for failure in store.failures() {
        println!("! {}: {}", failure.source, failure.reason);
    }
    Ok(())
}

fn cmd_profiles_validate(dir: Option<&Path>) -> Result<()> {
    let store = load_store(dir)?;
    let failures: Vec<_> = store.failures().collect();
    for failure in &failures {
        println!("FAIL {}: {}", failure.source, failure.reason);
    }
    let loaded = store.len() - failures.len();
    println!("{} profile(s) valid, {} failed", loaded, failures.len());

    if !failures.is_empty() {
        anyhow::bail!("{} profile(s) failed to load", failures.len());
    }
    Ok(())
}
