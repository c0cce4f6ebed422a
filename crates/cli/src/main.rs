use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use pf_api::PromptFinderClient;
use pf_engine::{
    ActionTrigger, Clipboard, PageAction, PageController, RenderContext, RenderedWorkflow, render_workflow, to_html,
};
use pf_types::{GlobalContext, RatingSummary, SiteConfig, ViewerContext, ViewerPlan, validate_workflow};
use pf_util::{
    JsonFlagStore, default_global_context_path, default_site_config_path, expand_tilde, load_global_context, load_site_config,
    load_workflow_file,
};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "prompt-finder", version, about = "Render and drive Prompt Finder workflow pages")]
struct Cli {
    /// Site configuration (defaults to $PF_CONFIG_PATH or the config directory).
    #[arg(long, global = true)]
    config: Option<String>,

    /// Global context profile (defaults to $PF_CONTEXT_PATH or the config directory).
    #[arg(long, global = true)]
    context: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a workflow page for a viewer.
    Render {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long, value_enum, default_value_t = OutputFormat::Html)]
        format: OutputFormat,
    },
    /// Print the lock decision for every step.
    Locks {
        #[command(flatten)]
        page: PageArgs,
    },
    /// Print each step's prompt after applying variables.
    Prompts {
        #[command(flatten)]
        page: PageArgs,
        /// Copy this step's prompt to the clipboard.
        #[arg(long)]
        copy: Option<usize>,
    },
    /// Dispatch one page action (`copy-prompt`, `rate`, `#step-2`, ...).
    Action {
        #[command(flatten)]
        page: PageArgs,
        /// `data-action` identifier or step anchor.
        action: String,
        /// Step containing the triggering element.
        #[arg(long)]
        step: Option<usize>,
        /// `data-value` of the triggering element.
        #[arg(long)]
        value: Option<String>,
        /// URL copied by `copy-link`.
        #[arg(long, default_value = "")]
        page_url: String,
        /// Flag file (defaults to $PF_FLAGS_PATH or the config directory).
        #[arg(long)]
        flags: Option<String>,
    },
    /// Report authoring issues in a workflow document.
    Validate { workflow: PathBuf },
}

#[derive(Args, Debug)]
struct PageArgs {
    /// Workflow document (YAML or JSON).
    workflow: PathBuf,
    #[arg(long, value_enum, default_value_t = PlanArg::Guest)]
    plan: PlanArg,
    #[arg(long)]
    logged_in: bool,
    #[arg(long)]
    favorite: bool,
    /// Current rating average and count, e.g. `4.5:12`.
    #[arg(long, value_parser = parse_rating)]
    rating: Option<RatingSummary>,
    /// Variable values applied as if typed into the first matching input.
    #[arg(long = "set", value_parser = parse_assignment)]
    assignments: Vec<(String, String)>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PlanArg {
    Guest,
    Free,
    Pro,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Html,
    Json,
}

#[derive(Serialize)]
struct LockRow<'a> {
    step: usize,
    title: &'a str,
    locked: bool,
    reason: Option<pf_engine::LockReason>,
}

/// System clipboard through `arboard`.
struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        arboard::Clipboard::new()
            .and_then(|mut clipboard| clipboard.set_text(text.to_string()))
            .context("clipboard unavailable")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config_path = cli.config.as_deref().map(expand_tilde).unwrap_or_else(default_site_config_path);
    let context_path = cli.context.as_deref().map(expand_tilde).unwrap_or_else(default_global_context_path);
    let config = load_site_config(&config_path)?;
    let profile = load_global_context(&context_path)?;
    debug!(config = %config_path.display(), context = %context_path.display(), "configuration loaded");

    match cli.command {
        Command::Render { page, format } => {
            let rendered = render_page(&page, &config, &profile)?;
            match format {
                OutputFormat::Html => println!("{}", to_html(&rendered, &config)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rendered)?),
            }
        }
        Command::Locks { page } => {
            let rendered = render_page(&page, &config, &profile)?;
            if rendered.is_paywalled() {
                info!(workflow_id = rendered.workflow_id, "workflow is paywalled for this viewer");
            }
            let rows: Vec<LockRow<'_>> = rendered
                .steps()
                .iter()
                .map(|step| LockRow {
                    step: step.idx,
                    title: &step.title,
                    locked: step.locked,
                    reason: step.lock_reason,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Command::Prompts { page, copy } => {
            let rendered = render_page(&page, &config, &profile)?;
            let mut controller = controller(&rendered, &config, "", None)?;
            apply_assignments(&mut controller, &page.assignments)?;
            for step in &controller.page().steps {
                println!("## Step {}: {}\n{}\n", step.idx, step.title, step.prompt.value);
            }
            if let Some(step) = copy {
                let outcome = controller.dispatch(PageAction::CopyPrompt { step }).await?;
                println!("{}", serde_json::to_string(&outcome)?);
            }
        }
        Command::Action {
            page,
            action,
            step,
            value,
            page_url,
            flags,
        } => {
            let rendered = render_page(&page, &config, &profile)?;
            let mut controller = controller(&rendered, &config, &page_url, flags.as_deref())?;
            apply_assignments(&mut controller, &page.assignments)?;

            let mut trigger = ActionTrigger::new(action);
            trigger.step = step;
            trigger.value = value;
            let action = PageAction::decode(&trigger)?;
            let outcome = controller.dispatch(action).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Validate { workflow } => {
            let definition = load_workflow_file(&workflow)?;
            let issues = validate_workflow(&definition);
            if issues.is_empty() {
                println!("{}: ok", workflow.display());
                return Ok(());
            }
            for issue in &issues {
                println!("{}: {}", workflow.display(), issue);
            }
            bail!("{} issue(s) found", issues.len());
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn render_page(args: &PageArgs, config: &SiteConfig, profile: &GlobalContext) -> Result<RenderedWorkflow> {
    let definition = load_workflow_file(&args.workflow)?;
    let plan = match args.plan {
        PlanArg::Guest => ViewerPlan::Guest,
        PlanArg::Free => ViewerPlan::Free,
        PlanArg::Pro => ViewerPlan::Pro,
    };
    let viewer = ViewerContext::new(ViewerPlan::resolve(plan.as_str(), args.logged_in), args.logged_in);
    let mut context = RenderContext::new(config, viewer)
        .with_global_context(profile)
        .with_favorite(args.favorite);
    if let Some(rating) = args.rating {
        context = context.with_rating(rating);
    }
    Ok(render_workflow(&definition, &context))
}

fn controller(rendered: &RenderedWorkflow, config: &SiteConfig, page_url: &str, flags: Option<&str>) -> Result<PageController> {
    let flags = JsonFlagStore::new(flags.map(expand_tilde))?;
    let endpoints = PromptFinderClient::new_from_env()?;
    let controller = PageController::new(
        rendered,
        config,
        page_url,
        Arc::new(flags),
        Box::new(SystemClipboard),
        Arc::new(endpoints),
    )?;
    Ok(controller)
}

fn apply_assignments(controller: &mut PageController, assignments: &[(String, String)]) -> Result<()> {
    for (name, value) in assignments {
        if !controller.set_variable(name, value.clone())? {
            bail!("no input named '{name}' on this page");
        }
    }
    Ok(())
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim().to_string(), value.to_string())),
        _ => Err(format!("expected name=value, got '{raw}'")),
    }
}

fn parse_rating(raw: &str) -> Result<RatingSummary, String> {
    let (avg, count) = raw.split_once(':').ok_or_else(|| format!("expected avg:count, got '{raw}'"))?;
    let avg = avg.trim().parse::<f64>().map_err(|error| error.to_string())?;
    let count = count.trim().parse::<u64>().map_err(|error| error.to_string())?;
    Ok(RatingSummary { avg, count })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments_split_on_the_first_equals() {
        assert_eq!(parse_assignment("topic=a=b"), Ok(("topic".into(), "a=b".into())));
        assert_eq!(parse_assignment(" company =Acme"), Ok(("company".into(), "Acme".into())));
        assert!(parse_assignment("=x").is_err());
        assert!(parse_assignment("novalue").is_err());
    }

    #[test]
    fn rating_argument_parses_average_and_count() {
        assert_eq!(parse_rating("4.5:12"), Ok(RatingSummary { avg: 4.5, count: 12 }));
        assert!(parse_rating("4.5").is_err());
    }

    #[test]
    fn cli_accepts_repeated_assignments() {
        let cli = Cli::try_parse_from([
            "prompt-finder",
            "prompts",
            "wf.yaml",
            "--plan",
            "pro",
            "--logged-in",
            "--set",
            "company=Acme",
            "--set",
            "tone=warm",
        ])
        .expect("parse");
        match cli.command {
            Command::Prompts { page, copy } => {
                assert_eq!(page.assignments.len(), 2);
                assert!(page.logged_in);
                assert!(copy.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
