//! Workflow rendering.
//!
//! [`render_workflow`] resolves gating for a viewer and produces a [`RenderedWorkflow`]: either
//! the whole-workflow paywall, an empty-state notice, or the ordered step list with per-step
//! lock state, pristine prompt templates, and variable input descriptors. The structure is the
//! input for both the HTML serializer in [`markup`] and the interactive page model in
//! [`crate::page`].

use pf_types::{
    ContextRequirement, RatingSummary, SiteConfig, StepDefinition, VariableSpec, ViewerContext, WorkflowDefinition,
    normalize_variable_name,
};
use serde::Serialize;
use tracing::debug;

use crate::context::{GlobalContextSource, NoGlobalContext, inject_global_context};
use crate::gating::{GatingPolicy, LockReason, ModeBadge};
use crate::templates::references_previous_output;

pub mod markup;

pub use markup::to_html;

/// Inputs to a single render beyond the workflow document itself.
pub struct RenderContext<'a> {
    pub config: &'a SiteConfig,
    pub viewer: ViewerContext,
    pub global_context: &'a dyn GlobalContextSource,
    pub rating: RatingSummary,
    pub is_favorite: bool,
}

impl<'a> RenderContext<'a> {
    pub fn new(config: &'a SiteConfig, viewer: ViewerContext) -> Self {
        Self {
            config,
            viewer,
            global_context: &NoGlobalContext,
            rating: RatingSummary::default(),
            is_favorite: false,
        }
    }

    pub fn with_global_context(mut self, source: &'a dyn GlobalContextSource) -> Self {
        self.global_context = source;
        self
    }

    pub fn with_rating(mut self, rating: RatingSummary) -> Self {
        self.rating = rating;
        self
    }

    pub fn with_favorite(mut self, is_favorite: bool) -> Self {
        self.is_favorite = is_favorite;
        self
    }
}

/// Fully resolved page structure for one workflow and one viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedWorkflow {
    pub workflow_id: u64,
    pub title: String,
    pub summary: String,
    pub policy: GatingPolicy,
    pub badge: ModeBadge,
    pub viewer: ViewerContext,
    pub is_favorite: bool,
    pub header: WorkflowHeader,
    pub body: WorkflowBody,
    /// Share and rating tiles below the steps; absent for the paywall.
    pub footer: Option<WorkflowFooter>,
}

impl RenderedWorkflow {
    pub fn steps(&self) -> &[RenderedStep] {
        match &self.body {
            WorkflowBody::Steps(steps) => steps,
            _ => &[],
        }
    }

    pub fn is_paywalled(&self) -> bool {
        matches!(self.body, WorkflowBody::Paywall)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "steps", rename_all = "snake_case")]
pub enum WorkflowBody {
    /// Pro workflow shown to a non-Pro viewer: no step bodies at all.
    Paywall,
    /// The workflow has no steps yet.
    Empty,
    Steps(Vec<RenderedStep>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkflowHeader {
    pub info_pills: Vec<InfoPill>,
    pub changelog: Option<String>,
    pub value_panel: Option<ValuePanel>,
    /// How-to box items; `None` when the box is not shown.
    pub howto: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InfoPill {
    UseCase { value: String },
    Version { value: String, stable: bool },
    Updated { value: String },
    Steps { count: usize },
    TotalTime { minutes: u32 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValuePanel {
    pub pain_point: Option<String>,
    pub expected_outcome: Option<String>,
    pub time_saved_min: Option<u32>,
    /// 1..=5; `None` when unrated.
    pub difficulty: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowFooter {
    pub share: bool,
    pub rating: Option<RatingSummary>,
}

/// One step of the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedStep {
    /// 1-based position.
    pub idx: usize,
    pub anchor: String,
    pub step_id: Option<String>,
    pub title: String,
    pub objective: String,
    pub estimated_time_min: Option<u32>,
    pub locked: bool,
    pub lock_reason: Option<LockReason>,
    /// The template references `{previous_output}`.
    pub uses_previous_output: bool,
    pub inputs: Vec<RenderedInput>,
    /// Pristine template (authored prompt plus any injected context).
    pub template: String,
    /// Authored prompt before context injection.
    pub original_template: String,
    pub example_output: Option<String>,
    pub checklist: Vec<String>,
    pub context_requirements: Vec<ContextRequirement>,
    pub checkpoint: Option<String>,
    pub next: NextHint,
}

/// Variable input descriptor, the equivalent of an `input[data-var-name]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedInput {
    /// Name as authored (trimmed), carried in `data-var-name`.
    pub name: String,
    pub normalized_name: String,
    pub label: String,
    pub description: Option<String>,
    pub placeholder: String,
    pub example_value: Option<String>,
    pub required: bool,
}

impl RenderedInput {
    fn from_spec(spec: &VariableSpec) -> Self {
        Self {
            name: spec.name.trim().to_string(),
            normalized_name: normalize_variable_name(&spec.name),
            label: spec.display_label(),
            description: spec.description.clone().filter(|text| !text.trim().is_empty()),
            placeholder: spec.input_placeholder(),
            example_value: spec.example_value.clone().filter(|text| !text.trim().is_empty()),
            required: spec.required,
        }
    }
}

/// Navigation hint after a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NextHint {
    Continue {
        next_idx: usize,
        next_title: String,
        /// The next template asks for this step's output.
        uses_previous_output: bool,
    },
    Done,
}

/// Renders `workflow` for the viewer in `context`.
pub fn render_workflow(workflow: &WorkflowDefinition, context: &RenderContext<'_>) -> RenderedWorkflow {
    let config = context.config;
    let policy = GatingPolicy::resolve(&workflow.gating, &config.workflow_defaults);
    debug!(
        workflow_id = workflow.workflow_id,
        mode = %policy.mode,
        free_step_limit = policy.free_step_limit,
        login_required = policy.login_required,
        plan = %context.viewer.plan,
        logged_in = context.viewer.logged_in,
        "rendering workflow"
    );

    let header = render_header(workflow, config);
    let (body, footer) = if policy.requires_paywall(&context.viewer) {
        (WorkflowBody::Paywall, None)
    } else {
        let body = if workflow.steps.is_empty() {
            WorkflowBody::Empty
        } else {
            WorkflowBody::Steps(
                workflow
                    .indexed_steps()
                    .map(|(idx, step)| render_step(workflow, idx, step, &policy, context))
                    .collect(),
            )
        };
        (body, render_footer(config, context.rating))
    };

    RenderedWorkflow {
        workflow_id: workflow.workflow_id,
        title: workflow.title.clone(),
        summary: workflow.summary.clone(),
        badge: policy.badge(),
        policy,
        viewer: context.viewer,
        is_favorite: context.is_favorite,
        header,
        body,
        footer,
    }
}

fn render_step(
    workflow: &WorkflowDefinition,
    idx: usize,
    step: &StepDefinition,
    policy: &GatingPolicy,
    context: &RenderContext<'_>,
) -> RenderedStep {
    let locked = policy.is_locked(idx, &context.viewer);
    let template = inject_global_context(&step.prompt, &step.context_requirements, context.global_context);

    RenderedStep {
        idx,
        anchor: step_anchor(idx),
        step_id: step.step_id.clone().filter(|id| !id.trim().is_empty()),
        title: step.title.clone(),
        objective: step.objective.clone(),
        estimated_time_min: step.estimated_time_min.filter(|minutes| *minutes > 0),
        locked,
        lock_reason: policy.lock_reason(idx, &context.viewer),
        uses_previous_output: references_previous_output(&step.prompt),
        inputs: step.active_variables().map(RenderedInput::from_spec).collect(),
        template,
        original_template: step.prompt.clone(),
        example_output: step.example_output.clone().filter(|text| !text.trim().is_empty()),
        checklist: step.checklist.clone(),
        context_requirements: step.context_requirements.clone(),
        checkpoint: step.checkpoint().map(str::to_string),
        next: next_hint(workflow, idx),
    }
}

fn next_hint(workflow: &WorkflowDefinition, idx: usize) -> NextHint {
    match workflow.step(idx + 1) {
        Some(next) => {
            let next_idx = idx + 1;
            let next_title = if next.title.trim().is_empty() {
                format!("Step {next_idx}")
            } else {
                next.title.clone()
            };
            NextHint::Continue {
                next_idx,
                next_title,
                uses_previous_output: references_previous_output(&next.prompt),
            }
        }
        None => NextHint::Done,
    }
}

fn render_header(workflow: &WorkflowDefinition, config: &SiteConfig) -> WorkflowHeader {
    let mut header = WorkflowHeader::default();

    if config.layout.show_info_pills {
        if let Some(use_case) = non_blank(&workflow.use_case) {
            header.info_pills.push(InfoPill::UseCase { value: use_case });
        }
        if let Some(version) = non_blank(&workflow.version) {
            header.info_pills.push(InfoPill::Version {
                value: version,
                stable: workflow.stable_version,
            });
        }
        if let Some(updated) = non_blank(&workflow.last_update) {
            header.info_pills.push(InfoPill::Updated { value: updated });
        }
        if workflow.step_count() > 0 {
            header.info_pills.push(InfoPill::Steps {
                count: workflow.step_count(),
            });
        }
        let minutes = workflow.total_estimated_minutes();
        if minutes > 0 {
            header.info_pills.push(InfoPill::TotalTime { minutes });
        }
    }

    if config.feature_flags.show_changelog {
        header.changelog = non_blank(&workflow.changelog);
    }

    if config.feature_flags.show_value_panel() {
        let panel = ValuePanel {
            pain_point: non_blank(&workflow.pain_point),
            expected_outcome: non_blank(&workflow.expected_outcome),
            time_saved_min: workflow.time_saved_min.filter(|minutes| *minutes > 0),
            difficulty: Some(workflow.difficulty()).filter(|difficulty| *difficulty > 0),
        };
        if panel != ValuePanel::default() {
            header.value_panel = Some(panel);
        }
    }

    if workflow.step_count() > 1 && config.feature_flags.howto_box {
        header.howto = Some(config.copy.items("howto_items"));
    }

    header
}

fn render_footer(config: &SiteConfig, rating: RatingSummary) -> Option<WorkflowFooter> {
    if !config.layout.three_grid_under_steps {
        return None;
    }
    Some(WorkflowFooter {
        share: config.feature_flags.share,
        rating: config.feature_flags.rating.then_some(rating),
    })
}

/// Anchor id for step `idx`.
pub fn step_anchor(idx: usize) -> String {
    format!("step-{idx}")
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.as_ref().map(|text| text.trim()).filter(|text| !text.is_empty()).map(str::to_string)
}
