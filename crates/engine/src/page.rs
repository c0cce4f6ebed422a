//! Interactive page model and variable propagation.
//!
//! A [`PromptPage`] mirrors what the rendered markup exposes to the viewer: per step, the
//! variable inputs (`data-var-name`) and one prompt surface holding its pristine template
//! (`data-base`) next to the displayed text. The page never owns the [`VariableStore`]; every
//! operation that reads or writes variables takes it explicitly so one store can back the whole
//! page.
//!
//! All operations run to completion synchronously, so no render ever observes a half-applied
//! edit.

use pf_types::normalize_variable_name;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::gating::LockReason;
use crate::render::{RenderedStep, RenderedWorkflow};
use crate::store::VariableStore;
use crate::templates::render_template;

/// Failures addressing an element that is not on the page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("step {0} is not on this page")]
    UnknownStep(usize),
    #[error("step {step} has no input at position {position}")]
    UnknownInput { step: usize, position: usize },
    #[error("step {step} has no checklist item at position {position}")]
    UnknownChecklistItem { step: usize, position: usize },
}

/// Portion of the page an operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Scope {
    Page,
    /// A single step by 1-based position.
    Step(usize),
}

/// Address of one variable input: step position plus position within the step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct InputRef {
    pub step: usize,
    pub position: usize,
}

impl InputRef {
    pub fn new(step: usize, position: usize) -> Self {
        Self { step, position }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableInput {
    /// Name as carried in `data-var-name`.
    pub name: String,
    pub label: String,
    pub required: bool,
    pub value: String,
    /// Required and currently blank; drives the required-field highlight.
    pub is_empty: bool,
}

impl VariableInput {
    pub fn normalized_name(&self) -> String {
        normalize_variable_name(&self.name)
    }

    fn refresh_empty_flag(&mut self) {
        self.is_empty = self.required && self.value.trim().is_empty();
    }
}

/// A prompt output field. The template is fixed at construction; only the value changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptSurface {
    template: String,
    pub value: String,
}

impl PromptSurface {
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        Self {
            value: template.clone(),
            template,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    fn render(&mut self, store: &VariableStore) {
        self.value = render_template(&self.template, store);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistItem {
    pub text: String,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepSurface {
    pub idx: usize,
    pub anchor: String,
    pub title: String,
    pub locked: bool,
    pub lock_reason: Option<LockReason>,
    pub checkpoint: Option<String>,
    pub checkpoint_completed: bool,
    pub inputs: Vec<VariableInput>,
    pub prompt: PromptSurface,
    pub checklist: Vec<ChecklistItem>,
    pub active: bool,
}

impl StepSurface {
    fn from_rendered(step: &RenderedStep) -> Self {
        Self {
            idx: step.idx,
            anchor: step.anchor.clone(),
            title: step.title.clone(),
            locked: step.locked,
            lock_reason: step.lock_reason,
            checkpoint: step.checkpoint.clone(),
            checkpoint_completed: false,
            inputs: step
                .inputs
                .iter()
                .map(|input| {
                    let mut variable = VariableInput {
                        name: input.name.clone(),
                        label: input.label.clone(),
                        required: input.required,
                        value: String::new(),
                        is_empty: false,
                    };
                    variable.refresh_empty_flag();
                    variable
                })
                .collect(),
            prompt: PromptSurface::new(step.template.clone()),
            checklist: step
                .checklist
                .iter()
                .map(|text| ChecklistItem {
                    text: text.clone(),
                    checked: false,
                })
                .collect(),
            active: false,
        }
    }

    /// Whether the step waits on its checkpoint before the next step opens.
    pub fn blocks_next(&self) -> bool {
        self.checkpoint.is_some() && !self.checkpoint_completed
    }
}

/// Element that receives focus after a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Focus {
    Input(InputRef),
    Prompt(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptPage {
    pub workflow_id: u64,
    pub steps: Vec<StepSurface>,
    pub focus: Option<Focus>,
    /// Paywalled pages carry no steps.
    pub paywalled: bool,
}

impl PromptPage {
    /// Builds the page from rendered output. Surfaces show their pristine templates until the
    /// first render.
    pub fn from_rendered(rendered: &RenderedWorkflow) -> Self {
        Self {
            workflow_id: rendered.workflow_id,
            steps: rendered.steps().iter().map(StepSurface::from_rendered).collect(),
            focus: None,
            paywalled: rendered.is_paywalled(),
        }
    }

    /// Page-load sequence: fill empty inputs from the store, then refresh everything.
    pub fn load(&mut self, store: &mut VariableStore) {
        self.fill_from_store(Scope::Page, store);
        self.refresh(Scope::Page, store);
        self.mark_empty_required(Scope::Page);
        debug!(workflow_id = self.workflow_id, steps = self.steps.len(), variables = store.len(), "page loaded");
    }

    pub fn step(&self, idx: usize) -> Option<&StepSurface> {
        idx.checked_sub(1).and_then(|position| self.steps.get(position))
    }

    pub fn step_mut(&mut self, idx: usize) -> Option<&mut StepSurface> {
        idx.checked_sub(1).and_then(move |position| self.steps.get_mut(position))
    }

    pub fn input(&self, input: InputRef) -> Option<&VariableInput> {
        self.step(input.step).and_then(|step| step.inputs.get(input.position))
    }

    /// Every input whose normalized name equals `name`.
    pub fn inputs_named(&self, name: &str) -> Vec<InputRef> {
        let key = normalize_variable_name(name);
        self.steps
            .iter()
            .flat_map(|step| {
                step.inputs
                    .iter()
                    .enumerate()
                    .filter(|(_, input)| input.normalized_name() == key)
                    .map(move |(position, _)| InputRef::new(step.idx, position))
            })
            .collect()
    }

    /// Writes every input in `scope` into the store; later inputs win on shared names.
    pub fn sync_from_inputs(&self, scope: Scope, store: &mut VariableStore) {
        for step in self.steps_in(scope) {
            for input in &step.inputs {
                store.set(&input.name, input.value.clone());
            }
        }
    }

    /// Fills empty inputs in `scope` from the store without touching non-empty ones.
    ///
    /// Each fill is followed by the same handling as a user edit, so highlighting and every
    /// prompt surface stay consistent. Returns the number of inputs filled.
    pub fn fill_from_store(&mut self, scope: Scope, store: &mut VariableStore) -> usize {
        let mut pending = Vec::new();
        for step in self.steps_in(scope) {
            for (position, input) in step.inputs.iter().enumerate() {
                if !input.value.is_empty() {
                    continue;
                }
                if let Some(value) = store.get(&input.name) {
                    pending.push((InputRef::new(step.idx, position), value.to_string()));
                }
            }
        }

        let filled = pending.len();
        for (input, value) in pending {
            if let Err(error) = self.on_input(input, value, store) {
                warn!(%error, "skipping fill for missing input");
            }
        }
        filled
    }

    /// Re-renders every prompt surface in `scope` from its pristine template.
    pub fn render_all(&mut self, scope: Scope, store: &VariableStore) {
        for step in self.steps_in_mut(scope) {
            step.prompt.render(store);
        }
    }

    /// Applies the latest input values: sync, then render.
    pub fn refresh(&mut self, scope: Scope, store: &mut VariableStore) {
        self.sync_from_inputs(scope, store);
        self.render_all(scope, store);
    }

    /// Live edit of one input: one store write, then every surface on the page re-renders.
    pub fn on_input(&mut self, input: InputRef, value: impl Into<String>, store: &mut VariableStore) -> Result<(), PageError> {
        let value = value.into();
        let step = self.step_mut(input.step).ok_or(PageError::UnknownStep(input.step))?;
        let field = step.inputs.get_mut(input.position).ok_or(PageError::UnknownInput {
            step: input.step,
            position: input.position,
        })?;

        field.value = value;
        field.refresh_empty_flag();
        if !store.set(&field.name, field.value.clone()) {
            return Ok(());
        }
        self.render_all(Scope::Page, store);
        Ok(())
    }

    /// Recomputes the required-empty flag of every input in `scope`.
    pub fn mark_empty_required(&mut self, scope: Scope) {
        for step in self.steps_in_mut(scope) {
            for input in &mut step.inputs {
                input.refresh_empty_flag();
            }
        }
    }

    /// Navigation to `#step-N`: marks it active, fills and refreshes it, and focuses its first
    /// input (or its prompt when it has none).
    pub fn navigate_to_step(&mut self, idx: usize, store: &mut VariableStore) -> Result<(), PageError> {
        self.set_active(idx)?;
        self.fill_from_store(Scope::Step(idx), store);
        self.refresh(Scope::Step(idx), store);
        self.focus = self.step(idx).map(|step| {
            if step.inputs.is_empty() {
                Focus::Prompt(idx)
            } else {
                Focus::Input(InputRef::new(idx, 0))
            }
        });
        Ok(())
    }

    /// Activates the step named by a `#step-N` fragment. Anything else is ignored.
    pub fn activate_hash(&mut self, hash: &str) -> Option<usize> {
        let idx = parse_step_hash(hash)?;
        self.set_active(idx).ok()?;
        Some(idx)
    }

    /// Focus-first action: the first input of step 1, else its prompt.
    pub fn focus_first(&mut self) -> Option<Focus> {
        let first = self.step(1)?;
        let focus = if first.inputs.is_empty() {
            Focus::Prompt(1)
        } else {
            Focus::Input(InputRef::new(1, 0))
        };
        self.focus = Some(focus);
        self.focus
    }

    pub fn active_step(&self) -> Option<usize> {
        self.steps.iter().find(|step| step.active).map(|step| step.idx)
    }

    /// Flips a checklist item; returns its new state.
    pub fn toggle_checklist_item(&mut self, idx: usize, position: usize) -> Result<bool, PageError> {
        let step = self.step_mut(idx).ok_or(PageError::UnknownStep(idx))?;
        let item = step
            .checklist
            .get_mut(position)
            .ok_or(PageError::UnknownChecklistItem { step: idx, position })?;
        item.checked = !item.checked;
        Ok(item.checked)
    }

    /// Whether step `idx` is held back by a pending checkpoint on the step before it.
    pub fn awaiting_checkpoint(&self, idx: usize) -> bool {
        idx.checked_sub(1)
            .and_then(|previous| self.step(previous))
            .is_some_and(StepSurface::blocks_next)
    }

    /// Displayed prompt text of step `idx`.
    pub fn prompt_text(&self, idx: usize) -> Option<&str> {
        self.step(idx).map(|step| step.prompt.value.as_str())
    }

    fn set_active(&mut self, idx: usize) -> Result<(), PageError> {
        if self.step(idx).is_none() {
            return Err(PageError::UnknownStep(idx));
        }
        for step in &mut self.steps {
            step.active = step.idx == idx;
        }
        Ok(())
    }

    fn steps_in(&self, scope: Scope) -> impl Iterator<Item = &StepSurface> {
        self.steps.iter().filter(move |step| in_scope(scope, step.idx))
    }

    fn steps_in_mut(&mut self, scope: Scope) -> impl Iterator<Item = &mut StepSurface> {
        self.steps.iter_mut().filter(move |step| in_scope(scope, step.idx))
    }
}

fn in_scope(scope: Scope, idx: usize) -> bool {
    match scope {
        Scope::Page => true,
        Scope::Step(target) => target == idx,
    }
}

/// Parses `#step-N` (leading `#` optional) into `N`.
pub fn parse_step_hash(hash: &str) -> Option<usize> {
    let fragment = hash.strip_prefix('#').unwrap_or(hash);
    fragment.strip_prefix("step-")?.parse().ok().filter(|idx| *idx >= 1)
}
