//! Page controller: owns the page, its variable store, and the widgets, and dispatches decoded
//! [`PageAction`]s through a single match.

use std::sync::Arc;

use anyhow::Result;
use pf_types::{CopyStrings, FeatureFlags, SiteConfig, SiteUrls};
use pf_util::FlagStore;
use serde::Serialize;
use tracing::{debug, warn};

use crate::actions::PageAction;
use crate::gating::LockReason;
use crate::interactions::{
    CheckpointState, FavoriteState, FavoriteWidget, InteractionEndpoints, InteractionError, RatingState, RatingWidget,
    VARS_HINT_HIDDEN_KEY, complete_checkpoint, howto_hidden_key, restore_checkpoints,
};
use crate::page::{Focus, InputRef, PageError, PromptPage, Scope};
use crate::render::RenderedWorkflow;
use crate::store::VariableStore;

/// System clipboard seam.
pub trait Clipboard: Send {
    fn set_text(&mut self, text: &str) -> Result<()>;
}

/// Clipboard that remembers the last copied text.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    pub contents: Option<String>,
}

impl Clipboard for MemoryClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        self.contents = Some(text.to_string());
        Ok(())
    }
}

/// Dismissed panels restored from flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PanelPreferences {
    pub howto_hidden: bool,
    pub vars_hint_hidden: bool,
}

/// Visible result of a dispatched action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// The action landed inside a locked step and the viewer is sent elsewhere.
    Redirect { url: String, reason: LockReason },
    /// The step waits on the previous step's checkpoint.
    AwaitingCheckpoint { step: usize },
    Copied { step: usize, label: String, ok: bool },
    LinkCopied { ok: bool },
    CheckpointCompleted { step: usize },
    Navigated { step: usize, focus: Option<Focus> },
    Focused { focus: Option<Focus> },
    HowtoHidden,
    VarsHintHidden,
    ChecklistToggled { step: usize, position: usize, checked: bool },
    Rated { state: RatingState, message: String },
    Favorite { state: FavoriteState, label: String },
    /// Feature disabled by configuration.
    Disabled { feature: &'static str },
}

pub struct PageController {
    page: PromptPage,
    store: VariableStore,
    flags: Arc<dyn FlagStore>,
    clipboard: Box<dyn Clipboard>,
    endpoints: Arc<dyn InteractionEndpoints>,
    rating: Option<RatingWidget>,
    favorite: FavoriteWidget,
    panels: PanelPreferences,
    feature_flags: FeatureFlags,
    copy: CopyStrings,
    urls: SiteUrls,
    page_url: String,
}

impl PageController {
    /// Builds the controller and runs the page-load sequence.
    pub fn new(
        rendered: &RenderedWorkflow,
        config: &SiteConfig,
        page_url: impl Into<String>,
        flags: Arc<dyn FlagStore>,
        clipboard: Box<dyn Clipboard>,
        endpoints: Arc<dyn InteractionEndpoints>,
    ) -> Result<Self, InteractionError> {
        let mut page = PromptPage::from_rendered(rendered);
        let mut store = VariableStore::new();
        page.load(&mut store);
        restore_checkpoints(&mut page, flags.as_ref())?;

        let rating = match &rendered.footer {
            Some(footer) => footer
                .rating
                .map(|summary| RatingWidget::load(rendered.workflow_id, summary, flags.as_ref(), &config.copy))
                .transpose()?,
            None => None,
        };
        let panels = PanelPreferences {
            howto_hidden: flags.is_set(&howto_hidden_key(rendered.workflow_id))?,
            vars_hint_hidden: flags.is_set(VARS_HINT_HIDDEN_KEY)?,
        };

        Ok(Self {
            page,
            store,
            rating,
            favorite: FavoriteWidget::new(rendered.workflow_id, rendered.is_favorite, rendered.viewer.logged_in),
            panels,
            feature_flags: config.feature_flags.clone(),
            copy: config.copy.clone(),
            urls: config.urls.clone(),
            page_url: page_url.into(),
            flags,
            clipboard,
            endpoints,
        })
    }

    pub fn page(&self) -> &PromptPage {
        &self.page
    }

    pub fn store(&self) -> &VariableStore {
        &self.store
    }

    pub fn panels(&self) -> PanelPreferences {
        self.panels
    }

    pub fn rating(&self) -> Option<&RatingWidget> {
        self.rating.as_ref()
    }

    pub fn favorite(&self) -> &FavoriteWidget {
        &self.favorite
    }

    /// Live edit of one variable input.
    pub fn input(&mut self, input: InputRef, value: impl Into<String>) -> Result<(), PageError> {
        self.page.on_input(input, value, &mut self.store)
    }

    /// Sets the first input named `name` on the page, as if typed there.
    pub fn set_variable(&mut self, name: &str, value: impl Into<String>) -> Result<bool, PageError> {
        match self.page.inputs_named(name).first() {
            Some(input) => {
                self.page.on_input(*input, value, &mut self.store)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn refresh(&mut self, scope: Scope) {
        self.page.refresh(scope, &mut self.store);
    }

    pub async fn dispatch(&mut self, action: PageAction) -> Result<ActionOutcome, InteractionError> {
        debug!(?action, "dispatching page action");

        if let Some(step) = action.origin_step()
            && let Some(outcome) = self.intercept(step, &action)
        {
            return Ok(outcome);
        }

        let outcome = match action {
            PageAction::CopyPrompt { step } => self.copy_prompt(step)?,
            PageAction::ContinueCheckpoint { step } => {
                match complete_checkpoint(&mut self.page, step, self.flags.as_ref())? {
                    CheckpointState::Completed => ActionOutcome::CheckpointCompleted { step },
                    CheckpointState::Pending => ActionOutcome::AwaitingCheckpoint { step },
                }
            }
            PageAction::HideHowto => {
                self.flags.set(&howto_hidden_key(self.page.workflow_id), "1")?;
                self.panels.howto_hidden = true;
                ActionOutcome::HowtoHidden
            }
            PageAction::HideVarsHint => {
                self.flags.set(VARS_HINT_HIDDEN_KEY, "1")?;
                self.panels.vars_hint_hidden = true;
                ActionOutcome::VarsHintHidden
            }
            PageAction::CopyLink => {
                if !self.feature_flags.share {
                    return Ok(ActionOutcome::Disabled { feature: "share" });
                }
                let ok = self.copy_text(&self.page_url.clone());
                ActionOutcome::LinkCopied { ok }
            }
            PageAction::FocusFirst => ActionOutcome::Focused {
                focus: self.page.focus_first(),
            },
            PageAction::GoToStep { step, .. } => {
                self.page.navigate_to_step(step, &mut self.store)?;
                ActionOutcome::Navigated {
                    step,
                    focus: self.page.focus,
                }
            }
            PageAction::ToggleChecklist { step, position } => {
                let checked = self.page.toggle_checklist_item(step, position)?;
                ActionOutcome::ChecklistToggled { step, position, checked }
            }
            PageAction::Rate { value } => {
                let Some(rating) = self.rating.as_mut().filter(|_| self.feature_flags.rating) else {
                    return Ok(ActionOutcome::Disabled { feature: "rating" });
                };
                let state = rating
                    .submit(value, self.endpoints.as_ref(), self.flags.as_ref(), &self.copy)
                    .await?;
                ActionOutcome::Rated {
                    state,
                    message: rating.message.clone(),
                }
            }
            PageAction::ToggleFavorite => {
                let state = self.favorite.toggle(self.endpoints.as_ref(), &self.copy).await;
                ActionOutcome::Favorite {
                    state,
                    label: self.favorite.label.clone(),
                }
            }
        };
        Ok(outcome)
    }

    /// Ends transient widget messages.
    pub fn settle(&mut self) {
        self.favorite.settle();
    }

    fn intercept(&self, step: usize, action: &PageAction) -> Option<ActionOutcome> {
        let surface = self.page.step(step)?;
        if surface.locked {
            let reason = surface.lock_reason.unwrap_or(LockReason::UpgradeRequired);
            let url = match reason {
                LockReason::LoginRequired => self.urls.login.clone(),
                LockReason::UpgradeRequired => self.urls.pricing.clone(),
            };
            debug!(step, ?reason, %url, "action inside locked step redirected");
            return Some(ActionOutcome::Redirect { url, reason });
        }
        if self.page.awaiting_checkpoint(step) && !matches!(action, PageAction::GoToStep { .. }) {
            return Some(ActionOutcome::AwaitingCheckpoint { step: step - 1 });
        }
        None
    }

    fn copy_prompt(&mut self, step: usize) -> Result<ActionOutcome, PageError> {
        self.page.refresh(Scope::Step(step), &mut self.store);
        let text = self
            .page
            .prompt_text(step)
            .ok_or(PageError::UnknownStep(step))?
            .to_string();
        let ok = self.copy_text(&text);
        let label = if ok {
            self.copy.text("copied_label", "Copied")
        } else {
            self.copy.text("copy_failed", "Copy failed")
        };
        Ok(ActionOutcome::Copied { step, label, ok })
    }

    fn copy_text(&mut self, text: &str) -> bool {
        match self.clipboard.set_text(text) {
            Ok(()) => true,
            Err(error) => {
                warn!(%error, "clipboard write failed");
                false
            }
        }
    }
}
