use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pf_api::ApiError;
use pf_engine::{
    ActionOutcome, Clipboard, FavoriteState, Focus, InputRef, InteractionEndpoints, LockReason, PageAction, PageController,
    RatingState, RenderContext, Scope, render_workflow,
};
use pf_types::{
    FavoriteDenial, FavoriteRequest, FavoriteToggle, RatingRequest, RatingSummary, SiteConfig, ViewerContext, ViewerPlan,
    WorkflowDefinition,
};
use pf_util::{FlagStore, InMemoryFlagStore, JsonFlagStore};

const PAGE_URL: &str = "https://promptfinder.example/workflows/cold-outreach";

fn load_workflow() -> WorkflowDefinition {
    serde_yaml::from_str(include_str!("data/cold_outreach.yaml")).expect("parse workflow fixture")
}

fn load_config() -> SiteConfig {
    serde_json::from_str(include_str!("data/site_config.json")).expect("parse config fixture")
}

#[derive(Clone, Default)]
struct SharedClipboard(Arc<Mutex<Vec<String>>>);

impl SharedClipboard {
    fn last(&self) -> Option<String> {
        self.0.lock().unwrap().last().cloned()
    }
}

impl Clipboard for SharedClipboard {
    fn set_text(&mut self, text: &str) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct FakeEndpoints {
    rating_calls: AtomicUsize,
    favorite_calls: AtomicUsize,
    favorites_offline: AtomicBool,
}

#[async_trait]
impl InteractionEndpoints for FakeEndpoints {
    async fn submit_rating(&self, request: RatingRequest) -> Result<RatingSummary, ApiError> {
        self.rating_calls.fetch_add(1, Ordering::SeqCst);
        Ok(RatingSummary::from_totals(u64::from(request.rating) + 5, 2))
    }

    async fn toggle_favorite(&self, _request: FavoriteRequest) -> Result<FavoriteToggle, ApiError> {
        self.favorite_calls.fetch_add(1, Ordering::SeqCst);
        if self.favorites_offline.load(Ordering::SeqCst) {
            return Err(ApiError::Network("connection reset".into()));
        }
        Ok(FavoriteToggle { added: true, count: 1 })
    }
}

struct Harness {
    controller: PageController,
    clipboard: SharedClipboard,
    endpoints: Arc<FakeEndpoints>,
    flags: Arc<InMemoryFlagStore>,
}

fn harness(viewer: ViewerContext, flags: Arc<InMemoryFlagStore>) -> Harness {
    let workflow = load_workflow();
    let config = load_config();
    let rendered = render_workflow(&workflow, &RenderContext::new(&config, viewer));
    let clipboard = SharedClipboard::default();
    let endpoints = Arc::new(FakeEndpoints::default());
    let controller = PageController::new(
        &rendered,
        &config,
        PAGE_URL,
        flags.clone(),
        Box::new(clipboard.clone()),
        endpoints.clone(),
    )
    .expect("controller");
    Harness {
        controller,
        clipboard,
        endpoints,
        flags,
    }
}

#[test]
fn one_edit_propagates_to_every_step() {
    let mut h = harness(ViewerContext::guest(), Arc::new(InMemoryFlagStore::new()));
    let page = h.controller.page();
    assert!(page.input(InputRef::new(1, 0)).unwrap().is_empty, "required input starts highlighted");

    h.controller.input(InputRef::new(1, 0), "Globex").unwrap();

    let page = h.controller.page();
    assert_eq!(
        page.prompt_text(1),
        Some("Research Globex and summarise what Globex sells to {audience}.")
    );
    assert_eq!(
        page.prompt_text(2),
        Some("Using {previous_output}, write an email to Globex in a {tone} tone.")
    );
    assert_eq!(page.prompt_text(3), Some("Shorten the email for Globex."));
    assert!(!page.input(InputRef::new(1, 0)).unwrap().is_empty);
    assert_eq!(h.controller.store().get("COMPANY"), Some("Globex"));
}

#[test]
fn last_edit_wins_across_steps() {
    let mut h = harness(ViewerContext::new(ViewerPlan::Free, true), Arc::new(InMemoryFlagStore::new()));
    h.controller.input(InputRef::new(1, 0), "Globex").unwrap();
    h.controller.input(InputRef::new(2, 0), "Initech").unwrap();

    let page = h.controller.page();
    assert_eq!(page.prompt_text(3), Some("Shorten the email for Initech."));
    assert!(page.prompt_text(1).unwrap().starts_with("Research Initech"));
    assert_eq!(page.input(InputRef::new(1, 0)).unwrap().value, "Globex");
}

#[test]
fn refresh_after_clearing_keeps_placeholders_visible() {
    let mut h = harness(ViewerContext::guest(), Arc::new(InMemoryFlagStore::new()));
    h.controller.input(InputRef::new(1, 1), "CTOs").unwrap();
    h.controller.input(InputRef::new(1, 1), "").unwrap();
    h.controller.refresh(Scope::Page);
    assert_eq!(
        h.controller.page().prompt_text(1),
        Some("Research {company} and summarise what {Company} sells to {audience}.")
    );
}

#[tokio::test]
async fn checkpoint_holds_back_the_next_step_until_confirmed() {
    let mut h = harness(ViewerContext::guest(), Arc::new(InMemoryFlagStore::new()));
    h.controller.input(InputRef::new(1, 0), "Globex").unwrap();

    let outcome = h.controller.dispatch(PageAction::CopyPrompt { step: 2 }).await.unwrap();
    assert_eq!(outcome, ActionOutcome::AwaitingCheckpoint { step: 1 });
    assert!(h.clipboard.last().is_none());

    let outcome = h.controller.dispatch(PageAction::ContinueCheckpoint { step: 1 }).await.unwrap();
    assert_eq!(outcome, ActionOutcome::CheckpointCompleted { step: 1 });
    assert!(h.flags.is_set("pf_checkpoint_314_1").unwrap());

    // Copy re-syncs the step's own inputs, so reach it through navigation to fill them first.
    h.controller
        .dispatch(PageAction::GoToStep { step: 2, from: Some(1) })
        .await
        .unwrap();
    let outcome = h.controller.dispatch(PageAction::CopyPrompt { step: 2 }).await.unwrap();
    assert_eq!(
        outcome,
        ActionOutcome::Copied {
            step: 2,
            label: "Copied!".into(),
            ok: true
        }
    );
    assert_eq!(
        h.clipboard.last().as_deref(),
        Some("Using {previous_output}, write an email to Globex in a {tone} tone.")
    );

    let reloaded = harness(ViewerContext::guest(), h.flags.clone());
    assert!(!reloaded.controller.page().awaiting_checkpoint(2));
}

#[tokio::test]
async fn locked_step_actions_redirect_by_reason() {
    let mut guest = harness(ViewerContext::guest(), Arc::new(InMemoryFlagStore::new()));
    let outcome = guest.controller.dispatch(PageAction::CopyPrompt { step: 3 }).await.unwrap();
    assert_eq!(
        outcome,
        ActionOutcome::Redirect {
            url: "https://promptfinder.example/login".into(),
            reason: LockReason::LoginRequired
        }
    );
    assert!(guest.clipboard.last().is_none());

    let mut member = harness(ViewerContext::new(ViewerPlan::Free, true), Arc::new(InMemoryFlagStore::new()));
    member.controller.dispatch(PageAction::ContinueCheckpoint { step: 1 }).await.unwrap();
    let outcome = member.controller.dispatch(PageAction::CopyPrompt { step: 3 }).await.unwrap();
    assert!(matches!(outcome, ActionOutcome::Copied { step: 3, ok: true, .. }));
}

#[tokio::test]
async fn navigation_fills_and_focuses_the_target_step() {
    let mut h = harness(ViewerContext::guest(), Arc::new(InMemoryFlagStore::new()));
    h.controller.input(InputRef::new(1, 0), "Globex").unwrap();

    let outcome = h
        .controller
        .dispatch(PageAction::GoToStep { step: 2, from: Some(1) })
        .await
        .unwrap();
    assert_eq!(
        outcome,
        ActionOutcome::Navigated {
            step: 2,
            focus: Some(Focus::Input(InputRef::new(2, 0)))
        }
    );
    let page = h.controller.page();
    assert_eq!(page.active_step(), Some(2));
    assert_eq!(page.input(InputRef::new(2, 0)).unwrap().value, "Globex");
}

#[tokio::test]
async fn rating_locks_after_first_submission() {
    let mut h = harness(ViewerContext::guest(), Arc::new(InMemoryFlagStore::new()));

    let outcome = h.controller.dispatch(PageAction::Rate { value: 4 }).await.unwrap();
    assert_eq!(
        outcome,
        ActionOutcome::Rated {
            state: RatingState::Rated,
            message: "Thanks! (4/5)".into()
        }
    );
    assert_eq!(h.controller.rating().unwrap().summary.count, 2);

    let outcome = h.controller.dispatch(PageAction::Rate { value: 1 }).await.unwrap();
    assert_eq!(
        outcome,
        ActionOutcome::Rated {
            state: RatingState::Rated,
            message: "You already rated.".into()
        }
    );
    assert_eq!(h.endpoints.rating_calls.load(Ordering::SeqCst), 1);
    assert!(h.flags.is_set("pf_rated_314").unwrap());
}

#[tokio::test]
async fn favorites_need_a_login() {
    let mut guest = harness(ViewerContext::guest(), Arc::new(InMemoryFlagStore::new()));
    let outcome = guest.controller.dispatch(PageAction::ToggleFavorite).await.unwrap();
    assert_eq!(
        outcome,
        ActionOutcome::Favorite {
            state: FavoriteState::Denied {
                was_on: false,
                reason: FavoriteDenial::NotLoggedIn
            },
            label: "Please log in".into()
        }
    );
    assert_eq!(guest.endpoints.favorite_calls.load(Ordering::SeqCst), 0);

    let mut member = harness(ViewerContext::new(ViewerPlan::Free, true), Arc::new(InMemoryFlagStore::new()));
    let outcome = member.controller.dispatch(PageAction::ToggleFavorite).await.unwrap();
    assert!(matches!(outcome, ActionOutcome::Favorite { state: FavoriteState::On, .. }));
    assert!(member.controller.favorite().is_on());
}

#[tokio::test]
async fn failed_favorite_toggle_shows_an_error_then_restores() {
    let mut h = harness(ViewerContext::new(ViewerPlan::Free, true), Arc::new(InMemoryFlagStore::new()));
    assert_eq!(h.controller.favorite().label, "Save to favorites");
    h.endpoints.favorites_offline.store(true, Ordering::SeqCst);

    let outcome = h.controller.dispatch(PageAction::ToggleFavorite).await.unwrap();
    assert_eq!(
        outcome,
        ActionOutcome::Favorite {
            state: FavoriteState::Failed { was_on: false },
            label: "Error".into()
        }
    );
    assert_eq!(h.endpoints.favorite_calls.load(Ordering::SeqCst), 1);

    h.controller.settle();
    assert_eq!(h.controller.favorite().state, FavoriteState::Off);
    assert_eq!(h.controller.favorite().label, "Save to favorites");
}

#[tokio::test]
async fn dismissed_panels_and_shared_link_persist() {
    let flags = Arc::new(InMemoryFlagStore::new());
    let mut h = harness(ViewerContext::guest(), flags.clone());
    assert!(!h.controller.panels().howto_hidden);

    assert_eq!(h.controller.dispatch(PageAction::HideHowto).await.unwrap(), ActionOutcome::HowtoHidden);
    assert_eq!(h.controller.dispatch(PageAction::CopyLink).await.unwrap(), ActionOutcome::LinkCopied { ok: true });
    assert_eq!(h.clipboard.last().as_deref(), Some(PAGE_URL));

    let checked = h
        .controller
        .dispatch(PageAction::ToggleChecklist { step: 1, position: 1 })
        .await
        .unwrap();
    assert_eq!(
        checked,
        ActionOutcome::ChecklistToggled {
            step: 1,
            position: 1,
            checked: true
        }
    );

    let reloaded = harness(ViewerContext::guest(), flags);
    assert!(reloaded.controller.panels().howto_hidden);
    assert!(!reloaded.controller.panels().vars_hint_hidden);
}

#[tokio::test]
async fn json_flag_file_survives_a_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flags.json");
    let workflow = load_workflow();
    let config = load_config();
    let rendered = render_workflow(&workflow, &RenderContext::new(&config, ViewerContext::guest()));
    let open = |path: &std::path::Path| {
        let flags = JsonFlagStore::new(Some(path.to_path_buf())).unwrap();
        PageController::new(
            &rendered,
            &config,
            PAGE_URL,
            Arc::new(flags),
            Box::new(SharedClipboard::default()),
            Arc::new(FakeEndpoints::default()),
        )
        .unwrap()
    };

    let mut first = open(&path);
    first.dispatch(PageAction::HideVarsHint).await.unwrap();
    first.dispatch(PageAction::ContinueCheckpoint { step: 1 }).await.unwrap();
    assert!(path.exists());

    let second = open(&path);
    assert!(second.panels().vars_hint_hidden);
    assert!(!second.page().awaiting_checkpoint(2));
}
