//! # Prompt Finder Engine
//!
//! The engine turns an authored workflow definition into a gated, interactive prompt page.
//!
//! ## Key Features
//!
//! - **Gating**: Resolves the effective access policy and decides, per step, whether the viewer
//!   may interact with it and why not
//! - **Rendering**: Produces a structured view of the workflow (header, steps, footer) plus the
//!   HTML markup the page is served with
//! - **Variable Propagation**: A single page-wide variable store feeds every prompt surface;
//!   editing one input re-renders every prompt that references it
//! - **Interactions**: Rating, favorite, and checkpoint widgets with persisted client flags
//!
//! ## Usage
//!
//! ```rust
//! use pf_engine::{VariableStore, render_template};
//!
//! let mut store = VariableStore::new();
//! store.set("{Company}", "Acme");
//! assert_eq!(render_template("Write for {company} about {topic}", &store), "Write for Acme about {topic}");
//! ```
//!
//! ## Architecture
//!
//! - **`gating`**: Access policy resolution and the step lock predicate
//! - **`context`**: Global context injection into prompt templates
//! - **`templates`** / **`store`**: Placeholder substitution and the page-wide variable store
//! - **`render`**: Structured rendering and markup
//! - **`page`**: The interactive page model and propagation rules
//! - **`interactions`**: Rating, favorite, and checkpoint state machines
//! - **`actions`** / **`controller`**: Decoding `data-action` triggers and dispatching them

pub mod actions;
pub mod context;
pub mod controller;
pub mod gating;
pub mod interactions;
pub mod page;
pub mod render;
pub mod store;
pub mod templates;

pub use actions::{ActionError, ActionTrigger, PageAction};
pub use context::{ContextField, GlobalContextSource, NoGlobalContext, inject_global_context};
pub use controller::{ActionOutcome, Clipboard, MemoryClipboard, PageController, PanelPreferences};
pub use gating::{DEFAULT_FREE_STEP_LIMIT, GatingPolicy, LockReason, ModeBadge, is_step_locked};
pub use interactions::{
    CheckpointState, FavoriteState, FavoriteWidget, InteractionEndpoints, InteractionError, RatingState, RatingWidget,
};
pub use page::{Focus, InputRef, PageError, PromptPage, Scope, StepSurface, VariableInput, parse_step_hash};
pub use render::{
    InfoPill, NextHint, RenderContext, RenderedInput, RenderedStep, RenderedWorkflow, ValuePanel, WorkflowBody, WorkflowFooter,
    WorkflowHeader, render_workflow, step_anchor, to_html,
};
pub use store::VariableStore;
pub use templates::{extract_placeholders, references_previous_output, render_template, unresolved_placeholders};
