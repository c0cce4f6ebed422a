//! HTML serialization of a [`RenderedWorkflow`].
//!
//! The markup carries the attributes the interactive page depends on: `data-base` holds each
//! step's pristine template, inputs are tagged with `data-var-name`, controls with
//! `data-action`, and steps are anchored as `id="step-N"`. Every piece of dynamic text goes
//! through the escaping helpers.

use pf_types::{CopyStrings, SiteConfig};
use pf_util::{escape_attr, escape_html, escape_multiline};

use super::{InfoPill, NextHint, RenderedStep, RenderedWorkflow, ValuePanel, WorkflowBody, WorkflowFooter, WorkflowHeader};
use crate::gating::LockReason;

const STAR_TITLES: [&str; 5] = ["1 = Not helpful", "2 = Needs work", "3 = Okay", "4 = Helpful", "5 = Excellent"];

/// Serializes the rendered workflow to an HTML fragment.
pub fn to_html(rendered: &RenderedWorkflow, config: &SiteConfig) -> String {
    let copy = &config.copy;
    let mut html = String::new();

    html.push_str(&format!(
        "<div class=\"pf-workflow pf-workflows\" data-workflow-id=\"{}\" data-login-url=\"{}\" data-upgrade-url=\"{}\">\n",
        rendered.workflow_id,
        escape_attr(&config.urls.login),
        escape_attr(&config.urls.pricing)
    ));
    write_header(&mut html, rendered, config);

    match &rendered.body {
        WorkflowBody::Paywall => write_paywall(&mut html, config),
        WorkflowBody::Empty => {
            html.push_str("<div class=\"pf-content\">\n");
            html.push_str(&format!(
                "<p class=\"pf-empty\">{}</p>\n",
                escape_html(&copy.text("empty_steps", "No steps defined for this workflow yet."))
            ));
            html.push_str("</div>\n");
        }
        WorkflowBody::Steps(steps) => {
            html.push_str("<div class=\"pf-content\">\n<ol class=\"pf-steps\" id=\"pf-steps\">\n");
            for step in steps {
                let next_locked = steps.get(step.idx).is_some_and(|next| next.locked);
                write_step(&mut html, step, next_locked, config);
            }
            html.push_str("</ol>\n</div>\n");
        }
    }

    if let Some(footer) = &rendered.footer {
        write_footer(&mut html, rendered.workflow_id, footer, copy);
    }
    html.push_str("</div>\n");
    html
}

fn write_header(html: &mut String, rendered: &RenderedWorkflow, config: &SiteConfig) {
    let copy = &config.copy;
    let header = &rendered.header;

    html.push_str("<header class=\"pf-header\">\n");
    html.push_str(&format!("<h1 class=\"pf-title\">{}</h1>\n", escape_html(&rendered.title)));

    html.push_str("<div class=\"pf-headbar\">\n<div class=\"pf-headbar-left\">\n");
    if config.feature_flags.show_mode_legend() {
        html.push_str(&format!(
            "<div class=\"pf-modebadge\" data-mode=\"{}\"><span class=\"pf-modebadge__label\">{}</span><span class=\"pf-modebadge__sub\">{}</span></div>\n",
            escape_attr(&rendered.badge.mode),
            escape_html(&rendered.badge.label),
            escape_html(&rendered.badge.sub)
        ));
    }
    html.push_str("</div>\n<div class=\"pf-headbar-right\">\n");
    let (fav_class, fav_label) = if rendered.is_favorite {
        (" is-on", "Saved")
    } else {
        ("", "Save to favorites")
    };
    html.push_str(&format!(
        "<button class=\"pf-fav-btn{fav_class}\" data-post-id=\"{}\" data-action=\"toggle-favorite\" aria-pressed=\"{}\"><span class=\"pf-fav-ico\">♥</span><span class=\"pf-fav-label\">{fav_label}</span></button>\n",
        rendered.workflow_id, rendered.is_favorite
    ));
    html.push_str("</div>\n</div>\n");

    if !rendered.summary.trim().is_empty() {
        html.push_str(&format!("<p class=\"pf-summary\">{}</p>\n", escape_multiline(&rendered.summary)));
    }
    write_info_pills(html, header, copy);
    if let Some(changelog) = &header.changelog {
        html.push_str(&format!(
            "<details class=\"pf-changelog pf-tile\"><summary>{}</summary><div class=\"pf-changelog-content\">{}</div></details>\n",
            escape_html(&copy.text("changelog_title", "Changelog")),
            escape_multiline(changelog)
        ));
    }
    if let Some(panel) = &header.value_panel {
        write_value_panel(html, panel, copy);
    }
    if let Some(items) = &header.howto {
        html.push_str(&format!(
            "<details class=\"pf-howto pf-tile\" data-pref-key=\"pf_hide_howto_{}\" open>\n<summary>{}</summary>\n",
            rendered.workflow_id,
            escape_html(&copy.text("howto_title", "How to use this workflow:"))
        ));
        if !items.is_empty() {
            html.push_str("<ol>\n");
            for item in items {
                html.push_str(&format!("<li>{}</li>\n", escape_html(item)));
            }
            html.push_str("</ol>\n");
        }
        html.push_str("<button type=\"button\" class=\"pf-howto-hide\" data-action=\"hide-howto\">Don’t show again</button>\n</details>\n");
    }
    html.push_str("</header>\n");
}

fn write_info_pills(html: &mut String, header: &WorkflowHeader, copy: &CopyStrings) {
    if header.info_pills.is_empty() {
        return;
    }
    html.push_str("<ul class=\"pf-info pf-info--icons\">\n");
    for pill in &header.info_pills {
        let (label, value) = match pill {
            InfoPill::UseCase { value } => (copy.text("pill_use_case", "Use case"), escape_html(value)),
            InfoPill::Version { value, stable } => {
                let mut value = escape_html(value);
                if *stable {
                    value.push_str(" <span class=\"pf-badge pf-badge--stable\" title=\"Stable version\">Stable</span>");
                }
                (copy.text("pill_version", "Version"), value)
            }
            InfoPill::Updated { value } => (copy.text("pill_updated", "Updated"), escape_html(value)),
            InfoPill::Steps { count } => (copy.text("pill_steps", "Steps"), count.to_string()),
            InfoPill::TotalTime { minutes } => ("Total time".to_string(), format!("{minutes} min")),
        };
        html.push_str(&format!(
            "<li class=\"pf-pill\"><span class=\"pf-pill-label\">{}:</span> <span class=\"pf-pill-value\">{value}</span></li>\n",
            escape_html(&label)
        ));
    }
    html.push_str("</ul>\n");
}

fn write_value_panel(html: &mut String, panel: &ValuePanel, copy: &CopyStrings) {
    html.push_str("<section class=\"pf-value\" aria-label=\"Why this helps\">\n<ul class=\"pf-value-grid\">\n");
    let mut item = |kicker: String, body: String| {
        html.push_str(&format!(
            "<li class=\"pf-value-item\"><span class=\"pf-value-kicker\">{}</span><div class=\"pf-value-text\">{body}</div></li>\n",
            escape_html(&kicker)
        ));
    };
    if let Some(pain) = &panel.pain_point {
        item(copy.text("value_pain", "Pain Points"), escape_multiline(pain));
    }
    if let Some(outcome) = &panel.expected_outcome {
        item(copy.text("value_outcome", "Expected Outcome"), escape_multiline(outcome));
    }
    if let Some(minutes) = panel.time_saved_min {
        item(copy.text("value_time", "Time saved"), format!("<strong>{minutes} min</strong> per run"));
    }
    if let Some(difficulty) = panel.difficulty {
        let filled = "★".repeat(usize::from(difficulty));
        let empty = "☆".repeat(5 - usize::from(difficulty));
        let word = match difficulty {
            0..=2 => "easy",
            3 => "medium",
            _ => "hard",
        };
        item(
            copy.text("value_diff", "Difficulty w/o AI"),
            format!("<span class=\"pf-diff-stars\">{filled}{empty}</span><span class=\"pf-diff-hint\">({difficulty}/5 = {word})</span>"),
        );
    }
    html.push_str("</ul>\n</section>\n");
}

fn write_paywall(html: &mut String, config: &SiteConfig) {
    let copy = &config.copy;
    html.push_str(&format!(
        "<section class=\"pf-locked-all\">\n<div class=\"pf-lock-box\">\n<h2>{}</h2>\n<p class=\"pf-sub\">{}</p>\n<div class=\"pf-lock-actions\">\n<a class=\"pf-btn pf-btn--primary\" href=\"{}\">{}</a>\n<a class=\"pf-btn\" href=\"{}\">{}</a>\n</div>\n</div>\n</section>\n",
        escape_html(&copy.text("paywall_title", "Pro workflow")),
        escape_html(&copy.text("paywall_text", "Upgrade to unlock all steps of this workflow.")),
        escape_attr(&config.urls.pricing),
        escape_html(&copy.text("paywall_plans", "View plans")),
        escape_attr(&config.urls.login),
        escape_html(&copy.text("paywall_login", "Log in")),
    ));
}

fn write_step(html: &mut String, step: &RenderedStep, next_locked: bool, config: &SiteConfig) {
    let copy = &config.copy;
    let flags = &config.feature_flags;

    let mut classes = String::from("pf-step pf-step-card");
    if step.locked {
        classes.push_str(" pf-step--locked is-locked");
        if step.lock_reason == Some(LockReason::UpgradeRequired) {
            classes.push_str(" pf-lock--pro");
        }
    }
    if step.checkpoint.is_some() {
        classes.push_str(" pf-step--checkpoint");
    }
    html.push_str(&format!(
        "<li class=\"{classes}\" id=\"{}\" data-step=\"{}\">\n<div class=\"{}\">\n",
        escape_attr(&step.anchor),
        step.idx,
        if step.locked { "pf-blur" } else { "" }
    ));

    html.push_str("<div class=\"pf-step-meta\">");
    if let Some(step_id) = &step.step_id {
        html.push_str(&format!("<span class=\"pf-step-id\">ID: {}</span>", escape_html(step_id)));
    }
    if flags.lock_badges && step.uses_previous_output && step.idx > 1 {
        html.push_str(&format!("<span class=\"pf-badge\">uses output from Step {}</span>", step.idx - 1));
    }
    html.push_str("</div>\n");

    html.push_str("<div class=\"pf-step-head\">\n");
    html.push_str(&format!(
        "<h3 class=\"pf-step-title\"><span class=\"pf-step-num\">{}</span> {}</h3>\n",
        step.idx,
        escape_html(&step.title)
    ));
    if let Some(minutes) = step.estimated_time_min {
        html.push_str(&format!(
            "<span class=\"pf-step-time\" title=\"Estimated time to complete this step\">⏱ {minutes} min</span>\n"
        ));
    }
    if step.locked {
        html.push_str("<span class=\"pf-chip pf-chip--lock\" title=\"This step is locked\">Locked</span>\n");
    }
    html.push_str("</div>\n");

    if !step.objective.trim().is_empty() {
        html.push_str(&format!("<p class=\"pf-sub\">{}</p>\n", escape_multiline(&step.objective)));
    }

    write_inputs(html, step);

    let prompt_id = format!("pf-prompt-{}", step.idx);
    html.push_str(&format!(
        "<label class=\"pf-prompt-label\" for=\"{prompt_id}\">{}</label>\n",
        escape_html(&copy.text("prompt_label", "Prompt"))
    ));
    html.push_str(&format!(
        "<textarea id=\"{prompt_id}\" class=\"pf-prompt\" data-prompt-template data-base=\"{}\" data-original-base=\"{}\" rows=\"8\" spellcheck=\"false\">{}</textarea>\n",
        escape_attr(&step.template),
        escape_attr(&step.original_template),
        escape_html(&step.template)
    ));
    html.push_str(&format!(
        "<div class=\"pf-cta\"><button class=\"pf-copy\" data-action=\"copy-prompt\">{}</button><span class=\"pf-help-inline\">→ {}</span></div>\n",
        escape_html(&copy.text("copy_prompt", "Copy prompt")),
        escape_html(&copy.text("paste_hint", "Paste into the same chat and run."))
    ));

    if let Some(example) = &step.example_output {
        html.push_str(&format!(
            "<details class=\"pf-example\"><summary>{}</summary><div class=\"pf-example-body\">{}</div></details>\n",
            escape_html(&copy.text("example_label", "Example output")),
            escape_multiline(example)
        ));
    }
    if !step.checklist.is_empty() {
        html.push_str("<div class=\"pf-checklist\"><span class=\"pf-checklist-label\">Checklist</span><ul class=\"pf-checklist-list\">\n");
        for (position, item) in step.checklist.iter().enumerate() {
            html.push_str(&format!(
                "<li><label class=\"pf-check\"><input type=\"checkbox\" data-action=\"toggle-checklist\" data-value=\"{position}\"><span>{}</span></label></li>\n",
                escape_html(item)
            ));
        }
        html.push_str("</ul></div>\n");
    }
    if !step.context_requirements.is_empty() {
        html.push_str("<div class=\"pf-context-requirements\">\n");
        for requirement in &step.context_requirements {
            html.push_str(&format!(
                "<div class=\"pf-context-item\"><span class=\"pf-context-type\">{}</span>",
                escape_html(&upper_first(requirement.context_type.as_str()))
            ));
            if requirement.required {
                html.push_str("<span class=\"pf-context-required\">Required</span>");
            }
            html.push_str(&format!(
                "<span class=\"pf-context-source\">({})</span></div>\n",
                escape_html(&upper_first(&requirement.source.replace('_', " ")))
            ));
        }
        html.push_str("</div>\n");
    }
    if let Some(message) = &step.checkpoint {
        html.push_str(&format!(
            "<div class=\"pf-checkpoint pf-tile\" data-checkpoint=\"true\"><div class=\"pf-checkpoint-message\"><strong>{}:</strong><p>{}</p></div><div class=\"pf-checkpoint-actions\"><button class=\"pf-btn pf-btn--primary\" data-action=\"continue-checkpoint\">{}</button></div></div>\n",
            escape_html(&copy.text("checkpoint_title", "Checkpoint")),
            escape_multiline(message),
            escape_html(&copy.text("continue_button", "Continue"))
        ));
    }

    write_next(html, step, next_locked, config);
    html.push_str("</div>\n");

    if let Some(reason) = step.lock_reason {
        let (text, href, button) = match reason {
            LockReason::LoginRequired => ("Create a free account to continue with this step.", &config.urls.login, "Log in / Sign up"),
            LockReason::UpgradeRequired => ("Unlock to continue this workflow.", &config.urls.pricing, "Upgrade to Pro"),
        };
        html.push_str(&format!(
            "<div class=\"pf-step-cta\"><p class=\"pf-sub\">{text}</p><a class=\"pf-btn pf-btn--primary\" href=\"{}\">{button}</a></div>\n",
            escape_attr(href)
        ));
    }
    html.push_str("</li>\n");
}

fn write_inputs(html: &mut String, step: &RenderedStep) {
    if step.inputs.is_empty() {
        return;
    }
    html.push_str("<div class=\"pf-vars\" aria-label=\"Variables\">\n");
    if step.idx == 1 {
        html.push_str("<div class=\"pf-vars-hint pf-tile\" data-vars-hint><strong>Customize:</strong> Fill the fields and the prompt updates live. <button type=\"button\" class=\"pf-hint-hide\" data-action=\"hide-vars-hint\">Don’t show again</button></div>\n");
    }
    for input in &step.inputs {
        html.push_str(&format!(
            "<label class=\"pf-var{}\"><span class=\"pf-var-label\">{}",
            if input.required { " is-required" } else { "" },
            escape_html(&input.label)
        ));
        if input.required {
            html.push_str("<span class=\"pf-req\" title=\"Required\">*</span>");
        }
        html.push_str(&format!(
            "</span><input type=\"text\" data-var-name=\"{}\" placeholder=\"{}\"",
            escape_attr(&input.name),
            escape_attr(&input.placeholder)
        ));
        if let Some(example) = &input.example_value {
            html.push_str(&format!(" data-example=\"{}\"", escape_attr(example)));
        }
        if input.required {
            html.push_str(" class=\"is-empty\"");
        }
        html.push('>');
        if let Some(description) = &input.description {
            html.push_str(&format!("<small class=\"pf-var-help\">{}</small>", escape_html(description)));
        }
        html.push_str("</label>\n");
    }
    html.push_str("</div>\n");
}

fn write_next(html: &mut String, step: &RenderedStep, next_locked: bool, config: &SiteConfig) {
    let copy = &config.copy;
    match &step.next {
        NextHint::Continue {
            next_idx,
            next_title,
            uses_previous_output,
        } => {
            if !config.feature_flags.next_panel {
                return;
            }
            // Copy templates may carry inline markup such as `<em>`; only the inserted title is escaped.
            let text = if *uses_previous_output {
                copy.text("uses_prev_hint", "Use this step’s output as {previous_output} in the next prompt.")
            } else {
                copy.text("continue_hint", "Continue to <em>Step {n}: {title}</em>.")
                    .replace("{n}", &next_idx.to_string())
                    .replace("{title}", &escape_html(next_title))
            };
            let button = copy.text("go_to_step", "Go to Step {n}").replace("{n}", &next_idx.to_string());
            html.push_str(&format!(
                "<div class=\"pf-next pf-tile\"><strong>{}</strong><div class=\"pf-next-text pf-sub\">{text}</div><div class=\"pf-next-actions\"><a class=\"pf-btn{}\" href=\"#step-{next_idx}\">{}</a></div></div>\n",
                escape_html(&copy.text("up_next_title", "Up next:")),
                if next_locked { " is-locked" } else { "" },
                escape_html(&button)
            ));
        }
        NextHint::Done => {
            html.push_str(&format!(
                "<div class=\"pf-next pf-tile\"><strong>{}</strong><div class=\"pf-next-text pf-sub\">{}</div></div>\n",
                escape_html(&copy.text("done_title", "Done:")),
                escape_html(&copy.text(
                    "done_text",
                    "You’ve completed all steps. Review the result and save it to your process/tool."
                ))
            ));
        }
    }
}

fn write_footer(html: &mut String, workflow_id: u64, footer: &WorkflowFooter, copy: &CopyStrings) {
    html.push_str("<div class=\"pf-3grid\">\n");
    if footer.share {
        html.push_str(&format!(
            "<section class=\"pf-share pf-tile\"><strong>{}:</strong> <a href=\"#\" class=\"pf-share-btn\" data-action=\"copy-link\">{}</a></section>\n",
            escape_html(&copy.text("share_title", "Share")),
            escape_html(&copy.text("copy_link", "Copy link"))
        ));
    }
    if let Some(rating) = &footer.rating {
        html.push_str(&format!(
            "<section class=\"pf-rating pf-tile\" data-post-id=\"{workflow_id}\" data-avg=\"{}\" data-count=\"{}\">\n<p class=\"pf-rating-title\">{}</p>\n<div class=\"pf-stars\" role=\"radiogroup\" aria-label=\"Rate this workflow\">\n",
            rating.avg,
            rating.count,
            escape_html(&copy.text("rating_title", "How helpful was this workflow?"))
        ));
        for (position, title) in STAR_TITLES.iter().enumerate() {
            html.push_str(&format!(
                "<button class=\"pf-star\" data-value=\"{}\" data-action=\"rate\" role=\"radio\" aria-checked=\"false\" title=\"{title}\"></button>\n",
                position + 1
            ));
        }
        html.push_str(&format!(
            "</div>\n<div class=\"pf-rating-meta\"><span class=\"pf-rating-avg\">{}</span> <span class=\"pf-rating-count\">({})</span> <span class=\"pf-rating-msg pf-sub\">{}</span></div>\n</section>\n",
            escape_html(&rating.display_average()),
            rating.count,
            escape_html(&copy.text("rating_hint", "Click a star to rate"))
        ));
    }
    html.push_str("</div>\n");
}

fn upper_first(text: &str) -> String {
    let mut characters = text.chars();
    match characters.next() {
        Some(first) => first.to_uppercase().chain(characters).collect(),
        None => String::new(),
    }
}
