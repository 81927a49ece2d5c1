//! Server-rendered HTML pages
//!
//! Forms are generated from the task's catalog, so they only ever submit
//! declared field names. Entered text is echoed back verbatim when a form is
//! re-rendered, so nothing the user typed is lost.

use kdrisk_core::{Attribution, OutputSpace, RiskTier, Task};
use kdrisk_models::{
    Catalog, ExplanationStatus, FeatureSpec, FieldKind, PipelineOutcome, Section, TaskStatus,
};
use std::collections::HashMap;
use std::fmt::Write;

/// Bars shown in the attribution chart, largest contributions first
const MAX_DISPLAY: usize = 15;

/// Problem shown above a re-rendered form
#[derive(Debug, Clone)]
pub struct FormNotice {
    pub headline: String,
    pub detail: Option<String>,
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} | Kawasaki Disease Prediction System</title>
    <link rel="stylesheet" href="/assets/style.css">
</head>
<body>
    <nav>
        <a href="/">Home</a>
        <a href="/predict/caa">CAA Prediction</a>
        <a href="/predict/ivig">IVIG Prediction</a>
    </nav>
    <main>
{body}
    </main>
</body>
</html>
"#,
        title = escape(title),
        body = body
    )
}

fn model_description(task: Task) -> &'static str {
    match task {
        Task::Caa => "Prediction of coronary aneurysm development using XGBoost model",
        Task::Ivig => "Prediction of IVIG resistance using RandomForest model",
    }
}

fn required_notice(task: Task) -> &'static str {
    match task {
        Task::Caa => {
            "All laboratory parameters, echocardiographic measurements, fever duration, and sex must be provided."
        }
        Task::Ivig => "All laboratory parameters and echocardiographic measurements must be provided.",
    }
}

fn tier_class(tier: RiskTier) -> &'static str {
    match tier {
        RiskTier::High => "error",
        RiskTier::Moderate => "warning",
        RiskTier::Low => "success",
    }
}

/// Landing page with one card per task
pub fn home(status: &[TaskStatus]) -> String {
    let mut body = String::from(
        "<h1>Kawasaki Disease Prediction System</h1>\n\
         <p><strong>Academic Research Platform for Kawasaki Disease Clinical Outcome Prediction</strong></p>\n\
         <div class=\"cards\">\n",
    );

    for s in status {
        let (model, output) = match s.task {
            Task::Caa => ("XGBoost", "Coronary aneurysm probability"),
            Task::Ivig => ("RandomForest", "IVIG resistance probability"),
        };
        let n_inputs = s.catalog.catalog().len();
        let availability = if s.model_loaded {
            String::new()
        } else {
            "<p class=\"warning\">Model not loaded. Predictions are unavailable.</p>".to_string()
        };

        let _ = write!(
            body,
            r#"<section class="card">
    <h2>{title}</h2>
    <p>Predicts the {output_lower} using a <strong>{model}</strong> model.</p>
    <ul>
        <li><strong>Input:</strong> {n_inputs} clinical variables</li>
        <li><strong>Output:</strong> {output}</li>
        <li><strong>Analysis:</strong> Explainable AI through SHAP</li>
    </ul>
    {availability}
    <a class="button" href="/predict/{task}">Start {short} Prediction</a>
</section>
"#,
            title = s.task.title().trim_end_matches(" Prediction"),
            output_lower = output.to_lowercase(),
            model = model,
            n_inputs = n_inputs,
            output = output,
            availability = availability,
            task = s.task,
            short = s.task.as_str().to_uppercase(),
        );
    }

    body.push_str(
        "</div>\n\
         <details>\n<summary>System Information</summary>\n\
         <p><strong>Purpose:</strong> Clinical decision support system for predicting Kawasaki disease outcomes</p>\n\
         <p><strong>Disclaimer:</strong></p>\n<ul>\n\
         <li>This system is designed to assist healthcare professionals in clinical decision-making</li>\n\
         <li>Final diagnosis and treatment decisions must be made by qualified medical personnel</li>\n\
         <li>Prediction results should be used as supplementary information only</li>\n\
         </ul>\n</details>\n",
    );

    layout("Home", &body)
}

fn field_input(spec: &FeatureSpec, entered: Option<&str>) -> String {
    let label = escape(spec.display_label);
    let name = escape(spec.name);
    let required = if spec.required { " required" } else { "" };

    match spec.kind {
        FieldKind::Sex => {
            let selected = |value: &str| {
                let matches = entered.is_some_and(|e| {
                    let e = e.trim().to_ascii_lowercase();
                    match value {
                        "Female" => e == "female" || e == "0" || e == "f",
                        _ => e == "male" || e == "1" || e == "m",
                    }
                });
                if matches {
                    " selected"
                } else {
                    ""
                }
            };
            format!(
                r#"<label for="{name}">{label}</label>
<select id="{name}" name="{name}"{required}>
    <option value="">Select...</option>
    <option value="Female"{female}>Female</option>
    <option value="Male"{male}>Male</option>
</select>
"#,
                name = name,
                label = label,
                required = required,
                female = selected("Female"),
                male = selected("Male"),
            )
        }
        FieldKind::Numeric { .. } => {
            format!(
                r#"<label for="{name}">{label}</label>
<input id="{name}" name="{name}" type="number" step="any" value="{value}" placeholder="{unit}"{required}>
"#,
                name = name,
                label = label,
                value = escape(entered.unwrap_or("")),
                unit = escape(spec.unit),
                required = required,
            )
        }
    }
}

/// Input form for a task
pub fn form(
    task: Task,
    catalog: &Catalog,
    entered: &HashMap<String, String>,
    notice: Option<&FormNotice>,
) -> String {
    let mut body = format!(
        "<h1>{}</h1>\n<p><em>{}</em></p>\n",
        escape(task.title()),
        escape(model_description(task))
    );

    if let Some(notice) = notice {
        let _ = writeln!(body, "<p class=\"error\">{}</p>", escape(&notice.headline));
        if let Some(detail) = &notice.detail {
            let _ = writeln!(body, "<p class=\"warning\">{}</p>", escape(detail));
        }
    }

    let _ = writeln!(
        body,
        "<form method=\"post\" action=\"/predict/{}\">\n<div class=\"columns\">",
        task
    );
    for section in Section::ALL {
        let fields: Vec<&FeatureSpec> = catalog.section(section).collect();
        if fields.is_empty() {
            continue;
        }

        let _ = writeln!(
            body,
            "<fieldset>\n<legend>{}</legend>",
            escape(section.title())
        );
        if let Some(note) = section.note() {
            let _ = writeln!(body, "<p class=\"note\">{}</p>", escape(note));
        }
        for spec in fields {
            body.push_str(&field_input(
                spec,
                entered.get(spec.name).map(String::as_str),
            ));
        }
        body.push_str("</fieldset>\n");
    }
    body.push_str("</div>\n<button type=\"submit\">Predict</button>\n</form>\n");

    layout(task.title(), &body)
}

/// Notice for a submission with unset fields
pub fn missing_notice(task: Task, missing: usize) -> FormNotice {
    FormNotice {
        headline: format!(
            "Please fill in all required fields. {} field(s) are missing.",
            missing
        ),
        detail: Some(required_notice(task).to_string()),
    }
}

fn output_space_label(space: OutputSpace) -> &'static str {
    match space {
        OutputSpace::LogOdds => "log-odds",
        OutputSpace::Probability => "probability",
    }
}

fn attribution_table(attribution: &Attribution) -> String {
    let ranked = attribution.ranked(MAX_DISPLAY);
    let max = ranked
        .iter()
        .map(|e| e.shap_value.abs())
        .fold(0.0_f64, f64::max);

    let mut html = format!(
        "<p class=\"note\">Contributions in {space}, measured from the expected output E[f(x)] = {base:.3}. \
         Model output f(x) = {total:.3}.</p>\n\
         <table class=\"attribution\">\n\
         <thead><tr><th>Feature</th><th>Value</th><th>SHAP</th><th></th></tr></thead>\n<tbody>\n",
        space = output_space_label(attribution.output_space),
        base = attribution.base_value,
        total = attribution.total(),
    );

    for entry in ranked {
        let width = if max > 0.0 {
            entry.shap_value.abs() / max * 100.0
        } else {
            0.0
        };
        let direction = if entry.shap_value >= 0.0 { "pos" } else { "neg" };
        let _ = writeln!(
            html,
            "<tr><td>{label}</td><td>{value}</td><td>{shap:+.4}</td>\
             <td class=\"bar-cell\"><div class=\"bar {direction}\" style=\"width: {width:.1}%\"></div></td></tr>",
            label = escape(&entry.label),
            value = escape(&entry.display_value),
            shap = entry.shap_value,
            direction = direction,
            width = width,
        );
    }

    html.push_str("</tbody>\n</table>\n");
    html
}

/// Result page for a completed prediction
pub fn result(outcome: &PipelineOutcome, catalog: &Catalog, request_id: &str, created_at: &str) -> String {
    let task = outcome.task;
    let tier = outcome.risk_tier();

    let mut body = format!(
        r#"<h1>{title}</h1>
<p><em>{description}</em></p>
<div class="columns">
    <div class="metric">
        <div class="metric-label">{label}</div>
        <div class="metric-value">{probability:.1}%</div>
        <div class="metric-delta">{outcome_label}</div>
    </div>
    <div class="{class}">{guidance}</div>
</div>
"#,
        title = escape(task.title()),
        description = escape(model_description(task)),
        label = escape(task.probability_label()),
        probability = outcome.probability() * 100.0,
        outcome_label = escape(outcome.outcome_label()),
        class = tier_class(tier),
        guidance = escape(outcome.guidance()),
    );

    body.push_str("<hr>\n<h2>Feature Importance Analysis</h2>\n");
    match &outcome.explanation {
        ExplanationStatus::Explained(attribution) => body.push_str(&attribution_table(attribution)),
        ExplanationStatus::Unavailable(_) => {
            body.push_str("<p class=\"warning\">SHAP explainer not loaded. No attribution is available.</p>\n")
        }
        ExplanationStatus::Failed(reason) => {
            let _ = writeln!(
                body,
                "<p class=\"error\">SHAP analysis error: {}</p>",
                escape(reason)
            );
        }
    }

    body.push_str("<details>\n<summary>Entered values</summary>\n<table>\n");
    for (spec, value) in catalog.fields.iter().zip(outcome.features.as_slice()) {
        let shown = if value.is_nan() {
            "missing".to_string()
        } else {
            spec.format_value(*value)
        };
        let _ = writeln!(
            body,
            "<tr><td>{}</td><td>{}</td></tr>",
            escape(spec.display_label),
            escape(&shown)
        );
    }
    let _ = write!(
        body,
        "</table>\n</details>\n\
         <p class=\"meta\">Request {} at {} ({} catalog, {} µs)</p>\n\
         <a class=\"button\" href=\"/predict/{}\">New prediction</a>\n",
        escape(request_id),
        escape(created_at),
        catalog.id,
        outcome.latency_us,
        task
    );

    layout(task.title(), &body)
}

pub fn not_found(path: &str) -> String {
    layout(
        "Not Found",
        &format!(
            "<h1>Not Found</h1>\n<p>No page at <code>{}</code>.</p>\n",
            escape(path)
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use kdrisk_models::{CatalogId, IVIG_V2};

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<b a="1">&'</b>"#),
            "&lt;b a=&quot;1&quot;&gt;&amp;&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_form_keeps_entered_values() {
        let mut entered = HashMap::new();
        entered.insert("CRP_before".to_string(), "4.2".to_string());
        entered.insert("ALT_before".to_string(), "10.456".to_string());
        entered.insert("Sex".to_string(), "Male".to_string());

        let html = form(
            Task::Caa,
            CatalogId::CaaV1.catalog(),
            &entered,
            Some(&missing_notice(Task::Caa, 13)),
        );

        assert!(html.contains("13 field(s) are missing"));
        assert!(html.contains(r#"name="CRP_before" type="number" step="any" value="4.2""#));
        assert!(html.contains(r#"name="ALT_before" type="number" step="any" value="10.456""#));
        assert!(!html.contains("step=\"0.01\""));
        assert!(html.contains(r#"<option value="Male" selected>"#));
        assert!(html.contains("Dallaire and Dahdah"));
    }

    #[test]
    fn test_form_lists_every_catalog_field() {
        let html = form(Task::Ivig, &IVIG_V2, &HashMap::new(), None);
        for name in IVIG_V2.names() {
            assert!(html.contains(&format!("name=\"{}\"", name)), "{}", name);
        }
        assert!(html.contains("Plateletcrit"));
        assert!(!html.contains("Clinical Parameters"));
    }
}
