//! HTML rendering for the landing page and the prediction form.
//!
//! Which page is shown is decided per request and carried in [`PageState`];
//! nothing about the page lives in process-wide state.

use std::collections::HashMap;

use hearth_predict::{InputField, InputKind, Prediction, PredictError};

/// The page shell. Contains two placeholders: `{{title}}` and `{{body}}`.
const PAGE_HTML: &str = include_str!("../templates/page.html");

/// What a single response should show.
#[derive(Debug)]
pub enum PageState<'a> {
    /// Intro page with a link to the form.
    Landing,
    /// Empty form, prefilled with defaults.
    Form,
    /// Form with the submitted values and a price.
    Result { submitted: &'a HashMap<String, String>, prediction: &'a Prediction },
    /// Form with the submitted values and the failure.
    Failed { submitted: &'a HashMap<String, String>, error: &'a PredictError },
}

pub fn render(state: &PageState<'_>, model_name: &str, inputs: &[InputField]) -> String {
    let body = match state {
        PageState::Landing => landing(model_name),
        PageState::Form => form(inputs, None, ""),
        PageState::Result { submitted, prediction } => form(
            inputs,
            Some(submitted),
            &format!(
                r#"<div class="result">Predicted Price: {}</div>"#,
                escape(&prediction.display)
            ),
        ),
        PageState::Failed { submitted, error } => form(
            inputs,
            Some(submitted),
            &format!(
                r#"<div class="error">Could not predict ({} failed): {}</div>"#,
                error.stage(),
                escape(&error.public_message())
            ),
        ),
    };

    PAGE_HTML
        .replace("{{title}}", &format!("House price estimate · {}", escape(model_name)))
        .replace("{{body}}", &body)
}

fn landing(model_name: &str) -> String {
    format!(
        "<h1>House price estimate</h1>\n\
         <p>Enter a few details about a house and get a sale price estimate \
         from the <code>{}</code> model. Anything you leave blank uses a typical value.</p>\n\
         <p><a href=\"/predict\">Start</a></p>",
        escape(model_name)
    )
}

fn form(
    inputs: &[InputField],
    submitted: Option<&HashMap<String, String>>,
    banner: &str,
) -> String {
    let mut out = String::from("<h1>House price estimate</h1>\n<form method=\"post\" action=\"/predict\">\n");

    for field in inputs {
        let name = escape(&field.name);
        let current = submitted.and_then(|s| s.get(&field.name)).map(String::as_str);

        match field.kind {
            InputKind::Categorical => {
                out.push_str(&format!("<label for=\"{name}\">{name}</label>\n"));
                out.push_str(&format!("<select id=\"{name}\" name=\"{name}\">\n"));
                let chosen = current.or(field.default.as_deref()).filter(|c| !c.is_empty());
                // Blank submits as "not supplied", so the stored default applies.
                let blank = if chosen.is_none() { " selected" } else { "" };
                out.push_str(&format!("  <option value=\"\"{blank}>typical</option>\n"));
                for option in &field.options {
                    let selected = if Some(option.as_str()) == chosen { " selected" } else { "" };
                    let option = escape(option);
                    out.push_str(&format!("  <option value=\"{option}\"{selected}>{option}</option>\n"));
                }
                out.push_str("</select>\n");
            }
            InputKind::Numeric | InputKind::Log => {
                let typical = field.default.as_deref().unwrap_or("");
                out.push_str(&format!(
                    "<label for=\"{name}\">{name} <span class=\"hint\">typical: {}</span></label>\n",
                    escape(typical)
                ));
                out.push_str(&format!(
                    "<input id=\"{name}\" name=\"{name}\" inputmode=\"decimal\" value=\"{}\" placeholder=\"{}\">\n",
                    escape(current.unwrap_or("")),
                    escape(typical)
                ));
            }
        }
    }

    out.push_str("<button type=\"submit\">Predict</button>\n</form>\n");
    out.push_str(banner);
    out
}

/// Minimal HTML escaping for text and attribute values.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> Vec<InputField> {
        vec![
            InputField {
                name: "GrLivArea".into(),
                kind: InputKind::Log,
                default: Some("1500".into()),
                options: vec![],
            },
            InputField {
                name: "KitchenQual".into(),
                kind: InputKind::Categorical,
                default: Some("Typical".into()),
                options: vec!["Fair".into(), "Typical".into(), "Good".into()],
            },
        ]
    }

    #[test]
    fn landing_links_to_form() {
        let html = render(&PageState::Landing, "ames-ridge", &inputs());
        assert!(html.contains("href=\"/predict\""));
        assert!(!html.contains("<form"));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn form_selects_default_option() {
        let html = render(&PageState::Form, "ames-ridge", &inputs());
        assert!(html.contains("<option value=\"Typical\" selected>"));
        assert!(html.contains("placeholder=\"1500\""));
    }

    #[test]
    fn categorical_without_default_starts_blank() {
        let mut fields = inputs();
        fields[1].default = None;
        let html = render(&PageState::Form, "ames-ridge", &fields);
        assert!(html.contains("<option value=\"\" selected>typical</option>"));
        assert!(!html.contains("<option value=\"Fair\" selected>"));
    }

    #[test]
    fn failed_page_keeps_submission_and_escapes() {
        let submitted = HashMap::from([("GrLivArea".to_string(), "<b>big</b>".to_string())]);
        let error = PredictError::translation("GrLivArea", "'<b>big</b>' is not a number");
        let html = render(
            &PageState::Failed { submitted: &submitted, error: &error },
            "ames-ridge",
            &inputs(),
        );
        assert!(html.contains("value=\"&lt;b&gt;big&lt;/b&gt;\""));
        assert!(html.contains("collection failed"));
        assert!(!html.contains("<b>big</b>"));
    }
}
