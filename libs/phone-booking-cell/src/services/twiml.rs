//! Minimal TwiML builder for the voice webhooks.

use axum::{
    http::header,
    response::{IntoResponse, Response},
};

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Keypad prompt; the provider posts the pressed digits to `action`.
#[derive(Debug, Clone, PartialEq)]
pub struct Gather {
    pub action: String,
    pub num_digits: u8,
    pub prompts: Vec<String>,
}

impl Gather {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            num_digits: 1,
            prompts: Vec::new(),
        }
    }

    pub fn say(mut self, text: impl Into<String>) -> Self {
        self.prompts.push(text.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Verb {
    Say(String),
    Gather(Gather),
    Hangup,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoiceResponse {
    verbs: Vec<Verb>,
}

impl VoiceResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn say(mut self, text: impl Into<String>) -> Self {
        self.verbs.push(Verb::Say(text.into()));
        self
    }

    pub fn gather(mut self, gather: Gather) -> Self {
        self.verbs.push(Verb::Gather(gather));
        self
    }

    pub fn hangup(mut self) -> Self {
        self.verbs.push(Verb::Hangup);
        self
    }

    /// Appends every verb of `other`.
    pub fn then(mut self, other: VoiceResponse) -> Self {
        self.verbs.extend(other.verbs);
        self
    }

    /// Hangs up without asking the caller for anything further.
    pub fn ends_call(&self) -> bool {
        self.gather_action().is_none() && self.verbs.contains(&Verb::Hangup)
    }

    pub fn gather_action(&self) -> Option<&str> {
        self.verbs.iter().find_map(|verb| match verb {
            Verb::Gather(gather) => Some(gather.action.as_str()),
            _ => None,
        })
    }

    pub fn render(&self) -> String {
        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><Response>"#);
        for verb in &self.verbs {
            match verb {
                Verb::Say(text) => {
                    xml.push_str(&format!("<Say>{}</Say>", escape_xml(text)));
                }
                Verb::Gather(gather) => {
                    xml.push_str(&format!(
                        r#"<Gather numDigits="{}" action="{}" method="POST">"#,
                        gather.num_digits,
                        escape_xml(&gather.action)
                    ));
                    for prompt in &gather.prompts {
                        xml.push_str(&format!("<Say>{}</Say>", escape_xml(prompt)));
                    }
                    xml.push_str("</Gather>");
                }
                Verb::Hangup => xml.push_str("<Hangup/>"),
            }
        }
        xml.push_str("</Response>");
        xml
    }
}

impl IntoResponse for VoiceResponse {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, "text/xml")], self.render()).into_response()
    }
}
