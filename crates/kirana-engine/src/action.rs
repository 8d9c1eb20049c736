//! Transport-neutral description of a single attempt against the storefront.
//!
//! An [`Action`] says *how* to try something — which endpoint to call, or
//! which elements to drive on a rendered page. Operations map to an ordered
//! list of actions (candidates); the resolver walks that list until one
//! classifies as a success.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

/// One private-endpoint call. Paths are relative to the configured origin
/// because the storefront moves its API surface without notice.
#[derive(Debug, Clone)]
pub struct HttpCall {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub payload: Option<Value>,
    /// Attach the bearer token and device headers when a session exists.
    pub requires_auth: bool,
}

impl HttpCall {
    #[must_use]
    pub fn get(path: &str) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.to_owned(),
            query: Vec::new(),
            payload: None,
            requires_auth: true,
        }
    }

    #[must_use]
    pub fn post(path: &str, payload: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.to_owned(),
            query: Vec::new(),
            payload: Some(payload),
            requires_auth: true,
        }
    }

    #[must_use]
    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_owned(), value.to_owned()));
        self
    }

    #[must_use]
    pub fn public(mut self) -> Self {
        self.requires_auth = false;
        self
    }
}

/// One step of a scripted page interaction. Selectors are CSS; `text`
/// variants match on visible text instead.
#[derive(Debug, Clone)]
pub enum PageStep {
    Goto(String),
    Click(String),
    /// Click the element whose visible text contains the needle. Used where
    /// the storefront gives no stable attribute to hook on.
    ClickByText(String),
    /// Click the nth element matching the selector (zero-based).
    ClickNth(String, usize),
    /// Click the last element matching the selector.
    ClickLast(String),
    /// Click only when the element is currently visible; skip otherwise.
    ClickIfVisible(String),
    Fill { selector: String, text: String },
    Press(String),
    /// Block until the selector renders, bounded by the transport's wait
    /// timeout. A timeout here is a transport fault, not a quiet skip.
    WaitFor(String),
}

/// What to scrape from the page once the steps have run.
#[derive(Debug, Clone)]
pub struct Collect {
    /// Selector matching the repeated card/row elements.
    pub selector: String,
    /// Attribute carrying a stable identifier, when the markup has one.
    pub id_attr: Option<String>,
}

/// A scripted interaction plus the probes that decide its outcome.
#[derive(Debug, Clone)]
pub struct PageScript {
    pub steps: Vec<PageStep>,
    /// Markers whose visibility confirms the operation landed.
    pub confirm: Vec<String>,
    /// Markers whose visibility means the storefront refused. Checked before
    /// the confirm set.
    pub deny: Vec<String>,
    /// When set, an elapsed probe wait hands the classifier the bare
    /// snapshot instead of faulting. Used where an unrecognized screen is
    /// itself a reportable outcome.
    pub snapshot_on_timeout: bool,
    pub collect: Option<Collect>,
}

impl PageScript {
    #[must_use]
    pub fn new(steps: Vec<PageStep>) -> Self {
        Self {
            steps,
            confirm: Vec::new(),
            deny: Vec::new(),
            snapshot_on_timeout: false,
            collect: None,
        }
    }

    #[must_use]
    pub fn confirm_on(mut self, markers: &[&str]) -> Self {
        self.confirm = markers.iter().map(|m| (*m).to_owned()).collect();
        self
    }

    #[must_use]
    pub fn deny_on(mut self, markers: &[&str]) -> Self {
        self.deny = markers.iter().map(|m| (*m).to_owned()).collect();
        self
    }

    #[must_use]
    pub fn snapshot_on_timeout(mut self) -> Self {
        self.snapshot_on_timeout = true;
        self
    }

    #[must_use]
    pub fn collecting(mut self, selector: &str, id_attr: Option<&str>) -> Self {
        self.collect = Some(Collect {
            selector: selector.to_owned(),
            id_attr: id_attr.map(str::to_owned),
        });
        self
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    Http(HttpCall),
    Page(PageScript),
}

impl Action {
    /// Short human label for logs and fault diagnostics.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Http(call) => format!("{} {}", call.method.as_str(), call.path),
            Self::Page(script) => match script.steps.first() {
                Some(step) => format!("page script ({} steps, first: {step:?})", script.steps.len()),
                None => "page script (probe only)".to_owned(),
            },
        }
    }
}

/// One repeated element scraped off a page.
#[derive(Debug, Clone)]
pub struct PageItem {
    pub id: Option<String>,
    /// Inner text of the card, lines separated by `\n`.
    pub text: String,
}

/// What the page looked like after a script ran to completion.
#[derive(Debug, Clone, Default)]
pub struct PageSnapshot {
    /// Visible text of the page (or of the script's collect scope).
    pub text: String,
    /// Confirm markers that were actually visible.
    pub confirmed: Vec<String>,
    /// Deny markers that were actually visible.
    pub denied: Vec<String>,
    pub items: Vec<PageItem>,
}

/// Raw material handed to the classifier: a JSON body from the endpoint
/// surface, or a snapshot from the rendered page.
#[derive(Debug, Clone)]
pub enum RawResult {
    Json(Value),
    Page(PageSnapshot),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_names_the_endpoint() {
        let action = Action::Http(HttpCall::get("/v2/cart/"));
        assert_eq!(action.describe(), "GET /v2/cart/");
    }

    #[test]
    fn http_call_builder_defaults_to_authenticated() {
        let call = HttpCall::post("/v1/order", serde_json::json!({}));
        assert!(call.requires_auth);
        assert!(!call.clone().public().requires_auth);
    }
}
