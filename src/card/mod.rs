//! Composable card elements for outbound rich messages.
//!
//! Elements are value objects: construct, chain builder methods, then
//! serialize with `to_value()`, which merges `{"tag": …}` with the
//! accumulated attributes. `to_value()` is idempotent and always reflects
//! the element's latest state. [`Card`] assembles elements into the full
//! `interactive` message payload.

use serde_json::{json, Map, Value};

/// A serializable card building block.
pub trait CardElement {
    /// Produce the wire representation: `{"tag": …}` plus attributes.
    fn to_value(&self) -> Value;
}

// ── Text ────────────────────────────────────────────────────────

/// A `div` element holding a text run.
#[derive(Debug, Clone)]
pub struct TextElement {
    content: String,
    as_markdown: bool,
}

impl TextElement {
    /// Plain-text element.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            as_markdown: false,
        }
    }

    /// Render the content as `lark_md` markdown instead of plain text.
    pub fn markdown(mut self) -> Self {
        self.as_markdown = true;
        self
    }
}

impl CardElement for TextElement {
    fn to_value(&self) -> Value {
        let tag = if self.as_markdown {
            "lark_md"
        } else {
            "plain_text"
        };
        json!({
            "tag": "div",
            "text": { "content": self.content, "tag": tag }
        })
    }
}

// ── Button ──────────────────────────────────────────────────────

/// Visual style of a [`ButtonElement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonType {
    /// Accent-colored call to action.
    Primary,
    /// Neutral style.
    #[default]
    Default,
    /// Destructive-action style.
    Danger,
}

impl ButtonType {
    fn as_str(self) -> &'static str {
        match self {
            ButtonType::Primary => "primary",
            ButtonType::Default => "default",
            ButtonType::Danger => "danger",
        }
    }
}

/// A `button` element.
#[derive(Debug, Clone)]
pub struct ButtonElement {
    text: String,
    button_type: ButtonType,
    url: Option<String>,
    value: Option<Value>,
    multi_url: Option<Map<String, Value>>,
    confirm: Option<(String, String)>,
}

impl ButtonElement {
    /// Button with the given label and the default style.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            button_type: ButtonType::default(),
            url: None,
            value: None,
            multi_url: None,
            confirm: None,
        }
    }

    /// Use the accent (primary) style.
    pub fn primary(mut self) -> Self {
        self.button_type = ButtonType::Primary;
        self
    }

    /// Use the destructive (danger) style.
    pub fn danger(mut self) -> Self {
        self.button_type = ButtonType::Danger;
        self
    }

    /// Open a URL when clicked.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Attach a callback value (string or map) delivered on click.
    pub fn value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    /// Per-platform URLs (keys like `url`, `android_url`, `ios_url`,
    /// `pc_url`).
    pub fn multi_url(mut self, urls: Map<String, Value>) -> Self {
        self.multi_url = Some(urls);
        self
    }

    /// Require a confirmation dialog with the given title and body.
    pub fn confirm(mut self, title: impl Into<String>, content: impl Into<String>) -> Self {
        self.confirm = Some((title.into(), content.into()));
        self
    }
}

impl CardElement for ButtonElement {
    fn to_value(&self) -> Value {
        let mut attrs = Map::new();
        attrs.insert(
            "text".to_owned(),
            json!({ "content": self.text, "tag": "plain_text" }),
        );
        attrs.insert("type".to_owned(), json!(self.button_type.as_str()));
        if let Some(url) = &self.url {
            attrs.insert("url".to_owned(), json!(url));
        }
        if let Some(value) = &self.value {
            attrs.insert("value".to_owned(), value.clone());
        }
        if let Some(multi) = &self.multi_url {
            attrs.insert("multi_url".to_owned(), Value::Object(multi.clone()));
        }
        if let Some((title, content)) = &self.confirm {
            attrs.insert(
                "confirm".to_owned(),
                json!({
                    "title": { "content": title, "tag": "plain_text" },
                    "text": { "content": content, "tag": "plain_text" }
                }),
            );
        }

        let mut object = Map::new();
        object.insert("tag".to_owned(), json!("button"));
        object.extend(attrs);
        Value::Object(object)
    }
}

// ── Card ────────────────────────────────────────────────────────

/// Header color template for a [`Card`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderTemplate {
    /// Lark blue.
    #[default]
    Blue,
    /// Success green.
    Green,
    /// Warning orange.
    Orange,
    /// Failure red.
    Red,
}

impl HeaderTemplate {
    fn as_str(self) -> &'static str {
        match self {
            HeaderTemplate::Blue => "blue",
            HeaderTemplate::Green => "green",
            HeaderTemplate::Orange => "orange",
            HeaderTemplate::Red => "red",
        }
    }
}

/// An interactive-message card assembled from elements.
#[derive(Default)]
pub struct Card {
    header: Option<(String, HeaderTemplate)>,
    elements: Vec<Box<dyn CardElement + Send + Sync>>,
}

impl Card {
    /// Card with no header and no elements.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the header title and color template.
    pub fn header(mut self, title: impl Into<String>, template: HeaderTemplate) -> Self {
        self.header = Some((title.into(), template));
        self
    }

    /// Append an element.
    pub fn element(mut self, element: impl CardElement + Send + Sync + 'static) -> Self {
        self.elements.push(Box::new(element));
        self
    }

    /// Produce the full `interactive` payload.
    pub fn to_value(&self) -> Value {
        let elements: Vec<Value> = self.elements.iter().map(|e| e.to_value()).collect();
        let mut object = Map::new();
        object.insert(
            "config".to_owned(),
            json!({ "wide_screen_mode": true }),
        );
        if let Some((title, template)) = &self.header {
            object.insert(
                "header".to_owned(),
                json!({
                    "title": { "content": title, "tag": "plain_text" },
                    "template": template.as_str()
                }),
            );
        }
        object.insert("elements".to_owned(), Value::Array(elements));
        Value::Object(object)
    }
}

impl std::fmt::Debug for Card {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Card")
            .field("header", &self.header)
            .field("elements", &self.elements.len())
            .finish()
    }
}
