//! Rich chat text and its JSON wire form.
//!
//! On the wire, text is a JSON document whose root is always an object:
//!
//! ```text
//! "hi"              → {"text":"hi"}
//! ["a", {"text":"b"}] → {"text":"","extra":[{"text":"a"},{"text":"b"}]}
//! ```
//!
//! Some clients misparse bare strings and arrays at the root, so the
//! encoder never produces them. The decoder accepts all three shapes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::ProtocolError;

/// The locale used when a connection hasn't told us its own.
pub const DEFAULT_LOCALE: &str = "en_us";

/// A rich text component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    pub content: TextContent,
    pub style: Style,
    /// Children, rendered after this component and inheriting its style.
    pub extra: Vec<Text>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextContent {
    Literal(String),
    /// Resolved from a translation table, either on the server (when it
    /// knows the key) or on the client.
    Translate { key: String, with: Vec<Text> },
}

/// Formatting flags. `None` means "inherit from the parent".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Style {
    pub color: Option<String>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underlined: Option<bool>,
    pub strikethrough: Option<bool>,
    pub obfuscated: Option<bool>,
}

const STYLE_FLAGS: [&str; 5] = ["bold", "italic", "underlined", "strikethrough", "obfuscated"];

impl Style {
    fn flags(&self) -> [Option<bool>; 5] {
        [
            self.bold,
            self.italic,
            self.underlined,
            self.strikethrough,
            self.obfuscated,
        ]
    }

    fn flag_mut(&mut self, idx: usize) -> &mut Option<bool> {
        match idx {
            0 => &mut self.bold,
            1 => &mut self.italic,
            2 => &mut self.underlined,
            3 => &mut self.strikethrough,
            _ => &mut self.obfuscated,
        }
    }
}

impl Text {
    /// Plain literal text.
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            content: TextContent::Literal(text.into()),
            style: Style::default(),
            extra: Vec::new(),
        }
    }

    /// A translatable component with arguments.
    pub fn translate(key: impl Into<String>, with: Vec<Text>) -> Self {
        Self {
            content: TextContent::Translate {
                key: key.into(),
                with,
            },
            style: Style::default(),
            extra: Vec::new(),
        }
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.style.color = Some(color.into());
        self
    }

    pub fn bold(mut self, bold: bool) -> Self {
        self.style.bold = Some(bold);
        self
    }

    pub fn with_extra(mut self, child: Text) -> Self {
        self.extra.push(child);
        self
    }

    /// Concatenated text of this component and its children, ignoring
    /// style. Translation keys appear as-is.
    pub fn to_plain(&self) -> String {
        let mut out = String::new();
        self.push_plain(&mut out);
        out
    }

    fn push_plain(&self, out: &mut String) {
        match &self.content {
            TextContent::Literal(text) => out.push_str(text),
            TextContent::Translate { key, .. } => out.push_str(key),
        }
        for child in &self.extra {
            child.push_plain(out);
        }
    }

    /// Resolves every translatable component whose key `translations`
    /// knows, for the given locale. Unknown keys are left for the client.
    pub fn localize(&self, translations: &Translations, locale: &str) -> Text {
        let content = match &self.content {
            TextContent::Translate { key, with } => {
                let args: Vec<Text> =
                    with.iter().map(|arg| arg.localize(translations, locale)).collect();
                match translations.get(locale, key) {
                    Some(template) => {
                        let plain: Vec<String> = args.iter().map(Text::to_plain).collect();
                        TextContent::Literal(Translations::render(template, &plain))
                    }
                    None => TextContent::Translate {
                        key: key.clone(),
                        with: args,
                    },
                }
            }
            literal => literal.clone(),
        };
        Text {
            content,
            style: self.style.clone(),
            extra: self
                .extra
                .iter()
                .map(|child| child.localize(translations, locale))
                .collect(),
        }
    }

    // -- JSON ------------------------------------------------------------------

    /// The object-rooted JSON form.
    pub fn to_json(&self) -> Json {
        let mut obj = Map::new();
        match &self.content {
            TextContent::Literal(text) => {
                obj.insert("text".into(), Json::String(text.clone()));
            }
            TextContent::Translate { key, with } => {
                obj.insert("translate".into(), Json::String(key.clone()));
                if !with.is_empty() {
                    obj.insert("with".into(), with.iter().map(Text::to_json).collect());
                }
            }
        }
        if let Some(color) = &self.style.color {
            obj.insert("color".into(), Json::String(color.clone()));
        }
        for (name, flag) in STYLE_FLAGS.iter().zip(self.style.flags()) {
            if let Some(flag) = flag {
                obj.insert((*name).into(), Json::Bool(flag));
            }
        }
        if !self.extra.is_empty() {
            obj.insert("extra".into(), self.extra.iter().map(Text::to_json).collect());
        }
        Json::Object(obj)
    }

    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }

    /// Parses any of the three accepted shapes (string, array, object).
    pub fn from_json(json: &Json) -> Result<Self, ProtocolError> {
        match json {
            Json::String(text) => Ok(Self::literal(text.clone())),
            Json::Array(items) => {
                let mut root = Self::literal("");
                for item in items {
                    root.extra.push(Self::from_json(item)?);
                }
                Ok(root)
            }
            Json::Object(obj) => Self::from_object(obj),
            // Numbers and booleans show up in some hand-written JSON.
            Json::Number(n) => Ok(Self::literal(n.to_string())),
            Json::Bool(b) => Ok(Self::literal(b.to_string())),
            Json::Null => Err(ProtocolError::InvalidMessage("null text component".into())),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ProtocolError> {
        Self::from_json(&serde_json::from_str(json)?)
    }

    fn from_object(obj: &Map<String, Json>) -> Result<Self, ProtocolError> {
        let content = if let Some(key) = obj.get("translate") {
            let key = key
                .as_str()
                .ok_or_else(|| ProtocolError::InvalidMessage("translate key must be a string".into()))?;
            let with = match obj.get("with") {
                Some(Json::Array(args)) => args
                    .iter()
                    .map(Self::from_json)
                    .collect::<Result<Vec<_>, _>>()?,
                Some(_) => {
                    return Err(ProtocolError::InvalidMessage(
                        "translate arguments must be an array".into(),
                    ));
                }
                None => Vec::new(),
            };
            TextContent::Translate {
                key: key.to_owned(),
                with,
            }
        } else {
            match obj.get("text") {
                Some(Json::String(text)) => TextContent::Literal(text.clone()),
                Some(other) => TextContent::Literal(other.to_string()),
                None => TextContent::Literal(String::new()),
            }
        };

        let mut style = Style {
            color: obj.get("color").and_then(Json::as_str).map(str::to_owned),
            ..Style::default()
        };
        for (idx, name) in STYLE_FLAGS.iter().enumerate() {
            *style.flag_mut(idx) = obj.get(*name).and_then(Json::as_bool);
        }

        let extra = match obj.get("extra") {
            Some(Json::Array(children)) => children
                .iter()
                .map(Self::from_json)
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(ProtocolError::InvalidMessage("extra must be an array".into()));
            }
            None => Vec::new(),
        };

        Ok(Self {
            content,
            style,
            extra,
        })
    }
}

impl From<&str> for Text {
    fn from(text: &str) -> Self {
        Self::literal(text)
    }
}

impl From<String> for Text {
    fn from(text: String) -> Self {
        Self::literal(text)
    }
}

// ---------------------------------------------------------------------------
// Translations
// ---------------------------------------------------------------------------

/// Per-locale translation tables: locale → key → template.
///
/// Templates use `%s` for the next argument, `%N$s` for argument `N`
/// (1-based) and `%%` for a literal percent sign.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Translations {
    locales: HashMap<String, HashMap<String, String>>,
}

impl Translations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads tables from JSON shaped like `{"en_us": {"key": "template"}}`.
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn insert(
        &mut self,
        locale: impl Into<String>,
        key: impl Into<String>,
        template: impl Into<String>,
    ) {
        self.locales
            .entry(locale.into().to_lowercase())
            .or_default()
            .insert(key.into(), template.into());
    }

    /// The template for `key` in `locale`, falling back to
    /// [`DEFAULT_LOCALE`].
    pub fn get(&self, locale: &str, key: &str) -> Option<&str> {
        let locale = locale.to_lowercase();
        self.locales
            .get(&locale)
            .and_then(|table| table.get(key))
            .or_else(|| {
                self.locales
                    .get(DEFAULT_LOCALE)
                    .and_then(|table| table.get(key))
            })
            .map(String::as_str)
    }

    /// Substitutes arguments into a template. Missing arguments render as
    /// empty strings.
    pub fn render(template: &str, args: &[String]) -> String {
        let mut out = String::with_capacity(template.len());
        let mut next = 0;
        let mut chars = template.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            match chars.peek().copied() {
                Some('%') => {
                    chars.next();
                    out.push('%');
                }
                Some('s') => {
                    chars.next();
                    out.push_str(args.get(next).map_or("", String::as_str));
                    next += 1;
                }
                Some(d) if d.is_ascii_digit() => {
                    let mut digits = String::new();
                    while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                        digits.push(d);
                        chars.next();
                    }
                    if chars.peek() == Some(&'$') {
                        chars.next();
                        if chars.peek() == Some(&'s') {
                            chars.next();
                        }
                        let idx = digits.parse::<usize>().unwrap_or(0);
                        if let Some(arg) = idx.checked_sub(1).and_then(|i| args.get(i)) {
                            out.push_str(arg);
                        }
                    } else {
                        out.push('%');
                        out.push_str(&digits);
                    }
                }
                _ => out.push('%'),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_string_becomes_object() {
        let text = Text::from_json_str(r#""hello""#).unwrap();
        assert_eq!(text, Text::literal("hello"));
        assert_eq!(text.to_json_string(), r#"{"text":"hello"}"#);
    }

    #[test]
    fn test_bare_array_wrapped_and_reparsed() {
        let text = Text::from_json_str(r#"["a", {"text": "b", "bold": true}]"#).unwrap();
        let json = text.to_json();
        assert!(json.is_object());
        assert_eq!(json["text"], "");
        assert_eq!(json["extra"][0]["text"], "a");
        assert_eq!(json["extra"][1]["bold"], true);

        let again = Text::from_json(&json).unwrap();
        assert_eq!(again, text);
        assert_eq!(again.to_plain(), "ab");
    }

    #[test]
    fn test_translate_round_trip() {
        let text = Text::translate("chat.type.text", vec!["Steve".into(), "hi".into()])
            .color("gray");
        let again = Text::from_json(&text.to_json()).unwrap();
        assert_eq!(again, text);
    }

    #[test]
    fn test_null_is_rejected() {
        assert!(Text::from_json_str("null").is_err());
        assert!(matches!(
            Text::from_json_str("{"),
            Err(ProtocolError::InvalidText(_))
        ));
    }

    #[test]
    fn test_render_positional_and_sequential() {
        let args = vec!["A".to_string(), "B".to_string()];
        assert_eq!(Translations::render("%s and %s", &args), "A and B");
        assert_eq!(Translations::render("%2$s before %1$s", &args), "B before A");
        assert_eq!(Translations::render("100%%", &args), "100%");
        assert_eq!(Translations::render("%s %s %s", &args), "A B ");
    }

    #[test]
    fn test_localize_uses_locale_then_default() {
        let mut translations = Translations::new();
        translations.insert("en_us", "greet", "Hello %s");
        translations.insert("de_de", "greet", "Hallo %s");

        let text = Text::translate("greet", vec!["Alex".into()]);
        assert_eq!(text.localize(&translations, "de_DE").to_plain(), "Hallo Alex");
        assert_eq!(text.localize(&translations, "fr_fr").to_plain(), "Hello Alex");
    }

    #[test]
    fn test_unknown_key_left_for_client() {
        let translations = Translations::new();
        let text = Text::translate("item.unknown", Vec::new());
        assert_eq!(text.localize(&translations, "en_us"), text);
    }

    #[test]
    fn test_translations_from_json() {
        let translations =
            Translations::from_json(r#"{"en_us": {"disconnect.timeout": "Timed out"}}"#).unwrap();
        assert_eq!(translations.get("EN_US", "disconnect.timeout"), Some("Timed out"));
    }
}
