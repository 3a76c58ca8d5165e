//! Per-page header and footer templates.
//!
//! A template is a factory: the paginator calls it once per page with that
//! page's context and gets back a fresh [`Visual`]. Pages own instances, not
//! factories, so two pages never share a visual.
//!
//! [`TextTemplate`] is the built-in implementation: a pattern string with
//! `{page}`, `{pages}`, and `{data.path.to.field}` placeholders resolved
//! against the caller's opaque data context.

use serde_json::Value;

use crate::model::{approx_text_width, Color, DrawCommand, Visual};

/// Everything a template may bind against when instantiating for one page.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    /// 1-based page number.
    pub page_number: u32,
    /// Total page count; known once element assignment has finished.
    pub page_count: Option<u32>,
    /// Width of the page content region the produced visual should fill.
    pub content_width: f64,
    /// The caller's data context. Opaque to the paginator; templates may
    /// pull fields out of it.
    pub data: &'a Value,
}

/// Factory producing one header or footer visual per page.
pub trait PageTemplate {
    fn instantiate(&self, ctx: &TemplateContext<'_>) -> Visual;
}

impl<F> PageTemplate for F
where
    F: Fn(&TemplateContext<'_>) -> Visual,
{
    fn instantiate(&self, ctx: &TemplateContext<'_>) -> Visual {
        self(ctx)
    }
}

/// Horizontal placement of a [`TextTemplate`] line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TemplateAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// A single-line text header/footer with placeholder substitution.
#[derive(Debug, Clone)]
pub struct TextTemplate {
    pub pattern: String,
    pub font_size: f64,
    pub color: Color,
    pub align: TemplateAlign,
}

impl TextTemplate {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            font_size: 10.0,
            color: Color::rgb(0.25, 0.25, 0.25),
            align: TemplateAlign::default(),
        }
    }

    pub fn aligned(pattern: impl Into<String>, align: TemplateAlign) -> Self {
        Self {
            align,
            ..Self::new(pattern)
        }
    }

    fn resolve(&self, ctx: &TemplateContext<'_>) -> String {
        let mut out = String::with_capacity(self.pattern.len());
        let mut rest = self.pattern.as_str();
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) => {
                    out.push_str(&substitute(&after[..close], ctx));
                    rest = &after[close + 1..];
                }
                None => {
                    // Unterminated placeholder: keep the brace literally.
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

impl PageTemplate for TextTemplate {
    fn instantiate(&self, ctx: &TemplateContext<'_>) -> Visual {
        let content = self.resolve(ctx);
        let text_width = approx_text_width(&content, self.font_size);
        let x = match self.align {
            TemplateAlign::Left => 0.0,
            TemplateAlign::Center => ((ctx.content_width - text_width) / 2.0).max(0.0),
            TemplateAlign::Right => (ctx.content_width - text_width).max(0.0),
        };
        let height = self.font_size * 1.8;
        let mut visual = Visual::new(ctx.content_width, height);
        visual.push(DrawCommand::Text {
            x,
            y: self.font_size * 0.4,
            content,
            font_size: self.font_size,
            color: self.color,
        });
        visual
    }
}

fn substitute(token: &str, ctx: &TemplateContext<'_>) -> String {
    match token {
        "page" => ctx.page_number.to_string(),
        "pages" => ctx
            .page_count
            .map(|c| c.to_string())
            .unwrap_or_else(|| "?".to_string()),
        _ => {
            if let Some(path) = token.strip_prefix("data.") {
                match traverse(ctx.data, path) {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                }
            } else {
                // Unknown token: keep it visible rather than silently eating it.
                format!("{{{token}}}")
            }
        }
    }
}

/// Traverse a JSON value by dot-separated path segments. Array indices are
/// numeric segments.
fn traverse<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for part in path.split('.') {
        match current {
            Value::Object(map) => {
                current = map.get(part)?;
            }
            Value::Array(arr) => {
                let idx: usize = part.parse().ok()?;
                current = arr.get(idx)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx<'a>(data: &'a Value) -> TemplateContext<'a> {
        TemplateContext {
            page_number: 3,
            page_count: Some(7),
            content_width: 500.0,
            data,
        }
    }

    #[test]
    fn substitutes_page_tokens() {
        let data = Value::Null;
        let t = TextTemplate::new("Page {page} of {pages}");
        assert_eq!(t.resolve(&ctx(&data)), "Page 3 of 7");
    }

    #[test]
    fn unknown_count_renders_placeholder() {
        let data = Value::Null;
        let t = TextTemplate::new("{page}/{pages}");
        let c = TemplateContext {
            page_count: None,
            ..ctx(&data)
        };
        assert_eq!(t.resolve(&c), "3/?");
    }

    #[test]
    fn resolves_data_paths() {
        let data = json!({"report": {"title": "Q2 Review", "rows": [10, 20]}});
        let t = TextTemplate::new("{data.report.title} — row {data.report.rows.1}");
        assert_eq!(t.resolve(&ctx(&data)), "Q2 Review — row 20");
    }

    #[test]
    fn missing_data_path_is_empty() {
        let data = json!({"a": 1});
        let t = TextTemplate::new("[{data.b.c}]");
        assert_eq!(t.resolve(&ctx(&data)), "[]");
    }

    #[test]
    fn unknown_token_kept_literally() {
        let data = Value::Null;
        let t = TextTemplate::new("{nope} and {page}");
        assert_eq!(t.resolve(&ctx(&data)), "{nope} and 3");
    }

    #[test]
    fn instantiate_fills_content_width() {
        let data = Value::Null;
        let t = TextTemplate::aligned("centered", TemplateAlign::Center);
        let visual = t.instantiate(&ctx(&data));
        assert_eq!(visual.width, 500.0);
        assert!(visual.height > 0.0);
        match &visual.commands[0] {
            DrawCommand::Text { x, .. } => assert!(*x > 0.0, "centered text should be offset"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn closure_templates_work() {
        let data = Value::Null;
        let factory = |c: &TemplateContext<'_>| Visual::new(c.content_width, 12.0);
        let visual = factory.instantiate(&ctx(&data));
        assert_eq!(visual.width, 500.0);
        assert_eq!(visual.height, 12.0);
    }
}
