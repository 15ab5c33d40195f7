//! HTML preview extraction
//!
//! Looks for a fenced ```` ```html ```` block in an assistant reply and keeps
//! its body as a side artifact the UI can show next to the transcript.

use std::sync::OnceLock;

use regex::Regex;

fn html_block() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Non-greedy: stop at the first closing fence after the opener
    PATTERN.get_or_init(|| Regex::new(r"```html\r?\n([\s\S]*?)```").expect("constant pattern"))
}

/// Inner text of the first ```` ```html ```` block, if one is closed
pub fn extract_html_block(content: &str) -> Option<&str> {
    html_block()
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Current preview artifact and its visibility
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Preview {
    html: Option<String>,
    visible: bool,
}

impl Preview {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn html(&self) -> Option<&str> {
        self.html.as_deref()
    }

    pub fn is_visible(&self) -> bool {
        self.visible && self.html.is_some()
    }

    /// Re-evaluate against the latest assistant content
    ///
    /// A new or changed block replaces the artifact and shows it. The same
    /// block again leaves visibility alone, so a dismissed preview stays
    /// hidden while the reply keeps growing around it.
    pub fn update_from(&mut self, content: &str) -> bool {
        let Some(found) = extract_html_block(content) else {
            return false;
        };
        if self.html.as_deref() == Some(found) {
            return false;
        }
        self.html = Some(found.to_string());
        self.visible = true;
        true
    }

    pub fn dismiss(&mut self) {
        self.visible = false;
    }

    /// Reopen a dismissed artifact; false if there is nothing to show
    pub fn show(&mut self) -> bool {
        self.visible = self.html.is_some();
        self.visible
    }

    pub fn clear(&mut self) {
        self.html = None;
        self.visible = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_block_body() {
        let content = "Here you go:\n```html\n<p>hi</p>\n```";
        assert_eq!(extract_html_block(content), Some("<p>hi</p>\n"));
    }

    #[test]
    fn test_unclosed_or_other_language_ignored() {
        assert_eq!(extract_html_block("```html\n<p>partial"), None);
        assert_eq!(extract_html_block("```css\np {}\n```"), None);
        assert_eq!(extract_html_block("```html <p>same line</p>```"), None);
    }

    #[test]
    fn test_growth_overwrites_artifact() {
        let mut preview = Preview::new();
        assert!(!preview.update_from("```html\n<p>"));
        assert!(preview.update_from("```html\n<p>a</p>\n```"));
        assert_eq!(preview.html(), Some("<p>a</p>\n"));
        assert!(preview.is_visible());
    }

    #[test]
    fn test_dismissed_stays_hidden_for_same_block() {
        let mut preview = Preview::new();
        preview.update_from("```html\nx\n```");
        preview.dismiss();
        assert!(!preview.update_from("```html\nx\n```\nmore text"));
        assert!(!preview.is_visible());
        assert!(preview.show());
        assert!(preview.is_visible());

        preview.clear();
        assert!(!preview.show());
    }
}
