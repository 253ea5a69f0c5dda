use crate::messages::PanelState;
use crate::preview::{CodePreview, Highlighter};
use crate::steps;

pub const HEADING: &str = "Get started with your script";

/// Everything the panel shows for one state and one code string
pub struct PanelView<'a> {
    state: PanelState,
    status: Option<&'a str>,
    preview: CodePreview<'a>,
}

impl<'a> PanelView<'a> {
    pub fn new(state: PanelState, code: &'a str) -> Self {
        Self {
            state,
            status: None,
            preview: CodePreview::new(code),
        }
    }

    pub fn with_preview_rows(mut self, min_rows: usize, max_rows: usize) -> Self {
        self.preview = self.preview.with_rows(min_rows, max_rows);
        self
    }

    /// Message shown under the button, e.g. why the last recording failed
    pub fn with_status(mut self, status: Option<&'a str>) -> Self {
        self.status = status;
        self
    }

    pub fn button_label(&self) -> &'static str {
        self.state.button_label()
    }

    pub fn preview(&self) -> &CodePreview<'a> {
        &self.preview
    }

    pub fn render(&self, scroll: usize, color: bool, highlighter: &Highlighter) -> String {
        let mut out = format!("{}    [ {} ]\n", HEADING, self.button_label());
        if let Some(status) = self.status {
            out.push_str(&format!("! {}\n", status));
        }
        out.push('\n');
        out.push_str(&steps::render());
        out.push('\n');
        out.push_str(&format!("┌ {}\n", self.preview.language()));
        out.push_str(&self.preview.render(scroll, color, highlighter));
        out
    }
}
