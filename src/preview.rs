use regex::Regex;

pub const DEFAULT_MAX_ROWS: usize = 20;
pub const DEFAULT_MIN_ROWS: usize = 12;

const TOKEN_PATTERN: &str = concat!(
    r"(?P<comment>//.*$)",
    r#"|(?P<string>'(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*"|`(?:[^`\\]|\\.)*`)"#,
    r"|(?P<keyword>\b(?:async|await|break|case|catch|class|const|continue|default|do|else|export|false|finally|for|from|function|if|import|in|let|new|null|of|return|switch|this|throw|true|try|typeof|undefined|var|while)\b)",
    r"|(?P<number>\b\d+(?:\.\d+)?\b)",
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Plain,
    Keyword,
    String,
    Comment,
    Number,
}

impl TokenKind {
    fn ansi(self) -> Option<&'static str> {
        match self {
            TokenKind::Plain => None,
            TokenKind::Keyword => Some("\x1b[34m"),
            TokenKind::String => Some("\x1b[32m"),
            TokenKind::Comment => Some("\x1b[2m"),
            TokenKind::Number => Some("\x1b[33m"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

/// Line-based JavaScript highlighter
///
/// Every byte of a line lands in exactly one span, so joining the spans
/// gives back the original line.
pub struct Highlighter {
    tokens: Option<Regex>,
}

impl Highlighter {
    pub fn new() -> Self {
        let tokens = match Regex::new(TOKEN_PATTERN) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!("Highlighting disabled: {}", e);
                None
            }
        };

        Self { tokens }
    }

    pub fn highlight<'a>(&self, line: &'a str) -> Vec<Span<'a>> {
        let Some(tokens) = &self.tokens else {
            return plain(line);
        };

        let mut spans = Vec::new();
        let mut last = 0;

        for caps in tokens.captures_iter(line) {
            let Some(whole) = caps.get(0) else { continue };

            if whole.start() > last {
                spans.push(Span {
                    kind: TokenKind::Plain,
                    text: &line[last..whole.start()],
                });
            }

            let kind = if caps.name("comment").is_some() {
                TokenKind::Comment
            } else if caps.name("string").is_some() {
                TokenKind::String
            } else if caps.name("keyword").is_some() {
                TokenKind::Keyword
            } else {
                TokenKind::Number
            };

            spans.push(Span {
                kind,
                text: whole.as_str(),
            });
            last = whole.end();
        }

        if last < line.len() {
            spans.push(Span {
                kind: TokenKind::Plain,
                text: &line[last..],
            });
        }

        spans
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

fn plain(line: &str) -> Vec<Span<'_>> {
    if line.is_empty() {
        Vec::new()
    } else {
        vec![Span {
            kind: TokenKind::Plain,
            text: line,
        }]
    }
}

/// Read-only, scrollable code block
///
/// Heights are in rows. The block never shrinks below `min_rows` and shows
/// at most `max_rows` at a time; longer code scrolls.
pub struct CodePreview<'a> {
    code: &'a str,
    language: &'static str,
    max_rows: usize,
    min_rows: usize,
}

impl<'a> CodePreview<'a> {
    pub fn new(code: &'a str) -> Self {
        Self {
            code,
            language: "js",
            max_rows: DEFAULT_MAX_ROWS,
            min_rows: DEFAULT_MIN_ROWS,
        }
    }

    pub fn with_rows(mut self, min_rows: usize, max_rows: usize) -> Self {
        self.min_rows = min_rows;
        self.max_rows = max_rows.max(min_rows);
        self
    }

    pub fn language(&self) -> &'static str {
        self.language
    }

    /// Lines of the code exactly as supplied; empty code has no lines
    pub fn lines(&self) -> Vec<&'a str> {
        if self.code.is_empty() {
            Vec::new()
        } else {
            self.code.split('\n').collect()
        }
    }

    pub fn display_height(&self) -> usize {
        self.lines().len().clamp(self.min_rows, self.max_rows)
    }

    pub fn is_scrollable(&self) -> bool {
        self.lines().len() > self.max_rows
    }

    /// Window of lines starting at `offset`, clamped so the last page stays full
    pub fn visible(&self, offset: usize) -> Vec<&'a str> {
        let lines = self.lines();
        let start = offset.min(lines.len().saturating_sub(self.max_rows));
        lines.into_iter().skip(start).take(self.max_rows).collect()
    }

    pub fn render(&self, offset: usize, color: bool, highlighter: &Highlighter) -> String {
        let visible = self.visible(offset);
        let mut out = String::new();

        for row in 0..self.display_height() {
            out.push_str("│ ");
            if let Some(line) = visible.get(row) {
                for span in highlighter.highlight(line) {
                    match span.kind.ansi() {
                        Some(style) if color => {
                            out.push_str(style);
                            out.push_str(span.text);
                            out.push_str("\x1b[0m");
                        }
                        _ => out.push_str(span.text),
                    }
                }
            }
            out.push('\n');
        }

        if self.is_scrollable() {
            let total = self.lines().len();
            let first = offset.min(total.saturating_sub(self.max_rows)) + 1;
            let last = (first + self.max_rows - 1).min(total);
            out.push_str(&format!("└ lines {}-{} of {}\n", first, last, total));
        }

        out
    }
}
