use codeseek_utils_tokenizer::{CHARS_PER_TOKEN, Tokenizer};

/// Upper bound on the shrink-by-a-quarter loop for one over-long line.
const MAX_TRIM_ITERATIONS: usize = 32;

/// A contiguous slice of a logical block, within the token budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Part {
    pub start_line: usize,
    pub end_line: usize,
    pub text: String,
}

/// Splits text along line boundaries so every part fits `max_tokens`.
pub(crate) struct TokenBudget<'t> {
    tokenizer: &'t Tokenizer,
    max_tokens: usize,
}

impl<'t> TokenBudget<'t> {
    pub fn new(tokenizer: &'t Tokenizer, max_tokens: usize) -> Self {
        Self {
            tokenizer,
            max_tokens,
        }
    }

    pub fn count(&self, text: &str) -> usize {
        self.tokenizer.count(text)
    }

    pub fn fits(&self, text: &str) -> bool {
        self.count(text) <= self.max_tokens
    }

    /// Split `text`, whose first line is `start_line`, into ordered parts.
    ///
    /// Line-aligned parts are contiguous and non-overlapping. A single line
    /// over the budget is cut by characters; all of its fragments report
    /// that line.
    pub fn split(&self, text: &str, start_line: usize) -> Vec<Part> {
        if self.fits(text) {
            return vec![Part {
                start_line,
                end_line: start_line + text.matches('\n').count(),
                text: text.to_string(),
            }];
        }

        let mut parts = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_start = start_line;
        let mut current_tokens = 0;

        for (offset, line) in text.split('\n').enumerate() {
            let line_no = start_line + offset;
            let line_tokens = self.count(line);

            if line_tokens > self.max_tokens {
                self.flush(&mut parts, current_start, &mut current);
                current_tokens = 0;
                for fragment in self.split_long_line(line) {
                    parts.push(Part {
                        start_line: line_no,
                        end_line: line_no,
                        text: fragment.to_string(),
                    });
                }
                continue;
            }

            // +1 for the joining newline
            let cost = line_tokens + 1;
            if !current.is_empty() && current_tokens + cost > self.max_tokens {
                self.flush(&mut parts, current_start, &mut current);
                current_tokens = 0;
            }
            if current.is_empty() {
                current_start = line_no;
            }
            current.push(line);
            current_tokens += cost;
        }
        self.flush(&mut parts, current_start, &mut current);

        parts
    }

    fn flush(&self, parts: &mut Vec<Part>, start_line: usize, lines: &mut Vec<&str>) {
        if lines.is_empty() {
            return;
        }
        self.push_lines(parts, start_line, lines);
        lines.clear();
    }

    /// Per-line counts are an estimate of the joined count, so the joined
    /// text is re-checked and halved until it fits. One line always fits.
    fn push_lines(&self, parts: &mut Vec<Part>, start_line: usize, lines: &[&str]) {
        let text = lines.join("\n");
        if lines.len() == 1 || self.fits(&text) {
            parts.push(Part {
                start_line,
                end_line: start_line + lines.len() - 1,
                text,
            });
            return;
        }
        let mid = lines.len() / 2;
        self.push_lines(parts, start_line, &lines[..mid]);
        self.push_lines(parts, start_line + mid, &lines[mid..]);
    }

    fn split_long_line<'l>(&self, line: &'l str) -> Vec<&'l str> {
        let mut fragments = Vec::new();
        let mut rest = line;

        while !rest.is_empty() {
            let mut piece = prefix_chars(rest, self.max_tokens * CHARS_PER_TOKEN);
            let mut iterations = 0;
            while !self.fits(piece) && iterations < MAX_TRIM_ITERATIONS {
                let chars = piece.chars().count();
                if chars <= 1 {
                    break;
                }
                piece = prefix_chars(piece, chars * 3 / 4);
                iterations += 1;
            }
            if !self.fits(piece) {
                // A token never spans less than one byte, and this many chars
                // is at most `max_tokens` bytes.
                piece = prefix_chars(rest, (self.max_tokens / CHARS_PER_TOKEN).max(1));
            }

            fragments.push(piece);
            rest = &rest[piece.len()..];
        }

        fragments
    }
}

fn prefix_chars(text: &str, chars: usize) -> &str {
    match text.char_indices().nth(chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Fixed-size line windows as `(start_line, end_line, text)`.
pub(crate) fn line_windows<'a>(
    lines: &'a [&'a str],
    window: usize,
) -> impl Iterator<Item = (usize, usize, String)> + 'a {
    let window = window.max(1);
    lines.chunks(window).enumerate().map(move |(i, chunk)| {
        let start_line = i * window + 1;
        (start_line, start_line + chunk.len() - 1, chunk.join("\n"))
    })
}
