//! Line ending detection for text loaded from disk.

/// Line ending style detected from source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    Cr,
    Crlf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Cr => "\r",
            LineEnding::Crlf => "\r\n",
        }
    }
}

/// Result of normalizing line endings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    /// LF-only content.
    pub normalized: String,
    /// Majority style of the input.
    pub original: LineEnding,
    pub had_trailing_newline: bool,
    /// More than one style was present.
    pub mixed: bool,
}

/// Rewrite CRLF and lone CR to LF. The majority style wins detection; ties
/// prefer CRLF, then LF, then CR.
pub fn normalize_line_endings(input: &str) -> NormalizedText {
    let mut out = String::with_capacity(input.len());
    let (mut crlf, mut lf, mut cr) = (0usize, 0usize, 0usize);
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' if chars.peek() == Some(&'\n') => {
                chars.next();
                crlf += 1;
                out.push('\n');
            }
            '\r' => {
                cr += 1;
                out.push('\n');
            }
            '\n' => {
                lf += 1;
                out.push('\n');
            }
            c => out.push(c),
        }
    }
    let counts = [(LineEnding::Crlf, crlf), (LineEnding::Lf, lf), (LineEnding::Cr, cr)];
    let (original, max) = counts
        .iter()
        .fold((LineEnding::Lf, 0), |best, &(style, n)| if n > best.1 { (style, n) } else { best });
    let present = counts.iter().filter(|(_, n)| *n > 0).count();
    NormalizedText {
        had_trailing_newline: out.ends_with('\n'),
        mixed: present > 1 && counts.iter().any(|&(_, n)| n > 0 && n != max),
        normalized: out,
        original,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_crlf() {
        let n = normalize_line_endings("a\r\nb\r\n");
        assert_eq!(n.normalized, "a\nb\n");
        assert_eq!(n.original, LineEnding::Crlf);
        assert!(n.had_trailing_newline);
        assert!(!n.mixed);
    }

    #[test]
    fn normalize_cr_and_mixed() {
        let n = normalize_line_endings("a\rb\r");
        assert_eq!(n.normalized, "a\nb\n");
        assert_eq!(n.original, LineEnding::Cr);
        let m = normalize_line_endings("a\r\nb\nc\n");
        assert_eq!(m.original, LineEnding::Lf);
        assert!(m.mixed);
    }

    #[test]
    fn plain_text_untouched() {
        let n = normalize_line_endings("no newline");
        assert_eq!(n.normalized, "no newline");
        assert!(!n.had_trailing_newline);
        assert_eq!(n.original, LineEnding::Lf);
    }
}
