use unicode_width::UnicodeWidthChar;

/// Decides how many terminal columns a character occupies.
///
/// Implementations should return 1 or 2. Closures work too:
///
/// ```rust,ignore
/// let ascii_only = |_: char| 1;
/// let progress = Progress::new("$=t $p%", 2)?.width_classifier(ascii_only);
/// ```
pub trait WidthClassifier: Send + Sync {
    fn width(&self, ch: char) -> usize;

    /// Total columns of `text`.
    fn measure(&self, text: &str) -> usize {
        text.chars().map(|ch| self.width(ch)).sum()
    }
}

impl<F> WidthClassifier for F
where F: Fn(char) -> usize + Send + Sync
{
    fn width(&self, ch: char) -> usize {
        self(ch)
    }
}

/// East Asian wide and emoji characters take two columns, everything else one.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeWidth;

impl WidthClassifier for UnicodeWidth {
    fn width(&self, ch: char) -> usize {
        match UnicodeWidthChar::width(ch) {
            Some(w) if w >= 2 => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_characters_take_two_columns() {
        assert_eq!(UnicodeWidth.width('a'), 1);
        assert_eq!(UnicodeWidth.width('界'), 2);
        assert_eq!(UnicodeWidth.measure("ab界"), 4);
    }

    #[test]
    fn zero_width_and_control_count_as_one() {
        assert_eq!(UnicodeWidth.width('\u{200b}'), 1);
        assert_eq!(UnicodeWidth.width('\t'), 1);
    }

    #[test]
    fn closures_classify() {
        let everything_wide = |_: char| 2;
        assert_eq!(everything_wide.measure("abc"), 6);
    }
}
