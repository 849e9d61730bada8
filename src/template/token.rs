/// Opens a directive: `$`.
pub(crate) const DIRECTIVE_START: char = '$';
/// Marks a directive as the flexible one: `=`.
pub(crate) const FLEX_MARK: char = '=';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    DirectiveStart,
    FlexMark,
    /// A run of decimal digits. `None` when the value overflows `usize`.
    Number(Option<usize>),
    Letter(char),
    Other(char),
}

/// One classified run of the format string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    /// Bytes consumed from the input.
    pub(crate) len: usize,
}

fn classify(ch: char) -> TokenKind {
    match ch {
        DIRECTIVE_START => TokenKind::DirectiveStart,
        FLEX_MARK => TokenKind::FlexMark,
        '0'..='9' => TokenKind::Number(Some(0)),
        'a'..='z' | 'A'..='Z' => TokenKind::Letter(ch),
        _ => TokenKind::Other(ch),
    }
}

/// Reads the token at the start of `input`.
///
/// Digits are read greedily into one number; every other class is a single
/// character.
pub(crate) fn peek(input: &str) -> Option<Token> {
    let first = input.chars().next()?;
    let kind = classify(first);
    if !matches!(kind, TokenKind::Number(_)) {
        return Some(Token {
            kind,
            len: first.len_utf8(),
        });
    }

    let digits = input.bytes().take_while(u8::is_ascii_digit);
    let mut value = Some(0usize);
    let mut len = 0;
    for digit in digits {
        value = value
            .and_then(|v| v.checked_mul(10))
            .and_then(|v| v.checked_add(usize::from(digit - b'0')));
        len += 1;
    }

    Some(Token {
        kind: TokenKind::Number(value),
        len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_are_read_as_one_number() {
        let token = peek("240b#").unwrap();
        assert_eq!(token.kind, TokenKind::Number(Some(240)));
        assert_eq!(token.len, 3);
    }

    #[test]
    fn single_char_classes() {
        assert_eq!(peek("$t").unwrap().kind, TokenKind::DirectiveStart);
        assert_eq!(peek("=t").unwrap().kind, TokenKind::FlexMark);
        assert_eq!(peek("tp").unwrap().kind, TokenKind::Letter('t'));
        assert_eq!(peek("tp").unwrap().len, 1);
        assert_eq!(peek("é").unwrap().kind, TokenKind::Other('é'));
        assert_eq!(peek("é").unwrap().len, 2);
        assert_eq!(peek(""), None);
    }

    #[test]
    fn oversized_number_reports_overflow() {
        let token = peek("99999999999999999999999999t").unwrap();
        assert_eq!(token.kind, TokenKind::Number(None));
        assert_eq!(token.len, 26);
    }
}
