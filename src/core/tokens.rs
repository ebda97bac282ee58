//! Split delimited tag and alias strings into text/separator token streams.
//!
//! A stream always starts and ends with a text token (possibly empty) and
//! alternates text, separator, text, ... so joining it gives back the input.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Text(&'a str),
    Separator(&'a str),
}

impl<'a> Token<'a> {
    pub fn as_str(&self) -> &'a str {
        match self {
            Token::Text(s) | Token::Separator(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenStream<'a> {
    tokens: Vec<Token<'a>>,
}

impl<'a> TokenStream<'a> {
    /// Tag lists: any run of whitespace and commas separates entries.
    pub fn tag_list(text: &'a str) -> Self {
        let mut builder = Builder::new(text);
        let mut iter = text.char_indices().peekable();

        while let Some((start, c)) = iter.next() {
            if !is_tag_separator(c) {
                continue;
            }
            let mut end = start + c.len_utf8();
            while let Some(&(i, next)) = iter.peek() {
                if !is_tag_separator(next) {
                    break;
                }
                end = i + next.len_utf8();
                iter.next();
            }
            builder.separator(start, end);
        }

        builder.finish()
    }

    /// Alias lists: a comma with its surrounding whitespace separates
    /// entries, plus leading and trailing whitespace. Whitespace inside an
    /// alias stays part of it.
    pub fn alias_list(text: &'a str) -> Self {
        let mut builder = Builder::new(text);
        let bytes_len = text.len();

        let mut pos = skip_whitespace(text, 0);
        if pos > 0 {
            builder.separator(0, pos);
        }

        while pos < bytes_len {
            let Some(c) = text[pos..].chars().next() else {
                break;
            };

            if c == ',' || c.is_whitespace() {
                let ws_end = skip_whitespace(text, pos);
                if text[ws_end..].starts_with(',') {
                    let end = skip_whitespace(text, ws_end + 1);
                    builder.separator(pos, end);
                    pos = end;
                    continue;
                }
                if ws_end == bytes_len && ws_end > pos {
                    builder.separator(pos, bytes_len);
                    break;
                }
            }

            pos += c.len_utf8();
        }

        builder.finish()
    }

    pub fn tokens(&self) -> &[Token<'a>] {
        &self.tokens
    }

    /// Rebuild the string, passing every text token through `f`.
    pub fn map_text<F>(&self, mut f: F) -> String
    where
        F: FnMut(&'a str) -> String,
    {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                Token::Text(s) => out.push_str(&f(s)),
                Token::Separator(s) => out.push_str(s),
            }
        }
        out
    }

    pub fn join(&self) -> String {
        self.tokens.iter().map(Token::as_str).collect()
    }
}

fn is_tag_separator(c: char) -> bool {
    c == ',' || c.is_whitespace()
}

fn skip_whitespace(text: &str, from: usize) -> usize {
    text[from..]
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map(|(i, _)| from + i)
        .unwrap_or(text.len())
}

struct Builder<'a> {
    text: &'a str,
    last: usize,
    tokens: Vec<Token<'a>>,
}

impl<'a> Builder<'a> {
    fn new(text: &'a str) -> Self {
        Builder {
            text,
            last: 0,
            tokens: Vec::new(),
        }
    }

    fn separator(&mut self, start: usize, end: usize) {
        self.tokens.push(Token::Text(&self.text[self.last..start]));
        self.tokens.push(Token::Separator(&self.text[start..end]));
        self.last = end;
    }

    fn finish(mut self) -> TokenStream<'a> {
        self.tokens.push(Token::Text(&self.text[self.last..]));
        TokenStream {
            tokens: self.tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs<'a>(stream: &TokenStream<'a>) -> Vec<&'a str> {
        stream.tokens().iter().map(Token::as_str).collect()
    }

    #[test]
    fn tag_list_splits_on_whitespace_and_comma_runs() {
        let stream = TokenStream::tag_list("foo, bar\n baz");
        assert_eq!(strs(&stream), vec!["foo", ", ", "bar", "\n ", "baz"]);
        assert!(matches!(stream.tokens()[1], Token::Separator(_)));
    }

    #[test]
    fn tag_list_keeps_empty_edges() {
        let stream = TokenStream::tag_list(" foo,");
        assert_eq!(strs(&stream), vec!["", " ", "foo", ",", ""]);
    }

    #[test]
    fn tag_list_without_separators_is_single_text() {
        let stream = TokenStream::tag_list("foo/bar");
        assert_eq!(stream.tokens(), &[Token::Text("foo/bar")]);
    }

    #[test]
    fn alias_list_keeps_interior_whitespace() {
        let stream = TokenStream::alias_list("hello world, #foo ,bar");
        assert_eq!(strs(&stream), vec!["hello world", ", ", "#foo", " ,", "bar"]);
    }

    #[test]
    fn alias_list_splits_leading_and_trailing_whitespace() {
        let stream = TokenStream::alias_list("  hello, #foo, world\n");
        assert_eq!(
            strs(&stream),
            vec!["", "  ", "hello", ", ", "#foo", ", ", "world", "\n", ""]
        );
    }

    #[test]
    fn alias_list_leading_run_then_comma() {
        let stream = TokenStream::alias_list("  ,a");
        assert_eq!(strs(&stream), vec!["", "  ", "", ",", "a"]);
    }

    #[test]
    fn alias_list_comma_swallows_trailing_whitespace() {
        let stream = TokenStream::alias_list("a ,  ");
        assert_eq!(strs(&stream), vec!["a", " ,  ", ""]);
    }

    #[test]
    fn join_round_trips() {
        for input in ["", "a", " a , b ", "x,,y", "\t#tag\n", "日本, 語"] {
            assert_eq!(TokenStream::tag_list(input).join(), input);
            assert_eq!(TokenStream::alias_list(input).join(), input);
        }
    }

    #[test]
    fn map_text_leaves_separators_alone() {
        let stream = TokenStream::tag_list("a, b");
        let out = stream.map_text(|s| s.to_uppercase());
        assert_eq!(out, "A, B");
    }
}
