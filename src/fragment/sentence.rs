//! Sentence-like splitting of paragraph content.
//!
//! A fragment ends right after a space that immediately follows a run of
//! `.`, `!` or `?`, or at the end of the text. Nothing else is a boundary:
//! punctuation glued to the next word, to a quote, or to markup does not
//! split. Terminators inside a tag (`<a title="Mr. Smith">`) are never
//! boundaries. Fragments are borrowed slices that partition the input
//! exactly, so markup embedded in the paragraph passes through untouched.
//!
//! Empty text yields no fragments. A text ending in a splitting space does
//! not produce a trailing empty fragment.

use std::iter::FusedIterator;

use memchr::{memchr, memchr3};

fn is_terminator(byte: u8) -> bool {
    matches!(byte, b'.' | b'!' | b'?')
}

/// Iterator over the fragments of a text. See [`fragments`].
#[derive(Debug, Clone)]
pub struct Fragments<'a> {
    text: &'a str,
    start: usize,
    pos: usize,
}

impl<'a> Iterator for Fragments<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let bytes = self.text.as_bytes();

        while self.pos < bytes.len() {
            // Text runs up to the next tag. Serialized markup escapes `<` in
            // text and `>` in attribute values, so the tag ends at the first `>`.
            let text_end =
                memchr(b'<', &bytes[self.pos..]).map_or(bytes.len(), |i| self.pos + i);

            let Some(offset) = memchr3(b'.', b'!', b'?', &bytes[self.pos..text_end]) else {
                self.pos =
                    memchr(b'>', &bytes[text_end..]).map_or(bytes.len(), |i| text_end + i + 1);
                continue;
            };

            let mut after = self.pos + offset + 1;
            while after < text_end && is_terminator(bytes[after]) {
                after += 1;
            }

            if after < text_end && bytes[after] == b' ' {
                // All split points are ASCII, so slicing stays on char boundaries.
                let piece = &self.text[self.start..=after];
                self.start = after + 1;
                self.pos = after + 1;
                return Some(piece);
            }
            self.pos = after;
        }

        self.pos = bytes.len();
        if self.start < bytes.len() {
            let piece = &self.text[self.start..];
            self.start = bytes.len();
            return Some(piece);
        }
        None
    }
}

impl FusedIterator for Fragments<'_> {}

/// Lazily split `text` into fragments.
pub fn fragments(text: &str) -> Fragments<'_> {
    Fragments {
        text,
        start: 0,
        pos: 0,
    }
}

/// Split `text` into its ordered fragments.
///
/// ```
/// use fragment_ids::fragment;
///
/// assert_eq!(fragment("Hi. Bye."), vec!["Hi. ", "Bye."]);
/// assert_eq!(fragment("Wait... really?"), vec!["Wait... ", "really?"]);
/// ```
pub fn fragment(text: &str) -> Vec<&str> {
    fragments(text).collect()
}

/// Number of fragments `text` splits into, without allocating.
pub fn fragment_count(text: &str) -> usize {
    fragments(text).count()
}
