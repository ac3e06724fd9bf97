//! Splitting normalized text into provider-sized segments.

/// Largest segment sent to the provider in one call, in characters.
pub const DEFAULT_MAX_SEGMENT_CHARS: usize = 1800;

/// Split `text` into ordered segments of at most `max_chars` characters.
///
/// Sentences are packed greedily. A sentence that cannot fit on its own is
/// packed word by word, and a single word longer than the limit is cut at the
/// limit. Joining the result with single spaces gives back `text` when it is
/// already normalized.
pub fn split_into_segments(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    if char_len(text) <= max_chars {
        return vec![text.to_string()];
    }

    let mut segments = Vec::new();
    let mut current = Packer::new(max_chars);

    for sentence in split_sentences(text) {
        if sentence.is_empty() {
            continue;
        }
        if char_len(sentence) > max_chars {
            // Keep order: whatever is pending goes out before the long sentence.
            current.flush_into(&mut segments);
            pack_words(sentence, max_chars, &mut segments);
        } else if !current.try_push(sentence) {
            current.flush_into(&mut segments);
            current.try_push(sentence);
        }
    }
    current.flush_into(&mut segments);

    segments
}

/// Sentence boundaries are whitespace runs that follow `.`, `!` or `?`.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if ch.is_whitespace() && matches!(prev, Some('.' | '!' | '?')) {
            let mut end_ws = idx + ch.len_utf8();
            while let Some(&(next_idx, next)) = chars.peek() {
                if !next.is_whitespace() {
                    break;
                }
                end_ws = next_idx + next.len_utf8();
                chars.next();
            }
            sentences.push(&text[start..idx]);
            start = end_ws;
            prev = None;
            continue;
        }
        prev = Some(ch);
    }
    sentences.push(&text[start..]);
    sentences
}

fn pack_words(sentence: &str, max_chars: usize, segments: &mut Vec<String>) {
    let mut current = Packer::new(max_chars);
    for word in sentence.split_whitespace() {
        if char_len(word) > max_chars {
            current.flush_into(segments);
            hard_split(word, max_chars, segments);
        } else if !current.try_push(word) {
            current.flush_into(segments);
            current.try_push(word);
        }
    }
    current.flush_into(segments);
}

fn hard_split(word: &str, max_chars: usize, segments: &mut Vec<String>) {
    let chars: Vec<char> = word.chars().collect();
    for piece in chars.chunks(max_chars) {
        segments.push(piece.iter().collect());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Accumulates space-joined pieces up to a character budget.
struct Packer {
    buf: String,
    len: usize,
    max: usize,
}

impl Packer {
    fn new(max: usize) -> Self {
        Self { buf: String::new(), len: 0, max }
    }

    fn try_push(&mut self, piece: &str) -> bool {
        let piece_len = char_len(piece);
        let needed = if self.buf.is_empty() { piece_len } else { self.len + 1 + piece_len };
        if needed > self.max {
            return false;
        }
        if !self.buf.is_empty() {
            self.buf.push(' ');
        }
        self.buf.push_str(piece);
        self.len = needed;
        true
    }

    fn flush_into(&mut self, segments: &mut Vec<String>) {
        if !self.buf.is_empty() {
            segments.push(std::mem::take(&mut self.buf));
        }
        self.len = 0;
    }
}
