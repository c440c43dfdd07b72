use crate::models::IngestionOptions;

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl From<&IngestionOptions> for ChunkingConfig {
    fn from(value: &IngestionOptions) -> Self {
        Self {
            max_chars: value.chunk_max_chars,
            overlap_chars: value.chunk_overlap_chars,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self::from(&IngestionOptions::default())
    }
}

pub fn normalize_whitespace(text: &str) -> String {
    text.replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits after `.`, `!` or `?` when followed by whitespace.
pub fn split_sentences(normalized: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = normalized.chars().peekable();

    while let Some(ch) = chars.next() {
        current.push(ch);
        let at_boundary = matches!(ch, '.' | '!' | '?')
            && chars.peek().map_or(true, |next| next.is_whitespace());
        if at_boundary {
            let sentence = current.trim().to_string();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            current.clear();
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }

    sentences
}

/// Packs whole sentences into chunks of at most `max_chars` characters.
///
/// A sentence longer than `max_chars` is cut into windows that overlap by
/// `overlap_chars`. Non-blank input always yields at least one chunk.
pub fn chunk_text(text: &str, config: ChunkingConfig) -> Vec<String> {
    let normalized = normalize_whitespace(text);
    if normalized.is_empty() {
        return Vec::new();
    }

    let max_chars = config.max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in split_sentences(&normalized) {
        let sentence_len = sentence.chars().count();

        if sentence_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            chunks.extend(split_oversized(&sentence, max_chars, config.overlap_chars));
            continue;
        }

        if current.is_empty() {
            current = sentence;
        } else if current.chars().count() + 1 + sentence_len <= max_chars {
            current.push(' ');
            current.push_str(&sentence);
        } else {
            chunks.push(std::mem::replace(&mut current, sentence));
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

fn split_oversized(sentence: &str, max_chars: usize, overlap_chars: usize) -> Vec<String> {
    let chars: Vec<char> = sentence.chars().collect();
    let step = max_chars.saturating_sub(overlap_chars).max(1);
    let mut pieces = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + max_chars).min(chars.len());
        let piece: String = chars[start..end].iter().collect();
        pieces.push(piece.trim().to_string());
        if end == chars.len() {
            break;
        }
        start = start.saturating_add(step);
    }

    pieces.retain(|piece| !piece.is_empty());
    pieces
}
