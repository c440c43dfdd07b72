/// Dimension every vector written to the index must have.
pub const EMBEDDING_DIMENSIONS: usize = 384;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

pub trait Embedder {
    fn dimensions(&self) -> usize;
    fn embed(&self, text: &str) -> Vec<f32>;
}

/// Feature-hashing embedder over character n-grams of each word.
///
/// Words are lower-cased and padded with a space on both sides, so `"fat"`
/// and the `"fat"` inside `"saturated"` land in different buckets. One hash
/// bit picks the sign, which keeps bucket collisions from only ever adding
/// up. Output is L2-normalized; text without letters or digits maps to the
/// zero vector.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
    pub ngram: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: EMBEDDING_DIMENSIONS,
            ngram: 3,
        }
    }
}

impl CharacterNgramEmbedder {
    fn accumulate(&self, word: &str, vector: &mut [f32]) {
        let padded: Vec<char> = std::iter::once(' ')
            .chain(word.chars().flat_map(char::to_lowercase))
            .chain(std::iter::once(' '))
            .collect();
        let width = self.ngram.clamp(1, padded.len());

        for gram in padded.windows(width) {
            let hash = fnv1a(gram);
            let bucket = (hash % vector.len() as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
    }
}

impl Embedder for CharacterNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];

        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
        {
            self.accumulate(word, &mut vector);
        }

        let norm = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|value| *value /= norm);
        }
        vector
    }
}

fn fnv1a(gram: &[char]) -> u64 {
    let mut buffer = [0u8; 4];
    gram.iter().fold(FNV_OFFSET, |hash, ch| {
        ch.encode_utf8(&mut buffer)
            .bytes()
            .fold(hash, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(left: &[f32], right: &[f32]) -> f32 {
        left.iter().zip(right).map(|(a, b)| a * b).sum()
    }

    #[test]
    fn embedder_is_deterministic_and_case_insensitive() {
        let embedder = CharacterNgramEmbedder::default();
        let first = embedder.embed("Whole grains and fiber intake");
        let second = embedder.embed("whole GRAINS and fiber intake");
        assert_eq!(first, second);
    }

    #[test]
    fn default_embedder_matches_index_dimension() {
        let embedder = CharacterNgramEmbedder::default();
        assert_eq!(embedder.dimensions(), EMBEDDING_DIMENSIONS);
        let vector = embedder.embed("vitamin D");
        assert_eq!(vector.len(), 384);
        assert!((cosine(&vector, &vector) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn related_texts_are_closer_than_unrelated_ones() {
        let embedder = CharacterNgramEmbedder::default();
        let fiber = embedder.embed("dietary fiber intake");
        let fibre = embedder.embed("dietary fibre intakes");
        let sodium = embedder.embed("sodium restriction trial");
        assert!(cosine(&fiber, &fibre) > cosine(&fiber, &sodium));
    }

    #[test]
    fn punctuation_only_text_yields_zero_vector_of_full_length() {
        let embedder = CharacterNgramEmbedder {
            dimensions: 32,
            ngram: 3,
        };
        let vector = embedder.embed(" -- ... ");
        assert_eq!(vector.len(), 32);
        assert!(vector.iter().all(|value| *value == 0.0));
    }

    #[test]
    fn short_words_still_contribute() {
        let embedder = CharacterNgramEmbedder::default();
        assert!(embedder.embed("a").iter().any(|value| *value != 0.0));
    }
}
