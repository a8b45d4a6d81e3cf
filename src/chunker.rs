/// Splits text into overlapping chunks using a sliding window over characters.
///
/// - `chunk_size`: maximum number of characters per chunk
/// - `overlap`: number of characters shared between adjacent chunks
///
/// Sizes count `char`s, so multi-byte text is never split inside a character.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.is_empty() || chunk_size == 0 {
        return vec![];
    }

    let chars: Vec<char> = text.chars().collect();

    if chars.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let step = if overlap >= chunk_size {
        1 // Prevent infinite loop if overlap >= chunk_size
    } else {
        chunk_size - overlap
    };

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());

        if end == chars.len() {
            break;
        }

        start += step;
    }

    chunks
}
