use sha2::{Digest, Sha256};

/// Hex characters kept from the digest in cache keys.
const FINGERPRINT_HEX_LEN: usize = 32;

/// Truncated hex SHA-256 over `parts`, separated by NUL so that
/// `["ab", "c"]` and `["a", "bc"]` differ.
pub fn stable_digest(parts: &[&str], hex_len: usize) -> String {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update([0u8]);
        }
        hasher.update(part.as_bytes());
    }
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(hex_len.min(digest.len()));
    digest
}

/// Lowercase and collapse runs of whitespace.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cache key for the prompts of one issue against one draft state.
///
/// When the issue's excerpt can be located, only the paragraph that contains
/// it contributes to the key, so edits elsewhere in the essay keep hitting the
/// same entry. Otherwise the whole normalized draft is hashed.
pub fn prompt_fingerprint(issue_id: &str, excerpt: &str, draft_text: &str) -> String {
    let needle = normalize_text(excerpt);
    let scoped = if needle.is_empty() {
        None
    } else {
        paragraphs(draft_text)
            .map(normalize_text)
            .find(|p| p.contains(&needle))
    };

    let digest = match scoped {
        Some(paragraph) => stable_digest(&[issue_id, "paragraph", &paragraph], FINGERPRINT_HEX_LEN),
        None => stable_digest(
            &[issue_id, "draft", &normalize_text(draft_text)],
            FINGERPRINT_HEX_LEN,
        ),
    };

    format!("{}:{}", issue_id, digest)
}

fn paragraphs(text: &str) -> impl Iterator<Item = &str> {
    text.split("\n\n")
        .flat_map(|block| block.split("\r\n\r\n"))
        .filter(|p| !p.trim().is_empty())
}
