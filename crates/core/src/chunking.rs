use crate::error::IngestError;
use crate::extractor::PageText;
use crate::models::{ChunkStrategy, IngestionOptions, PageChunk};
use regex::Regex;

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    /// Fixed-window size in words.
    pub chunk_size: usize,
    /// Words shared between consecutive fixed windows.
    pub overlap: usize,
    /// Upper bound in words for a semantic chunk.
    pub max_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            overlap: 50,
            max_chunk_size: 512,
        }
    }
}

impl From<&IngestionOptions> for ChunkingConfig {
    fn from(value: &IngestionOptions) -> Self {
        Self {
            chunk_size: value.chunk_size,
            overlap: value.overlap,
            max_chunk_size: value.max_chunk_size,
        }
    }
}

impl ChunkingConfig {
    /// Windows must advance by `chunk_size - overlap` words, so an
    /// overlap at or above the window size would never terminate.
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk_size must be positive".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {} must be smaller than chunk_size {}",
                self.overlap, self.chunk_size
            )));
        }
        if self.max_chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "max_chunk_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Drop control characters, keeping line breaks so paragraph boundaries
/// survive for the semantic strategy. Non-breaking spaces become plain
/// spaces.
pub fn clean_text(text: &str) -> String {
    text.chars()
        .map(|c| if c == '\u{a0}' { ' ' } else { c })
        .filter(|c| !c.is_control() || *c == '\n')
        .collect()
}

/// Overlapping fixed-size word windows over one page. Consecutive
/// windows share exactly `overlap` words; the cursor advances by
/// `chunk_size - overlap` each step so the walk always terminates.
pub fn chunk_fixed_window(
    document_id: &str,
    page: &PageText,
    config: ChunkingConfig,
) -> Result<Vec<PageChunk>, IngestError> {
    config.validate()?;

    let cleaned = clean_text(&page.text);
    let words: Vec<&str> = cleaned.split_whitespace().collect();
    let mut chunks = Vec::new();

    let mut start = 0;
    while start < words.len() {
        let end = (start + config.chunk_size).min(words.len());
        let text = words[start..end].join(" ");
        if !text.is_empty() {
            chunks.push(PageChunk {
                document_id: document_id.to_string(),
                page: page.number,
                text,
            });
        }
        if end == words.len() {
            break;
        }
        start += config.chunk_size - config.overlap;
    }

    Ok(chunks)
}

/// Paragraph-preserving chunks over one page: split on blank lines,
/// then greedily pack whole paragraphs until the next one would push
/// the chunk past `max_chunk_size` words. Paragraphs inside a chunk
/// stay separated by a blank line.
pub fn chunk_semantic(
    document_id: &str,
    page: &PageText,
    config: ChunkingConfig,
) -> Result<Vec<PageChunk>, IngestError> {
    config.validate()?;

    let paragraph_boundary = Regex::new(r"\n\s*\n")?;
    let cleaned = clean_text(&page.text);

    let paragraphs: Vec<String> = paragraph_boundary
        .split(&cleaned)
        .map(|paragraph| paragraph.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|paragraph| !paragraph.is_empty())
        .collect();

    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_words = 0;

    let flush = |buffer: &mut Vec<String>, chunks: &mut Vec<PageChunk>| {
        if !buffer.is_empty() {
            chunks.push(PageChunk {
                document_id: document_id.to_string(),
                page: page.number,
                text: buffer.join("\n\n"),
            });
            buffer.clear();
        }
    };

    for paragraph in paragraphs {
        let words = paragraph.split_whitespace().count();
        if !current.is_empty() && current_words + words > config.max_chunk_size {
            flush(&mut current, &mut chunks);
            current_words = 0;
        }
        current_words += words;
        current.push(paragraph);
    }
    flush(&mut current, &mut chunks);

    Ok(chunks)
}

/// Chunk every page with the requested strategy. Chunks never cross a
/// page boundary; each carries the page it came from.
pub fn chunk_pages(
    document_id: &str,
    pages: &[PageText],
    strategy: ChunkStrategy,
    config: ChunkingConfig,
) -> Result<Vec<PageChunk>, IngestError> {
    let mut chunks = Vec::new();
    for page in pages {
        let page_chunks = match strategy {
            ChunkStrategy::FixedWindow => chunk_fixed_window(document_id, page, config)?,
            ChunkStrategy::Semantic => chunk_semantic(document_id, page, config)?,
        };
        chunks.extend(page_chunks);
    }
    Ok(chunks)
}
