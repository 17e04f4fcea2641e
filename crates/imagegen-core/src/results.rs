//! Newest-first list of generated images and its gallery projection.

use crate::image::GeneratedImage;

/// A stored result with a stable identifier for caching rendered textures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEntry {
    pub id: u64,
    pub image: GeneratedImage,
}

/// Generated images ordered newest first. Entries are only ever added.
#[derive(Debug, Clone, Default)]
pub struct ResultsList {
    entries: Vec<ResultEntry>,
    next_id: u64,
}

impl ResultsList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new result at the front and return its id.
    pub fn prepend(&mut self, image: GeneratedImage) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(0, ResultEntry { id, image });
        id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first(&self) -> Option<&ResultEntry> {
        self.entries.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResultEntry> {
        self.entries.iter()
    }
}

/// What the gallery shows for one result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryItem {
    pub id: u64,
    pub src: String,
    pub caption: String,
}

/// Project the results into gallery items, preserving stored order.
pub fn gallery_items(results: &ResultsList) -> Vec<GalleryItem> {
    results
        .iter()
        .map(|entry| GalleryItem {
            id: entry.id,
            src: entry.image.source.src(),
            caption: entry.image.prompt.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepend_puts_newest_first() {
        let mut results = ResultsList::new();
        results.prepend(GeneratedImage::remote("http://x/1.png", "first"));
        results.prepend(GeneratedImage::inline("AAA=", "second"));

        assert_eq!(results.len(), 2);
        let captions: Vec<_> = results.iter().map(|e| e.image.prompt.as_str()).collect();
        assert_eq!(captions, vec!["second", "first"]);
    }

    #[test]
    fn ids_stay_unique_across_prepends() {
        let mut results = ResultsList::new();
        let a = results.prepend(GeneratedImage::remote("http://x/1.png", "a"));
        let b = results.prepend(GeneratedImage::remote("http://x/2.png", "b"));
        assert_ne!(a, b);
        assert_eq!(results.first().map(|e| e.id), Some(b));
    }

    #[test]
    fn empty_results_render_nothing() {
        assert!(gallery_items(&ResultsList::new()).is_empty());
    }

    #[test]
    fn gallery_items_use_source_fallback() {
        let mut results = ResultsList::new();
        results.prepend(GeneratedImage::remote("http://x/img.png", "remote one"));
        results.prepend(GeneratedImage::inline("AAA=", "inline one"));

        let items = gallery_items(&results);
        assert_eq!(items[0].src, "data:image/png;base64,AAA=");
        assert_eq!(items[0].caption, "inline one");
        assert_eq!(items[1].src, "http://x/img.png");
        assert_eq!(items[1].caption, "remote one");
    }
}
