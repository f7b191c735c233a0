use chrono::{DateTime, Duration, Utc};

/// Badge shown on cards that never reached storage.
pub const LOCAL_ONLY_BADGE: &str = "Local Only";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardOrigin {
    /// Listed by the gallery server.
    Server,
    /// Found by probing storage URLs directly.
    DirectStorage,
    /// A preview held only in memory after a failed upload.
    LocalOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub name: String,
    pub url: String,
    pub origin: CardOrigin,
    pub hidden: bool,
}

impl Card {
    pub fn new(name: impl Into<String>, url: impl Into<String>, origin: CardOrigin) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            origin,
            hidden: false,
        }
    }

    pub fn is_local_only(&self) -> bool {
        self.origin == CardOrigin::LocalOnly
    }

    pub fn badge(&self) -> Option<&'static str> {
        self.is_local_only().then_some(LOCAL_ONLY_BADGE)
    }
}

/// The cards currently rendered, in resolution order.
#[derive(Debug, Clone)]
pub struct GalleryViewState {
    cards: Vec<Card>,
    column_count: usize,
    refreshed_at: Option<DateTime<Utc>>,
}

impl GalleryViewState {
    pub const DEFAULT_COLUMNS: usize = 3;

    pub fn new(column_count: usize) -> Self {
        Self {
            cards: Vec::new(),
            column_count: column_count.max(1),
            refreshed_at: None,
        }
    }

    /// Rebuilds the view from a fresh listing.
    pub fn replace(&mut self, cards: Vec<Card>, now: DateTime<Utc>) {
        self.cards = cards;
        self.refreshed_at = Some(now);
    }

    pub fn clear(&mut self) {
        self.cards.clear();
        self.refreshed_at = None;
    }

    /// Shows a single unpersisted preview in place of everything else.
    pub fn show_local_only(&mut self, name: impl Into<String>, data_url: impl Into<String>) {
        self.clear();
        self.cards
            .push(Card::new(name, data_url, CardOrigin::LocalOnly));
    }

    /// Flags a card whose image failed to load. The card keeps its slot.
    pub fn hide(&mut self, index: usize) -> bool {
        match self.cards.get_mut(index) {
            Some(card) => {
                card.hidden = true;
                true
            }
            None => false,
        }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn card(&self, index: usize) -> Option<&Card> {
        self.cards.get(index)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.cards.iter().position(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// Cards distributed round-robin: card `i` lands in column `i % column_count`.
    pub fn columns(&self) -> Vec<Vec<&Card>> {
        let mut columns = vec![Vec::new(); self.column_count];
        for (i, card) in self.cards.iter().enumerate() {
            columns[i % self.column_count].push(card);
        }
        columns
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    /// True when the view was never loaded from storage or its URLs may have expired.
    pub fn is_stale(&self, now: DateTime<Utc>, url_ttl: Duration) -> bool {
        match self.refreshed_at {
            Some(at) => now - at >= url_ttl,
            None => true,
        }
    }
}

impl Default for GalleryViewState {
    fn default() -> Self {
        Self::new(Self::DEFAULT_COLUMNS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cards(n: usize) -> Vec<Card> {
        (0..n)
            .map(|i| Card::new(format!("{i}.png"), format!("/files/{i}.png"), CardOrigin::Server))
            .collect()
    }

    #[test]
    fn columns_are_filled_round_robin() {
        let mut view = GalleryViewState::new(3);
        view.replace(cards(7), Utc::now());

        let names: Vec<Vec<&str>> = view
            .columns()
            .iter()
            .map(|col| col.iter().map(|c| c.name.as_str()).collect())
            .collect();
        assert_eq!(
            names,
            vec![
                vec!["0.png", "3.png", "6.png"],
                vec!["1.png", "4.png"],
                vec!["2.png", "5.png"],
            ]
        );
    }

    #[test]
    fn replace_discards_previous_cards() {
        let mut view = GalleryViewState::default();
        view.replace(cards(5), Utc::now());
        view.replace(cards(2), Utc::now());
        assert_eq!(view.len(), 2);
    }

    #[test]
    fn local_only_preview_replaces_view() {
        let mut view = GalleryViewState::default();
        view.replace(cards(4), Utc::now());
        view.show_local_only("photo.png", "data:image/png;base64,cG5n");

        assert_eq!(view.len(), 1);
        let columns = view.columns();
        let card = columns[0][0];
        assert!(card.is_local_only());
        assert_eq!(card.badge(), Some("Local Only"));
    }

    #[test]
    fn hidden_cards_keep_their_slot() {
        let mut view = GalleryViewState::default();
        view.replace(cards(3), Utc::now());

        assert!(view.hide(1));
        assert!(!view.hide(9));
        assert_eq!(view.len(), 3);
        assert!(view.cards()[1].hidden);
        assert_eq!(view.columns()[1][0].name, "1.png");
    }

    #[test]
    fn staleness_follows_url_lifetime() {
        let mut view = GalleryViewState::default();
        let ttl = Duration::seconds(3600);
        let loaded = Utc::now();
        assert!(view.is_stale(loaded, ttl));

        view.replace(cards(1), loaded);
        assert!(!view.is_stale(loaded + Duration::seconds(3599), ttl));
        assert!(view.is_stale(loaded + Duration::seconds(3600), ttl));

        view.clear();
        assert!(view.is_stale(loaded, ttl));
    }

    #[test]
    fn zero_columns_falls_back_to_one() {
        let mut view = GalleryViewState::new(0);
        view.replace(cards(2), Utc::now());
        assert_eq!(view.columns().len(), 1);
    }
}
