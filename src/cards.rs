use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Lowest and highest printed value on a card face.
pub const MIN_STRENGTH: u8 = 1;
pub const MAX_STRENGTH: u8 = 10;

/// Catalog identifier of a card definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub u32);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One of the four faces of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Top, Side::Right, Side::Bottom, Side::Left];

    /// The face that touches this one when two cards sit side by side.
    pub const fn opposite(self) -> Side {
        match self {
            Side::Top => Side::Bottom,
            Side::Right => Side::Left,
            Side::Bottom => Side::Top,
            Side::Left => Side::Right,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CardError {
    #[error("strength {value} on {side:?} side is outside 1..=10")]
    StrengthOutOfRange { side: Side, value: u8 },
    #[error("invalid element: '{0}'")]
    InvalidElement(String),
}

/// The four directional strengths printed on a card.
///
/// ```
/// use triad_rs::cards::{Side, Strengths};
///
/// let s = Strengths::new(1, 4, 1, 5).unwrap();
/// assert_eq!(s.get(Side::Right), 4);
/// assert!(Strengths::new(0, 4, 1, 5).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Strengths {
    top: u8,
    right: u8,
    bottom: u8,
    left: u8,
}

impl Strengths {
    pub fn new(top: u8, right: u8, bottom: u8, left: u8) -> Result<Self, CardError> {
        let s = Self { top, right, bottom, left };
        s.validate()?;
        Ok(s)
    }

    pub const fn get(self, side: Side) -> u8 {
        match side {
            Side::Top => self.top,
            Side::Right => self.right,
            Side::Bottom => self.bottom,
            Side::Left => self.left,
        }
    }

    pub const fn top(self) -> u8 {
        self.top
    }
    pub const fn right(self) -> u8 {
        self.right
    }
    pub const fn bottom(self) -> u8 {
        self.bottom
    }
    pub const fn left(self) -> u8 {
        self.left
    }

    fn validate(self) -> Result<(), CardError> {
        for side in Side::ALL {
            let value = self.get(side);
            if !(MIN_STRENGTH..=MAX_STRENGTH).contains(&value) {
                return Err(CardError::StrengthOutOfRange { side, value });
            }
        }
        Ok(())
    }
}

/// Elemental affinity of a card. Carried as catalog data; no rule reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    #[default]
    None,
    Fire,
    Ice,
    Thunder,
    Earth,
    Poison,
    Wind,
    Water,
    Holy,
}

impl Element {
    pub const ALL: [Element; 9] = [
        Element::None,
        Element::Fire,
        Element::Ice,
        Element::Thunder,
        Element::Earth,
        Element::Poison,
        Element::Wind,
        Element::Water,
        Element::Holy,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Element::None => "none",
            Element::Fire => "fire",
            Element::Ice => "ice",
            Element::Thunder => "thunder",
            Element::Earth => "earth",
            Element::Poison => "poison",
            Element::Wind => "wind",
            Element::Water => "water",
            Element::Holy => "holy",
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Element {
    type Err = CardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim().to_ascii_lowercase();
        Element::ALL
            .into_iter()
            .find(|e| e.as_str() == t)
            .ok_or_else(|| CardError::InvalidElement(s.to_string()))
    }
}

/// An immutable card definition owned by the catalog.
///
/// ```
/// use triad_rs::cards::{Card, CardId, Element, Strengths};
///
/// let strengths = Strengths::new(1, 4, 1, 5).unwrap();
/// let geezard = Card::new(CardId(1), "Geezard", strengths, Element::None, 1);
/// assert_eq!(geezard.to_string(), "Geezard [1 4 1 5]");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub name: String,
    #[serde(flatten)]
    pub strengths: Strengths,
    #[serde(default)]
    pub element: Element,
    pub level: u8,
}

impl Card {
    pub fn new(
        id: CardId,
        name: impl Into<String>,
        strengths: Strengths,
        element: Element,
        level: u8,
    ) -> Self {
        Self { id, name: name.into(), strengths, element, level }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.strengths;
        write!(f, "{} [{} {} {} {}]", self.name, s.top, s.right, s.bottom, s.left)
    }
}

/// Read-only card lookup the engine consumes.
pub trait CardCatalog: Send + Sync {
    fn all_cards(&self) -> &[Card];
    fn card_by_id(&self, id: CardId) -> Option<&Card>;
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("duplicate card id {0}")]
    DuplicateId(CardId),
    #[error("card {id}: {source}")]
    InvalidCard { id: CardId, source: CardError },
    #[error("catalog parse error: {0}")]
    Parse(String),
}

/// In-memory catalog, loaded once and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    cards: Vec<Card>,
    index: HashMap<CardId, usize>,
}

impl Catalog {
    pub fn from_cards(cards: Vec<Card>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(cards.len());
        for (i, card) in cards.iter().enumerate() {
            card.strengths
                .validate()
                .map_err(|source| CatalogError::InvalidCard { id: card.id, source })?;
            if index.insert(card.id, i).is_some() {
                return Err(CatalogError::DuplicateId(card.id));
            }
        }
        Ok(Self { cards, index })
    }

    /// Parse a JSON array of cards.
    ///
    /// ```
    /// use triad_rs::cards::{CardCatalog, CardId, Catalog, Element};
    ///
    /// let json = r#"[{"id": 7, "name": "Gayla", "top": 2, "right": 1, "bottom": 4, "left": 4,
    ///                 "element": "thunder", "level": 1}]"#;
    /// let catalog = Catalog::from_json(json).unwrap();
    /// assert_eq!(catalog.card_by_id(CardId(7)).unwrap().element, Element::Thunder);
    /// ```
    pub fn from_json(input: &str) -> Result<Self, CatalogError> {
        let cards: Vec<Card> =
            serde_json::from_str(input).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::from_cards(cards)
    }

    /// A small built-in set of level 1 and 2 cards.
    pub fn starter() -> Self {
        const STARTER: [(u32, &str, [u8; 4], Element, u8); 20] = [
            (1, "Geezard", [1, 4, 1, 5], Element::None, 1),
            (2, "Funguar", [5, 1, 1, 3], Element::None, 1),
            (3, "Bite Bug", [1, 3, 3, 5], Element::None, 1),
            (4, "Red Bat", [6, 1, 1, 2], Element::None, 1),
            (5, "Blobra", [2, 3, 1, 5], Element::None, 1),
            (6, "Gayla", [2, 1, 4, 4], Element::Thunder, 1),
            (7, "Gesper", [1, 5, 4, 1], Element::None, 1),
            (8, "Fastitocalon-F", [3, 5, 2, 1], Element::Earth, 1),
            (9, "Blood Soul", [2, 1, 6, 1], Element::None, 1),
            (10, "Caterchipillar", [4, 2, 4, 3], Element::None, 1),
            (11, "Grat", [7, 1, 3, 1], Element::None, 2),
            (12, "Buel", [6, 2, 2, 3], Element::None, 2),
            (13, "Mesmerize", [5, 3, 3, 4], Element::None, 2),
            (14, "Glacial Eye", [6, 1, 4, 3], Element::Ice, 2),
            (15, "Belhelmel", [3, 4, 5, 3], Element::None, 2),
            (16, "Thrustaevis", [5, 3, 2, 5], Element::Wind, 2),
            (17, "Anacondaur", [5, 1, 3, 5], Element::Poison, 2),
            (18, "Creeps", [5, 2, 5, 2], Element::Thunder, 2),
            (19, "Grendel", [4, 4, 5, 2], Element::Thunder, 2),
            (20, "Jelleye", [3, 7, 2, 1], Element::None, 2),
        ];
        let cards = STARTER
            .iter()
            .map(|&(id, name, [top, right, bottom, left], element, level)| Card {
                id: CardId(id),
                name: name.to_string(),
                strengths: Strengths { top, right, bottom, left },
                element,
                level,
            })
            .collect::<Vec<_>>();
        let index = cards.iter().enumerate().map(|(i, c)| (c.id, i)).collect();
        Self { cards, index }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl CardCatalog for Catalog {
    fn all_cards(&self) -> &[Card] {
        &self.cards
    }

    fn card_by_id(&self, id: CardId) -> Option<&Card> {
        self.index.get(&id).map(|&i| &self.cards[i])
    }
}
