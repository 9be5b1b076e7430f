//! The word catalog: secret words by language and difficulty.
//!
//! A catalog is a two-level map `language → difficulty → words`. Lookups
//! that name a missing language or difficulty fall back to the first
//! available one (keys are ordered), so a stale client config can never
//! stall a game.

use std::collections::{BTreeMap, HashSet};

use rand::seq::IndexedRandom;

use crate::RoomError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordCatalog {
    sets: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl WordCatalog {
    /// Builds a catalog, rejecting empty ones.
    ///
    /// Empty word lists are dropped, then empty languages.
    ///
    /// # Errors
    /// [`RoomError::InvalidWordCatalog`] if no words remain.
    pub fn new(sets: BTreeMap<String, BTreeMap<String, Vec<String>>>) -> Result<Self, RoomError> {
        let mut cleaned = BTreeMap::new();
        for (language, difficulties) in sets {
            let mut kept = BTreeMap::new();
            for (difficulty, words) in difficulties {
                let words: Vec<String> = words
                    .iter()
                    .map(|w| w.trim())
                    .filter(|w| !w.is_empty())
                    .map(str::to_string)
                    .collect();
                if !words.is_empty() {
                    kept.insert(difficulty, words);
                }
            }
            if !kept.is_empty() {
                cleaned.insert(language, kept);
            }
        }
        if cleaned.is_empty() {
            return Err(RoomError::InvalidWordCatalog("no words".into()));
        }
        Ok(Self { sets: cleaned })
    }

    /// Parses `{"English": {"Easy": ["Sun", ...]}}`.
    ///
    /// # Errors
    /// [`RoomError::InvalidWordCatalog`] on malformed JSON or an empty catalog.
    pub fn from_json(json: &str) -> Result<Self, RoomError> {
        let sets = serde_json::from_str(json)
            .map_err(|e| RoomError::InvalidWordCatalog(e.to_string()))?;
        Self::new(sets)
    }

    /// The word list used for `language`/`difficulty`, after fallback.
    pub fn words(&self, language: &str, difficulty: &str) -> &[String] {
        let Some(difficulties) = self
            .sets
            .get(language)
            .or_else(|| self.sets.values().next())
        else {
            return &[];
        };
        difficulties
            .get(difficulty)
            .or_else(|| difficulties.values().next())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// A uniformly random word for `language`/`difficulty` that is not in
    /// `used`, recorded there before it is returned.
    ///
    /// Once every word of the list has been used, `used` is cleared and
    /// the whole list is eligible again.
    pub fn pick(
        &self,
        language: &str,
        difficulty: &str,
        used: &mut HashSet<String>,
    ) -> Option<String> {
        let words = self.words(language, difficulty);
        let fresh: Vec<&String> = words.iter().filter(|w| !used.contains(*w)).collect();
        let word = match fresh.choose(&mut rand::rng()) {
            Some(word) => (*word).clone(),
            None => {
                used.clear();
                words.choose(&mut rand::rng())?.clone()
            }
        };
        used.insert(word.clone());
        Some(word)
    }

    /// Languages mapped to their difficulties, for the room-creation UI.
    pub fn metadata(&self) -> BTreeMap<String, Vec<String>> {
        self.sets
            .iter()
            .map(|(language, difficulties)| (language.clone(), difficulties.keys().cloned().collect()))
            .collect()
    }
}

const EASY: &[&str] = &[
    "Sun", "Moon", "Star", "Tree", "Flower", "House", "Car", "Boat", "Plane", "Train", "Bicycle",
    "Apple", "Banana", "Grapes", "Orange", "Cat", "Dog", "Fish", "Bird", "Snake", "Spider",
    "Butterfly", "Bee", "Ant", "Book", "Pen", "Pencil", "Chair", "Table", "Bed", "Sofa", "TV",
    "Computer", "Phone", "Clock", "Watch", "Glasses", "Hat", "Shirt", "Pants", "Shoe", "Sock",
    "Ball", "Bat", "Doll", "Robot", "Kite", "Balloon",
];

const MEDIUM: &[&str] = &[
    "Lion", "Tiger", "Bear", "Elephant", "Giraffe", "Zebra", "Monkey", "Gorilla", "Kangaroo",
    "Koala", "Panda", "Wolf", "Fox", "Rabbit", "Squirrel", "Beaver", "Otter", "Walrus", "Whale",
    "Dolphin", "Shark", "Octopus", "Lobster", "Snail", "Frog", "Turtle", "Crocodile", "Dinosaur",
    "Dragon", "Unicorn", "Pizza", "Burger", "Sandwich", "Taco", "Sushi", "Noodle", "Cheese",
    "Ice Cream", "Cake", "Cookie", "Donut", "Chocolate",
];

const HARD: &[&str] = &[
    "Subway", "Tram", "Motorcycle", "Scooter", "Ferry", "Yacht", "Submarine", "Helicopter",
    "Rocket", "Spaceship", "Parachute", "Hang Glider", "Snowboard", "Surfboard", "Passport",
    "Compass", "Suitcase", "Backpack", "Camera", "Hot Dog", "Burrito",
];

impl Default for WordCatalog {
    /// The built-in English catalog.
    fn default() -> Self {
        let to_vec = |words: &[&str]| words.iter().map(|w| (*w).to_string()).collect::<Vec<_>>();
        let mut english = BTreeMap::new();
        english.insert("Easy".to_string(), to_vec(EASY));
        english.insert("Medium".to_string(), to_vec(MEDIUM));
        english.insert("Hard".to_string(), to_vec(HARD));
        let mut sets = BTreeMap::new();
        sets.insert("English".to_string(), english);
        Self { sets }
    }
}

/// `"Ice Cream"` → `"___ _____"`.
pub fn obfuscate(word: &str) -> String {
    word.chars().map(|c| if c == ' ' { ' ' } else { '_' }).collect()
}
