// Keyword-driven chat assistant: an ordered topic table plus preference
// extraction from free text.

use crate::draft::Draft;
use crate::locale::TextProvider;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use tracing::debug;

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(\d{1,2}(st|nd|rd|th)?\s+(of\s+)?(january|february|march|april|may|june|july|august|september|october|november|december)|(\d{1,2})[/.-](\d{1,2})[/.-](\d{2,4}))",
    )
    .expect("valid date pattern")
});

static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*(days|day|weeks|week)").expect("valid duration pattern"));

static PEOPLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*(people|persons|person|travelers|travellers|guests)")
        .expect("valid people pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Wine,
    Biking,
    Accommodation,
    Dining,
    Activities,
    Budget,
    Itinerary,
}

impl Topic {
    pub fn response_key(&self) -> &'static str {
        match self {
            Topic::Wine => "assistant.wine",
            Topic::Biking => "assistant.biking",
            Topic::Accommodation => "assistant.accommodation",
            Topic::Dining => "assistant.dining",
            Topic::Activities => "assistant.activities",
            Topic::Budget => "assistant.budget",
            Topic::Itinerary => "assistant.itinerary",
        }
    }
}

/// Maps free text to a topic.
pub trait Classifier: Send + Sync {
    fn classify(&self, input: &str) -> Option<Topic>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordRule {
    pub topic: Topic,
    pub keywords: &'static [&'static str],
}

/// Storefront topics in match order. Keywords are plain substrings, so
/// "do" also hits "download"; earlier rules shadow later ones.
pub const STOREFRONT_RULES: &[KeywordRule] = &[
    KeywordRule {
        topic: Topic::Wine,
        keywords: &["wine", "vineyard", "winery"],
    },
    KeywordRule {
        topic: Topic::Biking,
        keywords: &["bike", "cycling", "bicycle"],
    },
    KeywordRule {
        topic: Topic::Accommodation,
        keywords: &["hotel", "stay", "accommodation"],
    },
    KeywordRule {
        topic: Topic::Dining,
        keywords: &["restaurant", "eat", "food", "dining"],
    },
    KeywordRule {
        topic: Topic::Activities,
        keywords: &["activity", "do", "see", "visit"],
    },
    KeywordRule {
        topic: Topic::Budget,
        keywords: &["cost", "price", "budget", "expensive"],
    },
    KeywordRule {
        topic: Topic::Itinerary,
        keywords: &["itinerary", "plan", "schedule"],
    },
];

/// First-match substring classifier over an ordered rule table.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    rules: Vec<KeywordRule>,
}

impl KeywordClassifier {
    pub fn new(rules: Vec<KeywordRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(STOREFRONT_RULES.to_vec())
    }
}

impl Classifier for KeywordClassifier {
    fn classify(&self, input: &str) -> Option<Topic> {
        let lower = input.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| lower.contains(k)))
            .map(|rule| rule.topic)
    }
}

const INTEREST_KEYWORDS: &[(&str, &[&str])] = &[
    ("wine", &["wine", "vineyard", "winery", "tasting"]),
    ("biking", &["bike", "biking", "cycling", "bicycle"]),
    ("hiking", &["hike", "hiking", "walk", "walking", "trail"]),
    ("culture", &["culture", "history", "museum", "castle", "abbey"]),
    ("food", &["food", "culinary", "restaurant", "dining", "gastronomy"]),
    ("relaxation", &["relax", "relaxation", "spa", "wellness", "peaceful"]),
];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// What the assistant has learned about the trip so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatPreferences {
    pub dates: Option<String>,
    pub duration: Option<String>,
    pub people: Option<String>,
    pub interests: Vec<String>,
    pub budget: Option<String>,
    pub accommodation: Option<String>,
}

impl ChatPreferences {
    /// Updates preferences from one message. Later mentions overwrite earlier ones;
    /// interests accumulate.
    pub fn absorb(&mut self, input: &str) {
        let lower = input.to_lowercase();

        if contains_any(&lower, &["date", "when", "time"]) {
            if let Some(m) = DATE_RE.find(input) {
                self.dates = Some(m.as_str().to_string());
            }
        }

        if contains_any(&lower, &["day", "week", "duration", "long"]) {
            if let Some(m) = DURATION_RE.find(input) {
                self.duration = Some(m.as_str().to_string());
            }
        }

        if contains_any(&lower, &["people", "person", "traveler", "traveller", "guest"]) {
            if let Some(caps) = PEOPLE_RE.captures(input) {
                self.people = Some(caps[1].to_string());
            }
        }

        for (interest, keywords) in INTEREST_KEYWORDS {
            if contains_any(&lower, keywords) && !self.interests.iter().any(|i| i == *interest) {
                self.interests.push(interest.to_string());
            }
        }

        if contains_any(&lower, &["budget", "cost", "price", "expensive", "cheap"]) {
            if contains_any(&lower, &["luxury", "high-end", "expensive"]) {
                self.budget = Some("luxury".to_string());
            } else if contains_any(&lower, &["moderate", "mid-range", "average"]) {
                self.budget = Some("moderate".to_string());
            } else if contains_any(&lower, &["budget", "cheap", "affordable", "inexpensive"]) {
                self.budget = Some("budget".to_string());
            }
        }

        if contains_any(&lower, &["accommodation", "hotel", "stay", "room"]) {
            if lower.contains("hotel") {
                self.accommodation = Some("hotel".to_string());
            } else if contains_any(&lower, &["guesthouse", "guest house", "pension"]) {
                self.accommodation = Some("guesthouse".to_string());
            } else if contains_any(&lower, &["apartment", "flat"]) {
                self.accommodation = Some("apartment".to_string());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.captured() == 0
    }

    /// Number of preference slots holding a value.
    pub fn captured(&self) -> usize {
        [
            self.dates.is_some(),
            self.duration.is_some(),
            self.people.is_some(),
            !self.interests.is_empty(),
            self.budget.is_some(),
            self.accommodation.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }

    /// Planner draft prefilled with what the conversation revealed.
    pub fn to_draft(&self) -> Draft {
        let mut draft = Draft::new();
        let text_fields = [
            ("dates", &self.dates),
            ("duration", &self.duration),
            ("people", &self.people),
            ("budget", &self.budget),
            ("accommodation", &self.accommodation),
        ];
        for (name, value) in text_fields {
            if let Some(value) = value {
                draft.set(name, value.as_str());
            }
        }
        for interest in &self.interests {
            draft.toggle("interests", interest, true);
        }
        draft
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

pub struct ChatAssistant<C: Classifier = KeywordClassifier> {
    classifier: C,
    text: Arc<dyn TextProvider>,
    messages: Vec<ChatMessage>,
    preferences: ChatPreferences,
}

impl ChatAssistant<KeywordClassifier> {
    pub fn storefront(text: Arc<dyn TextProvider>) -> Self {
        Self::new(KeywordClassifier::default(), text)
    }
}

impl<C: Classifier> ChatAssistant<C> {
    /// Starts a conversation with the greeting already posted.
    pub fn new(classifier: C, text: Arc<dyn TextProvider>) -> Self {
        let greeting = ChatMessage {
            role: Role::Assistant,
            content: text.text("assistant.greeting"),
        };
        Self {
            classifier,
            text,
            messages: vec![greeting],
            preferences: ChatPreferences::default(),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn preferences(&self) -> &ChatPreferences {
        &self.preferences
    }

    /// Posts a user message and returns the reply. Blank input is ignored.
    pub fn send(&mut self, input: &str) -> Option<&str> {
        if input.trim().is_empty() {
            return None;
        }

        self.messages.push(ChatMessage {
            role: Role::User,
            content: input.to_string(),
        });
        self.preferences.absorb(input);

        let topic = self.classifier.classify(input);
        debug!(?topic, captured = self.preferences.captured(), "chat message classified");

        let reply = self.reply(topic);
        self.messages.push(ChatMessage {
            role: Role::Assistant,
            content: reply,
        });
        self.messages.last().map(|m| m.content.as_str())
    }

    fn reply(&self, topic: Option<Topic>) -> String {
        match topic {
            Some(Topic::Itinerary) => self.itinerary_reply(),
            Some(topic) => self.text.text(topic.response_key()),
            None if !self.preferences.is_empty() => self.summary(),
            None => self.text.text("assistant.default"),
        }
    }

    fn itinerary_reply(&self) -> String {
        let prefs = &self.preferences;
        if prefs.duration.is_none() && prefs.interests.is_empty() {
            return self.text.text(Topic::Itinerary.response_key());
        }

        let duration = prefs
            .duration
            .clone()
            .unwrap_or_else(|| self.text.text("assistant.defaultDuration"));
        let interests = if prefs.interests.is_empty() {
            self.text.text("assistant.defaultInterests")
        } else {
            prefs.interests.join(", ")
        };

        self.text.text_with(
            "assistant.itineraryPersonal",
            &[("duration", duration.as_str()), ("interests", interests.as_str())],
        )
    }

    fn summary(&self) -> String {
        let prefs = &self.preferences;
        let interests = prefs.interests.join(", ");
        let lines = [
            ("assistant.summary.dates", prefs.dates.as_deref()),
            ("assistant.summary.duration", prefs.duration.as_deref()),
            ("assistant.summary.people", prefs.people.as_deref()),
            (
                "assistant.summary.interests",
                (!interests.is_empty()).then_some(interests.as_str()),
            ),
            ("assistant.summary.budget", prefs.budget.as_deref()),
            ("assistant.summary.accommodation", prefs.accommodation.as_deref()),
        ];

        let mut summary = self.text.text("assistant.summaryIntro");
        for (key, value) in lines {
            if let Some(value) = value {
                summary.push_str("\n- ");
                summary.push_str(&self.text.text_with(key, &[("value", value)]));
            }
        }
        summary.push_str("\n\n");
        summary.push_str(&self.text.text("assistant.summaryOutro"));
        summary
    }
}
