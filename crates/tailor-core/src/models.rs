use serde::{Deserialize, Serialize};

/// The six free-text fields pulled from a listing card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawField {
    Title,
    Price,
    Rating,
    Colors,
    Size,
    Gender,
}

impl RawField {
    /// Strings the catalog (or an older extractor) uses to mean "no value".
    ///
    /// The first entry is the canonical spelling used when rendering.
    pub fn sentinels(&self) -> &'static [&'static str] {
        match self {
            RawField::Title => &["Unknown Product"],
            RawField::Price => &["Price Unavailable"],
            RawField::Rating => &["Not Rated", "Invalid Rating / 5"],
            RawField::Colors => &["0 Colors"],
            RawField::Size => &["Size: Unknown"],
            RawField::Gender => &["Gender: Unknown"],
        }
    }

    pub fn canonical_sentinel(&self) -> &'static str {
        self.sentinels()[0]
    }
}

/// A scraped text field, or the marker that extraction failed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scraped {
    Text(String),
    Missing,
}

impl Scraped {
    /// Classify scraped text, mapping the field's sentinel strings to `Missing`.
    pub fn classify(field: RawField, text: impl Into<String>) -> Self {
        let text = text.into();
        let trimmed = text.trim();
        if field.sentinels().contains(&trimmed) {
            Scraped::Missing
        } else {
            Scraped::Text(text)
        }
    }

    /// Like [`classify`](Self::classify), with `None` meaning the element was absent.
    pub fn from_option(field: RawField, text: Option<String>) -> Self {
        match text {
            Some(t) => Self::classify(field, t),
            None => Scraped::Missing,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scraped::Text(t) => Some(t),
            Scraped::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Scraped::Missing)
    }

    /// Render back to text, using the canonical sentinel for `Missing`.
    pub fn render(&self, field: RawField) -> String {
        match self {
            Scraped::Text(t) => t.clone(),
            Scraped::Missing => field.canonical_sentinel().to_string(),
        }
    }
}

/// One listing card as extracted from a catalog page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScrapedCard {
    pub title: Scraped,
    pub price: Scraped,
    pub rating: Scraped,
    pub colors: Scraped,
    pub size: Scraped,
    pub gender: Scraped,
}

impl ScrapedCard {
    /// Stamp the card with its capture time.
    pub fn capture(self, captured_at: impl Into<String>) -> RawListing {
        RawListing {
            title: self.title,
            price: self.price,
            rating: self.rating,
            colors: self.colors,
            size: self.size,
            gender: self.gender,
            captured_at: captured_at.into(),
        }
    }
}

/// One scraped record. Created once per card and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawListing {
    pub title: Scraped,
    pub price: Scraped,
    pub rating: Scraped,
    pub colors: Scraped,
    pub size: Scraped,
    pub gender: Scraped,
    /// RFC 3339 capture timestamp, opaque to the normalizer.
    pub captured_at: String,
}

impl RawListing {
    /// Build a listing from raw text columns, classifying sentinels.
    pub fn from_texts(
        title: &str,
        price: &str,
        rating: &str,
        colors: &str,
        size: &str,
        gender: &str,
        captured_at: &str,
    ) -> Self {
        Self {
            title: Scraped::classify(RawField::Title, title),
            price: Scraped::classify(RawField::Price, price),
            rating: Scraped::classify(RawField::Rating, rating),
            colors: Scraped::classify(RawField::Colors, colors),
            size: Scraped::classify(RawField::Size, size),
            gender: Scraped::classify(RawField::Gender, gender),
            captured_at: captured_at.to_string(),
        }
    }

    pub fn to_record(&self) -> RawRecord {
        RawRecord {
            title: self.title.render(RawField::Title),
            price: self.price.render(RawField::Price),
            rating: self.rating.render(RawField::Rating),
            colors: self.colors.render(RawField::Colors),
            size: self.size.render(RawField::Size),
            gender: self.gender.render(RawField::Gender),
            timestamp: self.captured_at.clone(),
        }
    }
}

impl From<RawRecord> for RawListing {
    fn from(record: RawRecord) -> Self {
        RawListing::from_texts(
            &record.title,
            &record.price,
            &record.rating,
            &record.colors,
            &record.size,
            &record.gender,
            &record.timestamp,
        )
    }
}

/// Flat text form of a [`RawListing`], as stored in the raw CSV dump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Price")]
    pub price: String,
    #[serde(rename = "Rating")]
    pub rating: String,
    #[serde(rename = "Colors")]
    pub colors: String,
    #[serde(rename = "Size")]
    pub size: String,
    #[serde(rename = "Gender")]
    pub gender: String,
    pub timestamp: String,
}

/// One validated output record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedListing {
    #[serde(rename = "Title")]
    pub title: String,
    /// Source price times the conversion rate.
    #[serde(rename = "Price")]
    pub price: f64,
    #[serde(rename = "Rating")]
    pub rating: f64,
    #[serde(rename = "Colors")]
    pub colors: i64,
    #[serde(rename = "Size")]
    pub size: String,
    #[serde(rename = "Gender")]
    pub gender: String,
    #[serde(rename = "timestamp")]
    pub captured_at: String,
}
