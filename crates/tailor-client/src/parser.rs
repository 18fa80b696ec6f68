use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tailor_core::models::{RawField, Scraped, ScrapedCard};
use tailor_core::traits::CardParser;

static CARD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.collection-card").expect("card selector"));
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h3.product-title").expect("title selector"));
static SPAN_PRICE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.price").expect("span price selector"));
static P_PRICE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p.price").expect("p price selector"));
static PARAGRAPH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("paragraph selector"));

/// Parser for the catalog's listing-card markup.
///
/// Each `div.collection-card` holds a `h3.product-title`, a price in
/// `span.price` (or `p.price`), and loose `<p>` lines for rating, colors,
/// size and gender, told apart by their label text.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogParser;

impl CatalogParser {
    pub fn new() -> Self {
        Self
    }

    /// Extract one card. `None` only when no container was given.
    pub fn extract_card(&self, card: Option<ElementRef<'_>>) -> Option<ScrapedCard> {
        let card = card?;

        let title = first_text(card, &TITLE);
        let price = first_text(card, &SPAN_PRICE).or_else(|| first_text(card, &P_PRICE));

        let paragraphs: Vec<String> = card.select(&PARAGRAPH).map(element_text).collect();
        let labelled = |accept: &dyn Fn(&str) -> bool| {
            paragraphs.iter().find(|text| accept(text)).cloned()
        };

        Some(ScrapedCard {
            title: Scraped::from_option(RawField::Title, title),
            price: Scraped::from_option(RawField::Price, price),
            rating: Scraped::from_option(RawField::Rating, labelled(&|t| t.contains("Rating:"))),
            colors: Scraped::from_option(
                RawField::Colors,
                labelled(&|t| t.contains("Colors") && !t.contains("Rating:")),
            ),
            size: Scraped::from_option(RawField::Size, labelled(&|t| t.contains("Size:"))),
            gender: Scraped::from_option(RawField::Gender, labelled(&|t| t.contains("Gender:"))),
        })
    }
}

impl CardParser for CatalogParser {
    fn parse_cards(&self, html: &str) -> Vec<ScrapedCard> {
        let document = Html::parse_document(html);
        document
            .select(&CARD)
            .filter_map(|card| self.extract_card(Some(card)))
            .collect()
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn first_text(card: ElementRef<'_>, selector: &Selector) -> Option<String> {
    card.select(selector).next().map(element_text)
}
