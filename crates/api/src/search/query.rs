//! Free-text query parsing.
//!
//! Pulls price phrases ("under $50", "between 10 and 20 dollars") out of the
//! query and reduces what remains to de-duplicated search terms.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;

/// A captured number, plain or with thousands separators ("1,500.00").
macro_rules! number {
    () => {
        r"(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)"
    };
}

/// A number with an optional `$` before it and an optional unit after it.
macro_rules! amount {
    () => {
        concat!(r"\$?\s*", number!(), r"(?:\s*(?:dollars|usd|bucks))?")
    };
}

static BETWEEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(r"\bbetween\s+", amount!(), r"\s+and\s+", amount!(), r"\b"))
        .expect("Invalid regex")
});

// The first bound needs a `$` or the second a unit, so "2-3 person tent" stays text.
static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\$\s*",
        number!(),
        r"\s*(?:-|\bto\b)\s*",
        amount!(),
        r"\b|\b",
        number!(),
        r"\s*(?:-|\bto\b)\s*",
        number!(),
        r"\s*(?:dollars|usd|bucks)\b"
    ))
    .expect("Invalid regex")
});

static MAX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\b(?:under|below|less\s+than|cheaper\s+than|up\s+to|max|at\s+most)\s+",
        amount!(),
        r"\b"
    ))
    .expect("Invalid regex")
});

static MIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\b(?:over|above|more\s+than|at\s+least|min|from)\s+",
        amount!(),
        r"\b"
    ))
    .expect("Invalid regex")
});

const STOPWORDS: &[&str] = &[
    "a", "about", "all", "an", "and", "any", "are", "as", "at", "be", "buy", "by", "can", "do",
    "for", "from", "get", "have", "i", "in", "is", "it", "item", "items", "looking", "me", "my",
    "need", "of", "on", "or", "please", "price", "product", "products", "show", "some",
    "something", "that", "the", "these", "this", "those", "to", "want", "with", "you",
];

const MIN_TERM_LENGTH: usize = 2;

/// Result of parsing a search query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedQuery {
    pub terms: Vec<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

impl ParsedQuery {
    #[must_use]
    pub fn has_terms(&self) -> bool {
        !self.terms.is_empty()
    }

    /// `to_tsquery` expression: every term as an OR-ed prefix match.
    #[must_use]
    pub fn tsquery(&self) -> String {
        self.terms
            .iter()
            .map(|t| format!("{t}:*"))
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// Case-insensitive alternation of the escaped terms.
    #[must_use]
    pub fn regex_pattern(&self) -> String {
        self.terms
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|")
    }
}

/// Parse a free-text search query.
#[must_use]
pub fn parse_query(input: &str) -> ParsedQuery {
    let mut text = input.to_lowercase();
    let mut min_price = None;
    let mut max_price = None;

    if let Some((low, high)) = take_range(&BETWEEN_RE, &mut text) {
        min_price = low;
        max_price = high;
    }
    if let Some((low, high)) = take_range(&RANGE_RE, &mut text) {
        min_price = min_price.or(low);
        max_price = max_price.or(high);
    }
    if let Some(high) = take_bound(&MAX_RE, &mut text) {
        max_price = max_price.or(high);
    }
    if let Some(low) = take_bound(&MIN_RE, &mut text) {
        min_price = min_price.or(low);
    }

    if let (Some(low), Some(high)) = (min_price, max_price)
        && low > high
    {
        (min_price, max_price) = (Some(high), Some(low));
    }

    ParsedQuery {
        terms: tokenize(&text),
        min_price,
        max_price,
    }
}

/// Split on anything that isn't a letter or digit, drop stopwords and short
/// tokens, keep the first occurrence of each term.
fn tokenize(text: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for token in text.split(|c: char| !c.is_alphanumeric()) {
        if token.chars().count() < MIN_TERM_LENGTH || STOPWORDS.contains(&token) {
            continue;
        }
        if !terms.iter().any(|t| t == token) {
            terms.push(token.to_owned());
        }
    }
    terms
}

type Range = (Option<Decimal>, Option<Decimal>);

/// Match a two-number phrase, blank it out of `text`, and return the bounds.
fn take_range(re: &Regex, text: &mut String) -> Option<Range> {
    let caps = re.captures(text)?;
    let mut numbers = caps.iter().skip(1).flatten().map(|m| amount(m.as_str()));
    let range = (numbers.next().flatten(), numbers.next().flatten());
    *text = re.replace_all(text, " ").into_owned();
    Some(range)
}

/// Match a one-number phrase, blank it out of `text`, and return the bound.
fn take_bound(re: &Regex, text: &mut String) -> Option<Option<Decimal>> {
    let value = re
        .captures(text)?
        .get(1)
        .and_then(|m| amount(m.as_str()));
    *text = re.replace_all(text, " ").into_owned();
    Some(value)
}

fn amount(raw: &str) -> Option<Decimal> {
    Decimal::from_str(&raw.replace(',', ""))
        .ok()
        .filter(|value| !value.is_sign_negative())
}
