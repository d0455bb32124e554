//! Sort token parsing for release listings.

use serde::{Deserialize, Serialize};

/// Orderable release fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderField {
    Category,
    Name,
    Size,
    Files,
    Stats,
    Posted,
}

impl OrderField {
    /// Release column the field sorts on.
    pub fn column(&self) -> &'static str {
        match self {
            OrderField::Category => "categories_id",
            OrderField::Name => "searchname",
            OrderField::Size => "size",
            OrderField::Files => "totalpart",
            OrderField::Stats => "grabs",
            OrderField::Posted => "postdate",
        }
    }

    fn from_key(key: &str) -> Self {
        match key {
            "cat" => OrderField::Category,
            "name" => OrderField::Name,
            "size" => OrderField::Size,
            "files" => OrderField::Files,
            "stats" => OrderField::Stats,
            _ => OrderField::Posted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// A validated `(field, direction)` ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec {
    pub field: OrderField,
    pub direction: Direction,
}

/// Sort tokens offered to clients, one per field and direction.
pub const ORDER_TOKENS: [&str; 12] = [
    "name_asc",
    "name_desc",
    "cat_asc",
    "cat_desc",
    "posted_asc",
    "posted_desc",
    "size_asc",
    "size_desc",
    "files_asc",
    "files_desc",
    "stats_asc",
    "stats_desc",
];

impl Default for OrderSpec {
    fn default() -> Self {
        Self {
            field: OrderField::Posted,
            direction: Direction::Desc,
        }
    }
}

impl OrderSpec {
    /// Parse a `<key>_<dir>` token.
    ///
    /// Unknown keys sort by post date, and any direction other than
    /// `asc`/`desc` (case-insensitive) falls back to descending. An empty
    /// token means `posted_desc`.
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        if token.is_empty() {
            return Self::default();
        }

        let mut parts = token.split('_');
        let field = OrderField::from_key(parts.next().unwrap_or_default());
        let direction = match parts.next() {
            Some(dir) if dir.eq_ignore_ascii_case("asc") => Direction::Asc,
            _ => Direction::Desc,
        };

        Self { field, direction }
    }

    /// Supported sort tokens for UI enumeration.
    pub fn supported_tokens() -> &'static [&'static str] {
        &ORDER_TOKENS
    }
}
