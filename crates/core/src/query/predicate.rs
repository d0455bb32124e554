//! Typed filter predicates over the release table.
//!
//! Predicates are plain data: they can be composed, compared and inspected in
//! tests without touching a database. Rendering to SQL is the job of
//! [`SqlCompiler`](super::SqlCompiler).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Tables that may be joined onto `releases r`.
///
/// Declaration order is join order: `ParentCategory` depends on `Category`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Join {
    Category,
    ParentCategory,
    Group,
    Video,
    Episode,
    Movie,
    Nfo,
    VideoData,
    ExtraFull,
    Failures,
}

/// Filterable release columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    Id,
    CategoryId,
    GroupId,
    PasswordStatus,
    NzbStatus,
    Size,
    VideoId,
    TvEpisodeId,
    AnidbId,
    MovieImdbId,
    MovieTmdbId,
    MovieTraktId,
}

impl Column {
    /// Qualified SQL column expression.
    pub fn sql(&self) -> &'static str {
        match self {
            Column::Id => "r.id",
            Column::CategoryId => "r.categories_id",
            Column::GroupId => "r.groups_id",
            Column::PasswordStatus => "r.passwordstatus",
            Column::NzbStatus => "r.nzbstatus",
            Column::Size => "r.size",
            Column::VideoId => "r.videos_id",
            Column::TvEpisodeId => "r.tv_episodes_id",
            Column::AnidbId => "r.anidbid",
            Column::MovieImdbId => "m.imdbid",
            Column::MovieTmdbId => "m.tmdbid",
            Column::MovieTraktId => "m.traktid",
        }
    }

    /// Join required to reference this column, if any.
    pub fn join(&self) -> Option<Join> {
        match self {
            Column::MovieImdbId | Column::MovieTmdbId | Column::MovieTraktId => Some(Join::Movie),
            _ => None,
        }
    }
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn sql(&self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "<>",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

/// Filter predicate AST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// Matches every row (no restriction).
    True,
    /// Matches no row.
    False,
    Compare {
        column: Column,
        op: CmpOp,
        value: i64,
    },
    In {
        column: Column,
        values: Vec<i64>,
    },
    Between {
        column: Column,
        low: i64,
        high: i64,
    },
    /// Release carries at least one of the given tag labels.
    Tagged(Vec<String>),
    /// Posted less than `days` days ago.
    PostedWithin { days: u32 },
    /// Posted more than `days` days ago.
    PostedBefore { days: u32 },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn compare(column: Column, op: CmpOp, value: i64) -> Self {
        Predicate::Compare { column, op, value }
    }

    pub fn eq(column: Column, value: i64) -> Self {
        Self::compare(column, CmpOp::Eq, value)
    }

    /// Membership test. An empty list matches nothing.
    pub fn in_list(column: Column, values: impl IntoIterator<Item = i64>) -> Self {
        let values: Vec<i64> = values.into_iter().collect();
        match values.len() {
            0 => Predicate::False,
            1 => Self::eq(column, values[0]),
            _ => Predicate::In { column, values },
        }
    }

    /// Exclusion test. An empty list excludes nothing.
    pub fn not_in(column: Column, values: impl IntoIterator<Item = i64>) -> Self {
        let values: Vec<i64> = values.into_iter().collect();
        if values.is_empty() {
            Predicate::True
        } else {
            Self::in_list(column, values).negate()
        }
    }

    pub fn between(column: Column, low: i64, high: i64) -> Self {
        Predicate::Between { column, low, high }
    }

    pub fn tagged(tags: &[String]) -> Self {
        let tags: Vec<String> = tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        if tags.is_empty() {
            Predicate::True
        } else {
            Predicate::Tagged(tags)
        }
    }

    /// Conjunction. Nested conjunctions are flattened, `True` operands are
    /// dropped and any `False` operand collapses the whole expression.
    pub fn and(parts: impl IntoIterator<Item = Predicate>) -> Self {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                Predicate::True => {}
                Predicate::False => return Predicate::False,
                Predicate::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Predicate::True,
            1 => flat.remove(0),
            _ => Predicate::And(flat),
        }
    }

    /// Disjunction. `False` operands are dropped and any `True` operand
    /// collapses the whole expression.
    pub fn or(parts: impl IntoIterator<Item = Predicate>) -> Self {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                Predicate::False => {}
                Predicate::True => return Predicate::True,
                Predicate::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Predicate::False,
            1 => flat.remove(0),
            _ => Predicate::Or(flat),
        }
    }

    pub fn negate(self) -> Self {
        match self {
            Predicate::True => Predicate::False,
            Predicate::False => Predicate::True,
            Predicate::Not(inner) => *inner,
            other => Predicate::Not(Box::new(other)),
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Predicate::True)
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Predicate::False)
    }

    /// Collect the joins needed to evaluate this predicate.
    pub fn collect_joins(&self, joins: &mut BTreeSet<Join>) {
        match self {
            Predicate::Compare { column, .. }
            | Predicate::In { column, .. }
            | Predicate::Between { column, .. } => {
                if let Some(join) = column.join() {
                    joins.insert(join);
                }
            }
            Predicate::And(parts) | Predicate::Or(parts) => {
                for part in parts {
                    part.collect_joins(joins);
                }
            }
            Predicate::Not(inner) => inner.collect_joins(joins),
            Predicate::True
            | Predicate::False
            | Predicate::Tagged(_)
            | Predicate::PostedWithin { .. }
            | Predicate::PostedBefore { .. } => {}
        }
    }
}
