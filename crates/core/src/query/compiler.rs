//! Renders [`ReleaseQuery`] values into parameterized SQL.
//!
//! Only `?` placeholders carry caller values. Everything interpolated into the
//! SQL text comes from static tables in this module.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::order::OrderSpec;
use super::predicate::{Join, Predicate};
use super::request::Page;
use crate::cache::Fingerprint;

/// Listing surface a query belongs to. Decides the projected metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    Browse,
    Search,
    Tv,
    Movie,
    Anime,
    Shows,
}

impl Surface {
    pub fn as_str(&self) -> &'static str {
        match self {
            Surface::Browse => "browse",
            Surface::Search => "search",
            Surface::Tv => "tv",
            Surface::Movie => "movie",
            Surface::Anime => "anime",
            Surface::Shows => "shows",
        }
    }

    fn joins(&self) -> &'static [Join] {
        use Join::*;
        match self {
            Surface::Browse => &[Category, ParentCategory, Group, Video, Episode, Nfo, VideoData, Failures],
            Surface::Search => &[
                Category,
                ParentCategory,
                Group,
                Video,
                Episode,
                Movie,
                Nfo,
                VideoData,
                Failures,
            ],
            Surface::Tv => &[Category, ParentCategory, Group, Video, Episode, Nfo, VideoData],
            Surface::Movie => &[Category, ParentCategory, Group, Movie, Nfo],
            Surface::Anime => &[Category, ParentCategory, Group, Nfo, ExtraFull],
            Surface::Shows => &[Category, ParentCategory, Group, Episode, Nfo, VideoData, Failures],
        }
    }
}

/// A fully described release listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseQuery {
    pub surface: Surface,
    pub filter: Predicate,
    pub order: OrderSpec,
    pub page: Page,
}

/// A bound SQL parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlParam {
    Int(i64),
    Text(String),
}

impl SqlParam {
    fn render(&self) -> String {
        match self {
            SqlParam::Int(v) => format!("i:{}", v),
            SqlParam::Text(v) => format!("t:{}", v),
        }
    }
}

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl Statement {
    /// Cache key for this statement combined with a pagination token.
    pub fn fingerprint(&self, page_token: &str) -> Fingerprint {
        let params = self
            .params
            .iter()
            .map(SqlParam::render)
            .collect::<Vec<_>>()
            .join("\u{1e}");
        Fingerprint::compute(&[&self.sql, &params, page_token])
    }
}

/// Output column: `(join it needs, expression, alias)`.
type Projected = (Option<Join>, &'static str, &'static str);

const PROJECTION: &[Projected] = &[
    (None, "r.id", "id"),
    (None, "r.guid", "guid"),
    (None, "r.searchname", "searchname"),
    (None, "r.fromname", "fromname"),
    (None, "r.size", "size"),
    (None, "r.totalpart", "totalpart"),
    (None, "r.grabs", "grabs"),
    (None, "r.comments", "comments"),
    (None, "r.postdate", "postdate"),
    (None, "r.adddate", "adddate"),
    (None, "r.categories_id", "categories_id"),
    (None, "r.groups_id", "groups_id"),
    (None, "r.passwordstatus", "passwordstatus"),
    (None, "r.videos_id", "videos_id"),
    (None, "r.tv_episodes_id", "tv_episodes_id"),
    (None, "r.anidbid", "anidbid"),
    (None, "r.imdbid", "imdbid"),
    (Some(Join::ParentCategory), "cp.id", "category_parent_id"),
    (
        Some(Join::ParentCategory),
        "cp.title || ' > ' || c.title",
        "category_name",
    ),
    (Some(Join::ParentCategory), "cp.id || ',' || c.id", "category_ids"),
    (Some(Join::Group), "g.name", "group_name"),
    (Some(Join::Nfo), "rn.releases_id", "nfo_id"),
    (Some(Join::VideoData), "re.releases_id", "video_data_id"),
    (Some(Join::ExtraFull), "rf.releases_id", "extra_id"),
    (Some(Join::Failures), "df.failed", "failed"),
    (Some(Join::Video), "v.title", "show_title"),
    (Some(Join::Video), "v.tvdb", "tvdb"),
    (Some(Join::Video), "v.trakt", "trakt"),
    (Some(Join::Video), "v.tvrage", "tvrage"),
    (Some(Join::Video), "v.tvmaze", "tvmaze"),
    (Some(Join::Video), "v.imdb", "show_imdb"),
    (Some(Join::Video), "v.tmdb", "show_tmdb"),
    (Some(Join::Episode), "tve.series", "series"),
    (Some(Join::Episode), "tve.episode", "episode"),
    (Some(Join::Episode), "tve.title", "episode_title"),
    (Some(Join::Episode), "tve.firstaired", "firstaired"),
    (Some(Join::Movie), "m.imdbid", "movie_imdbid"),
    (Some(Join::Movie), "m.tmdbid", "movie_tmdbid"),
    (Some(Join::Movie), "m.traktid", "movie_traktid"),
    (Some(Join::Movie), "m.title", "movie_title"),
];

fn join_clause(join: Join) -> &'static str {
    match join {
        Join::Category => "LEFT JOIN categories c ON c.id = r.categories_id",
        Join::ParentCategory => "LEFT JOIN categories cp ON cp.id = c.parentid",
        Join::Group => "LEFT JOIN usenet_groups g ON g.id = r.groups_id",
        Join::Video => "LEFT JOIN videos v ON v.id = r.videos_id AND r.videos_id > 0",
        Join::Episode => {
            "LEFT JOIN tv_episodes tve ON tve.id = r.tv_episodes_id AND r.tv_episodes_id > 0"
        }
        Join::Movie => "LEFT JOIN movieinfo m ON m.id = r.movieinfo_id",
        Join::Nfo => "LEFT JOIN release_nfos rn ON rn.releases_id = r.id",
        Join::VideoData => "LEFT JOIN video_data re ON re.releases_id = r.id",
        Join::ExtraFull => "LEFT JOIN releaseextrafull rf ON rf.releases_id = r.id",
        Join::Failures => {
            "LEFT JOIN (SELECT release_id, COUNT(*) AS failed FROM dnzb_failures \
             GROUP BY release_id) df ON df.release_id = r.id"
        }
    }
}

/// `FROM` target: the release table plus its joins.
fn render_from(joins: &BTreeSet<Join>) -> String {
    let mut from = String::from("releases r");
    for join in joins {
        from.push(' ');
        from.push_str(join_clause(*join));
    }
    from
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Compiles release queries for the SQLite schema.
pub struct SqlCompiler;

impl SqlCompiler {
    /// Render a predicate to a SQL condition, appending its parameters.
    pub fn render_predicate(predicate: &Predicate, params: &mut Vec<SqlParam>) -> String {
        match predicate {
            Predicate::True => "1 = 1".to_string(),
            Predicate::False => "1 = 0".to_string(),
            Predicate::Compare { column, op, value } => {
                params.push(SqlParam::Int(*value));
                format!("{} {} ?", column.sql(), op.sql())
            }
            Predicate::In { column, values } => {
                params.extend(values.iter().map(|v| SqlParam::Int(*v)));
                format!("{} IN ({})", column.sql(), placeholders(values.len()))
            }
            Predicate::Between { column, low, high } => {
                params.push(SqlParam::Int(*low));
                params.push(SqlParam::Int(*high));
                format!("{} BETWEEN ? AND ?", column.sql())
            }
            Predicate::Tagged(tags) => {
                params.extend(tags.iter().map(|t| SqlParam::Text(t.clone())));
                format!(
                    "EXISTS (SELECT 1 FROM release_tags tt WHERE tt.releases_id = r.id \
                     AND tt.tag_name IN ({}))",
                    placeholders(tags.len())
                )
            }
            Predicate::PostedWithin { days } => {
                params.push(SqlParam::Text(format!("-{} days", days)));
                "r.postdate > datetime('now', ?)".to_string()
            }
            Predicate::PostedBefore { days } => {
                params.push(SqlParam::Text(format!("-{} days", days)));
                "r.postdate < datetime('now', ?)".to_string()
            }
            Predicate::And(parts) => Self::render_group(parts, " AND ", "1 = 1", params),
            Predicate::Or(parts) => Self::render_group(parts, " OR ", "1 = 0", params),
            Predicate::Not(inner) => {
                format!("NOT ({})", Self::render_predicate(inner, params))
            }
        }
    }

    fn render_group(
        parts: &[Predicate],
        separator: &str,
        empty: &str,
        params: &mut Vec<SqlParam>,
    ) -> String {
        match parts {
            [] => empty.to_string(),
            [single] => Self::render_predicate(single, params),
            _ => {
                let rendered: Vec<String> = parts
                    .iter()
                    .map(|p| Self::render_predicate(p, params))
                    .collect();
                format!("({})", rendered.join(separator))
            }
        }
    }

    /// Page statement: projection, joins, filter, ordering and pagination.
    pub fn select(query: &ReleaseQuery) -> Statement {
        let mut joins: BTreeSet<Join> = query.surface.joins().iter().copied().collect();
        query.filter.collect_joins(&mut joins);
        if joins.contains(&Join::ParentCategory) {
            joins.insert(Join::Category);
        }

        let projection = PROJECTION
            .iter()
            .map(|(join, expr, alias)| match join {
                Some(j) if !joins.contains(j) => format!("NULL AS {}", alias),
                _ => format!("{} AS {}", expr, alias),
            })
            .collect::<Vec<_>>()
            .join(", ");

        let mut params = Vec::new();
        let condition = Self::render_predicate(&query.filter, &mut params);
        let direction = query.order.direction.sql();

        let sql = format!(
            "SELECT {} FROM {} WHERE {} ORDER BY r.{} {}, r.id {} LIMIT ? OFFSET ?",
            projection,
            render_from(&joins),
            condition,
            query.order.field.column(),
            direction,
            direction,
        );
        params.push(SqlParam::Int(i64::from(query.page.limit)));
        params.push(SqlParam::Int(i64::from(query.page.offset)));

        Statement { sql, params }
    }

    /// Count statement scanning at most `cap` matching rows.
    pub fn count(query: &ReleaseQuery, cap: u64) -> Statement {
        let mut joins = BTreeSet::new();
        query.filter.collect_joins(&mut joins);

        let mut params = Vec::new();
        let condition = Self::render_predicate(&query.filter, &mut params);
        let sql = format!(
            "SELECT COUNT(*) FROM (SELECT r.id FROM {} WHERE {} LIMIT ?) z",
            render_from(&joins),
            condition,
        );
        params.push(SqlParam::Int(i64::try_from(cap).unwrap_or(i64::MAX)));

        Statement { sql, params }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::order::{Direction, OrderField};
    use crate::query::predicate::{CmpOp, Column};

    fn create_test_query(surface: Surface, filter: Predicate) -> ReleaseQuery {
        ReleaseQuery {
            surface,
            filter,
            order: OrderSpec::default(),
            page: Page::new(0, 50),
        }
    }

    #[test]
    fn test_render_compare_and_in() {
        let mut params = Vec::new();
        let sql = SqlCompiler::render_predicate(
            &Predicate::and(vec![
                Predicate::eq(Column::NzbStatus, 1),
                Predicate::in_list(Column::CategoryId, vec![5030, 5040]),
            ]),
            &mut params,
        );
        assert_eq!(sql, "(r.nzbstatus = ? AND r.categories_id IN (?, ?))");
        assert_eq!(
            params,
            vec![SqlParam::Int(1), SqlParam::Int(5030), SqlParam::Int(5040)]
        );
    }

    #[test]
    fn test_render_not_and_or() {
        let mut params = Vec::new();
        let sql = SqlCompiler::render_predicate(
            &Predicate::and(vec![
                Predicate::not_in(Column::CategoryId, vec![1, 2]),
                Predicate::or(vec![
                    Predicate::eq(Column::VideoId, 3),
                    Predicate::compare(Column::Size, CmpOp::Gt, 10),
                ]),
            ]),
            &mut params,
        );
        assert_eq!(
            sql,
            "(NOT (r.categories_id IN (?, ?)) AND (r.videos_id = ? OR r.size > ?))"
        );
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_user_text_never_in_sql() {
        let tag = "x'); DROP TABLE releases; --".to_string();
        let mut params = Vec::new();
        let sql = SqlCompiler::render_predicate(&Predicate::Tagged(vec![tag.clone()]), &mut params);
        assert!(!sql.contains("DROP"));
        assert_eq!(params, vec![SqlParam::Text(tag)]);
    }

    #[test]
    fn test_age_predicates_are_stable_text() {
        let mut params = Vec::new();
        let sql = SqlCompiler::render_predicate(&Predicate::PostedWithin { days: 7 }, &mut params);
        assert_eq!(sql, "r.postdate > datetime('now', ?)");
        assert_eq!(params, vec![SqlParam::Text("-7 days".to_string())]);
    }

    #[test]
    fn test_select_orders_with_secondary_id() {
        let mut query = create_test_query(Surface::Browse, Predicate::True);
        query.order = OrderSpec {
            field: OrderField::Size,
            direction: Direction::Asc,
        };
        let statement = SqlCompiler::select(&query);
        assert!(statement
            .sql
            .contains("ORDER BY r.size ASC, r.id ASC LIMIT ? OFFSET ?"));
        assert_eq!(
            &statement.params[statement.params.len() - 2..],
            &[SqlParam::Int(50), SqlParam::Int(0)]
        );
    }

    #[test]
    fn test_select_projects_null_for_unjoined_columns() {
        let statement = SqlCompiler::select(&create_test_query(Surface::Anime, Predicate::True));
        assert!(statement.sql.contains("NULL AS movie_title"));
        assert!(statement.sql.contains("NULL AS show_title"));
        assert!(statement.sql.contains("rf.releases_id AS extra_id"));
        assert!(!statement.sql.contains("JOIN movieinfo"));
    }

    #[test]
    fn test_select_adds_join_for_predicate_columns() {
        let statement = SqlCompiler::select(&create_test_query(
            Surface::Browse,
            Predicate::eq(Column::MovieImdbId, 133093),
        ));
        assert!(statement.sql.contains("LEFT JOIN movieinfo m"));
        assert!(statement.sql.contains("m.title AS movie_title"));
    }

    #[test]
    fn test_count_is_capped_and_join_free() {
        let statement = SqlCompiler::count(
            &create_test_query(Surface::Browse, Predicate::eq(Column::NzbStatus, 1)),
            125_000,
        );
        assert_eq!(
            statement.sql,
            "SELECT COUNT(*) FROM (SELECT r.id FROM releases r WHERE r.nzbstatus = ? LIMIT ?) z"
        );
        assert_eq!(
            statement.params,
            vec![SqlParam::Int(1), SqlParam::Int(125_000)]
        );
    }

    #[test]
    fn test_identical_queries_fingerprint_identically() {
        let a = SqlCompiler::select(&create_test_query(Surface::Browse, Predicate::True));
        let b = SqlCompiler::select(&create_test_query(Surface::Browse, Predicate::True));
        assert_eq!(a.fingerprint("0:50"), b.fingerprint("0:50"));

        let other = SqlCompiler::select(&create_test_query(
            Surface::Browse,
            Predicate::eq(Column::GroupId, 2),
        ));
        assert_ne!(a.fingerprint("0:50"), other.fingerprint("0:50"));
    }
}
