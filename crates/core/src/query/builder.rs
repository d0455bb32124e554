//! Composes filter predicates into [`ReleaseQuery`] values, one method per
//! listing surface.

use std::sync::Arc;

use super::compiler::{ReleaseQuery, Surface};
use super::order::OrderSpec;
use super::predicate::{CmpOp, Column, Predicate};
use super::request::{
    AnimeSearchRequest, BrowseRequest, CommonFilters, MovieSearchRequest, Page, SearchKind,
    SearchRequest, ShowsRequest, TvSearchRequest, ANY_CATEGORY,
};
use super::size::bucket_bytes;
use super::visibility::{SettingsSource, VisibilityPolicy};
use crate::category::{CategoryTree, MOVIE_OTHER, MOVIE_ROOT, TV_OTHER, TV_ROOT};
use crate::store::{StoreError, NZB_ADDED};

/// Values the engine resolves through collaborators before building.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolved {
    /// Id of the requested usenet group.
    pub group_id: Option<i64>,
    /// Release ids matched by the search index.
    pub candidate_ids: Option<Vec<i64>>,
    /// TV show restriction from pre-resolution.
    pub show: Option<Predicate>,
}

/// Builds release queries for every surface.
pub struct QueryBuilder {
    categories: Arc<CategoryTree>,
    settings: Arc<dyn SettingsSource>,
    items_per_page: u32,
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl QueryBuilder {
    pub fn new(
        categories: Arc<CategoryTree>,
        settings: Arc<dyn SettingsSource>,
        items_per_page: u32,
    ) -> Self {
        Self {
            categories,
            settings,
            items_per_page,
        }
    }

    pub fn categories(&self) -> &Arc<CategoryTree> {
        &self.categories
    }

    /// Visibility filter from the current setting. Fails when the setting
    /// cannot be read.
    pub fn visibility(&self) -> Result<Predicate, StoreError> {
        let setting = self.settings.password_setting()?;
        Ok(VisibilityPolicy::from_setting(setting).predicate())
    }

    /// Filters shared by every surface except the category filter.
    fn common(
        &self,
        filters: &CommonFilters,
        resolved: &Resolved,
    ) -> Result<Vec<Predicate>, StoreError> {
        let mut parts = vec![
            Predicate::eq(Column::NzbStatus, NZB_ADDED),
            self.visibility()?,
            Predicate::tagged(&filters.tags),
        ];

        if let Some(days) = filters.max_age_days.filter(|d| *d > 0) {
            parts.push(Predicate::PostedWithin { days });
        }
        if let Some(group_id) = resolved.group_id {
            parts.push(Predicate::eq(Column::GroupId, group_id));
        }
        parts.push(Predicate::not_in(
            Column::CategoryId,
            filters
                .excluded_categories
                .iter()
                .copied()
                .filter(|c| *c != ANY_CATEGORY),
        ));
        if let Some(ref ids) = resolved.candidate_ids {
            parts.push(Predicate::in_list(Column::Id, ids.iter().copied()));
        }
        if let Some(min_size) = filters.min_size.filter(|s| *s > 0) {
            parts.push(Predicate::compare(Column::Size, CmpOp::Ge, to_i64(min_size)));
        }
        if let Some(ref show) = resolved.show {
            parts.push(show.clone());
        }

        Ok(parts)
    }

    fn finish(
        &self,
        surface: Surface,
        parts: Vec<Predicate>,
        order: OrderSpec,
        page: Page,
    ) -> ReleaseQuery {
        ReleaseQuery {
            surface,
            filter: Predicate::and(parts),
            order,
            page: page.or_default_limit(self.items_per_page),
        }
    }

    pub fn browse(
        &self,
        request: &BrowseRequest,
        resolved: &Resolved,
    ) -> Result<ReleaseQuery, StoreError> {
        let mut parts = self.common(&request.filters, resolved)?;
        parts.push(self.categories.resolve(&request.filters.categories)?);

        Ok(self.finish(
            Surface::Browse,
            parts,
            OrderSpec::parse(&request.order),
            request.page,
        ))
    }

    pub fn search(
        &self,
        request: &SearchRequest,
        resolved: &Resolved,
    ) -> Result<ReleaseQuery, StoreError> {
        let mut parts = self.common(&request.filters, resolved)?;

        match request.kind {
            SearchKind::Basic => {
                parts.push(self.categories.resolve(&request.filters.categories)?);
            }
            SearchKind::Advanced => {
                if let Some(&category) = request.filters.categories.first() {
                    if category != ANY_CATEGORY {
                        parts.push(Predicate::eq(Column::CategoryId, category));
                    }
                }
            }
        }

        if let Some(bytes) = request.size_from.and_then(bucket_bytes) {
            parts.push(Predicate::compare(Column::Size, CmpOp::Gt, to_i64(bytes)));
        }
        if let Some(bytes) = request.size_to.and_then(bucket_bytes) {
            parts.push(Predicate::compare(Column::Size, CmpOp::Lt, to_i64(bytes)));
        }
        if let Some(days) = request.days_new.filter(|d| *d > 0) {
            parts.push(Predicate::PostedBefore { days });
        }
        if let Some(days) = request.days_old.filter(|d| *d > 0) {
            parts.push(Predicate::PostedWithin { days });
        }

        Ok(self.finish(
            Surface::Search,
            parts,
            OrderSpec::parse(&request.order),
            request.page,
        ))
    }

    /// TV search; `resolved.show` carries the pre-resolved show filter.
    pub fn tv(
        &self,
        request: &TvSearchRequest,
        resolved: &Resolved,
    ) -> Result<ReleaseQuery, StoreError> {
        let mut parts = self.common(&request.filters, resolved)?;
        parts.push(self.categories.resolve(&request.filters.categories)?);

        Ok(self.finish(Surface::Tv, parts, OrderSpec::default(), request.page))
    }

    pub fn movie(
        &self,
        request: &MovieSearchRequest,
        resolved: &Resolved,
    ) -> Result<ReleaseQuery, StoreError> {
        let mut parts = self.common(&request.filters, resolved)?;
        parts.push(self.categories.resolve(&request.filters.categories)?);
        parts.push(Predicate::between(Column::CategoryId, MOVIE_ROOT, MOVIE_OTHER));

        for (column, id) in [
            (Column::MovieImdbId, request.imdb_id),
            (Column::MovieTmdbId, request.tmdb_id),
            (Column::MovieTraktId, request.trakt_id),
        ] {
            if let Some(id) = id.filter(|id| *id > 0) {
                parts.push(Predicate::eq(column, id));
            }
        }

        Ok(self.finish(Surface::Movie, parts, OrderSpec::default(), request.page))
    }

    pub fn anime(
        &self,
        request: &AnimeSearchRequest,
        resolved: &Resolved,
    ) -> Result<ReleaseQuery, StoreError> {
        let mut parts = self.common(&request.filters, resolved)?;
        parts.push(self.categories.resolve(&request.filters.categories)?);
        if let Some(anidb_id) = request.anidb_id.filter(|id| *id >= 0) {
            parts.push(Predicate::eq(Column::AnidbId, anidb_id));
        }

        Ok(self.finish(Surface::Anime, parts, OrderSpec::default(), request.page))
    }

    /// Releases of subscribed shows within the TV category range.
    pub fn shows(&self, request: &ShowsRequest) -> Result<ReleaseQuery, StoreError> {
        let subscriptions = Predicate::or(request.subscriptions.iter().map(|s| {
            Predicate::and(vec![
                Predicate::eq(Column::VideoId, s.video_id),
                if s.categories.is_empty() {
                    Predicate::True
                } else {
                    Predicate::in_list(Column::CategoryId, s.categories.iter().copied())
                },
            ])
        }));

        let mut parts = vec![
            Predicate::eq(Column::NzbStatus, NZB_ADDED),
            self.visibility()?,
            Predicate::between(Column::CategoryId, TV_ROOT, TV_OTHER),
            subscriptions,
            Predicate::not_in(Column::CategoryId, request.excluded_categories.iter().copied()),
        ];
        if let Some(days) = request.max_age_days.filter(|d| *d > 0) {
            parts.push(Predicate::PostedWithin { days });
        }

        Ok(self.finish(
            Surface::Shows,
            parts,
            OrderSpec::parse(&request.order),
            request.page,
        ))
    }
}
