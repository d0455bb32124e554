//! Release query engine: index fusion, caching and pager counts.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, warn};

use super::types::{CollaboratorError, EngineError};
use crate::cache::{CachedValue, ResultCache};
use crate::category::CategoryTree;
use crate::config::Config;
use crate::metrics;
use crate::query::{
    AnimeSearchRequest, BrowseRequest, CommonFilters, MovieSearchRequest, Page, QueryBuilder,
    ReleaseQuery, Resolved, SearchRequest, SettingsSource, ShowRestriction, ShowsRequest,
    SqlCompiler, TvIdentity, TvSearchRequest,
};
use crate::search::{IndexQuery, SearchError, SearchIndex};
use crate::store::{Release, ReleaseStore, ResultPage};

/// Index field searched by name-based surfaces.
const NAME_FIELD: &str = "searchname";

/// Fingerprint token of count statements.
const COUNT_TOKEN: &str = "count";

/// First two words of a release name, dots and underscores read as spaces.
fn similar_name(name: &str) -> String {
    name.replace(['.', '_'], " ")
        .split_whitespace()
        .take(2)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs release listings for every surface.
///
/// Stateless between calls apart from the result cache and the category
/// snapshot.
pub struct ReleaseQueryEngine {
    store: Arc<dyn ReleaseStore>,
    index: Option<Arc<dyn SearchIndex>>,
    cache: Arc<dyn ResultCache>,
    builder: QueryBuilder,
    index_name: String,
    max_matches: u32,
    max_pager_results: u64,
    page_ttl: Duration,
    count_ttl: Duration,
}

impl ReleaseQueryEngine {
    pub fn new(
        store: Arc<dyn ReleaseStore>,
        index: Option<Arc<dyn SearchIndex>>,
        cache: Arc<dyn ResultCache>,
        settings: Arc<dyn SettingsSource>,
        config: &Config,
    ) -> Self {
        let categories = Arc::new(CategoryTree::new(
            Arc::clone(&store),
            config.cache.long_minutes,
        ));
        let search = config.search.clone().unwrap_or_default();

        Self {
            store,
            index,
            cache,
            builder: QueryBuilder::new(categories, settings, config.paging.items_per_page),
            index_name: search.index,
            max_matches: search.max_matches,
            max_pager_results: config.paging.max_pager_results,
            page_ttl: Duration::minutes(i64::from(config.cache.medium_minutes)),
            count_ttl: Duration::minutes(i64::from(config.cache.short_minutes)),
        }
    }

    /// The category tree used to resolve category filters.
    pub fn categories(&self) -> &Arc<CategoryTree> {
        self.builder.categories()
    }

    /// Drop cached results and the category snapshot.
    pub fn invalidate(&self) {
        self.cache.clear();
        self.builder.categories().invalidate();
    }

    pub async fn browse(&self, request: &BrowseRequest) -> Result<ResultPage, EngineError> {
        let Some(resolved) = self.resolve_group(&request.filters)? else {
            return Ok(ResultPage::empty());
        };
        self.run(self.builder.browse(request, &resolved)?)
    }

    /// Generic search. Blank terms mean no index filter; terms matching
    /// nothing mean an empty page.
    pub async fn search(&self, request: &SearchRequest) -> Result<ResultPage, EngineError> {
        let Some(mut resolved) = self.resolve_group(&request.filters)? else {
            return Ok(ResultPage::empty());
        };

        let terms = request.effective_terms();
        if !terms.is_empty() {
            let ids = self
                .match_ids(IndexQuery::fielded(&self.index_name, terms, self.max_matches))
                .await?;
            if ids.is_empty() {
                debug!(surface = "search", "No index matches");
                return Ok(ResultPage::empty());
            }
            resolved.candidate_ids = Some(ids);
        }

        self.run(self.builder.search(request, &resolved)?)
    }

    pub async fn tv_search(&self, request: &TvSearchRequest) -> Result<ResultPage, EngineError> {
        let Some(mut resolved) = self.resolve_group(&request.filters)? else {
            return Ok(ResultPage::empty());
        };

        let identity = TvIdentity::from_request(request);
        let found = match identity.lookup() {
            Some(lookup) => self.store.resolve_show(&lookup)?,
            None => None,
        };

        let name = match identity.restriction(found) {
            ShowRestriction::NoMatch => {
                debug!(surface = "tv", "Show identity matched nothing");
                return Ok(ResultPage::empty());
            }
            ShowRestriction::Restrict(show) => {
                resolved.show = Some(show);
                request.name.trim().to_string()
            }
            ShowRestriction::Unrestricted => identity.search_name(&request.name),
        };

        match self.name_candidates(&name).await? {
            Some(ids) if ids.is_empty() => return Ok(ResultPage::empty()),
            ids => resolved.candidate_ids = ids,
        }

        self.run(self.builder.tv(request, &resolved)?)
    }

    pub async fn movie_search(
        &self,
        request: &MovieSearchRequest,
    ) -> Result<ResultPage, EngineError> {
        let Some(mut resolved) = self.resolve_group(&request.filters)? else {
            return Ok(ResultPage::empty());
        };

        match self.name_candidates(&request.name).await? {
            Some(ids) if ids.is_empty() => return Ok(ResultPage::empty()),
            ids => resolved.candidate_ids = ids,
        }

        self.run(self.builder.movie(request, &resolved)?)
    }

    pub async fn anime_search(
        &self,
        request: &AnimeSearchRequest,
    ) -> Result<ResultPage, EngineError> {
        let Some(mut resolved) = self.resolve_group(&request.filters)? else {
            return Ok(ResultPage::empty());
        };

        match self.name_candidates(&request.name).await? {
            Some(ids) if ids.is_empty() => return Ok(ResultPage::empty()),
            ids => resolved.candidate_ids = ids,
        }

        self.run(self.builder.anime(request, &resolved)?)
    }

    /// Releases of the subscribed shows.
    pub async fn shows_range(&self, request: &ShowsRequest) -> Result<ResultPage, EngineError> {
        if request.subscriptions.is_empty() {
            return Ok(ResultPage::empty());
        }
        self.run(self.builder.shows(request)?)
    }

    /// Releases named like `name` in the same parent category as
    /// `release_id`, excluding that release.
    pub async fn search_similar(
        &self,
        release_id: i64,
        name: &str,
        limit: u32,
        excluded_categories: &[i64],
    ) -> Result<Vec<Release>, EngineError> {
        let Some(release) = self.store.release_by_id(release_id)? else {
            return Ok(Vec::new());
        };
        let Some(parent) = self.categories().parent_of(release.categories_id)? else {
            return Ok(Vec::new());
        };
        let words = similar_name(name);
        if words.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = SearchRequest {
            page: Page::first(limit),
            ..Default::default()
        };
        request.terms.insert(NAME_FIELD.to_string(), words);
        request.filters.categories = vec![parent];
        request.filters.excluded_categories = excluded_categories.to_vec();

        let page = self.search(&request).await?;
        Ok(page
            .items
            .into_iter()
            .filter(|r| r.id != release_id && r.category_parent_id == Some(parent))
            .collect())
    }

    /// Group filter for a request; `None` when the named group does not exist.
    fn resolve_group(&self, filters: &CommonFilters) -> Result<Option<Resolved>, EngineError> {
        let mut resolved = Resolved::default();
        let name = filters.group.as_deref().map(str::trim).unwrap_or_default();
        if !name.is_empty() {
            match self.store.group_id_by_name(name)? {
                Some(id) => resolved.group_id = Some(id),
                None => {
                    debug!(group = name, "Unknown group");
                    return Ok(None);
                }
            }
        }
        Ok(Some(resolved))
    }

    async fn match_ids(&self, query: IndexQuery) -> Result<Vec<i64>, EngineError> {
        let Some(index) = self.index.as_ref() else {
            return Err(EngineError::CollaboratorUnavailable(
                CollaboratorError::SearchIndex(SearchError::ConnectionFailed(
                    "no search index configured".to_string(),
                )),
            ));
        };

        match index.search(&query).await {
            Ok(ids) => Ok(ids),
            Err(e) => {
                warn!(error = %e, "Search index query failed");
                Err(e.into())
            }
        }
    }

    /// Index matches for a name, or `None` when no name was given.
    async fn name_candidates(&self, name: &str) -> Result<Option<Vec<i64>>, EngineError> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        let query = IndexQuery::text(&self.index_name, name, &[NAME_FIELD], self.max_matches);
        Ok(Some(self.match_ids(query).await?))
    }

    fn run(&self, query: ReleaseQuery) -> Result<ResultPage, EngineError> {
        let surface = query.surface.as_str();
        let _timer = metrics::QUERY_DURATION
            .with_label_values(&[surface])
            .start_timer();

        if query.filter.is_false() {
            debug!(surface = surface, "Filter matches nothing");
            return Ok(ResultPage::empty());
        }

        let statement = SqlCompiler::select(&query);
        let fingerprint = statement.fingerprint(&query.page.token());

        if let Some(CachedValue::Page(page)) = self.cache.get(&fingerprint) {
            metrics::CACHE_LOOKUPS.with_label_values(&["page", "hit"]).inc();
            debug!(surface = surface, fingerprint = %fingerprint, "Result cache hit");
            return Ok(page);
        }
        metrics::CACHE_LOOKUPS.with_label_values(&["page", "miss"]).inc();
        debug!(surface = surface, fingerprint = %fingerprint, "Result cache miss");

        let items = self.store.fetch_releases(&statement)?;
        let total = if items.is_empty() {
            0
        } else {
            self.pager_count(&query)?
        };
        let page = ResultPage { items, total };

        debug!(
            surface = surface,
            count = page.items.len(),
            total = page.total,
            "Query executed"
        );
        self.cache.put(
            fingerprint,
            CachedValue::Page(page.clone()),
            Utc::now() + self.page_ttl,
        );
        Ok(page)
    }

    /// Total matching rows, capped at `max_pager_results`.
    fn pager_count(&self, query: &ReleaseQuery) -> Result<u64, EngineError> {
        let statement = SqlCompiler::count(query, self.max_pager_results);
        let fingerprint = statement.fingerprint(COUNT_TOKEN);

        if let Some(CachedValue::Count(total)) = self.cache.get(&fingerprint) {
            metrics::CACHE_LOOKUPS.with_label_values(&["count", "hit"]).inc();
            return Ok(total);
        }
        metrics::CACHE_LOOKUPS.with_label_values(&["count", "miss"]).inc();

        let total = self.store.count(&statement)?;
        self.cache.put(
            fingerprint,
            CachedValue::Count(total),
            Utc::now() + self.count_ttl,
        );
        Ok(total)
    }
}
