//! Query engine integration tests.
//!
//! These tests run every listing surface against an in-memory SQLite store, a
//! mock search index and the in-process result cache.

use std::collections::BTreeMap;
use std::sync::Arc;

use nzbdex_core::{
    config::Config,
    query::{
        AnimeSearchRequest, BrowseRequest, CommonFilters, MovieSearchRequest, Page, SearchKind,
        SearchRequest, ShowSubscription, ShowsRequest, SiteId, TvSearchRequest,
    },
    search::SearchError,
    store::PASSWORD_SETTING,
    testing::{fixtures, FixedSettings, MockSearchIndex},
    CollaboratorError, EngineError, MemoryCache, ReleaseQueryEngine, SqliteReleaseStore,
};

/// Test helper wiring the engine to its collaborators.
struct TestHarness {
    store: Arc<SqliteReleaseStore>,
    index: Arc<MockSearchIndex>,
    engine: ReleaseQueryEngine,
}

impl TestHarness {
    fn new() -> Self {
        let store = fixtures::seeded_store();
        let index = Arc::new(MockSearchIndex::new());
        let config = Config {
            search: Some(Default::default()),
            ..Config::default()
        };
        let engine = ReleaseQueryEngine::new(
            store.clone(),
            Some(index.clone()),
            Arc::new(MemoryCache::new()),
            store.clone(),
            &config,
        );
        Self {
            store,
            index,
            engine,
        }
    }

    /// Insert a release posted `days` ago and index its name.
    async fn add(&self, guid: &str, name: &str, category: i64, days: i64) -> i64 {
        let id = self
            .store
            .insert_release(&fixtures::release_posted(guid, name, category, days))
            .expect("insert release");
        self.index.add_document(id, name).await;
        id
    }

    fn guids(page: &nzbdex_core::ResultPage) -> Vec<String> {
        page.items.iter().map(|r| r.guid.clone()).collect()
    }
}

fn terms(field: &str, value: &str) -> BTreeMap<String, String> {
    let mut terms = BTreeMap::new();
    terms.insert(field.to_string(), value.to_string());
    terms
}

#[tokio::test]
async fn test_browse_orders_and_counts() {
    let h = TestHarness::new();
    h.add("a", "Oldest.Movie.2001", 2040, 30).await;
    h.add("b", "Newest.Show.S01E01", 5040, 1).await;
    h.add("c", "Middle.Thing", 7010, 10).await;

    let page = h.engine.browse(&BrowseRequest::default()).await.unwrap();
    assert_eq!(TestHarness::guids(&page), vec!["b", "c", "a"]);
    assert_eq!(page.total, 3);

    let first = &page.items[0];
    assert_eq!(first.category_name.as_deref(), Some("TV > HD"));
    assert_eq!(first.category_ids.as_deref(), Some("5000,5040"));
    assert_eq!(first.category_parent_id, Some(5000));

    let by_name = h
        .engine
        .browse(&BrowseRequest {
            order: "name_asc".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(TestHarness::guids(&by_name), vec!["c", "b", "a"]);
}

#[tokio::test]
async fn test_browse_pagination_keeps_total() {
    let h = TestHarness::new();
    for (i, guid) in ["a", "b", "c", "d", "e"].iter().enumerate() {
        h.add(guid, guid, 7010, i as i64 + 1).await;
    }

    let request = BrowseRequest {
        page: Page::new(2, 2),
        ..Default::default()
    };
    let page = h.engine.browse(&request).await.unwrap();
    assert_eq!(TestHarness::guids(&page), vec!["c", "d"]);
    assert_eq!(page.total, 5);
}

#[tokio::test]
async fn test_parent_category_covers_children() {
    let h = TestHarness::new();
    h.add("sd", "Movie.SD", 2030, 1).await;
    h.add("hd", "Movie.HD", 2040, 2).await;
    h.add("tv", "Show.HD", 5040, 3).await;

    let mut request = BrowseRequest::default();
    request.filters.categories = vec![2000];
    let movies = h.engine.browse(&request).await.unwrap();
    assert_eq!(TestHarness::guids(&movies), vec!["sd", "hd"]);

    request.filters.categories = vec![2040];
    let hd = h.engine.browse(&request).await.unwrap();
    assert_eq!(TestHarness::guids(&hd), vec!["hd"]);

    request.filters.categories = vec![-1];
    let all = h.engine.browse(&request).await.unwrap();
    assert_eq!(TestHarness::guids(&all), vec!["sd", "hd", "tv"]);
}

#[tokio::test]
async fn test_visibility_setting_applies_on_next_query() {
    let h = TestHarness::new();
    let mut clean = fixtures::release_posted("clean", "Clean", 7010, 1);
    clean.passwordstatus = 0;
    let mut potential = fixtures::release_posted("potential", "Potential", 7010, 2);
    potential.passwordstatus = 1;
    let mut locked = fixtures::release_posted("locked", "Locked", 7010, 3);
    locked.passwordstatus = 10;
    for release in [&clean, &potential, &locked] {
        h.store.insert_release(release).unwrap();
    }

    let all = h.engine.browse(&BrowseRequest::default()).await.unwrap();
    assert_eq!(all.total, 3);

    h.store.set_setting(PASSWORD_SETTING, "0").unwrap();
    let strict = h.engine.browse(&BrowseRequest::default()).await.unwrap();
    assert_eq!(TestHarness::guids(&strict), vec!["clean"]);

    h.store.set_setting(PASSWORD_SETTING, "1").unwrap();
    let lenient = h.engine.browse(&BrowseRequest::default()).await.unwrap();
    assert_eq!(TestHarness::guids(&lenient), vec!["clean", "potential"]);

    h.store.set_setting(PASSWORD_SETTING, "bogus").unwrap();
    let fallback = h.engine.browse(&BrowseRequest::default()).await.unwrap();
    assert_eq!(fallback.total, 3);
}

#[tokio::test]
async fn test_cached_page_is_reused_within_ttl() {
    let h = TestHarness::new();
    h.add("a", "First", 7010, 2).await;

    let first = h.engine.browse(&BrowseRequest::default()).await.unwrap();
    h.add("b", "Second", 7010, 1).await;
    let second = h.engine.browse(&BrowseRequest::default()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(second.total, 1);

    h.engine.invalidate();
    let fresh = h.engine.browse(&BrowseRequest::default()).await.unwrap();
    assert_eq!(fresh.total, 2);
}

#[tokio::test]
async fn test_filters_compose() {
    let h = TestHarness::new();
    let group = h.store.insert_group("alt.binaries.teevee").unwrap();

    let mut big = fixtures::release_posted("big", "Big.Show", 5040, 2);
    big.groups_id = group;
    big.size = 5_000_000_000;
    let big_id = h.store.insert_release(&big).unwrap();
    h.store.tag_release(big_id, "hd").unwrap();

    let mut small = fixtures::release_posted("small", "Small.Show", 5040, 2);
    small.groups_id = group;
    small.size = 1_000;
    h.store.insert_release(&small).unwrap();

    let mut old = fixtures::release_posted("old", "Old.Show", 5040, 400);
    old.groups_id = group;
    old.size = 5_000_000_000;
    h.store.insert_release(&old).unwrap();

    h.add("other", "Other.Group", 5040, 1).await;

    let request = BrowseRequest {
        filters: CommonFilters {
            group: Some("alt.binaries.teevee".to_string()),
            min_size: Some(1_000_000),
            max_age_days: Some(30),
            ..Default::default()
        },
        ..Default::default()
    };
    let page = h.engine.browse(&request).await.unwrap();
    assert_eq!(TestHarness::guids(&page), vec!["big"]);
    assert_eq!(page.items[0].group_name.as_deref(), Some("alt.binaries.teevee"));

    let mut tagged = BrowseRequest::default();
    tagged.filters.tags = vec!["hd".to_string()];
    let page = h.engine.browse(&tagged).await.unwrap();
    assert_eq!(TestHarness::guids(&page), vec!["big"]);

    let mut excluded = BrowseRequest::default();
    excluded.filters.excluded_categories = vec![5040];
    assert!(h.engine.browse(&excluded).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_group_is_empty() {
    let h = TestHarness::new();
    h.add("a", "Anything", 7010, 1).await;

    let mut request = BrowseRequest::default();
    request.filters.group = Some("alt.binaries.nope".to_string());
    let page = h.engine.browse(&request).await.unwrap();
    assert!(page.is_empty());
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn test_search_uses_index_candidates() {
    let h = TestHarness::new();
    h.add("u", "Ubuntu.24.04.Desktop", 7010, 1).await;
    h.add("d", "Debian.12.Netinst", 7010, 2).await;

    let request = SearchRequest {
        terms: terms("searchname", "ubuntu"),
        ..Default::default()
    };
    let page = h.engine.search(&request).await.unwrap();
    assert_eq!(TestHarness::guids(&page), vec!["u"]);
    assert_eq!(page.total, 1);

    let queries = h.index.recorded_queries().await;
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].query.field_terms, terms("searchname", "ubuntu"));
}

#[tokio::test]
async fn test_search_without_terms_skips_index() {
    let h = TestHarness::new();
    h.add("u", "Ubuntu", 7010, 1).await;
    h.add("d", "Debian", 7010, 2).await;

    let request = SearchRequest {
        terms: terms("searchname", "   "),
        ..Default::default()
    };
    let page = h.engine.search(&request).await.unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(h.index.query_count().await, 0);
}

#[tokio::test]
async fn test_search_with_no_matches_is_empty() {
    let h = TestHarness::new();
    h.add("u", "Ubuntu", 7010, 1).await;

    let request = SearchRequest {
        terms: terms("searchname", "windows"),
        ..Default::default()
    };
    let page = h.engine.search(&request).await.unwrap();
    assert!(page.is_empty());
}

#[tokio::test]
async fn test_index_outage_is_an_error() {
    let h = TestHarness::new();
    h.add("u", "Ubuntu", 7010, 1).await;
    h.index.set_next_error(SearchError::Timeout).await;

    let request = SearchRequest {
        terms: terms("searchname", "ubuntu"),
        ..Default::default()
    };
    let result = h.engine.search(&request).await;
    assert!(matches!(
        result,
        Err(EngineError::CollaboratorUnavailable(
            CollaboratorError::SearchIndex(SearchError::Timeout)
        ))
    ));
}

#[tokio::test]
async fn test_search_size_buckets() {
    let h = TestHarness::new();
    for (guid, size) in [
        ("tiny", 50 * 1024 * 1024),
        ("mid", 200 * 1024 * 1024),
        ("large", 300 * 1024 * 1024),
    ] {
        let mut release = fixtures::release_posted(guid, guid, 7010, 1);
        release.size = size;
        h.store.insert_release(&release).unwrap();
    }

    let request = SearchRequest {
        size_from: Some(1),
        size_to: Some(2),
        ..Default::default()
    };
    let page = h.engine.search(&request).await.unwrap();
    assert_eq!(TestHarness::guids(&page), vec!["mid"]);
}

#[tokio::test]
async fn test_advanced_search_first_category_literal() {
    let h = TestHarness::new();
    h.add("hd", "Movie.HD", 2040, 1).await;
    h.add("sd", "Movie.SD", 2030, 2).await;

    let mut request = SearchRequest {
        kind: SearchKind::Advanced,
        ..Default::default()
    };
    request.filters.categories = vec![2030, 2040];
    let page = h.engine.search(&request).await.unwrap();
    assert_eq!(TestHarness::guids(&page), vec!["sd"]);
}

/// A show with a season pack and two episodes of season 1.
async fn seed_show(h: &TestHarness) {
    let video = h
        .store
        .insert_video("Some Show", &[(SiteId::Tvdb, 121361)])
        .unwrap();
    let e1 = h
        .store
        .insert_episode(video, 1, 1, "Pilot", Some("2019-03-01"))
        .unwrap();
    let e2 = h
        .store
        .insert_episode(video, 1, 2, "Second", Some("2019-03-08"))
        .unwrap();

    for (guid, episode, days) in [("pack", 0, 1), ("e1", e1, 2), ("e2", e2, 3)] {
        let mut release = fixtures::release_posted(guid, &format!("Some.Show.{}", guid), 5040, days);
        release.videos_id = video;
        release.tv_episodes_id = episode;
        h.store.insert_release(&release).unwrap();
    }
    h.add("unrelated", "Other.Show.S01E01", 5040, 4).await;
}

fn tv_request(series: &str, episode: &str, airdate: &str) -> TvSearchRequest {
    let mut request = TvSearchRequest {
        series: series.to_string(),
        episode: episode.to_string(),
        airdate: airdate.to_string(),
        ..Default::default()
    };
    request.site_ids.insert(SiteId::Tvdb, 121361);
    request
}

#[tokio::test]
async fn test_tv_season_only_returns_season_packs() {
    let h = TestHarness::new();
    seed_show(&h).await;

    let page = h.engine.tv_search(&tv_request("S01", "", "")).await.unwrap();
    assert_eq!(TestHarness::guids(&page), vec!["pack"]);
}

#[tokio::test]
async fn test_tv_episode_and_airdate() {
    let h = TestHarness::new();
    seed_show(&h).await;

    let page = h.engine.tv_search(&tv_request("1", "E02", "")).await.unwrap();
    assert_eq!(TestHarness::guids(&page), vec!["e2"]);
    let episode = page.items[0].episode.as_ref().unwrap();
    assert_eq!(episode.title, "Second");
    assert_eq!(page.items[0].show.as_ref().unwrap().tvdb, 121361);

    let by_date = h
        .engine
        .tv_search(&tv_request("", "", "2019-03-01"))
        .await
        .unwrap();
    assert_eq!(TestHarness::guids(&by_date), vec!["e1"]);

    let whole_show = h.engine.tv_search(&tv_request("", "", "")).await.unwrap();
    assert_eq!(TestHarness::guids(&whole_show), vec!["pack", "e1", "e2"]);
}

#[tokio::test]
async fn test_tv_unknown_identity_is_empty() {
    let h = TestHarness::new();
    seed_show(&h).await;

    let mut request = TvSearchRequest::default();
    request.site_ids.insert(SiteId::Tvmaze, 999);
    assert!(h.engine.tv_search(&request).await.unwrap().is_empty());

    let missing_episode = tv_request("1", "9", "");
    assert!(h.engine.tv_search(&missing_episode).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_tv_name_is_extended_without_show() {
    let h = TestHarness::new();
    h.add("hit", "Other.Show.S02E03.720p", 5040, 1).await;
    h.add("miss", "Other.Show.S02E04.720p", 5040, 2).await;

    let request = TvSearchRequest {
        name: "Other.Show".to_string(),
        series: "2".to_string(),
        episode: "3".to_string(),
        ..Default::default()
    };
    let page = h.engine.tv_search(&request).await.unwrap();
    assert_eq!(TestHarness::guids(&page), vec!["hit"]);

    let queries = h.index.recorded_queries().await;
    assert_eq!(queries[0].query.text, "Other.Show S02E03");
}

#[tokio::test]
async fn test_movie_search_by_imdb() {
    let h = TestHarness::new();
    let movie = h.store.insert_movie(133093, 603, 481, "The Matrix").unwrap();
    let mut matrix = fixtures::release_posted("matrix", "The.Matrix.1999", 2040, 1);
    matrix.movieinfo_id = Some(movie);
    h.store.insert_release(&matrix).unwrap();
    h.add("other", "Other.Movie", 2040, 2).await;
    h.add("tv", "Not.A.Movie", 5040, 3).await;

    let request = MovieSearchRequest {
        imdb_id: Some(133093),
        ..Default::default()
    };
    let page = h.engine.movie_search(&request).await.unwrap();
    assert_eq!(TestHarness::guids(&page), vec!["matrix"]);
    assert_eq!(page.items[0].movie.as_ref().unwrap().title, "The Matrix");

    let any_movie = h
        .engine
        .movie_search(&MovieSearchRequest::default())
        .await
        .unwrap();
    assert_eq!(TestHarness::guids(&any_movie), vec!["matrix", "other"]);
}

#[tokio::test]
async fn test_anime_search_by_anidb() {
    let h = TestHarness::new();
    let mut episode = fixtures::release_posted("anime", "Some.Anime.01", 5070, 1);
    episode.anidbid = 4563;
    h.store.insert_release(&episode).unwrap();
    h.add("other", "Other.Anime.01", 5070, 2).await;

    let request = AnimeSearchRequest {
        anidb_id: Some(4563),
        ..Default::default()
    };
    let page = h.engine.anime_search(&request).await.unwrap();
    assert_eq!(TestHarness::guids(&page), vec!["anime"]);

    let by_name = AnimeSearchRequest {
        name: "other anime".to_string(),
        ..Default::default()
    };
    let page = h.engine.anime_search(&by_name).await.unwrap();
    assert_eq!(TestHarness::guids(&page), vec!["other"]);
}

#[tokio::test]
async fn test_shows_range() {
    let h = TestHarness::new();
    seed_show(&h).await;
    let video = h
        .store
        .insert_video("Second Show", &[(SiteId::Tvdb, 5)])
        .unwrap();
    let mut sd = fixtures::release_posted("second-sd", "Second.Show.SD", 5030, 5);
    sd.videos_id = video;
    h.store.insert_release(&sd).unwrap();

    assert!(h
        .engine
        .shows_range(&ShowsRequest::default())
        .await
        .unwrap()
        .is_empty());

    let request = ShowsRequest {
        subscriptions: vec![ShowSubscription {
            video_id: video,
            categories: vec![5040],
        }],
        ..Default::default()
    };
    assert!(h.engine.shows_range(&request).await.unwrap().is_empty());

    let request = ShowsRequest {
        subscriptions: vec![ShowSubscription {
            video_id: video,
            categories: vec![],
        }],
        ..Default::default()
    };
    let page = h.engine.shows_range(&request).await.unwrap();
    assert_eq!(TestHarness::guids(&page), vec!["second-sd"]);
}

#[tokio::test]
async fn test_search_similar_stays_in_parent_category() {
    let h = TestHarness::new();
    let source = h.add("source", "Some.Movie.2020.1080p", 2040, 1).await;
    h.add("sibling", "Some.Movie.2020.720p", 2030, 2).await;
    h.add("elsewhere", "Some.Movie.Soundtrack", 7010, 3).await;

    let similar = h
        .engine
        .search_similar(source, "Some.Movie.2020.1080p", 10, &[])
        .await
        .unwrap();
    let guids: Vec<&str> = similar.iter().map(|r| r.guid.as_str()).collect();
    assert_eq!(guids, vec!["sibling"]);

    assert!(h
        .engine
        .search_similar(9999, "Some.Movie", 10, &[])
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_missing_index_with_terms_is_unavailable() {
    let store = fixtures::seeded_store();
    let engine = ReleaseQueryEngine::new(
        store.clone(),
        None,
        Arc::new(MemoryCache::new()),
        store.clone(),
        &Config::default(),
    );

    let request = SearchRequest {
        terms: terms("searchname", "ubuntu"),
        ..Default::default()
    };
    assert!(matches!(
        engine.search(&request).await,
        Err(EngineError::CollaboratorUnavailable(_))
    ));
    assert!(engine
        .browse(&BrowseRequest::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_unknown_movie_and_anime_ids_are_empty() {
    let h = TestHarness::new();
    let movie = h.store.insert_movie(133093, 603, 481, "The Matrix").unwrap();
    let mut matrix = fixtures::release_posted("matrix", "The.Matrix.1999", 2040, 1);
    matrix.movieinfo_id = Some(movie);
    h.store.insert_release(&matrix).unwrap();
    let mut anime = fixtures::release_posted("anime", "Some.Anime.01", 5070, 1);
    anime.anidbid = 4563;
    h.store.insert_release(&anime).unwrap();

    let unknown_imdb = MovieSearchRequest {
        imdb_id: Some(9_999_999),
        ..Default::default()
    };
    assert!(h.engine.movie_search(&unknown_imdb).await.unwrap().is_empty());

    let unknown_tmdb = MovieSearchRequest {
        tmdb_id: Some(424242),
        ..Default::default()
    };
    assert!(h.engine.movie_search(&unknown_tmdb).await.unwrap().is_empty());

    let unknown_anidb = AnimeSearchRequest {
        anidb_id: Some(9999),
        ..Default::default()
    };
    assert!(h.engine.anime_search(&unknown_anidb).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unreadable_visibility_setting_is_an_error() {
    let store = fixtures::seeded_store();
    let mut locked = fixtures::release_posted("locked", "Locked", 7010, 1);
    locked.passwordstatus = 10;
    store.insert_release(&locked).unwrap();

    let settings = Arc::new(FixedSettings::new(Some(0)));
    let engine = ReleaseQueryEngine::new(
        store.clone(),
        None,
        Arc::new(MemoryCache::new()),
        settings.clone(),
        &Config::default(),
    );
    assert!(engine
        .browse(&BrowseRequest::default())
        .await
        .unwrap()
        .is_empty());

    settings.set_unavailable(true);
    assert!(matches!(
        engine.browse(&BrowseRequest::default()).await,
        Err(EngineError::CollaboratorUnavailable(
            CollaboratorError::Store(_)
        ))
    ));
    let shows = ShowsRequest {
        subscriptions: vec![ShowSubscription {
            video_id: 1,
            categories: vec![],
        }],
        ..Default::default()
    };
    assert!(matches!(
        engine.shows_range(&shows).await,
        Err(EngineError::CollaboratorUnavailable(_))
    ));
}
