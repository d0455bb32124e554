//! TV search identity: show pre-resolution and name extension.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::predicate::{Column, Predicate};
use super::request::{SiteId, TvSearchRequest};
use crate::store::{ShowLookup, ShowMatch};

/// `S03`, `e05`, `3`: optional prefix letter, then the number.
static SEASON_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*s?0*(\d+)").expect("valid season regex"));
static EPISODE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*e?0*(\d+)").expect("valid episode regex"));

fn parse_token(re: &Regex, token: &str) -> Option<u32> {
    re.captures(token)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .filter(|n| *n > 0)
}

/// How a TV search is narrowed by its show identity.
#[derive(Debug, Clone, PartialEq)]
pub enum ShowRestriction {
    /// No site ids were given.
    Unrestricted,
    Restrict(Predicate),
    /// Site ids were given but matched nothing.
    NoMatch,
}

/// Normalized identity fields of a TV search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TvIdentity {
    pub site_ids: Vec<(SiteId, i64)>,
    pub series: Option<u32>,
    pub episode: Option<u32>,
    /// Raw episode token, kept for date-style episodes such as `03/12`.
    episode_token: String,
    pub airdate: Option<String>,
}

impl TvIdentity {
    pub fn from_request(request: &TvSearchRequest) -> Self {
        let site_ids = request
            .site_ids
            .iter()
            .filter(|(_, id)| **id > 0)
            .map(|(site, id)| (*site, *id))
            .collect();
        let airdate = Some(request.airdate.trim())
            .filter(|a| !a.is_empty())
            .map(str::to_string);

        Self {
            site_ids,
            series: parse_token(&SEASON_TOKEN, &request.series),
            episode: parse_token(&EPISODE_TOKEN, &request.episode),
            episode_token: request.episode.trim().to_string(),
            airdate,
        }
    }

    /// A season was asked for without an episode or air date.
    pub fn is_season_pack(&self) -> bool {
        self.series.is_some() && self.episode.is_none() && self.airdate.is_none()
    }

    fn narrows_episodes(&self) -> bool {
        self.series.is_some() || self.episode.is_some() || self.airdate.is_some()
    }

    /// Pre-resolution lookup, when site ids were given.
    ///
    /// Season packs resolve the show alone: the pack rows carry no episode.
    pub fn lookup(&self) -> Option<ShowLookup> {
        if self.site_ids.is_empty() {
            return None;
        }
        let season_pack = self.is_season_pack();
        Some(ShowLookup {
            site_ids: self.site_ids.clone(),
            series: if season_pack { None } else { self.series },
            episode: self.episode,
            airdate: self.airdate.clone(),
        })
    }

    /// Turn the lookup outcome into a release filter.
    pub fn restriction(&self, found: Option<ShowMatch>) -> ShowRestriction {
        if self.site_ids.is_empty() {
            return ShowRestriction::Unrestricted;
        }
        let Some(found) = found else {
            return ShowRestriction::NoMatch;
        };

        if self.is_season_pack() && found.video_id > 0 {
            ShowRestriction::Restrict(Predicate::and(vec![
                Predicate::eq(Column::VideoId, found.video_id),
                Predicate::eq(Column::TvEpisodeId, 0),
            ]))
        } else if self.narrows_episodes() && !found.episode_ids.is_empty() {
            ShowRestriction::Restrict(Predicate::in_list(Column::TvEpisodeId, found.episode_ids))
        } else if found.video_id > 0 {
            ShowRestriction::Restrict(Predicate::eq(Column::VideoId, found.video_id))
        } else {
            ShowRestriction::NoMatch
        }
    }

    /// Free-text name extended with the season/episode or air date.
    pub fn search_name(&self, name: &str) -> String {
        let mut name = name.trim().to_string();
        if name.is_empty() {
            return name;
        }

        match self.series {
            Some(series) if series < 1900 => {
                name.push_str(&format!(" S{:02}", series));
                if let Some(episode) = self.episode {
                    if !self.episode_token.contains('/') {
                        name.push_str(&format!("E{:02}", episode));
                    }
                }
            }
            _ => {
                if let Some(ref airdate) = self.airdate {
                    let spaced: String = airdate
                        .chars()
                        .map(|c| if matches!(c, '/' | '-' | '.' | '_') { ' ' } else { c })
                        .collect();
                    name.push(' ');
                    name.push_str(&spaced);
                }
            }
        }
        name
    }
}
