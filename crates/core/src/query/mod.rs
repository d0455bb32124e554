//! Query construction: request types, predicates, ordering, visibility and
//! SQL compilation.

mod builder;
mod compiler;
mod order;
mod predicate;
mod request;
mod size;
mod tv;
mod visibility;

pub use builder::{QueryBuilder, Resolved};
pub use compiler::{ReleaseQuery, SqlCompiler, SqlParam, Statement, Surface};
pub use order::{Direction, OrderField, OrderSpec, ORDER_TOKENS};
pub use predicate::{CmpOp, Column, Join, Predicate};
pub use request::{
    AnimeSearchRequest, BrowseRequest, CommonFilters, MovieSearchRequest, Page, SearchKind,
    SearchRequest, ShowSubscription, ShowsRequest, SiteId, TvSearchRequest, ANY_CATEGORY,
};
pub use size::{bucket_bytes, BUCKET_UNIT_BYTES};
pub use tv::{ShowRestriction, TvIdentity};
pub use visibility::{PasswordStatus, SettingsSource, VisibilityPolicy};
