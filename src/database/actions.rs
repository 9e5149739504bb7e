pub mod ingredients;
pub mod memberships;
pub mod recipes;
pub mod subscriptions;
pub mod tags;
pub mod users;

pub use ingredients::*;
pub use memberships::*;
pub use recipes::*;
pub use subscriptions::*;
pub use tags::*;
pub use users::*;

/// Total row count carried by `COUNT(*) OVER()` on the first row of a page.
fn total_count<T>(rows: &[T], count: impl Fn(&T) -> i64) -> i64 {
    rows.first().map(count).unwrap_or(0)
}
