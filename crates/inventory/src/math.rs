//! Derived inventory metrics.
//!
//! Both functions are pure: they never touch the store and never reorder
//! the component slice they are given.

use crate::article::Article;

/// How many product units the given stock covers when one unit consumes
/// `amount_of` articles.
///
/// Returns 0 when `amount_of` is 0. Division truncates toward zero, so a
/// negative stock of -7 with `amount_of` 2 yields -3, not -4.
pub fn available_inventory(stock: i64, amount_of: i64) -> i64 {
    if amount_of == 0 {
        return 0;
    }
    stock.checked_div(amount_of).unwrap_or(0)
}

/// How many complete products can be assembled from the given components.
///
/// The minimum available inventory across components, negatives included,
/// or 0 when the product has no components.
pub fn sellable_inventory(components: &[Article]) -> i64 {
    components
        .iter()
        .map(Article::available_inventory)
        .min()
        .unwrap_or(0)
}
