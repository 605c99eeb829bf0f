//! Traversal of page-based list endpoints.
//!
//! List endpoints return one page per request together with a
//! `meta.pagination` object. [`iter_pages`] follows the server-reported
//! `next_page` chain starting at page 1; [`first_by_name`] serves
//! `get_by_name` lookups.

use crate::{Response, Result};
use std::future::Future;

/// Common list parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOpts {
    /// Page to fetch, 1-based. `None` lets the server pick the first page.
    pub page: Option<u32>,
    /// Entries per page. `None` uses the server default.
    pub per_page: Option<u32>,
    /// Label selector expression, e.g. `env=prod`.
    pub label_selector: Option<String>,
}

impl ListOpts {
    /// Returns the query parameters as `(key, value)` pairs.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page".to_string(), page.to_string()));
        }
        if let Some(per_page) = self.per_page {
            pairs.push(("per_page".to_string(), per_page.to_string()));
        }
        if let Some(selector) = &self.label_selector {
            pairs.push(("label_selector".to_string(), selector.clone()));
        }
        pairs
    }
}

/// Sorts query pairs by key so URLs are deterministic; repeated keys keep
/// their relative order.
pub(crate) fn encode_query(mut pairs: Vec<(String, String)>) -> Vec<(String, String)> {
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    pairs
}

/// Fetches every page of a list endpoint and concatenates the items.
///
/// `list_page` is called with page `1` first and then with each
/// `next_page` the server reports, until it reports `0` or omits
/// pagination. Any error aborts the iteration; no partial result is returned.
///
/// # Examples
///
/// ```no_run
/// use hcloud::{iter_pages, Action, ActionListOpts, Client, Context, ListOpts};
///
/// # async fn example(client: Client) -> Result<(), hcloud::Error> {
/// let ctx = Context::background();
/// let actions: Vec<Action> = iter_pages(|page| {
///     let opts = ActionListOpts {
///         list: ListOpts { page: Some(page), per_page: Some(50), ..Default::default() },
///         ..Default::default()
///     };
///     let client = client.clone();
///     let ctx = ctx.clone();
///     async move { client.action().list(&ctx, &opts).await }
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn iter_pages<T, F, Fut>(mut list_page: F) -> Result<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<(Vec<T>, Response)>>,
{
    let mut page = 1;
    let mut items = Vec::new();

    loop {
        let (page_items, response) = list_page(page).await?;
        items.extend(page_items);

        match response.meta.pagination {
            Some(pagination) if pagination.next_page != 0 => {
                tracing::trace!(page = page, next_page = pagination.next_page, "Fetching next page");
                page = pagination.next_page;
            }
            _ => break,
        }
    }

    Ok(items)
}

/// Returns the first item of a name-filtered list call.
///
/// An empty `name` short-circuits to `Ok((None, None))` without calling `list`.
pub async fn first_by_name<T, F, Fut>(name: &str, list: F) -> Result<(Option<T>, Option<Response>)>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(Vec<T>, Response)>>,
{
    if name.is_empty() {
        return Ok((None, None));
    }

    let (items, response) = list().await?;
    Ok((items.into_iter().next(), Some(response)))
}
