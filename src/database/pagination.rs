use serde::Serialize;

use super::{
    error::{ApiResult, HtmlError},
    form::Form,
};
use crate::constants::MAX_PAGE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    pub page: i64,
    pub limit: i64,
}

impl PageQuery {
    pub fn from_form(form: &Form, default_limit: i64) -> ApiResult<Self> {
        let page = form.get_number::<i64>("page")?.unwrap_or(1);
        if page < 1 {
            return Err(HtmlError::NotFound.new("Invalid page."));
        }

        let limit = match form.get_number::<i64>("limit")? {
            Some(limit) if limit > 0 => limit.min(MAX_PAGE_SIZE),
            _ => default_limit,
        };

        // A page whose offset does not fit an i64 cannot hold any rows.
        if (page - 1).checked_mul(limit).is_none() {
            return Err(HtmlError::NotFound.new("Invalid page."));
        }

        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Page envelope: `{count, next, previous, results}`.
#[derive(Serialize, Debug)]
pub struct PageContext<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> PageContext<T> {
    /// Builds the page from rows fetched with `LIMIT`/`OFFSET` and the total row count.
    /// Links point back at `path` with the rest of the query string preserved.
    pub fn from_rows(
        rows: Vec<T>,
        total_rows: i64,
        query: PageQuery,
        form: &Form,
        path: &str,
    ) -> ApiResult<Self> {
        if rows.is_empty() && query.page > 1 {
            return Err(HtmlError::NotFound.new("Invalid page."));
        }

        let next = if query.page.saturating_mul(query.limit) < total_rows {
            let page = query.page.saturating_add(1);
            Some(format!("{path}?{}", form.to_query(page, query.limit)))
        } else {
            None
        };
        let previous = if query.page > 1 {
            Some(format!("{path}?{}", form.to_query(query.page - 1, query.limit)))
        } else {
            None
        };

        Ok(Self {
            count: total_rows,
            next,
            previous,
            results: rows,
        })
    }

    pub fn map<U, F>(self, f: F) -> PageContext<U>
    where
        F: FnMut(T) -> U,
    {
        PageContext {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> Form {
        Form::from_data(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn defaults_to_first_page_with_configured_limit() {
        let query = PageQuery::from_form(&form(&[]), 6).unwrap();
        assert_eq!(query, PageQuery { page: 1, limit: 6 });
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn limit_is_capped_and_offset_follows_page() {
        let query = PageQuery::from_form(&form(&[("page", "3"), ("limit", "1000")]), 6).unwrap();
        assert_eq!(query.limit, MAX_PAGE_SIZE);
        assert_eq!(query.offset(), 2 * MAX_PAGE_SIZE);
    }

    #[test]
    fn page_zero_is_invalid() {
        let error = PageQuery::from_form(&form(&[("page", "0")]), 6).unwrap_err();
        assert_eq!(error.kind(), HtmlError::NotFound);
    }

    #[test]
    fn page_past_the_addressable_range_is_invalid() {
        let huge = form(&[("page", "9223372036854775807")]);
        let error = PageQuery::from_form(&huge, 6).unwrap_err();
        assert_eq!(error.kind(), HtmlError::NotFound);
        assert_eq!(error.message(), "Invalid page.");

        let single = form(&[("page", "9223372036854775807"), ("limit", "1")]);
        let query = PageQuery::from_form(&single, 6).unwrap();
        assert_eq!(query.offset(), i64::MAX - 1);
    }

    #[test]
    fn middle_page_links_both_ways() {
        let form = form(&[("page", "2"), ("limit", "2"), ("author", "7")]);
        let query = PageQuery::from_form(&form, 6).unwrap();
        let page = PageContext::from_rows(vec![3, 4], 5, query, &form, "/api/recipes/").unwrap();

        assert_eq!(page.count, 5);
        assert_eq!(
            page.next.as_deref(),
            Some("/api/recipes/?author=7&page=3&limit=2")
        );
        assert_eq!(
            page.previous.as_deref(),
            Some("/api/recipes/?author=7&page=1&limit=2")
        );
    }

    #[test]
    fn last_page_has_no_next_link() {
        let form = form(&[]);
        let query = PageQuery::from_form(&form, 6).unwrap();
        let page = PageContext::from_rows(vec![1, 2, 3], 3, query, &form, "/api/users/").unwrap();
        assert!(page.next.is_none());
        assert!(page.previous.is_none());
    }

    #[test]
    fn empty_first_page_is_fine_but_past_the_end_is_not() {
        let empty = form(&[]);
        let query = PageQuery::from_form(&empty, 6).unwrap();
        let page =
            PageContext::<i32>::from_rows(vec![], 0, query, &empty, "/api/recipes/").unwrap();
        assert!(page.results.is_empty());

        let beyond = form(&[("page", "4")]);
        let query = PageQuery::from_form(&beyond, 6).unwrap();
        assert!(PageContext::<i32>::from_rows(vec![], 0, query, &beyond, "/api/recipes/").is_err());
    }
}
