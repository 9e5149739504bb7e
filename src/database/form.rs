use std::str::FromStr;

use url::form_urlencoded;

use super::error::{ApiResult, HtmlError};

/// Raw query-string pairs, in request order. Keys may repeat.
pub type FormData = Vec<(String, String)>;

pub struct Form {
    inner: FormData,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.inner
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn get_number<T>(&self, key: &str) -> ApiResult<Option<T>>
    where
        T: FromStr,
    {
        match self.get_str(key) {
            Some("") | None => Ok(None),
            Some(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_e| HtmlError::InvalidRequest.field(key, "A valid integer is required.")),
        }
    }

    pub fn get_flag(&self, key: &str) -> ApiResult<bool> {
        match self.get_str(key).map(|v| v.trim().to_ascii_lowercase()) {
            None => Ok(false),
            Some(value) => match value.as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "" | "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(HtmlError::InvalidRequest.field(key, "Must be a valid boolean.")),
            },
        }
    }

    /// Re-encodes the query with `page` and `limit` replaced, for pagination links.
    pub fn to_query(&self, page: i64, limit: i64) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer.extend_pairs(
            self.inner
                .iter()
                .filter(|(k, _)| k != "page" && k != "limit"),
        );
        serializer.append_pair("page", &page.to_string());
        serializer.append_pair("limit", &limit.to_string());
        serializer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn form(pairs: &[(&str, &str)]) -> Form {
        Form::from_data(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn first_value_wins_for_single_lookups() {
        let form = form(&[("name", "sug"), ("name", "salt")]);
        assert_eq!(form.get_str("name"), Some("sug"));
        assert_eq!(form.get_all("name"), vec!["sug", "salt"]);
        assert_eq!(form.get_str("missing"), None);
    }

    #[test]
    fn numbers_parse_or_fail_on_their_field() {
        let form = form(&[("page", "2"), ("limit", "ten"), ("author", "")]);
        assert_eq!(form.get_number::<i64>("page").unwrap(), Some(2));
        assert_eq!(form.get_number::<i64>("author").unwrap(), None);
        assert_eq!(form.get_number::<i64>("absent").unwrap(), None);

        let error = form.get_number::<i64>("limit").unwrap_err();
        assert_eq!(error.field(), Some("limit"));
    }

    #[rstest]
    #[case("1", true)]
    #[case("true", true)]
    #[case("True", true)]
    #[case("0", false)]
    #[case("false", false)]
    #[case("", false)]
    fn flags_accept_common_spellings(#[case] raw: &str, #[case] expected: bool) {
        assert_eq!(form(&[("is_favorited", raw)]).get_flag("is_favorited").unwrap(), expected);
    }

    #[test]
    fn unknown_flag_values_are_rejected() {
        assert!(form(&[("is_favorited", "maybe")])
            .get_flag("is_favorited")
            .is_err());
    }

    #[test]
    fn query_rewrites_paging_and_keeps_filters() {
        let form = form(&[("tags", "lunch"), ("page", "1"), ("tags", "hot pot")]);
        assert_eq!(form.to_query(2, 6), "tags=lunch&tags=hot+pot&page=2&limit=6");
    }
}
