use serde::de::DeserializeOwned;

use super::types::Page;
use super::{ArmClient, ArmError, ArmRequest};

/// Upper bound on pages followed for a single list call.
const MAX_PAGES: usize = 1000;

impl ArmClient {
    /// Fetches every item of an OData list, following `nextLink` until the
    /// API stops returning one.
    pub async fn list_all<T: DeserializeOwned>(
        &self,
        path: &str,
        api_version: &str,
    ) -> Result<Vec<T>, ArmError> {
        self.list_all_matching(path, api_version, |_| true).await
    }

    /// Like [`ArmClient::list_all`], keeping only the items `predicate`
    /// accepts.
    pub async fn list_all_matching<T, F>(
        &self,
        path: &str,
        api_version: &str,
        predicate: F,
    ) -> Result<Vec<T>, ArmError>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        self.collect_pages(path, api_version, predicate, MAX_PAGES).await
    }

    async fn collect_pages<T, F>(
        &self,
        path: &str,
        api_version: &str,
        predicate: F,
        max_pages: usize,
    ) -> Result<Vec<T>, ArmError>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        let mut items = Vec::new();
        let mut request = ArmRequest::get(path, api_version);
        let mut previous_link: Option<String> = None;

        for page_number in 1..=max_pages {
            let page: Page<T> = self.send(request).await?.into_model()?;
            tracing::debug!(page = page_number, count = page.value.len(), "fetched page");

            items.extend(page.value.into_iter().filter(|item| predicate(item)));

            match page.next_link.filter(|link| !link.is_empty()) {
                Some(link) if previous_link.as_deref() == Some(link.as_str()) => {
                    tracing::warn!(next_link = %link, "nextLink repeated, stopping pagination");
                    break;
                }
                Some(_) if page_number == max_pages => {
                    tracing::warn!(path, pages = max_pages, "page limit reached with more results pending");
                    return Err(ArmError::PageLimitExceeded {
                        path: path.to_string(),
                        pages: max_pages,
                    });
                }
                Some(link) => {
                    request = ArmRequest::get_url(link.clone());
                    previous_link = Some(link);
                }
                None => break,
            }
        }

        Ok(items)
    }
}
