use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use shared::domain::{CatalogItem, Lot, UNSET_CURSOR};
use tracing::{debug, info, warn};

use crate::{error::CatalogError, CatalogSource, MissingCatalogSource, Observable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied { count: usize },
    /// The listing changed mode while the request was in flight; the result
    /// was dropped.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextPage {
    /// A search filter is active; filtered listings do not paginate.
    Filtered,
    /// A page request or a listing reload is already outstanding.
    InFlight,
    Requested { page: Lot, outcome: FetchOutcome },
}

#[derive(Debug, Default)]
struct CursorState {
    last_key: Option<Lot>,
    generation: u64,
    page_in_flight: bool,
    reload_in_flight: bool,
}

/// Observable catalog listing with search and forward pagination.
///
/// Owns three pieces of UI-visible state: the item list, the active search
/// template and the pagination cursor. All I/O goes through the
/// [`CatalogSource`]; results are applied on the caller's task.
pub struct CatalogController {
    source: Arc<dyn CatalogSource>,
    items: Observable<Vec<CatalogItem>>,
    filter: Observable<Option<CatalogItem>>,
    cursor: Mutex<CursorState>,
}

impl Default for CatalogController {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogController {
    pub fn new() -> Self {
        Self::with_source(Arc::new(MissingCatalogSource))
    }

    pub fn with_source(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            items: Observable::new(Vec::new()),
            filter: Observable::new(None),
            cursor: Mutex::new(CursorState::default()),
        }
    }

    pub fn items(&self) -> Observable<Vec<CatalogItem>> {
        self.items.clone()
    }

    pub fn active_filter(&self) -> Observable<Option<CatalogItem>> {
        self.filter.clone()
    }

    pub fn has_active_filter(&self) -> bool {
        self.filter.with(Option::is_some)
    }

    /// The pagination cursor, `"-1"` when nothing has been paged yet.
    pub fn last_key(&self) -> String {
        self.cursor().last_key.unwrap_or(UNSET_CURSOR).to_string()
    }

    /// Restore a cursor saved by a UI surface. `None` unsets it.
    pub fn set_last_key(&self, raw: Option<&str>) -> Result<(), CatalogError> {
        let parsed = raw.map(str::parse::<Lot>).transpose()?;
        self.cursor().last_key = parsed;
        Ok(())
    }

    /// Replace the listing with the first catalog page.
    ///
    /// The returned handle is the same one [`Self::items`] gives out, so a
    /// UI may subscribe to it before or after the fetch.
    pub async fn load_initial_page(&self) -> Result<Observable<Vec<CatalogItem>>, CatalogError> {
        let generation = self.begin_generation();
        let _reloading = InFlight {
            controller: self,
            generation,
            request: Request::Reload,
        };
        debug!(generation, "catalog: requesting initial page");

        let page = self.source.fetch_initial_page().await.map_err(|err| {
            warn!("catalog: initial page fetch failed: {err:#}");
            CatalogError::Fetch(err)
        })?;
        self.apply(generation, page, Apply::Replace);
        Ok(self.items())
    }

    /// Request the page after the last loaded item and append it.
    pub async fn load_next_page(&self) -> Result<NextPage, CatalogError> {
        if self.has_active_filter() {
            debug!("catalog: next page skipped while a search filter is active");
            return Ok(NextPage::Filtered);
        }

        let last_loaded = self
            .items
            .with(|items| items.last().map(|item| item.lot.ok_or(CatalogError::MissingLot)))
            .transpose()?;

        let (page, generation) = {
            let mut cursor = self.cursor();
            if cursor.page_in_flight || cursor.reload_in_flight {
                debug!(
                    reload = cursor.reload_in_flight,
                    "catalog: next page skipped while a request is in flight"
                );
                return Ok(NextPage::InFlight);
            }
            if let Some(lot) = last_loaded {
                cursor.last_key = Some(lot);
            }
            let page = cursor.last_key.unwrap_or(UNSET_CURSOR).next()?;
            cursor.page_in_flight = true;
            (page, cursor.generation)
        };

        let _in_flight = InFlight {
            controller: self,
            generation,
            request: Request::Page,
        };
        info!(page = %page, "catalog: requesting next page");

        let received = self
            .source
            .fetch_page(&page.to_string())
            .await
            .map_err(|err| {
                warn!(page = %page, "catalog: page fetch failed: {err:#}");
                CatalogError::Fetch(err)
            })?;
        let outcome = self.apply(generation, received, Apply::Append);
        Ok(NextPage::Requested { page, outcome })
    }

    /// Enter filtered mode with `template` and replace the listing with the
    /// matching items. Overwrites any previous filter.
    pub async fn search_by_template(
        &self,
        template: CatalogItem,
    ) -> Result<FetchOutcome, CatalogError> {
        let generation = self.begin_generation();
        let _reloading = InFlight {
            controller: self,
            generation,
            request: Request::Reload,
        };
        self.filter.set(Some(template.clone()));
        info!(generation, ?template, "catalog: searching by template");

        let matches = self
            .source
            .fetch_by_template(&template)
            .await
            .map_err(|err| {
                warn!("catalog: template search failed: {err:#}");
                CatalogError::Fetch(err)
            })?;
        Ok(self.apply(generation, matches, Apply::Replace))
    }

    /// Leave filtered mode, unset the cursor and reload the first page.
    pub async fn clear_search(&self) -> Result<Observable<Vec<CatalogItem>>, CatalogError> {
        self.filter.set(None);
        self.cursor().last_key = None;
        debug!("catalog: search cleared");
        self.load_initial_page().await
    }

    fn cursor(&self) -> MutexGuard<'_, CursorState> {
        self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new listing mode. Results from requests issued under an
    /// older generation are discarded when they arrive, and no page is
    /// requested until the replacement listing has landed.
    fn begin_generation(&self) -> u64 {
        let mut cursor = self.cursor();
        cursor.generation += 1;
        cursor.page_in_flight = false;
        cursor.reload_in_flight = true;
        cursor.generation
    }

    fn apply(&self, generation: u64, received: Vec<CatalogItem>, mode: Apply) -> FetchOutcome {
        let current = self.cursor().generation;
        if current != generation {
            debug!(
                generation,
                current,
                dropped = received.len(),
                "catalog: discarding stale result"
            );
            return FetchOutcome::Stale;
        }

        let count = received.len();
        match mode {
            Apply::Replace => self.items.set(received),
            Apply::Append => self.items.update(|items| items.extend(received)),
        }
        debug!(count, "catalog: listing updated");
        FetchOutcome::Applied { count }
    }
}

#[derive(Debug, Clone, Copy)]
enum Apply {
    Replace,
    Append,
}

#[derive(Debug, Clone, Copy)]
enum Request {
    Page,
    Reload,
}

/// Clears an in-flight flag when the request finishes, fails or is
/// dropped, unless the listing has since moved to a newer generation.
struct InFlight<'a> {
    controller: &'a CatalogController,
    generation: u64,
    request: Request,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut cursor = self.controller.cursor();
        if cursor.generation != self.generation {
            return;
        }
        match self.request {
            Request::Page => cursor.page_in_flight = false,
            Request::Reload => cursor.reload_in_flight = false,
        }
    }
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
