//! OpenAlex: highly cited papers that expose a PDF link.

use serde::Deserialize;

use crate::config::SourceConfig;
use crate::error::FetchError;
use crate::http;
use crate::source::{CollectRequest, Source};
use crate::types::{Paper, SourceKind};

const PER_PAGE: usize = 25;
const MAX_PAGES: usize = 8;

#[derive(Debug, Default, Deserialize)]
struct WorksResponse {
    #[serde(default)]
    results: Vec<Work>,
}

#[derive(Debug, Default, Deserialize)]
struct Work {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    publication_year: Option<i32>,
    #[serde(default)]
    cited_by_count: Option<u64>,
    #[serde(default)]
    authorships: Vec<Authorship>,
    #[serde(default)]
    primary_location: Option<Location>,
    #[serde(default)]
    locations: Vec<Location>,
    #[serde(default)]
    open_access: Option<OpenAccess>,
}

#[derive(Debug, Default, Deserialize)]
struct Authorship {
    #[serde(default)]
    author: Option<Named>,
}

#[derive(Debug, Default, Deserialize)]
struct Location {
    #[serde(default)]
    pdf_url: Option<String>,
    #[serde(default)]
    source: Option<Named>,
}

#[derive(Debug, Default, Deserialize)]
struct Named {
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAccess {
    #[serde(default)]
    is_oa: bool,
}

/// OpenAlex collector. No credentials required.
pub struct OpenAlexSource {
    client: reqwest::Client,
    base: String,
    request_delay_ms: (u64, u64),
}

impl OpenAlexSource {
    pub fn new(client: reqwest::Client, config: &SourceConfig) -> Self {
        Self {
            client,
            base: config.endpoints.openalex.clone(),
            request_delay_ms: config.request_delay_ms,
        }
    }

    async fn fetch_page(&self, query: &str, page: usize) -> Result<Vec<Work>, FetchError> {
        let url = format!("{}/works", self.base);
        let per_page = PER_PAGE.to_string();
        let page = page.to_string();
        let request = self
            .client
            .get(url)
            .query(&[
                ("search", query),
                ("sort", "cited_by_count:desc"),
                ("per-page", per_page.as_str()),
                ("page", page.as_str()),
            ])
            .header("Accept", "application/json");
        let response: WorksResponse = http::get_json(request, "OpenAlex works").await?;
        Ok(response.results)
    }
}

impl Source for OpenAlexSource {
    type Item = Paper;

    fn kind(&self) -> SourceKind {
        SourceKind::Papers
    }

    async fn collect(&self, request: &CollectRequest) -> Result<Vec<Paper>, FetchError> {
        let query = request.query.trim();
        if query.is_empty() || request.max_results == 0 {
            return Ok(Vec::new());
        }

        let mut papers: Vec<Paper> = Vec::new();
        for page in 1..=MAX_PAGES {
            if page > 1 {
                http::jitter(self.request_delay_ms).await;
            }
            let works = match self.fetch_page(query, page).await {
                Ok(works) => works,
                Err(err) if page == 1 => return Err(err),
                Err(err) => {
                    tracing::warn!(page, error = %err, "OpenAlex paging stopped early");
                    break;
                }
            };

            let page_len = works.len();
            for work in works {
                if papers.len() >= request.max_results {
                    break;
                }
                if let Some(paper) = to_paper(work) {
                    papers.push(paper);
                }
            }
            if papers.len() >= request.max_results || page_len < PER_PAGE {
                break;
            }
        }

        papers.sort_by(|a, b| b.citation_count.cmp(&a.citation_count));
        papers.truncate(request.max_results);
        tracing::debug!(count = papers.len(), "OpenAlex papers collected");
        Ok(papers)
    }
}

/// Convert a work, dropping it if no location has a PDF link.
fn to_paper(work: Work) -> Option<Paper> {
    let pdf_url = work
        .locations
        .iter()
        .filter_map(|loc| loc.pdf_url.as_deref())
        .map(str::trim)
        .find(|url| !url.is_empty())?
        .to_owned();

    let authors = work
        .authorships
        .iter()
        .map(|a| {
            a.author
                .as_ref()
                .and_then(|n| n.display_name.as_deref())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join(", ")
        .trim()
        .to_owned();

    let venue = work
        .primary_location
        .as_ref()
        .and_then(|loc| loc.source.as_ref())
        .and_then(|s| s.display_name.clone())
        .unwrap_or_default();

    Some(Paper {
        title: work.title.unwrap_or_default(),
        authors,
        year: work.publication_year,
        venue,
        citation_count: work.cited_by_count.unwrap_or(0),
        is_open_access: work.open_access.is_some_and(|oa| oa.is_oa),
        main_url: work.id.unwrap_or_default(),
        pdf_url,
    })
}
