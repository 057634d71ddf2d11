//! Page navigation
//!
//! This module defines the browser seam the traversal controller drives and
//! an HTTP-backed implementation of it:
//! - Building the HTTP client with the configured user agent
//! - Loading a page and keeping its source for element lookups
//! - Element lookup by class, link text and XPath
//! - Error classification (rate limited, not found, other status, network)
//! - Saving page snapshots for diagnosing layout drift

use crate::config::SourceConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use std::path::Path;
use sxd_document::{dom, Package};
use sxd_xpath::nodeset::Node;
use sxd_xpath::{Context, Factory, Value, XPath};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors raised while loading or inspecting a page
#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("Rate limited while loading {url}")]
    RateLimited { url: String },

    #[error("Page not found: {url}")]
    NotFound { url: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("No page has been loaded")]
    NoPage,

    #[error("Invalid XPath expression {expr}: {message}")]
    XPath { expr: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One element found on the current page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageElement {
    /// Serialized element, including its own tag
    pub outer_html: String,

    /// Concatenated text content
    pub text: String,

    /// Absolute link target, for anchors
    pub href: Option<String>,
}

/// Browser seam used by the traversal controller
///
/// One page is loaded at a time; every lookup runs against the page loaded
/// by the last successful `navigate`.
#[async_trait]
pub trait Browser: Send {
    /// Loads a page
    async fn navigate(&mut self, url: &str) -> Result<(), NavigationError>;

    /// URL of the loaded page
    fn current_url(&self) -> Option<String>;

    /// Elements carrying the given class
    fn find_elements_by_class(&self, class_name: &str) -> Result<Vec<PageElement>, NavigationError>;

    /// Anchors whose trimmed text equals `text`
    fn find_elements_by_link_text(&self, text: &str) -> Result<Vec<PageElement>, NavigationError>;

    /// Elements matching an XPath expression
    fn find_elements_by_xpath(&self, expr: &str) -> Result<Vec<PageElement>, NavigationError>;

    /// Source of the loaded page
    fn page_source(&self) -> Result<String, NavigationError>;

    /// Saves a snapshot of the loaded page
    fn screenshot(&self, path: &Path) -> Result<(), NavigationError>;
}

/// Builds an HTTP client for page and media requests
///
/// # Arguments
///
/// * `config` - The source configuration (user agent, timeout)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &SourceConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

#[derive(Debug, Clone)]
struct LoadedPage {
    url: Url,
    source: String,
}

/// Browser implementation that loads server-rendered pages over HTTP
pub struct HttpNavigator {
    client: Client,
    page: Option<LoadedPage>,
}

impl HttpNavigator {
    pub fn new(client: Client) -> Self {
        Self { client, page: None }
    }

    /// Installs a page without fetching it
    pub fn with_page(client: Client, url: &str, source: &str) -> Result<Self, NavigationError> {
        let url = Url::parse(url).map_err(|e| NavigationError::Network {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            client,
            page: Some(LoadedPage {
                url,
                source: source.to_string(),
            }),
        })
    }

    fn loaded(&self) -> Result<&LoadedPage, NavigationError> {
        self.page.as_ref().ok_or(NavigationError::NoPage)
    }

    /// Collects the elements matched by a CSS selector that pass `keep`
    fn select_elements<F>(&self, css: &str, mut keep: F) -> Result<Vec<PageElement>, NavigationError>
    where
        F: FnMut(&ElementRef<'_>) -> bool,
    {
        let page = self.loaded()?;
        let document = Html::parse_document(&page.source);
        let mut found = Vec::new();

        if let Ok(selector) = Selector::parse(css) {
            for element in document.select(&selector) {
                if keep(&element) {
                    found.push(to_page_element(&element, &page.url));
                }
            }
        }

        Ok(found)
    }
}

#[async_trait]
impl Browser for HttpNavigator {
    async fn navigate(&mut self, url: &str) -> Result<(), NavigationError> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                let message = if e.is_timeout() {
                    "Request timeout".to_string()
                } else if e.is_connect() {
                    "Connection refused".to_string()
                } else {
                    e.to_string()
                };
                return Err(NavigationError::Network {
                    url: url.to_string(),
                    message,
                });
            }
        };

        let status = response.status();
        let final_url = response.url().clone();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(NavigationError::RateLimited {
                url: url.to_string(),
            });
        }

        let source = response
            .text()
            .await
            .map_err(|e| NavigationError::Network {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        // Keep error pages loaded so their banner can be inspected
        self.page = Some(LoadedPage {
            url: final_url,
            source,
        });

        if status == StatusCode::NOT_FOUND {
            return Err(NavigationError::NotFound {
                url: url.to_string(),
            });
        }

        if !status.is_success() {
            return Err(NavigationError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        tracing::trace!("Loaded {}", url);
        Ok(())
    }

    fn current_url(&self) -> Option<String> {
        self.page.as_ref().map(|p| p.url.to_string())
    }

    fn find_elements_by_class(&self, class_name: &str) -> Result<Vec<PageElement>, NavigationError> {
        self.select_elements(&format!(".{}", class_name), |_| true)
    }

    fn find_elements_by_link_text(&self, text: &str) -> Result<Vec<PageElement>, NavigationError> {
        self.select_elements("a", |element| {
            element.text().collect::<String>().trim() == text
        })
    }

    fn find_elements_by_xpath(&self, expr: &str) -> Result<Vec<PageElement>, NavigationError> {
        let page = self.loaded()?;
        let xpath = compile_xpath(expr)?;

        let document = Html::parse_document(&page.source);
        let package = Package::new();
        let mirror = package.as_document();
        let mut copies = Vec::new();
        let html = mirror_element(&mirror, document.root_element(), &mut copies);
        mirror.root().append_child(html);

        let value = xpath
            .evaluate(&Context::new(), mirror.root())
            .map_err(|e| NavigationError::XPath {
                expr: expr.to_string(),
                message: e.to_string(),
            })?;

        let Value::Nodeset(nodes) = value else {
            return Ok(Vec::new());
        };

        Ok(nodes
            .document_order()
            .into_iter()
            .filter_map(|node| match node {
                Node::Element(element) => copies
                    .iter()
                    .find(|(copy, _)| *copy == element)
                    .map(|(_, source)| to_page_element(source, &page.url)),
                _ => None,
            })
            .collect())
    }

    fn page_source(&self) -> Result<String, NavigationError> {
        Ok(self.loaded()?.source.clone())
    }

    fn screenshot(&self, path: &Path) -> Result<(), NavigationError> {
        let page = self.loaded()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &page.source)?;
        Ok(())
    }
}

fn to_page_element(element: &ElementRef<'_>, base: &Url) -> PageElement {
    PageElement {
        outer_html: element.html(),
        text: element.text().collect(),
        href: element
            .value()
            .attr("href")
            .and_then(|href| base.join(href.trim()).ok())
            .map(|url| url.to_string()),
    }
}

/// Compiles an XPath expression
///
/// # Returns
///
/// * `Ok(XPath)` - The compiled expression
/// * `Err(NavigationError::XPath)` - The expression is empty or malformed
pub fn compile_xpath(expr: &str) -> Result<XPath, NavigationError> {
    let invalid = |message: String| NavigationError::XPath {
        expr: expr.to_string(),
        message,
    };
    Factory::new()
        .build(expr)
        .map_err(|e| invalid(e.to_string()))?
        .ok_or_else(|| invalid("empty expression".to_string()))
}

/// Copies an HTML element and its subtree into an XPath-queryable document
///
/// Elements are created without a namespace so plain `//tag` steps match.
/// Every copy is paired with its source element in `copies`.
fn mirror_element<'d, 'a>(
    mirror: &dom::Document<'d>,
    source: ElementRef<'a>,
    copies: &mut Vec<(dom::Element<'d>, ElementRef<'a>)>,
) -> dom::Element<'d> {
    let element = mirror.create_element(source.value().name());
    for (name, value) in source.value().attrs() {
        element.set_attribute_value(name, value);
    }

    for child in source.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            let copy = mirror_element(mirror, child_element, copies);
            element.append_child(copy);
        } else if let Some(text) = child.value().as_text() {
            element.append_child(mirror.create_text(text));
        }
    }

    copies.push((element, source));
    element
}
