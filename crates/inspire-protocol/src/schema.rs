//! Schema graph resolution.
//!
//! A WFS `DescribeFeatureType` answer is usually a stub that pulls the real
//! INSPIRE definitions in through `xs:include`/`xs:import`. The resolver walks
//! that graph breadth-first under a document budget and flattens the fields
//! of the requested feature type.
//!
//! Every referenced location is resolved against the referencing document,
//! stripped of its fragment and recorded in the arena before it is queued,
//! so each document is fetched at most once even in cyclic graphs.

use async_trait::async_trait;
use catastro_common::CatastroError;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::xml::local_part;
use crate::xsd::{parse_schema_document, ComplexTypeDef, GlobalElement, SchemaDocument, XsdError};

/// Failure to retrieve one schema document.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct FetchError {
    pub message: String,
    /// Typed upstream failure behind the message, when there is one.
    pub upstream: Option<CatastroError>,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            upstream: None,
        }
    }
}

impl From<CatastroError> for FetchError {
    fn from(err: CatastroError) -> Self {
        Self {
            message: err.to_string(),
            upstream: Some(err),
        }
    }
}

/// Source of schema documents.
#[async_trait]
pub trait SchemaFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

/// Stable arena index of a document within one resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocId(pub usize);

/// Per-document outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceInfo {
    pub url: String,
    pub bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A flattened field of the requested type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaField {
    pub name: String,
    pub type_name: Option<String>,
}

/// Result of a resolution, complete or partial.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedSchema {
    pub type_name: String,
    /// Whether a declaration for the requested type was found.
    pub type_found: bool,
    /// Field name → declared type, derived type fields first.
    pub fields: Vec<SchemaField>,
    /// Every document URL discovered, in discovery order (root first).
    pub visited: Vec<String>,
    /// Include/import URLs fetched beyond the root.
    pub includes_followed: Vec<String>,
    /// References that could not be fetched or parsed.
    pub unreachable: Vec<String>,
    /// Discovered but not fetched when the budget ran out.
    pub pending: Vec<String>,
    pub sources: Vec<SourceInfo>,
    pub elements: BTreeSet<String>,
    pub complex_types: BTreeSet<String>,
    pub attributes: BTreeSet<String>,
}

impl ResolvedSchema {
    pub fn is_complete(&self) -> bool {
        self.unreachable.is_empty() && self.pending.is_empty()
    }

    /// Declared type of a field, if the field exists.
    pub fn field_type(&self, name: &str) -> Option<Option<&str>> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.type_name.as_deref())
    }
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid schema URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("failed to fetch root schema {url}: {message}")]
    Fetch {
        url: String,
        message: String,
        upstream: Option<CatastroError>,
    },

    #[error("root schema {url} is unusable: {source}")]
    Parse {
        url: String,
        #[source]
        source: XsdError,
    },

    #[error(
        "schema resolution for {} incomplete: {} unreachable, {} pending",
        .0.type_name,
        .0.unreachable.len(),
        .0.pending.len()
    )]
    Incomplete(Box<ResolvedSchema>),
}

impl SchemaError {
    /// Recover the partial result of a soft failure.
    pub fn into_partial(self) -> Result<ResolvedSchema, SchemaError> {
        match self {
            SchemaError::Incomplete(partial) => Ok(*partial),
            other => Err(other),
        }
    }
}

impl From<SchemaError> for CatastroError {
    fn from(err: SchemaError) -> Self {
        match err {
            // Rate limiting and outages on the root stay distinguishable.
            SchemaError::Fetch {
                upstream:
                    Some(
                        e @ (CatastroError::RateLimited { .. } | CatastroError::UpstreamUnavailable { .. }),
                    ),
                ..
            } => e,
            SchemaError::InvalidUrl { url, message } | SchemaError::Fetch { url, message, .. } => {
                CatastroError::SchemaFetchError { url, message }
            }
            SchemaError::Parse { url, source } => CatastroError::SchemaFetchError {
                url,
                message: source.to_string(),
            },
            SchemaError::Incomplete(partial) => CatastroError::SchemaResolutionIncomplete {
                message: format!(
                    "{} unreachable, {} pending",
                    partial.unreachable.len(),
                    partial.pending.len()
                ),
                type_name: partial.type_name,
            },
        }
    }
}

/// Arena of documents for one resolution call.
struct SchemaGraph {
    urls: Vec<Url>,
    index: HashMap<Url, DocId>,
    documents: Vec<Option<SchemaDocument>>,
    queue: VecDeque<DocId>,
    budget_remaining: usize,
    sources: Vec<SourceInfo>,
    followed: Vec<String>,
    unreachable: Vec<String>,
}

impl SchemaGraph {
    fn new(budget: usize) -> Self {
        Self {
            urls: Vec::new(),
            index: HashMap::new(),
            documents: Vec::new(),
            queue: VecDeque::new(),
            budget_remaining: budget,
            sources: Vec::new(),
            followed: Vec::new(),
            unreachable: Vec::new(),
        }
    }

    /// Add a URL to the arena; `None` if it was already visited.
    fn insert(&mut self, mut url: Url) -> Option<DocId> {
        url.set_fragment(None);
        if self.index.contains_key(&url) {
            return None;
        }
        let id = DocId(self.urls.len());
        self.index.insert(url.clone(), id);
        self.urls.push(url);
        self.documents.push(None);
        Some(id)
    }

    /// Store a parsed document and queue its unseen references.
    fn load(&mut self, id: DocId, text_len: usize, doc: SchemaDocument) {
        let base = self.urls[id.0].clone();
        self.sources.push(SourceInfo {
            url: base.to_string(),
            bytes: text_len,
            error: None,
        });

        for reference in &doc.references {
            match base.join(&reference.location) {
                Ok(url) => {
                    if let Some(child) = self.insert(url) {
                        debug!(from = %base, to = %self.urls[child.0], "queued schema reference");
                        self.queue.push_back(child);
                    }
                }
                Err(e) => {
                    warn!(from = %base, location = %reference.location, error = %e, "unresolvable schemaLocation");
                    self.fail(reference.location.clone(), 0, e.to_string());
                }
            }
        }

        self.documents[id.0] = Some(doc);
    }

    fn fail(&mut self, url: String, bytes: usize, error: String) {
        self.unreachable.push(url.clone());
        self.sources.push(SourceInfo {
            url,
            bytes,
            error: Some(error),
        });
    }

    fn loaded(&self) -> impl Iterator<Item = &SchemaDocument> {
        self.documents.iter().flatten()
    }

    fn find_element(&self, local: &str) -> Option<&GlobalElement> {
        self.loaded().find_map(|d| d.element(local))
    }

    fn find_complex_type(&self, local: &str) -> Option<&ComplexTypeDef> {
        self.loaded().find_map(|d| d.complex_type(local))
    }

    /// Complex type of the requested feature type: the type of the global
    /// element named like it, else a complex type named `<local>` or
    /// `<local>Type`.
    ///
    /// Declarations in the root document are consulted before anything
    /// pulled in through includes, so following more references never
    /// rebinds a type the root already names.
    fn root_type(&self, type_name: &str) -> Option<&ComplexTypeDef> {
        let local = local_part(type_name);
        let root = self.documents.first().and_then(Option::as_ref)?;
        let suffixed = format!("{}Type", local);

        let pinned = root
            .element(local)
            .and_then(|el| el.type_name.as_deref())
            .map(local_part)
            .or_else(|| root.complex_type(local).map(|_| local))
            .or_else(|| root.complex_type(&suffixed).map(|_| suffixed.as_str()));

        match pinned {
            Some(name) => self.find_complex_type(name),
            None => self
                .find_element(local)
                .and_then(|el| el.type_name.as_deref())
                .and_then(|t| self.find_complex_type(local_part(t)))
                .or_else(|| self.find_complex_type(local))
                .or_else(|| self.find_complex_type(&suffixed)),
        }
    }

    fn extract_fields(&self, type_name: &str) -> (bool, Vec<SchemaField>) {
        let mut fields = Vec::new();
        let mut names = HashSet::new();
        let mut seen_types = HashSet::new();

        let root = self.root_type(type_name);
        let found = root.is_some();
        let mut current = root;

        while let Some(ct) = current {
            if !seen_types.insert(local_part(&ct.name).to_string()) {
                break;
            }
            for decl in &ct.fields {
                let declared = match &decl.reference {
                    Some(r) => self
                        .find_element(local_part(r))
                        .and_then(|el| el.type_name.clone()),
                    None => decl.type_name.clone(),
                };
                if names.insert(decl.name.clone()) {
                    fields.push(SchemaField {
                        name: decl.name.clone(),
                        type_name: declared,
                    });
                }
            }
            current = ct
                .base
                .as_deref()
                .and_then(|b| self.find_complex_type(local_part(b)));
        }

        (found, fields)
    }

    fn finish(self, type_name: &str) -> ResolvedSchema {
        let (type_found, fields) = self.extract_fields(type_name);

        let mut elements = BTreeSet::new();
        let mut complex_types = BTreeSet::new();
        let mut attributes = BTreeSet::new();
        for doc in self.loaded() {
            elements.extend(doc.element_names.iter().cloned());
            complex_types.extend(doc.complex_type_names.iter().cloned());
            attributes.extend(doc.attribute_names.iter().cloned());
        }

        let pending = self
            .queue
            .iter()
            .map(|id| self.urls[id.0].to_string())
            .collect();

        ResolvedSchema {
            type_name: type_name.to_string(),
            type_found,
            fields,
            visited: self.urls.iter().map(Url::to_string).collect(),
            includes_followed: self.followed,
            unreachable: self.unreachable,
            pending,
            sources: self.sources,
            elements,
            complex_types,
            attributes,
        }
    }
}

/// Resolve the fields of `type_name` starting at `root_url`.
///
/// At most `max_includes` documents are fetched beyond the root. Returns
/// [`SchemaError::Incomplete`] carrying the partial result when the budget
/// ran out first or a referenced document could not be loaded.
#[instrument(skip(fetcher), fields(root = %root_url))]
pub async fn resolve<F>(
    fetcher: &F,
    root_url: &str,
    type_name: &str,
    max_includes: usize,
) -> Result<ResolvedSchema, SchemaError>
where
    F: SchemaFetcher + ?Sized,
{
    let root = Url::parse(root_url).map_err(|e| SchemaError::InvalidUrl {
        url: root_url.to_string(),
        message: e.to_string(),
    })?;

    let text = fetcher.fetch(&root).await.map_err(|e| SchemaError::Fetch {
        url: root_url.to_string(),
        message: e.message,
        upstream: e.upstream,
    })?;
    let doc = parse_schema_document(&text).map_err(|source| SchemaError::Parse {
        url: root_url.to_string(),
        source,
    })?;

    let mut graph = SchemaGraph::new(max_includes);
    // The arena is empty, so insertion always succeeds.
    let root_id = graph.insert(root).unwrap_or(DocId(0));
    graph.load(root_id, text.len(), doc);

    while graph.budget_remaining > 0 {
        let Some(id) = graph.queue.pop_front() else {
            break;
        };
        graph.budget_remaining -= 1;

        let url = graph.urls[id.0].clone();
        graph.followed.push(url.to_string());

        match fetcher.fetch(&url).await {
            Ok(text) => match parse_schema_document(&text) {
                Ok(doc) => graph.load(id, text.len(), doc),
                Err(e) => {
                    warn!(url = %url, error = %e, "schema document unparseable");
                    graph.fail(url.to_string(), text.len(), e.to_string());
                }
            },
            Err(e) => {
                warn!(url = %url, error = %e, "schema document unreachable");
                graph.fail(url.to_string(), 0, e.message);
            }
        }
    }

    let resolved = graph.finish(type_name);
    info!(
        type_name = %type_name,
        fields = resolved.fields.len(),
        documents = resolved.visited.len(),
        unreachable = resolved.unreachable.len(),
        pending = resolved.pending.len(),
        "schema resolution finished"
    );

    if resolved.is_complete() {
        Ok(resolved)
    } else {
        Err(SchemaError::Incomplete(Box::new(resolved)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Single(&'static str);

    #[async_trait]
    impl SchemaFetcher for Single {
        async fn fetch(&self, _url: &Url) -> Result<String, FetchError> {
            Ok(self.0.to_string())
        }
    }

    struct Failing;

    #[async_trait]
    impl SchemaFetcher for Failing {
        async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
            Err(FetchError::new(format!("connection refused: {}", url)))
        }
    }

    #[tokio::test]
    async fn test_single_document() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
            <xs:complexType name="CadastralZoningType">
              <xs:sequence><xs:element name="label" type="xs:string"/></xs:sequence>
            </xs:complexType>
          </xs:schema>"#;
        let resolved = resolve(&Single(xsd), "http://schemas.test/z.xsd", "cp:CadastralZoning", 5)
            .await
            .unwrap();
        assert!(resolved.type_found);
        assert_eq!(resolved.field_type("label"), Some(Some("xs:string")));
        assert_eq!(resolved.visited, vec!["http://schemas.test/z.xsd"]);
        assert!(resolved.includes_followed.is_empty());
    }

    #[tokio::test]
    async fn test_root_fetch_failure() {
        let err = resolve(&Failing, "http://schemas.test/root.xsd", "cp:X", 5)
            .await
            .unwrap_err();
        assert!(matches!(err, SchemaError::Fetch { .. }));
        let err: CatastroError = err.into();
        assert_eq!(err.kind(), "SchemaFetchError");
    }

    struct Limited;

    #[async_trait]
    impl SchemaFetcher for Limited {
        async fn fetch(&self, _url: &Url) -> Result<String, FetchError> {
            Err(CatastroError::RateLimited {
                service: "wfs_schema".to_string(),
                status: 429,
            }
            .into())
        }
    }

    #[tokio::test]
    async fn test_root_rate_limit_passes_through() {
        let err = resolve(&Limited, "http://schemas.test/root.xsd", "cp:X", 5)
            .await
            .unwrap_err();
        let err: CatastroError = err.into();
        assert_eq!(err.kind(), "RateLimited");
        assert_eq!(err.http_status_code(), 429);
    }

    #[tokio::test]
    async fn test_invalid_root_url() {
        let err = resolve(&Failing, "not a url", "cp:X", 5).await.unwrap_err();
        assert!(matches!(err, SchemaError::InvalidUrl { .. }));
    }
}
