/// File-based route registry
///
/// API endpoints are laid out as a directory tree: each directory that holds
/// a `route` file (e.g. `crm/contacts/[id]/route.rs`) is one endpoint, and
/// its path relative to the root is the URL pattern. Dynamic segments use
/// brackets:
///
/// | Directory segment | Pattern segment | axum path segment |
/// |-------------------|-----------------|-------------------|
/// | `videos`          | `videos`        | `videos`          |
/// | `[id]`            | `:id`           | `:id`             |
/// | `[...path]`       | `:path{.+}`     | `*path`           |
///
/// Handlers can't be loaded from files at runtime, so each endpoint's
/// handlers are declared in a [`RouteCatalog`] keyed by the same relative
/// directory. Discovery walks the tree and looks every `route` file up in the
/// catalog; the catalog's own keys double as the static manifest used when no
/// directory is scanned.
///
/// # Example
///
/// ```no_run
/// use axum::Router;
/// use reelforge_api::registry::{RouteCatalog, RouteModule, RouteRegistry};
///
/// # fn example() -> Result<(), reelforge_api::registry::RegistryError> {
/// let catalog = RouteCatalog::new()
///     .with("videos", RouteModule::new().get(|| async { "all videos" }))
///     .with("videos/[id]", RouteModule::new().get(|| async { "one video" }));
///
/// let registry = RouteRegistry::discover("src/routes/api", catalog)?;
/// let app: Router = registry.router();
/// # Ok(())
/// # }
/// ```

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use axum::{
    handler::Handler,
    routing::{on, MethodFilter, MethodRouter},
    Router,
};

/// File stem that marks an endpoint directory
pub const ROUTE_FILE_STEM: &str = "route";

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Failed to scan routes directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid route segment `{segment}` in `{dir}`")]
    InvalidSegment { dir: String, segment: String },
}

/// Methods a route module can export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 5] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }

    fn filter(&self) -> MethodFilter {
        match self {
            HttpMethod::Get => MethodFilter::GET,
            HttpMethod::Post => MethodFilter::POST,
            HttpMethod::Put => MethodFilter::PUT,
            HttpMethod::Delete => MethodFilter::DELETE,
            HttpMethod::Patch => MethodFilter::PATCH,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handlers exported by one endpoint directory
pub struct RouteModule<S = ()> {
    exports: Vec<(HttpMethod, MethodRouter<S>)>,
}

impl<S> Clone for RouteModule<S> {
    fn clone(&self) -> Self {
        Self {
            exports: self.exports.clone(),
        }
    }
}

impl<S> fmt::Debug for RouteModule<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteModule")
            .field("methods", &self.methods().collect::<Vec<_>>())
            .finish()
    }
}

impl<S> Default for RouteModule<S> {
    fn default() -> Self {
        Self { exports: Vec::new() }
    }
}

impl<S> RouteModule<S> {
    /// Exported methods, in export order
    pub fn methods(&self) -> impl Iterator<Item = HttpMethod> + '_ {
        self.exports.iter().map(|(method, _)| *method)
    }

    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }
}

impl<S> RouteModule<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Exports `handler` for `method`, replacing an earlier export of the same method
    pub fn export<H, T>(mut self, method: HttpMethod, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.exports.retain(|(existing, _)| *existing != method);
        self.exports.push((method, on(method.filter(), handler)));
        self
    }

    pub fn get<H, T>(self, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.export(HttpMethod::Get, handler)
    }

    pub fn post<H, T>(self, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.export(HttpMethod::Post, handler)
    }

    pub fn put<H, T>(self, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.export(HttpMethod::Put, handler)
    }

    pub fn delete<H, T>(self, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.export(HttpMethod::Delete, handler)
    }

    pub fn patch<H, T>(self, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.export(HttpMethod::Patch, handler)
    }
}

/// Route modules keyed by relative directory (`""` is the root)
pub struct RouteCatalog<S = ()> {
    modules: BTreeMap<String, RouteModule<S>>,
}

impl<S> Clone for RouteCatalog<S> {
    fn clone(&self) -> Self {
        Self {
            modules: self.modules.clone(),
        }
    }
}

impl<S> fmt::Debug for RouteCatalog<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.modules.iter()).finish()
    }
}

impl<S> Default for RouteCatalog<S> {
    fn default() -> Self {
        Self {
            modules: BTreeMap::new(),
        }
    }
}

fn normalize_dir(dir: &str) -> String {
    dir.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

impl<S> RouteCatalog<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, dir: &str, module: RouteModule<S>) -> Self {
        self.insert(dir, module);
        self
    }

    pub fn insert(&mut self, dir: &str, module: RouteModule<S>) {
        self.modules.insert(normalize_dir(dir), module);
    }

    pub fn get(&self, dir: &str) -> Option<&RouteModule<S>> {
        self.modules.get(&normalize_dir(dir))
    }

    /// Declared directories
    pub fn dirs(&self) -> impl Iterator<Item = &str> + '_ {
        self.modules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// One segment of a route pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Static(String),
    /// `[name]`: exactly one path segment
    Param(String),
    /// `[...name]`: one or more trailing segments
    CatchAll(String),
}

/// URL pattern derived from an endpoint directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    segments: Vec<Segment>,
}

fn is_param_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl RoutePattern {
    /// Translates a relative directory like `crm/contacts/[id]`
    pub fn from_dir(dir: &str) -> Result<Self, RegistryError> {
        let invalid = |segment: &str| RegistryError::InvalidSegment {
            dir: dir.to_string(),
            segment: segment.to_string(),
        };

        let raw: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
        let mut segments = Vec::with_capacity(raw.len());

        for (i, part) in raw.iter().copied().enumerate() {
            let segment = match part.strip_prefix('[').and_then(|p| p.strip_suffix(']')) {
                Some(inner) => match inner.strip_prefix("...") {
                    Some(name) if is_param_name(name) && i == raw.len() - 1 => {
                        Segment::CatchAll(name.to_string())
                    }
                    Some(_) => return Err(invalid(part)),
                    None if is_param_name(inner) => Segment::Param(inner.to_string()),
                    None => return Err(invalid(part)),
                },
                None if part.contains(&['[', ']', ':', '*'][..]) => return Err(invalid(part)),
                None => Segment::Static(part.to_string()),
            };
            segments.push(segment);
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Path string for `axum::Router::route`
    pub fn axum_path(&self) -> String {
        self.render(|segment| match segment {
            Segment::Static(s) => s.clone(),
            Segment::Param(name) => format!(":{}", name),
            Segment::CatchAll(name) => format!("*{}", name),
        })
    }

    /// Shape of the pattern with parameter names erased
    ///
    /// `/videos/:id` and `/videos/:slug` share a key; only one of them can be routed.
    pub fn structural_key(&self) -> String {
        self.render(|segment| match segment {
            Segment::Static(s) => s.clone(),
            Segment::Param(_) => ":".to_string(),
            Segment::CatchAll(_) => "*".to_string(),
        })
    }

    fn render(&self, segment: impl Fn(&Segment) -> String) -> String {
        if self.segments.is_empty() {
            return "/".to_string();
        }
        self.segments.iter().map(|s| format!("/{}", segment(s))).collect()
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self.render(|segment| match segment {
            Segment::Static(s) => s.clone(),
            Segment::Param(name) => format!(":{}", name),
            Segment::CatchAll(name) => format!(":{}{{.+}}", name),
        });
        f.write_str(&rendered)
    }
}

/// A registered (method, pattern, handler) triple
pub struct RouteDescriptor<S = ()> {
    pub method: HttpMethod,
    pub pattern: RoutePattern,

    /// Directory the handler came from
    pub module: String,

    handler: MethodRouter<S>,
}

impl<S> Clone for RouteDescriptor<S> {
    fn clone(&self) -> Self {
        Self {
            method: self.method,
            pattern: self.pattern.clone(),
            module: self.module.clone(),
            handler: self.handler.clone(),
        }
    }
}

impl<S> fmt::Debug for RouteDescriptor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("method", &self.method)
            .field("pattern", &self.pattern.to_string())
            .field("module", &self.module)
            .finish()
    }
}

/// Recursively finds `route` files under `root`, longest full path first
///
/// Ties are broken lexicographically so the order is stable. Only an
/// unreadable `root` is an error; subdirectories or entries that can't be
/// read are logged and skipped. Symlinked directories are not followed.
pub fn discover_route_files(root: &Path) -> Result<Vec<PathBuf>, RegistryError> {
    scan_route_files(root, &|dir: &Path| fs::read_dir(dir))
}

type ReadDirFn<'a> = dyn Fn(&Path) -> io::Result<fs::ReadDir> + 'a;

fn scan_route_files(root: &Path, read_dir: &ReadDirFn<'_>) -> Result<Vec<PathBuf>, RegistryError> {
    fn walk(dir: &Path, entries: fs::ReadDir, found: &mut Vec<PathBuf>, read_dir: &ReadDirFn<'_>) {
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(path = %dir.display(), error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };

            let path = entry.path();
            match entry.file_type() {
                Ok(kind) if kind.is_dir() => match read_dir(&path) {
                    Ok(children) => walk(&path, children, found, read_dir),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable route directory")
                    }
                },
                Ok(_) if path.file_stem().and_then(|s| s.to_str()) == Some(ROUTE_FILE_STEM) => found.push(path),
                Ok(_) => {}
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable directory entry"),
            }
        }
    }

    let entries = read_dir(root).map_err(|source| RegistryError::Io {
        path: root.to_path_buf(),
        source,
    })?;

    let mut found = Vec::new();
    walk(root, entries, &mut found, read_dir);

    found.sort_by(|a, b| {
        let (a_len, b_len) = (a.as_os_str().len(), b.as_os_str().len());
        b_len.cmp(&a_len).then_with(|| a.cmp(b))
    });
    Ok(found)
}

/// Relative directory of a route file, `/`-joined; `None` for non-UTF-8 paths
fn relative_dir(root: &Path, file: &Path) -> Option<String> {
    let dir = file.parent()?.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = dir.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}

/// Where the registry's endpoint list comes from
#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    Manifest,
    Directory(PathBuf),
}

/// Registered routes and the catalog they were built from
pub struct RouteRegistry<S = ()> {
    catalog: RouteCatalog<S>,
    source: Source,
    descriptors: Vec<RouteDescriptor<S>>,
}

impl<S> fmt::Debug for RouteRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteRegistry")
            .field("source", &self.source)
            .field("descriptors", &self.descriptors)
            .finish()
    }
}

impl<S> RouteRegistry<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Registers every catalog entry without touching the filesystem
    pub fn from_manifest(catalog: RouteCatalog<S>) -> Self {
        let mut registry = Self {
            catalog,
            source: Source::Manifest,
            descriptors: Vec::new(),
        };
        registry.register_manifest();
        registry
    }

    /// Registers the `route` files found under `root`
    pub fn discover(root: impl Into<PathBuf>, catalog: RouteCatalog<S>) -> Result<Self, RegistryError> {
        let mut registry = Self {
            catalog,
            source: Source::Directory(root.into()),
            descriptors: Vec::new(),
        };
        registry.refresh()?;
        Ok(registry)
    }

    /// Rebuilds the route table from scratch; returns the number of descriptors
    pub fn refresh(&mut self) -> Result<usize, RegistryError> {
        self.descriptors.clear();

        match self.source.clone() {
            Source::Manifest => self.register_manifest(),
            Source::Directory(root) => {
                let files = discover_route_files(&root)?;
                let mut seen = HashSet::new();

                for file in files {
                    let Some(dir) = relative_dir(&root, &file) else {
                        tracing::warn!(file = %file.display(), "Skipping route file with non UTF-8 path");
                        continue;
                    };
                    self.register_dir(&dir, &mut seen);
                }
            }
        }

        tracing::debug!(routes = self.descriptors.len(), "Route table rebuilt");
        Ok(self.descriptors.len())
    }

    fn register_manifest(&mut self) {
        let mut dirs: Vec<String> = self.catalog.dirs().map(str::to_string).collect();
        dirs.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let mut seen = HashSet::new();
        for dir in dirs {
            self.register_dir(&dir, &mut seen);
        }
    }

    fn register_dir(&mut self, dir: &str, seen: &mut HashSet<String>) {
        let Some(module) = self.catalog.get(dir) else {
            tracing::warn!(dir, "No route module registered for route file, skipping");
            return;
        };

        if module.is_empty() {
            tracing::debug!(dir, "Route module exports no handlers");
            return;
        }

        let pattern = match RoutePattern::from_dir(dir) {
            Ok(pattern) => pattern,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping route");
                return;
            }
        };

        if !seen.insert(pattern.structural_key()) {
            tracing::warn!(dir, pattern = %pattern, "Route pattern already registered, skipping");
            return;
        }

        for (method, handler) in &module.exports {
            tracing::debug!(method = %method, pattern = %pattern, "Registered route");
            self.descriptors.push(RouteDescriptor {
                method: *method,
                pattern: pattern.clone(),
                module: dir.to_string(),
                handler: handler.clone(),
            });
        }
    }

    pub fn descriptors(&self) -> &[RouteDescriptor<S>] {
        &self.descriptors
    }

    /// Builds an axum router with one route per pattern
    pub fn router(&self) -> Router<S> {
        let mut by_path: Vec<(String, MethodRouter<S>)> = Vec::new();

        for descriptor in &self.descriptors {
            let path = descriptor.pattern.axum_path();
            match by_path.iter_mut().find(|(p, _)| *p == path) {
                Some((_, existing)) => {
                    let merged = std::mem::take(existing).merge(descriptor.handler.clone());
                    *existing = merged;
                }
                None => by_path.push((path, descriptor.handler.clone())),
            }
        }

        by_path
            .into_iter()
            .fold(Router::new(), |router, (path, handler)| router.route(&path, handler))
    }
}
