//! Read-only view of a built bundle.

use std::collections::BTreeMap;
use std::io::{self, Cursor, Read};

/// Manifest header carrying the bundle symbolic name.
pub const BUNDLE_SYMBOLIC_NAME: &str = "Bundle-SymbolicName";

/// Manifest header listing the component descriptors.
pub const SERVICE_COMPONENT: &str = "Service-Component";

/// What the verifier needs to know about a built bundle.
///
/// Implemented by whatever owns the built artifact (an archive reader, a
/// build tool's analyzer, or [`MemoryBundle`]). The verifier only reads
/// through this trait and never mutates the bundle.
pub trait BundleView {
    /// Fully qualified names of the exported packages.
    fn exported_packages(&self) -> Vec<String>;

    /// Value of a manifest header, if present.
    fn header(&self, name: &str) -> Option<String>;

    /// Archive-internal paths of every embedded resource.
    ///
    /// The order returned here is the order wildcard matches are visited.
    fn resource_paths(&self) -> Vec<String>;

    /// Opens a resource for reading.
    ///
    /// Returns `Ok(None)` if no resource exists at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource exists but cannot be opened.
    fn open_resource(&self, path: &str) -> io::Result<Option<Box<dyn Read + '_>>>;
}

/// A bundle held entirely in memory.
///
/// Resources are indexed by path in sorted order.
#[derive(Debug, Clone, Default)]
pub struct MemoryBundle {
    exports: Vec<String>,
    headers: BTreeMap<String, String>,
    resources: BTreeMap<String, Vec<u8>>,
}

impl MemoryBundle {
    /// Creates an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an exported package.
    #[must_use]
    pub fn export(mut self, package: impl Into<String>) -> Self {
        self.exports.push(package.into());
        self
    }

    /// Adds several exported packages.
    #[must_use]
    pub fn exports<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exports.extend(packages.into_iter().map(Into::into));
        self
    }

    /// Sets a manifest header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Adds or replaces a resource.
    #[must_use]
    pub fn resource(mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.resources.insert(path.into(), content.into());
        self
    }
}

impl BundleView for MemoryBundle {
    fn exported_packages(&self) -> Vec<String> {
        self.exports.clone()
    }

    fn header(&self, name: &str) -> Option<String> {
        self.headers.get(name).cloned()
    }

    fn resource_paths(&self) -> Vec<String> {
        self.resources.keys().cloned().collect()
    }

    fn open_resource(&self, path: &str) -> io::Result<Option<Box<dyn Read + '_>>> {
        Ok(self
            .resources
            .get(path)
            .map(|bytes| Box::new(Cursor::new(bytes.as_slice())) as Box<dyn Read + '_>))
    }
}
