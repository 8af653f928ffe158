//! Registry document model
//!
//! A generic, owned element tree with no knowledge of what the elements mean.
//! Paths passed to [`Element::find_all`] use the `parent/child` form of the
//! registry layout (for example `extensions/extension`).

use std::path::Path;

use crate::error::{RegistryError, Result};
use crate::libxml2::LibXml2Wrapper;

/// One element of the registry document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub(crate) fn push_attribute(&mut self, name: String, value: String) {
        self.attributes.push((name, value));
    }

    pub(crate) fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub(crate) fn push_child(&mut self, child: Element) {
        self.children.push(child);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Direct text content (whitespace-only runs dropped), trimmed
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a Element> + use<'a, 'n> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text of the first child with the given name
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(Element::text)
    }

    /// All descendants reached by following `path` one level per segment,
    /// in document order.
    pub fn find_all<'a>(&'a self, path: &str) -> Vec<&'a Element> {
        let mut current = vec![self];
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = current
                .into_iter()
                .flat_map(|e| e.children.iter().filter(move |c| c.name == segment))
                .collect();
        }
        current
    }
}

/// A loaded API registry
#[derive(Debug, Clone)]
pub struct Registry {
    source: String,
    root: Element,
}

impl Registry {
    /// Load and parse a registry file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RegistryError::InputNotFound {
                path: path.to_path_buf(),
            },
            _ => RegistryError::Io(e),
        })?;
        Self::from_bytes(&data, &path.display().to_string())
    }

    /// Parse a registry held in memory; `source` labels error messages.
    pub fn from_bytes(data: &[u8], source: &str) -> Result<Self> {
        let root = LibXml2Wrapper::new().parse_document(data, source)?;
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn parse(xml: &str) -> Result<Self> {
        Self::from_bytes(xml.as_bytes(), "<memory>")
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn find_all(&self, path: &str) -> Vec<&Element> {
        self.root.find_all(path)
    }
}

impl std::str::FromStr for Registry {
    type Err = RegistryError;

    fn from_str(xml: &str) -> Result<Self> {
        Self::parse(xml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"<registry>
        <platforms>
            <platform name="xlib" protect="VK_USE_PLATFORM_XLIB_KHR"/>
            <platform name="win32" protect="VK_USE_PLATFORM_WIN32_KHR"/>
        </platforms>
        <extensions>
            <extension name="VK_KHR_a"><require><command name="vkA"/></require></extension>
            <extension name="VK_KHR_b"><require><command name="vkB"/><type name="VkB"/></require></extension>
        </extensions>
    </registry>"#;

    #[test]
    fn test_find_all_follows_path() {
        let registry = Registry::parse(SAMPLE).unwrap();

        let platforms = registry.find_all("platforms/platform");
        assert_eq!(platforms.len(), 2);
        assert_eq!(platforms[0].attr("name"), Some("xlib"));
        assert_eq!(platforms[1].attr("protect"), Some("VK_USE_PLATFORM_WIN32_KHR"));

        let commands: Vec<_> = registry
            .find_all("extensions/extension/require/command")
            .iter()
            .filter_map(|c| c.attr("name"))
            .collect();
        assert_eq!(commands, vec!["vkA", "vkB"]);

        assert!(registry.find_all("commands/command").is_empty());
    }

    #[test]
    fn test_find_all_with_short_lived_path() {
        let registry = Registry::parse(SAMPLE).unwrap();
        let names: Vec<&str> = {
            let kind = String::from("type");
            let path = format!("extensions/extension/require/{}", kind);
            registry
                .find_all(&path)
                .into_iter()
                .filter_map(|t| t.attr("name"))
                .collect()
        };
        assert_eq!(names, vec!["VkB"]);

        let root = registry.root();
        let wanted = String::from("platforms");
        assert_eq!(root.children_named(&wanted).count(), 1);
    }

    #[test]
    fn test_missing_attribute_and_child() {
        let registry = Registry::parse(SAMPLE).unwrap();
        let platform = registry.find_all("platforms/platform")[0];

        assert_eq!(platform.attr("missing"), None);
        assert!(platform.child("anything").is_none());
        assert_eq!(platform.text(), "");
    }

    #[test]
    fn test_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(SAMPLE.as_bytes()).unwrap();

        let registry = Registry::from_file(temp_file.path()).unwrap();
        assert_eq!(registry.root().name(), "registry");
        assert!(registry.source().contains(&*temp_file.path().display().to_string()));
    }

    #[test]
    fn test_from_missing_file() {
        let result = Registry::from_file(Path::new("/nonexistent/vk.xml"));
        assert!(matches!(result, Err(RegistryError::InputNotFound { .. })));
    }

    #[test]
    fn test_from_str() {
        let registry: Registry = SAMPLE.parse().unwrap();
        assert_eq!(registry.source(), "<memory>");
        assert_eq!(registry.find_all("extensions/extension").len(), 2);
    }

    #[test]
    fn test_malformed_registry() {
        let result = Registry::parse("<registry><types>");
        assert!(matches!(result, Err(RegistryError::Load(_))));
    }
}
