//! Declarative Services component descriptor parsing.
//!
//! Only the parts the namespace rules look at are extracted: the component
//! name, the provided service interfaces and the declared properties.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{BufRead, BufReader, Read};

const COMPONENT_ELEMENT: &[u8] = b"component";
const SERVICE_ELEMENT: &[u8] = b"service";
const PROVIDE_ELEMENT: &[u8] = b"provide";
const PROPERTY_ELEMENT: &[u8] = b"property";
const NAME_ATTRIBUTE: &str = "name";
const INTERFACE_ATTRIBUTE: &str = "interface";
const VALUE_ATTRIBUTE: &str = "value";

/// Service interfaces that make a component a servlet.
pub const SERVLET_INTERFACES: &[&str] = &["javax.servlet.Servlet", "jakarta.servlet.Servlet"];

/// Service interfaces that make a component a filter.
pub const FILTER_INTERFACES: &[&str] = &["javax.servlet.Filter", "jakarta.servlet.Filter"];

/// Service interface that makes a component an authentication handler.
pub const AUTHENTICATION_HANDLER_INTERFACE: &str =
    "org.apache.sling.auth.core.spi.AuthenticationHandler";

/// Errors that make a single descriptor unusable.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum DescriptorError {
    /// The resource could not be read.
    #[error("I/O error: {0}")]
    #[diagnostic(code(nslint::descriptor::io))]
    Io(#[from] std::io::Error),

    /// The document is not well-formed XML.
    #[error("malformed XML at byte {position}: {source}")]
    #[diagnostic(code(nslint::descriptor::xml))]
    Xml {
        /// Byte offset where parsing stopped.
        position: u64,
        /// Underlying parser error.
        source: quick_xml::Error,
    },

    /// The document declares a DOCTYPE.
    #[error("DOCTYPE declarations are not allowed")]
    #[diagnostic(
        code(nslint::descriptor::doctype),
        help("component descriptors never need a DTD; remove the declaration")
    )]
    DoctypeForbidden,

    /// The document has no root element.
    #[error("document has no root element")]
    #[diagnostic(code(nslint::descriptor::no_root))]
    NoRootElement,

    /// The document ended inside an element.
    #[error("document ended before element `{element}` was closed")]
    #[diagnostic(code(nslint::descriptor::unclosed))]
    UnclosedElement {
        /// Local name of the innermost open element.
        element: String,
    },

    /// Markup follows the closing tag of the root element.
    #[error("content after the root element at byte {position}")]
    #[diagnostic(code(nslint::descriptor::trailing_content))]
    TrailingContent {
        /// Byte offset of the offending content.
        position: u64,
    },

    /// A property element has no `name` attribute.
    #[error("property in DS component must have a name")]
    #[diagnostic(code(nslint::descriptor::property_name))]
    MissingPropertyName,

    /// Text content is not valid UTF-8.
    #[error("invalid UTF-8 in text content: {0}")]
    #[diagnostic(code(nslint::descriptor::utf8))]
    Utf8(#[from] std::str::Utf8Error),
}

/// Component roles with dedicated property rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentRole {
    /// Provides a servlet interface.
    Servlet,
    /// Provides a filter interface.
    Filter,
    /// Provides the authentication handler interface.
    AuthenticationHandler,
}

impl ComponentRole {
    /// Returns the interfaces that confer this role.
    #[must_use]
    pub fn interfaces(self) -> &'static [&'static str] {
        match self {
            Self::Servlet => SERVLET_INTERFACES,
            Self::Filter => FILTER_INTERFACES,
            Self::AuthenticationHandler => &[AUTHENTICATION_HANDLER_INTERFACE],
        }
    }
}

/// Component properties in declaration order.
///
/// Redeclaring a name replaces the earlier values in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties(Vec<(String, Vec<String>)>);

impl Properties {
    /// Creates an empty property map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the values of a property.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<String>) {
        let name = name.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = values,
            None => self.0.push((name, values)),
        }
    }

    /// Returns the values of a property, if declared.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
    }

    /// Returns true if the property is declared.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of declared properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no property is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates `(name, values)` in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }
}

/// Structural summary of one component descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDescriptor {
    /// Declared component name, or the resource path if the name is blank.
    pub name: String,
    /// Provided service interfaces across all `service` blocks.
    pub interfaces: Vec<String>,
    /// Declared properties.
    pub properties: Properties,
}

impl ComponentDescriptor {
    /// Returns true if the component provides `interface`.
    #[must_use]
    pub fn provides(&self, interface: &str) -> bool {
        self.interfaces.iter().any(|i| i == interface)
    }

    /// Returns true if the component provides any interface conferring `role`.
    #[must_use]
    pub fn has_role(&self, role: ComponentRole) -> bool {
        role.interfaces().iter().any(|i| self.provides(i))
    }
}

/// Property currently being read.
struct OpenProperty {
    name: String,
    value: Option<String>,
    text: String,
    depth: usize,
}

impl OpenProperty {
    fn from_start(
        start: &BytesStart<'_>,
        depth: usize,
        position: u64,
    ) -> Result<Self, DescriptorError> {
        let name = attribute(start, NAME_ATTRIBUTE, position)?
            .ok_or(DescriptorError::MissingPropertyName)?;
        let value = attribute(start, VALUE_ATTRIBUTE, position)?;
        Ok(Self {
            name,
            value,
            text: String::new(),
            depth,
        })
    }

    /// An explicit `value` attribute wins; otherwise every non-blank line
    /// of the text content is one value.
    fn into_entry(self) -> (String, Vec<String>) {
        let values = match self.value {
            Some(value) => vec![value],
            None => self
                .text
                .split(['\r', '\n'])
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect(),
        };
        (self.name, values)
    }
}

/// Parser for component descriptors.
///
/// External entities are never resolved, DTDs are never loaded, and
/// documents carrying a DOCTYPE are rejected outright.
#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptorParser;

impl DescriptorParser {
    /// Creates a parser.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parses a descriptor from a byte stream.
    ///
    /// Returns `Ok(None)` for a well-formed document whose root element is
    /// not `component`. Such documents are still read to the end, so a
    /// malformed one is an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream cannot be read, is not well-formed,
    /// declares a DOCTYPE, or has a property without a name.
    pub fn parse<R: Read>(
        &self,
        path: &str,
        content: R,
    ) -> Result<Option<ComponentDescriptor>, DescriptorError> {
        let mut reader = Reader::from_reader(BufReader::new(content));
        reader.config_mut().check_end_names = true;
        self.parse_reader(path, &mut reader)
    }

    /// Parses a descriptor held in a string.
    ///
    /// # Errors
    ///
    /// See [`DescriptorParser::parse`].
    pub fn parse_str(
        &self,
        path: &str,
        content: &str,
    ) -> Result<Option<ComponentDescriptor>, DescriptorError> {
        self.parse(path, content.as_bytes())
    }

    fn parse_reader<B: BufRead>(
        &self,
        path: &str,
        reader: &mut Reader<B>,
    ) -> Result<Option<ComponentDescriptor>, DescriptorError> {
        let mut buf = Vec::new();
        let mut stack: Vec<Vec<u8>> = Vec::new();
        let mut seen_root = false;
        let mut is_component = false;
        let mut root_closed = false;
        let mut service_depth = 0usize;
        let mut name = String::new();
        let mut interfaces = Vec::new();
        let mut properties = Properties::new();
        let mut open_property: Option<OpenProperty> = None;

        loop {
            buf.clear();
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|source| DescriptorError::Xml {
                    position: reader.error_position(),
                    source,
                })?;

            match event {
                Event::DocType(_) => return Err(DescriptorError::DoctypeForbidden),
                Event::Start(ref start) | Event::Empty(ref start) => {
                    let is_empty = matches!(event, Event::Empty(_));
                    let local = start.local_name().as_ref().to_vec();
                    let position = reader.buffer_position();

                    if root_closed {
                        return Err(DescriptorError::TrailingContent { position });
                    }
                    if !seen_root {
                        seen_root = true;
                        is_component = local == COMPONENT_ELEMENT;
                        root_closed = is_empty;
                        if is_component {
                            name = attribute(start, NAME_ATTRIBUTE, position)?.unwrap_or_default();
                        }
                    } else if !is_component {
                        // Other roots are only checked for well-formedness.
                    } else if local == SERVICE_ELEMENT {
                        if !is_empty {
                            service_depth += 1;
                        }
                    } else if local == PROVIDE_ELEMENT && service_depth > 0 {
                        if let Some(interface) = attribute(start, INTERFACE_ATTRIBUTE, position)? {
                            if !interface.is_empty() {
                                interfaces.push(interface);
                            }
                        }
                    } else if local == PROPERTY_ELEMENT && open_property.is_none() {
                        let property = OpenProperty::from_start(start, stack.len(), position)?;
                        if is_empty {
                            let (name, values) = property.into_entry();
                            properties.insert(name, values);
                        } else {
                            open_property = Some(property);
                        }
                    }

                    if !is_empty {
                        stack.push(local);
                    }
                }
                Event::End(_) => {
                    let local = stack.pop().unwrap_or_default();
                    root_closed = stack.is_empty();
                    if local == SERVICE_ELEMENT {
                        service_depth = service_depth.saturating_sub(1);
                    }
                    if open_property
                        .as_ref()
                        .is_some_and(|p| p.depth == stack.len())
                    {
                        if let Some(property) = open_property.take() {
                            let (name, values) = property.into_entry();
                            properties.insert(name, values);
                        }
                    }
                }
                Event::Text(text) => {
                    if root_closed && text.iter().any(|b| !b.is_ascii_whitespace()) {
                        return Err(DescriptorError::TrailingContent {
                            position: reader.buffer_position(),
                        });
                    }
                    if let Some(property) = open_property.as_mut() {
                        property.text.push_str(&text.unescape().map_err(|source| {
                            DescriptorError::Xml {
                                position: reader.buffer_position(),
                                source,
                            }
                        })?);
                    }
                }
                Event::CData(cdata) => {
                    if root_closed {
                        return Err(DescriptorError::TrailingContent {
                            position: reader.buffer_position(),
                        });
                    }
                    if let Some(property) = open_property.as_mut() {
                        property.text.push_str(std::str::from_utf8(&cdata)?);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(element) = stack.last() {
            return Err(DescriptorError::UnclosedElement {
                element: String::from_utf8_lossy(element).into_owned(),
            });
        }
        if !seen_root {
            return Err(DescriptorError::NoRootElement);
        }
        if !is_component {
            return Ok(None);
        }

        if name.trim().is_empty() {
            name = path.to_string();
        }

        Ok(Some(ComponentDescriptor {
            name,
            interfaces,
            properties,
        }))
    }
}

/// Reads and unescapes an unprefixed attribute of the element at `position`.
fn attribute(
    start: &BytesStart<'_>,
    name: &str,
    position: u64,
) -> Result<Option<String>, DescriptorError> {
    let attr = start
        .try_get_attribute(name)
        .map_err(|e| DescriptorError::Xml {
            position,
            source: e.into(),
        })?;
    attr.map(|a| {
        a.unescape_value()
            .map(std::borrow::Cow::into_owned)
            .map_err(|source| DescriptorError::Xml { position, source })
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> Result<Option<ComponentDescriptor>, DescriptorError> {
        DescriptorParser::new().parse_str("OSGI-INF/Test.xml", xml)
    }

    fn component(xml: &str) -> ComponentDescriptor {
        parse(xml).unwrap().unwrap()
    }

    #[test]
    fn extracts_name_and_interfaces() {
        let d = component(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<component xmlns="http://www.osgi.org/xmlns/scr/v1.1.0" name="MyComponent">
  <implementation class="com.mycompany.impl.MyServiceImpl"/>
  <service>
    <provide interface="com.mycompany.api.MyService"/>
    <provide interface="com.mycompany.api.Other"/>
  </service>
  <service>
    <provide interface="javax.servlet.Servlet"/>
  </service>
</component>"#,
        );
        assert_eq!(d.name, "MyComponent");
        assert_eq!(
            d.interfaces,
            [
                "com.mycompany.api.MyService",
                "com.mycompany.api.Other",
                "javax.servlet.Servlet"
            ]
        );
        assert!(d.has_role(ComponentRole::Servlet));
        assert!(!d.has_role(ComponentRole::Filter));
    }

    #[test]
    fn blank_name_falls_back_to_path() {
        let d = component(r#"<component name="  "><service/></component>"#);
        assert_eq!(d.name, "OSGI-INF/Test.xml");
        let d = component("<component/>");
        assert_eq!(d.name, "OSGI-INF/Test.xml");
    }

    #[test]
    fn prefixed_component_is_recognised() {
        let d = component(
            r#"<scr:component xmlns:scr="http://www.osgi.org/xmlns/scr/v1.3.0" name="Prefixed">
  <service><provide interface="jakarta.servlet.Filter"/></service>
</scr:component>"#,
        );
        assert_eq!(d.name, "Prefixed");
        assert!(d.has_role(ComponentRole::Filter));
    }

    #[test]
    fn provide_outside_service_is_ignored() {
        let d = component(r#"<component><provide interface="a.B"/></component>"#);
        assert!(d.interfaces.is_empty());
    }

    #[test]
    fn non_component_root_is_skipped() {
        assert!(parse(r#"<metatype:MetaData xmlns:metatype="x"/>"#).unwrap().is_none());
        assert!(parse("<components><component name=\"x\"/></components>")
            .unwrap()
            .is_none());
    }

    #[test]
    fn value_attribute_yields_single_value() {
        let d = component(
            r#"<component>
  <property name="sling.servlet.paths" value="/bin/myservlet"/>
  <property name="empty" value=""/>
</component>"#,
        );
        assert_eq!(
            d.properties.get("sling.servlet.paths"),
            Some(&["/bin/myservlet".to_string()][..])
        );
        assert_eq!(d.properties.get("empty"), Some(&[String::new()][..]));
    }

    #[test]
    fn attribute_takes_precedence_over_text() {
        let d = component(r#"<component><property name="p" value="attr">text</property></component>"#);
        assert_eq!(d.properties.get("p"), Some(&["attr".to_string()][..]));
    }

    #[test]
    fn text_content_is_split_into_lines() {
        let d = component(
            "<component>\n  <property name=\"sling.servlet.paths\" type=\"String\">\n    /bin/one\n\n    /bin/two  \r\n  </property>\n</component>",
        );
        assert_eq!(
            d.properties.get("sling.servlet.paths"),
            Some(&["/bin/one".to_string(), "/bin/two".to_string()][..])
        );
    }

    #[test]
    fn empty_property_element_without_value_has_no_values() {
        let d = component(r#"<component><property name="p"/></component>"#);
        assert_eq!(d.properties.get("p"), Some(&[][..]));
    }

    #[test]
    fn duplicate_property_last_wins() {
        let d = component(
            r#"<component><property name="p" value="a"/><property name="q" value="x"/><property name="p" value="b"/></component>"#,
        );
        assert_eq!(d.properties.get("p"), Some(&["b".to_string()][..]));
        let names: Vec<_> = d.properties.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["p", "q"]);
    }

    #[test]
    fn escaped_text_is_unescaped() {
        let d = component(r#"<component><property name="p">/a&amp;b</property></component>"#);
        assert_eq!(d.properties.get("p"), Some(&["/a&b".to_string()][..]));
    }

    #[test]
    fn missing_property_name_fails() {
        let err = parse(r#"<component><property value="x"/></component>"#).unwrap_err();
        assert!(matches!(err, DescriptorError::MissingPropertyName));
    }

    #[test]
    fn doctype_is_rejected() {
        let err = parse(
            r#"<?xml version="1.0"?>
<!DOCTYPE component [<!ENTITY xxe SYSTEM "file:///etc/passwd">]>
<component name="&xxe;"/>"#,
        )
        .unwrap_err();
        assert!(matches!(err, DescriptorError::DoctypeForbidden));
    }

    #[test]
    fn mismatched_end_tag_fails() {
        let err = parse("<component><service></component>").unwrap_err();
        assert!(matches!(err, DescriptorError::Xml { .. }));
    }

    #[test]
    fn truncated_document_fails() {
        let err = parse("<component><service>").unwrap_err();
        assert!(matches!(
            err,
            DescriptorError::UnclosedElement { .. } | DescriptorError::Xml { .. }
        ));
    }

    #[test]
    fn malformed_non_component_document_fails() {
        let err = parse("<metatype><a></metatype>").unwrap_err();
        assert!(matches!(err, DescriptorError::Xml { .. }));
    }

    #[test]
    fn second_root_element_is_rejected() {
        let err = parse(
            r#"<component name="A"/><component name="B"><service><provide interface="org.x.Y"/></service></component>"#,
        )
        .unwrap_err();
        assert!(matches!(err, DescriptorError::TrailingContent { .. }));

        let err = parse(r#"<component name="A"></component><property name="p" value="v"/>"#)
            .unwrap_err();
        assert!(matches!(err, DescriptorError::TrailingContent { .. }));
    }

    #[test]
    fn text_after_root_is_rejected() {
        let err = parse("<component name=\"A\"></component>trailing").unwrap_err();
        assert!(matches!(err, DescriptorError::TrailingContent { .. }));
    }

    #[test]
    fn whitespace_and_comments_after_root_are_allowed() {
        let d = component("<component name=\"A\"/>\n  <!-- generated -->\n");
        assert_eq!(d.name, "A");
    }

    #[test]
    fn attribute_error_reports_element_position() {
        let xml = r#"<component name="A"><service><provide interface="a&bogus;"/></service></component>"#;
        let err = parse(xml).unwrap_err();
        match err {
            DescriptorError::Xml { position, .. } => assert!(position > 0),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn no_root_element_fails() {
        let err = parse("not xml").unwrap_err();
        assert!(matches!(err, DescriptorError::NoRootElement));
    }
}
