/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! QuickFIX XML dictionary parsing.
//!
//! [`FixSpec`] is built once from a dictionary file and is read-only during
//! decoding. Components are resolved on demand from a name-indexed table of
//! raw nodes and memoized, so messages and components may reference each
//! other in any document order.

use crate::composition::{
    Component, Composition, DEFAULT_HEADER_TAGS, DEFAULT_TRAILER_TAGS, Element, Group, MessageType,
    SortingKey, collect_tags,
};
use crate::schema::{FixTag, TagsReference};
use marketcast_core::{ConfigError, SchemaError};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use xmltree::{Element as XmlElement, XMLNode};

/// A parsed FIX specification.
#[derive(Debug, Clone)]
pub struct FixSpec {
    version: String,
    tags: TagsReference,
    msg_types: HashMap<String, MessageType>,
    header_tags: Vec<u32>,
    trailer_tags: Vec<u32>,
    components: HashMap<String, Arc<Component>>,
}

impl FixSpec {
    /// Parses the dictionary file at `path`.
    ///
    /// # Errors
    /// Returns `SchemaError` if the file cannot be read or the dictionary is
    /// invalid.
    pub fn parse(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path).map_err(|e| SchemaError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse_str(&xml)
    }

    /// Parses a dictionary from XML text.
    ///
    /// # Errors
    /// Returns `SchemaError` if the XML is malformed, an attribute is missing
    /// or invalid, or a field or component reference cannot be resolved.
    pub fn parse_str(xml: &str) -> Result<Self, SchemaError> {
        let root = XmlElement::parse(xml.as_bytes()).map_err(|e| SchemaError::Xml(e.to_string()))?;
        let major = root.required_attr("major")?;
        let minor = root.required_attr("minor")?;
        let version = format!("FIX{major}.{minor}");

        let mut tags = TagsReference::new();
        if let Some(fields) = root.get_child("fields") {
            for node in fields.elements("field") {
                tags.insert(fix_tag(node)?);
            }
        }

        let header_tags =
            section_tags(&root, "header", &tags)?.unwrap_or_else(|| DEFAULT_HEADER_TAGS.to_vec());
        let trailer_tags =
            section_tags(&root, "trailer", &tags)?.unwrap_or_else(|| DEFAULT_TRAILER_TAGS.to_vec());

        let raw_components = root
            .get_child("components")
            .map(|c| {
                c.elements("component")
                    .map(|node| Ok((node.required_attr("name")?, node)))
                    .collect::<Result<HashMap<_, _>, SchemaError>>()
            })
            .transpose()?
            .unwrap_or_default();

        let (msg_types, components) = {
            let mut builder = Builder {
                tags: &tags,
                header: &header_tags,
                trailer: &trailer_tags,
                raw_components,
                resolved: HashMap::new(),
                resolving: HashSet::new(),
            };

            let names: Vec<&str> = builder.raw_components.keys().copied().collect();
            for name in names {
                builder.component(name, "components")?;
            }

            let mut msg_types = HashMap::new();
            if let Some(messages) = root.get_child("messages") {
                for node in messages.elements("message") {
                    let name = node.required_attr("name")?;
                    let msgtype = node.required_attr("msgtype")?;
                    let composition = builder.composition(node, name)?;
                    let message =
                        MessageType::new(msgtype, name, composition, &header_tags, &trailer_tags);
                    msg_types.insert(msgtype.to_string(), message);
                }
            }
            (msg_types, builder.resolved)
        };

        debug!(
            version = %version,
            tags = tags.len(),
            messages = msg_types.len(),
            components = components.len(),
            "parsed FIX specification"
        );

        Ok(Self {
            version,
            tags,
            msg_types,
            header_tags,
            trailer_tags,
            components,
        })
    }

    /// Returns the version string, e.g. `FIX4.4`.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the tag reference.
    #[must_use]
    pub const fn tags(&self) -> &TagsReference {
        &self.tags
    }

    /// Gets a tag by number.
    #[must_use]
    pub fn tag(&self, number: u32) -> Option<&FixTag> {
        self.tags.by_number(number)
    }

    /// Gets a message type by its tag 35 value.
    #[must_use]
    pub fn msg_type(&self, msgtype: &str) -> Option<&MessageType> {
        self.msg_types.get(msgtype)
    }

    /// Returns an iterator over all message types.
    pub fn msg_types(&self) -> impl Iterator<Item = &MessageType> {
        self.msg_types.values()
    }

    /// Returns the header tags in dictionary order.
    #[must_use]
    pub fn header_tags(&self) -> &[u32] {
        &self.header_tags
    }

    /// Returns the trailer tags in dictionary order.
    #[must_use]
    pub fn trailer_tags(&self) -> &[u32] {
        &self.trailer_tags
    }

    /// Gets a component by name.
    #[must_use]
    pub fn component(&self, name: &str) -> Option<&Arc<Component>> {
        self.components.get(name)
    }

    /// Registers a new string tag.
    pub fn add_tag(&mut self, number: u32, name: impl Into<String>) {
        self.tags.add_tag(number, name);
    }

    /// Adds an enum value to a tag.
    ///
    /// # Errors
    /// Returns `ConfigError::UnknownTag` if the tag is not defined, or
    /// `ConfigError::EnumConflict` if the name is already registered.
    pub fn add_enum_value(&mut self, tag: u32, name: &str, value: &str) -> Result<(), ConfigError> {
        self.tags
            .by_number_mut(tag)
            .ok_or(ConfigError::UnknownTag(tag))?
            .add_enum_value(name, value)
    }

    /// Removes an enum value from a tag by name, value, or both.
    ///
    /// # Errors
    /// Returns `ConfigError::UnknownTag` if the tag is not defined, otherwise
    /// the errors of [`FixTag::del_enum_value`].
    pub fn del_enum_value(
        &mut self,
        tag: u32,
        name: Option<&str>,
        value: Option<&str>,
    ) -> Result<(), ConfigError> {
        self.tags
            .by_number_mut(tag)
            .ok_or(ConfigError::UnknownTag(tag))?
            .del_enum_value(name, value)
    }

    /// Adds a synthetic repeating group to a message type.
    ///
    /// The group is only known to `msgtype`; register it on every message
    /// type that carries it.
    ///
    /// # Arguments
    /// * `msgtype` - Value of tag 35 the group belongs to
    /// * `count_tag` - Tag number of the count field
    /// * `composition` - Ordered contents of one instance
    /// * `insert_at` - Optional sort position of the count tag in the message
    ///
    /// # Errors
    /// Returns `ConfigError::UnknownMessageType` if the message type is not
    /// defined, or `ConfigError::UnknownTag` if the count tag or a member tag
    /// is not defined.
    pub fn add_group(
        &mut self,
        msgtype: &str,
        count_tag: u32,
        composition: Composition,
        insert_at: Option<u64>,
    ) -> Result<(), ConfigError> {
        let name = self
            .tags
            .by_number(count_tag)
            .ok_or(ConfigError::UnknownTag(count_tag))?
            .name()
            .to_string();
        let mut members = HashSet::new();
        collect_tags(&composition, &mut members);
        if let Some(&unknown) = members.iter().find(|&&tag| self.tags.by_number(tag).is_none()) {
            return Err(ConfigError::UnknownTag(unknown));
        }
        let group = Group::new(count_tag, name, composition, &self.header_tags, &self.trailer_tags);
        self.msg_types
            .get_mut(msgtype)
            .ok_or_else(|| ConfigError::UnknownMessageType(msgtype.to_string()))?
            .add_group(group, insert_at);
        Ok(())
    }
}

struct Builder<'a> {
    tags: &'a TagsReference,
    header: &'a [u32],
    trailer: &'a [u32],
    raw_components: HashMap<&'a str, &'a XmlElement>,
    resolved: HashMap<String, Arc<Component>>,
    resolving: HashSet<String>,
}

impl<'a> Builder<'a> {
    fn component(
        &mut self,
        name: &str,
        referenced_by: &str,
    ) -> Result<Arc<Component>, SchemaError> {
        if let Some(component) = self.resolved.get(name) {
            return Ok(Arc::clone(component));
        }
        let node = *self
            .raw_components
            .get(name)
            .ok_or_else(|| SchemaError::UndefinedComponent {
                name: name.to_string(),
                referenced_by: referenced_by.to_string(),
            })?;
        if !self.resolving.insert(name.to_string()) {
            return Err(SchemaError::RecursiveComponent(name.to_string()));
        }
        let composition = self.composition(node, name)?;
        self.resolving.remove(name);

        let sorting_key = SortingKey::build(&composition, self.header, self.trailer);
        let component = Arc::new(Component {
            name: name.to_string(),
            composition,
            sorting_key,
        });
        self.resolved.insert(name.to_string(), Arc::clone(&component));
        Ok(component)
    }

    fn composition(
        &mut self,
        node: &'a XmlElement,
        owner: &str,
    ) -> Result<Composition, SchemaError> {
        let mut composition = Vec::new();
        for item in node.child_elements() {
            let name = item.required_attr("name")?;
            let required = item.attr("required") == Some("Y");
            let element = match item.name.as_str() {
                "field" => Element::Tag(self.tag_number(name, owner)?),
                "component" => Element::Component(self.component(name, owner)?),
                "group" => {
                    let count_tag = self.tag_number(name, owner)?;
                    let members = self.composition(item, name)?;
                    let group = Group::new(count_tag, name, members, self.header, self.trailer);
                    Element::Group(Arc::new(group))
                }
                other => {
                    return Err(SchemaError::UnsupportedType {
                        type_name: other.to_string(),
                        reason: format!("unexpected element in '{owner}'"),
                    });
                }
            };
            composition.push((element, required));
        }
        Ok(composition)
    }

    fn tag_number(&self, name: &str, owner: &str) -> Result<u32, SchemaError> {
        self.tags
            .by_name(name)
            .map(FixTag::number)
            .ok_or_else(|| SchemaError::UndefinedField {
                name: name.to_string(),
                referenced_by: owner.to_string(),
            })
    }
}

fn fix_tag(node: &XmlElement) -> Result<FixTag, SchemaError> {
    let name = node.required_attr("name")?;
    let number = node.required_attr("number")?;
    let number = number.parse().map_err(|_| SchemaError::InvalidAttribute {
        element: name.to_string(),
        attribute: "number".to_string(),
        value: number.to_string(),
    })?;
    let type_name = node.attr("type").unwrap_or("STRING");
    let values = node
        .elements("value")
        .map(|v| {
            let value = v.required_attr("enum")?.to_string();
            let description = v.required_attr("description")?.to_string();
            Ok((value, description))
        })
        .collect::<Result<Vec<_>, SchemaError>>()?;
    Ok(FixTag::new(name, number, type_name, values))
}

fn section_tags(
    root: &XmlElement,
    section: &str,
    tags: &TagsReference,
) -> Result<Option<Vec<u32>>, SchemaError> {
    let Some(node) = root.get_child(section) else {
        return Ok(None);
    };
    let numbers = node
        .elements("field")
        .map(|f| {
            let name = f.required_attr("name")?;
            tags.by_name(name)
                .map(FixTag::number)
                .ok_or_else(|| SchemaError::UndefinedField {
                    name: name.to_string(),
                    referenced_by: section.to_string(),
                })
        })
        .collect::<Result<Vec<_>, SchemaError>>()?;
    Ok((!numbers.is_empty()).then_some(numbers))
}

trait XmlHelper {
    fn required_attr(&self, attribute: &str) -> Result<&str, SchemaError>;
    fn attr(&self, attribute: &str) -> Option<&str>;
    fn child_elements(&self) -> impl Iterator<Item = &XmlElement>;
    fn elements<'s>(&'s self, name: &'s str) -> impl Iterator<Item = &'s XmlElement>;
}

impl XmlHelper for XmlElement {
    fn required_attr(&self, attribute: &str) -> Result<&str, SchemaError> {
        self.attr(attribute).ok_or_else(|| SchemaError::MissingAttribute {
            element: self.attr("name").unwrap_or(&self.name).to_string(),
            attribute: attribute.to_string(),
        })
    }

    fn attr(&self, attribute: &str) -> Option<&str> {
        self.attributes.get(attribute).map(String::as_str)
    }

    fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(XMLNode::as_element)
    }

    fn elements<'s>(&'s self, name: &'s str) -> impl Iterator<Item = &'s XmlElement> {
        self.child_elements().filter(move |c| c.name == name)
    }
}
