/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Binary schema catalogue.
//!
//! Parses an SBE XML schema into immutable [`MessageTemplate`]s. Every field,
//! group and type reference is resolved and every byte offset is computed at
//! construction, so decoding never has to consult the XML again.

use crate::primitive::{ByteOrder, PrimitiveType, convert_to_underscore};
use marketcast_core::{LogicalType, SchemaError, SchemaField};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, warn};
use xmltree::{Element, XMLNode};

/// Name of the message size field prepended when the size header is enabled.
pub const MESSAGE_SIZE_FIELD: &str = "message_size";

/// Maximum nesting depth of composite and ref type definitions.
const MAX_TYPE_DEPTH: usize = 16;

/// Options controlling catalogue construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogueOptions {
    /// Prepend a uint16 `message_size` field to every message header.
    pub include_message_size_header: bool,
    /// Use the enumerant name when an enum value has no description.
    pub enum_fallback_to_name: bool,
    /// Let constant-presence types occupy bytes in the block layout.
    pub include_constants_in_offset: bool,
}

impl CatalogueOptions {
    /// Creates options with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            include_message_size_header: false,
            enum_fallback_to_name: true,
            include_constants_in_offset: false,
        }
    }

    /// Enables or disables the message size header.
    #[must_use]
    pub const fn with_message_size_header(mut self, enabled: bool) -> Self {
        self.include_message_size_header = enabled;
        self
    }

    /// Enables or disables the enum name fallback.
    #[must_use]
    pub const fn with_enum_fallback_to_name(mut self, enabled: bool) -> Self {
        self.enum_fallback_to_name = enabled;
        self
    }

    /// Enables or disables byte allocation for constants.
    #[must_use]
    pub const fn with_constants_in_offset(mut self, enabled: bool) -> Self {
        self.include_constants_in_offset = enabled;
        self
    }
}

impl Default for CatalogueOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Constant value of a constant-presence type.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    /// Integer constant.
    Int(i64),
    /// Floating point constant.
    Float(f64),
    /// Character constant.
    Text(String),
}

/// One entry of an enum value table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    /// Short enumerant name.
    pub name: String,
    /// Human readable description, possibly empty.
    pub description: String,
}

/// How a field is encoded.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// A primitive scalar, array or string.
    Primitive {
        /// Primitive type of each element.
        primitive: PrimitiveType,
        /// Byte order of the value.
        byte_order: ByteOrder,
        /// Number of elements (1 for scalars).
        array_len: usize,
        /// Fixed value of a constant-presence type.
        constant: Option<ConstantValue>,
        /// Explicit null value overriding nothing but adding to the sentinel.
        null_value: Option<i128>,
    },
    /// An enumeration over a primitive encoding.
    Enum {
        /// Encoding primitive.
        encoding: PrimitiveType,
        /// Byte order of the value.
        byte_order: ByteOrder,
        /// Raw value text to enumerant.
        values: HashMap<String, EnumValue>,
        /// Use the enumerant name when the description is empty.
        fallback_to_name: bool,
    },
    /// A bitset over a primitive encoding.
    Set {
        /// Encoding primitive.
        encoding: PrimitiveType,
        /// Byte order of the value.
        byte_order: ByteOrder,
        /// Bit position to choice name.
        choices: BTreeMap<u32, String>,
    },
    /// A fixed sequence of parts.
    Composite {
        /// Constituent fields with offsets relative to the composite start.
        parts: Vec<FieldSpec>,
    },
}

/// Resolved layout of one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Snake-case name.
    pub name: String,
    /// Name as written in the schema.
    pub original_name: String,
    /// Schema id; `None` for header fields and composite parts.
    pub id: Option<u32>,
    /// Description, possibly empty.
    pub description: String,
    /// Byte offset relative to the enclosing block.
    pub offset: usize,
    /// Encoded byte length.
    pub length: usize,
    /// Schema version the field was introduced in.
    pub since_version: u32,
    /// Semantic type, such as `bool` or `UTCTimestamp`.
    pub semantic_type: Option<String>,
    /// Encoding.
    pub kind: FieldKind,
}

impl FieldSpec {
    /// Returns true if the field carries boolean semantics.
    #[must_use]
    pub fn is_bool(&self) -> bool {
        matches!(self.semantic_type.as_deref(), Some("bool" | "boolean"))
    }

    /// Returns the logical type of a non-composite field.
    #[must_use]
    pub fn logical_type(&self) -> LogicalType {
        if self.is_bool() {
            return LogicalType::Boolean;
        }
        match &self.kind {
            FieldKind::Primitive {
                primitive,
                array_len,
                ..
            } => {
                if *primitive == PrimitiveType::Char || *array_len <= 1 {
                    primitive.logical_type()
                } else if primitive.size() * array_len < 8 {
                    LogicalType::Long
                } else if primitive.size() * array_len == 8 {
                    LogicalType::UnsignedLong
                } else {
                    LogicalType::String
                }
            }
            FieldKind::Enum { .. } | FieldKind::Set { .. } | FieldKind::Composite { .. } => {
                LogicalType::String
            }
        }
    }

    /// Describes the field for output schemas.
    #[must_use]
    pub fn schema_field(&self) -> SchemaField {
        match &self.kind {
            FieldKind::Composite { parts } => SchemaField::Composite {
                name: self.name.clone(),
                parts: parts.iter().map(Self::schema_field).collect(),
            },
            _ => SchemaField::scalar(self.name.clone(), self.logical_type()),
        }
    }
}

/// Dimension header of a repeating group.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    /// Instance block length field.
    pub block_length: FieldSpec,
    /// Instance count field.
    pub num_in_group: FieldSpec,
    /// Encoded header size in bytes.
    pub size: usize,
}

/// Resolved layout of a repeating group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSpec {
    /// Snake-case name.
    pub name: String,
    /// Name as written in the schema.
    pub original_name: String,
    /// Schema id.
    pub id: Option<u32>,
    /// Schema version the group was introduced in.
    pub since_version: u32,
    /// Declared instance block length.
    pub block_length: usize,
    /// Dimension header.
    pub dimension: Dimension,
    /// Fields of one instance, offsets relative to the instance start.
    pub fields: Vec<FieldSpec>,
    /// Nested groups following each instance block.
    pub groups: Vec<GroupSpec>,
}

impl GroupSpec {
    /// Describes the group for output schemas.
    #[must_use]
    pub fn schema_field(&self) -> SchemaField {
        let mut fields: Vec<SchemaField> =
            self.fields.iter().map(FieldSpec::schema_field).collect();
        fields.extend(self.groups.iter().map(Self::schema_field));
        SchemaField::Group {
            name: self.name.clone(),
            fields,
        }
    }
}

/// Resolved layout of one message.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageTemplate {
    /// Template id.
    pub id: u32,
    /// Message name.
    pub name: String,
    /// Description, possibly empty.
    pub description: String,
    /// Root block length, excluding the header.
    pub block_length: usize,
    /// Header size in bytes.
    pub header_size: usize,
    /// Schema version.
    pub schema_version: u32,
    /// Header fields first (no ids), then body fields.
    pub fields: Vec<FieldSpec>,
    /// Repeating groups following the root block.
    pub groups: Vec<GroupSpec>,
}

impl MessageTemplate {
    /// Returns the field with the given snake-case name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the group with the given snake-case name.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&GroupSpec> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Returns the fields that belong to the message body.
    pub fn body_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.id.is_some())
    }
}

/// Immutable collection of message templates keyed by template id.
#[derive(Debug, Clone)]
pub struct SchemaCatalogue {
    templates: Vec<MessageTemplate>,
    index: HashMap<u32, usize>,
    byte_order: ByteOrder,
    schema_version: u32,
    options: CatalogueOptions,
}

impl SchemaCatalogue {
    /// Parses a schema definition file.
    ///
    /// # Arguments
    /// * `path` - Path to the SBE XML schema
    /// * `options` - Construction options
    ///
    /// # Errors
    /// Returns `SchemaError` if the file cannot be read or the schema is invalid.
    pub fn parse(path: impl AsRef<Path>, options: CatalogueOptions) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path).map_err(|e| SchemaError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse_str(&xml, options)
    }

    /// Parses a schema definition from a string.
    ///
    /// # Errors
    /// Returns `SchemaError` if the schema is malformed or references undefined types.
    pub fn parse_str(xml: &str, options: CatalogueOptions) -> Result<Self, SchemaError> {
        let root = Element::parse(xml.as_bytes()).map_err(|e| SchemaError::Xml(e.to_string()))?;

        let byte_order = match root.attr("byteOrder") {
            None => ByteOrder::default(),
            Some(value) => ByteOrder::from_attr(value).ok_or_else(|| SchemaError::InvalidAttribute {
                element: root.name.clone(),
                attribute: "byteOrder".to_string(),
                value: value.to_string(),
            })?,
        };
        let schema_version = parse_attr::<u32>(&root, "version", "messageSchema")?.unwrap_or(0);

        let mut types = HashMap::new();
        for block in root.descendants("types") {
            for node in block.child_elements() {
                types.insert(required_attr(node, "name", &node.name)?, node);
            }
        }

        let resolver = Resolver {
            types,
            byte_order,
            options: &options,
        };
        let header_type = root.attr("headerType").unwrap_or("messageHeader");
        let (header, header_size) = resolver.message_header(header_type)?;

        let mut templates = Vec::new();
        let mut index = HashMap::new();
        for node in root.descendants("message") {
            let template = resolver.message(node, &header, header_size, schema_version)?;
            if index.insert(template.id, templates.len()).is_some() {
                return Err(SchemaError::DuplicateTemplate(template.id));
            }
            templates.push(template);
        }

        debug!(
            templates = templates.len(),
            header_size, schema_version, "parsed binary schema catalogue"
        );

        Ok(Self {
            templates,
            index,
            byte_order,
            schema_version,
            options,
        })
    }

    /// Returns the template for an id.
    #[must_use]
    pub fn template(&self, id: u32) -> Option<&MessageTemplate> {
        self.index.get(&id).map(|&i| &self.templates[i])
    }

    /// Returns all templates in schema order.
    #[must_use]
    pub fn templates(&self) -> &[MessageTemplate] {
        &self.templates
    }

    /// Returns the number of templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns true if the schema defines no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Returns the schema byte order.
    #[must_use]
    pub const fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Returns the schema version.
    #[must_use]
    pub const fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// Returns the options the catalogue was built with.
    #[must_use]
    pub const fn options(&self) -> &CatalogueOptions {
        &self.options
    }
}

/// A type reference resolved to its encoding and byte length.
struct ResolvedType {
    kind: FieldKind,
    length: usize,
    semantic_type: Option<String>,
}

struct Resolver<'a> {
    types: HashMap<&'a str, &'a Element>,
    byte_order: ByteOrder,
    options: &'a CatalogueOptions,
}

impl<'a> Resolver<'a> {
    fn resolve(
        &self,
        type_name: &str,
        referenced_by: &str,
        depth: usize,
    ) -> Result<ResolvedType, SchemaError> {
        if let Some(node) = self.types.get(type_name) {
            return self.resolve_node(*node, depth);
        }
        match PrimitiveType::from_name(type_name) {
            Some(primitive) => Ok(ResolvedType {
                kind: FieldKind::Primitive {
                    primitive,
                    byte_order: self.byte_order,
                    array_len: 1,
                    constant: None,
                    null_value: None,
                },
                length: primitive.size(),
                semantic_type: None,
            }),
            None => Err(SchemaError::UndefinedType {
                type_name: type_name.to_string(),
                referenced_by: referenced_by.to_string(),
            }),
        }
    }

    fn resolve_node(&self, node: &'a Element, depth: usize) -> Result<ResolvedType, SchemaError> {
        let name = node.attr("name").unwrap_or_default();
        if depth > MAX_TYPE_DEPTH {
            return Err(SchemaError::UnsupportedType {
                type_name: name.to_string(),
                reason: "type references nest too deeply".to_string(),
            });
        }
        match node.name.as_str() {
            "type" => self.primitive_type(node, name),
            "enum" => self.enum_type(node, name),
            "set" => self.set_type(node, name),
            "composite" => self.composite_type(node, name, depth),
            "ref" => {
                let target = required_attr(node, "type", name)?;
                self.resolve(target, name, depth + 1)
            }
            other => Err(SchemaError::UnsupportedType {
                type_name: name.to_string(),
                reason: format!("unknown type element '{}'", other),
            }),
        }
    }

    fn primitive_type(&self, node: &'a Element, name: &str) -> Result<ResolvedType, SchemaError> {
        let primitive_name = required_attr(node, "primitiveType", name)?;
        let primitive =
            PrimitiveType::from_name(primitive_name).ok_or_else(|| SchemaError::InvalidAttribute {
                element: name.to_string(),
                attribute: "primitiveType".to_string(),
                value: primitive_name.to_string(),
            })?;
        let array_len = parse_attr::<usize>(node, "length", name)?.unwrap_or(1);

        let constant = if node.attr("presence") == Some("constant") {
            Some(parse_constant(primitive, &node.trimmed_text(), name)?)
        } else {
            None
        };
        let null_value = if primitive.is_integer() {
            parse_attr::<i128>(node, "nullValue", name)?
        } else {
            None
        };

        let length = if constant.is_some() && !self.options.include_constants_in_offset {
            0
        } else {
            primitive.size() * array_len
        };

        Ok(ResolvedType {
            kind: FieldKind::Primitive {
                primitive,
                byte_order: self.byte_order,
                array_len,
                constant,
                null_value,
            },
            length,
            semantic_type: node.attr("semanticType").map(str::to_string),
        })
    }

    fn encoding(&self, node: &'a Element, name: &str) -> Result<PrimitiveType, SchemaError> {
        let encoding = required_attr(node, "encodingType", name)?;
        if let Some(def) = self.types.get(encoding) {
            let primitive = (def.name == "type")
                .then(|| def.attr("primitiveType").and_then(PrimitiveType::from_name))
                .flatten();
            return primitive.ok_or_else(|| SchemaError::UnsupportedType {
                type_name: encoding.to_string(),
                reason: format!("encoding of '{}' must be a primitive type", name),
            });
        }
        PrimitiveType::from_name(encoding).ok_or_else(|| SchemaError::UndefinedType {
            type_name: encoding.to_string(),
            referenced_by: name.to_string(),
        })
    }

    fn enum_type(&self, node: &'a Element, name: &str) -> Result<ResolvedType, SchemaError> {
        let encoding = self.encoding(node, name)?;
        let mut values = HashMap::new();
        for value in node.child_elements().filter(|n| n.name == "validValue") {
            let enumerant = required_attr(value, "name", name)?;
            let text = value.trimmed_text();
            let key = if encoding.is_integer() {
                text.parse::<i128>()
                    .map_err(|_| SchemaError::InvalidAttribute {
                        element: format!("{}.{}", name, enumerant),
                        attribute: "value".to_string(),
                        value: text.to_string(),
                    })?
                    .to_string()
            } else {
                text
            };
            values.insert(
                key,
                EnumValue {
                    name: enumerant.to_string(),
                    description: value.attr("description").unwrap_or_default().to_string(),
                },
            );
        }
        Ok(ResolvedType {
            kind: FieldKind::Enum {
                encoding,
                byte_order: self.byte_order,
                values,
                fallback_to_name: self.options.enum_fallback_to_name,
            },
            length: encoding.size(),
            semantic_type: node.attr("semanticType").map(str::to_string),
        })
    }

    fn set_type(&self, node: &'a Element, name: &str) -> Result<ResolvedType, SchemaError> {
        let encoding = self.encoding(node, name)?;
        let mut choices = BTreeMap::new();
        for choice in node.child_elements().filter(|n| n.name == "choice") {
            let choice_name = required_attr(choice, "name", name)?;
            let text = choice.trimmed_text();
            let bit = text.parse::<u32>().map_err(|_| SchemaError::InvalidAttribute {
                element: format!("{}.{}", name, choice_name),
                attribute: "bit".to_string(),
                value: text.clone(),
            })?;
            choices.insert(bit, choice_name.to_string());
        }
        Ok(ResolvedType {
            kind: FieldKind::Set {
                encoding,
                byte_order: self.byte_order,
                choices,
            },
            length: encoding.size(),
            semantic_type: node.attr("semanticType").map(str::to_string),
        })
    }

    fn composite_type(
        &self,
        node: &'a Element,
        name: &str,
        depth: usize,
    ) -> Result<ResolvedType, SchemaError> {
        let mut parts = Vec::new();
        let mut running = 0usize;
        let mut length = 0usize;
        for child in node.child_elements() {
            let part_name = required_attr(child, "name", name)?;
            let offset = parse_attr::<usize>(child, "offset", part_name)?.unwrap_or(running);
            let resolved = self.resolve_node(child, depth + 1)?;
            running = offset + resolved.length;
            length = length.max(running);
            parts.push(FieldSpec {
                name: convert_to_underscore(part_name),
                original_name: part_name.to_string(),
                id: None,
                description: child.attr("description").unwrap_or_default().to_string(),
                offset,
                length: resolved.length,
                since_version: parse_attr::<u32>(child, "sinceVersion", part_name)?.unwrap_or(0),
                semantic_type: resolved.semantic_type,
                kind: resolved.kind,
            });
        }
        Ok(ResolvedType {
            kind: FieldKind::Composite { parts },
            length,
            semantic_type: node.attr("semanticType").map(str::to_string),
        })
    }

    fn message_header(&self, header_type: &str) -> Result<(Vec<FieldSpec>, usize), SchemaError> {
        let node = self
            .types
            .get(header_type)
            .copied()
            .ok_or_else(|| SchemaError::MissingElement(header_type.to_string()))?;
        let FieldKind::Composite { parts } = self.resolve_node(node, 0)?.kind else {
            return Err(SchemaError::UnsupportedType {
                type_name: header_type.to_string(),
                reason: "message header must be a composite".to_string(),
            });
        };

        let mut header = Vec::with_capacity(parts.len() + 1);
        let mut shift = 0;
        if self.options.include_message_size_header {
            header.push(FieldSpec {
                name: MESSAGE_SIZE_FIELD.to_string(),
                original_name: MESSAGE_SIZE_FIELD.to_string(),
                id: None,
                description: "Header Message Size".to_string(),
                offset: 0,
                length: 2,
                since_version: 0,
                semantic_type: None,
                kind: FieldKind::Primitive {
                    primitive: PrimitiveType::UInt16,
                    byte_order: ByteOrder::LittleEndian,
                    array_len: 1,
                    constant: None,
                    null_value: None,
                },
            });
            shift = 2;
        }
        for mut part in parts {
            part.offset += shift;
            part.description = format!("Header {}", part.original_name);
            header.push(part);
        }
        let size = header.iter().map(|f| f.offset + f.length).max().unwrap_or(0);
        Ok((header, size))
    }

    fn message(
        &self,
        node: &'a Element,
        header: &[FieldSpec],
        header_size: usize,
        schema_version: u32,
    ) -> Result<MessageTemplate, SchemaError> {
        let name = required_attr(node, "name", "message")?;
        let id = parse_attr::<u32>(node, "id", name)?.ok_or_else(|| SchemaError::MissingAttribute {
            element: name.to_string(),
            attribute: "id".to_string(),
        })?;

        let (body, groups, end) = self.block(node, name, header_size, header_size)?;
        let block_length =
            parse_attr::<usize>(node, "blockLength", name)?.unwrap_or(end - header_size);

        let mut fields = header.to_vec();
        fields.extend(body);

        Ok(MessageTemplate {
            id,
            name: name.to_string(),
            description: node.attr("description").unwrap_or_default().to_string(),
            block_length,
            header_size,
            schema_version,
            fields,
            groups,
        })
    }

    /// Resolves the fields and groups of a message or group body.
    ///
    /// Returns the fields, the groups and the end of the fixed block.
    fn block(
        &self,
        node: &'a Element,
        owner: &str,
        start: usize,
        explicit_base: usize,
    ) -> Result<(Vec<FieldSpec>, Vec<GroupSpec>, usize), SchemaError> {
        let mut fields = Vec::new();
        let mut groups = Vec::new();
        let mut running = start;
        let mut end = start;
        for child in node.child_elements() {
            match child.name.as_str() {
                "field" => {
                    let field = self.field(child, running, explicit_base)?;
                    running = field.offset + field.length;
                    end = end.max(running);
                    fields.push(field);
                }
                "group" => groups.push(self.group(child)?),
                "data" => {
                    warn!(
                        owner,
                        field = child.attr("name").unwrap_or_default(),
                        "variable-length data fields are not decoded"
                    );
                }
                _ => {}
            }
        }
        Ok((fields, groups, end))
    }

    fn field(
        &self,
        node: &'a Element,
        running: usize,
        explicit_base: usize,
    ) -> Result<FieldSpec, SchemaError> {
        let name = required_attr(node, "name", "field")?;
        let type_name = required_attr(node, "type", name)?;
        let resolved = self.resolve(type_name, name, 0)?;
        let offset = parse_attr::<usize>(node, "offset", name)?
            .map_or(running, |explicit| explicit + explicit_base);

        Ok(FieldSpec {
            name: convert_to_underscore(name),
            original_name: name.to_string(),
            id: parse_attr::<u32>(node, "id", name)?,
            description: node.attr("description").unwrap_or_default().to_string(),
            offset,
            length: resolved.length,
            since_version: parse_attr::<u32>(node, "sinceVersion", name)?.unwrap_or(0),
            semantic_type: node
                .attr("semanticType")
                .map(str::to_string)
                .or(resolved.semantic_type),
            kind: resolved.kind,
        })
    }

    fn group(&self, node: &'a Element) -> Result<GroupSpec, SchemaError> {
        let name = required_attr(node, "name", "group")?;
        let dimension_type = node.attr("dimensionType").unwrap_or("groupSize");
        let dimension = self.dimension(dimension_type, name)?;
        let (fields, groups, end) = self.block(node, name, 0, 0)?;

        Ok(GroupSpec {
            name: convert_to_underscore(name),
            original_name: name.to_string(),
            id: parse_attr::<u32>(node, "id", name)?,
            since_version: parse_attr::<u32>(node, "sinceVersion", name)?.unwrap_or(0),
            block_length: parse_attr::<usize>(node, "blockLength", name)?.unwrap_or(end),
            dimension,
            fields,
            groups,
        })
    }

    fn dimension(&self, dimension_type: &str, group: &str) -> Result<Dimension, SchemaError> {
        let resolved = self.resolve(dimension_type, group, 0)?;
        let unsupported = |reason: &str| SchemaError::UnsupportedType {
            type_name: dimension_type.to_string(),
            reason: reason.to_string(),
        };
        let FieldKind::Composite { parts } = resolved.kind else {
            return Err(unsupported("dimension type must be a composite"));
        };
        let find = |original: &str| {
            parts
                .iter()
                .find(|p| p.original_name == original)
                .filter(|p| match p.kind {
                    FieldKind::Primitive { primitive, .. } => primitive.is_integer(),
                    _ => false,
                })
                .cloned()
        };
        let block_length =
            find("blockLength").ok_or_else(|| unsupported("missing integer blockLength"))?;
        let num_in_group =
            find("numInGroup").ok_or_else(|| unsupported("missing integer numInGroup"))?;
        Ok(Dimension {
            block_length,
            num_in_group,
            size: resolved.length,
        })
    }
}

fn required_attr<'a>(
    node: &'a Element,
    attribute: &str,
    element: &str,
) -> Result<&'a str, SchemaError> {
    node.attr(attribute).ok_or_else(|| SchemaError::MissingAttribute {
        element: element.to_string(),
        attribute: attribute.to_string(),
    })
}

fn parse_attr<T: std::str::FromStr>(
    node: &Element,
    attribute: &str,
    element: &str,
) -> Result<Option<T>, SchemaError> {
    node.attr(attribute)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|_| SchemaError::InvalidAttribute {
                element: element.to_string(),
                attribute: attribute.to_string(),
                value: raw.to_string(),
            })
        })
        .transpose()
}

/// Element accessors used while resolving a schema.
trait XmlHelper {
    fn attr(&self, attribute: &str) -> Option<&str>;
    fn child_elements(&self) -> impl Iterator<Item = &Element>;
    fn descendants(&self, name: &str) -> Vec<&Element>;
    fn trimmed_text(&self) -> String;
}

impl XmlHelper for Element {
    fn attr(&self, attribute: &str) -> Option<&str> {
        self.attributes.get(attribute).map(String::as_str)
    }

    fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(XMLNode::as_element)
    }

    fn descendants(&self, name: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        for child in self.child_elements() {
            if child.name == name {
                found.push(child);
            }
            found.extend(child.descendants(name));
        }
        found
    }

    fn trimmed_text(&self) -> String {
        self.get_text().map(|t| t.trim().to_string()).unwrap_or_default()
    }
}

fn parse_constant(
    primitive: PrimitiveType,
    text: &str,
    name: &str,
) -> Result<ConstantValue, SchemaError> {
    let invalid = || SchemaError::InvalidAttribute {
        element: name.to_string(),
        attribute: "constant".to_string(),
        value: text.to_string(),
    };
    match primitive {
        PrimitiveType::Char => Ok(ConstantValue::Text(text.to_string())),
        PrimitiveType::Float | PrimitiveType::Double => {
            text.parse().map(ConstantValue::Float).map_err(|_| invalid())
        }
        _ => text.parse().map(ConstantValue::Int).map_err(|_| invalid()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    /// A small schema exercising every type kind, used across the crate's tests.
    pub(crate) const TEST_SCHEMA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sbe:messageSchema xmlns:sbe="http://fixprotocol.io/2016/sbe" package="test" id="1" version="9"
                   byteOrder="littleEndian">
  <types>
    <composite name="messageHeader">
      <type name="blockLength" primitiveType="uint16"/>
      <type name="templateId" primitiveType="uint16"/>
      <type name="schemaId" primitiveType="uint16"/>
      <type name="version" primitiveType="uint16"/>
    </composite>
    <composite name="groupSize">
      <type name="blockLength" primitiveType="uint16"/>
      <type name="numInGroup" primitiveType="uint8"/>
    </composite>
    <composite name="PRICE9">
      <type name="mantissa" primitiveType="int64"/>
      <type name="exponent" primitiveType="int8" presence="constant">-9</type>
    </composite>
    <type name="Symbol" primitiveType="char" length="8"/>
    <type name="Int32NULL" primitiveType="int32" presence="optional" nullValue="-2147483648"/>
    <type name="uInt8" primitiveType="uint8"/>
    <enum name="SideEnum" encodingType="uInt8">
      <validValue name="Buy" description="Buy Side">1</validValue>
      <validValue name="Sell">2</validValue>
    </enum>
    <enum name="StatusEnum" encodingType="char">
      <validValue name="Open" description="Open">O</validValue>
    </enum>
    <set name="FlagsSet" encodingType="uint8">
      <choice name="LastTrade">0</choice>
      <choice name="EndOfEvent">7</choice>
    </set>
  </types>
  <sbe:message name="Trade" id="1" blockLength="8">
    <field name="Price" id="10" type="uint32" offset="0"/>
    <field name="Qty" id="11" type="Int32NULL" offset="4"/>
    <group name="Legs" id="20" dimensionType="groupSize" blockLength="4">
      <field name="Qty" id="21" type="int32" offset="0"/>
    </group>
  </sbe:message>
  <sbe:message name="Quote" id="2">
    <field name="Symbol" id="30" type="Symbol"/>
    <field name="Px" id="31" type="PRICE9"/>
    <field name="Side" id="32" type="SideEnum"/>
    <field name="Flags" id="33" type="FlagsSet"/>
    <field name="Status" id="34" type="StatusEnum"/>
    <field name="IsLast" id="35" type="uint8" semanticType="bool" sinceVersion="9"/>
    <data name="Text" id="36" type="varData"/>
  </sbe:message>
</sbe:messageSchema>"#;

    fn catalogue() -> SchemaCatalogue {
        SchemaCatalogue::parse_str(TEST_SCHEMA, CatalogueOptions::default()).unwrap()
    }

    #[test]
    fn test_parse_templates_in_order() {
        let catalogue = catalogue();
        assert_eq!(catalogue.len(), 2);
        assert_eq!(catalogue.schema_version(), 9);
        let names: Vec<_> = catalogue.templates().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Trade", "Quote"]);
        assert!(catalogue.template(3).is_none());
    }

    #[test]
    fn test_header_and_offsets() {
        let catalogue = catalogue();
        let trade = catalogue.template(1).unwrap();
        assert_eq!(trade.header_size, 8);
        assert_eq!(trade.block_length, 8);
        let header: Vec<_> = trade
            .fields
            .iter()
            .filter(|f| f.id.is_none())
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(header, vec!["block_length", "template_id", "schema_id", "version"]);
        assert_eq!(trade.field("price").unwrap().offset, 8);
        assert_eq!(trade.field("qty").unwrap().offset, 12);

        let legs = trade.group("legs").unwrap();
        assert_eq!(legs.dimension.size, 3);
        assert_eq!(legs.fields[0].offset, 0);
    }

    #[test]
    fn test_running_offsets_and_constants() {
        let catalogue = catalogue();
        let quote = catalogue.template(2).unwrap();
        assert_eq!(quote.field("symbol").unwrap().offset, 8);
        let px = quote.field("px").unwrap();
        assert_eq!(px.offset, 16);
        // constant exponent takes no bytes
        assert_eq!(px.length, 8);
        assert_eq!(quote.field("side").unwrap().offset, 24);
        assert_eq!(quote.field("flags").unwrap().offset, 25);
        assert_eq!(quote.field("status").unwrap().offset, 26);
        assert_eq!(quote.field("is_last").unwrap().offset, 27);
        assert_eq!(quote.block_length, 20);
        assert!(quote.field("is_last").unwrap().is_bool());
    }

    #[test]
    fn test_constants_in_offset_option() {
        let options = CatalogueOptions::new().with_constants_in_offset(true);
        let catalogue = SchemaCatalogue::parse_str(TEST_SCHEMA, options).unwrap();
        let px = catalogue.template(2).unwrap().field("px").unwrap();
        assert_eq!(px.length, 9);
    }

    #[test]
    fn test_message_size_header_option() {
        let options = CatalogueOptions::new().with_message_size_header(true);
        let catalogue = SchemaCatalogue::parse_str(TEST_SCHEMA, options).unwrap();
        let trade = catalogue.template(1).unwrap();
        assert_eq!(trade.header_size, 10);
        assert_eq!(trade.fields[0].name, MESSAGE_SIZE_FIELD);
        assert_eq!(trade.field("template_id").unwrap().offset, 4);
        assert_eq!(trade.field("price").unwrap().offset, 10);
    }

    #[test]
    fn test_undefined_type_is_fatal() {
        let xml = TEST_SCHEMA.replace(r#"type="Int32NULL""#, r#"type="Missing""#);
        let err = SchemaCatalogue::parse_str(&xml, CatalogueOptions::default()).unwrap_err();
        assert_eq!(
            err,
            SchemaError::UndefinedType {
                type_name: "Missing".to_string(),
                referenced_by: "Qty".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_message_header_is_fatal() {
        let xml = TEST_SCHEMA.replace(r#"name="messageHeader""#, r#"name="otherHeader""#);
        let err = SchemaCatalogue::parse_str(&xml, CatalogueOptions::default()).unwrap_err();
        assert_eq!(err, SchemaError::MissingElement("messageHeader".to_string()));
    }

    #[test]
    fn test_enum_encoding_must_be_primitive() {
        let xml = TEST_SCHEMA.replace(r#"encodingType="uInt8""#, r#"encodingType="PRICE9""#);
        let err = SchemaCatalogue::parse_str(&xml, CatalogueOptions::default()).unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedType { .. }));
    }

    #[test]
    fn test_dimension_without_num_in_group_is_fatal() {
        let xml = TEST_SCHEMA.replace(r#"name="numInGroup""#, r#"name="count""#);
        let err = SchemaCatalogue::parse_str(&xml, CatalogueOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnsupportedType { ref type_name, .. } if type_name == "groupSize"
        ));
    }

    #[test]
    fn test_malformed_xml_and_attributes() {
        let err =
            SchemaCatalogue::parse_str("<messageSchema>", CatalogueOptions::default()).unwrap_err();
        assert!(matches!(err, SchemaError::Xml(_)));

        let xml = TEST_SCHEMA.replace(r#"name="Trade" id="1""#, r#"name="Trade" id="one""#);
        let err = SchemaCatalogue::parse_str(&xml, CatalogueOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::InvalidAttribute { ref attribute, .. } if attribute == "id"
        ));

        let xml = TEST_SCHEMA.replace(r#"name="Quote" id="2""#, r#"name="Quote" id="1""#);
        let err = SchemaCatalogue::parse_str(&xml, CatalogueOptions::default()).unwrap_err();
        assert_eq!(err, SchemaError::DuplicateTemplate(1));
    }

    #[test]
    fn test_parse_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TEST_SCHEMA.as_bytes()).unwrap();
        let catalogue = SchemaCatalogue::parse(file.path(), CatalogueOptions::default()).unwrap();
        assert_eq!(catalogue.len(), 2);

        let err = SchemaCatalogue::parse("/nonexistent/schema.xml", CatalogueOptions::default())
            .unwrap_err();
        assert!(matches!(err, SchemaError::Io { .. }));
    }

    #[test]
    fn test_schema_field_projection() {
        let catalogue = catalogue();
        let trade = catalogue.template(1).unwrap();
        let price = trade.field("price").unwrap().schema_field();
        assert_eq!(price.logical_type(), Some(LogicalType::Long));
        let legs = trade.group("legs").unwrap().schema_field();
        assert_eq!(legs.bigquery_mode(), "REPEATED");
        let quote = catalogue.template(2).unwrap();
        assert_eq!(quote.field("is_last").unwrap().logical_type(), LogicalType::Boolean);
        assert_eq!(quote.field("px").unwrap().schema_field().json_type(), "object");
    }
}
