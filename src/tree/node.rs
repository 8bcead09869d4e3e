use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TagCsvError};

/// Primitive data types a device tag can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Int16,
    Int32,
    Int64,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Double,
    String,
    Byte,
    SByte,
}

impl DataType {
    pub const ALL: [DataType; 12] = [
        DataType::Boolean,
        DataType::Int16,
        DataType::Int32,
        DataType::Int64,
        DataType::UInt16,
        DataType::UInt32,
        DataType::UInt64,
        DataType::Float,
        DataType::Double,
        DataType::String,
        DataType::Byte,
        DataType::SByte,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Boolean => "Boolean",
            DataType::Int16 => "Int16",
            DataType::Int32 => "Int32",
            DataType::Int64 => "Int64",
            DataType::UInt16 => "UInt16",
            DataType::UInt32 => "UInt32",
            DataType::UInt64 => "UInt64",
            DataType::Float => "Float",
            DataType::Double => "Double",
            DataType::String => "String",
            DataType::Byte => "Byte",
            DataType::SByte => "SByte",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = TagCsvError;

    /// Type names are matched exactly (case-sensitive).
    fn from_str(s: &str) -> Result<Self> {
        DataType::ALL
            .iter()
            .copied()
            .find(|dt| dt.as_str() == s)
            .ok_or_else(|| TagCsvError::UnsupportedType {
                type_name: s.to_string(),
            })
    }
}

/// Whether array writes are observed per element or as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArrayUpdateMode {
    #[default]
    Element,
    Array,
}

impl ArrayUpdateMode {
    /// "Element" selects element-wise updates; any other text means whole-array.
    pub fn from_csv_value(value: &str) -> Self {
        if value == "Element" {
            ArrayUpdateMode::Element
        } else {
            ArrayUpdateMode::Array
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArrayUpdateMode::Element => "Element",
            ArrayUpdateMode::Array => "Array",
        }
    }
}

impl fmt::Display for ArrayUpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Properties of a leaf tag.
///
/// `data_type` holds the declared type name as found in the project, which
/// may be a type this crate cannot exchange. Use [`TagSpec::resolved_type`]
/// to map it onto [`DataType`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagSpec {
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub array_dimensions: Vec<u32>,
    #[serde(default)]
    pub array_update_mode: ArrayUpdateMode,
    #[serde(default)]
    pub symbol_name: String,
}

impl TagSpec {
    pub fn new(data_type: DataType) -> Self {
        TagSpec {
            data_type: data_type.as_str().to_string(),
            array_dimensions: Vec::new(),
            array_update_mode: ArrayUpdateMode::default(),
            symbol_name: String::new(),
        }
    }

    pub fn resolved_type(&self) -> Result<DataType> {
        self.data_type.parse()
    }

    /// Length of the first array dimension, or 0 for scalars.
    pub fn array_elements(&self) -> u32 {
        self.array_dimensions.first().copied().unwrap_or(0)
    }
}

/// What a node in the project tree is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum NodeKind {
    Folder,
    StructureGroup,
    /// Generic object that can hold children, e.g. a driver or station.
    Object,
    Tag(TagSpec),
    /// Anything else the project holds; never traversed.
    Other,
}

impl NodeKind {
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            NodeKind::Folder | NodeKind::StructureGroup | NodeKind::Object
        )
    }

    pub fn is_tag(&self) -> bool {
        matches!(self, NodeKind::Tag(_))
    }

    pub fn is_structure_group(&self) -> bool {
        matches!(self, NodeKind::StructureGroup)
    }

    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Folder => "folder",
            NodeKind::StructureGroup => "structure",
            NodeKind::Object => "object",
            NodeKind::Tag(_) => "tag",
            NodeKind::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeData {
    pub name: String,
    pub kind: NodeKind,
}

impl NodeData {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        NodeData {
            name: name.into(),
            kind,
        }
    }

    pub fn folder(name: impl Into<String>) -> Self {
        NodeData::new(name, NodeKind::Folder)
    }

    pub fn structure_group(name: impl Into<String>) -> Self {
        NodeData::new(name, NodeKind::StructureGroup)
    }

    pub fn object(name: impl Into<String>) -> Self {
        NodeData::new(name, NodeKind::Object)
    }

    /// Typed tag constructor.
    pub fn tag(name: impl Into<String>, data_type: DataType) -> Self {
        NodeData::new(name, NodeKind::Tag(TagSpec::new(data_type)))
    }

    pub fn tag_spec(&self) -> Option<&TagSpec> {
        match &self.kind {
            NodeKind::Tag(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn tag_spec_mut(&mut self) -> Option<&mut TagSpec> {
        match &mut self.kind {
            NodeKind::Tag(spec) => Some(spec),
            _ => None,
        }
    }
}
