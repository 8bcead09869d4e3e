use crate::csv_codec::CsvRow;
use crate::error::{Result, TagCsvError};
use crate::tree::path::join_path;
use crate::tree::{ArrayUpdateMode, DataType, NodeData};

pub const COL_NAME: &str = "VariableName";
pub const COL_PATH: &str = "Path";
pub const COL_IS_STRUCTURE: &str = "IsStructure";
pub const COL_TYPE: &str = "Type";
pub const COL_ARRAY_ELEMENTS: &str = "ArrayElements";
pub const COL_ARRAY_UPDATE_MODE: &str = "ArrayUpdateMode";
pub const COL_SYMBOL_NAME: &str = "SymbolName";

/// Column order used when writing.
pub const HEADER: [&str; 7] = [
    COL_NAME,
    COL_PATH,
    COL_IS_STRUCTURE,
    COL_TYPE,
    COL_ARRAY_ELEMENTS,
    COL_ARRAY_UPDATE_MODE,
    COL_SYMBOL_NAME,
];

/// A leaf tag flattened to one table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    pub name: String,
    /// Container chain from the project root to the tag's parent.
    pub path: String,
    pub is_structure: bool,
    pub data_type: DataType,
    pub array_elements: u32,
    pub array_update_mode: ArrayUpdateMode,
    pub symbol_name: String,
}

impl TagRecord {
    pub fn to_fields(&self) -> [String; 7] {
        [
            self.name.clone(),
            self.path.clone(),
            self.is_structure.to_string(),
            self.data_type.to_string(),
            self.array_elements.to_string(),
            self.array_update_mode.to_string(),
            self.symbol_name.clone(),
        ]
    }

    /// Build a record from a CSV row, looking columns up by name.
    pub fn from_row(row: &CsvRow) -> Result<Self> {
        let name = row.get(COL_NAME)?.to_string();
        let path = row.get(COL_PATH)?.to_string();
        let data_type: DataType = row.get(COL_TYPE)?.parse()?;
        let is_structure = parse_bool(COL_IS_STRUCTURE, row.get(COL_IS_STRUCTURE)?)?;
        let array_elements = parse_u32(COL_ARRAY_ELEMENTS, row.get(COL_ARRAY_ELEMENTS)?)?;
        let array_update_mode = ArrayUpdateMode::from_csv_value(row.get(COL_ARRAY_UPDATE_MODE)?);
        let symbol_name = row.get(COL_SYMBOL_NAME)?.to_string();

        if name.is_empty() || name.contains('/') {
            return Err(TagCsvError::InvalidValue {
                field: COL_NAME.to_string(),
                value: name,
            });
        }
        // A structure member's path ends in the structure name.
        if is_structure && path.trim_matches('/').is_empty() {
            return Err(TagCsvError::InvalidValue {
                field: COL_PATH.to_string(),
                value: path,
            });
        }

        Ok(TagRecord {
            name,
            path,
            is_structure,
            data_type,
            array_elements,
            array_update_mode,
            symbol_name,
        })
    }

    pub fn full_path(&self) -> String {
        join_path(&self.path, &self.name)
    }

    /// Fresh typed tag node carrying this record's properties.
    pub fn to_node(&self) -> NodeData {
        let mut node = NodeData::tag(&self.name, self.data_type);
        if let Some(spec) = node.tag_spec_mut() {
            if self.array_elements > 0 {
                spec.array_dimensions = vec![self.array_elements];
            }
            spec.array_update_mode = self.array_update_mode;
            spec.symbol_name = self.symbol_name.clone();
        }
        node
    }
}

fn parse_bool(field: &str, value: &str) -> Result<bool> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(TagCsvError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

fn parse_u32(field: &str, value: &str) -> Result<u32> {
    value.parse().map_err(|_| TagCsvError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    })
}
