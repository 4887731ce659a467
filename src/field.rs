use serde::{Deserialize, Serialize};

/// Canonical form field vocabulary.
///
/// Wire strings are the PascalCase variant names; this is the same
/// vocabulary the prompt advertises and the validator resolves
/// suggested `fieldType` strings against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Section,
    Statement,
    Email,
    Mobile,
    HomeNo,
    Number,
    Decimal,
    ShortText,
    LongText,
    Dropdown,
    CountryRegion,
    YesNo,
    Checkbox,
    Radio,
    Attachment,
    Date,
    Rating,
    Nric,
    Table,
    Uen,
    Image,
    Children,
}

impl FieldType {
    pub const ALL: [FieldType; 22] = [
        FieldType::Section,
        FieldType::Statement,
        FieldType::Email,
        FieldType::Mobile,
        FieldType::HomeNo,
        FieldType::Number,
        FieldType::Decimal,
        FieldType::ShortText,
        FieldType::LongText,
        FieldType::Dropdown,
        FieldType::CountryRegion,
        FieldType::YesNo,
        FieldType::Checkbox,
        FieldType::Radio,
        FieldType::Attachment,
        FieldType::Date,
        FieldType::Rating,
        FieldType::Nric,
        FieldType::Table,
        FieldType::Uen,
        FieldType::Image,
        FieldType::Children,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Section => "Section",
            FieldType::Statement => "Statement",
            FieldType::Email => "Email",
            FieldType::Mobile => "Mobile",
            FieldType::HomeNo => "HomeNo",
            FieldType::Number => "Number",
            FieldType::Decimal => "Decimal",
            FieldType::ShortText => "ShortText",
            FieldType::LongText => "LongText",
            FieldType::Dropdown => "Dropdown",
            FieldType::CountryRegion => "CountryRegion",
            FieldType::YesNo => "YesNo",
            FieldType::Checkbox => "Checkbox",
            FieldType::Radio => "Radio",
            FieldType::Attachment => "Attachment",
            FieldType::Date => "Date",
            FieldType::Rating => "Rating",
            FieldType::Nric => "Nric",
            FieldType::Table => "Table",
            FieldType::Uen => "Uen",
            FieldType::Image => "Image",
            FieldType::Children => "Children",
        }
    }

    /// Resolve a suggested `fieldType` string against the vocabulary.
    pub fn from_name(name: &str) -> Option<FieldType> {
        FieldType::ALL.iter().copied().find(|t| t.as_str() == name)
    }

    /// Image and Children are internal-only field kinds: structurally
    /// valid enum members, but never offered to or accepted from the
    /// model.
    pub fn is_excluded_from_suggestions(self) -> bool {
        matches!(self, FieldType::Image | FieldType::Children)
    }

    /// Types whose suggestions must carry a non-empty `fieldOptions`.
    pub fn requires_field_options(self) -> bool {
        matches!(
            self,
            FieldType::Checkbox | FieldType::Radio | FieldType::Dropdown
        )
    }

    /// Types whose suggestions must carry a non-empty `description`.
    pub fn requires_description(self) -> bool {
        matches!(self, FieldType::Statement)
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric min/max constraints on a field. New fields always start
/// unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOptions {
    #[serde(rename = "customMin")]
    pub custom_min: Option<i64>,
    #[serde(rename = "customMax")]
    pub custom_max: Option<i64>,
}

/// Attachment quota tiers, in megabytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttachmentSize {
    #[serde(rename = "1")]
    OneMb,
    #[serde(rename = "3")]
    ThreeMb,
    #[serde(rename = "7")]
    SevenMb,
    #[serde(rename = "10")]
    TenMb,
    #[serde(rename = "20")]
    TwentyMb,
}

/// Common creation defaults shared by every mapped field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldBase {
    pub title: String,
    pub description: String,
    pub required: bool,
    pub disabled: bool,
}

impl FieldBase {
    pub fn new(title: String, required: bool, description: Option<String>) -> Self {
        Self {
            title,
            description: description.unwrap_or_default(),
            required,
            disabled: false,
        }
    }
}

/// One column of a mapped table field. Columns suggested by the model
/// are always short-text with unconstrained validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableColumn {
    pub column_title: String,
    pub column_type: FieldType,
    pub required: bool,
    #[serde(rename = "ValidationOptions")]
    pub validation_options: ValidationOptions,
}

impl TableColumn {
    pub fn short_text(title: String) -> Self {
        Self {
            column_title: title,
            column_type: FieldType::ShortText,
            required: true,
            validation_options: ValidationOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableField {
    #[serde(flatten)]
    pub base: FieldBase,
    pub field_type: FieldType,
    pub columns: Vec<TableColumn>,
    pub minimum_rows: i64,
    pub maximum_rows: Option<i64>,
    pub add_more_rows: bool,
}

/// Checkbox, Radio and Dropdown creation objects. `field_type`
/// distinguishes them; the Radio-only and Checkbox-only toggles are
/// carried unconditionally with their safe defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceField {
    #[serde(flatten)]
    pub base: FieldBase,
    pub field_type: FieldType,
    pub field_options: Vec<String>,
    pub others_radio_button: bool,
    pub validate_by_value: bool,
    #[serde(rename = "ValidationOptions")]
    pub validation_options: ValidationOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentField {
    #[serde(flatten)]
    pub base: FieldBase,
    pub field_type: FieldType,
    pub attachment_size: AttachmentSize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicField {
    #[serde(flatten)]
    pub base: FieldBase,
    pub field_type: FieldType,
    #[serde(rename = "ValidationOptions")]
    pub validation_options: ValidationOptions,
}

/// A validated, strongly-typed field creation object, ready to hand
/// to the field-list editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MappedFormField {
    Table(TableField),
    Choice(ChoiceField),
    Attachment(AttachmentField),
    Basic(BasicField),
}

impl MappedFormField {
    pub fn field_type(&self) -> FieldType {
        match self {
            MappedFormField::Table(f) => f.field_type,
            MappedFormField::Choice(f) => f.field_type,
            MappedFormField::Attachment(f) => f.field_type,
            MappedFormField::Basic(f) => f.field_type,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            MappedFormField::Table(f) => &f.base.title,
            MappedFormField::Choice(f) => &f.base.title,
            MappedFormField::Attachment(f) => &f.base.title,
            MappedFormField::Basic(f) => &f.base.title,
        }
    }
}
