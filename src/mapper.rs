use crate::error::{ModelError, SchemaViolation};
use crate::field::{
    AttachmentField, AttachmentSize, BasicField, ChoiceField, FieldBase, FieldType,
    MappedFormField, TableColumn, TableField, ValidationOptions,
};
use crate::suggestion::{SuggestedBase, SuggestedChoice, SuggestedField, SuggestedTable};

/// Transform validated suggestions into field creation objects.
///
/// Pure and deterministic: the same input always maps to deep-equal
/// output, in the same order. Excluded field types are guaranteed to
/// have been rejected by validation; if one shows up anyway the whole
/// batch is refused rather than silently defaulted.
pub fn map_suggested_fields(
    suggestions: &[SuggestedField],
) -> Result<Vec<MappedFormField>, ModelError> {
    suggestions
        .iter()
        .enumerate()
        .map(|(idx, suggestion)| map_one(idx, suggestion))
        .collect()
}

fn map_one(idx: usize, suggestion: &SuggestedField) -> Result<MappedFormField, ModelError> {
    match suggestion {
        SuggestedField::Table(table) => Ok(map_table(table)),
        SuggestedField::Choice(choice) => Ok(map_choice(choice)),
        SuggestedField::Base(base) => map_base(idx, base),
    }
}

fn map_table(table: &SuggestedTable) -> MappedFormField {
    MappedFormField::Table(TableField {
        base: FieldBase::new(table.title.clone(), table.required, table.description.clone()),
        field_type: FieldType::Table,
        columns: table
            .columns
            .iter()
            .map(|title| TableColumn::short_text(title.clone()))
            .collect(),
        minimum_rows: table.minimum_rows,
        maximum_rows: table.maximum_rows,
        add_more_rows: table.add_more_rows,
    })
}

fn map_choice(choice: &SuggestedChoice) -> MappedFormField {
    MappedFormField::Choice(ChoiceField {
        base: FieldBase::new(
            choice.title.clone(),
            choice.required,
            choice.description.clone(),
        ),
        field_type: choice.field_type,
        field_options: choice.field_options.clone(),
        others_radio_button: false,
        validate_by_value: false,
        validation_options: ValidationOptions::default(),
    })
}

fn map_base(idx: usize, base: &SuggestedBase) -> Result<MappedFormField, ModelError> {
    if base.field_type.is_excluded_from_suggestions() {
        // Validation never lets these through; refuse loudly instead
        // of persisting a malformed field.
        return Err(ModelError::InvalidSchemaFormat(vec![
            SchemaViolation::ExcludedFieldType {
                path: format!("$[{idx}].fieldType"),
                found: base.field_type.as_str().to_string(),
            },
        ]));
    }

    let field_base = FieldBase::new(base.title.clone(), base.required, base.description.clone());

    match base.field_type {
        FieldType::Dropdown => {
            let Some(options) = &base.field_options else {
                return Err(ModelError::InvalidSchemaFormat(vec![
                    SchemaViolation::MissingField {
                        path: format!("$[{idx}].fieldOptions"),
                    },
                ]));
            };
            Ok(MappedFormField::Choice(ChoiceField {
                base: field_base,
                field_type: FieldType::Dropdown,
                field_options: options.clone(),
                others_radio_button: false,
                validate_by_value: false,
                validation_options: ValidationOptions::default(),
            }))
        }
        // The model is never trusted to pick quota-affecting values;
        // attachments always start at the smallest size tier.
        FieldType::Attachment => Ok(MappedFormField::Attachment(AttachmentField {
            base: field_base,
            field_type: FieldType::Attachment,
            attachment_size: AttachmentSize::OneMb,
        })),
        other => Ok(MappedFormField::Basic(BasicField {
            base: field_base,
            field_type: other,
            validation_options: ValidationOptions::default(),
        })),
    }
}
