use serde::{Deserialize, Serialize};

use crate::field::FieldType;

/// Message roles accepted by chat-completion style endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One role-tagged prompt message. Prompts are built fresh per
/// request and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: String) -> Self {
        Self {
            role: Role::System,
            content,
        }
    }

    pub fn user(content: String) -> Self {
        Self {
            role: Role::User,
            content,
        }
    }
}

/// Build the two-message prompt for field generation: a system
/// message enumerating the permitted field types and their structural
/// rules, and a user message embedding the literal request. Pure
/// function of the request text and the static vocabulary.
pub fn build_field_generation_prompt(user_request: &str) -> Vec<Message> {
    vec![
        Message::system(system_instructions()),
        Message::user(format!(
            "Create the form fields for this request: \"{user_request}\". \
             Double-check that every object follows the rules above before answering."
        )),
    ]
}

fn system_instructions() -> String {
    let mut s = String::new();

    s.push_str(
        "You design fields for a government form builder and you strictly output JSON.\n\
         Respond with a single JSON array of field objects and nothing else: no prose,\n\
         no comments, no markdown code fences.\n\n",
    );

    s.push_str("Every field object has this shape:\n");
    s.push_str(
        "- title: non-empty string\n\
         - fieldType: one of the permitted types below\n\
         - required: boolean\n\
         - description: optional string\n\n",
    );

    s.push_str("Permitted fieldType values:\n");
    for ty in FieldType::ALL {
        if ty.is_excluded_from_suggestions() {
            continue;
        }
        s.push_str("- ");
        s.push_str(ty.as_str());
        s.push('\n');
    }

    s.push_str(
        "\nAdditional rules per type:\n\
         - Checkbox, Radio and Dropdown fields must include fieldOptions,\n\
           a non-empty array of option strings.\n\
         - Table fields must include columns (a non-empty array of column\n\
           title strings), an integer minimumRows, an optional integer\n\
           maximumRows, and a boolean addMoreRows.\n\
         - Statement fields must include a non-empty description holding\n\
           the statement text.\n",
    );

    s
}
