use std::cell::OnceCell;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Snapshot of one input element taken when a frame's page details are collected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub opid: String,
    #[serde(default)]
    pub element_number: usize,
    #[serde(rename = "htmlID", default)]
    pub html_id: Option<String>,
    #[serde(default)]
    pub html_name: Option<String>,
    #[serde(default)]
    pub html_class: Option<String>,
    #[serde(rename = "type", default)]
    pub field_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub autocomplete_type: Option<String>,
    #[serde(rename = "label-data", default)]
    pub label_data: Option<String>,
    #[serde(rename = "label-aria", default)]
    pub label_aria: Option<String>,
    #[serde(rename = "label-left", default)]
    pub label_left: Option<String>,
    #[serde(rename = "label-right", default)]
    pub label_right: Option<String>,
    #[serde(rename = "label-tag", default)]
    pub label_tag: Option<String>,
    #[serde(rename = "label-top", default)]
    pub label_top: Option<String>,
    #[serde(default)]
    pub form: Option<String>,
    #[serde(default = "default_viewable")]
    pub viewable: bool,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub disabled: bool,

    // Lower-cased keyword string, built on first use
    #[serde(skip)]
    keywords: OnceCell<String>,
}

fn default_viewable() -> bool {
    true
}

impl FieldDescriptor {
    pub fn new(opid: impl Into<String>, element_number: usize) -> Self {
        Self {
            opid: opid.into(),
            element_number,
            viewable: true,
            ..Self::default()
        }
    }

    pub fn with_type(mut self, field_type: &str) -> Self {
        self.field_type = Some(field_type.to_string());
        self
    }

    pub fn with_id(mut self, html_id: &str) -> Self {
        self.html_id = Some(html_id.to_string());
        self
    }

    pub fn with_name(mut self, html_name: &str) -> Self {
        self.html_name = Some(html_name.to_string());
        self
    }

    pub fn with_placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = Some(placeholder.to_string());
        self
    }

    pub fn with_autocomplete(mut self, autocomplete: &str) -> Self {
        self.autocomplete_type = Some(autocomplete.to_string());
        self
    }

    pub fn with_form(mut self, form: &str) -> Self {
        self.form = Some(form.to_string());
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label_tag = Some(label.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.viewable = false;
        self
    }

    pub fn field_type(&self) -> &str {
        self.field_type.as_deref().unwrap_or("text")
    }

    pub fn autocomplete(&self) -> &str {
        self.autocomplete_type.as_deref().unwrap_or("")
    }

    /// The values checked against the password and ignore vocabularies.
    pub fn identifying_attributes(&self) -> [Option<&str>; 3] {
        [
            self.html_id.as_deref(),
            self.html_name.as_deref(),
            self.placeholder.as_deref(),
        ]
    }

    /// Comma-joined, lower-cased attribute and label text. Computed once per snapshot.
    pub fn keywords(&self) -> &str {
        self.keywords.get_or_init(|| {
            [
                self.html_id.as_deref(),
                self.html_name.as_deref(),
                self.html_class.as_deref(),
                self.field_type.as_deref(),
                self.title.as_deref(),
                self.placeholder.as_deref(),
                self.autocomplete_type.as_deref(),
                self.label_data.as_deref(),
                self.label_aria.as_deref(),
                self.label_left.as_deref(),
                self.label_right.as_deref(),
                self.label_tag.as_deref(),
                self.label_top.as_deref(),
            ]
            .iter()
            .map(|v| v.unwrap_or(""))
            .collect::<Vec<_>>()
            .join(",")
            .to_lowercase()
        })
    }

    pub fn keywords_memoized(&self) -> bool {
        self.keywords.get().is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDescriptor {
    pub opid: String,
    #[serde(rename = "htmlID", default)]
    pub html_id: Option<String>,
    #[serde(default)]
    pub html_name: Option<String>,
    #[serde(default)]
    pub html_action: Option<String>,
    #[serde(default)]
    pub html_method: Option<String>,
}

impl FormDescriptor {
    pub fn new(opid: impl Into<String>) -> Self {
        Self {
            opid: opid.into(),
            ..Self::default()
        }
    }
}

/// All fields and forms found in one frame during one collection pass.
/// Replaced wholesale on every re-scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDetails {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    #[serde(default)]
    pub forms: HashMap<String, FormDescriptor>,
    #[serde(default)]
    pub collected_at_ms: u64,
}

impl PageDetails {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn with_form(mut self, form: FormDescriptor) -> Self {
        self.forms.insert(form.opid.clone(), form);
        self
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn field(&self, opid: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.opid == opid)
    }

    /// The form descriptor owning `field`, if the field has one and it was collected.
    pub fn owning_form(&self, field: &FieldDescriptor) -> Option<&FormDescriptor> {
        field.form.as_ref().and_then(|id| self.forms.get(id))
    }
}
