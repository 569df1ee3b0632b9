use std::collections::HashSet;

use serde::Serialize;

use crate::field::constants::{
    AUTOCOMPLETE_DISABLED_VALUES, CURRENT_PASSWORD_AUTOCOMPLETE, EXCLUDED_AUTOFILL_LOGIN_TYPES,
    EXCLUDED_OVERLAY_TYPES, FIELD_IGNORE_LIST, NEW_PASSWORD_AUTOCOMPLETE, NEW_USERNAME_KEYWORDS,
    PASSWORD_FIELD_EXCLUDE_LIST, SEARCH_FIELD_NAMES, USERNAME_AUTOCOMPLETE, USERNAME_FIELD_NAMES,
    USERNAME_FIELD_TYPES,
};
use crate::field::field_model::{FieldDescriptor, PageDetails};

/// Decides whether input fields are username/password fields of a login form.
///
/// Every method is a pure function of its inputs. The only cached value is the
/// per-field keyword string, which lives on the `FieldDescriptor` snapshot itself.
#[derive(Debug, Clone)]
pub struct FieldQualifier {
    search_field_names: HashSet<&'static str>,
    excluded_login_types: HashSet<&'static str>,
    excluded_overlay_types: HashSet<&'static str>,
    username_field_types: HashSet<&'static str>,
}

impl Default for FieldQualifier {
    fn default() -> Self {
        Self {
            search_field_names: SEARCH_FIELD_NAMES.iter().copied().collect(),
            excluded_login_types: EXCLUDED_AUTOFILL_LOGIN_TYPES.iter().copied().collect(),
            excluded_overlay_types: EXCLUDED_OVERLAY_TYPES.iter().copied().collect(),
            username_field_types: USERNAME_FIELD_TYPES.iter().copied().collect(),
        }
    }
}

impl FieldQualifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_field_for_login_form(&self, field: &FieldDescriptor, page: &PageDetails) -> bool {
        if self.is_current_password_field(field) {
            return self.is_password_field_for_login_form(field, page);
        }

        if !self.is_username_field(field) {
            return false;
        }

        self.is_username_field_for_login_form(field, page)
    }

    // ---- Password case: first matching rule wins ----
    fn is_password_field_for_login_form(&self, field: &FieldDescriptor, page: &PageDetails) -> bool {
        if field.autocomplete() == CURRENT_PASSWORD_AUTOCOMPLETE {
            return true;
        }

        let usernames = self.username_fields(page);
        let passwords = self.current_password_fields(page);

        if page.owning_form(field).is_none() {
            if usernames.len() == 1 && passwords.len() == 1 {
                return true;
            }

            return !is_autocomplete_disabled(field);
        }

        let form_usernames = in_same_form(&usernames, field);
        let form_passwords = in_same_form(&passwords, field);
        if form_usernames.len() == 1 && form_passwords.len() == 1 {
            return true;
        }

        if self.visible_password_fields_in_form(page, field) > 1 {
            return false;
        }

        if form_usernames.is_empty() && is_autocomplete_disabled(field) {
            return false;
        }

        true
    }

    // ---- Username case: mirrors the password case, plus document ordering ----
    fn is_username_field_for_login_form(&self, field: &FieldDescriptor, page: &PageDetails) -> bool {
        if field.autocomplete() == USERNAME_AUTOCOMPLETE {
            return true;
        }

        if keywords_found(field, NEW_USERNAME_KEYWORDS) {
            return false;
        }

        let usernames = self.username_fields(page);
        let passwords = self.current_password_fields(page);

        if page.owning_form(field).is_none() {
            if usernames.len() == 1 && passwords.len() == 1 {
                return true;
            }

            return !is_autocomplete_disabled(field);
        }

        let form_passwords = in_same_form(&passwords, field);
        if let [password] = form_passwords.as_slice() {
            // A username placed after the only password is some other field
            return field.element_number < password.element_number;
        }

        if self.visible_password_fields_in_form(page, field) > 1 {
            return false;
        }

        if form_passwords.is_empty() && is_autocomplete_disabled(field) {
            return false;
        }

        true
    }

    pub fn is_username_field(&self, field: &FieldDescriptor) -> bool {
        if !self.username_field_types.contains(field.field_type())
            || self.is_excluded_field_type(field)
        {
            return false;
        }

        keywords_found(field, USERNAME_FIELD_NAMES)
    }

    pub fn is_current_password_field(&self, field: &FieldDescriptor) -> bool {
        if field.autocomplete() == NEW_PASSWORD_AUTOCOMPLETE {
            return false;
        }

        self.is_password_field(field)
    }

    pub fn is_password_field(&self, field: &FieldDescriptor) -> bool {
        if self.is_excluded_field_type(field) || field_has_disqualifying_attribute_value(field) {
            return false;
        }

        field.field_type() == "password" || is_like_password_field(field)
    }

    pub fn is_excluded_field_type(&self, field: &FieldDescriptor) -> bool {
        if self.excluded_login_types.contains(field.field_type()) {
            return true;
        }

        self.is_search_field(field)
    }

    /// Fields the page observer should never attach the inline menu to.
    pub fn is_ignored_field(&self, field: &FieldDescriptor) -> bool {
        field.readonly || field.disabled || self.excluded_overlay_types.contains(field.field_type())
    }

    pub fn is_search_field(&self, field: &FieldDescriptor) -> bool {
        let values = [
            field.field_type.as_deref(),
            field.html_name.as_deref(),
            field.html_id.as_deref(),
            field.placeholder.as_deref(),
        ];

        values
            .iter()
            .flatten()
            .flat_map(|value| split_attribute_keywords(value))
            .any(|keyword| self.search_field_names.contains(keyword.as_str()))
    }

    fn username_fields<'a>(&self, page: &'a PageDetails) -> Vec<&'a FieldDescriptor> {
        page.fields
            .iter()
            .filter(|f| self.is_username_field(f))
            .collect()
    }

    fn current_password_fields<'a>(&self, page: &'a PageDetails) -> Vec<&'a FieldDescriptor> {
        page.fields
            .iter()
            .filter(|f| self.is_current_password_field(f))
            .collect()
    }

    fn visible_password_fields_in_form(&self, page: &PageDetails, field: &FieldDescriptor) -> usize {
        page.fields
            .iter()
            .filter(|f| f.form == field.form && f.viewable && self.is_password_field(f))
            .count()
    }
}

fn in_same_form<'a>(
    fields: &[&'a FieldDescriptor],
    field: &FieldDescriptor,
) -> Vec<&'a FieldDescriptor> {
    fields
        .iter()
        .filter(|f| f.form == field.form)
        .copied()
        .collect()
}

fn is_autocomplete_disabled(field: &FieldDescriptor) -> bool {
    let autocomplete = field.autocomplete();
    AUTOCOMPLETE_DISABLED_VALUES
        .iter()
        .any(|value| *value == autocomplete)
}

fn keywords_found(field: &FieldDescriptor, keywords: &[&str]) -> bool {
    let searched = field.keywords();
    keywords.iter().any(|k| searched.contains(k))
}

/// Lower-cases and strips whitespace, `_` and `-`.
pub fn clean_attribute_value(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn field_has_disqualifying_attribute_value(field: &FieldDescriptor) -> bool {
    field.identifying_attributes().iter().flatten().any(|value| {
        let cleaned = clean_attribute_value(value);
        !cleaned.is_empty() && FIELD_IGNORE_LIST.iter().any(|term| cleaned.contains(term))
    })
}

/// A plain text field whose id, name or placeholder reads like "password".
pub fn is_like_password_field(field: &FieldDescriptor) -> bool {
    if field.field_type() != "text" {
        return false;
    }

    field
        .identifying_attributes()
        .iter()
        .flatten()
        .any(|value| value_is_like_password(value))
}

fn value_is_like_password(value: &str) -> bool {
    let cleaned = clean_attribute_value(value);
    if !cleaned.contains("password") {
        return false;
    }

    !PASSWORD_FIELD_EXCLUDE_LIST
        .iter()
        .any(|term| cleaned.contains(term))
}

/// Splits camelCase and non-alphabetic separators into lower-case words.
/// `"searchBox_2"` becomes `["search", "box"]`.
pub fn split_attribute_keywords(value: &str) -> Vec<String> {
    let mut separated = String::with_capacity(value.len() + 4);
    let mut prev_lower = false;
    for c in value.chars() {
        if prev_lower && c.is_ascii_uppercase() {
            separated.push(' ');
        }
        prev_lower = c.is_ascii_lowercase();
        separated.push(c.to_ascii_lowercase());
    }

    separated
        .split(|c: char| !c.is_ascii_lowercase())
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Page-level classification report
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldClassification {
    pub opid: String,
    pub is_username: bool,
    pub is_password: bool,
    pub is_current_password: bool,
    pub is_login_field: bool,
}

pub fn classify_page(qualifier: &FieldQualifier, page: &PageDetails) -> Vec<FieldClassification> {
    page.fields
        .iter()
        .map(|field| FieldClassification {
            opid: field.opid.clone(),
            is_username: qualifier.is_username_field(field),
            is_password: qualifier.is_password_field(field),
            is_current_password: qualifier.is_current_password_field(field),
            is_login_field: qualifier.is_field_for_login_form(field, page),
        })
        .collect()
}
