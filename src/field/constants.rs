// Curated vocabularies used by the qualification heuristics.

pub const USERNAME_FIELD_NAMES: &[&str] = &[
    "username",
    "user name",
    "user",
    "email",
    "email address",
    "e-mail",
    "e-mail address",
    "userid",
    "user id",
    "customer id",
    "login id",
    "login",
    "benutzername",
    "benutzer name",
    "email adresse",
    "e-mail adresse",
    "benutzerid",
    "benutzer id",
];

pub const NEW_USERNAME_KEYWORDS: &[&str] = &["new", "change", "neue", "ändern"];

pub const SEARCH_FIELD_NAMES: &[&str] = &["search", "query", "find", "go"];

/// Input types that can never be a login username or password.
pub const EXCLUDED_AUTOFILL_LOGIN_TYPES: &[&str] = &[
    "hidden", "file", "button", "image", "reset", "search", "submit", "checkbox", "radio",
];

/// Input types the page observer never attaches the inline menu to.
pub const EXCLUDED_OVERLAY_TYPES: &[&str] = &[
    "hidden", "file", "button", "image", "reset", "search", "submit", "checkbox", "radio",
    "select",
];

pub const USERNAME_FIELD_TYPES: &[&str] = &["text", "email", "tel"];

pub const FIELD_IGNORE_LIST: &[&str] = &["captcha", "findanything", "forgot"];

pub const PASSWORD_FIELD_EXCLUDE_LIST: &[&str] = &[
    "hint",
    "captcha",
    "findanything",
    "forgot",
    "passwordhint",
    "passwordconfirmhint",
];

pub const AUTOCOMPLETE_DISABLED_VALUES: &[&str] = &["off", "false"];

pub const CURRENT_PASSWORD_AUTOCOMPLETE: &str = "current-password";
pub const NEW_PASSWORD_AUTOCOMPLETE: &str = "new-password";
pub const USERNAME_AUTOCOMPLETE: &str = "username";
