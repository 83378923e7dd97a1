//! Naming rules for generated wrapper properties and accessors.
//!
//! A static call `@com.app.Util@makeCode()` becomes the property
//! `utilMakeCode`, exposed by an accessor `getUtilMakeCode()`. Both names are
//! pure functions of the owner type and member, so the synthesizer and the
//! rewriter agree without talking to each other.

/// Last dot-separated segment of a qualified name (`$` nesting included).
pub fn simple_name(qualified: &str) -> &str {
    let tail = qualified.rsplit('.').next().unwrap_or(qualified);
    tail.rsplit('$').next().unwrap_or(tail)
}

/// Package part of a qualified name (empty for an unqualified name).
pub fn package_of(qualified: &str) -> &str {
    qualified.rfind('.').map_or("", |i| &qualified[..i])
}

/// First character upper-cased.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// First character lower-cased.
pub fn uncapitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Wrapper property name: uncapitalized simple owner name followed by the
/// capitalized member name.
///
/// ```
/// use strutsmig_core::naming::property_name;
///
/// assert_eq!(property_name("com.app.Util", "makeCode"), "utilMakeCode");
/// assert_eq!(property_name("com.app.DateUtil", "formatDate"), "dateUtilFormatDate");
/// ```
pub fn property_name(owner_type: &str, member_name: &str) -> String {
    let mut name = uncapitalize(simple_name(owner_type));
    name.push_str(&capitalize(member_name));
    name
}

/// Accessor name for a property: `get` followed by the capitalized property.
pub fn accessor_name(property: &str) -> String {
    format!("get{}", capitalize(property))
}
