//! Qualified Name Handling
//!
//! Scope inference from dotted fully-qualified names. A name is top-level
//! when, after the active package prefix is stripped, a single segment
//! remains; anything longer is scoped inside another type.

/// Strip the package prefix (e.g. `"pkg.v1."`) when the name starts with it
pub fn strip_package<'a>(prefix: &str, qualified: &'a str) -> &'a str {
    qualified.strip_prefix(prefix).unwrap_or(qualified)
}

/// Final segment of the stripped name
pub fn local_name(prefix: &str, qualified: &str) -> String {
    let stripped = strip_package(prefix, qualified);
    stripped.rsplit('.').next().unwrap_or(stripped).to_string()
}

/// True when the stripped name still has more than one segment
pub fn is_nested(prefix: &str, qualified: &str) -> bool {
    strip_package(prefix, qualified).contains('.')
}

/// Split `pkg.v1.Service` into (`pkg.v1`, `Service`)
pub fn split_service(qualified: &str) -> (&str, &str) {
    match qualified.rsplit_once('.') {
        Some((package, name)) => (package, name),
        None => ("", qualified),
    }
}

/// Prefix to strip for types registered under `package`
pub fn package_prefix(package: &str) -> String {
    if package.is_empty() {
        String::new()
    } else {
        format!("{}.", package)
    }
}
