//! Image reference helpers

/// Registry host of an image reference, if it names one.
///
/// The first path component is a registry host when it contains a `.` or
/// `:` or is `localhost`; `kontena/redis` and `redis:2.8` carry none.
pub fn registry_host(image_name: &str) -> Option<&str> {
    let (first, _) = image_name.split_once('/')?;
    if first.contains('.') || first.contains(':') || first == "localhost" {
        Some(first)
    } else {
        None
    }
}

/// Registry an image is pulled from, falling back to `default_registry`
pub fn registry_name<'a>(image_name: &'a str, default_registry: &'a str) -> &'a str {
    registry_host(image_name).unwrap_or(default_registry)
}
