//! Configuration access port trait.

/// Sectioned key/value lookup. `get_double` falls back to `default` when the
/// key is missing or does not parse; use `get_string` to tell the two apart.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
}
