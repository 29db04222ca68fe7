//! Configuration access port trait.
//!
//! Sections and keys are looked up by name; a key that is absent or blank is
//! left for the caller to default.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;
}
