//! Configuration access port trait.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    /// Section names present in the configuration, lowercased.
    fn sections(&self) -> Vec<String>;

    fn has_section(&self, section: &str) -> bool {
        self.sections().iter().any(|s| s == section)
    }
}
