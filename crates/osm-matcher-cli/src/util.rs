/// A utility type to generate properly pluralized count expressions in log messages,
/// e.g., "1 item" or "7 items", without copying data.
pub struct Counted<'a> {
    singular: &'a str,
    count: usize,
}

impl<'a> Counted<'a> {
    /// Create a new `Counted` value with the given count and singular form, which is pluralized by
    /// adding an `s`.
    pub fn regular(count: usize, singular: &'a str) -> Self {
        Counted { singular, count }
    }
}

impl<'a> std::fmt::Display for Counted<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 1 {
            write!(f, "1 {}", self.singular)
        } else {
            write!(f, "{} {}s", self.count, self.singular)
        }
    }
}
