/// Controls envelope validation behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidatorConfig {
    /// When true, objects with members the schema does not name are rejected.
    /// When false, such members are ignored and dropped during conversion.
    pub strict_mode: bool,
}
