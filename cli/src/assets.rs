const SYSTEM_INSTRUCTION_RAW: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/assets/system_instruction.md"
));

/// Examiner persona sent to every provider with the generation prompt.
pub fn system_instruction() -> &'static str {
    SYSTEM_INSTRUCTION_RAW.trim()
}
