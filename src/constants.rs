/// Source body identifiers to ensure consistency across the codebase.
/// These constants define the mapping between source ids, their input file
/// names, and the issuing agency they correspond to.

// Source body identifiers (used in CLI and in the `source` output column)
pub const CAC_SOURCE: &str = "cac";
pub const MIIT_SOURCE: &str = "miit";
pub const TC260_SOURCE: &str = "tc260";

/// Conventional input file name for a source body
pub fn source_input_filename(source: &str) -> String {
    format!("{}_all_policies.csv", source)
}

/// Full agency name for a source body id
pub fn source_display_name(source: &str) -> &str {
    match source {
        CAC_SOURCE => "国家互联网信息办公室",
        MIIT_SOURCE => "中华人民共和国工业和信息化部",
        TC260_SOURCE => "全国信息安全标准化技术委员会",
        other => other,
    }
}

/// Get all supported source body ids
pub fn default_sources() -> Vec<&'static str> {
    vec![CAC_SOURCE, MIIT_SOURCE, TC260_SOURCE]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_filename_follows_convention() {
        assert_eq!(source_input_filename(MIIT_SOURCE), "miit_all_policies.csv");
    }

    #[test]
    fn unknown_source_display_name_passes_through() {
        assert_eq!(source_display_name("customs"), "customs");
    }
}
