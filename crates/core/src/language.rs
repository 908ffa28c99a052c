use std::path::Path;

/// 未對應副檔名時使用的語言識別碼。 / Language identifier used for unmapped extensions.
pub const PLAIN_TEXT: &str = "plaintext";

/// 副檔名（小寫、不含點）與語言識別碼的固定對照表。 / Fixed extension-to-language table (lowercase, no leading dot).
pub const LANGUAGE_TABLE: &[(&str, &str)] = &[
    ("js", "javascript"),
    ("jsx", "javascript"),
    ("ts", "typescript"),
    ("tsx", "typescript"),
    ("json", "json"),
    ("html", "html"),
    ("htm", "html"),
    ("css", "css"),
    ("scss", "scss"),
    ("sass", "sass"),
    ("less", "less"),
    ("md", "markdown"),
    ("py", "python"),
    ("java", "java"),
    ("c", "c"),
    ("cpp", "cpp"),
    ("h", "c"),
    ("hpp", "cpp"),
    ("cs", "csharp"),
    ("go", "go"),
    ("rs", "rust"),
    ("php", "php"),
    ("rb", "ruby"),
    ("xml", "xml"),
    ("yaml", "yaml"),
    ("yml", "yaml"),
    ("sh", "shell"),
    ("bat", "bat"),
    ("ps1", "powershell"),
    ("sql", "sql"),
    ("txt", "plaintext"),
];

/// 依副檔名推斷語言。 / Detects the language identifier from a path's extension.
pub fn detect_language(path: &Path) -> &'static str {
    let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
        return PLAIN_TEXT;
    };
    language_for_extension(extension)
}

/// 查詢單一副檔名（可含前導點，不分大小寫）。 / Looks up a single extension (leading dot allowed, case-insensitive).
pub fn language_for_extension(extension: &str) -> &'static str {
    let normalized = extension.trim_start_matches('.').to_ascii_lowercase();
    LANGUAGE_TABLE
        .iter()
        .find(|(ext, _)| *ext == normalized)
        .map(|(_, language)| *language)
        .unwrap_or(PLAIN_TEXT)
}
