//! Language id by file name or extension.

use std::path::Path;

/// Language identifier for `path`, or `None` when unknown.
pub fn detect_language(path: &Path) -> Option<&'static str> {
    let name = path.file_name()?.to_str()?;
    let by_name = match name {
        "Dockerfile" => Some("dockerfile"),
        "Makefile" | "GNUmakefile" => Some("makefile"),
        "CMakeLists.txt" => Some("cmake"),
        "Cargo.lock" | "poetry.lock" => Some("toml"),
        "yarn.lock" => Some("yaml"),
        ".gitignore" | ".dockerignore" | ".npmignore" => Some("ignore"),
        _ => None,
    };
    if by_name.is_some() {
        return by_name;
    }
    if name.starts_with(".env") {
        return Some("dotenv");
    }
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let lang = match ext.as_str() {
        "rs" => "rust",
        "ts" | "mts" | "cts" => "typescript",
        "tsx" => "typescriptreact",
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "javascriptreact",
        "py" | "pyi" => "python",
        "ipynb" => "jupyter",
        "go" => "go",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "swift" => "swift",
        "c" | "h" => "c",
        "cc" | "cpp" | "cxx" | "hpp" | "hh" => "cpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "php" => "php",
        "sh" | "bash" | "zsh" => "shellscript",
        "ps1" => "powershell",
        "md" | "markdown" => "markdown",
        "json" => "json",
        "jsonc" => "jsonc",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "xml" => "xml",
        "html" | "htm" => "html",
        "css" => "css",
        "scss" => "scss",
        "sql" => "sql",
        "lua" => "lua",
        "dart" => "dart",
        "scala" => "scala",
        "vue" => "vue",
        "svelte" => "svelte",
        "txt" => "plaintext",
        _ => return None,
    };
    Some(lang)
}

/// Code-fence info string for a language id.
pub fn fence_language(language_id: Option<&str>) -> &str {
    match language_id {
        Some("typescriptreact") => "tsx",
        Some("javascriptreact") => "jsx",
        Some("shellscript") => "bash",
        Some("plaintext") | Some("ignore") | Some("dotenv") | None => "",
        Some(other) => other,
    }
}
