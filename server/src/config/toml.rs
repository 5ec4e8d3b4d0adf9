/// Renders a TOML parse error with the file, position and text it points at.
pub fn human_toml_error(file_path: &str, src: &str, e: ::toml::de::Error) -> String {
    let msg = e.message();
    let Some(span) = e.span() else {
        return format!("{msg}\nFile `{file_path}`");
    };
    let start = span.start.min(src.len());
    let end = span.end.min(src.len()).max(start);
    let before = &src[..start];
    let line = before.matches('\n').count() + 1;
    let col = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
    let affected = &src[start..end];
    format!(
        "{msg}
File `{file_path}`
Line {line}, Column {col}
Affected: #'{affected}'#"
    )
}
