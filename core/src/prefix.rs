//! Publish-prefix escaping.
//!
//! Aptly addresses a publish endpoint as `/api/publish/:prefix/:distribution`,
//! so a prefix such as `ppa/main` has to be flattened into one path segment.
//! The server's convention: `/` becomes `_`, a lone `_` becomes `__`, and the
//! root prefix `.` becomes `:.`.

/// Escape `prefix` for use as a single publish path segment.
///
/// The steps run in a fixed order: the `.` special case first, then
/// doubling of isolated underscores, then flattening of slashes. Runs of two
/// or more underscores in the input are left as they are.
pub fn sanitize_prefix(prefix: &str) -> String {
    if prefix == "." {
        return ":.".to_string();
    }
    double_lone_underscores(prefix).replace('/', "_")
}

fn double_lone_underscores(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        out.push(c);
        if c != '_' {
            continue;
        }
        let before = i > 0 && chars[i - 1] == '_';
        let after = chars.get(i + 1) == Some(&'_');
        if !before && !after {
            out.push('_');
        }
    }
    out
}
