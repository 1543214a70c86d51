use crate::error::{MeteoError, Result};

pub(crate) fn urljoin(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        format!("{}/", base)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Builds a `seg/seg/.../` path; the API wants the trailing slash.
pub(crate) fn api_path<S: AsRef<str>>(segments: &[S]) -> String {
    let mut out = String::new();
    for s in segments {
        out.push_str(s.as_ref());
        out.push('/');
    }
    out
}

/// Segments are interpolated raw into the URL, so reject anything that would
/// change the path structure.
pub(crate) fn check_segment(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(MeteoError::Validation(format!("{} must not be empty", what)));
    }
    if value.contains(['/', '?', '#']) {
        return Err(MeteoError::Validation(format!(
            "{} `{}` contains a reserved URL character",
            what, value
        )));
    }
    Ok(())
}
