use std::path::{Path, PathBuf};

use crate::client::ClientConfig;
use crate::error::{MeteoError, Result};

pub(crate) const DEFAULT_BASE_URL: &str = "https://api.meteo.pl/api/v1/model/";

const ENV_URL: &str = "METEO_API_URL";
const ENV_KEY: &str = "METEO_API_KEY";
const ENV_RC: &str = "METEO_RC";
const RC_NAME: &str = ".meteorc";

#[derive(Debug, Default, PartialEq)]
struct RcConfig {
    url: Option<String>,
    key: Option<String>,
}

/// Resolves url and key: explicit value, then environment, then rc file.
pub(crate) fn load_config(url: Option<String>, key: Option<String>) -> Result<ClientConfig> {
    let mut url = url.or_else(|| env_non_empty(ENV_URL));
    let mut key = key.or_else(|| env_non_empty(ENV_KEY));

    let candidates = rc_candidates();
    if url.is_none() || key.is_none() {
        if let Some(rc_path) = candidates.iter().find(|p| p.exists()) {
            tracing::debug!(path = %rc_path.display(), "reading meteo rc file");
            let rc = read_rc(rc_path)?;
            url = url.or(rc.url);
            key = key.or(rc.key);
        }
    }

    let key = key.ok_or_else(|| {
        let searched = candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>();
        MeteoError::Configuration(if searched.is_empty() {
            format!("missing api key (set {} or create {})", ENV_KEY, RC_NAME)
        } else {
            format!(
                "missing api key (set {} or put `key:` in one of: {})",
                ENV_KEY,
                searched.join(", ")
            )
        })
    })?;

    Ok(ClientConfig {
        url: url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        key,
    })
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn read_rc(path: &Path) -> Result<RcConfig> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        MeteoError::Configuration(format!(
            "failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;
    Ok(parse_rc(&text))
}

fn parse_rc(text: &str) -> RcConfig {
    let mut cfg = RcConfig::default();
    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((k, v)) = line.split_once(':') else {
            continue;
        };
        let v = strip_quotes(v.trim());
        if v.is_empty() {
            continue;
        }
        match k.trim() {
            "url" => cfg.url = Some(v.to_string()),
            "key" => cfg.key = Some(v.to_string()),
            _ => {}
        }
    }
    cfg
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    for q in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

fn rc_candidates() -> Vec<PathBuf> {
    // METEO_RC wins outright; otherwise ./.meteorc then ~/.meteorc.
    if let Some(p) = env_non_empty(ENV_RC) {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(RC_NAME));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(RC_NAME));
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_arguments_win() {
        let cfg = load_config(Some("http://localhost:1/".into()), Some("abc".into())).unwrap();
        assert_eq!(cfg.url, "http://localhost:1/");
        assert_eq!(cfg.key, "abc");
    }

    #[test]
    fn parses_rc_lines() {
        let rc = parse_rc(
            "# meteo.pl credentials\n\
             url: https://api.meteo.pl/api/v1/model/\n\
             key: \"0123abcd\"\n\
             verify: 1\n\
             garbage line\n",
        );
        assert_eq!(
            rc,
            RcConfig {
                url: Some("https://api.meteo.pl/api/v1/model/".into()),
                key: Some("0123abcd".into()),
            }
        );
    }

    #[test]
    fn empty_values_are_ignored() {
        assert_eq!(parse_rc("key:\nurl: ''"), RcConfig::default());
    }

    #[test]
    fn strip_quotes_only_matching_pairs() {
        assert_eq!(strip_quotes("'abc'"), "abc");
        assert_eq!(strip_quotes("\"abc'"), "\"abc'");
        assert_eq!(strip_quotes("\""), "\"");
    }
}
