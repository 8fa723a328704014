use std::{fs, path::PathBuf};

use anyhow::Context;
use serde::Deserialize;
use shared::domain::Image;
use url::Url;

use crate::sensitivity::SensitivityLevel;

const SETTINGS_FILE: &str = "dashboard.toml";

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub server_url: String,
    pub download_dir: PathBuf,
    pub default_eps: f64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".into(),
            download_dir: dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
            default_eps: SensitivityLevel::default().eps(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    download_dir: Option<PathBuf>,
    default_eps: Option<f64>,
}

impl ClientSettings {
    /// Base URL without a trailing slash, checked to be an absolute http(s) URL.
    pub fn validated_server_url(&self) -> anyhow::Result<String> {
        normalize_server_url(&self.server_url)
    }

    pub fn initial_sensitivity(&self) -> SensitivityLevel {
        SensitivityLevel::new(self.default_eps)
    }

    /// Full URL for an image; absolute URLs from the service are kept as-is.
    pub fn resolve_image_url(&self, image: &Image) -> String {
        resolve_relative(&self.server_url, &image.url)
    }

    fn apply_file(&mut self, file_cfg: FileSettings) {
        if let Some(v) = file_cfg.server_url {
            self.server_url = v;
        }
        if let Some(v) = file_cfg.download_dir {
            self.download_dir = v;
        }
        if let Some(v) = file_cfg.default_eps {
            self.default_eps = v;
        }
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("DASHBOARD_SERVER_URL") {
            self.server_url = v;
        }
        if let Some(v) = var("APP__SERVER_URL") {
            self.server_url = v;
        }

        if let Some(v) = var("DASHBOARD_DOWNLOAD_DIR") {
            self.download_dir = PathBuf::from(v);
        }
        if let Some(v) = var("APP__DOWNLOAD_DIR") {
            self.download_dir = PathBuf::from(v);
        }

        if let Some(v) = var("APP__DEFAULT_EPS") {
            if let Ok(parsed) = v.parse::<f64>() {
                self.default_eps = parsed;
            }
        }
    }
}

/// Defaults, then `dashboard.toml` in the working directory, then environment.
pub fn load_settings() -> anyhow::Result<ClientSettings> {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        let file_cfg: FileSettings =
            toml::from_str(&raw).with_context(|| format!("failed to parse {SETTINGS_FILE}"))?;
        settings.apply_file(file_cfg);
    }

    settings.apply_env(|name| std::env::var(name).ok().filter(|v| !v.trim().is_empty()));
    Ok(settings)
}

fn normalize_server_url(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed).with_context(|| format!("invalid server url '{raw}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("server url '{raw}' must use http or https");
    }
    Ok(trimmed.to_string())
}

fn resolve_relative(server_url: &str, path: &str) -> String {
    if Url::parse(path).is_ok() {
        return path.to_string();
    }
    let base = server_url.trim().trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use shared::domain::ImageId;

    fn image(url: &str) -> Image {
        Image {
            id: ImageId(1),
            filename: "cat.png".into(),
            url: url.into(),
            cluster_id: None,
        }
    }

    #[test]
    fn resolves_service_relative_image_urls() {
        let settings = ClientSettings {
            server_url: "http://127.0.0.1:8000/".into(),
            ..ClientSettings::default()
        };
        assert_eq!(
            settings.resolve_image_url(&image("/uploads/cat.png")),
            "http://127.0.0.1:8000/uploads/cat.png"
        );
        assert_eq!(
            settings.resolve_image_url(&image("uploads/cat.png")),
            "http://127.0.0.1:8000/uploads/cat.png"
        );
        assert_eq!(
            settings.resolve_image_url(&image("https://cdn.example/cat.png")),
            "https://cdn.example/cat.png"
        );
    }

    #[test]
    fn rejects_non_http_server_urls() {
        assert!(normalize_server_url("ftp://host").is_err());
        assert!(normalize_server_url("not a url").is_err());
        assert_eq!(
            normalize_server_url(" http://localhost:8000/ ").expect("valid"),
            "http://localhost:8000"
        );
    }

    #[test]
    fn file_then_env_layers_override_defaults() {
        let mut settings = ClientSettings::default();
        let file_cfg: FileSettings = toml::from_str(
            r#"
server_url = "http://file:9000"
"#,
        )
        .expect("toml");
        settings.apply_file(file_cfg);
        assert_eq!(settings.server_url, "http://file:9000");

        let env: HashMap<&str, &str> = HashMap::from([
            ("APP__SERVER_URL", "http://env:7000"),
            ("APP__DEFAULT_EPS", "0.35"),
        ]);
        settings.apply_env(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(settings.server_url, "http://env:7000");
        assert_eq!(settings.default_eps, 0.35);
        assert_eq!(settings.initial_sensitivity().eps(), 0.35);
    }

    #[test]
    fn min_samples_is_not_configurable() {
        let file_cfg: FileSettings = toml::from_str(
            r#"
min_samples = 7
default_eps = 0.2
"#,
        )
        .expect("extra keys are ignored");
        let mut settings = ClientSettings::default();
        settings.apply_file(file_cfg);
        assert_eq!(settings.default_eps, 0.2);
    }
}
